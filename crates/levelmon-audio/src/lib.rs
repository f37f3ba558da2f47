pub mod capture;
pub mod encoding;
pub mod level;
pub mod monitor;
pub mod negotiator;
pub mod registry;
pub mod stream;

// Public API
pub use capture::{CpalInputDevice, MonitorSetThread};
pub use encoding::{decode_sample, SampleEncoding};
pub use level::{rms, LevelCell, LevelSnapshot};
pub use monitor::{ReadEngine, StreamMonitor};
pub use negotiator::{
    negotiate, DeviceCapabilities, SampleRateRange, StreamParams, DEFAULT_ENCODING_PREFERENCES,
    DEFAULT_RATE_PREFERENCES,
};
pub use registry::LevelRegistry;
pub use stream::{InputDevice, InputStream, ReadCursor, ReadHandler, SliceCursor};
