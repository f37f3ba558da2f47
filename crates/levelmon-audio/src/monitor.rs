use std::cell::RefCell;
use std::sync::Arc;

use levelmon_foundation::AudioError;

use crate::encoding::{decode_sample, SampleEncoding};
use crate::level::{rms, LevelCell, LevelSnapshot};
use crate::negotiator::{negotiate, StreamParams};
use crate::stream::{InputDevice, InputStream, ReadCursor, ReadHandler};

// Decode scratch, reused across callbacks on the backend's thread.
thread_local! {
    static DECODE_BUFFER: RefCell<Vec<f64>> = const { RefCell::new(Vec::new()) };
}

/// Drives the chunked read/decode/aggregate/publish cycle for one stream.
///
/// The backend invokes [`ReadHandler::on_read`] whenever new frames are
/// ready; each invocation consumes up to one measurement window worth of
/// frames and overwrites the published level per aggregated chunk.
pub struct ReadEngine {
    label: String,
    params: StreamParams,
    buffer_seconds: f64,
    levels: LevelCell,
}

impl ReadEngine {
    pub fn new(label: String, params: StreamParams, buffer_seconds: f64) -> Self {
        Self {
            label,
            params,
            buffer_seconds,
            levels: LevelCell::new(),
        }
    }

    pub fn params(&self) -> StreamParams {
        self.params
    }

    pub fn handle(&self) -> LevelCell {
        self.levels.clone()
    }

    /// Frames in one measurement window, from the configured duration and
    /// the negotiated byte rate.
    fn target_frames(&self) -> usize {
        let target_bytes =
            (self.params.bytes_per_second() as f64 * self.buffer_seconds).ceil() as usize;
        target_bytes / self.params.frame_bytes()
    }

    /// Decode every sample of every channel in `region` and reduce to RMS.
    fn aggregate_region(&self, region: &[u8], frames: usize) -> Result<f64, AudioError> {
        let bytes_per_sample = self.params.encoding.bytes_per_sample();
        let samples = frames * self.params.channels as usize;
        DECODE_BUFFER.with(|buffer| -> Result<f64, AudioError> {
            let mut decoded = buffer.borrow_mut();
            decoded.clear();
            decoded.reserve(samples);
            for i in 0..samples {
                let start = i * bytes_per_sample;
                decoded.push(decode_sample(
                    self.params.encoding,
                    &region[start..start + bytes_per_sample],
                )?);
            }
            Ok(rms(&decoded))
        })
    }
}

impl ReadHandler for ReadEngine {
    fn on_read(
        &self,
        cursor: &mut dyn ReadCursor,
        _frame_count_min: usize,
        _frame_count_max: usize,
    ) {
        let mut frames_left = self.target_frames();
        loop {
            let mut frame_count = frames_left;
            if frame_count == 0 {
                break;
            }
            let region = match cursor.begin_read(&mut frame_count) {
                Ok(region) => region,
                Err(e) => {
                    tracing::warn!("device {}: begin_read: {}", self.label, e);
                    return;
                }
            };
            if frame_count == 0 {
                break;
            }
            if let Some(region) = region {
                match self.aggregate_region(region, frame_count) {
                    Ok(level) => self.levels.publish(level),
                    Err(e) => {
                        tracing::warn!("device {}: decode: {}", self.label, e);
                        return;
                    }
                }
            }
            if let Err(e) = cursor.end_read() {
                tracing::warn!("device {}: end_read: {}", self.label, e);
                return;
            }
            frames_left -= frame_count;
        }
    }

    fn on_overflow(&self) {
        let count = self.levels.record_overflow();
        tracing::warn!("device {}: overflow {}", self.label, count);
    }
}

/// Owns one negotiated input stream and its published level.
pub struct StreamMonitor {
    engine: Arc<ReadEngine>,
    _stream: Box<dyn InputStream>,
}

impl std::fmt::Debug for StreamMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamMonitor").finish_non_exhaustive()
    }
}

impl StreamMonitor {
    /// Probe the device, negotiate stream parameters, open the input stream
    /// and start it. Probe and open failures are fatal for this device
    /// only; a start failure is logged and the monitor stays usable with a
    /// zero-valued level.
    pub fn open(
        device: &dyn InputDevice,
        buffer_seconds: f64,
        rate_prefs: &[u32],
        encoding_prefs: &[SampleEncoding],
    ) -> Result<Self, AudioError> {
        let caps = device.probe()?;
        let params = negotiate(&caps, rate_prefs, encoding_prefs)?;
        tracing::info!(
            "device {}: negotiated {} @ {} Hz, {} channel(s)",
            caps.id,
            params.encoding,
            params.sample_rate,
            params.channels
        );
        let engine = Arc::new(ReadEngine::new(caps.id.clone(), params, buffer_seconds));
        let mut stream = device.open_input(params, engine.clone())?;
        if let Err(e) = stream.start() {
            tracing::error!("device {}: failed to start stream: {}", caps.id, e);
        }
        Ok(Self {
            engine,
            _stream: stream,
        })
    }

    pub fn params(&self) -> StreamParams {
        self.engine.params()
    }

    /// Cloneable handle for the query surface.
    pub fn handle(&self) -> LevelCell {
        self.engine.handle()
    }

    pub fn level(&self) -> f64 {
        self.engine.handle().level()
    }

    pub fn snapshot(&self) -> LevelSnapshot {
        self.engine.handle().snapshot()
    }
}
