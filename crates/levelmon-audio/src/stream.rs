use std::sync::Arc;

use levelmon_foundation::AudioError;

use crate::negotiator::{DeviceCapabilities, StreamParams};

/// One backend delivery of interleaved frames, consumed in bounded slices.
pub trait ReadCursor {
    /// Request up to `*frame_count` frames. On return `*frame_count` holds
    /// the number actually delivered, which may be less. A `None` region
    /// with a non-zero count is a gap: skip aggregation for this slice but
    /// still acknowledge it with [`end_read`](Self::end_read).
    fn begin_read(&mut self, frame_count: &mut usize) -> Result<Option<&[u8]>, AudioError>;

    /// Acknowledge the slice handed out by the last `begin_read`.
    fn end_read(&mut self) -> Result<(), AudioError>;
}

/// Callbacks the backend invokes on its own thread of control. For a given
/// stream the backend never invokes these concurrently with each other, and
/// neither may block: all work must stay bounded by the chunk size.
pub trait ReadHandler: Send + Sync {
    fn on_read(&self, cursor: &mut dyn ReadCursor, frame_count_min: usize, frame_count_max: usize);

    /// Input data was dropped because it was not read fast enough. Purely
    /// observational; never aborts a read cycle.
    fn on_overflow(&self);
}

/// A hardware (or scripted) input device that can be probed and opened.
pub trait InputDevice {
    fn probe(&self) -> Result<DeviceCapabilities, AudioError>;

    fn open_input(
        &self,
        params: StreamParams,
        handler: Arc<dyn ReadHandler>,
    ) -> Result<Box<dyn InputStream>, AudioError>;
}

/// An opened input stream. The underlying resource is released on drop,
/// exactly once.
pub trait InputStream {
    fn start(&mut self) -> Result<(), AudioError>;
}

/// [`ReadCursor`] over one contiguous interleaved byte buffer.
pub struct SliceCursor<'a> {
    bytes: &'a [u8],
    frame_bytes: usize,
    consumed: usize,
    pending: Option<usize>,
}

impl<'a> SliceCursor<'a> {
    pub fn new(bytes: &'a [u8], frame_bytes: usize) -> Self {
        Self {
            bytes,
            frame_bytes,
            consumed: 0,
            pending: None,
        }
    }

    pub fn frames(&self) -> usize {
        self.bytes.len() / self.frame_bytes
    }
}

impl ReadCursor for SliceCursor<'_> {
    fn begin_read(&mut self, frame_count: &mut usize) -> Result<Option<&[u8]>, AudioError> {
        if self.pending.is_some() {
            return Err(AudioError::Read {
                reason: "begin_read while a read is outstanding".to_string(),
            });
        }
        let available = self.frames() - self.consumed;
        let granted = (*frame_count).min(available);
        *frame_count = granted;
        if granted == 0 {
            return Ok(None);
        }
        self.pending = Some(granted);
        let start = self.consumed * self.frame_bytes;
        let end = start + granted * self.frame_bytes;
        Ok(Some(&self.bytes[start..end]))
    }

    fn end_read(&mut self) -> Result<(), AudioError> {
        match self.pending.take() {
            Some(granted) => {
                self.consumed += granted;
                Ok(())
            }
            None => Err(AudioError::EndRead {
                reason: "end_read without a matching begin_read".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hands_out_bounded_slices_in_order() {
        let bytes: Vec<u8> = (0..12).collect();
        let mut cursor = SliceCursor::new(&bytes, 2);
        assert_eq!(cursor.frames(), 6);

        let mut count = 4;
        let slice = cursor.begin_read(&mut count).unwrap().unwrap();
        assert_eq!(count, 4);
        assert_eq!(slice, &bytes[0..8]);
        cursor.end_read().unwrap();

        let mut count = 4;
        let slice = cursor.begin_read(&mut count).unwrap().unwrap();
        assert_eq!(count, 2);
        assert_eq!(slice, &bytes[8..12]);
        cursor.end_read().unwrap();

        let mut count = 4;
        assert!(cursor.begin_read(&mut count).unwrap().is_none());
        assert_eq!(count, 0);
    }

    #[test]
    fn end_read_without_begin_read_errors() {
        let bytes = [0u8; 4];
        let mut cursor = SliceCursor::new(&bytes, 2);
        let err = cursor.end_read().unwrap_err();
        assert!(matches!(err, AudioError::EndRead { .. }));
    }

    #[test]
    fn nested_begin_read_errors() {
        let bytes = [0u8; 4];
        let mut cursor = SliceCursor::new(&bytes, 2);
        let mut count = 1;
        cursor.begin_read(&mut count).unwrap();
        let mut count = 1;
        let err = cursor.begin_read(&mut count).unwrap_err();
        assert!(matches!(err, AudioError::Read { .. }));
    }
}
