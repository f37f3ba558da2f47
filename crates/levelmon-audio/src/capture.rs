use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use parking_lot::RwLock;

use levelmon_foundation::AudioError;

use crate::encoding::SampleEncoding;
use crate::monitor::StreamMonitor;
use crate::negotiator::{
    DeviceCapabilities, SampleRateRange, StreamParams, DEFAULT_ENCODING_PREFERENCES,
    DEFAULT_RATE_PREFERENCES,
};
use crate::registry::LevelRegistry;
use crate::stream::{InputDevice, InputStream, ReadHandler, SliceCursor};

/// CPAL delivers buffers in the machine's byte order.
fn encoding_for(format: SampleFormat) -> Option<SampleEncoding> {
    match format {
        SampleFormat::I8 => Some(SampleEncoding::S8),
        SampleFormat::U8 => Some(SampleEncoding::U8),
        SampleFormat::I16 => Some(SampleEncoding::S16_NE),
        SampleFormat::U16 => Some(SampleEncoding::U16_NE),
        SampleFormat::I32 => Some(SampleEncoding::S32_NE),
        SampleFormat::U32 => Some(SampleEncoding::U32_NE),
        SampleFormat::F32 => Some(SampleEncoding::F32_NE),
        SampleFormat::F64 => Some(SampleEncoding::F64_NE),
        _ => None,
    }
}

fn sample_format_for(encoding: SampleEncoding) -> Option<SampleFormat> {
    use SampleEncoding::*;
    if !encoding.is_native_endian() {
        return None;
    }
    let format = match encoding {
        S8 => SampleFormat::I8,
        U8 => SampleFormat::U8,
        S16LE | S16BE => SampleFormat::I16,
        U16LE | U16BE => SampleFormat::U16,
        S32LE | S32BE => SampleFormat::I32,
        U32LE | U32BE => SampleFormat::U32,
        F32LE | F32BE => SampleFormat::F32,
        F64LE | F64BE => SampleFormat::F64,
    };
    Some(format)
}

/// One CPAL input device, probed lazily.
pub struct CpalInputDevice {
    device: cpal::Device,
    name: String,
}

impl CpalInputDevice {
    pub fn new(device: cpal::Device) -> Result<Self, AudioError> {
        let name = device.name().map_err(|e| AudioError::Probe {
            reason: format!("device name unavailable: {}", e),
        })?;
        Ok(Self { device, name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl InputDevice for CpalInputDevice {
    fn probe(&self) -> Result<DeviceCapabilities, AudioError> {
        let ranges = self
            .device
            .supported_input_configs()
            .map_err(|e| AudioError::Probe {
                reason: format!("{}: {}", self.name, e),
            })?;

        let mut sample_rates = Vec::new();
        let mut encodings = Vec::new();
        let mut channel_counts = Vec::new();
        for range in ranges {
            let rate_range = SampleRateRange {
                min: range.min_sample_rate(),
                max: range.max_sample_rate(),
            };
            if !sample_rates.contains(&rate_range) {
                sample_rates.push(rate_range);
            }
            if let Some(encoding) = encoding_for(range.sample_format()) {
                if !encodings.contains(&encoding) {
                    encodings.push(encoding);
                }
            }
            if !channel_counts.contains(&range.channels()) {
                channel_counts.push(range.channels());
            }
        }
        if sample_rates.is_empty() || encodings.is_empty() || channel_counts.is_empty() {
            return Err(AudioError::Probe {
                reason: format!("device {} advertises no usable input configs", self.name),
            });
        }

        Ok(DeviceCapabilities {
            id: self.name.clone(),
            name: self.name.clone(),
            sample_rates,
            encodings,
            channel_counts,
        })
    }

    fn open_input(
        &self,
        params: StreamParams,
        handler: Arc<dyn ReadHandler>,
    ) -> Result<Box<dyn InputStream>, AudioError> {
        let sample_format =
            sample_format_for(params.encoding).ok_or_else(|| AudioError::UnsupportedEncoding {
                encoding: params.encoding.to_string(),
            })?;

        // The negotiator picks rate and encoding independently; the combined
        // choice must still land inside one advertised config range.
        let mut ranges = self.device.supported_input_configs()?;
        let supported = ranges.any(|range| {
            range.sample_format() == sample_format
                && range.channels() == params.channels
                && range.min_sample_rate() <= params.sample_rate
                && params.sample_rate <= range.max_sample_rate()
        });
        if !supported {
            return Err(AudioError::StreamOpen {
                reason: format!(
                    "device {} does not support {} @ {} Hz with {} channel(s)",
                    self.name, params.encoding, params.sample_rate, params.channels
                ),
            });
        }

        let config = cpal::StreamConfig {
            channels: params.channels,
            sample_rate: params.sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };

        let frame_bytes = params.frame_bytes();
        let read_handler = Arc::clone(&handler);
        let data_fn = move |data: &cpal::Data, _: &cpal::InputCallbackInfo| {
            let bytes = data.bytes();
            let frames = bytes.len() / frame_bytes;
            let mut cursor = SliceCursor::new(bytes, frame_bytes);
            read_handler.on_read(&mut cursor, 0, frames);
        };

        let device_name = self.name.clone();
        let err_fn = move |err: cpal::StreamError| match err {
            // ALSA surfaces input overruns through here
            cpal::StreamError::BackendSpecific { err } => {
                tracing::warn!("device {}: backend stream error: {}", device_name, err);
                handler.on_overflow();
            }
            other => tracing::error!("device {}: stream error: {}", device_name, other),
        };

        let stream = self
            .device
            .build_input_stream_raw(&config, sample_format, data_fn, err_fn, None)?;
        Ok(Box::new(CpalInputStream { stream }))
    }
}

struct CpalInputStream {
    stream: cpal::Stream,
}

impl InputStream for CpalInputStream {
    fn start(&mut self) -> Result<(), AudioError> {
        self.stream.play().map_err(|e| AudioError::StreamStart {
            reason: e.to_string(),
        })
    }
}

fn select_host(backend: &str) -> Result<cpal::Host, AudioError> {
    let mut chosen = None;
    for id in cpal::available_hosts() {
        tracing::info!("available backend: {}", id.name());
        if id.name().eq_ignore_ascii_case(backend) {
            chosen = Some(id);
        }
    }
    let id = chosen.ok_or_else(|| AudioError::BackendUnavailable {
        name: backend.to_string(),
    })?;
    cpal::host_from_id(id).map_err(|e| AudioError::BackendUnavailable {
        name: format!("{}: {}", backend, e),
    })
}

/// Build one monitor per configured device that is actually present. A
/// failure to bring up one device's monitor never aborts the others.
fn build_monitors(
    backend: &str,
    devices: &HashMap<String, String>,
    buffer_seconds: f64,
) -> Result<(Vec<StreamMonitor>, LevelRegistry), AudioError> {
    let host = select_host(backend)?;
    tracing::info!("using backend {}", backend);

    let mut matched: Vec<(String, CpalInputDevice)> = Vec::new();
    for device in host.input_devices()? {
        let device = match CpalInputDevice::new(device) {
            Ok(device) => device,
            Err(e) => {
                tracing::warn!("skipping input device: {}", e);
                continue;
            }
        };
        tracing::info!("found input device: {}", device.name());
        if let Some((key, _)) = devices.iter().find(|(_, name)| name.as_str() == device.name()) {
            matched.push((key.clone(), device));
        }
    }
    for (key, name) in devices {
        if !matched.iter().any(|(k, _)| k == key) {
            tracing::warn!("configured device {} ({}) not present on backend", key, name);
        }
    }

    let mut monitors = Vec::new();
    let mut cells = HashMap::new();
    for (key, device) in matched {
        match StreamMonitor::open(
            &device,
            buffer_seconds,
            &DEFAULT_RATE_PREFERENCES,
            &DEFAULT_ENCODING_PREFERENCES,
        ) {
            Ok(monitor) => {
                cells.insert(key, monitor.handle());
                monitors.push(monitor);
            }
            Err(e) => tracing::error!("monitor for {} failed to initialize: {}", key, e),
        }
    }

    Ok((monitors, LevelRegistry::new(cells)))
}

/// A dedicated thread that owns every input stream. CPAL streams are not
/// `Send`, so they are created, parked, and dropped on this thread while
/// the rest of the process reads levels through the registry's cells.
pub struct MonitorSetThread {
    handle: JoinHandle<()>,
    shutdown: Arc<AtomicBool>,
}

impl MonitorSetThread {
    pub fn spawn(
        backend: &str,
        devices: &HashMap<String, String>,
        buffer_seconds: f64,
    ) -> Result<(Self, LevelRegistry), AudioError> {
        let backend = backend.to_string();
        let devices = devices.clone();
        let running = Arc::new(AtomicBool::new(true));
        let shutdown = Arc::clone(&running);
        let outcome_slot: Arc<RwLock<Option<Result<LevelRegistry, AudioError>>>> =
            Arc::new(RwLock::new(None));
        let outcome_writer = Arc::clone(&outcome_slot);

        let handle = thread::Builder::new()
            .name("level-capture".to_string())
            .spawn(move || match build_monitors(&backend, &devices, buffer_seconds) {
                Ok((monitors, registry)) => {
                    *outcome_writer.write() = Some(Ok(registry));
                    while running.load(Ordering::Relaxed) {
                        thread::sleep(Duration::from_millis(100));
                    }
                    drop(monitors);
                    tracing::info!("level capture thread shutting down");
                }
                Err(e) => {
                    *outcome_writer.write() = Some(Err(e));
                }
            })
            .map_err(|e| AudioError::Fatal(format!("failed to spawn capture thread: {}", e)))?;

        let start = Instant::now();
        loop {
            if let Some(outcome) = outcome_slot.write().take() {
                return outcome.map(|registry| (Self { handle, shutdown }, registry));
            }
            if start.elapsed() > Duration::from_secs(10) {
                shutdown.store(false, Ordering::Relaxed);
                return Err(AudioError::Fatal(
                    "timed out waiting for capture thread startup".to_string(),
                ));
            }
            thread::sleep(Duration::from_millis(50));
        }
    }

    pub fn stop(self) {
        self.shutdown.store(false, Ordering::Relaxed);
        let _ = self.handle.join();
    }
}
