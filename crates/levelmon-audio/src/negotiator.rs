use levelmon_foundation::AudioError;

use crate::encoding::SampleEncoding;

/// Inclusive range of sample rates a device advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleRateRange {
    pub min: u32,
    pub max: u32,
}

impl SampleRateRange {
    pub fn contains(&self, rate: u32) -> bool {
        self.min <= rate && rate <= self.max
    }
}

/// Snapshot of what a device can do, produced by probing. Immutable.
#[derive(Debug, Clone)]
pub struct DeviceCapabilities {
    pub id: String,
    pub name: String,
    pub sample_rates: Vec<SampleRateRange>,
    pub encodings: Vec<SampleEncoding>,
    pub channel_counts: Vec<u16>,
}

impl DeviceCapabilities {
    pub fn supports_rate(&self, rate: u32) -> bool {
        self.sample_rates.iter().any(|r| r.contains(rate))
    }

    pub fn supports_encoding(&self, encoding: SampleEncoding) -> bool {
        self.encodings.contains(&encoding)
    }
}

/// Negotiated stream parameters, fixed for the lifetime of a monitor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamParams {
    pub encoding: SampleEncoding,
    pub sample_rate: u32,
    pub channels: u16,
}

impl StreamParams {
    pub fn frame_bytes(&self) -> usize {
        self.channels as usize * self.encoding.bytes_per_sample()
    }

    pub fn bytes_per_second(&self) -> usize {
        self.frame_bytes() * self.sample_rate as usize
    }
}

/// Rate preference order: a fixed quality/compatibility ranking, not a
/// promise of optimal quality.
pub const DEFAULT_RATE_PREFERENCES: [u32; 4] = [48000, 44100, 96000, 24000];

/// Format preference order: native-endian floats first, by precision.
pub const DEFAULT_ENCODING_PREFERENCES: [SampleEncoding; 4] = [
    SampleEncoding::F64_NE,
    SampleEncoding::F64_FE,
    SampleEncoding::F32_NE,
    SampleEncoding::F32_FE,
];

/// Pick stream parameters from a device's capabilities.
///
/// The first preferred sample rate any advertised range contains wins;
/// otherwise the maximum of the first advertised range. Likewise the first
/// preferred encoding the device lists, otherwise its first listed encoding.
/// Channels follow the device's first advertised layout. Capability lists
/// that are empty mean the device could not really be probed.
pub fn negotiate(
    caps: &DeviceCapabilities,
    rate_prefs: &[u32],
    encoding_prefs: &[SampleEncoding],
) -> Result<StreamParams, AudioError> {
    let fallback_rate = caps
        .sample_rates
        .first()
        .ok_or_else(|| AudioError::Probe {
            reason: format!("device {} advertises no sample rates", caps.id),
        })?
        .max;
    let sample_rate = rate_prefs
        .iter()
        .copied()
        .find(|&rate| caps.supports_rate(rate))
        .unwrap_or(fallback_rate);

    let encoding = encoding_prefs
        .iter()
        .copied()
        .find(|&encoding| caps.supports_encoding(encoding))
        .or_else(|| caps.encodings.first().copied())
        .ok_or_else(|| AudioError::Probe {
            reason: format!("device {} advertises no sample encodings", caps.id),
        })?;

    let channels = caps
        .channel_counts
        .first()
        .copied()
        .ok_or_else(|| AudioError::Probe {
            reason: format!("device {} advertises no channel layouts", caps.id),
        })?;

    Ok(StreamParams {
        encoding,
        sample_rate,
        channels,
    })
}
