use std::fmt;

use levelmon_foundation::AudioError;

/// Wire layout of one raw sample as delivered by the audio backend.
///
/// Multi-byte widths carry an explicit byte order because a backend may hand
/// out foreign-endian buffers (e.g. a FireWire interface behind ALSA).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleEncoding {
    S8,
    U8,
    S16LE,
    S16BE,
    U16LE,
    U16BE,
    S32LE,
    S32BE,
    U32LE,
    U32BE,
    F32LE,
    F32BE,
    F64LE,
    F64BE,
}

impl SampleEncoding {
    #[cfg(target_endian = "little")]
    pub const S16_NE: SampleEncoding = SampleEncoding::S16LE;
    #[cfg(target_endian = "big")]
    pub const S16_NE: SampleEncoding = SampleEncoding::S16BE;

    #[cfg(target_endian = "little")]
    pub const U16_NE: SampleEncoding = SampleEncoding::U16LE;
    #[cfg(target_endian = "big")]
    pub const U16_NE: SampleEncoding = SampleEncoding::U16BE;

    #[cfg(target_endian = "little")]
    pub const S32_NE: SampleEncoding = SampleEncoding::S32LE;
    #[cfg(target_endian = "big")]
    pub const S32_NE: SampleEncoding = SampleEncoding::S32BE;

    #[cfg(target_endian = "little")]
    pub const U32_NE: SampleEncoding = SampleEncoding::U32LE;
    #[cfg(target_endian = "big")]
    pub const U32_NE: SampleEncoding = SampleEncoding::U32BE;

    #[cfg(target_endian = "little")]
    pub const F32_NE: SampleEncoding = SampleEncoding::F32LE;
    #[cfg(target_endian = "big")]
    pub const F32_NE: SampleEncoding = SampleEncoding::F32BE;

    #[cfg(target_endian = "little")]
    pub const F32_FE: SampleEncoding = SampleEncoding::F32BE;
    #[cfg(target_endian = "big")]
    pub const F32_FE: SampleEncoding = SampleEncoding::F32LE;

    #[cfg(target_endian = "little")]
    pub const F64_NE: SampleEncoding = SampleEncoding::F64LE;
    #[cfg(target_endian = "big")]
    pub const F64_NE: SampleEncoding = SampleEncoding::F64BE;

    #[cfg(target_endian = "little")]
    pub const F64_FE: SampleEncoding = SampleEncoding::F64BE;
    #[cfg(target_endian = "big")]
    pub const F64_FE: SampleEncoding = SampleEncoding::F64LE;

    pub const fn bytes_per_sample(self) -> usize {
        use SampleEncoding::*;
        match self {
            S8 | U8 => 1,
            S16LE | S16BE | U16LE | U16BE => 2,
            S32LE | S32BE | U32LE | U32BE | F32LE | F32BE => 4,
            F64LE | F64BE => 8,
        }
    }

    pub const fn is_native_endian(self) -> bool {
        use SampleEncoding::*;
        match self {
            S8 | U8 => true,
            S16LE | U16LE | S32LE | U32LE | F32LE | F64LE => cfg!(target_endian = "little"),
            S16BE | U16BE | S32BE | U32BE | F32BE | F64BE => cfg!(target_endian = "big"),
        }
    }
}

impl fmt::Display for SampleEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use SampleEncoding::*;
        let name = match self {
            S8 => "s8",
            U8 => "u8",
            S16LE => "s16le",
            S16BE => "s16be",
            U16LE => "u16le",
            U16BE => "u16be",
            S32LE => "s32le",
            S32BE => "s32be",
            U32LE => "u32le",
            U32BE => "u32be",
            F32LE => "f32le",
            F32BE => "f32be",
            F64LE => "f64le",
            F64BE => "f64be",
        };
        f.write_str(name)
    }
}

const RANGE_S16: f64 = 32767.0;
// Published levels for 32-bit sources are calibrated against this divisor;
// changing it to i32::MAX would rescale every downstream consumer.
const RANGE_S32: f64 = 65535.0;

fn sample_bytes<const N: usize>(raw: &[u8]) -> Result<[u8; N], AudioError> {
    raw.try_into().map_err(|_| AudioError::Read {
        reason: format!("expected {} sample bytes, got {}", N, raw.len()),
    })
}

/// Decode one raw sample into a normalized f64 amplitude.
///
/// Float layouts are taken at face value (sources deliver them in [-1, 1]
/// by convention); fixed-point layouts are scaled by the range constants
/// above. Anything else fails with `UnsupportedEncoding`, which aborts the
/// current read cycle only.
pub fn decode_sample(encoding: SampleEncoding, raw: &[u8]) -> Result<f64, AudioError> {
    use SampleEncoding::*;
    let value = match encoding {
        F32LE => f32::from_le_bytes(sample_bytes(raw)?) as f64,
        F32BE => f32::from_be_bytes(sample_bytes(raw)?) as f64,
        F64LE => f64::from_le_bytes(sample_bytes(raw)?),
        F64BE => f64::from_be_bytes(sample_bytes(raw)?),
        S16LE => i16::from_le_bytes(sample_bytes(raw)?) as f64 / RANGE_S16,
        S16BE => i16::from_be_bytes(sample_bytes(raw)?) as f64 / RANGE_S16,
        S32LE => i32::from_le_bytes(sample_bytes(raw)?) as f64 / RANGE_S32,
        S32BE => i32::from_be_bytes(sample_bytes(raw)?) as f64 / RANGE_S32,
        other => {
            return Err(AudioError::UnsupportedEncoding {
                encoding: other.to_string(),
            })
        }
    };
    Ok(value)
}
