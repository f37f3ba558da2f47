use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Audio subsystem error: {0}")]
    Audio(#[from] AudioError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fatal error, cannot recover: {0}")]
    Fatal(String),
}

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Backend not available: {name}")]
    BackendUnavailable { name: String },

    #[error("Device not found: {name:?}")]
    DeviceNotFound { name: Option<String> },

    #[error("Device probe failed: {reason}")]
    Probe { reason: String },

    #[error("Encoding not supported: {encoding}")]
    UnsupportedEncoding { encoding: String },

    #[error("Failed to open input stream: {reason}")]
    StreamOpen { reason: String },

    #[error("Failed to start input stream: {reason}")]
    StreamStart { reason: String },

    #[error("Stream read error: {reason}")]
    Read { reason: String },

    #[error("Stream read completion error: {reason}")]
    EndRead { reason: String },

    #[error("Device enumeration error: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("Build stream error: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Supported stream configs error: {0}")]
    SupportedStreamConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[error("Fatal error, cannot recover: {0}")]
    Fatal(String),
}
