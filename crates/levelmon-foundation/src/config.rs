use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;

use crate::error::AppError;

/// Deployment configuration, loaded from a JSON file.
///
/// Keys are PascalCase to stay compatible with existing config.json files
/// written for earlier deployments of this service.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    /// Audio backend (host) name, e.g. "ALSA" or "JACK".
    pub backend: String,
    /// Length of one measurement window in seconds.
    pub buffer_length: f64,
    /// Logical key -> hardware device name.
    pub devices: HashMap<String, String>,
    pub bind: String,
    pub port: u16,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let file = File::open(path)
            .map_err(|e| AppError::Config(format!("open {}: {}", path.display(), e)))?;
        let cfg: Config = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| AppError::Config(format!("parse {}: {}", path.display(), e)))?;
        if cfg.buffer_length <= 0.0 {
            return Err(AppError::Config(
                "BufferLength must be a positive number of seconds".to_string(),
            ));
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_full_config() {
        let file = write_config(
            r#"{
                "Backend": "ALSA",
                "BufferLength": 0.25,
                "Devices": { "studio1": "hw:CARD=Scarlett,DEV=0" },
                "Bind": "0.0.0.0",
                "Port": 8080
            }"#,
        );
        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.backend, "ALSA");
        assert_eq!(cfg.buffer_length, 0.25);
        assert_eq!(cfg.devices["studio1"], "hw:CARD=Scarlett,DEV=0");
        assert_eq!(cfg.bind, "0.0.0.0");
        assert_eq!(cfg.port, 8080);
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = Config::load(Path::new("/nonexistent/config.json")).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let file = write_config("{ not json");
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn rejects_non_positive_buffer_length() {
        let file = write_config(
            r#"{
                "Backend": "ALSA",
                "BufferLength": 0.0,
                "Devices": {},
                "Bind": "127.0.0.1",
                "Port": 8080
            }"#,
        );
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
