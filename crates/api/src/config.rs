//! Server configuration
//!
//! Layered with the `config` crate, lowest priority first:
//! - Built-in defaults
//! - `drowsy.toml` (or the file named by `DROWSY_CONFIG`), optional
//! - `DROWSY__SECTION__KEY` environment variables
//! - `PORT` for the listen port

use config::{Config, ConfigError, Environment, File};
use dms::{DmsConfig, DmsError};
use frame_codec::{DEFAULT_JPEG_QUALITY, DEFAULT_MAX_WIDTH};
use serde::Deserialize;
use tracing::Level;

/// Config file read when `DROWSY_CONFIG` is unset
pub const DEFAULT_CONFIG_FILE: &str = "drowsy.toml";

/// Top-level settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub frame: FrameSettings,
    pub detection: DmsConfig,
    pub logging: LoggingSettings,
}

/// Listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl ServerSettings {
    /// `host:port` bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Frame handling settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FrameSettings {
    /// Frames wider than this are downscaled before detection
    pub max_width: u32,
    /// JPEG quality of the returned frame
    pub jpeg_quality: u8,
    /// Maximum accepted request body (bytes)
    pub max_body_bytes: usize,
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Max level: trace, debug, info, warn, error
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingSettings {
    /// Parsed max level
    pub fn max_level(&self) -> Result<Level, DmsError> {
        self.level.parse::<Level>().map_err(|_| {
            DmsError::Config(format!(
                "logging.level must be one of trace, debug, info, warn, error, got {:?}",
                self.level
            ))
        })
    }
}

impl Settings {
    /// Load from the default file location plus environment
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("DROWSY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&path)
    }

    /// Load from `path` (missing file is fine) plus environment
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("DROWSY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("server.port", std::env::var("PORT").ok())?
            .build()?
            .try_deserialize()
    }

    /// Range checks that cannot be expressed in serde
    pub fn validate(&self) -> Result<(), DmsError> {
        if !(1..=100).contains(&self.frame.jpeg_quality) {
            return Err(DmsError::Config(format!(
                "frame.jpeg_quality must be in 1..=100, got {}",
                self.frame.jpeg_quality
            )));
        }
        self.logging.max_level()?;
        self.detection.validate()
    }
}
