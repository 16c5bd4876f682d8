//! # Configuration Utilities
//!
//! Application settings loaded from a TOML file. Every section falls back to
//! its defaults, so a missing section (or a missing file, see
//! [`AppConfig::load_or_default`]) still yields a usable configuration.
//!
//! ```toml
//! [app]
//! name = "imgpack"
//!
//! [log]
//! level = "info"
//! file = "imgpack.log"
//! max_size = 1048576
//! max_files = 3
//!
//! [codec]
//! embed_ratio = 0.125
//! chunk_size = 4096
//!
//! [codec.frame]
//! preamble = "imgpack"
//! payload_length_width = 10
//!
//! [web]
//! address = "127.0.0.1:3000"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::codec::CodecConfig;

/// Load a TOML configuration file and deserialize it into the specified type.
///
/// # Arguments
/// - `path`: Path to the TOML configuration file
///
/// # Returns
/// - `Ok(T)`: Successfully loaded and parsed configuration
/// - `Err`: File I/O or parsing error
///
/// # Example
/// ```ignore
/// let config: AppConfig = load_config("config/imgpack.toml")?;
/// ```
pub fn load_config<T, P>(path: P) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: T = toml::from_str(&content)
        .with_context(|| format!("parsing config {}", path.display()))?;
    Ok(config)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppInfo,
    pub log: LogConfig,
    pub codec: CodecConfig,
    pub web: WebConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppInfo {
    /// Used as logger name and default log file stem.
    pub name: String,
}

impl Default for AppInfo {
    fn default() -> Self {
        Self {
            name: "imgpack".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default level filter (`error`, `warn`, `info`, `debug`, `trace`).
    /// `RUST_LOG` overrides it.
    pub level: String,
    /// Log file; `None` logs to stderr.
    pub file: Option<PathBuf>,
    /// Rotate the log file once it would grow past this many bytes.
    pub max_size: u64,
    /// Rotated files kept next to the live one.
    pub max_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_size: 1024 * 1024,
            max_files: 3,
        }
    }
}

/// HTTP front end settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub address: String,
    /// Directory served at `/`.
    pub static_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3000".to_string(),
            static_dir: PathBuf::from("static"),
            max_upload_bytes: 16 * 1024 * 1024,
        }
    }
}

impl AppConfig {
    /// Load `path` if given, otherwise the defaults; the codec section is
    /// validated either way.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let config: AppConfig = match path {
            Some(path) => load_config(path)?,
            None => AppConfig::default(),
        };
        config.codec.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_partial_file_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[log]
level = "debug"

[codec]
embed_ratio = 0.25

[codec.frame]
password_length_width = 3
"#
        )
        .unwrap();

        let config = AppConfig::load_or_default(Some(file.path())).unwrap();
        assert_eq!(config.app.name, "imgpack");
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.max_files, 3);
        assert_eq!(config.codec.embed_ratio, 0.25);
        assert_eq!(config.codec.frame.password_length_width, 3);
        assert_eq!(config.codec.frame.preamble, "imgpack");
        assert_eq!(config.web.address, "127.0.0.1:3000");
    }

    #[test]
    fn invalid_codec_section_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[codec]\nembed_ratio = 2.0").unwrap();
        assert!(AppConfig::load_or_default(Some(file.path())).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let missing = Path::new("/nonexistent/imgpack.toml");
        assert!(AppConfig::load_or_default(Some(missing)).is_err());
        assert!(AppConfig::load_or_default(None).is_ok());
    }
}
