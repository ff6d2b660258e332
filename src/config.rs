//! Configuration file parsing
//!
//! Parses an optional `bluemo.toml`:
//!
//! ```toml
//! [device]
//! port = "dev=/dev/ttyACM0:115200"
//! conn_handle = 2
//! conn_interval_max = 6
//!
//! [files]
//! image = "nvm_data.dat"
//! output = "parsed_data.csv"
//!
//! [decode]
//! chunk_size = 512
//!
//! [erase]
//! probe_size = 0x10
//! ```
//!
//! Every key is optional. Command-line flags win over the file and
//! built-in defaults fill in the rest.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::cli::DeviceArgs;

/// File looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "bluemo.toml";

/// Default flash image path
pub const DEFAULT_IMAGE: &str = "nvm_data.dat";

/// Default decoded output path
pub const DEFAULT_OUTPUT: &str = "parsed_data.csv";

/// Default BLE connection handle
pub const DEFAULT_CONN_HANDLE: u8 = 2;

/// Default maximum connection interval (7.5 ms)
pub const DEFAULT_CONN_INTERVAL_MAX: u16 = 6;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file is not valid TOML or has unexpected keys
    #[error("invalid configuration in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A number does not fit its setting
    #[error("{key} = {value} is out of range")]
    OutOfRange { key: &'static str, value: u32 },

    /// No device link configured
    #[error("no device given (use --port or set [device] port in bluemo.toml)")]
    MissingPort,
}

/// Deserialize an optional u32 that can be hex (0x...) or decimal
fn deserialize_opt_hex_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum HexOrInt {
        Int(u32),
        Str(String),
    }

    match Option::<HexOrInt>::deserialize(deserializer)? {
        None => Ok(None),
        Some(HexOrInt::Int(n)) => Ok(Some(n)),
        Some(HexOrInt::Str(s)) => parse_number(&s).map(Some).map_err(serde::de::Error::custom),
    }
}

/// Parse a number that can be hex (0x...) or decimal
fn parse_number(s: &str) -> Result<u32, String> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("invalid hex: {}", e))
    } else {
        s.parse().map_err(|e| format!("invalid number: {}", e))
    }
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
struct DeviceSection {
    port: Option<String>,
    #[serde(deserialize_with = "deserialize_opt_hex_u32")]
    conn_handle: Option<u32>,
    #[serde(deserialize_with = "deserialize_opt_hex_u32")]
    conn_interval_max: Option<u32>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FilesSection {
    image: Option<PathBuf>,
    output: Option<PathBuf>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
struct DecodeSection {
    #[serde(deserialize_with = "deserialize_opt_hex_u32")]
    chunk_size: Option<u32>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
struct EraseSection {
    #[serde(deserialize_with = "deserialize_opt_hex_u32")]
    probe_size: Option<u32>,
}

/// Contents of a configuration file
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    device: DeviceSection,
    files: FilesSection,
    decode: DecodeSection,
    erase: EraseSection,
}

/// Resolved device link settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSettings {
    /// Connection string
    pub port: String,
    /// BLE connection handle
    pub conn_handle: u8,
    /// Maximum connection interval in 1.25 ms units
    pub conn_interval_max: u16,
}

impl Config {
    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load a configuration file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the explicit file, else `./bluemo.toml` if it exists, else defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            let config = Self::from_file(path)?;
            log::info!("Loaded configuration from {:?}", path);
            return Ok(config);
        }

        let default = Path::new(DEFAULT_CONFIG_FILE);
        if default.is_file() {
            let config = Self::from_file(default)?;
            log::debug!("Loaded configuration from {:?}", default);
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Merge device flags over the file
    pub fn device(&self, args: &DeviceArgs) -> Result<DeviceSettings, ConfigError> {
        let port = args
            .port
            .clone()
            .or_else(|| self.device.port.clone())
            .ok_or(ConfigError::MissingPort)?;

        let conn_handle = match args.conn_handle {
            Some(handle) => handle,
            None => narrow("device.conn_handle", self.device.conn_handle)?
                .unwrap_or(DEFAULT_CONN_HANDLE),
        };

        let conn_interval_max = match args.conn_interval_max {
            Some(interval) => interval,
            None => narrow("device.conn_interval_max", self.device.conn_interval_max)?
                .unwrap_or(DEFAULT_CONN_INTERVAL_MAX),
        };

        Ok(DeviceSettings {
            port,
            conn_handle,
            conn_interval_max,
        })
    }

    /// Flash image path
    pub fn image(&self, flag: Option<PathBuf>) -> PathBuf {
        flag.or_else(|| self.files.image.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_IMAGE))
    }

    /// Decoded output path
    pub fn output(&self, flag: Option<PathBuf>) -> PathBuf {
        flag.or_else(|| self.files.output.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT))
    }

    /// Decoder chunk size
    pub fn chunk_size(&self, flag: Option<usize>) -> usize {
        flag.or(self.decode.chunk_size.map(|n| n as usize))
            .unwrap_or(bluemo_yasp::DEFAULT_CHUNK_SIZE)
    }

    /// Erase probe size
    pub fn probe_size(&self, flag: Option<u32>) -> u32 {
        flag.or(self.erase.probe_size)
            .unwrap_or(bluemo_core::flash::DEFAULT_PROBE_SIZE)
    }
}

fn narrow<T: TryFrom<u32>>(key: &'static str, value: Option<u32>) -> Result<Option<T>, ConfigError> {
    value
        .map(|v| T::try_from(v).map_err(|_| ConfigError::OutOfRange { key, value: v }))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.image(None), PathBuf::from("nvm_data.dat"));
        assert_eq!(config.output(None), PathBuf::from("parsed_data.csv"));
        assert_eq!(config.chunk_size(None), 512);
        assert_eq!(config.probe_size(None), 16);
        assert!(matches!(
            config.device(&DeviceArgs::default()),
            Err(ConfigError::MissingPort)
        ));
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_toml_str(
            r#"
            [device]
            port = "ip=localhost:5000"
            conn_handle = "0x03"
            conn_interval_max = 12

            [files]
            image = "image.bin"
            output = "out.csv"

            [decode]
            chunk_size = "0x100"

            [erase]
            probe_size = 32
            "#,
        )
        .unwrap();

        let device = config.device(&DeviceArgs::default()).unwrap();
        assert_eq!(
            device,
            DeviceSettings {
                port: "ip=localhost:5000".into(),
                conn_handle: 3,
                conn_interval_max: 12,
            }
        );
        assert_eq!(config.image(None), PathBuf::from("image.bin"));
        assert_eq!(config.output(None), PathBuf::from("out.csv"));
        assert_eq!(config.chunk_size(None), 256);
        assert_eq!(config.probe_size(None), 32);
    }

    #[test]
    fn test_flags_override_file() {
        let config = Config::from_toml_str(
            r#"
            [device]
            port = "dev=/dev/ttyACM0"
            conn_handle = 2
            [decode]
            chunk_size = 1024
            "#,
        )
        .unwrap();

        let args = DeviceArgs {
            port: Some("dev=/dev/ttyUSB1:921600".into()),
            conn_handle: Some(5),
            conn_interval_max: None,
        };
        let device = config.device(&args).unwrap();
        assert_eq!(device.port, "dev=/dev/ttyUSB1:921600");
        assert_eq!(device.conn_handle, 5);
        assert_eq!(device.conn_interval_max, DEFAULT_CONN_INTERVAL_MAX);
        assert_eq!(config.chunk_size(Some(1)), 1);
        assert_eq!(config.image(Some("x.dat".into())), PathBuf::from("x.dat"));
    }

    #[test]
    fn test_out_of_range() {
        let config = Config::from_toml_str(
            r#"
            [device]
            port = "dev=/dev/ttyACM0"
            conn_handle = 300
            "#,
        )
        .unwrap();
        assert!(matches!(
            config.device(&DeviceArgs::default()),
            Err(ConfigError::OutOfRange {
                key: "device.conn_handle",
                value: 300
            })
        ));
    }

    #[test]
    fn test_rejects_unknown_keys_and_bad_numbers() {
        assert!(Config::from_toml_str("[device]\nbaud = 9600\n").is_err());
        assert!(Config::from_toml_str("[erase]\nprobe_size = \"0xZZ\"\n").is_err());
    }

    #[test]
    fn test_from_file_names_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[files]\nimage = 5").unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains(&file.path().display().to_string()));

        let missing = Config::from_file(Path::new("/nonexistent/bluemo.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Read { .. }));
    }
}
