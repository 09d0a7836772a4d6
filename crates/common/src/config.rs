//! Tuning files.
//!
//! Every tuning struct in the workspace derives `Deserialize` with
//! `#[serde(default)]`, so a file only needs the fields it overrides.
//! YAML and JSON are both accepted; the extension decides.

use serde::de::DeserializeOwned;
use std::path::Path;

/// Errors from loading or validating tuning files.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unsupported config extension: {0:?}")]
    UnsupportedFormat(String),
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Sanity checks run after a tuning file is parsed.
pub trait Validate {
    fn validate(&self) -> Result<(), ConfigError>;
}

/// Check that a tuning value is strictly positive.
pub fn require_positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("must be > 0, got {value}"),
        })
    }
}

/// Check that a tuning value lies in `[0, 1]`.
pub fn require_unit(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("must be within [0, 1], got {value}"),
        })
    }
}

/// Parse a tuning value from a string in the given format.
pub fn parse_config<T: DeserializeOwned + Validate>(
    text: &str,
    format: ConfigFormat,
) -> Result<T, ConfigError> {
    let value: T = match format {
        ConfigFormat::Json => serde_json::from_str(text)?,
        ConfigFormat::Yaml => serde_yaml::from_str(text)?,
    };
    value.validate()?;
    Ok(value)
}

/// Load and validate a tuning file.
pub fn load_config<T: DeserializeOwned + Validate>(
    path: impl AsRef<Path>,
) -> Result<T, ConfigError> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path)?;
    let text = std::fs::read_to_string(path)?;
    tracing::debug!(path = %path.display(), ?format, "loading config");
    parse_config(&text, format)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => Err(ConfigError::UnsupportedFormat(ext)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Write;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(default)]
    struct Sample {
        speed: f32,
        laps: u32,
    }

    impl Default for Sample {
        fn default() -> Self {
            Self {
                speed: 168.0,
                laps: 3,
            }
        }
    }

    impl Validate for Sample {
        fn validate(&self) -> Result<(), ConfigError> {
            require_positive("speed", self.speed)
        }
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let s: Sample = parse_config("laps: 5\n", ConfigFormat::Yaml).unwrap();
        assert_eq!(s.laps, 5);
        assert_eq!(s.speed, 168.0);
    }

    #[test]
    fn json_file_roundtrip() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "{{\"speed\": 40.0}}").unwrap();
        let s: Sample = load_config(file.path()).unwrap();
        assert_eq!(s.speed, 40.0);
        assert_eq!(s.laps, 3);
    }

    #[test]
    fn yml_extension_is_yaml() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(file, "speed: 12.5").unwrap();
        let s: Sample = load_config(file.path()).unwrap();
        assert_eq!(s.speed, 12.5);
    }

    #[test]
    fn unknown_extension_rejected() {
        let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        let err = load_config::<Sample>(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }

    #[test]
    fn validation_runs_after_parse() {
        let err = parse_config::<Sample>("speed: -1", ConfigFormat::Yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "speed", .. }));
    }

    #[test]
    fn unit_range_check() {
        assert!(require_unit("x", 0.5).is_ok());
        assert!(require_unit("x", 1.5).is_err());
    }
}
