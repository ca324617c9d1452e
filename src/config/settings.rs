//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::footprint::QrFootprintParams;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Default footprint parameters.
    #[serde(default)]
    pub barcode: QrFootprintParams,

    /// Output settings.
    #[serde(default)]
    pub output: OutputConfig,

    /// Directories the MCP server may write footprints into.
    #[serde(default)]
    pub allowed_paths: Vec<PathBuf>,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.barcode
            .validate()
            .map_err(|e| ConfigError::ValidationError {
                message: format!("barcode: {e}"),
            })?;

        if let Some(name) = &self.output.footprint_name {
            if name.trim().is_empty() {
                return Err(ConfigError::ValidationError {
                    message: "output.footprint_name cannot be empty".to_string(),
                });
            }
        }

        if let Some(cell) = self.output.preview_cell {
            if !(cell.is_finite() && cell > 0.0) {
                return Err(ConfigError::ValidationError {
                    message: format!("output.preview_cell must be greater than 0, got {cell}"),
                });
            }
        }

        Ok(())
    }
}

/// Output file format for the `generate` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// KiCad `.kicad_mod` footprint.
    #[default]
    Kicad,
    /// JSON dump of the placed primitives.
    Json,
}

/// Output configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Footprint name. Derived from the content when unset.
    #[serde(default)]
    pub footprint_name: Option<String>,

    /// Default output format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Millimetres per character in ASCII previews. One module when unset.
    #[serde(default)]
    pub preview_cell: Option<f64>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::footprint::CopperStyle;

    #[test]
    fn parse_minimal_config() {
        let json = r"{}";
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.barcode, QrFootprintParams::default());
    }

    #[test]
    fn parse_full_config() {
        let json = r#"{
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "_comment": "Test config",
            "barcode": {
                "pixel_size": 0.4,
                "border_auto": false,
                "border": 2,
                "content": "https://example.com",
                "allow_compact_format": false,
                "negative": true,
                "use_silk_layer": true,
                "use_copper_layer": true,
                "mask_cut_out": false,
                "copper_style": "pad",
                "reference": "QR1",
                "text_height": 1.0,
                "text_width": 1.0,
                "text_thickness": 0.15
            },
            "output": {
                "footprint_name": "QR_Website",
                "format": "json",
                "preview_cell": 0.4
            },
            "allowed_paths": ["/tmp/footprints"],
            "logging": {
                "level": "debug"
            }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert!((config.barcode.pixel_size - 0.4).abs() < f64::EPSILON);
        assert!(!config.barcode.border_auto);
        assert_eq!(config.barcode.copper_style, CopperStyle::Pad);
        assert_eq!(config.output.footprint_name.as_deref(), Some("QR_Website"));
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.allowed_paths, vec![PathBuf::from("/tmp/footprints")]);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn output_config_defaults() {
        let config = OutputConfig::default();
        assert!(config.footprint_name.is_none());
        assert_eq!(config.format, OutputFormat::Kicad);
        assert!(config.preview_cell.is_none());
    }

    #[test]
    fn logging_config_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "warn");
    }

    #[test]
    fn reject_invalid_pixel_size() {
        let json = r#"{
            "barcode": {
                "pixel_size": -1.0
            }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("pixel_size"));
    }

    #[test]
    fn reject_zero_preview_cell() {
        let json = r#"{ "output": { "preview_cell": 0.0 } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_empty_footprint_name() {
        let json = r#"{ "output": { "footprint_name": "  " } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_unknown_fields() {
        let json = r#"{
            "unknown_field": "value"
        }"#;

        let result: Result<Config, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
