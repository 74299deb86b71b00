// Configuration module

use crate::watermark::{parse_hex_color, StampStyle, WatermarkError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub watermark: WatermarkConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub signing: SigningConfig,
}

fn default_font_size() -> f64 {
    18.0
}

fn default_opacity() -> f64 {
    0.25
}

fn default_rotation_degrees() -> f64 {
    45.0
}

fn default_color() -> String {
    "#808080".to_string()
}

fn default_stamp_template() -> String {
    "{{viewer}} {{date}}".to_string()
}

/// Stamp appearance and the template resolved into the stamp text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatermarkConfig {
    /// Font size in points (default: 18)
    #[serde(default = "default_font_size")]
    pub font_size: f64,

    /// Stamp layer alpha, 0..1 (default: 0.25)
    #[serde(default = "default_opacity")]
    pub opacity: f64,

    /// Glyph run rotation in degrees (default: 45)
    #[serde(default = "default_rotation_degrees")]
    pub rotation_degrees: f64,

    /// Stamp color as #RGB or #RRGGBB (default: #808080)
    #[serde(default = "default_color")]
    pub color: String,

    /// Template for the stamp text; supports {{viewer}}, {{document}},
    /// {{date}}, {{datetime}}.
    #[serde(default = "default_stamp_template")]
    pub stamp_template: String,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            font_size: default_font_size(),
            opacity: default_opacity(),
            rotation_degrees: default_rotation_degrees(),
            color: default_color(),
            stamp_template: default_stamp_template(),
        }
    }
}

impl WatermarkConfig {
    /// Materialize the configured style, validating it once up front.
    pub fn style(&self) -> Result<StampStyle, WatermarkError> {
        let style = StampStyle {
            font_size: self.font_size,
            opacity: self.opacity,
            rotation_degrees: self.rotation_degrees,
            color: parse_hex_color(&self.color)?,
        };
        style.validate()?;
        Ok(style)
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_originals_prefix() -> String {
    "originals".to_string()
}

fn default_derivatives_prefix() -> String {
    "derivatives".to_string()
}

/// Derivatives carry a viewer-identifying stamp, so retrieval URLs stay
/// short-lived: minutes, not hours (default: 300 seconds).
fn default_url_ttl_seconds() -> u64 {
    300
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base URL signed retrieval links are issued under.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_originals_prefix")]
    pub originals_prefix: String,

    #[serde(default = "default_derivatives_prefix")]
    pub derivatives_prefix: String,

    #[serde(default = "default_url_ttl_seconds")]
    pub url_ttl_seconds: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            originals_prefix: default_originals_prefix(),
            derivatives_prefix: default_derivatives_prefix(),
            url_ttl_seconds: default_url_ttl_seconds(),
        }
    }
}

fn default_signing_secret() -> String {
    // Deliberately unusable: validation rejects it so deployments must set
    // a real secret (typically via ${VAULTMARK_SIGNING_SECRET}).
    String::new()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningConfig {
    /// HMAC secret for signed retrieval URLs.
    #[serde(default = "default_signing_secret")]
    pub secret: String,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            secret: default_signing_secret(),
        }
    }
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        // First, check that all referenced environment variables exist
        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            std::env::var(var_name).map_err(|_| {
                format!(
                    "Environment variable '{}' is referenced but not set",
                    var_name
                )
            })?;
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap() // Safe because we checked above
        });

        let config: Config = serde_yaml::from_str(&substituted).map_err(|e| e.to_string())?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.watermark
            .style()
            .map_err(|e| format!("watermark: {}", e))?;

        if self.watermark.stamp_template.trim().is_empty() {
            return Err("watermark: stamp_template cannot be empty".to_string());
        }

        if self.storage.base_url.is_empty() {
            return Err("storage: base_url cannot be empty".to_string());
        }
        if self.storage.url_ttl_seconds == 0 {
            return Err("storage: url_ttl_seconds must be positive".to_string());
        }
        if self.storage.url_ttl_seconds > 3600 {
            return Err(
                "storage: url_ttl_seconds above one hour defeats the point of short-lived URLs"
                    .to_string(),
            );
        }
        if self.storage.originals_prefix == self.storage.derivatives_prefix {
            return Err("storage: originals and derivatives prefixes must differ".to_string());
        }

        if self.signing.secret.len() < 16 {
            return Err("signing: secret must be at least 16 bytes".to_string());
        }

        Ok(())
    }
}
