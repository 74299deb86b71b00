//! Stamp style: font size, opacity, rotation, color.
//!
//! Hex color parsing supports #RGB and #RRGGBB, matching what operators put
//! in configuration files.

use super::WatermarkError;
use serde::{Deserialize, Serialize};

/// RGB color for the stamp text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Mid gray, the conventional watermark color.
    pub fn gray() -> Self {
        Self::new(128, 128, 128)
    }

    /// Components scaled to the 0..1 range used by render backends.
    pub fn to_unit_rgb(self) -> (f64, f64, f64) {
        (
            f64::from(self.r) / 255.0,
            f64::from(self.g) / 255.0,
            f64::from(self.b) / 255.0,
        )
    }
}

/// Parse a hex color string into RGB components.
///
/// Supports both #RGB and #RRGGBB formats.
pub fn parse_hex_color(hex: &str) -> Result<Color, WatermarkError> {
    let hex = hex
        .strip_prefix('#')
        .ok_or_else(|| WatermarkError::InvalidStyle("color must start with '#'".to_string()))?;

    let digit = |s: &str| {
        u8::from_str_radix(s, 16)
            .map_err(|_| WatermarkError::InvalidStyle(format!("invalid hex digit in '#{}'", hex)))
    };

    match hex.len() {
        3 => {
            // #RGB: each digit doubled, 0xF -> 0xFF
            let r = digit(&hex[0..1])?;
            let g = digit(&hex[1..2])?;
            let b = digit(&hex[2..3])?;
            Ok(Color::new(r * 17, g * 17, b * 17))
        }
        6 => {
            let r = digit(&hex[0..2])?;
            let g = digit(&hex[2..4])?;
            let b = digit(&hex[4..6])?;
            Ok(Color::new(r, g, b))
        }
        _ => Err(WatermarkError::InvalidStyle(format!(
            "color must be #RGB or #RRGGBB, got {} characters",
            hex.len()
        ))),
    }
}

/// Render parameters for one stamp pass. One style applies to every tile on
/// every page of a render.
#[derive(Debug, Clone, PartialEq)]
pub struct StampStyle {
    /// Font size in points.
    pub font_size: f64,
    /// Alpha for the stamp layer, 0.0 (invisible) to 1.0 (opaque).
    pub opacity: f64,
    /// Counter-clockwise rotation of each glyph run, in degrees.
    pub rotation_degrees: f64,
    /// Stamp text color.
    pub color: Color,
}

impl Default for StampStyle {
    fn default() -> Self {
        Self {
            font_size: 18.0,
            opacity: 0.25,
            rotation_degrees: 45.0,
            color: Color::gray(),
        }
    }
}

impl StampStyle {
    /// Reject styles the renderer cannot honor before touching any page.
    pub fn validate(&self) -> Result<(), WatermarkError> {
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(WatermarkError::InvalidStyle(format!(
                "font size {} must be positive",
                self.font_size
            )));
        }
        if !self.opacity.is_finite() || !(0.0..=1.0).contains(&self.opacity) {
            return Err(WatermarkError::InvalidStyle(format!(
                "opacity {} out of range 0..1",
                self.opacity
            )));
        }
        if !self.rotation_degrees.is_finite() {
            return Err(WatermarkError::InvalidStyle(
                "rotation must be finite".to_string(),
            ));
        }
        Ok(())
    }
}
