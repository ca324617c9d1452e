//! QR footprint parameters.
//!
//! One [`QrFootprintParams`] value describes a single footprint. It is built
//! from the configuration file, CLI flags or MCP tool arguments, validated
//! once, and then read-only for the rest of the generation, apart from the
//! border, which [`QrFootprintParams::resolve_border`] overwrites with the
//! recommended quiet zone when `border_auto` is set.

use serde::{Deserialize, Serialize};

use crate::barcode::{Border, Symbol};
use crate::error::GenerateError;

/// Largest explicit quiet zone accepted, in modules.
pub const MAX_BORDER: u32 = 100;

/// How modules on the copper layer are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopperStyle {
    /// Filled square polygons, like the silkscreen modules.
    #[default]
    Polygon,
    /// Rectangular SMD pads.
    Pad,
}

/// Parameters for one QR code footprint.
///
/// Lengths are in millimetres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QrFootprintParams {
    /// Edge length of one module.
    pub pixel_size: f64,

    /// Use the recommended quiet zone instead of `border`.
    pub border_auto: bool,

    /// Quiet-zone width in modules.
    pub border: u32,

    /// Text to encode. Also used as the footprint value.
    pub content: String,

    /// Allow Micro QR when the content fits.
    pub allow_compact_format: bool,

    /// Draw light modules instead of dark ones.
    pub negative: bool,

    /// Draw modules on the front silkscreen.
    pub use_silk_layer: bool,

    /// Draw modules on the front copper.
    pub use_copper_layer: bool,

    /// Open the solder mask over the whole symbol.
    pub mask_cut_out: bool,

    /// Copper module rendering.
    pub copper_style: CopperStyle,

    /// Reference designator text.
    pub reference: String,

    /// Label glyph height.
    pub text_height: f64,

    /// Label glyph width.
    pub text_width: f64,

    /// Label stroke thickness.
    pub text_thickness: f64,
}

impl Default for QrFootprintParams {
    fn default() -> Self {
        Self {
            pixel_size: 0.5,
            border_auto: true,
            border: 4,
            content: "Example".to_string(),
            allow_compact_format: true,
            negative: false,
            use_silk_layer: false,
            use_copper_layer: true,
            mask_cut_out: true,
            copper_style: CopperStyle::Polygon,
            reference: "QR***".to_string(),
            text_height: 1.2,
            text_width: 1.2,
            text_thickness: 0.12,
        }
    }
}

impl QrFootprintParams {
    /// Creates default parameters encoding `content`.
    #[must_use]
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// Validates every physical dimension.
    ///
    /// Content is not checked here; the matrix source rejects content it
    /// cannot encode.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::InvalidParameter`] naming the first bad field.
    pub fn validate(&self) -> Result<(), GenerateError> {
        if !self.pixel_size.is_finite() || self.pixel_size <= 0.0 {
            return Err(GenerateError::invalid_parameter(
                "pixel_size",
                format!("must be greater than 0, got {}", self.pixel_size),
            ));
        }

        if !self.border_auto && self.border > MAX_BORDER {
            return Err(GenerateError::invalid_parameter(
                "border",
                format!("must be at most {MAX_BORDER} modules, got {}", self.border),
            ));
        }

        for (name, value) in [
            ("text_height", self.text_height),
            ("text_width", self.text_width),
            ("text_thickness", self.text_thickness),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(GenerateError::invalid_parameter(
                    name,
                    format!("must be a non-negative length, got {value}"),
                ));
            }
        }

        Ok(())
    }

    /// Returns `true` if no layer will receive modules.
    #[must_use]
    pub const fn draws_nothing(&self) -> bool {
        !self.use_copper_layer && !self.use_silk_layer
    }

    /// Fixes the border for `symbol` and returns the query to use for both
    /// the module matrix and the symbol size.
    ///
    /// With `border_auto`, `border` becomes the symbol's recommended quiet
    /// zone so it can still be reported, and [`Border::Auto`] is returned.
    pub fn resolve_border(&mut self, symbol: &Symbol) -> Border {
        if self.border_auto {
            self.border = symbol.recommended_border();
            Border::Auto
        } else {
            Border::Fixed(self.border)
        }
    }
}
