//! Barcode matrix sources.
//!
//! The footprint generator never encodes barcodes itself. It asks a
//! [`MatrixSource`] for a [`Symbol`]: a square grid of dark/light modules
//! without any quiet zone. The quiet zone is added on demand by
//! [`Symbol::matrix`] and [`Symbol::size`], so the layout engine and the
//! footprint assembler always agree on the symbol extent as long as they are
//! given the same [`Border`].
//!
//! # Sources
//!
//! - [`qr::QrEncoder`]: QR and Micro QR via the `qrcode` crate

pub mod qr;

use std::fmt;

use serde::Serialize;
use thiserror::Error;

pub use qr::QrEncoder;

/// Quiet-zone width used when querying a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Border {
    /// Use the recommended quiet zone for the symbol's format.
    Auto,
    /// Use an explicit number of modules on every side.
    Fixed(u32),
}

/// Realized symbol extent in modules, quiet zone included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SymbolSize {
    /// Number of module columns.
    pub width: usize,
    /// Number of module rows.
    pub height: usize,
}

/// Errors returned by a [`MatrixSource`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// There is nothing to encode.
    #[error("cannot encode empty content")]
    EmptyContent,

    /// The content does not fit in the largest allowed symbol.
    #[error("content of {length} bytes exceeds the capacity of the largest {format} symbol")]
    DataTooLong {
        /// Content length in bytes.
        length: usize,
        /// Human-readable format name ("QR" or "QR / Micro QR").
        format: &'static str,
    },

    /// The encoder rejected the content for another reason.
    #[error("content cannot be encoded: {reason}")]
    Unsupported {
        /// Reason reported by the encoding library.
        reason: String,
    },
}

/// Something that turns text into a barcode module grid.
pub trait MatrixSource {
    /// Encodes `content` into a symbol.
    ///
    /// `allow_compact` permits the reduced-capacity compact format (Micro QR)
    /// when the content fits in it.
    ///
    /// # Errors
    ///
    /// Returns an [`EncodeError`] if the content is empty or cannot be encoded.
    fn encode(&self, content: &str, allow_compact: bool) -> Result<Symbol, EncodeError>;
}

/// An encoded barcode symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    /// Side length of the module grid, quiet zone excluded.
    width: usize,
    /// Row-major module colours, `true` for dark.
    modules: Vec<bool>,
    /// Whether this is a compact (Micro QR) symbol.
    compact: bool,
    /// Version label such as "1" or "M3".
    version: String,
    /// Error-correction level label ("L", "M", "Q" or "H").
    ec_level: char,
}

impl Symbol {
    /// Recommended quiet zone for full-size QR symbols.
    pub const QR_QUIET_ZONE: u32 = 4;

    /// Recommended quiet zone for Micro QR symbols.
    pub const MICRO_QR_QUIET_ZONE: u32 = 2;

    /// Creates a symbol from a row-major module grid.
    ///
    /// Returns `None` if `modules.len()` is not `width * width` or the grid
    /// is empty.
    #[must_use]
    pub fn from_modules(
        width: usize,
        modules: Vec<bool>,
        compact: bool,
        version: impl Into<String>,
        ec_level: char,
    ) -> Option<Self> {
        if width == 0 || modules.len() != width * width {
            return None;
        }
        Some(Self {
            width,
            modules,
            compact,
            version: version.into(),
            ec_level,
        })
    }

    /// Side length of the bare module grid.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Whether this is a compact (Micro QR) symbol.
    #[must_use]
    pub const fn is_compact(&self) -> bool {
        self.compact
    }

    /// Version label, e.g. `"1"` or `"M2"`.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Error-correction level label.
    #[must_use]
    pub const fn ec_level(&self) -> char {
        self.ec_level
    }

    /// Recommended quiet-zone width for this symbol's format.
    #[must_use]
    pub const fn recommended_border(&self) -> u32 {
        if self.compact {
            Self::MICRO_QR_QUIET_ZONE
        } else {
            Self::QR_QUIET_ZONE
        }
    }

    /// Resolves a [`Border`] to a module count.
    #[must_use]
    pub const fn border_width(&self, border: Border) -> u32 {
        match border {
            Border::Auto => self.recommended_border(),
            Border::Fixed(n) => n,
        }
    }

    /// Returns the realized size including the quiet zone.
    #[must_use]
    pub fn size(&self, border: Border) -> SymbolSize {
        let side = self.width + 2 * self.border_width(border) as usize;
        SymbolSize {
            width: side,
            height: side,
        }
    }

    /// Returns whether the module at `(row, col)` of the bare grid is dark.
    #[must_use]
    pub fn is_dark(&self, row: usize, col: usize) -> bool {
        row < self.width && col < self.width && self.modules[row * self.width + col]
    }

    /// Returns the module rows, quiet zone included.
    ///
    /// Quiet-zone cells are light. The result has exactly
    /// `self.size(border).height` rows of `self.size(border).width` cells.
    #[must_use]
    pub fn matrix(&self, border: Border) -> Vec<Vec<bool>> {
        let border = self.border_width(border) as usize;
        let side = self.width + 2 * border;

        (0..side)
            .map(|row| {
                (0..side)
                    .map(|col| {
                        row >= border
                            && col >= border
                            && self.is_dark(row - border, col - border)
                    })
                    .collect()
            })
            .collect()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.compact { "Micro QR" } else { "QR" };
        write!(
            f,
            "{kind} version {} ({}x{}, EC {})",
            self.version, self.width, self.width, self.ec_level
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(width: usize) -> Symbol {
        let modules = (0..width * width).map(|i| i % 2 == 0).collect();
        Symbol::from_modules(width, modules, false, "test", 'L').unwrap()
    }

    #[test]
    fn from_modules_rejects_bad_length() {
        assert!(Symbol::from_modules(3, vec![true; 8], false, "1", 'L').is_none());
        assert!(Symbol::from_modules(0, Vec::new(), false, "1", 'L').is_none());
    }

    #[test]
    fn recommended_border_by_format() {
        let qr = checker(21);
        assert_eq!(qr.recommended_border(), 4);

        let micro = Symbol::from_modules(11, vec![false; 121], true, "M1", 'L').unwrap();
        assert_eq!(micro.recommended_border(), 2);
    }

    #[test]
    fn size_includes_border() {
        let symbol = checker(21);
        assert_eq!(symbol.size(Border::Fixed(0)).width, 21);
        assert_eq!(symbol.size(Border::Fixed(1)).width, 23);
        assert_eq!(symbol.size(Border::Auto).width, 29);
        assert_eq!(symbol.size(Border::Auto).height, 29);
    }

    #[test]
    fn matrix_pads_with_light_modules() {
        let symbol = Symbol::from_modules(1, vec![true], false, "x", 'L').unwrap();
        let matrix = symbol.matrix(Border::Fixed(1));

        assert_eq!(matrix.len(), 3);
        assert!(matrix.iter().all(|row| row.len() == 3));
        let dark: usize = matrix.iter().flatten().filter(|&&m| m).count();
        assert_eq!(dark, 1);
        assert!(matrix[1][1]);
    }

    #[test]
    fn matrix_matches_size() {
        let symbol = checker(5);
        for border in [Border::Auto, Border::Fixed(0), Border::Fixed(3)] {
            let size = symbol.size(border);
            let matrix = symbol.matrix(border);
            assert_eq!(matrix.len(), size.height);
            assert!(matrix.iter().all(|row| row.len() == size.width));
        }
    }

    #[test]
    fn display_names_format() {
        let micro = Symbol::from_modules(13, vec![false; 169], true, "M2", 'M').unwrap();
        assert_eq!(micro.to_string(), "Micro QR version M2 (13x13, EC M)");
    }
}
