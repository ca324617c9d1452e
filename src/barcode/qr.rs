//! QR and Micro QR encoding via the `qrcode` crate.
//!
//! Version selection picks the smallest symbol that holds the content at
//! error-correction level L. Micro QR versions M1–M4 are tried first when the
//! caller allows the compact format. With `boost_error` enabled (the default)
//! the error-correction level is then raised as far as the chosen version
//! allows, so a larger symbol is never selected just to gain redundancy.

use qrcode::types::QrError;
use qrcode::{Color, EcLevel, QrCode, Version};
use tracing::debug;

use crate::barcode::{EncodeError, MatrixSource, Symbol};

/// Highest Micro QR version.
const MAX_MICRO_VERSION: i16 = 4;

/// Levels tried when boosting, strongest first.
const BOOST_ORDER: [EcLevel; 3] = [EcLevel::H, EcLevel::Q, EcLevel::M];

/// [`MatrixSource`] producing QR and Micro QR symbols.
#[derive(Debug, Clone, Copy)]
pub struct QrEncoder {
    /// Raise the error-correction level while the version stays the same.
    pub boost_error: bool,
}

impl QrEncoder {
    /// Creates an encoder with error-correction boosting enabled.
    #[must_use]
    pub const fn new() -> Self {
        Self { boost_error: true }
    }

    /// Tries every Micro QR version in ascending order.
    fn encode_micro(content: &str) -> Option<QrCode> {
        (1..=MAX_MICRO_VERSION).find_map(|v| {
            QrCode::with_version(content, Version::Micro(v), EcLevel::L)
                .map_err(|e| debug!(version = v, error = %e, "Micro QR version rejected"))
                .ok()
        })
    }

    /// Picks the smallest full-size QR version.
    fn encode_full(content: &str) -> Result<QrCode, QrError> {
        QrCode::with_error_correction_level(content, EcLevel::L)
    }

    /// Re-encodes at the strongest level that fits the same version.
    fn boost(content: &str, code: QrCode) -> QrCode {
        let version = code.version();
        BOOST_ORDER
            .iter()
            .filter(|&&level| level > code.error_correction_level())
            .find_map(|&level| QrCode::with_version(content, version, level).ok())
            .unwrap_or(code)
    }
}

impl Default for QrEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MatrixSource for QrEncoder {
    fn encode(&self, content: &str, allow_compact: bool) -> Result<Symbol, EncodeError> {
        if content.is_empty() {
            return Err(EncodeError::EmptyContent);
        }

        let micro = if allow_compact {
            Self::encode_micro(content)
        } else {
            None
        };

        let code = match micro {
            Some(code) => code,
            None => Self::encode_full(content).map_err(|e| match e {
                QrError::DataTooLong => EncodeError::DataTooLong {
                    length: content.len(),
                    format: if allow_compact { "QR / Micro QR" } else { "QR" },
                },
                other => EncodeError::Unsupported {
                    reason: other.to_string(),
                },
            })?,
        };

        let code = if self.boost_error {
            Self::boost(content, code)
        } else {
            code
        };

        let symbol = to_symbol(&code).ok_or_else(|| EncodeError::Unsupported {
            reason: "encoder returned a malformed module grid".to_string(),
        })?;

        debug!(
            version = symbol.version(),
            ec_level = %symbol.ec_level(),
            width = symbol.width(),
            "Encoded barcode symbol"
        );

        Ok(symbol)
    }
}

/// Converts a `qrcode` result into a [`Symbol`].
fn to_symbol(code: &QrCode) -> Option<Symbol> {
    let (compact, version) = match code.version() {
        Version::Normal(v) => (false, v.to_string()),
        Version::Micro(v) => (true, format!("M{v}")),
    };
    let modules = code
        .to_colors()
        .into_iter()
        .map(|c| c == Color::Dark)
        .collect();

    Symbol::from_modules(
        code.width(),
        modules,
        compact,
        version,
        ec_label(code.error_correction_level()),
    )
}

const fn ec_label(level: EcLevel) -> char {
    match level {
        EcLevel::L => 'L',
        EcLevel::M => 'M',
        EcLevel::Q => 'Q',
        EcLevel::H => 'H',
    }
}
