//! QR code footprint generation.
//!
//! Generation runs in two phases:
//!
//! 1. **Planning** ([`FootprintGenerator::plan`]): validate the parameters,
//!    encode the content, resolve the quiet zone, lay out the module grid
//!    ([`layout`]) and the auxiliary geometry ([`assembler`]). Every error
//!    happens here.
//! 2. **Emission** ([`FootprintPlan::emit`]): move every primitive into a
//!    [`DrawingSurface`]. This cannot fail.
//!
//! # Example
//!
//! ```
//! use qrcode_footprint::footprint::{generate, QrFootprintParams};
//! use qrcode_footprint::surface::FootprintBody;
//!
//! let params = QrFootprintParams {
//!     allow_compact_format: false,
//!     ..QrFootprintParams::with_content("Example")
//! };
//! let mut body = FootprintBody::new();
//! let report = generate(&params, &mut body).unwrap();
//!
//! assert_eq!(report.size.width, 29);
//! assert_eq!(body.courtyards.len(), 1);
//! ```

pub mod assembler;
pub mod layout;
pub mod params;

use serde::Serialize;
use tracing::{debug, info, warn};

pub use params::{CopperStyle, QrFootprintParams};

use crate::barcode::{Border, MatrixSource, QrEncoder, Symbol, SymbolSize};
use crate::error::GenerateError;
use crate::surface::{
    CourtyardBox, DrawingSurface, FilledPolygon, KicadFootprint, RectPad, TextLabel,
};

/// One planned drawing operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// A rectangular pad.
    Pad(RectPad),
    /// A filled polygon.
    Polygon(FilledPolygon),
    /// A text label.
    Text(TextLabel),
    /// A courtyard outline.
    Courtyard(CourtyardBox),
}

impl Primitive {
    /// Hands this primitive to `surface`.
    pub fn emit<S: DrawingSurface + ?Sized>(self, surface: &mut S) {
        match self {
            Self::Pad(pad) => surface.place_pad(pad),
            Self::Polygon(polygon) => surface.place_polygon(polygon),
            Self::Text(text) => surface.place_text(text),
            Self::Courtyard(courtyard) => surface.place_box(courtyard),
        }
    }
}

/// Summary of a generated footprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    /// Symbol version label, e.g. "1" or "M2".
    pub version: String,
    /// Whether a Micro QR symbol was produced.
    pub compact: bool,
    /// Error-correction level.
    pub ec_level: char,
    /// Quiet zone actually used, in modules.
    pub border: u32,
    /// Symbol extent in modules, quiet zone included.
    pub size: SymbolSize,
    /// Number of matrix cells drawn.
    pub drawn_cells: usize,
    /// Number of primitives emitted.
    pub primitives: usize,
}

impl GenerationReport {
    /// One-line description suitable for a library item.
    #[must_use]
    pub fn description(&self) -> String {
        let kind = if self.compact { "Micro QR" } else { "QR" };
        format!(
            "{kind} code version {}, {}x{} modules, EC {}",
            self.version, self.size.width, self.size.height, self.ec_level
        )
    }
}

/// A fully planned footprint, ready to emit.
#[derive(Debug, Clone)]
pub struct FootprintPlan {
    /// Parameters with the border resolved.
    pub params: QrFootprintParams,
    /// The encoded symbol.
    pub symbol: Symbol,
    /// Border query used for both the matrix and the size.
    pub border: Border,
    /// Symbol extent in modules.
    pub size: SymbolSize,
    /// Number of matrix cells drawn.
    pub drawn_cells: usize,
    /// Primitives in emission order: modules, cutout, courtyard, labels.
    pub primitives: Vec<Primitive>,
}

impl FootprintPlan {
    /// Summarises the plan.
    #[must_use]
    pub fn report(&self) -> GenerationReport {
        GenerationReport {
            version: self.symbol.version().to_string(),
            compact: self.symbol.is_compact(),
            ec_level: self.symbol.ec_level(),
            border: self.params.border,
            size: self.size,
            drawn_cells: self.drawn_cells,
            primitives: self.primitives.len(),
        }
    }

    /// Moves every primitive into `surface`.
    pub fn emit<S: DrawingSurface + ?Sized>(self, surface: &mut S) {
        for primitive in self.primitives {
            primitive.emit(surface);
        }
    }
}

/// Builds QR code footprints from a [`MatrixSource`].
#[derive(Debug, Clone, Default)]
pub struct FootprintGenerator<M = QrEncoder> {
    source: M,
}

impl<M: MatrixSource> FootprintGenerator<M> {
    /// Creates a generator backed by `source`.
    pub const fn new(source: M) -> Self {
        Self { source }
    }

    /// Plans a footprint without drawing anything.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::InvalidParameter`] for out-of-range
    /// parameters and [`GenerateError::Encoding`] if the content cannot be
    /// encoded.
    pub fn plan(&self, params: &QrFootprintParams) -> Result<FootprintPlan, GenerateError> {
        params.validate()?;

        let symbol = self
            .source
            .encode(&params.content, params.allow_compact_format)?;

        let mut params = params.clone();
        let border = params.resolve_border(&symbol);
        let size = symbol.size(border);
        let matrix = symbol.matrix(border);

        debug!(
            symbol = %symbol,
            border = params.border,
            width = size.width,
            "Resolved symbol"
        );

        if params.draws_nothing() {
            warn!("Neither copper nor silkscreen enabled, footprint body will have no modules");
        }

        let drawn_cells =
            layout::drawn_cells(&matrix, size, params.pixel_size, params.negative).len();
        let mut primitives = layout::layout_modules(&params, &matrix, size);
        primitives.extend(assembler::assemble(&params, size));

        Ok(FootprintPlan {
            params,
            symbol,
            border,
            size,
            drawn_cells,
            primitives,
        })
    }

    /// Plans a footprint and draws it onto `surface`.
    ///
    /// Nothing is drawn if planning fails.
    ///
    /// # Errors
    ///
    /// See [`FootprintGenerator::plan`].
    pub fn generate<S: DrawingSurface + ?Sized>(
        &self,
        params: &QrFootprintParams,
        surface: &mut S,
    ) -> Result<GenerationReport, GenerateError> {
        let plan = self.plan(params)?;
        let report = plan.report();
        plan.emit(surface);

        info!(
            version = %report.version,
            compact = report.compact,
            size = report.size.width,
            primitives = report.primitives,
            "Generated QR footprint"
        );

        Ok(report)
    }
}

/// Generates a footprint with the default QR encoder.
///
/// # Errors
///
/// See [`FootprintGenerator::plan`].
pub fn generate<S: DrawingSurface + ?Sized>(
    params: &QrFootprintParams,
    surface: &mut S,
) -> Result<GenerationReport, GenerateError> {
    FootprintGenerator::<QrEncoder>::default().generate(params, surface)
}

/// Generates a named KiCad footprint with the default QR encoder.
///
/// The footprint description is taken from the [`GenerationReport`].
///
/// # Errors
///
/// See [`FootprintGenerator::plan`].
pub fn generate_kicad(
    params: &QrFootprintParams,
    name: impl Into<String>,
) -> Result<(KicadFootprint, GenerationReport), GenerateError> {
    let mut footprint = KicadFootprint::new(name);
    let report = generate(params, &mut footprint)?;
    footprint.description = Some(report.description());
    Ok((footprint, report))
}
