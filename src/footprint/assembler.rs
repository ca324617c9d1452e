//! Auxiliary footprint geometry: mask cutout, courtyard and labels.
//!
//! Everything here is sized from the same [`SymbolSize`] the module layout
//! used, so the auxiliary geometry always lines up with the drawn modules.

use crate::barcode::SymbolSize;
use crate::footprint::params::QrFootprintParams;
use crate::footprint::Primitive;
use crate::surface::{CourtyardBox, Layer, Point, RectPad, Size, TextLabel, TextRole};

/// Courtyard clearance on each side of the symbol (mm).
pub const COURTYARD_CLEARANCE: f64 = 0.25;

/// Grid the courtyard side length is rounded to (mm).
///
/// Halving a multiple of 0.10 puts the rectangle corners on a 0.05 mm grid.
pub const COURTYARD_GRID: f64 = 0.10;

/// Courtyard outline width (mm).
pub const COURTYARD_LINE_WIDTH: f64 = 0.05;

/// Layer carrying the value and reference labels.
pub const LABEL_LAYER: Layer = Layer::FrontFab;

/// Rounds a value to the nearest multiple of step.
#[must_use]
pub fn round_to(value: f64, step: f64) -> f64 {
    (value / step).round() * step
}

/// Physical extent of the symbol, quiet zone included.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn symbol_extent(params: &QrFootprintParams, size: SymbolSize) -> Size {
    Size::new(
        params.pixel_size * size.width as f64,
        params.pixel_size * size.height as f64,
    )
}

/// One solder-mask opening covering the whole symbol.
///
/// Only produced when the copper layer is used and the cutout is enabled.
#[must_use]
pub fn mask_cutout(params: &QrFootprintParams, size: SymbolSize) -> Option<RectPad> {
    (params.use_copper_layer && params.mask_cut_out).then(|| RectPad {
        layer: Layer::FrontMask,
        size: symbol_extent(params, size),
        position: Point::ORIGIN,
        mask_included: false,
    })
}

/// Courtyard side length before grid rounding.
#[must_use]
pub fn courtyard_side_unsnapped(params: &QrFootprintParams, size: SymbolSize) -> f64 {
    2.0f64.mul_add(COURTYARD_CLEARANCE, symbol_extent(params, size).width)
}

/// Square courtyard centred on the origin.
#[must_use]
pub fn courtyard(params: &QrFootprintParams, size: SymbolSize) -> CourtyardBox {
    let side = round_to(courtyard_side_unsnapped(params, size), COURTYARD_GRID);
    CourtyardBox {
        position: Point::ORIGIN,
        size: Size::square(side),
        line_width: COURTYARD_LINE_WIDTH,
    }
}

/// Vertical distance of both labels from the origin.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn label_offset(params: &QrFootprintParams, size: SymbolSize) -> f64 {
    let half = size.width as f64 / 2.0;
    (1.0 + half).mul_add(params.pixel_size, params.text_height)
}

/// Value label (the content) and reference label.
///
/// The value sits at `-offset`, the reference at `+offset`.
#[must_use]
pub fn labels(params: &QrFootprintParams, size: SymbolSize) -> [TextLabel; 2] {
    let offset = label_offset(params, size);
    let label = |role, text: &str, y| TextLabel {
        role,
        text: text.to_string(),
        position: Point::new(0.0, y),
        height: params.text_height,
        width: params.text_width,
        thickness: params.text_thickness,
        layer: LABEL_LAYER,
    };

    [
        label(TextRole::Value, &params.content, -offset),
        label(TextRole::Reference, &params.reference, offset),
    ]
}

/// All auxiliary primitives: cutout, courtyard, then labels.
#[must_use]
pub fn assemble(params: &QrFootprintParams, size: SymbolSize) -> Vec<Primitive> {
    let mut primitives = Vec::with_capacity(4);
    if let Some(cutout) = mask_cutout(params, size) {
        primitives.push(Primitive::Pad(cutout));
    }
    primitives.push(Primitive::Courtyard(courtyard(params, size)));
    primitives.extend(labels(params, size).into_iter().map(Primitive::Text));
    primitives
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE_29: SymbolSize = SymbolSize {
        width: 29,
        height: 29,
    };

    #[test]
    fn round_to_works() {
        assert!((round_to(14.99, 0.10) - 15.0).abs() < 1e-9);
        assert!((round_to(15.04, 0.10) - 15.0).abs() < 1e-9);
        assert!((round_to(15.06, 0.10) - 15.1).abs() < 1e-9);
    }

    #[test]
    fn cutout_covers_symbol() {
        let params = QrFootprintParams::default();
        let cutout = mask_cutout(&params, SIZE_29).unwrap();
        assert_eq!(cutout.layer, Layer::FrontMask);
        assert!((cutout.size.width - 14.5).abs() < 1e-12);
        assert!((cutout.size.height - 14.5).abs() < 1e-12);
        assert_eq!(cutout.position, Point::ORIGIN);
    }

    #[test]
    fn cutout_needs_copper_and_flag() {
        let no_copper = QrFootprintParams {
            use_copper_layer: false,
            ..QrFootprintParams::default()
        };
        assert!(mask_cutout(&no_copper, SIZE_29).is_none());

        let no_cutout = QrFootprintParams {
            mask_cut_out: false,
            ..QrFootprintParams::default()
        };
        assert!(mask_cutout(&no_cutout, SIZE_29).is_none());
    }

    #[test]
    fn courtyard_adds_clearance_and_snaps() {
        let params = QrFootprintParams::default();
        assert!((courtyard_side_unsnapped(&params, SIZE_29) - 15.0).abs() < 1e-12);

        let odd = QrFootprintParams {
            pixel_size: 0.33,
            ..QrFootprintParams::default()
        };
        // 0.33 * 29 + 0.5 = 10.07
        assert!((courtyard_side_unsnapped(&odd, SIZE_29) - 10.07).abs() < 1e-9);
        let cy = courtyard(&odd, SIZE_29);
        assert!((cy.size.width - 10.1).abs() < 1e-9);
        assert!((cy.line_width - 0.05).abs() < f64::EPSILON);
    }

    #[test]
    fn labels_are_symmetric() {
        let params = QrFootprintParams::default();
        // 1.2 + (1 + 14.5) * 0.5
        assert!((label_offset(&params, SIZE_29) - 8.95).abs() < 1e-12);

        let [value, reference] = labels(&params, SIZE_29);
        assert_eq!(value.role, TextRole::Value);
        assert_eq!(value.text, "Example");
        assert!((value.position.y + 8.95).abs() < 1e-12);
        assert_eq!(reference.text, "QR***");
        assert!((reference.position.y - 8.95).abs() < 1e-12);
        assert_eq!(reference.layer, Layer::FrontFab);
    }

    #[test]
    fn assemble_order() {
        let prims = assemble(&QrFootprintParams::default(), SIZE_29);
        assert_eq!(prims.len(), 4);
        assert!(matches!(prims[0], Primitive::Pad(_)));
        assert!(matches!(prims[1], Primitive::Courtyard(_)));
        assert!(matches!(prims[2], Primitive::Text(_)));
    }
}
