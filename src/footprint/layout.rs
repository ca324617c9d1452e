//! Module grid layout.
//!
//! Converts the symbol matrix (quiet zone included) into one square per drawn
//! module per enabled layer. The N×N block is centred on the footprint
//! origin for both odd and even N: the first module centre sits at
//! `-(N/2 * pixel_size - pixel_size/2)` on each axis, and every following
//! row or column moves by one `pixel_size`.

use crate::barcode::SymbolSize;
use crate::footprint::params::{CopperStyle, QrFootprintParams};
use crate::footprint::Primitive;
use crate::surface::{FilledPolygon, Layer, Point, RectPad, Size};

/// A module that will be drawn, with its physical centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModuleCell {
    /// Matrix row, top to bottom.
    pub row: usize,
    /// Matrix column, left to right.
    pub col: usize,
    /// Module centre (mm).
    pub centre: Point,
}

/// Returns whether a module is drawn.
///
/// Normally dark modules are drawn; a negative footprint draws the light
/// ones instead.
#[must_use]
pub const fn should_draw(negative: bool, dark: bool) -> bool {
    negative ^ dark
}

/// Centre coordinate of the first module along an axis of `count` modules.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn first_module_centre(count: usize, pixel_size: f64) -> f64 {
    let half = count as f64 / 2.0;
    -half.mul_add(pixel_size, -(pixel_size / 2.0))
}

/// Lists the modules to draw, in row-major order.
///
/// `matrix` must have `size.height` rows of `size.width` cells.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn drawn_cells(
    matrix: &[Vec<bool>],
    size: SymbolSize,
    pixel_size: f64,
    negative: bool,
) -> Vec<ModuleCell> {
    debug_assert_eq!(matrix.len(), size.height, "matrix rows must match symbol size");

    let x0 = first_module_centre(size.width, pixel_size);
    let y0 = first_module_centre(size.height, pixel_size);

    matrix
        .iter()
        .enumerate()
        .flat_map(|(row, cells)| {
            debug_assert_eq!(cells.len(), size.width, "matrix columns must match symbol size");
            let y = (row as f64).mul_add(pixel_size, y0);
            cells
                .iter()
                .enumerate()
                .filter(move |&(_, &dark)| should_draw(negative, dark))
                .map(move |(col, _)| ModuleCell {
                    row,
                    col,
                    centre: Point::new((col as f64).mul_add(pixel_size, x0), y),
                })
        })
        .collect()
}

/// Builds the primitives for one module on every enabled layer.
///
/// Copper comes first, then silkscreen.
pub fn module_primitives(params: &QrFootprintParams, centre: Point) -> Vec<Primitive> {
    let mut primitives = Vec::with_capacity(2);

    if params.use_copper_layer {
        primitives.push(match params.copper_style {
            CopperStyle::Polygon => Primitive::Polygon(FilledPolygon::square(
                Layer::FrontCopper,
                params.pixel_size,
                centre,
            )),
            CopperStyle::Pad => Primitive::Pad(RectPad {
                layer: Layer::FrontCopper,
                size: Size::square(params.pixel_size),
                position: centre,
                mask_included: !params.mask_cut_out,
            }),
        });
    }

    if params.use_silk_layer {
        primitives.push(Primitive::Polygon(FilledPolygon::square(
            Layer::FrontSilkscreen,
            params.pixel_size,
            centre,
        )));
    }

    primitives
}

/// Lays out the whole module grid.
#[must_use]
pub fn layout_modules(
    params: &QrFootprintParams,
    matrix: &[Vec<bool>],
    size: SymbolSize,
) -> Vec<Primitive> {
    drawn_cells(matrix, size, params.pixel_size, params.negative)
        .into_iter()
        .flat_map(|cell| module_primitives(params, cell.centre))
        .collect()
}
