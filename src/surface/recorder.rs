//! In-memory drawing surface.
//!
//! [`FootprintBody`] simply keeps every descriptor it is given. It backs the
//! JSON output of the CLI and the MCP tools, the ASCII preview, and most of
//! the tests.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::surface::{
    CourtyardBox, DrawingSurface, FilledPolygon, Layer, Point, RectPad, TextLabel, TextRole,
};

/// Largest preview canvas side, in characters.
const MAX_PREVIEW_CELLS: usize = 400;

/// Everything placed on a footprint, in placement order per kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FootprintBody {
    /// Rectangular pads (copper modules in pad style, mask cutout).
    #[serde(default)]
    pub pads: Vec<RectPad>,

    /// Filled polygons (copper and silkscreen modules).
    #[serde(default)]
    pub polygons: Vec<FilledPolygon>,

    /// Text labels.
    #[serde(default)]
    pub text: Vec<TextLabel>,

    /// Courtyard outlines.
    #[serde(default)]
    pub courtyards: Vec<CourtyardBox>,
}

impl FootprintBody {
    /// Creates an empty body.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pads: Vec::new(),
            polygons: Vec::new(),
            text: Vec::new(),
            courtyards: Vec::new(),
        }
    }

    /// Returns `true` if nothing has been placed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pads.is_empty()
            && self.polygons.is_empty()
            && self.text.is_empty()
            && self.courtyards.is_empty()
    }

    /// Polygons on `layer`.
    pub fn polygons_on(&self, layer: Layer) -> impl Iterator<Item = &FilledPolygon> {
        self.polygons.iter().filter(move |p| p.layer == layer)
    }

    /// Pads on `layer`.
    pub fn pads_on(&self, layer: Layer) -> impl Iterator<Item = &RectPad> {
        self.pads.iter().filter(move |p| p.layer == layer)
    }

    /// The label filling `role`, if placed.
    #[must_use]
    pub fn label(&self, role: TextRole) -> Option<&TextLabel> {
        self.text.iter().find(|t| t.role == role)
    }

    /// Number of module primitives (polygons plus copper pads).
    #[must_use]
    pub fn module_count(&self) -> usize {
        self.polygons.len() + self.pads_on(Layer::FrontCopper).count()
    }

    /// Renders the body as ASCII art with `cell` millimetres per character.
    ///
    /// Each cell is printed twice horizontally so modules look square in a
    /// terminal. Rows grow downwards like KiCad's Y axis.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    #[must_use]
    pub fn render_ascii(&self, cell: f64) -> String {
        if !(cell.is_finite() && cell > 0.0) {
            return "Invalid preview cell size".to_string();
        }

        let Some((min, max)) = self.bounds() else {
            return "Empty footprint (no primitives)".to_string();
        };

        let cols = (((max.x - min.x) / cell).round() as usize).clamp(1, MAX_PREVIEW_CELLS);
        let rows = (((max.y - min.y) / cell).round() as usize).clamp(1, MAX_PREVIEW_CELLS);
        let mut canvas = vec![vec![' '; cols]; rows];

        // Fills every cell whose centre lies inside the rectangle.
        let mut fill = |lo: Point, hi: Point, ch: char| {
            for (r, row) in canvas.iter_mut().enumerate() {
                let cy = (r as f64 + 0.5).mul_add(cell, min.y);
                if cy < lo.y || cy > hi.y {
                    continue;
                }
                for (c, slot) in row.iter_mut().enumerate() {
                    let cx = (c as f64 + 0.5).mul_add(cell, min.x);
                    if cx >= lo.x && cx <= hi.x {
                        *slot = ch;
                    }
                }
            }
        };

        for pad in self.pads_on(Layer::FrontMask) {
            let (lo, hi) = pad_extent(pad);
            fill(lo, hi, '.');
        }
        for poly in self.polygons_on(Layer::FrontSilkscreen) {
            let (lo, hi) = polygon_extent(poly);
            fill(lo, hi, 'o');
        }
        for poly in self.polygons_on(Layer::FrontCopper) {
            let (lo, hi) = polygon_extent(poly);
            fill(lo, hi, '#');
        }
        for pad in self.pads_on(Layer::FrontCopper) {
            let (lo, hi) = pad_extent(pad);
            fill(lo, hi, '#');
        }

        // Courtyard outline along the canvas edge it defines
        if !self.courtyards.is_empty() {
            for (r, row) in canvas.iter_mut().enumerate() {
                for (c, slot) in row.iter_mut().enumerate() {
                    if r == 0 || r == rows - 1 || c == 0 || c == cols - 1 {
                        *slot = '*';
                    }
                }
            }
        }

        let mut output = String::new();
        let _ = writeln!(
            output,
            "Footprint body ({:.2} x {:.2} mm)",
            max.x - min.x,
            max.y - min.y
        );
        let _ = writeln!(
            output,
            "Modules: {}, Pads: {}, Labels: {}",
            self.module_count(),
            self.pads.len(),
            self.text.len()
        );
        for row in &canvas {
            for &ch in row {
                output.push(ch);
                output.push(ch);
            }
            output.push('\n');
        }
        output.push_str("Legend: # = copper, o = silkscreen, . = mask opening, * = courtyard\n");

        output
    }

    /// Bounding box of all placed geometry except text.
    fn bounds(&self) -> Option<(Point, Point)> {
        let extents = self
            .pads
            .iter()
            .map(pad_extent)
            .chain(self.polygons.iter().map(polygon_extent))
            .chain(self.courtyards.iter().map(CourtyardBox::corners));

        extents.fold(None, |acc, (lo, hi)| {
            Some(match acc {
                None => (lo, hi),
                Some((a, b)) => (
                    Point::new(a.x.min(lo.x), a.y.min(lo.y)),
                    Point::new(b.x.max(hi.x), b.y.max(hi.y)),
                ),
            })
        })
    }
}

fn pad_extent(pad: &RectPad) -> (Point, Point) {
    let half_w = pad.size.width / 2.0;
    let half_h = pad.size.height / 2.0;
    (
        Point::new(pad.position.x - half_w, pad.position.y - half_h),
        Point::new(pad.position.x + half_w, pad.position.y + half_h),
    )
}

fn polygon_extent(poly: &FilledPolygon) -> (Point, Point) {
    poly.corners.iter().fold(
        (
            Point::new(f64::INFINITY, f64::INFINITY),
            Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        ),
        |(lo, hi), p| {
            (
                Point::new(lo.x.min(p.x), lo.y.min(p.y)),
                Point::new(hi.x.max(p.x), hi.y.max(p.y)),
            )
        },
    )
}

impl DrawingSurface for FootprintBody {
    fn place_pad(&mut self, pad: RectPad) {
        self.pads.push(pad);
    }

    fn place_polygon(&mut self, polygon: FilledPolygon) {
        self.polygons.push(polygon);
    }

    fn place_text(&mut self, text: TextLabel) {
        self.text.push(text);
    }

    fn place_box(&mut self, courtyard: CourtyardBox) {
        self.courtyards.push(courtyard);
    }
}
