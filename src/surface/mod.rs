//! Drawing surfaces for generated footprints.
//!
//! The generator never talks to a CAD program directly. It builds immutable
//! placement descriptors ([`RectPad`], [`FilledPolygon`], [`TextLabel`],
//! [`CourtyardBox`]) and hands them to a [`DrawingSurface`], which takes
//! ownership of each one.
//!
//! # Surfaces
//!
//! - [`recorder::FootprintBody`]: in-memory collection, JSON and ASCII preview
//! - [`kicad::KicadFootprint`]: KiCad `.kicad_mod` S-expression output
//!
//! All coordinates are in millimetres with the origin at the footprint centre.

pub mod kicad;
pub mod recorder;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use kicad::{footprint_name_for, KicadFootprint};
pub use recorder::FootprintBody;

/// Board layers a QR footprint draws on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    /// Front copper.
    FrontCopper,
    /// Front solder mask.
    FrontMask,
    /// Front silkscreen.
    FrontSilkscreen,
    /// Front courtyard.
    FrontCourtyard,
    /// Front fabrication drawing.
    FrontFab,
}

impl Layer {
    /// Returns the KiCad canonical layer name.
    #[must_use]
    pub const fn kicad_name(self) -> &'static str {
        match self {
            Self::FrontCopper => "F.Cu",
            Self::FrontMask => "F.Mask",
            Self::FrontSilkscreen => "F.SilkS",
            Self::FrontCourtyard => "F.CrtYd",
            Self::FrontFab => "F.Fab",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kicad_name())
    }
}

/// A 2D point in millimetres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate (mm).
    pub x: f64,
    /// Y coordinate (mm).
    pub y: f64,
}

impl Point {
    /// The footprint origin.
    pub const ORIGIN: Self = Self::new(0.0, 0.0);

    /// Creates a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A width/height pair in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    /// Extent along X (mm).
    pub width: f64,
    /// Extent along Y (mm).
    pub height: f64,
}

impl Size {
    /// Creates a new size.
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Creates a square size.
    #[must_use]
    pub const fn square(side: f64) -> Self {
        Self::new(side, side)
    }
}

/// A rectangular SMD pad.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectPad {
    /// Layer the pad lives on.
    pub layer: Layer,
    /// Pad size.
    pub size: Size,
    /// Pad centre.
    pub position: Point,
    /// Whether the pad also opens the solder mask above it.
    pub mask_included: bool,
}

/// A filled four-corner polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilledPolygon {
    /// Layer the polygon lives on.
    pub layer: Layer,
    /// Outline stroke width (mm), 0 for fill only.
    pub line_width: f64,
    /// Corners in drawing order.
    pub corners: [Point; 4],
}

impl FilledPolygon {
    /// Creates an axis-aligned filled square centred on `centre`.
    #[must_use]
    pub fn square(layer: Layer, side: f64, centre: Point) -> Self {
        let half = side / 2.0;
        Self {
            layer,
            line_width: 0.0,
            corners: [
                Point::new(centre.x + half, centre.y + half),
                Point::new(centre.x + half, centre.y - half),
                Point::new(centre.x - half, centre.y - half),
                Point::new(centre.x - half, centre.y + half),
            ],
        }
    }

    /// Returns the centroid of the corners.
    #[must_use]
    pub fn centre(&self) -> Point {
        let (sx, sy) = self
            .corners
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        Point::new(sx / 4.0, sy / 4.0)
    }
}

/// Which footprint field a text label fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextRole {
    /// The part value (here: the encoded content).
    Value,
    /// The reference designator.
    Reference,
}

/// A text label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLabel {
    /// Field the label fills.
    pub role: TextRole,
    /// Text content.
    pub text: String,
    /// Anchor position.
    pub position: Point,
    /// Glyph height (mm).
    pub height: f64,
    /// Glyph width (mm).
    pub width: f64,
    /// Stroke thickness (mm).
    pub thickness: f64,
    /// Layer the label lives on.
    pub layer: Layer,
}

/// A courtyard outline rectangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourtyardBox {
    /// Rectangle centre.
    pub position: Point,
    /// Rectangle size.
    pub size: Size,
    /// Outline stroke width (mm).
    pub line_width: f64,
}

impl CourtyardBox {
    /// Returns the (min, max) corners.
    #[must_use]
    pub fn corners(&self) -> (Point, Point) {
        let half_w = self.size.width / 2.0;
        let half_h = self.size.height / 2.0;
        (
            Point::new(self.position.x - half_w, self.position.y - half_h),
            Point::new(self.position.x + half_w, self.position.y + half_h),
        )
    }
}

/// A sink for footprint geometry.
///
/// Implementations take ownership of every descriptor they receive. None of
/// the operations can fail: anything that can go wrong (I/O, serialisation)
/// happens after generation, when the surface is exported.
pub trait DrawingSurface {
    /// Places a rectangular pad.
    fn place_pad(&mut self, pad: RectPad);

    /// Places a filled polygon.
    fn place_polygon(&mut self, polygon: FilledPolygon);

    /// Places a text label.
    fn place_text(&mut self, text: TextLabel);

    /// Places the courtyard outline.
    fn place_box(&mut self, courtyard: CourtyardBox);
}

impl<S: DrawingSurface + ?Sized> DrawingSurface for &mut S {
    fn place_pad(&mut self, pad: RectPad) {
        (**self).place_pad(pad);
    }

    fn place_polygon(&mut self, polygon: FilledPolygon) {
        (**self).place_polygon(polygon);
    }

    fn place_text(&mut self, text: TextLabel) {
        (**self).place_text(text);
    }

    fn place_box(&mut self, courtyard: CourtyardBox) {
        (**self).place_box(courtyard);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_corners_and_centre() {
        let poly = FilledPolygon::square(Layer::FrontCopper, 0.5, Point::new(1.0, -2.0));
        assert!((poly.corners[0].x - 1.25).abs() < 1e-12);
        assert!((poly.corners[0].y + 1.75).abs() < 1e-12);
        assert!((poly.corners[2].x - 0.75).abs() < 1e-12);
        assert!((poly.corners[2].y + 2.25).abs() < 1e-12);

        let centre = poly.centre();
        assert!((centre.x - 1.0).abs() < 1e-12);
        assert!((centre.y + 2.0).abs() < 1e-12);
    }

    #[test]
    fn courtyard_corners() {
        let courtyard = CourtyardBox {
            position: Point::ORIGIN,
            size: Size::square(15.0),
            line_width: 0.05,
        };
        let (min, max) = courtyard.corners();
        assert!((min.x + 7.5).abs() < 1e-12);
        assert!((max.y - 7.5).abs() < 1e-12);
    }

    #[test]
    fn layer_names() {
        assert_eq!(Layer::FrontCopper.to_string(), "F.Cu");
        assert_eq!(Layer::FrontCourtyard.kicad_name(), "F.CrtYd");
    }
}
