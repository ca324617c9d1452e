//! KiCad footprint (`.kicad_mod`) output.
//!
//! Renders a [`FootprintBody`] as a KiCad 6+ S-expression footprint:
//!
//! ```text
//! (footprint "QR_Example" (version 20211014) (generator qrcode_footprint)
//!   (layer "F.Cu")
//!   (fp_text reference "QR***" (at 0 8.45) (layer "F.Fab") ...)
//!   (fp_text value "Example" (at 0 -8.45) (layer "F.Fab") ...)
//!   (fp_rect (start -7.5 -7.5) (end 7.5 7.5) (layer "F.CrtYd") ...)
//!   (fp_poly (pts (xy ..) ..) (layer "F.Cu") (width 0) (fill solid))
//!   (pad "" smd rect (at 0 0) (size 14.5 14.5) (layers "F.Mask"))
//! )
//! ```

use std::fmt::Write;
use std::path::Path;

use tracing::info;

use crate::error::ExportError;
use crate::surface::{
    CourtyardBox, DrawingSurface, FilledPolygon, FootprintBody, RectPad, TextLabel, TextRole,
};

/// File format version written in the header.
pub const KICAD_FORMAT_VERSION: u32 = 20_211_014;

/// Generator token written in the header.
pub const GENERATOR: &str = "qrcode_footprint";

/// Longest footprint name [`footprint_name_for`] produces.
const MAX_DERIVED_NAME: usize = 40;

/// Derives a library-safe footprint name from the encoded content.
///
/// Characters outside `[A-Za-z0-9_-]` become `_`, runs collapse to one,
/// and the result is prefixed with `QR_`.
#[must_use]
pub fn footprint_name_for(content: &str) -> String {
    let mut name = String::from("QR_");
    for ch in content.chars() {
        if name.len() >= MAX_DERIVED_NAME {
            break;
        }
        if ch.is_ascii_alphanumeric() || ch == '-' {
            name.push(ch);
        } else if !name.ends_with('_') {
            name.push('_');
        }
    }
    if name.len() > 3 && name.ends_with('_') {
        name.pop();
    }
    if name.len() == 3 {
        name.push_str("Code");
    }
    name
}

/// A KiCad footprint being drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct KicadFootprint {
    /// Footprint name (library item name).
    pub name: String,
    /// Optional description (`descr`).
    pub description: Option<String>,
    /// Placed geometry.
    body: FootprintBody,
}

impl KicadFootprint {
    /// Creates an empty footprint called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            body: FootprintBody::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns the geometry placed so far.
    #[must_use]
    pub const fn body(&self) -> &FootprintBody {
        &self.body
    }

    /// Renders the footprint as a `.kicad_mod` document.
    #[must_use]
    pub fn to_sexpr(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(
            out,
            "(footprint \"{}\" (version {KICAD_FORMAT_VERSION}) (generator {GENERATOR})",
            escape_kicad_text(&self.name)
        );
        out.push_str("  (layer \"F.Cu\")\n");
        if let Some(descr) = &self.description {
            let _ = writeln!(out, "  (descr \"{}\")", escape_kicad_text(descr));
        }
        out.push_str("  (tags \"QR code barcode\")\n");
        out.push_str("  (attr smd exclude_from_pos_files exclude_from_bom)\n");

        // KiCad expects reference before value
        let mut labels: Vec<&TextLabel> = self.body.text.iter().collect();
        labels.sort_by_key(|t| match t.role {
            TextRole::Reference => 0,
            TextRole::Value => 1,
        });
        for label in labels {
            write_text(&mut out, label);
        }
        for courtyard in &self.body.courtyards {
            write_rect(&mut out, courtyard);
        }
        for polygon in &self.body.polygons {
            write_polygon(&mut out, polygon);
        }
        for pad in &self.body.pads {
            write_pad(&mut out, pad);
        }

        out.push_str(")\n");
        out
    }

    /// Writes the footprint to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), ExportError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_sexpr()).map_err(|e| ExportError::file_write(path, e))?;

        info!(
            path = %path.display(),
            name = %self.name,
            polygons = self.body.polygons.len(),
            pads = self.body.pads.len(),
            "Wrote KiCad footprint"
        );
        Ok(())
    }
}

impl DrawingSurface for KicadFootprint {
    fn place_pad(&mut self, pad: RectPad) {
        self.body.place_pad(pad);
    }

    fn place_polygon(&mut self, polygon: FilledPolygon) {
        self.body.place_polygon(polygon);
    }

    fn place_text(&mut self, text: TextLabel) {
        self.body.place_text(text);
    }

    fn place_box(&mut self, courtyard: CourtyardBox) {
        self.body.place_box(courtyard);
    }
}

fn write_text(out: &mut String, label: &TextLabel) {
    let kind = match label.role {
        TextRole::Reference => "reference",
        TextRole::Value => "value",
    };
    let _ = writeln!(
        out,
        "  (fp_text {kind} \"{}\" (at {} {}) (layer \"{}\")\n    (effects (font (size {} {}) (thickness {})))\n  )",
        escape_kicad_text(&label.text),
        fmt_mm(label.position.x),
        fmt_mm(label.position.y),
        label.layer,
        fmt_mm(label.height),
        fmt_mm(label.width),
        fmt_mm(label.thickness),
    );
}

fn write_rect(out: &mut String, courtyard: &CourtyardBox) {
    let (start, end) = courtyard.corners();
    let _ = writeln!(
        out,
        "  (fp_rect (start {} {}) (end {} {}) (layer \"F.CrtYd\") (width {}) (fill none))",
        fmt_mm(start.x),
        fmt_mm(start.y),
        fmt_mm(end.x),
        fmt_mm(end.y),
        fmt_mm(courtyard.line_width),
    );
}

fn write_polygon(out: &mut String, polygon: &FilledPolygon) {
    let mut pts = String::from("(pts");
    for p in &polygon.corners {
        let _ = write!(pts, " (xy {} {})", fmt_mm(p.x), fmt_mm(p.y));
    }
    pts.push(')');
    let _ = writeln!(
        out,
        "  (fp_poly {pts} (layer \"{}\") (width {}) (fill solid))",
        polygon.layer,
        fmt_mm(polygon.line_width),
    );
}

fn write_pad(out: &mut String, pad: &RectPad) {
    let mut layers = format!("\"{}\"", pad.layer);
    if pad.mask_included && pad.layer != crate::surface::Layer::FrontMask {
        layers.push_str(" \"F.Mask\"");
    }
    let _ = writeln!(
        out,
        "  (pad \"\" smd rect (at {} {}) (size {} {}) (layers {layers}))",
        fmt_mm(pad.position.x),
        fmt_mm(pad.position.y),
        fmt_mm(pad.size.width),
        fmt_mm(pad.size.height),
    );
}

/// Formats millimetres at KiCad's nanometre resolution without trailing zeros.
fn fmt_mm(v: f64) -> String {
    let v = if v.abs() < 1e-9 { 0.0 } else { v };
    let s = format!("{v:.6}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

fn escape_kicad_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{Layer, Point, Size};

    #[test]
    fn fmt_mm_trims() {
        assert_eq!(fmt_mm(0.5), "0.5");
        assert_eq!(fmt_mm(7.0), "7");
        assert_eq!(fmt_mm(-7.25), "-7.25");
        assert_eq!(fmt_mm(1e-12), "0");
        assert_eq!(fmt_mm(-0.000_000_1), "0");
        assert_eq!(fmt_mm(0.1 + 0.2), "0.3");
    }

    #[test]
    fn derived_names_are_sanitised() {
        assert_eq!(footprint_name_for("Example"), "QR_Example");
        assert_eq!(footprint_name_for("https://example.com/a b"), "QR_https_example_com_a_b");
        assert_eq!(footprint_name_for("!!!"), "QR_Code");
        assert_eq!(footprint_name_for(""), "QR_Code");
        assert!(footprint_name_for(&"x".repeat(200)).len() <= MAX_DERIVED_NAME);
    }

    #[test]
    fn escapes_quotes() {
        assert_eq!(escape_kicad_text(r#"a "b" \c"#), r#"a \"b\" \\c"#);
    }

    #[test]
    fn header_and_footer() {
        let fp = KicadFootprint::new("QR_Test").with_description("test");
        let text = fp.to_sexpr();
        assert!(text.starts_with("(footprint \"QR_Test\" (version 20211014)"));
        assert!(text.contains("(descr \"test\")"));
        assert!(text.trim_end().ends_with(')'));
    }

    #[test]
    fn pad_layers_include_mask_when_requested() {
        let mut fp = KicadFootprint::new("QR");
        fp.place_pad(RectPad {
            layer: Layer::FrontCopper,
            size: Size::square(0.5),
            position: Point::new(1.0, -1.0),
            mask_included: true,
        });
        fp.place_pad(RectPad {
            layer: Layer::FrontMask,
            size: Size::square(14.5),
            position: Point::ORIGIN,
            mask_included: false,
        });

        let text = fp.to_sexpr();
        assert!(text.contains(
            "(pad \"\" smd rect (at 1 -1) (size 0.5 0.5) (layers \"F.Cu\" \"F.Mask\"))"
        ));
        assert!(text.contains("(pad \"\" smd rect (at 0 0) (size 14.5 14.5) (layers \"F.Mask\"))"));
    }

    #[test]
    fn polygon_is_filled() {
        let mut fp = KicadFootprint::new("QR");
        fp.place_polygon(FilledPolygon::square(Layer::FrontSilkscreen, 1.0, Point::ORIGIN));
        let text = fp.to_sexpr();
        assert!(text.contains(
            "(fp_poly (pts (xy 0.5 0.5) (xy 0.5 -0.5) (xy -0.5 -0.5) (xy -0.5 0.5)) (layer \"F.SilkS\") (width 0) (fill solid))"
        ));
    }

    #[test]
    fn reference_written_before_value() {
        let mut fp = KicadFootprint::new("QR");
        for (role, text, y) in [(TextRole::Value, "V", -3.0), (TextRole::Reference, "R", 3.0)] {
            fp.place_text(TextLabel {
                role,
                text: text.to_string(),
                position: Point::new(0.0, y),
                height: 1.2,
                width: 1.2,
                thickness: 0.12,
                layer: Layer::FrontFab,
            });
        }
        let text = fp.to_sexpr();
        let reference = text.find("fp_text reference \"R\" (at 0 3)").unwrap();
        let value = text.find("fp_text value \"V\" (at 0 -3)").unwrap();
        assert!(reference < value);
    }
}
