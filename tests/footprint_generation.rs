//! End-to-end tests for footprint generation with the real QR encoder.
//!
//! These tests check the geometric guarantees of a generated footprint:
//! module counts, centring, the mask opening, the courtyard grid and the
//! label placement.

use qrcode_footprint::barcode::{Border, EncodeError, MatrixSource, QrEncoder};
use qrcode_footprint::error::GenerateError;
use qrcode_footprint::footprint::{generate, CopperStyle, FootprintGenerator, QrFootprintParams};
use qrcode_footprint::surface::{FootprintBody, Layer, TextRole};

const EPS: f64 = 1e-9;

/// Counts matrix cells that should be drawn for `params`.
fn expected_cells(params: &QrFootprintParams) -> usize {
    let symbol = QrEncoder::new()
        .encode(&params.content, params.allow_compact_format)
        .unwrap();
    let border = if params.border_auto {
        Border::Auto
    } else {
        Border::Fixed(params.border)
    };
    symbol
        .matrix(border)
        .iter()
        .flatten()
        .filter(|&&dark| dark != params.negative)
        .count()
}

fn build(params: &QrFootprintParams) -> FootprintBody {
    let mut body = FootprintBody::new();
    generate(params, &mut body).unwrap();
    body
}

fn example_params() -> QrFootprintParams {
    QrFootprintParams {
        allow_compact_format: false,
        ..QrFootprintParams::with_content("Example")
    }
}

// =============================================================================
// End-to-end scenario
// =============================================================================

#[test]
fn example_footprint() {
    let params = example_params();
    let mut body = FootprintBody::new();
    let report = generate(&params, &mut body).unwrap();

    // Version 1 (21 modules) plus a 4-module quiet zone on each side
    assert!(!report.compact);
    assert_eq!(report.version, "1");
    assert_eq!(report.border, 4);
    assert_eq!(report.size.width, 29);
    assert_eq!(report.size.height, 29);

    // Copper only, one square per dark module
    assert_eq!(body.polygons_on(Layer::FrontCopper).count(), expected_cells(&params));
    assert_eq!(body.polygons_on(Layer::FrontSilkscreen).count(), 0);
    assert_eq!(report.drawn_cells, expected_cells(&params));

    // One mask opening over the whole symbol
    let masks: Vec<_> = body.pads_on(Layer::FrontMask).collect();
    assert_eq!(masks.len(), 1);
    assert!((masks[0].size.width - 14.5).abs() < EPS);
    assert!((masks[0].size.height - 14.5).abs() < EPS);
    assert!(masks[0].position.x.abs() < EPS && masks[0].position.y.abs() < EPS);

    // One courtyard, 14.5 + 0.5 = 15.0 on the 0.1 grid
    assert_eq!(body.courtyards.len(), 1);
    assert!((body.courtyards[0].size.width - 15.0).abs() < EPS);
    assert!((body.courtyards[0].line_width - 0.05).abs() < EPS);

    // Labels either side of the symbol
    let value = body.label(TextRole::Value).unwrap();
    let reference = body.label(TextRole::Reference).unwrap();
    assert_eq!(value.text, "Example");
    assert_eq!(reference.text, "QR***");
    assert!((value.position.y + 8.95).abs() < EPS);
    assert!((reference.position.y - 8.95).abs() < EPS);
    assert_eq!(value.layer, Layer::FrontFab);
}

#[test]
fn short_numeric_content_uses_micro_qr() {
    let params = QrFootprintParams::with_content("12345");
    let mut body = FootprintBody::new();
    let report = generate(&params, &mut body).unwrap();

    assert!(report.compact);
    assert_eq!(report.version, "M1");
    assert_eq!(report.border, 2);
    assert_eq!(report.size.width, 15);
}

// =============================================================================
// Module placement
// =============================================================================

#[test]
fn module_count_matches_draw_predicate() {
    for negative in [false, true] {
        for (copper, silk) in [(true, false), (false, true), (true, true), (false, false)] {
            let params = QrFootprintParams {
                negative,
                use_copper_layer: copper,
                use_silk_layer: silk,
                ..QrFootprintParams::with_content("HELLO WORLD")
            };
            let body = build(&params);
            let layers = usize::from(copper) + usize::from(silk);
            assert_eq!(
                body.module_count(),
                expected_cells(&params) * layers,
                "negative={negative} copper={copper} silk={silk}"
            );
        }
    }
}

#[test]
fn positive_and_negative_cover_the_grid() {
    let positive = build(&example_params());
    let negative = build(&QrFootprintParams {
        negative: true,
        ..example_params()
    });

    let centres: Vec<_> = positive
        .polygons
        .iter()
        .chain(&negative.polygons)
        .map(|p| p.centre())
        .collect();
    assert_eq!(centres.len(), 29 * 29);

    // The full grid is centred on the origin
    #[allow(clippy::cast_precision_loss)]
    let n = centres.len() as f64;
    let mean_x = centres.iter().map(|c| c.x).sum::<f64>() / n;
    let mean_y = centres.iter().map(|c| c.y).sum::<f64>() / n;
    assert!(mean_x.abs() < 1e-6);
    assert!(mean_y.abs() < 1e-6);

    // Outermost centres sit half a module inside the symbol edge
    let max_x = centres.iter().map(|c| c.x).fold(f64::MIN, f64::max);
    let min_x = centres.iter().map(|c| c.x).fold(f64::MAX, f64::min);
    assert!((max_x - 7.0).abs() < EPS);
    assert!((min_x + 7.0).abs() < EPS);
}

#[test]
fn squares_are_one_module_wide() {
    let params = QrFootprintParams {
        pixel_size: 0.3,
        ..example_params()
    };
    for polygon in build(&params).polygons {
        let xs: Vec<f64> = polygon.corners.iter().map(|p| p.x).collect();
        let width = xs.iter().copied().fold(f64::MIN, f64::max)
            - xs.iter().copied().fold(f64::MAX, f64::min);
        assert!((width - 0.3).abs() < EPS);
        assert!(polygon.line_width.abs() < EPS);
    }
}

#[test]
fn pad_style_copper() {
    let params = QrFootprintParams {
        copper_style: CopperStyle::Pad,
        ..example_params()
    };
    let body = build(&params);

    let pads: Vec<_> = body.pads_on(Layer::FrontCopper).collect();
    assert_eq!(pads.len(), expected_cells(&params));
    assert!(body.polygons_on(Layer::FrontCopper).next().is_none());
    // The symbol-wide opening already exposes every pad
    assert!(pads.iter().all(|p| !p.mask_included));

    let without_cutout = build(&QrFootprintParams {
        mask_cut_out: false,
        ..params
    });
    assert!(without_cutout.pads_on(Layer::FrontMask).next().is_none());
    assert!(without_cutout
        .pads_on(Layer::FrontCopper)
        .all(|p| p.mask_included));
}

#[test]
fn mask_cutout_ignores_negative() {
    for negative in [false, true] {
        let body = build(&QrFootprintParams {
            negative,
            pixel_size: 0.4,
            ..example_params()
        });
        let masks: Vec<_> = body.pads_on(Layer::FrontMask).collect();
        assert_eq!(masks.len(), 1);
        assert!((masks[0].size.width - 0.4 * 29.0).abs() < EPS);
        assert!(!masks[0].mask_included);
    }
}

// =============================================================================
// Border handling
// =============================================================================

#[test]
fn explicit_border_equal_to_auto_is_identical() {
    for content in ["Example", "12345", "https://example.com/some/longer/path"] {
        let auto = QrFootprintParams::with_content(content);
        let generator = FootprintGenerator::new(QrEncoder::new());
        let resolved = generator.plan(&auto).unwrap().report().border;

        let fixed = QrFootprintParams {
            border_auto: false,
            border: resolved,
            ..auto.clone()
        };

        let plan_auto = generator.plan(&auto).unwrap();
        let plan_fixed = generator.plan(&fixed).unwrap();
        assert_eq!(plan_auto.size, plan_fixed.size, "{content}");
        assert_eq!(plan_auto.primitives, plan_fixed.primitives, "{content}");
    }
}

#[test]
fn zero_border() {
    let params = QrFootprintParams {
        border_auto: false,
        border: 0,
        ..example_params()
    };
    let mut body = FootprintBody::new();
    let report = generate(&params, &mut body).unwrap();
    assert_eq!(report.size.width, 21);
    assert_eq!(report.border, 0);
}

// =============================================================================
// Courtyard
// =============================================================================

#[test]
fn courtyard_is_on_grid() {
    for pixel_size in [0.2, 0.25, 0.33, 0.5, 0.77, 1.0, 1.234] {
        let params = QrFootprintParams {
            pixel_size,
            ..example_params()
        };
        let body = build(&params);
        let side = body.courtyards[0].size.width;
        let steps = side / 0.1;
        assert!(
            (steps - steps.round()).abs() < 1e-6,
            "pixel_size={pixel_size} side={side}"
        );
        assert!((side - (pixel_size * 29.0 + 0.5)).abs() <= 0.05 + EPS);
    }
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn empty_content_is_rejected() {
    let mut body = FootprintBody::new();
    let err = generate(&QrFootprintParams::with_content(""), &mut body).unwrap_err();
    assert_eq!(err, GenerateError::Encoding(EncodeError::EmptyContent));
    assert!(body.is_empty());
}

#[test]
fn over_capacity_content_is_rejected() {
    let mut body = FootprintBody::new();
    let params = QrFootprintParams::with_content("x".repeat(8000));
    let err = generate(&params, &mut body).unwrap_err();
    assert!(matches!(
        err,
        GenerateError::Encoding(EncodeError::DataTooLong { .. })
    ));
    assert!(body.is_empty());
}

#[test]
fn invalid_dimensions_are_rejected() {
    for params in [
        QrFootprintParams {
            pixel_size: -0.5,
            ..example_params()
        },
        QrFootprintParams {
            pixel_size: f64::NAN,
            ..example_params()
        },
        QrFootprintParams {
            text_height: -1.0,
            ..example_params()
        },
    ] {
        let mut body = FootprintBody::new();
        let err = generate(&params, &mut body).unwrap_err();
        assert!(matches!(err, GenerateError::InvalidParameter { .. }));
        assert!(body.is_empty());
    }
}
