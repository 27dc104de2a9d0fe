//! End-to-end scenarios: declaration → build → recorded scene.
//!
//! Run: cargo test --test scenario_test

#![allow(clippy::unwrap_used, clippy::expect_used, missing_docs)]

use approx::assert_relative_eq;
use trueno_gg::grammar::{Channel, Decorations, Encoding, Visual};
use trueno_gg::prelude::*;

fn category10() -> Vec<Rgba> {
    PaletteRegistry::builtin().get("category10").expect("builtin palette").colors().to_vec()
}

// ============================================================================
// Distilled scenarios
// ============================================================================

/// 60 rows over three categories wrap into a 2x2 grid with three panels.
#[test]
fn scenario_a_wrap_shape() {
    let categories = ["setosa", "versicolor", "virginica"];
    let data = DataFrame::new()
        .with_column("x", (0..60).map(f64::from))
        .with_column("y", (0..60).map(|i| f64::from(i % 7)))
        .with_column("species", (0..60).map(|i| categories[i % 3]));

    let built = GGPlot::new()
        .data(data)
        .aes(AestheticMap::new().x("x").y("y"))
        .geom(Geom::point())
        .facet(Facet::wrap("species"))
        .build()
        .expect("operation should succeed");

    assert_eq!(built.shape(), (2, 2));
    assert_eq!(built.panels().len(), 3);
    let rows: usize = built.panels().iter().map(|p| p.layers[0].frame.nrow()).sum();
    assert_eq!(rows, 60);
    let labels: Vec<&str> = built.panels().iter().map(|p| p.label.as_str()).collect();
    assert_eq!(labels, categories);
}

/// Discrete colors follow first-seen order.
#[test]
fn scenario_b_first_seen_colors() {
    let data = DataFrame::new()
        .with_column("x", [1.0, 2.0, 3.0, 4.0])
        .with_column("y", [1.0, 2.0, 3.0, 4.0])
        .with_column("grp", ["A", "A", "B", "B"]);

    let built = GGPlot::new()
        .data(data)
        .aes(AestheticMap::new().x("x").y("y").color("grp"))
        .geom(Geom::point())
        .build()
        .expect("operation should succeed");

    let palette = category10();
    let scale = built.scales().discrete(Channel::Color).expect("discrete color scale");
    assert_eq!(scale.color(&DataValue::from("A")), palette[0]);
    assert_eq!(scale.color(&DataValue::from("B")), palette[1]);

    let layer = &built.panels()[0].layers[0];
    match layer.encodings.get(&Channel::Color) {
        Some(Encoding::Mapped { values, .. }) => {
            assert_eq!(values[0], Some(Visual::Color(palette[0])));
            assert_eq!(values[3], Some(Visual::Color(palette[1])));
        }
        other => panic!("unexpected color encoding {other:?}"),
    }
}

/// Stacking 10 and 20 at the same x gives cumulative tops 10 and 30.
#[test]
fn scenario_c_stack_cumulative() {
    let data = DataFrame::new().with_column("cat", ["A", "A"]).with_column("value", [10.0, 20.0]);

    let built = GGPlot::new()
        .data(data)
        .aes(AestheticMap::new().x("cat").y("value"))
        .geom(Geom::col())
        .build()
        .expect("operation should succeed");

    let frame = &built.panels()[0].layers[0].frame;
    assert_eq!(frame.get_f64("ymax"), Some(vec![10.0, 30.0]));
    assert_eq!(frame.get_f64("ymin"), Some(vec![0.0, 10.0]));
}

/// An unknown palette fails at declaration time.
#[test]
fn scenario_d_unknown_palette() {
    let result = GGPlot::new()
        .data_xy(&[1.0], &[1.0])
        .geom(Geom::point())
        .scale(ScaleSpec::color_palette("doesnotexist"));

    match result {
        Err(Error::UnknownPalette { name, available }) => {
            assert_eq!(name, "doesnotexist");
            assert!(available.iter().any(|p| p == "viridis"));
        }
        other => panic!("expected UnknownPalette, got {other:?}"),
    }
}

/// A 2x3 grid keeps all six cells even when one has no rows.
#[test]
fn scenario_e_grid_with_empty_cell() {
    let mut r = Vec::new();
    let mut c = Vec::new();
    for (row, col) in [("r1", "c1"), ("r1", "c2"), ("r1", "c3"), ("r2", "c1"), ("r2", "c2")] {
        r.push(row);
        c.push(col);
    }
    let n = r.len();
    let data = DataFrame::new()
        .with_column("x", (0..n).map(|i| i as f64))
        .with_column("y", (0..n).map(|i| i as f64))
        .with_column("r", r)
        .with_column("c", c);

    let built = GGPlot::new()
        .data(data)
        .aes(AestheticMap::new().x("x").y("y"))
        .geom(Geom::point())
        .facet(Facet::grid("r", "c"))
        .build()
        .expect("operation should succeed");

    assert_eq!(built.panels().len(), 6);
    assert_eq!(built.shape(), (2, 3));
    let empty = &built.panels()[5];
    assert_eq!((empty.row, empty.col), (1, 2));
    assert_eq!(empty.layers[0].frame.nrow(), 0);
    assert_eq!(built.warnings().of_kind(WarningKind::EmptyPanel).count(), 1);

    let scene = built.render(&mut SceneRecorder::new());
    let cells = scene.cells().expect("grid");
    assert_eq!(cells.iter().map(Vec::len).collect::<Vec<_>>(), vec![3, 3]);
}

// ============================================================================
// Decorations and strips
// ============================================================================

#[test]
fn wrap_labels_bottom_row_and_left_column() {
    let data = DataFrame::new()
        .with_column("x", [1.0, 2.0, 3.0])
        .with_column("y", [1.0, 2.0, 3.0])
        .with_column("k", ["a", "b", "c"]);

    let built = GGPlot::new()
        .data(data)
        .aes(AestheticMap::new().x("x").y("y"))
        .geom(Geom::point())
        .facet(Facet::wrap("k"))
        .build()
        .expect("operation should succeed");

    let decorations: Vec<&Decorations> = built.panels().iter().map(|p| &p.decorations).collect();
    // 2x2 with a partial last row: panel b sits above an empty slot
    assert!(!decorations[0].show_x_axis);
    assert!(decorations[1].show_x_axis);
    assert!(decorations[2].show_x_axis);
    assert!(decorations[0].show_y_axis);
    assert!(!decorations[1].show_y_axis);
    assert!(decorations[2].show_y_axis);
    assert_eq!(decorations[1].strip_top.as_deref(), Some("b"));
    assert!(!built.panels()[0].x.show_labels);
}

#[test]
fn grid_strips_on_outer_edges() {
    let data = DataFrame::new()
        .with_column("x", [1.0, 2.0, 3.0, 4.0])
        .with_column("y", [1.0, 2.0, 3.0, 4.0])
        .with_column("r", ["r1", "r1", "r2", "r2"])
        .with_column("c", ["c1", "c2", "c1", "c2"]);

    let built = GGPlot::new()
        .data(data)
        .aes(AestheticMap::new().x("x").y("y"))
        .geom(Geom::point())
        .facet(Facet::grid("r", "c"))
        .build()
        .expect("operation should succeed");

    let panels = built.panels();
    assert_eq!(panels[0].decorations.strip_top.as_deref(), Some("c1"));
    assert_eq!(panels[1].decorations.strip_top.as_deref(), Some("c2"));
    assert!(panels[2].decorations.strip_top.is_none());
    assert_eq!(panels[1].decorations.strip_right.as_deref(), Some("r1"));
    assert_eq!(panels[3].decorations.strip_right.as_deref(), Some("r2"));
    assert!(panels[0].decorations.strip_right.is_none());
}

// ============================================================================
// Errors and degradations
// ============================================================================

#[test]
fn missing_facet_key_fails_before_rendering() {
    let result = GGPlot::new().data_xy(&[1.0], &[1.0]).geom(Geom::point()).facet(Facet::wrap("nope")).build();
    assert!(matches!(result, Err(Error::MissingField { ref field, .. }) if field == "nope"));
}

#[test]
fn missing_positional_field_is_fatal() {
    let result = GGPlot::new()
        .data_xy(&[1.0], &[1.0])
        .aes(AestheticMap::new().x("x").y("height"))
        .geom(Geom::point())
        .build();
    assert!(matches!(result, Err(Error::MissingField { ref field, .. }) if field == "height"));
}

#[test]
fn missing_color_field_degrades_with_warning() {
    let built = GGPlot::new()
        .data_xy(&[1.0, 2.0], &[1.0, 2.0])
        .aes(AestheticMap::new().x("x").y("y").color("species"))
        .geom(Geom::point())
        .build()
        .expect("operation should succeed");
    assert_eq!(built.warnings().of_kind(WarningKind::MissingField).count(), 1);
    assert_eq!(built.panels()[0].layers[0].frame.nrow(), 2);
}

#[test]
fn facet_key_with_separator_collides() {
    let data = DataFrame::new()
        .with_column("x", [1.0])
        .with_column("y", [1.0])
        .with_column("k", ["bad\u{1f}value"]);
    let result = GGPlot::new()
        .data(data)
        .aes(AestheticMap::new().x("x").y("y"))
        .geom(Geom::point())
        .facet(Facet::wrap("k"))
        .build();
    assert!(matches!(result, Err(Error::FacetKeyCollision { .. })));
}

#[test]
fn ambiguous_literal_stays_literal() {
    let data = DataFrame::new().with_column("x", [1.0]).with_column("y", [1.0]).with_column("red", [5.0]);
    let built = GGPlot::new()
        .data(data)
        .aes(AestheticMap::new().x("x").y("y").literal(Channel::Color, "red"))
        .geom(Geom::point())
        .build()
        .expect("operation should succeed");
    assert_eq!(built.warnings().of_kind(WarningKind::AmbiguousAesthetic).count(), 1);
    assert_eq!(
        built.panels()[0].layers[0].encodings.get(&Channel::Color),
        Some(&Encoding::Constant(Visual::Color(Rgba::RED)))
    );
}

#[test]
fn case_insensitive_matching_is_opt_in() {
    let data = DataFrame::new().with_column("Height", [1.0, 2.0]).with_column("y", [1.0, 2.0]);
    let aes = AestheticMap::new().x("height").y("y");

    let strict = GGPlot::new().data(data.clone()).aes(aes.clone()).geom(Geom::point()).build();
    assert!(matches!(strict, Err(Error::MissingField { .. })));

    let config = Config { field_matching: FieldMatching::CaseInsensitive, ..Config::default() };
    let relaxed = GGPlot::with_config(config).data(data).aes(aes).geom(Geom::point()).build().expect("operation should succeed");
    assert_eq!(relaxed.warnings().of_kind(WarningKind::CaseInsensitiveMatch).count(), 1);
}

// ============================================================================
// Layers
// ============================================================================

#[test]
fn layer_data_without_facet_key_repeats_in_every_panel() {
    let data = DataFrame::new()
        .with_column("x", [1.0, 2.0])
        .with_column("y", [1.0, 2.0])
        .with_column("k", ["a", "b"]);
    let reference = DataFrame::new().with_column("x", [0.0, 3.0]).with_column("y", [0.0, 3.0]);

    let built = GGPlot::new()
        .data(data)
        .aes(AestheticMap::new().x("x").y("y"))
        .geom(Geom::point())
        .layer(Layer::new(Geom::line()).data(reference))
        .facet(Facet::wrap("k"))
        .build()
        .expect("operation should succeed");

    for panel in built.panels() {
        assert_eq!(panel.layers[0].frame.nrow(), 1);
        assert_eq!(panel.layers[1].frame.nrow(), 2);
    }
}

#[test]
fn histogram_counts_cover_all_rows() {
    let values: Vec<f64> = (0..100).map(|i| f64::from(i % 23)).collect();
    let built = GGPlot::new()
        .data(DataFrame::new().with_column("v", values))
        .aes(AestheticMap::new().x("v"))
        .geom(Geom::histogram().bins(10))
        .build()
        .expect("operation should succeed");

    let frame = &built.panels()[0].layers[0].frame;
    assert_eq!(frame.nrow(), 10);
    let total: f64 = frame.get_f64("count").expect("count column").iter().sum();
    assert_relative_eq!(total, 100.0);
}

#[test]
fn smooth_layer_over_points() {
    let x: Vec<f64> = (0..20).map(f64::from).collect();
    let y: Vec<f64> = x.iter().map(|v| 2.0 * v + 1.0).collect();
    let built = GGPlot::new()
        .data_xy(&x, &y)
        .geom(Geom::point())
        .geom(Geom::smooth().method(trueno_gg::grammar::SmoothMethod::Linear))
        .build()
        .expect("operation should succeed");

    let smooth = &built.panels()[0].layers[1].frame;
    let ys = smooth.get_f64("y").expect("fitted y");
    let xs = smooth.get_f64("x").expect("grid x");
    assert_relative_eq!(ys[0], 2.0 * xs[0] + 1.0, epsilon = 1e-9);
    assert!(smooth.has_column("ymin"));
}

#[test]
fn config_drives_bin_default() {
    let config = Config::parse("stats:\n  bins: 4\n").expect("operation should succeed");
    let built = GGPlot::with_config(config)
        .data(DataFrame::new().with_column("v", [1.0, 2.0, 3.0, 4.0, 5.0]))
        .aes(AestheticMap::new().x("v"))
        .geom(Geom::histogram())
        .build()
        .expect("operation should succeed");
    assert_eq!(built.panels()[0].layers[0].frame.nrow(), 4);
}

#[test]
fn violin_layer_per_category() {
    let data = DataFrame::new()
        .with_column("g", ["a", "a", "a", "a", "b", "b", "b"])
        .with_column("v", [1.0, 2.0, 2.0, 3.0, 4.0, 6.0, 8.0]);
    let built = GGPlot::new()
        .data(data)
        .aes(AestheticMap::new().x("g").y("v"))
        .geom(Geom::violin().violin_scale(ViolinScale::Width).trim(false).bw(0.5))
        .build()
        .expect("operation should succeed");

    let layer = &built.panels()[0].layers[0];
    assert_eq!(layer.kind, GeomKind::Violin);
    let (lo, hi) = layer.extent(trueno_gg::grammar::Axis::Y).expect("y extent");
    assert_relative_eq!(lo, -0.5, epsilon = 1e-9);
    assert_relative_eq!(hi, 9.5, epsilon = 1e-9);
    let widths = layer.frame.get_f64("violinwidth").expect("violinwidth");
    let peak = widths.iter().copied().fold(0.0, f64::max);
    assert_relative_eq!(peak, 1.0);
}

#[test]
fn highlight_dims_other_groups() {
    let data = DataFrame::new()
        .with_column("x", [1.0, 2.0, 1.0, 2.0, 1.0, 2.0])
        .with_column("y", [1.0, 2.0, 5.0, 9.0, 2.0, 3.0])
        .with_column("grp", ["A", "A", "B", "B", "C", "C"]);
    let highlight = Highlight::groups(|g| g.get_f64("y").is_some_and(|ys| ys.iter().any(|y| *y > 8.0)));
    let built = GGPlot::new()
        .data(data)
        .aes(AestheticMap::new().x("x").y("y").color("grp"))
        .geom(Geom::line())
        .highlight(highlight)
        .build()
        .expect("operation should succeed");

    let layers = &built.panels()[0].layers;
    assert_eq!(layers.len(), 2);
    assert_eq!(layers[0].frame.nrow(), 4);
    assert_eq!(layers[0].encodings.get(&Channel::Color), Some(&Encoding::Constant(Visual::Color(Rgba::rgb(204, 204, 204)))));
    assert_eq!(layers[1].frame.nrow(), 2);
    assert!(matches!(layers[1].encodings.get(&Channel::Color), Some(Encoding::Mapped { .. })));
}

// ============================================================================
// Facet consistency
// ============================================================================

/// A level first seen in the second panel keeps its global color.
#[test]
fn facet_colors_follow_global_scale() {
    let data = DataFrame::new()
        .with_column("x", [1.0, 2.0, 3.0, 4.0, 5.0])
        .with_column("y", [1.0, 2.0, 3.0, 4.0, 5.0])
        .with_column("grp", ["B", "B", "A", "B", "A"])
        .with_column("side", ["left", "left", "right", "right", "right"]);
    let built = GGPlot::new()
        .data(data)
        .aes(AestheticMap::new().x("x").y("y").color("grp"))
        .geom(Geom::point())
        .facet(Facet::wrap("side"))
        .build()
        .expect("operation should succeed");

    let palette = category10();
    let scale = built.scales().discrete(Channel::Color).expect("discrete color scale");
    assert_eq!(scale.color(&DataValue::from("B")), palette[0]);
    assert_eq!(scale.color(&DataValue::from("A")), palette[1]);

    assert_eq!(built.panels().len(), 2);
    let right = &built.panels()[1].layers[0];
    assert_eq!(right.frame.value(0, "color"), Some(&DataValue::from("A")));
    match right.encodings.get(&Channel::Color) {
        Some(Encoding::Mapped { values, .. }) => {
            assert_eq!(values.len(), 3);
            for (row, visual) in values.iter().enumerate() {
                let level = right.frame.value(row, "color").expect("color value");
                assert_eq!(*visual, Some(Visual::Color(scale.color(level))));
            }
            assert_eq!(values[0], Some(Visual::Color(palette[1])));
        }
        other => panic!("unexpected color encoding {other:?}"),
    }
}

#[cfg(feature = "parallel")]
#[test]
fn parallel_panels_match_sequential() {
    let build = |parallel_panels: bool| {
        let config = Config { parallel_panels, ..Config::default() };
        let data = DataFrame::new()
            .with_column("x", (0..80).map(f64::from))
            .with_column("y", (0..80).map(|i| f64::from((i * 7) % 13)))
            .with_column("site", (0..80).map(|i| ["n", "e", "s", "w", "c"][i % 5]));
        GGPlot::with_config(config)
            .data(data)
            .aes(AestheticMap::new().x("x").y("y"))
            .geom(Geom::point().position(Position::jitter(0.3, 0.3)))
            .geom(Geom::smooth())
            .facet(Facet::wrap("site"))
            .build()
            .expect("operation should succeed")
    };

    let sequential = build(false);
    let parallel = build(true);
    assert_eq!(parallel.panels().len(), 5);
    let indices: Vec<usize> = parallel.panels().iter().map(|p| p.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    assert_eq!(sequential.panels(), parallel.panels());
}
