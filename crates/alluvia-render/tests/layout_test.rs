use alluvia_core::{AlluvialOptions, CsvOptions, FlowTable, FontDefaults};
use alluvia_render::layout_alluvial_diagram;
use alluvia_render::model::{AlluvialDiagramLayout, LabelKind, StageSide};
use std::path::PathBuf;

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

fn cells_table() -> FlowTable {
    let path = workspace_root().join("fixtures").join("cells.csv");
    let text = std::fs::read_to_string(&path).expect("fixture");
    FlowTable::from_csv(
        &text,
        &CsvOptions {
            has_header: true,
            weight_column: false,
        },
    )
    .expect("csv ok")
}

fn three_stage_table() -> FlowTable {
    let path = workspace_root().join("fixtures").join("three_stage.json");
    let text = std::fs::read_to_string(&path).expect("fixture");
    let value: serde_json::Value = serde_json::from_str(&text).expect("json");
    FlowTable::from_json(&value).expect("table")
}

fn layout(table: &FlowTable, options: &AlluvialOptions) -> AlluvialDiagramLayout {
    layout_alluvial_diagram(table, options, &FontDefaults::default()).expect("layout ok")
}

fn assert_close(a: f64, b: f64) {
    assert!((a - b).abs() < 1e-9, "{a} != {b}");
}

#[test]
fn categories_stack_by_ascending_width() {
    let out = layout(&cells_table(), &AlluvialOptions::default());

    let left = out.stage_nodes(0).map(|n| n.id.as_str()).collect::<Vec<_>>();
    assert_eq!(
        left,
        [
            "NK cell",
            "T cell, CD4",
            "T cell, CD8",
            "B cell",
            "Dendritic",
            "Monocyte"
        ]
    );
    let right = out.stage_nodes(1).map(|n| n.id.as_str()).collect::<Vec<_>>();
    assert_eq!(right, ["Myeloid", "Lymphoid"]);

    assert_close(out.v_gap, 12.0 * 0.03);
    assert_close(out.max_stage_height, 12.0 + 5.0 * out.v_gap);
    for n in out.stage_nodes(0).zip(out.stage_nodes(0).skip(1)) {
        assert!(n.0.y1 < n.1.y0, "stacked bottom to top with a gap");
    }
}

#[test]
fn stages_are_centred_against_the_tallest() {
    let out = layout(&cells_table(), &AlluvialOptions::default());
    for stage in 0..out.stage_count {
        let nodes = out.stage_nodes(stage).collect::<Vec<_>>();
        let bottom = nodes.first().unwrap().y0;
        let top = nodes.last().unwrap().y1;
        assert_close((bottom + top) / 2.0, out.max_stage_height / 2.0);
    }
}

#[test]
fn vein_widths_add_up_to_node_widths() {
    for table in [cells_table(), three_stage_table()] {
        let out = layout(&table, &AlluvialOptions::default());
        for n in &out.nodes {
            let outgoing: f64 = out
                .veins
                .iter()
                .filter(|v| v.stage == n.stage && v.source == n.id)
                .map(|v| v.width)
                .sum();
            let incoming: f64 = out
                .veins
                .iter()
                .filter(|v| v.stage + 1 == n.stage && v.target == n.id)
                .map(|v| v.width)
                .sum();
            if n.stage + 1 < out.stage_count {
                assert_close(outgoing, n.width);
            }
            if n.stage > 0 {
                assert_close(incoming, n.width);
            }
        }
    }
}

#[test]
fn vein_polygons_span_adjacent_stages() {
    let options = AlluvialOptions {
        res: 12,
        x_range: (0.0, 2.0),
        ..Default::default()
    };
    let out = layout(&three_stage_table(), &options);
    assert_eq!(out.stage_x, vec![0.0, 1.0, 2.0]);

    for v in &out.veins {
        assert_eq!(v.polygon.len(), 24);
        assert_close(v.polygon[0].x, out.stage_x[v.stage]);
        assert_close(v.polygon[11].x, out.stage_x[v.stage + 1]);
        // Lower trace is the upper trace shifted by the vein width.
        assert_close(v.polygon[12].y - v.polygon[11].y, v.width);
        assert_eq!(v.source_rect.is_some(), v.stage == 0);
        assert_eq!(v.target_rect.is_some(), v.stage == 1);
    }
}

#[test]
fn inner_stages_get_bars_and_centred_labels() {
    let out = layout(&three_stage_table(), &AlluvialOptions::default());
    for n in &out.nodes {
        assert_eq!(n.bar.is_some(), n.side == StageSide::Inner);
        assert_eq!(n.side == StageSide::Inner, n.stage == 1);
    }
    let node_labels = out
        .labels
        .iter()
        .filter(|l| l.kind == LabelKind::Node)
        .count();
    assert_eq!(node_labels, out.nodes.len());
}

#[test]
fn horizontal_gap_scales_with_the_x_span() {
    let options = AlluvialOptions {
        x_range: (2.0, 4.0),
        h_gap_frac: 0.05,
        ..Default::default()
    };
    let out = layout(&cells_table(), &options);
    assert_close(out.h_gap, (4.0 - 2.0) * 0.05);
    assert_close(out.stage_x[0], 2.0);
    assert_close(out.stage_x[1], 4.0);
}

#[test]
fn outer_side_rectangles_sit_outside_the_stage() {
    let out = layout(&cells_table(), &AlluvialOptions::default());
    let h = out.h_gap;
    for v in &out.veins {
        let src = v.source_rect.as_ref().expect("left rect");
        assert!(src.iter().all(|p| p.x <= -0.25 * h + 1e-12 && p.x >= -0.75 * h - 1e-12));
        let dst = v.target_rect.as_ref().expect("right rect");
        assert!(dst.iter().all(|p| p.x >= 1.0 + 0.25 * h - 1e-12));
    }
}

#[test]
fn color_side_selects_the_tinting_stage() {
    let table = cells_table();
    for color_side in [0usize, 1] {
        let options = AlluvialOptions {
            color_side,
            ..Default::default()
        };
        let out = layout(&table, &options);
        for a in &out.veins {
            for b in &out.veins {
                let same_key = if color_side == 0 {
                    a.source == b.source
                } else {
                    a.target == b.target
                };
                if same_key {
                    assert_eq!(a.color, b.color);
                }
            }
        }
    }
}

#[test]
fn stage_labels_need_one_entry_per_stage() {
    let table = cells_table();
    let bad = AlluvialOptions {
        labels: Some(vec!["only one".to_string()]),
        ..Default::default()
    };
    assert!(layout_alluvial_diagram(&table, &bad, &FontDefaults::default()).is_err());

    let good = AlluvialOptions {
        labels: Some(vec!["cluster".to_string(), "lineage".to_string()]),
        ..Default::default()
    };
    let out = layout(&table, &good);
    let stage_labels = out
        .labels
        .iter()
        .filter(|l| l.kind == LabelKind::Stage)
        .collect::<Vec<_>>();
    assert_eq!(stage_labels.len(), 2);
    assert!(stage_labels[0].x < 0.0 && stage_labels[0].rotation == 90.0);
    assert!(stage_labels[1].x > 1.0 && stage_labels[1].rotation == -90.0);
}

fn stage_label_xs(options: &AlluvialOptions) -> Vec<f64> {
    layout(&cells_table(), options)
        .labels
        .iter()
        .filter(|l| l.kind == LabelKind::Stage)
        .map(|l| l.x)
        .collect()
}

#[test]
fn stage_label_offset_counts_label_columns() {
    // "T cell, CD4" and "Lymphoid" are the widest names; every width prints in one column.
    let base = AlluvialOptions {
        labels: Some(vec!["cluster".to_string(), "lineage".to_string()]),
        label_shift: 2.0,
        ..Default::default()
    };
    let h_gap = 0.03;

    let xs = stage_label_xs(&base);
    assert_close(xs[0], -(2.0 + 11.0 + 2.0 + 1.0) * h_gap);
    assert_close(xs[1], 1.0 + (2.0 + 8.0 + 2.0 + 1.0) * h_gap);

    let no_width = AlluvialOptions {
        disp_width: false,
        ..base.clone()
    };
    let xs = stage_label_xs(&no_width);
    assert_close(xs[0], -(2.0 + 11.0) * h_gap);
    assert_close(xs[1], 1.0 + (2.0 + 8.0) * h_gap);

    // Shares of the total ("16.7%") widen the width column to five.
    let relative = AlluvialOptions {
        width_in: false,
        ..base
    };
    let xs = stage_label_xs(&relative);
    assert_close(xs[0], -(2.0 + 11.0 + 2.0 + 5.0) * h_gap);
    assert_close(xs[1], 1.0 + (2.0 + 8.0 + 2.0 + 5.0) * h_gap);
}

#[test]
fn relative_widths_label_nodes_with_percentages() {
    let options = AlluvialOptions {
        width_in: false,
        ..Default::default()
    };
    let out = layout(&cells_table(), &options);
    let texts = out
        .labels
        .iter()
        .filter(|l| l.kind == LabelKind::Node)
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>();
    assert!(texts.contains(&"    NK cell   8.3%"), "{texts:?}");
    assert!(texts.contains(&"T cell, CD4  16.7%"), "{texts:?}");
    assert!(texts.contains(&"66.7%  Lymphoid"), "{texts:?}");
}

#[test]
fn explicit_stage_orders_override_width_sorting() {
    let table = cells_table();
    let options = AlluvialOptions {
        stage_orders: Some(vec![vec![], vec!["Lymphoid".to_string()]]),
        ..Default::default()
    };
    let out = layout(&table, &options);
    let right = out.stage_nodes(1).map(|n| n.id.as_str()).collect::<Vec<_>>();
    assert_eq!(right, ["Lymphoid", "Myeloid"]);

    let unknown = AlluvialOptions {
        stage_orders: Some(vec![vec!["Neuron".to_string()]]),
        ..Default::default()
    };
    assert!(layout_alluvial_diagram(&table, &unknown, &FontDefaults::default()).is_err());
}

#[test]
fn invalid_options_and_empty_flow_are_rejected() {
    let table = cells_table();
    let bad = AlluvialOptions {
        alpha: 2.0,
        ..Default::default()
    };
    assert!(layout_alluvial_diagram(&table, &bad, &FontDefaults::default()).is_err());

    let zero = FlowTable::from_weighted_rows([(["a", "b"], 0.0)]).unwrap();
    assert!(
        layout_alluvial_diagram(&zero, &AlluvialOptions::default(), &FontDefaults::default())
            .is_err()
    );
}
