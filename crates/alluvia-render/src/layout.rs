use crate::label::{LabelColumns, LabelFormat, item_text};
use crate::model::{
    AlluvialDiagramLayout, AlluvialLabelLayout, AlluvialNodeLayout, AlluvialVeinLayout, Bounds,
    LabelKind, Point, StageSide, TextAnchor,
};
use crate::{Error, Result};
use alluvia_core::{AlluvialOptions, FlowTable, FontDefaults, Rgba};
use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;
use std::cmp::Ordering;

/// Turns a flow table into diagram geometry.
///
/// The facade only talks to this trait, so alternative layouts (or test doubles capturing
/// the options they receive) can be swapped in.
pub trait LayoutEngine {
    fn layout(
        &self,
        table: &FlowTable,
        options: &AlluvialOptions,
        fonts: &FontDefaults,
    ) -> Result<AlluvialDiagramLayout>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlluvialLayoutEngine;

impl LayoutEngine for AlluvialLayoutEngine {
    fn layout(
        &self,
        table: &FlowTable,
        options: &AlluvialOptions,
        fonts: &FontDefaults,
    ) -> Result<AlluvialDiagramLayout> {
        layout_alluvial_diagram(table, options, fonts)
    }
}

const STAGE_LABEL_FONT_SIZE: f64 = 13.0;

// Vein centre line at t = 0, 1/4, 1/2, 3/4, 1.
const PROFILE_T: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];
const PROFILE_Y: [f64; 5] = [0.0, 0.15, 0.5, 0.85, 1.0];

/// The quartic through the profile anchors, evaluated in Lagrange form.
fn vein_profile_at(t: f64) -> f64 {
    let mut sum = 0.0;
    for (i, (&ti, &yi)) in PROFILE_T.iter().zip(PROFILE_Y.iter()).enumerate() {
        let mut term = yi;
        for (j, &tj) in PROFILE_T.iter().enumerate() {
            if i != j {
                term *= (t - tj) / (ti - tj);
            }
        }
        sum += term;
    }
    sum
}

/// `res` samples of the vein profile as `(t, y)` pairs, both in `[0, 1]`.
pub fn vein_profile(res: usize) -> Vec<(f64, f64)> {
    let res = res.max(2);
    (0..res)
        .map(|i| {
            let t = i as f64 / (res - 1) as f64;
            (t, vein_profile_at(t))
        })
        .collect()
}

fn f64_cmp(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

struct Stage {
    /// Categories bottom to top, with their summed weights.
    order: Vec<(String, f64)>,
    index: FxHashMap<String, usize>,
}

fn build_stages(table: &FlowTable, options: &AlluvialOptions) -> Result<Vec<Stage>> {
    let stage_count = table.stage_count();
    if let Some(orders) = &options.stage_orders {
        if orders.len() > stage_count {
            return Err(Error::InvalidInput {
                message: format!(
                    "stage_orders lists {} stages but the table has {stage_count}",
                    orders.len()
                ),
            });
        }
    }

    let mut stages = Vec::with_capacity(stage_count);
    for k in 0..stage_count {
        let mut widths: IndexMap<&str, f64> = IndexMap::new();
        for (row, weight) in table.records() {
            *widths.entry(row[k].as_str()).or_insert(0.0) += weight;
        }

        let mut order: Vec<(String, f64)> = widths
            .iter()
            .map(|(id, w)| (id.to_string(), *w))
            .collect();
        // Stable: equal widths keep first-appearance order.
        order.sort_by(|a, b| f64_cmp(a.1, b.1));

        if let Some(explicit) = options.stage_orders.as_ref().and_then(|o| o.get(k)) {
            let mut reordered = Vec::with_capacity(order.len());
            for id in explicit {
                let Some(&w) = widths.get(id.as_str()) else {
                    return Err(Error::InvalidInput {
                        message: format!("stage_orders[{k}] names unknown category `{id}`"),
                    });
                };
                if !reordered.iter().any(|(seen, _): &(String, f64)| seen == id) {
                    reordered.push((id.clone(), w));
                }
            }
            for entry in order {
                if !reordered.iter().any(|(seen, _)| *seen == entry.0) {
                    reordered.push(entry);
                }
            }
            order = reordered;
        }

        let index = order
            .iter()
            .enumerate()
            .map(|(i, (id, _))| (id.clone(), i))
            .collect();
        stages.push(Stage { order, index });
    }
    Ok(stages)
}

fn build_palette(options: &AlluvialOptions, count: usize) -> Result<Vec<Rgba>> {
    if let Some(colors) = &options.colors {
        if colors.len() < count {
            return Err(Error::InvalidInput {
                message: format!(
                    "{} colors given for {count} categories of the colour stage",
                    colors.len()
                ),
            });
        }
        return Ok(colors[..count].to_vec());
    }

    let positions: Vec<f64> = match options.color_seed {
        Some(seed) => {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..count).map(|_| rng.r#gen::<f64>()).collect()
        }
        None if count <= 1 => vec![0.5; count],
        None => (0..count)
            .map(|i| i as f64 / (count - 1) as f64)
            .collect(),
    };
    Ok(positions
        .into_iter()
        .map(|t| options.cmap.sample(t))
        .collect())
}

/// Side rectangle of one vein, `0.25..0.75 * h_gap` outside the stage on the `sign` side.
fn side_rect(x: f64, y: f64, width: f64, sign: f64, h_gap: f64) -> Vec<Point> {
    let near = x + sign * 0.25 * h_gap;
    let far = x + sign * 0.75 * h_gap;
    vec![
        Point::new(near, y + width),
        Point::new(near, y),
        Point::new(far, y),
        Point::new(far, y + width),
    ]
}

pub fn layout_alluvial_diagram(
    table: &FlowTable,
    options: &AlluvialOptions,
    fonts: &FontDefaults,
) -> Result<AlluvialDiagramLayout> {
    options.validate()?;

    let total = table.total_weight();
    if !(total > 0.0) {
        return Err(Error::InvalidInput {
            message: "total flow weight must be positive".to_string(),
        });
    }

    let stage_count = table.stage_count();
    if stage_count < 2 {
        return Err(Error::InvalidInput {
            message: format!("rows need at least two stages, found {stage_count}"),
        });
    }
    if let Some(i) = table.rows().iter().position(|r| r.len() != stage_count) {
        return Err(Error::InvalidInput {
            message: format!("row {i} does not have {stage_count} stages"),
        });
    }
    if table.weights().len() != table.len() {
        return Err(Error::InvalidInput {
            message: "every row needs exactly one weight".to_string(),
        });
    }
    let stages = build_stages(table, options)?;

    let (x0, x1) = options.x_range;
    let span = x1 - x0;
    let h_gap = span * options.h_gap_frac;
    let v_gap = total * options.v_gap_frac;

    let stage_x: Vec<f64> = (0..stage_count)
        .map(|k| x0 + span * k as f64 / (stage_count - 1) as f64)
        .collect();
    let side_of = |k: usize| {
        if k == 0 {
            StageSide::Left
        } else if k + 1 == stage_count {
            StageSide::Right
        } else {
            StageSide::Inner
        }
    };

    let stage_heights: Vec<f64> = stages
        .iter()
        .map(|s| {
            let sum: f64 = s.order.iter().map(|(_, w)| *w).sum();
            sum + (s.order.len().saturating_sub(1)) as f64 * v_gap
        })
        .collect();
    let max_stage_height = stage_heights.iter().copied().fold(0.0, f64::max);

    // Node index per (stage, position in stage order).
    let mut node_ids: Vec<Vec<usize>> = Vec::with_capacity(stage_count);
    let mut nodes: Vec<AlluvialNodeLayout> = Vec::new();
    for (k, stage) in stages.iter().enumerate() {
        let side = side_of(k);
        let x = stage_x[k];
        let mut y = (max_stage_height - stage_heights[k]) / 2.0;
        let mut ids = Vec::with_capacity(stage.order.len());
        for (id, width) in &stage.order {
            let (y0, y1) = (y, y + width);
            let bar = (side == StageSide::Inner).then(|| {
                vec![
                    Point::new(x - 0.25 * h_gap, y0),
                    Point::new(x + 0.25 * h_gap, y0),
                    Point::new(x + 0.25 * h_gap, y1),
                    Point::new(x - 0.25 * h_gap, y1),
                ]
            });
            ids.push(nodes.len());
            nodes.push(AlluvialNodeLayout {
                stage: k,
                id: id.clone(),
                width: *width,
                x,
                y0,
                y1,
                side,
                bar,
            });
            y = y1 + v_gap;
        }
        node_ids.push(ids);
    }

    let color_stage = options.color_side.min(stage_count - 1);
    let palette = build_palette(options, stages[color_stage].order.len())?;

    let profile = vein_profile(options.res);
    let mut out_cursor: Vec<f64> = nodes.iter().map(|n| n.y0).collect();
    let mut in_cursor: Vec<f64> = out_cursor.clone();
    let mut veins: Vec<AlluvialVeinLayout> = Vec::new();

    for k in 0..stage_count - 1 {
        // (source position, target position, colour position) -> width
        let mut flows: FxHashMap<(usize, usize, usize), f64> = FxHashMap::default();
        for (row, weight) in table.records() {
            let a = stages[k].index[&row[k]];
            let b = stages[k + 1].index[&row[k + 1]];
            let c = stages[color_stage].index[&row[color_stage]];
            *flows.entry((a, b, c)).or_insert(0.0) += weight;
        }
        let mut keys: Vec<(usize, usize, usize)> = flows.keys().copied().collect();
        keys.sort_unstable();

        let (sx, tx) = (stage_x[k], stage_x[k + 1]);
        for key @ (a, b, c) in keys {
            let width = flows[&key];
            if width <= 0.0 {
                continue;
            }
            let source = node_ids[k][a];
            let target = node_ids[k + 1][b];
            let ya = out_cursor[source];
            let yb = in_cursor[target];
            out_cursor[source] += width;
            in_cursor[target] += width;

            let trace: Vec<Point> = profile
                .iter()
                .map(|&(t, p)| Point::new(sx + t * (tx - sx), ya + p * (yb - ya)))
                .collect();
            let mut polygon = trace.clone();
            polygon.extend(trace.iter().rev().map(|p| Point::new(p.x, p.y + width)));

            veins.push(AlluvialVeinLayout {
                index: veins.len(),
                stage: k,
                source: nodes[source].id.clone(),
                target: nodes[target].id.clone(),
                color_key: stages[color_stage].order[c].0.clone(),
                width,
                color: palette[c],
                polygon,
                source_rect: (k == 0).then(|| side_rect(sx, ya, width, -1.0, h_gap)),
                target_rect: (k + 2 == stage_count).then(|| side_rect(tx, yb, width, 1.0, h_gap)),
            });
        }
    }

    let label_format = LabelFormat {
        disp_width: options.disp_width,
        width_in: options.width_in,
        separator: &options.wdisp_sep,
        total,
    };
    let columns: Vec<LabelColumns> = stages
        .iter()
        .map(|s| {
            LabelColumns::measure(
                s.order.iter().map(|(id, w)| (id.as_str(), *w)),
                &label_format,
            )
        })
        .collect();

    let mut labels = Vec::with_capacity(nodes.len() + stage_count);
    for n in &nodes {
        let (x, anchor) = match n.side {
            StageSide::Left => (n.x - 1.5 * h_gap, TextAnchor::End),
            StageSide::Right => (n.x + 1.5 * h_gap, TextAnchor::Start),
            StageSide::Inner => (n.x, TextAnchor::Middle),
        };
        labels.push(AlluvialLabelLayout {
            kind: LabelKind::Node,
            x,
            y: (n.y0 + n.y1) / 2.0,
            text: item_text(&n.id, n.width, n.side, columns[n.stage], &label_format),
            anchor,
            rotation: 0.0,
            font_size: fonts.size,
        });
    }

    if let Some(stage_labels) = &options.labels {
        if stage_labels.len() != stage_count {
            return Err(Error::InvalidInput {
                message: format!(
                    "{} labels given for {stage_count} stages",
                    stage_labels.len()
                ),
            });
        }
        let sep_width = unicode_width::UnicodeWidthStr::width(options.wdisp_sep.as_str());
        for (k, text) in stage_labels.iter().enumerate() {
            let side = side_of(k);
            let (x, y, rotation) = match side {
                StageSide::Inner => (
                    stage_x[k],
                    max_stage_height + 2.0 * v_gap.max(max_stage_height * 0.01),
                    0.0,
                ),
                StageSide::Left | StageSide::Right => {
                    let cols = columns[k];
                    let chars = options.label_shift
                        + cols.item as f64
                        + if options.disp_width {
                            (sep_width + cols.width) as f64
                        } else {
                            0.0
                        };
                    let rotation = if side == StageSide::Left { 90.0 } else { -90.0 };
                    (
                        stage_x[k] + side.sign() * chars * h_gap,
                        max_stage_height / 2.0,
                        rotation,
                    )
                }
            };
            labels.push(AlluvialLabelLayout {
                kind: LabelKind::Stage,
                x,
                y,
                text: text.clone(),
                anchor: TextAnchor::Middle,
                rotation,
                font_size: STAGE_LABEL_FONT_SIZE,
            });
        }
    }

    let mut data_bounds = Bounds::empty();
    for n in &nodes {
        data_bounds.include(Point::new(n.x, n.y0));
        data_bounds.include(Point::new(n.x, n.y1));
        for p in n.bar.iter().flatten() {
            data_bounds.include(*p);
        }
    }
    for v in &veins {
        let rects = v.source_rect.iter().chain(v.target_rect.iter()).flatten();
        for p in v.polygon.iter().chain(rects) {
            data_bounds.include(*p);
        }
    }

    tracing::debug!(
        stages = stage_count,
        nodes = nodes.len(),
        veins = veins.len(),
        "alluvial layout computed"
    );

    Ok(AlluvialDiagramLayout {
        stage_count,
        stage_x,
        h_gap,
        v_gap,
        max_stage_height,
        nodes,
        veins,
        labels,
        data_bounds,
    })
}
