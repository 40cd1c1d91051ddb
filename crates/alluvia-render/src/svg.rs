use crate::model::{AlluvialDiagramLayout, AlluvialLabelLayout, Bounds, Point, TextAnchor};
use crate::text::{TextMeasurer, TextStyle};
use crate::Result;
use alluvia_core::{AlluvialOptions, FontDefaults, Rgba};
use std::fmt::Write as _;

/// Points per inch; SVG user units are points.
pub const POINTS_PER_INCH: f64 = 72.0;

// Axes box inside the canvas, as fractions (left, right, bottom, top) measured from the
// bottom-left corner.
const AXES_LEFT: f64 = 0.125;
const AXES_RIGHT: f64 = 0.9;
const AXES_BOTTOM: f64 = 0.11;
const AXES_TOP: f64 = 0.88;
const DATA_MARGIN: f64 = 0.05;

const INNER_BAR_FILL: &str = "#404040";

#[derive(Debug, Clone)]
pub struct SvgRenderOptions {
    /// Root `<svg id="...">`.
    pub diagram_id: Option<String>,
    /// Canvas fill; `None` leaves the background transparent.
    pub background: Option<Rgba>,
    /// Padding around the tight content box, in inches.
    pub pad_inches: f64,
}

impl Default for SvgRenderOptions {
    fn default() -> Self {
        Self {
            diagram_id: None,
            background: Some(Rgba::WHITE),
            pad_inches: 0.1,
        }
    }
}

/// Maps data coordinates (y up) into canvas points (y down).
#[derive(Debug, Clone, Copy)]
pub struct CanvasTransform {
    x_lim: (f64, f64),
    y_lim: (f64, f64),
    axes: Bounds,
}

impl CanvasTransform {
    pub fn new(figsize: (f64, f64), data: &Bounds) -> Self {
        let canvas_w = figsize.0 * POINTS_PER_INCH;
        let canvas_h = figsize.1 * POINTS_PER_INCH;
        let axes = Bounds {
            min_x: canvas_w * AXES_LEFT,
            max_x: canvas_w * AXES_RIGHT,
            min_y: canvas_h * (1.0 - AXES_TOP),
            max_y: canvas_h * (1.0 - AXES_BOTTOM),
        };

        fn limits(lo: f64, hi: f64) -> (f64, f64) {
            if !(lo.is_finite() && hi.is_finite()) {
                return (0.0, 1.0);
            }
            let span = hi - lo;
            if span <= 0.0 {
                return (lo - 0.5, hi + 0.5);
            }
            (lo - span * DATA_MARGIN, hi + span * DATA_MARGIN)
        }

        Self {
            x_lim: limits(data.min_x, data.max_x),
            y_lim: limits(data.min_y, data.max_y),
            axes,
        }
    }

    pub fn apply(&self, p: Point) -> Point {
        let fx = (p.x - self.x_lim.0) / (self.x_lim.1 - self.x_lim.0);
        let fy = (p.y - self.y_lim.0) / (self.y_lim.1 - self.y_lim.0);
        Point::new(
            self.axes.min_x + fx * self.axes.width(),
            self.axes.max_y - fy * self.axes.height(),
        )
    }
}

fn fmt(v: f64) -> String {
    // Round-trippable decimal form, without `-0` or float noise from our own arithmetic.
    if !v.is_finite() {
        return "0".to_string();
    }

    let mut v = if v.abs() < 1e-9 { 0.0 } else { v };
    let nearest = v.round();
    if (v - nearest).abs() < 1e-6 {
        v = nearest;
    }
    let s = v.to_string();
    if s == "-0" { "0".to_string() } else { s }
}

fn fmt_path(v: f64) -> String {
    // Three fractional digits are plenty at point scale.
    if !v.is_finite() {
        return "0".to_string();
    }
    let r = (v * 1000.0).round() / 1000.0;
    fmt(r)
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn polygon_path(points: &[Point], tf: &CanvasTransform, bounds: &mut Bounds) -> String {
    let mut d = String::new();
    for (i, p) in points.iter().enumerate() {
        let q = tf.apply(*p);
        bounds.include(q);
        let _ = write!(
            &mut d,
            "{}{},{}",
            if i == 0 { "M" } else { "L" },
            fmt_path(q.x),
            fmt_path(q.y)
        );
    }
    if !d.is_empty() {
        d.push('Z');
    }
    d
}

/// Canvas-space box of a label after rotation about its anchor.
fn label_extent(
    label: &AlluvialLabelLayout,
    anchor: Point,
    style: &TextStyle,
    measurer: &dyn TextMeasurer,
) -> [Point; 4] {
    let m = measurer.measure(&label.text, style);
    let (left, right) = match label.anchor {
        TextAnchor::Start => (0.0, m.width),
        TextAnchor::Middle => (-m.width / 2.0, m.width / 2.0),
        TextAnchor::End => (-m.width, 0.0),
    };
    let (top, bottom) = (-m.height / 2.0, m.height / 2.0);
    // SVG rotation is clockwise in a y-down space.
    let a = (-label.rotation).to_radians();
    let (sin, cos) = a.sin_cos();
    [(left, top), (right, top), (right, bottom), (left, bottom)].map(|(dx, dy)| {
        Point::new(
            anchor.x + dx * cos - dy * sin,
            anchor.y + dx * sin + dy * cos,
        )
    })
}

/// CSS font list for labels: the figure's font first, the context default as fallback.
pub fn font_stack(fontname: &str, fallback: &str) -> String {
    let fontname = fontname.trim();
    let fallback = fallback.trim();
    if fontname.is_empty() {
        fallback.to_string()
    } else if fallback.is_empty() || fontname.eq_ignore_ascii_case(fallback) {
        fontname.to_string()
    } else {
        format!("{fontname}, {fallback}")
    }
}

pub fn render_alluvial_svg(
    layout: &AlluvialDiagramLayout,
    options: &AlluvialOptions,
    fonts: &FontDefaults,
    measurer: &dyn TextMeasurer,
    svg_options: &SvgRenderOptions,
) -> Result<String> {
    let tf = CanvasTransform::new(options.figsize, &layout.data_bounds);
    let mut content = Bounds::empty();
    let mut body = String::new();

    body.push_str(r#"<g class="veins">"#);
    for v in &layout.veins {
        let d = polygon_path(&v.polygon, &tf, &mut content);
        let _ = write!(
            &mut body,
            r#"<path class="vein" d="{d}" fill="{fill}" fill-opacity="{alpha}" stroke="none"/>"#,
            fill = v.color.to_hex_rgb(),
            alpha = fmt(options.alpha * v.color.opacity()),
        );
    }
    body.push_str("</g>");

    body.push_str(r#"<g class="side-rects">"#);
    for v in &layout.veins {
        for rect in v.source_rect.iter().chain(v.target_rect.iter()) {
            let d = polygon_path(rect, &tf, &mut content);
            let _ = write!(
                &mut body,
                r#"<path d="{d}" fill="{fill}" stroke="none"/>"#,
                fill = v.color.to_hex_rgb(),
            );
        }
    }
    body.push_str("</g>");

    body.push_str(r#"<g class="bars">"#);
    for n in &layout.nodes {
        if let Some(bar) = &n.bar {
            let d = polygon_path(bar, &tf, &mut content);
            let _ = write!(
                &mut body,
                r#"<path d="{d}" fill="{INNER_BAR_FILL}" stroke="none"/>"#
            );
        }
    }
    body.push_str("</g>");

    let family = font_stack(&options.fontname, &fonts.family);
    let _ = write!(
        &mut body,
        r#"<g class="labels" font-family="{family}" font-weight="{weight}" fill="black">"#,
        family = escape_xml(&family),
        weight = escape_xml(&fonts.weight),
    );
    for label in &layout.labels {
        let anchor = tf.apply(Point::new(label.x, label.y));
        let style = TextStyle {
            font_family: Some(family.clone()),
            font_size: label.font_size,
            font_weight: Some(fonts.weight.clone()),
        };
        for corner in label_extent(label, anchor, &style, measurer) {
            content.include(corner);
        }

        let transform = if label.rotation == 0.0 {
            String::new()
        } else {
            format!(
                r#" transform="rotate({} {} {})""#,
                fmt(-label.rotation),
                fmt_path(anchor.x),
                fmt_path(anchor.y)
            )
        };
        let _ = write!(
            &mut body,
            r#"<text x="{x}" y="{y}" font-size="{size}" text-anchor="{anchor}" dominant-baseline="central" xml:space="preserve"{transform}>{text}</text>"#,
            x = fmt_path(anchor.x),
            y = fmt_path(anchor.y),
            size = fmt(label.font_size),
            anchor = label.anchor.as_svg(),
            text = escape_xml(&label.text),
        );
    }
    body.push_str("</g>");

    if content.is_empty() {
        content = Bounds {
            min_x: 0.0,
            min_y: 0.0,
            max_x: options.figsize.0 * POINTS_PER_INCH,
            max_y: options.figsize.1 * POINTS_PER_INCH,
        };
    }
    let pad = svg_options.pad_inches.max(0.0) * POINTS_PER_INCH;
    let vb_x = content.min_x - pad;
    let vb_y = content.min_y - pad;
    let vb_w = (content.width() + 2.0 * pad).max(1.0);
    let vb_h = (content.height() + 2.0 * pad).max(1.0);

    let diagram_id = svg_options.diagram_id.as_deref().unwrap_or("alluvial");
    let mut out = String::with_capacity(body.len() + 512);
    let _ = write!(
        &mut out,
        r#"<svg id="{id}" xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="{x} {y} {w} {h}" role="graphics-document document" aria-roledescription="alluvial">"#,
        id = escape_xml(diagram_id),
        x = fmt_path(vb_x),
        y = fmt_path(vb_y),
        w = fmt_path(vb_w),
        h = fmt_path(vb_h),
    );
    if let Some(bg) = svg_options.background {
        let _ = write!(
            &mut out,
            r#"<rect class="background" x="{x}" y="{y}" width="{w}" height="{h}" fill="{fill}" fill-opacity="{opacity}"/>"#,
            x = fmt_path(vb_x),
            y = fmt_path(vb_y),
            w = fmt_path(vb_w),
            h = fmt_path(vb_h),
            fill = bg.to_hex_rgb(),
            opacity = fmt(bg.opacity()),
        );
    }
    out.push_str(&body);
    out.push_str("</svg>");
    Ok(out)
}
