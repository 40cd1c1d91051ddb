use alluvia::render::{AlluvialDiagramLayout, AlluvialLayoutEngine, LayoutEngine};
use alluvia::{
    AlluvialOptions, FlowTable, FontDefaults, MemoryDisplay, RenderContext, RenderError,
    render_sankey,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

fn minimal() -> Vec<Vec<&'static str>> {
    vec![vec!["a", "x"], vec!["a", "y"], vec!["b", "y"]]
}

/// Records the options it is called with and delegates to the real layout.
#[derive(Default)]
struct CapturingEngine {
    seen: Mutex<Vec<AlluvialOptions>>,
}

impl CapturingEngine {
    fn seen(&self) -> Vec<AlluvialOptions> {
        self.seen.lock().unwrap().clone()
    }
}

impl LayoutEngine for CapturingEngine {
    fn layout(
        &self,
        table: &FlowTable,
        options: &AlluvialOptions,
        fonts: &FontDefaults,
    ) -> alluvia_render::Result<AlluvialDiagramLayout> {
        self.seen.lock().unwrap().push(options.clone());
        AlluvialLayoutEngine.layout(table, options, fonts)
    }
}

#[test]
fn minimal_call_leaves_nothing_open() {
    let mut ctx = RenderContext::new();
    render_sankey(&mut ctx, minimal(), None, false, &AlluvialOptions::default()).unwrap();
    assert_eq!(ctx.open_figures(), 0);
}

#[test]
fn save_path_produces_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("flows.svg");

    let mut ctx = RenderContext::new();
    ctx.render_sankey(minimal(), Some(&out), false, &AlluvialOptions::default())
        .unwrap();

    let svg = std::fs::read_to_string(&out).expect("saved file");
    let doc = roxmltree::Document::parse(&svg).expect("valid svg");
    assert_eq!(doc.root_element().tag_name().name(), "svg");
    assert_eq!(ctx.open_figures(), 0);
}

#[test]
fn explicit_option_reaches_the_layout_engine() {
    let engine = Arc::new(CapturingEngine::default());
    let mut ctx = RenderContext::new().with_engine(engine.clone());
    let options = AlluvialOptions {
        alpha: 0.9,
        ..Default::default()
    };
    ctx.render_sankey(minimal(), None, false, &options).unwrap();

    let seen = engine.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].alpha, 0.9);
    assert_eq!(seen[0].res, 20);
}

#[test]
fn omitted_options_reach_the_engine_as_defaults() {
    let engine = Arc::new(CapturingEngine::default());
    let mut ctx = RenderContext::new().with_engine(engine.clone());
    ctx.render_sankey(minimal(), None, false, &AlluvialOptions::default())
        .unwrap();

    let seen = engine.seen();
    let o = &seen[0];
    assert_eq!(o.color_side, 1);
    assert_eq!(o.alpha, 0.5);
    assert_eq!(o.x_range, (0.0, 1.0));
    assert_eq!(o.res, 20);
    assert_eq!(o.figsize, (21.0, 15.0));
    assert!(o.disp_width && o.width_in);
    assert_eq!(o.wdisp_sep, "  ");
    assert_eq!(o.cmap, alluvia::Colormap::Jet);
    assert_eq!((o.v_gap_frac, o.h_gap_frac), (0.03, 0.03));
    assert_eq!(o.labels, None);
    assert_eq!(o.fontname, "Arial");
    assert_eq!(o.dpi, 200.0);
}

#[test]
fn sequential_calls_each_leave_the_context_empty() {
    let mut ctx = RenderContext::new();
    for _ in 0..2 {
        ctx.render_sankey(minimal(), None, false, &AlluvialOptions::default())
            .unwrap();
        assert_eq!(ctx.open_figures(), 0);
    }
}

#[test]
fn unconvertible_data_fails_before_layout() {
    let engine = Arc::new(CapturingEngine::default());
    let mut ctx = RenderContext::new().with_engine(engine.clone());

    let ragged = vec![vec!["a", "x"], vec!["b"]];
    let err = ctx
        .render_sankey(ragged, None, false, &AlluvialOptions::default())
        .unwrap_err();
    assert!(matches!(err, RenderError::Data(_)), "{err}");

    let nested = serde_json::json!([[["deep"], "x"]]);
    let err = ctx
        .render_sankey(&nested, None, false, &AlluvialOptions::default())
        .unwrap_err();
    assert!(matches!(err, RenderError::Data(_)), "{err}");

    assert!(engine.seen().is_empty());
    assert_eq!(ctx.open_figures(), 0);
}

#[test]
fn failures_after_layout_still_close_the_figure() {
    // Headless display: showing fails.
    let mut ctx = RenderContext::new();
    let err = ctx
        .render_sankey(minimal(), None, true, &AlluvialOptions::default())
        .unwrap_err();
    assert!(matches!(err, RenderError::NoDisplay));
    assert_eq!(ctx.open_figures(), 0);

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("flows.bmp");
    let err = ctx
        .render_sankey(minimal(), Some(&out), false, &AlluvialOptions::default())
        .unwrap_err();
    assert!(matches!(err, RenderError::UnsupportedFormat { .. }));
    assert!(!out.exists());
    assert_eq!(ctx.open_figures(), 0);

    let bad = AlluvialOptions {
        labels: Some(vec!["one".to_string()]),
        ..Default::default()
    };
    let err = ctx.render_sankey(minimal(), None, false, &bad).unwrap_err();
    assert!(matches!(err, RenderError::Layout(_)));
    assert_eq!(ctx.open_figures(), 0);
}

#[test]
fn show_presents_the_figure_on_the_display() {
    let display = MemoryDisplay::new();
    let mut ctx = RenderContext::new().with_display(display.clone());
    ctx.render_sankey(minimal(), None, true, &AlluvialOptions::default())
        .unwrap();
    ctx.render_sankey(minimal(), None, true, &AlluvialOptions::default())
        .unwrap();

    let shown = display.shown();
    assert_eq!(shown.len(), 2);
    assert_ne!(shown[0].id, shown[1].id);
    assert!(shown[0].svg.starts_with("<svg"));
    assert_eq!(ctx.open_figures(), 0);
}

#[test]
fn context_font_family_backs_up_the_figure_font() {
    let mut ctx = RenderContext::new().with_fonts(FontDefaults {
        family: "DejaVu Sans".to_string(),
        ..Default::default()
    });
    let svg = ctx
        .render_svg_string(minimal(), &AlluvialOptions::default())
        .unwrap();
    assert!(svg.contains(r#"font-family="Arial, DejaVu Sans""#));

    let no_font = AlluvialOptions {
        fontname: String::new(),
        ..Default::default()
    };
    let svg = ctx.render_svg_string(minimal(), &no_font).unwrap();
    assert!(svg.contains(r#"font-family="DejaVu Sans""#));
}

#[test]
fn fixture_with_stage_labels_renders() {
    let text = std::fs::read_to_string(workspace_root().join("fixtures/three_stage.json"))
        .expect("fixture");
    let data: serde_json::Value = serde_json::from_str(&text).unwrap();
    let yaml = std::fs::read_to_string(workspace_root().join("fixtures/options.yaml"))
        .expect("fixture");
    let options = AlluvialOptions::from_yaml_str(&yaml).unwrap();
    let options = AlluvialOptions {
        labels: Some(vec!["age".into(), "lineage".into(), "type".into()]),
        ..options
    };

    let mut ctx = RenderContext::new();
    let svg = ctx.render_svg_string(data, &options).unwrap();
    assert!(svg.contains(">lineage</text>"));
    assert!(svg.contains(r#"fill-opacity="0.7""#));
    assert_eq!(ctx.open_figures(), 0);
}

#[cfg(not(feature = "raster"))]
#[test]
fn raster_output_needs_the_feature() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("flows.png");
    let mut ctx = RenderContext::new();
    let err = ctx
        .render_sankey(minimal(), Some(&out), false, &AlluvialOptions::default())
        .unwrap_err();
    assert!(matches!(err, RenderError::RasterUnavailable { .. }));
}

#[cfg(feature = "raster")]
#[test]
fn raster_formats_are_written() {
    let dir = tempfile::tempdir().unwrap();
    let options = AlluvialOptions {
        figsize: (4.0, 3.0),
        dpi: 72.0,
        ..Default::default()
    };
    let mut ctx = RenderContext::new();
    for (name, magic) in [
        ("flows.png", &b"\x89PNG\r\n\x1a\n"[..]),
        ("flows.jpg", &[0xFF, 0xD8][..]),
        ("flows.pdf", &b"%PDF-"[..]),
    ] {
        let out = dir.path().join(name);
        ctx.render_sankey(minimal(), Some(&out), false, &options)
            .unwrap();
        let bytes = std::fs::read(&out).unwrap();
        assert!(bytes.starts_with(magic), "{name}");
    }
}
