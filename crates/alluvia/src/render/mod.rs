//! Layout and SVG building blocks, re-exported for callers that bypass [`crate::RenderContext`].

pub use alluvia_render::layout::{AlluvialLayoutEngine, LayoutEngine, vein_profile};
pub use alluvia_render::model::{
    AlluvialDiagramLayout, AlluvialLabelLayout, AlluvialNodeLayout, AlluvialVeinLayout, Bounds,
    LabelKind, Point, StageSide, TextAnchor,
};
pub use alluvia_render::svg::{POINTS_PER_INCH, SvgRenderOptions, render_alluvial_svg};
pub use alluvia_render::text::{DeterministicTextMeasurer, TextMeasurer, TextStyle};
pub use alluvia_render::layout_alluvial_diagram;

#[cfg(feature = "raster")]
pub mod raster;
