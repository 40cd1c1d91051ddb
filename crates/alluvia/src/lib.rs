#![forbid(unsafe_code)]

//! `alluvia` renders alluvial (Sankey) diagrams from flow records.
//!
//! All state lives in an explicit [`RenderContext`]: font defaults, the layout engine, the
//! display surface and the figures currently open. [`render_sankey`] lays out one diagram,
//! optionally saves and shows it, and disposes of it before returning.
//!
//! # Features
//!
//! - `raster`: enable PNG/JPG/PDF output via pure-Rust SVG rasterization/conversion

pub use alluvia_core::{
    AlluvialOptions, Colormap, CsvOptions, FlowTable, FontDefaults, IntoFlowTable,
    OptionOverrides, Rgba,
};

pub mod context;
pub mod display;
pub mod figure;
pub mod render;

pub use context::{RenderContext, render_sankey};
pub use display::{DisplaySurface, Headless, MemoryDisplay, ShownFigure, SystemViewer};
pub use figure::{Figure, SaveFormat};

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Data(#[from] alluvia_core::Error),
    #[error(transparent)]
    Layout(#[from] alluvia_render::Error),
    #[error("failed to write `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot infer an output format from `{}` (expected .svg, .png, .jpg, .jpeg or .pdf)", .path.display())]
    UnsupportedFormat { path: PathBuf },
    #[error("{format} output requires the `raster` feature")]
    RasterUnavailable { format: SaveFormat },
    #[cfg(feature = "raster")]
    #[error(transparent)]
    Raster(#[from] render::raster::RasterError),
    #[error("no display available; save the figure to a file instead")]
    NoDisplay,
    #[error("failed to show figure: {message}")]
    Display { message: String },
}

pub type Result<T> = std::result::Result<T, RenderError>;
