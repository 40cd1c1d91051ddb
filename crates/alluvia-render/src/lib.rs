#![forbid(unsafe_code)]

//! Headless layout and SVG rendering of alluvial diagrams.
//!
//! [`layout::layout_alluvial_diagram`] turns a [`FlowTable`](alluvia_core::FlowTable) into
//! geometry ([`model::AlluvialDiagramLayout`]); [`svg::render_alluvial_svg`] draws it onto a
//! canvas of the configured size and crops it to the content.

pub mod label;
pub mod layout;
pub mod model;
pub mod svg;
pub mod text;

pub use layout::{AlluvialLayoutEngine, LayoutEngine, layout_alluvial_diagram};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Options(#[from] alluvia_core::Error),
    #[error("invalid layout input: {message}")]
    InvalidInput { message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
