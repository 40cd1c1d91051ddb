#![forbid(unsafe_code)]

//! Data model for alluvial (Sankey) diagrams: flow tables, options and colormaps.
//!
//! A [`FlowTable`] holds one row per entity and one column per stage. Adjacent columns are
//! connected by ribbons whose widths are the summed row weights.

pub mod color;
pub mod csv;
pub mod dataset;
pub mod error;
pub mod options;

pub use color::{Colormap, Rgba};
pub use csv::CsvOptions;
pub use dataset::{FlowTable, IntoFlowTable};
pub use error::{Error, Result};
pub use options::{AlluvialOptions, FontDefaults, OptionOverrides};
