//! Chart rendering for evaluated data sets.
//!
//! This crate provides:
//! - `summarize`: folds data set rows into a value-frequency summary
//! - `ChartPayload`: renderer-agnostic title, values and 1-based labels,
//!   serialized as JSON or as script literals
//! - `ChartRenderer`: summary + title + layout from `ChartConfig`

pub mod error;
pub mod payload;
pub mod renderer;
pub mod summary;

pub use error::{RenderError, Result};
pub use payload::{AxisLabel, ChartLayout, ChartPayload};
pub use renderer::{ChartRenderer, ReportData};
pub use summary::{summarize, summarize_columns, AggregationSummary, OrderPolicy};
