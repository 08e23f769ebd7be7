//! Definition evaluation engine.
//!
//! This crate provides:
//! - `EvaluationContext`: scope, global parameters and cache handle
//! - `EvaluatorRegistry`: family/type → evaluator strategy lookup
//! - Mapped-parameter resolution with per-pass memoization of nested definitions
//! - `Engine` + typed `DefinitionService<F>` facades with compute-once caching
//! - Built-in evaluators (`dataset/inline`, `column/constant`, `report/union`)

pub mod cache;
pub mod context;
pub mod engine;
pub mod error;
pub mod evaluated;
pub mod evaluators;
pub mod fingerprint;
pub mod registry;
pub mod resolve;
pub mod service;

pub use cache::{CacheKey, CacheStats, CachedEvaluation, EvaluationCache};
pub use context::{EvaluationContext, Parameters, Scope};
pub use engine::{Engine, DEFAULT_MAX_DEPTH};
pub use error::{EvalError, Result};
pub use evaluated::Evaluated;
pub use evaluators::register_builtins;
pub use registry::{Evaluator, EvaluatorRegistry, RegistryError};
pub use resolve::resolve;
pub use service::{
    ColumnDefinitionService, ColumnFamily, DataSetDefinitionService, DataSetFamily,
    DefinitionService, Family, ReportDefinitionService, ReportFamily, VisitDataFamily,
    VisitDataService,
};
