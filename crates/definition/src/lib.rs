//! Declarative definitions and their parameter bindings.
//!
//! This crate provides:
//! - YAML-backed `Definition` schema with typed parameter slots
//! - `Mapped` bindings (literal, `${expression}`, nested mapped definition)
//! - The `DefinitionRepository` boundary plus a filesystem loader adapter

pub mod loader;
pub mod repository;
pub mod schema;

pub use loader::{DefinitionError, DefinitionLoader, LoadResult, LoadStatus};
pub use repository::{DefinitionRepository, MemoryRepository};
pub use schema::*;
