//! Parameter bindings that instantiate a definition.

use std::sync::Arc;

use indexmap::IndexMap;
use tabula_core::Value;

use super::Definition;

/// A single parameter binding.
#[derive(Debug, Clone, PartialEq)]
pub enum MappedValue {
    /// A concrete value.
    Literal(Value),
    /// `${name}`: a reference to a parameter of the evaluation context.
    Expression(String),
    /// Another mapped definition, evaluated eagerly during resolution.
    Nested(Box<Mapped>),
}

impl MappedValue {
    /// Name referenced by an `${name}` expression.
    ///
    /// Bare names (without `${}`) are accepted as well.
    pub fn expression_target(&self) -> Option<&str> {
        match self {
            MappedValue::Expression(expr) => Some(parse_expression(expr)),
            _ => None,
        }
    }

    fn write_structure(&self, out: &mut String) {
        match self {
            MappedValue::Literal(value) => {
                out.push_str("lit(");
                out.push_str(&value.canonical());
                out.push(')');
            }
            MappedValue::Expression(expr) => {
                out.push_str(&format!("expr({})", parse_expression(expr)));
            }
            MappedValue::Nested(mapped) => {
                out.push_str("nested(");
                mapped.write_structure(out);
                out.push(')');
            }
        }
    }
}

/// Strip the `${` `}` wrapper of a parameter expression.
pub fn parse_expression(expr: &str) -> &str {
    let trimmed = expr.trim();
    trimmed
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
        .unwrap_or(trimmed)
        .trim()
}

/// A definition paired with parameter bindings.
///
/// The same definition can be mapped any number of times with different
/// bindings. Bindings are kept in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct Mapped {
    pub definition: Arc<Definition>,
    pub mappings: IndexMap<String, MappedValue>,
}

impl Mapped {
    pub fn new(definition: Arc<Definition>) -> Self {
        Self {
            definition,
            mappings: IndexMap::new(),
        }
    }

    pub fn literal(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.mappings
            .insert(name.into(), MappedValue::Literal(value.into()));
        self
    }

    pub fn expression(mut self, name: impl Into<String>, expr: impl Into<String>) -> Self {
        self.mappings
            .insert(name.into(), MappedValue::Expression(expr.into()));
        self
    }

    pub fn nested(mut self, name: impl Into<String>, mapped: Mapped) -> Self {
        self.mappings
            .insert(name.into(), MappedValue::Nested(Box::new(mapped)));
        self
    }

    pub fn get(&self, name: &str) -> Option<&MappedValue> {
        self.mappings.get(name)
    }

    /// Mapped names that the definition does not declare.
    pub fn unknown_parameters(&self) -> impl Iterator<Item = &str> {
        self.mappings
            .keys()
            .map(String::as_str)
            .filter(|name| self.definition.parameter(name).is_none())
    }

    /// Deterministic description of the definition version and all bindings.
    ///
    /// Two mapped definitions with equal structure keys evaluate identically
    /// against the same context.
    pub fn structure_key(&self) -> String {
        let mut out = String::new();
        self.write_structure(&mut out);
        out
    }

    fn write_structure(&self, out: &mut String) {
        out.push_str(&format!(
            "{}@{}{{",
            self.definition.metadata.id, self.definition.metadata.uuid
        ));
        let mut names: Vec<&String> = self.mappings.keys().collect();
        names.sort();
        for name in names {
            out.push_str(name);
            out.push('=');
            self.mappings[name.as_str()].write_structure(out);
            out.push(';');
        }
        out.push('}');
    }
}

impl From<Arc<Definition>> for Mapped {
    fn from(definition: Arc<Definition>) -> Self {
        Mapped::new(definition)
    }
}
