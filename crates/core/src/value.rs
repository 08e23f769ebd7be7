use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dataset::DataSet;

/// Identifier of a subject (patient, member, visit owner) inside a scope.
pub type SubjectId = i64;

/// A group of subjects. Appears in result rows as a population marker,
/// never as a countable data point.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cohort {
    #[serde(default)]
    pub name: Option<String>,
    pub members: BTreeSet<SubjectId>,
}

impl Cohort {
    pub fn new(members: impl IntoIterator<Item = SubjectId>) -> Self {
        Self {
            name: None,
            members: members.into_iter().collect(),
        }
    }

    pub fn named(name: impl Into<String>, members: impl IntoIterator<Item = SubjectId>) -> Self {
        Self {
            name: Some(name.into()),
            members: members.into_iter().collect(),
        }
    }

    pub fn contains(&self, subject: SubjectId) -> bool {
        self.members.contains(&subject)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// A cell or parameter value.
///
/// Deserialization is untagged and tries variants in declaration order, so
/// `7` is an integer, `7.5` a decimal and `"2024-01-31"` a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Decimal(f64),
    Date(NaiveDate),
    Text(String),
    List(Vec<Value>),
    Cohort(Cohort),
    /// Result of eagerly evaluating a nested mapped definition. Only ever
    /// produced by evaluation, never read from YAML.
    #[serde(skip_deserializing)]
    Data(Arc<DataSet>),
}

impl Value {
    /// Parse a command-line style literal (`7`, `7.5`, `true`, `2024-01-31`, text).
    pub fn parse_literal(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "null" {
            return Value::Null;
        }
        if let Ok(b) = trimmed.parse::<bool>() {
            return Value::Bool(b);
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Value::Integer(i);
        }
        if let Ok(d) = trimmed.parse::<f64>() {
            return Value::Decimal(d);
        }
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return Value::Date(date);
        }
        Value::Text(raw.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Population markers identify groups, not data points.
    pub fn is_cohort(&self) -> bool {
        matches!(self, Value::Cohort(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_data(&self) -> Option<&Arc<DataSet>> {
        match self {
            Value::Data(data) => Some(data),
            _ => None,
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Any,
            Value::Bool(_) => ValueType::Boolean,
            Value::Integer(_) => ValueType::Integer,
            Value::Decimal(_) => ValueType::Decimal,
            Value::Date(_) => ValueType::Date,
            Value::Text(_) => ValueType::Text,
            Value::List(_) => ValueType::List,
            Value::Cohort(_) => ValueType::Cohort,
            Value::Data(_) => ValueType::DataSet,
        }
    }

    /// Type-tagged, deterministic encoding used for fingerprinting.
    ///
    /// Unlike `Display`, `Integer(1)` and `Text("1")` encode differently.
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        self.write_canonical(&mut out);
        out
    }

    fn write_canonical(&self, out: &mut String) {
        match self {
            Value::Null => out.push_str("n;"),
            Value::Bool(b) => out.push_str(&format!("b:{};", b)),
            Value::Integer(i) => out.push_str(&format!("i:{};", i)),
            Value::Decimal(d) => out.push_str(&format!("d:{:?};", d)),
            Value::Date(date) => out.push_str(&format!("t:{};", date)),
            Value::Text(s) => out.push_str(&format!("s{}:{};", s.len(), s)),
            Value::List(items) => {
                out.push_str(&format!("l{}[", items.len()));
                for item in items {
                    item.write_canonical(out);
                }
                out.push(']');
            }
            Value::Cohort(cohort) => {
                out.push_str(&format!("c{}[", cohort.members.len()));
                for member in &cohort.members {
                    out.push_str(&format!("{},", member));
                }
                out.push(']');
            }
            Value::Data(data) => {
                out.push_str(&format!("h{}[", data.columns().len()));
                for column in data.columns() {
                    let label = column.label.as_deref().unwrap_or("");
                    out.push_str(&format!(
                        "{}:{}/{}:{}/{};",
                        column.name.len(),
                        column.name,
                        label.len(),
                        label,
                        column.value_type
                    ));
                }
                out.push_str(&format!("]r{}[", data.len()));
                for row in data.rows() {
                    for (column, value) in row.iter() {
                        out.push_str(&format!("{}:{}=", column.len(), column));
                        value.write_canonical(out);
                    }
                    out.push('|');
                }
                out.push(']');
            }
        }
    }
}

/// Label text: this is the string the aggregator counts.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            // Whole decimals keep their fraction (`7.0`) so they never
            // merge with integer labels.
            Value::Decimal(d) if d.is_finite() && d.fract() == 0.0 && d.abs() < 1e16 => {
                write!(f, "{:.1}", d)
            }
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Value::Text(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Cohort(cohort) => match &cohort.name {
                Some(name) => write!(f, "Cohort {} ({} members)", name, cohort.len()),
                None => write!(f, "Cohort ({} members)", cohort.len()),
            },
            Value::Data(data) => write!(f, "DataSet ({} rows)", data.len()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Decimal(d)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<NaiveDate> for Value {
    fn from(date: NaiveDate) -> Self {
        Value::Date(date)
    }
}

impl From<Cohort> for Value {
    fn from(cohort: Cohort) -> Self {
        Value::Cohort(cohort)
    }
}

impl From<DataSet> for Value {
    fn from(data: DataSet) -> Self {
        Value::Data(Arc::new(data))
    }
}

/// Semantic type of a column or parameter slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    #[default]
    Any,
    Text,
    Integer,
    Decimal,
    Boolean,
    Date,
    List,
    Cohort,
    #[serde(rename = "dataset")]
    DataSet,
}

impl ValueType {
    /// Whether a value may be bound to a slot of this type. Null fits anywhere.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (ValueType::Any, _) | (_, Value::Null) => true,
            (ValueType::Text, Value::Text(_)) => true,
            (ValueType::Integer, Value::Integer(_)) => true,
            (ValueType::Decimal, Value::Decimal(_) | Value::Integer(_)) => true,
            (ValueType::Boolean, Value::Bool(_)) => true,
            (ValueType::Date, Value::Date(_)) => true,
            (ValueType::List, Value::List(_)) => true,
            (ValueType::Cohort, Value::Cohort(_)) => true,
            (ValueType::DataSet, Value::Data(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Any => "any",
            ValueType::Text => "text",
            ValueType::Integer => "integer",
            ValueType::Decimal => "decimal",
            ValueType::Boolean => "boolean",
            ValueType::Date => "date",
            ValueType::List => "list",
            ValueType::Cohort => "cohort",
            ValueType::DataSet => "dataset",
        };
        f.write_str(name)
    }
}
