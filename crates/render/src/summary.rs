//! Value-frequency aggregation over data sets.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tabula_core::{DataSet, Value};

use crate::error::{RenderError, Result};

/// Order in which distinct values become chart labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderPolicy {
    /// Ascending lexical order of the label text, by UTF-16 code unit.
    #[default]
    Sorted,
    /// Order of first appearance.
    InsertionOrder,
}

impl FromStr for OrderPolicy {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sorted" | "sort" | "lexical" => Ok(OrderPolicy::Sorted),
            "insertion" | "insertion_order" | "insertion-order" | "first_seen" => {
                Ok(OrderPolicy::InsertionOrder)
            }
            other => Err(RenderError::UnknownOrderPolicy(other.to_string())),
        }
    }
}

impl fmt::Display for OrderPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderPolicy::Sorted => f.write_str("sorted"),
            OrderPolicy::InsertionOrder => f.write_str("insertion"),
        }
    }
}

/// Distinct value text → occurrence count, with labels in policy order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationSummary {
    /// Counts keyed by label text, in first-seen order.
    counts: IndexMap<String, u64>,
    /// Labels in output order.
    labels: Vec<String>,
}

impl AggregationSummary {
    /// Labels in output order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Counts parallel to [`labels`](Self::labels).
    pub fn values(&self) -> Vec<u64> {
        self.labels
            .iter()
            .map(|label| self.counts.get(label).copied().unwrap_or(0))
            .collect()
    }

    pub fn count(&self, label: &str) -> Option<u64> {
        self.counts.get(label).copied()
    }

    /// `(label, count)` pairs in output order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.labels
            .iter()
            .map(|label| (label.as_str(), self.counts.get(label).copied().unwrap_or(0)))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Count every value of every declared column across `datasets`.
///
/// Absent and null values are skipped, and so are cohort markers: they
/// identify populations, not data points. Fails only when no data set is
/// supplied at all; empty data sets produce an empty summary.
pub fn summarize(datasets: &[&DataSet], policy: OrderPolicy) -> Result<AggregationSummary> {
    summarize_columns(datasets, policy, None)
}

/// Like [`summarize`], restricted to the named columns when `columns` is set.
pub fn summarize_columns(
    datasets: &[&DataSet],
    policy: OrderPolicy,
    columns: Option<&[String]>,
) -> Result<AggregationSummary> {
    if datasets.is_empty() {
        return Err(RenderError::InvalidInput(
            "no data sets supplied to summarize".to_string(),
        ));
    }

    let mut counts: IndexMap<String, u64> = IndexMap::new();
    for data in datasets {
        let selected: Vec<&str> = data
            .columns()
            .iter()
            .map(|c| c.name.as_str())
            .filter(|name| columns.map_or(true, |wanted| wanted.iter().any(|w| w == name)))
            .collect();

        for row in data.rows() {
            for column in &selected {
                match row.value(column) {
                    None | Some(Value::Null) | Some(Value::Cohort(_)) => {}
                    Some(value) => *counts.entry(value.to_string()).or_insert(0) += 1,
                }
            }
        }
    }

    let mut labels: Vec<String> = counts.keys().cloned().collect();
    if policy == OrderPolicy::Sorted {
        // UTF-16 code-unit order: differs from byte order outside the BMP.
        labels.sort_by(|a, b| a.encode_utf16().cmp(b.encode_utf16()));
    }

    Ok(AggregationSummary { counts, labels })
}
