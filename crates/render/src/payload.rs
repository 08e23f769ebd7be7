//! Renderer-agnostic chart payload.

use std::str::FromStr;

use serde::Serialize;
use tabula_core::config::ChartConfig;

use crate::error::{RenderError, Result};
use crate::summary::AggregationSummary;

/// Height of density-layout charts, in pixels.
pub const DENSITY_HEIGHT: u32 = 500;

/// One x-axis label: 1-based position and text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AxisLabel {
    pub value: usize,
    pub text: String,
}

/// How chart dimensions are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartLayout {
    /// Width grows with the number of labels: `max_bar_width × labels × 2.5`.
    Density { max_bar_width: u32 },
    Fixed { width: u32, height: u32 },
}

impl ChartLayout {
    pub fn from_config(config: &ChartConfig) -> Result<Self> {
        match config.layout.trim().to_ascii_lowercase().as_str() {
            "density" => Ok(ChartLayout::Density {
                max_bar_width: config.max_bar_width,
            }),
            "fixed" => Ok(ChartLayout::Fixed {
                width: config.fixed_width,
                height: config.fixed_height,
            }),
            other => Err(RenderError::UnknownLayout(other.to_string())),
        }
    }

    /// `(width, height)` for a chart with `label_count` labels.
    pub fn dimensions(&self, label_count: usize) -> (u32, u32) {
        match *self {
            ChartLayout::Density { max_bar_width } => {
                let width = f64::from(max_bar_width) * label_count as f64 * 2.5;
                (width as u32, DENSITY_HEIGHT)
            }
            ChartLayout::Fixed { width, height } => (width, height),
        }
    }

    pub fn max_bar_width(&self) -> Option<u32> {
        match *self {
            ChartLayout::Density { max_bar_width } => Some(max_bar_width),
            ChartLayout::Fixed { .. } => None,
        }
    }
}

impl Default for ChartLayout {
    fn default() -> Self {
        ChartLayout::Density { max_bar_width: 40 }
    }
}

impl FromStr for ChartLayout {
    type Err = RenderError;

    /// `density`, `density:<bar width>` or `fixed:<width>x<height>`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (kind, arg) = s.split_once(':').unwrap_or((s, ""));
        let invalid = || RenderError::UnknownLayout(s.to_string());
        match kind.to_ascii_lowercase().as_str() {
            "density" if arg.is_empty() => Ok(ChartLayout::default()),
            "density" => Ok(ChartLayout::Density {
                max_bar_width: arg.parse().map_err(|_| invalid())?,
            }),
            "fixed" => {
                let (w, h) = arg.split_once('x').ok_or_else(invalid)?;
                Ok(ChartLayout::Fixed {
                    width: w.trim().parse().map_err(|_| invalid())?,
                    height: h.trim().parse().map_err(|_| invalid())?,
                })
            }
            _ => Err(invalid()),
        }
    }
}

/// Title, parallel value and label sequences, and dimensions of one chart.
///
/// `values[i]` is the count for `labels[i]`; both always have the same
/// length and label positions run `1..=len` without gaps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPayload {
    title: String,
    values: Vec<u64>,
    labels: Vec<AxisLabel>,
    layout: ChartLayout,
    width: u32,
    height: u32,
}

impl ChartPayload {
    pub fn from_summary(title: impl Into<String>, summary: &AggregationSummary, layout: ChartLayout) -> Self {
        let labels: Vec<AxisLabel> = summary
            .labels()
            .iter()
            .enumerate()
            .map(|(i, text)| AxisLabel {
                value: i + 1,
                text: text.clone(),
            })
            .collect();
        let (width, height) = layout.dimensions(labels.len());
        Self {
            title: title.into(),
            values: summary.values(),
            labels,
            layout,
            width,
            height,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn values(&self) -> &[u64] {
        &self.values
    }

    pub fn labels(&self) -> &[AxisLabel] {
        &self.labels
    }

    pub fn layout(&self) -> ChartLayout {
        self.layout
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// `var chartData = [3,2,1];`
    pub fn data_literal(&self) -> String {
        let values: Vec<String> = self.values.iter().map(u64::to_string).collect();
        format!("var chartData = [{}];", values.join(","))
    }

    /// `labels: [{value:1, text: "A"},{value:2, text: "B"}],`
    ///
    /// Label text is written as a JSON string literal, so quotes, backslashes
    /// and control characters cannot break out of the literal.
    pub fn labels_literal(&self) -> Result<String> {
        let mut entries = Vec::with_capacity(self.labels.len());
        for label in &self.labels {
            entries.push(format!(
                "{{value:{}, text: {}}}",
                label.value,
                serde_json::to_string(&label.text)?
            ));
        }
        Ok(format!("labels: [{}],", entries.join(",")))
    }

    /// Data and label literals, one per line.
    pub fn to_script(&self) -> Result<String> {
        Ok(format!("{}\n{}", self.data_literal(), self.labels_literal()?))
    }
}
