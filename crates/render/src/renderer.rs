//! Chart renderer: report data in, chart payload out.

use std::sync::Arc;

use indexmap::IndexMap;
use tabula_core::config::ChartConfig;
use tabula_core::DataSet;
use tracing::debug;

use crate::error::{RenderError, Result};
use crate::payload::{ChartLayout, ChartPayload};
use crate::summary::{summarize_columns, OrderPolicy};

/// Named data sets produced for one report, in evaluation order.
#[derive(Debug, Clone, Default)]
pub struct ReportData {
    pub name: String,
    pub datasets: IndexMap<String, Arc<DataSet>>,
}

impl ReportData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            datasets: IndexMap::new(),
        }
    }

    pub fn with_dataset(mut self, name: impl Into<String>, data: impl Into<Arc<DataSet>>) -> Self {
        self.datasets.insert(name.into(), data.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, data: impl Into<Arc<DataSet>>) {
        self.datasets.insert(name.into(), data.into());
    }
}

/// Folds report data sets into a frequency chart.
#[derive(Debug, Clone, Default)]
pub struct ChartRenderer {
    order: OrderPolicy,
    title: Option<String>,
    layout: ChartLayout,
    columns: Option<Vec<String>>,
}

impl ChartRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ChartConfig) -> Result<Self> {
        Ok(Self {
            order: config.order.parse()?,
            title: config.title.clone(),
            layout: ChartLayout::from_config(config)?,
            columns: None,
        })
    }

    pub fn with_order(mut self, order: OrderPolicy) -> Self {
        self.order = order;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_layout(mut self, layout: ChartLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Count only these columns instead of every declared column.
    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = Some(columns);
        self
    }

    pub fn order(&self) -> OrderPolicy {
        self.order
    }

    pub fn content_type(&self) -> &'static str {
        "application/json"
    }

    pub fn filename(&self, report: &ReportData) -> String {
        format!("{}.json", report.name)
    }

    /// Summarize every data set of `report` into one chart.
    ///
    /// The title is the configured one, or else the name of the last data
    /// set. Fails with `InvalidInput` when the report holds no data sets.
    pub fn render(&self, report: &ReportData) -> Result<ChartPayload> {
        let Some(last) = report.datasets.keys().last() else {
            return Err(RenderError::InvalidInput(format!(
                "report '{}' has no data sets",
                report.name
            )));
        };

        let datasets: Vec<&DataSet> = report.datasets.values().map(Arc::as_ref).collect();
        let summary = summarize_columns(&datasets, self.order, self.columns.as_deref())?;
        let title = self.title.clone().unwrap_or_else(|| last.clone());

        debug!(
            report = %report.name,
            datasets = datasets.len(),
            labels = summary.len(),
            order = %self.order,
            "rendered chart"
        );

        Ok(ChartPayload::from_summary(title, &summary, self.layout))
    }
}
