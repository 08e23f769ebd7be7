use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TabulaError};
use crate::value::{Value, ValueType};

/// Column descriptor of a [`DataSet`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSetColumn {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, rename = "type")]
    pub value_type: ValueType,
}

impl DataSetColumn {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            label: None,
            value_type,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Label if set, otherwise the column name.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

/// One row. Sparse: a row may omit a value for any declared column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataSetRow {
    values: IndexMap<String, Value>,
}

impl DataSetRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(column.into(), value.into());
    }

    /// Value for `column`, or `None` when the row omits it.
    pub fn value(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for DataSetRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = DataSetRow::new();
        for (column, value) in iter {
            row.set(column, value);
        }
        row
    }
}

/// Tabular evaluation result: ordered columns plus ordered rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSet {
    #[serde(default)]
    columns: Vec<DataSetColumn>,
    #[serde(default)]
    rows: Vec<DataSetRow>,
}

impl DataSet {
    /// Create an empty data set with the given columns.
    ///
    /// Fails on duplicate column names.
    pub fn new(columns: Vec<DataSetColumn>) -> Result<Self> {
        let mut data = DataSet::default();
        for column in columns {
            data.add_column(column)?;
        }
        Ok(data)
    }

    pub fn add_column(&mut self, column: DataSetColumn) -> Result<()> {
        if self.column(&column.name).is_some() {
            return Err(TabulaError::DuplicateColumn(column.name));
        }
        self.columns.push(column);
        Ok(())
    }

    /// Declare `column` unless a column of the same name already exists.
    pub fn ensure_column(&mut self, column: DataSetColumn) {
        if self.column(&column.name).is_none() {
            self.columns.push(column);
        }
    }

    /// Append a row. Every value must belong to a declared column.
    pub fn push_row(&mut self, row: DataSetRow) -> Result<()> {
        if let Some((name, _)) = row.iter().find(|(name, _)| self.column(name).is_none()) {
            return Err(TabulaError::UnknownColumn(name.clone()));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn with_row(mut self, row: DataSetRow) -> Result<Self> {
        self.push_row(row)?;
        Ok(self)
    }

    pub fn column(&self, name: &str) -> Option<&DataSetColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn columns(&self) -> &[DataSetColumn] {
        &self.columns
    }

    pub fn rows(&self) -> &[DataSetRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column in row order, skipping rows that omit it.
    pub fn column_values<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.rows.iter().filter_map(move |row| row.value(column))
    }
}

impl<'a> IntoIterator for &'a DataSet {
    type Item = &'a DataSetRow;
    type IntoIter = std::slice::Iter<'a, DataSetRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
