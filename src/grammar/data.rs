//! Columnar dataset.
//!
//! Field names keep insertion order; every column has the same length
//! (shorter columns are padded with [`DataValue::Null`]).

use std::fmt;

use indexmap::{IndexMap, IndexSet};
use ordered_float::OrderedFloat;

/// A value in a data frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DataValue {
    /// A numeric value.
    Number(f64),
    /// A text value.
    Text(String),
    /// A boolean value.
    Bool(bool),
    /// A missing value.
    #[default]
    Null,
}

impl DataValue {
    /// Get as f64, or None if not a finite number.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DataValue::Number(n) if n.is_finite() => Some(*n),
            _ => None,
        }
    }

    /// Get as string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DataValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Get as bool.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DataValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Null or NaN.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        match self {
            DataValue::Null => true,
            DataValue::Number(n) => n.is_nan(),
            _ => false,
        }
    }

    /// Hashable, totally ordered key for grouping and level ordering.
    #[must_use]
    pub fn level_key(&self) -> LevelKey {
        match self {
            DataValue::Null => LevelKey::Null,
            DataValue::Number(n) if n.is_nan() => LevelKey::Null,
            DataValue::Bool(b) => LevelKey::Bool(*b),
            DataValue::Number(n) => LevelKey::Number(OrderedFloat(*n)),
            DataValue::Text(s) => LevelKey::Text(s.clone()),
        }
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::Number(n) => write!(f, "{n}"),
            DataValue::Text(s) => f.write_str(s),
            DataValue::Bool(b) => write!(f, "{b}"),
            DataValue::Null => f.write_str("NA"),
        }
    }
}

impl From<f64> for DataValue {
    fn from(v: f64) -> Self {
        DataValue::Number(v)
    }
}

impl From<i32> for DataValue {
    fn from(v: i32) -> Self {
        DataValue::Number(f64::from(v))
    }
}

impl From<bool> for DataValue {
    fn from(v: bool) -> Self {
        DataValue::Bool(v)
    }
}

impl From<&str> for DataValue {
    fn from(s: &str) -> Self {
        DataValue::Text(s.to_string())
    }
}

impl From<String> for DataValue {
    fn from(s: String) -> Self {
        DataValue::Text(s)
    }
}

impl<T: Into<DataValue>> From<Option<T>> for DataValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(DataValue::Null, Into::into)
    }
}

/// A discrete level of a field.
///
/// Ordering is `Null < Bool < Number < Text`; numbers compare numerically and
/// text lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LevelKey {
    /// Missing.
    Null,
    /// Boolean level.
    Bool(bool),
    /// Numeric level.
    Number(OrderedFloat<f64>),
    /// Text level.
    Text(String),
}

impl LevelKey {
    /// Back to a data value.
    #[must_use]
    pub fn to_value(&self) -> DataValue {
        match self {
            LevelKey::Null => DataValue::Null,
            LevelKey::Bool(b) => DataValue::Bool(*b),
            LevelKey::Number(n) => DataValue::Number(n.into_inner()),
            LevelKey::Text(s) => DataValue::Text(s.clone()),
        }
    }
}

impl fmt::Display for LevelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_value().fmt(f)
    }
}

/// A simple columnar data frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataFrame {
    /// Column data keyed by column name, in insertion order.
    columns: IndexMap<String, Vec<DataValue>>,
    /// Number of rows.
    n_rows: usize,
}

impl DataFrame {
    /// Create a new empty data frame.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from x and y arrays.
    #[must_use]
    pub fn from_xy(x: &[f64], y: &[f64]) -> Self {
        let n = x.len().min(y.len());
        let mut df = Self::new();
        df.add_column_f64("x", &x[..n]);
        df.add_column_f64("y", &y[..n]);
        df
    }

    /// Create from a single data array.
    #[must_use]
    pub fn from_data(data: &[f64]) -> Self {
        let mut df = Self::new();
        df.add_column_f64("data", data);
        df
    }

    /// Add (or replace) a column, padding the frame with nulls as needed.
    pub fn add_column(&mut self, name: &str, mut values: Vec<DataValue>) {
        if values.len() > self.n_rows {
            self.n_rows = values.len();
            for column in self.columns.values_mut() {
                column.resize(self.n_rows, DataValue::Null);
            }
        }
        values.resize(self.n_rows, DataValue::Null);
        self.columns.insert(name.to_string(), values);
    }

    /// Add a numeric column.
    pub fn add_column_f64(&mut self, name: &str, data: &[f64]) {
        self.add_column(name, data.iter().map(|&v| DataValue::Number(v)).collect());
    }

    /// Add a text column.
    pub fn add_column_str(&mut self, name: &str, data: &[&str]) {
        self.add_column(name, data.iter().map(|&s| DataValue::Text(s.to_string())).collect());
    }

    /// Builder form of [`add_column`](Self::add_column).
    #[must_use]
    pub fn with_column<V: Into<DataValue>>(mut self, name: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.add_column(name, values.into_iter().map(Into::into).collect());
        self
    }

    /// Get a column.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[DataValue]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Finite numeric values of a column, skipping everything else.
    #[must_use]
    pub fn get_f64(&self, name: &str) -> Option<Vec<f64>> {
        self.columns.get(name).map(|col| col.iter().filter_map(DataValue::as_f64).collect())
    }

    /// Row-aligned numeric view of a column.
    #[must_use]
    pub fn numeric(&self, name: &str) -> Option<Vec<Option<f64>>> {
        self.columns.get(name).map(|col| col.iter().map(DataValue::as_f64).collect())
    }

    /// Single cell.
    #[must_use]
    pub fn value(&self, row: usize, name: &str) -> Option<&DataValue> {
        self.columns.get(name).and_then(|col| col.get(row))
    }

    /// Distinct levels of a column in first-seen order.
    #[must_use]
    pub fn levels(&self, name: &str) -> Option<Vec<LevelKey>> {
        self.columns.get(name).map(|col| {
            let set: IndexSet<LevelKey> = col.iter().map(DataValue::level_key).collect();
            set.into_iter().collect()
        })
    }

    /// New frame holding the given rows, in the given order.
    #[must_use]
    pub fn take_rows(&self, rows: &[usize]) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|(name, col)| {
                let picked = rows.iter().map(|&r| col.get(r).cloned().unwrap_or_default()).collect();
                (name.clone(), picked)
            })
            .collect();
        Self { columns, n_rows: rows.len() }
    }

    /// Stack frames vertically. Columns missing from a frame are null-filled.
    #[must_use]
    pub fn concat(frames: &[DataFrame]) -> Self {
        let mut names: IndexSet<&str> = IndexSet::new();
        for frame in frames {
            names.extend(frame.columns.keys().map(String::as_str));
        }
        let n_rows = frames.iter().map(DataFrame::nrow).sum();
        let columns = names
            .into_iter()
            .map(|name| {
                let mut values = Vec::with_capacity(n_rows);
                for frame in frames {
                    match frame.columns.get(name) {
                        Some(col) => values.extend(col.iter().cloned()),
                        None => values.extend(std::iter::repeat(DataValue::Null).take(frame.n_rows)),
                    }
                }
                (name.to_string(), values)
            })
            .collect();
        Self { columns, n_rows }
    }

    /// Remove a column.
    pub fn remove_column(&mut self, name: &str) -> Option<Vec<DataValue>> {
        self.columns.shift_remove(name)
    }

    /// Rename a column, keeping its position. Replaces any column already named `to`.
    pub fn rename_column(&mut self, from: &str, to: &str) {
        if from == to || !self.columns.contains_key(from) {
            return;
        }
        self.columns.shift_remove(to);
        if let Some(index) = self.columns.get_index_of(from) {
            if let Some((_, values)) = self.columns.shift_remove_index(index) {
                self.columns.shift_insert(index.min(self.columns.len()), to.to_string(), values);
            }
        }
    }

    /// Get number of rows.
    #[must_use]
    pub fn nrow(&self) -> usize {
        self.n_rows
    }

    /// Get number of columns.
    #[must_use]
    pub fn ncol(&self) -> usize {
        self.columns.len()
    }

    /// True when there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    /// Check if a column exists.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Get column names in insertion order.
    #[must_use]
    pub fn columns(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    /// Iterate over `(name, values)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[DataValue])> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}
