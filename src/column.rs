/// FlightDash Column Implementation
///
/// A Column is an array-like random-access data container indexed by integer.
/// Each Column has a type specifying the type of every value stored.
///
/// # Categorical Columns
///
/// Category columns store one `CategoryId` per row plus a shared
/// `CategoryDictionary` holding the labels. Derived columns (filtered rows,
/// bin assignments) share the dictionary of the column they come from, so
/// the full category domain survives filtering.

use crate::error::{PipelineError, PipelineResult};
use crate::interner::{CategoryDictionary, CategoryId};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Column data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnType {
    Int64,
    Float64,
    String,
    Category,
}

impl ColumnType {
    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Int64 => "INT64",
            ColumnType::Float64 => "FLOAT64",
            ColumnType::String => "STRING",
            ColumnType::Category => "CATEGORY",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Int64 | ColumnType::Float64)
    }
}

/// A single cell value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColumnValue {
    Int64(i64),
    Float64(f64),
    String(String),
}

impl ColumnValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ColumnValue::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ColumnValue::Float64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            ColumnValue::String(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnValue::Int64(v) => write!(f, "{}", v),
            ColumnValue::Float64(v) => write!(f, "{}", v),
            ColumnValue::String(v) => f.write_str(v),
        }
    }
}

#[derive(Clone)]
enum ColumnData {
    Int64(Vec<i64>),
    Float64(Vec<f64>),
    String(Vec<String>),
    Category {
        codes: Vec<CategoryId>,
        dictionary: Arc<CategoryDictionary>,
    },
}

/// Named, typed column of values
#[derive(Clone)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    /// Create an empty column of the given type
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        let data = match column_type {
            ColumnType::Int64 => ColumnData::Int64(Vec::new()),
            ColumnType::Float64 => ColumnData::Float64(Vec::new()),
            ColumnType::String => ColumnData::String(Vec::new()),
            ColumnType::Category => ColumnData::Category {
                codes: Vec::new(),
                dictionary: Arc::new(CategoryDictionary::new()),
            },
        };
        Column { name: name.into(), data }
    }

    pub fn from_i64(name: impl Into<String>, values: Vec<i64>) -> Self {
        Column { name: name.into(), data: ColumnData::Int64(values) }
    }

    pub fn from_f64(name: impl Into<String>, values: Vec<f64>) -> Self {
        Column { name: name.into(), data: ColumnData::Float64(values) }
    }

    pub fn from_strings(name: impl Into<String>, values: Vec<String>) -> Self {
        Column { name: name.into(), data: ColumnData::String(values) }
    }

    /// Build a categorical column, interning labels in first-seen order
    pub fn categorical<I, S>(name: impl Into<String>, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut dictionary = CategoryDictionary::new();
        let codes = labels
            .into_iter()
            .map(|label| dictionary.intern(label.as_ref()))
            .collect();
        Column {
            name: name.into(),
            data: ColumnData::Category { codes, dictionary: Arc::new(dictionary) },
        }
    }

    /// Build a categorical column from codes into an existing dictionary.
    ///
    /// Every code must name a label of the dictionary.
    pub fn from_codes(
        name: impl Into<String>,
        codes: Vec<CategoryId>,
        dictionary: Arc<CategoryDictionary>,
    ) -> PipelineResult<Self> {
        if let Some(bad) = codes.iter().find(|&&c| (c as usize) >= dictionary.len()) {
            return Err(PipelineError::InvalidParameter(format!(
                "Category code {} outside dictionary of {} labels",
                bad,
                dictionary.len()
            )));
        }
        Ok(Column {
            name: name.into(),
            data: ColumnData::Category { codes, dictionary },
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        match self.data {
            ColumnData::Int64(_) => ColumnType::Int64,
            ColumnData::Float64(_) => ColumnType::Float64,
            ColumnData::String(_) => ColumnType::String,
            ColumnData::Category { .. } => ColumnType::Category,
        }
    }

    pub fn len(&self) -> usize {
        match &self.data {
            ColumnData::Int64(v) => v.len(),
            ColumnData::Float64(v) => v.len(),
            ColumnData::String(v) => v.len(),
            ColumnData::Category { codes, .. } => codes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check that `value` could be appended, without appending it
    pub fn accepts(&self, value: &ColumnValue) -> PipelineResult<()> {
        let fits = matches!(
            (&self.data, value),
            (ColumnData::Int64(_), ColumnValue::Int64(_))
                | (ColumnData::Float64(_), ColumnValue::Float64(_) | ColumnValue::Int64(_))
                | (ColumnData::String(_) | ColumnData::Category { .. }, ColumnValue::String(_))
        );
        if fits {
            Ok(())
        } else {
            Err(PipelineError::TypeMismatch {
                column: self.name.clone(),
                expected: self.column_type().name(),
                actual: value_type_name(value),
            })
        }
    }

    /// Append a value, checking it against the column type
    pub fn append(&mut self, value: ColumnValue) -> PipelineResult<()> {
        let rejected = match (&mut self.data, value) {
            (ColumnData::Int64(v), ColumnValue::Int64(x)) => {
                v.push(x);
                None
            }
            (ColumnData::Float64(v), ColumnValue::Float64(x)) => {
                v.push(x);
                None
            }
            (ColumnData::Float64(v), ColumnValue::Int64(x)) => {
                v.push(x as f64);
                None
            }
            (ColumnData::String(v), ColumnValue::String(x)) => {
                v.push(x);
                None
            }
            (ColumnData::Category { codes, dictionary }, ColumnValue::String(x)) => {
                let id = Arc::make_mut(dictionary).intern(&x);
                codes.push(id);
                None
            }
            (_, other) => Some(other),
        };

        if let Some(other) = rejected {
            return Err(PipelineError::TypeMismatch {
                column: self.name.clone(),
                expected: self.column_type().name(),
                actual: value_type_name(&other),
            });
        }
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<ColumnValue> {
        match &self.data {
            ColumnData::Int64(v) => v.get(index).map(|x| ColumnValue::Int64(*x)),
            ColumnData::Float64(v) => v.get(index).map(|x| ColumnValue::Float64(*x)),
            ColumnData::String(v) => v.get(index).map(|x| ColumnValue::String(x.clone())),
            ColumnData::Category { codes, dictionary } => codes
                .get(index)
                .and_then(|c| dictionary.resolve(*c))
                .map(|s| ColumnValue::String(s.to_string())),
        }
    }

    /// Fast numeric access - returns the value as f64 without building a ColumnValue.
    /// Returns None for non-numeric columns or an out-of-range index.
    #[inline]
    pub fn get_f64(&self, index: usize) -> Option<f64> {
        match &self.data {
            ColumnData::Int64(v) => v.get(index).map(|x| *x as f64),
            ColumnData::Float64(v) => v.get(index).copied(),
            _ => None,
        }
    }

    /// Borrowed label for String and Category columns
    #[inline]
    pub fn get_str(&self, index: usize) -> Option<&str> {
        match &self.data {
            ColumnData::String(v) => v.get(index).map(|s| s.as_str()),
            ColumnData::Category { codes, dictionary } => {
                codes.get(index).and_then(|c| dictionary.resolve(*c))
            }
            _ => None,
        }
    }

    #[inline]
    pub fn get_i64(&self, index: usize) -> Option<i64> {
        match &self.data {
            ColumnData::Int64(v) => v.get(index).copied(),
            _ => None,
        }
    }

    #[inline]
    pub fn category_code(&self, index: usize) -> Option<CategoryId> {
        match &self.data {
            ColumnData::Category { codes, .. } => codes.get(index).copied(),
            _ => None,
        }
    }

    /// Shared dictionary of a Category column
    pub fn dictionary(&self) -> Option<&Arc<CategoryDictionary>> {
        match &self.data {
            ColumnData::Category { dictionary, .. } => Some(dictionary),
            _ => None,
        }
    }

    /// Iterate numeric values as f64 (empty for text columns)
    pub fn iter_f64(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.len()).filter_map(move |i| self.get_f64(i))
    }

    /// New column holding the rows at `indices`, in that order.
    /// Category columns keep the full dictionary.
    pub fn take(&self, indices: &[usize]) -> Column {
        let data = match &self.data {
            ColumnData::Int64(v) => ColumnData::Int64(indices.iter().map(|&i| v[i]).collect()),
            ColumnData::Float64(v) => {
                ColumnData::Float64(indices.iter().map(|&i| v[i]).collect())
            }
            ColumnData::String(v) => {
                ColumnData::String(indices.iter().map(|&i| v[i].clone()).collect())
            }
            ColumnData::Category { codes, dictionary } => ColumnData::Category {
                codes: indices.iter().map(|&i| codes[i]).collect(),
                dictionary: Arc::clone(dictionary),
            },
        };
        Column { name: self.name.clone(), data }
    }

    pub fn iter(&self) -> ColumnIterator<'_> {
        ColumnIterator {
            column: self,
            index: 0,
        }
    }
}

fn value_type_name(value: &ColumnValue) -> &'static str {
    match value {
        ColumnValue::Int64(_) => ColumnType::Int64.name(),
        ColumnValue::Float64(_) => ColumnType::Float64.name(),
        ColumnValue::String(_) => ColumnType::String.name(),
    }
}

pub struct ColumnIterator<'a> {
    column: &'a Column,
    index: usize,
}

impl<'a> Iterator for ColumnIterator<'a> {
    type Item = ColumnValue;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.column.get(self.index);
        if result.is_some() {
            self.index += 1;
        }
        result
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Column {{ name: '{}', type: {:?}, len: {} }}",
            self.name,
            self.column_type(),
            self.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_basic() {
        let mut col = Column::new("days_left", ColumnType::Int64);
        col.append(ColumnValue::Int64(10)).unwrap();
        col.append(ColumnValue::Int64(20)).unwrap();
        col.append(ColumnValue::Int64(30)).unwrap();

        assert_eq!(col.len(), 3);
        assert_eq!(col.get(0).unwrap().as_i64(), Some(10));
        assert_eq!(col.get_f64(2), Some(30.0));
        assert!(col.get(3).is_none());
    }

    #[test]
    fn test_column_type_mismatch() {
        let mut col = Column::new("price", ColumnType::Float64);
        col.append(ColumnValue::Int64(5953)).unwrap();
        let err = col.append(ColumnValue::String("cheap".to_string())).unwrap_err();

        assert_eq!(
            err,
            PipelineError::TypeMismatch {
                column: "price".to_string(),
                expected: "FLOAT64",
                actual: "STRING",
            }
        );
        assert_eq!(col.get_f64(0), Some(5953.0));
    }

    #[test]
    fn test_categorical_column() {
        let col = Column::categorical("airline", ["SpiceJet", "Vistara", "SpiceJet", "AirAsia"]);

        assert_eq!(col.column_type(), ColumnType::Category);
        assert_eq!(col.get_str(2), Some("SpiceJet"));
        assert_eq!(col.category_code(0), col.category_code(2));
        assert_eq!(col.dictionary().unwrap().len(), 3);
    }

    #[test]
    fn test_take_keeps_dictionary() {
        let col = Column::categorical("class", ["Economy", "Business", "Economy"]);
        let taken = col.take(&[2, 0]);

        assert_eq!(taken.len(), 2);
        assert_eq!(taken.get_str(0), Some("Economy"));
        assert_eq!(taken.dictionary().unwrap().len(), 2);
        assert!(Arc::ptr_eq(taken.dictionary().unwrap(), col.dictionary().unwrap()));
    }

    #[test]
    fn test_from_codes_rejects_unknown_code() {
        let dict = Arc::new(CategoryDictionary::with_labels(["0-5", "6-10"]));
        assert!(Column::from_codes("window", vec![0, 1, 1], Arc::clone(&dict)).is_ok());
        assert!(Column::from_codes("window", vec![0, 2], dict).is_err());
    }

    #[test]
    fn test_column_iter() {
        let col = Column::from_f64("duration", vec![2.17, 2.33]);
        let values: Vec<ColumnValue> = col.iter().collect();
        assert_eq!(values, vec![ColumnValue::Float64(2.17), ColumnValue::Float64(2.33)]);
    }
}
