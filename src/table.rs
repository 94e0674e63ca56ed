/// FlightDash Table Implementation
///
/// A Table is an immutable collection of equally long columns with a schema.
/// Every pipeline stage reads a `&Table` and returns a new `Table`; nothing
/// mutates a table once it is built, so a loaded dataset can be shared by
/// any number of readers without coordination.
///
/// # Examples
///
/// ```
/// use flightdash::{ColumnType, ColumnValue, Schema, TableBuilder};
/// use std::collections::HashMap;
///
/// let schema = Schema::new(vec![
///     ("airline".to_string(), ColumnType::Category),
///     ("price".to_string(), ColumnType::Float64),
/// ]);
///
/// let mut builder = TableBuilder::new("flights", schema);
/// let mut row = HashMap::new();
/// row.insert("airline".to_string(), ColumnValue::String("Vistara".to_string()));
/// row.insert("price".to_string(), ColumnValue::Float64(5953.0));
/// builder.append_row(row).unwrap();
///
/// let table = builder.build().unwrap();
/// assert_eq!(table.len(), 1);
/// assert_eq!(table.get_value(0, "airline").unwrap().as_string(), Some("Vistara"));
/// ```

use crate::column::{Column, ColumnType, ColumnValue};
use crate::error::{PipelineError, PipelineResult};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Schema definition with column names and types.
///
/// # Examples
///
/// ```
/// use flightdash::{Schema, ColumnType};
///
/// let schema = Schema::new(vec![
///     ("airline".to_string(), ColumnType::Category),
///     ("days_left".to_string(), ColumnType::Int64),
/// ]);
///
/// assert_eq!(schema.len(), 2);
/// assert_eq!(schema.get_column_index("days_left"), Some(1));
/// assert_eq!(schema.get_column_type("airline"), Some(ColumnType::Category));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    columns: Vec<(String, ColumnType)>,
}

impl Schema {
    /// Creates a new schema with the specified `(name, type)` columns.
    pub fn new(columns: Vec<(String, ColumnType)>) -> Self {
        Schema { columns }
    }

    /// Returns the number of columns in the schema.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the schema has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns a list of all column names.
    pub fn get_column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Returns the index of a column by name, or None if not found.
    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|(n, _)| n == name)
    }

    /// Returns the type of a column by name, or None if not found.
    pub fn get_column_type(&self, name: &str) -> Option<ColumnType> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, ty)| *ty)
    }

    fn push(&mut self, name: String, column_type: ColumnType) {
        self.columns.push((name, column_type));
    }
}

/// Immutable table of columns.
#[derive(Clone)]
pub struct Table {
    name: String,
    schema: Schema,
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    /// Assemble a table from columns.
    ///
    /// All columns must have the same length and distinct names.
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> PipelineResult<Self> {
        let row_count = columns.first().map(|c| c.len()).unwrap_or(0);
        let mut schema = Schema::new(Vec::with_capacity(columns.len()));
        let mut seen = HashSet::new();

        for col in &columns {
            if col.len() != row_count {
                return Err(PipelineError::InvalidParameter(format!(
                    "Column '{}' has {} rows, expected {}",
                    col.name(),
                    col.len(),
                    row_count
                )));
            }
            if !seen.insert(col.name().to_string()) {
                return Err(PipelineError::InvalidParameter(format!(
                    "Duplicate column '{}'",
                    col.name()
                )));
            }
            schema.push(col.name().to_string(), col.column_type());
        }

        Ok(Table {
            name: name.into(),
            schema,
            columns,
            row_count,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> PipelineResult<&Column> {
        let col_idx = self.schema
            .get_column_index(name)
            .ok_or_else(|| PipelineError::UnknownColumn(name.to_string()))?;
        Ok(&self.columns[col_idx])
    }

    /// Look up a column that must hold numbers
    pub fn numeric_column(&self, name: &str) -> PipelineResult<&Column> {
        let col = self.column(name)?;
        if !col.column_type().is_numeric() {
            return Err(PipelineError::TypeMismatch {
                column: name.to_string(),
                expected: "numeric",
                actual: col.column_type().name(),
            });
        }
        Ok(col)
    }

    pub fn get_value(&self, row: usize, column: &str) -> PipelineResult<ColumnValue> {
        let col = self.column(column)?;
        col.get(row).ok_or_else(|| {
            PipelineError::InvalidParameter(format!(
                "Row {} out of range [0, {})",
                row, self.row_count
            ))
        })
    }

    pub fn get_row(&self, row: usize) -> PipelineResult<HashMap<String, ColumnValue>> {
        if row >= self.row_count {
            return Err(PipelineError::InvalidParameter(format!(
                "Row {} out of range [0, {})",
                row, self.row_count
            )));
        }

        let mut result = HashMap::with_capacity(self.columns.len());
        for col in &self.columns {
            if let Some(value) = col.get(row) {
                result.insert(col.name().to_string(), value);
            }
        }
        Ok(result)
    }

    pub fn iter_rows(&self) -> TableRowIterator<'_> {
        TableRowIterator {
            table: self,
            index: 0,
        }
    }

    // ========================================================================
    // Derived tables
    // ========================================================================

    /// New table holding the rows at `indices`, in that order.
    pub fn take(&self, indices: &[usize]) -> Table {
        Table {
            name: self.name.clone(),
            schema: self.schema.clone(),
            columns: self.columns.iter().map(|c| c.take(indices)).collect(),
            row_count: indices.len(),
        }
    }

    /// New table with `column` appended. The source table is untouched.
    pub fn with_column(&self, column: Column) -> PipelineResult<Table> {
        if column.len() != self.row_count {
            return Err(PipelineError::InvalidParameter(format!(
                "Column '{}' has {} rows, table '{}' has {}",
                column.name(),
                column.len(),
                self.name,
                self.row_count
            )));
        }
        if self.schema.get_column_index(column.name()).is_some() {
            return Err(PipelineError::InvalidParameter(format!(
                "Column '{}' already exists in table '{}'",
                column.name(),
                self.name
            )));
        }

        let mut derived = self.clone();
        derived.schema.push(column.name().to_string(), column.column_type());
        derived.columns.push(column);
        Ok(derived)
    }

    // ========================================================================
    // Aggregation Methods
    // ========================================================================

    /// Sum of a numeric column.
    pub fn sum(&self, column: &str) -> PipelineResult<f64> {
        Ok(self.numeric_column(column)?.iter_f64().sum())
    }

    /// Arithmetic mean of a numeric column. Returns None for a zero-row table.
    pub fn avg(&self, column: &str) -> PipelineResult<Option<f64>> {
        let col = self.numeric_column(column)?;
        if col.is_empty() {
            return Ok(None);
        }
        Ok(Some(col.iter_f64().sum::<f64>() / col.len() as f64))
    }

    /// Minimum of a numeric column. Returns None for a zero-row table.
    pub fn min(&self, column: &str) -> PipelineResult<Option<f64>> {
        let col = self.numeric_column(column)?;
        Ok(col.iter_f64().fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.min(v)))))
    }

    /// Maximum of a numeric column. Returns None for a zero-row table.
    pub fn max(&self, column: &str) -> PipelineResult<Option<f64>> {
        let col = self.numeric_column(column)?;
        Ok(col.iter_f64().fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.max(v)))))
    }

    /// Distinct values of a column, sorted
    pub fn distinct(&self, column: &str) -> PipelineResult<Vec<String>> {
        let col = self.column(column)?;
        let values: BTreeSet<String> = match col.column_type() {
            ColumnType::String | ColumnType::Category => (0..col.len())
                .filter_map(|i| col.get_str(i))
                .map(str::to_string)
                .collect(),
            ColumnType::Int64 => {
                let ints: BTreeSet<i64> = (0..col.len()).filter_map(|i| col.get_i64(i)).collect();
                return Ok(ints.into_iter().map(|v| v.to_string()).collect());
            }
            ColumnType::Float64 => {
                let mut floats: Vec<f64> = col.iter_f64().collect();
                floats.sort_by(f64::total_cmp);
                floats.dedup();
                return Ok(floats.into_iter().map(|v| v.to_string()).collect());
            }
        };
        Ok(values.into_iter().collect())
    }

    /// Number of distinct value combinations across `columns`
    pub fn n_unique(&self, columns: &[&str]) -> PipelineResult<usize> {
        let cols = columns
            .iter()
            .map(|name| self.column(name))
            .collect::<PipelineResult<Vec<_>>>()?;

        let mut seen: HashSet<Vec<String>> = HashSet::new();
        for row in 0..self.row_count {
            let key: Vec<String> = cols
                .iter()
                .map(|c| c.get(row).map(|v| v.to_string()).unwrap_or_default())
                .collect();
            seen.insert(key);
        }
        Ok(seen.len())
    }

    // ========================================================================
    // Serialization Methods
    // ========================================================================

    /// Export table to CSV format with a header row.
    ///
    /// # Example
    ///
    /// ```
    /// use flightdash::{Column, Table};
    ///
    /// let table = Table::new("fares", vec![
    ///     Column::categorical("airline", ["Indigo", "Air India"]),
    ///     Column::from_i64("days_left", vec![1, 49]),
    /// ]).unwrap();
    ///
    /// let csv = table.to_csv().unwrap();
    /// assert!(csv.starts_with("airline,days_left\n"));
    /// assert!(csv.contains("Air India,49"));
    /// ```
    pub fn to_csv(&self) -> Result<String, csv::Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(self.schema.get_column_names())?;

        for row in 0..self.row_count {
            let record: Vec<String> = self
                .columns
                .iter()
                .map(|c| c.get(row).map(|v| v.to_string()).unwrap_or_default())
                .collect();
            writer.write_record(&record)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| {
            csv::Error::from(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }

    /// Export table to JSON format (array of objects).
    ///
    /// # Example
    ///
    /// ```
    /// use flightdash::{Column, Table};
    ///
    /// let table = Table::new("fares", vec![
    ///     Column::categorical("class", ["Business"]),
    ///     Column::from_f64("price", vec![42000.0]),
    /// ]).unwrap();
    ///
    /// let json = table.to_json().unwrap();
    /// assert!(json.contains("\"class\": \"Business\""));
    /// assert!(json.contains("\"price\": 42000.0"));
    /// ```
    pub fn to_json(&self) -> serde_json::Result<String> {
        let rows: Vec<serde_json::Map<String, serde_json::Value>> = (0..self.row_count)
            .map(|row| {
                self.columns
                    .iter()
                    .map(|col| {
                        let value = match col.get(row) {
                            Some(v) => serde_json::to_value(v)?,
                            None => serde_json::Value::Null,
                        };
                        Ok((col.name().to_string(), value))
                    })
                    .collect::<serde_json::Result<serde_json::Map<_, _>>>()
            })
            .collect::<serde_json::Result<Vec<_>>>()?;

        serde_json::to_string_pretty(&rows)
    }
}

/// Row-at-a-time construction of a table.
///
/// Used by tests and small hosts; the dataset loader builds columns directly.
pub struct TableBuilder {
    name: String,
    columns: Vec<Column>,
}

impl TableBuilder {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        let columns = schema
            .columns
            .into_iter()
            .map(|(n, ty)| Column::new(n, ty))
            .collect();
        TableBuilder {
            name: name.into(),
            columns,
        }
    }

    /// Append one row keyed by column name.
    ///
    /// Every value is checked before any column is touched, so a rejected
    /// row leaves the builder unchanged.
    pub fn append_row(&mut self, mut row: HashMap<String, ColumnValue>) -> PipelineResult<()> {
        for col in &self.columns {
            match row.get(col.name()) {
                Some(value) => col.accepts(value)?,
                None => {
                    return Err(PipelineError::InvalidParameter(format!(
                        "Missing value for column '{}'",
                        col.name()
                    )))
                }
            }
        }

        for col in self.columns.iter_mut() {
            if let Some(value) = row.remove(col.name()) {
                col.append(value)?;
            }
        }
        Ok(())
    }

    /// Append a row given in schema column order
    pub fn append_values(&mut self, values: Vec<ColumnValue>) -> PipelineResult<()> {
        if values.len() != self.columns.len() {
            return Err(PipelineError::InvalidParameter(format!(
                "Expected {} values, got {}",
                self.columns.len(),
                values.len()
            )));
        }
        for (col, value) in self.columns.iter().zip(&values) {
            col.accepts(value)?;
        }
        for (col, value) in self.columns.iter_mut().zip(values) {
            col.append(value)?;
        }
        Ok(())
    }

    /// Finish the table; fails if the columns ended up with different lengths
    pub fn build(self) -> PipelineResult<Table> {
        Table::new(self.name, self.columns)
    }
}

pub struct TableRowIterator<'a> {
    table: &'a Table,
    index: usize,
}

impl<'a> Iterator for TableRowIterator<'a> {
    type Item = HashMap<String, ColumnValue>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.table.row_count {
            None
        } else {
            let result = self.table.get_row(self.index).ok();
            self.index += 1;
            result
        }
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Table {{ name: '{}', columns: {}, rows: {} }}",
            self.name,
            self.schema.len(),
            self.row_count
        )
    }
}
