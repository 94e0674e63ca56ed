/// Filter Engine
///
/// Applies equality filters on categorical columns and produces a derived
/// table. The source table is never modified.
///
/// A `FilterSet` maps a column name to a `Selection`: either one accepted
/// value or `Selection::All`, the "no filter" sentinel behind dropdown
/// choices such as "All Airlines". All active predicates are combined with
/// logical AND in a single pass, so applying two filter sets one after the
/// other gives the same rows as applying their union once.
///
/// Text comparisons ignore case unless a predicate asks for `MatchMode::Exact`.
///
/// # Examples
///
/// ```
/// use flightdash::{filter, Column, FilterSet, Selection, Table};
///
/// let table = Table::new("flights", vec![
///     Column::categorical("airline", ["Indigo", "Vistara", "Indigo"]),
///     Column::categorical("class", ["Economy", "Business", "Business"]),
/// ]).unwrap();
///
/// let filters = FilterSet::new()
///     .with("airline", Selection::only("Indigo"))
///     .with("class", Selection::only("business"));
///
/// let view = filter(&table, &filters).unwrap();
/// assert_eq!(view.len(), 1);
/// assert_eq!(table.len(), 3);
/// ```

use crate::column::{Column, ColumnType};
use crate::error::{PipelineError, PipelineResult};
use crate::interner::CategoryId;
use crate::table::Table;
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

/// The value chosen for one filter column
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    /// Keep every row
    #[default]
    All,
    /// Keep rows whose value equals this one
    Only(String),
}

impl Selection {
    pub fn only(value: impl Into<String>) -> Self {
        Selection::Only(value.into())
    }

    /// Interpret a dropdown choice. The `all_label` choice (e.g. "All Classes"),
    /// in any casing, means no filtering.
    pub fn from_choice(choice: &str, all_label: &str) -> Self {
        if choice.trim().eq_ignore_ascii_case(all_label) {
            Selection::All
        } else {
            Selection::Only(choice.to_string())
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Selection::All => None,
            Selection::Only(v) => Some(v),
        }
    }
}

/// How text values are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    Exact,
    #[default]
    IgnoreCase,
}

/// One column's filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub selection: Selection,
    #[serde(default)]
    pub mode: MatchMode,
}

/// Column name to predicate mapping. Setting a column twice replaces the
/// earlier predicate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSet {
    predicates: IndexMap<String, Predicate>,
}

impl FilterSet {
    pub fn new() -> Self {
        FilterSet { predicates: IndexMap::new() }
    }

    /// Add a case-insensitive predicate
    pub fn with(self, column: impl Into<String>, selection: Selection) -> Self {
        self.with_mode(column, selection, MatchMode::IgnoreCase)
    }

    pub fn with_mode(
        mut self,
        column: impl Into<String>,
        selection: Selection,
        mode: MatchMode,
    ) -> Self {
        self.predicates.insert(column.into(), Predicate { selection, mode });
        self
    }

    pub fn get(&self, column: &str) -> Option<&Predicate> {
        self.predicates.get(column)
    }

    /// Predicates that actually restrict rows
    pub fn active(&self) -> impl Iterator<Item = (&str, &Predicate)> + '_ {
        self.predicates
            .iter()
            .filter(|(_, p)| !p.selection.is_all())
            .map(|(c, p)| (c.as_str(), p))
    }

    pub fn is_empty(&self) -> bool {
        self.active().next().is_none()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }
}

/// Per-column row test prepared once before the scan
enum Matcher<'a> {
    Codes { column: &'a Column, accepted: Vec<CategoryId> },
    Text { column: &'a Column, wanted: String, mode: MatchMode },
    Int { column: &'a Column, wanted: i64 },
    Float { column: &'a Column, wanted: f64 },
}

impl<'a> Matcher<'a> {
    fn prepare(table: &'a Table, name: &str, predicate: &Predicate) -> PipelineResult<Option<Self>> {
        let wanted = match predicate.selection.value() {
            Some(v) => v,
            None => return Ok(None),
        };
        let column = table.column(name)?;

        let matcher = match column.column_type() {
            ColumnType::Category => {
                let accepted = match (column.dictionary(), predicate.mode) {
                    (Some(dict), MatchMode::Exact) => dict.lookup(wanted).into_iter().collect(),
                    (Some(dict), MatchMode::IgnoreCase) => dict.matching_ignore_case(wanted),
                    (None, _) => Vec::new(),
                };
                Matcher::Codes { column, accepted }
            }
            ColumnType::String => Matcher::Text {
                column,
                wanted: match predicate.mode {
                    MatchMode::Exact => wanted.to_string(),
                    MatchMode::IgnoreCase => wanted.to_lowercase(),
                },
                mode: predicate.mode,
            },
            ColumnType::Int64 => Matcher::Int {
                column,
                wanted: wanted.trim().parse().map_err(|_| {
                    PipelineError::InvalidParameter(format!(
                        "Cannot compare '{}' with INT64 column '{}'",
                        wanted, name
                    ))
                })?,
            },
            ColumnType::Float64 => Matcher::Float {
                column,
                wanted: wanted.trim().parse().map_err(|_| {
                    PipelineError::InvalidParameter(format!(
                        "Cannot compare '{}' with FLOAT64 column '{}'",
                        wanted, name
                    ))
                })?,
            },
        };
        Ok(Some(matcher))
    }

    #[inline]
    fn accepts(&self, row: usize) -> bool {
        match self {
            Matcher::Codes { column, accepted } => column
                .category_code(row)
                .map(|code| accepted.contains(&code))
                .unwrap_or(false),
            Matcher::Text { column, wanted, mode } => match column.get_str(row) {
                Some(s) => match mode {
                    MatchMode::Exact => s == wanted.as_str(),
                    MatchMode::IgnoreCase => s.to_lowercase() == *wanted,
                },
                None => false,
            },
            Matcher::Int { column, wanted } => column.get_i64(row) == Some(*wanted),
            Matcher::Float { column, wanted } => column.get_f64(row) == Some(*wanted),
        }
    }
}

/// Row indices of `table` that satisfy every active predicate
pub fn matching_rows(table: &Table, filters: &FilterSet) -> PipelineResult<Vec<usize>> {
    let mut matchers = Vec::new();
    for (name, predicate) in filters.active() {
        if let Some(m) = Matcher::prepare(table, name, predicate)? {
            matchers.push(m);
        }
    }

    Ok((0..table.len())
        .filter(|&row| matchers.iter().all(|m| m.accepts(row)))
        .collect())
}

/// Apply `filters` to `table`, returning a new table.
///
/// A filter that matches nothing yields a zero-row table with the same
/// schema; that is a normal outcome, not an error. Unknown columns and
/// selections that cannot be compared with a numeric column are errors.
pub fn filter(table: &Table, filters: &FilterSet) -> PipelineResult<Table> {
    if filters.is_empty() {
        return Ok(table.clone());
    }

    let rows = matching_rows(table, filters)?;
    debug!(
        "Filter on '{}' kept {} of {} rows",
        table.name(),
        rows.len(),
        table.len()
    );
    Ok(table.take(&rows))
}

/// Dropdown options for a column: `all_label` followed by the sorted
/// distinct values.
pub fn selection_options(table: &Table, column: &str, all_label: &str) -> PipelineResult<Vec<String>> {
    let mut options = vec![all_label.to_string()];
    options.extend(table.distinct(column)?);
    Ok(options)
}
