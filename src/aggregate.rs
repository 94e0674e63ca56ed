/// Aggregation Engine
///
/// Groups a table by one or more key columns and reduces a numeric column
/// per group. Groups are discovered in first-occurrence order; the caller
/// then picks the order rows are returned in:
///
/// - `GroupOrder::Natural` keeps first-occurrence order
/// - `GroupOrder::Key` sorts by the key columns' domain (bin order for
///   binned columns, numeric for numbers, alphabetical for text)
/// - `GroupOrder::ValueAscending` / `ValueDescending` sort by the statistic
///
/// All sorts are stable, so equal values keep first-occurrence order.
///
/// # Examples
///
/// ```
/// use flightdash::{aggregate, Column, GroupOrder, Stat, Table};
///
/// let table = Table::new("flights", vec![
///     Column::categorical("airline", ["Indigo", "Indigo", "Vistara"]),
///     Column::from_f64("price", vec![100.0, 200.0, 300.0]),
/// ]).unwrap();
///
/// let result = aggregate(&table, &["airline"], "price", Stat::Mean, GroupOrder::Natural).unwrap();
/// assert_eq!(result.get(&["Indigo"]), Some(150.0));
/// assert_eq!(result.argmax().unwrap().key, vec!["Vistara".to_string()]);
/// ```

use crate::column::{Column, ColumnType};
use crate::error::{PipelineError, PipelineResult};
use crate::interner::CategoryId;
use crate::table::Table;
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Statistic computed per group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    Mean,
    Min,
    Max,
    Count,
}

impl Stat {
    pub fn name(&self) -> &'static str {
        match self {
            Stat::Mean => "mean",
            Stat::Min => "min",
            Stat::Max => "max",
            Stat::Count => "count",
        }
    }
}

/// Order of the rows of an aggregate result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupOrder {
    #[default]
    Natural,
    Key,
    ValueAscending,
    ValueDescending,
}

/// One group of an aggregate result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    /// Key labels, one per group-by column
    pub key: Vec<String>,
    pub value: f64,
    /// Rows in the group
    pub count: usize,
    /// Fraction of all input rows that fall in the group
    pub share: f64,
    #[serde(skip)]
    first_row: usize,
}

/// Aggregated rows plus the parameters that produced them
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    pub group_by: Vec<String>,
    pub value_column: String,
    pub stat: Stat,
    pub rows: Vec<AggregateRow>,
}

impl AggregateResult {
    fn empty(group_by: &[&str], value_column: &str, stat: Stat) -> Self {
        AggregateResult {
            group_by: group_by.iter().map(|s| s.to_string()).collect(),
            value_column: value_column.to_string(),
            stat,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value of the group whose key labels equal `key`
    pub fn get(&self, key: &[&str]) -> Option<f64> {
        self.rows
            .iter()
            .find(|row| row.key.len() == key.len() && row.key.iter().zip(key).all(|(a, b)| a == b))
            .map(|row| row.value)
    }

    /// Group with the smallest value; the first-occurring group wins ties
    pub fn argmin(&self) -> Option<&AggregateRow> {
        self.extreme(Ordering::Less)
    }

    /// Group with the largest value; the first-occurring group wins ties
    pub fn argmax(&self) -> Option<&AggregateRow> {
        self.extreme(Ordering::Greater)
    }

    fn extreme(&self, wanted: Ordering) -> Option<&AggregateRow> {
        self.rows.iter().fold(None, |best: Option<&AggregateRow>, row| match best {
            None => Some(row),
            Some(current) => {
                let ord = row.value.total_cmp(&current.value);
                if ord == wanted || (ord == Ordering::Equal && row.first_row < current.first_row) {
                    Some(row)
                } else {
                    Some(current)
                }
            }
        })
    }

    /// Render as a table: key columns, the value column, then `count`.
    ///
    /// A `Count` result has no separate value column; it carries `count`
    /// and `share` instead.
    pub fn to_table(&self, name: &str) -> PipelineResult<Table> {
        let mut columns: Vec<Column> = self
            .group_by
            .iter()
            .enumerate()
            .map(|(i, column)| {
                Column::from_strings(column.as_str(), self.rows.iter().map(|r| r.key[i].clone()).collect())
            })
            .collect();

        let counts = self.rows.iter().map(|r| r.count as i64).collect();
        if self.stat == Stat::Count {
            columns.push(Column::from_i64("count", counts));
            columns.push(Column::from_f64("share", self.rows.iter().map(|r| r.share).collect()));
        } else {
            columns.push(Column::from_f64(self.value_column.as_str(), self.rows.iter().map(|r| r.value).collect()));
            columns.push(Column::from_i64("count", counts));
        }

        Table::new(name, columns)
    }
}

/// Box-plot summary of one group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub key: Vec<String>,
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

/// Group `table` by `group_by` and compute `stat` over `value_column`.
///
/// Every group-by column must exist. `value_column` must exist, and must be
/// numeric unless `stat` is `Count`. A zero-row table yields an empty result.
pub fn aggregate(
    table: &Table,
    group_by: &[&str],
    value_column: &str,
    stat: Stat,
    order: GroupOrder,
) -> PipelineResult<AggregateResult> {
    let keys = key_columns(table, group_by)?;
    let values = if stat == Stat::Count {
        table.column(value_column)?;
        None
    } else {
        Some(table.numeric_column(value_column)?)
    };

    let mut result = AggregateResult::empty(group_by, value_column, stat);
    if table.is_empty() {
        debug!("Aggregating empty table '{}'", table.name());
        return Ok(result);
    }

    let groups = partition(table, &keys)?;
    let total = table.len() as f64;

    for (key, rows) in &groups {
        let value = match values {
            None => rows.len() as f64,
            Some(column) => reduce(column, rows, stat),
        };
        result.rows.push(AggregateRow {
            key: key_labels(&keys, key),
            value,
            count: rows.len(),
            share: rows.len() as f64 / total,
            first_row: rows[0],
        });
    }

    let cells: Vec<&Vec<KeyCell>> = groups.keys().collect();
    sort_groups(&mut result.rows, |row| row.value, &cells, &keys, order);

    debug!(
        "Aggregated {} rows of '{}' into {} groups by {:?} ({})",
        table.len(),
        table.name(),
        result.rows.len(),
        group_by,
        stat.name()
    );
    Ok(result)
}

/// Count, mean, min, quartiles and max of `value_column` per group.
///
/// Quartiles interpolate linearly between order statistics. Value orders
/// sort by group mean.
pub fn describe_groups(
    table: &Table,
    group_by: &[&str],
    value_column: &str,
    order: GroupOrder,
) -> PipelineResult<Vec<GroupSummary>> {
    let keys = key_columns(table, group_by)?;
    let values = table.numeric_column(value_column)?;
    if table.is_empty() {
        return Ok(Vec::new());
    }

    let groups = partition(table, &keys)?;
    let mut summaries: Vec<(GroupSummary, usize)> = Vec::with_capacity(groups.len());

    for (key, rows) in &groups {
        let mut sample: Vec<f64> = rows.iter().filter_map(|&r| values.get_f64(r)).collect();
        sample.sort_by(|a, b| a.total_cmp(b));
        let n = sample.len();
        let mean = sample.iter().sum::<f64>() / n as f64;

        summaries.push((
            GroupSummary {
                key: key_labels(&keys, key),
                count: n,
                mean,
                min: sample[0],
                q1: quantile(&sample, 0.25),
                median: quantile(&sample, 0.5),
                q3: quantile(&sample, 0.75),
                max: sample[n - 1],
            },
            rows[0],
        ));
    }

    let cells: Vec<&Vec<KeyCell>> = groups.keys().collect();
    sort_groups(&mut summaries, |(s, _)| s.mean, &cells, &keys, order);
    Ok(summaries.into_iter().map(|(s, _)| s).collect())
}

/// One component of a group key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyCell {
    Code(CategoryId),
    Int(i64),
    Float(u64),
    Text(String),
}

fn key_columns<'a>(table: &'a Table, group_by: &[&str]) -> PipelineResult<Vec<&'a Column>> {
    if group_by.is_empty() {
        return Err(PipelineError::EmptyGroupBy);
    }
    group_by.iter().map(|name| table.column(name)).collect()
}

/// Row indices per group, in first-occurrence order
fn partition(table: &Table, keys: &[&Column]) -> PipelineResult<IndexMap<Vec<KeyCell>, Vec<usize>>> {
    let mut groups: IndexMap<Vec<KeyCell>, Vec<usize>> = IndexMap::new();
    for row in 0..table.len() {
        let key = keys
            .iter()
            .map(|col| key_cell(col, row))
            .collect::<Option<Vec<KeyCell>>>()
            .ok_or_else(|| PipelineError::InvalidParameter(format!("Row {} out of range", row)))?;
        groups.entry(key).or_default().push(row);
    }
    Ok(groups)
}

fn key_cell(column: &Column, row: usize) -> Option<KeyCell> {
    match column.column_type() {
        ColumnType::Category => column.category_code(row).map(KeyCell::Code),
        ColumnType::Int64 => column.get_i64(row).map(KeyCell::Int),
        // -0.0 and 0.0 form one group
        ColumnType::Float64 => column.get_f64(row).map(|v| KeyCell::Float((v + 0.0).to_bits())),
        ColumnType::String => column.get_str(row).map(|s| KeyCell::Text(s.to_string())),
    }
}

fn cell_label(column: &Column, cell: &KeyCell) -> String {
    match cell {
        KeyCell::Code(code) => column
            .dictionary()
            .and_then(|dict| dict.resolve(*code))
            .unwrap_or_default()
            .to_string(),
        KeyCell::Int(v) => v.to_string(),
        KeyCell::Float(bits) => f64::from_bits(*bits).to_string(),
        KeyCell::Text(s) => s.clone(),
    }
}

fn key_labels(keys: &[&Column], cells: &[KeyCell]) -> Vec<String> {
    keys.iter().zip(cells).map(|(col, cell)| cell_label(col, cell)).collect()
}

fn compare_cells(column: &Column, a: &KeyCell, b: &KeyCell) -> Ordering {
    match (a, b) {
        (KeyCell::Code(x), KeyCell::Code(y)) => {
            let ordered = column.dictionary().map_or(false, |d| d.is_ordered());
            if ordered {
                x.cmp(y)
            } else {
                cell_label(column, a).cmp(&cell_label(column, b))
            }
        }
        (KeyCell::Int(x), KeyCell::Int(y)) => x.cmp(y),
        (KeyCell::Float(x), KeyCell::Float(y)) => f64::from_bits(*x).total_cmp(&f64::from_bits(*y)),
        (KeyCell::Text(x), KeyCell::Text(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// Reorder `items`, which line up one-to-one with `cells` (first-occurrence
/// order), according to `order`.
fn sort_groups<T>(
    items: &mut Vec<T>,
    value: impl Fn(&T) -> f64,
    cells: &[&Vec<KeyCell>],
    keys: &[&Column],
    order: GroupOrder,
) {
    let mut indices: Vec<usize> = (0..items.len()).collect();
    match order {
        GroupOrder::Natural => return,
        GroupOrder::Key => indices.sort_by(|&a, &b| {
            keys.iter()
                .enumerate()
                .map(|(i, col)| compare_cells(col, &cells[a][i], &cells[b][i]))
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        }),
        GroupOrder::ValueAscending => {
            indices.sort_by(|&a, &b| value(&items[a]).total_cmp(&value(&items[b])))
        }
        GroupOrder::ValueDescending => {
            indices.sort_by(|&a, &b| value(&items[b]).total_cmp(&value(&items[a])))
        }
    }

    let mut slots: Vec<Option<T>> = items.drain(..).map(Some).collect();
    items.extend(indices.into_iter().filter_map(|i| slots[i].take()));
}

fn reduce(column: &Column, rows: &[usize], stat: Stat) -> f64 {
    let values = rows.iter().filter_map(|&r| column.get_f64(r));
    match stat {
        Stat::Mean => {
            let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
            sum / n as f64
        }
        Stat::Min => values.fold(f64::INFINITY, f64::min),
        Stat::Max => values.fold(f64::NEG_INFINITY, f64::max),
        Stat::Count => rows.len() as f64,
    }
}

/// Linear-interpolated quantile of a sorted, non-empty sample
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}
