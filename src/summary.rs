/// Overview metrics
///
/// Scalar figures for the dashboard's metric cards: record count, average
/// price, duration and booking lead time, the number of distinct routes,
/// and the cheapest and most expensive airline by mean price.

use crate::aggregate::{aggregate, AggregateRow, GroupOrder, Stat};
use crate::error::PipelineResult;
use crate::store::{AIRLINE, DAYS_LEFT, DESTINATION_CITY, DURATION, PRICE, SOURCE_CITY};
use crate::table::Table;
use serde::Serialize;

/// Mean, min and max of one numeric column. All three are None for a
/// zero-row table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl ColumnSummary {
    pub fn compute(table: &Table, column: &str) -> PipelineResult<Self> {
        Ok(ColumnSummary {
            column: column.to_string(),
            count: table.len(),
            mean: table.avg(column)?,
            min: table.min(column)?,
            max: table.max(column)?,
        })
    }
}

/// A group key with its mean price
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedGroup {
    pub name: String,
    pub mean_price: f64,
}

impl RankedGroup {
    fn from_row(row: &AggregateRow) -> Self {
        RankedGroup {
            name: row.key.join(" / "),
            mean_price: row.value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub total_records: usize,
    pub avg_price: Option<f64>,
    pub avg_duration: Option<f64>,
    pub avg_days_left: Option<f64>,
    /// Distinct (source city, destination city) pairs
    pub unique_routes: usize,
    pub cheapest_airline: Option<RankedGroup>,
    pub priciest_airline: Option<RankedGroup>,
}

impl Overview {
    pub fn compute(table: &Table) -> PipelineResult<Self> {
        let by_airline = aggregate(table, &[AIRLINE], PRICE, Stat::Mean, GroupOrder::Natural)?;

        Ok(Overview {
            total_records: table.len(),
            avg_price: table.avg(PRICE)?,
            avg_duration: table.avg(DURATION)?,
            avg_days_left: table.avg(DAYS_LEFT)?,
            unique_routes: unique_combinations(table, &[SOURCE_CITY, DESTINATION_CITY])?,
            cheapest_airline: by_airline.argmin().map(RankedGroup::from_row),
            priciest_airline: by_airline.argmax().map(RankedGroup::from_row),
        })
    }
}

/// Number of distinct value combinations across `columns`
pub fn unique_combinations(table: &Table, columns: &[&str]) -> PipelineResult<usize> {
    table.n_unique(columns)
}
