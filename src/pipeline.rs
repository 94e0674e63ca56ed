/// Dashboard pipeline
///
/// Every chart of the dashboard is the same sequence of stages with
/// different parameters:
///
/// ```text
/// Table Store -> filter -> bin (optional) -> aggregate / describe -> render
/// ```
///
/// `PipelineSpec` holds those parameters, `run` executes them, and
/// `Scenario` names the finite set of charts and builds their specs.
/// `run_guarded` is the boundary toward the presentation layer: it turns
/// an empty result into `Outcome::NoData` and an error into
/// `Outcome::Invalid` so one bad interaction never takes the session down.
///
/// # Examples
///
/// ```
/// use flightdash::{run, Column, PipelineSpec, Selection, Stat, Table};
///
/// let table = Table::new("flights", vec![
///     Column::categorical("airline", ["Indigo", "Indigo", "Vistara"]),
///     Column::categorical("class", ["Economy", "Business", "Economy"]),
///     Column::from_f64("price", vec![4000.0, 20000.0, 6000.0]),
/// ]).unwrap();
///
/// let spec = PipelineSpec::new(&["airline"], "price", Stat::Mean)
///     .filter("class", Selection::only("economy"));
///
/// let output = run(&table, &spec).unwrap();
/// assert_eq!(output.aggregate().unwrap().get(&["Indigo"]), Some(4000.0));
/// ```

use crate::aggregate::{aggregate, describe_groups, AggregateResult, GroupOrder, GroupSummary, Stat};
use crate::binning::{bin_column, BinStrategy};
use crate::column::{Column, ColumnType};
use crate::config::DashboardConfig;
use crate::error::PipelineResult;
use crate::filter::{filter, FilterSet, Selection};
use crate::store::{AIRLINE, CLASS, DAYS_LEFT, PRICE, STOPS};
use crate::table::Table;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Name of the column holding fixed-width `days_left` bins
pub const DAYS_BIN: &str = "days_bin";
/// Name of the column holding booking window labels
pub const BOOKING_WINDOW: &str = "booking_window";

/// Bin one numeric column into a new categorical column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinStep {
    pub column: String,
    pub strategy: BinStrategy,
    pub output: String,
}

impl BinStep {
    pub fn new(column: impl Into<String>, strategy: BinStrategy, output: impl Into<String>) -> Self {
        BinStep {
            column: column.into(),
            strategy,
            output: output.into(),
        }
    }
}

/// What is computed per group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    Stat(Stat),
    /// Box-plot summary (count, mean, quartiles, extremes)
    Distribution,
}

/// Parameters of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSpec {
    #[serde(default)]
    pub filters: FilterSet,
    #[serde(default)]
    pub binning: Option<BinStep>,
    pub group_by: Vec<String>,
    pub value_column: String,
    pub measure: Measure,
    #[serde(default)]
    pub order: GroupOrder,
}

impl PipelineSpec {
    pub fn new(group_by: &[&str], value_column: &str, stat: Stat) -> Self {
        PipelineSpec {
            filters: FilterSet::new(),
            binning: None,
            group_by: group_by.iter().map(|s| s.to_string()).collect(),
            value_column: value_column.to_string(),
            measure: Measure::Stat(stat),
            order: GroupOrder::Natural,
        }
    }

    pub fn filter(mut self, column: impl Into<String>, selection: Selection) -> Self {
        self.filters = self.filters.with(column, selection);
        self
    }

    pub fn filters(mut self, filters: FilterSet) -> Self {
        self.filters = filters;
        self
    }

    pub fn bin(mut self, step: BinStep) -> Self {
        self.binning = Some(step);
        self
    }

    pub fn order(mut self, order: GroupOrder) -> Self {
        self.order = order;
        self
    }

    pub fn distribution(mut self) -> Self {
        self.measure = Measure::Distribution;
        self
    }
}

/// Result handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineOutput {
    Aggregate(AggregateResult),
    Distribution(Vec<GroupSummary>),
}

impl PipelineOutput {
    pub fn is_empty(&self) -> bool {
        match self {
            PipelineOutput::Aggregate(result) => result.is_empty(),
            PipelineOutput::Distribution(summaries) => summaries.is_empty(),
        }
    }

    pub fn aggregate(&self) -> Option<&AggregateResult> {
        match self {
            PipelineOutput::Aggregate(result) => Some(result),
            PipelineOutput::Distribution(_) => None,
        }
    }

    pub fn distribution(&self) -> Option<&[GroupSummary]> {
        match self {
            PipelineOutput::Distribution(summaries) => Some(summaries),
            PipelineOutput::Aggregate(_) => None,
        }
    }
}

/// What the presentation layer renders for one interaction
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Data { output: PipelineOutput },
    /// The filters matched no rows
    NoData,
    /// The parameters were rejected
    Invalid { message: String },
}

/// Filter, bin and aggregate `table` as described by `spec`.
///
/// A filter that matches nothing is not an error: the result is empty.
/// Parameter problems (unknown columns, bad bin widths, ...) are reported
/// even when no rows survive filtering.
pub fn run(table: &Table, spec: &PipelineSpec) -> PipelineResult<PipelineOutput> {
    let filtered = filter(table, &spec.filters)?;

    let prepared = match &spec.binning {
        None => filtered,
        Some(step) if filtered.is_empty() => {
            // No maximum to derive bins from; still reject bad parameters
            step.strategy.validate()?;
            filtered.numeric_column(&step.column)?;
            filtered.with_column(Column::new(step.output.as_str(), ColumnType::Category))?
        }
        Some(step) => bin_column(&filtered, &step.column, &step.strategy, &step.output)?,
    };

    let group_by: Vec<&str> = spec.group_by.iter().map(String::as_str).collect();
    let output = match spec.measure {
        Measure::Stat(stat) => PipelineOutput::Aggregate(aggregate(
            &prepared,
            &group_by,
            &spec.value_column,
            stat,
            spec.order,
        )?),
        Measure::Distribution => PipelineOutput::Distribution(describe_groups(
            &prepared,
            &group_by,
            &spec.value_column,
            spec.order,
        )?),
    };

    debug!(
        "Pipeline over '{}': {} rows after filtering, grouped by {:?}",
        table.name(),
        prepared.len(),
        spec.group_by
    );
    Ok(output)
}

/// `run`, with empty results and errors converted into renderable outcomes
pub fn run_guarded(table: &Table, spec: &PipelineSpec) -> Outcome {
    match run(table, spec) {
        Ok(output) if output.is_empty() => Outcome::NoData,
        Ok(output) => Outcome::Data { output },
        Err(e) => {
            warn!("Pipeline over '{}' rejected: {}", table.name(), e);
            Outcome::Invalid { message: e.to_string() }
        }
    }
}

/// The charts of the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "chart", rename_all = "snake_case")]
pub enum Scenario {
    /// Share of flights per airline
    FlightsPerAirline,
    /// Share of flights per class
    FlightsPerClass,
    /// Share of flights per number of stops
    FlightsPerStops,
    /// Mean price per fixed-width `days_left` bin
    PriceTrend { airline: Selection },
    /// Price distribution per booking window
    BookingWindowPrices { airline: Selection },
    /// Mean price per class, most expensive first
    PriceByClass,
    /// Mean price per `days_left` bin and class
    ClassPriceTrend { class: Selection },
    /// Mean price per number of stops, most expensive first
    PriceByStops,
    /// Mean price per `days_left` bin and number of stops
    StopsPriceTrend { stops: Selection },
    /// Mean price per airline and class
    AirlineClassPrices,
    /// Mean price per number of stops and class
    StopsClassPrices,
    /// Mean price per airline and `days_left` bin within one class
    AirlineTrendForClass { class: Selection },
}

impl Scenario {
    pub fn to_spec(&self, config: &DashboardConfig) -> PipelineSpec {
        let trend = || BinStep::new(DAYS_LEFT, config.trend_strategy(), DAYS_BIN);
        let frequency = |column: &str| {
            PipelineSpec::new(&[column], column, Stat::Count).order(GroupOrder::ValueDescending)
        };

        match self {
            Scenario::FlightsPerAirline => frequency(AIRLINE),
            Scenario::FlightsPerClass => frequency(CLASS),
            Scenario::FlightsPerStops => frequency(STOPS),
            Scenario::PriceTrend { airline } => PipelineSpec::new(&[DAYS_BIN], PRICE, Stat::Mean)
                .filter(AIRLINE, airline.clone())
                .bin(trend())
                .order(GroupOrder::Key),
            Scenario::BookingWindowPrices { airline } => PipelineSpec::new(&[BOOKING_WINDOW], PRICE, Stat::Mean)
                .filter(AIRLINE, airline.clone())
                .bin(BinStep::new(DAYS_LEFT, config.booking_strategy(), BOOKING_WINDOW))
                .order(GroupOrder::Key)
                .distribution(),
            Scenario::PriceByClass => {
                PipelineSpec::new(&[CLASS], PRICE, Stat::Mean).order(GroupOrder::ValueDescending)
            }
            Scenario::ClassPriceTrend { class } => PipelineSpec::new(&[DAYS_BIN, CLASS], PRICE, Stat::Mean)
                .filter(CLASS, class.clone())
                .bin(trend())
                .order(GroupOrder::Key),
            Scenario::PriceByStops => {
                PipelineSpec::new(&[STOPS], PRICE, Stat::Mean).order(GroupOrder::ValueDescending)
            }
            Scenario::StopsPriceTrend { stops } => PipelineSpec::new(&[DAYS_BIN, STOPS], PRICE, Stat::Mean)
                .filter(STOPS, stops.clone())
                .bin(trend())
                .order(GroupOrder::Key),
            Scenario::AirlineClassPrices => {
                PipelineSpec::new(&[AIRLINE, CLASS], PRICE, Stat::Mean).order(GroupOrder::Key)
            }
            Scenario::StopsClassPrices => {
                PipelineSpec::new(&[STOPS, CLASS], PRICE, Stat::Mean).order(GroupOrder::Key)
            }
            Scenario::AirlineTrendForClass { class } => PipelineSpec::new(&[AIRLINE, DAYS_BIN], PRICE, Stat::Mean)
                .filter(CLASS, class.clone())
                .bin(trend())
                .order(GroupOrder::Key),
        }
    }

    /// One of each chart with no filters applied
    pub fn all() -> Vec<Scenario> {
        vec![
            Scenario::FlightsPerAirline,
            Scenario::FlightsPerClass,
            Scenario::FlightsPerStops,
            Scenario::PriceTrend { airline: Selection::All },
            Scenario::BookingWindowPrices { airline: Selection::All },
            Scenario::PriceByClass,
            Scenario::ClassPriceTrend { class: Selection::All },
            Scenario::PriceByStops,
            Scenario::StopsPriceTrend { stops: Selection::All },
            Scenario::AirlineClassPrices,
            Scenario::StopsClassPrices,
            Scenario::AirlineTrendForClass { class: Selection::All },
        ]
    }

    pub fn run(&self, table: &Table, config: &DashboardConfig) -> Outcome {
        run_guarded(table, &self.to_spec(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    fn flights() -> Table {
        Table::new(
            "flights",
            vec![
                Column::categorical(AIRLINE, ["Indigo", "Vistara", "Indigo", "Vistara", "SpiceJet"]),
                Column::categorical(STOPS, ["zero", "one", "zero", "one", "zero"]),
                Column::categorical(CLASS, ["Economy", "Business", "Economy", "Economy", "Economy"]),
                Column::from_i64(DAYS_LEFT, vec![1, 3, 12, 49, 5]),
                Column::from_f64(PRICE, vec![6000.0, 40000.0, 3000.0, 5000.0, 4000.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_run_filter_bin_aggregate() {
        let spec = PipelineSpec::new(&[DAYS_BIN], PRICE, Stat::Mean)
            .filter(AIRLINE, Selection::only("Indigo"))
            .bin(BinStep::new(DAYS_LEFT, BinStrategy::fixed_width(5.0), DAYS_BIN))
            .order(GroupOrder::Key);

        let output = run(&flights(), &spec).unwrap();
        let result = output.aggregate().unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.get(&["(0, 5]"]), Some(6000.0));
        assert_eq!(result.get(&["(10, 15]"]), Some(3000.0));
    }

    #[test]
    fn test_run_empty_filter_result() {
        let spec = Scenario::PriceTrend { airline: Selection::only("Air India") }.to_spec(&DashboardConfig::default());
        let output = run(&flights(), &spec).unwrap();
        assert!(output.is_empty());
        assert_eq!(run_guarded(&flights(), &spec), Outcome::NoData);
    }

    #[test]
    fn test_run_rejects_bad_parameters_without_rows() {
        let spec = PipelineSpec::new(&[DAYS_BIN], PRICE, Stat::Mean)
            .filter(AIRLINE, Selection::only("Air India"))
            .bin(BinStep::new(DAYS_LEFT, BinStrategy::fixed_width(0.0), DAYS_BIN));
        assert_eq!(run(&flights(), &spec).unwrap_err(), PipelineError::InvalidBinWidth(0.0));

        let spec = PipelineSpec::new(&["carrier"], PRICE, Stat::Mean).filter(AIRLINE, Selection::only("Air India"));
        assert_eq!(
            run(&flights(), &spec).unwrap_err(),
            PipelineError::UnknownColumn("carrier".to_string())
        );
    }

    #[test]
    fn test_run_guarded_invalid() {
        let spec = PipelineSpec::new(&[], PRICE, Stat::Mean);
        match run_guarded(&flights(), &spec) {
            Outcome::Invalid { message } => assert!(message.contains("group-by")),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_run_guarded_too_many_bins() {
        let table = Table::new(
            "fares",
            vec![
                Column::categorical(AIRLINE, ["Indigo", "Indigo"]),
                Column::from_f64(PRICE, vec![1.0, 1e300]),
            ],
        )
        .unwrap();
        let spec = PipelineSpec::new(&["price_bin"], PRICE, Stat::Count)
            .bin(BinStep::new(PRICE, BinStrategy::fixed_width(1.0), "price_bin"));

        match run_guarded(&table, &spec) {
            Outcome::Invalid { message } => assert!(message.contains("bins")),
            other => panic!("unexpected outcome: {:?}", other),
        }

        let spec = PipelineSpec::new(&[DAYS_BIN], PRICE, Stat::Mean)
            .bin(BinStep::new(DAYS_LEFT, BinStrategy::fixed_width(1e-6), DAYS_BIN));
        assert!(matches!(run_guarded(&flights(), &spec), Outcome::Invalid { .. }));
    }

    #[test]
    fn test_scenarios_on_sample() {
        let config = DashboardConfig::default();
        let table = flights();

        for scenario in Scenario::all() {
            assert!(
                matches!(scenario.run(&table, &config), Outcome::Data { .. }),
                "{:?} produced no data",
                scenario
            );
        }
    }

    #[test]
    fn test_frequency_scenario() {
        let output = run(&flights(), &Scenario::FlightsPerAirline.to_spec(&DashboardConfig::default())).unwrap();
        let result = output.aggregate().unwrap();
        let keys: Vec<&str> = result.rows.iter().map(|r| r.key[0].as_str()).collect();
        assert_eq!(keys, vec!["Indigo", "Vistara", "SpiceJet"]);
        assert_eq!(result.rows[0].value, 2.0);
        assert_eq!(result.rows[2].share, 0.2);
    }

    #[test]
    fn test_booking_window_scenario() {
        let scenario = Scenario::BookingWindowPrices { airline: Selection::All };
        let output = run(&flights(), &scenario.to_spec(&DashboardConfig::default())).unwrap();
        let summaries = output.distribution().unwrap();

        let windows: Vec<&str> = summaries.iter().map(|s| s.key[0].as_str()).collect();
        assert_eq!(windows, vec!["0-5", "11-20", "31-60"]);
        assert_eq!(summaries[0].count, 3);
        assert_eq!(summaries[0].median, 6000.0);
    }

    #[test]
    fn test_class_filter_ignores_case() {
        let scenario = Scenario::ClassPriceTrend { class: Selection::only("business") };
        let output = run(&flights(), &scenario.to_spec(&DashboardConfig::default())).unwrap();
        let result = output.aggregate().unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.get(&["(0, 5]", "Business"]), Some(40000.0));
    }

    #[test]
    fn test_class_trend_same_when_binned_before_filtering() {
        let config = DashboardConfig::default();
        let table = flights();

        for class in ["Economy", "Business"] {
            let scenario = Scenario::ClassPriceTrend { class: Selection::only(class) };
            let output = run(&table, &scenario.to_spec(&config)).unwrap();

            let binned = bin_column(&table, DAYS_LEFT, &config.trend_strategy(), DAYS_BIN).unwrap();
            let subset = filter(&binned, &FilterSet::new().with(CLASS, Selection::only(class))).unwrap();
            let expected = aggregate(&subset, &[DAYS_BIN, CLASS], PRICE, Stat::Mean, GroupOrder::Key).unwrap();

            assert_eq!(output.aggregate().unwrap(), &expected);
        }
    }

    #[test]
    fn test_spec_from_json() {
        let spec: PipelineSpec = serde_json::from_str(
            r#"{
                "group_by": ["stops", "class"],
                "value_column": "price",
                "measure": {"stat": "max"},
                "order": "key"
            }"#,
        )
        .unwrap();
        assert!(spec.filters.is_empty());
        let output = run(&flights(), &spec).unwrap();
        assert_eq!(output.aggregate().unwrap().get(&["zero", "Economy"]), Some(6000.0));
    }

    #[test]
    fn test_scenario_from_json() {
        let scenario: Scenario =
            serde_json::from_str(r#"{"chart": "price_trend", "airline": {"only": "Vistara"}}"#).unwrap();
        assert_eq!(scenario, Scenario::PriceTrend { airline: Selection::only("Vistara") });

        let scenario: Scenario = serde_json::from_str(r#"{"chart": "price_by_stops"}"#).unwrap();
        assert_eq!(scenario, Scenario::PriceByStops);
    }

    #[test]
    fn test_outcome_serializes() {
        let json = serde_json::to_value(&Outcome::NoData).unwrap();
        assert_eq!(json["status"], "no_data");

        let outcome = Scenario::PriceByClass.run(&flights(), &DashboardConfig::default());
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "data");
        assert_eq!(json["output"]["aggregate"]["rows"][0]["key"][0], "Business");
    }
}
