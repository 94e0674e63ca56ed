/// FlightDash - Filter, Binning and Aggregation for the Flight Price Dashboard
///
/// Loads the flight dataset once into an immutable columnar table and answers
/// every chart of the dashboard with one parameterized pipeline:
/// filter -> bin -> aggregate. Each stage is a pure function from a table and
/// its parameters to a new value; the loaded table is never modified.

pub mod column;
pub mod interner;
pub mod table;
pub mod error;
pub mod store;
pub mod filter;
pub mod binning;
pub mod aggregate;
pub mod pipeline;
pub mod summary;
pub mod config;

pub use column::{Column, ColumnType, ColumnValue};
pub use interner::{CategoryDictionary, CategoryId};
pub use table::{Schema, Table, TableBuilder};
pub use error::{LoadError, PipelineError, PipelineResult};
pub use store::{flight_schema, FlightRecord, TableStore};
pub use filter::{filter, matching_rows, selection_options, FilterSet, MatchMode, Predicate, Selection};
pub use binning::{
    assign_bins, bin_column, histogram, Bin, BinSet, BinStrategy, HistogramBin, LabeledIntervals, MAX_FIXED_BINS,
};
pub use aggregate::{aggregate, describe_groups, AggregateResult, AggregateRow, GroupOrder, GroupSummary, Stat};
pub use pipeline::{run, run_guarded, BinStep, Measure, Outcome, PipelineOutput, PipelineSpec, Scenario};
pub use summary::{unique_combinations, ColumnSummary, Overview, RankedGroup};
pub use config::DashboardConfig;

#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::pipeline::DAYS_BIN;
    use crate::store::{AIRLINE, CLASS, DAYS_LEFT, PRICE, STOPS};

    const DATASET: &str = "\
,airline,flight,source_city,departure_time,stops,arrival_time,destination_city,class,duration,days_left,price
0,SpiceJet,SG-8709,Delhi,Evening,zero,Night,Mumbai,Economy,2.17,1,5953
1,SpiceJet,SG-8157,Delhi,Early_Morning,zero,Morning,Mumbai,Economy,2.33,5,5953
2,AirAsia,I5-764,Delhi,Early_Morning,zero,Early_Morning,Mumbai,Economy,2.17,6,5956
3,Vistara,UK-995,Delhi,Morning,zero,Afternoon,Mumbai,Economy,2.25,12,5955
4,Vistara,UK-963,Delhi,Morning,one,Morning,Mumbai,Business,12.0,12,42000
5,Air_India,AI-868,Mumbai,Evening,one,Night,Bangalore,Business,14.5,30,38000
6,Indigo,6E-5328,Mumbai,Morning,two_or_more,Evening,Bangalore,Economy,9.5,49,3100
7,Vistara,UK-825,Kolkata,Night,one,Morning,Delhi,Economy,11.0,2,9800
";

    fn store() -> TableStore {
        TableStore::from_reader("flights", DATASET.as_bytes()).unwrap()
    }

    #[test]
    fn test_complete_workflow() {
        let store = store();
        let table = store.table();
        assert_eq!(table.len(), 8);

        // Economy flights only, binned into 5-day windows
        let filters = FilterSet::new().with(CLASS, Selection::from_choice("economy", "All Classes"));
        let economy = filter(table, &filters).unwrap();
        assert_eq!(economy.len(), 6);

        let binned = bin_column(&economy, DAYS_LEFT, &BinStrategy::fixed_width(5.0), DAYS_BIN).unwrap();
        let trend = aggregate(&binned, &[DAYS_BIN], PRICE, Stat::Mean, GroupOrder::Key).unwrap();

        let labels: Vec<&str> = trend.rows.iter().map(|r| r.key[0].as_str()).collect();
        assert_eq!(labels, vec!["(0, 5]", "(5, 10]", "(10, 15]", "(45, 50]"]);
        assert_eq!(trend.get(&["(0, 5]"]), Some((5953.0 + 5953.0 + 9800.0) / 3.0));

        // The store itself is untouched
        assert_eq!(store.table().len(), 8);
        assert_eq!(store.table().schema().len(), 8);
    }

    #[test]
    fn test_filter_properties() {
        let table = store().shared();
        let airline = FilterSet::new().with(AIRLINE, Selection::only("Vistara"));
        let stops = FilterSet::new().with(STOPS, Selection::only("one"));

        let once = filter(&table, &airline).unwrap();
        let twice = filter(&once, &airline).unwrap();
        assert_eq!(once.to_json().unwrap(), twice.to_json().unwrap());

        let a_then_b = filter(&filter(&table, &airline).unwrap(), &stops).unwrap();
        let b_then_a = filter(&filter(&table, &stops).unwrap(), &airline).unwrap();
        assert_eq!(a_then_b.to_json().unwrap(), b_then_a.to_json().unwrap());
        assert_eq!(a_then_b.len(), 2);
    }

    #[test]
    fn test_empty_filter_flows_through() {
        let table = store().shared();
        let none = filter(&table, &FilterSet::new().with(AIRLINE, Selection::only("GO_FIRST"))).unwrap();
        assert!(none.is_empty());

        let result = aggregate(&none, &[AIRLINE], PRICE, Stat::Mean, GroupOrder::Natural).unwrap();
        assert!(result.is_empty());

        let outcome = Scenario::PriceTrend { airline: Selection::only("GO_FIRST") }
            .run(&table, &DashboardConfig::default());
        assert_eq!(outcome, Outcome::NoData);
    }

    #[test]
    fn test_dashboard_overview() {
        let table = store().shared();
        let overview = Overview::compute(&table).unwrap();

        assert_eq!(overview.total_records, 8);
        assert_eq!(overview.unique_routes, 3);
        assert_eq!(overview.cheapest_airline.unwrap().name, "Indigo");
        assert_eq!(overview.priciest_airline.unwrap().name, "Air_India");

        let options = selection_options(&table, AIRLINE, "All Airlines").unwrap();
        assert_eq!(options[0], "All Airlines");
        assert_eq!(options[1], "AirAsia");
        assert_eq!(options.len(), 6);

        let bars = histogram(&table, PRICE, 40).unwrap();
        assert_eq!(bars.len(), 40);
        assert_eq!(bars.iter().map(|b| b.count).sum::<usize>(), 8);
    }

    #[test]
    fn test_every_scenario_renders() {
        let table = store().shared();
        let config = DashboardConfig::default();

        for scenario in Scenario::all() {
            match scenario.run(&table, &config) {
                Outcome::Data { output } => assert!(!output.is_empty()),
                other => panic!("{:?} gave {:?}", scenario, other),
            }
        }
    }
}
