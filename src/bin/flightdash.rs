/// FlightDash report
///
/// Composition root for the dashboard: reads configuration from the
/// environment, loads the dataset once, and prints the data behind every
/// chart as JSON on stdout.
///
/// With no arguments the full report is printed. Each argument, if any, is
/// a JSON scenario such as `{"chart": "price_trend", "airline": {"only": "Vistara"}}`
/// and only those charts are printed.

use flightdash::{
    histogram, selection_options, ColumnSummary, DashboardConfig, Overview, Scenario, TableStore,
};
use flightdash::store::{AIRLINE, CLASS, DAYS_LEFT, DURATION, PRICE, STOPS};
use log::{error, info};
use serde_json::{json, Value};
use std::process::ExitCode;

fn main() -> ExitCode {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    match report(std::env::args().skip(1).collect()) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(message) => {
            error!("{}", message);
            ExitCode::FAILURE
        }
    }
}

fn report(args: Vec<String>) -> Result<String, String> {
    let config = DashboardConfig::from_env().map_err(|e| e.to_string())?;
    let store = TableStore::load(&config.dataset_path).map_err(|e| e.to_string())?;
    let table = store.table();

    let scenarios = if args.is_empty() {
        Scenario::all()
    } else {
        args.iter()
            .map(|arg| serde_json::from_str::<Scenario>(arg).map_err(|e| format!("Bad scenario '{}': {}", arg, e)))
            .collect::<Result<Vec<_>, _>>()?
    };

    let charts: Vec<Value> = scenarios
        .iter()
        .map(|scenario| json!({ "scenario": scenario, "outcome": scenario.run(table, &config) }))
        .collect();
    info!("Computed {} charts", charts.len());

    let mut output = json!({ "charts": charts });
    if args.is_empty() {
        let pipeline_err = |e: flightdash::PipelineError| e.to_string();
        let bins = config.histogram_bins;

        output["overview"] = json!(Overview::compute(table).map_err(pipeline_err)?);
        output["summaries"] = json!([
            ColumnSummary::compute(table, PRICE).map_err(pipeline_err)?,
            ColumnSummary::compute(table, DAYS_LEFT).map_err(pipeline_err)?,
        ]);
        output["histograms"] = json!({
            PRICE: histogram(table, PRICE, bins).map_err(pipeline_err)?,
            DURATION: histogram(table, DURATION, bins).map_err(pipeline_err)?,
            DAYS_LEFT: histogram(table, DAYS_LEFT, bins).map_err(pipeline_err)?,
        });
        output["options"] = json!({
            AIRLINE: selection_options(table, AIRLINE, &config.all_airlines_label).map_err(pipeline_err)?,
            CLASS: selection_options(table, CLASS, &config.all_classes_label).map_err(pipeline_err)?,
            STOPS: selection_options(table, STOPS, &config.all_stops_label).map_err(pipeline_err)?,
        });
    }

    serde_json::to_string_pretty(&output).map_err(|e| e.to_string())
}
