/// Booking Trends Example
///
/// This example demonstrates:
/// - Building a flight table row by row with TableBuilder
/// - Filtering it to one airline
/// - Binning days_left into 5-day bins and into booking windows
/// - Aggregating mean price per bin and box summaries per window

use flightdash::{
    aggregate, bin_column, describe_groups, filter, flight_schema, BinStrategy, ColumnValue,
    FilterSet, GroupOrder, LabeledIntervals, Selection, Stat, TableBuilder,
};

fn main() {
    println!("=== FlightDash Booking Trends Example ===\n");

    // 1. Build a small flight table
    println!("1. Building flight table...");
    let mut builder = TableBuilder::new("flights", flight_schema());

    let flights = vec![
        ("Vistara", "Delhi", "Mumbai", "zero", "Economy", 2.25, 1, 9800.0),
        ("Vistara", "Delhi", "Mumbai", "one", "Business", 12.0, 3, 48000.0),
        ("Vistara", "Delhi", "Mumbai", "zero", "Economy", 2.25, 8, 7400.0),
        ("Vistara", "Mumbai", "Kolkata", "one", "Economy", 9.5, 17, 6100.0),
        ("Vistara", "Mumbai", "Kolkata", "one", "Business", 9.5, 26, 39000.0),
        ("Vistara", "Kolkata", "Delhi", "zero", "Economy", 2.5, 44, 4300.0),
        ("Indigo", "Delhi", "Mumbai", "zero", "Economy", 2.1, 2, 6200.0),
        ("Indigo", "Delhi", "Mumbai", "zero", "Economy", 2.1, 33, 3200.0),
    ];

    for (airline, from, to, stops, class, duration, days_left, price) in flights {
        builder
            .append_values(vec![
                ColumnValue::String(airline.to_string()),
                ColumnValue::String(from.to_string()),
                ColumnValue::String(to.to_string()),
                ColumnValue::String(stops.to_string()),
                ColumnValue::String(class.to_string()),
                ColumnValue::Float64(duration),
                ColumnValue::Int64(days_left),
                ColumnValue::Float64(price),
            ])
            .unwrap();
    }
    let table = builder.build().unwrap();
    println!("   Added {} flights\n", table.len());

    // 2. Keep one airline
    println!("2. Filtering to Vistara...");
    let vistara = filter(&table, &FilterSet::new().with("airline", Selection::only("Vistara"))).unwrap();
    println!("   {} of {} flights remain\n", vistara.len(), table.len());

    // 3. Price trend over 5-day bins
    println!("3. Average price per 5-day bin:");
    let binned = bin_column(&vistara, "days_left", &BinStrategy::fixed_width(5.0), "days_bin").unwrap();
    let trend = aggregate(&binned, &["days_bin"], "price", Stat::Mean, GroupOrder::Key).unwrap();
    for row in &trend.rows {
        println!("   {:>10}: {:>9.2} ({} flights)", row.key[0], row.value, row.count);
    }

    // 4. Price spread per booking window
    println!("\n4. Price spread per booking window:");
    let windows = BinStrategy::Labeled(LabeledIntervals::booking_windows());
    let binned = bin_column(&vistara, "days_left", &windows, "booking_window").unwrap();
    let spread = describe_groups(&binned, &["booking_window"], "price", GroupOrder::Key).unwrap();
    for group in &spread {
        println!(
            "   {:>7}: min {:>8.0}  median {:>8.0}  max {:>8.0}",
            group.key[0], group.min, group.median, group.max
        );
    }

    // 5. Cheapest window
    let by_window = aggregate(&binned, &["booking_window"], "price", Stat::Mean, GroupOrder::Key).unwrap();
    if let Some(cheapest) = by_window.argmin() {
        println!("\n5. Cheapest booking window: {} ({:.2})", cheapest.key[0], cheapest.value);
    }

    println!("\n=== Example Complete ===");
}
