/// Table Store - the flight dataset loaded once per process
///
/// The store reads one CSV file into an immutable columnar `Table` and hands
/// out shared read-only access to it. The host process builds the store at
/// startup and passes it by reference into every pipeline run; there is no
/// global cache and no reload.
///
/// # Wire contract
///
/// The header must name every column in `FLIGHT_COLUMNS`. Extra columns
/// (flight number, departure time, a leading index column, ...) are ignored.
/// Any missing column, unparsable value or violated invariant aborts the load.
///
/// # Examples
///
/// ```
/// use flightdash::TableStore;
///
/// let csv = "\
/// airline,source_city,destination_city,stops,class,duration,days_left,price
/// SpiceJet,Delhi,Mumbai,zero,Economy,2.17,1,5953
/// Vistara,Delhi,Mumbai,one,Business,12.5,30,42000
/// ";
///
/// let store = TableStore::from_reader("flights", csv.as_bytes()).unwrap();
/// assert_eq!(store.table().len(), 2);
/// assert_eq!(store.table().max("price").unwrap(), Some(42000.0));
/// ```

use crate::column::{Column, ColumnType};
use crate::error::LoadError;
use crate::table::{Schema, Table};
use log::{debug, info};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const AIRLINE: &str = "airline";
pub const SOURCE_CITY: &str = "source_city";
pub const DESTINATION_CITY: &str = "destination_city";
pub const STOPS: &str = "stops";
pub const CLASS: &str = "class";
pub const DURATION: &str = "duration";
pub const DAYS_LEFT: &str = "days_left";
pub const PRICE: &str = "price";

/// Required dataset columns and their in-memory types
pub const FLIGHT_COLUMNS: [(&str, ColumnType); 8] = [
    (AIRLINE, ColumnType::Category),
    (SOURCE_CITY, ColumnType::Category),
    (DESTINATION_CITY, ColumnType::Category),
    (STOPS, ColumnType::Category),
    (CLASS, ColumnType::Category),
    (DURATION, ColumnType::Float64),
    (DAYS_LEFT, ColumnType::Int64),
    (PRICE, ColumnType::Float64),
];

/// Accepted values of the `class` column
pub const FLIGHT_CLASSES: [&str; 2] = ["Economy", "Business"];

/// Schema of the loaded flight table
pub fn flight_schema() -> Schema {
    Schema::new(
        FLIGHT_COLUMNS
            .iter()
            .map(|(name, ty)| (name.to_string(), *ty))
            .collect(),
    )
}

/// One row of the dataset as it appears on the wire
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FlightRecord {
    pub airline: String,
    pub source_city: String,
    pub destination_city: String,
    pub stops: String,
    pub class: String,
    pub duration: f64,
    pub days_left: i64,
    pub price: f64,
}

impl FlightRecord {
    /// Check the data-model invariants and return the canonical class.
    /// `row` is the 1-based data row.
    fn validate(&self, row: usize) -> Result<&'static str, LoadError> {
        let invalid = |column: &str, value: String, reason: &str| LoadError::InvalidValue {
            row,
            column: column.to_string(),
            value,
            reason: reason.to_string(),
        };

        if !(self.price.is_finite() && self.price >= 0.0) {
            return Err(invalid(PRICE, self.price.to_string(), "must be a non-negative number"));
        }
        if self.days_left < 0 {
            return Err(invalid(DAYS_LEFT, self.days_left.to_string(), "must be non-negative"));
        }
        if !(self.duration.is_finite() && self.duration >= 0.0) {
            return Err(invalid(DURATION, self.duration.to_string(), "must be a non-negative number"));
        }
        canonical_class(&self.class)
            .ok_or_else(|| invalid(CLASS, self.class.clone(), "must be Economy or Business"))
    }
}

/// The `FLIGHT_CLASSES` spelling of `class`, matched ignoring case
pub fn canonical_class(class: &str) -> Option<&'static str> {
    FLIGHT_CLASSES
        .iter()
        .copied()
        .find(|c| c.eq_ignore_ascii_case(class.trim()))
}

/// Read-only owner of the loaded flight table
#[derive(Debug, Clone)]
pub struct TableStore {
    source: Option<PathBuf>,
    table: Arc<Table>,
}

impl TableStore {
    /// Load the dataset from a CSV file.
    ///
    /// A missing or unreadable file, a missing required column or an invalid
    /// value is a fatal `LoadError`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        info!("Loading flight dataset from {}", path.display());

        let file = File::open(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "flights".to_string());

        let table = read_flight_table(&name, BufReader::new(file))?;
        info!("Loaded {} flight records from {}", table.len(), path.display());

        Ok(TableStore {
            source: Some(path.to_path_buf()),
            table: Arc::new(table),
        })
    }

    /// Load the dataset from any reader holding CSV text
    pub fn from_reader<R: Read>(name: &str, reader: R) -> Result<Self, LoadError> {
        let table = read_flight_table(name, reader)?;
        info!("Loaded {} flight records into '{}'", table.len(), name);
        Ok(TableStore {
            source: None,
            table: Arc::new(table),
        })
    }

    /// Wrap an already built table
    pub fn from_table(table: Table) -> Self {
        TableStore {
            source: None,
            table: Arc::new(table),
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Shared handle for readers that outlive a borrow of the store
    pub fn shared(&self) -> Arc<Table> {
        Arc::clone(&self.table)
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

fn read_flight_table<R: Read>(name: &str, reader: R) -> Result<Table, LoadError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    for (column, _) in FLIGHT_COLUMNS.iter() {
        if !headers.iter().any(|h| h == *column) {
            return Err(LoadError::MissingColumn {
                column: column.to_string(),
            });
        }
    }
    debug!("Dataset header: {:?}", headers);

    let mut airline = Vec::new();
    let mut source_city = Vec::new();
    let mut destination_city = Vec::new();
    let mut stops = Vec::new();
    let mut class = Vec::new();
    let mut duration = Vec::new();
    let mut days_left = Vec::new();
    let mut price = Vec::new();

    for (idx, result) in csv_reader.deserialize::<FlightRecord>().enumerate() {
        let record = result?;
        let flight_class = record.validate(idx + 1)?;

        airline.push(record.airline);
        source_city.push(record.source_city);
        destination_city.push(record.destination_city);
        stops.push(record.stops);
        class.push(flight_class);
        duration.push(record.duration);
        days_left.push(record.days_left);
        price.push(record.price);
    }

    let columns = vec![
        Column::categorical(AIRLINE, airline),
        Column::categorical(SOURCE_CITY, source_city),
        Column::categorical(DESTINATION_CITY, destination_city),
        Column::categorical(STOPS, stops),
        Column::categorical(CLASS, class),
        Column::from_f64(DURATION, duration),
        Column::from_i64(DAYS_LEFT, days_left),
        Column::from_f64(PRICE, price),
    ];

    Ok(Table::new(name, columns)?)
}
