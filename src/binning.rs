/// Binning Engine
///
/// Turns a numeric column into a categorical one so it can serve as a
/// group-by key. Two strategies are supported:
///
/// - `BinStrategy::FixedWidth`: boundaries `0, w, 2w, ...` extended until the
///   last boundary reaches the column maximum. Labels read `(lo, hi]`.
/// - `BinStrategy::Labeled`: a configured, ordered list of edges with
///   human-readable labels. The last interval is open-ended; its upper bound
///   is `max(last_edge + 1, observed_max)` so the largest value is never lost.
///
/// # Interval policy
///
/// Every bin is right-closed, `(lo, hi]`, and the lowest boundary is also
/// inclusive. A value exactly on a boundary therefore belongs to the bin
/// that ends there: with booking windows `0, 5, 10, ...` a `days_left` of 5
/// falls in `"0-5"` and a `days_left` of 0 falls in `"0-5"` too.
///
/// # Examples
///
/// ```
/// use flightdash::{bin_column, BinStrategy, Column, LabeledIntervals, Table};
///
/// let table = Table::new("flights", vec![
///     Column::from_i64("days_left", vec![0, 5, 6, 49]),
/// ]).unwrap();
///
/// let windows = BinStrategy::Labeled(LabeledIntervals::booking_windows());
/// let binned = bin_column(&table, "days_left", &windows, "booking_window").unwrap();
///
/// let col = binned.column("booking_window").unwrap();
/// assert_eq!(col.get_str(1), Some("0-5"));
/// assert_eq!(col.get_str(2), Some("6-10"));
/// assert_eq!(col.get_str(3), Some("31-60"));
/// ```

use crate::column::Column;
use crate::error::{PipelineError, PipelineResult};
use crate::interner::{CategoryDictionary, CategoryId};
use crate::table::Table;
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default width of fixed-width bins (days)
pub const DEFAULT_BIN_WIDTH: f64 = 5.0;

/// Upper limit on the number of fixed-width or histogram bins over one column
pub const MAX_FIXED_BINS: usize = 10_000;

/// A labeled numeric interval `(lower, upper]`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bin {
    pub lower: f64,
    pub upper: f64,
    pub label: String,
}

/// Contiguous, ordered bins over a numeric range
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinSet {
    bins: Vec<Bin>,
}

impl BinSet {
    /// Build bins from strictly increasing boundaries.
    ///
    /// `labels`, when given, must hold one label per interval
    /// (`boundaries.len() - 1`). Otherwise each bin is labeled `(lo, hi]`.
    pub fn from_boundaries(boundaries: &[f64], labels: Option<&[String]>) -> PipelineResult<Self> {
        if boundaries.len() < 2 {
            return Err(PipelineError::InvalidParameter(format!(
                "At least two bin boundaries are required, got {}",
                boundaries.len()
            )));
        }
        if let Some(bad) = boundaries.iter().find(|b| !b.is_finite()) {
            return Err(PipelineError::InvalidParameter(format!(
                "Bin boundary {} is not finite",
                bad
            )));
        }
        check_increasing(boundaries)?;

        let intervals = boundaries.len() - 1;
        if let Some(labels) = labels {
            if labels.len() != intervals {
                return Err(PipelineError::LabelCountMismatch {
                    expected: intervals,
                    actual: labels.len(),
                });
            }
        }

        let bins = boundaries
            .windows(2)
            .enumerate()
            .map(|(i, pair)| Bin {
                lower: pair[0],
                upper: pair[1],
                label: match labels {
                    Some(labels) => labels[i].clone(),
                    None => interval_label(pair[0], pair[1]),
                },
            })
            .collect();

        Ok(BinSet { bins })
    }

    /// Fixed-width bins `0, w, 2w, ...` whose last boundary is the first
    /// multiple of `width` at or above `max`. There is always at least one bin.
    pub fn fixed_width(max: f64, width: f64) -> PipelineResult<Self> {
        if !(width.is_finite() && width > 0.0) {
            return Err(PipelineError::InvalidBinWidth(width));
        }
        if !max.is_finite() {
            return Err(PipelineError::InvalidParameter(format!(
                "Cannot derive bins from maximum {}",
                max
            )));
        }

        let estimate = (max / width).ceil().max(1.0);
        if estimate > MAX_FIXED_BINS as f64 {
            return Err(PipelineError::InvalidParameter(format!(
                "Bin width {} over maximum {} needs more than {} bins",
                width, max, MAX_FIXED_BINS
            )));
        }

        let mut count = estimate as usize;
        // Rounding can leave the maximum just past the last edge
        while (count as f64) * width < max {
            count += 1;
        }

        let boundaries: Vec<f64> = (0..=count).map(|i| i as f64 * width).collect();
        Self::from_boundaries(&boundaries, None)
    }

    /// Index of the bin holding `value`, or None when it lies outside every bin
    pub fn assign(&self, value: f64) -> Option<usize> {
        let first = self.bins.first()?;
        if value.is_nan() || value < first.lower {
            return None;
        }
        // Bins are sorted by upper bound, so the first upper >= value wins
        let idx = self.bins.partition_point(|b| b.upper < value);
        if idx < self.bins.len() {
            Some(idx)
        } else {
            None
        }
    }

    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.bins.iter().map(|b| b.label.as_str())
    }

    pub fn lowest(&self) -> Option<f64> {
        self.bins.first().map(|b| b.lower)
    }

    pub fn highest(&self) -> Option<f64> {
        self.bins.last().map(|b| b.upper)
    }

    /// Category dictionary whose IDs are the bin indices
    pub fn dictionary(&self) -> CategoryDictionary {
        CategoryDictionary::ordered(self.labels())
    }
}

/// Named thresholds with one label per interval; the last interval is
/// open-ended.
///
/// `edges[i]..edges[i + 1]` is labeled `labels[i]`; the last label covers
/// `edges.last()` up to `max(edges.last() + 1, observed_max)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledIntervals {
    edges: Vec<f64>,
    labels: Vec<String>,
}

impl LabeledIntervals {
    pub fn new(edges: Vec<f64>, labels: Vec<String>) -> PipelineResult<Self> {
        let intervals = LabeledIntervals { edges, labels };
        intervals.validate()?;
        Ok(intervals)
    }

    /// Booking windows for `days_left`: 0-5, 6-10, 11-20, 21-30, 31-60,
    /// 61-90, 91-120 and 120+.
    pub fn booking_windows() -> Self {
        LabeledIntervals {
            edges: vec![0.0, 5.0, 10.0, 20.0, 30.0, 60.0, 90.0, 120.0],
            labels: ["0-5", "6-10", "11-20", "21-30", "31-60", "61-90", "91-120", "120+"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Check the configuration; deserialized values skip `new`.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.edges.is_empty() {
            return Err(PipelineError::InvalidParameter(
                "Labeled intervals need at least one edge".to_string(),
            ));
        }
        if self.labels.len() != self.edges.len() {
            return Err(PipelineError::LabelCountMismatch {
                expected: self.edges.len(),
                actual: self.labels.len(),
            });
        }
        check_increasing(&self.edges)
    }

    /// Concrete bins once the column maximum is known
    pub fn resolve(&self, observed_max: f64) -> PipelineResult<BinSet> {
        self.validate()?;
        let last = self.edges[self.edges.len() - 1];
        let mut boundaries = self.edges.clone();
        boundaries.push(observed_max.max(last + 1.0));
        BinSet::from_boundaries(&boundaries, Some(self.labels.as_slice()))
    }
}

impl Default for LabeledIntervals {
    fn default() -> Self {
        Self::booking_windows()
    }
}

/// How a numeric column is cut into bins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BinStrategy {
    FixedWidth { width: f64 },
    Labeled(LabeledIntervals),
}

impl BinStrategy {
    pub fn fixed_width(width: f64) -> Self {
        BinStrategy::FixedWidth { width }
    }

    /// Reject parameters that cannot produce bins, before looking at data
    pub fn validate(&self) -> PipelineResult<()> {
        match self {
            BinStrategy::FixedWidth { width } => {
                if width.is_finite() && *width > 0.0 {
                    Ok(())
                } else {
                    Err(PipelineError::InvalidBinWidth(*width))
                }
            }
            BinStrategy::Labeled(intervals) => intervals.validate(),
        }
    }

    pub fn resolve(&self, observed_max: f64) -> PipelineResult<BinSet> {
        match self {
            BinStrategy::FixedWidth { width } => BinSet::fixed_width(observed_max, *width),
            BinStrategy::Labeled(intervals) => intervals.resolve(observed_max),
        }
    }
}

impl Default for BinStrategy {
    fn default() -> Self {
        BinStrategy::FixedWidth { width: DEFAULT_BIN_WIDTH }
    }
}

/// Compute the bins for `column` and the bin index of every row.
pub fn assign_bins(table: &Table, column: &str, strategy: &BinStrategy) -> PipelineResult<(BinSet, Vec<usize>)> {
    strategy.validate()?;
    let col = table.numeric_column(column)?;

    // No values means no maximum to derive boundaries from
    let max = col
        .iter_f64()
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v))))
        .ok_or_else(|| PipelineError::EmptyColumn(column.to_string()))?;

    let bins = strategy.resolve(max)?;
    let lowest = bins.lowest().unwrap_or(0.0);

    let assignments = col
        .iter_f64()
        .map(|value| {
            bins.assign(value).ok_or_else(|| PipelineError::OutOfRange {
                column: column.to_string(),
                value,
                lowest,
            })
        })
        .collect::<PipelineResult<Vec<usize>>>()?;

    debug!(
        "Binned '{}' into {} bins over {} rows (max {})",
        column,
        bins.len(),
        assignments.len(),
        max
    );
    Ok((bins, assignments))
}

/// Append a categorical column `output` holding each row's bin label.
///
/// The source column is untouched. The new column's category domain is the
/// full ordered bin list, including bins no row falls into.
pub fn bin_column(table: &Table, column: &str, strategy: &BinStrategy, output: &str) -> PipelineResult<Table> {
    let (bins, assignments) = assign_bins(table, column, strategy)?;
    let codes: Vec<CategoryId> = assignments.into_iter().map(|i| i as CategoryId).collect();
    let binned = Column::from_codes(output, codes, Arc::new(bins.dictionary()))?;
    table.with_column(binned)
}

/// One bar of a histogram, `[lower, upper)` except the last which also
/// holds `upper`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Equal-width histogram of a numeric column over its observed range.
///
/// A zero-row column gives no bars; a constant column gives one bar.
pub fn histogram(table: &Table, column: &str, nbins: usize) -> PipelineResult<Vec<HistogramBin>> {
    if nbins == 0 || nbins > MAX_FIXED_BINS {
        return Err(PipelineError::InvalidParameter(format!(
            "A histogram needs between 1 and {} bins, got {}",
            MAX_FIXED_BINS, nbins
        )));
    }
    let col = table.numeric_column(column)?;
    let values: Vec<f64> = col.iter_f64().filter(|v| v.is_finite()).collect();

    let (min, max) = match values.iter().fold(None, |acc: Option<(f64, f64)>, &v| {
        Some(acc.map_or((v, v), |(lo, hi)| (lo.min(v), hi.max(v))))
    }) {
        Some(range) => range,
        None => return Ok(Vec::new()),
    };

    if min == max {
        return Ok(vec![HistogramBin { lower: min, upper: max, count: values.len() }]);
    }

    let width = (max - min) / nbins as f64;
    let mut counts = vec![0usize; nbins];
    for v in values {
        let idx = (((v - min) / width).floor() as usize).min(nbins - 1);
        counts[idx] += 1;
    }

    Ok(counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: min + i as f64 * width,
            upper: if i + 1 == nbins { max } else { min + (i + 1) as f64 * width },
            count,
        })
        .collect())
}

fn check_increasing(boundaries: &[f64]) -> PipelineResult<()> {
    for pair in boundaries.windows(2) {
        if !(pair[0] < pair[1]) {
            return Err(PipelineError::NonMonotonicBoundaries {
                lower: pair[0],
                upper: pair[1],
            });
        }
    }
    Ok(())
}

fn interval_label(lower: f64, upper: f64) -> String {
    format!("({}, {}]", lower, upper)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn days(values: Vec<i64>) -> Table {
        Table::new("flights", vec![Column::from_i64("days_left", values)]).unwrap()
    }

    #[test]
    fn test_fixed_width_boundaries() {
        let bins = BinSet::fixed_width(49.0, 5.0).unwrap();
        assert_eq!(bins.len(), 10);
        assert_eq!(bins.lowest(), Some(0.0));
        assert_eq!(bins.highest(), Some(50.0));
        assert_eq!(bins.bins()[0].label, "(0, 5]");
        assert_eq!(bins.bins()[9].label, "(45, 50]");
    }

    #[test]
    fn test_fixed_width_max_on_boundary() {
        let bins = BinSet::fixed_width(50.0, 5.0).unwrap();
        assert_eq!(bins.len(), 10);
        assert_eq!(bins.assign(50.0), Some(9));
    }

    #[test]
    fn test_fixed_width_zero_max_has_one_bin() {
        let bins = BinSet::fixed_width(0.0, 5.0).unwrap();
        assert_eq!(bins.len(), 1);
        assert_eq!(bins.assign(0.0), Some(0));
    }

    #[test]
    fn test_fixed_width_right_closed() {
        let bins = BinSet::fixed_width(20.0, 5.0).unwrap();
        assert_eq!(bins.assign(0.0), Some(0));
        assert_eq!(bins.assign(5.0), Some(0));
        assert_eq!(bins.assign(5.5), Some(1));
        assert_eq!(bins.assign(20.0), Some(3));
        assert_eq!(bins.assign(20.5), None);
        assert_eq!(bins.assign(-1.0), None);
    }

    #[test]
    fn test_invalid_width() {
        assert_eq!(BinSet::fixed_width(10.0, 0.0), Err(PipelineError::InvalidBinWidth(0.0)));
        assert_eq!(BinSet::fixed_width(10.0, -5.0), Err(PipelineError::InvalidBinWidth(-5.0)));
        assert!(BinStrategy::fixed_width(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_fixed_width_bin_count_limit() {
        assert!(matches!(
            BinSet::fixed_width(1e300, 1.0),
            Err(PipelineError::InvalidParameter(_))
        ));
        assert!(matches!(
            BinSet::fixed_width(100.0, 1e-9),
            Err(PipelineError::InvalidParameter(_))
        ));
        assert_eq!(BinSet::fixed_width(MAX_FIXED_BINS as f64, 1.0).unwrap().len(), MAX_FIXED_BINS);
    }

    #[test]
    fn test_non_monotonic_boundaries() {
        let err = BinSet::from_boundaries(&[0.0, 10.0, 5.0], None).unwrap_err();
        assert_eq!(err, PipelineError::NonMonotonicBoundaries { lower: 10.0, upper: 5.0 });

        let err = LabeledIntervals::new(
            vec![0.0, 5.0, 5.0],
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::NonMonotonicBoundaries { .. }));
    }

    #[test]
    fn test_label_count_mismatch() {
        let err = LabeledIntervals::new(vec![0.0, 5.0], vec!["0-5".to_string()]).unwrap_err();
        assert_eq!(err, PipelineError::LabelCountMismatch { expected: 2, actual: 1 });
    }

    #[test]
    fn test_booking_windows_boundary_values() {
        let bins = LabeledIntervals::booking_windows().resolve(49.0).unwrap();
        let label = |v: f64| bins.assign(v).map(|i| bins.bins()[i].label.clone());

        assert_eq!(label(0.0).as_deref(), Some("0-5"));
        assert_eq!(label(5.0).as_deref(), Some("0-5"));
        assert_eq!(label(6.0).as_deref(), Some("6-10"));
        assert_eq!(label(10.0).as_deref(), Some("6-10"));
        assert_eq!(label(30.0).as_deref(), Some("21-30"));
        assert_eq!(label(120.0).as_deref(), Some("91-120"));
        assert_eq!(label(121.0).as_deref(), Some("120+"));
        assert_eq!(label(122.0), None);
    }

    #[test]
    fn test_booking_windows_extend_to_observed_max() {
        let bins = LabeledIntervals::booking_windows().resolve(200.0).unwrap();
        assert_eq!(bins.highest(), Some(200.0));
        assert_eq!(bins.assign(200.0), Some(7));
        assert_eq!(bins.len(), 8);
    }

    #[test]
    fn test_bin_column_coverage() {
        let values: Vec<i64> = (0..=49).chain([3, 17, 49]).collect();
        let table = days(values.clone());

        for strategy in [
            BinStrategy::fixed_width(5.0),
            BinStrategy::fixed_width(7.0),
            BinStrategy::Labeled(LabeledIntervals::booking_windows()),
        ] {
            let (bins, assignments) = assign_bins(&table, "days_left", &strategy).unwrap();
            assert_eq!(assignments.len(), values.len());

            for (value, idx) in values.iter().zip(&assignments) {
                let v = *value as f64;
                let bin = &bins.bins()[*idx];
                let lower_ok = if *idx == 0 { v >= bin.lower } else { v > bin.lower };
                assert!(lower_ok && v <= bin.upper, "{} not in {:?}", v, bin);
            }
        }
    }

    #[test]
    fn test_bin_column_appends_category() {
        let table = days(vec![1, 7, 49]);
        let binned = bin_column(&table, "days_left", &BinStrategy::default(), "days_bin").unwrap();

        assert_eq!(binned.schema().len(), 2);
        assert_eq!(table.schema().len(), 1);
        assert_eq!(binned.get_value(2, "days_left").unwrap().as_i64(), Some(49));

        let col = binned.column("days_bin").unwrap();
        assert_eq!(col.get_str(0), Some("(0, 5]"));
        assert_eq!(col.get_str(1), Some("(5, 10]"));
        assert_eq!(col.get_str(2), Some("(45, 50]"));
        // Domain keeps the empty bins in between
        assert_eq!(col.dictionary().unwrap().len(), 10);
    }

    #[test]
    fn test_bin_column_errors() {
        let table = days(vec![1, 7]);
        assert_eq!(
            bin_column(&table, "days", &BinStrategy::default(), "bin").unwrap_err(),
            PipelineError::UnknownColumn("days".to_string())
        );

        let empty = table.take(&[]);
        assert_eq!(
            bin_column(&empty, "days_left", &BinStrategy::default(), "bin").unwrap_err(),
            PipelineError::EmptyColumn("days_left".to_string())
        );

        let negative = days(vec![-2, 7]);
        assert!(matches!(
            bin_column(&negative, "days_left", &BinStrategy::default(), "bin"),
            Err(PipelineError::OutOfRange { .. })
        ));

        let text = Table::new("t", vec![Column::categorical("class", ["Economy"])]).unwrap();
        assert!(matches!(
            bin_column(&text, "class", &BinStrategy::default(), "bin"),
            Err(PipelineError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_strategy_from_json() {
        let strategy: BinStrategy = serde_json::from_str(r#"{"kind": "fixed_width", "width": 10}"#).unwrap();
        assert_eq!(strategy, BinStrategy::fixed_width(10.0));

        let strategy: BinStrategy = serde_json::from_str(
            r#"{"kind": "labeled", "edges": [0, 7, 30], "labels": ["week", "month", "later"]}"#,
        )
        .unwrap();
        let bins = strategy.resolve(90.0).unwrap();
        assert_eq!(bins.labels().collect::<Vec<_>>(), vec!["week", "month", "later"]);
    }

    #[test]
    fn test_histogram() {
        let table = Table::new("t", vec![Column::from_f64("price", vec![0.0, 1.0, 2.5, 9.0, 10.0])]).unwrap();
        let bars = histogram(&table, "price", 4).unwrap();

        assert_eq!(bars.len(), 4);
        assert_eq!(bars.iter().map(|b| b.count).collect::<Vec<_>>(), vec![2, 1, 0, 2]);
        assert_eq!(bars[0].lower, 0.0);
        assert_eq!(bars[3].upper, 10.0);
    }

    #[test]
    fn test_histogram_edge_cases() {
        let constant = Table::new("t", vec![Column::from_f64("price", vec![7.0, 7.0])]).unwrap();
        let bars = histogram(&constant, "price", 40).unwrap();
        assert_eq!(bars, vec![HistogramBin { lower: 7.0, upper: 7.0, count: 2 }]);

        assert!(histogram(&constant.take(&[]), "price", 40).unwrap().is_empty());
        assert!(histogram(&constant, "price", 0).is_err());
        assert!(histogram(&constant, "price", MAX_FIXED_BINS + 1).is_err());
    }
}
