use indexmap::IndexMap;

use super::{dropped_warning, per_group, StatOutput};
use crate::grammar::data::{DataFrame, DataValue, LevelKey};

/// Statistics computed for a box plot.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    /// Lower whisker end (smallest value inside the fence).
    pub min: f64,
    /// First quartile (25th percentile).
    pub q1: f64,
    /// Median (50th percentile).
    pub median: f64,
    /// Third quartile (75th percentile).
    pub q3: f64,
    /// Upper whisker end (largest value inside the fence).
    pub max: f64,
    /// Interquartile range (Q3 - Q1).
    pub iqr: f64,
    /// Values outside the fences.
    pub outliers: Vec<f64>,
}

impl BoxStats {
    /// Compute box plot statistics, with fences at `coef · IQR` beyond the quartiles.
    ///
    /// Returns `None` when no finite values are present.
    #[must_use]
    pub fn from_data(data: &[f64], coef: f64) -> Option<Self> {
        let mut sorted: Vec<f64> = data.iter().copied().filter(|x| x.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let q1 = percentile(&sorted, 25.0);
        let median = percentile(&sorted, 50.0);
        let q3 = percentile(&sorted, 75.0);
        let iqr = q3 - q1;

        let lower_fence = q1 - coef * iqr;
        let upper_fence = q3 + coef * iqr;

        let min = sorted.iter().copied().find(|&x| x >= lower_fence).unwrap_or(sorted[0]);
        let max = sorted.iter().rev().copied().find(|&x| x <= upper_fence).unwrap_or(sorted[sorted.len() - 1]);
        let outliers = sorted.iter().copied().filter(|&x| x < lower_fence || x > upper_fence).collect();

        Some(Self { min, q1, median, q3, max, iqr, outliers })
    }
}

/// Percentile of sorted data using linear interpolation between ranks.
#[must_use]
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        len => {
            let k = (p / 100.0) * (len - 1) as f64;
            let f = k.floor() as usize;
            let c = k.ceil() as usize;
            if f == c || c >= len {
                sorted[f.min(len - 1)]
            } else {
                let d = k - f as f64;
                sorted[f] * (1.0 - d) + sorted[c] * d
            }
        }
    }
}

/// Five-number summary of y per distinct x (first-seen order).
///
/// Emits `x`, `ymin`, `lower`, `middle`, `upper`, `ymax`, `outliers` (count)
/// and `n`. Without an x channel all rows form one box at x = 0.
#[must_use]
pub fn boxplot(frame: &DataFrame, layer: usize, coef: f64) -> StatOutput {
    let mut dropped = 0;
    let out = per_group(frame, &["x", "y"], |group| {
        let ys = group.get("y").unwrap_or_default();
        let mut by_x: IndexMap<LevelKey, Vec<f64>> = IndexMap::new();
        for (row, y) in ys.iter().enumerate() {
            let key = group.value(row, "x").map_or(LevelKey::Number(0.0.into()), DataValue::level_key);
            match y.as_f64() {
                Some(v) => by_x.entry(key).or_default().push(v),
                None => dropped += 1,
            }
        }

        let mut columns: [Vec<DataValue>; 8] = Default::default();
        for (key, values) in &by_x {
            let Some(stats) = BoxStats::from_data(values, coef) else { continue };
            let row = [
                key.to_value(),
                stats.min.into(),
                stats.q1.into(),
                stats.median.into(),
                stats.q3.into(),
                stats.max.into(),
                (stats.outliers.len() as f64).into(),
                (values.len() as f64).into(),
            ];
            for (column, value) in columns.iter_mut().zip(row) {
                column.push(value);
            }
        }
        let mut out = DataFrame::new();
        for (name, values) in ["x", "ymin", "lower", "middle", "upper", "ymax", "outliers", "n"].into_iter().zip(columns) {
            out.add_column(name, values);
        }
        out
    });
    StatOutput { frame: out, warnings: dropped_warning(layer, dropped, "non-numeric y in boxplot").into_iter().collect() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_box_stats_basic() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
        let stats = BoxStats::from_data(&data, 1.5).expect("operation should succeed");
        assert_relative_eq!(stats.median, 5.0);
        assert_relative_eq!(stats.q1, 3.0);
        assert_relative_eq!(stats.q3, 7.0);
        assert!(stats.outliers.is_empty());
    }

    #[test]
    fn test_box_stats_with_outliers() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0, 100.0];
        let stats = BoxStats::from_data(&data, 1.5).expect("operation should succeed");
        assert_eq!(stats.outliers, vec![100.0]);
        assert_relative_eq!(stats.max, 5.0);
    }

    #[test]
    fn test_box_stats_empty() {
        assert!(BoxStats::from_data(&[], 1.5).is_none());
        assert!(BoxStats::from_data(&[f64::NAN], 1.5).is_none());
    }

    #[test]
    fn test_percentile() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(percentile(&sorted, 0.0), 1.0);
        assert_relative_eq!(percentile(&sorted, 50.0), 3.0);
        assert_relative_eq!(percentile(&sorted, 100.0), 5.0);
        assert_relative_eq!(percentile(&sorted, 12.5), 1.5);
    }

    #[test]
    fn test_boxplot_per_x() {
        let frame = DataFrame::new()
            .with_column("x", ["a", "a", "a", "b", "b"])
            .with_column("y", [1.0, 2.0, 3.0, 10.0, 20.0]);
        let out = boxplot(&frame, 0, 1.5).frame;
        assert_eq!(out.nrow(), 2);
        assert_eq!(out.get_f64("middle"), Some(vec![2.0, 15.0]));
        assert_eq!(out.get_f64("n"), Some(vec![3.0, 2.0]));
        assert_eq!(out.value(1, "x"), Some(&DataValue::from("b")));
    }

    #[test]
    fn test_boxplot_without_x() {
        let frame = DataFrame::new().with_column("y", [4.0, 5.0, 6.0]);
        let out = boxplot(&frame, 0, 1.5).frame;
        assert_eq!(out.get_f64("x"), Some(vec![0.0]));
        assert_eq!(out.get_f64("upper"), Some(vec![5.5]));
    }
}
