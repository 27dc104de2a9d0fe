//! Statistical transformations.
//!
//! A stat is a pure function from a layer's channel frame (columns named
//! after channels: `x`, `y`, `fill`, `group`, ...) to a new frame. Stats run
//! once per `group`; columns that are constant within a group (its fill, its
//! color) are carried into the output so scales can still be applied.

mod bin;
mod boxplot;
mod count;
mod density;
mod smooth;

use indexmap::IndexMap;

use crate::config::Config;
use crate::grammar::data::{DataFrame, DataValue, LevelKey};
use crate::warning::Warning;

pub use bin::{bin, MAX_BINS};
pub use boxplot::{boxplot, percentile, BoxStats};
pub use count::count;
pub use density::{density, silverman_bandwidth, ydensity, ViolinScale};
pub use smooth::{normal_quantile, smooth_linear, smooth_loess, t_quantile, LinearFit, LoessFit};

/// Name of the grouping column in channel frames.
pub const GROUP: &str = "group";

/// Smoothing method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmoothMethod {
    /// Local polynomial regression (LOESS).
    #[default]
    Loess,
    /// Ordinary least squares.
    Linear,
}

/// Statistical transformation type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stat {
    /// No transformation (identity).
    Identity,
    /// Count rows per distinct x.
    Count,
    /// Bin continuous x into equal-width intervals.
    Bin {
        /// Number of bins (config default when `None`).
        bins: Option<usize>,
        /// Bin width; overrides `bins` when set.
        binwidth: Option<f64>,
    },
    /// Gaussian kernel density estimate of x.
    Density {
        /// Bandwidth multiplier.
        adjust: f64,
        /// Grid points (config default when `None`).
        n: Option<usize>,
    },
    /// Fitted curve of y on x.
    Smooth {
        /// Fitting method.
        method: SmoothMethod,
        /// Emit a confidence band (linear only).
        se: bool,
        /// LOESS span (config default when `None`).
        span: Option<f64>,
        /// Grid points (config default when `None`).
        n: Option<usize>,
    },
    /// Five-number summary of y per x.
    Boxplot {
        /// Whisker length in IQRs.
        coef: f64,
    },
    /// Kernel density of y per x, for violins.
    YDensity {
        /// Bandwidth multiplier.
        adjust: f64,
        /// Grid points per violin (config default when `None`).
        n: Option<usize>,
        /// Keep the grid inside the data range.
        trim: bool,
        /// Width scaling across violins.
        scale: ViolinScale,
        /// Fixed bandwidth; Silverman's rule when `None`.
        bw: Option<f64>,
    },
}

impl Stat {
    /// Create an identity stat (no transformation).
    #[must_use]
    pub fn identity() -> Self {
        Stat::Identity
    }

    /// Create a count stat.
    #[must_use]
    pub fn count() -> Self {
        Stat::Count
    }

    /// Create a binning stat.
    #[must_use]
    pub fn bin(bins: usize) -> Self {
        Stat::Bin { bins: Some(bins), binwidth: None }
    }

    /// Create a binning stat with a fixed bin width.
    #[must_use]
    pub fn binwidth(width: f64) -> Self {
        Stat::Bin { bins: None, binwidth: Some(width) }
    }

    /// Create a density estimation stat.
    #[must_use]
    pub fn density() -> Self {
        Stat::Density { adjust: 1.0, n: None }
    }

    /// Create a boxplot stat.
    #[must_use]
    pub fn boxplot() -> Self {
        Stat::Boxplot { coef: 1.5 }
    }

    /// Create a violin density stat.
    #[must_use]
    pub fn ydensity() -> Self {
        Stat::YDensity { adjust: 1.0, n: None, trim: true, scale: ViolinScale::Area, bw: None }
    }

    /// Create a LOESS smooth stat.
    #[must_use]
    pub fn smooth() -> Self {
        Stat::Smooth { method: SmoothMethod::Loess, se: true, span: None, n: None }
    }

    /// Create a linear-fit smooth stat.
    #[must_use]
    pub fn smooth_linear() -> Self {
        Stat::Smooth { method: SmoothMethod::Linear, se: true, span: None, n: None }
    }

    /// Short name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Stat::Identity => "identity",
            Stat::Count => "count",
            Stat::Bin { .. } => "bin",
            Stat::Density { .. } => "density",
            Stat::Smooth { method: SmoothMethod::Linear, .. } => "smooth-linear",
            Stat::Smooth { method: SmoothMethod::Loess, .. } => "smooth-loess",
            Stat::Boxplot { .. } => "boxplot",
            Stat::YDensity { .. } => "ydensity",
        }
    }

    /// Whether the stat replaces the y channel with a computed value.
    #[must_use]
    pub fn computes_y(&self) -> bool {
        matches!(self, Stat::Count | Stat::Bin { .. } | Stat::Density { .. })
    }

    /// Run the stat on a channel frame.
    #[must_use]
    pub fn compute(&self, frame: &DataFrame, ctx: &StatContext) -> StatOutput {
        tracing::debug!(stat = self.name(), rows = frame.nrow(), layer = ctx.layer, "computing stat");
        match *self {
            Stat::Identity => StatOutput { frame: frame.clone(), warnings: Vec::new() },
            Stat::Count => count(frame),
            Stat::Bin { bins, binwidth } => bin(frame, ctx, bins, binwidth),
            Stat::Density { adjust, n } => density(frame, ctx, adjust, n.unwrap_or(ctx.density_points)),
            Stat::Smooth { method: SmoothMethod::Linear, se, n, .. } => {
                smooth_linear(frame, ctx, se, n.unwrap_or(ctx.smooth_points))
            }
            Stat::Smooth { method: SmoothMethod::Loess, span, n, .. } => {
                smooth_loess(frame, ctx, span.unwrap_or(ctx.loess_span), n.unwrap_or(ctx.smooth_points))
            }
            Stat::Boxplot { coef } => boxplot(frame, ctx.layer, coef),
            Stat::YDensity { adjust, n, trim, scale, bw } => {
                ydensity(frame, ctx, adjust, n.unwrap_or(ctx.density_points), trim, bw, scale)
            }
        }
    }
}

/// Inputs a stat needs beyond its frame.
#[derive(Debug, Clone, PartialEq)]
pub struct StatContext {
    /// Layer index, for warnings.
    pub layer: usize,
    /// Default bin count.
    pub bins: usize,
    /// Default density grid size.
    pub density_points: usize,
    /// Default smooth grid size.
    pub smooth_points: usize,
    /// Default LOESS span.
    pub loess_span: f64,
    /// LOESS robustness iterations.
    pub loess_iterations: usize,
    /// Confidence level for linear bands.
    pub confidence_level: f64,
    /// Global x extent, so bins line up across panels.
    pub x_domain: Option<(f64, f64)>,
}

impl Default for StatContext {
    fn default() -> Self {
        Self::from_config(&Config::default(), 0)
    }
}

impl StatContext {
    /// Context from configuration defaults.
    #[must_use]
    pub fn from_config(config: &Config, layer: usize) -> Self {
        Self {
            layer,
            bins: config.stats.bins,
            density_points: config.stats.density_points,
            smooth_points: config.stats.smooth_points,
            loess_span: config.stats.loess_span,
            loess_iterations: config.stats.loess_iterations,
            confidence_level: config.stats.confidence_level,
            x_domain: None,
        }
    }

    /// Set the global x extent.
    #[must_use]
    pub fn with_x_domain(mut self, domain: Option<(f64, f64)>) -> Self {
        self.x_domain = domain;
        self
    }
}

/// Result of a stat.
#[derive(Debug, Clone, PartialEq)]
pub struct StatOutput {
    /// Transformed rows.
    pub frame: DataFrame,
    /// Degradations found along the way.
    pub warnings: Vec<Warning>,
}

/// Row indices per group, groups in first-seen order.
pub(crate) fn group_rows(frame: &DataFrame) -> Vec<Vec<usize>> {
    let Some(groups) = frame.get(GROUP) else {
        return if frame.is_empty() { Vec::new() } else { vec![(0..frame.nrow()).collect()] };
    };
    let mut map: IndexMap<LevelKey, Vec<usize>> = IndexMap::new();
    for (row, value) in groups.iter().enumerate() {
        map.entry(value.level_key()).or_default().push(row);
    }
    map.into_values().collect()
}

/// Run `f` per group and carry constant, unconsumed columns into its output.
pub(crate) fn per_group(
    frame: &DataFrame,
    consumed: &[&str],
    mut f: impl FnMut(&DataFrame) -> DataFrame,
) -> DataFrame {
    let outputs: Vec<DataFrame> = group_rows(frame)
        .into_iter()
        .map(|rows| {
            let subset = frame.take_rows(&rows);
            let mut out = f(&subset);
            for (name, value) in constant_columns(&subset, consumed) {
                if !out.has_column(&name) {
                    let n = out.nrow();
                    out.add_column(&name, vec![value; n]);
                }
            }
            out
        })
        .collect();
    DataFrame::concat(&outputs)
}

fn constant_columns(frame: &DataFrame, consumed: &[&str]) -> Vec<(String, DataValue)> {
    frame
        .iter()
        .filter(|(name, _)| !consumed.contains(name))
        .filter_map(|(name, values)| {
            let first = values.first()?;
            values.iter().all(|v| v == first).then(|| (name.to_string(), first.clone()))
        })
        .collect()
}

/// Finite numeric values of a column with the count of rows that were not.
pub(crate) fn finite_values(frame: &DataFrame, column: &str) -> (Vec<f64>, usize) {
    let Some(values) = frame.get(column) else {
        return (Vec::new(), 0);
    };
    let finite: Vec<f64> = values.iter().filter_map(DataValue::as_f64).collect();
    let dropped = values.len() - finite.len();
    (finite, dropped)
}

/// Row weights (1 when no weight channel is bound).
pub(crate) fn weights(frame: &DataFrame) -> Vec<f64> {
    match frame.get("weight") {
        Some(values) => values.iter().map(|v| v.as_f64().unwrap_or(1.0)).collect(),
        None => vec![1.0; frame.nrow()],
    }
}

pub(crate) fn dropped_warning(layer: usize, count: usize, reason: &str) -> Option<Warning> {
    (count > 0).then(|| Warning::DroppedRows { layer, count, reason: reason.to_string() })
}

/// `n` evenly spaced points over `[lo, hi]`.
pub(crate) fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![(lo + hi) / 2.0],
        _ => {
            let step = (hi - lo) / (n - 1) as f64;
            (0..n).map(|i| lo + step * i as f64).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_rows_first_seen() {
        let frame = DataFrame::new().with_column("x", [1.0, 2.0, 3.0]).with_column(GROUP, ["b", "a", "b"]);
        assert_eq!(group_rows(&frame), vec![vec![0, 2], vec![1]]);
    }

    #[test]
    fn test_group_rows_without_group_column() {
        let frame = DataFrame::from_xy(&[1.0, 2.0], &[3.0, 4.0]);
        assert_eq!(group_rows(&frame), vec![vec![0, 1]]);
        assert!(group_rows(&DataFrame::new()).is_empty());
    }

    #[test]
    fn test_per_group_carries_constants() {
        let frame = DataFrame::new()
            .with_column("x", [1.0, 2.0, 3.0])
            .with_column("fill", ["red", "red", "blue"])
            .with_column(GROUP, [0.0, 0.0, 1.0]);
        let out = per_group(&frame, &["x"], |sub| DataFrame::new().with_column("n", [sub.nrow() as f64]));
        assert_eq!(out.get_f64("n"), Some(vec![2.0, 1.0]));
        assert_eq!(out.value(1, "fill"), Some(&DataValue::from("blue")));
        assert!(!out.has_column("x"));
    }

    #[test]
    fn test_identity_passes_through() {
        let frame = DataFrame::from_xy(&[1.0], &[2.0]);
        let out = Stat::identity().compute(&frame, &StatContext::default());
        assert_eq!(out.frame, frame);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_linspace() {
        assert_eq!(linspace(0.0, 1.0, 3), vec![0.0, 0.5, 1.0]);
        assert_eq!(linspace(2.0, 4.0, 1), vec![3.0]);
    }

    #[test]
    fn test_names() {
        assert_eq!(Stat::smooth_linear().name(), "smooth-linear");
        assert_eq!(Stat::binwidth(0.5).name(), "bin");
        assert!(Stat::count().computes_y());
        assert!(!Stat::boxplot().computes_y());
        assert_eq!(Stat::ydensity().name(), "ydensity");
        assert!(!Stat::ydensity().computes_y());
    }
}
