use std::f64::consts::PI;

use indexmap::IndexMap;

use super::{dropped_warning, linspace, per_group, weights, StatContext, StatOutput};
use crate::grammar::data::{DataFrame, DataValue, LevelKey};
use crate::scale::extent;

/// How violin widths compare across violins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViolinScale {
    /// Every violin has the same area.
    #[default]
    Area,
    /// Areas are proportional to the number of observations.
    Count,
    /// Every violin has the same maximum width.
    Width,
}

impl ViolinScale {
    /// Short name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ViolinScale::Area => "area",
            ViolinScale::Count => "count",
            ViolinScale::Width => "width",
        }
    }
}

/// Silverman's rule of thumb, `1.06 · σ · n^(-1/5)`, floored at 1% of the data range.
///
/// Returns `None` for empty input.
#[must_use]
pub fn silverman_bandwidth(data: &[f64]) -> Option<f64> {
    let (min, max) = extent(data)?;
    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    let variance = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    let h = 1.06 * variance.sqrt() * n.powf(-0.2);
    let h = h.max((max - min) * 0.01);
    Some(if h > 0.0 { h } else { 1.0 })
}

/// Finite values of `column` paired with their weights, and the count of rows skipped.
///
/// Negative weights count as zero.
fn weighted_values(group: &DataFrame, column: &str) -> (Vec<f64>, Vec<f64>, usize) {
    let Some(values) = group.get(column) else {
        return (Vec::new(), Vec::new(), 0);
    };
    let mut xs = Vec::with_capacity(values.len());
    let mut ws = Vec::with_capacity(values.len());
    for (value, w) in values.iter().zip(weights(group)) {
        if let Some(x) = value.as_f64() {
            xs.push(x);
            ws.push(w.max(0.0));
        }
    }
    let skipped = values.len() - xs.len();
    (xs, ws, skipped)
}

/// Weighted Gaussian kernel sum on `grid`, normalised to unit mass.
fn kernel_density(data: &[f64], weights: &[f64], h: f64, grid: &[f64]) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return vec![0.0; grid.len()];
    }
    let norm = (2.0 * PI).sqrt() * h * total;
    grid.iter()
        .map(|&x| {
            data.iter()
                .zip(weights)
                .map(|(&xi, &w)| {
                    let u = (x - xi) / h;
                    w * (-0.5 * u * u).exp()
                })
                .sum::<f64>()
                / norm
        })
        .collect()
}

fn peak(values: &[f64]) -> f64 {
    values.iter().copied().fold(0.0, f64::max)
}

/// Gaussian kernel density estimate of x on a fixed grid over `[min, max]`.
///
/// Rows are weighted by the `weight` channel when it is bound. Emits `x`,
/// `density`, `scaled` (density / max), `count` (density · total weight)
/// and `y = density`.
#[must_use]
pub fn density(frame: &DataFrame, ctx: &StatContext, adjust: f64, n_points: usize) -> StatOutput {
    let mut dropped = 0;
    let out = per_group(frame, &["x", "y", "weight"], |group| {
        let (data, ws, skipped) = weighted_values(group, "x");
        dropped += skipped;
        let (Some(h), Some((min, max))) = (silverman_bandwidth(&data), extent(&data)) else {
            return DataFrame::new();
        };
        let h = h * adjust;
        let (lo, hi) = if max > min { (min, max) } else { (min - 3.0 * h, max + 3.0 * h) };

        let grid = linspace(lo, hi, n_points);
        let density = kernel_density(&data, &ws, h, &grid);
        let top = peak(&density);
        let scaled: Vec<f64> = density.iter().map(|d| if top > 0.0 { d / top } else { 0.0 }).collect();
        let total: f64 = ws.iter().sum();
        let count: Vec<f64> = density.iter().map(|d| d * total).collect();

        DataFrame::new()
            .with_column("x", grid)
            .with_column("density", density.clone())
            .with_column("scaled", scaled)
            .with_column("count", count)
            .with_column("y", density)
    });
    StatOutput { frame: out, warnings: dropped_warning(ctx.layer, dropped, "non-numeric x in density").into_iter().collect() }
}

/// Kernel density of y per distinct x, for violins.
///
/// `bw` overrides the Silverman bandwidth (before `adjust`). With `trim`
/// the grid spans the data; otherwise it extends three bandwidths past
/// it. Emits `x`, `y` (grid), `density`, `scaled`, `count`, `n` and
/// `violinwidth`, the half-width multiplier chosen by `scale`.
#[must_use]
pub fn ydensity(
    frame: &DataFrame,
    ctx: &StatContext,
    adjust: f64,
    n_points: usize,
    trim: bool,
    bw: Option<f64>,
    scale: ViolinScale,
) -> StatOutput {
    let mut dropped = 0;
    let mut out = per_group(frame, &["x", "y", "weight"], |group| {
        let ys = group.get("y").unwrap_or_default();
        let ws = weights(group);
        let mut by_x: IndexMap<LevelKey, (Vec<f64>, Vec<f64>)> = IndexMap::new();
        for (row, y) in ys.iter().enumerate() {
            let key = group.value(row, "x").map_or(LevelKey::Number(0.0.into()), DataValue::level_key);
            match y.as_f64() {
                Some(v) => {
                    let entry = by_x.entry(key).or_default();
                    entry.0.push(v);
                    entry.1.push(ws[row].max(0.0));
                }
                None => dropped += 1,
            }
        }

        let parts: Vec<DataFrame> = by_x
            .iter()
            .filter_map(|(key, (data, ws))| {
                let (min, max) = extent(data)?;
                let h = bw.filter(|b| *b > 0.0).or_else(|| silverman_bandwidth(data))? * adjust;
                let (lo, hi) = if trim && max > min { (min, max) } else { (min - 3.0 * h, max + 3.0 * h) };
                let grid = linspace(lo, hi, n_points);
                let density = kernel_density(data, ws, h, &grid);
                let top = peak(&density);
                let scaled: Vec<f64> = density.iter().map(|d| if top > 0.0 { d / top } else { 0.0 }).collect();
                let total: f64 = ws.iter().sum();
                let count: Vec<f64> = density.iter().map(|d| d * total).collect();
                let rows = grid.len();
                Some(
                    DataFrame::new()
                        .with_column("x", vec![key.to_value(); rows])
                        .with_column("y", grid)
                        .with_column("density", density)
                        .with_column("scaled", scaled)
                        .with_column("count", count)
                        .with_column("n", vec![data.len() as f64; rows]),
                )
            })
            .collect();
        DataFrame::concat(&parts)
    });

    if !out.is_empty() {
        let density = out.get_f64("density").unwrap_or_default();
        let widths: Vec<f64> = match scale {
            ViolinScale::Area => {
                let top = peak(&density);
                density.iter().map(|d| if top > 0.0 { d / top } else { 0.0 }).collect()
            }
            ViolinScale::Count => {
                let top = peak(&density);
                let ns = out.get_f64("n").unwrap_or_default();
                let most = peak(&ns);
                density
                    .iter()
                    .zip(&ns)
                    .map(|(d, n)| if top > 0.0 && most > 0.0 { d / top * n / most } else { 0.0 })
                    .collect()
            }
            ViolinScale::Width => out.get_f64("scaled").unwrap_or_default(),
        };
        out.add_column_f64("violinwidth", &widths);
    }
    StatOutput { frame: out, warnings: dropped_warning(ctx.layer, dropped, "non-numeric y in violin").into_iter().collect() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_silverman_bandwidth() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        let sd = 2.0_f64.sqrt();
        let expected = 1.06 * sd * 5.0_f64.powf(-0.2);
        assert_relative_eq!(silverman_bandwidth(&data).expect("non-empty"), expected, epsilon = 1e-12);
        assert!(silverman_bandwidth(&[]).is_none());
    }

    #[test]
    fn test_density_grid_and_mass() {
        let frame = DataFrame::new().with_column("x", [0.0, 0.5, 1.0, 1.5, 2.0, 5.0]);
        let out = density(&frame, &StatContext::default(), 1.0, 512).frame;
        let xs = out.get_f64("x").expect("x");
        assert_eq!(xs.len(), 512);
        assert_relative_eq!(xs[0], 0.0);
        assert_relative_eq!(xs[511], 5.0);
        let scaled = out.get_f64("scaled").expect("scaled");
        assert_relative_eq!(scaled.iter().copied().fold(0.0, f64::max), 1.0);
    }

    #[test]
    fn test_density_deterministic() {
        let frame = DataFrame::new().with_column("x", [3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0]);
        let ctx = StatContext::default();
        assert_eq!(density(&frame, &ctx, 1.0, 64), density(&frame, &ctx, 1.0, 64));
    }

    #[test]
    fn test_density_single_value_spreads() {
        let frame = DataFrame::new().with_column("x", [2.0]);
        let out = density(&frame, &StatContext::default(), 1.0, 11).frame;
        let xs = out.get_f64("x").expect("x");
        assert!(xs[0] < 2.0 && xs[10] > 2.0);
        assert_relative_eq!(xs[5], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_density_weights_shift_mass() {
        let frame = DataFrame::new().with_column("x", [0.0, 10.0]).with_column("weight", [1.0, 3.0]);
        let out = density(&frame, &StatContext::default(), 1.0, 11).frame;
        let d = out.get_f64("density").expect("density");
        assert!(d[10] > 2.0 * d[0]);
        let count = out.get_f64("count").expect("count");
        assert_relative_eq!(count[0], d[0] * 4.0, epsilon = 1e-12);

        let unweighted = density(&frame.clone().with_column("weight", [1.0, 1.0]), &StatContext::default(), 1.0, 11).frame;
        let u = unweighted.get_f64("density").expect("density");
        assert_relative_eq!(u[0], u[10], epsilon = 1e-12);
    }

    fn violins() -> DataFrame {
        DataFrame::new()
            .with_column("x", ["a", "a", "a", "a", "b", "b"])
            .with_column("y", [1.0, 2.0, 2.5, 4.0, 10.0, 12.0])
    }

    #[test]
    fn test_ydensity_per_x_level() {
        let out = ydensity(&violins(), &StatContext::default(), 1.0, 16, true, None, ViolinScale::Area).frame;
        assert_eq!(out.nrow(), 32);
        assert_eq!(out.value(0, "x"), Some(&DataValue::from("a")));
        assert_eq!(out.value(16, "x"), Some(&DataValue::from("b")));
        let ys = out.get_f64("y").expect("y");
        assert_relative_eq!(ys[0], 1.0);
        assert_relative_eq!(ys[15], 4.0, epsilon = 1e-12);
        assert_relative_eq!(ys[16], 10.0);
        assert_relative_eq!(ys[31], 12.0, epsilon = 1e-12);
        assert_eq!(out.get_f64("n").expect("n")[0], 4.0);
    }

    #[test]
    fn test_ydensity_untrimmed_extends_three_bandwidths() {
        let frame = DataFrame::new().with_column("y", [0.0, 2.0]);
        let out = ydensity(&frame, &StatContext::default(), 1.0, 5, false, Some(0.5), ViolinScale::Area).frame;
        let ys = out.get_f64("y").expect("y");
        assert_relative_eq!(ys[0], -1.5);
        assert_relative_eq!(ys[4], 3.5, epsilon = 1e-12);
        assert_eq!(out.get_f64("x"), Some(vec![0.0; 5]));
    }

    #[test]
    fn test_violin_width_scales() {
        let ctx = StatContext::default();
        let width_of = |scale| {
            let out = ydensity(&violins(), &ctx, 1.0, 32, true, None, scale).frame;
            let widths = out.get_f64("violinwidth").expect("violinwidth");
            (peak(&widths[..32]), peak(&widths[32..]))
        };

        let (a, b) = width_of(ViolinScale::Width);
        assert_relative_eq!(a, 1.0);
        assert_relative_eq!(b, 1.0);

        let (a, b) = width_of(ViolinScale::Area);
        assert_relative_eq!(a.max(b), 1.0);
        assert!(a < 1.0 || b < 1.0);

        let (area_a, area_b) = width_of(ViolinScale::Area);
        let (count_a, count_b) = width_of(ViolinScale::Count);
        assert_relative_eq!(count_a / count_b, (area_a * 4.0) / (area_b * 2.0), epsilon = 1e-9);
    }

    #[test]
    fn test_ydensity_drops_non_numeric_y() {
        let frame = DataFrame::new().with_column("y", [DataValue::from(1.0), DataValue::from("x"), DataValue::from(3.0)]);
        let out = ydensity(&frame, &StatContext { layer: 2, ..StatContext::default() }, 1.0, 8, true, None, ViolinScale::Area);
        assert_eq!(out.frame.nrow(), 8);
        assert_eq!(
            out.warnings,
            vec![crate::warning::Warning::DroppedRows { layer: 2, count: 1, reason: "non-numeric y in violin".to_string() }]
        );
    }
}
