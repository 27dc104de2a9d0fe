//! Linear and LOESS smoothers.

use super::{dropped_warning, linspace, per_group, StatContext, StatOutput};
use crate::grammar::data::{DataFrame, DataValue};
use crate::scale::extent;

/// Paired finite (x, y) values of a group, with the number of rows skipped.
fn xy_pairs(frame: &DataFrame) -> (Vec<f64>, Vec<f64>, usize) {
    let (Some(xs), Some(ys)) = (frame.get("x"), frame.get("y")) else {
        return (Vec::new(), Vec::new(), frame.nrow());
    };
    let mut x = Vec::with_capacity(xs.len());
    let mut y = Vec::with_capacity(ys.len());
    for (a, b) in xs.iter().zip(ys) {
        if let (Some(a), Some(b)) = (a.as_f64(), b.as_f64()) {
            x.push(a);
            y.push(b);
        }
    }
    let skipped = xs.len() - x.len();
    (x, y, skipped)
}

/// Ordinary least-squares fit `y = intercept + slope · x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    /// Intercept.
    pub intercept: f64,
    /// Slope.
    pub slope: f64,
    n: usize,
    mean_x: f64,
    sxx: f64,
    sigma: f64,
}

impl LinearFit {
    /// Fit; `None` with fewer than two distinct x values.
    #[must_use]
    pub fn fit(x: &[f64], y: &[f64]) -> Option<Self> {
        let n = x.len().min(y.len());
        if n < 2 {
            return None;
        }
        let nf = n as f64;
        let mean_x = x[..n].iter().sum::<f64>() / nf;
        let mean_y = y[..n].iter().sum::<f64>() / nf;
        let sxx: f64 = x[..n].iter().map(|v| (v - mean_x).powi(2)).sum();
        if sxx <= f64::EPSILON {
            return None;
        }
        let sxy: f64 = x[..n].iter().zip(&y[..n]).map(|(a, b)| (a - mean_x) * (b - mean_y)).sum();
        let slope = sxy / sxx;
        let intercept = mean_y - slope * mean_x;
        let sse: f64 = x[..n].iter().zip(&y[..n]).map(|(a, b)| (b - intercept - slope * a).powi(2)).sum();
        let sigma = if n > 2 { (sse / (nf - 2.0)).sqrt() } else { 0.0 };
        Some(Self { intercept, slope, n, mean_x, sxx, sigma })
    }

    /// Fitted value.
    #[must_use]
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }

    /// Standard error of the fitted mean at `x`.
    #[must_use]
    pub fn standard_error(&self, x: f64) -> f64 {
        self.sigma * (1.0 / self.n as f64 + (x - self.mean_x).powi(2) / self.sxx).sqrt()
    }

    /// Residual degrees of freedom.
    #[must_use]
    pub fn df(&self) -> usize {
        self.n.saturating_sub(2)
    }
}

/// Standard normal quantile (Acklam's rational approximation).
#[must_use]
pub fn normal_quantile(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_69e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838,
        -2.549_732_539_343_734,
        4.374_664_141_464_968,
        2.938_163_982_698_783,
    ];
    const D: [f64; 4] =
        [7.784_695_709_041_462e-3, 3.224_671_290_700_398e-1, 2.445_134_137_142_996, 3.754_408_661_907_416];
    const P_LOW: f64 = 0.02425;

    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p > 1.0 - P_LOW {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    } else {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    }
}

/// Student-t quantile.
///
/// Exact for 1 and 2 degrees of freedom, Cornish-Fisher expansion otherwise.
#[must_use]
pub fn t_quantile(p: f64, df: usize) -> f64 {
    match df {
        0 => f64::NAN,
        1 => (std::f64::consts::PI * (p - 0.5)).tan(),
        2 => (2.0 * p - 1.0) / (2.0 * p * (1.0 - p)).sqrt(),
        _ => {
            let z = normal_quantile(p);
            let v = df as f64;
            let z2 = z * z;
            let z3 = z2 * z;
            let z5 = z3 * z2;
            let z7 = z5 * z2;
            let z9 = z7 * z2;
            let g1 = (z3 + z) / 4.0;
            let g2 = (5.0 * z5 + 16.0 * z3 + 3.0 * z) / 96.0;
            let g3 = (3.0 * z7 + 19.0 * z5 + 17.0 * z3 - 15.0 * z) / 384.0;
            let g4 = (79.0 * z9 + 776.0 * z7 + 1482.0 * z5 - 1920.0 * z3 - 945.0 * z) / 92160.0;
            z + g1 / v + g2 / v.powi(2) + g3 / v.powi(3) + g4 / v.powi(4)
        }
    }
}

/// Linear smoother: fitted line at `n_points` over the group's x range, plus
/// `ymin`/`ymax`/`se` when `se` is set and the fit has residual degrees of freedom.
#[must_use]
pub fn smooth_linear(frame: &DataFrame, ctx: &StatContext, se: bool, n_points: usize) -> StatOutput {
    let mut dropped = 0;
    let out = per_group(frame, &["x", "y", "ymin", "ymax"], |group| {
        let (x, y, skipped) = xy_pairs(group);
        dropped += skipped;
        let (Some(fit), Some((lo, hi))) = (LinearFit::fit(&x, &y), extent(&x)) else {
            return DataFrame::new();
        };
        let grid = linspace(lo, hi, n_points);
        let fitted: Vec<f64> = grid.iter().map(|&g| fit.predict(g)).collect();
        let mut out = DataFrame::new().with_column("x", grid.clone()).with_column("y", fitted.clone());

        if se && fit.df() > 0 {
            let t = t_quantile((1.0 + ctx.confidence_level) / 2.0, fit.df());
            let errors: Vec<f64> = grid.iter().map(|&g| fit.standard_error(g)).collect();
            let ymin: Vec<f64> = fitted.iter().zip(&errors).map(|(f, e)| f - t * e).collect();
            let ymax: Vec<f64> = fitted.iter().zip(&errors).map(|(f, e)| f + t * e).collect();
            out = out.with_column("ymin", ymin).with_column("ymax", ymax).with_column("se", errors);
        }
        out
    });
    StatOutput { frame: out, warnings: dropped_warning(ctx.layer, dropped, "non-numeric x/y in smooth").into_iter().collect() }
}

/// Restartable LOESS fit.
///
/// Holds the data sorted by x and the current robustness weights. Each
/// [`step`](Self::step) performs one bisquare reweighting pass; evaluation
/// uses whatever weights are current, so a fit can be advanced one
/// iteration at a time and inspected in between.
#[derive(Debug, Clone, PartialEq)]
pub struct LoessFit {
    x: Vec<f64>,
    y: Vec<f64>,
    span: f64,
    robustness: Vec<f64>,
    iterations: usize,
}

impl LoessFit {
    /// Prepare a fit. Non-finite pairs are skipped.
    #[must_use]
    pub fn new(x: &[f64], y: &[f64], span: f64) -> Self {
        let mut pairs: Vec<(f64, f64)> =
            x.iter().zip(y).filter(|(a, b)| a.is_finite() && b.is_finite()).map(|(a, b)| (*a, *b)).collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (x, y): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
        let robustness = vec![1.0; x.len()];
        Self { x, y, span: span.clamp(f64::EPSILON, 1.0), robustness, iterations: 0 }
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// True when there is no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Robustness iterations performed so far.
    #[must_use]
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Current robustness weights, in x order.
    #[must_use]
    pub fn robustness_weights(&self) -> &[f64] {
        &self.robustness
    }

    /// Local weighted linear regression at `x0`.
    #[must_use]
    pub fn evaluate(&self, x0: f64) -> Option<f64> {
        let n = self.x.len();
        if n == 0 {
            return None;
        }
        let k = ((self.span * n as f64).ceil() as usize).clamp(2.min(n), n);
        let distances: Vec<f64> = self.x.iter().map(|xi| (xi - x0).abs()).collect();
        let mut sorted = distances.clone();
        sorted.sort_by(f64::total_cmp);
        let h = sorted[k - 1].max(f64::EPSILON) * (1.0 + 1e-9);

        let (mut sw, mut swx, mut swy, mut swxx, mut swxy) = (0.0, 0.0, 0.0, 0.0, 0.0);
        for (i, d) in distances.iter().enumerate() {
            let u = *d / h;
            if u >= 1.0 {
                continue;
            }
            let w = (1.0 - u.powi(3)).powi(3) * self.robustness[i];
            let (xi, yi) = (self.x[i], self.y[i]);
            sw += w;
            swx += w * xi;
            swy += w * yi;
            swxx += w * xi * xi;
            swxy += w * xi * yi;
        }
        if sw <= 0.0 {
            return None;
        }
        let denom = sw * swxx - swx * swx;
        if denom.abs() <= f64::EPSILON * sw * sw {
            return Some(swy / sw);
        }
        let slope = (sw * swxy - swx * swy) / denom;
        let intercept = (swy - slope * swx) / sw;
        Some(intercept + slope * x0)
    }

    /// Fitted values at the data points, in x order.
    #[must_use]
    pub fn fitted(&self) -> Vec<Option<f64>> {
        self.x.iter().map(|&x| self.evaluate(x)).collect()
    }

    /// One bisquare robustness iteration.
    pub fn step(&mut self) {
        let residuals: Vec<f64> =
            self.fitted().iter().zip(&self.y).map(|(f, y)| f.map_or(0.0, |f| (y - f).abs())).collect();
        let mut sorted = residuals.clone();
        sorted.sort_by(f64::total_cmp);
        let median = if sorted.is_empty() {
            0.0
        } else if sorted.len() % 2 == 1 {
            sorted[sorted.len() / 2]
        } else {
            (sorted[sorted.len() / 2 - 1] + sorted[sorted.len() / 2]) / 2.0
        };
        let scale = 6.0 * median;
        if scale > f64::EPSILON {
            self.robustness = residuals
                .iter()
                .map(|r| {
                    let u = r / scale;
                    if u < 1.0 {
                        (1.0 - u * u).powi(2)
                    } else {
                        0.0
                    }
                })
                .collect();
        }
        self.iterations += 1;
    }

    /// Run `iterations` robustness steps.
    pub fn run(&mut self, iterations: usize) {
        for _ in 0..iterations {
            self.step();
        }
    }
}

/// LOESS smoother at `n_points` over each group's x range.
#[must_use]
pub fn smooth_loess(frame: &DataFrame, ctx: &StatContext, span: f64, n_points: usize) -> StatOutput {
    let mut dropped = 0;
    let out = per_group(frame, &["x", "y", "ymin", "ymax"], |group| {
        let (x, y, skipped) = xy_pairs(group);
        dropped += skipped;
        let Some((lo, hi)) = extent(&x) else {
            return DataFrame::new();
        };
        let mut fit = LoessFit::new(&x, &y, span);
        fit.run(ctx.loess_iterations);

        let grid = linspace(lo, hi, n_points);
        let fitted: Vec<DataValue> = grid.iter().map(|&g| fit.evaluate(g).into()).collect();
        DataFrame::new().with_column("x", grid).with_column("y", fitted)
    });
    StatOutput { frame: out, warnings: dropped_warning(ctx.layer, dropped, "non-numeric x/y in smooth").into_iter().collect() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_normal_quantile() {
        assert_relative_eq!(normal_quantile(0.5), 0.0, epsilon = 1e-9);
        assert_relative_eq!(normal_quantile(0.975), 1.959_964, epsilon = 1e-5);
        assert_relative_eq!(normal_quantile(0.01), -2.326_348, epsilon = 1e-5);
    }

    #[test]
    fn test_t_quantile() {
        assert_relative_eq!(t_quantile(0.975, 1), 12.706_2, epsilon = 1e-3);
        assert_relative_eq!(t_quantile(0.975, 2), 4.302_65, epsilon = 1e-4);
        assert_relative_eq!(t_quantile(0.975, 10), 2.228_14, epsilon = 1e-3);
        assert_relative_eq!(t_quantile(0.975, 100), 1.983_97, epsilon = 1e-4);
    }

    #[test]
    fn test_linear_fit_exact_line() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [1.0, 3.0, 5.0, 7.0];
        let fit = LinearFit::fit(&x, &y).expect("fit");
        assert_relative_eq!(fit.slope, 2.0, epsilon = 1e-12);
        assert_relative_eq!(fit.intercept, 1.0, epsilon = 1e-12);
        assert_relative_eq!(fit.standard_error(1.5), 0.0, epsilon = 1e-12);
        assert!(LinearFit::fit(&[1.0, 1.0], &[2.0, 3.0]).is_none());
    }

    #[test]
    fn test_smooth_linear_band_contains_fit() {
        let frame = DataFrame::new()
            .with_column("x", [1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
            .with_column("y", [1.2, 1.9, 3.2, 3.8, 5.1, 6.3]);
        let out = smooth_linear(&frame, &StatContext::default(), true, 10).frame;
        assert_eq!(out.nrow(), 10);
        let y = out.get_f64("y").expect("y");
        let ymin = out.get_f64("ymin").expect("ymin");
        let ymax = out.get_f64("ymax").expect("ymax");
        for i in 0..10 {
            assert!(ymin[i] < y[i] && y[i] < ymax[i]);
        }
    }

    #[test]
    fn test_smooth_linear_without_se() {
        let frame = DataFrame::from_xy(&[1.0, 2.0, 3.0], &[2.0, 4.0, 7.0]);
        let out = smooth_linear(&frame, &StatContext::default(), false, 5).frame;
        assert!(!out.has_column("ymin"));
    }

    #[test]
    fn test_loess_reproduces_line() {
        let x: Vec<f64> = (0..20).map(f64::from).collect();
        let y: Vec<f64> = x.iter().map(|v| 3.0 - 0.5 * v).collect();
        let fit = LoessFit::new(&x, &y, 0.5);
        assert_relative_eq!(fit.evaluate(7.3).expect("value"), 3.0 - 0.5 * 7.3, epsilon = 1e-9);
    }

    #[test]
    fn test_loess_restartable() {
        let x: Vec<f64> = (0..30).map(f64::from).collect();
        let mut y: Vec<f64> = x.iter().map(|v| (v / 5.0).sin()).collect();
        y[10] = 25.0;

        let mut stepwise = LoessFit::new(&x, &y, 0.4);
        stepwise.step();
        stepwise.step();
        let mut batch = LoessFit::new(&x, &y, 0.4);
        batch.run(2);
        assert_eq!(stepwise, batch);
        assert_eq!(batch.iterations(), 2);
        // The outlier is downweighted after a robustness pass
        assert!(batch.robustness_weights()[10] < 0.5);
    }

    #[test]
    fn test_smooth_loess_grid() {
        let frame = DataFrame::from_xy(&[0.0, 1.0, 2.0, 3.0, 4.0], &[0.0, 1.0, 4.0, 9.0, 16.0]);
        let ctx = StatContext::default();
        let out = smooth_loess(&frame, &ctx, 0.75, 9);
        assert_eq!(out.frame.nrow(), 9);
        assert_eq!(out, smooth_loess(&frame, &ctx, 0.75, 9));
    }
}
