use super::{dropped_warning, finite_values, per_group, StatContext, StatOutput};
use crate::grammar::data::{DataFrame, DataValue};
use crate::scale::{extent, widen_degenerate};
use crate::warning::Warning;

/// Most bins a `binwidth` may produce.
pub const MAX_BINS: usize = 10_000;

/// Slack when dividing a range by a bin width.
const WIDTH_TOLERANCE: f64 = 1e-9;

/// Equal-width binning of x.
///
/// Bins cover the global x domain when the context carries one, so panels
/// share bin edges. Intervals are closed on the left except the last, which
/// is closed on both sides. Empty bins are emitted with count 0. A
/// `binwidth` is kept exactly: edges are `lo + k * binwidth` and the last bin
/// may reach past the domain.
#[must_use]
pub fn bin(frame: &DataFrame, ctx: &StatContext, bins: Option<usize>, binwidth: Option<f64>) -> StatOutput {
    let mut dropped = 0;
    let mut outside = 0;
    let mut clamped = None;
    let out = per_group(frame, &["x", "y", "weight", "xmin", "xmax"], |group| {
        let xs = group.get("x").unwrap_or_default();
        let w = super::weights(group);
        let (finite, skipped) = finite_values(group, "x");
        dropped += skipped;

        let Some(data_extent) = ctx.x_domain.or_else(|| extent(&finite)) else {
            return DataFrame::new();
        };
        let (lo, hi) = widen_degenerate(data_extent);
        let (n_bins, width) = match binwidth.filter(|bw| *bw > 0.0 && bw.is_finite()) {
            Some(bw) => {
                let wanted = ((hi - lo) / bw - WIDTH_TOLERANCE).ceil().max(1.0);
                if wanted > MAX_BINS as f64 {
                    let used = (hi - lo) / MAX_BINS as f64;
                    clamped = Some((bw, used));
                    (MAX_BINS, used)
                } else {
                    (wanted as usize, bw)
                }
            }
            None => {
                let n = bins.unwrap_or(ctx.bins).clamp(1, MAX_BINS);
                (n, (hi - lo) / n as f64)
            }
        };

        let mut counts = vec![0.0; n_bins];
        for (value, weight) in xs.iter().zip(&w) {
            let Some(v) = value.as_f64() else { continue };
            if v < lo || v > hi {
                outside += 1;
                continue;
            }
            let idx = (((v - lo) / width).floor() as usize).min(n_bins - 1);
            counts[idx] += weight;
        }

        let total: f64 = counts.iter().sum();
        let max = counts.iter().copied().fold(0.0, f64::max);
        let xmin: Vec<f64> = (0..n_bins).map(|i| lo + width * i as f64).collect();
        let xmax: Vec<f64> = (0..n_bins).map(|i| lo + width * (i + 1) as f64).collect();
        let center: Vec<f64> = xmin.iter().zip(&xmax).map(|(a, b)| (a + b) / 2.0).collect();
        let density: Vec<f64> =
            counts.iter().map(|c| if total > 0.0 { c / (total * width) } else { 0.0 }).collect();
        let ncount: Vec<f64> = counts.iter().map(|c| if max > 0.0 { c / max } else { 0.0 }).collect();

        DataFrame::new()
            .with_column("x", center)
            .with_column("xmin", xmin)
            .with_column("xmax", xmax)
            .with_column("count", counts.clone())
            .with_column("density", density)
            .with_column("ncount", ncount)
            .with_column("width", vec![DataValue::Number(width); n_bins])
            .with_column("y", counts)
    });

    let mut warnings: Vec<Warning> = dropped_warning(ctx.layer, dropped, "non-numeric x in bin").into_iter().collect();
    warnings.extend(dropped_warning(ctx.layer, outside, "x outside the bin range"));
    if let Some((requested, used)) = clamped {
        warnings.push(Warning::ParameterClamped { layer: ctx.layer, parameter: "binwidth".to_string(), requested, used });
    }
    StatOutput { frame: out, warnings }
}
