//! Position adjustments.
//!
//! Applied to a layer's frame after its stat and after discrete x values have
//! been mapped to numeric positions. Rows are grouped by x and sub-grouped by
//! the fill (else color, else group) column; sub-group order follows the
//! globally trained level order, so stacking is identical in every panel.

use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::grammar::data::{DataFrame, DataValue, LevelKey};
use crate::grammar::pipeline::DEFAULT_BAR_WIDTH;
use crate::grammar::stat::GROUP;

/// Position adjustment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Position {
    /// No adjustment.
    Identity,
    /// Stack y values per x.
    Stack {
        /// Put the first sub-group on top instead of the bottom.
        reverse: bool,
    },
    /// Stack and normalize each x to a total of 1.
    Fill {
        /// Put the first sub-group on top instead of the bottom.
        reverse: bool,
    },
    /// Place sub-groups side by side.
    Dodge {
        /// Total width shared by the sub-groups at one x. The layer's
        /// `width` param when `None`.
        width: Option<f64>,
    },
    /// Add bounded uniform noise.
    Jitter {
        /// Maximum horizontal displacement.
        width: f64,
        /// Maximum vertical displacement.
        height: f64,
        /// RNG seed (`Config::jitter_seed` when `None`).
        seed: Option<u64>,
    },
    /// Fixed offset.
    Nudge {
        /// Horizontal offset.
        x: f64,
        /// Vertical offset.
        y: f64,
    },
}

/// Inputs shared by all position adjustments of a layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionContext {
    /// Global level order of the sub-group channel.
    pub subgroup_levels: Vec<LevelKey>,
    /// Seed for jitter without its own.
    pub jitter_seed: u64,
    /// The layer's `width` style param, if set.
    pub layer_width: Option<f64>,
}

impl Position {
    /// Default stacking.
    pub const STACK: Position = Position::Stack { reverse: false };
    /// Default fill.
    pub const FILL: Position = Position::Fill { reverse: false };
    /// Default dodge.
    pub const DODGE: Position = Position::Dodge { width: None };

    /// No adjustment.
    #[must_use]
    pub fn identity() -> Self {
        Position::Identity
    }

    /// Stack.
    #[must_use]
    pub fn stack() -> Self {
        Self::STACK
    }

    /// Stack normalized to 1.
    #[must_use]
    pub fn fill() -> Self {
        Self::FILL
    }

    /// Dodge with the given total width.
    #[must_use]
    pub fn dodge(width: f64) -> Self {
        Position::Dodge { width: Some(width) }
    }

    /// Jitter seeded from the configuration.
    #[must_use]
    pub fn jitter(width: f64, height: f64) -> Self {
        Position::Jitter { width, height, seed: None }
    }

    /// Jitter with an explicit seed.
    #[must_use]
    pub fn jitter_seeded(width: f64, height: f64, seed: u64) -> Self {
        Position::Jitter { width, height, seed: Some(seed) }
    }

    /// Fixed offset.
    #[must_use]
    pub fn nudge(x: f64, y: f64) -> Self {
        Position::Nudge { x, y }
    }

    /// Short name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Position::Identity => "identity",
            Position::Stack { .. } => "stack",
            Position::Fill { .. } => "fill",
            Position::Dodge { .. } => "dodge",
            Position::Jitter { .. } => "jitter",
            Position::Nudge { .. } => "nudge",
        }
    }

    /// Adjust `frame` in place.
    pub fn apply(&self, frame: &mut DataFrame, ctx: &PositionContext) {
        if frame.is_empty() {
            return;
        }
        tracing::debug!(position = self.name(), rows = frame.nrow(), "applying position");
        match *self {
            Position::Identity => {}
            Position::Stack { reverse } => stack(frame, ctx, reverse, false),
            Position::Fill { reverse } => stack(frame, ctx, reverse, true),
            Position::Dodge { width } => {
                dodge(frame, ctx, width.or(ctx.layer_width).unwrap_or(DEFAULT_BAR_WIDTH));
            }
            Position::Jitter { width, height, seed } => {
                jitter(frame, width, height, seed.unwrap_or(ctx.jitter_seed));
            }
            Position::Nudge { x, y } => {
                shift(frame, "x", |_, v| v + x);
                shift(frame, "y", |_, v| v + y);
            }
        }
    }
}

/// Offsets of `n` dodged sub-groups sharing `width`: `(i − (n−1)/2) · width/n`.
#[must_use]
pub fn dodge_offsets(n: usize, width: f64) -> Vec<f64> {
    let nf = n as f64;
    (0..n).map(|i| (i as f64 - (nf - 1.0) / 2.0) * width / nf).collect()
}

fn subgroup_column(frame: &DataFrame) -> Option<&'static str> {
    ["fill", "color", GROUP].into_iter().find(|c| frame.has_column(c))
}

/// Sub-group rank of each row: global level order first, then first-seen.
fn subgroup_ranks(frame: &DataFrame, ctx: &PositionContext) -> Vec<usize> {
    let Some(values) = subgroup_column(frame).and_then(|c| frame.get(c)) else {
        return vec![0; frame.nrow()];
    };
    let mut extra: IndexMap<LevelKey, usize> = IndexMap::new();
    values
        .iter()
        .map(|v| {
            let key = v.level_key();
            match ctx.subgroup_levels.iter().position(|l| *l == key) {
                Some(rank) => rank,
                None => {
                    let next = extra.len();
                    ctx.subgroup_levels.len() + *extra.entry(key).or_insert(next)
                }
            }
        })
        .collect()
}

/// Rows per distinct x, in first-seen order.
fn x_groups(frame: &DataFrame) -> Vec<Vec<usize>> {
    let mut groups: IndexMap<LevelKey, Vec<usize>> = IndexMap::new();
    if let Some(xs) = frame.get("x") {
        for (row, x) in xs.iter().enumerate() {
            groups.entry(x.level_key()).or_default().push(row);
        }
    }
    groups.into_values().collect()
}

fn stack(frame: &mut DataFrame, ctx: &PositionContext, reverse: bool, normalize: bool) {
    let Some(ys) = frame.numeric("y") else { return };
    let ranks = subgroup_ranks(frame, ctx);
    let n = frame.nrow();
    let mut y_out: Vec<DataValue> = frame.get("y").map(<[DataValue]>::to_vec).unwrap_or_default();
    let mut ymin: Vec<DataValue> = vec![DataValue::Null; n];
    let mut ymax: Vec<DataValue> = vec![DataValue::Null; n];

    for mut rows in x_groups(frame) {
        rows.sort_by_key(|&r| ranks[r]);
        if reverse {
            rows.reverse();
        }
        let (mut pos, mut neg) = (0.0, 0.0);
        let mut bands = Vec::with_capacity(rows.len());
        for &r in &rows {
            let Some(v) = ys[r] else { continue };
            if v >= 0.0 {
                bands.push((r, pos, pos + v, true));
                pos += v;
            } else {
                bands.push((r, neg + v, neg, false));
                neg += v;
            }
        }
        for (r, lo, hi, positive) in bands {
            let scale = match (normalize, positive) {
                (true, true) if pos > 0.0 => pos,
                (true, false) if neg < 0.0 => -neg,
                _ => 1.0,
            };
            let (lo, hi) = (lo / scale, hi / scale);
            ymin[r] = lo.into();
            ymax[r] = hi.into();
            y_out[r] = if positive { hi.into() } else { lo.into() };
        }
    }

    frame.add_column("ymin", ymin);
    frame.add_column("ymax", ymax);
    frame.add_column("y", y_out);
}

fn dodge(frame: &mut DataFrame, ctx: &PositionContext, width: f64) {
    let Some(xs) = frame.numeric("x") else { return };
    let ranks = subgroup_ranks(frame, ctx);
    let mut present: Vec<usize> = ranks.clone();
    present.sort_unstable();
    present.dedup();
    let n = present.len().max(1);
    let offsets = dodge_offsets(n, width);
    let slot = width / n as f64;

    let mut x_out = Vec::with_capacity(xs.len());
    let mut xmin = Vec::with_capacity(xs.len());
    let mut xmax = Vec::with_capacity(xs.len());
    for (x, rank) in xs.iter().zip(&ranks) {
        let i = present.binary_search(rank).unwrap_or(0);
        match x {
            Some(x) => {
                let centre = x + offsets[i];
                x_out.push(DataValue::Number(centre));
                xmin.push(DataValue::Number(centre - slot / 2.0));
                xmax.push(DataValue::Number(centre + slot / 2.0));
            }
            None => {
                x_out.push(DataValue::Null);
                xmin.push(DataValue::Null);
                xmax.push(DataValue::Null);
            }
        }
    }
    frame.add_column("x", x_out);
    frame.add_column("xmin", xmin);
    frame.add_column("xmax", xmax);
    frame.add_column("width", vec![DataValue::Number(slot); frame.nrow()]);
}

fn jitter(frame: &mut DataFrame, width: f64, height: f64, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let n = frame.nrow();
    let mut noise = |bound: f64| -> Vec<f64> {
        (0..n).map(|_| if bound > 0.0 { rng.gen_range(-bound..=bound) } else { 0.0 }).collect()
    };
    let dx = noise(width);
    let dy = noise(height);
    shift(frame, "x", |row, v| v + dx[row]);
    shift(frame, "y", |row, v| v + dy[row]);
}

/// Apply `f(row, value)` to the numeric cells of a column.
fn shift(frame: &mut DataFrame, column: &str, f: impl Fn(usize, f64) -> f64) {
    let Some(values) = frame.get(column) else { return };
    let updated: Vec<DataValue> = values
        .iter()
        .enumerate()
        .map(|(row, v)| v.as_f64().map_or_else(|| v.clone(), |n| DataValue::Number(f(row, n))))
        .collect();
    frame.add_column(column, updated);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn bars() -> DataFrame {
        DataFrame::new()
            .with_column("x", [1.0, 1.0, 2.0, 2.0])
            .with_column("y", [10.0, 20.0, 5.0, 5.0])
            .with_column("fill", ["p", "q", "p", "q"])
    }

    #[test]
    fn test_stack_cumulative() {
        let mut frame = DataFrame::new().with_column("x", ["A", "A"]).with_column("y", [10.0, 20.0]);
        Position::stack().apply(&mut frame, &PositionContext::default());
        assert_eq!(frame.get_f64("y"), Some(vec![10.0, 30.0]));
        assert_eq!(frame.get_f64("ymin"), Some(vec![0.0, 10.0]));
    }

    #[test]
    fn test_stack_follows_global_level_order() {
        let mut frame = bars();
        let ctx = PositionContext {
            subgroup_levels: vec![DataValue::from("q").level_key(), DataValue::from("p").level_key()],
            jitter_seed: 0,
            layer_width: None,
        };
        Position::stack().apply(&mut frame, &ctx);
        // q is first, so it sits at the bottom
        assert_eq!(frame.get_f64("ymin"), Some(vec![20.0, 0.0, 5.0, 0.0]));
        assert_eq!(frame.get_f64("ymax"), Some(vec![30.0, 20.0, 10.0, 5.0]));
    }

    #[test]
    fn test_stack_negative_values_separate_band() {
        let mut frame = DataFrame::new().with_column("x", [1.0, 1.0, 1.0]).with_column("y", [3.0, -2.0, 4.0]);
        Position::stack().apply(&mut frame, &PositionContext::default());
        assert_eq!(frame.get_f64("ymin"), Some(vec![0.0, -2.0, 3.0]));
        assert_eq!(frame.get_f64("ymax"), Some(vec![3.0, 0.0, 7.0]));
        assert_eq!(frame.get_f64("y"), Some(vec![3.0, -2.0, 7.0]));
    }

    #[test]
    fn test_fill_normalizes() {
        let mut frame = bars();
        Position::fill().apply(&mut frame, &PositionContext::default());
        let ymax = frame.get_f64("ymax").expect("ymax");
        assert_relative_eq!(ymax[1], 1.0);
        assert_relative_eq!(ymax[0], 1.0 / 3.0);
        assert_relative_eq!(ymax[3], 1.0);
    }

    #[test]
    fn test_dodge_offsets_symmetric() {
        let offsets = dodge_offsets(3, 0.9);
        assert_relative_eq!(offsets[0], -0.3);
        assert_relative_eq!(offsets[1], 0.0);
        assert_relative_eq!(offsets[2], 0.3);
    }

    #[test]
    fn test_dodge_moves_subgroups() {
        let mut frame = bars();
        Position::dodge(0.8).apply(&mut frame, &PositionContext::default());
        let x = frame.get_f64("x").expect("x");
        assert_relative_eq!(x[0], 0.8);
        assert_relative_eq!(x[1], 1.2);
        assert_eq!(frame.get_f64("width"), Some(vec![0.4; 4]));
    }

    #[test]
    fn test_default_dodge_spans_layer_width() {
        let mut frame = bars();
        let ctx = PositionContext { layer_width: Some(0.5), ..PositionContext::default() };
        Position::DODGE.apply(&mut frame, &ctx);
        assert_eq!(frame.get_f64("width"), Some(vec![0.25; 4]));
        let xmin = frame.get_f64("xmin").expect("xmin");
        let xmax = frame.get_f64("xmax").expect("xmax");
        assert_relative_eq!(xmin[0], 0.75);
        assert_relative_eq!(xmax[1], 1.25);

        let mut explicit = bars();
        Position::dodge(0.8).apply(&mut explicit, &ctx);
        assert_eq!(explicit.get_f64("width"), Some(vec![0.4; 4]));

        let mut fallback = bars();
        Position::DODGE.apply(&mut fallback, &PositionContext::default());
        assert_eq!(fallback.get_f64("width"), Some(vec![0.45; 4]));
    }

    #[test]
    fn test_jitter_bounded_and_reproducible() {
        let base = DataFrame::from_xy(&[1.0, 2.0, 3.0, 4.0], &[1.0, 1.0, 1.0, 1.0]);
        let mut a = base.clone();
        let mut b = base.clone();
        let ctx = PositionContext::default();
        Position::jitter_seeded(0.25, 0.0, 7).apply(&mut a, &ctx);
        Position::jitter_seeded(0.25, 0.0, 7).apply(&mut b, &ctx);
        assert_eq!(a, b);
        let moved = a.get_f64("x").expect("x");
        for (orig, new) in [1.0, 2.0, 3.0, 4.0].iter().zip(&moved) {
            assert!((new - orig).abs() <= 0.25);
        }
        assert_eq!(a.get_f64("y"), Some(vec![1.0; 4]));
    }

    #[test]
    fn test_nudge() {
        let mut frame = DataFrame::from_xy(&[1.0], &[2.0]);
        Position::nudge(0.5, -1.0).apply(&mut frame, &PositionContext::default());
        assert_eq!(frame.get_f64("x"), Some(vec![1.5]));
        assert_eq!(frame.get_f64("y"), Some(vec![1.0]));
    }
}
