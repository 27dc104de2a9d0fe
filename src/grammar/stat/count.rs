use indexmap::IndexMap;

use super::{per_group, weights, StatOutput};
use crate::grammar::data::{DataFrame, LevelKey};

/// Count rows per distinct x, in first-seen order.
///
/// Emits `x`, `count`, `prop` (share of the group total) and `y = count`.
/// A bound `weight` channel sums weights instead of counting.
#[must_use]
pub fn count(frame: &DataFrame) -> StatOutput {
    let out = per_group(frame, &["x", "y", "weight"], |group| {
        let Some(xs) = group.get("x") else {
            return DataFrame::new();
        };
        let w = weights(group);
        let mut counts: IndexMap<LevelKey, f64> = IndexMap::new();
        for (value, weight) in xs.iter().zip(w) {
            *counts.entry(value.level_key()).or_insert(0.0) += weight;
        }
        let total: f64 = counts.values().sum();

        let levels: Vec<_> = counts.keys().map(LevelKey::to_value).collect();
        let n: Vec<f64> = counts.values().copied().collect();
        let prop: Vec<f64> = n.iter().map(|c| if total > 0.0 { c / total } else { 0.0 }).collect();

        DataFrame::new()
            .with_column("x", levels)
            .with_column("count", n.clone())
            .with_column("prop", prop)
            .with_column("y", n)
    });
    StatOutput { frame: out, warnings: Vec::new() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::data::DataValue;
    use crate::grammar::stat::GROUP;

    #[test]
    fn test_count_first_seen_order() {
        let frame = DataFrame::new().with_column("x", ["b", "a", "b", "c", "b"]);
        let out = count(&frame).frame;
        let xs: Vec<String> = out.get("x").expect("x").iter().map(ToString::to_string).collect();
        assert_eq!(xs, vec!["b", "a", "c"]);
        assert_eq!(out.get_f64("count"), Some(vec![3.0, 1.0, 1.0]));
        assert_eq!(out.get_f64("y"), Some(vec![3.0, 1.0, 1.0]));
        assert_eq!(out.get_f64("prop"), Some(vec![0.6, 0.2, 0.2]));
    }

    #[test]
    fn test_count_weighted() {
        let frame = DataFrame::new().with_column("x", ["a", "a", "b"]).with_column("weight", [2.0, 0.5, 4.0]);
        let out = count(&frame).frame;
        assert_eq!(out.get_f64("count"), Some(vec![2.5, 4.0]));
    }

    #[test]
    fn test_count_subgroups_keep_fill() {
        let frame = DataFrame::new()
            .with_column("x", ["a", "a", "b", "b"])
            .with_column("fill", ["p", "q", "p", "p"])
            .with_column(GROUP, [0.0, 1.0, 0.0, 0.0]);
        let out = count(&frame).frame;
        assert_eq!(out.nrow(), 3);
        assert_eq!(out.get("fill").expect("fill carried")[2], DataValue::from("q"));
        assert_eq!(out.get_f64("count"), Some(vec![1.0, 2.0, 1.0]));
    }
}
