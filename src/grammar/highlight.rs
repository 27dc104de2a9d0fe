//! Highlighting a subset of the data.
//!
//! A [`Highlight`] splits every layer in two: rows that fail the predicate
//! are drawn first in a flat grey, rows that pass are drawn on top with
//! their normal mapping. The predicate sees the layer's data.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::color::Rgba;
use crate::grammar::aes::{AesValue, AestheticMap, Channel, Resolver};
use crate::grammar::data::{DataFrame, LevelKey};
use crate::grammar::layer::Layer;

/// Alpha of rows that are not highlighted.
pub const UNHIGHLIGHTED_ALPHA: f64 = 0.3;

type RowPredicate = Arc<dyn Fn(&DataFrame, usize) -> bool + Send + Sync>;
type GroupPredicate = Arc<dyn Fn(&DataFrame) -> bool + Send + Sync>;

#[derive(Clone)]
enum Predicate {
    Rows(RowPredicate),
    Groups(GroupPredicate),
}

/// Emphasis of the rows (or groups) that match a predicate.
#[derive(Clone)]
pub struct Highlight {
    predicate: Predicate,
    color: Rgba,
    alpha: f64,
}

impl fmt::Debug for Highlight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let by = match self.predicate {
            Predicate::Rows(_) => "rows",
            Predicate::Groups(_) => "groups",
        };
        f.debug_struct("Highlight").field("by", &by).field("color", &self.color).field("alpha", &self.alpha).finish()
    }
}

impl Highlight {
    /// Highlight the rows for which `predicate(data, row)` holds.
    #[must_use]
    pub fn rows(predicate: impl Fn(&DataFrame, usize) -> bool + Send + Sync + 'static) -> Self {
        Self::with(Predicate::Rows(Arc::new(predicate)))
    }

    /// Highlight whole groups for which `predicate(group_rows)` holds.
    ///
    /// Groups come from the color mapping, then fill, then group. Without
    /// any of them the whole layer is one group.
    #[must_use]
    pub fn groups(predicate: impl Fn(&DataFrame) -> bool + Send + Sync + 'static) -> Self {
        Self::with(Predicate::Groups(Arc::new(predicate)))
    }

    fn with(predicate: Predicate) -> Self {
        Self { predicate, color: Rgba::rgb(204, 204, 204), alpha: UNHIGHLIGHTED_ALPHA }
    }

    /// Color of rows that are not highlighted.
    #[must_use]
    pub fn unhighlighted_color(mut self, color: Rgba) -> Self {
        self.color = color;
        self
    }

    /// Alpha of rows that are not highlighted.
    #[must_use]
    pub fn unhighlighted_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha.clamp(0.0, 1.0);
        self
    }

    /// Which rows of `data` are highlighted.
    #[must_use]
    pub fn mask(&self, data: &DataFrame, group_field: Option<&str>) -> Vec<bool> {
        let n = data.nrow();
        match &self.predicate {
            Predicate::Rows(predicate) => (0..n).map(|row| predicate(data, row)).collect(),
            Predicate::Groups(predicate) => {
                let Some(keys) = group_field.and_then(|field| data.get(field)) else {
                    return vec![predicate(data); n];
                };
                let mut groups: IndexMap<LevelKey, Vec<usize>> = IndexMap::new();
                for (row, value) in keys.iter().enumerate() {
                    groups.entry(value.level_key()).or_default().push(row);
                }
                let mut mask = vec![false; n];
                for rows in groups.values() {
                    if predicate(&data.take_rows(rows)) {
                        for &row in rows {
                            mask[row] = true;
                        }
                    }
                }
                mask
            }
        }
    }

    /// Replace each layer by a dimmed copy of its unmatched rows followed
    /// by the layer restricted to its matched rows.
    #[must_use]
    pub fn split_layers(&self, layers: &[Layer], plot_aes: &AestheticMap, plot_data: &Arc<DataFrame>) -> Vec<Layer> {
        let mut out = Vec::with_capacity(layers.len() * 2);
        for layer in layers {
            let data = layer.data.clone().unwrap_or_else(|| Arc::clone(plot_data));
            let mapping = if layer.inherit_aes {
                Resolver::merge(plot_aes, &layer.mapping())
            } else {
                layer.mapping()
            };
            let group_field = [Channel::Color, Channel::Fill, Channel::Group].into_iter().find_map(|channel| {
                match mapping.get(channel) {
                    Some(AesValue::Name(name)) if data.has_column(name) => Some(name.clone()),
                    _ => None,
                }
            });

            let mask = self.mask(&data, group_field.as_deref());
            let (matched, unmatched): (Vec<usize>, Vec<usize>) = (0..data.nrow()).partition(|&row| mask[row]);
            tracing::debug!(matched = matched.len(), unmatched = unmatched.len(), "highlight split");

            if !unmatched.is_empty() {
                let hex = self.color.to_hex();
                let mut dimmed = mapping
                    .clone()
                    .literal(Channel::Color, hex.as_str())
                    .literal(Channel::Fill, hex.as_str())
                    .literal(Channel::Alpha, self.alpha);
                if let (Some(field), false) = (&group_field, mapping.contains(Channel::Group)) {
                    dimmed = dimmed.group(field);
                }
                out.push(
                    layer.clone().aes(dimmed).inherit_aes(false).shared_data(Arc::new(data.take_rows(&unmatched))),
                );
            }
            out.push(layer.clone().shared_data(Arc::new(data.take_rows(&matched))));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::data::DataValue;
    use crate::grammar::geom::Geom;

    fn data() -> Arc<DataFrame> {
        Arc::new(
            DataFrame::new()
                .with_column("x", [1.0, 2.0, 3.0, 4.0])
                .with_column("y", [1.0, 5.0, 2.0, 6.0])
                .with_column("k", ["a", "a", "b", "b"]),
        )
    }

    #[test]
    fn test_row_mask() {
        let highlight = Highlight::rows(|d, row| d.value(row, "y").and_then(DataValue::as_f64).is_some_and(|y| y > 4.0));
        assert_eq!(highlight.mask(&data(), None), vec![false, true, false, true]);
    }

    #[test]
    fn test_group_mask() {
        let highlight = Highlight::groups(|g| g.get_f64("x").is_some_and(|xs| xs.iter().sum::<f64>() > 5.0));
        assert_eq!(highlight.mask(&data(), Some("k")), vec![false, false, true, true]);
        assert_eq!(highlight.mask(&data(), None), vec![true; 4]);
    }

    #[test]
    fn test_split_layers_dims_unmatched_rows() {
        let highlight = Highlight::groups(|g| g.get_f64("x").is_some_and(|xs| xs.iter().sum::<f64>() > 5.0));
        let aes = AestheticMap::new().x("x").y("y").color("k");
        let layers = highlight.split_layers(&[Layer::new(Geom::line())], &aes, &data());
        assert_eq!(layers.len(), 2);

        let dimmed = &layers[0];
        assert!(!dimmed.inherit_aes);
        assert_eq!(dimmed.data.as_ref().map(|d| d.nrow()), Some(2));
        let mapping = dimmed.mapping();
        assert_eq!(mapping.get(Channel::Color), Some(&AesValue::Literal(DataValue::from("#cccccc"))));
        assert_eq!(mapping.get(Channel::Alpha), Some(&AesValue::Literal(DataValue::from(UNHIGHLIGHTED_ALPHA))));
        assert_eq!(mapping.get(Channel::Group), Some(&AesValue::Name("k".to_string())));

        let shown = &layers[1];
        assert!(shown.inherit_aes);
        assert_eq!(shown.data.as_ref().and_then(|d| d.get_f64("x")), Some(vec![3.0, 4.0]));
    }

    #[test]
    fn test_split_without_unmatched_rows_keeps_one_layer() {
        let layers = Highlight::rows(|_, _| true).split_layers(&[Layer::new(Geom::point())], &AestheticMap::new(), &data());
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].data.as_ref().map(|d| d.nrow()), Some(4));
    }
}
