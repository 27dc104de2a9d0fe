//! Faceting for Grammar of Graphics.
//!
//! Creates small multiples by splitting data on one or more variables. The
//! engine only partitions and lays out; the plot re-runs the layer pipeline
//! on each partition against the globally trained scales.

use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::grammar::aes::Axis;
use crate::grammar::data::{DataFrame, DataValue, LevelKey};

/// Separator between key values in a composite facet key.
pub const KEY_SEPARATOR: char = '\u{1f}';

/// Which position axes each panel computes on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacetScales {
    /// Shared ranges on both axes.
    #[default]
    Fixed,
    /// Per-panel ranges on both axes.
    Free,
    /// Per-panel x range.
    FreeX,
    /// Per-panel y range.
    FreeY,
}

impl FacetScales {
    /// Whether `axis` is computed per panel.
    #[must_use]
    pub fn frees(self, axis: Axis) -> bool {
        matches!(
            (self, axis),
            (FacetScales::Free, _) | (FacetScales::FreeX, Axis::X) | (FacetScales::FreeY, Axis::Y)
        )
    }
}

/// Faceting specification.
#[derive(Debug, Clone, PartialEq)]
pub enum Facet {
    /// One panel per distinct key combination, wrapped into a grid.
    Wrap {
        /// Partition fields.
        keys: Vec<String>,
        /// Explicit column count.
        ncol: Option<usize>,
        /// Explicit row count (ignored when `ncol` is set).
        nrow: Option<usize>,
        /// Scale freedom.
        scales: FacetScales,
    },
    /// Row levels × column levels, empty cells included.
    Grid {
        /// Field laid out down the rows.
        rows: Option<String>,
        /// Field laid out across the columns.
        cols: Option<String>,
        /// Scale freedom.
        scales: FacetScales,
    },
}

impl Facet {
    /// Wrap on one field.
    #[must_use]
    pub fn wrap(key: &str) -> Self {
        Self::wrap_by(&[key])
    }

    /// Wrap on the combination of several fields.
    #[must_use]
    pub fn wrap_by(keys: &[&str]) -> Self {
        Facet::Wrap {
            keys: keys.iter().map(|k| (*k).to_string()).collect(),
            ncol: None,
            nrow: None,
            scales: FacetScales::Fixed,
        }
    }

    /// Grid of `rows` × `cols`.
    #[must_use]
    pub fn grid(rows: &str, cols: &str) -> Self {
        Facet::Grid { rows: Some(rows.to_string()), cols: Some(cols.to_string()), scales: FacetScales::Fixed }
    }

    /// Grid with only a row field.
    #[must_use]
    pub fn grid_rows(rows: &str) -> Self {
        Facet::Grid { rows: Some(rows.to_string()), cols: None, scales: FacetScales::Fixed }
    }

    /// Grid with only a column field.
    #[must_use]
    pub fn grid_cols(cols: &str) -> Self {
        Facet::Grid { rows: None, cols: Some(cols.to_string()), scales: FacetScales::Fixed }
    }

    /// Set the wrap column count.
    #[must_use]
    pub fn ncol(mut self, n: usize) -> Self {
        if let Facet::Wrap { ref mut ncol, .. } = self {
            *ncol = Some(n);
        }
        self
    }

    /// Set the wrap row count.
    #[must_use]
    pub fn nrow(mut self, n: usize) -> Self {
        if let Facet::Wrap { ref mut nrow, .. } = self {
            *nrow = Some(n);
        }
        self
    }

    /// Set scale freedom.
    #[must_use]
    pub fn scales(mut self, freedom: FacetScales) -> Self {
        match self {
            Facet::Wrap { ref mut scales, .. } | Facet::Grid { ref mut scales, .. } => *scales = freedom,
        }
        self
    }

    /// Scale freedom.
    #[must_use]
    pub fn scale_freedom(&self) -> FacetScales {
        match self {
            Facet::Wrap { scales, .. } | Facet::Grid { scales, .. } => *scales,
        }
    }

    /// Partition fields.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Facet::Wrap { keys, .. } => keys.iter().map(String::as_str).collect(),
            Facet::Grid { rows, cols, .. } => rows.iter().chain(cols.iter()).map(String::as_str).collect(),
        }
    }
}

/// One panel's slice of the data.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// Panel index in row-major order.
    pub index: usize,
    /// Grid row.
    pub row: usize,
    /// Grid column.
    pub col: usize,
    /// Key values selecting this panel's rows.
    pub values: Vec<(String, DataValue)>,
    /// Composite key.
    pub key: String,
}

impl Partition {
    /// Human-readable label: key values joined by `", "`.
    #[must_use]
    pub fn label(&self) -> String {
        self.values.iter().map(|(_, v)| v.to_string()).collect::<Vec<_>>().join(", ")
    }

    /// Rows of `data` belonging to this panel.
    ///
    /// Only keys present in `data` filter; a frame with none of the keys is
    /// repeated in every panel.
    #[must_use]
    pub fn select(&self, data: &DataFrame) -> DataFrame {
        let filters: Vec<(&[DataValue], LevelKey)> = self
            .values
            .iter()
            .filter_map(|(field, value)| data.get(field).map(|column| (column, value.level_key())))
            .collect();
        if filters.is_empty() {
            return data.clone();
        }
        let rows: Vec<usize> = (0..data.nrow())
            .filter(|&row| filters.iter().all(|(column, key)| column[row].level_key() == *key))
            .collect();
        data.take_rows(&rows)
    }
}

/// Axis labels and strip captions for one panel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decorations {
    /// Draw x tick labels.
    pub show_x_axis: bool,
    /// Draw y tick labels.
    pub show_y_axis: bool,
    /// Caption above the panel.
    pub strip_top: Option<String>,
    /// Caption right of the panel.
    pub strip_right: Option<String>,
}

/// Panels and their placement.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetLayout {
    /// Grid rows.
    pub nrow: usize,
    /// Grid columns.
    pub ncol: usize,
    /// Panels in row-major order.
    pub partitions: Vec<Partition>,
    /// Decorations, parallel to `partitions`.
    pub decorations: Vec<Decorations>,
}

impl FacetLayout {
    /// Layout of a single unfaceted panel.
    #[must_use]
    pub fn single() -> Self {
        Self {
            nrow: 1,
            ncol: 1,
            partitions: vec![Partition { index: 0, row: 0, col: 0, values: Vec::new(), key: String::new() }],
            decorations: vec![Decorations { show_x_axis: true, show_y_axis: true, ..Decorations::default() }],
        }
    }

    /// Number of panels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    /// Whether there are no panels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }
}

/// Grid shape for `n` wrapped panels.
///
/// Explicit column count wins, then explicit row count with
/// `ceil(n / rows)` columns, else `ceil(sqrt(n))` columns.
#[must_use]
pub fn wrap_shape(n: usize, nrow: Option<usize>, ncol: Option<usize>) -> (usize, usize) {
    let n = n.max(1);
    let cols = match (ncol, nrow) {
        (Some(c), _) => c.max(1),
        (None, Some(r)) => n.div_ceil(r.max(1)),
        (None, None) => (n as f64).sqrt().ceil() as usize,
    };
    (n.div_ceil(cols), cols)
}

/// Partitions data and lays panels out.
#[derive(Debug, Clone, Copy)]
pub struct FacetEngine<'a> {
    facet: Option<&'a Facet>,
}

impl<'a> FacetEngine<'a> {
    /// Engine for an optional facet.
    #[must_use]
    pub fn new(facet: Option<&'a Facet>) -> Self {
        Self { facet }
    }

    /// Check the facet against the plot data before anything is computed.
    ///
    /// Keys must exist in the plot data, or in some layer's data when the
    /// plot has none.
    ///
    /// # Errors
    ///
    /// [`Error::MissingField`] for an absent key, [`Error::InvalidFacet`] for
    /// zero row or column counts and a grid without fields.
    pub fn validate(&self, data: &DataFrame, layers: &[&DataFrame]) -> Result<()> {
        let Some(facet) = self.facet else { return Ok(()) };
        match facet {
            Facet::Wrap { keys, ncol, nrow, .. } => {
                if keys.is_empty() {
                    return Err(Error::InvalidFacet("facet_wrap needs at least one field".to_string()));
                }
                if *ncol == Some(0) || *nrow == Some(0) {
                    return Err(Error::InvalidFacet("facet_wrap row and column counts must be positive".to_string()));
                }
            }
            Facet::Grid { rows: None, cols: None, .. } => {
                return Err(Error::InvalidFacet("facet_grid needs a row or column field".to_string()));
            }
            Facet::Grid { .. } => {}
        }
        for key in facet.keys() {
            let present = if data.ncol() > 0 {
                data.has_column(key)
            } else {
                layers.iter().any(|frame| frame.has_column(key))
            };
            if !present {
                return Err(Error::MissingField {
                    field: key.to_string(),
                    context: "facet".to_string(),
                    available: data.columns().into_iter().map(str::to_string).collect(),
                });
            }
        }
        Ok(())
    }

    /// Partition the plot data (and layer data carrying the keys) into panels.
    ///
    /// Levels are sorted: missing, booleans, numbers ascending, then text.
    ///
    /// # Errors
    ///
    /// Everything [`FacetEngine::validate`] reports, plus
    /// [`Error::FacetKeyCollision`] when a wrap key value contains
    /// [`KEY_SEPARATOR`].
    pub fn partition(&self, data: &DataFrame, layers: &[&DataFrame]) -> Result<FacetLayout> {
        self.validate(data, layers)?;
        let layout = match self.facet {
            None => FacetLayout::single(),
            Some(Facet::Wrap { keys, ncol, nrow, scales }) => wrap(keys, *ncol, *nrow, *scales, data, layers)?,
            Some(Facet::Grid { rows, cols, scales }) => {
                grid(rows.as_deref(), cols.as_deref(), *scales, data, layers)
            }
        };
        tracing::debug!(panels = layout.len(), nrow = layout.nrow, ncol = layout.ncol, "partitioned facets");
        Ok(layout)
    }
}

fn frames_with<'f>(keys: &[&str], data: &'f DataFrame, layers: &[&'f DataFrame]) -> Vec<&'f DataFrame> {
    std::iter::once(data)
        .chain(layers.iter().copied())
        .filter(|frame| keys.iter().all(|k| frame.has_column(k)))
        .collect()
}

fn wrap(
    keys: &[String],
    ncol: Option<usize>,
    nrow: Option<usize>,
    scales: FacetScales,
    data: &DataFrame,
    layers: &[&DataFrame],
) -> Result<FacetLayout> {
    let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
    let mut combos: BTreeSet<Vec<LevelKey>> = BTreeSet::new();
    for frame in frames_with(&key_refs, data, layers) {
        for row in 0..frame.nrow() {
            let mut combo = Vec::with_capacity(keys.len());
            for key in keys {
                let value = frame.value(row, key).cloned().unwrap_or_default();
                if let DataValue::Text(text) = &value {
                    if text.contains(KEY_SEPARATOR) {
                        return Err(Error::FacetKeyCollision { field: key.clone(), value: text.clone() });
                    }
                }
                combo.push(value.level_key());
            }
            combos.insert(combo);
        }
    }
    if combos.is_empty() {
        return Ok(FacetLayout::single());
    }

    let n = combos.len();
    let (rows, cols) = wrap_shape(n, nrow, ncol);
    let mut partitions = Vec::with_capacity(n);
    let mut decorations = Vec::with_capacity(n);
    for (index, combo) in combos.into_iter().enumerate() {
        let values: Vec<(String, DataValue)> =
            keys.iter().cloned().zip(combo.iter().map(LevelKey::to_value)).collect();
        let key = values.iter().map(|(_, v)| v.to_string()).collect::<Vec<_>>().join(&KEY_SEPARATOR.to_string());
        let partition = Partition { index, row: index / cols, col: index % cols, values, key };
        decorations.push(Decorations {
            show_x_axis: index + cols >= n || scales.frees(Axis::X),
            show_y_axis: partition.col == 0 || scales.frees(Axis::Y),
            strip_top: Some(partition.label()),
            strip_right: None,
        });
        partitions.push(partition);
    }
    Ok(FacetLayout { nrow: rows, ncol: cols, partitions, decorations })
}

fn levels_of(key: Option<&str>, data: &DataFrame, layers: &[&DataFrame]) -> Vec<Option<LevelKey>> {
    let Some(key) = key else { return vec![None] };
    let mut levels = BTreeSet::new();
    for frame in frames_with(&[key], data, layers) {
        if let Some(column) = frame.get(key) {
            levels.extend(column.iter().map(DataValue::level_key));
        }
    }
    if levels.is_empty() {
        return vec![None];
    }
    levels.into_iter().map(Some).collect()
}

fn grid(
    row_key: Option<&str>,
    col_key: Option<&str>,
    scales: FacetScales,
    data: &DataFrame,
    layers: &[&DataFrame],
) -> FacetLayout {
    let row_levels = levels_of(row_key, data, layers);
    let col_levels = levels_of(col_key, data, layers);
    let (nrow, ncol) = (row_levels.len(), col_levels.len());

    let mut partitions = Vec::with_capacity(nrow * ncol);
    let mut decorations = Vec::with_capacity(nrow * ncol);
    for (r, row_level) in row_levels.iter().enumerate() {
        for (c, col_level) in col_levels.iter().enumerate() {
            let mut values = Vec::new();
            if let (Some(k), Some(level)) = (row_key, row_level) {
                values.push((k.to_string(), level.to_value()));
            }
            if let (Some(k), Some(level)) = (col_key, col_level) {
                values.push((k.to_string(), level.to_value()));
            }
            let key = [row_level.as_ref(), col_level.as_ref()]
                .into_iter()
                .map(|level| level.map(ToString::to_string).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(&KEY_SEPARATOR.to_string());
            partitions.push(Partition { index: r * ncol + c, row: r, col: c, values, key });
            decorations.push(Decorations {
                show_x_axis: r + 1 == nrow || scales.frees(Axis::X),
                show_y_axis: c == 0 || scales.frees(Axis::Y),
                strip_top: if r == 0 { col_level.as_ref().map(ToString::to_string) } else { None },
                strip_right: if c + 1 == ncol { row_level.as_ref().map(ToString::to_string) } else { None },
            });
        }
    }
    FacetLayout { nrow, ncol, partitions, decorations }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories(n: usize, levels: &[&str]) -> DataFrame {
        DataFrame::new()
            .with_column("x", (0..n).map(|i| i as f64))
            .with_column("cat", (0..n).map(|i| levels[i % levels.len()]))
    }

    #[test]
    fn test_wrap_shape() {
        assert_eq!(wrap_shape(3, None, None), (2, 2));
        assert_eq!(wrap_shape(7, None, Some(3)), (3, 3));
        assert_eq!(wrap_shape(7, Some(2), None), (2, 4));
        assert_eq!(wrap_shape(1, None, None), (1, 1));
        assert_eq!(wrap_shape(10, None, None), (3, 4));
    }

    #[test]
    fn test_wrap_three_levels() {
        let data = categories(60, &["a", "b", "c"]);
        let facet = Facet::wrap("cat");
        let layout = FacetEngine::new(Some(&facet)).partition(&data, &[]).expect("operation should succeed");
        assert_eq!(layout.len(), 3);
        assert_eq!((layout.nrow, layout.ncol), (2, 2));
        let total: usize = layout.partitions.iter().map(|p| p.select(&data).nrow()).sum();
        assert_eq!(total, 60);
    }

    #[test]
    fn test_wrap_levels_sorted() {
        let data = DataFrame::new().with_column("k", ["b", "a"]).with_column("n", [10.0, 2.0]);
        let facet = Facet::wrap("n");
        let layout = FacetEngine::new(Some(&facet)).partition(&data, &[]).expect("operation should succeed");
        assert_eq!(layout.partitions[0].label(), "2");
        assert_eq!(layout.partitions[1].label(), "10");
    }

    #[test]
    fn test_wrap_partial_last_row_labels() {
        let data = categories(5, &["a", "b", "c", "d", "e"]);
        let facet = Facet::wrap("cat").ncol(3);
        let layout = FacetEngine::new(Some(&facet)).partition(&data, &[]).expect("operation should succeed");
        let shown: Vec<bool> = layout.decorations.iter().map(|d| d.show_x_axis).collect();
        // panel 2 has nothing below it
        assert_eq!(shown, vec![false, false, true, true, true]);
        assert!(layout.decorations[3].show_y_axis);
        assert!(!layout.decorations[4].show_y_axis);
        assert_eq!(layout.decorations[4].strip_top.as_deref(), Some("e"));
    }

    #[test]
    fn test_free_axes_always_labelled() {
        let data = categories(4, &["a", "b", "c", "d"]);
        let facet = Facet::wrap("cat").scales(FacetScales::FreeY);
        let layout = FacetEngine::new(Some(&facet)).partition(&data, &[]).expect("operation should succeed");
        assert!(layout.decorations.iter().all(|d| d.show_y_axis));
        assert!(!layout.decorations[0].show_x_axis);
    }

    #[test]
    fn test_grid_includes_empty_cells() {
        let data = DataFrame::new()
            .with_column("r", ["r1", "r1", "r1", "r2", "r2"])
            .with_column("c", ["c1", "c2", "c3", "c1", "c2"]);
        let facet = Facet::grid("r", "c");
        let layout = FacetEngine::new(Some(&facet)).partition(&data, &[]).expect("operation should succeed");
        assert_eq!(layout.len(), 6);
        assert_eq!((layout.nrow, layout.ncol), (2, 3));
        assert!(layout.partitions[5].select(&data).is_empty());
        assert_eq!(layout.decorations[0].strip_top.as_deref(), Some("c1"));
        assert_eq!(layout.decorations[2].strip_right.as_deref(), Some("r1"));
        assert_eq!(layout.decorations[3].strip_top, None);
        assert!(layout.decorations[4].show_x_axis && !layout.decorations[1].show_x_axis);
    }

    #[test]
    fn test_missing_key_fails() {
        let data = categories(4, &["a"]);
        let facet = Facet::wrap("nope");
        let err = FacetEngine::new(Some(&facet)).partition(&data, &[]).expect_err("should fail");
        assert!(matches!(err, Error::MissingField { ref field, .. } if field == "nope"));
    }

    #[test]
    fn test_key_collision() {
        let data = DataFrame::new().with_column("k", ["a\u{1f}b"]).with_column("j", ["x"]);
        let facet = Facet::wrap_by(&["k", "j"]);
        let err = FacetEngine::new(Some(&facet)).partition(&data, &[]).expect_err("should fail");
        assert!(matches!(err, Error::FacetKeyCollision { .. }));
    }

    #[test]
    fn test_invalid_counts() {
        let data = categories(4, &["a"]);
        let facet = Facet::wrap("cat").ncol(0);
        assert!(matches!(FacetEngine::new(Some(&facet)).validate(&data, &[]), Err(Error::InvalidFacet(_))));
    }

    #[test]
    fn test_select_repeats_frames_without_keys() {
        let data = categories(4, &["a", "b"]);
        let facet = Facet::wrap("cat");
        let layout = FacetEngine::new(Some(&facet)).partition(&data, &[]).expect("operation should succeed");
        let annotation = DataFrame::new().with_column("y", [1.0]);
        assert!(layout.partitions.iter().all(|p| p.select(&annotation).nrow() == 1));
    }

    #[test]
    fn test_unfaceted_single_panel() {
        let layout = FacetEngine::new(None).partition(&categories(3, &["a"]), &[]).expect("operation should succeed");
        assert_eq!(layout.len(), 1);
        assert!(layout.decorations[0].show_x_axis && layout.decorations[0].show_y_axis);
    }
}
