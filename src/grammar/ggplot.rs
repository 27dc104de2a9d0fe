//! Main GGPlot builder.
//!
//! [`GGPlot`] accumulates a plot declaration; [`GGPlot::build`] resolves it
//! into a renderer-independent [`BuiltGGPlot`], which
//! [`BuiltGGPlot::render`] hands to a [`Renderer`].

use std::collections::BTreeMap;
use std::sync::Arc;

use batuta_common::display::WithDimensions;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::palette::{Palette, PaletteRegistry};
use crate::render::{Renderer, ResolvedEncodings};
use crate::scale::{breaks, widen_degenerate};
use crate::warning::{Warning, Warnings};

use super::aes::{AestheticMap, Axis, Channel};
use super::coord::Coord;
use super::data::{DataFrame, DataValue};
use super::facet::{Decorations, Facet, FacetEngine, FacetLayout, Partition};
use super::geom::{Geom, GeomKind, StyleParams, StyleValue};
use super::highlight::Highlight;
use super::layer::Layer;
use super::pipeline::{compute_layer, prepare_layer, ComputedLayer, PipelineContext, PreparedLayer};
use super::scales::{Legend, ScaleRegistry, ScaleSpec, TrainedScale, TrainingInput, Transform};
use super::stat::Stat;
use super::theme::{ResolvedTheme, Theme, ThemeMerger};

/// Fraction of a continuous range added on each side.
const EXPANSION: f64 = 0.05;

/// Padding around discrete positions `1..=n`.
const DISCRETE_PADDING: f64 = 0.6;

/// Approximate number of continuous axis breaks.
const BREAK_COUNT: usize = 5;

/// Title, captions and per-channel titles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Labels {
    /// Plot title.
    pub title: Option<String>,
    /// Subtitle.
    pub subtitle: Option<String>,
    /// Caption.
    pub caption: Option<String>,
    /// Axis and legend titles by channel.
    pub channels: BTreeMap<Channel, String>,
}

impl Labels {
    /// Empty label set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the subtitle.
    #[must_use]
    pub fn subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    /// Set the caption.
    #[must_use]
    pub fn caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Set the x axis title.
    #[must_use]
    pub fn x(self, title: impl Into<String>) -> Self {
        self.channel(Channel::X, title)
    }

    /// Set the y axis title.
    #[must_use]
    pub fn y(self, title: impl Into<String>) -> Self {
        self.channel(Channel::Y, title)
    }

    /// Set the title of any channel's axis or legend.
    #[must_use]
    pub fn channel(mut self, channel: Channel, title: impl Into<String>) -> Self {
        self.channels.insert(channel, title.into());
        self
    }

    /// Overlay `other` on top of these labels.
    fn merge(&mut self, other: Labels) {
        if other.title.is_some() {
            self.title = other.title;
        }
        if other.subtitle.is_some() {
            self.subtitle = other.subtitle;
        }
        if other.caption.is_some() {
            self.caption = other.caption;
        }
        self.channels.extend(other.channels);
    }
}

/// Grammar of Graphics plot builder.
///
/// Every builder call consumes and returns the plot; clone a plot to branch
/// from it. Data is shared behind an [`Arc`], so clones are cheap.
#[derive(Debug, Clone)]
pub struct GGPlot {
    data: Arc<DataFrame>,
    aes: AestheticMap,
    layers: Vec<Layer>,
    scales: Vec<ScaleSpec>,
    palettes: PaletteRegistry,
    facet: Option<Facet>,
    highlight: Option<Highlight>,
    theme: Theme,
    coord: Coord,
    labels: Labels,
    width: u32,
    height: u32,
    config: Config,
}

impl Default for GGPlot {
    fn default() -> Self {
        Self::new()
    }
}

impl GGPlot {
    /// Create a new plot builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a new plot builder.
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        Self {
            data: Arc::new(DataFrame::new()),
            aes: AestheticMap::new(),
            layers: Vec::new(),
            scales: Vec::new(),
            palettes: PaletteRegistry::builtin(),
            facet: None,
            highlight: None,
            theme: Theme::new(),
            coord: Coord::default(),
            labels: Labels::default(),
            width: config.width,
            height: config.height,
            config,
        }
    }

    /// Set the data.
    #[must_use]
    pub fn data(mut self, data: DataFrame) -> Self {
        self.data = Arc::new(data);
        self
    }

    /// Share data with other plots.
    #[must_use]
    pub fn shared_data(mut self, data: Arc<DataFrame>) -> Self {
        self.data = data;
        self
    }

    /// Convenience: set x and y data directly and map them.
    #[must_use]
    pub fn data_xy(mut self, x: &[f64], y: &[f64]) -> Self {
        self.data = Arc::new(DataFrame::from_xy(x, y));
        self.aes = self.aes.x("x").y("y");
        self
    }

    /// Set the plot-level mapping.
    #[must_use]
    pub fn aes(mut self, aes: AestheticMap) -> Self {
        self.aes = aes;
        self
    }

    /// Add a geometry layer.
    #[must_use]
    pub fn geom(mut self, geom: Geom) -> Self {
        self.layers.push(Layer::new(geom));
        self
    }

    /// Add a layer.
    #[must_use]
    pub fn layer(mut self, layer: Layer) -> Self {
        self.layers.push(layer);
        self
    }

    /// Add a scale. Later scales for the same channel win.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownPalette`] when the scale names a palette that is not
    /// registered, and [`Error::ScaleDomain`] for unusable limits.
    pub fn scale(mut self, spec: ScaleSpec) -> Result<Self> {
        spec.validate(&self.palettes)?;
        self.scales.push(spec);
        Ok(self)
    }

    /// Register a custom palette.
    #[must_use]
    pub fn palette(mut self, palette: Palette) -> Self {
        self.palettes.register(palette);
        self
    }

    /// Set coordinate system.
    #[must_use]
    pub fn coord(mut self, coord: Coord) -> Self {
        self.coord = coord;
        self
    }

    /// Set faceting.
    #[must_use]
    pub fn facet(mut self, facet: Facet) -> Self {
        self.facet = Some(facet);
        self
    }

    /// Dim every row the highlight does not match.
    #[must_use]
    pub fn highlight(mut self, highlight: Highlight) -> Self {
        self.highlight = Some(highlight);
        self
    }

    /// Set a theme.
    ///
    /// A preset replaces the current theme. An unnamed theme is applied on
    /// top of it key by key. Without any preset the grey preset is the base.
    #[must_use]
    pub fn theme(mut self, theme: Theme) -> Self {
        self.theme = if theme.name().is_some() { theme } else { ThemeMerger::merge(&self.theme, &theme) };
        self
    }

    /// Set labels; unset fields keep earlier values.
    #[must_use]
    pub fn labs(mut self, labels: Labels) -> Self {
        self.labels.merge(labels);
        self
    }

    /// Set title.
    #[must_use]
    pub fn title(self, title: impl Into<String>) -> Self {
        self.labs(Labels::new().title(title))
    }

    /// Set x-axis label.
    #[must_use]
    pub fn xlab(self, label: impl Into<String>) -> Self {
        self.labs(Labels::new().x(label))
    }

    /// Set y-axis label.
    #[must_use]
    pub fn ylab(self, label: impl Into<String>) -> Self {
        self.labs(Labels::new().y(label))
    }

    /// Set dimensions.
    #[must_use]
    pub fn dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Plot data.
    #[must_use]
    pub fn get_data(&self) -> &DataFrame {
        &self.data
    }

    /// Layers in drawing order.
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Plot configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current labels.
    #[must_use]
    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// Resolve the declaration into panels of computed layers.
    ///
    /// # Errors
    ///
    /// - [`Error::NoLayers`] for a plot without layers.
    /// - [`Error::MissingField`] for a facet key or positional field that
    ///   is not in the data.
    /// - [`Error::MissingChannel`] when a geometry lacks a required channel.
    /// - [`Error::InvalidFacet`], [`Error::FacetKeyCollision`],
    ///   [`Error::UnknownPalette`] and [`Error::ScaleDomain`] from facet and
    ///   scale setup.
    pub fn build(&self) -> Result<BuiltGGPlot> {
        if self.layers.is_empty() {
            return Err(Error::NoLayers);
        }
        let split;
        let layers: &[Layer] = match &self.highlight {
            Some(highlight) => {
                split = highlight.split_layers(&self.layers, &self.aes, &self.data);
                &split
            }
            None => &self.layers,
        };
        let layer_data: Vec<&DataFrame> = layers.iter().map(|l| l.data_or(&self.data)).collect();
        let engine = FacetEngine::new(self.facet.as_ref());
        engine.validate(&self.data, &layer_data)?;

        let mut warnings = Warnings::with_suppressed(self.config.suppress_warnings.iter().copied());
        let untrained = ScaleRegistry::default();
        let mut ctx = PipelineContext {
            config: &self.config,
            scales: &untrained,
            plot_aes: &self.aes,
            coord: &self.coord,
        };
        let prepared = layers
            .iter()
            .zip(&layer_data)
            .enumerate()
            .map(|(index, (layer, data))| prepare_layer(layer, index, data, &ctx))
            .collect::<Result<Vec<PreparedLayer>>>()?;
        for layer in &prepared {
            warnings.extend(layer.warnings.iter().cloned());
        }

        let inputs: Vec<TrainingInput<'_>> = prepared
            .iter()
            .zip(&layer_data)
            .map(|(layer, data)| TrainingInput { data: *data, aes: &layer.resolved })
            .collect();
        let scales = ScaleRegistry::train(&inputs, &self.scales, &self.palettes, &self.config)?;
        let layout = engine.partition(&self.data, &layer_data)?;
        tracing::debug!(layers = prepared.len(), panels = layout.len(), "building plot");

        ctx.scales = &scales;
        let computed = compute_panels(&layout, &prepared, &layer_data, &ctx);

        let mut panels = Vec::with_capacity(layout.len());
        for ((partition, decorations), (layers, empty)) in
            layout.partitions.iter().zip(&layout.decorations).zip(computed)
        {
            if empty {
                warnings.push(Warning::EmptyPanel { panel: partition.label() });
            }
            for layer in &layers {
                warnings.extend(layer.warnings.iter().cloned());
            }
            panels.push(Panel {
                index: partition.index,
                row: partition.row,
                col: partition.col,
                label: partition.label(),
                layers,
                x: AxisInfo::default(),
                y: AxisInfo::default(),
                decorations: decorations.clone(),
            });
        }

        let first_stat = prepared.first().map(|l| l.stat);
        for axis in [Axis::X, Axis::Y] {
            let template = self.axis_template(axis, &scales, first_stat);
            let global = panels.iter().filter_map(|p| panel_extent(p, axis)).reduce(union);
            let freed = self.facet.as_ref().is_some_and(|f| f.scale_freedom().frees(axis));
            for panel in &mut panels {
                let extent = if freed { panel_extent(panel, axis) } else { global };
                let mut info = template.clone();
                info.range = self.axis_range(axis, &template, extent);
                info.breaks = axis_breaks(&info);
                info.show_labels = freed
                    || match axis {
                        Axis::X => panel.decorations.show_x_axis,
                        Axis::Y => panel.decorations.show_y_axis,
                    };
                match axis {
                    Axis::X => panel.x = info,
                    Axis::Y => panel.y = info,
                }
            }
        }

        let kinds: Vec<GeomKind> = prepared.iter().map(|l| l.kind).collect();
        let base = if self.theme.name().is_some() { Theme::new() } else { Theme::grey() };
        let theme = ThemeMerger::merge(&base, &self.theme)
            .set("width", f64::from(self.width))
            .set("height", f64::from(self.height));
        let (theme, theme_warnings) = ThemeMerger::resolve(&theme, &kinds);
        warnings.extend(theme_warnings);

        Ok(BuiltGGPlot {
            legends: scales.legends(&self.labels.channels),
            panels,
            nrow: layout.nrow,
            ncol: layout.ncol,
            scales,
            theme,
            coord: self.coord,
            labels: self.labels.clone(),
            width: self.width,
            height: self.height,
            warnings,
        })
    }

    /// Build and render.
    ///
    /// # Errors
    ///
    /// Any error of [`GGPlot::build`].
    pub fn render<R: Renderer>(&self, renderer: &mut R) -> Result<R::Node> {
        Ok(self.build()?.render(renderer))
    }

    /// Axis info without range, breaks or label visibility.
    ///
    /// `axis` is the display axis; under a flip it shows the other data axis.
    fn axis_template(&self, axis: Axis, scales: &ScaleRegistry, first_stat: Option<Stat>) -> AxisInfo {
        let data_axis = if self.coord.is_flipped() { other(axis) } else { axis };
        let channel = match data_axis {
            Axis::X => Channel::X,
            Axis::Y => Channel::Y,
        };
        let computed_title = match (data_axis, first_stat) {
            (Axis::Y, Some(Stat::Count | Stat::Bin { .. })) => Some("count"),
            (Axis::Y, Some(Stat::Density { .. })) => Some("density"),
            _ => None,
        };
        let title = self
            .labels
            .channels
            .get(&channel)
            .cloned()
            .or_else(|| scales.title(channel).map(str::to_string))
            .or_else(|| computed_title.map(str::to_string));
        let (labels, transform) = match scales.axis(data_axis) {
            Some(TrainedScale::Discrete(scale)) => (
                scale.levels().iter().enumerate().map(|(i, level)| ((i + 1) as f64, level.to_string())).collect(),
                Transform::Identity,
            ),
            Some(TrainedScale::Continuous(scale)) => (Vec::new(), scale.transform()),
            None => (Vec::new(), Transform::Identity),
        };
        AxisInfo { title, range: (0.0, 1.0), breaks: Vec::new(), labels, transform, show_labels: true }
    }

    /// Display range: data extent, expanded, then coordinate limits.
    fn axis_range(&self, axis: Axis, template: &AxisInfo, extent: Option<(f64, f64)>) -> (f64, f64) {
        if let Some((lo, hi)) = self.coord.limits(axis) {
            let lo = template.transform.apply(lo).unwrap_or(lo);
            let hi = template.transform.apply(hi).unwrap_or(hi);
            return (lo, hi);
        }
        if template.is_discrete() {
            let n = template.labels.len() as f64;
            let (lo, hi) = extent.map_or((1.0, n), |e| union(e, (1.0, n)));
            return (lo.min(1.0) - DISCRETE_PADDING, hi.max(n) + DISCRETE_PADDING);
        }
        let (lo, hi) = widen_degenerate(extent.unwrap_or((0.0, 1.0)));
        let pad = (hi - lo) * EXPANSION;
        (lo - pad, hi + pad)
    }
}

fn other(axis: Axis) -> Axis {
    match axis {
        Axis::X => Axis::Y,
        Axis::Y => Axis::X,
    }
}

fn union(a: (f64, f64), b: (f64, f64)) -> (f64, f64) {
    (a.0.min(b.0), a.1.max(b.1))
}

fn panel_extent(panel: &Panel, axis: Axis) -> Option<(f64, f64)> {
    panel.layers.iter().filter_map(|l| l.extent(axis)).reduce(union)
}

fn axis_breaks(info: &AxisInfo) -> Vec<(f64, String)> {
    if info.is_discrete() {
        return info.labels.clone();
    }
    breaks(info.range, BREAK_COUNT)
        .into_iter()
        .map(|b| {
            let shown = (info.transform.invert(b) * 1e9).round() / 1e9;
            (b, DataValue::Number(shown).to_string())
        })
        .collect()
}

/// Layers of every panel, and whether the panel had no rows at all.
fn compute_panels(
    layout: &FacetLayout,
    prepared: &[PreparedLayer],
    layer_data: &[&DataFrame],
    ctx: &PipelineContext<'_>,
) -> Vec<(Vec<ComputedLayer>, bool)> {
    let one = |partition: &Partition| compute_panel(partition, prepared, layer_data, ctx);

    #[cfg(feature = "parallel")]
    if ctx.config.parallel_panels && layout.len() > 1 {
        use rayon::prelude::*;
        return layout.partitions.par_iter().map(one).collect();
    }

    layout.partitions.iter().map(one).collect()
}

fn compute_panel(
    partition: &Partition,
    prepared: &[PreparedLayer],
    layer_data: &[&DataFrame],
    ctx: &PipelineContext<'_>,
) -> (Vec<ComputedLayer>, bool) {
    let mut empty = true;
    let layers = prepared
        .iter()
        .zip(layer_data)
        .map(|(layer, data)| {
            let rows = partition.select(data);
            empty &= rows.is_empty();
            compute_layer(layer, &rows, ctx)
        })
        .collect();
    (layers, empty)
}

/// Resolved axis of one panel.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisInfo {
    /// Axis title.
    pub title: Option<String>,
    /// Display range in transformed units.
    pub range: (f64, f64),
    /// Tick positions and their text.
    pub breaks: Vec<(f64, String)>,
    /// Level positions of a discrete axis (empty when continuous).
    pub labels: Vec<(f64, String)>,
    /// Transform of a continuous axis.
    pub transform: Transform,
    /// Whether tick labels are drawn on this panel.
    pub show_labels: bool,
}

impl Default for AxisInfo {
    fn default() -> Self {
        Self {
            title: None,
            range: (0.0, 1.0),
            breaks: Vec::new(),
            labels: Vec::new(),
            transform: Transform::Identity,
            show_labels: true,
        }
    }
}

impl AxisInfo {
    /// Whether the axis shows discrete levels.
    #[must_use]
    pub fn is_discrete(&self) -> bool {
        !self.labels.is_empty()
    }
}

/// One computed panel.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    /// Index in row-major order.
    pub index: usize,
    /// Grid row.
    pub row: usize,
    /// Grid column.
    pub col: usize,
    /// Facet label (empty when unfaceted).
    pub label: String,
    /// Layers in drawing order.
    pub layers: Vec<ComputedLayer>,
    /// Horizontal axis.
    pub x: AxisInfo,
    /// Vertical axis.
    pub y: AxisInfo,
    /// Axis labels and strips.
    pub decorations: Decorations,
}

/// A built GGPlot ready for rendering.
#[derive(Debug, Clone)]
pub struct BuiltGGPlot {
    panels: Vec<Panel>,
    nrow: usize,
    ncol: usize,
    scales: ScaleRegistry,
    legends: Vec<Legend>,
    theme: ResolvedTheme,
    coord: Coord,
    labels: Labels,
    width: u32,
    height: u32,
    warnings: Warnings,
}

impl BuiltGGPlot {
    /// Panels in row-major order.
    #[must_use]
    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    /// Grid shape as `(rows, cols)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.nrow, self.ncol)
    }

    /// Trained scales.
    #[must_use]
    pub fn scales(&self) -> &ScaleRegistry {
        &self.scales
    }

    /// Legends for non-positional scales.
    #[must_use]
    pub fn legends(&self) -> &[Legend] {
        &self.legends
    }

    /// Theme options split by target.
    #[must_use]
    pub fn theme(&self) -> &ResolvedTheme {
        &self.theme
    }

    /// Labels.
    #[must_use]
    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// Plot dimensions.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Recorded warnings.
    #[must_use]
    pub fn warnings(&self) -> &Warnings {
        &self.warnings
    }

    /// Hand the scene to a renderer.
    pub fn render<R: Renderer>(&self, renderer: &mut R) -> R::Node {
        let mut grid: Vec<Vec<R::Node>> = (0..self.nrow).map(|_| Vec::with_capacity(self.ncol)).collect();
        for panel in &self.panels {
            let marks = panel
                .layers
                .iter()
                .map(|layer| {
                    let encodings = ResolvedEncodings {
                        channels: &layer.encodings,
                        x: &panel.x,
                        y: &panel.y,
                        coord: &self.coord,
                        decorations: &panel.decorations,
                    };
                    let mut style = self.theme.geoms.get(&layer.kind).cloned().unwrap_or_default();
                    style.extend(layer.style.iter().map(|(k, v)| (k.clone(), v.clone())));
                    renderer.render_mark(layer.kind, &layer.frame, &encodings, &style)
                })
                .collect();
            let overlay = renderer.compose_overlay(marks);
            let node = renderer.apply_theme(overlay, &self.theme.panel);
            if let Some(row) = grid.get_mut(panel.row) {
                row.push(node);
            }
        }
        let composed = renderer.compose_grid(grid, self.nrow, self.ncol);
        let mut options = self.theme.grid.clone();
        for (key, text) in [("title", &self.labels.title), ("subtitle", &self.labels.subtitle), ("caption", &self.labels.caption)] {
            if let Some(text) = text {
                options.insert(key.to_string(), StyleValue::Text(text.clone()));
            }
        }
        renderer.apply_theme(composed, &options)
    }
}

impl WithDimensions for GGPlot {
    fn set_dimensions(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }
}
