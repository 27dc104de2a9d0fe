//! Per-layer transform pipeline.
//!
//! [`prepare_layer`] runs once per layer over its full data: it resolves the
//! mapping, turns literals into constant encodings and fails fast on
//! unplaceable marks. [`compute_layer`] then runs once per panel:
//! channel frame → log transform → stat → discrete positions → position
//! adjustment → flip → scale lookup.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::color::Rgba;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::grammar::aes::{AesValue, AestheticMap, Axis, Binding, Channel, ResolvedAes, Resolver};
use crate::grammar::coord::Coord;
use crate::grammar::data::{DataFrame, DataValue, LevelKey};
use crate::grammar::facet::KEY_SEPARATOR;
use crate::grammar::geom::{GeomKind, PointShape, StyleParams, StyleValue};
use crate::grammar::layer::Layer;
use crate::grammar::position::{Position, PositionContext};
use crate::grammar::scales::{ScaleRegistry, Transform, Visual, LINETYPES, NA_COLOR};
use crate::grammar::stat::{Stat, StatContext, GROUP};
use crate::warning::Warning;

/// Default width of bars, boxes and tiles in axis units.
pub const DEFAULT_BAR_WIDTH: f64 = 0.9;

const X_COLUMNS: &[&str] = &["x", "xmin", "xmax", "xend"];
const Y_COLUMNS: &[&str] = &["y", "ymin", "ymax", "yend"];

/// Columns holding positions on an axis.
#[must_use]
pub fn positional_columns(axis: Axis) -> &'static [&'static str] {
    match axis {
        Axis::X => X_COLUMNS,
        Axis::Y => Y_COLUMNS,
    }
}

/// Shared read-only inputs of the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct PipelineContext<'a> {
    /// Plot configuration.
    pub config: &'a Config,
    /// Globally trained scales.
    pub scales: &'a ScaleRegistry,
    /// Plot-level mapping.
    pub plot_aes: &'a AestheticMap,
    /// Coordinate system.
    pub coord: &'a Coord,
}

/// How a channel is drawn.
#[derive(Debug, Clone, PartialEq)]
pub enum Encoding {
    /// One visual per row of the computed frame (`None` for unmappable values).
    Mapped {
        /// Source field.
        field: String,
        /// Visuals, row-aligned.
        values: Vec<Option<Visual>>,
    },
    /// The same visual for every row.
    Constant(Visual),
}

impl Encoding {
    /// Visual for a row.
    #[must_use]
    pub fn at(&self, row: usize) -> Option<&Visual> {
        match self {
            Encoding::Mapped { values, .. } => values.get(row).and_then(Option::as_ref),
            Encoding::Constant(visual) => Some(visual),
        }
    }
}

/// A layer checked and resolved against its full data.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedLayer {
    /// Layer index.
    pub index: usize,
    /// Geometry kind.
    pub kind: GeomKind,
    /// Stat in effect.
    pub stat: Stat,
    /// Position in effect.
    pub position: Position,
    /// Bindings that produce frame columns.
    pub resolved: ResolvedAes,
    /// Literal visuals.
    pub constants: BTreeMap<Channel, Visual>,
    /// Accepted literal style params.
    pub style: StyleParams,
    /// Degradations found while preparing.
    pub warnings: Vec<Warning>,
}

/// A layer computed for one panel.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedLayer {
    /// Layer index.
    pub index: usize,
    /// Geometry kind.
    pub kind: GeomKind,
    /// Rows in display orientation, columns named after channels.
    pub frame: DataFrame,
    /// Non-positional encodings.
    pub encodings: BTreeMap<Channel, Encoding>,
    /// Literal style params.
    pub style: StyleParams,
    /// Axis whose range must include zero.
    pub zero_axis: Option<Axis>,
    /// Degradations found in this panel.
    pub warnings: Vec<Warning>,
}

impl ComputedLayer {
    /// Finite extent of the positional columns on an axis.
    #[must_use]
    pub fn extent(&self, axis: Axis) -> Option<(f64, f64)> {
        let mut range: Option<(f64, f64)> = None;
        for column in positional_columns(axis) {
            for v in self.frame.get_f64(column).unwrap_or_default() {
                range = Some(range.map_or((v, v), |(lo, hi)| (lo.min(v), hi.max(v))));
            }
        }
        if self.zero_axis == Some(axis) {
            range = range.map(|(lo, hi)| (lo.min(0.0), hi.max(0.0)));
        }
        range
    }
}

/// Resolve and check a layer against its full data.
///
/// # Errors
///
/// [`Error::MissingField`] when x or y names an absent field and
/// [`Error::MissingChannel`] when a required channel is unbound.
pub fn prepare_layer(layer: &Layer, index: usize, data: &DataFrame, ctx: &PipelineContext<'_>) -> Result<PreparedLayer> {
    let kind = layer.kind();
    let info = kind.info();
    let plot_aes = if layer.inherit_aes { ctx.plot_aes.clone() } else { AestheticMap::new() };
    let layer_aes = layer.mapping();
    let merged = Resolver::merge(&plot_aes, &layer_aes);
    let mut resolved = Resolver::new(ctx.config.field_matching).resolve(&plot_aes, &layer_aes, data);
    let mut warnings = resolved.take_notes();
    let mut constants = BTreeMap::new();

    let literals: Vec<(Channel, DataValue)> = resolved
        .bindings()
        .iter()
        .filter_map(|(channel, binding)| match binding {
            Binding::Literal(value) => Some((*channel, value.clone())),
            Binding::Field(_) => None,
        })
        .collect();
    for (channel, value) in literals {
        let named = matches!(merged.get(channel), Some(AesValue::Name(_)));
        if channel.axis().is_some() || channel == Channel::Weight {
            if value.as_f64().is_some() {
                continue;
            }
            resolved.remove(channel);
            if named && matches!(channel, Channel::X | Channel::Y) {
                return Err(Error::MissingField {
                    field: value.to_string(),
                    context: format!("aesthetic '{channel}' of geom_{kind}"),
                    available: data.columns().into_iter().map(str::to_string).collect(),
                });
            }
            warnings.push(literal_warning(channel, &value, named));
            continue;
        }
        resolved.remove(channel);
        if channel == Channel::Group {
            continue;
        }
        match literal_visual(channel, &value) {
            Some(visual) => {
                constants.insert(channel, visual);
            }
            None => warnings.push(literal_warning(channel, &value, named)),
        }
    }

    if let Some((channel, param)) = info.annotation {
        match layer.geom.params.get(param).and_then(StyleValue::as_f64) {
            Some(intercept) => {
                for other in Channel::ALL {
                    if other.axis().is_some() || other == Channel::Group {
                        resolved.remove(other);
                    }
                }
                resolved.insert(channel, Binding::Literal(DataValue::Number(intercept)));
            }
            None if resolved.field(channel).is_none() => {
                return Err(Error::MissingChannel { geom: kind, channel });
            }
            None => {}
        }
    }

    for &channel in info.required {
        if resolved.get(channel).is_none() && !constants.contains_key(&channel) {
            return Err(Error::MissingChannel { geom: kind, channel });
        }
    }

    let mut style = StyleParams::new();
    for (name, value) in &layer.geom.params {
        if kind.supports_param(name) {
            style.insert(name.clone(), value.clone());
        } else {
            warnings.push(Warning::IncompatibleStyleOption { option: name.clone(), target: format!("geom_{kind}") });
        }
    }

    tracing::debug!(layer = index, geom = %kind, bindings = resolved.bindings().len(), "prepared layer");
    Ok(PreparedLayer {
        index,
        kind,
        stat: layer.stat(),
        position: layer.position(),
        resolved,
        constants,
        style,
        warnings,
    })
}

fn literal_warning(channel: Channel, value: &DataValue, named: bool) -> Warning {
    if named {
        Warning::MissingField { channel: channel.to_string(), field: value.to_string() }
    } else {
        Warning::InvalidLiteral { channel: channel.to_string(), value: value.to_string() }
    }
}

fn literal_number(value: &DataValue) -> Option<f64> {
    value.as_f64().or_else(|| value.as_str().and_then(|s| s.trim().parse::<f64>().ok()).filter(|v| v.is_finite()))
}

/// Visual for a literal on a non-positional channel, `None` when unusable.
fn literal_visual(channel: Channel, value: &DataValue) -> Option<Visual> {
    match channel {
        Channel::Color | Channel::Fill => value.as_str().and_then(|s| Rgba::parse(s).ok()).map(Visual::Color),
        Channel::Size => literal_number(value).filter(|v| *v >= 0.0).map(Visual::Number),
        Channel::Alpha => literal_number(value).map(|v| Visual::Number(v.clamp(0.0, 1.0))),
        Channel::Shape => value.as_str().and_then(PointShape::from_name).map(Visual::Shape),
        Channel::Linetype => {
            value.as_str().filter(|s| LINETYPES.contains(s)).map(|s| Visual::Text(s.to_string()))
        }
        Channel::Label => Some(Visual::Text(value.to_string())),
        _ => None,
    }
}

/// Run the pipeline for one panel's slice of a layer's data.
#[must_use]
pub fn compute_layer(prepared: &PreparedLayer, data: &DataFrame, ctx: &PipelineContext<'_>) -> ComputedLayer {
    let mut warnings = Vec::new();
    let mut frame = channel_frame(prepared, data, ctx.scales);

    drop_rows(&mut frame, prepared, &mut warnings, "missing values in required aesthetics", |frame, row| {
        prepared.kind.info().required.iter().any(|c| frame.value(row, c.name()).map_or(false, DataValue::is_missing))
    });
    for axis in [Axis::X, Axis::Y] {
        if ctx.scales.transform(axis) == Transform::Log10 {
            log10_columns(&mut frame, prepared, axis, &mut warnings);
        }
    }

    let x_domain = ctx.scales.continuous(Channel::X).map(|s| s.domain());
    let stat_ctx = StatContext::from_config(ctx.config, prepared.index).with_x_domain(x_domain);
    let output = prepared.stat.compute(&frame, &stat_ctx);
    warnings.extend(output.warnings);
    let mut frame = output.frame;

    for axis in [Axis::X, Axis::Y] {
        map_discrete_positions(&mut frame, axis, ctx.scales);
    }

    let position_ctx = PositionContext {
        subgroup_levels: [Channel::Fill, Channel::Color]
            .into_iter()
            .find_map(|c| ctx.scales.discrete(c).filter(|_| frame.has_column(c.name())))
            .map(|s| s.levels().to_vec())
            .unwrap_or_default(),
        jitter_seed: ctx.config.jitter_seed,
        layer_width: prepared.style.get("width").and_then(|w| w.as_f64()),
    };
    prepared.position.apply(&mut frame, &position_ctx);
    fill_extents(&mut frame, prepared);

    if prepared.kind.info().sorts_by_x {
        sort_by_x(&mut frame);
    }
    let mut zero_axis = prepared.kind.info().includes_zero.then_some(Axis::Y);
    if ctx.coord.is_flipped() {
        flip(&mut frame);
        zero_axis = zero_axis.map(|_| Axis::X);
    }

    let encodings = encode(prepared, &frame, ctx.scales);
    tracing::debug!(layer = prepared.index, geom = %prepared.kind, rows = frame.nrow(), "computed layer");
    ComputedLayer {
        index: prepared.index,
        kind: prepared.kind,
        frame,
        encodings,
        style: prepared.style.clone(),
        zero_axis,
        warnings,
    }
}

/// Frame with one column per bound channel plus `group`.
fn channel_frame(prepared: &PreparedLayer, data: &DataFrame, scales: &ScaleRegistry) -> DataFrame {
    let bindings = prepared.resolved.bindings();
    let has_fields = bindings.values().any(|b| matches!(b, Binding::Field(_)));
    let n = if has_fields { data.nrow() } else { 1 };

    let mut frame = DataFrame::new();
    for (channel, binding) in bindings {
        let values = match binding {
            Binding::Field(field) => data.get(field).map(<[DataValue]>::to_vec).unwrap_or_default(),
            Binding::Literal(value) => vec![value.clone(); n],
        };
        frame.add_column(channel.name(), values);
    }

    let grouping: Vec<&str> = bindings
        .iter()
        .filter(|(channel, binding)| {
            matches!(binding, Binding::Field(_))
                && (**channel == Channel::Group
                    || (channel.axis().is_none() && scales.get(**channel).is_some_and(|s| s.is_discrete())))
        })
        .map(|(channel, _)| channel.name())
        .collect();
    if !grouping.is_empty() {
        let groups: Vec<DataValue> = (0..frame.nrow())
            .map(|row| {
                let key: Vec<String> = grouping
                    .iter()
                    .map(|c| frame.value(row, c).map(DataValue::to_string).unwrap_or_default())
                    .collect();
                DataValue::Text(key.join(&KEY_SEPARATOR.to_string()))
            })
            .collect();
        frame.add_column(GROUP, groups);
    }
    frame
}

fn drop_rows(
    frame: &mut DataFrame,
    prepared: &PreparedLayer,
    warnings: &mut Vec<Warning>,
    reason: &str,
    should_drop: impl Fn(&DataFrame, usize) -> bool,
) {
    let view: &DataFrame = frame;
    let keep: Vec<usize> = (0..view.nrow()).filter(|&row| !should_drop(view, row)).collect();
    let dropped = frame.nrow() - keep.len();
    if dropped > 0 {
        *frame = frame.take_rows(&keep);
        warnings.push(Warning::DroppedRows { layer: prepared.index, count: dropped, reason: reason.to_string() });
    }
}

fn log10_columns(frame: &mut DataFrame, prepared: &PreparedLayer, axis: Axis, warnings: &mut Vec<Warning>) {
    let columns: Vec<&str> = positional_columns(axis).iter().copied().filter(|c| frame.has_column(c)).collect();
    drop_rows(frame, prepared, warnings, "non-positive values on a log10 scale", |frame, row| {
        columns.iter().any(|c| frame.value(row, c).and_then(DataValue::as_f64).is_some_and(|v| v <= 0.0))
    });
    for column in columns {
        let Some(values) = frame.get(column) else { continue };
        let logged = values
            .iter()
            .map(|v| v.as_f64().map_or_else(|| v.clone(), |x| DataValue::Number(x.log10())))
            .collect();
        frame.add_column(column, logged);
    }
}

fn map_discrete_positions(frame: &mut DataFrame, axis: Axis, scales: &ScaleRegistry) {
    let Some(scale) = scales.discrete(match axis {
        Axis::X => Channel::X,
        Axis::Y => Channel::Y,
    }) else {
        return;
    };
    for column in positional_columns(axis) {
        let Some(values) = frame.get(column) else { continue };
        let mapped = values
            .iter()
            .map(|v| match v {
                DataValue::Number(_) | DataValue::Null => v.clone(),
                _ => scale.position(v).map_or(DataValue::Null, DataValue::Number),
            })
            .collect();
        frame.add_column(column, mapped);
    }
}

/// Rectangle extents for bar-like geometries that position did not set.
fn fill_extents(frame: &mut DataFrame, prepared: &PreparedLayer) {
    let bar_like = matches!(
        prepared.kind,
        GeomKind::Bar
            | GeomKind::Col
            | GeomKind::Histogram
            | GeomKind::Boxplot
            | GeomKind::Violin
            | GeomKind::Tile
            | GeomKind::Errorbar
    );
    if !bar_like || frame.is_empty() {
        return;
    }
    let width = prepared.style.get("width").and_then(|w| w.as_f64()).unwrap_or(DEFAULT_BAR_WIDTH);
    if !frame.has_column("xmin") || !frame.has_column("xmax") {
        if let Some(xs) = frame.numeric("x") {
            let half = |sign: f64| -> Vec<DataValue> {
                xs.iter().map(|x| x.map_or(DataValue::Null, |x| DataValue::Number(x + sign * width / 2.0))).collect()
            };
            frame.add_column("xmin", half(-1.0));
            frame.add_column("xmax", half(1.0));
        }
    }
    if prepared.kind == GeomKind::Tile && !frame.has_column("ymin") {
        let height = prepared.style.get("height").and_then(|h| h.as_f64()).unwrap_or(1.0);
        if let Some(ys) = frame.numeric("y") {
            let half = |sign: f64| -> Vec<DataValue> {
                ys.iter().map(|y| y.map_or(DataValue::Null, |y| DataValue::Number(y + sign * height / 2.0))).collect()
            };
            frame.add_column("ymin", half(-1.0));
            frame.add_column("ymax", half(1.0));
        }
    }
    if matches!(prepared.kind, GeomKind::Bar | GeomKind::Col | GeomKind::Histogram) && !frame.has_column("ymin") {
        if let Some(ys) = frame.get("y") {
            let ymax = ys.to_vec();
            frame.add_column("ymin", vec![DataValue::Number(0.0); frame.nrow()]);
            frame.add_column("ymax", ymax);
        }
    }
}

/// Stable sort by x within groups; groups keep first-seen order.
fn sort_by_x(frame: &mut DataFrame) {
    let Some(xs) = frame.numeric("x") else { return };
    let mut group_rank: IndexMap<LevelKey, usize> = IndexMap::new();
    let ranks: Vec<usize> = (0..frame.nrow())
        .map(|row| {
            let key = frame.value(row, GROUP).map_or(LevelKey::Null, DataValue::level_key);
            let next = group_rank.len();
            *group_rank.entry(key).or_insert(next)
        })
        .collect();
    let mut order: Vec<usize> = (0..frame.nrow()).collect();
    order.sort_by(|&a, &b| {
        ranks[a].cmp(&ranks[b]).then_with(|| match (xs[a], xs[b]) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
    });
    *frame = frame.take_rows(&order);
}

/// Swap x and y columns with their companions.
fn flip(frame: &mut DataFrame) {
    for (x, y) in X_COLUMNS.iter().zip(Y_COLUMNS) {
        let tmp = format!("{x}\u{1f}flip");
        frame.rename_column(x, &tmp);
        frame.rename_column(y, x);
        frame.rename_column(&tmp, y);
    }
}

fn encode(prepared: &PreparedLayer, frame: &DataFrame, scales: &ScaleRegistry) -> BTreeMap<Channel, Encoding> {
    let mut encodings: BTreeMap<Channel, Encoding> =
        prepared.constants.iter().map(|(channel, visual)| (*channel, Encoding::Constant(visual.clone()))).collect();
    for (channel, binding) in prepared.resolved.bindings() {
        let Binding::Field(field) = binding else { continue };
        if channel.axis().is_some() || matches!(channel, Channel::Group | Channel::Weight) {
            continue;
        }
        let Some(column) = frame.get(channel.name()) else { continue };
        let values = column
            .iter()
            .map(|value| match channel {
                Channel::Label => (!value.is_missing()).then(|| Visual::Text(value.to_string())),
                Channel::Color | Channel::Fill => {
                    Some(scales.map(*channel, value).unwrap_or(Visual::Color(NA_COLOR)))
                }
                _ => scales.map(*channel, value),
            })
            .collect();
        encodings.insert(*channel, Encoding::Mapped { field: field.clone(), values });
    }
    encodings
}
