//! Scale declarations and the trained scale registry.
//!
//! Scales are trained once over every layer's full dataset before any
//! faceting, so a level keeps the same color, shape or position in every
//! panel. Discrete levels keep first-seen order across layers, which is also
//! the order the `count` stat emits.

use std::collections::BTreeMap;

use indexmap::IndexSet;

use crate::color::Rgba;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::grammar::aes::{Axis, Channel, ResolvedAes};
use crate::grammar::data::{DataFrame, DataValue, LevelKey};
use crate::grammar::geom::PointShape;
use crate::palette::PaletteRegistry;
use crate::scale::{widen_degenerate, ColorScale, LinearScale, LogScale, Scale};

/// Color for values outside a scale's levels or missing values.
pub const NA_COLOR: Rgba = Rgba::rgb(127, 127, 127);

/// Default output range of a size scale.
pub const DEFAULT_SIZE_RANGE: (f64, f64) = (1.0, 6.0);

/// Default output range of an alpha scale.
pub const DEFAULT_ALPHA_RANGE: (f64, f64) = (0.1, 1.0);

/// Line types in discrete-scale order.
pub const LINETYPES: [&str; 6] = ["solid", "dashed", "dotted", "dotdash", "longdash", "twodash"];

/// Where a scale's colors come from.
#[derive(Debug, Clone, PartialEq)]
pub enum PaletteRef {
    /// Palette registered under a name.
    Named(String),
    /// Explicit color list.
    Manual(Vec<Rgba>),
}

/// Value transformation applied before mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transform {
    /// Values used as-is.
    #[default]
    Identity,
    /// Base-10 logarithm; non-positive values are dropped.
    Log10,
}

impl Transform {
    /// Transform a value, `None` when it has no image.
    #[must_use]
    pub fn apply(self, value: f64) -> Option<f64> {
        match self {
            Transform::Identity => value.is_finite().then_some(value),
            Transform::Log10 => (value > 0.0 && value.is_finite()).then(|| value.log10()),
        }
    }

    /// Map a transformed value back.
    #[must_use]
    pub fn invert(self, value: f64) -> f64 {
        match self {
            Transform::Identity => value,
            Transform::Log10 => 10f64.powf(value),
        }
    }
}

/// Explicit scale domain.
#[derive(Debug, Clone, PartialEq)]
pub enum Limits {
    /// Level list, in display order.
    Discrete(Vec<DataValue>),
    /// Closed interval in data units.
    Continuous(f64, f64),
}

/// Discrete or continuous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleType {
    /// Distinct levels.
    Discrete,
    /// Numeric interval.
    Continuous,
}

/// A scale declaration attached to a plot.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleSpec {
    /// Channel the scale governs.
    pub channel: Channel,
    /// Forced type (inferred from the data when `None`).
    pub scale_type: Option<ScaleType>,
    /// Color source for color and fill.
    pub palette: Option<PaletteRef>,
    /// Explicit domain.
    pub limits: Option<Limits>,
    /// Value transformation.
    pub transform: Transform,
    /// Output range for size, alpha and position.
    pub range: Option<(f64, f64)>,
    /// Shape order for shape scales.
    pub shapes: Option<Vec<PointShape>>,
    /// Axis or legend title.
    pub title: Option<String>,
}

impl ScaleSpec {
    /// Empty declaration for a channel.
    #[must_use]
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            scale_type: None,
            palette: None,
            limits: None,
            transform: Transform::Identity,
            range: None,
            shapes: None,
            title: None,
        }
    }

    /// Color scale using a named palette.
    #[must_use]
    pub fn color_palette(name: &str) -> Self {
        Self::new(Channel::Color).palette(name)
    }

    /// Fill scale using a named palette.
    #[must_use]
    pub fn fill_palette(name: &str) -> Self {
        Self::new(Channel::Fill).palette(name)
    }

    /// Color scale with explicit values.
    #[must_use]
    pub fn color_manual(colors: Vec<Rgba>) -> Self {
        Self::new(Channel::Color).manual(colors)
    }

    /// Fill scale with explicit values.
    #[must_use]
    pub fn fill_manual(colors: Vec<Rgba>) -> Self {
        Self::new(Channel::Fill).manual(colors)
    }

    /// Shape scale with explicit values.
    #[must_use]
    pub fn shape_manual(shapes: Vec<PointShape>) -> Self {
        Self::new(Channel::Shape).shapes(shapes)
    }

    /// Log-10 x axis.
    #[must_use]
    pub fn x_log10() -> Self {
        Self::new(Channel::X).log10()
    }

    /// Log-10 y axis.
    #[must_use]
    pub fn y_log10() -> Self {
        Self::new(Channel::Y).log10()
    }

    /// Size scale with an output range.
    #[must_use]
    pub fn size_range(lo: f64, hi: f64) -> Self {
        Self::new(Channel::Size).range(lo, hi)
    }

    /// Alpha scale with an output range.
    #[must_use]
    pub fn alpha_range(lo: f64, hi: f64) -> Self {
        Self::new(Channel::Alpha).range(lo, hi)
    }

    /// Force a discrete scale.
    #[must_use]
    pub fn discrete(mut self) -> Self {
        self.scale_type = Some(ScaleType::Discrete);
        self
    }

    /// Force a continuous scale.
    #[must_use]
    pub fn continuous(mut self) -> Self {
        self.scale_type = Some(ScaleType::Continuous);
        self
    }

    /// Use a named palette.
    #[must_use]
    pub fn palette(mut self, name: &str) -> Self {
        self.palette = Some(PaletteRef::Named(name.to_string()));
        self
    }

    /// Use explicit colors.
    #[must_use]
    pub fn manual(mut self, colors: Vec<Rgba>) -> Self {
        self.palette = Some(PaletteRef::Manual(colors));
        self
    }

    /// Fix the discrete levels.
    #[must_use]
    pub fn discrete_limits<V: Into<DataValue>>(mut self, levels: impl IntoIterator<Item = V>) -> Self {
        self.limits = Some(Limits::Discrete(levels.into_iter().map(Into::into).collect()));
        self
    }

    /// Fix the continuous domain.
    #[must_use]
    pub fn continuous_limits(mut self, lo: f64, hi: f64) -> Self {
        self.limits = Some(Limits::Continuous(lo, hi));
        self
    }

    /// Apply a base-10 log transform.
    #[must_use]
    pub fn log10(mut self) -> Self {
        self.transform = Transform::Log10;
        self
    }

    /// Set the output range.
    #[must_use]
    pub fn range(mut self, lo: f64, hi: f64) -> Self {
        self.range = Some((lo, hi));
        self
    }

    /// Set the shape order.
    #[must_use]
    pub fn shapes(mut self, shapes: Vec<PointShape>) -> Self {
        self.shapes = Some(shapes);
        self
    }

    /// Set the title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Check the declaration against the palette registry.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownPalette`] for an unregistered name, [`Error::ScaleDomain`]
    /// for empty value lists and invalid limits or ranges.
    pub fn validate(&self, palettes: &PaletteRegistry) -> Result<()> {
        match &self.palette {
            Some(PaletteRef::Named(name)) => {
                palettes.get(name)?;
            }
            Some(PaletteRef::Manual(colors)) if colors.is_empty() => {
                return Err(Error::ScaleDomain(format!("manual {} scale has no values", self.channel)));
            }
            _ => {}
        }
        if let Some(Limits::Continuous(lo, hi)) = self.limits {
            if !(lo.is_finite() && hi.is_finite() && lo < hi) {
                return Err(Error::ScaleDomain(format!("limits ({lo}, {hi}) for {} are not an interval", self.channel)));
            }
            if self.transform == Transform::Log10 && lo <= 0.0 {
                return Err(Error::ScaleDomain(format!("log10 limits for {} must be positive", self.channel)));
            }
        }
        if let Some((lo, hi)) = self.range {
            if !(lo.is_finite() && hi.is_finite()) {
                return Err(Error::ScaleDomain(format!("range for {} is not finite", self.channel)));
            }
        }
        if matches!(&self.shapes, Some(shapes) if shapes.is_empty()) {
            return Err(Error::ScaleDomain("shape scale has no values".to_string()));
        }
        if self.transform == Transform::Log10 && self.scale_type == Some(ScaleType::Discrete) {
            return Err(Error::ScaleDomain(format!("log10 {} scale cannot be discrete", self.channel)));
        }
        Ok(())
    }
}

/// A visual value produced by a scale.
#[derive(Debug, Clone, PartialEq)]
pub enum Visual {
    /// A color.
    Color(Rgba),
    /// A size, opacity or position.
    Number(f64),
    /// A point shape.
    Shape(PointShape),
    /// A line type or label.
    Text(String),
}

/// Scale over distinct levels.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteScale {
    channel: Channel,
    levels: Vec<LevelKey>,
    colors: Vec<Rgba>,
    shapes: Vec<PointShape>,
    range: (f64, f64),
}

impl DiscreteScale {
    /// Channel.
    #[must_use]
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Levels in scale order.
    #[must_use]
    pub fn levels(&self) -> &[LevelKey] {
        &self.levels
    }

    /// Colors assigned cyclically to levels.
    #[must_use]
    pub fn colors(&self) -> &[Rgba] {
        &self.colors
    }

    /// Index of a value among the levels.
    #[must_use]
    pub fn index(&self, value: &DataValue) -> Option<usize> {
        let key = value.level_key();
        self.levels.iter().position(|l| *l == key)
    }

    /// Color for a value: `palette[i mod len]`, [`NA_COLOR`] for unknown values.
    #[must_use]
    pub fn color(&self, value: &DataValue) -> Rgba {
        match (self.index(value), self.colors.is_empty()) {
            (Some(i), false) => self.colors[i % self.colors.len()],
            _ => NA_COLOR,
        }
    }

    /// Shape for a value, cycling through the shape list.
    #[must_use]
    pub fn shape(&self, value: &DataValue) -> PointShape {
        match (self.index(value), self.shapes.is_empty()) {
            (Some(i), false) => self.shapes[i % self.shapes.len()],
            _ => PointShape::default(),
        }
    }

    /// Evenly spaced number over the output range.
    #[must_use]
    pub fn number(&self, value: &DataValue) -> Option<f64> {
        let i = self.index(value)?;
        let n = self.levels.len();
        if n <= 1 {
            return Some(self.range.1);
        }
        let t = i as f64 / (n - 1) as f64;
        Some(self.range.0 + t * (self.range.1 - self.range.0))
    }

    /// One-based axis position.
    #[must_use]
    pub fn position(&self, value: &DataValue) -> Option<f64> {
        self.index(value).map(|i| (i + 1) as f64)
    }

    /// Map a value for this scale's channel.
    #[must_use]
    pub fn map(&self, value: &DataValue) -> Option<Visual> {
        match self.channel {
            Channel::Color | Channel::Fill => Some(Visual::Color(self.color(value))),
            Channel::Shape => Some(Visual::Shape(self.shape(value))),
            Channel::Linetype => {
                self.index(value).map(|i| Visual::Text(LINETYPES[i % LINETYPES.len()].to_string()))
            }
            Channel::Size | Channel::Alpha => self.number(value).map(Visual::Number),
            c if c.axis().is_some() => self.position(value).map(Visual::Number),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum NumberMap {
    Linear(LinearScale),
    Log(LogScale),
}

/// Scale over a numeric interval.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuousScale {
    channel: Channel,
    domain: (f64, f64),
    transform: Transform,
    numbers: NumberMap,
    colors: Option<ColorScale>,
}

impl ContinuousScale {
    /// Channel.
    #[must_use]
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Domain in transformed units.
    #[must_use]
    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    /// Value transformation.
    #[must_use]
    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// Color stops, for color and fill scales.
    #[must_use]
    pub fn stops(&self) -> &[Rgba] {
        self.colors.as_ref().map_or(&[], ColorScale::stops)
    }

    /// Color for a raw value; clamps outside the domain.
    #[must_use]
    pub fn color(&self, value: f64) -> Rgba {
        match (&self.colors, self.transform.apply(value)) {
            (Some(scale), Some(v)) => scale.scale(v),
            _ => NA_COLOR,
        }
    }

    /// Output-range number for a raw value; clamps outside the domain.
    #[must_use]
    pub fn number(&self, value: f64) -> Option<f64> {
        self.transform.apply(value)?;
        Some(match &self.numbers {
            NumberMap::Linear(scale) => scale.scale(value),
            NumberMap::Log(scale) => scale.scale(value),
        })
    }

    /// Map a value for this scale's channel.
    #[must_use]
    pub fn map(&self, value: &DataValue) -> Option<Visual> {
        let v = value.as_f64()?;
        match self.channel {
            Channel::Color | Channel::Fill => Some(Visual::Color(self.color(v))),
            Channel::Size | Channel::Alpha => self.number(v).map(Visual::Number),
            c if c.axis().is_some() => self.transform.apply(v).map(Visual::Number),
            _ => None,
        }
    }
}

/// A scale after training.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainedScale {
    /// Distinct levels.
    Discrete(DiscreteScale),
    /// Numeric interval.
    Continuous(ContinuousScale),
}

impl TrainedScale {
    /// Channel.
    #[must_use]
    pub fn channel(&self) -> Channel {
        match self {
            TrainedScale::Discrete(s) => s.channel,
            TrainedScale::Continuous(s) => s.channel,
        }
    }

    /// Whether the scale is discrete.
    #[must_use]
    pub fn is_discrete(&self) -> bool {
        matches!(self, TrainedScale::Discrete(_))
    }

    /// Map a value for this scale's channel.
    #[must_use]
    pub fn map(&self, value: &DataValue) -> Option<Visual> {
        match self {
            TrainedScale::Discrete(s) => s.map(value),
            TrainedScale::Continuous(s) => s.map(value),
        }
    }
}

/// Legend body.
#[derive(Debug, Clone, PartialEq)]
pub enum LegendKind {
    /// One key per level.
    Discrete(Vec<(String, Visual)>),
    /// Color bar or size ramp over a domain.
    Continuous {
        /// Domain in data units.
        domain: (f64, f64),
        /// Color stops (empty for size and alpha).
        stops: Vec<Rgba>,
    },
}

/// Legend for a non-positional scale.
#[derive(Debug, Clone, PartialEq)]
pub struct Legend {
    /// Channel.
    pub channel: Channel,
    /// Title.
    pub title: String,
    /// Keys.
    pub kind: LegendKind,
}

/// A layer's data and resolved bindings, as seen by training.
#[derive(Debug, Clone, Copy)]
pub struct TrainingInput<'a> {
    /// Full layer data.
    pub data: &'a DataFrame,
    /// Resolved bindings.
    pub aes: &'a ResolvedAes,
}

const TRAINED: [Channel; 8] = [
    Channel::X,
    Channel::Y,
    Channel::Color,
    Channel::Fill,
    Channel::Size,
    Channel::Shape,
    Channel::Alpha,
    Channel::Linetype,
];

/// Trained scales for every mapped channel.
///
/// Read-only once trained; panels share it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScaleRegistry {
    scales: BTreeMap<Channel, TrainedScale>,
    titles: BTreeMap<Channel, String>,
}

impl ScaleRegistry {
    /// Train scales over the full data of every layer.
    ///
    /// Position scales are fed by every channel on their axis (`xmin` feeds
    /// `x`); other channels train on their own bindings.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownPalette`] for an unresolvable palette and
    /// [`Error::ScaleDomain`] when text lands on a continuous scale.
    pub fn train(
        inputs: &[TrainingInput<'_>],
        specs: &[ScaleSpec],
        palettes: &PaletteRegistry,
        config: &Config,
    ) -> Result<Self> {
        let mut registry = Self::default();
        for channel in TRAINED {
            let spec = specs.iter().rev().find(|s| s.channel == channel);
            let feeds: Vec<Channel> = match channel.axis() {
                Some(axis) => Channel::ALL.into_iter().filter(|c| c.axis() == Some(axis)).collect(),
                None => vec![channel],
            };

            let mut values: Vec<&DataValue> = Vec::new();
            let mut title = None;
            for input in inputs {
                for feed in &feeds {
                    let Some(field) = input.aes.field(*feed) else { continue };
                    title.get_or_insert_with(|| field.to_string());
                    if let Some(column) = input.data.get(field) {
                        values.extend(column.iter().filter(|v| !v.is_missing()));
                    }
                }
            }
            if title.is_none() && spec.map_or(true, |s| s.limits.is_none()) {
                continue;
            }
            if let Some(t) = spec.and_then(|s| s.title.clone()).or(title) {
                registry.titles.insert(channel, t);
            }

            let scale = train_one(channel, &values, spec, palettes, config)?;
            tracing::debug!(channel = %channel, discrete = scale.is_discrete(), "trained scale");
            registry.scales.insert(channel, scale);
        }
        Ok(registry)
    }

    /// Trained scale for a channel.
    #[must_use]
    pub fn get(&self, channel: Channel) -> Option<&TrainedScale> {
        self.scales.get(&channel)
    }

    /// Discrete scale for a channel.
    #[must_use]
    pub fn discrete(&self, channel: Channel) -> Option<&DiscreteScale> {
        match self.scales.get(&channel) {
            Some(TrainedScale::Discrete(s)) => Some(s),
            _ => None,
        }
    }

    /// Continuous scale for a channel.
    #[must_use]
    pub fn continuous(&self, channel: Channel) -> Option<&ContinuousScale> {
        match self.scales.get(&channel) {
            Some(TrainedScale::Continuous(s)) => Some(s),
            _ => None,
        }
    }

    /// Position scale of an axis.
    #[must_use]
    pub fn axis(&self, axis: Axis) -> Option<&TrainedScale> {
        self.get(match axis {
            Axis::X => Channel::X,
            Axis::Y => Channel::Y,
        })
    }

    /// Transform of an axis.
    #[must_use]
    pub fn transform(&self, axis: Axis) -> Transform {
        match self.axis(axis) {
            Some(TrainedScale::Continuous(s)) => s.transform,
            _ => Transform::Identity,
        }
    }

    /// Map a value through a channel's scale.
    #[must_use]
    pub fn map(&self, channel: Channel, value: &DataValue) -> Option<Visual> {
        self.scales.get(&channel)?.map(value)
    }

    /// Title of a channel (scale title, else first bound field).
    #[must_use]
    pub fn title(&self, channel: Channel) -> Option<&str> {
        self.titles.get(&channel).map(String::as_str)
    }

    /// Trained scales in channel order.
    pub fn iter(&self) -> impl Iterator<Item = &TrainedScale> {
        self.scales.values()
    }

    /// Legends for every non-positional scale, titles overridden by `labels`.
    #[must_use]
    pub fn legends(&self, labels: &BTreeMap<Channel, String>) -> Vec<Legend> {
        self.scales
            .iter()
            .filter(|(channel, _)| channel.axis().is_none())
            .map(|(channel, scale)| {
                let title =
                    labels.get(channel).cloned().or_else(|| self.titles.get(channel).cloned()).unwrap_or_default();
                let kind = match scale {
                    TrainedScale::Discrete(s) => LegendKind::Discrete(
                        s.levels
                            .iter()
                            .filter_map(|level| {
                                let value = level.to_value();
                                s.map(&value).map(|visual| (value.to_string(), visual))
                            })
                            .collect(),
                    ),
                    TrainedScale::Continuous(s) => LegendKind::Continuous {
                        domain: (s.transform.invert(s.domain.0), s.transform.invert(s.domain.1)),
                        stops: s.stops().to_vec(),
                    },
                };
                Legend { channel: *channel, title, kind }
            })
            .collect()
    }
}

fn train_one(
    channel: Channel,
    values: &[&DataValue],
    spec: Option<&ScaleSpec>,
    palettes: &PaletteRegistry,
    config: &Config,
) -> Result<TrainedScale> {
    let forced = spec.and_then(|s| s.scale_type).or(match spec.and_then(|s| s.limits.as_ref()) {
        Some(Limits::Discrete(_)) => Some(ScaleType::Discrete),
        Some(Limits::Continuous(..)) => Some(ScaleType::Continuous),
        None => None,
    });
    let always_discrete = matches!(channel, Channel::Shape | Channel::Linetype);
    let all_numeric = values.iter().all(|v| matches!(v, DataValue::Number(_)));
    let scale_type = match forced {
        Some(ScaleType::Continuous) if always_discrete => {
            return Err(Error::ScaleDomain(format!("{channel} scale cannot be continuous")));
        }
        Some(t) => t,
        None if always_discrete || !all_numeric => ScaleType::Discrete,
        None => ScaleType::Continuous,
    };

    match scale_type {
        ScaleType::Discrete => train_discrete(channel, values, spec, palettes, config).map(TrainedScale::Discrete),
        ScaleType::Continuous => {
            if let Some(text) = values.iter().find(|v| !matches!(v, DataValue::Number(_))) {
                return Err(Error::ScaleDomain(format!(
                    "continuous {channel} scale cannot map non-numeric value '{text}'"
                )));
            }
            train_continuous(channel, values, spec, palettes, config).map(TrainedScale::Continuous)
        }
    }
}

fn train_discrete(
    channel: Channel,
    values: &[&DataValue],
    spec: Option<&ScaleSpec>,
    palettes: &PaletteRegistry,
    config: &Config,
) -> Result<DiscreteScale> {
    let levels: Vec<LevelKey> = match spec.and_then(|s| s.limits.as_ref()) {
        Some(Limits::Discrete(levels)) => levels.iter().map(DataValue::level_key).collect(),
        _ => values.iter().map(|v| v.level_key()).collect::<IndexSet<_>>().into_iter().collect(),
    };
    let colors = match channel {
        Channel::Color | Channel::Fill => {
            resolve_colors(spec.and_then(|s| s.palette.as_ref()), &config.palettes.discrete, palettes)?
        }
        _ => Vec::new(),
    };
    let shapes = spec.and_then(|s| s.shapes.clone()).unwrap_or_else(|| PointShape::ALL.to_vec());
    let range = spec.and_then(|s| s.range).unwrap_or_else(|| default_range(channel));
    Ok(DiscreteScale { channel, levels, colors, shapes, range })
}

fn train_continuous(
    channel: Channel,
    values: &[&DataValue],
    spec: Option<&ScaleSpec>,
    palettes: &PaletteRegistry,
    config: &Config,
) -> Result<ContinuousScale> {
    let transform = spec.map_or(Transform::Identity, |s| s.transform);
    let domain = match spec.and_then(|s| s.limits.as_ref()) {
        Some(Limits::Continuous(lo, hi)) => match (transform.apply(*lo), transform.apply(*hi)) {
            (Some(lo), Some(hi)) => (lo, hi),
            _ => return Err(Error::ScaleDomain(format!("limits for {channel} have no {transform:?} image"))),
        },
        _ => values
            .iter()
            .filter_map(|v| v.as_f64().and_then(|x| transform.apply(x)))
            .fold(None, |acc: Option<(f64, f64)>, v| Some(acc.map_or((v, v), |(lo, hi)| (lo.min(v), hi.max(v)))))
            .unwrap_or((0.0, 1.0)),
    };
    let domain = widen_degenerate(domain);
    let range = spec.and_then(|s| s.range).unwrap_or_else(|| default_range(channel));

    let numbers = match transform {
        Transform::Identity => NumberMap::Linear(LinearScale::new(domain, range)?),
        Transform::Log10 => NumberMap::Log(LogScale::new(
            (transform.invert(domain.0), transform.invert(domain.1)),
            range,
        )?),
    };
    let colors = match channel {
        Channel::Color | Channel::Fill => {
            let stops =
                resolve_colors(spec.and_then(|s| s.palette.as_ref()), &config.palettes.continuous, palettes)?;
            Some(ColorScale::new(stops, domain)?)
        }
        _ => None,
    };
    Ok(ContinuousScale { channel, domain, transform, numbers, colors })
}

fn resolve_colors(palette: Option<&PaletteRef>, default: &str, palettes: &PaletteRegistry) -> Result<Vec<Rgba>> {
    match palette {
        Some(PaletteRef::Manual(colors)) => Ok(colors.clone()),
        Some(PaletteRef::Named(name)) => Ok(palettes.get(name)?.colors().to_vec()),
        None => Ok(palettes.get(default)?.colors().to_vec()),
    }
}

fn default_range(channel: Channel) -> (f64, f64) {
    match channel {
        Channel::Size => DEFAULT_SIZE_RANGE,
        Channel::Alpha => DEFAULT_ALPHA_RANGE,
        _ => (0.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::aes::{AestheticMap, Resolver};
    use approx::assert_relative_eq;

    fn train(data: &DataFrame, aes: AestheticMap, specs: &[ScaleSpec]) -> Result<ScaleRegistry> {
        let resolved = Resolver::default().resolve(&aes, &AestheticMap::new(), data);
        ScaleRegistry::train(
            &[TrainingInput { data, aes: &resolved }],
            specs,
            &PaletteRegistry::builtin(),
            &Config::default(),
        )
    }

    #[test]
    fn test_discrete_first_seen_order() {
        let data = DataFrame::new().with_column("x", [1.0, 2.0, 3.0, 4.0]).with_column("g", ["A", "A", "B", "B"]);
        let scales = train(&data, AestheticMap::new().x("x").color("g"), &[]).expect("operation should succeed");
        let palette = PaletteRegistry::builtin();
        let colors = palette.get("category10").expect("builtin").colors();
        let color = scales.discrete(Channel::Color).expect("discrete color");
        assert_eq!(color.color(&"A".into()), colors[0]);
        assert_eq!(color.color(&"B".into()), colors[1]);
        assert_eq!(color.color(&"C".into()), NA_COLOR);
        assert!(scales.continuous(Channel::X).is_some());
    }

    #[test]
    fn test_discrete_colors_cycle() {
        let levels: Vec<String> = (0..12).map(|i| format!("l{i}")).collect();
        let data = DataFrame::new().with_column("g", levels.clone());
        let scales = train(&data, AestheticMap::new().fill("g"), &[ScaleSpec::fill_palette("set2")])
            .expect("operation should succeed");
        let fill = scales.discrete(Channel::Fill).expect("discrete fill");
        let n = fill.colors().len();
        assert_eq!(fill.color(&levels[0].as_str().into()), fill.color(&levels[n].as_str().into()));
    }

    #[test]
    fn test_unknown_palette_is_error() {
        let data = DataFrame::new().with_column("g", ["a"]);
        let err = train(&data, AestheticMap::new().color("g"), &[ScaleSpec::color_palette("doesnotexist")])
            .expect_err("should fail");
        assert!(matches!(err, Error::UnknownPalette { .. }));
    }

    #[test]
    fn test_continuous_color_clamps() {
        let data = DataFrame::new().with_column("v", [0.0, 10.0]);
        let scales = train(&data, AestheticMap::new().color("v"), &[]).expect("operation should succeed");
        let color = scales.continuous(Channel::Color).expect("continuous color");
        assert_eq!(color.color(-5.0), color.color(0.0));
        assert_eq!(color.color(50.0), *color.stops().last().expect("stops"));
    }

    #[test]
    fn test_text_on_continuous_scale_is_error() {
        let data = DataFrame::new().with_column("v", ["a", "b"]);
        let err = train(&data, AestheticMap::new().size("v"), &[ScaleSpec::new(Channel::Size).continuous()])
            .expect_err("should fail");
        assert!(matches!(err, Error::ScaleDomain(_)));
    }

    #[test]
    fn test_log10_domain_skips_non_positive() {
        let data = DataFrame::new().with_column("x", [-1.0, 0.0, 10.0, 1000.0]);
        let scales = train(&data, AestheticMap::new().x("x"), &[ScaleSpec::x_log10()]).expect("operation should succeed");
        let x = scales.continuous(Channel::X).expect("continuous x");
        assert_relative_eq!(x.domain().0, 1.0, epsilon = 1e-12);
        assert_relative_eq!(x.domain().1, 3.0, epsilon = 1e-12);
        assert_eq!(scales.transform(Axis::X), Transform::Log10);
    }

    #[test]
    fn test_size_range_and_discrete_limits() {
        let data = DataFrame::new().with_column("s", [1.0, 3.0]).with_column("g", ["b", "a"]);
        let scales = train(
            &data,
            AestheticMap::new().size("s").shape("g"),
            &[ScaleSpec::size_range(2.0, 4.0), ScaleSpec::new(Channel::Shape).discrete_limits(["a", "b"])],
        )
        .expect("operation should succeed");
        let size = scales.continuous(Channel::Size).expect("size");
        assert_relative_eq!(size.number(2.0).expect("mapped"), 3.0);
        assert_eq!(scales.map(Channel::Shape, &"a".into()), Some(Visual::Shape(PointShape::ALL[0])));
    }

    #[test]
    fn test_legend_titles() {
        let data = DataFrame::new().with_column("g", ["a", "b"]);
        let scales = train(&data, AestheticMap::new().fill("g"), &[]).expect("operation should succeed");
        let mut labels = BTreeMap::new();
        labels.insert(Channel::Fill, "Group".to_string());
        let legends = scales.legends(&labels);
        assert_eq!(legends.len(), 1);
        assert_eq!(legends[0].title, "Group");
        assert!(matches!(&legends[0].kind, LegendKind::Discrete(keys) if keys.len() == 2));
    }

    #[test]
    fn test_validate() {
        let palettes = PaletteRegistry::builtin();
        assert!(ScaleSpec::color_manual(vec![]).validate(&palettes).is_err());
        assert!(ScaleSpec::x_log10().continuous_limits(0.0, 10.0).validate(&palettes).is_err());
        assert!(ScaleSpec::fill_palette("viridis").validate(&palettes).is_ok());
    }
}
