//! Aesthetic mappings and their resolution.
//!
//! An [`AestheticMap`] binds visual channels to either a name (which the
//! [`Resolver`] classifies as a field reference or a literal once the active
//! dataset is known) or an explicit literal value.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::config::FieldMatching;
use crate::grammar::data::{DataFrame, DataValue};
use crate::warning::Warning;

/// A visual channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Channel {
    /// Horizontal position.
    X,
    /// Vertical position.
    Y,
    /// Lower x bound.
    Xmin,
    /// Upper x bound.
    Xmax,
    /// Lower y bound.
    Ymin,
    /// Upper y bound.
    Ymax,
    /// Segment end x.
    Xend,
    /// Segment end y.
    Yend,
    /// Stroke color.
    Color,
    /// Fill color.
    Fill,
    /// Mark size.
    Size,
    /// Point shape.
    Shape,
    /// Opacity.
    Alpha,
    /// Line dash pattern.
    Linetype,
    /// Explicit grouping.
    Group,
    /// Text label.
    Label,
    /// Observation weight for counting stats.
    Weight,
}

impl Channel {
    /// Every channel, in declaration order.
    pub const ALL: [Channel; 17] = [
        Channel::X,
        Channel::Y,
        Channel::Xmin,
        Channel::Xmax,
        Channel::Ymin,
        Channel::Ymax,
        Channel::Xend,
        Channel::Yend,
        Channel::Color,
        Channel::Fill,
        Channel::Size,
        Channel::Shape,
        Channel::Alpha,
        Channel::Linetype,
        Channel::Group,
        Channel::Label,
        Channel::Weight,
    ];

    /// Lower-case channel name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Channel::X => "x",
            Channel::Y => "y",
            Channel::Xmin => "xmin",
            Channel::Xmax => "xmax",
            Channel::Ymin => "ymin",
            Channel::Ymax => "ymax",
            Channel::Xend => "xend",
            Channel::Yend => "yend",
            Channel::Color => "color",
            Channel::Fill => "fill",
            Channel::Size => "size",
            Channel::Shape => "shape",
            Channel::Alpha => "alpha",
            Channel::Linetype => "linetype",
            Channel::Group => "group",
            Channel::Label => "label",
            Channel::Weight => "weight",
        }
    }

    /// Channels placed on the x or y axis.
    #[must_use]
    pub fn is_positional(self) -> bool {
        self.axis().is_some()
    }

    /// Axis a positional channel belongs to.
    #[must_use]
    pub fn axis(self) -> Option<Axis> {
        match self {
            Channel::X | Channel::Xmin | Channel::Xmax | Channel::Xend => Some(Axis::X),
            Channel::Y | Channel::Ymin | Channel::Ymax | Channel::Yend => Some(Axis::Y),
            _ => None,
        }
    }

    /// The x/y counterpart used by coordinate flipping.
    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            Channel::X => Channel::Y,
            Channel::Y => Channel::X,
            Channel::Xmin => Channel::Ymin,
            Channel::Ymin => Channel::Xmin,
            Channel::Xmax => Channel::Ymax,
            Channel::Ymax => Channel::Xmax,
            Channel::Xend => Channel::Yend,
            Channel::Yend => Channel::Xend,
            other => other,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "colour" => Ok(Channel::Color),
            _ => Channel::ALL
                .into_iter()
                .find(|c| c.name() == s)
                .ok_or_else(|| format!("unknown channel '{s}'")),
        }
    }
}

/// Position axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Axis {
    /// Horizontal.
    X,
    /// Vertical.
    Y,
}

/// Unresolved value of an aesthetic entry.
#[derive(Debug, Clone, PartialEq)]
pub enum AesValue {
    /// A field name, or a literal if no field has this name.
    Name(String),
    /// Always a literal.
    Literal(DataValue),
}

impl From<&str> for AesValue {
    fn from(s: &str) -> Self {
        AesValue::Name(s.to_string())
    }
}

impl From<String> for AesValue {
    fn from(s: String) -> Self {
        AesValue::Name(s)
    }
}

impl From<f64> for AesValue {
    fn from(v: f64) -> Self {
        AesValue::Literal(DataValue::Number(v))
    }
}

/// Channel-to-value bindings. Empty means "inherit".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AestheticMap {
    entries: BTreeMap<Channel, AesValue>,
}

macro_rules! channel_setters {
    ($($method:ident => $channel:ident),* $(,)?) => {
        $(
            #[doc = concat!("Bind `", stringify!($method), "` to a field name (or literal text).")]
            #[must_use]
            pub fn $method(self, name: &str) -> Self {
                self.set(Channel::$channel, AesValue::Name(name.to_string()))
            }
        )*
    };
}

impl AestheticMap {
    /// Create an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    channel_setters! {
        x => X,
        y => Y,
        xmin => Xmin,
        xmax => Xmax,
        ymin => Ymin,
        ymax => Ymax,
        xend => Xend,
        yend => Yend,
        color => Color,
        fill => Fill,
        size => Size,
        shape => Shape,
        alpha => Alpha,
        linetype => Linetype,
        group => Group,
        label => Label,
        weight => Weight,
    }

    /// Bind a channel to a value, replacing any existing entry.
    #[must_use]
    pub fn set(mut self, channel: Channel, value: impl Into<AesValue>) -> Self {
        self.entries.insert(channel, value.into());
        self
    }

    /// Bind a channel to an explicit literal.
    #[must_use]
    pub fn literal(self, channel: Channel, value: impl Into<DataValue>) -> Self {
        self.set(channel, AesValue::Literal(value.into()))
    }

    /// Set a fixed color value.
    #[must_use]
    pub fn color_value(self, color: &str) -> Self {
        self.literal(Channel::Color, color)
    }

    /// Set a fixed fill value.
    #[must_use]
    pub fn fill_value(self, color: &str) -> Self {
        self.literal(Channel::Fill, color)
    }

    /// Set a fixed size value.
    #[must_use]
    pub fn size_value(self, size: f64) -> Self {
        self.literal(Channel::Size, size)
    }

    /// Set a fixed alpha value.
    #[must_use]
    pub fn alpha_value(self, alpha: f64) -> Self {
        self.literal(Channel::Alpha, alpha)
    }

    /// Entry for a channel.
    #[must_use]
    pub fn get(&self, channel: Channel) -> Option<&AesValue> {
        self.entries.get(&channel)
    }

    /// Whether a channel has an entry.
    #[must_use]
    pub fn contains(&self, channel: Channel) -> bool {
        self.entries.contains_key(&channel)
    }

    /// Entries in channel order.
    pub fn iter(&self) -> impl Iterator<Item = (Channel, &AesValue)> {
        self.entries.iter().map(|(c, v)| (*c, v))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A classified aesthetic entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// Reference to a dataset field.
    Field(String),
    /// Constant value.
    Literal(DataValue),
}

impl Binding {
    /// Field name if this is a field binding.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Binding::Field(f) => Some(f),
            Binding::Literal(_) => None,
        }
    }
}

/// Output of [`Resolver::resolve`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedAes {
    bindings: BTreeMap<Channel, Binding>,
    notes: Vec<Warning>,
}

impl ResolvedAes {
    /// Binding for a channel.
    #[must_use]
    pub fn get(&self, channel: Channel) -> Option<&Binding> {
        self.bindings.get(&channel)
    }

    /// Field bound to a channel, if any.
    #[must_use]
    pub fn field(&self, channel: Channel) -> Option<&str> {
        self.bindings.get(&channel).and_then(Binding::field)
    }

    /// All bindings in channel order.
    #[must_use]
    pub fn bindings(&self) -> &BTreeMap<Channel, Binding> {
        &self.bindings
    }

    /// Warnings raised while classifying.
    #[must_use]
    pub fn notes(&self) -> &[Warning] {
        &self.notes
    }

    /// Drop a binding.
    pub fn remove(&mut self, channel: Channel) -> Option<Binding> {
        self.bindings.remove(&channel)
    }

    /// Replace a binding.
    pub fn insert(&mut self, channel: Channel, binding: Binding) {
        self.bindings.insert(channel, binding);
    }

    /// Take the warnings, leaving none behind.
    pub fn take_notes(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.notes)
    }
}

impl From<&ResolvedAes> for AestheticMap {
    fn from(resolved: &ResolvedAes) -> Self {
        let entries = resolved
            .bindings
            .iter()
            .map(|(channel, binding)| {
                let value = match binding {
                    Binding::Field(name) => AesValue::Name(name.clone()),
                    Binding::Literal(value) => AesValue::Literal(value.clone()),
                };
                (*channel, value)
            })
            .collect();
        Self { entries }
    }
}

/// Merges plot and layer mappings and classifies entries against a dataset.
#[derive(Debug, Clone, Copy, Default)]
pub struct Resolver {
    matching: FieldMatching,
}

impl Resolver {
    /// Create a resolver with the given matching mode.
    #[must_use]
    pub fn new(matching: FieldMatching) -> Self {
        Self { matching }
    }

    /// Copy `plot`, then overwrite whole entries present in `layer`.
    #[must_use]
    pub fn merge(plot: &AestheticMap, layer: &AestheticMap) -> AestheticMap {
        let mut merged = plot.clone();
        for (channel, value) in layer.iter() {
            merged.entries.insert(channel, value.clone());
        }
        merged
    }

    /// Merge and classify against the fields of `data`.
    #[must_use]
    pub fn resolve(&self, plot: &AestheticMap, layer: &AestheticMap, data: &DataFrame) -> ResolvedAes {
        let fields = data.columns();
        let merged = Self::merge(plot, layer);
        let mut resolved = ResolvedAes::default();

        for (channel, value) in merged.iter() {
            let binding = match value {
                AesValue::Literal(literal) => {
                    if let DataValue::Text(text) = literal {
                        if fields.contains(&text.as_str()) {
                            resolved.notes.push(Warning::AmbiguousAesthetic {
                                channel: channel.to_string(),
                                value: text.clone(),
                            });
                        }
                    }
                    Binding::Literal(literal.clone())
                }
                AesValue::Name(name) if fields.contains(&name.as_str()) => Binding::Field(name.clone()),
                AesValue::Name(name) => match self.case_insensitive_match(name, &fields) {
                    Some(field) => {
                        resolved.notes.push(Warning::CaseInsensitiveMatch {
                            channel: channel.to_string(),
                            requested: name.clone(),
                            field: field.to_string(),
                        });
                        Binding::Field(field.to_string())
                    }
                    None => Binding::Literal(DataValue::Text(name.clone())),
                },
            };
            resolved.bindings.insert(channel, binding);
        }

        resolved
    }

    fn case_insensitive_match<'a>(&self, name: &str, fields: &[&'a str]) -> Option<&'a str> {
        if self.matching != FieldMatching::CaseInsensitive {
            return None;
        }
        let mut matches = fields.iter().filter(|f| f.eq_ignore_ascii_case(name));
        match (matches.next(), matches.next()) {
            (Some(field), None) => Some(*field),
            _ => None,
        }
    }
}
