//! Geometry kinds and their dispatch table.
//!
//! A geometry is data: a [`GeomKind`] plus a bag of literal style params.
//! Everything kind-specific (default stat and position, required channels,
//! accepted style params and theme options) lives in [`GeomKind::info`].

use std::collections::BTreeMap;
use std::fmt;

use crate::color::Rgba;
use crate::grammar::aes::{AestheticMap, Channel};
use crate::grammar::position::Position;
use crate::grammar::stat::{SmoothMethod, Stat, ViolinScale};

/// Shape types for point geometries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum PointShape {
    /// Filled circle.
    #[default]
    Circle,
    /// Filled square.
    Square,
    /// Filled triangle.
    Triangle,
    /// Diamond shape.
    Diamond,
    /// Cross (+).
    Cross,
    /// X shape.
    X,
}

impl PointShape {
    /// Shapes in discrete-scale order.
    pub const ALL: [PointShape; 6] = [
        PointShape::Circle,
        PointShape::Triangle,
        PointShape::Square,
        PointShape::Cross,
        PointShape::X,
        PointShape::Diamond,
    ];

    /// Lower-case shape name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            PointShape::Circle => "circle",
            PointShape::Square => "square",
            PointShape::Triangle => "triangle",
            PointShape::Diamond => "diamond",
            PointShape::Cross => "cross",
            PointShape::X => "x",
        }
    }

    /// Parse a shape name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name().eq_ignore_ascii_case(name))
    }
}

/// Closed set of geometry kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GeomKind {
    /// Scatter points.
    Point,
    /// Lines connecting points in x order.
    Line,
    /// Lines connecting points in data order.
    Path,
    /// Bars of counted rows.
    Bar,
    /// Bars of given heights.
    Col,
    /// Filled area under a line.
    Area,
    /// Binned bars.
    Histogram,
    /// Box-and-whisker summary.
    Boxplot,
    /// Mirrored density of y per x.
    Violin,
    /// Kernel density curve.
    Density,
    /// Rectangles centered on x/y (heatmaps).
    Tile,
    /// Text labels.
    Text,
    /// Band between ymin and ymax.
    Ribbon,
    /// Vertical interval with caps.
    Errorbar,
    /// Fitted curve with optional band.
    Smooth,
    /// Horizontal reference line.
    Hline,
    /// Vertical reference line.
    Vline,
}

/// Static per-kind behavior.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeomInfo {
    /// Name used in messages (`geom_{name}`).
    pub name: &'static str,
    /// Stat applied when the layer names none.
    pub default_stat: Stat,
    /// Position applied when the layer names none.
    pub default_position: Position,
    /// Channels that must be bound before the stat runs.
    pub required: &'static [Channel],
    /// Accepted literal style params.
    pub style_params: &'static [&'static str],
    /// Geometry-specific theme options, in addition to the common panel options.
    pub theme_options: &'static [&'static str],
    /// Rows are drawn sorted by x.
    pub sorts_by_x: bool,
    /// The y axis includes zero.
    pub includes_zero: bool,
    /// Draws from a style param when no data channel is bound.
    pub annotation: Option<(Channel, &'static str)>,
}

const POINT_PARAMS: &[&str] = &["color", "fill", "alpha", "size", "shape", "stroke"];
const LINE_PARAMS: &[&str] = &["color", "alpha", "size", "linetype"];
const BAR_PARAMS: &[&str] = &["color", "fill", "alpha", "size", "linetype", "width"];
const AREA_PARAMS: &[&str] = &["color", "fill", "alpha", "size", "linetype"];
const BOX_PARAMS: &[&str] =
    &["color", "fill", "alpha", "size", "width", "outlier_color", "outlier_size", "notch"];
const VIOLIN_PARAMS: &[&str] = &["color", "fill", "alpha", "size", "linetype", "width"];
const TILE_PARAMS: &[&str] = &["color", "fill", "alpha", "width", "height"];
const TEXT_PARAMS: &[&str] = &["color", "alpha", "size", "family", "hjust", "vjust", "angle"];
const ERRORBAR_PARAMS: &[&str] = &["color", "alpha", "size", "linetype", "width"];
const SMOOTH_PARAMS: &[&str] = &["color", "fill", "alpha", "size", "linetype", "se"];
const HLINE_PARAMS: &[&str] = &["color", "alpha", "size", "linetype", "yintercept"];
const VLINE_PARAMS: &[&str] = &["color", "alpha", "size", "linetype", "xintercept"];

const SMOOTH_DEFAULT: Stat = Stat::Smooth { method: SmoothMethod::Loess, se: true, span: None, n: None };
const DENSITY_DEFAULT: Stat = Stat::Density { adjust: 1.0, n: None };
const BIN_DEFAULT: Stat = Stat::Bin { bins: None, binwidth: None };
const BOXPLOT_DEFAULT: Stat = Stat::Boxplot { coef: 1.5 };
const VIOLIN_DEFAULT: Stat = Stat::YDensity { adjust: 1.0, n: None, trim: true, scale: ViolinScale::Area, bw: None };

const fn info(
    name: &'static str,
    default_stat: Stat,
    default_position: Position,
    required: &'static [Channel],
    style_params: &'static [&'static str],
    theme_options: &'static [&'static str],
) -> GeomInfo {
    GeomInfo {
        name,
        default_stat,
        default_position,
        required,
        style_params,
        theme_options,
        sorts_by_x: false,
        includes_zero: false,
        annotation: None,
    }
}

static POINT: GeomInfo =
    info("point", Stat::Identity, Position::Identity, &[Channel::X, Channel::Y], POINT_PARAMS, &[
        "point.size",
        "point.shape",
    ]);
static LINE: GeomInfo = GeomInfo {
    sorts_by_x: true,
    ..info("line", Stat::Identity, Position::Identity, &[Channel::X, Channel::Y], LINE_PARAMS, &[
        "line.width",
        "line.type",
    ])
};
static PATH: GeomInfo =
    info("path", Stat::Identity, Position::Identity, &[Channel::X, Channel::Y], LINE_PARAMS, &[
        "line.width",
        "line.type",
    ]);
static BAR: GeomInfo = GeomInfo {
    includes_zero: true,
    ..info("bar", Stat::Count, Position::STACK, &[Channel::X], BAR_PARAMS, &["bar.width", "fill.alpha"])
};
static COL: GeomInfo = GeomInfo {
    includes_zero: true,
    ..info("col", Stat::Identity, Position::STACK, &[Channel::X, Channel::Y], BAR_PARAMS, &[
        "bar.width",
        "fill.alpha",
    ])
};
static AREA: GeomInfo = GeomInfo {
    sorts_by_x: true,
    includes_zero: true,
    ..info("area", Stat::Identity, Position::STACK, &[Channel::X, Channel::Y], AREA_PARAMS, &[
        "fill.alpha",
        "line.width",
    ])
};
static HISTOGRAM: GeomInfo = GeomInfo {
    includes_zero: true,
    ..info("histogram", BIN_DEFAULT, Position::STACK, &[Channel::X], BAR_PARAMS, &["bar.width", "fill.alpha"])
};
static BOXPLOT: GeomInfo =
    info("boxplot", BOXPLOT_DEFAULT, Position::DODGE, &[Channel::Y], BOX_PARAMS, &["bar.width", "fill.alpha"]);
static VIOLIN: GeomInfo =
    info("violin", VIOLIN_DEFAULT, Position::DODGE, &[Channel::Y], VIOLIN_PARAMS, &["fill.alpha", "line.width"]);
static DENSITY: GeomInfo = GeomInfo {
    sorts_by_x: true,
    includes_zero: true,
    ..info("density", DENSITY_DEFAULT, Position::Identity, &[Channel::X], AREA_PARAMS, &[
        "fill.alpha",
        "line.width",
    ])
};
static TILE: GeomInfo =
    info("tile", Stat::Identity, Position::Identity, &[Channel::X, Channel::Y], TILE_PARAMS, &["fill.alpha"]);
static TEXT: GeomInfo = info(
    "text",
    Stat::Identity,
    Position::Identity,
    &[Channel::X, Channel::Y, Channel::Label],
    TEXT_PARAMS,
    &["text.size", "text.family"],
);
static RIBBON: GeomInfo = GeomInfo {
    sorts_by_x: true,
    ..info(
        "ribbon",
        Stat::Identity,
        Position::Identity,
        &[Channel::X, Channel::Ymin, Channel::Ymax],
        AREA_PARAMS,
        &["fill.alpha", "line.width"],
    )
};
static ERRORBAR: GeomInfo = info(
    "errorbar",
    Stat::Identity,
    Position::Identity,
    &[Channel::X, Channel::Ymin, Channel::Ymax],
    ERRORBAR_PARAMS,
    &["line.width"],
);
static SMOOTH: GeomInfo = GeomInfo {
    sorts_by_x: true,
    ..info("smooth", SMOOTH_DEFAULT, Position::Identity, &[Channel::X, Channel::Y], SMOOTH_PARAMS, &[
        "line.width",
        "line.type",
        "fill.alpha",
    ])
};
static HLINE: GeomInfo = GeomInfo {
    annotation: Some((Channel::Y, "yintercept")),
    ..info("hline", Stat::Identity, Position::Identity, &[], HLINE_PARAMS, &["line.width", "line.type"])
};
static VLINE: GeomInfo = GeomInfo {
    annotation: Some((Channel::X, "xintercept")),
    ..info("vline", Stat::Identity, Position::Identity, &[], VLINE_PARAMS, &["line.width", "line.type"])
};

impl GeomKind {
    /// Every kind.
    pub const ALL: [GeomKind; 17] = [
        GeomKind::Point,
        GeomKind::Line,
        GeomKind::Path,
        GeomKind::Bar,
        GeomKind::Col,
        GeomKind::Area,
        GeomKind::Histogram,
        GeomKind::Boxplot,
        GeomKind::Violin,
        GeomKind::Density,
        GeomKind::Tile,
        GeomKind::Text,
        GeomKind::Ribbon,
        GeomKind::Errorbar,
        GeomKind::Smooth,
        GeomKind::Hline,
        GeomKind::Vline,
    ];

    /// Dispatch table entry.
    #[must_use]
    pub fn info(self) -> &'static GeomInfo {
        match self {
            GeomKind::Point => &POINT,
            GeomKind::Line => &LINE,
            GeomKind::Path => &PATH,
            GeomKind::Bar => &BAR,
            GeomKind::Col => &COL,
            GeomKind::Area => &AREA,
            GeomKind::Histogram => &HISTOGRAM,
            GeomKind::Boxplot => &BOXPLOT,
            GeomKind::Violin => &VIOLIN,
            GeomKind::Density => &DENSITY,
            GeomKind::Tile => &TILE,
            GeomKind::Text => &TEXT,
            GeomKind::Ribbon => &RIBBON,
            GeomKind::Errorbar => &ERRORBAR,
            GeomKind::Smooth => &SMOOTH,
            GeomKind::Hline => &HLINE,
            GeomKind::Vline => &VLINE,
        }
    }

    /// Whether a literal style param is accepted.
    #[must_use]
    pub fn supports_param(self, name: &str) -> bool {
        self.info().style_params.contains(&name)
    }
}

impl fmt::Display for GeomKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.info().name)
    }
}

/// A literal style or theme value.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleValue {
    /// Numeric value.
    Number(f64),
    /// Text value.
    Text(String),
    /// Flag.
    Bool(bool),
    /// Color.
    Color(Rgba),
}

impl StyleValue {
    /// Numeric content.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StyleValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Text content.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            StyleValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for StyleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleValue::Number(n) => write!(f, "{n}"),
            StyleValue::Text(s) => f.write_str(s),
            StyleValue::Bool(b) => write!(f, "{b}"),
            StyleValue::Color(c) => write!(f, "{c}"),
        }
    }
}

impl From<f64> for StyleValue {
    fn from(v: f64) -> Self {
        StyleValue::Number(v)
    }
}

impl From<i32> for StyleValue {
    fn from(v: i32) -> Self {
        StyleValue::Number(f64::from(v))
    }
}

impl From<bool> for StyleValue {
    fn from(v: bool) -> Self {
        StyleValue::Bool(v)
    }
}

impl From<&str> for StyleValue {
    fn from(v: &str) -> Self {
        StyleValue::Text(v.to_string())
    }
}

impl From<String> for StyleValue {
    fn from(v: String) -> Self {
        StyleValue::Text(v)
    }
}

impl From<Rgba> for StyleValue {
    fn from(v: Rgba) -> Self {
        StyleValue::Color(v)
    }
}

/// Literal style params keyed by name.
pub type StyleParams = BTreeMap<String, StyleValue>;

/// A geometry layer declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Geom {
    /// The geometry kind.
    pub kind: GeomKind,
    /// Literal style params.
    pub params: StyleParams,
    /// Layer-specific aesthetics.
    pub aes: Option<AestheticMap>,
    /// Statistical transformation (kind default when `None`).
    pub stat: Option<Stat>,
    /// Position adjustment (kind default when `None`).
    pub position: Option<Position>,
}

impl Geom {
    /// Geometry of the given kind with no overrides.
    #[must_use]
    pub fn new(kind: GeomKind) -> Self {
        Self { kind, params: StyleParams::new(), aes: None, stat: None, position: None }
    }

    /// Create a point geometry.
    #[must_use]
    pub fn point() -> Self {
        Self::new(GeomKind::Point)
    }

    /// Create a line geometry.
    #[must_use]
    pub fn line() -> Self {
        Self::new(GeomKind::Line)
    }

    /// Create a path geometry.
    #[must_use]
    pub fn path() -> Self {
        Self::new(GeomKind::Path)
    }

    /// Create an area geometry.
    #[must_use]
    pub fn area() -> Self {
        Self::new(GeomKind::Area)
    }

    /// Create a bar geometry (counts rows).
    #[must_use]
    pub fn bar() -> Self {
        Self::new(GeomKind::Bar)
    }

    /// Create a column geometry (heights from y).
    #[must_use]
    pub fn col() -> Self {
        Self::new(GeomKind::Col)
    }

    /// Create a histogram geometry.
    #[must_use]
    pub fn histogram() -> Self {
        Self::new(GeomKind::Histogram)
    }

    /// Create a box plot geometry.
    #[must_use]
    pub fn boxplot() -> Self {
        Self::new(GeomKind::Boxplot)
    }

    /// Create a violin geometry.
    #[must_use]
    pub fn violin() -> Self {
        Self::new(GeomKind::Violin)
    }

    /// Create a density curve geometry.
    #[must_use]
    pub fn density() -> Self {
        Self::new(GeomKind::Density)
    }

    /// Create a tile geometry (for heatmaps).
    #[must_use]
    pub fn tile() -> Self {
        Self::new(GeomKind::Tile)
    }

    /// Create a text geometry.
    #[must_use]
    pub fn text() -> Self {
        Self::new(GeomKind::Text)
    }

    /// Create a ribbon geometry.
    #[must_use]
    pub fn ribbon() -> Self {
        Self::new(GeomKind::Ribbon)
    }

    /// Create an error bar geometry.
    #[must_use]
    pub fn errorbar() -> Self {
        Self::new(GeomKind::Errorbar)
    }

    /// Create a smooth line (LOESS by default).
    #[must_use]
    pub fn smooth() -> Self {
        Self::new(GeomKind::Smooth)
    }

    /// Create a horizontal line.
    #[must_use]
    pub fn hline(yintercept: f64) -> Self {
        Self::new(GeomKind::Hline).param("yintercept", yintercept)
    }

    /// Create a vertical line.
    #[must_use]
    pub fn vline(xintercept: f64) -> Self {
        Self::new(GeomKind::Vline).param("xintercept", xintercept)
    }

    /// Set a literal style param. Unsupported names are dropped at build time.
    #[must_use]
    pub fn param(mut self, name: &str, value: impl Into<StyleValue>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    /// Set the point shape.
    #[must_use]
    pub fn shape(self, shape: PointShape) -> Self {
        self.param("shape", shape.name())
    }

    /// Set the bar or error-bar width.
    #[must_use]
    pub fn width(self, width: f64) -> Self {
        self.param("width", width)
    }

    /// Set a literal color.
    #[must_use]
    pub fn color(self, color: Rgba) -> Self {
        self.param("color", color)
    }

    /// Set a literal fill.
    #[must_use]
    pub fn fill(self, color: Rgba) -> Self {
        self.param("fill", color)
    }

    /// Set the opacity.
    #[must_use]
    pub fn alpha(self, alpha: f64) -> Self {
        self.param("alpha", alpha.clamp(0.0, 1.0))
    }

    /// Set the mark size or line width.
    #[must_use]
    pub fn size(self, size: f64) -> Self {
        self.param("size", size)
    }

    /// Set the number of bins (histogram).
    #[must_use]
    pub fn bins(mut self, bins: usize) -> Self {
        self.stat = Some(Stat::Bin { bins: Some(bins), binwidth: None });
        self
    }

    /// Use a linear fit (smooth).
    #[must_use]
    pub fn method(mut self, method: SmoothMethod) -> Self {
        let (se, span, n) = match self.effective_stat() {
            Stat::Smooth { se, span, n, .. } => (se, span, n),
            _ => (true, None, None),
        };
        self.stat = Some(Stat::Smooth { method, se, span, n });
        self
    }

    /// Set how violin widths compare (violin).
    #[must_use]
    pub fn violin_scale(self, scale: ViolinScale) -> Self {
        self.with_ydensity(|stat| {
            if let Stat::YDensity { scale: s, .. } = stat {
                *s = scale;
            }
        })
    }

    /// Keep violins inside the data range (violin).
    #[must_use]
    pub fn trim(self, trim: bool) -> Self {
        self.with_ydensity(|stat| {
            if let Stat::YDensity { trim: t, .. } = stat {
                *t = trim;
            }
        })
    }

    /// Fix the kernel bandwidth (violin).
    #[must_use]
    pub fn bw(self, bw: f64) -> Self {
        self.with_ydensity(|stat| {
            if let Stat::YDensity { bw: b, .. } = stat {
                *b = Some(bw);
            }
        })
    }

    fn with_ydensity(mut self, edit: impl FnOnce(&mut Stat)) -> Self {
        let mut stat = match self.effective_stat() {
            stat @ Stat::YDensity { .. } => stat,
            _ => Stat::ydensity(),
        };
        edit(&mut stat);
        self.stat = Some(stat);
        self
    }

    /// Add layer-specific aesthetics.
    #[must_use]
    pub fn aes(mut self, aes: AestheticMap) -> Self {
        self.aes = Some(aes);
        self
    }

    /// Set statistical transformation.
    #[must_use]
    pub fn stat(mut self, stat: Stat) -> Self {
        self.stat = Some(stat);
        self
    }

    /// Set position adjustment.
    #[must_use]
    pub fn position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    /// Stat in effect.
    #[must_use]
    pub fn effective_stat(&self) -> Stat {
        self.stat.unwrap_or(self.kind.info().default_stat)
    }

    /// Position in effect.
    #[must_use]
    pub fn effective_position(&self) -> Position {
        self.position.unwrap_or(self.kind.info().default_position)
    }
}
