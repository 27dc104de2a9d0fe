//! Grammar of Graphics implementation.
//!
//! Provides declarative visualization specification based on Wilkinson's
//! Grammar of Graphics [Wilkinson 2005].
//!
//! # Components
//!
//! - **Aesthetics**: Mappings from data to visual channels, resolved against
//!   the active dataset
//! - **Geometries**: Mark kinds with their default stat and position
//! - **Statistics**: Data transformations (identity, count, bin, density, smooth, boxplot, violin density)
//! - **Positions**: Stack, fill, dodge, jitter and nudge adjustments
//! - **Scales**: Domain-to-range mappings trained once over all data
//! - **Coordinates**: Coordinate systems (cartesian, flipped, fixed, polar)
//! - **Facets**: Small multiples for conditioning
//! - **Themes**: Presets and overrides filtered per target
//! - **Highlight**: Dimming of the rows a predicate does not match
//!
//! # Example
//!
//! ```rust
//! use trueno_gg::grammar::*;
//! use trueno_gg::render::SceneRecorder;
//!
//! let data = DataFrame::new()
//!     .with_column("x", [1.0, 2.0, 3.0, 4.0])
//!     .with_column("y", [4.0, 5.0, 6.0, 7.0])
//!     .with_column("kind", ["a", "a", "b", "b"]);
//!
//! let scene = GGPlot::new()
//!     .data(data)
//!     .aes(AestheticMap::new().x("x").y("y").color("kind"))
//!     .geom(Geom::point())
//!     .facet(Facet::wrap("kind"))
//!     .render(&mut SceneRecorder::new())
//!     .expect("plot should build");
//! assert_eq!(scene.marks().len(), 2);
//! ```
//!
//! # References
//!
//! - Wilkinson, L. (2005). *The Grammar of Graphics*. Springer.
//! - Wickham, H. (2010). "A Layered Grammar of Graphics." Journal of Computational
//!   and Graphical Statistics.

mod aes;
mod coord;
mod data;
mod facet;
mod geom;
mod ggplot;
mod highlight;
mod layer;
mod pipeline;
mod position;
mod scales;
mod stat;
mod theme;

pub use aes::{AesValue, AestheticMap, Axis, Binding, Channel, ResolvedAes, Resolver};
pub use coord::{Coord, Direction};
pub use data::{DataFrame, DataValue, LevelKey};
pub use facet::{wrap_shape, Decorations, Facet, FacetEngine, FacetLayout, FacetScales, Partition, KEY_SEPARATOR};
pub use geom::{Geom, GeomInfo, GeomKind, PointShape, StyleParams, StyleValue};
pub use ggplot::{AxisInfo, BuiltGGPlot, GGPlot, Labels, Panel};
pub use highlight::{Highlight, UNHIGHLIGHTED_ALPHA};
pub use layer::Layer;
pub use pipeline::{
    compute_layer, positional_columns, prepare_layer, ComputedLayer, Encoding, PipelineContext, PreparedLayer,
    DEFAULT_BAR_WIDTH,
};
pub use position::{dodge_offsets, Position, PositionContext};
pub use scales::{
    ContinuousScale, DiscreteScale, Legend, LegendKind, Limits, PaletteRef, ScaleRegistry, ScaleSpec, ScaleType,
    TrainedScale, TrainingInput, Transform, Visual, LINETYPES, NA_COLOR,
};
pub use stat::{LoessFit, SmoothMethod, Stat, StatContext, StatOutput, ViolinScale, GROUP};
pub use theme::{ResolvedTheme, Theme, ThemeMerger, ThemeTarget, PRESETS};
