//! # Trueno-GG
//!
//! Grammar-of-graphics composition engine.
//!
//! A chart is declared as a dataset, channel-to-field aesthetic bindings,
//! geometric layers, statistical transforms, scales, faceting and a theme.
//! Building it resolves the declaration into panels of computed layers;
//! rendering hands those to a [`render::Renderer`]. Pixel work stays outside
//! the crate.
//!
//! ## Quick Start
//!
//! ```rust
//! use trueno_gg::prelude::*;
//!
//! let data = DataFrame::new()
//!     .with_column("cut", ["fair", "good", "good", "ideal"])
//!     .with_column("clarity", ["a", "a", "b", "b"]);
//!
//! let built = GGPlot::new()
//!     .data(data)
//!     .aes(AestheticMap::new().x("cut").fill("clarity"))
//!     .geom(Geom::bar())
//!     .scale(ScaleSpec::fill_palette("set2"))?
//!     .build()?;
//!
//! assert_eq!(built.panels().len(), 1);
//! # Ok::<(), trueno_gg::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `parallel`: Compute facet panels on the rayon pool
//! - `full`: All features enabled
//!
//! ## Academic References
//!
//! - Wilkinson, L. (2005). *The Grammar of Graphics*. Springer.
//! - Wickham, H. (2010). "A Layered Grammar of Graphics." JCGS 19(1).
//! - Cleveland, W. S. (1979). "Robust Locally Weighted Regression and Smoothing
//!   Scatterplots." JASA 74(368).
//! - Silverman, B. W. (1986). *Density Estimation for Statistics and Data Analysis*.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
// Allow unwrap() in tests only - banned in production code (Cloudflare incident 2025-11-18)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Core Modules
// ============================================================================

/// Color types and parsing.
pub mod color;

/// Named color palettes and the palette registry.
pub mod palette;

/// Scale functions for data-to-visual mappings.
pub mod scale;

/// Configuration loaded from YAML.
pub mod config;

// ============================================================================
// Composition
// ============================================================================

/// Grammar of Graphics implementation.
pub mod grammar;

/// Renderer boundary and the recording renderer.
pub mod render;

// ============================================================================
// Error Types
// ============================================================================

/// Error types for trueno-gg operations.
pub mod error;

/// Recoverable degradations recorded while building.
pub mod warning;

pub use error::{Error, Result};

// ============================================================================
// Prelude
// ============================================================================

/// Commonly used types and traits for convenient imports.
///
/// ```rust
/// use trueno_gg::prelude::*;
/// ```
pub mod prelude {
    pub use crate::color::{Hsla, Rgba};
    pub use crate::config::{Config, FieldMatching};
    pub use crate::error::{Error, Result};
    pub use crate::grammar::{
        AestheticMap, BuiltGGPlot, Channel, Coord, DataFrame, DataValue, Facet, FacetScales, GGPlot, Geom, GeomKind,
        Highlight, Labels, Layer, Position, ScaleSpec, Stat, Theme, ViolinScale,
    };
    pub use crate::palette::{Palette, PaletteKind, PaletteRegistry};
    pub use crate::render::{Renderer, SceneNode, SceneRecorder};
    pub use crate::warning::{Warning, WarningKind, Warnings};
    pub use batuta_common::display::WithDimensions;
}
