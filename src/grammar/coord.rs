//! Coordinate systems for Grammar of Graphics.
//!
//! Cartesian limits override computed axis ranges without dropping data and
//! `flip` swaps x and y after position adjustment. Fixed and polar systems
//! are carried to the renderer as metadata.

use crate::grammar::aes::Axis;

/// Angular direction for polar coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Clockwise.
    #[default]
    Clockwise,
    /// Counter-clockwise.
    Anticlockwise,
}

/// Coordinate system type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coord {
    /// Cartesian coordinates (x, y).
    Cartesian {
        /// X axis limits.
        xlim: Option<(f64, f64)>,
        /// Y axis limits.
        ylim: Option<(f64, f64)>,
        /// Whether to flip x and y.
        flip: bool,
    },
    /// Fixed aspect ratio coordinates.
    Fixed {
        /// Aspect ratio (y/x).
        ratio: f64,
    },
    /// Polar coordinates (r, theta).
    Polar {
        /// Axis mapped to the angle.
        theta: Axis,
        /// Start angle in radians.
        start: f64,
        /// Angular direction.
        direction: Direction,
    },
}

impl Default for Coord {
    fn default() -> Self {
        Coord::cartesian()
    }
}

impl Coord {
    /// Create a Cartesian coordinate system.
    #[must_use]
    pub fn cartesian() -> Self {
        Coord::Cartesian { xlim: None, ylim: None, flip: false }
    }

    /// Cartesian with x and y swapped.
    #[must_use]
    pub fn flipped() -> Self {
        Coord::cartesian().flip()
    }

    /// Create a polar coordinate system with x on the angle.
    #[must_use]
    pub fn polar() -> Self {
        Coord::Polar { theta: Axis::X, start: 0.0, direction: Direction::Clockwise }
    }

    /// Create a fixed aspect ratio coordinate system.
    #[must_use]
    pub fn fixed(ratio: f64) -> Self {
        Coord::Fixed { ratio }
    }

    /// Set x-axis limits.
    #[must_use]
    pub fn xlim(mut self, min: f64, max: f64) -> Self {
        if let Coord::Cartesian { ref mut xlim, .. } = self {
            *xlim = Some((min, max));
        }
        self
    }

    /// Set y-axis limits.
    #[must_use]
    pub fn ylim(mut self, min: f64, max: f64) -> Self {
        if let Coord::Cartesian { ref mut ylim, .. } = self {
            *ylim = Some((min, max));
        }
        self
    }

    /// Flip x and y axes.
    #[must_use]
    pub fn flip(mut self) -> Self {
        if let Coord::Cartesian { flip: ref mut f, .. } = self {
            *f = true;
        }
        self
    }

    /// Set the axis mapped to the angle.
    #[must_use]
    pub fn theta(mut self, axis: Axis) -> Self {
        if let Coord::Polar { theta: ref mut t, .. } = self {
            *t = axis;
        }
        self
    }

    /// Set polar start angle.
    #[must_use]
    pub fn start_angle(mut self, start: f64) -> Self {
        if let Coord::Polar { start: ref mut s, .. } = self {
            *s = start;
        }
        self
    }

    /// Set polar direction.
    #[must_use]
    pub fn direction(mut self, direction: Direction) -> Self {
        if let Coord::Polar { direction: ref mut d, .. } = self {
            *d = direction;
        }
        self
    }

    /// Whether x and y are swapped.
    #[must_use]
    pub fn is_flipped(&self) -> bool {
        matches!(self, Coord::Cartesian { flip: true, .. })
    }

    /// Explicit limits for an axis, in display orientation.
    #[must_use]
    pub fn limits(&self, axis: Axis) -> Option<(f64, f64)> {
        match (self, axis) {
            (Coord::Cartesian { xlim, .. }, Axis::X) => *xlim,
            (Coord::Cartesian { ylim, .. }, Axis::Y) => *ylim,
            _ => None,
        }
    }

    /// Short name for logs and renderers.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Coord::Cartesian { flip: false, .. } => "cartesian",
            Coord::Cartesian { flip: true, .. } => "flip",
            Coord::Fixed { .. } => "fixed",
            Coord::Polar { .. } => "polar",
        }
    }
}
