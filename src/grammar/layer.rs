//! Plot layers.

use std::sync::Arc;

use crate::grammar::aes::AestheticMap;
use crate::grammar::data::DataFrame;
use crate::grammar::geom::{Geom, GeomKind};
use crate::grammar::position::Position;
use crate::grammar::stat::Stat;

/// A layer in the plot.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// The geometry, with its stat, position, style params and own mapping.
    pub geom: Geom,
    /// Layer-specific data (plot data when `None`).
    pub data: Option<Arc<DataFrame>>,
    /// Whether the plot-level mapping applies to this layer.
    pub inherit_aes: bool,
}

impl From<Geom> for Layer {
    fn from(geom: Geom) -> Self {
        Self::new(geom)
    }
}

impl Layer {
    /// Create a new layer from a geometry.
    #[must_use]
    pub fn new(geom: Geom) -> Self {
        Self { geom, data: None, inherit_aes: true }
    }

    /// Set layer-specific data.
    #[must_use]
    pub fn data(mut self, data: DataFrame) -> Self {
        self.data = Some(Arc::new(data));
        self
    }

    /// Share layer-specific data.
    #[must_use]
    pub fn shared_data(mut self, data: Arc<DataFrame>) -> Self {
        self.data = Some(data);
        self
    }

    /// Set layer aesthetics.
    #[must_use]
    pub fn aes(mut self, aes: AestheticMap) -> Self {
        self.geom.aes = Some(aes);
        self
    }

    /// Ignore (or use) the plot-level mapping.
    #[must_use]
    pub fn inherit_aes(mut self, inherit: bool) -> Self {
        self.inherit_aes = inherit;
        self
    }

    /// Geometry kind.
    #[must_use]
    pub fn kind(&self) -> GeomKind {
        self.geom.kind
    }

    /// Layer mapping (empty when none was given).
    #[must_use]
    pub fn mapping(&self) -> AestheticMap {
        self.geom.aes.clone().unwrap_or_default()
    }

    /// Stat in effect.
    #[must_use]
    pub fn stat(&self) -> Stat {
        self.geom.effective_stat()
    }

    /// Position in effect.
    #[must_use]
    pub fn position(&self) -> Position {
        self.geom.effective_position()
    }

    /// Layer data, falling back to the plot data.
    #[must_use]
    pub fn data_or<'a>(&'a self, plot: &'a DataFrame) -> &'a DataFrame {
        self.data.as_deref().unwrap_or(plot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_defaults() {
        let layer = Layer::new(Geom::bar());
        assert!(layer.inherit_aes);
        assert_eq!(layer.stat(), Stat::Count);
        assert_eq!(layer.position(), Position::STACK);
        assert!(layer.mapping().is_empty());
    }

    #[test]
    fn test_layer_data_fallback() {
        let plot = DataFrame::from_xy(&[1.0], &[2.0]);
        let own = DataFrame::from_xy(&[1.0, 2.0], &[3.0, 4.0]);
        assert_eq!(Layer::new(Geom::point()).data_or(&plot).nrow(), 1);
        assert_eq!(Layer::new(Geom::point()).data(own).data_or(&plot).nrow(), 2);
    }

    #[test]
    fn test_layer_aes_override() {
        let layer = Layer::from(Geom::point()).aes(AestheticMap::new().x("a")).inherit_aes(false);
        assert!(layer.mapping().contains(crate::grammar::aes::Channel::X));
        assert!(!layer.inherit_aes);
    }
}
