//! Renderer boundary.
//!
//! A built plot is handed to a [`Renderer`] as a sequence of calls:
//! `render_mark` per layer per panel, `compose_overlay` per panel,
//! `apply_theme` on every panel and once on the grid, and `compose_grid`
//! once. Pixel work belongs to the renderer; [`SceneRecorder`] just records
//! the calls as a [`SceneNode`] tree.

mod scene;

use std::collections::BTreeMap;

use crate::grammar::{AxisInfo, Channel, Coord, DataFrame, Decorations, Encoding, GeomKind, StyleParams};

pub use scene::{MarkNode, SceneNode, SceneRecorder};

/// Everything a renderer needs to place one layer's rows in a panel.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedEncodings<'a> {
    /// Non-positional channel encodings.
    pub channels: &'a BTreeMap<Channel, Encoding>,
    /// Horizontal axis of the panel.
    pub x: &'a AxisInfo,
    /// Vertical axis of the panel.
    pub y: &'a AxisInfo,
    /// Coordinate system.
    pub coord: &'a Coord,
    /// Axis label and strip placement of the panel.
    pub decorations: &'a Decorations,
}

/// Backend that turns a built plot into its own node type.
pub trait Renderer {
    /// Node produced by each call.
    type Node;

    /// Draw one layer of one panel.
    fn render_mark(
        &mut self,
        kind: GeomKind,
        rows: &DataFrame,
        encodings: &ResolvedEncodings<'_>,
        style: &StyleParams,
    ) -> Self::Node;

    /// Stack a panel's layers in order.
    fn compose_overlay(&mut self, nodes: Vec<Self::Node>) -> Self::Node;

    /// Arrange panels; `nodes` is row-major with `rows` rows of `cols` cells.
    fn compose_grid(&mut self, nodes: Vec<Vec<Self::Node>>, rows: usize, cols: usize) -> Self::Node;

    /// Attach style options to a composite.
    fn apply_theme(&mut self, node: Self::Node, options: &StyleParams) -> Self::Node;
}
