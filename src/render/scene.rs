//! Recording renderer.

use std::collections::BTreeMap;

use crate::grammar::{AxisInfo, Channel, Coord, DataFrame, Decorations, Encoding, GeomKind, StyleParams};

use super::{Renderer, ResolvedEncodings};

/// One recorded layer.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkNode {
    /// Geometry kind.
    pub kind: GeomKind,
    /// Rows in display orientation.
    pub rows: DataFrame,
    /// Non-positional encodings.
    pub channels: BTreeMap<Channel, Encoding>,
    /// Horizontal axis.
    pub x: AxisInfo,
    /// Vertical axis.
    pub y: AxisInfo,
    /// Coordinate system.
    pub coord: Coord,
    /// Panel decorations.
    pub decorations: Decorations,
    /// Style params after theme merging.
    pub style: StyleParams,
}

/// Tree built by [`SceneRecorder`].
#[derive(Debug, Clone, PartialEq)]
pub enum SceneNode {
    /// A layer.
    Mark(Box<MarkNode>),
    /// Layers of one panel, bottom first.
    Overlay(Vec<SceneNode>),
    /// Panel grid.
    Grid {
        /// Grid rows.
        rows: usize,
        /// Grid columns.
        cols: usize,
        /// Cells, row-major.
        cells: Vec<Vec<SceneNode>>,
    },
    /// A node with style options attached.
    Themed {
        /// Options applied.
        options: StyleParams,
        /// Styled node.
        child: Box<SceneNode>,
    },
}

impl SceneNode {
    /// Marks in drawing order.
    #[must_use]
    pub fn marks(&self) -> Vec<&MarkNode> {
        let mut out = Vec::new();
        self.collect_marks(&mut out);
        out
    }

    fn collect_marks<'a>(&'a self, out: &mut Vec<&'a MarkNode>) {
        match self {
            SceneNode::Mark(mark) => out.push(mark),
            SceneNode::Overlay(children) => children.iter().for_each(|c| c.collect_marks(out)),
            SceneNode::Grid { cells, .. } => cells.iter().flatten().for_each(|c| c.collect_marks(out)),
            SceneNode::Themed { child, .. } => child.collect_marks(out),
        }
    }

    /// The node under any theme wrappers.
    #[must_use]
    pub fn unthemed(&self) -> &SceneNode {
        match self {
            SceneNode::Themed { child, .. } => child.unthemed(),
            other => other,
        }
    }

    /// Grid cells, when the node is a (themed) grid.
    #[must_use]
    pub fn cells(&self) -> Option<&[Vec<SceneNode>]> {
        match self.unthemed() {
            SceneNode::Grid { cells, .. } => Some(cells),
            _ => None,
        }
    }

    /// Theme options of the outermost wrapper.
    #[must_use]
    pub fn options(&self) -> Option<&StyleParams> {
        match self {
            SceneNode::Themed { options, .. } => Some(options),
            _ => None,
        }
    }
}

/// Renderer that records calls as a [`SceneNode`] tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct SceneRecorder {
    marks: usize,
}

impl SceneRecorder {
    /// Create a recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `render_mark` calls so far.
    #[must_use]
    pub fn mark_calls(&self) -> usize {
        self.marks
    }
}

impl Renderer for SceneRecorder {
    type Node = SceneNode;

    fn render_mark(
        &mut self,
        kind: GeomKind,
        rows: &DataFrame,
        encodings: &ResolvedEncodings<'_>,
        style: &StyleParams,
    ) -> SceneNode {
        self.marks += 1;
        SceneNode::Mark(Box::new(MarkNode {
            kind,
            rows: rows.clone(),
            channels: encodings.channels.clone(),
            x: encodings.x.clone(),
            y: encodings.y.clone(),
            coord: *encodings.coord,
            decorations: encodings.decorations.clone(),
            style: style.clone(),
        }))
    }

    fn compose_overlay(&mut self, nodes: Vec<SceneNode>) -> SceneNode {
        SceneNode::Overlay(nodes)
    }

    fn compose_grid(&mut self, nodes: Vec<Vec<SceneNode>>, rows: usize, cols: usize) -> SceneNode {
        SceneNode::Grid { rows, cols, cells: nodes }
    }

    fn apply_theme(&mut self, node: SceneNode, options: &StyleParams) -> SceneNode {
        SceneNode::Themed { options: options.clone(), child: Box::new(node) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::StyleValue;

    #[test]
    fn test_recorder_builds_tree() {
        let mut recorder = SceneRecorder::new();
        let channels = BTreeMap::new();
        let axis = AxisInfo::default();
        let decorations = Decorations::default();
        let coord = Coord::default();
        let encodings =
            ResolvedEncodings { channels: &channels, x: &axis, y: &axis, coord: &coord, decorations: &decorations };
        let frame = DataFrame::from_xy(&[1.0], &[2.0]);

        let mark = recorder.render_mark(GeomKind::Point, &frame, &encodings, &StyleParams::new());
        let overlay = recorder.compose_overlay(vec![mark]);
        let grid = recorder.compose_grid(vec![vec![overlay]], 1, 1);
        let mut options = StyleParams::new();
        options.insert("width".to_string(), StyleValue::Number(800.0));
        let root = recorder.apply_theme(grid, &options);

        assert_eq!(recorder.mark_calls(), 1);
        assert_eq!(root.marks().len(), 1);
        assert_eq!(root.marks()[0].rows.nrow(), 1);
        assert_eq!(root.cells().map(<[Vec<SceneNode>]>::len), Some(1));
        assert_eq!(root.options().and_then(|o| o.get("width")), Some(&StyleValue::Number(800.0)));
    }
}
