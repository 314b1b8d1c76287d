//! Minimap projection
//!
//! Scales the whole graph, plus the part of the canvas currently on screen,
//! into a small fixed-size thumbnail. Clicking or dragging inside the
//! thumbnail maps back to a pan that centres the viewport on that point.

use serde::{Deserialize, Serialize};

use crate::config::MinimapConfig;
use crate::geometry::{Position, Rect, Size};
use crate::types::{NodeId, WorkflowGraph};
use crate::viewport::Viewport;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinimapNode {
    pub id: NodeId,
    /// Rectangle in minimap pixels
    pub rect: Rect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinimapProjection {
    /// Minimap size in pixels
    pub size: Size,
    /// Logical region covered by the thumbnail
    pub world: Rect,
    /// Minimap pixels per logical unit
    pub scale: f64,
    /// Minimap position of `world.min`
    pub offset: Position,
    pub nodes: Vec<MinimapNode>,
    /// Visible part of the canvas, in minimap pixels
    pub viewport_rect: Rect,
}

impl MinimapProjection {
    pub fn new(
        graph: &WorkflowGraph,
        viewport: &Viewport,
        viewport_size: Size,
        config: &MinimapConfig,
    ) -> Self {
        let visible = viewport.visible_bounds(viewport_size);
        let world = graph
            .bounds()
            .map_or(visible, |bounds| bounds.union(&visible));

        let available_w = config.width - 2.0 * config.padding;
        let available_h = config.height - 2.0 * config.padding;
        let scale = if world.width() > 0.0 && world.height() > 0.0 && available_w > 0.0 && available_h > 0.0
        {
            (available_w / world.width()).min(available_h / world.height())
        } else {
            1.0
        };

        // Centre the scaled world inside the padded area
        let offset = Position::new(
            config.padding + (available_w - world.width() * scale).max(0.0) / 2.0,
            config.padding + (available_h - world.height() * scale).max(0.0) / 2.0,
        );

        let mut projection = Self {
            size: Size::new(config.width, config.height),
            world,
            scale,
            offset,
            nodes: Vec::with_capacity(graph.nodes.len()),
            viewport_rect: visible,
        };
        projection.viewport_rect = projection.project_rect(&visible);
        projection.nodes = graph
            .nodes
            .iter()
            .map(|node| MinimapNode {
                id: node.id.clone(),
                rect: projection.project_rect(&node.bounds()),
            })
            .collect();
        projection
    }

    /// Logical point to minimap pixels
    pub fn project(&self, logical: Position) -> Position {
        (logical - self.world.min) * self.scale + self.offset
    }

    /// Minimap pixels back to a logical point
    pub fn unproject(&self, point: Position) -> Position {
        (point - self.offset) / self.scale + self.world.min
    }

    pub fn project_rect(&self, rect: &Rect) -> Rect {
        Rect::from_corners(self.project(rect.min), self.project(rect.max))
    }

    /// Pan that centres a viewport of `viewport_size` on the clicked point
    pub fn pan_for_minimap_point(&self, point: Position, zoom: f64, viewport_size: Size) -> Position {
        let target = self.unproject(point);
        let screen_center = Position::new(viewport_size.width / 2.0, viewport_size.height / 2.0);
        screen_center - target * zoom
    }
}
