//! Viewport transform
//!
//! Converts between screen pixels and logical canvas coordinates under the
//! current pan and zoom:
//!
//! - screen to logical: `(screen - pan) / zoom`
//! - logical to screen: `logical * zoom + pan`
//!
//! Zoom is clamped here, not in the gesture layer.

use serde::{Deserialize, Serialize};

use crate::config::ZoomConfig;
use crate::geometry::{Position, Rect, Size};

/// Pan offset (screen pixels) and zoom factor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub pan: Position,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            pan: Position::ORIGIN,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    pub fn new(pan: Position, zoom: f64) -> Self {
        Self { pan, zoom }
    }

    pub fn screen_to_logical(&self, screen: Position) -> Position {
        screen_to_logical(screen, self.pan, self.zoom)
    }

    pub fn logical_to_screen(&self, logical: Position) -> Position {
        logical_to_screen(logical, self.pan, self.zoom)
    }

    /// Set the zoom factor, clamped to the configured range
    pub fn set_zoom(&mut self, zoom: f64, limits: &ZoomConfig) {
        if zoom.is_nan() {
            return;
        }
        self.zoom = zoom.clamp(limits.min, limits.max);
    }

    pub fn zoom_in(&mut self, limits: &ZoomConfig) {
        self.set_zoom(self.zoom + limits.keyboard_step, limits);
    }

    pub fn zoom_out(&mut self, limits: &ZoomConfig) {
        self.set_zoom(self.zoom - limits.keyboard_step, limits);
    }

    /// Back to the default zoom with no pan
    pub fn reset(&mut self, limits: &ZoomConfig) {
        self.pan = Position::ORIGIN;
        self.zoom = limits.default;
    }

    /// Logical rectangle currently visible in a viewport of `size` pixels
    pub fn visible_bounds(&self, size: Size) -> Rect {
        Rect::from_corners(
            self.screen_to_logical(Position::ORIGIN),
            self.screen_to_logical(Position::new(size.width, size.height)),
        )
    }

    /// Pan and zoom so `bounds` fills the viewport with `padding` pixels to spare
    ///
    /// Degenerate viewports (smaller than twice the padding) leave the
    /// viewport untouched.
    pub fn fit_to_bounds(&mut self, bounds: Rect, size: Size, padding: f64, limits: &ZoomConfig) {
        let available_w = size.width - 2.0 * padding;
        let available_h = size.height - 2.0 * padding;
        if available_w <= 0.0 || available_h <= 0.0 {
            return;
        }

        let zoom = if bounds.width() > 0.0 && bounds.height() > 0.0 {
            (available_w / bounds.width()).min(available_h / bounds.height())
        } else {
            limits.default
        };
        self.set_zoom(zoom, limits);

        let screen_center = Position::new(size.width / 2.0, size.height / 2.0);
        self.pan = screen_center - bounds.center() * self.zoom;
    }

    /// Background grid phase for the current viewport
    pub fn grid(&self, grid_size: f64) -> GridPattern {
        GridPattern::new(grid_size, self)
    }
}

/// `logical = (screen - pan) / zoom`
pub fn screen_to_logical(screen: Position, pan: Position, zoom: f64) -> Position {
    (screen - pan) / zoom
}

/// `screen = logical * zoom + pan`
pub fn logical_to_screen(logical: Position, pan: Position, zoom: f64) -> Position {
    logical * zoom + pan
}

/// Screen-space layout of the infinite background grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridPattern {
    /// Distance between grid lines in screen pixels
    pub cell_pitch: f64,
    /// Phase shift of the first line, in `[0, cell_pitch)`
    pub offset: Position,
}

impl GridPattern {
    pub fn new(grid_size: f64, viewport: &Viewport) -> Self {
        let cell_pitch = grid_size * viewport.zoom;
        Self {
            cell_pitch,
            offset: Position::new(
                viewport.pan.x.rem_euclid(cell_pitch),
                viewport.pan.y.rem_euclid(cell_pitch),
            ),
        }
    }
}
