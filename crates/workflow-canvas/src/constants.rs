//! Canvas-wide constants
//!
//! Default values for the configuration and the fixed keys shared with the
//! host. `CanvasConfig` overrides most of these at runtime.

/// Zoom configuration
pub mod zoom {
    /// Smallest zoom factor the viewport accepts
    pub const MIN: f64 = 0.1;
    /// Largest zoom factor the viewport accepts
    pub const MAX: f64 = 4.0;
    /// Zoom change per wheel tick
    pub const WHEEL_STEP: f64 = 0.05;
    /// Zoom change per keyboard zoom in/out
    pub const KEYBOARD_STEP: f64 = 0.1;
    /// Zoom after loading a workflow or resetting the view
    pub const DEFAULT: f64 = 1.0;
}

/// Background grid
pub mod grid {
    /// Grid cell size in logical units
    pub const SIZE: f64 = 20.0;
}

/// Node geometry
pub mod node {
    /// Width used when a node carries no explicit size
    pub const DEFAULT_WIDTH: f64 = 200.0;
    /// Height used when a node carries no explicit size
    pub const DEFAULT_HEIGHT: f64 = 80.0;
}

/// Node type tags treated as workflow entry points
pub mod triggers {
    pub const MANUAL: &str = "manual-trigger";
    pub const SCHEDULE: &str = "schedule-trigger";
    pub const WEBHOOK: &str = "webhook-trigger";
    pub const EVENT: &str = "event-trigger";
}

/// Undo history
pub mod history {
    /// Snapshots kept before the oldest is dropped
    pub const MAX_SNAPSHOTS: usize = 100;
}

/// Fit-to-screen
pub mod fit {
    /// Screen-pixel margin kept around the graph
    pub const PADDING: f64 = 50.0;
}

/// Minimap widget
pub mod minimap {
    pub const WIDTH: f64 = 200.0;
    pub const HEIGHT: f64 = 150.0;
    pub const PADDING: f64 = 10.0;
}

/// Palette drag-and-drop
pub mod drag {
    /// Data-transfer key carrying the node type tag
    pub const NODE_TYPE_KEY: &str = "application/x-workflow-node-type";
}
