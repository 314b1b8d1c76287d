//! Raw input events delivered by the host
//!
//! The host translates its native pointer, wheel, keyboard and drag-and-drop
//! events into these types; nothing here depends on a UI toolkit.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::geometry::{Position, Size};
use crate::keyboard::KeyEvent;
use crate::types::{NodeId, PortRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

/// Modifier keys held during an event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        alt: false,
        ctrl: false,
        meta: false,
    };

    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::NONE
        }
    }

    pub fn alt() -> Self {
        Self {
            alt: true,
            ..Self::NONE
        }
    }

    /// Ctrl on Linux/Windows, Cmd on macOS; either one counts
    pub fn platform(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// What the pointer went down on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PointerTarget {
    /// The empty canvas itself
    Background,
    /// A node body (not one of its ports)
    #[serde(rename_all = "camelCase")]
    Node { node_id: NodeId },
    /// A port handle
    Port { port: PortRef },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerDown {
    /// Pointer position in screen pixels, relative to the canvas element
    pub screen: Position,
    pub button: PointerButton,
    #[serde(default)]
    pub modifiers: Modifiers,
    pub target: PointerTarget,
}

/// Data carried by a palette drag, keyed like a browser data transfer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragPayload(pub HashMap<String, String>);

impl DragPayload {
    /// Payload carrying a node type tag under the canvas drag key
    pub fn node_type(node_type: impl Into<String>) -> Self {
        let mut data = HashMap::new();
        data.insert(constants::drag::NODE_TYPE_KEY.to_string(), node_type.into());
        Self(data)
    }

    /// The node type tag, if present and not blank
    pub fn node_type_tag(&self) -> Option<&str> {
        self.0
            .get(constants::drag::NODE_TYPE_KEY)
            .map(|tag| tag.trim())
            .filter(|tag| !tag.is_empty())
    }
}

/// One input event for the canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CanvasInput {
    PointerDown(PointerDown),
    PointerMove { screen: Position },
    PointerUp,
    /// Pointer left the canvas element; ends the gesture like `PointerUp`
    PointerLeave,
    #[serde(rename_all = "camelCase")]
    Wheel { delta_y: f64 },
    Key(KeyEvent),
    HoverPort { port: Option<PortRef> },
    #[serde(rename_all = "camelCase")]
    HoverNode { node_id: Option<NodeId> },
    Drop { screen: Position, payload: DragPayload },
    Resize { size: Size },
}
