//! Key-to-action mapping
//!
//! Shortcuts are global: the host forwards every key press, and the canvas
//! decides whether it means anything. The mapping only names the action;
//! what copy, paste or undo do is up to the graph store.

use serde::{Deserialize, Serialize};

use crate::input::Modifiers;
use crate::state::CanvasAction;

/// A pressed key, named like the DOM `KeyboardEvent.key` values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Key {
    Delete,
    Backspace,
    Escape,
    /// A single printable character
    Character(char),
    /// Any other named key
    Other(String),
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        match name.as_str() {
            "Delete" => Key::Delete,
            "Backspace" => Key::Backspace,
            "Escape" | "Esc" => Key::Escape,
            _ => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Character(c),
                    _ => Key::Other(name),
                }
            }
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::from(name.to_string())
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        match key {
            Key::Delete => "Delete".to_string(),
            Key::Backspace => "Backspace".to_string(),
            Key::Escape => "Escape".to_string(),
            Key::Character(c) => c.to_string(),
            Key::Other(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key: Key,
    #[serde(default)]
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: impl Into<Key>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            modifiers,
        }
    }

    /// Key with no modifiers held
    pub fn plain(key: impl Into<Key>) -> Self {
        Self::new(key, Modifiers::NONE)
    }

    /// Key with the platform modifier (Ctrl) held
    pub fn command(key: impl Into<Key>) -> Self {
        Self::new(
            key,
            Modifiers {
                ctrl: true,
                ..Modifiers::NONE
            },
        )
    }
}

/// Canvas commands reachable from the keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shortcut {
    DeleteSelection,
    /// Clear selection and abandon any connection drag
    Cancel,
    SelectAll,
    ZoomIn,
    ZoomOut,
    ResetView,
    Copy,
    Paste,
    Cut,
    Undo,
    Redo,
}

impl Shortcut {
    /// Actions the controller dispatches for this shortcut
    pub fn actions(self) -> Vec<CanvasAction> {
        match self {
            Shortcut::DeleteSelection => vec![CanvasAction::DeleteSelection],
            Shortcut::Cancel => vec![CanvasAction::DeselectAll, CanvasAction::CancelConnecting],
            Shortcut::SelectAll => vec![CanvasAction::SelectAll],
            Shortcut::ZoomIn => vec![CanvasAction::ZoomIn],
            Shortcut::ZoomOut => vec![CanvasAction::ZoomOut],
            Shortcut::ResetView => vec![CanvasAction::ResetView],
            Shortcut::Copy => vec![CanvasAction::Copy],
            Shortcut::Paste => vec![CanvasAction::Paste],
            Shortcut::Cut => vec![CanvasAction::Cut],
            Shortcut::Undo => vec![CanvasAction::Undo],
            Shortcut::Redo => vec![CanvasAction::Redo],
        }
    }
}

/// Map a key press to a shortcut, if it is one
pub fn shortcut_for(event: &KeyEvent) -> Option<Shortcut> {
    let modifiers = &event.modifiers;

    match &event.key {
        Key::Delete | Key::Backspace => Some(Shortcut::DeleteSelection),
        Key::Escape => Some(Shortcut::Cancel),
        Key::Character(c) if modifiers.platform() => match c.to_ascii_lowercase() {
            'a' => Some(Shortcut::SelectAll),
            'c' => Some(Shortcut::Copy),
            'v' => Some(Shortcut::Paste),
            'x' => Some(Shortcut::Cut),
            'z' if modifiers.shift => Some(Shortcut::Redo),
            'z' => Some(Shortcut::Undo),
            'y' => Some(Shortcut::Redo),
            _ => None,
        },
        // '+' usually arrives with shift held, so shift is not checked
        Key::Character('+' | '=') => Some(Shortcut::ZoomIn),
        Key::Character('-') => Some(Shortcut::ZoomOut),
        Key::Character('0') => Some(Shortcut::ResetView),
        _ => None,
    }
}
