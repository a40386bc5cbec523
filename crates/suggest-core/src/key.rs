//! Navigation keys understood by the widget.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A keyboard action on an open suggestion list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NavKey {
    /// Move the highlight down one item.
    Down,
    /// Move the highlight up one item, back to the typed text past the top.
    Up,
    /// Commit the highlighted item.
    Enter,
    /// Close the list and restore the typed text.
    Escape,
}

impl FromStr for NavKey {
    type Err = String;

    /// Accepts key names ("down", "arrowdown") and legacy key codes ("40").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "down" | "arrowdown" | "40" => Ok(NavKey::Down),
            "up" | "arrowup" | "38" => Ok(NavKey::Up),
            "enter" | "return" | "13" => Ok(NavKey::Enter),
            "escape" | "esc" | "27" => Ok(NavKey::Escape),
            other => Err(format!("Unknown key: {}", other)),
        }
    }
}
