#![forbid(unsafe_code)]

//! Pointer input vocabulary for the bottom-sheet drag region.
//!
//! The host flattens DOM pointer/touch events into these types. Only the
//! vertical screen coordinate matters to the sheet; horizontal motion is
//! never consulted.

use serde::{Deserialize, Serialize};

/// Input device that produced a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerSource {
    #[default]
    Mouse,
    Touch,
    Pen,
}

/// Mouse button (touch and pen contacts report `Primary`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerButton {
    #[default]
    Primary,
    Secondary,
    Middle,
}

/// Tags that always count as interactive controls.
const INTERACTIVE_TAGS: &[&str] = &[
    "a", "button", "input", "label", "option", "select", "summary", "textarea",
];

/// ARIA roles that count as interactive controls.
const INTERACTIVE_ROLES: &[&str] = &[
    "button", "checkbox", "link", "menuitem", "option", "switch", "tab",
];

/// Description of the DOM element an event landed on.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTarget {
    /// Lowercase tag name (`div`, `button`, ...).
    #[serde(default)]
    pub tag: String,
    /// ARIA role, if any.
    #[serde(default)]
    pub role: Option<String>,
    /// Set by the host when any ancestor below the drag region is interactive.
    #[serde(default)]
    pub interactive_ancestor: bool,
}

impl EventTarget {
    /// Plain, non-interactive surface of the drag region.
    #[must_use]
    pub fn surface() -> Self {
        Self {
            tag: "div".into(),
            role: None,
            interactive_ancestor: false,
        }
    }

    /// Target with the given tag and no role.
    #[must_use]
    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            role: None,
            interactive_ancestor: false,
        }
    }

    /// Default interactive-element predicate.
    #[must_use]
    pub fn is_interactive(&self) -> bool {
        if self.interactive_ancestor {
            return true;
        }
        let tag = self.tag.to_ascii_lowercase();
        if INTERACTIVE_TAGS.contains(&tag.as_str()) {
            return true;
        }
        self.role
            .as_deref()
            .is_some_and(|role| INTERACTIVE_ROLES.contains(&role.to_ascii_lowercase().as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buttons_and_links_are_interactive() {
        assert!(EventTarget::tag("button").is_interactive());
        assert!(EventTarget::tag("A").is_interactive());
        assert!(EventTarget::tag("textarea").is_interactive());
    }

    #[test]
    fn surface_is_not_interactive() {
        assert!(!EventTarget::surface().is_interactive());
        assert!(!EventTarget::tag("span").is_interactive());
    }

    #[test]
    fn role_marks_div_interactive() {
        let target = EventTarget {
            tag: "div".into(),
            role: Some("Button".into()),
            interactive_ancestor: false,
        };
        assert!(target.is_interactive());
    }

    #[test]
    fn interactive_ancestor_propagates() {
        let target = EventTarget {
            tag: "img".into(),
            role: None,
            interactive_ancestor: true,
        };
        assert!(target.is_interactive());
    }

    #[test]
    fn target_parses_from_host_json() {
        let target: EventTarget =
            serde_json::from_str(r#"{"tag":"svg","interactiveAncestor":true}"#).unwrap();
        assert!(target.is_interactive());
    }
}
