#![forbid(unsafe_code)]

//! Tokens for host-reported clicks.
//!
//! Marker markup and info-window close buttons carry an opaque token
//! (`data-mv-callback="mv-cb-7"`, or an SDK listener registered with it).
//! When the host sees the click it hands the token back and the registry
//! resolves it to a [`CallbackAction`]. Nothing is registered on `window`.

use std::collections::HashMap;

use mapview_core::model::MarkerKind;

/// Prefix of every generated token.
pub const TOKEN_PREFIX: &str = "mv-cb-";

/// What a token stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    MarkerClick { kind: MarkerKind, owner_id: String },
    CloseInfoWindow,
}

/// Token → action map owned by the marker manager.
#[derive(Debug, Default)]
pub struct CallbackRegistry {
    next: u64,
    actions: HashMap<String, CallbackAction>,
}

impl CallbackRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `action` under a fresh token. Tokens are never reused.
    pub fn register(&mut self, action: CallbackAction) -> String {
        self.next += 1;
        let token = format!("{TOKEN_PREFIX}{}", self.next);
        self.actions.insert(token.clone(), action);
        token
    }

    #[must_use]
    pub fn resolve(&self, token: &str) -> Option<&CallbackAction> {
        self.actions.get(token)
    }

    /// Forget `token`. Returns `false` if it was not registered.
    pub fn release(&mut self, token: &str) -> bool {
        self.actions.remove(token).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }
}
