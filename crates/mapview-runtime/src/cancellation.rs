// SPDX-License-Identifier: MIT
//! Cooperative cancellation tokens for asynchronous host callbacks.
//!
//! [`CancellationToken`] is a cloneable liveness flag. Callbacks that outlive
//! the call that registered them (SDK script load completion, geolocation
//! answers) hold a token and check it before touching engine state; teardown
//! cancels the [`CancellationSource`].
//!
//! # Example
//!
//! ```
//! use mapview_runtime::cancellation::CancellationSource;
//!
//! let source = CancellationSource::new();
//! let token = source.token();
//!
//! // Handed to the script loader's completion callback.
//! let on_loaded = move || !token.is_cancelled();
//!
//! source.cancel();
//! assert!(!on_loaded());
//! ```

#![forbid(unsafe_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A cloneable cancellation token.
///
/// Tokens observe their source's state and are cheap to clone.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    inner: Arc<AtomicBool>,
}

/// The control handle that triggers cancellation.
///
/// Dropping the source does **not** cancel the token. Call
/// [`cancel`](Self::cancel) explicitly.
#[derive(Debug)]
pub struct CancellationSource {
    inner: Arc<AtomicBool>,
}

impl CancellationSource {
    /// Create a new cancellation source with an uncancelled token.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Obtain a cloneable token that observes this source's state.
    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Signal cancellation. All derived tokens observe it immediately.
    pub fn cancel(&self) {
        self.inner.store(true, Ordering::Release);
    }

    /// Check whether cancellation has already been requested.
    pub fn is_cancelled(&self) -> bool {
        self.inner.load(Ordering::Acquire)
    }
}

impl Default for CancellationSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    /// Returns `true` if cancellation has been requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.load(Ordering::Acquire)
    }

    /// Returns `true` while the owning component is still alive.
    #[inline]
    pub fn is_live(&self) -> bool {
        !self.is_cancelled()
    }
}
