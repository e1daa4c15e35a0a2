#![forbid(unsafe_code)]

//! The call seam between the engine and a JavaScript map SDK.
//!
//! Provider adapters never touch JS objects directly. They describe each
//! operation as an [`SdkCall`] and hand it to an [`SdkBridge`]; a
//! wasm-bindgen host dispatches the call into the loaded namespace and
//! returns an [`SdkObjectId`] for anything it constructed.
//!
//! # Argument conventions
//!
//! Arguments are plain JSON with three reserved single-key objects the host
//! resolves before dispatch:
//!
//! - `{"$ref": n}`: the JS object previously returned as `SdkObjectId(n)`.
//! - `{"$element": "id"}`: `document.getElementById("id")`.
//! - `{"$html": "..."}`: an element built from the given markup.
//!
//! `null` stays `null` (used for `setMap(null)` detaches).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Host-side identity of a constructed SDK object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SdkObjectId(u64);

impl SdkObjectId {
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Argument form that the host resolves back into the JS object.
    #[must_use]
    pub fn to_arg(self) -> Value {
        json!({ "$ref": self.0 })
    }
}

/// One operation against the SDK namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SdkCall {
    /// `new <class>(...args)`; the bridge returns the new object's id.
    Construct { class: String, args: Vec<Value> },
    /// `target.<method>(...args)`.
    Invoke {
        target: SdkObjectId,
        method: String,
        args: Vec<Value>,
    },
    /// `target.<property> = value`.
    SetProperty {
        target: SdkObjectId,
        property: String,
        value: Value,
    },
    /// Subscribe to `event` on `target`; the host reports it back with `token`.
    Listen {
        target: SdkObjectId,
        event: String,
        token: String,
    },
    /// Drop the host's reference to `target` and any listeners on it.
    Release { target: SdkObjectId },
}

impl SdkCall {
    pub fn construct(class: impl Into<String>, args: Vec<Value>) -> Self {
        Self::Construct {
            class: class.into(),
            args,
        }
    }

    pub fn invoke(target: SdkObjectId, method: impl Into<String>, args: Vec<Value>) -> Self {
        Self::Invoke {
            target,
            method: method.into(),
            args,
        }
    }

    pub fn set(target: SdkObjectId, property: impl Into<String>, value: Value) -> Self {
        Self::SetProperty {
            target,
            property: property.into(),
            value,
        }
    }

    /// Short label for logs: class, method, property, or event name.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Construct { class, .. } => class,
            Self::Invoke { method, .. } => method,
            Self::SetProperty { property, .. } => property,
            Self::Listen { event, .. } => event,
            Self::Release { .. } => "release",
        }
    }

    /// Object the call operates on (`None` for constructors).
    #[must_use]
    pub const fn target(&self) -> Option<SdkObjectId> {
        match self {
            Self::Construct { .. } => None,
            Self::Invoke { target, .. }
            | Self::SetProperty { target, .. }
            | Self::Listen { target, .. }
            | Self::Release { target } => Some(*target),
        }
    }
}

/// Failure reported by the host while executing an [`SdkCall`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SdkError {
    #[error("SDK namespace `{0}` is not loaded")]
    NamespaceMissing(String),
    #[error("SDK call `{call}` failed: {message}")]
    CallFailed { call: String, message: String },
    #[error("SDK constructor `{0}` returned no object")]
    MissingObject(String),
}

/// Executes SDK calls on behalf of the provider adapters.
pub trait SdkBridge {
    /// Whether the global namespace (`google.maps`, `naver.maps`) exists yet.
    fn namespace_loaded(&self, namespace: &str) -> bool;

    /// Execute one call. Constructors return `Some(id)`; everything else
    /// returns `None` on success.
    fn invoke(&mut self, call: SdkCall) -> Result<Option<SdkObjectId>, SdkError>;
}

type FailurePredicate = Box<dyn Fn(&SdkCall) -> bool>;

/// In-memory bridge that records every successful call.
///
/// Used by tests and by hosts that want to replay a session. Namespaces start
/// unloaded; failures can be injected per call with [`fail_when`].
///
/// [`fail_when`]: RecordingBridge::fail_when
#[derive(Default)]
pub struct RecordingBridge {
    loaded: BTreeSet<String>,
    calls: Vec<SdkCall>,
    live: BTreeMap<SdkObjectId, String>,
    next_object: u64,
    failures: usize,
    fail_when: Option<FailurePredicate>,
}

impl std::fmt::Debug for RecordingBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingBridge")
            .field("loaded", &self.loaded)
            .field("calls", &self.calls.len())
            .field("live", &self.live.len())
            .field("failures", &self.failures)
            .finish()
    }
}

impl RecordingBridge {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bridge with `namespace` already loaded.
    #[must_use]
    pub fn with_namespace(namespace: &str) -> Self {
        let mut bridge = Self::new();
        bridge.load_namespace(namespace);
        bridge
    }

    pub fn load_namespace(&mut self, namespace: &str) {
        self.loaded.insert(namespace.to_owned());
    }

    pub fn unload_namespace(&mut self, namespace: &str) {
        self.loaded.remove(namespace);
    }

    /// Fail every call matching `predicate` with [`SdkError::CallFailed`].
    pub fn fail_when(&mut self, predicate: impl Fn(&SdkCall) -> bool + 'static) {
        self.fail_when = Some(Box::new(predicate));
    }

    pub fn clear_failures(&mut self) {
        self.fail_when = None;
    }

    /// Successful calls in order.
    #[must_use]
    pub fn calls(&self) -> &[SdkCall] {
        &self.calls
    }

    /// Take the recorded calls, leaving the log empty.
    pub fn take_calls(&mut self) -> Vec<SdkCall> {
        std::mem::take(&mut self.calls)
    }

    /// Number of calls rejected by the failure predicate.
    #[must_use]
    pub const fn failures(&self) -> usize {
        self.failures
    }

    /// Recorded constructor calls for `class`.
    #[must_use]
    pub fn constructed(&self, class: &str) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, SdkCall::Construct { class: c, .. } if c == class))
            .count()
    }

    /// Recorded invocations of `method`, as their argument lists.
    #[must_use]
    pub fn invocations(&self, method: &str) -> Vec<&[Value]> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                SdkCall::Invoke { method: m, args, .. } if m == method => Some(args.as_slice()),
                _ => None,
            })
            .collect()
    }

    /// Objects constructed and not yet released, with their class.
    #[must_use]
    pub fn live_objects(&self) -> &BTreeMap<SdkObjectId, String> {
        &self.live
    }

    /// Live objects of `class`.
    #[must_use]
    pub fn live_count(&self, class: &str) -> usize {
        self.live.values().filter(|c| c.as_str() == class).count()
    }

    fn class_loaded(&self, class: &str) -> bool {
        self.loaded
            .iter()
            .any(|ns| class.strip_prefix(ns.as_str()).is_some_and(|rest| rest.starts_with('.')))
    }
}

impl SdkBridge for RecordingBridge {
    fn namespace_loaded(&self, namespace: &str) -> bool {
        self.loaded.contains(namespace)
    }

    fn invoke(&mut self, call: SdkCall) -> Result<Option<SdkObjectId>, SdkError> {
        if let Some(predicate) = &self.fail_when
            && predicate(&call)
        {
            self.failures += 1;
            return Err(SdkError::CallFailed {
                call: call.label().to_owned(),
                message: "injected failure".into(),
            });
        }

        let created = match &call {
            SdkCall::Construct { class, .. } => {
                if !self.class_loaded(class) {
                    return Err(SdkError::NamespaceMissing(class.clone()));
                }
                self.next_object += 1;
                let id = SdkObjectId(self.next_object);
                self.live.insert(id, class.clone());
                Some(id)
            }
            SdkCall::Release { target } => {
                self.live.remove(target);
                None
            }
            _ => None,
        };
        self.calls.push(call);
        Ok(created)
    }
}
