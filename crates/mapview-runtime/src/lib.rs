#![forbid(unsafe_code)]

//! Runtime plumbing for the map view engine.
//!
//! # Role in the map view engine
//! Everything here is timing policy rather than map logic:
//!
//! - [`retry`]: bounded retry with deterministic backoff.
//! - [`scheduler`]: the injected timer seam. The host owns real timers and
//!   fires [`TimerId`]s back into the engine; tests use [`ManualScheduler`].
//! - [`cancellation`]: liveness tokens checked by asynchronous callbacks.
//! - [`config`]: policy-as-data [`EngineConfig`].
//!
//! The engine is single-threaded and host-driven, so nothing in this crate
//! spawns threads or blocks.

pub mod cancellation;
pub mod config;
pub mod retry;
pub mod scheduler;

pub use cancellation::{CancellationSource, CancellationToken};
pub use config::{
    CameraPolicyConfig, EngineConfig, MapPolicyConfig, MarkerPolicyConfig, PolicyConfigError,
    ProviderKind, SdkLoadPolicyConfig, SheetPolicyConfig,
};
pub use retry::{BackoffStrategy, RetryPolicy, RetryState};
pub use scheduler::{ManualScheduler, Scheduler, TimerId};
