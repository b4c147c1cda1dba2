//! # Darkroom AI
//!
//! Long-running, network-bound image operations behind a provider
//! abstraction.
//!
//! ```text
//!  Editor ──layer_payload──▶ AiManager ──feature──▶ AiProvider
//!    ▲                                                 │
//!    │                          remove.bg: POST ───────┤
//!    │                          Replicate: submit, poll┘
//!    └──apply_* (StaleGuard)◀── result payload
//! ```
//!
//! Operations are the only async boundary of the editor. Results come
//! back as encoded images and are applied as a new layer source with one
//! undo step, unless the document changed while the request was in flight.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod apply;
pub mod config;
pub mod error;
pub mod feature;
pub mod manager;
pub mod payload;
pub mod poll;
pub mod provider;
pub mod task;

pub use apply::{
    apply_background_removal, apply_enhance, apply_generative_fill, apply_upscale, layer_payload,
    StaleGuard,
};
pub use config::{AiConfig, ProviderConfig, ProviderKind};
pub use error::{AiError, AiResult};
pub use feature::AiFeature;
pub use manager::{AiManager, UsageRecord, UsageSink};
pub use payload::{
    BackgroundRemovalResult, EnhanceResult, GenerativeFillResult, ImagePayload, UpscaleResult,
};
pub use poll::{poll_until, JobStatus, PollConfig, PollState};
pub use provider::{AiProvider, RemoveBgProvider, ReplicateProvider};
pub use task::AiTask;
