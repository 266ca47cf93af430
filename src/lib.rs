//! Prepdeck · Interview-Prep Client Core
//!
//! - Typed REST client for the prepdeck backend (reqwest)
//! - Identity session bridge over a pluggable provider
//! - Application store: cached server collections + refresh counters
//! - Entitlement rules (free tier vs premium unlock)
//! - Persisted filter / onboarding preferences
//!
//! This crate is the headless core an embedding UI drives. It owns no
//! rendering and no HTTP server surface; all content and grading live in the
//! backend and are only consumed here.
//!
//! Important env variables:
//!   PREPDECK_API_URL            : backend base URL (default http://localhost:3000)
//!   PREPDECK_DATA_DIR           : directory for persisted client blobs
//!   PREPDECK_HTTP_TIMEOUT_SECS  : request timeout (default 20)
//!   PREPDECK_CONFIG_PATH        : path to TOML config overriding defaults
//!   LOG_LEVEL                   : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT                  : "pretty" (default) or "json"

pub mod telemetry;
pub mod config;
pub mod domain;
pub mod protocol;
pub mod error;
pub mod storage;
pub mod auth;
pub mod api;
pub mod entitlement;
pub mod store;
pub mod filters;
pub mod attempt;

#[cfg(test)]
pub mod testutil;

pub use api::ApiClient;
pub use attempt::{AttemptFlow, AttemptPhase, Family};
pub use auth::{AuthOutcome, IdentityProvider, SessionBridge, SessionState};
pub use config::ClientConfig;
pub use domain::{Difficulty, Identity, Level, Practice, Question};
pub use entitlement::{can_access, should_show_paywall, AccessDecision, EntitlementState};
pub use error::{ApiError, ApiResult};
pub use filters::{DisplayCard, FilterStore, TeaserCard};
pub use store::{AppStore, Resource};
pub use storage::ClientStorage;
