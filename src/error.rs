//! Error taxonomy for the client core.
//!
//! Nothing here is fatal: every failure degrades to a state the embedding UI
//! can retry from by navigating away and back. The split matters to callers:
//! entitlement failures render a premium upsell, validation failures never
//! reach the network, and transport failures render a generic retry prompt.

use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Identity provider or backend rejected the credentials/token, including
    /// a 401 that survived the single forced token refresh.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// 403 carrying the recognized free-tier error body. Rendered as an
    /// upsell, not as a generic failure.
    #[error("free question limit reached")]
    FreeLimitReached,

    /// Any other non-2xx response.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Transport-level failure (DNS, TLS, timeout, connection reset).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A 2xx response whose body did not match the documented schema.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Rejected client-side before any request was issued (e.g. submitting
    /// with no answer selected).
    #[error("{0}")]
    Validation(String),
}

impl ApiError {
    /// True when the failure should render the premium upsell instead of a
    /// generic error message.
    pub fn is_free_limit(&self) -> bool {
        matches!(self, ApiError::FreeLimitReached)
    }
}
