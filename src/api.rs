//! Typed REST client for the prepdeck backend.
//!
//! Every request carries the identity bearer token. A 401 with the
//! recognized expired-token body triggers exactly one forced token refresh
//! and one retry of the original request; a second consecutive failure
//! propagates so callers never loop. Grading always comes from the server;
//! this client only transports it.
//!
//! NOTE: We never log tokens, and error logs carry status + path only.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, info, instrument};

use crate::auth::IdentityProvider;
use crate::config::ClientConfig;
use crate::domain::{Practice, Question};
use crate::error::{ApiError, ApiResult};
use crate::protocol::*;

/// Stable error code the backend sends when the free allowance is spent.
const FREE_LIMIT_ERROR: &str = "Free question limit reached";
/// Stable error code for a rejected bearer token.
const TOKEN_ERROR: &str = "Invalid or expired token";

#[derive(Clone)]
pub struct ApiClient<P> {
    http: reqwest::Client,
    base_url: String,
    provider: Arc<P>,
}

impl<P: IdentityProvider> ApiClient<P> {
    pub fn new(base_url: impl Into<String>, provider: Arc<P>) -> ApiResult<Self> {
        Self::with_timeout(base_url, provider, Duration::from_secs(20))
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        provider: Arc<P>,
        timeout: Duration,
    ) -> ApiResult<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            http,
            base_url,
            provider,
        })
    }

    pub fn from_config(cfg: &ClientConfig, provider: Arc<P>) -> ApiResult<Self> {
        Self::with_timeout(
            cfg.api_url.clone(),
            provider,
            Duration::from_secs(cfg.http_timeout_secs),
        )
    }

    /// One authenticated request/response cycle with the single-retry token
    /// refresh rule and the error classification from the backend contract.
    async fn send<T, Q, B>(
        &self,
        method: Method,
        path: &str,
        query: Option<&Q>,
        body: Option<&B>,
    ) -> ApiResult<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
        B: Serialize + ?Sized,
    {
        let mut retried = false;
        loop {
            let token = self
                .provider
                .id_token(retried)
                .await
                .map_err(ApiError::Auth)?;

            let url = format!("{}{}", self.base_url, path);
            let mut req = self
                .http
                .request(method.clone(), &url)
                .header(USER_AGENT, "prepdeck-client/0.1")
                .header(CONTENT_TYPE, "application/json");
            if let Some(t) = &token {
                req = req.header(AUTHORIZATION, format!("Bearer {}", t));
            }
            if let Some(q) = query {
                req = req.query(q);
            }
            if let Some(b) = body {
                req = req.json(b);
            }

            let res = req.send().await?;
            let status = res.status();

            if status.is_success() {
                let raw = res.text().await?;
                return serde_json::from_str::<T>(&raw)
                    .map_err(|e| ApiError::Malformed(format!("{} at {}", e, path)));
            }

            let raw = res.text().await.unwrap_or_default();
            let parsed = serde_json::from_str::<ErrorBody>(&raw).unwrap_or_default();

            if status == StatusCode::UNAUTHORIZED && parsed.error == TOKEN_ERROR && !retried {
                info!(target: "auth", %path, "Bearer token rejected; forcing one refresh and retrying");
                retried = true;
                continue;
            }

            let message = parsed.message.clone().unwrap_or_else(|| {
                if parsed.error.is_empty() {
                    raw.clone()
                } else {
                    parsed.error.clone()
                }
            });
            let err = if status == StatusCode::FORBIDDEN && parsed.error == FREE_LIMIT_ERROR {
                ApiError::FreeLimitReached
            } else if status == StatusCode::UNAUTHORIZED {
                ApiError::Auth(message)
            } else {
                ApiError::Http {
                    status: status.as_u16(),
                    message,
                }
            };
            error!(target: "prepdeck", %path, status = status.as_u16(), error = %err, "Backend request failed");
            return Err(err);
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.send(Method::GET, path, None::<&()>, None::<&()>).await
    }

    async fn get_with_query<T: DeserializeOwned, Q: Serialize>(
        &self,
        path: &str,
        query: &Q,
    ) -> ApiResult<T> {
        self.send(Method::GET, path, Some(query), None::<&()>).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> ApiResult<T> {
        self.send(Method::POST, path, None::<&()>, Some(body)).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.send(Method::POST, path, None::<&()>, None::<&()>).await
    }

    // --- Questions ---

    #[instrument(level = "info", skip(self))]
    pub async fn get_questions(&self, query: &ListQuery) -> ApiResult<QuestionsResponse> {
        self.get_with_query("/api/questions", query).await
    }

    #[instrument(level = "info", skip(self))]
    pub async fn get_question(&self, id: u64) -> ApiResult<Question> {
        let res: QuestionResponse = self.get(&format!("/api/questions/{}", id)).await?;
        Ok(res.question)
    }

    #[instrument(level = "info", skip(self))]
    pub async fn submit_question_answer(
        &self,
        id: u64,
        selected_answer: usize,
    ) -> ApiResult<SubmitAnswerResponse> {
        self.post(
            &format!("/api/questions/{}/submit", id),
            &SubmitAnswerRequest { selected_answer },
        )
        .await
    }

    #[instrument(level = "info", skip(self))]
    pub async fn reset_question_attempts(&self) -> ApiResult<ResetAttemptsResponse> {
        self.post_empty("/api/questions/reset/all").await
    }

    // --- Practices ---

    #[instrument(level = "info", skip(self))]
    pub async fn get_practices(&self, query: &ListQuery) -> ApiResult<PracticesResponse> {
        self.get_with_query("/api/practices", query).await
    }

    #[instrument(level = "info", skip(self))]
    pub async fn get_practice(&self, id: u64) -> ApiResult<Practice> {
        let res: PracticeResponse = self.get(&format!("/api/practices/{}", id)).await?;
        Ok(res.practice)
    }

    #[instrument(level = "info", skip(self))]
    pub async fn submit_practice_answer(
        &self,
        id: u64,
        selected_answer: usize,
    ) -> ApiResult<SubmitAnswerResponse> {
        self.post(
            &format!("/api/practices/{}/submit", id),
            &SubmitAnswerRequest { selected_answer },
        )
        .await
    }

    #[instrument(level = "info", skip(self))]
    pub async fn reset_practice_attempts(&self) -> ApiResult<ResetAttemptsResponse> {
        self.post_empty("/api/practices/reset/all").await
    }

    // --- Dashboard / subscriptions / auth ---

    #[instrument(level = "info", skip(self))]
    pub async fn get_dashboard(&self) -> ApiResult<DashboardData> {
        let res: DashboardResponse = self.get("/api/dashboard").await?;
        Ok(res.dashboard)
    }

    #[instrument(level = "info", skip(self))]
    pub async fn get_subscription_status(&self) -> ApiResult<SubscriptionRecord> {
        let res: SubscriptionStatusResponse = self.get("/api/subscriptions/status").await?;
        Ok(res.subscription)
    }

    #[instrument(level = "info", skip(self))]
    pub async fn create_subscription_checkout(&self) -> ApiResult<CreateCheckoutResponse> {
        self.post_empty("/api/subscriptions/create").await
    }

    #[instrument(level = "info", skip(self))]
    pub async fn verify_auth(&self) -> ApiResult<VerifiedUser> {
        let res: VerifyAuthResponse = self.post_empty("/api/auth/verify").await?;
        Ok(res.user)
    }
}
