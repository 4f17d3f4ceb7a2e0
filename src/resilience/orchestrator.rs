//! Drives one logical request through its timeout policy.
//!
//! # Responsibilities
//! - Select the policy (assigned, or by classification)
//! - Bound each attempt by its `AttemptSpec` timeout
//! - Decide retry, exhaustion or terminal failure after each attempt
//! - Wait the scheduled delay before a retry
//! - Record the timeline and emit logs and metrics per attempt
//!
//! # Design Decisions
//! - Attempts are strictly sequential; the next one starts only after the
//!   previous one finished or was dropped
//! - Dropping the orchestrator future drops the in-flight attempt, which
//!   releases its pool slot and any partially buffered body
//! - The overall retry time limit is opt-in through
//!   `execute_within_time_limit`

use std::sync::Arc;

use http::Uri;
use tokio::time::Instant;

use crate::error::GatewayError;
use crate::http::{GatewayCodec, LogicalRequest, RawResponse};
use crate::lifecycle::CancelToken;
use crate::observability::{metrics, TimelineMark, TimelineSnapshot};
use crate::policy::{PolicyKind, PolicyRegistry, TimeoutPolicy};
use crate::resilience::retries::{AttemptCursor, RetryDecision};
use crate::transport::Transport;

/// Successful outcome of a logical request.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub response: RawResponse,
    /// Number of attempts made, including the successful one.
    pub attempts: usize,
    pub policy: PolicyKind,
    pub timeline: TimelineSnapshot,
}

impl GatewayResponse {
    /// Hand the raw `(status, headers, body)` triple to the codec.
    pub fn unwrap_with<C: GatewayCodec>(
        self,
        codec: &C,
        endpoint: &Uri,
        request: &LogicalRequest,
    ) -> Result<C::Response, C::Error> {
        let (status, headers, body) = self.response.into_parts();
        codec.unwrap_to_response(endpoint, request, status, &headers, body)
    }
}

/// Retry orchestrator over a transport and the policy registry.
pub struct RetryOrchestrator<T> {
    transport: T,
    policies: Arc<PolicyRegistry>,
}

impl<T: Transport> RetryOrchestrator<T> {
    pub fn new(transport: T, policies: Arc<PolicyRegistry>) -> Self {
        Self {
            transport,
            policies,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn policies(&self) -> &PolicyRegistry {
        &self.policies
    }

    /// Run the request under its assigned or selected policy.
    pub async fn execute(&self, request: &LogicalRequest) -> Result<GatewayResponse, GatewayError> {
        let policy = self.policies.for_request(request);
        self.execute_with_policy(request, policy).await
    }

    /// Like [`execute`](Self::execute), but gives up with `Cancelled` as soon
    /// as `token` fires.
    pub async fn execute_until(
        &self,
        request: &LogicalRequest,
        token: &CancelToken,
    ) -> Result<GatewayResponse, GatewayError> {
        let mut token = token.clone();
        if token.is_cancelled() {
            return Err(GatewayError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = token.cancelled() => {
                request.timeline().mark(TimelineMark::Completed);
                tracing::info!(request_id = %request.id(), "Request cancelled");
                Err(GatewayError::Cancelled)
            }
            result = self.execute(request) => result,
        }
    }

    /// Like [`execute`](Self::execute), bounded by the policy's overall
    /// retry time limit.
    pub async fn execute_within_time_limit(
        &self,
        request: &LogicalRequest,
    ) -> Result<GatewayResponse, GatewayError> {
        let policy = self.policies.for_request(request);
        let limit = policy.maximum_retry_time_limit();
        match tokio::time::timeout(limit, self.execute_with_policy(request, policy)).await {
            Ok(result) => result,
            Err(_) => {
                request.timeline().mark(TimelineMark::Completed);
                tracing::warn!(
                    request_id = %request.id(),
                    policy = %policy.kind(),
                    limit = ?limit,
                    "Retry time limit exceeded"
                );
                Err(GatewayError::RetryTimeLimitExceeded { limit })
            }
        }
    }

    /// Run the request under an explicit policy.
    pub async fn execute_with_policy(
        &self,
        request: &LogicalRequest,
        policy: &TimeoutPolicy,
    ) -> Result<GatewayResponse, GatewayError> {
        let kind = policy.kind();
        let mut cursor = AttemptCursor::new(policy);

        let outcome = loop {
            let spec = cursor.spec();
            let attempt = cursor.attempt_number();
            request.timeline().begin_attempt();

            tracing::debug!(
                request_id = %request.id(),
                policy = %kind,
                attempt,
                timeout = ?spec.timeout(),
                method = %request.method(),
                uri = %request.uri(),
                "Starting attempt"
            );

            let started = Instant::now();
            let result = match tokio::time::timeout(
                spec.timeout(),
                self.transport.send(request, spec.timeout()),
            )
            .await
            {
                Ok(Ok(response)) if response.is_request_timeout() => {
                    Err(GatewayError::RequestTimeout { response })
                }
                Ok(result) => result,
                Err(_) => Err(GatewayError::AttemptTimeout {
                    attempt,
                    timeout: spec.timeout(),
                }),
            };

            let elapsed = started.elapsed();
            let error = match result {
                Ok(response) => {
                    metrics::record_attempt(kind.as_str(), "success", elapsed);
                    tracing::debug!(
                        request_id = %request.id(),
                        policy = %kind,
                        attempt,
                        status = response.status().as_u16(),
                        elapsed = ?elapsed,
                        "Attempt succeeded"
                    );
                    break Ok((response, attempt));
                }
                Err(error) => error,
            };
            metrics::record_attempt(kind.as_str(), error.label(), elapsed);

            match cursor.decide(request.method(), &error) {
                RetryDecision::Retry { delay } => {
                    tracing::info!(
                        request_id = %request.id(),
                        policy = %kind,
                        attempt,
                        delay = ?delay,
                        error = %error,
                        "Retrying request"
                    );
                    metrics::record_retry(kind.as_str(), error.label());
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    cursor.advance();
                }
                RetryDecision::Exhausted => {
                    let unavailable = policy.throw_unavailable_on_exhaustion();
                    tracing::warn!(
                        request_id = %request.id(),
                        policy = %kind,
                        attempts = attempt,
                        unavailable,
                        error = %error,
                        "Timeout policy exhausted"
                    );
                    metrics::record_exhausted(kind.as_str(), unavailable);
                    break Err(policy.exhausted(error, attempt));
                }
                RetryDecision::Terminal => {
                    tracing::warn!(
                        request_id = %request.id(),
                        policy = %kind,
                        attempt,
                        error = %error,
                        "Request failed"
                    );
                    break Err(error);
                }
            }
        };

        request.timeline().mark(TimelineMark::Completed);
        let timeline = request.timeline().snapshot();
        tracing::debug!(
            request_id = %request.id(),
            timeline = %timeline,
            "Request completed"
        );

        outcome.map(|(response, attempts)| GatewayResponse {
            response,
            attempts,
            policy: kind,
            timeline,
        })
    }
}
