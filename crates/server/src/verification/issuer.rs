//! Verification code issue and verify flow.
//!
//! Each identity has at most one outstanding challenge; issuing a new
//! code replaces the previous one immediately. Codes live for
//! [`CODE_TTL`] and issuance is capped per identity by the rate-limit
//! store. The code value itself only ever travels inside the delivered
//! email.

use crate::email_templates::VerificationCodeEmailTemplate;
use crate::error::{MailerError, RequestCodeError, VerifyCodeError};
use crate::mailer::{Mailer, OutgoingMessage};
use crate::verification::rate_limit::{RateLimitDecision, RateLimitStore};
use dashmap::DashMap;
use rand::Rng;
use std::sync::Arc;
use time::{Duration, OffsetDateTime};

/// How long an issued code stays valid.
pub const CODE_TTL: Duration = Duration::minutes(10);

/// Maximum code issuances per identity within [`RATE_LIMIT_WINDOW`].
pub const MAX_CODES_PER_WINDOW: u32 = 5;

/// Window for the issuance limit.
pub const RATE_LIMIT_WINDOW: Duration = Duration::hours(1);

/// Total delivery attempts per issuance (first try plus retries).
pub const MAX_SEND_ATTEMPTS: u32 = 3;

/// Default pause between delivery attempts.
pub const SEND_RETRY_BACKOFF: tokio::time::Duration = tokio::time::Duration::from_millis(500);

#[derive(Clone, Debug)]
struct VerificationChallenge {
    code: String,
    issued_at: OffsetDateTime,
    expires_at: OffsetDateTime,
}

/// What the caller gets back from an issuance. Deliberately excludes the
/// code.
#[derive(Clone, Debug)]
pub struct ChallengeHandle {
    pub identity_key: String,
    pub expires_at: OffsetDateTime,
}

/// Issues, delivers and verifies transient codes.
pub struct CodeIssuer {
    mailer: Arc<dyn Mailer>,
    rate_limits: Arc<dyn RateLimitStore>,
    challenges: DashMap<String, VerificationChallenge>,
    retry_backoff: tokio::time::Duration,
}

impl CodeIssuer {
    pub fn new(mailer: Arc<dyn Mailer>, rate_limits: Arc<dyn RateLimitStore>) -> Self {
        Self {
            mailer,
            rate_limits,
            challenges: DashMap::new(),
            retry_backoff: SEND_RETRY_BACKOFF,
        }
    }

    /// Overrides the pause between delivery attempts.
    pub fn with_retry_backoff(mut self, backoff: tokio::time::Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Issues a fresh code for `identity_key` and emails it out.
    /// `context` names the flow the code belongs to and appears in the
    /// email body.
    #[tracing::instrument(skip(self, context))]
    pub async fn request_code(
        &self,
        identity_key: &str,
        context: &str,
    ) -> Result<ChallengeHandle, RequestCodeError> {
        self.request_code_at(identity_key, context, OffsetDateTime::now_utc())
            .await
    }

    /// Clock-explicit variant of [`CodeIssuer::request_code`].
    pub async fn request_code_at(
        &self,
        identity_key: &str,
        context: &str,
        now: OffsetDateTime,
    ) -> Result<ChallengeHandle, RequestCodeError> {
        match self.rate_limits.try_acquire(
            identity_key,
            MAX_CODES_PER_WINDOW,
            RATE_LIMIT_WINDOW,
            now,
        ) {
            RateLimitDecision::Allowed { remaining } => {
                tracing::debug!(identity = %identity_key, remaining, "issuance slot acquired");
            }
            RateLimitDecision::Limited => {
                tracing::warn!(
                    name = "verification.request_code.rate_limited",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    identity = %identity_key,
                    message = "Verification code request rejected by rate limit"
                );
                return Err(RequestCodeError::RateLimited);
            }
        }

        let code = generate_code();
        let expires_at = now + CODE_TTL;
        // Stored before delivery; a replaced challenge is dead from this
        // point even if the new email never arrives.
        self.challenges.insert(
            identity_key.to_string(),
            VerificationChallenge {
                code: code.clone(),
                issued_at: now,
                expires_at,
            },
        );

        let template = VerificationCodeEmailTemplate {
            code,
            context: context.to_string(),
            expires_minutes: CODE_TTL.whole_minutes(),
        };
        let message = OutgoingMessage {
            to: identity_key.to_string(),
            subject: template.subject(),
            html: template.render_html(),
            text: template.render_text(),
        };

        self.deliver_with_retry(identity_key, message).await?;

        Ok(ChallengeHandle {
            identity_key: identity_key.to_string(),
            expires_at,
        })
    }

    async fn deliver_with_retry(
        &self,
        identity_key: &str,
        message: OutgoingMessage,
    ) -> Result<(), MailerError> {
        let mut attempt = 1u32;
        loop {
            match self.mailer.send(message.clone()).await {
                Ok(receipt) => {
                    tracing::info!(
                        identity = %identity_key,
                        message_id = %receipt.message_id,
                        attempt,
                        "verification code email accepted by transport"
                    );
                    return Ok(());
                }
                Err(e) if e.is_retryable() && attempt < MAX_SEND_ATTEMPTS => {
                    tracing::warn!(
                        name = "verification.deliver.retrying",
                        target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                        error = %e,
                        identity = %identity_key,
                        attempt,
                        message = "Verification email attempt failed, retrying"
                    );
                    attempt += 1;
                    tokio::time::sleep(self.retry_backoff).await;
                }
                Err(e) => {
                    tracing::error!(
                        name = "verification.deliver.failed",
                        target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                        error = %e,
                        identity = %identity_key,
                        attempt,
                        message = "Verification email could not be delivered"
                    );
                    return Err(e);
                }
            }
        }
    }

    /// Checks `submitted_code` against the outstanding challenge for
    /// `identity_key`. Success consumes the challenge; a mismatch leaves
    /// it in place so the user can retry within the window.
    #[tracing::instrument(skip(self, submitted_code))]
    pub fn verify_code(
        &self,
        identity_key: &str,
        submitted_code: &str,
    ) -> Result<(), VerifyCodeError> {
        self.verify_code_at(identity_key, submitted_code, OffsetDateTime::now_utc())
    }

    /// Clock-explicit variant of [`CodeIssuer::verify_code`].
    pub fn verify_code_at(
        &self,
        identity_key: &str,
        submitted_code: &str,
        now: OffsetDateTime,
    ) -> Result<(), VerifyCodeError> {
        // The map guard must be dropped before the remove below.
        let age = {
            let Some(challenge) = self.challenges.get(identity_key) else {
                return Err(VerifyCodeError::NoChallenge);
            };
            if now > challenge.expires_at {
                // Kept around until a sweep or a new issuance, so repeat
                // submissions keep answering Expired rather than NoChallenge.
                return Err(VerifyCodeError::Expired);
            }
            if challenge.code != submitted_code {
                return Err(VerifyCodeError::Mismatch);
            }
            now - challenge.issued_at
        };

        self.challenges.remove(identity_key);
        tracing::info!(
            identity = %identity_key,
            code_age_seconds = age.whole_seconds(),
            "identity verified"
        );
        Ok(())
    }

    /// Removes expired challenges and rate-limit records older than the
    /// issuance window. Run periodically by the binary.
    #[tracing::instrument(skip(self))]
    pub fn sweep_expired(&self, now: OffsetDateTime) {
        self.challenges.retain(|_, challenge| now <= challenge.expires_at);
        self.rate_limits.sweep(now - RATE_LIMIT_WINDOW);
    }
}

/// Uniform 4-digit code; the range starts at 1000 so a leading zero can
/// never be dropped.
fn generate_code() -> String {
    let mut rng = rand::rng();
    rng.random_range(1000..=9999).to_string()
}
