//! Outbound mail delivery.
//!
//! Everything that sends email goes through the [`Mailer`] trait so the
//! dispatch and verification components stay independent of the transport.
//! [`SmtpMailer`] is the production backend; [`NoopMailer`] logs and drops
//! mail for local development.

use crate::config::SmtpConfig;
use crate::error::MailerError;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::sync::atomic::{AtomicU64, Ordering};

/// A fully rendered email, ready for a transport.
#[derive(Clone, Debug)]
pub struct OutgoingMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Transport acknowledgement for a delivered message.
#[derive(Clone, Debug)]
pub struct SendReceipt {
    pub message_id: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: OutgoingMessage) -> Result<SendReceipt, MailerError>;
}

/// SMTP relay backend over lettre's async transport.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn from_config(smtp: &SmtpConfig) -> Result<Self, MailerError> {
        let creds = Credentials::new(smtp.username.clone(), smtp.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.server)
            .map_err(|e| MailerError::Connection(e.to_string()))?
            .port(smtp.port)
            .credentials(creds)
            .build();
        Ok(Self {
            transport,
            from: smtp.from.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: OutgoingMessage) -> Result<SendReceipt, MailerError> {
        let email = lettre::Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| MailerError::Other(format!("Invalid from address: {e}")))?,
            )
            .to(message
                .to
                .parse()
                .map_err(|e| MailerError::Other(format!("Invalid recipient address: {e}")))?)
            .subject(message.subject)
            .header(lettre::message::header::MIME_VERSION_1_0)
            .message_id(None)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(message.text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(message.html),
                    ),
            )
            .map_err(|e| MailerError::Other(format!("Failed to build message: {e}")))?;

        let response = self
            .transport
            .send(email)
            .await
            .map_err(classify_smtp_error)?;

        Ok(SendReceipt {
            message_id: response.message().collect::<Vec<&str>>().join(" "),
        })
    }
}

/// Maps lettre SMTP failures onto the service error taxonomy. The 53x
/// reply family covers authentication rejections; timeouts, TLS problems
/// and transient (4xx) replies are the retryable connection class.
fn classify_smtp_error(e: lettre::transport::smtp::Error) -> MailerError {
    if let Some(code) = e.status() {
        if code.to_string().starts_with("53") {
            return MailerError::Auth(e.to_string());
        }
    }
    if e.is_timeout() || e.is_tls() || e.is_transient() {
        MailerError::Connection(e.to_string())
    } else {
        MailerError::Other(e.to_string())
    }
}

/// Logs outgoing mail instead of delivering it.
#[derive(Default)]
pub struct NoopMailer {
    delivered: AtomicU64,
}

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, message: OutgoingMessage) -> Result<SendReceipt, MailerError> {
        let seq = self.delivered.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            "noop mailer dropped outgoing message"
        );
        Ok(SendReceipt {
            message_id: format!("noop-{seq}"),
        })
    }
}
