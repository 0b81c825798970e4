use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("SMTP authentication rejected: {0}")]
    Auth(String),
    #[error("Connection to mail relay failed: {0}")]
    Connection(String),
    #[error("Mail delivery failed: {0}")]
    Other(String),
}

impl MailerError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, MailerError::Connection(_))
    }
}

#[derive(Debug, Error)]
pub enum RecipientSourceError {
    #[error("Unknown group: {0}")]
    UnknownGroup(String),
    #[error("Recipient source unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum RosterLoadError {
    #[error("Failed to read roster file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid roster file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum RequestCodeError {
    #[error("Too many verification codes requested for this identity")]
    RateLimited,
    #[error(transparent)]
    Delivery(#[from] MailerError),
}

#[derive(Debug, Error)]
pub enum VerifyCodeError {
    #[error("No verification code outstanding for this identity")]
    NoChallenge,
    #[error("Verification code has expired")]
    Expired,
    #[error("Verification code does not match")]
    Mismatch,
}

/// Returned when a dispatch job terminates without reporting a summary.
#[derive(Debug, Error)]
#[error("Dispatch job ended before producing a summary")]
pub struct DispatchJobError;
