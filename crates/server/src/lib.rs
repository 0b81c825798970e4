//! Notification email delivery for a classroom management platform.
//!
//! This library dispatches group notification emails in preference-filtered,
//! paced batches and issues short-lived email verification codes, exposing
//! both behind a small HTTP trigger surface.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::mailer::Mailer;
use crate::notifications::queue::DispatchQueue;
use crate::recipients::RecipientSource;
use crate::verification::issuer::CodeIssuer;

pub mod api;
pub mod config;
pub mod email_templates;
pub mod error;
pub mod mailer;
pub mod notifications;
pub mod recipients;
pub mod verification;

#[derive(Clone)]
pub struct AppResources {
    pub mailer: Arc<dyn Mailer>,
    pub recipients: Arc<dyn RecipientSource>,
    pub dispatch_queue: Arc<DispatchQueue>,
    pub code_issuer: Arc<CodeIssuer>,
    pub config: Arc<AppConfig>,
}
