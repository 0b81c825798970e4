//! Batched notification email dispatch.
//!
//! Eligible recipients are sent to in fixed-size batches. Sends within a
//! batch run concurrently and are all awaited before the next batch
//! starts; consecutive batches are separated by a pacing delay so a large
//! group does not flood the relay. A failed send only marks that one
//! recipient as failed.

use crate::mailer::{Mailer, OutgoingMessage};
use crate::notifications::filter::partition_recipients;
use crate::recipients::{NotificationCategory, Recipient};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tokio::time::Duration;

/// Reason recorded for recipients excluded by their preferences.
pub const SKIPPED_PREFS_REASON: &str = "notifications disabled by user";

/// Default number of recipients per send batch.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Default pause between consecutive batches.
pub const DEFAULT_INTER_BATCH_DELAY: Duration = Duration::from_millis(1000);

/// Per-recipient result of a dispatch run.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum DeliveryStatus {
    Sent,
    Failed { error: String },
    Skipped { reason: String },
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchOutcome {
    pub recipient_id: String,
    pub email: String,
    #[serde(flatten)]
    pub status: DeliveryStatus,
}

/// Complete account of one dispatch run. `sent + failed + skipped`
/// always equals `total`; `outcomes` lists attempted recipients in input
/// order followed by the skipped ones.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchSummary {
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total: usize,
    pub outcomes: Vec<DispatchOutcome>,
}

/// Sends one rendered message per eligible recipient, in paced batches.
pub struct BatchDispatcher {
    mailer: Arc<dyn Mailer>,
    batch_size: usize,
    inter_batch_delay: Duration,
}

impl BatchDispatcher {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self {
            mailer,
            batch_size: DEFAULT_BATCH_SIZE,
            inter_batch_delay: DEFAULT_INTER_BATCH_DELAY,
        }
    }

    /// Overrides the batch size. Values below 1 are clamped to 1.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_inter_batch_delay(mut self, delay: Duration) -> Self {
        self.inter_batch_delay = delay;
        self
    }

    /// Dispatches `category` mail to every eligible recipient and returns
    /// the full summary. Send failures are recorded per recipient and
    /// never abort the run; the method itself cannot fail.
    ///
    /// `build_message` renders the personalized message for one
    /// recipient. It is called once per eligible recipient, in order,
    /// just before that recipient's batch goes out.
    #[tracing::instrument(skip(self, recipients, build_message), fields(category = %category, candidates = recipients.len()))]
    pub async fn dispatch<F>(
        &self,
        recipients: Vec<Recipient>,
        category: NotificationCategory,
        build_message: F,
    ) -> DispatchSummary
    where
        F: Fn(&Recipient) -> OutgoingMessage,
    {
        let partition = partition_recipients(recipients, category);
        let total = partition.eligible.len() + partition.skipped.len();

        let mut outcomes = Vec::with_capacity(total);
        let mut sent = 0usize;
        let mut failed = 0usize;

        for (index, batch) in partition.eligible.chunks(self.batch_size).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.inter_batch_delay).await;
            }

            let sends = batch.iter().map(|recipient| {
                let message = build_message(recipient);
                let mailer = self.mailer.clone();
                async move { (recipient, mailer.send(message).await) }
            });

            for (recipient, result) in join_all(sends).await {
                match result {
                    Ok(receipt) => {
                        sent += 1;
                        tracing::debug!(
                            recipient_id = %recipient.id,
                            message_id = %receipt.message_id,
                            "notification email accepted by transport"
                        );
                        outcomes.push(DispatchOutcome {
                            recipient_id: recipient.id.clone(),
                            email: recipient.email.clone(),
                            status: DeliveryStatus::Sent,
                        });
                    }
                    Err(e) => {
                        failed += 1;
                        tracing::error!(
                            name = "notifications.dispatch.send_failed",
                            target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                            error = %e,
                            recipient_id = %recipient.id,
                            message = "Failed to send notification email"
                        );
                        outcomes.push(DispatchOutcome {
                            recipient_id: recipient.id.clone(),
                            email: recipient.email.clone(),
                            status: DeliveryStatus::Failed {
                                error: e.to_string(),
                            },
                        });
                    }
                }
            }
        }

        for recipient in &partition.skipped {
            outcomes.push(DispatchOutcome {
                recipient_id: recipient.id.clone(),
                email: recipient.email.clone(),
                status: DeliveryStatus::Skipped {
                    reason: SKIPPED_PREFS_REASON.to_string(),
                },
            });
        }

        tracing::info!(
            category = %category,
            sent,
            failed,
            skipped = partition.skipped.len(),
            "notification dispatch finished"
        );

        DispatchSummary {
            sent,
            failed,
            skipped: partition.skipped.len(),
            total,
            outcomes,
        }
    }
}
