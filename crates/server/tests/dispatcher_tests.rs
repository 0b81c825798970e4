//! Tests for the batch notification dispatcher.

use async_trait::async_trait;
use classroom_notifier::error::MailerError;
use classroom_notifier::mailer::{Mailer, OutgoingMessage, SendReceipt};
use classroom_notifier::notifications::batch::{
    BatchDispatcher, DeliveryStatus, DispatchSummary, SKIPPED_PREFS_REASON,
};
use classroom_notifier::recipients::{NotificationCategory, NotificationPreferences, Recipient};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::time::{Duration, Instant};

fn recipient(id: &str) -> Recipient {
    Recipient {
        id: id.to_string(),
        email: format!("{id}@example.org"),
        display_name: format!("User {id}"),
        preferences: None,
    }
}

fn opted_out(id: &str) -> Recipient {
    Recipient {
        preferences: Some(NotificationPreferences {
            email_notifications_enabled: Some(false),
            announcement_emails_enabled: None,
            group_activity_emails_enabled: None,
        }),
        ..recipient(id)
    }
}

fn message_for(r: &Recipient) -> OutgoingMessage {
    OutgoingMessage {
        to: r.email.clone(),
        subject: format!("Hello {}", r.display_name),
        html: "<p>hi</p>".to_string(),
        text: "hi".to_string(),
    }
}

/// Mailer that records every accepted message and fails for scripted
/// addresses. An optional per-send delay simulates transport latency.
struct ScriptedMailer {
    sent: Mutex<Vec<OutgoingMessage>>,
    fail_for: Vec<String>,
    send_delay: Duration,
}

impl ScriptedMailer {
    fn reliable() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            fail_for: Vec::new(),
            send_delay: Duration::ZERO,
        })
    }

    fn failing_for(addresses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            fail_for: addresses.iter().map(|a| a.to_string()).collect(),
            send_delay: Duration::ZERO,
        })
    }

    fn slow(send_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            fail_for: Vec::new(),
            send_delay,
        })
    }

    fn sent_addresses(&self) -> Vec<String> {
        self.sent
            .lock()
            .expect("mailer lock")
            .iter()
            .map(|m| m.to.clone())
            .collect()
    }
}

#[async_trait]
impl Mailer for ScriptedMailer {
    async fn send(&self, message: OutgoingMessage) -> Result<SendReceipt, MailerError> {
        if !self.send_delay.is_zero() {
            tokio::time::sleep(self.send_delay).await;
        }
        if self.fail_for.contains(&message.to) {
            return Err(MailerError::Connection("relay refused".to_string()));
        }
        let mut sent = self.sent.lock().expect("mailer lock");
        sent.push(message);
        Ok(SendReceipt {
            message_id: format!("msg-{}", sent.len()),
        })
    }
}

fn assert_counts(summary: &DispatchSummary, sent: usize, failed: usize, skipped: usize) {
    assert_eq!(summary.sent, sent, "sent count");
    assert_eq!(summary.failed, failed, "failed count");
    assert_eq!(summary.skipped, skipped, "skipped count");
    assert_eq!(summary.total, sent + failed + skipped, "total count");
    assert_eq!(summary.outcomes.len(), summary.total, "one outcome each");
}

// =============================================================================
// Basic Dispatch Tests
// =============================================================================

#[tokio::test]
async fn test_dispatch_all_sent_single_batch() {
    let mailer = ScriptedMailer::reliable();
    let dispatcher = BatchDispatcher::new(mailer.clone());

    let recipients = vec![recipient("u1"), recipient("u2"), recipient("u3")];
    let summary = dispatcher
        .dispatch(recipients, NotificationCategory::Announcement, message_for)
        .await;

    assert_counts(&summary, 3, 0, 0);
    assert_eq!(
        mailer.sent_addresses(),
        vec!["u1@example.org", "u2@example.org", "u3@example.org"]
    );
    assert!(
        summary
            .outcomes
            .iter()
            .all(|o| matches!(o.status, DeliveryStatus::Sent))
    );
}

#[tokio::test]
async fn test_dispatch_empty_recipient_list() {
    let mailer = ScriptedMailer::reliable();
    let dispatcher = BatchDispatcher::new(mailer.clone());

    let summary = dispatcher
        .dispatch(Vec::new(), NotificationCategory::Announcement, message_for)
        .await;

    assert_counts(&summary, 0, 0, 0);
    assert!(mailer.sent_addresses().is_empty());
}

#[tokio::test]
async fn test_dispatch_personalizes_each_message() {
    let mailer = ScriptedMailer::reliable();
    let dispatcher = BatchDispatcher::new(mailer.clone());

    dispatcher
        .dispatch(
            vec![recipient("alice"), recipient("bob")],
            NotificationCategory::GroupActivity,
            message_for,
        )
        .await;

    let sent = mailer.sent.lock().expect("mailer lock");
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].subject, "Hello User alice");
    assert_eq!(sent[1].subject, "Hello User bob");
}

// =============================================================================
// Preference Handling Tests
// =============================================================================

#[tokio::test]
async fn test_dispatch_skips_opted_out_without_sending() {
    let mailer = ScriptedMailer::reliable();
    let dispatcher = BatchDispatcher::new(mailer.clone());

    let recipients = vec![recipient("u1"), opted_out("u2"), recipient("u3")];
    let summary = dispatcher
        .dispatch(recipients, NotificationCategory::Announcement, message_for)
        .await;

    assert_counts(&summary, 2, 0, 1);
    // The opted-out recipient never reaches the transport
    assert_eq!(
        mailer.sent_addresses(),
        vec!["u1@example.org", "u3@example.org"]
    );
}

#[tokio::test]
async fn test_dispatch_skipped_outcomes_appended_after_attempted() {
    let mailer = ScriptedMailer::reliable();
    let dispatcher = BatchDispatcher::new(mailer.clone());

    // Opted-out recipients sit in the middle of the input
    let recipients = vec![
        recipient("u1"),
        opted_out("u2"),
        recipient("u3"),
        opted_out("u4"),
        recipient("u5"),
    ];
    let summary = dispatcher
        .dispatch(recipients, NotificationCategory::Announcement, message_for)
        .await;

    let ids: Vec<&str> = summary
        .outcomes
        .iter()
        .map(|o| o.recipient_id.as_str())
        .collect();
    assert_eq!(ids, vec!["u1", "u3", "u5", "u2", "u4"]);

    for outcome in &summary.outcomes[3..] {
        match &outcome.status {
            DeliveryStatus::Skipped { reason } => assert_eq!(reason, SKIPPED_PREFS_REASON),
            other => panic!("expected skipped outcome, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_dispatch_all_skipped_sends_nothing() {
    let mailer = ScriptedMailer::reliable();
    let dispatcher = BatchDispatcher::new(mailer.clone());

    let summary = dispatcher
        .dispatch(
            vec![opted_out("u1"), opted_out("u2")],
            NotificationCategory::GroupActivity,
            message_for,
        )
        .await;

    assert_counts(&summary, 0, 0, 2);
    assert!(mailer.sent_addresses().is_empty());
}

// =============================================================================
// Failure Isolation Tests
// =============================================================================

#[tokio::test]
async fn test_dispatch_failure_isolated_to_one_recipient() {
    // Recipient 3 of 10 fails; everyone else is delivered
    let mailer = ScriptedMailer::failing_for(&["u03@example.org"]);
    let dispatcher = BatchDispatcher::new(mailer.clone());

    let recipients: Vec<Recipient> = (1..=10).map(|i| recipient(&format!("u{i:02}"))).collect();
    let summary = dispatcher
        .dispatch(recipients, NotificationCategory::Announcement, message_for)
        .await;

    assert_counts(&summary, 9, 1, 0);

    for outcome in &summary.outcomes {
        if outcome.recipient_id == "u03" {
            match &outcome.status {
                DeliveryStatus::Failed { error } => {
                    assert!(error.contains("relay refused"), "got error: {error}")
                }
                other => panic!("expected failed outcome for u03, got {other:?}"),
            }
        } else {
            assert!(
                matches!(outcome.status, DeliveryStatus::Sent),
                "{} should have been sent",
                outcome.recipient_id
            );
        }
    }
}

#[tokio::test]
async fn test_dispatch_failures_do_not_stop_later_batches() {
    // Every recipient of the first batch fails; the second batch still goes out
    let first_batch: Vec<String> = (1..=5).map(|i| format!("u{i:02}@example.org")).collect();
    let fail_refs: Vec<&str> = first_batch.iter().map(|s| s.as_str()).collect();
    let mailer = ScriptedMailer::failing_for(&fail_refs);
    let dispatcher = BatchDispatcher::new(mailer.clone())
        .with_batch_size(5)
        .with_inter_batch_delay(Duration::ZERO);

    let recipients: Vec<Recipient> = (1..=10).map(|i| recipient(&format!("u{i:02}"))).collect();
    let summary = dispatcher
        .dispatch(recipients, NotificationCategory::Announcement, message_for)
        .await;

    assert_counts(&summary, 5, 5, 0);
    assert_eq!(mailer.sent_addresses().len(), 5);
}

#[tokio::test]
async fn test_dispatch_outcome_ids_match_input_exactly_once() {
    let mailer = ScriptedMailer::failing_for(&["u02@example.org", "u05@example.org"]);
    let dispatcher = BatchDispatcher::new(mailer).with_batch_size(3);

    let recipients: Vec<Recipient> = (1..=7).map(|i| recipient(&format!("u{i:02}"))).collect();
    let summary = dispatcher
        .dispatch(recipients, NotificationCategory::Announcement, message_for)
        .await;

    let mut seen = HashSet::new();
    for outcome in &summary.outcomes {
        assert!(
            seen.insert(outcome.recipient_id.clone()),
            "duplicate outcome for {}",
            outcome.recipient_id
        );
    }
    assert_eq!(seen.len(), 7);
}

// =============================================================================
// Batch Sizing and Pacing Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_dispatch_25_recipients_three_batches_two_delays() {
    let mailer = ScriptedMailer::reliable();
    let dispatcher = BatchDispatcher::new(mailer.clone())
        .with_batch_size(10)
        .with_inter_batch_delay(Duration::from_millis(1000));

    let recipients: Vec<Recipient> = (1..=25).map(|i| recipient(&format!("u{i:02}"))).collect();

    let started = Instant::now();
    let summary = dispatcher
        .dispatch(recipients, NotificationCategory::Announcement, message_for)
        .await;

    assert_counts(&summary, 25, 0, 0);
    // Batches of 10, 10 and 5 separated by exactly two pacing delays
    assert_eq!(started.elapsed(), Duration::from_millis(2000));
    assert_eq!(mailer.sent_addresses().len(), 25);
}

#[tokio::test(start_paused = true)]
async fn test_dispatch_12_recipients_single_delay() {
    let mailer = ScriptedMailer::reliable();
    let dispatcher = BatchDispatcher::new(mailer.clone())
        .with_batch_size(10)
        .with_inter_batch_delay(Duration::from_millis(1000));

    let recipients: Vec<Recipient> = (1..=12).map(|i| recipient(&format!("u{i:02}"))).collect();

    let started = Instant::now();
    let summary = dispatcher
        .dispatch(recipients, NotificationCategory::Announcement, message_for)
        .await;

    assert_counts(&summary, 12, 0, 0);
    assert_eq!(started.elapsed(), Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn test_dispatch_single_batch_has_no_delay() {
    let mailer = ScriptedMailer::reliable();
    let dispatcher = BatchDispatcher::new(mailer)
        .with_batch_size(10)
        .with_inter_batch_delay(Duration::from_millis(1000));

    let recipients: Vec<Recipient> = (1..=10).map(|i| recipient(&format!("u{i:02}"))).collect();

    let started = Instant::now();
    let summary = dispatcher
        .dispatch(recipients, NotificationCategory::Announcement, message_for)
        .await;

    assert_counts(&summary, 10, 0, 0);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_dispatch_sends_within_batch_run_concurrently() {
    // Ten sends of 100ms each finish together when fanned out
    let mailer = ScriptedMailer::slow(Duration::from_millis(100));
    let dispatcher = BatchDispatcher::new(mailer.clone())
        .with_batch_size(10)
        .with_inter_batch_delay(Duration::ZERO);

    let recipients: Vec<Recipient> = (1..=10).map(|i| recipient(&format!("u{i:02}"))).collect();

    let started = Instant::now();
    let summary = dispatcher
        .dispatch(recipients, NotificationCategory::Announcement, message_for)
        .await;

    assert_counts(&summary, 10, 0, 0);
    assert_eq!(started.elapsed(), Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn test_dispatch_batches_are_sequential() {
    // Two batches of slow sends: total time is two send rounds plus one delay
    let mailer = ScriptedMailer::slow(Duration::from_millis(100));
    let dispatcher = BatchDispatcher::new(mailer.clone())
        .with_batch_size(5)
        .with_inter_batch_delay(Duration::from_millis(1000));

    let recipients: Vec<Recipient> = (1..=10).map(|i| recipient(&format!("u{i:02}"))).collect();

    let started = Instant::now();
    dispatcher
        .dispatch(recipients, NotificationCategory::Announcement, message_for)
        .await;

    assert_eq!(started.elapsed(), Duration::from_millis(1200));
}

#[tokio::test]
async fn test_batch_size_below_one_is_clamped() {
    let mailer = ScriptedMailer::reliable();
    let dispatcher = BatchDispatcher::new(mailer.clone())
        .with_batch_size(0)
        .with_inter_batch_delay(Duration::ZERO);

    let summary = dispatcher
        .dispatch(
            vec![recipient("u1"), recipient("u2")],
            NotificationCategory::Announcement,
            message_for,
        )
        .await;

    // A zero batch size must not hang or drop recipients
    assert_counts(&summary, 2, 0, 0);
}
