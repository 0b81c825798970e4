//! Recipient eligibility filtering.
//!
//! The opt-out semantics live here and only here: a recipient is excluded
//! from a category exactly when a stored flag says `false`. Absent
//! preferences, and absent individual flags, count as enabled.

use crate::recipients::{NotificationCategory, Recipient};

/// Result of splitting candidates by notification preference.
#[derive(Clone, Debug)]
pub struct RecipientPartition {
    pub eligible: Vec<Recipient>,
    pub skipped: Vec<Recipient>,
}

/// Whether a recipient should receive email for `category`.
///
/// The master switch and the per-category flag are checked as a
/// conjunction; either being an explicit `false` excludes the recipient.
pub fn is_eligible(recipient: &Recipient, category: NotificationCategory) -> bool {
    let Some(prefs) = &recipient.preferences else {
        return true;
    };
    if prefs.email_notifications_enabled == Some(false) {
        return false;
    }
    let category_flag = match category {
        NotificationCategory::Announcement => prefs.announcement_emails_enabled,
        NotificationCategory::GroupActivity => prefs.group_activity_emails_enabled,
    };
    category_flag != Some(false)
}

/// Splits `recipients` into those eligible for `category` and those
/// skipped by their preferences. Order is preserved on both sides and
/// every input recipient lands in exactly one of them.
pub fn partition_recipients(
    recipients: Vec<Recipient>,
    category: NotificationCategory,
) -> RecipientPartition {
    let mut eligible = Vec::new();
    let mut skipped = Vec::new();
    for recipient in recipients {
        if is_eligible(&recipient, category) {
            eligible.push(recipient);
        } else {
            skipped.push(recipient);
        }
    }
    RecipientPartition { eligible, skipped }
}
