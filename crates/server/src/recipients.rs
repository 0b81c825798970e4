//! Recipient roster types and lookup.
//!
//! The classroom platform owns the real member store; this service only
//! needs a narrow read view of it, expressed by [`RecipientSource`]. The
//! bundled [`StaticRecipientSource`] serves fixed rosters, optionally
//! loaded from a JSON file, for deployments and tests without that store.

use crate::error::{RecipientSourceError, RosterLoadError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// A candidate for notification delivery.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub id: String,
    pub email: String,
    pub display_name: String,
    /// Absent preferences mean the recipient never touched their settings,
    /// which counts as everything enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<NotificationPreferences>,
}

/// Stored notification preferences. Every flag is tri-state: a missing
/// flag is treated as enabled, only an explicit `false` opts out.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreferences {
    /// Master switch for all notification email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_notifications_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub announcement_emails_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_activity_emails_enabled: Option<bool>,
}

/// The kinds of notification this service dispatches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NotificationCategory {
    Announcement,
    GroupActivity,
}

impl NotificationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationCategory::Announcement => "announcement",
            NotificationCategory::GroupActivity => "groupActivity",
        }
    }
}

impl fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationCategory {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "announcement" => Ok(NotificationCategory::Announcement),
            "groupActivity" => Ok(NotificationCategory::GroupActivity),
            other => Err(format!("Unknown notification category: {other}")),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInfo {
    pub id: String,
    pub name: String,
}

/// A group plus everyone who could be notified about it.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRoster {
    pub group: GroupInfo,
    pub members: Vec<Recipient>,
}

/// Read access to group membership.
#[async_trait]
pub trait RecipientSource: Send + Sync {
    async fn group_roster(&self, group_id: &str) -> Result<GroupRoster, RecipientSourceError>;
}

/// In-memory [`RecipientSource`] backed by a fixed set of rosters.
#[derive(Default)]
pub struct StaticRecipientSource {
    groups: HashMap<String, GroupRoster>,
}

impl StaticRecipientSource {
    pub fn new() -> Self {
        Self {
            groups: HashMap::new(),
        }
    }

    pub fn with_group(mut self, roster: GroupRoster) -> Self {
        self.groups.insert(roster.group.id.clone(), roster);
        self
    }

    /// Loads rosters from a JSON file containing an array of groups with
    /// their members.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RosterLoadError> {
        let raw = std::fs::read_to_string(path)?;
        let rosters: Vec<GroupRoster> = serde_json::from_str(&raw)?;
        let mut groups = HashMap::new();
        for roster in rosters {
            groups.insert(roster.group.id.clone(), roster);
        }
        Ok(Self { groups })
    }
}

#[async_trait]
impl RecipientSource for StaticRecipientSource {
    async fn group_roster(&self, group_id: &str) -> Result<GroupRoster, RecipientSourceError> {
        self.groups
            .get(group_id)
            .cloned()
            .ok_or_else(|| RecipientSourceError::UnknownGroup(group_id.to_string()))
    }
}
