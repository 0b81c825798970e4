//! Email bodies for notification and verification mail.
//!
//! Each template renders an HTML and a plain-text version; the send site
//! assembles them into a multipart/alternative message.

use crate::recipients::NotificationCategory;

/// Notification email for new group content.
pub struct GroupNotificationEmailTemplate {
    pub recipient_name: String,
    pub group_name: String,
    pub category: NotificationCategory,
    pub view_url: String,
}

impl GroupNotificationEmailTemplate {
    pub fn subject(&self) -> String {
        match self.category {
            NotificationCategory::Announcement => {
                format!("New announcement in {}", self.group_name)
            }
            NotificationCategory::GroupActivity => {
                format!("New activity in {}", self.group_name)
            }
        }
    }

    fn what_happened(&self) -> &'static str {
        match self.category {
            NotificationCategory::Announcement => "a new announcement was posted",
            NotificationCategory::GroupActivity => "there is new activity",
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn render_html(&self) -> String {
        format!(
            r#"<!DOCTYPE html>
<html>
  <body>
    <p>Hello {recipient_name},</p>
    <p>In your group <strong>{group_name}</strong>, {what_happened}.</p>
    <p><a href="{view_url}">Open {group_name}</a></p>
    <p>You can turn these emails off at any time in your notification settings.</p>
    <p>Best regards,<br>The Classroom Team</p>
  </body>
</html>"#,
            recipient_name = self.recipient_name,
            group_name = self.group_name,
            what_happened = self.what_happened(),
            view_url = self.view_url,
        )
    }

    #[tracing::instrument(skip(self))]
    pub fn render_text(&self) -> String {
        format!(
            r#"Hello {},

In your group '{}', {}.

Open the group at {}

You can turn these emails off at any time in your notification settings.

Best regards,
The Classroom Team"#,
            self.recipient_name,
            self.group_name,
            self.what_happened(),
            self.view_url
        )
    }
}

/// Verification code email. The code appears only here, never in logs or
/// API responses.
pub struct VerificationCodeEmailTemplate {
    pub code: String,
    pub context: String,
    pub expires_minutes: i64,
}

impl VerificationCodeEmailTemplate {
    pub fn subject(&self) -> String {
        "Your verification code".to_string()
    }

    #[tracing::instrument(skip(self))]
    pub fn render_html(&self) -> String {
        format!(
            r#"<!DOCTYPE html>
<html>
  <body>
    <p>Hello,</p>
    <p>Your verification code for {context} is:</p>
    <p style="font-size: 24px; letter-spacing: 4px;"><strong>{code}</strong></p>
    <p>The code expires in {expires_minutes} minutes.</p>
    <p>If you did not request this code, you can ignore this email.</p>
    <p>Best regards,<br>The Classroom Team</p>
  </body>
</html>"#,
            context = self.context,
            code = self.code,
            expires_minutes = self.expires_minutes,
        )
    }

    #[tracing::instrument(skip(self))]
    pub fn render_text(&self) -> String {
        format!(
            r#"Hello,

Your verification code for {} is:

{}

The code expires in {} minutes.

If you did not request this code, you can ignore this email.

Best regards,
The Classroom Team"#,
            self.context, self.code, self.expires_minutes
        )
    }
}
