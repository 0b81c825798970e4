//! Notification dispatch endpoints.
//!
//! Provides the trigger for sending group notification emails:
//! - `/dispatch` - Send one category of notification to a group

use crate::AppResources;
use crate::email_templates::GroupNotificationEmailTemplate;
use crate::error::RecipientSourceError;
use crate::mailer::OutgoingMessage;
use crate::notifications::batch::BatchDispatcher;
use crate::recipients::NotificationCategory;
use axum::{Extension, Json, response::IntoResponse};
use hyper::StatusCode;
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Tag for OpenAPI documentation.
pub const NOTIFICATIONS_TAG: &str = "Notifications API";

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct DispatchRequest {
    /// One of `announcement` or `groupActivity`.
    category: Option<String>,
    group_id: Option<String>,
}

/// Creates the notifications API router.
#[tracing::instrument(skip_all)]
pub fn router() -> OpenApiRouter {
    OpenApiRouter::new().routes(routes!(dispatch_notifications))
}

#[tracing::instrument(skip(resources, payload))]
#[utoipa::path(
    post,
    path = "/dispatch",
    operation_id = "Dispatch Notifications",
    tag = NOTIFICATIONS_TAG,
    summary = "Send notification emails to a group",
    description = "Sends the given notification category to every member of the group whose \
                   preferences allow it, in paced batches.\n\n\
                   The response reports per-recipient counts once the whole dispatch has \
                   resolved. Individual delivery failures do not fail the request; they are \
                   reported in the `failed` count.",
    request_body(
        content = DispatchRequest,
        description = "Which category to send, and to which group"
    ),
    responses(
        (status = 200, description = "Dispatch completed", content_type = "application/json", example = json!({"notified": 12, "failed": 0, "skipped": 3, "total": 15})),
        (status = 400, description = "Missing field or unknown category", content_type = "application/json"),
        (status = 404, description = "Group not found", content_type = "application/json"),
        (status = 500, description = "Recipient source unavailable or dispatch job died", content_type = "application/json")
    )
)]
async fn dispatch_notifications(
    Extension(resources): Extension<AppResources>,
    Json(payload): Json<DispatchRequest>,
) -> impl IntoResponse {
    let Some(category_raw) = payload.category else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "category is required" })),
        );
    };
    let Some(group_id) = payload.group_id else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "groupId is required" })),
        );
    };
    let category: NotificationCategory = match category_raw.parse() {
        Ok(category) => category,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": e })));
        }
    };

    let roster = match resources.recipients.group_roster(&group_id).await {
        Ok(roster) => roster,
        Err(RecipientSourceError::UnknownGroup(_)) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": format!("Group not found: {group_id}") })),
            );
        }
        Err(e @ RecipientSourceError::Unavailable(_)) => {
            tracing::error!(
                name = "api.dispatch.roster_unavailable",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                error = %e,
                group_id = %group_id,
                message = "Failed to load group roster"
            );
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Recipient source unavailable" })),
            );
        }
    };

    let dispatcher = BatchDispatcher::new(resources.mailer.clone())
        .with_batch_size(resources.config.dispatch.batch_size)
        .with_inter_batch_delay(tokio::time::Duration::from_millis(
            resources.config.dispatch.inter_batch_delay_ms,
        ));

    let group_name = roster.group.name;
    let view_url = format!(
        "{}/groups/{}",
        resources.config.frontend_url, roster.group.id
    );
    let members = roster.members;

    let job_label = format!("{category}:{group_id}");
    let job = async move {
        dispatcher
            .dispatch(members, category, |recipient| {
                let template = GroupNotificationEmailTemplate {
                    recipient_name: recipient.display_name.clone(),
                    group_name: group_name.clone(),
                    category,
                    view_url: view_url.clone(),
                };
                OutgoingMessage {
                    to: recipient.email.clone(),
                    subject: template.subject(),
                    html: template.render_html(),
                    text: template.render_text(),
                }
            })
            .await
    };

    let queued = resources.dispatch_queue.submit(&job_label, job).await;
    match queued.wait().await {
        Ok(summary) => (
            StatusCode::OK,
            Json(json!({
                "notified": summary.sent,
                "failed": summary.failed,
                "skipped": summary.skipped,
                "total": summary.total,
            })),
        ),
        Err(e) => {
            tracing::error!(
                name = "api.dispatch.job_failed",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                error = %e,
                group_id = %group_id,
                message = "Dispatch job ended without a summary"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Dispatch failed" })),
            )
        }
    }
}
