//! OpenAPI/Utoipa configuration.

use crate::api::{
    health::MISC_TAG, notifications::NOTIFICATIONS_TAG, verification::VERIFICATION_TAG,
};
use utoipa::OpenApi;

/// OpenAPI documentation configuration.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Classroom Notifier API",
        version = "1.0.0",
        description = "Group notification email dispatch and email verification codes for a classroom management platform."
    ),
    tags(
        (name = MISC_TAG, description = "Miscellaneous endpoints"),
        (name = NOTIFICATIONS_TAG, description = "Notification dispatch endpoints"),
        (name = VERIFICATION_TAG, description = "Verification code endpoints")
    )
)]
pub struct ApiDoc;
