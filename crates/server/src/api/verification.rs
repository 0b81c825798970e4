//! Verification code endpoints.
//!
//! Provides the email verification flow:
//! - `/request` - Issue a code and email it to the identity
//! - `/confirm` - Check a submitted code

use crate::AppResources;
use crate::error::{RequestCodeError, VerifyCodeError};
use axum::{Extension, Json, response::IntoResponse};
use hyper::StatusCode;
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Tag for OpenAPI documentation.
pub const VERIFICATION_TAG: &str = "Verification API";

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct RequestCodeBody {
    /// Email address the code is issued for.
    identity_key: Option<String>,
    /// Name of the flow the code belongs to, shown in the email.
    context: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct ConfirmCodeBody {
    identity_key: Option<String>,
    code: Option<String>,
}

/// Creates the verification API router.
#[tracing::instrument(skip_all)]
pub fn router() -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(request_verification_code))
        .routes(routes!(confirm_verification_code))
}

#[tracing::instrument(skip(resources, payload))]
#[utoipa::path(
    post,
    path = "/request",
    operation_id = "Request Verification Code",
    tag = VERIFICATION_TAG,
    summary = "Issue a verification code",
    description = "Generates a short-lived 4-digit code for the identity and emails it out. \
                   A newly issued code replaces any outstanding one for the same identity. \
                   Issuance is rate limited per identity.",
    request_body(
        content = RequestCodeBody,
        description = "Identity to verify and the flow requesting it"
    ),
    responses(
        (status = 200, description = "Code issued and emailed", content_type = "application/json", example = json!({"success": true})),
        (status = 400, description = "Missing field or invalid identity", content_type = "application/json"),
        (status = 429, description = "Issuance rate limit hit", content_type = "application/json"),
        (status = 500, description = "Code email could not be delivered", content_type = "application/json")
    )
)]
async fn request_verification_code(
    Extension(resources): Extension<AppResources>,
    Json(payload): Json<RequestCodeBody>,
) -> impl IntoResponse {
    let Some(identity_key) = payload.identity_key else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "identityKey is required" })),
        );
    };
    let Some(context) = payload.context else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "context is required" })),
        );
    };
    if identity_key.parse::<lettre::Address>().is_err() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "identityKey must be a valid email address" })),
        );
    }

    match resources.code_issuer.request_code(&identity_key, &context).await {
        Ok(_) => (StatusCode::OK, Json(json!({ "success": true }))),
        Err(RequestCodeError::RateLimited) => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "Too many verification codes requested. Try again later." })),
        ),
        Err(RequestCodeError::Delivery(e)) => {
            tracing::error!(
                name = "api.request_code.delivery_failed",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                error = %e,
                message = "Failed to deliver verification code email"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to deliver verification code" })),
            )
        }
    }
}

#[tracing::instrument(skip(resources, payload))]
#[utoipa::path(
    post,
    path = "/confirm",
    operation_id = "Confirm Verification Code",
    tag = VERIFICATION_TAG,
    summary = "Check a verification code",
    description = "Verifies a submitted code against the outstanding challenge for the \
                   identity. A correct code consumes the challenge; a wrong one leaves it \
                   in place for another try within the code's lifetime.",
    request_body(
        content = ConfirmCodeBody,
        description = "Identity and the code it received"
    ),
    responses(
        (status = 200, description = "Identity verified", content_type = "application/json", example = json!({"verified": true})),
        (status = 400, description = "Missing field, wrong code, or no code outstanding", content_type = "application/json"),
        (status = 410, description = "Code expired", content_type = "application/json")
    )
)]
async fn confirm_verification_code(
    Extension(resources): Extension<AppResources>,
    Json(payload): Json<ConfirmCodeBody>,
) -> impl IntoResponse {
    let Some(identity_key) = payload.identity_key else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "identityKey is required" })),
        );
    };
    let Some(code) = payload.code else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "code is required" })),
        );
    };

    match resources.code_issuer.verify_code(&identity_key, &code) {
        Ok(()) => (StatusCode::OK, Json(json!({ "verified": true }))),
        Err(e @ VerifyCodeError::NoChallenge) | Err(e @ VerifyCodeError::Mismatch) => {
            (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() })))
        }
        Err(e @ VerifyCodeError::Expired) => {
            (StatusCode::GONE, Json(json!({ "error": e.to_string() })))
        }
    }
}
