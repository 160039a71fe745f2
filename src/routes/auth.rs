/// Authentication Routes
///
/// Login, logout, out-of-band token validation and explicit token issuance.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{extract_bearer, Authenticator, Credentials, RequestHeaders, AUTHORIZATION};
use crate::domain::{Token, User};
use crate::error::{AppError, ErrorContext, ValidationError};

const MAX_TOKEN_TTL_SECONDS: i64 = 365 * 24 * 60 * 60;

/// Token response: the plaintext is inside `token` and is never shown again.
#[derive(Serialize)]
pub struct TokenResponse {
    pub token: Token,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Deserialize)]
pub struct ValidateTokenRequest {
    pub token: String,
}

#[derive(Serialize)]
pub struct ValidateTokenResponse {
    pub valid: bool,
}

#[derive(Deserialize)]
pub struct IssueTokenRequest {
    pub ttl_seconds: i64,
}

/// POST /users/login
///
/// # Errors
/// - 400: Malformed JSON body
/// - 401: Invalid credentials (same body for unknown email and wrong password)
/// - 503: Store unavailable or timed out
pub async fn login(
    form: web::Json<Credentials>,
    authenticator: web::Data<Authenticator>,
) -> Result<HttpResponse, actix_web::Error> {
    let context = ErrorContext::new("user_login");

    let issued = authenticator
        .authenticate(&form)
        .await
        .map_err(|e| context.record(e))?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = issued.token.user_id,
        "User logged in successfully"
    );

    Ok(HttpResponse::Ok().json(TokenResponse {
        token: issued.token,
        token_type: "Bearer".to_string(),
        expires_in: issued.ttl.num_seconds(),
    }))
}

/// POST /users/logout
///
/// Deletes the presented bearer token. Logging out with a token that is
/// already gone still succeeds.
pub async fn logout(
    req: HttpRequest,
    authenticator: web::Data<Authenticator>,
) -> Result<HttpResponse, AppError> {
    let plaintext = extract_bearer(req.header_value(AUTHORIZATION))?;
    authenticator.revoke_token(plaintext).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Signed out" })))
}

/// POST /users/validate-token
pub async fn validate_token(
    form: web::Json<ValidateTokenRequest>,
    authenticator: web::Data<Authenticator>,
) -> Result<HttpResponse, AppError> {
    let valid = authenticator.validate_token(&form.token).await?;

    Ok(HttpResponse::Ok().json(ValidateTokenResponse { valid }))
}

/// POST /users/me/tokens
///
/// Issue a token with a caller-chosen lifetime for the authenticated user.
/// This supersedes the token used to make the request.
pub async fn issue_token(
    user: web::ReqData<User>,
    form: web::Json<IssueTokenRequest>,
    authenticator: web::Data<Authenticator>,
) -> Result<HttpResponse, actix_web::Error> {
    if form.ttl_seconds <= 0 || form.ttl_seconds > MAX_TOKEN_TTL_SECONDS {
        return Err(AppError::from(ValidationError::InvalidFormat("ttl_seconds".to_string())).into());
    }

    let context = ErrorContext::new("issue_token").with_user_id(user.id);
    let ttl = chrono::Duration::seconds(form.ttl_seconds);
    let token = authenticator
        .issue_token(user.id, ttl)
        .await
        .map_err(|e| context.record(e))?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = user.id,
        "Token issued"
    );

    Ok(HttpResponse::Created().json(TokenResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in: ttl.num_seconds(),
    }))
}
