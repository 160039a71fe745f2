/// User Routes
///
/// Signup plus the authenticated user-management endpoints.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::domain::{NewUser, User, UserUpdate};
use crate::error::{AppError, DatabaseError, ErrorContext};
use crate::users::UserStore;
use crate::validators::{is_valid_password, validate_new_user, validate_user_update};

#[derive(Serialize)]
pub struct UsersResponse {
    pub users: Vec<User>,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
}

/// POST /users/add
///
/// # Errors
/// - 400: Validation errors (email, names, password strength)
/// - 409: Email already registered
pub async fn add_user(
    form: web::Json<NewUser>,
    users: web::Data<UserStore>,
) -> Result<HttpResponse, actix_web::Error> {
    let context = ErrorContext::new("user_registration");
    let new_user = validate_new_user(form.into_inner()).map_err(AppError::from)?;

    let id = users
        .insert(&new_user)
        .await
        .map_err(|e| context.record(e))?;
    let user = users.get_one(id).await?.ok_or_else(|| {
        AppError::Database(DatabaseError::NotFound("newly inserted user".to_string()))
    })?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = id,
        "User registered successfully"
    );

    Ok(HttpResponse::Created().json(user))
}

/// GET /users/all
pub async fn all_users(users: web::Data<UserStore>) -> Result<HttpResponse, AppError> {
    let users = users.get_all().await?;
    Ok(HttpResponse::Ok().json(UsersResponse { users }))
}

/// GET /users/me
pub async fn current_user(user: web::ReqData<User>) -> HttpResponse {
    HttpResponse::Ok().json(user.into_inner())
}

/// PUT /users/me
pub async fn update_current_user(
    user: web::ReqData<User>,
    form: web::Json<UserUpdate>,
    users: web::Data<UserStore>,
) -> Result<HttpResponse, AppError> {
    let changes = validate_user_update(form.into_inner())?;
    users.update(user.id, &changes).await?;

    let updated = users
        .get_one(user.id)
        .await?
        .ok_or_else(|| AppError::Database(DatabaseError::NotFound("user".to_string())))?;

    Ok(HttpResponse::Ok().json(updated))
}

/// DELETE /users/me
///
/// Removes the account and every token it owns.
pub async fn delete_current_user(
    user: web::ReqData<User>,
    users: web::Data<UserStore>,
) -> Result<HttpResponse, actix_web::Error> {
    let context = ErrorContext::new("user_deletion").with_user_id(user.id);
    users.delete(user.id).await.map_err(|e| context.record(e))?;

    tracing::info!(request_id = %context.request_id, user_id = user.id, "User deleted");

    Ok(HttpResponse::NoContent().finish())
}

/// POST /users/me/password
///
/// Existing tokens stay valid; the new password applies to the next login.
pub async fn reset_password(
    user: web::ReqData<User>,
    form: web::Json<ResetPasswordRequest>,
    users: web::Data<UserStore>,
) -> Result<HttpResponse, AppError> {
    is_valid_password(&form.password)?;
    users.reset_password(user.id, &form.password).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Password updated" })))
}
