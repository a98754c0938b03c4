// src/handlers/auth.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    db::Repository,
    error::AppError,
    models::user::{ForgotPasswordRequest, LoginRequest, ResetPasswordRequest},
    utils::{
        hash::{hash_password, verify_password},
        jwt::sign_jwt,
    },
};

/// Authenticates the admin and returns a JWT token.
///
/// `remember_me` selects the persistence mode: a durable token lifetime
/// when set, a session-scoped one otherwise. Signing out is discarding the
/// token client-side.
pub async fn login(
    State(repo): State<Repository>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user = repo.get_user_by_email(&payload.email).await.map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        e
    })?;

    // Same message for unknown account and wrong password.
    let user = user.ok_or(AppError::AuthError("Invalid email or password".to_string()))?;

    let is_valid = verify_password(&payload.password, &user.password)?;

    if !is_valid {
        return Err(AppError::AuthError("Invalid email or password".to_string()));
    }

    let expiration = if payload.remember_me {
        config.jwt_expiration_durable
    } else {
        config.jwt_expiration_session
    };

    let token = sign_jwt(user.id, &user.role, &config.jwt_secret, expiration)?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "expires_in": expiration,
    })))
}

/// Requests a password reset.
///
/// Always answers 202 so the endpoint cannot be used to probe which emails
/// have an account. When the account exists, a single-use expiring token is
/// issued and dispatched through the log (the stand-in for a reset email).
pub async fn forgot_password(
    State(repo): State<Repository>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if let Some(user) = repo.get_user_by_email(&payload.email).await? {
        let token = repo.create_password_reset(user.id).await?;
        tracing::info!("Password reset token issued for {}: {}", user.email, token);
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "message": "If that account exists, a reset link has been sent."
        })),
    ))
}

/// Consumes a reset token and sets a new password.
pub async fn reset_password(
    State(repo): State<Repository>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = repo
        .consume_password_reset(&payload.token)
        .await?
        .ok_or(AppError::BadRequest(
            "Invalid or expired reset token".to_string(),
        ))?;

    let hashed_password = hash_password(&payload.new_password)?;
    repo.update_user_password(user_id, &hashed_password).await?;

    Ok(StatusCode::NO_CONTENT)
}
