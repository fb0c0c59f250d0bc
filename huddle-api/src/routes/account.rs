/// Account recovery and email verification
///
/// - `POST /v1/auth/forgot-password` - Mail a password reset link
/// - `POST /v1/auth/reset-password` - Set a new password with a reset token
/// - `POST /v1/auth/verify-email` - Mail a 6-digit verification code
/// - `POST /v1/auth/verify-code` - Confirm the code and mark the email verified
///
/// Mail is dispatched in the background; none of these endpoints wait for or
/// fail on delivery.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ApiJson,
    routes::MessageResponse,
};
use axum::{extract::State, Json};
use chrono::Utc;
use huddle_shared::{
    auth::{
        jwt::{self, TokenType},
        password,
        verification::{self, CodeCheck},
    },
    mail::{dispatch, EmailMessage},
    models::user::UpdateUser,
};
use serde::Deserialize;
use validator::Validate;

const FORGOT_PASSWORD_MESSAGE: &str =
    "If that email address is in our database, we will send you an email to reset your password.";

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,

    #[validate(length(min = 1, message = "New password is required"))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyEmailRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyCodeRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(equal = 6, message = "Verification code must be 6 digits"))]
    pub code: String,
}

/// Mails a password reset link
///
/// Answers the same message whether or not the account exists.
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ForgotPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;

    if let Some(user) = state.store.find_user_by_email(req.email.trim()).await? {
        let token = jwt::issue_token(user.id, TokenType::PasswordReset, state.jwt_secret())?;
        let link = state.config.reset_link(&token);

        dispatch(
            state.mailer.clone(),
            EmailMessage::password_reset(&user.email, &link),
        );
        tracing::info!(user_id = %user.id, "Password reset link issued");
    } else {
        tracing::debug!("Password reset requested for unknown email");
    }

    Ok(Json(MessageResponse::new(FORGOT_PASSWORD_MESSAGE)))
}

/// Sets a new password using a reset token
///
/// # Errors
///
/// - `403 Forbidden`: Token invalid (`invalid_token`) or expired (`token_expired`)
/// - `404 Not Found`: The account no longer exists
/// - `422 Unprocessable Entity`: New password too weak
pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;

    let claims = jwt::validate_reset_token(&req.token, state.jwt_secret())?;
    let password_hash = password::hash_new_password(&req.new_password)?;

    state
        .store
        .update_user(
            claims.sub,
            UpdateUser {
                password_hash: Some(password_hash),
                ..Default::default()
            },
        )
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = %claims.sub, "Password reset");

    Ok(Json(MessageResponse::new("Password has been reset successfully.")))
}

/// Issues and mails a verification code
///
/// Only the hash of the code is stored; a new request replaces the previous
/// code.
pub async fn verify_email(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<VerifyEmailRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;

    let user = state
        .store
        .find_user_by_email(req.email.trim())
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if user.email_verified {
        return Ok(Json(MessageResponse::new("Email is already verified.")));
    }

    let code = verification::generate_code();
    state
        .store
        .update_user(
            user.id,
            UpdateUser {
                verification: Some(Some(verification::pending_for(&code, Utc::now()))),
                ..Default::default()
            },
        )
        .await?;

    dispatch(
        state.mailer.clone(),
        EmailMessage::verification_code(&user.email, &code),
    );
    tracing::info!(user_id = %user.id, "Verification code issued");

    Ok(Json(MessageResponse::new("Verification code sent successfully.")))
}

/// Confirms a verification code
///
/// # Errors
///
/// - `404 Not Found`: No such user, already verified, or no code issued
/// - `400 Bad Request`: Wrong or expired code. The code is discarded after
///   too many wrong guesses.
pub async fn verify_code(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<VerifyCodeRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;

    let not_found = || ApiError::NotFound("User not found or already verified".to_string());

    let user = state
        .store
        .find_user_by_email(req.email.trim())
        .await?
        .filter(|user| !user.email_verified)
        .ok_or_else(not_found)?;
    let pending = user.verification.as_ref().ok_or_else(not_found)?;

    match verification::check_code(pending, &req.code, Utc::now()) {
        CodeCheck::Valid => {}
        CodeCheck::Mismatch => {
            let remaining = verification::record_mismatch(pending);
            let burned = remaining.is_none();
            state
                .store
                .update_user(
                    user.id,
                    UpdateUser {
                        verification: Some(remaining),
                        ..Default::default()
                    },
                )
                .await?;

            if burned {
                tracing::warn!(user_id = %user.id, "Verification code discarded after repeated failures");
                return Err(ApiError::BadRequest(
                    "Too many invalid attempts, request a new code".to_string(),
                ));
            }
            return Err(ApiError::BadRequest("Invalid verification code".to_string()));
        }
        CodeCheck::Exhausted => {
            return Err(ApiError::BadRequest(
                "Too many invalid attempts, request a new code".to_string(),
            ));
        }
        CodeCheck::Expired => {
            return Err(ApiError::BadRequest(
                "Verification code has expired, request a new one".to_string(),
            ));
        }
    }

    state
        .store
        .update_user(
            user.id,
            UpdateUser {
                email_verified: Some(true),
                verification: Some(None),
                ..Default::default()
            },
        )
        .await?;

    tracing::info!(user_id = %user.id, "Email verified");

    Ok(Json(MessageResponse::new("Email verified successfully.")))
}
