use axum::extract::State;
use jifunze_core::{ApiResponse, AppError};
use jifunze_models::{
    ForgotPasswordRequest, ForgotPasswordResponse, LoginRequest, LoginResponse, RegisterRequest,
    ResetPasswordRequest, TokenPairResponse, User,
};

use crate::middleware::auth::{AuthUser, RefreshClaims};
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::service::AuthService;

pub async fn register_user(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<RegisterRequest>,
) -> Result<ApiResponse<User>, AppError> {
    let user = AuthService::register_user(&state.db, dto).await?;
    Ok(ApiResponse::created("User registered successfully", user))
}

pub async fn login_user(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<LoginRequest>,
) -> Result<ApiResponse<LoginResponse>, AppError> {
    let response = AuthService::login_user(&state.db, &state.tokens, dto).await?;
    Ok(ApiResponse::ok("Login successful", response))
}

pub async fn refresh_tokens(
    State(state): State<AppState>,
    RefreshClaims(claims): RefreshClaims,
) -> Result<ApiResponse<TokenPairResponse>, AppError> {
    let pair = AuthService::refresh_tokens(&state.db, &state.tokens, claims).await?;
    Ok(ApiResponse::ok("Tokens refreshed", pair))
}

pub async fn logout(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<ApiResponse<()>, AppError> {
    AuthService::logout(&state.tokens, &claims).await?;
    Ok(ApiResponse::message("Logged out successfully"))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<ForgotPasswordRequest>,
) -> Result<ApiResponse<ForgotPasswordResponse>, AppError> {
    let response =
        AuthService::request_password_reset(&state.db, &state.reset_config, &dto.email).await?;
    Ok(ApiResponse::ok(
        "If an account exists for this email, a password reset has been issued",
        response,
    ))
}

pub async fn reset_password(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<ResetPasswordRequest>,
) -> Result<ApiResponse<()>, AppError> {
    AuthService::reset_password(&state.db, &dto.token, &dto.new_password).await?;
    Ok(ApiResponse::message("Password has been reset successfully"))
}
