use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    state::AppState,
    users::{
        dto::{
            ApiResponse, EmailQuery, SendOtpRequest, SignUpRequest, UpdatePasswordRequest,
            UserProfile, VerifyAccountRequest,
        },
        error::AccountError,
        profile::ProfileService,
        repo_types::{ProfileUpdate, User, UserSummary},
        services::AccountService,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user/signup", post(sign_up))
        .route("/user/verify-account", put(verify_account))
        .route("/user/send-otp", put(send_new_otp_code))
        .route("/user/update", put(update_user_profile))
        .route("/user/update-password", put(update_password))
        .route("/user", get(get_users))
        .route("/user/profile", get(get_profile))
        .route("/user/get-user-by-email", get(get_user_by_email))
        .route("/user/:id", get(get_user_by_id))
}

#[instrument(skip(accounts, payload))]
pub async fn sign_up(
    State(accounts): State<AccountService>,
    Json(payload): Json<SignUpRequest>,
) -> Result<ApiResponse<User>, AccountError> {
    let user = accounts.sign_up(payload).await?;
    Ok(ApiResponse::created(user).with_message("User created successfully"))
}

#[instrument(skip(accounts, payload))]
pub async fn verify_account(
    State(accounts): State<AccountService>,
    Json(payload): Json<VerifyAccountRequest>,
) -> Result<ApiResponse<()>, AccountError> {
    accounts
        .verify_account(&payload.email, &payload.otp)
        .await?;
    Ok(ApiResponse::message("Account verified successfully"))
}

#[instrument(skip(accounts, payload))]
pub async fn send_new_otp_code(
    State(accounts): State<AccountService>,
    Json(payload): Json<SendOtpRequest>,
) -> Result<ApiResponse<()>, AccountError> {
    accounts.send_new_otp_code(&payload.email).await?;
    Ok(ApiResponse::message("New OTP code sent successfully"))
}

#[instrument(skip(profiles, payload))]
pub async fn update_user_profile(
    State(profiles): State<ProfileService>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ProfileUpdate>,
) -> Result<ApiResponse<User>, AccountError> {
    let user = profiles.update_user_profile(payload, user_id).await?;
    Ok(ApiResponse::ok(user).with_message("User updated successfully"))
}

#[instrument(skip(accounts, payload))]
pub async fn update_password(
    State(accounts): State<AccountService>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdatePasswordRequest>,
) -> Result<ApiResponse<()>, AccountError> {
    accounts.update_password(user_id, payload.password).await?;
    Ok(ApiResponse::message("Password updated successfully"))
}

#[instrument(skip(profiles))]
pub async fn get_users(
    State(profiles): State<ProfileService>,
) -> Result<ApiResponse<Vec<UserSummary>>, AccountError> {
    let users = profiles.get_users().await?;
    Ok(ApiResponse::ok(users).with_message("All users fetched successfully"))
}

#[instrument(skip(profiles))]
pub async fn get_user_by_id(
    State(profiles): State<ProfileService>,
    AuthUser(_caller): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<UserProfile>, AccountError> {
    Ok(ApiResponse::ok(profiles.get_user_by_id(id).await?))
}

/// The authenticated caller's own record.
#[instrument(skip(profiles))]
pub async fn get_profile(
    State(profiles): State<ProfileService>,
    AuthUser(user_id): AuthUser,
) -> Result<ApiResponse<UserProfile>, AccountError> {
    Ok(ApiResponse::ok(profiles.get_user_by_id(user_id).await?))
}

#[instrument(skip(profiles))]
pub async fn get_user_by_email(
    State(profiles): State<ProfileService>,
    Query(query): Query<EmailQuery>,
) -> Result<ApiResponse<User>, AccountError> {
    Ok(ApiResponse::ok(profiles.get_user_by_email(&query.email).await?))
}
