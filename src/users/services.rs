use std::sync::Arc;

use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration, OffsetDateTime};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::auth::password::hash_password_blocking;
use crate::config::OtpConfig;
use crate::state::AppState;
use crate::users::dto::SignUpRequest;
use crate::users::error::{AccountError, DirectoryError};
use crate::users::otp::generate_otp;
use crate::users::repo::UserDirectory;
use crate::users::repo_types::{NewUser, User};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trims and lowercases, then rejects anything that is not shaped like an address.
pub(crate) fn normalize_email(raw: &str) -> Result<String, AccountError> {
    let email = raw.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(AccountError::Validation("Invalid email".into()));
    }
    Ok(email)
}

/// Username is the email's local part, lowercased, restricted to `[a-z0-9._-]`.
pub(crate) fn derive_username(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    local
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect()
}

fn require_password(password: &str) -> Result<(), AccountError> {
    if password.is_empty() {
        return Err(AccountError::Validation("Password must not be empty".into()));
    }
    Ok(())
}

fn lookup_failed(e: DirectoryError) -> AccountError {
    if !matches!(e, DirectoryError::NotFound) {
        error!(error = %e, "user lookup failed");
    }
    AccountError::from(e)
}

/// Sign-up, email verification, code re-issuance and credential rotation.
#[derive(Clone)]
pub struct AccountService {
    directory: Arc<dyn UserDirectory>,
    otp: OtpConfig,
}

impl FromRef<AppState> for AccountService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.directory.clone(), state.config.otp.clone())
    }
}

impl AccountService {
    pub fn new(directory: Arc<dyn UserDirectory>, otp: OtpConfig) -> Self {
        Self { directory, otp }
    }

    fn otp_ttl(&self) -> Duration {
        Duration::minutes(self.otp.ttl_minutes)
    }

    /// Creates an unverified account carrying a fresh one-time code.
    #[instrument(skip_all)]
    pub async fn sign_up(&self, req: SignUpRequest) -> Result<User, AccountError> {
        let name = req.name.trim().to_string();
        if name.is_empty() {
            return Err(AccountError::Validation("Name must not be empty".into()));
        }
        let email = normalize_email(&req.email)?;
        require_password(&req.password)?;

        let password_hash = hash_password_blocking(req.password).await?;
        let new_user = NewUser {
            name,
            username: derive_username(&email),
            email,
            password_hash,
            otp_code: generate_otp(self.otp.length),
            otp_expiration: OffsetDateTime::now_utc() + self.otp_ttl(),
        };

        let user = self.directory.create(new_user).await.map_err(|e| {
            match &e {
                DirectoryError::Conflict => warn!("email already registered"),
                _ => error!(error = %e, "create user failed"),
            }
            AccountError::from(e)
        })?;

        info!(user_id = %user.id, "user signed up");
        Ok(user)
    }

    pub async fn verify_account(&self, email: &str, otp: &str) -> Result<(), AccountError> {
        self.verify_account_at(email, otp, OffsetDateTime::now_utc())
            .await
    }

    /// Moves the account to verified when `otp` matches and `now` precedes its expiration.
    /// A rejected code leaves the record untouched.
    #[instrument(skip(self, otp))]
    pub async fn verify_account_at(
        &self,
        email: &str,
        otp: &str,
        now: OffsetDateTime,
    ) -> Result<(), AccountError> {
        let email = normalize_email(email)?;
        let mut user = self
            .directory
            .find_by_email(&email)
            .await
            .map_err(lookup_failed)?;

        if !user.otp_matches(otp) {
            warn!(user_id = %user.id, "invalid otp code");
            return Err(AccountError::Authentication("Invalid OTP code".into()));
        }
        if user.otp_expired_at(now) {
            warn!(user_id = %user.id, "expired otp code");
            return Err(AccountError::Authentication("OTP code has expired".into()));
        }

        user.is_verified = true;
        user.otp_code = None;
        user.otp_expiration = None;

        self.directory.update(&user).await.map_err(|e| {
            error!(error = %e, user_id = %user.id, "persist verification failed");
            AccountError::Internal(e.to_string())
        })?;

        info!(user_id = %user.id, "account verified");
        Ok(())
    }

    /// Replaces the code and restarts its validity window, whatever the verification state.
    #[instrument(skip(self))]
    pub async fn send_new_otp_code(&self, email: &str) -> Result<(), AccountError> {
        let email = normalize_email(email)?;
        let mut user = self
            .directory
            .find_by_email(&email)
            .await
            .map_err(lookup_failed)?;

        user.otp_code = Some(generate_otp(self.otp.length));
        user.otp_expiration = Some(OffsetDateTime::now_utc() + self.otp_ttl());

        self.directory.update(&user).await.map_err(|e| {
            error!(error = %e, user_id = %user.id, "persist new otp failed");
            AccountError::Internal(e.to_string())
        })?;

        info!(user_id = %user.id, "new otp code issued");
        Ok(())
    }

    /// Rotates the credential. The current password is not re-checked.
    #[instrument(skip(self, new_password))]
    pub async fn update_password(&self, id: Uuid, new_password: String) -> Result<(), AccountError> {
        require_password(&new_password)?;
        self.directory
            .find_by_id(id)
            .await
            .map_err(lookup_failed)?;

        let password_hash = hash_password_blocking(new_password).await?;
        self.directory
            .update_password(id, &password_hash)
            .await
            .map_err(|e| {
                if !matches!(e, DirectoryError::NotFound) {
                    error!(error = %e, user_id = %id, "persist password failed");
                }
                AccountError::from(e)
            })?;

        info!(user_id = %id, "password updated");
        Ok(())
    }
}
