use std::sync::Arc;

use axum::extract::FromRef;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::state::AppState;
use crate::users::dto::UserProfile;
use crate::users::error::{AccountError, DirectoryError};
use crate::users::repo::UserDirectory;
use crate::users::repo_types::{ProfileUpdate, User, UserSummary};
use crate::users::services::normalize_email;

/// Reads and non-sensitive updates of user records.
#[derive(Clone)]
pub struct ProfileService {
    directory: Arc<dyn UserDirectory>,
}

impl FromRef<AppState> for ProfileService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.directory.clone())
    }
}

impl ProfileService {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }

    #[instrument(skip(self, update))]
    pub async fn update_user_profile(
        &self,
        update: ProfileUpdate,
        id: Uuid,
    ) -> Result<User, AccountError> {
        let name = update.name.map(|n| n.trim().to_string());
        if name.as_deref() == Some("") {
            return Err(AccountError::Validation("Name must not be empty".into()));
        }
        let update = ProfileUpdate { name };

        self.directory.find_by_id(id).await.map_err(|e| {
            if !matches!(e, DirectoryError::NotFound) {
                error!(error = %e, "user lookup failed");
            }
            AccountError::from(e)
        })?;

        let user = self.directory.update_profile(&update, id).await.map_err(|e| {
            if matches!(e, DirectoryError::Storage(_)) {
                error!(error = %e, "profile update failed");
            }
            AccountError::from(e)
        })?;

        info!(user_id = %id, "profile updated");
        Ok(user)
    }

    /// Fails with `NotFound("data user is empty")` when no user exists yet.
    #[instrument(skip(self))]
    pub async fn get_users(&self) -> Result<Vec<UserSummary>, AccountError> {
        self.directory.list().await.map_err(|e| match e {
            DirectoryError::NotFound => AccountError::NotFound("data user is empty".into()),
            other => {
                error!(error = %other, "list users failed");
                AccountError::Internal("failed to get data".into())
            }
        })
    }

    /// Record plus its role, looked up through the role reference.
    #[instrument(skip(self))]
    pub async fn get_user_by_id(&self, id: Uuid) -> Result<UserProfile, AccountError> {
        let user = self.directory.find_by_id(id).await.map_err(|e| match e {
            DirectoryError::NotFound => AccountError::user_not_found(),
            other => {
                error!(error = %other, "get user by id failed");
                AccountError::Internal("Failed to retrieve user data".into())
            }
        })?;

        let role = match user.role_id {
            Some(role_id) => match self.directory.find_role(role_id).await {
                Ok(role) => Some(role),
                Err(DirectoryError::NotFound) => None,
                Err(e) => {
                    error!(error = %e, %role_id, "role lookup failed");
                    return Err(AccountError::Internal("Failed to retrieve user data".into()));
                }
            },
            None => None,
        };

        Ok(UserProfile { user, role })
    }

    #[instrument(skip(self))]
    pub async fn get_user_by_email(&self, email: &str) -> Result<User, AccountError> {
        let email = normalize_email(email)?;
        self.directory.find_by_email(&email).await.map_err(|e| {
            if !matches!(e, DirectoryError::NotFound) {
                error!(error = %e, "get user by email failed");
            }
            AccountError::from(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OtpConfig;
    use crate::users::dto::SignUpRequest;
    use crate::users::memory::MemoryUserDirectory;
    use crate::users::services::AccountService;

    async fn seeded() -> (Arc<MemoryUserDirectory>, ProfileService, User) {
        let dir = Arc::new(MemoryUserDirectory::new());
        let accounts = AccountService::new(dir.clone(), OtpConfig::default());
        let user = accounts
            .sign_up(SignUpRequest {
                name: "Ada".into(),
                email: "ada@x.io".into(),
                password: "secret1".into(),
            })
            .await
            .unwrap();
        (dir.clone(), ProfileService::new(dir), user)
    }

    #[tokio::test]
    async fn empty_store_listing_is_an_error() {
        let svc = ProfileService::new(Arc::new(MemoryUserDirectory::new()));
        let err = svc.get_users().await.unwrap_err();
        assert!(matches!(err, AccountError::NotFound(ref m) if m == "data user is empty"));
    }

    #[tokio::test]
    async fn listing_returns_projected_rows() {
        let (_, svc, user) = seeded().await;
        let rows = svc.get_users().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, user.id);

        let json = serde_json::to_value(&rows[0]).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("otp_code").is_none());
    }

    #[tokio::test]
    async fn update_profile_changes_only_profile_fields() {
        let (_, svc, user) = seeded().await;
        let updated = svc
            .update_user_profile(
                ProfileUpdate {
                    name: Some("Ada Lovelace".into()),
                },
                user.id,
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Ada Lovelace");
        assert_eq!(updated.username, user.username);
        assert_eq!(updated.password_hash, user.password_hash);
        assert_eq!(updated.otp_code, user.otp_code);
    }

    #[tokio::test]
    async fn update_profile_keeps_verified_identity() {
        let (dir, svc, user) = seeded().await;
        let accounts = AccountService::new(dir.clone(), OtpConfig::default());
        accounts
            .verify_account("ada@x.io", user.otp_code.as_deref().unwrap())
            .await
            .unwrap();

        let updated = svc
            .update_user_profile(
                ProfileUpdate {
                    name: Some("  Countess  ".into()),
                },
                user.id,
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Countess");
        assert_eq!(updated.email, "ada@x.io");
        assert_eq!(updated.username, "ada");
        assert!(updated.is_verified);
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let (dir, svc, user) = seeded().await;
        let err = svc
            .update_user_profile(
                ProfileUpdate {
                    name: Some("   ".into()),
                },
                user.id,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::Validation(_)));
        assert_eq!(dir.find_by_id(user.id).await.unwrap().name, "Ada");
    }

    #[tokio::test]
    async fn update_profile_unknown_user_is_not_found() {
        let (_, svc, _) = seeded().await;
        let err = svc
            .update_user_profile(ProfileUpdate::default(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::NotFound(_)));
    }

    #[tokio::test]
    async fn get_user_by_id_resolves_role() {
        let (dir, svc, mut user) = seeded().await;
        let role = dir.insert_role("admin").await;
        user.role_id = Some(role.id);
        dir.update(&user).await.unwrap();

        let profile = svc.get_user_by_id(user.id).await.unwrap();
        assert_eq!(profile.role, Some(role));
        assert_eq!(profile.user.id, user.id);
    }

    #[tokio::test]
    async fn get_user_by_id_signals_absence() {
        let (_, svc, _) = seeded().await;
        let err = svc.get_user_by_id(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AccountError::NotFound(_)));
    }

    #[tokio::test]
    async fn get_user_by_id_storage_failure_is_internal() {
        let (dir, svc, user) = seeded().await;
        dir.set_unavailable(true);
        let err = svc.get_user_by_id(user.id).await.unwrap_err();
        assert!(matches!(err, AccountError::Internal(ref m) if m == "Failed to retrieve user data"));
    }

    #[tokio::test]
    async fn get_user_by_email_normalizes_input() {
        let (_, svc, user) = seeded().await;
        let found = svc.get_user_by_email(" ADA@x.io").await.unwrap();
        assert_eq!(found.id, user.id);
        let err = svc.get_user_by_email("ghost@x.io").await.unwrap_err();
        assert!(matches!(err, AccountError::NotFound(_)));
    }
}
