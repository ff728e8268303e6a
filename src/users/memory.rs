use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::users::error::DirectoryError;
use crate::users::repo::UserDirectory;
use crate::users::repo_types::{NewUser, ProfileUpdate, Role, User, UserSummary};

/// In-process `UserDirectory` used by tests and the fake application state.
#[derive(Default)]
pub struct MemoryUserDirectory {
    // insertion order; ties on `created_at` list the later insert first
    users: RwLock<Vec<User>>,
    roles: RwLock<HashMap<Uuid, Role>>,
    unavailable: AtomicBool,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_role(&self, name: &str) -> Role {
        let role = Role {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        self.roles.write().await.insert(role.id, role.clone());
        role
    }

    /// Makes every call fail with `DirectoryError::Storage` until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), DirectoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DirectoryError::Storage("directory unavailable".into()));
        }
        Ok(())
    }
}

fn email_taken(users: &[User], email: &str, except: Option<Uuid>) -> bool {
    users
        .iter()
        .any(|u| u.email == email && Some(u.id) != except)
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn create(&self, user: NewUser) -> Result<User, DirectoryError> {
        self.check_available()?;
        let mut users = self.users.write().await;
        if email_taken(&users, &user.email, None) {
            return Err(DirectoryError::Conflict);
        }
        let now = OffsetDateTime::now_utc();
        let created = User {
            id: Uuid::new_v4(),
            name: user.name,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            is_verified: false,
            otp_code: Some(user.otp_code),
            otp_expiration: Some(user.otp_expiration),
            role_id: None,
            created_at: now,
            updated_at: now,
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<User, DirectoryError> {
        self.check_available()?;
        self.users
            .read()
            .await
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or(DirectoryError::NotFound)
    }

    async fn find_by_email(&self, email: &str) -> Result<User, DirectoryError> {
        self.check_available()?;
        self.users
            .read()
            .await
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(DirectoryError::NotFound)
    }

    async fn update(&self, user: &User) -> Result<User, DirectoryError> {
        self.check_available()?;
        let mut users = self.users.write().await;
        if email_taken(&users, &user.email, Some(user.id)) {
            return Err(DirectoryError::Conflict);
        }
        let stored = users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or(DirectoryError::NotFound)?;
        *stored = User {
            created_at: stored.created_at,
            updated_at: OffsetDateTime::now_utc(),
            ..user.clone()
        };
        Ok(stored.clone())
    }

    async fn update_profile(
        &self,
        update: &ProfileUpdate,
        id: Uuid,
    ) -> Result<User, DirectoryError> {
        self.check_available()?;
        let mut users = self.users.write().await;
        let stored = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(DirectoryError::NotFound)?;
        if let Some(name) = &update.name {
            stored.name = name.clone();
        }
        stored.updated_at = OffsetDateTime::now_utc();
        Ok(stored.clone())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), DirectoryError> {
        self.check_available()?;
        let mut users = self.users.write().await;
        let stored = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(DirectoryError::NotFound)?;
        stored.password_hash = password_hash.to_string();
        stored.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }

    async fn list(&self) -> Result<Vec<UserSummary>, DirectoryError> {
        self.check_available()?;
        let users = self.users.read().await;
        if users.is_empty() {
            return Err(DirectoryError::NotFound);
        }
        let mut rows: Vec<UserSummary> = users.iter().rev().map(UserSummary::from).collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn find_role(&self, role_id: Uuid) -> Result<Role, DirectoryError> {
        self.check_available()?;
        self.roles
            .read()
            .await
            .get(&role_id)
            .cloned()
            .ok_or(DirectoryError::NotFound)
    }
}
