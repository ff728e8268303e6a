use axum::async_trait;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use crate::users::error::DirectoryError;
use crate::users::repo_types::{NewUser, ProfileUpdate, Role, User, UserSummary};

/// Persistence boundary for user records.
///
/// Implementations report absence and unique-email collisions as
/// [`DirectoryError::NotFound`] and [`DirectoryError::Conflict`]; every other
/// failure is [`DirectoryError::Storage`].
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<User, DirectoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<User, DirectoryError>;

    async fn find_by_email(&self, email: &str) -> Result<User, DirectoryError>;

    /// Overwrites every mutable column of an already loaded record.
    async fn update(&self, user: &User) -> Result<User, DirectoryError>;

    /// Touches only profile columns; password and OTP columns are left alone.
    async fn update_profile(&self, update: &ProfileUpdate, id: Uuid)
        -> Result<User, DirectoryError>;

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), DirectoryError>;

    /// Newest first. An empty store is reported as `NotFound`.
    async fn list(&self) -> Result<Vec<UserSummary>, DirectoryError>;

    async fn find_role(&self, role_id: Uuid) -> Result<Role, DirectoryError>;
}

/// `UserDirectory` backed by the Postgres `users` and `roles` tables.
#[derive(Clone)]
pub struct PgUserDirectory {
    db: PgPool,
}

impl PgUserDirectory {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    #[instrument(skip_all)]
    async fn create(&self, user: NewUser) -> Result<User, DirectoryError> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, username, email, password_hash, otp_code, otp_expiration)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, username, email, password_hash, is_verified,
                      otp_code, otp_expiration, role_id, created_at, updated_at
            "#,
        )
        .bind(&user.name)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.otp_code)
        .bind(user.otp_expiration)
        .fetch_one(&self.db)
        .await?;
        Ok(created)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> Result<User, DirectoryError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, username, email, password_hash, is_verified,
                   otp_code, otp_expiration, role_id, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(DirectoryError::NotFound)
    }

    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> Result<User, DirectoryError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, username, email, password_hash, is_verified,
                   otp_code, otp_expiration, role_id, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?
        .ok_or(DirectoryError::NotFound)
    }

    #[instrument(skip_all, fields(user_id = %user.id))]
    async fn update(&self, user: &User) -> Result<User, DirectoryError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET name = $2,
                   username = $3,
                   email = $4,
                   password_hash = $5,
                   is_verified = $6,
                   otp_code = $7,
                   otp_expiration = $8,
                   role_id = $9,
                   updated_at = now()
             WHERE id = $1
            RETURNING id, name, username, email, password_hash, is_verified,
                      otp_code, otp_expiration, role_id, created_at, updated_at
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.is_verified)
        .bind(&user.otp_code)
        .bind(user.otp_expiration)
        .bind(user.role_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(DirectoryError::NotFound)
    }

    #[instrument(skip(self, update))]
    async fn update_profile(
        &self,
        update: &ProfileUpdate,
        id: Uuid,
    ) -> Result<User, DirectoryError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET name = COALESCE($2, name),
                   updated_at = now()
             WHERE id = $1
            RETURNING id, name, username, email, password_hash, is_verified,
                      otp_code, otp_expiration, role_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&update.name)
        .fetch_optional(&self.db)
        .await?
        .ok_or(DirectoryError::NotFound)
    }

    #[instrument(skip(self, password_hash))]
    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), DirectoryError> {
        let result = sqlx::query(
            r#"
            UPDATE users
               SET password_hash = $2,
                   updated_at = now()
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DirectoryError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<UserSummary>, DirectoryError> {
        let rows = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT id, name, username, email, created_at, updated_at
            FROM users
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        if rows.is_empty() {
            return Err(DirectoryError::NotFound);
        }
        Ok(rows)
    }

    #[instrument(skip(self))]
    async fn find_role(&self, role_id: Uuid) -> Result<Role, DirectoryError> {
        sqlx::query_as::<_, Role>(r#"SELECT id, name FROM roles WHERE id = $1"#)
            .bind(role_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or(DirectoryError::NotFound)
    }
}
