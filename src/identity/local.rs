use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tokio::sync::watch;
use uuid::Uuid;

use super::{normalize_email, AuthError, AuthUser, IdentityProvider, MIN_PASSWORD_LEN};

/// Identity provider keeping accounts in the local SQLite database.
///
/// Passwords are stored as salted bcrypt hashes. The signed-in account is
/// persisted in a single-row `session` table, so a new provider loaded from
/// the same database picks up where the previous one left off.
pub struct LocalIdentityProvider {
    pool: SqlitePool,
    password_cost: u32,
    current: watch::Sender<Option<AuthUser>>,
}

impl LocalIdentityProvider {
    /// An alias for the recommended bcrypt cost.
    pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

    /// Create a provider over a migrated pool, restoring any persisted session.
    ///
    /// `password_cost` is the bcrypt work factor used for new accounts.
    pub async fn load(pool: SqlitePool, password_cost: u32) -> Result<Self, AuthError> {
        let row = sqlx::query(
            r#"
            SELECT a.uid, a.email
            FROM session s
            JOIN accounts a ON a.uid = s.uid
            WHERE s.slot = 1
            "#,
        )
        .fetch_optional(&pool)
        .await
        .context("Failed to load session")?;

        let user = row.map(|row| AuthUser {
            uid: row.get("uid"),
            email: row.get("email"),
        });
        if let Some(user) = &user {
            tracing::debug!(uid = %user.uid, "restored session");
        }

        let (current, _) = watch::channel(user);
        Ok(Self {
            pool,
            password_cost,
            current,
        })
    }

    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let password = password.to_string();
        let cost = self.password_cost;
        let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .context("Password hashing task failed")?
            .context("Failed to hash password")?;
        Ok(hash)
    }

    async fn verify_password(&self, password: &str, hash: String) -> Result<bool, AuthError> {
        let password = password.to_string();
        let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .context("Password verification task failed")?
            .context("Failed to verify password")?;
        Ok(matches)
    }

    async fn start_session(&self, user: AuthUser) -> Result<AuthUser, AuthError> {
        sqlx::query(
            r#"
            INSERT INTO session (slot, uid, signed_in_at)
            VALUES (1, ?, ?)
            ON CONFLICT (slot) DO UPDATE SET
                uid = excluded.uid,
                signed_in_at = excluded.signed_in_at
            "#,
        )
        .bind(&user.uid)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save session")?;

        tracing::info!(uid = %user.uid, "signed in");
        self.current.send_replace(Some(user.clone()));
        Ok(user)
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn create_account(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }

        let password_hash = self.hash_password(password).await?;
        let user = AuthUser {
            uid: Uuid::new_v4().simple().to_string(),
            email,
        };

        let result = sqlx::query(
            r#"
            INSERT INTO accounts (uid, email, password_hash, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&user.uid)
        .bind(&user.email)
        .bind(&password_hash)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {}
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                return Err(AuthError::EmailAlreadyInUse(user.email));
            }
            Err(err) => return Err(anyhow::Error::new(err).context("Failed to save account").into()),
        }

        tracing::info!(uid = %user.uid, "account created");
        self.start_session(user).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let email = normalize_email(email)?;

        let row = sqlx::query("SELECT uid, email, password_hash FROM accounts WHERE email = ?")
            .bind(&email)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch account")?;

        let Some(row) = row else {
            tracing::warn!("sign-in rejected: unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        let user = AuthUser {
            uid: row.get("uid"),
            email: row.get("email"),
        };
        if !self.verify_password(password, row.get("password_hash")).await? {
            tracing::warn!(uid = %user.uid, "sign-in rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        self.start_session(user).await
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        sqlx::query("DELETE FROM session")
            .execute(&self.pool)
            .await
            .context("Failed to clear session")?;

        if let Some(user) = self.current.send_replace(None) {
            tracing::info!(uid = %user.uid, "signed out");
        }
        Ok(())
    }

    fn current_user(&self) -> Option<AuthUser> {
        self.current.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        self.current.subscribe()
    }
}
