//! Registration, credential checks and bearer token handling.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use devtrack_auth::{Principal, TokenCodec, hash_password, verify_password};
use devtrack_core::{UserId, bounded_text, normalize_email};

use crate::store::{Database, UserRecord};

use super::ServiceError;

const MAX_NAME_LEN: usize = 200;

pub struct IdentityService {
    db: Arc<dyn Database>,
    tokens: Arc<dyn TokenCodec>,
    bcrypt_cost: u32,
}

impl IdentityService {
    pub fn new(db: Arc<dyn Database>, tokens: Arc<dyn TokenCodec>, bcrypt_cost: u32) -> Self {
        Self {
            db,
            tokens,
            bcrypt_cost,
        }
    }

    /// Create an account. The email is trimmed and lowercased before storage.
    #[instrument(skip_all, err)]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Principal, ServiceError> {
        let email = normalize_email(email)?;
        let name = bounded_text("name", name, MAX_NAME_LEN)?;
        if password.is_empty() {
            return Err(ServiceError::Validation("password must not be empty".into()));
        }

        let password_hash = self.hash(password.to_string()).await?;
        let user = UserRecord {
            id: UserId::new(),
            email,
            name,
            password_hash,
            created_at: Utc::now(),
        };

        let mut tx = self.db.begin().await?;
        tx.insert_user(&user).await?;
        tx.commit().await?;

        info!(user_id = %user.id, "user registered");
        Ok(user.principal())
    }

    /// Check an email/password pair.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    #[instrument(skip_all, err)]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Principal, ServiceError> {
        let Ok(email) = normalize_email(email) else {
            return Err(ServiceError::InvalidCredentials);
        };

        let user = {
            let mut tx = self.db.begin().await?;
            tx.user_by_email(&email).await?
        };
        let Some(user) = user else {
            warn!("login for unknown email");
            return Err(ServiceError::InvalidCredentials);
        };

        if !self.verify(password.to_string(), user.password_hash.clone()).await? {
            warn!(user_id = %user.id, "login with wrong password");
            return Err(ServiceError::InvalidCredentials);
        }
        Ok(user.principal())
    }

    pub fn issue_token(&self, principal: &Principal) -> Result<String, ServiceError> {
        self.tokens
            .issue(principal.id, Utc::now())
            .map_err(|e| ServiceError::Unavailable(e.to_string()))
    }

    /// `authenticate` followed by `issue_token`.
    pub async fn login(&self, email: &str, password: &str) -> Result<String, ServiceError> {
        let principal = self.authenticate(email, password).await?;
        let token = self.issue_token(&principal)?;
        info!(user_id = %principal.id, "login succeeded");
        Ok(token)
    }

    /// Resolve a bearer token to its principal.
    ///
    /// A well-formed token for an account that no longer exists is invalid.
    #[instrument(skip_all, err)]
    pub async fn verify_token(&self, token: &str) -> Result<Principal, ServiceError> {
        let claims = self
            .tokens
            .validate(token, Utc::now())
            .map_err(|_| ServiceError::InvalidToken)?;

        let mut tx = self.db.begin().await?;
        let user = tx.user_by_id(claims.sub).await?;
        user.map(|u| u.principal()).ok_or(ServiceError::InvalidToken)
    }

    /// Delete the caller's account and everything that cascades from it.
    #[instrument(skip(self, principal), fields(user_id = %principal.id), err)]
    pub async fn delete_account(&self, principal: &Principal) -> Result<(), ServiceError> {
        let mut tx = self.db.begin().await?;
        if !tx.delete_user(principal.id).await? {
            return Err(ServiceError::NotFound("user"));
        }
        tx.commit().await?;
        info!("account deleted");
        Ok(())
    }

    async fn hash(&self, password: String) -> Result<String, ServiceError> {
        let cost = self.bcrypt_cost;
        tokio::task::spawn_blocking(move || hash_password(&password, cost))
            .await
            .map_err(|e| ServiceError::Unavailable(e.to_string()))?
            .map_err(ServiceError::from)
    }

    async fn verify(&self, password: String, hash: String) -> Result<bool, ServiceError> {
        tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| ServiceError::Unavailable(e.to_string()))
    }
}
