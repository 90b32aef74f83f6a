//! Auth Service
//!
//! Administrator login with argon2 password hashes and HS256 bearer tokens.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::domain::NewUser;
use crate::error::{AppError, AppResult};
use crate::store::Store;

/// JWT claims
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Username
    pub sub: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// Token handed out on successful login
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub username: String,
    pub role: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    jwt_secret: String,
    expiration: Duration,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, jwt_secret: impl Into<String>, expiration_hours: i64) -> Self {
        Self {
            store,
            jwt_secret: jwt_secret.into(),
            expiration: Duration::hours(expiration_hours),
        }
    }

    /// Check credentials against an active user and issue a token
    pub async fn login(&self, username: &str, password: &str) -> AppResult<IssuedToken> {
        let Some(user) = self.store.find_active_user(username).await? else {
            tracing::warn!(username, "Login failed: unknown or inactive user");
            return Err(AppError::InvalidCredentials);
        };

        if !verify_password(password, &user.password_hash) {
            tracing::warn!(username, "Login failed: wrong password");
            return Err(AppError::InvalidCredentials);
        }

        let issued = self.issue(&user.username, &user.role, Utc::now())?;
        tracing::info!(username = %issued.username, "Login succeeded");

        Ok(issued)
    }

    fn issue(&self, username: &str, role: &str, now: DateTime<Utc>) -> AppResult<IssuedToken> {
        let expires_at = now + self.expiration;
        let claims = Claims {
            sub: username.to_string(),
            role: role.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))?;

        Ok(IssuedToken {
            token,
            username: claims.sub,
            role: claims.role,
            expires_at,
        })
    }

    /// Verify signature and expiry
    pub fn validate(&self, token: &str) -> AppResult<Claims> {
        let decoding_key = DecodingKey::from_secret(self.jwt_secret.as_bytes());
        let validation = Validation::new(Algorithm::HS256);

        decode::<Claims>(token, &decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Token rejected: {}", e);
                AppError::InvalidToken
            })
    }

    /// Create the user unless the username is taken. Returns whether a user
    /// was inserted.
    pub async fn ensure_user(&self, username: &str, password: &str, role: &str) -> AppResult<bool> {
        if self.store.user_exists(username).await? {
            return Ok(false);
        }

        let user = NewUser {
            username: username.to_string(),
            password_hash: hash_password(password)?,
            role: role.to_string(),
        };
        self.store.insert_user(&user, Utc::now()).await?;

        tracing::info!(username, role, "User created");
        Ok(true)
    }
}

/// Argon2id hash in PHC string format
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Hashing failed: {}", e)))
}

fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::error!("Stored password hash is malformed: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::DEFAULT_ROLE;
    use crate::store::MemoryStore;

    async fn service() -> AuthService {
        let service = AuthService::new(Arc::new(MemoryStore::new()), "test-secret", 24);
        service.ensure_user("admin", "password", DEFAULT_ROLE).await.unwrap();
        service
    }

    #[tokio::test]
    async fn test_login_issues_valid_token() {
        let service = service().await;

        let issued = service.login("admin", "password").await.unwrap();
        assert_eq!(issued.username, "admin");
        assert_eq!(issued.role, "ADMIN");

        let claims = service.validate(&issued.token).unwrap();
        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[tokio::test]
    async fn test_login_rejects_bad_credentials() {
        let service = service().await;

        assert!(matches!(
            service.login("admin", "wrong").await,
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            service.login("nobody", "password").await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_ensure_user_is_idempotent() {
        let service = service().await;

        assert!(!service.ensure_user("admin", "other", DEFAULT_ROLE).await.unwrap());
        // Previous password still works
        assert!(service.login("admin", "password").await.is_ok());
    }

    #[tokio::test]
    async fn test_expired_token_is_invalid() {
        let service = service().await;
        let issued = service
            .issue("admin", "ADMIN", Utc::now() - Duration::hours(48))
            .unwrap();

        assert!(matches!(service.validate(&issued.token), Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret_is_invalid() {
        let service = service().await;
        let other = AuthService::new(Arc::new(MemoryStore::new()), "another-secret", 24);
        let issued = other.issue("admin", "ADMIN", Utc::now()).unwrap();

        assert!(matches!(service.validate(&issued.token), Err(AppError::InvalidToken)));
        assert!(matches!(service.validate("not-a-jwt"), Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_hash_password_round_trip() {
        let hash = hash_password("manager123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("manager123", &hash));
        assert!(!verify_password("manager124", &hash));
        assert!(!verify_password("manager123", "not-a-hash"));
    }
}
