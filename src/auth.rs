//! Registration and login on top of the [`CredentialStore`].
//!
//! Passwords are stored as salted Argon2 PHC strings. There are no
//! complexity rules, no rate limiting, and no email verification.

use crate::error::AuthError;
use crate::store::{user, CredentialStore};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// What the session remembers about a logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: i32,
    pub name: String,
    pub email: String,
}

impl From<user::Model> for SessionUser {
    fn from(m: user::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            email: m.email,
        }
    }
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

/// False for a wrong password and for a stored hash that does not parse.
pub fn verify_password(stored_hash: &str, password: &str) -> bool {
    let parsed = match PasswordHash::new(stored_hash) {
        Ok(parsed) => parsed,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Create an account.
///
/// # Errors
/// [`AuthError::DuplicateEmail`] when the email is taken,
/// [`AuthError::Unavailable`] when no database is connected.
pub async fn register(
    store: &CredentialStore,
    name: &str,
    email: &str,
    password: &str,
) -> Result<SessionUser, AuthError> {
    let hash = hash_password(password)?;
    let created = store.insert_user(name, email, hash).await?;
    info!(user_id = created.id, "Registered new user");
    Ok(created.into())
}

/// Check credentials. `Ok(None)` covers both an unknown email and a wrong
/// password so callers cannot tell them apart.
pub async fn login(
    store: &CredentialStore,
    email: &str,
    password: &str,
) -> Result<Option<SessionUser>, AuthError> {
    let Some(user) = store.find_by_email(email).await? else {
        warn!("Login failed: unknown email");
        return Ok(None);
    };

    if !verify_password(&user.password, password) {
        warn!(user_id = user.id, "Login failed: wrong password");
        return Ok(None);
    }

    info!(user_id = user.id, "User logged in");
    Ok(Some(user.into()))
}
