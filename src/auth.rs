//! Identity store: user lookup, password hashing and account creation rules.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::Rng;
use uuid::Uuid;

use crate::db::{self, DbPool};
use crate::error::AppError;
use crate::models::{Registration, User};

const ALLOWED_USERNAME_CHARS: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-._@+";
const MIN_PASSWORD_LENGTH: usize = 6;

/// Outcome of [`create_user`]. Succeeded when no errors were reported.
#[derive(Debug, Default)]
pub struct IdentityResult {
    pub errors: Vec<String>,
}

impl IdentityResult {
    pub fn succeeded(&self) -> bool {
        self.errors.is_empty()
    }
}

fn hash_password(password: &str) -> Result<String, AppError> {
    let mut salt_bytes = [0u8; 16];
    rand::rng().fill(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|err| AppError::Internal(format!("salt encoding failed: {err}")))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| AppError::Internal(format!("password hashing failed: {err}")))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

pub fn find_by_username(pool: &DbPool, username: &str) -> Result<Option<User>, AppError> {
    db::find_user_by_username(pool, username)
}

pub fn find_by_email(pool: &DbPool, email: &str) -> Result<Option<User>, AppError> {
    db::find_user_by_email(pool, email)
}

/// Argon2 is CPU-bound, so it runs on the blocking pool.
async fn blocking<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| AppError::Internal(format!("password task failed: {err}")))
}

pub async fn check_password(user: &User, password: &str) -> Result<bool, AppError> {
    let password = password.to_string();
    let hash = user.password_hash.clone();
    blocking(move || verify_password(&password, &hash)).await
}

fn validate_username(username: &str, errors: &mut Vec<String>) {
    if username.is_empty() || !username.chars().all(|c| ALLOWED_USERNAME_CHARS.contains(c)) {
        errors.push(format!(
            "Username '{username}' is invalid, can only contain letters or digits."
        ));
    }
}

fn validate_password(password: &str, errors: &mut Vec<String>) {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.push(format!(
            "Passwords must be at least {MIN_PASSWORD_LENGTH} characters."
        ));
    }
    if password.chars().all(|c| c.is_ascii_alphanumeric()) {
        errors.push("Passwords must have at least one non alphanumeric character.".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push("Passwords must have at least one digit ('0'-'9').".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push("Passwords must have at least one lowercase ('a'-'z').".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push("Passwords must have at least one uppercase ('A'-'Z').".to_string());
    }
}

/// Validates and stores a new account. Policy violations come back in the
/// result, not as `Err`; `Err` is reserved for storage and hashing failures.
///
/// The password is checked first and its failures are reported alone; the
/// username is only looked at once the password passes.
pub async fn create_user(
    pool: &DbPool,
    registration: &Registration,
) -> Result<IdentityResult, AppError> {
    let mut errors = Vec::new();
    validate_password(&registration.password, &mut errors);
    if !errors.is_empty() {
        return Ok(IdentityResult { errors });
    }

    validate_username(&registration.username, &mut errors);
    if !errors.is_empty() {
        return Ok(IdentityResult { errors });
    }

    let password = registration.password.clone();
    let user = User {
        id: Uuid::new_v4().to_string(),
        username: registration.username.clone(),
        email: registration.email.clone(),
        password_hash: blocking(move || hash_password(&password)).await??,
    };

    if !db::insert_user(pool, &user)? {
        errors.push(format!("Username '{}' is already taken.", user.username));
    }
    Ok(IdentityResult { errors })
}
