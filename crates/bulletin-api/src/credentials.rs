use std::sync::OnceLock;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand_core::OsRng;
use tracing::warn;

use bulletin_db::{Database, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("username already registered")]
    DuplicateUser,

    #[error("password hashing failed: {0}")]
    Hash(argon2::password_hash::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Hash `password` with Argon2id under a fresh salt and store the user.
pub fn create_user(db: &Database, username: &str, password: &str) -> Result<(), CredentialError> {
    let password_hash = hash_password(password)?;

    match db.create_user(username, &password_hash) {
        Ok(()) => Ok(()),
        Err(StoreError::Duplicate) => Err(CredentialError::DuplicateUser),
        Err(e) => Err(e.into()),
    }
}

/// Returns the username only if the user exists and the password matches.
/// Unknown users still pay for one verification so timing does not reveal
/// which usernames are registered.
pub fn verify_user(db: &Database, username: &str, password: &str) -> Result<Option<String>, StoreError> {
    let Some(user) = db.get_user_by_username(username)? else {
        if let Some(dummy) = dummy_hash() {
            if let Ok(parsed) = PasswordHash::new(dummy) {
                let _ = Argon2::default().verify_password(password.as_bytes(), &parsed);
            }
        }
        return Ok(None);
    };

    let parsed_hash = match PasswordHash::new(&user.password) {
        Ok(hash) => hash,
        Err(e) => {
            warn!("Unreadable password hash stored for {}: {}", user.username, e);
            return Ok(None);
        }
    };

    let matches = Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok();

    Ok(matches.then_some(user.username))
}

fn hash_password(password: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(CredentialError::Hash)?
        .to_string();
    Ok(hash)
}

fn dummy_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| hash_password("bulletin-timing-equalizer").ok())
        .as_deref()
}
