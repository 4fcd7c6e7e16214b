use std::sync::Arc;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::{error, warn};

use crate::config::HasherKind;

/// Transformation applied to a password before it is written to the store,
/// and the matching check used when a caller has to prove they know it.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, plain: &str) -> anyhow::Result<String>;
    fn verify(&self, plain: &str, stored: &str) -> anyhow::Result<bool>;
}

/// Keeps the password as received. This is what the service has always
/// stored; switch to [`Argon2Hasher`] through `PASSWORD_HASHER=argon2`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainText;

impl CredentialHasher for PlainText {
    fn hash(&self, plain: &str) -> anyhow::Result<String> {
        Ok(plain.to_owned())
    }

    fn verify(&self, plain: &str, stored: &str) -> anyhow::Result<bool> {
        Ok(plain == stored)
    }
}

/// Salted Argon2id in PHC string form. A stored value that is not a PHC
/// string (left over from [`PlainText`]) never verifies.
#[derive(Debug, Default, Clone, Copy)]
pub struct Argon2Hasher;

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, plain: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(plain.as_bytes(), &salt)
            .map(|phc| phc.to_string())
            .map_err(|e| {
                error!(error = %e, "argon2 hashing failed");
                anyhow::anyhow!("hash password: {e}")
            })
    }

    fn verify(&self, plain: &str, stored: &str) -> anyhow::Result<bool> {
        let Ok(phc) = PasswordHash::new(stored) else {
            warn!("stored credential is not an argon2 hash; treating as mismatch");
            return Ok(false);
        };
        Ok(Argon2::default()
            .verify_password(plain.as_bytes(), &phc)
            .is_ok())
    }
}

pub fn hasher_for(kind: HasherKind) -> Arc<dyn CredentialHasher> {
    match kind {
        HasherKind::Plain => Arc::new(PlainText),
        HasherKind::Argon2 => Arc::new(Argon2Hasher),
    }
}
