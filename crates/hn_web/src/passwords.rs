use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use hn_core::{Error, Result};

/// Argon2id password hashing in PHC string format.
#[derive(Clone, Default)]
pub struct Passwords {
    argon2: Argon2<'static>,
}

impl Passwords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Custom cost parameters; memory cost is in KiB.
    pub fn with_cost(memory_kib: u32, iterations: u32) -> Result<Self> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|e| Error::InvalidArgument(format!("Invalid hashing parameters: {}", e)))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| Error::External(anyhow::anyhow!("Failed to hash password: {}", e)))
    }

    /// False for a wrong password and for a hash that does not parse.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        PasswordHash::new(hash)
            .map(|parsed| {
                self.argon2
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }
}
