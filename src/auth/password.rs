use std::sync::LazyLock;

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hash failed: {e}"))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed =
        PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("invalid password hash: {e}"))?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

static DUMMY_HASH: LazyLock<String> = LazyLock::new(|| {
    // A fixed salt keeps this infallible; the hash is never compared for equality.
    let salt = SaltString::from_b64("ZHVtbXlzYWx0ZHVtbXk").unwrap_or_else(|_| {
        SaltString::generate(&mut argon2::password_hash::rand_core::OsRng)
    });
    Argon2::default()
        .hash_password(b"dummy-password-for-timing", &salt)
        .map(|h| h.to_string())
        .unwrap_or_default()
});

/// Hash verified against when the account does not exist, so unknown emails
/// cost the same argon2 work as wrong passwords.
pub fn dummy_hash() -> &'static str {
    &DUMMY_HASH
}
