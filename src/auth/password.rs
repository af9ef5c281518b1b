use std::sync::OnceLock;

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

/// Hash a plaintext password with Argon2id and a fresh random salt, producing
/// a PHC-format string suitable for storage.
pub fn hash(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Verify a plaintext password against a stored PHC string. An unparseable
/// stored hash verifies as false rather than erroring.
pub fn verify(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Burn one verification against a throwaway hash. Called on the
/// unknown-username path so it costs the same as a wrong password and login
/// timing does not reveal whether the account exists.
pub fn verify_sink(password: &str) {
    static SINK: OnceLock<String> = OnceLock::new();
    let reference = SINK.get_or_init(|| {
        hash("sink-password-never-matched").expect("argon2 default parameters are valid")
    });
    let _ = verify(password, reference);
}
