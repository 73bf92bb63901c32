//! Password hashing with Argon2id. Every call salts from the OS RNG, so two
//! hashes of the same plaintext differ; verification parses the parameters
//! back out of the digest.

use anyhow::{Result, anyhow};
use argon2::password_hash::{PasswordHash, SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};

/// Hash a plaintext password.
///
/// # Errors
/// Returns an error if the hasher rejects its input, which does not happen
/// for any plaintext of reasonable length.
pub fn hash(plaintext: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|digest| digest.to_string())
        .map_err(|err| anyhow!("failed to hash password: {err}"))
}

/// Check `plaintext` against a stored digest. Malformed digests verify as
/// `false` rather than erroring.
#[must_use]
pub fn verify(plaintext: &str, digest: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(digest) else {
        return false;
    };
    Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trips() {
        let digest = hash("correct horse battery staple").unwrap();
        assert!(verify("correct horse battery staple", &digest));
        assert!(!verify("wrong horse", &digest));
    }

    #[test]
    fn same_plaintext_hashes_differently() {
        let first = hash("pw").unwrap();
        let second = hash("pw").unwrap();
        assert_ne!(first, second);
        assert!(verify("pw", &first));
        assert!(verify("pw", &second));
    }

    #[test]
    fn malformed_digest_verifies_false() {
        assert!(!verify("pw", "not-a-digest"));
        assert!(!verify("pw", ""));
    }
}
