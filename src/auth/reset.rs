//! Opaque password-reset tokens: 256 bits from the OS RNG, base64url
//! without padding so the token drops into a link unescaped.

use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{RngCore, rngs::OsRng};

const TOKEN_BYTES: usize = 32;

/// Generate a fresh reset token.
///
/// # Errors
/// Returns an error if the OS RNG is unavailable.
pub fn generate() -> Result<String> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate reset token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_url_safe_and_fixed_length() {
        let token = generate().unwrap();
        // 32 bytes -> 43 base64url chars, no padding
        assert_eq!(token.len(), 43);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn tokens_do_not_repeat() {
        let a = generate().unwrap();
        let b = generate().unwrap();
        assert_ne!(a, b);
    }
}
