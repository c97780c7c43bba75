//! # Passcode hashing and validation
//!
//! Notes can be gated behind a fixed-length numeric passcode. Only a
//! one-way argon2 hash (PHC string) is ever stored; the raw code exists
//! transiently in the caller's memory.
//!
//! Verification is a plain boolean: a missing passcode and a wrong code
//! both come back `false`, so the result leaks nothing beyond what the
//! caller already shows.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::error::{EngineError, Result, ValidationError};

/// Check that a candidate code has the configured length and is all digits.
pub fn validate_code(code: &str, expected_len: usize) -> std::result::Result<(), ValidationError> {
    if !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::PasscodeNotNumeric);
    }
    if code.chars().count() != expected_len {
        return Err(ValidationError::PasscodeLength {
            expected: expected_len,
        });
    }
    Ok(())
}

/// Hash a passcode into a self-describing PHC string (salt included).
pub fn hash_passcode(code: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(code.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| EngineError::Internal(format!("passcode hashing failed: {}", e)))
}

/// Compare a candidate code against a stored PHC hash.
///
/// An unparseable hash counts as a failed verification rather than an
/// error; a corrupt record must not unlock anything.
pub fn verify_passcode(code: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(code.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_exact_length_digits() {
        assert!(validate_code("1234", 4).is_ok());
        assert!(validate_code("000000", 6).is_ok());
    }

    #[test]
    fn validate_rejects_wrong_length() {
        assert_eq!(
            validate_code("12", 4),
            Err(ValidationError::PasscodeLength { expected: 4 })
        );
        assert_eq!(
            validate_code("12345", 4),
            Err(ValidationError::PasscodeLength { expected: 4 })
        );
    }

    #[test]
    fn validate_rejects_non_digits() {
        assert_eq!(
            validate_code("12a4", 4),
            Err(ValidationError::PasscodeNotNumeric)
        );
        assert_eq!(
            validate_code("12 4", 4),
            Err(ValidationError::PasscodeNotNumeric)
        );
    }

    #[test]
    fn hash_and_verify_round_trip() {
        let hash = hash_passcode("1234").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_passcode("1234", &hash));
        assert!(!verify_passcode("0000", &hash));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_passcode("1234").unwrap();
        let b = hash_passcode("1234").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!verify_passcode("1234", "not-a-phc-string"));
        assert!(!verify_passcode("1234", ""));
    }
}
