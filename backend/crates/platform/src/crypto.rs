//! Cryptographic Utilities

use base64::{Engine, engine::general_purpose};
use rand::{Rng, RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Default random token size in bytes (256 bits)
pub const DEFAULT_TOKEN_BYTES: usize = 32;

/// Default numeric code length
pub const DEFAULT_CODE_LENGTH: u32 = 6;

/// Longest numeric code that still fits in a `u64` range
pub const MAX_CODE_LENGTH: u32 = 18;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("Code length must be between 1 and {max} digits (got {actual})")]
    InvalidCodeLength { max: u32, actual: u32 },
}

/// Generate cryptographically secure random bytes
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// `length` random bytes, lowercase hex (`2 * length` characters)
pub fn generate_token(length: usize) -> String {
    hex::encode(random_bytes(length))
}

/// Numeric code drawn uniformly from `[10^(length-1), 10^length - 1]`
///
/// Used for short-lived human-entered codes (email/SMS verification).
/// Drawn from the OS CSPRNG.
pub fn generate_code(length: u32) -> Result<String, CryptoError> {
    if length == 0 || length > MAX_CODE_LENGTH {
        return Err(CryptoError::InvalidCodeLength {
            max: MAX_CODE_LENGTH,
            actual: length,
        });
    }

    let low = 10u64.pow(length - 1);
    let high = 10u64.pow(length) - 1;
    let code = OsRng.gen_range(low..=high);

    Ok(code.to_string())
}

/// Compute SHA-256 hash
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA-256 as lowercase hex (64 characters)
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Encode bytes as base64
pub fn to_base64(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

/// Decode base64 to bytes
pub fn from_base64(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    general_purpose::STANDARD.decode(s)
}

/// Constant-time comparison of two fixed-size digests
pub fn digest_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_values() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );

        let expected =
            hex::decode("2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824")
                .unwrap();
        assert_eq!(sha256(b"hello").to_vec(), expected);
    }

    #[test]
    fn test_random_bytes() {
        let bytes = random_bytes(32);
        assert_eq!(bytes.len(), 32);
        // Should not be all zeros (statistically)
        assert!(bytes.iter().any(|&b| b != 0));
        assert!(random_bytes(0).is_empty());
    }

    #[test]
    fn test_generate_token_length_and_alphabet() {
        for len in [1usize, 16, DEFAULT_TOKEN_BYTES, 64] {
            let token = generate_token(len);
            assert_eq!(token.len(), len * 2);
            assert!(
                token
                    .chars()
                    .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
            );
        }
    }

    #[test]
    fn test_generate_token_unique() {
        assert_ne!(
            generate_token(DEFAULT_TOKEN_BYTES),
            generate_token(DEFAULT_TOKEN_BYTES)
        );
    }

    #[test]
    fn test_generate_code_range() {
        for _ in 0..200 {
            let code = generate_code(DEFAULT_CODE_LENGTH).unwrap();
            assert_eq!(code.len(), 6);
            let n: u64 = code.parse().unwrap();
            assert!((100_000..=999_999).contains(&n));
        }

        let single: u64 = generate_code(1).unwrap().parse().unwrap();
        assert!((1..=9).contains(&single));

        assert_eq!(generate_code(MAX_CODE_LENGTH).unwrap().len(), 18);
    }

    #[test]
    fn test_generate_code_rejects_bad_length() {
        assert_eq!(
            generate_code(0),
            Err(CryptoError::InvalidCodeLength { max: 18, actual: 0 })
        );
        assert!(generate_code(19).is_err());
    }

    #[test]
    fn test_base64_roundtrip() {
        let data = b"pepper";
        assert_eq!(from_base64(&to_base64(data)).unwrap(), data);
    }

    #[test]
    fn test_digest_eq() {
        let a = sha256(b"a");
        let b = sha256(b"b");
        assert!(digest_eq(&a, &a));
        assert!(!digest_eq(&a, &b));
    }
}
