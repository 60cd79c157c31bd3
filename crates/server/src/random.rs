//! Random identifiers for sessions, codes, users and refresh tokens.

use crate::error::StoreError;

/// Bytes behind session ids, authorization codes and refresh token ids (256 bits).
pub const SECRET_ID_BYTES: usize = 32;
/// Bytes behind user ids (128 bits).
pub const USER_ID_BYTES: usize = 16;

/// Generate `len` bytes from the OS random source, hex encoded.
pub fn random_hex(len: usize) -> Result<String, StoreError> {
    let mut bytes = vec![0u8; len];
    getrandom::fill(&mut bytes).map_err(|e| StoreError::Random(e.to_string()))?;
    Ok(hex::encode(bytes))
}

/// True when `id` is hex that decodes to exactly `len` bytes.
pub fn is_hex_id(id: &str, len: usize) -> bool {
    id.len() == len * 2 && hex::decode(id).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_hex_has_expected_length_and_is_unique() {
        let a = random_hex(SECRET_ID_BYTES).unwrap();
        let b = random_hex(SECRET_ID_BYTES).unwrap();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
        assert!(is_hex_id(&a, SECRET_ID_BYTES));
        assert_eq!(random_hex(USER_ID_BYTES).unwrap().len(), 32);
    }

    #[test]
    fn is_hex_id_rejects_wrong_shapes() {
        assert!(!is_hex_id("", SECRET_ID_BYTES));
        assert!(!is_hex_id(&"a".repeat(63), SECRET_ID_BYTES));
        assert!(!is_hex_id(&"z".repeat(64), SECRET_ID_BYTES));
        assert!(!is_hex_id(&"ab".repeat(33), SECRET_ID_BYTES));
        assert!(is_hex_id(&"AB".repeat(32), SECRET_ID_BYTES));
    }
}
