//! Join-code generation and normalization.
//!
//! A join code doubles as the session's primary key and the human-shareable
//! handle, so it stays short, lowercase, and case-insensitive on input.

use rand::Rng;

/// Fixed length of a join code.
pub const JOIN_CODE_LENGTH: usize = 6;

/// Characters a join code may contain.
const CODE_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Generates a random join code.
///
/// Uniqueness is not guaranteed here; the caller retries against the store on
/// collision.
#[must_use]
pub fn generate_join_code() -> String {
    let mut rng = rand::rng();
    (0..JOIN_CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Normalizes user input to the canonical lowercase form.
#[must_use]
pub fn normalize_join_code(input: &str) -> String {
    input.trim().to_ascii_lowercase()
}

/// Returns true if `code` is structurally a valid join code.
#[must_use]
pub fn is_valid_join_code(code: &str) -> bool {
    code.len() == JOIN_CODE_LENGTH && code.bytes().all(|b| CODE_ALPHABET.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_have_fixed_length_and_charset() {
        for _ in 0..100 {
            let code = generate_join_code();
            assert_eq!(code.len(), JOIN_CODE_LENGTH);
            assert!(is_valid_join_code(&code), "bad code: {code}");
        }
    }

    #[test]
    fn normalization_is_case_insensitive_and_trims() {
        assert_eq!(normalize_join_code("K3X9ab"), "k3x9ab");
        assert_eq!(normalize_join_code("  k3x9ab \n"), "k3x9ab");
    }

    #[test]
    fn validity_rejects_wrong_length_and_charset() {
        assert!(is_valid_join_code("k3x9ab"));
        assert!(!is_valid_join_code("k3x9a"));
        assert!(!is_valid_join_code("k3x9abc"));
        assert!(!is_valid_join_code("K3X9AB"));
        assert!(!is_valid_join_code("k3x9a!"));
    }
}
