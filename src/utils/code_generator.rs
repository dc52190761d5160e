//! Short code generation.
//!
//! Codes are drawn uniformly from `[A-Za-z0-9]`. Uniqueness is enforced by
//! the store, which retries with a fresh candidate on collision.

use rand::Rng;
use rand::distr::Alphanumeric;

/// Length of generated short codes unless configured otherwise.
pub const DEFAULT_CODE_LENGTH: usize = 4;

/// Reserved codes that cannot be used as short links.
///
/// These collide with the service's own routes.
pub const RESERVED_CODES: &[&str] = &["shorten", "count", "valid", "health"];

/// Generates a random alphanumeric short code of `length` characters.
///
/// # Examples
///
/// ```ignore
/// let code = generate_code(4);
/// assert_eq!(code.len(), 4);
/// assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
/// ```
pub fn generate_code(length: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Returns true if `code` is reserved for a system route.
pub fn is_reserved_code(code: &str) -> bool {
    RESERVED_CODES.contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_code_has_requested_length() {
        assert_eq!(generate_code(DEFAULT_CODE_LENGTH).len(), 4);
        assert_eq!(generate_code(12).len(), 12);
    }

    #[test]
    fn test_generate_code_alphanumeric_only() {
        let code = generate_code(64);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generate_code_varies() {
        let codes: HashSet<_> = (0..100).map(|_| generate_code(8)).collect();
        assert!(codes.len() > 95);
    }

    #[test]
    fn test_reserved_codes() {
        for &reserved in RESERVED_CODES {
            assert!(is_reserved_code(reserved), "'{reserved}' should be reserved");
        }
        assert!(!is_reserved_code("ab3x"));
    }
}
