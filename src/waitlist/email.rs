//! Email normalization and validation

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Failed to compile email regex");
}

/// Trim and lowercase an address
pub fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Whether an already-normalized address looks deliverable
pub fn is_valid(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Investor@Example.COM \n"), "investor@example.com");
    }

    #[test]
    fn test_valid_addresses() {
        assert!(is_valid("a@b.co"));
        assert!(is_valid("first.last+tag@mail.example.com"));
    }

    #[test]
    fn test_invalid_addresses() {
        assert!(!is_valid(""));
        assert!(!is_valid("no-at-sign.com"));
        assert!(!is_valid("user@nodot"));
        assert!(!is_valid("two@@example.com"));
        assert!(!is_valid("spa ce@example.com"));
        assert!(!is_valid("@example.com"));
    }
}
