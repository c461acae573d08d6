//! Input validation shared by the services.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{ApiError, bad_request};

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email pattern"));

pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 128;

/// Trim and lowercase an email, rejecting anything that does not look like one
pub fn normalize_email(raw: &str) -> Result<String, ApiError> {
    let email = raw.trim().to_lowercase();
    if email.len() > 254 || !EMAIL.is_match(&email) {
        return Err(bad_request("email must be a valid email address"));
    }
    Ok(email)
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    let length = password.chars().count();
    if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&length) {
        return Err(bad_request("password must be between 8 and 128 characters"));
    }
    Ok(())
}

/// Trimmed name with a character-count bound
pub fn validate_name(raw: &str, field: &str, max: usize) -> Result<String, ApiError> {
    let name = raw.trim();
    let length = name.chars().count();
    if length == 0 || length > max {
        return Err(bad_request(&format!(
            "{field} must be between 1 and {max} characters"
        )));
    }
    Ok(name.to_string())
}

/// ISO 4217 style code: exactly three uppercase ASCII letters
pub fn validate_currency(raw: &str) -> Result<String, ApiError> {
    if raw.len() == 3 && raw.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(raw.to_string())
    } else {
        Err(bad_request("currency must be three uppercase letters"))
    }
}

/// Lowercase slug of letters/digits joined by underscores
pub fn slugify(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_normalized() {
        assert_eq!(
            normalize_email("  Jane.Doe@Example.COM ").unwrap(),
            "jane.doe@example.com"
        );
        for bad in ["", "no-at-sign", "a@b", "a b@c.de", "@c.de"] {
            assert!(normalize_email(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn password_length_bounds() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("exactly8").is_ok());
        assert!(validate_password(&"p".repeat(128)).is_ok());
        assert!(validate_password(&"p".repeat(129)).is_err());
    }

    #[test]
    fn currency_codes() {
        assert!(validate_currency("EUR").is_ok());
        assert!(validate_currency("eur").is_err());
        assert!(validate_currency("EURO").is_err());
    }

    #[test]
    fn slugs() {
        assert_eq!(slugify("Profit Margin %"), "profit_margin");
        assert_eq!(slugify("  ROAS (net) v2 "), "roas_net_v2");
        assert_eq!(slugify("!!!"), "");
    }
}
