//! Server-side re-enforcement of input shape rules. The presentation layer
//! is expected to run the same checks; these exist so the core never trusts
//! it to have done so.

use std::sync::LazyLock;

use regex::Regex;

use super::ApiError;

/// Characters never allowed in name fields.
const EXCLUDED_NAME_CHARS: &str = "*?!'^+%&/()=}][{$#@<>";

const MIN_DRAW_NUMBER: i64 = 1;
const MAX_DRAW_NUMBER: i64 = 60;

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{4}-[0-9]{3}-[0-9]{4}$").expect("phone regex is valid")
});

pub fn validate_email(email: &str) -> Result<&str, ApiError> {
    let trimmed = email.trim();

    let valid = trimmed.len() <= 100
        && !trimmed.contains(char::is_whitespace)
        && matches!(
            trimmed.split_once('@'),
            Some((local, domain)) if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        );

    if valid {
        Ok(trimmed)
    } else {
        Err(ApiError::validation("A valid email address is required"))
    }
}

pub fn validate_name(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::validation(format!("{field} is required")));
    }

    if let Some(bad) = value.chars().find(|c| EXCLUDED_NAME_CHARS.contains(*c)) {
        return Err(ApiError::validation(format!(
            "Character {bad} is not allowed in {field}"
        )));
    }

    Ok(())
}

pub fn validate_phone(phone: &str) -> Result<(), ApiError> {
    if PHONE_RE.is_match(phone) {
        Ok(())
    } else {
        Err(ApiError::validation(
            "Phone must be in format XXXX-XXX-XXXX where X is a digit",
        ))
    }
}

/// Length 6-12 with at least one digit, one lowercase, one uppercase and one
/// special character.
pub fn validate_password(password: &str) -> Result<(), ApiError> {
    let length_ok = (6..=12).contains(&password.chars().count());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_special = password.chars().any(|c| !c.is_alphanumeric());

    if length_ok && has_digit && has_lower && has_upper && has_special {
        Ok(())
    } else {
        Err(ApiError::validation(
            "Password must be 6-12 characters and contain a digit, a lowercase character, \
             an uppercase character and a special character",
        ))
    }
}

/// Exactly six numbers, each within the selectable range.
pub fn validate_draw_numbers(numbers: &[i64]) -> Result<[u32; 6], ApiError> {
    if numbers.len() != 6 {
        return Err(ApiError::validation("Exactly six numbers are required"));
    }

    let mut out = [0u32; 6];
    for (slot, &n) in out.iter_mut().zip(numbers) {
        if !(MIN_DRAW_NUMBER..=MAX_DRAW_NUMBER).contains(&n) {
            return Err(ApiError::validation(format!(
                "Draw numbers must be between {MIN_DRAW_NUMBER} and {MAX_DRAW_NUMBER}"
            )));
        }
        *slot = u32::try_from(n).map_err(|_| {
            ApiError::validation(format!(
                "Draw numbers must be between {MIN_DRAW_NUMBER} and {MAX_DRAW_NUMBER}"
            ))
        })?;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("  alice@example.com  ").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("two words@example.com").is_err());
        assert!(validate_email("alice@nodot").is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("firstname", "Alice").is_ok());
        assert!(validate_name("firstname", "").is_err());
        assert!(validate_name("firstname", "Al*ce").is_err());
        assert!(validate_name("lastname", "O<Neil").is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("0191-123-4567").is_ok());
        assert!(validate_phone("0191 123 4567").is_err());
        assert!(validate_phone("191-123-4567").is_err());
        assert!(validate_phone("0191-123-45678").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("Passw0rd!").is_ok());
        assert!(validate_password("Ab1!ab").is_ok());
        // too short / too long
        assert!(validate_password("Ab1!a").is_err());
        assert!(validate_password("Abcdefgh1234!").is_err());
        // missing a required class
        assert!(validate_password("password1!").is_err());
        assert!(validate_password("PASSWORD1!").is_err());
        assert!(validate_password("Password!").is_err());
        assert!(validate_password("Password1").is_err());
    }

    #[test]
    fn test_validate_draw_numbers() {
        assert_eq!(
            validate_draw_numbers(&[1, 2, 3, 4, 5, 6]).unwrap(),
            [1, 2, 3, 4, 5, 6]
        );
        assert!(validate_draw_numbers(&[1, 2, 3, 4, 5]).is_err());
        assert!(validate_draw_numbers(&[1, 2, 3, 4, 5, 6, 7]).is_err());
        assert!(validate_draw_numbers(&[0, 2, 3, 4, 5, 6]).is_err());
        assert!(validate_draw_numbers(&[1, 2, 3, 4, 5, 61]).is_err());
        assert!(validate_draw_numbers(&[-1, 2, 3, 4, 5, 6]).is_err());
    }
}
