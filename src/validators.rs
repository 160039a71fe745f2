/// Input validators for signup and profile changes
/// - Length limits on every field
/// - Email format check
/// - Password strength rules
/// - Rejection of control characters in names

use lazy_static::lazy_static;
use regex::Regex;

use crate::auth::MAX_PASSWORD_BYTES;
use crate::domain::{NewUser, UserUpdate};
use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 255; // users.email is VARCHAR(255)
const MIN_EMAIL_LENGTH: usize = 5;
const MAX_NAME_LENGTH: usize = 255;
const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = MAX_PASSWORD_BYTES; // measured in bytes

lazy_static! {
    // RFC 5322 simplified
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).expect("email regex compiles");
}

/// Validates an email address and returns it trimmed.
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }
    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email".to_string(), MIN_EMAIL_LENGTH));
    }
    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email".to_string(), MAX_EMAIL_LENGTH));
    }
    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }
    if let Some(at_pos) = trimmed.find('@') {
        // local part is capped at 64 octets
        if at_pos > 64 {
            return Err(ValidationError::SuspiciousContent("email".to_string()));
        }
    }

    Ok(trimmed.to_string())
}

/// Validates an optional name field (first or last name); empty is allowed.
pub fn is_valid_name(field: &str, name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();

    if trimmed.len() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong(field.to_string(), MAX_NAME_LENGTH));
    }
    if trimmed.chars().any(|c| c.is_control()) {
        return Err(ValidationError::SuspiciousContent(field.to_string()));
    }

    Ok(trimmed.to_string())
}

/// Password strength requirements:
/// - 8 to 72 bytes
/// - at least one digit, one lowercase and one uppercase letter
pub fn is_valid_password(password: &str) -> Result<(), ValidationError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort("password".to_string(), MIN_PASSWORD_LENGTH));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong("password".to_string(), MAX_PASSWORD_LENGTH));
    }

    let has_digit = password.chars().any(|c| c.is_numeric());
    let has_lowercase = password.chars().any(|c| c.is_lowercase());
    let has_uppercase = password.chars().any(|c| c.is_uppercase());

    if !has_digit || !has_lowercase || !has_uppercase {
        return Err(ValidationError::InvalidFormat(
            "password must contain at least one digit, one lowercase letter, and one uppercase letter"
                .to_string(),
        ));
    }

    Ok(())
}

/// Validate and normalise a signup payload.
pub fn validate_new_user(user: NewUser) -> Result<NewUser, ValidationError> {
    is_valid_password(&user.password)?;

    Ok(NewUser {
        email: is_valid_email(&user.email)?,
        first_name: is_valid_name("first_name", &user.first_name)?,
        last_name: is_valid_name("last_name", &user.last_name)?,
        password: user.password,
    })
}

/// Validate and normalise a profile update.
pub fn validate_user_update(update: UserUpdate) -> Result<UserUpdate, ValidationError> {
    Ok(UserUpdate {
        email: is_valid_email(&update.email)?,
        first_name: is_valid_name("first_name", &update.first_name)?,
        last_name: is_valid_name("last_name", &update.last_name)?,
    })
}
