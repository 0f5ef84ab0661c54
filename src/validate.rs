//! Pre-flight form validation.
//!
//! Each form submits through an ordered list of predicate/message rules
//! evaluated top to bottom; the first violated rule wins and nothing is
//! sent to the API. Messages match what the UI shows the user.

use thiserror::Error;

use crate::models::RegisterRequest;

/// Minimum post description length, in characters.
const MIN_DESCRIPTION_CHARS: usize = 50;

/// Minimum password length for new accounts.
const MIN_PASSWORD_CHARS: usize = 6;

/// A form field failed a pre-flight rule; the message is user-facing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

/// `(violated, message)` pairs; the first violated entry produces the error.
type Rule = (bool, &'static str);

fn first_failure(rules: &[Rule]) -> Result<(), ValidationError> {
    for (violated, message) in rules {
        if *violated {
            return Err(ValidationError((*message).to_string()));
        }
    }
    Ok(())
}

/// Shape check equivalent to the UI's `^[^\s@]+@[^\s@]+\.[^\s@]+$`:
/// something before the `@`, a domain with a dot, no whitespace anywhere.
pub fn is_valid_email(email: &str) -> bool {
    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = match parts.next() {
        Some(domain) => domain,
        None => return false,
    };
    if local.is_empty() || local.contains(char::is_whitespace) {
        return false;
    }
    if domain.contains('@') || domain.contains(char::is_whitespace) {
        return false;
    }
    match domain.rfind('.') {
        Some(i) => i > 0 && i + 1 < domain.len(),
        None => false,
    }
}

pub fn validate_login(email: &str, password: &str) -> Result<(), ValidationError> {
    first_failure(&[
        (
            email.is_empty() && password.is_empty(),
            "Email and password are required",
        ),
        (email.is_empty(), "Email is required"),
        (password.is_empty(), "Password is required"),
        (!is_valid_email(email), "Email is invalid"),
    ])
}

pub fn validate_registration(request: &RegisterRequest) -> Result<(), ValidationError> {
    first_failure(&[
        (request.name.trim().is_empty(), "Name is required"),
        (request.email.is_empty(), "Email is required"),
        (!is_valid_email(&request.email), "Email is invalid"),
        (request.password.is_empty(), "Password is required"),
        (
            request.password.chars().count() < MIN_PASSWORD_CHARS,
            "Password must be at least 6 characters",
        ),
        (request.school.trim().is_empty(), "School is required"),
        (request.age == 0, "Age is required"),
    ])
}

pub fn validate_new_post(
    title: &str,
    description: &str,
    image: &str,
) -> Result<(), ValidationError> {
    first_failure(&[
        (
            image.is_empty() && title.is_empty() && description.is_empty(),
            "Post needs an image, a title and a description",
        ),
        (image.is_empty(), "Post cannot be added without an image"),
        (title.is_empty(), "Post cannot be added without a title"),
        (
            description.is_empty(),
            "Post cannot be added without a description",
        ),
        (
            description.chars().count() < MIN_DESCRIPTION_CHARS,
            "Description must be at least 50 characters",
        ),
    ])
}

pub fn validate_post_edit(title: &str, description: &str) -> Result<(), ValidationError> {
    first_failure(&[
        (
            title.is_empty() && description.is_empty(),
            "Post cannot be edited without a title and description",
        ),
        (title.is_empty(), "Post cannot be edited without a title"),
        (
            description.is_empty(),
            "Post cannot be edited without a description",
        ),
        (
            description.chars().count() < MIN_DESCRIPTION_CHARS,
            "Description must be at least 50 characters",
        ),
    ])
}

pub fn validate_comment(content: &str) -> Result<(), ValidationError> {
    first_failure(&[(content.trim().is_empty(), "Comment cannot be empty")])
}
