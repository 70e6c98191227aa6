//! Field validators for blog records.
//!
//! Each validator looks at a single proposed value and either hands it back
//! unchanged or rejects it with a [`ValidationError`]. They never touch other
//! fields or the database. Record constructors and setters call them before
//! any value is assigned.
//!
//! Lengths are counted in characters, not bytes.

use crate::error::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Substrings a post title must contain at least one of. Case-sensitive.
pub const CLICKBAIT_KEYWORDS: [&str; 4] = ["Won't Believe", "Secret", "Top", "Guess"];

/// The only accepted post categories.
pub const ALLOWED_CATEGORIES: [&str; 2] = ["Fiction", "Non-Fiction"];

pub const MIN_CONTENT_LENGTH: usize = 250;
pub const MAX_SUMMARY_LENGTH: usize = 250;

static PHONE_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{10}$").unwrap());

pub fn validate_name(name: &str) -> Result<&str, ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::new("name", "Author must have a name"));
    }
    Ok(name)
}

/// Accepts exactly ten decimal digit characters, from any script.
pub fn validate_phone_number(phone_number: &str) -> Result<&str, ValidationError> {
    if !PHONE_NUMBER_RE.is_match(phone_number) {
        return Err(ValidationError::new(
            "phone_number",
            "Invalid phone number format. It must be exactly ten digits.",
        ));
    }
    Ok(phone_number)
}

/// Requires a non-empty title containing one of [`CLICKBAIT_KEYWORDS`].
///
/// The message advertises a "Top [number]" form but any occurrence of
/// `Top` is enough.
pub fn validate_title(title: &str) -> Result<&str, ValidationError> {
    if title.is_empty() {
        return Err(ValidationError::new("title", "Post must have a title"));
    }
    if !CLICKBAIT_KEYWORDS.iter().any(|keyword| title.contains(keyword)) {
        return Err(ValidationError::new(
            "title",
            "Title must be sufficiently clickbait-y. It should contain one of: \
             'Won't Believe', 'Secret', 'Top [number]', 'Guess'",
        ));
    }
    Ok(title)
}

pub fn validate_content(content: &str) -> Result<&str, ValidationError> {
    if content.chars().count() < MIN_CONTENT_LENGTH {
        return Err(ValidationError::new(
            "content",
            format!("Post content must be at least {MIN_CONTENT_LENGTH} characters long"),
        ));
    }
    Ok(content)
}

pub fn validate_summary(summary: &str) -> Result<&str, ValidationError> {
    if summary.chars().count() > MAX_SUMMARY_LENGTH {
        return Err(ValidationError::new(
            "summary",
            format!("Post summary cannot exceed {MAX_SUMMARY_LENGTH} characters"),
        ));
    }
    Ok(summary)
}

pub fn validate_category(category: &str) -> Result<&str, ValidationError> {
    if !ALLOWED_CATEGORIES.contains(&category) {
        return Err(ValidationError::new(
            "category",
            format!(
                "Invalid category. Allowed categories are: {}",
                ALLOWED_CATEGORIES.join(", ")
            ),
        ));
    }
    Ok(category)
}
