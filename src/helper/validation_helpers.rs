use regex::Regex;

/// Logged hours must fall in (0, 24] — a single day's worth at most.
pub fn validate_hours(hours: f64) -> Result<(), String> {
    if hours.is_finite() && hours > 0.0 && hours <= 24.0 {
        Ok(())
    } else {
        Err("Hours must be greater than 0 and at most 24.".to_string())
    }
}

/// Application phone numbers are Sri Lankan short-format numbers:
/// `+94` followed by exactly seven digits.
pub fn is_valid_phone(phone: &str) -> bool {
    Regex::new(r"^\+94\d{7}$").unwrap().is_match(phone)
}

/// Loose shape check for intake emails; real verification is out of
/// scope.
pub fn is_plausible_email(email: &str) -> bool {
    let trimmed = email.trim();
    trimmed.len() >= 3 && trimmed.contains('@') && !trimmed.starts_with('@') && !trimmed.ends_with('@')
}

/// Derives a URL slug from a post title: lowercase, alphanumerics kept,
/// every other run of characters collapsed to a single hyphen.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_was_hyphen = true; // suppress a leading hyphen
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Trims a required field, rejecting empty values with the field name.
pub fn require_trimmed(value: &str, field: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(format!("'{}' is required.", field))
    } else {
        Ok(trimmed.to_string())
    }
}
