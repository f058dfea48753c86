//! Input validation. Every check here runs before the store is touched.

use parley_types::error::ServiceError;

/// Trimmed, non-empty text of at most `max` characters.
pub fn required_text(field: &str, value: &str, max: usize) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::ValidationFailed(format!(
            "{field} must not be empty"
        )));
    }
    bounded_text(field, trimmed, max)?;
    Ok(trimmed.to_string())
}

/// Text of at most `max` characters; empty is allowed.
pub fn bounded_text(field: &str, value: &str, max: usize) -> Result<(), ServiceError> {
    let len = value.chars().count();
    if len > max {
        return Err(ServiceError::ValidationFailed(format!(
            "{field} is {len} characters, limit is {max}"
        )));
    }
    Ok(())
}

/// A finite, non-negative monetary amount.
pub fn cost(field: &str, value: f64) -> Result<(), ServiceError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ServiceError::ValidationFailed(format!(
            "{field} must be a finite non-negative number, got {value}"
        )));
    }
    Ok(())
}

/// A finite value within `min..=max`.
pub fn in_range(field: &str, value: f64, min: f64, max: f64) -> Result<(), ServiceError> {
    if !value.is_finite() || value < min || value > max {
        return Err(ServiceError::ValidationFailed(format!(
            "{field} must be between {min} and {max}, got {value}"
        )));
    }
    Ok(())
}

/// Search keyword: trimmed and non-empty.
pub fn keyword(value: &str) -> Result<String, ServiceError> {
    required_text("keyword", value, 200)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text_trims() {
        assert_eq!(required_text("topic", "  ml  ", 10).unwrap(), "ml");
    }

    #[test]
    fn test_required_text_rejects_blank() {
        let err = required_text("topic", "   ", 10).unwrap_err();
        assert!(matches!(err, ServiceError::ValidationFailed(_)));
    }

    #[test]
    fn test_bounded_text_counts_chars_not_bytes() {
        assert!(bounded_text("title", "日本語", 3).is_ok());
        assert!(bounded_text("title", "日本語!", 3).is_err());
    }

    #[test]
    fn test_cost() {
        assert!(cost("cost", 0.0).is_ok());
        assert!(cost("cost", 0.02).is_ok());
        assert!(cost("cost", -0.01).is_err());
        assert!(cost("cost", f64::NAN).is_err());
        assert!(cost("cost", f64::INFINITY).is_err());
    }

    #[test]
    fn test_in_range() {
        assert!(in_range("rating", 10.0, 0.0, 10.0).is_ok());
        assert!(in_range("rating", 10.5, 0.0, 10.0).is_err());
    }
}
