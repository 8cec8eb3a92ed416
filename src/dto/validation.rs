//! Validation helpers for DTOs.

use validator::ValidationError;

/// Validates that player-provided text carries something other than
/// whitespace. Length is checked separately by the `length` rule.
pub fn validate_not_blank(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        let mut err = ValidationError::new("blank_text");
        err.message = Some("Text must not be empty or whitespace-only".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_not_blank_valid() {
        assert!(validate_not_blank("was it night?").is_ok());
        assert!(validate_not_blank("  padded  ").is_ok());
    }

    #[test]
    fn test_validate_not_blank_invalid() {
        assert!(validate_not_blank("").is_err());
        assert!(validate_not_blank("   ").is_err());
        assert!(validate_not_blank("\t\n").is_err());
    }
}
