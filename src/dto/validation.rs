//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest mod acronym accepted on the wire.
const MAX_ACRONYM_LEN: usize = 4;

/// Validates that a mod acronym is 1 to 4 ASCII alphanumeric characters.
///
/// # Examples
///
/// ```ignore
/// validate_mod_acronym("DT")  // Ok
/// validate_mod_acronym("")    // Err - empty
/// validate_mod_acronym("D T") // Err - space
/// ```
pub fn validate_mod_acronym(acronym: &str) -> Result<(), ValidationError> {
    if acronym.is_empty() || acronym.len() > MAX_ACRONYM_LEN {
        let mut err = ValidationError::new("mod_acronym_length");
        err.message = Some(
            format!(
                "Mod acronym must be 1 to {MAX_ACRONYM_LEN} characters (got {})",
                acronym.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !acronym.chars().all(|c| c.is_ascii_alphanumeric()) {
        let mut err = ValidationError::new("mod_acronym_format");
        err.message = Some("Mod acronym must contain only ASCII letters and digits".into());
        return Err(err);
    }

    Ok(())
}

/// Validates that a numeric payload field is neither NaN nor infinite.
pub fn validate_finite(value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        let mut err = ValidationError::new("not_finite");
        err.message = Some(format!("Value must be finite (got {value})").into());
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_mod_acronym_valid() {
        assert!(validate_mod_acronym("DT").is_ok());
        assert!(validate_mod_acronym("hr").is_ok());
        assert!(validate_mod_acronym("V2").is_ok());
    }

    #[test]
    fn test_validate_mod_acronym_invalid_length() {
        assert!(validate_mod_acronym("").is_err());
        assert!(validate_mod_acronym("ABCDE").is_err());
    }

    #[test]
    fn test_validate_mod_acronym_invalid_format() {
        assert!(validate_mod_acronym("D T").is_err());
        assert!(validate_mod_acronym("D-T").is_err());
        assert!(validate_mod_acronym("ÉZ").is_err());
    }

    #[test]
    fn test_validate_finite() {
        assert!(validate_finite(0.0).is_ok());
        assert!(validate_finite(-12.5).is_ok());
        assert!(validate_finite(f64::NAN).is_err());
        assert!(validate_finite(f64::INFINITY).is_err());
    }
}
