//! Validation helpers for configuration values.

use crate::error::ConfigError;

/// Validate and trim a root folder identifier.
///
/// The id is an opaque token defined by the external drive service; the only
/// local constraints are that it is non-empty after trimming and contains no
/// interior whitespace (a whitespace-bearing id is always a paste error).
///
/// # Errors
///
/// Returns `ConfigError::InvalidRootFolder` describing the violation.
pub fn validate_root_folder_id(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::InvalidRootFolder {
            value: raw.to_string(),
            reason: "empty",
        });
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(ConfigError::InvalidRootFolder {
            value: raw.to_string(),
            reason: "contains_whitespace",
        });
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_and_trims_opaque_ids() {
        assert_eq!(
            validate_root_folder_id(" 1LylXLQFmMQ0I6YrNZMdjfWts9BzsNb_r ").expect("valid"),
            "1LylXLQFmMQ0I6YrNZMdjfWts9BzsNb_r"
        );
    }

    #[test]
    fn rejects_empty_and_whitespace_only() {
        for raw in ["", "   ", "\t\n"] {
            let err = validate_root_folder_id(raw).expect_err("must fail");
            assert!(matches!(
                err,
                ConfigError::InvalidRootFolder { reason: "empty", .. }
            ));
        }
    }

    #[test]
    fn rejects_interior_whitespace() {
        let err = validate_root_folder_id("F123 extra").expect_err("must fail");
        assert!(matches!(
            err,
            ConfigError::InvalidRootFolder {
                reason: "contains_whitespace",
                ..
            }
        ));
    }
}
