//! Environment variable expansion for configuration strings.

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in `value`.
///
/// `field` names the configuration key and is only used for error messages.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    shellexpand::env(value)
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} not set", e.var_name),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_literal_unchanged() {
        assert_eq!(expand_env("example.com", "f").unwrap(), "example.com");
    }

    #[test]
    fn test_expand_default_used_when_unset() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("CMS_EXPAND_UNSET_TEST");
        }
        assert_eq!(
            expand_env("${CMS_EXPAND_UNSET_TEST:-fallback.org}", "f").unwrap(),
            "fallback.org"
        );
    }

    #[test]
    fn test_expand_missing_var_names_field() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("CMS_EXPAND_MISSING_TEST");
        }
        let err = expand_env("${CMS_EXPAND_MISSING_TEST}", "sites.domain").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("sites.domain"));
        assert!(msg.contains("CMS_EXPAND_MISSING_TEST"));
    }
}
