//! Centralized validation logic for caller-supplied identifiers.
//!
//! Workspace identifiers become directory names and process arguments, so they
//! are checked against an allow-list before anything touches the filesystem.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{CoreError, Result};

/// Longest identifier accepted as a workspace directory name.
pub const MAX_WORKSPACE_ID_LEN: usize = 64;

static WORKSPACE_ID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,63}$")
        .expect("Workspace id regex should compile - this is a static pattern")
});

/// Validate a workspace identifier.
///
/// Accepts 1 to 64 characters of `[A-Za-z0-9._-]` starting with an
/// alphanumeric character. Path separators, `..` sequences and control
/// characters are rejected, which rules out traversal outside the workspace
/// root and collisions with hidden or reserved entries.
pub fn validate_workspace_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(CoreError::Validation(
            "identifier must not be empty".to_string(),
        ));
    }

    if id.len() > MAX_WORKSPACE_ID_LEN {
        return Err(CoreError::Validation(format!(
            "identifier is {} characters long, maximum is {}",
            id.len(),
            MAX_WORKSPACE_ID_LEN
        )));
    }

    if id.contains("..") {
        return Err(CoreError::Validation(format!(
            "identifier '{}' contains a path traversal sequence",
            id
        )));
    }

    if !WORKSPACE_ID_REGEX.is_match(id) {
        return Err(CoreError::Validation(format!(
            "identifier '{}' may only contain letters, digits, '.', '_' and '-' and must start with a letter or digit",
            id.escape_default()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_workspace_ids() {
        assert!(validate_workspace_id("alice").is_ok());
        assert!(validate_workspace_id("bob-2").is_ok());
        assert!(validate_workspace_id("team.frontend_01").is_ok());
        assert!(validate_workspace_id("A").is_ok());
        assert!(validate_workspace_id(&"a".repeat(MAX_WORKSPACE_ID_LEN)).is_ok());
    }

    #[test]
    fn test_invalid_workspace_ids() {
        assert!(validate_workspace_id("").is_err());
        assert!(validate_workspace_id("..").is_err());
        assert!(validate_workspace_id("../etc").is_err());
        assert!(validate_workspace_id("a/b").is_err());
        assert!(validate_workspace_id("a\\b").is_err());
        assert!(validate_workspace_id(".git").is_err());
        assert!(validate_workspace_id("-rf").is_err());
        assert!(validate_workspace_id("al ice").is_err());
        assert!(validate_workspace_id("alice\0").is_err());
        assert!(validate_workspace_id("a..b").is_err());
        assert!(validate_workspace_id(&"a".repeat(MAX_WORKSPACE_ID_LEN + 1)).is_err());
    }

    #[test]
    fn test_error_message_names_the_problem() {
        let err = validate_workspace_id("").unwrap_err();
        assert_eq!(err.to_string(), "identifier must not be empty");

        let err = validate_workspace_id("../etc").unwrap_err();
        assert!(err.to_string().contains("path traversal"));
    }
}
