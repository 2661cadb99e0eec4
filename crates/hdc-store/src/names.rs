//! Node name validation.
//!
//! Valid node names:
//! - Must be non-empty
//! - Must not contain `/` (names are one level of the hierarchy)
//! - Must not contain NUL
//!
//! File-backed stores add their own restrictions on top, see
//! [`validate_file_name`].

use crate::error::{StoreError, StoreResult};

/// Characters that are forbidden anywhere in a node name.
const FORBIDDEN_CHARS: &[char] = &['/', '\0'];

/// Validate a node name, returning `Ok(())` if valid.
///
/// # Examples
///
/// ```
/// use hdc_store::names::validate_node_name;
///
/// assert!(validate_node_name("data").is_ok());
/// assert!(validate_node_name("__index_0").is_ok());
/// assert!(validate_node_name("").is_err());
/// assert!(validate_node_name("a/b").is_err());
/// ```
pub fn validate_node_name(name: &str) -> StoreResult<()> {
    if name.is_empty() {
        return Err(StoreError::InvalidName {
            name: name.to_string(),
            reason: "node name must not be empty".into(),
        });
    }

    for ch in FORBIDDEN_CHARS {
        if name.contains(*ch) {
            return Err(StoreError::InvalidName {
                name: name.to_string(),
                reason: format!("contains forbidden character: {ch:?}"),
            });
        }
    }

    Ok(())
}

/// Validate a node name for use as a file or directory name.
///
/// In addition to [`validate_node_name`], names must not start with `.`
/// (reserved for `.`/`..` and in-flight temporary files).
pub fn validate_file_name(name: &str) -> StoreResult<()> {
    validate_node_name(name)?;
    if name.starts_with('.') {
        return Err(StoreError::InvalidName {
            name: name.to_string(),
            reason: "must not start with '.'".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        assert!(validate_node_name("NAME").is_ok());
        assert!(validate_node_name("foo__index_3").is_ok());
        assert!(validate_node_name("with space").is_ok());
        assert!(validate_node_name(".hidden").is_ok());
    }

    #[test]
    fn reject_empty_name() {
        assert!(validate_node_name("").is_err());
    }

    #[test]
    fn reject_slash() {
        assert!(validate_node_name("a/b").is_err());
        assert!(validate_node_name("/").is_err());
    }

    #[test]
    fn reject_nul() {
        assert!(validate_node_name("a\0b").is_err());
    }

    #[test]
    fn file_names_reject_leading_dot() {
        assert!(validate_file_name(".").is_err());
        assert!(validate_file_name("..").is_err());
        assert!(validate_file_name(".tmp123").is_err());
        assert!(validate_file_name("ok.txt").is_ok());
    }
}
