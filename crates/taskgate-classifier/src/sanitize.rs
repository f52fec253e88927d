// crates/taskgate-classifier/src/sanitize.rs
// ============================================================================
// Module: Classifier Input Sanitisation
// Description: Control-character stripping and file-pattern safety checks
//              (spec §4.4 step 1).
// Purpose: Reject unsafe or malformed classifier input before any scoring
//          runs, matching the teacher's fail-closed validation discipline.
// Dependencies: taskgate-core
// ============================================================================

//! ## Overview
//! Description text is stripped of control characters (everything outside
//! printable ASCII/UTF-8 text) rather than rejected outright, since free-form
//! task descriptions routinely carry pasted whitespace. File patterns are
//! rejected outright on any unsafe construct: absolute paths, `..` segments,
//! shell metacharacters, or embedded null bytes.

use taskgate_core::CoreError;

/// Maximum accepted task description length, in bytes (spec §4.4).
pub const MAX_DESCRIPTION_LEN: usize = 10_000;
/// Maximum accepted number of file patterns (spec §4.4).
pub const MAX_FILE_PATTERNS: usize = 50;
/// Maximum accepted length of a single file pattern, in bytes (spec §4.4).
pub const MAX_FILE_PATTERN_LEN: usize = 500;

/// Shell metacharacters a file pattern may never contain.
const SHELL_METACHARACTERS: &[char] = &[';', '|', '&', '$', '`', '>', '<', '\n', '\r'];

/// Strips control characters from `description` and enforces its length
/// bound.
///
/// # Errors
/// Returns [`CoreError::InvalidArgument`] if `description` exceeds
/// [`MAX_DESCRIPTION_LEN`] bytes.
pub fn sanitize_description(description: &str) -> Result<String, CoreError> {
    if description.len() > MAX_DESCRIPTION_LEN {
        return Err(CoreError::InvalidArgument(format!("description exceeds {MAX_DESCRIPTION_LEN} bytes")));
    }
    Ok(description.chars().filter(|ch| !ch.is_control() || *ch == ' ').collect())
}

/// Validates and returns `patterns` unchanged, rejecting any pattern that is
/// absolute, escapes its root via `..`, carries a shell metacharacter, or
/// embeds a null byte.
///
/// # Errors
/// Returns [`CoreError::InvalidArgument`] on the first unsafe or
/// out-of-bounds pattern.
pub fn sanitize_file_patterns(patterns: &[String]) -> Result<Vec<String>, CoreError> {
    if patterns.len() > MAX_FILE_PATTERNS {
        return Err(CoreError::InvalidArgument(format!("more than {MAX_FILE_PATTERNS} file patterns")));
    }
    for pattern in patterns {
        if pattern.len() > MAX_FILE_PATTERN_LEN {
            return Err(CoreError::InvalidArgument(format!("file pattern exceeds {MAX_FILE_PATTERN_LEN} bytes: {pattern}")));
        }
        if pattern.contains('\0') {
            return Err(CoreError::InvalidArgument(format!("file pattern contains a null byte: {pattern}")));
        }
        if pattern.starts_with('/') || pattern.starts_with('\\') {
            return Err(CoreError::InvalidArgument(format!("file pattern must be relative: {pattern}")));
        }
        if pattern.split(['/', '\\']).any(|segment| segment == "..") {
            return Err(CoreError::InvalidArgument(format!("file pattern escapes its root: {pattern}")));
        }
        if pattern.contains(SHELL_METACHARACTERS) {
            return Err(CoreError::InvalidArgument(format!("file pattern contains a shell metacharacter: {pattern}")));
        }
    }
    Ok(patterns.to_vec())
}

#[cfg(test)]
mod tests {
    use super::sanitize_description;
    use super::sanitize_file_patterns;

    #[test]
    fn strips_control_characters_but_keeps_spaces() {
        let cleaned = sanitize_description("fix\u{7}bug\tnow").expect("sanitises");
        assert_eq!(cleaned, "fixbugnow");
    }

    #[test]
    fn rejects_absolute_paths() {
        assert!(sanitize_file_patterns(&["/etc/passwd".to_string()]).is_err());
    }

    #[test]
    fn rejects_parent_traversal() {
        assert!(sanitize_file_patterns(&["src/../../etc/passwd".to_string()]).is_err());
    }

    #[test]
    fn rejects_shell_metacharacters() {
        assert!(sanitize_file_patterns(&["src/*.rs; rm -rf /".to_string()]).is_err());
    }

    #[test]
    fn accepts_ordinary_relative_globs() {
        let patterns = vec!["src/**/*.rs".to_string(), "tests/*.rs".to_string()];
        assert_eq!(sanitize_file_patterns(&patterns).expect("accepts"), patterns);
    }
}
