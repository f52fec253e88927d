// crates/taskgate-context/src/injection.rs
// ============================================================================
// Module: Named Constraint Injections
// Description: Resolves `architecture` / `style-guide` / `project-rules`
//              injection names to JSON or Markdown artifact text
//              (spec §4.6).
// Purpose: Build the constraints block of `systemPrompt` without a missing
//          or unrecognised injection ever failing the whole build.
// Dependencies: std, serde_json, taskgate-core
// ============================================================================

//! ## Overview
//! Known injection names resolve against `<injections_dir>/<name>.json` or
//! `<injections_dir>/<name>.md`, in that order. Unknown names are ignored
//! outright (spec §4.6: "Unknown injections are ignored"); known names whose
//! backing file is absent are skipped silently rather than erroring.

use std::fs;
use std::path::Path;

/// The injection names spec §4.6 recognises by name.
pub const KNOWN_INJECTIONS: [&str; 3] = ["architecture", "style-guide", "project-rules"];

/// Resolves `requested` injection names against `injections_dir`, returning
/// the text of each one found, in the order requested. Unknown names and
/// missing files are both silently dropped.
#[must_use]
pub fn resolve_injections(injections_dir: &Path, requested: &[String]) -> Vec<String> {
    requested.iter().filter(|name| KNOWN_INJECTIONS.contains(&name.as_str())).filter_map(|name| load_one(injections_dir, name)).collect()
}

/// Loads a single injection's backing artifact, trying `.json` then `.md`.
fn load_one(injections_dir: &Path, name: &str) -> Option<String> {
    let json_path = injections_dir.join(format!("{name}.json"));
    if json_path.is_file() {
        let raw = fs::read_to_string(&json_path).ok()?;
        let value: serde_json::Value = serde_json::from_str(&raw).ok()?;
        return Some(serde_json::to_string_pretty(&value).unwrap_or(raw));
    }
    let markdown_path = injections_dir.join(format!("{name}.md"));
    if markdown_path.is_file() {
        return fs::read_to_string(&markdown_path).ok();
    }
    None
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::resolve_injections;

    #[test]
    fn unknown_injection_names_are_ignored() {
        let dir = tempdir().expect("tempdir");
        let resolved = resolve_injections(dir.path(), &["not-a-real-injection".to_string()]);
        assert!(resolved.is_empty());
    }

    #[test]
    fn missing_backing_file_is_skipped_silently() {
        let dir = tempdir().expect("tempdir");
        let resolved = resolve_injections(dir.path(), &["architecture".to_string()]);
        assert!(resolved.is_empty());
    }

    #[test]
    fn markdown_injection_loads_verbatim() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("style-guide.md"), "Use four-space indents.").expect("write");
        let resolved = resolve_injections(dir.path(), &["style-guide".to_string()]);
        assert_eq!(resolved, vec!["Use four-space indents.".to_string()]);
    }

    #[test]
    fn json_injection_is_pretty_printed() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("project-rules.json"), r#"{"rule":"no force push"}"#).expect("write");
        let resolved = resolve_injections(dir.path(), &["project-rules".to_string()]);
        assert_eq!(resolved.len(), 1);
        assert!(resolved[0].contains("no force push"));
    }
}
