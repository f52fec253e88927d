// crates/taskgate-context/src/persona.rs
// ============================================================================
// Module: Persona Loading
// Description: Reads an agent's persona text from a per-agent file
//              (spec §4.6).
// Purpose: Supply the first segment of `systemPrompt`; a missing persona is
//          the one hard error in context assembly, everything else degrades
//          gracefully.
// Dependencies: std, taskgate-core
// ============================================================================

//! ## Overview
//! Personas live as `<personas_dir>/<agent>.md` (or `.txt`); the first file
//! found wins. Unlike named injections, a missing persona is always a hard
//! [`CoreError::NotFound`] — spec §4.6 is explicit that "a missing persona is
//! a hard error".

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use taskgate_core::AgentId;
use taskgate_core::CoreError;

/// Extensions tried, in order, when resolving a persona file.
const PERSONA_EXTENSIONS: [&str; 2] = ["md", "txt"];

/// Loads the persona text for `agent` from `personas_dir`.
///
/// # Errors
/// Returns [`CoreError::NotFound`] if no persona file exists under any of
/// [`PERSONA_EXTENSIONS`], or [`CoreError::Corrupt`] if a matching file
/// exists but cannot be read.
pub fn load_persona(personas_dir: &Path, agent: &AgentId) -> Result<String, CoreError> {
    for extension in PERSONA_EXTENSIONS {
        let candidate = personas_dir.join(format!("{}.{extension}", agent.as_str()));
        if candidate.is_file() {
            return fs::read_to_string(&candidate).map_err(|err| CoreError::Corrupt(format!("failed reading persona {}: {err}", candidate.display())));
        }
    }
    Err(CoreError::NotFound(format!("no persona file for agent {agent} under {}", personas_dir.display())))
}

/// The set of candidate paths [`load_persona`] would check, for callers that
/// want to report them in an error message without re-implementing the
/// extension search.
#[must_use]
pub fn candidate_paths(personas_dir: &Path, agent: &AgentId) -> Vec<PathBuf> {
    PERSONA_EXTENSIONS.iter().map(|extension| personas_dir.join(format!("{}.{extension}", agent.as_str()))).collect()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use taskgate_core::AgentId;
    use tempfile::tempdir;

    use super::load_persona;

    #[test]
    fn loads_an_existing_markdown_persona() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("developer.md"), "You are a careful developer.").expect("write");
        let persona = load_persona(dir.path(), &AgentId::new("developer")).expect("loads");
        assert_eq!(persona, "You are a careful developer.");
    }

    #[test]
    fn missing_persona_is_a_hard_error() {
        let dir = tempdir().expect("tempdir");
        let err = load_persona(dir.path(), &AgentId::new("ghost")).expect_err("missing");
        assert!(matches!(err, taskgate_core::CoreError::NotFound(_)));
    }
}
