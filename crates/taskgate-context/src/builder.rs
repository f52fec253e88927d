// crates/taskgate-context/src/builder.rs
// ============================================================================
// Module: Context Builder
// Description: Assembles `{systemPrompt, messages, tools}` for an
//              (agent, run_id, step, injections[]) tuple (spec §4.6).
// Purpose: The single place every executor invocation gets its prompt,
//          message history, and tool allow-list from.
// Dependencies: std, taskgate-core, crate::{persona, injection, tools}
// ============================================================================

//! ## Overview
//! `systemPrompt` is assembled exactly as spec §4.6 specifies:
//! `persona + "## Constraints\n" + constraints + "## Task\n" + taskBlock`.
//! [`ContextBuilder`] only needs two directories (personas, injections) to
//! do this; message history is supplied by the caller (the Workflow Stepper
//! owns conversation continuity, this crate does not persist it).

use std::path::Path;
use std::path::PathBuf;

use taskgate_core::AgentId;
use taskgate_core::CoreError;
use taskgate_core::RunId;
use taskgate_core::StepIndex;

use crate::injection::resolve_injections;
use crate::persona::load_persona;
use crate::tools::allowed_tools_for;

/// One prior message in an agent's conversation history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Who produced this message (`"user"`, `"assistant"`, or an agent name).
    pub role: String,
    /// The message's text content.
    pub content: String,
}

/// The fully assembled context handed to an executor invocation (spec §4.6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltContext {
    /// `persona + constraints block + task block`.
    pub system_prompt: String,
    /// Prior conversation history, possibly empty.
    pub messages: Vec<Message>,
    /// The static per-agent tool allow-list.
    pub tools: Vec<String>,
}

/// Builds [`BuiltContext`] values from a fixed persona/injection directory
/// layout.
pub struct ContextBuilder {
    /// Directory holding one persona file per agent.
    personas_dir: PathBuf,
    /// Directory holding named injection artifacts.
    injections_dir: PathBuf,
}

impl ContextBuilder {
    /// Builds a context builder rooted at the given directories.
    #[must_use]
    pub fn new(personas_dir: PathBuf, injections_dir: PathBuf) -> Self {
        Self { personas_dir, injections_dir }
    }

    /// Assembles the full context for `(agent, run_id, step, injections)`
    /// (spec §4.6).
    ///
    /// `task_description` becomes the `## Task` block; `prior_messages` is
    /// carried through unchanged as `messages`.
    ///
    /// # Errors
    /// Returns [`CoreError::NotFound`] if `agent` has no persona file.
    pub fn build(&self, agent: &AgentId, run_id: &RunId, step: StepIndex, injections: &[String], task_description: &str, prior_messages: Vec<Message>) -> Result<BuiltContext, CoreError> {
        let persona = load_persona(&self.personas_dir, agent)?;
        let constraints = resolve_injections(&self.injections_dir, injections);

        let mut system_prompt = persona;
        system_prompt.push_str("\n## Constraints\n");
        if constraints.is_empty() {
            system_prompt.push_str("(none)\n");
        } else {
            for constraint in &constraints {
                system_prompt.push_str(constraint);
                system_prompt.push('\n');
            }
        }
        system_prompt.push_str("## Task\n");
        system_prompt.push_str(&format!("Run {run_id}, step {}: {task_description}\n", step.get()));

        Ok(BuiltContext { system_prompt, messages: prior_messages, tools: allowed_tools_for(agent) })
    }

    /// The persona directory this builder reads from.
    #[must_use]
    pub fn personas_dir(&self) -> &Path {
        &self.personas_dir
    }

    /// The injection directory this builder reads from.
    #[must_use]
    pub fn injections_dir(&self) -> &Path {
        &self.injections_dir
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use taskgate_core::AgentId;
    use taskgate_core::RunId;
    use taskgate_core::StepIndex;
    use tempfile::tempdir;

    use super::ContextBuilder;

    #[test]
    fn assembles_system_prompt_in_the_documented_order() {
        let dir = tempdir().expect("tempdir");
        let personas = dir.path().join("personas");
        let injections = dir.path().join("injections");
        fs::create_dir_all(&personas).expect("mkdir");
        fs::create_dir_all(&injections).expect("mkdir");
        fs::write(personas.join("developer.md"), "You are a developer.").expect("write");
        fs::write(injections.join("style-guide.md"), "Four-space indents.").expect("write");

        let builder = ContextBuilder::new(personas, injections);
        let run_id = RunId::parse("run-1").expect("valid run id");
        let built = builder.build(&AgentId::new("developer"), &run_id, StepIndex::new(0), &["style-guide".to_string()], "Implement the login form", vec![]).expect("builds");

        assert!(built.system_prompt.starts_with("You are a developer."));
        assert!(built.system_prompt.contains("## Constraints"));
        assert!(built.system_prompt.contains("Four-space indents."));
        assert!(built.system_prompt.contains("## Task"));
        assert!(built.system_prompt.contains("Implement the login form"));
        assert!(built.tools.contains(&"write_file".to_string()));
    }

    #[test]
    fn missing_persona_propagates_as_not_found() {
        let dir = tempdir().expect("tempdir");
        let builder = ContextBuilder::new(dir.path().join("personas"), dir.path().join("injections"));
        let run_id = RunId::parse("run-1").expect("valid run id");
        let err = builder.build(&AgentId::new("ghost"), &run_id, StepIndex::new(0), &[], "task", vec![]).expect_err("missing persona");
        assert!(matches!(err, taskgate_core::CoreError::NotFound(_)));
    }
}
