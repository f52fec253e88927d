// crates/taskgate-context/src/tools.rs
// ============================================================================
// Module: Per-Agent Tool Allow-List
// Description: Static `agent -> allowed tool names` table (spec §4.6
//              "tools = allowedToolsFor(agent)").
// Purpose: Keep the executor's available capability surface scoped per
//          agent role instead of granting every agent every tool.
// Dependencies: taskgate-core
// ============================================================================

//! ## Overview
//! A small, fixed table mirroring the data-driven style of
//! `taskgate-config`'s classifier/router tables. Unknown agents fall back to
//! a conservative read-only default rather than an error, since tool scoping
//! is advisory to the executor adapter, not a hard gate.

use taskgate_core::AgentId;

/// The conservative default allow-list for an agent with no dedicated entry.
const DEFAULT_TOOLS: &[&str] = &["read_file", "list_files"];

/// Returns the static tool allow-list for `agent`.
#[must_use]
pub fn allowed_tools_for(agent: &AgentId) -> Vec<String> {
    let tools: &[&str] = match agent.as_str() {
        "developer" | "backend-developer" | "frontend-developer" => &["read_file", "write_file", "list_files", "run_tests", "run_lints"],
        "architect" => &["read_file", "list_files", "write_file"],
        "security-architect" | "security-reviewer" => &["read_file", "list_files", "run_security_scan"],
        "database-engineer" => &["read_file", "write_file", "list_files", "run_migration_dry_run"],
        "technical-writer" => &["read_file", "write_file", "list_files"],
        "platform-engineer" => &["read_file", "write_file", "list_files", "run_infra_plan"],
        "peer-reviewer" | "ux-reviewer" => &["read_file", "list_files"],
        _ => DEFAULT_TOOLS,
    };
    tools.iter().map(|tool| (*tool).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use taskgate_core::AgentId;

    use super::allowed_tools_for;

    #[test]
    fn known_agent_gets_its_dedicated_allow_list() {
        let tools = allowed_tools_for(&AgentId::new("developer"));
        assert!(tools.contains(&"write_file".to_string()));
        assert!(tools.contains(&"run_tests".to_string()));
    }

    #[test]
    fn unknown_agent_falls_back_to_read_only_default() {
        let tools = allowed_tools_for(&AgentId::new("some-new-role"));
        assert_eq!(tools, vec!["read_file".to_string(), "list_files".to_string()]);
    }

    #[test]
    fn security_roles_never_get_write_access() {
        let tools = allowed_tools_for(&AgentId::new("security-architect"));
        assert!(!tools.contains(&"write_file".to_string()));
    }
}
