// crates/taskgate-context/src/lib.rs
// ============================================================================
// Module: Taskgate Context
// Description: Context Builder / Injector: assembles an agent's system
//              prompt, message history, and tool allow-list, and validates
//              the optional restricted context packet (spec §4.6).
// Purpose: Give every executor invocation a consistent, auditable prompt
//          assembly path.
// Dependencies: serde, serde_json, taskgate-config, taskgate-core
// ============================================================================

//! ## Overview
//! [`builder::ContextBuilder`] is the primary entry point. [`packet`]
//! exposes the optional, further-restricted `{goal, constraints, references,
//! definitionOfDone}` view for callers that don't need the full prompt.

pub mod builder;
pub mod injection;
pub mod packet;
pub mod persona;
pub mod tools;

pub use builder::BuiltContext;
pub use builder::ContextBuilder;
pub use builder::Message;
pub use injection::KNOWN_INJECTIONS;
pub use injection::resolve_injections;
pub use packet::ContextPacket;
pub use persona::load_persona;
pub use tools::allowed_tools_for;
