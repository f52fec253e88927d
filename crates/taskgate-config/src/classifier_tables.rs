// crates/taskgate-config/src/classifier_tables.rs
// ============================================================================
// Module: Classifier Tables
// Description: Static keyword/regex weight tables, per-level gate mapping,
//              and the security-keyword floor list the Task Classifier
//              scores against (spec §4.4).
// Purpose: Keep the classifier a pure function over declarative data instead
//          of branching logic, matching spec §9's "classifier and router use
//          dynamic regex tables (data-driven)" redesign direction.
// Dependencies: serde, taskgate-core
// ============================================================================

//! ## Overview
//! Grounded on `decision-gate-config`'s table-of-named-constants style: each
//! table entry carries its own weight and priority so the classifier
//! (`taskgate-classifier`) never hard-codes a keyword. `taskgate-config` owns
//! the data; `taskgate-classifier` owns compiling [`RegexWeight::pattern`]
//! and the scoring algorithm itself, since this crate has no `regex`
//! dependency of its own.

use serde::Deserialize;
use serde::Serialize;
use taskgate_core::TaskType;

/// The five complexity levels a task can be classified into, in ascending
/// order (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityLevel {
    /// No meaningful review surface; trivial, single-step changes.
    Trivial,
    /// Small, contained changes needing only review.
    Simple,
    /// Multi-file or cross-cutting changes needing planning and review.
    Moderate,
    /// Changes needing impact analysis, planning, and review.
    Complex,
    /// Security- or stability-critical changes; the highest gate level.
    Critical,
}

impl ComplexityLevel {
    /// Steps this level up by one, saturating at [`ComplexityLevel::Critical`].
    #[must_use]
    pub const fn step_up(self) -> Self {
        match self {
            Self::Trivial => Self::Simple,
            Self::Simple => Self::Moderate,
            Self::Moderate => Self::Complex,
            Self::Complex | Self::Critical => Self::Critical,
        }
    }

    /// Steps this level down by one, saturating at [`ComplexityLevel::Trivial`].
    #[must_use]
    pub const fn step_down(self) -> Self {
        match self {
            Self::Trivial | Self::Simple => Self::Trivial,
            Self::Moderate => Self::Simple,
            Self::Complex => Self::Moderate,
            Self::Critical => Self::Complex,
        }
    }

    /// Returns the greater of `self` and `other` (const-fn friendly `max`).
    const fn max_with(self, other: Self) -> Self {
        if (self as u8) >= (other as u8) { self } else { other }
    }

    /// Raises `self` to at least `floor`, never lowering it.
    #[must_use]
    pub const fn clamp_at_least(self, floor: Self) -> Self {
        self.max_with(floor)
    }
}

/// The per-complexity approval gates spec §4.4 step 8 maps from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateSet {
    /// Whether a planning pass is required before execution.
    pub planner: bool,
    /// Whether a review pass is required after execution.
    pub review: bool,
    /// Whether a cross-module impact analysis is required.
    pub impact_analysis: bool,
}

/// Returns the fixed complexity-to-gates mapping table (spec §4.4 step 8).
#[must_use]
pub const fn gates_for(level: ComplexityLevel) -> GateSet {
    match level {
        ComplexityLevel::Trivial => GateSet { planner: false, review: false, impact_analysis: false },
        ComplexityLevel::Simple => GateSet { planner: false, review: true, impact_analysis: false },
        ComplexityLevel::Moderate => GateSet { planner: true, review: true, impact_analysis: false },
        ComplexityLevel::Complex | ComplexityLevel::Critical => GateSet { planner: true, review: true, impact_analysis: true },
    }
}

/// A single literal keyword and the score it contributes when matched
/// (spec §4.4 step 2, weight ×1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordWeight {
    /// The literal keyword to search for, case-insensitively.
    pub keyword: String,
    /// The score contributed when this keyword is present.
    pub weight: u32,
}

impl KeywordWeight {
    /// Builds a keyword weight entry.
    #[must_use]
    pub fn new(keyword: impl Into<String>, weight: u32) -> Self {
        Self { keyword: keyword.into(), weight }
    }
}

/// A single regex pattern and the score it contributes when matched
/// (spec §4.4 step 2, weight ×1.5 relative to a literal keyword).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegexWeight {
    /// The regex source, compiled by the classifier crate.
    pub pattern: String,
    /// The base score contributed when this pattern matches (the classifier
    /// applies the ×1.5 multiplier from spec §4.4 step 2 on top of this).
    pub weight: u32,
}

impl RegexWeight {
    /// Builds a regex weight entry.
    #[must_use]
    pub fn new(pattern: impl Into<String>, weight: u32) -> Self {
        Self { pattern: pattern.into(), weight }
    }
}

/// One complexity level's scoring table: literal keywords plus regex
/// patterns, each contributing independently to that level's score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityTable {
    /// The level these weights score toward.
    pub level: ComplexityLevel,
    /// Literal keywords scored at weight ×1.
    pub keywords: Vec<KeywordWeight>,
    /// Regex patterns scored at weight ×1.5.
    pub patterns: Vec<RegexWeight>,
}

/// One task-type's scoring table plus the tie-break priority spec §4.4 step
/// 3 resolves equal scores by (lower priority wins).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTypeTable {
    /// The task type these weights identify.
    pub task_type: TaskType,
    /// Deterministic tie-break priority; lower values win ties.
    pub priority: u32,
    /// Literal keywords scored at weight ×1.
    pub keywords: Vec<KeywordWeight>,
    /// Regex patterns scored at weight ×1.5.
    pub patterns: Vec<RegexWeight>,
}

/// The fixed security-keyword floor list (spec §4.4 step 7): a match clamps
/// complexity to at least [`ComplexityLevel::Complex`].
pub const SECURITY_KEYWORDS: &[&str] = &["auth", "password", "credential", "token", "oauth", "jwt", "encryption", "secret", "permission", "access control"];

/// Builds the default complexity scoring tables.
///
/// Each level's table is intentionally small and illustrative; deployments
/// needing different weights load an overriding table from
/// [`crate::runtime::OrchestratorConfig`]'s config file instead of patching
/// this function.
#[must_use]
pub fn default_complexity_tables() -> Vec<ComplexityTable> {
    vec![
        ComplexityTable {
            level: ComplexityLevel::Trivial,
            keywords: vec![KeywordWeight::new("typo", 2), KeywordWeight::new("rename", 2), KeywordWeight::new("comment", 1), KeywordWeight::new("formatting", 1)],
            patterns: vec![],
        },
        ComplexityTable {
            level: ComplexityLevel::Simple,
            keywords: vec![KeywordWeight::new("fix", 2), KeywordWeight::new("bug", 2), KeywordWeight::new("single file", 1), KeywordWeight::new("small", 1)],
            patterns: vec![],
        },
        ComplexityTable {
            level: ComplexityLevel::Moderate,
            keywords: vec![KeywordWeight::new("feature", 2), KeywordWeight::new("refactor", 2), KeywordWeight::new("multiple files", 2), KeywordWeight::new("endpoint", 1)],
            patterns: vec![RegexWeight::new(r"(?i)\bapi\s+change\b", 2)],
        },
        ComplexityTable {
            level: ComplexityLevel::Complex,
            keywords: vec![KeywordWeight::new("migration", 3), KeywordWeight::new("architecture", 3), KeywordWeight::new("cross-module", 3), KeywordWeight::new("breaking change", 3)],
            patterns: vec![RegexWeight::new(r"(?i)\bschema\s+migration\b", 3)],
        },
        ComplexityTable {
            level: ComplexityLevel::Critical,
            keywords: vec![KeywordWeight::new("production incident", 5), KeywordWeight::new("data loss", 5), KeywordWeight::new("security vulnerability", 5)],
            patterns: vec![RegexWeight::new(r"(?i)\bcve-\d{4}-\d+\b", 5)],
        },
    ]
}

/// Builds the default task-type scoring tables.
///
/// Priorities are assigned in declaration order (lower index wins ties),
/// matching spec §4.4 step 3's "tie-break deterministically by the table's
/// declared priority".
#[must_use]
pub fn default_task_type_tables() -> Vec<TaskTypeTable> {
    let named: &[(&str, &[&str], &[&str])] = &[
        ("SECURITY", &["auth", "password", "credential", "token", "oauth", "jwt", "encryption", "secret", "permission"], &[r"(?i)\baccess\s+control\b"]),
        ("DATABASE", &["schema", "migration", "query", "index", "table"], &[r"(?i)\bsql\b"]),
        ("UI_UX", &["component", "layout", "style", "button", "screen"], &[r"(?i)\bux\b"]),
        ("API", &["endpoint", "route", "handler", "request", "response"], &[r"(?i)\brest\s+api\b"]),
        ("INFRASTRUCTURE", &["deploy", "pipeline", "container", "kubernetes", "terraform"], &[r"(?i)\bci/cd\b"]),
        ("DOCUMENTATION", &["docs", "readme", "comment", "guide"], &[]),
        ("GENERAL", &["implement", "update", "change"], &[]),
    ];
    named
        .iter()
        .enumerate()
        .map(|(priority, (task_type, keywords, patterns))| TaskTypeTable {
            task_type: TaskType::new(*task_type),
            #[allow(clippy::cast_possible_truncation, reason = "table length is a small fixed constant, far under u32::MAX")]
            priority: priority as u32,
            keywords: keywords.iter().map(|keyword| KeywordWeight::new(*keyword, 2)).collect(),
            patterns: patterns.iter().map(|pattern| RegexWeight::new(*pattern, 3)).collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::ComplexityLevel;
    use super::default_complexity_tables;
    use super::default_task_type_tables;
    use super::gates_for;

    #[test]
    fn levels_order_ascending() {
        assert!(ComplexityLevel::Trivial < ComplexityLevel::Simple);
        assert!(ComplexityLevel::Simple < ComplexityLevel::Moderate);
        assert!(ComplexityLevel::Moderate < ComplexityLevel::Complex);
        assert!(ComplexityLevel::Complex < ComplexityLevel::Critical);
    }

    #[test]
    fn clamp_at_least_never_lowers() {
        assert_eq!(ComplexityLevel::Trivial.clamp_at_least(ComplexityLevel::Complex), ComplexityLevel::Complex);
        assert_eq!(ComplexityLevel::Critical.clamp_at_least(ComplexityLevel::Complex), ComplexityLevel::Critical);
    }

    #[test]
    fn step_up_and_down_saturate() {
        assert_eq!(ComplexityLevel::Critical.step_up(), ComplexityLevel::Critical);
        assert_eq!(ComplexityLevel::Trivial.step_down(), ComplexityLevel::Trivial);
        assert_eq!(ComplexityLevel::Simple.step_down(), ComplexityLevel::Trivial);
        assert_eq!(ComplexityLevel::Moderate.step_up(), ComplexityLevel::Complex);
    }

    #[test]
    fn gate_table_matches_spec_matrix() {
        assert_eq!(gates_for(ComplexityLevel::Trivial), super::GateSet { planner: false, review: false, impact_analysis: false });
        assert_eq!(gates_for(ComplexityLevel::Simple), super::GateSet { planner: false, review: true, impact_analysis: false });
        assert_eq!(gates_for(ComplexityLevel::Moderate), super::GateSet { planner: true, review: true, impact_analysis: false });
        assert_eq!(gates_for(ComplexityLevel::Complex), super::GateSet { planner: true, review: true, impact_analysis: true });
        assert_eq!(gates_for(ComplexityLevel::Critical), super::GateSet { planner: true, review: true, impact_analysis: true });
    }

    #[test]
    fn default_tables_are_non_empty_and_uniquely_prioritised() {
        let complexity = default_complexity_tables();
        assert_eq!(complexity.len(), 5);

        let task_types = default_task_type_tables();
        let mut priorities: Vec<u32> = task_types.iter().map(|table| table.priority).collect();
        priorities.sort_unstable();
        priorities.dedup();
        assert_eq!(priorities.len(), task_types.len());
    }
}
