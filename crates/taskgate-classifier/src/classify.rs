// crates/taskgate-classifier/src/classify.rs
// ============================================================================
// Module: Task Classifier
// Description: Maps a task description and optional file patterns to a
//              complexity, task type, primary agent, and gate set (spec §4.4).
// Purpose: Deterministic, table-driven classification with a security floor,
//          consumed by the Agent Router before chain assembly.
// Dependencies: regex, taskgate-config, taskgate-core
// ============================================================================

//! ## Overview
//! [`classify`] runs the eight-step algorithm spec §4.4 describes: sanitise,
//! score complexity and task type against
//! [`taskgate_config::classifier_tables`], adjust for resolved file count and
//! cross-module scope, apply description-level scope hints, clamp against
//! the security-keyword floor, and map the final complexity to a gate set.
//! Every step is a pure function over its inputs except glob resolution,
//! which consults the caller-supplied [`GlobCache`] (spec §4.4 step 4).

use std::path::Path;

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;
use taskgate_config::ComplexityLevel;
use taskgate_config::ComplexityTable;
use taskgate_config::TaskTypeTable;
use taskgate_config::gates_for;
use taskgate_core::AgentId;
use taskgate_core::CoreError;
use taskgate_core::TaskType;

use crate::glob::GlobCache;
use crate::sanitize::sanitize_description;
use crate::sanitize::sanitize_file_patterns;

/// A classification request: a task description plus optional file patterns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRequest {
    /// The free-form task description.
    pub description: String,
    /// Glob patterns describing files the task is expected to touch.
    pub file_patterns: Vec<String>,
}

impl ClassificationRequest {
    /// Builds a request from a description with no file patterns.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self { description: description.into(), file_patterns: Vec::new() }
    }

    /// Attaches file patterns to the request.
    #[must_use]
    pub fn with_file_patterns(mut self, patterns: Vec<String>) -> Self {
        self.file_patterns = patterns;
        self
    }
}

/// The classifier's output (spec §4.4).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// The classified complexity level.
    pub complexity: ComplexityLevel,
    /// The classified task type.
    pub task_type: TaskType,
    /// The agent primarily responsible for the task at this complexity.
    pub primary_agent: AgentId,
    /// Whether a planning pass is required before execution.
    pub gate_planner: bool,
    /// Whether a review pass is required after execution.
    pub gate_review: bool,
    /// Whether a cross-module impact analysis is required.
    pub gate_impact_analysis: bool,
    /// Human-readable reasoning steps, in the order they were applied.
    pub reasoning: Vec<String>,
}

/// Classifies a task, scoring against the complexity and task-type tables
/// and adjusting for resolved file scope.
///
/// `project_root` is the directory file patterns are resolved against;
/// `cache` memoizes glob resolutions per spec §4.4 step 4.
///
/// # Errors
/// Returns [`CoreError::InvalidArgument`] if the description or file
/// patterns are malformed or out of bounds.
pub fn classify(request: &ClassificationRequest, project_root: &Path, cache: &GlobCache, complexity_tables: &[ComplexityTable], task_type_tables: &[TaskTypeTable], primary_agent_for: impl Fn(&TaskType) -> AgentId) -> Result<ClassificationResult, CoreError> {
    let description = sanitize_description(&request.description)?;
    let patterns = sanitize_file_patterns(&request.file_patterns)?;
    let lowercase = description.to_lowercase();
    let mut reasoning = Vec::new();

    let mut complexity = score_best_complexity(&lowercase, complexity_tables, &mut reasoning);
    let task_type = score_best_task_type(&lowercase, task_type_tables, &mut reasoning);

    if !patterns.is_empty() {
        let resolution = cache.resolve(project_root, &patterns)?;
        let file_count = resolution.files.len().max(patterns.len());
        complexity = apply_file_count_adjustment(complexity, file_count, resolution.cross_module, &mut reasoning);
        if resolution.cross_module {
            reasoning.push("Cross-module changes detected".to_string());
        }
        if resolution.truncated {
            reasoning.push(format!("File resolution truncated at {} files", crate::glob::MAX_RESOLVED_FILES));
        }
    }

    complexity = apply_scope_hints(complexity, &lowercase, &mut reasoning);
    complexity = apply_security_floor(complexity, &lowercase, &mut reasoning);

    let gates = gates_for(complexity);
    Ok(ClassificationResult {
        complexity,
        primary_agent: primary_agent_for(&task_type),
        task_type,
        gate_planner: gates.planner,
        gate_review: gates.review,
        gate_impact_analysis: gates.impact_analysis,
        reasoning,
    })
}

/// Scores every complexity table against `lowercase` and returns the
/// highest-scoring level, defaulting to [`ComplexityLevel::Trivial`] when
/// nothing matches.
fn score_best_complexity(lowercase: &str, tables: &[ComplexityTable], reasoning: &mut Vec<String>) -> ComplexityLevel {
    let mut best = ComplexityLevel::Trivial;
    let mut best_score = 0i64;
    for table in tables {
        let score = score_table(lowercase, &table.keywords, &table.patterns);
        if score > best_score {
            best_score = score;
            best = table.level;
        }
    }
    if best_score > 0 {
        reasoning.push(format!("Keyword/pattern scoring selected complexity {best:?} (score {best_score})"));
    }
    best
}

/// Scores every task-type table against `lowercase`, picking the argmax and
/// tie-breaking by ascending declared priority.
fn score_best_task_type(lowercase: &str, tables: &[TaskTypeTable], reasoning: &mut Vec<String>) -> TaskType {
    let mut best: Option<&TaskTypeTable> = None;
    let mut best_score = -1i64;
    for table in tables {
        let score = score_table(lowercase, &table.keywords, &table.patterns);
        let better = match best {
            None => true,
            Some(current) => score > best_score || (score == best_score && table.priority < current.priority),
        };
        if better {
            best_score = score;
            best = Some(table);
        }
    }
    let chosen = best.map_or_else(|| TaskType::new("GENERAL"), |table| table.task_type.clone());
    reasoning.push(format!("Classified task type as {chosen}"));
    chosen
}

/// Sums keyword (×1) and compiled-regex (×1.5) weights matched in `text`.
fn score_table(text: &str, keywords: &[taskgate_config::KeywordWeight], patterns: &[taskgate_config::RegexWeight]) -> i64 {
    let mut score = 0i64;
    for keyword in keywords {
        if text.contains(&keyword.keyword.to_lowercase()) {
            score += i64::from(keyword.weight);
        }
    }
    for pattern in patterns {
        if let Ok(regex) = Regex::new(&pattern.pattern) {
            if regex.is_match(text) {
                #[allow(clippy::cast_possible_truncation, reason = "pattern weights are small fixed table constants")]
                let weighted = ((f64::from(pattern.weight) * 1.5).round()) as i64;
                score += weighted;
            }
        }
    }
    score
}

/// Applies spec §4.4 step 5's file-count adjustment table.
fn apply_file_count_adjustment(complexity: ComplexityLevel, file_count: usize, cross_module: bool, reasoning: &mut Vec<String>) -> ComplexityLevel {
    if complexity == ComplexityLevel::Critical {
        return complexity;
    }
    let adjusted = if cross_module || file_count >= 6 {
        complexity.clamp_at_least(ComplexityLevel::Complex)
    } else if (2..=5).contains(&file_count) {
        complexity.clamp_at_least(ComplexityLevel::Moderate)
    } else if file_count <= 1 {
        complexity.min(ComplexityLevel::Simple)
    } else {
        complexity
    };
    if adjusted != complexity {
        reasoning.push(format!("File-count adjustment ({file_count} files) raised complexity to {adjusted:?}"));
    }
    adjusted
}

/// Applies spec §4.4 step 6's description-level scope hints.
fn apply_scope_hints(complexity: ComplexityLevel, lowercase: &str, reasoning: &mut Vec<String>) -> ComplexityLevel {
    if lowercase.contains("single file") && complexity == ComplexityLevel::Moderate {
        reasoning.push("Scope hint 'single file' lowered complexity".to_string());
        return complexity.step_down();
    }
    if lowercase.contains("multiple files") && complexity == ComplexityLevel::Simple {
        reasoning.push("Scope hint 'multiple files' raised complexity".to_string());
        return complexity.step_up();
    }
    complexity
}

/// Applies spec §4.4 step 7's security-keyword floor.
fn apply_security_floor(complexity: ComplexityLevel, lowercase: &str, reasoning: &mut Vec<String>) -> ComplexityLevel {
    let matched = taskgate_config::SECURITY_KEYWORDS.iter().find(|keyword| lowercase.contains(*keyword));
    if let Some(keyword) = matched {
        let floored = complexity.clamp_at_least(ComplexityLevel::Complex);
        reasoning.push(format!("Security keyword floor ('{keyword}') clamped complexity to at least complex"));
        floored
    } else {
        complexity
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use taskgate_config::ComplexityLevel;
    use taskgate_config::default_complexity_tables;
    use taskgate_config::default_routing_matrix;
    use taskgate_config::default_task_type_tables;
    use taskgate_core::AgentId;

    use super::ClassificationRequest;
    use super::classify;
    use crate::glob::GlobCache;

    fn primary_agent_for(task_type: &taskgate_core::TaskType) -> AgentId {
        default_routing_matrix().into_iter().find(|entry| &entry.task_type == task_type).map_or_else(|| AgentId::new("developer"), |entry| entry.primary)
    }

    #[test]
    fn trivial_documentation_fix_classifies_as_trivial() {
        let request = ClassificationRequest::new("Fix typo in README");
        let result = classify(&request, Path::new("."), &GlobCache::default(), &default_complexity_tables(), &default_task_type_tables(), primary_agent_for).expect("classifies");
        assert_eq!(result.complexity, ComplexityLevel::Trivial);
        assert_eq!(result.task_type.as_str(), "DOCUMENTATION");
        assert!(!result.gate_planner);
        assert!(!result.gate_review);
    }

    #[test]
    fn security_floor_clamps_complexity_with_no_files() {
        let request = ClassificationRequest::new("Update login password validation");
        let result = classify(&request, Path::new("."), &GlobCache::default(), &default_complexity_tables(), &default_task_type_tables(), primary_agent_for).expect("classifies");
        assert!(result.complexity >= ComplexityLevel::Complex);
        assert!(result.gate_planner);
        assert!(result.reasoning.iter().any(|line| line.contains("Security keyword floor")));
    }

    #[test]
    fn cross_module_glob_elevates_complexity() {
        let request = ClassificationRequest::new("Refactor authentication").with_file_patterns(vec!["src/**/*.ts".to_string()]);
        let result = classify(&request, Path::new("."), &GlobCache::default(), &default_complexity_tables(), &default_task_type_tables(), primary_agent_for).expect("classifies");
        assert!(result.complexity >= ComplexityLevel::Complex);
        assert!(result.reasoning.iter().any(|line| line.contains("Cross-module changes detected")));
    }

    #[test]
    fn invalid_file_pattern_is_rejected() {
        let request = ClassificationRequest::new("Do something").with_file_patterns(vec!["/etc/passwd".to_string()]);
        let err = classify(&request, Path::new("."), &GlobCache::default(), &default_complexity_tables(), &default_task_type_tables(), primary_agent_for).expect_err("rejects");
        assert!(matches!(err, taskgate_core::CoreError::InvalidArgument(_)));
    }
}
