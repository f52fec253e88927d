// crates/taskgate-classifier/src/glob.rs
// ============================================================================
// Module: Glob Resolution And Cross-Module Detection
// Description: Expands file patterns against a filesystem root with a
//              30s-TTL cache, capped at 1000 resolved files (spec §4.4
//              step 4).
// Purpose: Let the classifier count touched files and detect cross-module
//          changes without re-walking the filesystem on every call.
// Dependencies: regex, std
// ============================================================================

//! ## Overview
//! No crate in this workspace's lineage depends on a dedicated glob crate,
//! so pattern matching is done by hand: each pattern is translated into an
//! anchored [`regex::Regex`] (`*` within a segment, `**` across segments,
//! `{a,b}` alternation, `?` single character) and matched against every
//! relative path found by walking the root. Cross-module detection is
//! syntactic first (`**` or brace lists imply cross-module on their own,
//! spec §4.4 step 4) and falls back to counting distinct top-level
//! directories among the resolved files.

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use regex::Regex;
use taskgate_core::CoreError;

/// Default TTL for a cached glob resolution (spec §4.4 step 4).
pub const DEFAULT_GLOB_CACHE_TTL: Duration = Duration::from_secs(30);
/// Maximum number of files a single resolution may return (spec §4.4 step 4).
pub const MAX_RESOLVED_FILES: usize = 1_000;

/// The outcome of resolving a set of file patterns against a root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobResolution {
    /// Every relative path that matched at least one pattern, deduplicated.
    pub files: BTreeSet<PathBuf>,
    /// Whether resolution was capped at [`MAX_RESOLVED_FILES`] before the
    /// walk completed.
    pub truncated: bool,
    /// Whether the pattern set is syntactically or structurally cross-module.
    pub cross_module: bool,
}

struct CacheEntry {
    resolution: GlobResolution,
    inserted_at: Instant,
}

/// A TTL-bounded cache of glob resolutions, keyed by `(root, patterns)`.
pub struct GlobCache {
    ttl: Duration,
    entries: Mutex<HashMap<(PathBuf, Vec<String>), CacheEntry>>,
}

impl GlobCache {
    /// Builds a cache with the given TTL.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: Mutex::new(HashMap::new()) }
    }

    /// Resolves `patterns` against `root`, reusing a cached resolution if
    /// one was computed within the TTL.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidArgument`] if a pattern fails to compile.
    pub fn resolve(&self, root: &Path, patterns: &[String]) -> Result<GlobResolution, CoreError> {
        let key = (root.to_path_buf(), patterns.to_vec());
        {
            let entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(entry) = entries.get(&key) {
                if entry.inserted_at.elapsed() < self.ttl {
                    return Ok(entry.resolution.clone());
                }
            }
        }
        let resolution = resolve_uncached(root, patterns)?;
        let mut entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.insert(key, CacheEntry { resolution: resolution.clone(), inserted_at: Instant::now() });
        Ok(resolution)
    }
}

impl Default for GlobCache {
    fn default() -> Self {
        Self::new(DEFAULT_GLOB_CACHE_TTL)
    }
}

/// Resolves `patterns` against `root` without consulting the cache.
fn resolve_uncached(root: &Path, patterns: &[String]) -> Result<GlobResolution, CoreError> {
    let syntactically_cross_module = patterns.iter().any(|pattern| pattern.contains("**") || pattern.contains('{'));

    let compiled: Vec<Regex> = patterns.iter().map(|pattern| compile_glob(pattern)).collect::<Result<_, _>>()?;

    let mut files = BTreeSet::new();
    let mut truncated = false;
    if root.is_dir() {
        walk(root, root, &compiled, &mut files, &mut truncated);
    } else {
        for pattern in patterns {
            let candidate = PathBuf::from(pattern);
            if compiled.iter().any(|regex| regex.is_match(pattern)) {
                files.insert(candidate);
            }
        }
    }

    let top_level_dirs: BTreeSet<_> = files.iter().filter_map(|file| file.parent().map(std::borrow::ToOwned::to_owned)).collect();
    let cross_module = syntactically_cross_module || top_level_dirs.len() > 1;

    Ok(GlobResolution { files, truncated, cross_module })
}

/// Recursively walks `dir`, relative to `root`, collecting paths matching
/// any of `patterns` into `files` up to [`MAX_RESOLVED_FILES`].
fn walk(root: &Path, dir: &Path, patterns: &[Regex], files: &mut BTreeSet<PathBuf>, truncated: &mut bool) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        if files.len() >= MAX_RESOLVED_FILES {
            *truncated = true;
            return;
        }
        let path = entry.path();
        if path.is_dir() {
            walk(root, &path, patterns, files, truncated);
        } else if let Ok(relative) = path.strip_prefix(root) {
            let relative_str = relative.to_string_lossy().replace('\\', "/");
            if patterns.iter().any(|regex| regex.is_match(&relative_str)) {
                files.insert(relative.to_path_buf());
            }
        }
    }
}

/// Compiles a glob pattern into an anchored regular expression.
///
/// # Errors
/// Returns [`CoreError::InvalidArgument`] if the translated expression fails
/// to compile (e.g. an unterminated brace list).
fn compile_glob(pattern: &str) -> Result<Regex, CoreError> {
    let translated = translate_glob_to_regex(pattern)?;
    Regex::new(&translated).map_err(|err| CoreError::InvalidArgument(format!("invalid file pattern {pattern}: {err}")))
}

/// Translates glob syntax (`*`, `**`, `?`, `{a,b}`) into an anchored regex
/// source string.
fn translate_glob_to_regex(pattern: &str) -> Result<String, CoreError> {
    let mut out = String::from("^");
    let mut chars = pattern.chars().peekable();
    let mut brace_depth = 0u32;

    while let Some(ch) = chars.next() {
        match ch {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    out.push_str(".*");
                } else {
                    out.push_str("[^/]*");
                }
            }
            '?' => out.push_str("[^/]"),
            '{' => {
                brace_depth += 1;
                out.push('(');
            }
            '}' => {
                if brace_depth == 0 {
                    return Err(CoreError::InvalidArgument(format!("unbalanced brace in file pattern: {pattern}")));
                }
                brace_depth -= 1;
                out.push(')');
            }
            ',' if brace_depth > 0 => out.push('|'),
            '.' | '+' | '(' | ')' | '|' | '^' | '$' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            other => out.push(other),
        }
    }
    if brace_depth != 0 {
        return Err(CoreError::InvalidArgument(format!("unbalanced brace in file pattern: {pattern}")));
    }
    out.push('$');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::GlobCache;
    use super::translate_glob_to_regex;

    #[test]
    fn double_star_translates_to_any_depth() {
        let source = translate_glob_to_regex("src/**/*.ts").expect("translates");
        let regex = regex::Regex::new(&source).expect("compiles");
        assert!(regex.is_match("src/a/b/c.ts"));
        assert!(regex.is_match("src/c.ts"));
        assert!(!regex.is_match("lib/c.ts"));
    }

    #[test]
    fn brace_list_expands_to_alternation() {
        let source = translate_glob_to_regex("src/*.{ts,tsx}").expect("translates");
        let regex = regex::Regex::new(&source).expect("compiles");
        assert!(regex.is_match("src/app.ts"));
        assert!(regex.is_match("src/app.tsx"));
        assert!(!regex.is_match("src/app.js"));
    }

    #[test]
    fn resolves_files_under_a_real_directory_and_detects_cross_module() {
        let dir = tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("src/auth")).expect("mkdir");
        fs::create_dir_all(dir.path().join("src/db")).expect("mkdir");
        fs::write(dir.path().join("src/auth/login.ts"), b"").expect("write");
        fs::write(dir.path().join("src/db/query.ts"), b"").expect("write");

        let cache = GlobCache::default();
        let resolution = cache.resolve(dir.path(), &["src/**/*.ts".to_string()]).expect("resolves");
        assert_eq!(resolution.files.len(), 2);
        assert!(resolution.cross_module);
    }

    #[test]
    fn single_directory_single_file_is_not_cross_module() {
        let dir = tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("src")).expect("mkdir");
        fs::write(dir.path().join("src/app.ts"), b"").expect("write");

        let cache = GlobCache::default();
        let resolution = cache.resolve(dir.path(), &["src/app.ts".to_string()]).expect("resolves");
        assert_eq!(resolution.files.len(), 1);
        assert!(!resolution.cross_module);
    }
}
