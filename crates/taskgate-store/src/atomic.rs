// crates/taskgate-store/src/atomic.rs
// ============================================================================
// Module: Atomic File Write
// Description: Temp-file-then-rename writes for every document the Run Store
//              persists (spec §4.1).
// Purpose: Guarantee that a reader never observes a partially written
//          `run.json` or `artifact-registry.json`.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Grounded on `decision-gate-contract::contract::write_file_atomic`: write
//! to a uniquely named sibling temp file, `sync_all`, then `rename` over the
//! target. The difference here is the plain `std::fs` implementation, since
//! this workspace drops the teacher's `cap-std` sandboxing dependency (see
//! DESIGN.md) in favour of direct filesystem access scoped by the caller's
//! `runs_root` configuration.

use std::fs;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use taskgate_core::CoreError;

/// Writes `bytes` to `target` atomically: a temp file in the same directory
/// is written and `fsync`ed, then renamed over `target`.
///
/// # Errors
/// Returns [`CoreError::Corrupt`] wrapping the underlying I/O error if any
/// step fails; the temp file is removed on any failure before returning.
pub fn write_atomic(target: &Path, bytes: &[u8]) -> Result<(), CoreError> {
    let parent = target.parent().ok_or_else(|| CoreError::InvalidArgument(format!("path {} has no parent directory", target.display())))?;
    let file_name = target.file_name().ok_or_else(|| CoreError::InvalidArgument(format!("path {} has no file name", target.display())))?;

    for attempt in 0u32 .. 64 {
        let temp_name = {
            let mut name = std::ffi::OsString::from(".tmp-");
            name.push(file_name);
            name.push(format!(".{}.{attempt}", std::process::id()));
            name
        };
        let temp_path = parent.join(&temp_name);

        match OpenOptions::new().write(true).create_new(true).open(&temp_path) {
            Ok(mut file) => {
                if let Err(err) = file.write_all(bytes).and_then(|()| file.sync_all()) {
                    let _ = fs::remove_file(&temp_path);
                    return Err(CoreError::Corrupt(format!("failed writing {}: {err}", temp_path.display())));
                }
                if let Err(err) = fs::rename(&temp_path, target) {
                    let _ = fs::remove_file(&temp_path);
                    return Err(CoreError::Corrupt(format!("failed renaming {} to {}: {err}", temp_path.display(), target.display())));
                }
                return Ok(());
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(CoreError::Corrupt(format!("failed opening {}: {err}", temp_path.display()))),
        }
    }

    Err(CoreError::Corrupt(format!("unable to allocate a temp file for {}", target.display())))
}
