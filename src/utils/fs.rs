//! Filesystem helpers for persisted artifacts

use std::path::Path;

use crate::module::traits::ModuleError;

/// Write `contents` to `path` by writing a sibling temp file and renaming it
///
/// Readers see either the old file or the new one, never a partial write.
/// Parent directories are created as needed.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ModuleError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            ModuleError::OperationError(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| {
            ModuleError::OperationError(format!("Not a file path: {}", path.display()))
        })?;
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));

    std::fs::write(&tmp, contents).map_err(|e| {
        ModuleError::OperationError(format!("Failed to write {}: {}", tmp.display(), e))
    })?;
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        ModuleError::OperationError(format!("Failed to replace {}: {}", path.display(), e))
    })?;
    Ok(())
}
