use crate::error::{GoCqError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Look for an already installed binary directly inside `dir`.
///
/// Any entry whose file name contains `binary` counts; version and content
/// are not checked.
pub fn find_installed(dir: &Path, binary: &str) -> Result<Option<PathBuf>> {
    if !dir.is_dir() {
        return Ok(None);
    }

    for entry in walkdir::WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            GoCqError::fs(path, e.into())
        })?;

        let matches = entry
            .file_name()
            .to_str()
            .map(|name| name.contains(binary))
            .unwrap_or(false);

        if matches {
            return Ok(Some(entry.into_path()));
        }
    }

    Ok(None)
}

/// Make a file executable (Unix only)
#[cfg(unix)]
pub fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut permissions = fs::metadata(path)
        .map_err(|e| GoCqError::fs(path, e))?
        .permissions();
    permissions.set_mode(permissions.mode() | 0o111);
    fs::set_permissions(path, permissions).map_err(|e| GoCqError::fs(path, e))
}

#[cfg(windows)]
pub fn make_executable(_path: &Path) -> Result<()> {
    // No-op on Windows
    Ok(())
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if path.starts_with('~') {
        if let Some(home) = directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
        {
            let rest = path.strip_prefix('~').unwrap_or(path);
            let rest = rest.strip_prefix('/').unwrap_or(rest);
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
