use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("PATH environment variable is not set")]
    NoSearchPath,
    #[error("command not found")]
    NotFound,
}

/// Returns true for a regular file with at least one execute bit.
pub fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path).is_ok_and(|m| {
        m.is_file() && {
            #[cfg(unix)]
            {
                m.permissions().mode() & 0o111 != 0
            }
            #[cfg(not(unix))]
            {
                true
            }
        }
    })
}

/// Finds the full path of a command by searching the directories of
/// `search_path` in order.
///
/// A command containing `/` is taken as a path as-is and never searched for.
pub fn find_command(command: &str, search_path: Option<&str>) -> Result<PathBuf, SearchError> {
    if command.contains('/') {
        let path = PathBuf::from(command);
        return if is_executable(&path) {
            Ok(path)
        } else {
            Err(SearchError::NotFound)
        };
    }

    let search_path = search_path.ok_or(SearchError::NoSearchPath)?;
    if command.is_empty() {
        return Err(SearchError::NotFound);
    }

    search_path
        .split(':')
        .filter(|dir| !dir.is_empty())
        .map(|dir| Path::new(dir).join(command))
        .find(|full| is_executable(full))
        .ok_or(SearchError::NotFound)
}
