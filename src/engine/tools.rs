//! Path and filter utilities

use std::path::{Component, Path};

use crate::error::ConfigError;

/// True if `path` (under `root`) matches any exclude pattern, by the root-relative path
/// or by any root-relative component. Components above the root never match.
pub fn is_excluded(path: &Path, root: &Path, exclude_patterns: &[String]) -> bool {
    if exclude_patterns.is_empty() || path == root {
        return false;
    }
    let rel = path.strip_prefix(root).unwrap_or(path);
    let rel_str = rel.to_string_lossy();
    exclude_patterns.iter().any(|pattern| {
        glob_match(pattern, &rel_str)
            || rel.components().any(|c| match c {
                Component::Normal(name) => glob_match(pattern, &name.to_string_lossy()),
                _ => false,
            })
    })
}

/// Simple glob pattern matching (supports * and ?)
pub fn glob_match(pattern: &str, text: &str) -> bool {
    // Remove leading '!' if present (negation handled by caller)
    let pattern = pattern.strip_prefix('!').unwrap_or(pattern);

    let mut pattern_chars = pattern.chars().peekable();
    let mut text_chars = text.chars().peekable();

    while let Some(&p) = pattern_chars.peek() {
        match p {
            '*' => {
                pattern_chars.next();
                if pattern_chars.peek().is_none() {
                    return true; // trailing * matches everything
                }
                let rest: String = pattern_chars.clone().collect();
                loop {
                    if glob_match(&rest, &text_chars.clone().collect::<String>()) {
                        return true;
                    }
                    if text_chars.next().is_none() {
                        return false;
                    }
                }
            }
            '?' => {
                pattern_chars.next();
                if text_chars.next().is_none() {
                    return false;
                }
            }
            _ => {
                pattern_chars.next();
                if text_chars.next() != Some(p) {
                    return false;
                }
            }
        }
    }

    text_chars.peek().is_none()
}

/// True if the process is running with effective uid 0 (e.g. via sudo).
#[cfg(unix)]
pub fn running_as_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
pub fn running_as_root() -> bool {
    false
}

/// Check that `root` exists, is a directory, and can be listed. Any failure here is fatal
/// and happens before a single task is emitted.
pub fn validate_root(root: &Path) -> Result<(), ConfigError> {
    let meta = match std::fs::metadata(root) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::RootNotFound {
                path: root.to_path_buf(),
            });
        }
        Err(source) => {
            return Err(ConfigError::RootUnreadable {
                path: root.to_path_buf(),
                source,
            });
        }
    };
    if !meta.is_dir() {
        return Err(ConfigError::RootNotDirectory {
            path: root.to_path_buf(),
        });
    }
    std::fs::read_dir(root).map_err(|source| ConfigError::RootUnreadable {
        path: root.to_path_buf(),
        source,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_root_accepts_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(validate_root(dir.path()).is_ok());
    }

    #[test]
    fn validate_root_rejects_missing_and_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            validate_root(&missing),
            Err(ConfigError::RootNotFound { .. })
        ));
        let file = dir.path().join("a.txt");
        std::fs::write(&file, "x").unwrap();
        assert!(matches!(
            validate_root(&file),
            Err(ConfigError::RootNotDirectory { .. })
        ));
    }
}
