use crate::error::Result;
use std::path::{Path, PathBuf};

/// Changes the process working directory and puts it back on drop, so the
/// original directory is restored on every exit path including unwinding.
#[derive(Debug)]
pub struct WorkdirGuard {
    original: PathBuf,
}

impl WorkdirGuard {
    pub fn enter(dir: &Path) -> Result<Self> {
        let original = std::env::current_dir()?;
        std::env::set_current_dir(dir)?;
        tracing::debug!(dir = %dir.display(), "entered working directory");
        Ok(Self { original })
    }

    pub fn original(&self) -> &Path {
        &self.original
    }
}

impl Drop for WorkdirGuard {
    fn drop(&mut self) {
        if let Err(e) = std::env::set_current_dir(&self.original) {
            tracing::error!(
                dir = %self.original.display(),
                error = %e,
                "failed to restore working directory"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn restores_on_drop() {
        let before = std::env::current_dir().unwrap();
        let dir = TempDir::new().unwrap();
        {
            let guard = WorkdirGuard::enter(dir.path()).unwrap();
            assert_eq!(
                std::env::current_dir().unwrap().canonicalize().unwrap(),
                dir.path().canonicalize().unwrap()
            );
            assert_eq!(guard.original(), before);
        }
        assert_eq!(std::env::current_dir().unwrap(), before);
    }

    #[test]
    #[serial]
    fn restores_on_panic() {
        let before = std::env::current_dir().unwrap();
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();
        let result = std::panic::catch_unwind(move || {
            let _guard = WorkdirGuard::enter(&path).unwrap();
            panic!("agent blew up");
        });
        assert!(result.is_err());
        assert_eq!(std::env::current_dir().unwrap(), before);
    }

    #[test]
    #[serial]
    fn missing_directory_leaves_cwd_alone() {
        let before = std::env::current_dir().unwrap();
        assert!(WorkdirGuard::enter(Path::new("/definitely/not/here")).is_err());
        assert_eq!(std::env::current_dir().unwrap(), before);
    }
}
