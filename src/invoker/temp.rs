use crate::error::{BuildError, BuildResult};
use std::env;
use std::io::Write;
use std::path::Path;
use tempfile::{Builder, TempPath};
use tracing::{trace, warn};

/// Temporary file removed when it goes out of scope
///
/// Names are unique per file, so concurrent invocations never share argument files
/// or pathing jars. Removal failures are logged and never fail the build.
#[derive(Debug)]
pub struct ScopedTempFile {
    path: Option<TempPath>,
}

impl ScopedTempFile {
    pub fn create(prefix: &str, suffix: &str) -> BuildResult<Self> {
        let file = Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile()
            .map_err(|e| BuildError::io(env::temp_dir(), e))?;
        Ok(Self {
            path: Some(file.into_temp_path()),
        })
    }

    pub fn with_contents(prefix: &str, suffix: &str, contents: &[u8]) -> BuildResult<Self> {
        let mut file = Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile()
            .map_err(|e| BuildError::io(env::temp_dir(), e))?;
        file.write_all(contents)
            .and_then(|_| file.flush())
            .map_err(|e| BuildError::io(file.path(), e))?;
        Ok(Self {
            path: Some(file.into_temp_path()),
        })
    }

    pub fn path(&self) -> &Path {
        match &self.path {
            Some(path) => path,
            None => Path::new(""),
        }
    }
}

impl Drop for ScopedTempFile {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let removed = path.to_path_buf();
            match path.close() {
                Ok(()) => trace!(path = %removed.display(), "Removed temporary file"),
                Err(e) => warn!(
                    path = %removed.display(),
                    error = %e,
                    "Failed to remove temporary file"
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_removed_on_drop() {
        let temp = ScopedTempFile::with_contents("javac", ".args", b"A.java B.java").unwrap();
        let path = temp.path().to_path_buf();
        assert_eq!(fs::read_to_string(&path).unwrap(), "A.java B.java");
        drop(temp);
        assert!(!path.exists());
    }

    #[test]
    fn test_names_are_unique() {
        let a = ScopedTempFile::create("javacmd", ".jar").unwrap();
        let b = ScopedTempFile::create("javacmd", ".jar").unwrap();
        assert_ne!(a.path(), b.path());
        assert!(a.path().file_name().unwrap().to_string_lossy().starts_with("javacmd"));
        assert!(a.path().to_string_lossy().ends_with(".jar"));
    }

    #[test]
    fn test_already_removed_file_does_not_panic() {
        let temp = ScopedTempFile::create("testng", ".args").unwrap();
        fs::remove_file(temp.path()).unwrap();
        drop(temp);
    }

    #[test]
    fn test_removed_when_unwinding() {
        let path = std::panic::catch_unwind(|| {
            let temp = ScopedTempFile::create("javacmd", ".jar").unwrap();
            let path = temp.path().to_path_buf();
            if path.exists() {
                std::panic::panic_any(path);
            }
            path
        });
        let path = match path {
            Ok(path) => path,
            Err(payload) => *payload.downcast::<std::path::PathBuf>().unwrap(),
        };
        assert!(!path.exists());
    }
}
