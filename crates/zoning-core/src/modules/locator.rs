use super::traits::ExecutableLocator;
use crate::domain::NotFound;
use std::ffi::OsString;
use std::path::PathBuf;

/// Resolves executables the way a shell would: names with a path separator
/// are checked in place, bare names are looked up on the search path.
#[derive(Debug, Clone, Default)]
pub struct SearchPathLocator {
    search_path: Option<OsString>,
    working_dir: Option<PathBuf>,
}

impl SearchPathLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces `PATH` for bare-name lookups.
    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    /// Base directory for relative paths such as `./bin/PipelineRunner`.
    pub fn with_working_dir(mut self, working_dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(working_dir.into());
        self
    }
}

impl ExecutableLocator for SearchPathLocator {
    fn locate(&self, name_or_path: &str) -> Result<PathBuf, NotFound> {
        let name = name_or_path.trim();
        if name.is_empty() {
            return Err(NotFound {
                name: name_or_path.to_string(),
                reason: "no executable name was given".to_string(),
            });
        }

        let working_dir = match &self.working_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().map_err(|source| NotFound {
                name: name.to_string(),
                reason: format!("failed to read current working directory: {}", source),
            })?,
        };
        let search_path = self
            .search_path
            .clone()
            .or_else(|| std::env::var_os("PATH"));

        which::which_in(name, search_path, &working_dir).map_err(|source| NotFound {
            name: name.to_string(),
            reason: source.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::SearchPathLocator;
    use crate::modules::traits::ExecutableLocator;

    #[test]
    fn blank_name_is_not_found() {
        let error = SearchPathLocator::new()
            .locate("   ")
            .expect_err("blank name should fail");
        assert_eq!(error.reason, "no executable name was given");
    }

    #[test]
    fn unknown_name_is_not_found_on_empty_search_path() {
        let temp = tempfile::TempDir::new().expect("tempdir should be created");
        let locator = SearchPathLocator::new()
            .with_search_path(temp.path())
            .with_working_dir(temp.path());

        let error = locator
            .locate("PipelineRunner")
            .expect_err("lookup should fail");
        assert_eq!(error.name, "PipelineRunner");
    }

    #[cfg(unix)]
    mod unix {
        use super::super::SearchPathLocator;
        use crate::modules::traits::ExecutableLocator;
        use std::ffi::OsStr;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use std::path::{Path, PathBuf};
        use tempfile::TempDir;

        fn write_script(path: &Path, mode: u32) -> PathBuf {
            fs::write(path, "#!/bin/sh\nexit 0\n").expect("script should be written");
            fs::set_permissions(path, fs::Permissions::from_mode(mode))
                .expect("permissions should be set");
            path.to_path_buf()
        }

        #[test]
        fn absolute_path_is_returned_unchanged_regardless_of_search_path() {
            let temp = TempDir::new().expect("tempdir should be created");
            let other = TempDir::new().expect("tempdir should be created");
            let script = write_script(&temp.path().join("PipelineRunner"), 0o755);
            write_script(&other.path().join("PipelineRunner"), 0o755);

            for search_path in [other.path().as_os_str(), OsStr::new("")] {
                let located = SearchPathLocator::new()
                    .with_search_path(search_path)
                    .locate(script.to_str().expect("utf-8 path"))
                    .expect("absolute path should resolve");
                assert_eq!(located, script);
            }
        }

        #[test]
        fn bare_name_is_found_on_search_path() {
            let temp = TempDir::new().expect("tempdir should be created");
            let bin_dir = temp.path().join("bin");
            fs::create_dir_all(&bin_dir).expect("bin dir should be created");
            let script = write_script(&bin_dir.join("PipelineRunner"), 0o755);

            let located = SearchPathLocator::new()
                .with_search_path(&bin_dir)
                .with_working_dir(temp.path())
                .locate("PipelineRunner")
                .expect("bare name should resolve");
            assert_eq!(located, script);
        }

        #[test]
        fn relative_path_resolves_against_working_dir() {
            let temp = TempDir::new().expect("tempdir should be created");
            fs::create_dir_all(temp.path().join("bin")).expect("bin dir should be created");
            let script = write_script(&temp.path().join("bin/PipelineRunner"), 0o755);

            let located = SearchPathLocator::new()
                .with_search_path("")
                .with_working_dir(temp.path())
                .locate("bin/PipelineRunner")
                .expect("relative path should resolve");
            assert_eq!(
                fs::canonicalize(located).expect("located path should exist"),
                fs::canonicalize(script).expect("script should exist")
            );
        }

        #[test]
        fn non_executable_file_is_rejected() {
            let temp = TempDir::new().expect("tempdir should be created");
            let script = write_script(&temp.path().join("PipelineRunner"), 0o644);

            let result = SearchPathLocator::new()
                .with_search_path("")
                .locate(script.to_str().expect("utf-8 path"));
            assert!(result.is_err());
        }
    }
}
