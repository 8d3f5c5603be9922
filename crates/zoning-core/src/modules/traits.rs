use crate::domain::{ExecutionResult, NotFound, RunError};
use std::path::{Path, PathBuf};

/// Resolves a user-supplied executable name or path without running it.
pub trait ExecutableLocator {
    fn locate(&self, name_or_path: &str) -> Result<PathBuf, NotFound>;
}

/// Runs a located executable against a written job description.
pub trait JobRunner {
    fn run(&self, executable: &Path, job_path: &Path) -> Result<ExecutionResult, RunError>;
}

impl<T> ExecutableLocator for &T
where
    T: ExecutableLocator + ?Sized,
{
    fn locate(&self, name_or_path: &str) -> Result<PathBuf, NotFound> {
        (**self).locate(name_or_path)
    }
}

impl<T> JobRunner for &T
where
    T: JobRunner + ?Sized,
{
    fn run(&self, executable: &Path, job_path: &Path) -> Result<ExecutionResult, RunError> {
        (**self).run(executable, job_path)
    }
}
