use super::traits::JobRunner;
use crate::domain::{ExecutionResult, LaunchError, RunError};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Launches the pipeline executable as `<executable> -p <job>` and blocks
/// until it exits.
///
/// stdout and stderr go to anonymous temp files and are read back after exit.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
    poll_interval: Duration,
    working_dir: Option<PathBuf>,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self {
            timeout: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            working_dir: None,
        }
    }
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kills the child and reports [`RunError::Timeout`] once `timeout`
    /// elapses. `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(Duration::from_millis(1));
        self
    }

    pub fn with_working_dir(mut self, working_dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(working_dir.into());
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl JobRunner for ProcessRunner {
    fn run(&self, executable: &Path, job_path: &Path) -> Result<ExecutionResult, RunError> {
        let launch_error = |source: std::io::Error| LaunchError {
            executable: executable.to_path_buf(),
            source,
        };

        let job_path = std::path::absolute(job_path).map_err(launch_error)?;
        let mut stdout_capture = tempfile::tempfile().map_err(launch_error)?;
        let mut stderr_capture = tempfile::tempfile().map_err(launch_error)?;

        let mut command = Command::new(executable);
        command
            .arg("-p")
            .arg(&job_path)
            .stdin(Stdio::null())
            .stdout(Stdio::from(
                stdout_capture.try_clone().map_err(launch_error)?,
            ))
            .stderr(Stdio::from(
                stderr_capture.try_clone().map_err(launch_error)?,
            ));
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        info!(
            executable = %executable.display(),
            job = %job_path.display(),
            "launching pipeline runner"
        );
        let started = Instant::now();
        let mut child = command.spawn().map_err(launch_error)?;

        let status = match self.timeout {
            None => child.wait().map_err(launch_error)?,
            Some(limit) => loop {
                if let Some(status) = child.try_wait().map_err(launch_error)? {
                    break status;
                }
                let elapsed = started.elapsed();
                if elapsed >= limit {
                    warn!(
                        pid = child.id(),
                        limit_secs = limit.as_secs_f64(),
                        "pipeline runner timed out; killing it"
                    );
                    if let Err(error) = child.kill() {
                        warn!(pid = child.id(), %error, "failed to kill pipeline runner");
                    }
                    if let Err(error) = child.wait() {
                        warn!(pid = child.id(), %error, "failed to reap pipeline runner");
                    }
                    return Err(RunError::Timeout { limit });
                }
                thread::sleep(self.poll_interval.min(limit - elapsed));
            },
        };

        let result = ExecutionResult {
            exit_code: status.code(),
            stdout: read_capture(&mut stdout_capture, "stdout"),
            stderr: read_capture(&mut stderr_capture, "stderr"),
            elapsed: started.elapsed(),
        };
        debug!(
            status = %result.status_text(),
            elapsed_ms = result.elapsed.as_millis() as u64,
            stdout = %result.stdout,
            stderr = %result.stderr,
            "pipeline runner finished"
        );
        Ok(result)
    }
}

fn read_capture(file: &mut File, stream: &'static str) -> String {
    let mut bytes = Vec::new();
    let read = file
        .seek(SeekFrom::Start(0))
        .and_then(|_| file.read_to_end(&mut bytes));
    if let Err(source) = read {
        warn!(stream, error = %source, "failed to read captured output");
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::ProcessRunner;
    use crate::domain::RunError;
    use crate::modules::traits::JobRunner;
    use std::path::Path;

    #[test]
    fn missing_executable_is_a_launch_error() {
        let error = ProcessRunner::new()
            .run(
                Path::new("/nonexistent/dream3d/PipelineRunner"),
                Path::new("/tmp/job.json"),
            )
            .expect_err("launch should fail");
        match error {
            RunError::Launch(launch) => {
                assert_eq!(
                    launch.executable,
                    Path::new("/nonexistent/dream3d/PipelineRunner")
                );
                assert_eq!(launch.source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected launch error, got {other:?}"),
        }
    }

    #[cfg(unix)]
    mod unix {
        use super::super::ProcessRunner;
        use crate::domain::RunError;
        use crate::modules::traits::JobRunner;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use std::path::{Path, PathBuf};
        use std::time::{Duration, Instant};
        use tempfile::TempDir;

        fn write_stub(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("PipelineRunner");
            fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("stub should be written");
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
                .expect("stub should be executable");
            path
        }

        #[test]
        fn passes_job_flag_and_captures_output_and_exit_code() {
            let temp = TempDir::new().expect("tempdir should be created");
            let stub = write_stub(
                temp.path(),
                "echo \"args: $1 $2\"\necho 'filter warning' >&2\nexit 3",
            );
            let job = temp.path().join("job.json");

            let result = ProcessRunner::new()
                .run(&stub, &job)
                .expect("non-zero exit is not a runner error");

            assert_eq!(result.exit_code, Some(3));
            assert!(!result.success());
            assert_eq!(result.stdout.trim(), format!("args: -p {}", job.display()));
            assert_eq!(result.stderr.trim(), "filter warning");
        }

        #[test]
        fn relative_job_path_is_passed_as_absolute() {
            let temp = TempDir::new().expect("tempdir should be created");
            let stub = write_stub(temp.path(), "echo \"$2\"");

            let result = ProcessRunner::new()
                .with_timeout(Some(Duration::from_secs(30)))
                .run(&stub, Path::new("pipeline-job.json"))
                .expect("stub should run");

            assert!(result.success());
            let passed = PathBuf::from(result.stdout.trim());
            assert!(passed.is_absolute());
            assert!(passed.ends_with("pipeline-job.json"));
        }

        #[test]
        fn hung_process_is_killed_after_timeout() {
            let temp = TempDir::new().expect("tempdir should be created");
            let stub = write_stub(temp.path(), "exec sleep 30");

            let started = Instant::now();
            let error = ProcessRunner::new()
                .with_timeout(Some(Duration::from_millis(200)))
                .with_poll_interval(Duration::from_millis(10))
                .run(&stub, &temp.path().join("job.json"))
                .expect_err("runner should time out");

            assert!(matches!(error, RunError::Timeout { limit } if limit == Duration::from_millis(200)));
            assert!(started.elapsed() < Duration::from_secs(10));
        }

        #[test]
        fn working_dir_is_applied_to_child() {
            let temp = TempDir::new().expect("tempdir should be created");
            let work = temp.path().join("work");
            fs::create_dir_all(&work).expect("work dir should be created");
            let stub = write_stub(temp.path(), "pwd");

            let result = ProcessRunner::new()
                .with_working_dir(&work)
                .run(&stub, &temp.path().join("job.json"))
                .expect("stub should run");

            assert_eq!(
                fs::canonicalize(result.stdout.trim()).expect("pwd should exist"),
                fs::canonicalize(&work).expect("work dir should exist")
            );
        }
    }
}
