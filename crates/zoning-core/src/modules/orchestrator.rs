use super::job::{JobDescriptionBuilder, JobFile, TemplateDocument};
use super::locator::SearchPathLocator;
use super::output::OutputResolver;
use super::runner::ProcessRunner;
use super::traits::{ExecutableLocator, JobRunner};
use crate::domain::{ArtifactHandle, FailureReason, ParameterSet, PipelineOutcome};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct OrchestratorOptions {
    /// Leave the rendered job description on disk for debugging.
    pub keep_job_file: bool,
    /// Directory for the job description; the system temp dir when unset.
    pub job_dir: Option<PathBuf>,
}

/// Runs validate -> locate -> render -> clear old artifact -> write -> run ->
/// resolve, stopping at the first failure. The job description file never
/// outlives the call unless [`OrchestratorOptions::keep_job_file`] is set.
#[derive(Debug, Clone)]
pub struct PipelineOrchestrator<L = SearchPathLocator, R = ProcessRunner> {
    locator: L,
    runner: R,
    builder: JobDescriptionBuilder,
    resolver: OutputResolver,
    options: OrchestratorOptions,
}

impl Default for PipelineOrchestrator {
    fn default() -> Self {
        Self::new(
            SearchPathLocator::new(),
            ProcessRunner::new(),
            OutputResolver::default(),
        )
    }
}

impl<L, R> PipelineOrchestrator<L, R>
where
    L: ExecutableLocator,
    R: JobRunner,
{
    pub fn new(locator: L, runner: R, resolver: OutputResolver) -> Self {
        Self {
            locator,
            runner,
            builder: JobDescriptionBuilder::new(),
            resolver,
            options: OrchestratorOptions::default(),
        }
    }

    pub fn with_options(mut self, options: OrchestratorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &OrchestratorOptions {
        &self.options
    }

    pub fn execute(
        &self,
        params: &ParameterSet,
        template_path: &Path,
        executable: &str,
    ) -> PipelineOutcome {
        self.try_execute(params, template_path, executable).into()
    }

    fn try_execute(
        &self,
        params: &ParameterSet,
        template_path: &Path,
        executable: &str,
    ) -> Result<ArtifactHandle, FailureReason> {
        params.validate()?;
        let executable = self.locator.locate(executable)?;
        info!(executable = %executable.display(), "resolved pipeline executable");

        let template = TemplateDocument::load(template_path)?;
        self.run_template(params, &template, &executable)
    }

    /// Same as [`Self::execute`] for a template that is already in memory and
    /// an executable that is already resolved.
    pub fn execute_with_template(
        &self,
        params: &ParameterSet,
        template: &TemplateDocument,
        executable: &Path,
    ) -> PipelineOutcome {
        params
            .validate()
            .map_err(FailureReason::from)
            .and_then(|()| self.run_template(params, template, executable))
            .into()
    }

    fn run_template(
        &self,
        params: &ParameterSet,
        template: &TemplateDocument,
        executable: &Path,
    ) -> Result<ArtifactHandle, FailureReason> {
        let job = self.builder.build(template, params)?;
        info!(zones = job.zone_count(), "rendered job description");

        self.resolver.discard_previous(&params.output_file)?;

        let job_file = job
            .write_scoped(self.options.job_dir.as_deref())
            .map_err(FailureReason::JobFile)?;
        let run = self.runner.run(executable, job_file.path());
        self.release(job_file);
        let result = run?;

        if !result.success() {
            // Some Dream3D filters exit non-zero on warnings; the artifact decides.
            warn!(
                status = %result.status_text(),
                stderr = %result.stderr.trim(),
                "pipeline runner reported a non-zero status"
            );
        }

        let handle = self.resolver.resolve(&params.output_file)?;
        info!(
            artifact = %handle.path.display(),
            dataset = self.resolver.dataset(),
            "pipeline completed"
        );
        Ok(handle)
    }

    fn release(&self, job_file: JobFile) {
        if !self.options.keep_job_file {
            return;
        }
        match job_file.keep() {
            Ok(path) => info!(path = %path.display(), "kept job description"),
            Err(error) => warn!(%error, "failed to keep job description"),
        }
    }
}
