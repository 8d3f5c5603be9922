use super::CliError;
use super::helpers::*;
use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use zoning_core::domain::{ArtifactNotFound, FailureReason, PipelineOutcome};
use zoning_core::modules::{
    JobDescriptionBuilder, OrchestratorOptions, OutputResolver, PipelineOrchestrator,
    ProcessRunner, SearchPathLocator, TemplateDocument,
};

const DEFAULT_TEMPLATE: &str = "pipelines/DREAM3D_Phase1_Pipeline.json";

#[derive(clap::Args)]
pub(super) struct RunArgs {
    /// Parameter file (JSON)
    #[arg(long)]
    params: PathBuf,

    /// Pipeline template
    #[arg(long, default_value = DEFAULT_TEMPLATE)]
    template: PathBuf,

    /// Pipeline runner name or path; overrides the parameter file
    #[arg(long)]
    executable: Option<String>,

    /// Kill the pipeline runner after this many seconds
    #[arg(long, value_name = "SECONDS")]
    timeout_secs: Option<u64>,

    /// Leave the rendered job description on disk
    #[arg(long)]
    keep_job_file: bool,

    /// Directory for the rendered job description
    #[arg(long)]
    job_dir: Option<PathBuf>,
}

#[derive(clap::Args)]
pub(super) struct RenderArgs {
    /// Parameter file (JSON)
    #[arg(long)]
    params: PathBuf,

    /// Pipeline template
    #[arg(long, default_value = DEFAULT_TEMPLATE)]
    template: PathBuf,

    /// Write the job description here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(clap::Args)]
pub(super) struct InspectArgs {
    /// XDMF artifact, or the declared .dream3d output next to it
    path: PathBuf,
}

pub(super) fn run_pipeline_command(args: RunArgs) -> Result<i32, CliError> {
    let working_dir = current_working_dir()?;
    let params = load_parameter_set(&resolve_cli_path(&working_dir, &args.params))?;
    let template_path = resolve_cli_path(&working_dir, &args.template);
    let executable = args
        .executable
        .unwrap_or_else(|| params.executable_path.clone());

    let job_dir = args
        .job_dir
        .map(|dir| resolve_cli_path(&working_dir, &dir));
    if let Some(dir) = &job_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create job directory '{}'", dir.display()))?;
    }

    let runner = ProcessRunner::new().with_timeout(args.timeout_secs.map(Duration::from_secs));
    let orchestrator = PipelineOrchestrator::new(
        SearchPathLocator::new(),
        runner,
        OutputResolver::default(),
    )
    .with_options(OrchestratorOptions {
        keep_job_file: args.keep_job_file,
        job_dir,
    });

    println!(
        "Running {} with {} zone(s)...",
        executable,
        params.zone_count()
    );
    match orchestrator.execute(&params, &template_path, &executable) {
        PipelineOutcome::Success(handle) => {
            println!("Artifact: {}", handle.path.display());
            println!(
                "Dataset: {} ({}, index {} of {})",
                handle.dataset_name().unwrap_or_default(),
                handle.kind,
                handle.dataset_index,
                handle.datasets.len()
            );
            Ok(0)
        }
        PipelineOutcome::Failure(reason) => Err(CliError::Pipeline(reason)),
    }
}

pub(super) fn run_render_command(args: RenderArgs) -> Result<i32, CliError> {
    let working_dir = current_working_dir()?;
    let params = load_parameter_set(&resolve_cli_path(&working_dir, &args.params))?;
    params.validate().map_err(FailureReason::from)?;

    let template = TemplateDocument::load(&resolve_cli_path(&working_dir, &args.template))
        .map_err(FailureReason::from)?;
    let job = JobDescriptionBuilder::new()
        .build(&template, &params)
        .map_err(FailureReason::from)?;
    let rendered = job.to_pretty_json();

    match args.output {
        Some(output) => {
            let output = resolve_cli_path(&working_dir, &output);
            write_rendered(&output, &rendered)?;
            println!(
                "Wrote job description with {} zone(s) to {}",
                job.zone_count(),
                output.display()
            );
        }
        None => println!("{}", rendered),
    }
    Ok(0)
}

pub(super) fn run_inspect_command(args: InspectArgs) -> Result<i32, CliError> {
    let working_dir = current_working_dir()?;
    let resolver = OutputResolver::default();
    let path = resolve_cli_path(&working_dir, &args.path);
    let artifact = if path.extension().is_some_and(|ext| ext == "xdmf") {
        path
    } else {
        resolver.artifact_path(&path)
    };

    let datasets = resolver
        .list_datasets(&artifact)
        .map_err(FailureReason::from)?;
    println!("{}", artifact.display());
    for (index, name) in datasets.iter().enumerate() {
        let marker = if name == resolver.dataset() { "*" } else { " " };
        println!("{} {:>3}  {}", marker, index, name);
    }

    if datasets.iter().any(|name| name == resolver.dataset()) {
        return Ok(0);
    }
    Err(FailureReason::from(ArtifactNotFound::MissingDataset {
        path: artifact,
        expected: resolver.dataset().to_string(),
        found: datasets,
    })
    .into())
}

fn write_rendered(output: &Path, rendered: &str) -> Result<(), CliError> {
    if let Some(parent) = output.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| {
            format!("failed to create output directory '{}'", parent.display())
        })?;
    }
    fs::write(output, rendered)
        .with_context(|| format!("failed to write job description '{}'", output.display()))?;
    Ok(())
}
