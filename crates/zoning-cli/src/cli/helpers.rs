use super::CliError;
use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use zoning_core::domain::{FailureReason, ParameterSet};
use zoning_core::modules::ParameterFile;

pub(super) fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    // A second init (unit tests call `run` repeatedly) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub(super) fn current_working_dir() -> Result<PathBuf, CliError> {
    std::env::current_dir()
        .context("failed to read current working directory")
        .map_err(CliError::from)
}

pub(super) fn resolve_cli_path(working_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        working_dir.join(path)
    }
}

/// Reads a JSON parameter file. Relative paths inside it are taken against
/// the file's own directory.
pub(super) fn load_parameter_set(params_path: &Path) -> Result<ParameterSet, CliError> {
    let content = fs::read_to_string(params_path).with_context(|| {
        format!("failed to read parameter file '{}'", params_path.display())
    })?;
    let file = ParameterFile::from_json(&content).with_context(|| {
        format!("failed to parse parameter file '{}'", params_path.display())
    })?;

    let base_dir = params_path.parent().unwrap_or_else(|| Path::new("."));
    let params = file
        .into_parameter_set(base_dir)
        .map_err(|error| CliError::Pipeline(FailureReason::from(error)))?;
    debug!(
        path = %params_path.display(),
        zones = params.zone_count(),
        attribute = %params.attribute_name,
        "loaded parameter file"
    );
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::{load_parameter_set, resolve_cli_path};
    use crate::cli::CliError;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;
    use zoning_core::domain::{FailureReason, ValidationError};

    #[test]
    fn resolve_cli_path_keeps_absolute_paths() {
        let working_dir = Path::new("/work");
        assert_eq!(
            resolve_cli_path(working_dir, Path::new("/abs/params.json")),
            PathBuf::from("/abs/params.json")
        );
        assert_eq!(
            resolve_cli_path(working_dir, Path::new("params.json")),
            PathBuf::from("/work/params.json")
        );
    }

    #[test]
    fn parameter_paths_are_relative_to_the_parameter_file() {
        let temp = TempDir::new().expect("tempdir should be created");
        let params_path = temp.path().join("params.json");
        fs::write(
            &params_path,
            r#"{
                "pointFile": "deform/points.dat",
                "elementFile": "deform/elements.dat",
                "attribute": "Temperature",
                "zoneStats": [{ "mu": 2.3, "sigma": 0.4, "minCutoff": 5, "maxCutoff": 5 }],
                "outputFile": "out/volume.dream3d"
            }"#,
        )
        .expect("params should be written");

        let params = load_parameter_set(&params_path).expect("params should load");
        assert_eq!(params.point_file, temp.path().join("deform/points.dat"));
        assert_eq!(params.output_file, temp.path().join("out/volume.dream3d"));
        assert_eq!(params.timestep, 0);
        assert_eq!(params.executable_path, "PipelineRunner");
    }

    #[test]
    fn missing_zone_field_is_a_pipeline_validation_error() {
        let temp = TempDir::new().expect("tempdir should be created");
        let params_path = temp.path().join("params.json");
        fs::write(
            &params_path,
            r#"{
                "pointFile": "p.dat",
                "elementFile": "e.dat",
                "attribute": "Strain",
                "zoneStats": [{ "mu": 2.3, "minCutoff": 5, "maxCutoff": 5 }],
                "outputFile": "out.dream3d"
            }"#,
        )
        .expect("params should be written");

        let error = load_parameter_set(&params_path).expect_err("sigma is missing");
        assert!(matches!(
            error,
            CliError::Pipeline(FailureReason::Validation(
                ValidationError::MalformedStatistic { zone: 0, field: "sigma" }
            ))
        ));
    }

    #[test]
    fn unreadable_parameter_file_is_internal() {
        let temp = TempDir::new().expect("tempdir should be created");
        let error = load_parameter_set(&temp.path().join("absent.json"))
            .expect_err("file does not exist");
        assert!(matches!(error, CliError::Internal(_)));
        assert!(format!("{error:#}").contains("failed to read parameter file"));
    }
}
