pub mod errors;

pub use errors::{
    ArtifactNotFound, ErrorCategory, ExitClassification, FailureReason, InputRole, LaunchError,
    NotFound, RunError, TemplateError, TemplateResult, ValidationError, ValidationResult,
};

use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

/// Microstructure statistics for one zone. Order in [`ParameterSet::zone_stats`]
/// is the zone index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneStatistic {
    pub mu: f64,
    pub sigma: f64,
    pub min_cutoff: f64,
    pub max_cutoff: f64,
}

impl ZoneStatistic {
    pub const FIELD_NAMES: [&'static str; 4] = ["mu", "sigma", "minCutoff", "maxCutoff"];

    pub const fn new(mu: f64, sigma: f64, min_cutoff: f64, max_cutoff: f64) -> Self {
        Self {
            mu,
            sigma,
            min_cutoff,
            max_cutoff,
        }
    }

    pub const fn values(&self) -> [f64; 4] {
        [self.mu, self.sigma, self.min_cutoff, self.max_cutoff]
    }
}

/// Inputs of one import job.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    pub point_file: PathBuf,
    pub element_file: PathBuf,
    pub timestep: u32,
    pub attribute_name: String,
    pub zone_stats: Vec<ZoneStatistic>,
    pub output_file: PathBuf,
    pub executable_path: String,
}

impl ParameterSet {
    pub fn zone_count(&self) -> usize {
        self.zone_stats.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn status_text(&self) -> String {
        self.exit_code.map_or_else(
            || "terminated by signal".to_string(),
            |code| format!("exit code {}", code),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    VolumeDataset,
}

impl ArtifactKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::VolumeDataset => "volume-dataset",
        }
    }
}

impl Display for ArtifactKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// A located output dataset, handed to whatever imports it next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactHandle {
    pub path: PathBuf,
    pub kind: ArtifactKind,
    pub valid: bool,
    pub dataset_index: usize,
    pub datasets: Vec<String>,
}

impl ArtifactHandle {
    pub fn dataset_name(&self) -> Option<&str> {
        self.datasets.get(self.dataset_index).map(String::as_str)
    }
}

#[derive(Debug)]
pub enum PipelineOutcome {
    Success(ArtifactHandle),
    Failure(FailureReason),
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn into_result(self) -> Result<ArtifactHandle, FailureReason> {
        match self {
            Self::Success(handle) => Ok(handle),
            Self::Failure(reason) => Err(reason),
        }
    }
}

impl From<Result<ArtifactHandle, FailureReason>> for PipelineOutcome {
    fn from(result: Result<ArtifactHandle, FailureReason>) -> Self {
        match result {
            Ok(handle) => Self::Success(handle),
            Err(reason) => Self::Failure(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ArtifactHandle, ArtifactKind, ExecutionResult, FailureReason, PipelineOutcome,
        ValidationError, ZoneStatistic,
    };
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn artifact_kind_renders_volume_dataset_tag() {
        assert_eq!(ArtifactKind::VolumeDataset.to_string(), "volume-dataset");
    }

    #[test]
    fn execution_result_distinguishes_signal_termination() {
        let result = ExecutionResult {
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            elapsed: Duration::from_millis(3),
        };
        assert!(!result.success());
        assert_eq!(result.status_text(), "terminated by signal");
    }

    #[test]
    fn outcome_converts_to_result() {
        let handle = ArtifactHandle {
            path: PathBuf::from("out.xdmf"),
            kind: ArtifactKind::VolumeDataset,
            valid: true,
            dataset_index: 1,
            datasets: vec!["Stats".to_string(), "VolumeDataContainer".to_string()],
        };
        assert_eq!(handle.dataset_name(), Some("VolumeDataContainer"));

        let outcome = PipelineOutcome::from(Ok(handle.clone()));
        assert!(outcome.is_success());
        assert_eq!(outcome.into_result().ok(), Some(handle));

        let failure = PipelineOutcome::from(Err(FailureReason::from(
            ValidationError::EmptyStatistics,
        )));
        assert!(!failure.is_success());
    }

    #[test]
    fn zone_statistic_values_follow_field_order() {
        let stat = ZoneStatistic::new(1.0, 0.1, 0.0, 2.0);
        assert_eq!(stat.values(), [1.0, 0.1, 0.0, 2.0]);
        assert_eq!(ZoneStatistic::FIELD_NAMES[2], "minCutoff");
    }
}
