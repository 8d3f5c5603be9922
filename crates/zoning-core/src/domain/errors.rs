use std::path::PathBuf;
use std::time::Duration;

pub type ValidationResult<T> = Result<T, ValidationError>;
pub type TemplateResult<T> = Result<T, TemplateError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Success,
    InputValidationError,
    IoSystemError,
    ComputationError,
    InternalError,
}

impl ErrorCategory {
    pub const fn exit_classification(self) -> ExitClassification {
        match self {
            Self::Success => ExitClassification {
                exit_code: 0,
                rust_category: "Success",
                class: "SUCCESS",
            },
            Self::InputValidationError => ExitClassification {
                exit_code: 2,
                rust_category: "InputValidationError",
                class: "INPUT_FATAL",
            },
            Self::IoSystemError => ExitClassification {
                exit_code: 3,
                rust_category: "IoSystemError",
                class: "IO_FATAL",
            },
            Self::ComputationError => ExitClassification {
                exit_code: 4,
                rust_category: "ComputationError",
                class: "RUN_FATAL",
            },
            Self::InternalError => ExitClassification {
                exit_code: 5,
                rust_category: "InternalError",
                class: "SYS_FATAL",
            },
        }
    }

    pub const fn exit_code(self) -> i32 {
        self.exit_classification().exit_code
    }

    pub const fn rust_category(self) -> &'static str {
        self.exit_classification().rust_category
    }

    pub const fn is_fatal(self) -> bool {
        !matches!(self, Self::Success)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitClassification {
    pub exit_code: i32,
    pub rust_category: &'static str,
    pub class: &'static str,
}

/// Which of the two DEFORM inputs a file check refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputRole {
    PointFile,
    ElementFile,
}

impl std::fmt::Display for InputRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PointFile => f.write_str("point file"),
            Self::ElementFile => f.write_str("element file"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("{role} '{}' does not exist or is not readable", path.display())]
    MissingFile { role: InputRole, path: PathBuf },
    #[error("at least one zone statistics entry is required")]
    EmptyStatistics,
    #[error("zone {zone}: statistic '{field}' is missing or not a finite number")]
    MalformedStatistic { zone: usize, field: &'static str },
    #[error("zoning attribute name must not be blank")]
    MissingAttribute,
}

#[derive(Debug, thiserror::Error)]
#[error("cannot find executable '{name}': {reason}")]
pub struct NotFound {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("failed to read template '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("template is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("template root must be a JSON object")]
    NotAnObject,
    #[error("template does not contain the '{0}' placeholder")]
    MissingPlaceholder(&'static str),
    #[error("template contains unknown or misplaced placeholder '{0}'")]
    UnknownPlaceholder(String),
    #[error("path '{}' is not valid UTF-8 and cannot be written to a job description", .0.display())]
    NonUtf8Path(PathBuf),
    #[error("template contains more than one zone generator block")]
    DuplicateZoneGenerator,
    #[error("zone generator block must be an array element holding a JSON object")]
    MisplacedZoneGenerator,
}

#[derive(Debug, thiserror::Error)]
#[error("failed to run '{}': {source}", executable.display())]
pub struct LaunchError {
    pub executable: PathBuf,
    #[source]
    pub source: std::io::Error,
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Launch(#[from] LaunchError),
    #[error("pipeline runner exceeded the {}s time limit", limit.as_secs_f64())]
    Timeout { limit: Duration },
}

#[derive(Debug, thiserror::Error)]
pub enum ArtifactNotFound {
    #[error("expected output artifact '{}' was not produced", path.display())]
    Missing { path: PathBuf },
    #[error("failed to read output artifact '{}': {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("output artifact '{}' is not a valid XDMF document: {message}", path.display())]
    Malformed { path: PathBuf, message: String },
    #[error("failed to clear previous output artifact '{}': {source}", path.display())]
    Stale {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "output artifact '{}' has no '{expected}' dataset (found: {})",
        path.display(),
        found.join(", ")
    )]
    MissingDataset {
        path: PathBuf,
        expected: String,
        found: Vec<String>,
    },
}

/// Terminal failure of one orchestration call.
#[derive(Debug, thiserror::Error)]
pub enum FailureReason {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    ExecutableNotFound(#[from] NotFound),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("failed to write job description: {0}")]
    JobFile(#[source] std::io::Error),
    #[error(transparent)]
    Launch(LaunchError),
    #[error("pipeline runner exceeded the {}s time limit", limit.as_secs_f64())]
    Timeout { limit: Duration },
    #[error(transparent)]
    ArtifactNotFound(#[from] ArtifactNotFound),
}

impl From<RunError> for FailureReason {
    fn from(error: RunError) -> Self {
        match error {
            RunError::Launch(launch) => Self::Launch(launch),
            RunError::Timeout { limit } => Self::Timeout { limit },
        }
    }
}

impl FailureReason {
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) | Self::Template(_) => ErrorCategory::InputValidationError,
            Self::ExecutableNotFound(_) | Self::JobFile(_) | Self::Launch(_) => {
                ErrorCategory::IoSystemError
            }
            Self::Timeout { .. } | Self::ArtifactNotFound(_) => ErrorCategory::ComputationError,
        }
    }

    /// Stable diagnostic code, e.g. `INPUT.EMPTY_STATISTICS`.
    pub const fn placeholder(&self) -> &'static str {
        match self {
            Self::Validation(ValidationError::MissingFile { .. }) => "INPUT.MISSING_FILE",
            Self::Validation(ValidationError::EmptyStatistics) => "INPUT.EMPTY_STATISTICS",
            Self::Validation(ValidationError::MalformedStatistic { .. }) => {
                "INPUT.MALFORMED_STATISTIC"
            }
            Self::Validation(ValidationError::MissingAttribute) => "INPUT.MISSING_ATTRIBUTE",
            Self::ExecutableNotFound(_) => "IO.EXECUTABLE_NOT_FOUND",
            Self::Template(_) => "INPUT.TEMPLATE",
            Self::JobFile(_) => "IO.JOB_FILE",
            Self::Launch(_) => "IO.LAUNCH",
            Self::Timeout { .. } => "RUN.TIMEOUT",
            Self::ArtifactNotFound(_) => "RUN.ARTIFACT_NOT_FOUND",
        }
    }

    pub const fn exit_code(&self) -> i32 {
        self.category().exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        let severity = if self.category().is_fatal() {
            "ERROR"
        } else {
            "INFO"
        };
        format!("{}: [{}] {}", severity, self.placeholder(), self)
    }

    pub fn fatal_exit_line(&self) -> Option<String> {
        self.category()
            .is_fatal()
            .then(|| format!("FATAL EXIT CODE: {}", self.exit_code()))
    }
}
