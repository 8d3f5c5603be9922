pub mod job;
pub mod locator;
pub mod orchestrator;
pub mod output;
pub mod params;
pub mod runner;

mod traits;

pub use job::{JobDescription, JobDescriptionBuilder, JobFile, TemplateDocument};
pub use locator::SearchPathLocator;
pub use orchestrator::{OrchestratorOptions, PipelineOrchestrator};
pub use output::{OutputResolver, VOLUME_DATA_CONTAINER};
pub use params::{DEFAULT_PIPELINE_EXECUTABLE, ParameterFile, ZoneStatisticEntry};
pub use runner::ProcessRunner;
pub use traits::{ExecutableLocator, JobRunner};
