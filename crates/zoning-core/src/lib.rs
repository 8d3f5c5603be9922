//! Orchestration of Dream3D zoning jobs for imported DEFORM models.
//!
//! A [`domain::ParameterSet`] is rendered into a `PipelineRunner` job
//! description, the runner is executed as a child process, and the volume
//! dataset it writes is located and handed back as a
//! [`domain::ArtifactHandle`].

pub mod domain;
pub mod modules;
