use crate::domain::{InputRole, ParameterSet, ValidationError, ValidationResult, ZoneStatistic};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_PIPELINE_EXECUTABLE: &str = "PipelineRunner";

impl ParameterSet {
    /// Checks the inputs before anything is rendered or launched.
    ///
    /// Statistics are checked before the filesystem so an empty zone list is
    /// reported as such whatever state the input files are in.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.zone_stats.is_empty() {
            return Err(ValidationError::EmptyStatistics);
        }

        for (zone, stat) in self.zone_stats.iter().enumerate() {
            if let Some(position) = stat.values().iter().position(|value| !value.is_finite()) {
                return Err(ValidationError::MalformedStatistic {
                    zone,
                    field: ZoneStatistic::FIELD_NAMES[position],
                });
            }
        }

        if self.attribute_name.trim().is_empty() {
            return Err(ValidationError::MissingAttribute);
        }

        check_readable(InputRole::PointFile, &self.point_file)?;
        check_readable(InputRole::ElementFile, &self.element_file)?;
        Ok(())
    }
}

fn check_readable(role: InputRole, path: &Path) -> ValidationResult<()> {
    let readable = fs::metadata(path).is_ok_and(|metadata| metadata.is_file())
        && fs::File::open(path).is_ok();
    if readable {
        Ok(())
    } else {
        Err(ValidationError::MissingFile {
            role,
            path: path.to_path_buf(),
        })
    }
}

/// On-disk JSON form of a [`ParameterSet`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterFile {
    pub point_file: PathBuf,
    pub element_file: PathBuf,
    #[serde(default)]
    pub timestep: u32,
    pub attribute: String,
    #[serde(default)]
    pub zone_stats: Vec<ZoneStatisticEntry>,
    pub output_file: PathBuf,
    #[serde(default = "default_pipeline_executable")]
    pub pipeline_executable: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneStatisticEntry {
    pub mu: Option<f64>,
    pub sigma: Option<f64>,
    pub min_cutoff: Option<f64>,
    pub max_cutoff: Option<f64>,
}

fn default_pipeline_executable() -> String {
    DEFAULT_PIPELINE_EXECUTABLE.to_string()
}

impl ParameterFile {
    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    /// Converts into a [`ParameterSet`], resolving relative paths against
    /// `base_dir`. The result still needs [`ParameterSet::validate`].
    pub fn into_parameter_set(self, base_dir: &Path) -> ValidationResult<ParameterSet> {
        let zone_stats = self
            .zone_stats
            .iter()
            .enumerate()
            .map(|(zone, entry)| entry.to_statistic(zone))
            .collect::<ValidationResult<Vec<_>>>()?;

        Ok(ParameterSet {
            point_file: resolve_relative(base_dir, &self.point_file),
            element_file: resolve_relative(base_dir, &self.element_file),
            timestep: self.timestep,
            attribute_name: self.attribute,
            zone_stats,
            output_file: resolve_relative(base_dir, &self.output_file),
            executable_path: self.pipeline_executable,
        })
    }
}

impl ZoneStatisticEntry {
    fn to_statistic(&self, zone: usize) -> ValidationResult<ZoneStatistic> {
        let fields = [self.mu, self.sigma, self.min_cutoff, self.max_cutoff];
        match fields {
            [Some(mu), Some(sigma), Some(min_cutoff), Some(max_cutoff)] => {
                Ok(ZoneStatistic::new(mu, sigma, min_cutoff, max_cutoff))
            }
            _ => {
                let position = fields.iter().position(Option::is_none).unwrap_or(0);
                Err(ValidationError::MalformedStatistic {
                    zone,
                    field: ZoneStatistic::FIELD_NAMES[position],
                })
            }
        }
    }
}

pub fn resolve_relative(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
