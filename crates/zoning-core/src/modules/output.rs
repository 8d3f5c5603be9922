use crate::domain::{ArtifactHandle, ArtifactKind, ArtifactNotFound};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_ARTIFACT_EXTENSION: &str = "xdmf";
pub const VOLUME_DATA_CONTAINER: &str = "VolumeDataContainer";

/// Finds the XDMF companion Dream3D writes next to its `.dream3d` output and
/// picks the volume dataset out of it.
#[derive(Debug, Clone)]
pub struct OutputResolver {
    extension: String,
    dataset: String,
}

impl Default for OutputResolver {
    fn default() -> Self {
        Self::new(DEFAULT_ARTIFACT_EXTENSION, VOLUME_DATA_CONTAINER)
    }
}

impl OutputResolver {
    pub fn new(extension: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            dataset: dataset.into(),
        }
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    /// `out/result.dream3d` -> `out/result.xdmf`
    pub fn artifact_path(&self, declared_output: &Path) -> PathBuf {
        declared_output.with_extension(&self.extension)
    }

    pub fn resolve(&self, declared_output: &Path) -> Result<ArtifactHandle, ArtifactNotFound> {
        let path = self.artifact_path(declared_output);
        let datasets = self.list_datasets(&path)?;

        let Some(dataset_index) = datasets.iter().position(|name| *name == self.dataset) else {
            return Err(ArtifactNotFound::MissingDataset {
                path,
                expected: self.dataset.clone(),
                found: datasets,
            });
        };

        debug!(
            path = %path.display(),
            dataset = %self.dataset,
            index = dataset_index,
            "resolved output dataset"
        );
        Ok(ArtifactHandle {
            path,
            kind: ArtifactKind::VolumeDataset,
            valid: true,
            dataset_index,
            datasets,
        })
    }

    /// Removes an artifact left by an earlier run so only output written
    /// by the next run can resolve. An absent artifact is fine.
    pub fn discard_previous(&self, declared_output: &Path) -> Result<(), ArtifactNotFound> {
        let path = self.artifact_path(declared_output);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "removed previous output artifact");
                Ok(())
            }
            Err(source) if source.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ArtifactNotFound::Stale { path, source }),
        }
    }

    /// Names of the top-level grids (direct children of `Domain`) in document order.
    pub fn list_datasets(&self, path: &Path) -> Result<Vec<String>, ArtifactNotFound> {
        if !path.is_file() {
            return Err(ArtifactNotFound::Missing {
                path: path.to_path_buf(),
            });
        }
        let content = fs::read_to_string(path).map_err(|source| ArtifactNotFound::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        top_level_grid_names(&content).map_err(|message| ArtifactNotFound::Malformed {
            path: path.to_path_buf(),
            message,
        })
    }
}

fn top_level_grid_names(content: &str) -> Result<Vec<String>, String> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut saw_root = false;
    let mut grids = Vec::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|error| format!("{} at byte {}", error, reader.buffer_position()))?;
        match event {
            Event::Start(element) => {
                let name = visit_element(&element, &stack, &mut saw_root, &mut grids)?;
                stack.push(name);
            }
            Event::Empty(element) => {
                visit_element(&element, &stack, &mut saw_root, &mut grids)?;
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err("document has no root element".to_string());
    }
    if let Some(open) = stack.last() {
        return Err(format!("document ends inside unclosed element '{}'", open));
    }
    Ok(grids)
}

fn visit_element(
    element: &BytesStart<'_>,
    stack: &[String],
    saw_root: &mut bool,
    grids: &mut Vec<String>,
) -> Result<String, String> {
    let name = String::from_utf8_lossy(element.local_name().as_ref()).into_owned();

    if stack.is_empty() {
        if *saw_root {
            return Err(format!("unexpected second root element '{}'", name));
        }
        if name != "Xdmf" {
            return Err(format!("root element is '{}', expected 'Xdmf'", name));
        }
        *saw_root = true;
    }

    let parent = stack.last().map(String::as_str);
    if name == "Grid" && parent == Some("Domain") {
        let grid_name = element
            .try_get_attribute("Name")
            .map_err(|error| error.to_string())?
            .map(|attribute| {
                attribute
                    .unescape_value()
                    .map(|value| value.into_owned())
                    .map_err(|error| error.to_string())
            })
            .transpose()?
            .unwrap_or_default();
        grids.push(grid_name);
    }
    Ok(name)
}
