//! Job description rendering for Dream3D's `PipelineRunner`.
//!
//! A template is a JSON pipeline in which some string values are
//! placeholders. Document placeholders are replaced once per occurrence:
//!
//! | token             | value                  |
//! |-------------------|------------------------|
//! | `@POINT_FILE@`    | DEFORM point file      |
//! | `@ELEMENT_FILE@`  | DEFORM element file    |
//! | `@TIMESTEP@`      | timestep (integer)     |
//! | `@ATTRIBUTE@`     | zoning attribute name  |
//! | `@OUTPUT_FILE@`   | declared output file   |
//!
//! Exactly one array element of the form `{"@ZONE_GENERATOR@": {...}}` marks
//! the zone generator. It is replaced by one copy of its body per zone, in
//! zone order, with `@MU@`, `@SIGMA@`, `@MIN_CUTOFF@`, `@MAX_CUTOFF@` and the
//! optional `@ZONE_INDEX@` filled in from that zone's statistics.

use crate::domain::{ParameterSet, TemplateError, TemplateResult, ZoneStatistic};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

pub const POINT_FILE: &str = "@POINT_FILE@";
pub const ELEMENT_FILE: &str = "@ELEMENT_FILE@";
pub const TIMESTEP: &str = "@TIMESTEP@";
pub const ATTRIBUTE: &str = "@ATTRIBUTE@";
pub const OUTPUT_FILE: &str = "@OUTPUT_FILE@";
pub const ZONE_GENERATOR: &str = "@ZONE_GENERATOR@";
pub const ZONE_INDEX: &str = "@ZONE_INDEX@";
pub const MU: &str = "@MU@";
pub const SIGMA: &str = "@SIGMA@";
pub const MIN_CUTOFF: &str = "@MIN_CUTOFF@";
pub const MAX_CUTOFF: &str = "@MAX_CUTOFF@";

const DOCUMENT_PLACEHOLDERS: [&str; 5] = [POINT_FILE, ELEMENT_FILE, TIMESTEP, ATTRIBUTE, OUTPUT_FILE];
const REQUIRED_ZONE_PLACEHOLDERS: [&str; 4] = [MU, SIGMA, MIN_CUTOFF, MAX_CUTOFF];
const ZONE_PLACEHOLDERS: [&str; 5] = [ZONE_INDEX, MU, SIGMA, MIN_CUTOFF, MAX_CUTOFF];

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateDocument {
    root: Value,
    source: Option<PathBuf>,
}

impl TemplateDocument {
    pub fn load(path: &Path) -> TemplateResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut document = Self::parse(&content)?;
        document.source = Some(path.to_path_buf());
        Ok(document)
    }

    pub fn parse(content: &str) -> TemplateResult<Self> {
        let root: Value = serde_json::from_str(content)?;
        if !root.is_object() {
            return Err(TemplateError::NotAnObject);
        }
        Ok(Self { root, source: None })
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

/// A rendered, ready-to-write pipeline document.
#[derive(Debug, Clone, PartialEq)]
pub struct JobDescription {
    document: Value,
    zone_count: usize,
}

impl JobDescription {
    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn zone_count(&self) -> usize {
        self.zone_count
    }

    pub fn to_pretty_json(&self) -> String {
        let mut rendered = serde_json::to_string_pretty(&self.document)
            .unwrap_or_else(|_| self.document.to_string());
        rendered.push('\n');
        rendered
    }

    /// Writes the document to a fresh `pipeline-*.json` temp file in `dir`
    /// (or the system temp dir). The file is removed when the returned
    /// [`JobFile`] is dropped.
    pub fn write_scoped(&self, dir: Option<&Path>) -> io::Result<JobFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("pipeline-").suffix(".json");
        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        file.write_all(self.to_pretty_json().as_bytes())?;
        file.as_file().sync_all()?;
        debug!(path = %file.path().display(), "wrote job description");
        Ok(JobFile { file })
    }
}

/// Scoped job description file, deleted on drop unless kept.
#[derive(Debug)]
pub struct JobFile {
    file: NamedTempFile,
}

impl JobFile {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Disables cleanup and returns the retained path.
    pub fn keep(self) -> io::Result<PathBuf> {
        self.file
            .into_temp_path()
            .keep()
            .map_err(|persist| persist.error)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JobDescriptionBuilder;

impl JobDescriptionBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(
        &self,
        template: &TemplateDocument,
        params: &ParameterSet,
    ) -> TemplateResult<JobDescription> {
        let mut scan = PlaceholderScan::default();
        scan.visit(template.root(), false)?;
        scan.check_complete()?;

        let document = Renderer { params }.render(template.root(), None)?;
        Ok(JobDescription {
            document,
            zone_count: params.zone_count(),
        })
    }
}

pub fn is_placeholder_token(text: &str) -> bool {
    text.len() > 2
        && text.starts_with('@')
        && text.ends_with('@')
        && text[1..text.len() - 1]
            .bytes()
            .all(|byte| byte.is_ascii_uppercase() || byte.is_ascii_digit() || byte == b'_')
}

/// Returns the generator body when `item` is a `{"@ZONE_GENERATOR@": {...}}` marker.
fn zone_generator_body(item: &Value) -> TemplateResult<Option<&Map<String, Value>>> {
    let Value::Object(map) = item else {
        return Ok(None);
    };
    let Some(body) = map.get(ZONE_GENERATOR) else {
        return Ok(None);
    };
    match body {
        Value::Object(body) if map.len() == 1 => Ok(Some(body)),
        _ => Err(TemplateError::MisplacedZoneGenerator),
    }
}

#[derive(Debug, Default)]
struct PlaceholderScan {
    document_tokens: BTreeSet<&'static str>,
    zone_tokens: BTreeSet<&'static str>,
    zone_generators: usize,
}

impl PlaceholderScan {
    fn visit(&mut self, value: &Value, in_zone: bool) -> TemplateResult<()> {
        match value {
            Value::String(text) if is_placeholder_token(text) => self.record(text, in_zone),
            Value::Array(items) => {
                for item in items {
                    if let Some(body) = zone_generator_body(item)? {
                        if in_zone {
                            return Err(TemplateError::MisplacedZoneGenerator);
                        }
                        self.zone_generators += 1;
                        if self.zone_generators > 1 {
                            return Err(TemplateError::DuplicateZoneGenerator);
                        }
                        for nested in body.values() {
                            self.visit(nested, true)?;
                        }
                    } else {
                        self.visit(item, in_zone)?;
                    }
                }
                Ok(())
            }
            Value::Object(map) => {
                if map.contains_key(ZONE_GENERATOR) {
                    return Err(TemplateError::MisplacedZoneGenerator);
                }
                map.values().try_for_each(|nested| self.visit(nested, in_zone))
            }
            _ => Ok(()),
        }
    }

    fn record(&mut self, text: &str, in_zone: bool) -> TemplateResult<()> {
        if let Some(token) = DOCUMENT_PLACEHOLDERS.iter().copied().find(|token| *token == text) {
            self.document_tokens.insert(token);
            return Ok(());
        }
        match ZONE_PLACEHOLDERS.iter().copied().find(|token| *token == text) {
            Some(token) if in_zone => {
                self.zone_tokens.insert(token);
                Ok(())
            }
            _ => Err(TemplateError::UnknownPlaceholder(text.to_string())),
        }
    }

    fn check_complete(&self) -> TemplateResult<()> {
        if let Some(missing) = DOCUMENT_PLACEHOLDERS
            .iter()
            .copied()
            .find(|token| !self.document_tokens.contains(token))
        {
            return Err(TemplateError::MissingPlaceholder(missing));
        }
        if self.zone_generators == 0 {
            return Err(TemplateError::MissingPlaceholder(ZONE_GENERATOR));
        }
        if let Some(missing) = REQUIRED_ZONE_PLACEHOLDERS
            .iter()
            .copied()
            .find(|token| !self.zone_tokens.contains(token))
        {
            return Err(TemplateError::MissingPlaceholder(missing));
        }
        Ok(())
    }
}

struct Renderer<'a> {
    params: &'a ParameterSet,
}

impl Renderer<'_> {
    fn render(&self, value: &Value, zone: Option<(usize, &ZoneStatistic)>) -> TemplateResult<Value> {
        match value {
            Value::String(text) if is_placeholder_token(text) => self.substitute(text, zone),
            Value::Array(items) => {
                let mut rendered = Vec::with_capacity(items.len());
                for item in items {
                    match zone_generator_body(item)? {
                        Some(body) => {
                            for (index, stat) in self.params.zone_stats.iter().enumerate() {
                                rendered.push(self.render_object(body, Some((index, stat)))?);
                            }
                        }
                        None => rendered.push(self.render(item, zone)?),
                    }
                }
                Ok(Value::Array(rendered))
            }
            Value::Object(map) => self.render_object(map, zone),
            other => Ok(other.clone()),
        }
    }

    fn render_object(
        &self,
        map: &Map<String, Value>,
        zone: Option<(usize, &ZoneStatistic)>,
    ) -> TemplateResult<Value> {
        let mut rendered = Map::with_capacity(map.len());
        for (key, nested) in map {
            rendered.insert(key.clone(), self.render(nested, zone)?);
        }
        Ok(Value::Object(rendered))
    }

    fn substitute(&self, token: &str, zone: Option<(usize, &ZoneStatistic)>) -> TemplateResult<Value> {
        let params = self.params;
        let value = match (token, zone) {
            (POINT_FILE, _) => path_value(&params.point_file)?,
            (ELEMENT_FILE, _) => path_value(&params.element_file)?,
            (TIMESTEP, _) => Value::from(params.timestep),
            (ATTRIBUTE, _) => Value::from(params.attribute_name.as_str()),
            (OUTPUT_FILE, _) => path_value(&params.output_file)?,
            (ZONE_INDEX, Some((index, _))) => Value::from(index),
            (MU, Some((_, stat))) => Value::from(stat.mu),
            (SIGMA, Some((_, stat))) => Value::from(stat.sigma),
            (MIN_CUTOFF, Some((_, stat))) => Value::from(stat.min_cutoff),
            (MAX_CUTOFF, Some((_, stat))) => Value::from(stat.max_cutoff),
            _ => return Err(TemplateError::UnknownPlaceholder(token.to_string())),
        };
        Ok(value)
    }
}

fn path_value(path: &Path) -> TemplateResult<Value> {
    path.to_str()
        .map(Value::from)
        .ok_or_else(|| TemplateError::NonUtf8Path(path.to_path_buf()))
}
