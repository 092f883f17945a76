//! Scenario merging
//!
//! Every scenario file contributes to one configuration:
//! - `credentials`, `network` and `concurrency` merge key by key, and two
//!   files disagreeing on a key is fatal
//! - `clusters` are concatenated in file order
//! - `edp_jobs_flow` names must be unique across files
//!
//! Each cluster's job references are then resolved against the merged job
//! flows and filtered by the requested features.

use crate::files::is_template_file;
use crate::output;
use crate::template;
use crate::variables::TemplateVariables;
use sahara_common::{Error, Result};
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

const KNOWN_SECTIONS: &[&str] = &[
    "concurrency",
    "credentials",
    "network",
    "clusters",
    "edp_jobs_flow",
];

/// Merged configuration, not validated yet
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergedConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<Value>,
    pub credentials: Mapping,
    pub network: Mapping,
    pub clusters: Vec<Value>,
    pub edp_jobs_flow: Mapping,
}

impl MergedConfig {
    pub fn to_value(&self) -> Result<Value> {
        serde_yaml::to_value(self).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    /// Merge one parsed scenario document
    pub fn merge_document(&mut self, document: &Mapping, file: &str) -> Result<()> {
        for key in document.keys() {
            let known = key.as_str().map(|k| KNOWN_SECTIONS.contains(&k)).unwrap_or(false);
            if !known {
                tracing::warn!(file, "Ignoring unknown section {}", key_name(key));
            }
        }

        merge_section(document.get("credentials"), &mut self.credentials, "credentials")?;
        merge_section(document.get("network"), &mut self.network, "network")?;

        if let Some(concurrency) = document.get("concurrency").filter(|v| !v.is_null()) {
            let conflict = matches!(
                &self.concurrency,
                Some(existing) if !existing.is_null() && existing != concurrency
            );
            if conflict {
                return Err(Error::ConflictingSection {
                    section: "concurrency".to_string(),
                    key: "concurrency".to_string(),
                });
            }
            self.concurrency = Some(concurrency.clone());
        }

        match document.get("clusters") {
            None | Some(Value::Null) => {}
            Some(Value::Sequence(clusters)) => self.clusters.extend(clusters.iter().cloned()),
            Some(_) => {
                return Err(Error::Schema(format!("'clusters' in {} must be a list", file)));
            }
        }

        match document.get("edp_jobs_flow") {
            None | Some(Value::Null) => {}
            Some(Value::Mapping(flows)) => {
                for (name, jobs) in flows {
                    if self.edp_jobs_flow.contains_key(name) {
                        return Err(Error::DuplicateJobFlow(key_name(name)));
                    }
                    self.edp_jobs_flow.insert(name.clone(), jobs.clone());
                }
            }
            Some(_) => {
                return Err(Error::Schema(format!(
                    "'edp_jobs_flow' in {} must be a mapping",
                    file
                )));
            }
        }

        Ok(())
    }

    /// Replace each cluster's job references by the names of the flows to
    /// run, keeping untagged references and those sharing a feature with
    /// `features`
    pub fn resolve_job_flows(&mut self, features: &[String]) -> Result<()> {
        for (index, cluster) in self.clusters.iter_mut().enumerate() {
            let Value::Mapping(cluster) = cluster else {
                continue;
            };
            let label = cluster_label(index, cluster);

            let references = match cluster.get("edp_jobs_flow") {
                None | Some(Value::Null) => continue,
                Some(Value::String(name)) => vec![JobRef::plain(name)],
                Some(Value::Sequence(items)) => items
                    .iter()
                    .map(|item| JobRef::parse(item, &label))
                    .collect::<Result<Vec<_>>>()?,
                Some(_) => {
                    return Err(Error::Schema(format!(
                        "edp_jobs_flow of cluster {} must be a name or a list",
                        label
                    )));
                }
            };

            let mut selected = Vec::new();
            // feature flows are only defined when their feature templates are loaded
            for reference in references {
                if !reference.enabled_for(features) {
                    tracing::debug!(cluster = %label, "Skipping job flow {}", reference.name);
                    continue;
                }
                if !self.edp_jobs_flow.contains_key(reference.name.as_str()) {
                    return Err(Error::UnknownJobFlow {
                        job: reference.name,
                        cluster: label,
                    });
                }
                selected.push(Value::String(reference.name));
            }

            cluster.insert(
                Value::String("edp_jobs_flow".to_string()),
                Value::Sequence(selected),
            );
        }
        Ok(())
    }
}

/// A cluster's reference to a named job flow
#[derive(Debug, Clone, PartialEq)]
struct JobRef {
    name: String,
    features: Vec<String>,
}

impl JobRef {
    fn plain(name: &str) -> Self {
        Self {
            name: name.to_string(),
            features: Vec::new(),
        }
    }

    fn parse(item: &Value, cluster: &str) -> Result<Self> {
        let invalid = || {
            Error::Schema(format!(
                "invalid job flow reference in cluster {}: expected a name or {{name, features}}",
                cluster
            ))
        };

        match item {
            Value::String(name) => Ok(Self::plain(name)),
            Value::Mapping(map) => {
                let name = map.get("name").and_then(Value::as_str).ok_or_else(invalid)?;
                let features = match map.get("features") {
                    None | Some(Value::Null) => Vec::new(),
                    Some(Value::String(feature)) => vec![feature.clone()],
                    Some(Value::Sequence(list)) => list
                        .iter()
                        .map(|f| f.as_str().map(str::to_string).ok_or_else(invalid))
                        .collect::<Result<Vec<_>>>()?,
                    Some(_) => return Err(invalid()),
                };
                Ok(Self {
                    name: name.to_string(),
                    features,
                })
            }
            _ => Err(invalid()),
        }
    }

    fn enabled_for(&self, features: &[String]) -> bool {
        self.features.is_empty() || self.features.iter().any(|f| features.contains(f))
    }
}

fn merge_section(incoming: Option<&Value>, merged: &mut Mapping, section: &str) -> Result<()> {
    let incoming = match incoming {
        None | Some(Value::Null) => return Ok(()),
        Some(Value::Mapping(incoming)) => incoming,
        Some(_) => return Err(Error::Schema(format!("'{}' must be a mapping", section))),
    };

    for (key, value) in incoming {
        match merged.get(key) {
            Some(existing) if !existing.is_null() => {
                if existing != value {
                    return Err(Error::ConflictingSection {
                        section: section.to_string(),
                        key: key_name(key),
                    });
                }
            }
            _ => {
                merged.insert(key.clone(), value.clone());
            }
        }
    }
    Ok(())
}

fn key_name(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

fn cluster_label(index: usize, cluster: &Mapping) -> String {
    let field = |name: &str| match cluster.get(name) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => "?".to_string(),
    };
    format!("#{} ({} {})", index, field("plugin_name"), field("plugin_version"))
}

/// Parse a scenario file, expanding it first when it is a template
pub fn read_scenario_config(path: &Path, variables: &TemplateVariables) -> Result<Mapping> {
    let file = path.display().to_string();
    let mut text = std::fs::read_to_string(path)?;
    if is_template_file(path) {
        text = template::render(&text, &file, variables)?;
    }

    if text.trim().is_empty() {
        return Ok(Mapping::new());
    }

    let value: Value = serde_yaml::from_str(&text).map_err(|e| Error::Yaml {
        file: file.clone(),
        message: e.to_string(),
    })?;

    match value {
        Value::Mapping(mapping) => Ok(mapping),
        Value::Null => Ok(Mapping::new()),
        _ => Err(Error::Yaml {
            file,
            message: "the document must be a mapping".to_string(),
        }),
    }
}

/// Read, merge and resolve all scenario files
pub fn generate_config(
    files: &[PathBuf],
    variables: &TemplateVariables,
    credential_overrides: &Mapping,
    features: &[String],
    verbose: bool,
) -> Result<MergedConfig> {
    let mut config = MergedConfig::default();

    for path in files {
        let document = read_scenario_config(path, variables)?;
        if verbose {
            output::print_info(&format!("YAML from {}:", path.display()));
            output::print_yaml(&document).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        }
        config.merge_document(&document, &path.display().to_string())?;
        tracing::debug!(file = %path.display(), "Merged scenario file");
    }

    for (key, value) in credential_overrides {
        config.credentials.insert(key.clone(), value.clone());
    }

    config.resolve_job_flows(features)?;

    if verbose {
        output::print_info("Generated configuration:");
        output::print_yaml(&config).map_err(|e| Error::InvalidConfig(e.to_string()))?;
    }

    Ok(config)
}
