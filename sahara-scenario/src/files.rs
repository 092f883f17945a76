//! Scenario file discovery

use sahara_common::{Error, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Plugins whose default template carries no version in its name
const UNVERSIONED_PLUGINS: &[&str] = &["transient", "fake"];

/// Template sections that may have a per-feature variant
const FEATURE_TEMPLATE_BASES: &[&str] = &["credentials", "edp"];

/// True for `*.yaml.mako` / `*.yml.mako`
pub fn is_template_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.ends_with(".yaml.mako") || name.ends_with(".yml.mako"))
        .unwrap_or(false)
}

/// All regular files below `directory`, sorted by file name at each level
pub fn recursive_walk(directory: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(directory).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            Error::Io(
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory loop detected")),
            )
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Expand directories and check that every argument exists
pub fn get_scenario_files(scenario_arguments: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for argument in scenario_arguments {
        if argument.is_dir() {
            files.extend(recursive_walk(argument)?);
        } else if argument.is_file() {
            files.push(argument.clone());
        } else {
            return Err(Error::ScenarioNotFound(argument.clone()));
        }
    }
    Ok(files)
}

/// Locates the default templates shipped with the runner
#[derive(Debug, Clone)]
pub struct TemplateLocator {
    templates_dir: PathBuf,
}

impl TemplateLocator {
    pub fn new(templates_dir: impl Into<PathBuf>) -> Self {
        Self {
            templates_dir: templates_dir.into(),
        }
    }

    pub fn templates_dir(&self) -> &Path {
        &self.templates_dir
    }

    /// Templates that are always loaded with a plugin template
    pub fn base_templates(&self) -> Vec<PathBuf> {
        vec![
            self.templates_dir.join("credentials.yaml.mako"),
            self.templates_dir.join("edp.yaml.mako"),
        ]
    }

    /// Full list of files to load when a plugin is requested on the command
    /// line: base templates, the plugin template, the feature templates that
    /// exist, then the user's own scenario arguments.
    pub fn default_templates(
        &self,
        plugin: Option<&str>,
        version: Option<&str>,
        release: Option<&str>,
        scenario_arguments: &[PathBuf],
        features: &[String],
    ) -> Result<Vec<PathBuf>> {
        let Some(plugin) = plugin else {
            return Ok(scenario_arguments.to_vec());
        };

        let location = match release {
            Some(release) => self.templates_dir.join(release),
            None => self.templates_dir.clone(),
        };

        let template = if UNVERSIONED_PLUGINS.contains(&plugin) {
            format!("{}.yaml.mako", plugin)
        } else if let Some(version) = version {
            format!("{}-{}.yaml.mako", plugin, version)
        } else {
            return Err(Error::MissingPluginVersion(plugin.to_string()));
        };

        let mut templates = self.base_templates();
        templates.push(location.join(template));

        for feature in features {
            for base in FEATURE_TEMPLATE_BASES {
                let path = self
                    .templates_dir
                    .join(format!("{}_{}.yaml.mako", base, feature));
                if path.exists() {
                    templates.push(path);
                } else {
                    tracing::debug!(path = %path.display(), "No template for feature {}", feature);
                }
            }
        }

        templates.extend(scenario_arguments.iter().cloned());
        Ok(templates)
    }
}
