//! Template variables
//!
//! Variables come from three places, later ones winning: the `[DEFAULT]`
//! section of an INI variable file, `--args key:value` pairs and the
//! resolved cloud credentials.

use crate::files::is_template_file;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub type TemplateVariables = BTreeMap<String, String>;

const DEFAULT_SECTION: &str = "DEFAULT";

/// Parse `key:value` pairs. Values are quoted so they render as YAML
/// strings. Parsing stops at the first element without a separator.
pub fn parse_args<S: AsRef<str>>(pairs: &[S]) -> TemplateVariables {
    let mut args = TemplateVariables::new();
    for pair in pairs {
        let Some((key, value)) = pair.as_ref().split_once(':') else {
            break;
        };
        args.insert(key.to_string(), format!("'{}'", value));
    }
    args
}

/// Read the `[DEFAULT]` section of an INI file. Problems are reported as
/// warnings: the templates may need no variables at all.
pub fn read_variable_file(path: &Path) -> TemplateVariables {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(
                "the input contains at least one template, but the variable \
                 configuration file '{}' is not valid: {}",
                path.display(),
                e
            );
            return TemplateVariables::new();
        }
    };

    match parse_ini_defaults(&content) {
        Ok(variables) => variables,
        Err(e) => {
            tracing::warn!(
                "the input contains at least one template, but the variable \
                 configuration file '{}' can not be parsed: {}",
                path.display(),
                e
            );
            TemplateVariables::new()
        }
    }
}

/// Key-case-preserving INI parser returning the `[DEFAULT]` section
pub fn parse_ini_defaults(content: &str) -> Result<TemplateVariables, String> {
    let mut defaults = TemplateVariables::new();
    let mut section: Option<String> = None;
    let mut last_key: Option<String> = None;

    for (index, raw_line) in content.lines().enumerate() {
        let lineno = index + 1;
        let line = raw_line.trim();

        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            last_key = None;
            continue;
        }

        // continuation of the previous value
        if raw_line.starts_with([' ', '\t']) {
            if let Some(key) = &last_key {
                if section.as_deref() == Some(DEFAULT_SECTION) {
                    if let Some(value) = defaults.get_mut(key) {
                        value.push('\n');
                        value.push_str(line);
                    }
                }
                continue;
            }
        }

        if line.starts_with('[') {
            let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) else {
                return Err(format!("line {}: malformed section header", lineno));
            };
            section = Some(name.trim().to_string());
            last_key = None;
            continue;
        }

        if section.is_none() {
            return Err(format!("line {}: file contains no section headers", lineno));
        }

        let Some(split) = line.find(['=', ':']) else {
            return Err(format!("line {}: expected 'key = value'", lineno));
        };
        let key = line[..split].trim().to_string();
        let value = line[split + 1..].trim().to_string();
        if key.is_empty() {
            return Err(format!("line {}: empty option name", lineno));
        }

        if section.as_deref() == Some(DEFAULT_SECTION) {
            if defaults.contains_key(&key) {
                return Err(format!("line {}: option '{}' already exists", lineno, key));
            }
            defaults.insert(key.clone(), value);
        }
        last_key = Some(key);
    }

    Ok(defaults)
}

/// Build the final variable set for the given scenario files
pub fn collect(
    files: &[PathBuf],
    variable_file: Option<&Path>,
    scenario_args: &TemplateVariables,
    auth_values: &TemplateVariables,
) -> TemplateVariables {
    let mut variables = TemplateVariables::new();

    if files.iter().any(|f| is_template_file(f)) {
        if let Some(path) = variable_file {
            variables.extend(read_variable_file(path));
        }
    }

    variables.extend(scenario_args.iter().map(|(k, v)| (k.clone(), v.clone())));
    variables.extend(auth_values.iter().map(|(k, v)| (k.clone(), v.clone())));
    variables
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args_quotes_values() {
        let args = parse_args(&["network_type:neutron", "ci_flavor_id:2"]);
        assert_eq!(args.get("network_type").unwrap(), "'neutron'");
        assert_eq!(args.get("ci_flavor_id").unwrap(), "'2'");
    }

    #[test]
    fn test_parse_args_stops_at_invalid_pair() {
        let args = parse_args(&["a:1", "broken", "b:2"]);
        assert_eq!(args.len(), 1);
        assert!(args.contains_key("a"));
    }

    #[test]
    fn test_parse_args_keeps_colons_in_value() {
        let args = parse_args(&["auth:http://localhost:5000"]);
        assert_eq!(args.get("auth").unwrap(), "'http://localhost:5000'");
    }

    #[test]
    fn test_parse_ini_defaults() {
        let ini = "\
# variables
[DEFAULT]
network_type: neutron
Vanilla_Image = sahara-vanilla
multi = first
    second

[other]
ignored = yes
";
        let vars = parse_ini_defaults(ini).unwrap();
        assert_eq!(vars.len(), 3);
        assert_eq!(vars.get("network_type").unwrap(), "neutron");
        assert_eq!(vars.get("Vanilla_Image").unwrap(), "sahara-vanilla");
        assert_eq!(vars.get("multi").unwrap(), "first\nsecond");
    }

    #[test]
    fn test_parse_ini_requires_section() {
        assert!(parse_ini_defaults("key = value\n").is_err());
    }

    #[test]
    fn test_parse_ini_duplicate_option() {
        assert!(parse_ini_defaults("[DEFAULT]\na = 1\na = 2\n").is_err());
    }

    #[test]
    fn test_missing_variable_file_is_empty() {
        let vars = read_variable_file(Path::new("/nonexistent/vars.ini"));
        assert!(vars.is_empty());
    }

    #[test]
    fn test_collect_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let ini = dir.path().join("vars.ini");
        std::fs::write(&ini, "[DEFAULT]\nnetwork_type = neutron\nimage = base\n").unwrap();

        let files = vec![PathBuf::from("scenario.yaml.mako")];
        let args = parse_args(&["network_type:nova-network"]);
        let mut auth = TemplateVariables::new();
        auth.insert("os_username".to_string(), "demo".to_string());

        let vars = collect(&files, Some(&ini), &args, &auth);
        assert_eq!(vars.get("network_type").unwrap(), "'nova-network'");
        assert_eq!(vars.get("image").unwrap(), "base");
        assert_eq!(vars.get("os_username").unwrap(), "demo");
    }

    #[test]
    fn test_collect_skips_variable_file_without_templates() {
        let dir = tempfile::tempdir().unwrap();
        let ini = dir.path().join("vars.ini");
        std::fs::write(&ini, "[DEFAULT]\nimage = base\n").unwrap();

        let files = vec![PathBuf::from("scenario.yaml")];
        let vars = collect(&files, Some(&ini), &TemplateVariables::new(), &TemplateVariables::new());
        assert!(vars.is_empty());
    }
}
