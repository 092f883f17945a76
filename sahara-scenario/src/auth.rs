//! Cloud credential resolution
//!
//! Credentials come from the `--os-*` flags (or their `OS_*` environment
//! variables), then from the named entry of a `clouds.yaml` file. Values
//! given explicitly override the scenario files; the login defaults only
//! fill what nobody supplied.

use crate::defaults::{DEFAULT_AUTH_URL, DEFAULT_PASSWORD, DEFAULT_TENANT, DEFAULT_USERNAME};
use crate::variables::TemplateVariables;
use clap::Args;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CLIENT_CONFIG_ENV: &str = "OS_CLIENT_CONFIG_FILE";

/// OpenStack authentication options
#[derive(Debug, Clone, Default, Args)]
pub struct AuthOptions {
    /// Named cloud from clouds.yaml
    #[arg(long = "os-cloud", env = "OS_CLOUD")]
    pub os_cloud: Option<String>,

    /// Authentication username
    #[arg(long = "os-username", env = "OS_USERNAME")]
    pub os_username: Option<String>,

    /// Authentication password
    #[arg(long = "os-password", env = "OS_PASSWORD", hide_env_values = true)]
    pub os_password: Option<String>,

    /// Project name
    #[arg(long = "os-project-name", env = "OS_PROJECT_NAME")]
    pub os_project_name: Option<String>,

    /// Identity endpoint
    #[arg(long = "os-auth-url", env = "OS_AUTH_URL")]
    pub os_auth_url: Option<String>,

    /// Identity API version
    #[arg(long = "os-identity-api-version", env = "OS_IDENTITY_API_VERSION")]
    pub os_identity_api_version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CloudsFile {
    #[serde(default)]
    clouds: BTreeMap<String, CloudEntry>,
}

/// One `clouds.yaml` entry; only the fields the runner needs
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CloudEntry {
    #[serde(default)]
    pub auth: CloudAuth,
    #[serde(default)]
    pub identity_api_version: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CloudAuth {
    pub username: Option<String>,
    pub password: Option<String>,
    pub project_name: Option<String>,
    pub auth_url: Option<String>,
}

/// Outcome of credential resolution
#[derive(Debug, Clone, PartialEq)]
pub struct AuthValues {
    /// Credentials supplied by the user, to override the scenario files
    pub explicit: Mapping,
    pub username: String,
    pub password: String,
    pub tenant: String,
    pub auth_url: String,
}

impl AuthValues {
    /// Template variables exposed to the scenario templates
    pub fn template_variables(&self) -> TemplateVariables {
        TemplateVariables::from([
            ("os_username".to_string(), self.username.clone()),
            ("os_password".to_string(), self.password.clone()),
            ("os_tenant".to_string(), self.tenant.clone()),
            ("os_auth_url".to_string(), self.auth_url.clone()),
        ])
    }
}

/// Standard `clouds.yaml` locations, most specific first
pub fn clouds_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Ok(file) = std::env::var(CLIENT_CONFIG_ENV) {
        paths.push(PathBuf::from(file));
    }
    paths.push(PathBuf::from("clouds.yaml"));
    if let Ok(home) = std::env::var("HOME") {
        paths.push(Path::new(&home).join(".config/openstack/clouds.yaml"));
    }
    paths.push(PathBuf::from("/etc/openstack/clouds.yaml"));
    paths
}

/// Find `name` in the first `clouds.yaml` that defines it
pub fn find_cloud(name: &str, paths: &[PathBuf]) -> Option<CloudEntry> {
    for path in paths.iter().filter(|p| p.is_file()) {
        let parsed = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|s| serde_yaml::from_str::<CloudsFile>(&s).map_err(|e| e.to_string()));
        match parsed {
            Ok(mut file) => {
                if let Some(entry) = file.clouds.remove(name) {
                    tracing::debug!(cloud = name, file = %path.display(), "Using cloud configuration");
                    return Some(entry);
                }
            }
            Err(e) => {
                tracing::warn!("Skipping invalid cloud configuration {}: {}", path.display(), e);
            }
        }
    }
    None
}

/// Append the identity version to an unversioned auth URL
pub fn normalize_auth_url(auth_url: &str, api_version: &str) -> String {
    if auth_url.contains("v2.0") || auth_url.contains("v3") {
        return auth_url.to_string();
    }
    let version = if matches!(api_version, "3" | "3.0") { "v3" } else { "v2.0" };
    format!("{}/{}", auth_url.trim_end_matches('/'), version)
}

fn version_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Resolve credentials from the options and the given `clouds.yaml` paths
pub fn resolve(options: &AuthOptions, clouds_paths: &[PathBuf]) -> AuthValues {
    let cloud = match &options.os_cloud {
        Some(name) => {
            let entry = find_cloud(name, clouds_paths);
            if entry.is_none() {
                tracing::warn!("Cloud '{}' not found, ignoring it", name);
            }
            entry.unwrap_or_default()
        }
        None => CloudEntry::default(),
    };

    let username = options.os_username.clone().or(cloud.auth.username);
    let password = options.os_password.clone().or(cloud.auth.password);
    let tenant = options.os_project_name.clone().or(cloud.auth.project_name);
    let auth_url = options.os_auth_url.clone().or(cloud.auth.auth_url);
    let api_version = options
        .os_identity_api_version
        .clone()
        .or_else(|| cloud.identity_api_version.as_ref().and_then(version_string))
        .unwrap_or_else(|| "2.0".to_string());

    let auth_url = auth_url.map(|url| normalize_auth_url(&url, &api_version));

    let mut explicit = Mapping::new();
    for (key, value) in [
        ("os_username", &username),
        ("os_password", &password),
        ("os_tenant", &tenant),
        ("os_auth_url", &auth_url),
    ] {
        if let Some(value) = value {
            explicit.insert(Value::String(key.to_string()), Value::String(value.clone()));
        }
    }

    AuthValues {
        explicit,
        username: username.unwrap_or_else(|| DEFAULT_USERNAME.to_string()),
        password: password.unwrap_or_else(|| DEFAULT_PASSWORD.to_string()),
        tenant: tenant.unwrap_or_else(|| DEFAULT_TENANT.to_string()),
        auth_url: auth_url.unwrap_or_else(|| DEFAULT_AUTH_URL.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLOUDS: &str = r#"
clouds:
  devstack:
    auth:
      username: demo
      password: secret
      project_name: demo
      auth_url: http://keystone:5000
    identity_api_version: 3
    region_name: RegionOne
"#;

    #[test]
    fn test_normalize_auth_url() {
        assert_eq!(normalize_auth_url("http://k:5000", "3"), "http://k:5000/v3");
        assert_eq!(normalize_auth_url("http://k:5000/", "3.0"), "http://k:5000/v3");
        assert_eq!(normalize_auth_url("http://k:5000", "2.0"), "http://k:5000/v2.0");
        assert_eq!(normalize_auth_url("http://k:5000/v3", "2"), "http://k:5000/v3");
        assert_eq!(normalize_auth_url("http://k:5000/v2.0", "3"), "http://k:5000/v2.0");
    }

    #[test]
    fn test_defaults_without_sources() {
        let auth = resolve(&AuthOptions::default(), &[]);
        assert!(auth.explicit.is_empty());
        assert_eq!(auth.username, "admin");
        assert_eq!(auth.password, "nova");
        assert_eq!(auth.tenant, "admin");
        assert_eq!(auth.auth_url, "http://localhost:5000/v2.0");
    }

    #[test]
    fn test_flags_are_explicit() {
        let options = AuthOptions {
            os_username: Some("alice".to_string()),
            os_auth_url: Some("http://keystone:5000".to_string()),
            os_identity_api_version: Some("3".to_string()),
            ..Default::default()
        };
        let auth = resolve(&options, &[]);
        assert_eq!(auth.explicit.len(), 2);
        assert_eq!(auth.explicit["os_username"], Value::String("alice".into()));
        assert_eq!(auth.auth_url, "http://keystone:5000/v3");
        assert_eq!(auth.template_variables()["os_tenant"], "admin");
    }

    #[test]
    fn test_cloud_from_clouds_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clouds.yaml");
        std::fs::write(&path, CLOUDS).unwrap();

        let options = AuthOptions {
            os_cloud: Some("devstack".to_string()),
            os_password: Some("override".to_string()),
            ..Default::default()
        };
        let auth = resolve(&options, &[path]);
        assert_eq!(auth.username, "demo");
        assert_eq!(auth.password, "override");
        assert_eq!(auth.tenant, "demo");
        assert_eq!(auth.auth_url, "http://keystone:5000/v3");
        assert_eq!(auth.explicit.len(), 4);
    }

    #[test]
    fn test_unknown_cloud_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clouds.yaml");
        std::fs::write(&path, CLOUDS).unwrap();

        let options = AuthOptions {
            os_cloud: Some("missing".to_string()),
            ..Default::default()
        };
        let auth = resolve(&options, &[path]);
        assert!(auth.explicit.is_empty());
        assert_eq!(auth.username, "admin");
    }
}
