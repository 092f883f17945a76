//! Defaults and test plan
//!
//! Fills the values the scenario files may leave out and turns every cluster
//! into a test case with its job flows expanded.

use sahara_common::scenario::{
    Cluster, Credentials, EdpJob, Network, NetworkType, ScenarioConfig, Step,
};
use sahara_common::{Error, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "nova";
pub const DEFAULT_TENANT: &str = "admin";
pub const DEFAULT_AUTH_URL: &str = "http://localhost:5000/v2.0";
pub const DEFAULT_SERVICE_TYPE: &str = "data-processing";
pub const DEFAULT_PRIVATE_NETWORK: &str = "private";

pub const DEFAULT_SCENARIO: [Step; 3] = [Step::RunJobs, Step::Scale, Step::RunJobs];

/// Everything the generated test file needs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestPlan {
    pub credentials: Credentials,
    pub network: Network,
    pub testcases: Vec<TestCase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<u32>,
}

/// One cluster under test with its resolved settings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestCase {
    pub class_name: String,
    pub cluster: Cluster,
    pub retain_resources: bool,
    pub scenario: Vec<Step>,
    pub jobs: Vec<EdpJob>,
}

impl TestCase {
    /// The dictionary handed to the generated test class: the cluster with
    /// its defaults filled and `edp_jobs_flow` replaced by the job list
    pub fn to_testcase_value(&self) -> Result<serde_json::Value> {
        let mut value =
            serde_json::to_value(&self.cluster).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        let jobs =
            serde_json::to_value(&self.jobs).map_err(|e| Error::InvalidConfig(e.to_string()))?;

        let serde_json::Value::Object(map) = &mut value else {
            return Err(Error::InvalidConfig(format!(
                "test case {} is not an object",
                self.class_name
            )));
        };
        map.insert("class_name".to_string(), self.class_name.clone().into());
        map.insert("retain_resources".to_string(), self.retain_resources.into());
        map.insert(
            "scenario".to_string(),
            self.scenario
                .iter()
                .map(|s| serde_json::Value::from(s.as_str()))
                .collect(),
        );
        map.insert("edp_jobs_flow".to_string(), jobs);
        Ok(value)
    }
}

/// Fill missing credentials
pub fn credential_defaults(credentials: &mut Credentials) {
    fill(&mut credentials.os_username, DEFAULT_USERNAME);
    fill(&mut credentials.os_password, DEFAULT_PASSWORD);
    fill(&mut credentials.os_tenant, DEFAULT_TENANT);
    fill(&mut credentials.os_auth_url, DEFAULT_AUTH_URL);
    fill(&mut credentials.sahara_service_type, DEFAULT_SERVICE_TYPE);
    credentials.ssl_verify.get_or_insert(false);
}

/// Fill missing network settings
pub fn network_defaults(network: &mut Network) {
    network.network_type.get_or_insert(NetworkType::Neutron);
    fill(&mut network.private_network, DEFAULT_PRIVATE_NETWORK);
    fill(&mut network.public_network, "");
    network.auto_assignment_floating_ip.get_or_insert(false);
}

fn fill(field: &mut Option<String>, default: &str) {
    if field.is_none() {
        *field = Some(default.to_string());
    }
}

/// Test class name: plugin name followed by the version, anything that is
/// not valid in an identifier replaced by `_`
pub fn class_name(cluster: &Cluster) -> String {
    format!("{}{}", cluster.plugin_name, cluster.plugin_version)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Concatenate the jobs of the referenced flows, in reference order
pub fn expand_jobs(cluster: &Cluster, flows: &BTreeMap<String, Vec<EdpJob>>) -> Result<Vec<EdpJob>> {
    let mut jobs = Vec::new();
    for name in &cluster.edp_jobs_flow {
        let flow = flows.get(name).ok_or_else(|| Error::UnknownJobFlow {
            job: name.clone(),
            cluster: format!("{} {}", cluster.plugin_name, cluster.plugin_version),
        })?;
        jobs.extend(flow.iter().cloned());
    }
    Ok(jobs)
}

impl TestPlan {
    /// Apply defaults to a validated configuration and repeat its test
    /// cases `count` times
    pub fn from_config(config: ScenarioConfig, count: u32) -> Result<Self> {
        let ScenarioConfig {
            concurrency,
            mut credentials,
            mut network,
            clusters,
            edp_jobs_flow,
        } = config;

        credential_defaults(&mut credentials);
        network_defaults(&mut network);

        let mut cases = Vec::with_capacity(clusters.len());
        for cluster in clusters {
            let jobs = expand_jobs(&cluster, &edp_jobs_flow)?;
            cases.push(TestCase {
                class_name: class_name(&cluster),
                retain_resources: cluster.retain_resources.unwrap_or(false),
                scenario: cluster
                    .scenario
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SCENARIO.to_vec()),
                jobs,
                cluster,
            });
        }

        let mut testcases = Vec::with_capacity(cases.len() * count.max(1) as usize);
        for _ in 0..count.max(1) {
            testcases.extend(cases.iter().cloned());
        }
        make_class_names_unique(&mut testcases);

        Ok(Self {
            credentials,
            network,
            testcases,
            concurrency,
        })
    }
}

/// The first occurrence keeps its name, later ones get `_1`, `_2`, ...
fn make_class_names_unique(testcases: &mut [TestCase]) {
    let mut used: HashSet<String> = HashSet::new();
    for tc in testcases.iter_mut() {
        if used.insert(tc.class_name.clone()) {
            continue;
        }
        let mut n = 1;
        let unique = loop {
            let candidate = format!("{}_{}", tc.class_name, n);
            if !used.contains(&candidate) {
                break candidate;
            }
            n += 1;
        };
        used.insert(unique.clone());
        tc.class_name = unique;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(yaml: &str) -> ScenarioConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    const MINIMAL: &str = r#"
clusters:
  - plugin_name: vanilla
    plugin_version: 2.7.1
    image: sahara-vanilla-2.7.1-ubuntu-14.04
"#;

    #[test]
    fn test_defaults_without_credentials_and_network() {
        let plan = TestPlan::from_config(config(MINIMAL), 1).unwrap();

        let creds = &plan.credentials;
        assert_eq!(creds.sahara_service_type.as_deref(), Some("data-processing"));
        assert_eq!(creds.ssl_verify, Some(false));
        assert_eq!(creds.sahara_url, None);
        assert_eq!(creds.ssl_cert, None);
        assert_eq!(creds.os_username.as_deref(), Some("admin"));
        assert_eq!(creds.os_password.as_deref(), Some("nova"));
        assert_eq!(creds.os_auth_url.as_deref(), Some("http://localhost:5000/v2.0"));

        let net = &plan.network;
        assert_eq!(net.network_type, Some(NetworkType::Neutron));
        assert_eq!(net.private_network.as_deref(), Some("private"));
        assert_eq!(net.public_network.as_deref(), Some(""));
        assert_eq!(net.auto_assignment_floating_ip, Some(false));

        let tc = &plan.testcases[0];
        assert_eq!(tc.class_name, "vanilla2_7_1");
        assert!(!tc.retain_resources);
        assert_eq!(tc.scenario, DEFAULT_SCENARIO.to_vec());
        assert!(tc.jobs.is_empty());
    }

    #[test]
    fn test_values_are_kept() {
        let plan = TestPlan::from_config(
            config(
                r#"
credentials:
  os_username: changed_admin
  sahara_url: http://127.0.0.1
network:
  type: neutron
  private_network: changed_private
  public_network: changed_public
  auto_assignment_floating_ip: true
clusters:
  - plugin_name: vanilla
    plugin_version: 2.7.1
    image: img
    retain_resources: true
    scenario: [run_jobs]
    edp_jobs_flow: [test_flow, test_flow]
edp_jobs_flow:
  test_flow:
    - type: Pig
      main_lib:
        type: swift
        source: example.pig
    - type: Java
"#,
            ),
            1,
        )
        .unwrap();

        assert_eq!(plan.credentials.os_username.as_deref(), Some("changed_admin"));
        assert_eq!(plan.credentials.sahara_url.as_deref(), Some("http://127.0.0.1"));
        assert_eq!(plan.network.public_network.as_deref(), Some("changed_public"));
        assert_eq!(plan.network.auto_assignment_floating_ip, Some(true));

        let tc = &plan.testcases[0];
        assert!(tc.retain_resources);
        assert_eq!(tc.scenario, vec![Step::RunJobs]);
        assert_eq!(tc.jobs.len(), 4);
    }

    #[test]
    fn test_count_repeats_with_unique_names() {
        let plan = TestPlan::from_config(config(MINIMAL), 3).unwrap();
        let names: Vec<&str> = plan.testcases.iter().map(|t| t.class_name.as_str()).collect();
        assert_eq!(names, vec!["vanilla2_7_1", "vanilla2_7_1_1", "vanilla2_7_1_2"]);
    }

    #[test]
    fn test_class_name_sanitized() {
        let cluster: Cluster =
            serde_yaml::from_str("plugin_name: cdh\nplugin_version: 5.13.0-x\nimage: i").unwrap();
        assert_eq!(class_name(&cluster), "cdh5_13_0_x");
    }

    #[test]
    fn test_testcase_value() {
        let mut config = config(MINIMAL);
        config.clusters[0].edp_jobs_flow = vec!["flow".to_string()];
        config.edp_jobs_flow.insert(
            "flow".to_string(),
            vec![serde_yaml::from_str("type: Java").unwrap()],
        );
        let plan = TestPlan::from_config(config, 1).unwrap();
        let value = plan.testcases[0].to_testcase_value().unwrap();

        assert_eq!(value["class_name"], "vanilla2_7_1");
        assert_eq!(value["retain_resources"], false);
        assert_eq!(value["scenario"], serde_json::json!(["run_jobs", "scale", "run_jobs"]));
        assert_eq!(value["edp_jobs_flow"][0]["type"], "Java");
        assert_eq!(value["plugin_version"], "2.7.1");
        assert_eq!(value["scaling"], serde_json::json!([]));
    }
}
