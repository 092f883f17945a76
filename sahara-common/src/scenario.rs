//! Scenario schema
//!
//! Typed view of a merged scenario configuration. Unknown keys are rejected
//! so that typos in scenario files surface as schema errors.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Merged scenario configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<u32>,
    #[serde(default)]
    pub credentials: Credentials,
    #[serde(default)]
    pub network: Network,
    #[serde(default)]
    pub clusters: Vec<Cluster>,
    #[serde(default)]
    pub edp_jobs_flow: BTreeMap<String, Vec<EdpJob>>,
}

/// Cloud credentials used by the generated tests
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Credentials {
    #[serde(default, deserialize_with = "opt_scalar")]
    pub os_username: Option<String>,
    #[serde(default, deserialize_with = "opt_scalar")]
    pub os_password: Option<String>,
    #[serde(default, deserialize_with = "opt_scalar")]
    pub os_tenant: Option<String>,
    #[serde(default, deserialize_with = "opt_scalar")]
    pub os_auth_url: Option<String>,
    #[serde(default)]
    pub sahara_service_type: Option<String>,
    #[serde(default)]
    pub sahara_url: Option<String>,
    #[serde(default)]
    pub ssl_verify: Option<bool>,
    #[serde(default)]
    pub ssl_cert: Option<String>,
    #[serde(default, deserialize_with = "opt_scalar")]
    pub s3_accesskey: Option<String>,
    #[serde(default, deserialize_with = "opt_scalar")]
    pub s3_secretkey: Option<String>,
    #[serde(default)]
    pub s3_endpoint: Option<String>,
    #[serde(default)]
    pub s3_endpoint_ssl: Option<bool>,
    #[serde(default)]
    pub s3_bucket_path: Option<bool>,
}

/// Network settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Network {
    #[serde(rename = "type", default)]
    pub network_type: Option<NetworkType>,
    #[serde(default)]
    pub private_network: Option<String>,
    #[serde(default)]
    pub public_network: Option<String>,
    #[serde(default)]
    pub auto_assignment_floating_ip: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NetworkType {
    Neutron,
    NovaNetwork,
}

/// One cluster under test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Cluster {
    #[serde(deserialize_with = "scalar")]
    pub plugin_name: String,
    #[serde(deserialize_with = "scalar")]
    pub plugin_version: String,
    #[serde(deserialize_with = "scalar")]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_cluster: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,
    #[serde(default)]
    pub node_group_templates: Vec<NodeGroupTemplate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_template: Option<ClusterTemplate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<ClusterSpec>,
    #[serde(default)]
    pub scaling: Vec<ScalingOp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<Vec<Step>>,
    /// Names of the job flows to run, already filtered by feature
    #[serde(default)]
    pub edp_jobs_flow: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retain_resources: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edp_batching: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hdfs_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_check_transient: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_delete_resource: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_poll_cluster_status: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_poll_jobs_status: Option<u64>,
}

/// Node group template definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeGroupTemplate {
    pub name: String,
    pub flavor: Flavor,
    pub node_processes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volumes_per_node: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volumes_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volumes_availability_zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_security_group: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_groups: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_configs: Option<serde_yaml::Mapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_proxy_gateway: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_autoconfig: Option<bool>,
    /// Only honoured by the v2 API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boot_from_volume: Option<bool>,
}

/// Flavor given by name or id, or an inline specification.
/// Numeric ids are kept as strings: the test base looks flavors up by string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Flavor {
    Name(#[serde(deserialize_with = "scalar")] String),
    Spec(FlavorSpec),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlavorSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub vcpus: u32,
    pub ram: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_disk: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ephemeral_disk: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swap_disk: Option<u32>,
}

/// Cluster template definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Node group name -> instance count
    pub node_group_templates: BTreeMap<String, u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_configs: Option<serde_yaml::Mapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anti_affinity: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_transient: Option<bool>,
}

/// Scaling operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScalingOp {
    pub operation: ScalingOperation,
    pub node_group: String,
    pub size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalingOperation {
    Resize,
    Add,
}

/// Check executed by the generated test after the cluster is up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    RunJobs,
    Scale,
    Transient,
    Cinder,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::RunJobs => "run_jobs",
            Step::Scale => "scale",
            Step::Transient => "transient",
            Step::Cinder => "cinder",
        }
    }
}

/// EDP job definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EdpJob {
    #[serde(rename = "type")]
    pub job_type: JobType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_datasource: Option<DataSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_datasource: Option<DataSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_lib: Option<JobBinary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_libs: Vec<JobBinary>,
    /// Either a mapping or a "key: value" string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configs: Option<serde_yaml::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<serde_yaml::Value>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobType {
    Pig,
    Java,
    MapReduce,
    #[serde(rename = "MapReduce.Streaming")]
    MapReduceStreaming,
    Hive,
    Spark,
    Shell,
    Storm,
    #[serde(rename = "Storm.Pyleus")]
    StormPyleus,
}

impl JobType {
    /// Job types whose entry point is a main binary
    pub fn requires_main_lib(&self) -> bool {
        matches!(
            self,
            JobType::Pig
                | JobType::Hive
                | JobType::Spark
                | JobType::Shell
                | JobType::Storm
                | JobType::StormPyleus
        )
    }

    /// Job types that only take libraries
    pub fn forbids_main_lib(&self) -> bool {
        matches!(
            self,
            JobType::Java | JobType::MapReduce | JobType::MapReduceStreaming
        )
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pig => write!(f, "Pig"),
            Self::Java => write!(f, "Java"),
            Self::MapReduce => write!(f, "MapReduce"),
            Self::MapReduceStreaming => write!(f, "MapReduce.Streaming"),
            Self::Hive => write!(f, "Hive"),
            Self::Spark => write!(f, "Spark"),
            Self::Shell => write!(f, "Shell"),
            Self::Storm => write!(f, "Storm"),
            Self::StormPyleus => write!(f, "Storm.Pyleus"),
        }
    }
}

/// Job input or output location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataSource {
    #[serde(rename = "type")]
    pub kind: DataSourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maprfs_username: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceType {
    Swift,
    Hdfs,
    Maprfs,
    S3,
}

/// Job binary (main or additional library)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobBinary {
    #[serde(rename = "type")]
    pub kind: JobBinaryType,
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobBinaryType {
    Swift,
    S3,
    Database,
}

fn scalar_to_string(value: serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// Versions, images and passwords are often written unquoted in YAML.
fn scalar<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_yaml::Value::deserialize(deserializer)?;
    scalar_to_string(value)
        .ok_or_else(|| serde::de::Error::custom("expected a string or a number"))
}

fn opt_scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_yaml::Value::deserialize(deserializer)? {
        serde_yaml::Value::Null => Ok(None),
        value => scalar_to_string(value)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom("expected a string or a number")),
    }
}
