//! Scenario validation
//!
//! The merged configuration is first deserialized into the typed schema
//! (types, enums, unknown keys), then checked for the cross-references
//! the schema alone cannot express.

use crate::merge::MergedConfig;
use sahara_common::scenario::{Cluster, EdpJob, ScalingOperation, ScenarioConfig, Step};
use sahara_common::Error;
use std::collections::{BTreeMap, HashSet};

/// Validation result type
pub type ValidationResult<T> = Result<T, Error>;

/// Validate the merged configuration and return its typed form
pub fn validate(config: &MergedConfig) -> ValidationResult<ScenarioConfig> {
    let value = config.to_value()?;
    let scenario: ScenarioConfig =
        serde_yaml::from_value(value).map_err(|e| Error::Schema(e.to_string()))?;

    validate_scenario(&scenario)?;
    Ok(scenario)
}

/// Semantic checks on a typed scenario
pub fn validate_scenario(scenario: &ScenarioConfig) -> ValidationResult<()> {
    if scenario.concurrency == Some(0) {
        return Err(Error::Validation(
            "concurrency must be at least 1".to_string(),
        ));
    }

    if scenario.clusters.is_empty() {
        return Err(Error::Validation(
            "at least one cluster must be defined".to_string(),
        ));
    }

    for (flow, jobs) in &scenario.edp_jobs_flow {
        for (index, job) in jobs.iter().enumerate() {
            validate_job(flow, index, job)?;
        }
    }

    for cluster in &scenario.clusters {
        validate_cluster(cluster, &scenario.edp_jobs_flow)?;
    }

    Ok(())
}

/// Cluster validation
pub fn validate_cluster(
    cluster: &Cluster,
    flows: &BTreeMap<String, Vec<EdpJob>>,
) -> ValidationResult<()> {
    let label = format!("{} {}", cluster.plugin_name, cluster.plugin_version);

    if cluster.plugin_name.is_empty() || cluster.plugin_version.is_empty() {
        return Err(Error::Validation(
            "plugin_name and plugin_version cannot be empty".to_string(),
        ));
    }

    if cluster.image.is_empty() {
        return Err(Error::Validation(format!(
            "cluster {}: image cannot be empty",
            label
        )));
    }

    let mut node_groups = HashSet::new();
    for ng in &cluster.node_group_templates {
        if ng.name.is_empty() {
            return Err(Error::Validation(format!(
                "cluster {}: node group name cannot be empty",
                label
            )));
        }
        if !node_groups.insert(ng.name.as_str()) {
            return Err(Error::Validation(format!(
                "cluster {}: node group '{}' is defined more than once",
                label, ng.name
            )));
        }
        if ng.node_processes.is_empty() {
            return Err(Error::Validation(format!(
                "cluster {}: node group '{}' has no node processes",
                label, ng.name
            )));
        }
    }

    if cluster.existing_cluster.is_none() {
        if node_groups.is_empty() {
            return Err(Error::Validation(format!(
                "cluster {}: node_group_templates are required without existing_cluster",
                label
            )));
        }

        let Some(template) = &cluster.cluster_template else {
            return Err(Error::Validation(format!(
                "cluster {}: cluster_template is required without existing_cluster",
                label
            )));
        };

        if template.node_group_templates.is_empty() {
            return Err(Error::Validation(format!(
                "cluster {}: cluster_template has no node groups",
                label
            )));
        }

        for name in template.node_group_templates.keys() {
            if !node_groups.contains(name.as_str()) {
                return Err(Error::Validation(format!(
                    "cluster {}: cluster_template uses undefined node group '{}'",
                    label, name
                )));
            }
        }

        for op in &cluster.scaling {
            if op.operation == ScalingOperation::Resize
                && !node_groups.contains(op.node_group.as_str())
            {
                return Err(Error::Validation(format!(
                    "cluster {}: cannot resize undefined node group '{}'",
                    label, op.node_group
                )));
            }
        }
    }

    let steps = cluster.scenario.as_deref().unwrap_or_default();
    if steps.contains(&Step::Scale) && cluster.scaling.is_empty() {
        tracing::warn!("cluster {}: 'scale' step without scaling operations", label);
    }

    for flow in &cluster.edp_jobs_flow {
        if !flows.contains_key(flow) {
            return Err(Error::UnknownJobFlow {
                job: flow.clone(),
                cluster: label,
            });
        }
    }

    Ok(())
}

/// EDP job validation
pub fn validate_job(flow: &str, index: usize, job: &EdpJob) -> ValidationResult<()> {
    let label = format!("job {}[{}] ({})", flow, index, job.job_type);

    if job.job_type.requires_main_lib() && job.main_lib.is_none() {
        return Err(Error::Validation(format!("{} requires main_lib", label)));
    }

    if job.job_type.forbids_main_lib() && job.main_lib.is_some() {
        return Err(Error::Validation(format!(
            "{} cannot have main_lib, use additional_libs",
            label
        )));
    }

    if let Some(input) = &job.input_datasource {
        if input.source.as_deref().unwrap_or_default().is_empty() {
            return Err(Error::Validation(format!(
                "{}: input_datasource requires a source",
                label
            )));
        }
    }

    if let Some(output) = &job.output_datasource {
        if output.destination.as_deref().unwrap_or_default().is_empty() {
            return Err(Error::Validation(format!(
                "{}: output_datasource requires a destination",
                label
            )));
        }
    }

    for binary in job.main_lib.iter().chain(job.additional_libs.iter()) {
        if binary.source.is_empty() {
            return Err(Error::Validation(format!(
                "{}: job binary source cannot be empty",
                label
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sahara_common::scenario::DataSourceType;

    fn scenario(yaml: &str) -> ScenarioConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    const VALID: &str = r#"
concurrency: 2
network:
  type: neutron
clusters:
  - plugin_name: vanilla
    plugin_version: 2.7.1
    image: sahara-vanilla
    node_group_templates:
      - name: master
        flavor: m1.small
        node_processes: [namenode, resourcemanager]
      - name: worker
        flavor: m1.small
        node_processes: [datanode, nodemanager]
    cluster_template:
      node_group_templates:
        master: 1
        worker: 3
    scaling:
      - operation: resize
        node_group: worker
        size: 4
    edp_jobs_flow: [pig_job]
edp_jobs_flow:
  pig_job:
    - type: Pig
      input_datasource:
        type: swift
        source: edp-examples/edp-pig/input
      output_datasource:
        type: hdfs
        destination: /user/hadoop/edp-output
      main_lib:
        type: swift
        source: edp-examples/edp-pig/example.pig
"#;

    #[test]
    fn test_valid_scenario() {
        assert!(validate_scenario(&scenario(VALID)).is_ok());
    }

    #[test]
    fn test_validate_merged_config() {
        let mut merged = MergedConfig::default();
        merged
            .merge_document(&serde_yaml::from_str(VALID).unwrap(), "valid.yaml")
            .unwrap();
        merged.resolve_job_flows(&[]).unwrap();
        let typed = validate(&merged).unwrap();
        assert_eq!(typed.clusters[0].edp_jobs_flow, vec!["pig_job"]);
        assert_eq!(typed.concurrency, Some(2));
    }

    #[test]
    fn test_bad_network_type_is_schema_error() {
        let mut merged = MergedConfig::default();
        merged
            .merge_document(&serde_yaml::from_str(VALID).unwrap(), "valid.yaml")
            .unwrap();
        merged
            .network
            .insert("type".into(), serde_yaml::Value::String("test".into()));
        assert!(matches!(validate(&merged), Err(Error::Schema(_))));
    }

    #[test]
    fn test_no_clusters() {
        let err = validate_scenario(&ScenarioConfig::default()).unwrap_err();
        assert!(err.to_string().contains("at least one cluster"));
    }

    #[test]
    fn test_zero_concurrency() {
        let mut config = scenario(VALID);
        config.concurrency = Some(0);
        assert!(validate_scenario(&config).is_err());
    }

    #[test]
    fn test_undefined_template_node_group() {
        let mut config = scenario(VALID);
        let template = config.clusters[0].cluster_template.as_mut().unwrap();
        template.node_group_templates.insert("edge".to_string(), 1);
        let err = validate_scenario(&config).unwrap_err();
        assert!(err.to_string().contains("undefined node group 'edge'"));
    }

    #[test]
    fn test_resize_undefined_node_group() {
        let mut config = scenario(VALID);
        config.clusters[0].scaling[0].node_group = "edge".to_string();
        assert!(validate_scenario(&config).is_err());

        // add may target a template that already exists in the cloud
        config.clusters[0].scaling[0].operation = ScalingOperation::Add;
        assert!(validate_scenario(&config).is_ok());
    }

    #[test]
    fn test_existing_cluster_needs_no_templates() {
        let mut config = scenario(VALID);
        let cluster = &mut config.clusters[0];
        cluster.existing_cluster = Some("cluster-1".to_string());
        cluster.node_group_templates.clear();
        cluster.cluster_template = None;
        assert!(validate_scenario(&config).is_ok());
    }

    #[test]
    fn test_duplicate_node_group() {
        let mut config = scenario(VALID);
        let first = config.clusters[0].node_group_templates[0].clone();
        config.clusters[0].node_group_templates.push(first);
        assert!(validate_scenario(&config).is_err());
    }

    #[test]
    fn test_pig_without_main_lib() {
        let mut config = scenario(VALID);
        config.edp_jobs_flow.get_mut("pig_job").unwrap()[0].main_lib = None;
        let err = validate_scenario(&config).unwrap_err();
        assert!(err.to_string().contains("requires main_lib"));
    }

    #[test]
    fn test_java_with_main_lib() {
        let job: EdpJob = serde_yaml::from_str(
            "type: Java\nmain_lib:\n  type: database\n  source: examples.jar\n",
        )
        .unwrap();
        assert!(validate_job("java_job", 0, &job).is_err());
    }

    #[test]
    fn test_boot_from_volume_and_maprfs_username() {
        let yaml = VALID
            .replace(
                "node_processes: [datanode, nodemanager]",
                "node_processes: [datanode, nodemanager]\n        boot_from_volume: true",
            )
            .replace(
                "type: swift\n        source: edp-examples/edp-pig/input",
                "type: maprfs\n        source: /user/mapr/input\n        maprfs_username: mapr",
            );
        let config = scenario(&yaml);
        assert!(validate_scenario(&config).is_ok());

        let worker = &config.clusters[0].node_group_templates[1];
        assert_eq!(worker.boot_from_volume, Some(true));
        let input = config.edp_jobs_flow["pig_job"][0].input_datasource.as_ref().unwrap();
        assert_eq!(input.kind, DataSourceType::Maprfs);
        assert_eq!(input.maprfs_username.as_deref(), Some("mapr"));
    }

    #[test]
    fn test_output_without_destination() {
        let job: EdpJob = serde_yaml::from_str(
            "type: MapReduce\noutput_datasource:\n  type: hdfs\n  source: /tmp/x\n",
        )
        .unwrap();
        let err = validate_job("mr", 0, &job).unwrap_err();
        assert!(err.to_string().contains("requires a destination"));
    }
}
