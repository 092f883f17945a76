//! Test case file generation
//!
//! Renders one Python test class per test case, each deriving from the
//! scenario base test class, and writes it into a fresh directory together
//! with the test runner configuration.

use crate::defaults::{TestCase, TestPlan};
use crate::output;
use sahara_common::{Error, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};

pub const STESTR_CONF: &str = "[DEFAULT]\ntest_path=.\ngroup_regex=([^\\.]+\\.)+\n";

const HEADER: &str = "\
# Generated by sahara-scenario, do not edit.

from sahara_tests.scenario import base
";

/// Settings of the generated test classes that do not come from the
/// scenario files
#[derive(Debug, Clone)]
pub struct TestFileOptions {
    pub report: bool,
    pub results_dir: PathBuf,
    pub default_templ_dir: PathBuf,
    pub use_api_v2: bool,
}

/// Random name: the first 8 characters of a UUID, optionally prefixed
pub fn rand_name(name: &str) -> String {
    let mut data = uuid::Uuid::new_v4().simple().to_string();
    data.truncate(8);
    if name.is_empty() {
        data
    } else {
        format!("{}-{}", name, data)
    }
}

/// Render a JSON value as a Python literal
pub fn python_literal(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => python_string(s),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(python_literal).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(map) => {
            let items: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", python_string(k), python_literal(v)))
                .collect();
            format!("{{{}}}", items.join(", "))
        }
    }
}

// ASCII-only single-quoted literal
fn python_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            c if (c as u32) <= 0xffff => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push_str(&format!("\\U{:08x}", c as u32)),
        }
    }
    out.push('\'');
    out
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| Error::InvalidConfig(e.to_string()))
}

fn render_class(
    testcase: &TestCase,
    credentials: &Value,
    network: &Value,
    options: &TestFileOptions,
) -> Result<String> {
    let class = format!("{}TestCase", testcase.class_name);
    let path_literal = |p: &Path| python_string(&p.display().to_string());

    let mut out = String::new();
    out.push_str(&format!("\n\nclass {}(base.BaseTestCase):\n", class));
    out.push_str("    @classmethod\n");
    out.push_str("    def setUpClass(cls):\n");
    out.push_str(&format!("        super({}, cls).setUpClass()\n", class));
    out.push_str(&format!("        cls.credentials = {}\n", python_literal(credentials)));
    out.push_str(&format!("        cls.network = {}\n", python_literal(network)));
    out.push_str(&format!(
        "        cls.testcase = {}\n",
        python_literal(&testcase.to_testcase_value()?)
    ));
    out.push_str(&format!(
        "        cls.report = {}\n",
        python_literal(&Value::Bool(options.report))
    ));
    out.push_str(&format!(
        "        cls.results_dir = {}\n",
        path_literal(&options.results_dir)
    ));
    out.push_str(&format!(
        "        cls.default_templ_dir = {}\n",
        path_literal(&options.default_templ_dir)
    ));
    out.push_str(&format!(
        "        cls.use_api_v2 = {}\n",
        python_literal(&Value::Bool(options.use_api_v2))
    ));
    out.push_str("\n    def test_plugin(self):\n");
    out.push_str("        self.create_cluster()\n");
    for step in &testcase.scenario {
        out.push_str(&format!("        self.check_{}()\n", step.as_str()));
    }
    Ok(out)
}

/// Render the whole test module
pub fn render_testcase_file(plan: &TestPlan, options: &TestFileOptions) -> Result<String> {
    let credentials = to_json(&plan.credentials)?;
    let network = to_json(&plan.network)?;

    let mut out = String::from(HEADER);
    for testcase in &plan.testcases {
        out.push_str(&render_class(testcase, &credentials, &network, options)?);
    }
    Ok(out)
}

/// Write the test module and `.stestr.conf` into `dir`, returning the
/// module path
pub fn write_testcase_file(dir: &Path, plan: &TestPlan, options: &TestFileOptions) -> Result<PathBuf> {
    let source = render_testcase_file(plan, options)?;
    let file = dir.join(format!("test_{}.py", rand_name("")));
    std::fs::write(&file, source)?;
    std::fs::write(dir.join(".stestr.conf"), STESTR_CONF)?;
    tracing::debug!(file = %file.display(), "Wrote test case file");
    Ok(file)
}

/// Generate the test directory; it is kept after the run
pub fn create_testcase_file(plan: &TestPlan, options: &TestFileOptions) -> Result<PathBuf> {
    let dir = tempfile::Builder::new()
        .prefix("sahara-scenario-")
        .tempdir()?
        .keep();
    write_testcase_file(&dir, plan, options)?;
    output::print_info(&format!(
        "The generated test file located at: {}",
        dir.display()
    ));
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sahara_common::scenario::ScenarioConfig;
    use serde_json::json;

    fn plan(count: u32) -> TestPlan {
        let config: ScenarioConfig = serde_yaml::from_str(
            r#"
concurrency: 1
clusters:
  - plugin_name: vanilla
    plugin_version: 2.7.1
    image: sahara-vanilla
    scenario: [run_jobs, scale]
"#,
        )
        .unwrap();
        TestPlan::from_config(config, count).unwrap()
    }

    fn options() -> TestFileOptions {
        TestFileOptions {
            report: true,
            results_dir: PathBuf::from("/tmp/results"),
            default_templ_dir: PathBuf::from("/usr/share/sahara-scenario/defaults"),
            use_api_v2: false,
        }
    }

    #[test]
    fn test_python_literal() {
        let value = json!({
            "a": null,
            "b": [true, false, 3, 1.5],
            "c": "it's a\npath\\",
        });
        assert_eq!(
            python_literal(&value),
            "{'a': None, 'b': [True, False, 3, 1.5], 'c': 'it\\'s a\\npath\\\\'}"
        );
        assert_eq!(python_literal(&json!("caf\u{e9}")), "'caf\\u00e9'");
    }

    #[test]
    fn test_rand_name() {
        assert_eq!(rand_name("").len(), 8);
        let name = rand_name("cluster");
        assert!(name.starts_with("cluster-"));
        assert_eq!(name.len(), "cluster-".len() + 8);
    }

    #[test]
    fn test_render_classes() {
        let source = render_testcase_file(&plan(2), &options()).unwrap();
        assert!(source.contains("from sahara_tests.scenario import base"));
        assert!(source.contains("class vanilla2_7_1TestCase(base.BaseTestCase):"));
        assert!(source.contains("class vanilla2_7_1_1TestCase(base.BaseTestCase):"));
        assert!(source.contains("super(vanilla2_7_1TestCase, cls).setUpClass()"));
        assert!(source.contains("cls.report = True"));
        assert!(source.contains("cls.use_api_v2 = False"));
        assert!(source.contains("cls.results_dir = '/tmp/results'"));
        assert!(source.contains("'os_username': 'admin'"));
        assert!(source.contains("'type': 'neutron'"));
        assert!(source.contains(
            "        self.create_cluster()\n        self.check_run_jobs()\n        self.check_scale()\n"
        ));
        assert!(source.is_ascii());
    }

    #[test]
    fn test_numeric_flavor_rendered_as_string() {
        let config: ScenarioConfig = serde_yaml::from_str(
            r#"
clusters:
  - plugin_name: fake
    plugin_version: 0.1
    image: fake-image
    node_group_templates:
      - name: aio
        flavor: 2
        node_processes: [namenode, datanode]
    cluster_template:
      node_group_templates:
        aio: 1
"#,
        )
        .unwrap();
        let plan = TestPlan::from_config(config, 1).unwrap();
        let source = render_testcase_file(&plan, &options()).unwrap();
        assert!(source.contains("'flavor': '2'"));
    }

    #[test]
    fn test_write_testcase_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_testcase_file(dir.path(), &plan(1), &options()).unwrap();

        let name = file.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("test_") && name.ends_with(".py"));
        let conf = std::fs::read_to_string(dir.path().join(".stestr.conf")).unwrap();
        assert_eq!(conf, STESTR_CONF);
        assert!(conf.contains("test_path=."));
    }
}
