//! Scenario run pipeline
//!
//! default templates -> scenario files -> credentials -> template variables
//! -> merge -> validation -> test plan -> test file -> test runner

use crate::auth::{self, AuthOptions};
use crate::defaults::TestPlan;
use crate::execution;
use crate::files::{get_scenario_files, TemplateLocator};
use crate::merge::generate_config;
use crate::output;
use crate::settings::RunnerSettings;
use crate::testcase::{create_testcase_file, TestFileOptions};
use crate::validation;
use crate::variables;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// What to run, as given on the command line
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub scenario_arguments: Vec<PathBuf>,
    pub variable_file: Option<PathBuf>,
    pub verbose: bool,
    pub validate_only: bool,
    pub args: Vec<String>,
    pub plugin: Option<String>,
    pub plugin_version: Option<String>,
    pub release: Option<String>,
    pub report: bool,
    pub count: u32,
    pub features: Vec<String>,
    pub use_api_v2: bool,
    pub auth: AuthOptions,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            scenario_arguments: Vec::new(),
            variable_file: None,
            verbose: false,
            validate_only: false,
            args: Vec::new(),
            plugin: None,
            plugin_version: None,
            release: None,
            report: false,
            count: 1,
            features: Vec::new(),
            use_api_v2: false,
            auth: AuthOptions::default(),
        }
    }
}

/// Everything up to and including validation and defaults
pub fn prepare(options: &RunOptions, settings: &RunnerSettings) -> Result<TestPlan> {
    let locator = TemplateLocator::new(&settings.paths.templates_dir);
    let scenario_arguments = locator
        .default_templates(
            options.plugin.as_deref(),
            options.plugin_version.as_deref(),
            options.release.as_deref(),
            &options.scenario_arguments,
            &options.features,
        )
        .context("Failed to select default templates")?;

    let files = get_scenario_files(&scenario_arguments)?;
    if files.is_empty() {
        anyhow::bail!("No scenario files given");
    }
    tracing::debug!(count = files.len(), "Found scenario files");

    let auth = auth::resolve(&options.auth, &auth::clouds_search_paths());

    let scenario_args = variables::parse_args(&options.args);
    let template_variables = variables::collect(
        &files,
        options.variable_file.as_deref(),
        &scenario_args,
        &auth.template_variables(),
    );
    if options.verbose {
        output::print_info("Template variables:");
        output::print_yaml(&template_variables)?;
    }

    let merged = generate_config(
        &files,
        &template_variables,
        &auth.explicit,
        &options.features,
        options.verbose,
    )
    .context("Failed to generate the scenario configuration")?;

    let config = validation::validate(&merged).context("Scenario validation failed")?;

    TestPlan::from_config(config, options.count).context("Failed to build the test plan")
}

/// Run the whole pipeline and return the process exit code
pub async fn run(options: &RunOptions, settings: &RunnerSettings) -> Result<i32> {
    let plan = prepare(options, settings)?;

    if options.validate_only {
        output::print_success("Scenario configuration is valid");
        output::print_plan(&plan);
        return Ok(0);
    }

    output::print_plan(&plan);

    let templates_dir = &settings.paths.templates_dir;
    let file_options = TestFileOptions {
        report: options.report,
        results_dir: std::env::current_dir().context("Failed to get the current directory")?,
        default_templ_dir: std::fs::canonicalize(templates_dir)
            .unwrap_or_else(|_| templates_dir.clone()),
        use_api_v2: options.use_api_v2,
    };

    let test_dir = create_testcase_file(&plan, &file_options)
        .context("Failed to create the test case file")?;

    let code = execution::run_tests(&settings.runner.command, plan.concurrency, &test_dir)
        .await
        .context("Failed to run the tests")?;

    if code != 0 {
        output::print_warning(&format!("Test runner exited with code {}", code));
    }
    Ok(code)
}
