//! Sahara scenario runner
//!
//! Command-line entry point for the scenario test runner

use anyhow::{Context, Result};
use clap::Parser;
use sahara_scenario::auth::AuthOptions;
use sahara_scenario::logging::LoggingConfig;
use sahara_scenario::output;
use sahara_scenario::{RunOptions, RunnerSettings};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sahara-scenario", author, about = "Scenario tests runner.", long_about = None)]
struct Cli {
    /// Path to scenario files or directories
    scenario_arguments: Vec<PathBuf>,

    /// Path to the file with template variables
    #[arg(short = 'V', long = "variable_file")]
    variable_file: Option<PathBuf>,

    /// Increase output verbosity
    #[arg(long)]
    verbose: bool,

    /// Validate yaml-files, tests will not be run
    #[arg(long)]
    validate: bool,

    /// Pairs of arguments key:value
    #[arg(long = "args", num_args = 1..)]
    args: Vec<String>,

    /// Specify plugin name
    #[arg(short = 'p', long)]
    plugin: Option<String>,

    /// Specify plugin version
    #[arg(short = 'v', long = "plugin_version")]
    plugin_version: Option<String>,

    /// Specify Sahara release
    #[arg(short = 'r', long)]
    release: Option<String>,

    /// Write results of test to file
    #[arg(long)]
    report: bool,

    /// Specify count of runs current cases
    #[arg(long, default_value_t = 1, value_parser = parse_count)]
    count: u32,

    /// Set of features to enable
    #[arg(long = "feature", num_args = 1..)]
    features: Vec<String>,

    /// Use APIv2 in the generated tests
    #[arg(long)]
    v2: bool,

    /// Directory of the default templates
    #[arg(long = "templates-dir")]
    templates_dir: Option<PathBuf>,

    /// Print a sample runner configuration and exit
    #[arg(long = "sample-config")]
    sample_config: bool,

    #[command(flatten)]
    auth: AuthOptions,
}

fn parse_count(value: &str) -> std::result::Result<u32, String> {
    match value.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!(
            "{} is an invalid value of count. Value must be int and > 0.",
            value
        )),
    }
}

impl Cli {
    fn run_options(self) -> RunOptions {
        RunOptions {
            scenario_arguments: self.scenario_arguments,
            variable_file: self.variable_file,
            verbose: self.verbose,
            validate_only: self.validate,
            args: self.args,
            plugin: self.plugin,
            plugin_version: self.plugin_version,
            release: self.release,
            report: self.report,
            count: self.count,
            features: self.features,
            use_api_v2: self.v2,
            auth: self.auth,
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let mut settings = RunnerSettings::load().context("Failed to load runner settings")?;
    if let Some(dir) = &cli.templates_dir {
        settings.paths.templates_dir = dir.clone();
    }

    let _guard = LoggingConfig::from_settings(&settings.logging, cli.verbose)
        .init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    sahara_scenario::run(&cli.run_options(), &settings).await
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.sample_config {
        print!("{}", RunnerSettings::generate_sample());
        return;
    }

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            1
        }
    };
    std::process::exit(code);
}
