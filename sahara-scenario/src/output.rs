//! Output formatting for the runner
//!
//! Status lines, YAML dumps and the test plan table.

use crate::defaults::TestPlan;
use colored::Colorize;
use serde::Serialize;
use tabled::{Table, Tabled};

/// One planned test case, as shown by `--validate` and before a run
#[derive(Tabled)]
pub struct TestCaseRow {
    #[tabled(rename = "Class")]
    pub class_name: String,
    #[tabled(rename = "Plugin")]
    pub plugin: String,
    #[tabled(rename = "Image")]
    pub image: String,
    #[tabled(rename = "Steps")]
    pub steps: String,
    #[tabled(rename = "Jobs")]
    pub jobs: usize,
}

/// Print data as a table using the tabled crate
pub fn print_table<T: Tabled>(data: Vec<T>) {
    if data.is_empty() {
        println!("{}", "No test cases".yellow());
        return;
    }

    let table = Table::new(data);
    println!("{}", table);
}

/// Summary table of the planned test cases
pub fn print_plan(plan: &TestPlan) {
    let rows: Vec<TestCaseRow> = plan
        .testcases
        .iter()
        .map(|tc| TestCaseRow {
            class_name: tc.class_name.clone(),
            plugin: format!("{} {}", tc.cluster.plugin_name, tc.cluster.plugin_version),
            image: tc.cluster.image.clone(),
            steps: tc
                .scenario
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            jobs: tc.jobs.len(),
        })
        .collect();
    print_table(rows);
}

/// Print data as YAML
pub fn print_yaml<T: Serialize>(data: &T) -> anyhow::Result<()> {
    let yaml = serde_yaml::to_string(data)?;
    println!("{}", yaml);
    Ok(())
}

/// Print a success message with green checkmark
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message.green());
}

/// Print an error message with red X
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message.red());
}

/// Print an info message with blue i
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print a warning message with yellow triangle
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message.yellow());
}

/// Format duration in seconds to human-readable string
pub fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        let m = secs / 60;
        let s = secs % 60;
        if s > 0 {
            format!("{}m {}s", m, s)
        } else {
            format!("{}m", m)
        }
    } else {
        let h = secs / 3600;
        let m = (secs % 3600) / 60;
        if m > 0 {
            format!("{}h {}m", h, m)
        } else {
            format!("{}h", h)
        }
    }
}
