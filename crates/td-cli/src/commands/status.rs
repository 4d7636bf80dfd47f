//! Show migration status

use anyhow::{Context, Result};
use td_migrate::StatusReport;

use crate::cli::{GlobalArgs, StatusArgs, StatusOutput};
use crate::commands::common::{self, version_label};

/// Execute the status command
pub(crate) async fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let project = common::load_project(global)?;
    let lock = common::lock_options(&project.config, None);
    let migrator = common::build_migrator(&project, global, lock).await?;

    let report = migrator.status().await.context("Failed to read status")?;
    match args.output {
        StatusOutput::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        StatusOutput::Table => print!("{}", render_table(&report)),
    }

    migrator.close().await?;
    Ok(())
}

fn render_table(report: &StatusReport) -> String {
    let mut out = format!("Current version: {}\n", version_label(report.current));
    if report.locked {
        out.push_str(
            "Lock: HELD (a run is in progress, or a failed run left it; see `td db unlock`)\n",
        );
    } else {
        out.push_str("Lock: free\n");
    }

    out.push('\n');
    let width = report
        .units
        .iter()
        .map(|u| u.id.to_string().len())
        .max()
        .unwrap_or(0);
    for unit in &report.units {
        let state = if unit.applied { "applied" } else { "pending" };
        out.push_str(&format!(
            "  {:<width$}  {:<8} {}\n",
            unit.id, state, unit.description
        ));
    }
    if report.units.is_empty() {
        out.push_str("  (no migrations)\n");
    }

    if !report.unknown_applied.is_empty() {
        let ids: Vec<String> = report.unknown_applied.iter().map(u64::to_string).collect();
        out.push_str(&format!(
            "\nApplied but not in this build: {}\n",
            ids.join(", ")
        ));
    }
    out
}

#[cfg(test)]
#[path = "status_test.rs"]
mod tests;
