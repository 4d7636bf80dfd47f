//! Load a schema snapshot into an empty database

use anyhow::{bail, Context, Result};
use td_migrate::Snapshot;

use crate::cli::{GlobalArgs, LoadArgs};
use crate::commands::common::{self, version_label};

/// Execute the load command
pub(crate) async fn execute(args: &LoadArgs, global: &GlobalArgs) -> Result<()> {
    let project = common::load_project(global)?;
    let path = match &args.file {
        Some(file) => common::project_path(&project, file),
        None => project.config.schema_path_absolute(&project.root),
    };
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    let version = Snapshot::parse(&text).version;

    if args.baseline && version.is_none() {
        bail!(
            "Snapshot {} records no applied version; nothing to baseline",
            path.display()
        );
    }

    let lock = common::lock_options(&project.config, None);
    let migrator = common::build_migrator(&project, global, lock).await?;

    let baseline = version.filter(|_| args.baseline);
    let result = match baseline {
        Some(version) => migrator.load_and_baseline(&mut text.as_bytes(), version).await,
        None => migrator.load_from_snapshot(&mut text.as_bytes()).await,
    };
    let report = match result {
        Ok(report) => report,
        Err(err) => {
            migrator.close().await?;
            return Err(err).with_context(|| format!("Failed to load snapshot {}", path.display()));
        }
    };

    println!(
        "Loaded snapshot {} (version {})",
        path.display(),
        version_label(version)
    );
    if let Some(version) = baseline {
        println!(
            "Recorded {} migration(s) as applied up to {version}",
            report.recorded.len()
        );
    }
    if let Some(warning) = &report.release_warning {
        eprintln!("Warning: failed to release the migration lock: {warning}");
    }

    migrator.close().await?;
    Ok(())
}
