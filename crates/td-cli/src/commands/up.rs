//! Apply or revert migrations

use anyhow::{Context, Result};
use tokio::sync::watch;

use crate::cli::{GlobalArgs, UpArgs};
use crate::commands::common::{self, version_label, ExitCode};

/// Execute the up command
pub(crate) async fn execute(args: &UpArgs, global: &GlobalArgs) -> Result<()> {
    let project = common::load_project(global)?;

    // Ctrl-C abandons a lock wait. Once the lock is held the run continues
    // to completion so no unit is cut off halfway.
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("interrupt received, abandoning lock wait");
            let _ = cancel_tx.send(true);
        }
    });

    let lock = common::lock_options(&project.config, args.timeout).with_cancel(cancel_rx);
    let migrator = common::build_migrator(&project, global, lock).await?;

    let result = migrator.apply_to_version(args.to).await;
    interrupt.abort();

    let report = match result {
        Ok(report) => report,
        Err(err) => {
            eprintln!("Error: {err}");
            if err.leaves_lock_held() {
                eprintln!(
                    "The migration lock is still held. Inspect the database, then run `td db unlock`."
                );
            }
            migrator.close().await?;
            return Err(ExitCode(1).into());
        }
    };

    if report.is_noop() {
        println!("Schema up to date at {}", version_label(report.to));
    } else {
        for id in &report.applied {
            println!("  applied  {id}");
        }
        for id in &report.reverted {
            println!("  reverted {id}");
        }
        println!(
            "Migrated {} -> {} ({} applied, {} reverted)",
            version_label(report.from),
            version_label(report.to),
            report.applied.len(),
            report.reverted.len()
        );
    }
    if let Some(warning) = &report.release_warning {
        eprintln!("Warning: failed to release the migration lock: {warning}");
    }

    if project.config.schema.dump_after_migrate && !report.is_noop() {
        let path = project.config.schema_path_absolute(&project.root);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let mut file = std::fs::File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        migrator
            .dump_snapshot(&mut file)
            .await
            .context("Failed to dump schema snapshot")?;
        println!("Wrote schema snapshot to {}", path.display());
    }

    migrator.close().await?;
    Ok(())
}
