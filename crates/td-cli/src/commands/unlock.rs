//! Manual lock recovery

use anyhow::{Context, Result};

use crate::cli::GlobalArgs;
use crate::commands::common;

/// Execute the unlock command
pub(crate) async fn execute(global: &GlobalArgs) -> Result<()> {
    let project = common::load_project(global)?;
    let lock = common::lock_options(&project.config, None);
    let migrator = common::build_migrator(&project, global, lock).await?;

    let status = migrator.status().await.context("Failed to read status")?;
    if !status.locked {
        println!("Migration lock is not held");
    } else {
        migrator
            .force_unlock()
            .await
            .context("Failed to release the migration lock")?;
        println!(
            "Released the migration lock (ledger at {})",
            common::version_label(status.current)
        );
    }

    migrator.close().await?;
    Ok(())
}
