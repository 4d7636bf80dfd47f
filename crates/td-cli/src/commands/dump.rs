//! Write a schema snapshot

use anyhow::{Context, Result};

use crate::cli::{DumpArgs, GlobalArgs};
use crate::commands::common::{self, version_label};

/// Execute the dump command
pub(crate) async fn execute(args: &DumpArgs, global: &GlobalArgs) -> Result<()> {
    let project = common::load_project(global)?;
    let lock = common::lock_options(&project.config, None);
    let migrator = common::build_migrator(&project, global, lock).await?;

    if args.output.as_deref() == Some("-") {
        let mut stdout = std::io::stdout();
        migrator
            .dump_snapshot(&mut stdout)
            .await
            .context("Failed to dump schema")?;
    } else {
        let path = match &args.output {
            Some(output) => common::project_path(&project, output),
            None => project.config.schema_path_absolute(&project.root),
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let mut file = std::fs::File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let version = migrator
            .dump_snapshot(&mut file)
            .await
            .context("Failed to dump schema")?;
        println!(
            "Wrote schema at version {} to {}",
            version_label(version),
            path.display()
        );
    }

    migrator.close().await?;
    Ok(())
}
