//! Create a migration unit skeleton

use anyhow::{Context, Result};
use chrono::Utc;
use td_migrate::authoring;

use crate::cli::{GlobalArgs, NewArgs};
use crate::commands::common;

/// Execute the new command
pub(crate) async fn execute(args: &NewArgs, global: &GlobalArgs) -> Result<()> {
    let project = common::load_project(global)?;
    let dir = project.config.migrations_dir_absolute(&project.root);

    let path = authoring::new_unit(&dir, &args.name, Utc::now())
        .with_context(|| format!("Failed to create migration '{}'", args.name))?;

    println!("Created {}", path.display());
    println!("Rebuild `td` to include it.");
    Ok(())
}
