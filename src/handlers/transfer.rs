//! Export and import handlers

use anyhow::{Context, Result};
use colored::Colorize;

use crate::archive::ZpaqArchiver;
use crate::logger;
use crate::model::{Algorithm, Config};
use crate::report::Report;
use crate::sync;

use super::sync::print_report;

/// Handle `export`: archive the export entries
pub fn handle_export(config: &Config, algorithm: Option<Algorithm>) -> Result<()> {
    let mut compression = config.settings.compression.clone();
    if let Some(algorithm) = algorithm {
        compression.algorithm = algorithm;
    }

    let archiver = ZpaqArchiver::locate(&compression)?;
    log::debug!("using archiver {}", archiver.binary().display());

    match sync::export(config, &archiver).context("Export failed")? {
        Some(path) => {
            println!(
                "{} Exported to {}",
                "✓".green(),
                path.display().to_string().cyan()
            );
            logger::log_to_file(&format!("export to {}", path.display()))?;
        }
        None => println!("{}", "Nothing to export.".yellow()),
    }

    Ok(())
}

/// Handle `import`: restore the export entries from the archive
pub fn handle_import(config: &Config, force: bool) -> Result<Report> {
    let archiver = ZpaqArchiver::locate(&config.settings.compression)?;

    println!("{}", "Importing...".cyan().bold());
    let report = sync::import(config, &archiver, force).context("Import failed")?;

    print_report(&report);
    logger::log_to_file(&format!(
        "import: {} entries, {} failed",
        report.entries.len(),
        report.failures().count()
    ))?;

    Ok(report)
}
