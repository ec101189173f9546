use std::fs;
use std::path::Path;

use crate::copy;
use crate::error::{IoContext, Result};
use crate::fsops;
use crate::model::{Config, Section};
use crate::report::{Outcome, Report};

/// Replace every synced symlink with a real copy of what it points at.
///
/// The store is never modified. Broken links and entries that are not
/// symlinks are left exactly as they are.
pub fn unsync(config: &Config) -> Report {
    unsync_sections(&config.sync)
}

pub fn unsync_sections(sections: &[Section]) -> Report {
    log::info!("unsyncing...");
    let mut report = Report::new();

    for section in sections {
        for entry in &section.entries {
            let path = section.source(entry);
            let outcome = match unsync_entry(&path) {
                Ok(outcome) => outcome,
                Err(e) => {
                    log::error!("{}: {}", path.display(), e);
                    Outcome::Failed(e.to_string())
                }
            };
            report.record(&section.name, entry, path, outcome);
        }
    }

    if report.errored() {
        log::warn!("Unsync finished with errors");
    } else {
        log::info!("Files unsynced successfully");
    }

    report
}

fn unsync_entry(path: &Path) -> Result<Outcome> {
    if !fsops::is_symlink(path) {
        return Ok(if fsops::is_present(path) {
            Outcome::Unchanged
        } else {
            Outcome::Absent
        });
    }

    let link_target = fs::read_link(path).at(path)?;
    let target = match fs::canonicalize(path) {
        Ok(target) if target.exists() => target,
        _ => {
            log::warn!(
                "{} is a broken symlink, leaving it for manual inspection",
                path.display()
            );
            return Ok(Outcome::Skipped("broken symlink".into()));
        }
    };

    log::debug!("Unsyncing {}...", path.display());
    fs::remove_file(path).at(path)?;

    if let Err(e) = copy::copy(&target, path, false) {
        // Put the link back unless part of the copy already landed
        if !fsops::is_present(path) {
            fsops::symlink(&link_target, path)?;
        }
        return Err(e);
    }

    Ok(Outcome::Restored)
}
