use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::fsops;
use crate::model::{Config, Section};
use crate::report::{Outcome, Report};
use crate::trash::Trash;

use super::state::EntryState;

/// Conflict policy for entries that have real content on both sides
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ForceMode {
    /// Skip conflicts, never delete without the trash
    #[default]
    None,
    /// Permanent deletion is allowed when the trash is unavailable, but no
    /// side wins a conflict
    Delete,
    /// Local content replaces the store copy
    Local,
    /// Store content replaces the local copy
    Sync,
}

impl ForceMode {
    /// Whether permanent deletion may stand in for the trash
    pub fn is_forced(self) -> bool {
        self != Self::None
    }
}

/// Moves entries into the sync directory and links them back
pub struct Reconciler<'a> {
    trash: &'a dyn Trash,
    force: ForceMode,
}

impl<'a> Reconciler<'a> {
    pub fn new(trash: &'a dyn Trash, force: ForceMode) -> Self {
        Self { trash, force }
    }

    /// Reconcile every entry of `sections` against `sync_dir`.
    ///
    /// Only an invalid `sync_dir` fails the call, and it does so before
    /// anything is touched. Per-entry failures are logged and collected in
    /// the report while the remaining entries are still processed.
    pub fn run(&self, sections: &[Section], sync_dir: &Path) -> Result<Report> {
        if sync_dir.as_os_str().is_empty() || !sync_dir.is_absolute() {
            return Err(Error::config(format!(
                "Sync directory must be a non-empty absolute path, got '{}'",
                sync_dir.display()
            )));
        }

        log::info!("syncing...");
        let mut report = Report::new();

        for section in sections {
            let folder = sync_dir.join(&section.name);
            if let Err(e) = fs::create_dir_all(&folder) {
                log::error!("Failed to create {}: {}", folder.display(), e);
                for entry in &section.entries {
                    report.record(
                        &section.name,
                        entry,
                        section.source(entry),
                        Outcome::Failed(format!("Failed to create {}: {e}", folder.display())),
                    );
                }
                continue;
            }

            for entry in &section.entries {
                let source = section.source(entry);
                let dest = section.store_path(sync_dir, entry);

                let outcome = match self.reconcile_entry(&source, &dest) {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        log::error!("{}: {}", source.display(), e);
                        Outcome::Failed(e.to_string())
                    }
                };
                report.record(&section.name, entry, source, outcome);
            }
        }

        if report.errored() {
            log::warn!("Sync finished with errors");
        } else {
            log::info!("Files synced successfully");
        }

        Ok(report)
    }

    fn reconcile_entry(&self, source: &Path, dest: &Path) -> Result<Outcome> {
        match EntryState::detect(source, dest) {
            EntryState::Absent => {
                log::debug!("{} does not exist on either side", source.display());
                Ok(Outcome::Absent)
            }
            EntryState::Linked => {
                log::debug!("{} is already linked", source.display());
                Ok(Outcome::Unchanged)
            }
            EntryState::StaleSymlink => {
                log::warn!(
                    "{} is a symlink that doesn't point into the sync directory, leaving it alone",
                    source.display()
                );
                Ok(Outcome::Skipped(
                    "symlink does not point into the sync directory".into(),
                ))
            }
            EntryState::Misdirected => {
                log::debug!("removing symlink {}", source.display());
                self.discard(source)?;
                self.link(source, dest)
            }
            EntryState::LocalOnly => {
                self.relocate(source, dest)?;
                self.link(source, dest)
            }
            EntryState::StoreOnly => self.link(source, dest),
            EntryState::BothExist => match self.force {
                ForceMode::Local => {
                    log::warn!("File {} already exists, deleting.", dest.display());
                    self.discard(dest)?;
                    self.relocate(source, dest)?;
                    self.link(source, dest)
                }
                ForceMode::Sync => {
                    log::warn!("File {} already exists, deleting.", source.display());
                    self.discard(source)?;
                    self.link(source, dest)
                }
                ForceMode::None | ForceMode::Delete => {
                    log::warn!(
                        "{} and {} both exist, skipping. Use --force local or --force sync to pick a side.",
                        source.display(),
                        dest.display()
                    );
                    Ok(Outcome::Skipped("local and sync copies both exist".into()))
                }
            },
        }
    }

    /// Move local content into the store
    fn relocate(&self, source: &Path, dest: &Path) -> Result<()> {
        log::debug!("moving {} to {}", source.display(), dest.display());
        fsops::ensure_parent(dest)?;
        fsops::move_path(source, dest)
    }

    fn link(&self, source: &Path, dest: &Path) -> Result<Outcome> {
        log::info!("{} >>> {}", dest.display(), source.display());
        fsops::ensure_parent(source)?;
        fsops::symlink(dest, source)?;
        Ok(Outcome::Linked)
    }

    /// Trash `path`, deleting it permanently instead only when forced
    fn discard(&self, path: &Path) -> Result<()> {
        match self.trash.trash(path) {
            Ok(()) => Ok(()),
            Err(e) if e.is_trash_denied() && self.force.is_forced() => {
                log::warn!("Trash unavailable for {}, deleting permanently", path.display());
                fsops::remove_path(path)
            }
            Err(e) => Err(e),
        }
    }
}

/// Reconcile the `sync` sections of `config` into its sync directory
pub fn reconcile(config: &Config, force: ForceMode, trash: &dyn Trash) -> Result<Report> {
    let sync_dir = config.sync_dir()?;
    Reconciler::new(trash, force).run(&config.sync, sync_dir)
}
