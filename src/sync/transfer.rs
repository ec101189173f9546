use std::path::{Component, Path, PathBuf};

use crate::archive::Archiver;
use crate::copy;
use crate::error::{Error, IoContext, Result};
use crate::fsops;
use crate::model::Config;
use crate::report::{Outcome, Report};

/// Archive every existing `export` entry into the configured export path.
///
/// Returns the archive path, or `None` when there was nothing to export.
pub fn export(config: &Config, archiver: &dyn Archiver) -> Result<Option<PathBuf>> {
    let output = config.export_path()?;

    let paths: Vec<PathBuf> = config
        .export
        .iter()
        .flat_map(|section| section.entries.iter().map(move |entry| section.source(entry)))
        .filter(|path| {
            let present = fsops::is_present(path);
            if !present {
                log::debug!("{} does not exist, not exporting it", path.display());
            }
            present
        })
        .collect();

    if paths.is_empty() {
        log::warn!("Nothing to export");
        return Ok(None);
    }

    log::info!("exporting {} entries to {}...", paths.len(), output.display());
    fsops::ensure_parent(&output)?;

    let status = archiver.archive(&paths, &output)?;
    if !status.success {
        log::error!("Failed to export to {}", output.display());
        return Err(Error::Archive(format!(
            "archiving to {} failed: {}",
            output.display(),
            status.output.trim()
        )));
    }

    log::info!("Successfully exported to {}", output.display());
    Ok(Some(output))
}

/// Restore every `export` entry from the configured archive.
///
/// The archive is tested first, then extracted into a scratch directory that
/// is removed afterwards. Entries are merge-copied into place; existing files
/// are only replaced when `overwrite` is set.
pub fn import(config: &Config, archiver: &dyn Archiver, overwrite: bool) -> Result<Report> {
    let archive = config.export_path()?;
    if !archive.exists() {
        return Err(Error::SourceNotFound(archive));
    }

    log::info!("importing {}...", archive.display());
    let tested = archiver.test(&archive)?;
    if !tested.success {
        return Err(Error::Archive(format!(
            "{} failed the integrity test:\n{}",
            archive.display(),
            tested.output.trim()
        )));
    }

    let scratch = tempfile::Builder::new()
        .prefix("konsync-")
        .tempdir()
        .map_err(|e| Error::io(std::env::temp_dir(), e))?;
    archiver.extract(&archive, scratch.path())?;

    let mut report = Report::new();
    for section in &config.export {
        let extracted_root = scratch.path().join(strip_root(&section.location));

        for entry in &section.entries {
            let source = extracted_root.join(entry);
            let dest = section.source(entry);

            let outcome = match copy::copy(&source, &dest, overwrite) {
                Ok(stats) => {
                    log::debug!(
                        "{}: {} files, {} skipped",
                        dest.display(),
                        stats.files,
                        stats.skipped
                    );
                    Outcome::Imported
                }
                Err(e @ (Error::SourceNotFound(_) | Error::UnsupportedSourceType(_))) => {
                    log::warn!("{e}, skipping");
                    Outcome::Skipped(e.to_string())
                }
                Err(e) => {
                    log::error!("{}: {}", dest.display(), e);
                    Outcome::Failed(e.to_string())
                }
            };
            report.record(&section.name, entry, dest, outcome);
        }
    }

    let scratch_path = scratch.path().to_path_buf();
    scratch.close().at(&scratch_path)?;

    if report.errored() {
        log::warn!("Import finished with errors");
    } else {
        log::info!("Successfully imported {}", archive.display());
    }
    Ok(report)
}

/// `location` with its root and prefix removed, so it can be joined under
/// an extraction directory
fn strip_root(location: &Path) -> PathBuf {
    location
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::archive::ArchiveStatus;
    use crate::model::Section;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::TempDir;

    /// Stores archived paths by copying them under a directory, mirroring
    /// how zpaq keeps absolute paths
    struct CopyArchiver {
        healthy: bool,
        archived: RefCell<Vec<PathBuf>>,
    }

    impl CopyArchiver {
        fn new(healthy: bool) -> Self {
            Self {
                healthy,
                archived: RefCell::new(Vec::new()),
            }
        }
    }

    impl Archiver for CopyArchiver {
        fn archive(&self, paths: &[PathBuf], output: &Path) -> Result<ArchiveStatus> {
            fs::create_dir_all(output).at(output)?;
            for path in paths {
                copy::copy(path, &output.join(strip_root(path)), true)?;
            }
            self.archived.borrow_mut().extend(paths.iter().cloned());
            Ok(ArchiveStatus::ok())
        }

        fn test(&self, _archive: &Path) -> Result<ArchiveStatus> {
            Ok(if self.healthy {
                ArchiveStatus::ok()
            } else {
                ArchiveStatus::failed("checksum mismatch")
            })
        }

        fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
            copy::copy(archive, dest, true).map(|_| ())
        }
    }

    fn config(temp: &TempDir, entries: &[&str]) -> Config {
        let home = temp.path().join("home");
        fs::create_dir_all(&home).unwrap();
        let mut config = Config::default().with_sync_dir(temp.path().join("store"));
        config.settings.target.export_name = Some("backup".into());
        config.export.push(Section {
            name: "home".into(),
            location: home,
            entries: entries.iter().map(|e| e.to_string()).collect(),
        });
        config
    }

    #[test]
    fn test_strip_root() {
        assert_eq!(strip_root(Path::new("/home/u/.config")), PathBuf::from("home/u/.config"));
        assert_eq!(strip_root(Path::new("/")), PathBuf::new());
    }

    #[test]
    fn test_export_skips_missing_entries() {
        let temp = TempDir::new().unwrap();
        let config = config(&temp, &["rc", "missing"]);
        fs::write(temp.path().join("home/rc"), "x").unwrap();
        let archiver = CopyArchiver::new(true);

        let output = export(&config, &archiver).unwrap();

        assert_eq!(output, Some(temp.path().join("store/backup")));
        assert_eq!(*archiver.archived.borrow(), vec![temp.path().join("home/rc")]);
    }

    #[test]
    fn test_export_with_nothing_present() {
        let temp = TempDir::new().unwrap();
        let config = config(&temp, &["missing"]);
        let archiver = CopyArchiver::new(true);

        assert_eq!(export(&config, &archiver).unwrap(), None);
        assert!(archiver.archived.borrow().is_empty());
    }

    #[test]
    fn test_export_then_import_restores_files() {
        let temp = TempDir::new().unwrap();
        let config = config(&temp, &["rc", ".config/app"]);
        let home = temp.path().join("home");
        fs::write(home.join("rc"), "rc-content").unwrap();
        fs::create_dir_all(home.join(".config/app")).unwrap();
        fs::write(home.join(".config/app/settings"), "a=1").unwrap();
        let archiver = CopyArchiver::new(true);

        export(&config, &archiver).unwrap();
        fs::remove_file(home.join("rc")).unwrap();
        fs::remove_dir_all(home.join(".config")).unwrap();

        let report = import(&config, &archiver, false).unwrap();

        assert!(!report.errored());
        assert_eq!(fs::read_to_string(home.join("rc")).unwrap(), "rc-content");
        assert_eq!(
            fs::read_to_string(home.join(".config/app/settings")).unwrap(),
            "a=1"
        );
        assert_eq!(report.outcome_of("home", "rc"), Some(&Outcome::Imported));
    }

    #[test]
    fn test_import_respects_overwrite() {
        let temp = TempDir::new().unwrap();
        let config = config(&temp, &["rc"]);
        let home = temp.path().join("home");
        fs::write(home.join("rc"), "old").unwrap();
        let archiver = CopyArchiver::new(true);
        export(&config, &archiver).unwrap();

        fs::write(home.join("rc"), "edited").unwrap();
        import(&config, &archiver, false).unwrap();
        assert_eq!(fs::read_to_string(home.join("rc")).unwrap(), "edited");

        import(&config, &archiver, true).unwrap();
        assert_eq!(fs::read_to_string(home.join("rc")).unwrap(), "old");
    }

    #[test]
    fn test_import_entry_missing_from_archive_is_skipped() {
        let temp = TempDir::new().unwrap();
        let mut config = config(&temp, &["rc"]);
        fs::write(temp.path().join("home/rc"), "x").unwrap();
        let archiver = CopyArchiver::new(true);
        export(&config, &archiver).unwrap();

        config.export[0].entries.push("later".into());
        let report = import(&config, &archiver, false).unwrap();

        assert!(!report.errored());
        assert!(matches!(report.outcome_of("home", "later"), Some(Outcome::Skipped(_))));
    }

    #[test]
    fn test_import_rejects_corrupt_archive() {
        let temp = TempDir::new().unwrap();
        let config = config(&temp, &["rc"]);
        fs::write(temp.path().join("home/rc"), "x").unwrap();
        export(&config, &CopyArchiver::new(true)).unwrap();
        fs::remove_file(temp.path().join("home/rc")).unwrap();

        let err = import(&config, &CopyArchiver::new(false), false).unwrap_err();

        assert!(matches!(err, Error::Archive(_)));
        assert!(!temp.path().join("home/rc").exists());
    }

    #[test]
    fn test_import_without_archive() {
        let temp = TempDir::new().unwrap();
        let config = config(&temp, &["rc"]);
        let err = import(&config, &CopyArchiver::new(true), false).unwrap_err();
        assert!(matches!(err, Error::SourceNotFound(_)));
    }
}
