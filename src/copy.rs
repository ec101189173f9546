//! Recursive copy with directory-merge semantics.
//!
//! Directories are merged into existing destinations, files are skipped when
//! present unless `overwrite` is set. A failure midway leaves whatever was
//! already copied in place; copying again resumes by skipping the files that
//! made it.

use std::fs::{self, File, FileTimes, Metadata, Permissions};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Error, IoContext, Result};
use crate::fsops;

/// Counters collected during a copy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    pub files: usize,
    pub dirs: usize,
    pub links: usize,
    pub skipped: usize,
}

/// What to do with a symlink found inside the copied tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Symlinks {
    /// Fail with [`Error::UnsupportedSourceType`]
    Reject,
    /// Create the same link at the destination
    Recreate,
}

/// Copy `source` to `dest`.
///
/// - A file lands at `dest`, or at `dest/<file name>` when `dest` is an
///   existing directory.
/// - A directory is merged into `dest`, creating it if needed. `overwrite`
///   applies to every descendant.
/// - Symlinks and special files are rejected with
///   [`Error::UnsupportedSourceType`].
pub fn copy(source: &Path, dest: &Path, overwrite: bool) -> Result<CopyStats> {
    copy_tree(source, dest, overwrite, Symlinks::Reject)
}

/// [`copy`] with an explicit policy for nested symlinks
pub(crate) fn copy_tree(
    source: &Path,
    dest: &Path,
    overwrite: bool,
    symlinks: Symlinks,
) -> Result<CopyStats> {
    match fs::symlink_metadata(source) {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(Error::SourceNotFound(source.to_path_buf()))
        }
        Err(e) => return Err(Error::io(source, e)),
    }

    let mut stats = CopyStats::default();
    // Modes of the directories created here, applied once their contents are in
    let mut created: Vec<(PathBuf, Permissions)> = Vec::new();
    // Destination of every directory on the path to the current entry
    let mut parents: Vec<PathBuf> = Vec::new();

    let mut walker = WalkDir::new(source)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = entry.map_err(walk_error)?;
        let src = entry.path();
        let file_type = entry.file_type();

        parents.truncate(entry.depth());
        let dst = match parents.last() {
            Some(parent) => parent.join(entry.file_name()),
            None if !file_type.is_dir() && dest.is_dir() => dest.join(entry.file_name()),
            None => dest.to_path_buf(),
        };

        if file_type.is_dir() {
            if dst.exists() && !dst.is_dir() {
                if !overwrite {
                    log::warn!(
                        "{} already exists, skipping. Use --force to overwrite.",
                        dst.display()
                    );
                    stats.skipped += 1;
                    walker.skip_current_dir();
                    continue;
                }
                log::warn!(
                    "{} already exists as a file, overwriting with directory.",
                    dst.display()
                );
                fs::remove_file(&dst).at(&dst)?;
            }

            if !dst.exists() {
                fs::create_dir_all(&dst).at(&dst)?;
                let metadata = entry.metadata().map_err(walk_error)?;
                created.push((dst.clone(), metadata.permissions()));
                stats.dirs += 1;
            }
            parents.push(dst);
        } else if file_type.is_file() {
            let metadata = entry.metadata().map_err(walk_error)?;
            copy_file(src, &dst, &metadata, overwrite, &mut stats)?;
        } else if file_type.is_symlink() && symlinks == Symlinks::Recreate {
            copy_link(src, &dst, overwrite, &mut stats)?;
        } else {
            return Err(Error::UnsupportedSourceType(src.to_path_buf()));
        }
    }

    // Children before parents, so a read-only directory is sealed last
    for (dir, permissions) in created.into_iter().rev() {
        fs::set_permissions(&dir, permissions).at(&dir)?;
    }

    Ok(stats)
}

fn walk_error(e: walkdir::Error) -> Error {
    let path = e.path().map(Path::to_path_buf).unwrap_or_default();
    let source = e
        .into_io_error()
        .unwrap_or_else(|| io::Error::other("filesystem loop"));
    Error::io(path, source)
}

fn copy_file(
    source: &Path,
    target: &Path,
    metadata: &Metadata,
    overwrite: bool,
    stats: &mut CopyStats,
) -> Result<()> {
    if target.exists() && !overwrite {
        log::warn!(
            "File {} already exists, skipping. Use --force to overwrite.",
            target.display()
        );
        stats.skipped += 1;
        return Ok(());
    }

    fsops::ensure_parent(target)?;

    log::debug!("{} --> {}", source.display(), target.display());
    // fs::copy carries the permission bits over
    fs::copy(source, target).at(target)?;
    preserve_times(target, metadata)?;
    stats.files += 1;

    Ok(())
}

fn copy_link(source: &Path, target: &Path, overwrite: bool, stats: &mut CopyStats) -> Result<()> {
    if fsops::is_present(target) {
        if !overwrite {
            log::warn!(
                "{} already exists, skipping. Use --force to overwrite.",
                target.display()
            );
            stats.skipped += 1;
            return Ok(());
        }
        fsops::remove_path(target)?;
    }

    let link_target = fs::read_link(source).at(source)?;
    fsops::ensure_parent(target)?;
    log::debug!("{} --> {} (link)", source.display(), target.display());
    fsops::symlink(&link_target, target)?;
    stats.links += 1;

    Ok(())
}

fn preserve_times(target: &Path, metadata: &Metadata) -> Result<()> {
    let mut times = FileTimes::new();
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
    }
    if let Ok(modified) = metadata.modified() {
        times = times.set_modified(modified);
    }

    File::open(target)
        .and_then(|file| file.set_times(times))
        .at(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_missing_source() {
        let temp = TempDir::new().unwrap();
        let err = copy(&temp.path().join("nope"), &temp.path().join("dest"), false).unwrap_err();
        assert!(matches!(err, Error::SourceNotFound(_)));
    }

    #[test]
    fn test_file_to_new_path() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("a.txt");
        write(&src, "hello");

        let dest = temp.path().join("out").join("b.txt");
        let stats = copy(&src, &dest, false).unwrap();

        assert_eq!(fs::read_to_string(&dest).unwrap(), "hello");
        assert_eq!(stats.files, 1);
    }

    #[test]
    fn test_file_into_existing_directory() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("a.txt");
        write(&src, "hello");
        let dest = temp.path().join("dir");
        fs::create_dir(&dest).unwrap();

        copy(&src, &dest, false).unwrap();
        assert_eq!(fs::read_to_string(dest.join("a.txt")).unwrap(), "hello");
    }

    #[test]
    fn test_existing_file_skipped_without_overwrite() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("a.txt");
        let dest = temp.path().join("b.txt");
        write(&src, "new");
        write(&dest, "old");

        let stats = copy(&src, &dest, false).unwrap();
        assert_eq!(fs::read_to_string(&dest).unwrap(), "old");
        assert_eq!(stats.skipped, 1);

        copy(&src, &dest, true).unwrap();
        assert_eq!(fs::read_to_string(&dest).unwrap(), "new");
    }

    #[test]
    fn test_directory_merge_threads_overwrite_flag() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        let dest = temp.path().join("dest");
        write(&src.join("keep.txt"), "src keep");
        write(&src.join("deep/new.txt"), "src new");
        write(&dest.join("keep.txt"), "dest keep");
        write(&dest.join("deep/only-dest.txt"), "dest only");

        let stats = copy(&src, &dest, false).unwrap();
        assert_eq!(fs::read_to_string(dest.join("keep.txt")).unwrap(), "dest keep");
        assert_eq!(fs::read_to_string(dest.join("deep/new.txt")).unwrap(), "src new");
        assert_eq!(fs::read_to_string(dest.join("deep/only-dest.txt")).unwrap(), "dest only");
        assert_eq!(stats.skipped, 1);

        copy(&src, &dest, true).unwrap();
        assert_eq!(fs::read_to_string(dest.join("keep.txt")).unwrap(), "src keep");
        assert_eq!(fs::read_to_string(dest.join("deep/only-dest.txt")).unwrap(), "dest only");
    }

    #[test]
    fn test_directory_over_file() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        let dest = temp.path().join("dest");
        write(&src.join("inner.txt"), "x");
        write(&dest, "i am a file");

        copy(&src, &dest, false).unwrap();
        assert!(dest.is_file());

        copy(&src, &dest, true).unwrap();
        assert!(dest.is_dir());
        assert_eq!(fs::read_to_string(dest.join("inner.txt")).unwrap(), "x");
    }

    #[test]
    fn test_deep_tree() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        let mut deepest = src.clone();
        for i in 0..64 {
            deepest = deepest.join(format!("d{i}"));
        }
        write(&deepest.join("leaf.txt"), "leaf");

        let dest = temp.path().join("dest");
        let stats = copy(&src, &dest, false).unwrap();

        let copied = dest.join(deepest.strip_prefix(&src).unwrap()).join("leaf.txt");
        assert_eq!(fs::read_to_string(copied).unwrap(), "leaf");
        assert_eq!(stats.dirs, 65);
    }

    #[test]
    fn test_modified_time_preserved() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("a.txt");
        write(&src, "old");

        let past = SystemTime::now() - Duration::from_secs(7 * 24 * 60 * 60);
        File::options()
            .write(true)
            .open(&src)
            .unwrap()
            .set_times(FileTimes::new().set_modified(past))
            .unwrap();

        let dest = temp.path().join("b.txt");
        copy(&src, &dest, false).unwrap();

        let copied = fs::metadata(&dest).unwrap().modified().unwrap();
        let original = fs::metadata(&src).unwrap().modified().unwrap();
        assert_eq!(copied, original);
    }

    #[cfg(unix)]
    #[test]
    fn test_permissions_preserved() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let src = temp.path().join("script.sh");
        write(&src, "#!/bin/sh");
        fs::set_permissions(&src, fs::Permissions::from_mode(0o750)).unwrap();

        let dest = temp.path().join("copy.sh");
        copy(&src, &dest, false).unwrap();

        let mode = fs::metadata(&dest).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o750);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_source_rejected() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target.txt");
        write(&target, "x");
        let link = temp.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let err = copy(&link, &temp.path().join("dest"), false).unwrap_err();
        assert!(matches!(err, Error::UnsupportedSourceType(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_nested_symlink_leaves_partial_copy() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        write(&src.join("a.txt"), "a");
        std::os::unix::fs::symlink(src.join("a.txt"), src.join("b-link")).unwrap();

        let dest = temp.path().join("dest");
        let err = copy(&src, &dest, false).unwrap_err();
        assert!(matches!(err, Error::UnsupportedSourceType(_)));
        // a.txt sorts before b-link and was copied before the failure
        assert!(dest.join("a.txt").exists());

        // Retrying skips what already made it
        fs::remove_file(src.join("b-link")).unwrap();
        let stats = copy(&src, &dest, false).unwrap();
        assert_eq!(stats.skipped, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_read_only_directory_copied_with_contents() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        write(&src.join("locked/inner.txt"), "inner");
        fs::set_permissions(src.join("locked"), fs::Permissions::from_mode(0o555)).unwrap();

        let dest = temp.path().join("dest");
        let result = copy(&src, &dest, false);

        let mode = fs::metadata(dest.join("locked")).map(|m| m.permissions().mode() & 0o777);
        let inner = fs::read_to_string(dest.join("locked/inner.txt"));
        // Writable again so the temp dir can be cleaned up
        for dir in [src.join("locked"), dest.join("locked")] {
            let _ = fs::set_permissions(dir, fs::Permissions::from_mode(0o755));
        }

        assert_eq!(result.unwrap().files, 1);
        assert_eq!(mode.unwrap(), 0o555);
        assert_eq!(inner.unwrap(), "inner");
    }

    #[cfg(unix)]
    #[test]
    fn test_nested_symlink_recreated() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        write(&src.join("a.conf"), "a");
        std::os::unix::fs::symlink("a.conf", src.join("current")).unwrap();

        let dest = temp.path().join("dest");
        let stats = copy_tree(&src, &dest, false, Symlinks::Recreate).unwrap();

        assert_eq!(stats.files, 1);
        assert_eq!(stats.links, 1);
        assert_eq!(
            fs::read_link(dest.join("current")).unwrap(),
            PathBuf::from("a.conf")
        );
        assert_eq!(fs::read_to_string(dest.join("current")).unwrap(), "a");
    }

    #[test]
    fn test_skipped_directory_is_not_descended() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        write(&src.join("sub/a.txt"), "a");
        write(&src.join("z.txt"), "z");
        let dest = temp.path().join("dest");
        write(&dest.join("sub"), "a file where a directory should be");

        let stats = copy(&src, &dest, false).unwrap();

        assert!(dest.join("sub").is_file());
        assert_eq!(fs::read_to_string(dest.join("z.txt")).unwrap(), "z");
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.files, 1);
    }
}
