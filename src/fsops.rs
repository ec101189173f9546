//! Small filesystem primitives shared by the reconciler and unsync.

use std::fs;
use std::io;
use std::path::Path;

use crate::copy::{self, Symlinks};
use crate::error::{Error, IoContext, Result};

/// True for anything at `path`, including dangling symlinks
pub fn is_present(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

pub fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

/// Create the parent directory of `path` if it is missing
pub fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).at(parent)?;
    }
    Ok(())
}

/// Permanently delete a file, symlink or directory tree
pub fn remove_path(path: &Path) -> Result<()> {
    let metadata = fs::symlink_metadata(path).at(path)?;
    if metadata.is_dir() {
        fs::remove_dir_all(path).at(path)
    } else {
        fs::remove_file(path).at(path)
    }
}

/// Move `source` to `dest`.
///
/// A plain rename when both sides share a filesystem. Across filesystems the
/// tree is copied with [`move_by_copy`] and the original removed afterwards.
pub fn move_path(source: &Path, dest: &Path) -> Result<()> {
    match fs::rename(source, dest) {
        Ok(()) => Ok(()),
        Err(e) if crosses_devices(&e) => {
            log::debug!(
                "{} and {} are on different filesystems, copying instead",
                source.display(),
                dest.display()
            );
            move_by_copy(source, dest)
        }
        Err(e) => Err(Error::io(source, e)),
    }
}

/// Copy `source` to `dest`, then delete `source`.
///
/// Symlinks inside the tree are recreated as symlinks. If the copy fails, a
/// `dest` created by it is removed again and `source` is left untouched.
pub(crate) fn move_by_copy(source: &Path, dest: &Path) -> Result<()> {
    let dest_existed = is_present(dest);

    if let Err(e) = copy::copy_tree(source, dest, false, Symlinks::Recreate) {
        if !dest_existed && is_present(dest) {
            if let Err(cleanup) = remove_path(dest) {
                log::warn!(
                    "Failed to remove partial copy {}: {}",
                    dest.display(),
                    cleanup
                );
            }
        }
        return Err(e);
    }

    remove_path(source)
}

// EXDEV
#[cfg(unix)]
fn crosses_devices(e: &io::Error) -> bool {
    e.raw_os_error() == Some(18)
}

// ERROR_NOT_SAME_DEVICE
#[cfg(windows)]
fn crosses_devices(e: &io::Error) -> bool {
    e.raw_os_error() == Some(17)
}

#[cfg(not(any(unix, windows)))]
fn crosses_devices(_e: &io::Error) -> bool {
    false
}

/// Create a symlink at `link` pointing to `target`
pub fn symlink(target: &Path, link: &Path) -> Result<()> {
    #[cfg(unix)]
    let result = std::os::unix::fs::symlink(target, link);

    #[cfg(windows)]
    let result = if target.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    };

    #[cfg(not(any(unix, windows)))]
    let result: io::Result<()> = Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symlinks are not supported on this platform",
    ));

    result.map_err(|source| Error::SymlinkCreation {
        link: link.to_path_buf(),
        target: target.to_path_buf(),
        source,
    })
}
