//! Trash capability.
//!
//! The reconciler never deletes user data directly; it hands paths to a
//! [`Trash`]. A trash that cannot serve a path answers with
//! [`Error::TrashPermissionDenied`], and the caller decides whether force mode
//! allows a permanent delete instead.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Error, IoContext, Result};
use crate::fsops;

/// Something that can take a path out of the way recoverably
pub trait Trash {
    fn trash(&self, path: &Path) -> Result<()>;
}

/// Desktop trash, reached through `gio trash` or `trash-put`
#[derive(Debug, Clone)]
pub struct SystemTrash {
    commands: Vec<Vec<String>>,
}

impl Default for SystemTrash {
    fn default() -> Self {
        Self {
            commands: vec![
                vec!["gio".into(), "trash".into()],
                vec!["trash-put".into()],
            ],
        }
    }
}

impl SystemTrash {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use explicit command lines instead of the defaults; the path is appended
    pub fn with_commands(commands: Vec<Vec<String>>) -> Self {
        Self { commands }
    }
}

impl Trash for SystemTrash {
    /// Tries each command in turn. When none of them could trash the path
    /// the trash counts as unavailable for it.
    fn trash(&self, path: &Path) -> Result<()> {
        for command in &self.commands {
            let Some((program, args)) = command.split_first() else {
                continue;
            };

            match Command::new(program).args(args).arg(path).output() {
                Ok(output) if output.status.success() => {
                    log::debug!("trashed {} with {}", path.display(), program);
                    return Ok(());
                }
                Ok(output) => log::debug!(
                    "{} could not trash {}: {}",
                    program,
                    path.display(),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
                Err(e) => log::debug!("{} unavailable: {}", program, e),
            }
        }

        Err(Error::TrashPermissionDenied {
            path: path.to_path_buf(),
        })
    }
}

/// Moves trashed paths into one directory under collision-free names
#[derive(Debug, Clone)]
pub struct DirectoryTrash {
    dir: PathBuf,
}

impl DirectoryTrash {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Trash for DirectoryTrash {
    fn trash(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(&self.dir).at(&self.dir)?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "item".to_string());
        let mut target = self.dir.join(&name);
        if fsops::is_present(&target) {
            target = self.dir.join(format!("{}.{}", name, uuid::Uuid::new_v4().simple()));
        }

        log::debug!("trashing {} into {}", path.display(), target.display());
        fsops::move_path(path, &target)
    }
}
