//! Archiver capability used by export and import.
//!
//! The only backend is zpaq (preferably the zpaqfranz fork), driven as a
//! blocking subprocess. Each call runs once; nothing is retried.

use std::env;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{Error, Result};
use crate::model::{Algorithm, Compression};

/// Exit signal and captured output of one archiver invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveStatus {
    pub success: bool,
    pub output: String,
}

impl ArchiveStatus {
    pub fn ok() -> Self {
        Self {
            success: true,
            output: String::new(),
        }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
        }
    }
}

pub trait Archiver {
    /// Add `paths` to the archive at `output`
    fn archive(&self, paths: &[PathBuf], output: &Path) -> Result<ArchiveStatus>;

    /// Check that `archive` is readable and intact
    fn test(&self, archive: &Path) -> Result<ArchiveStatus>;

    /// Extract `archive` under `dest`, keeping absolute paths as subpaths
    fn extract(&self, archive: &Path, dest: &Path) -> Result<()>;
}

const ZPAQ_CANDIDATES: [&str; 2] = ["zpaqfranz", "zpaq"];
const ZPAQFRANZ_URL: &str = "https://github.com/fcorbelli/zpaqfranz";

/// zpaq / zpaqfranz command-line backend
#[derive(Debug, Clone)]
pub struct ZpaqArchiver {
    binary: PathBuf,
    level: u8,
    args: Vec<String>,
}

impl ZpaqArchiver {
    pub fn new(binary: PathBuf, compression: &Compression) -> Self {
        Self {
            binary,
            level: compression.level,
            args: compression.args.clone(),
        }
    }

    /// Find an installed zpaq binary for `compression`
    pub fn locate(compression: &Compression) -> Result<Self> {
        match compression.algorithm {
            Algorithm::Fpaq => {
                let binary = find_executable(&ZPAQ_CANDIDATES).ok_or_else(|| {
                    Error::ArchiverNotFound(format!(
                        "either zpaqfranz or zpaq must be installed or present in the working directory ({ZPAQFRANZ_URL})"
                    ))
                })?;

                if binary.file_name().is_some_and(|name| name == "zpaq") {
                    log::debug!("zpaqfranz is recommended over zpaq");
                }

                Ok(Self::new(binary, compression))
            }
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.binary);
        command.stdin(Stdio::null());
        command
    }

    fn describe(command: &Command) -> String {
        let mut parts = vec![command.get_program().to_string_lossy().to_string()];
        parts.extend(command.get_args().map(|a| a.to_string_lossy().to_string()));
        parts.join(" ")
    }
}

impl Archiver for ZpaqArchiver {
    fn archive(&self, paths: &[PathBuf], output: &Path) -> Result<ArchiveStatus> {
        let mut command = self.command();
        command
            .arg("a")
            .arg(output)
            .args(paths)
            .arg(format!("-m{}", self.level))
            .args(&self.args);

        log::debug!("running: {}", Self::describe(&command));
        let status = command
            .status()
            .map_err(|e| Error::Archive(format!("failed to run {}: {e}", self.binary.display())))?;

        Ok(if status.success() {
            ArchiveStatus::ok()
        } else {
            ArchiveStatus::failed(format!("exited with {status}"))
        })
    }

    fn test(&self, archive: &Path) -> Result<ArchiveStatus> {
        let mut command = self.command();
        command.arg("t").arg(archive);

        log::debug!("running: {}", Self::describe(&command));
        let output = command
            .output()
            .map_err(|e| Error::Archive(format!("failed to run {}: {e}", self.binary.display())))?;

        let mut text = String::from_utf8_lossy(&output.stdout).to_string();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(ArchiveStatus {
            success: output.status.success(),
            output: text,
        })
    }

    fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        let mut command = self.command();
        command.arg("x").arg(archive).arg("-to").arg(dest);

        log::debug!("running: {}", Self::describe(&command));
        let status = command
            .status()
            .map_err(|e| Error::Archive(format!("failed to run {}: {e}", self.binary.display())))?;

        if !status.success() {
            return Err(Error::Archive(format!(
                "extracting {} exited with {status}",
                archive.display()
            )));
        }
        Ok(())
    }
}

/// First of `candidates` found on `PATH`, then in the working directory
pub fn find_executable(candidates: &[&str]) -> Option<PathBuf> {
    let search_path: Vec<PathBuf> = env::var_os("PATH")
        .map(|paths| env::split_paths(&paths).collect())
        .unwrap_or_default();
    let cwd = env::current_dir().ok();

    candidates.iter().find_map(|name| {
        search_path
            .iter()
            .chain(cwd.iter())
            .map(|dir| dir.join(name))
            .find(|path| is_executable(path))
    })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}
