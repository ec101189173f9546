use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::fsops;

/// Where a single entry stands, read from the filesystem on demand.
///
/// Nothing about this is persisted; every pass looks again, which is what
/// lets an interrupted run heal itself on the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryState {
    /// Neither the local path nor the store path exists
    Absent,
    /// Real local content, nothing in the store yet
    LocalOnly,
    /// Store content with no local path
    StoreOnly,
    /// Local symlink pointing exactly at the store path
    Linked,
    /// Local symlink pointing somewhere else while the store is populated
    Misdirected,
    /// Local symlink while the store path is missing
    StaleSymlink,
    /// Real content on both sides
    BothExist,
}

impl EntryState {
    /// Classify `source` (local) against `dest` (store)
    pub fn detect(source: &Path, dest: &Path) -> Self {
        let store_exists = dest.exists();

        if fsops::is_symlink(source) {
            if !store_exists {
                return Self::StaleSymlink;
            }
            return match fs::read_link(source) {
                Ok(target) if target == dest => Self::Linked,
                _ => Self::Misdirected,
            };
        }

        match (fsops::is_present(source), store_exists) {
            (false, false) => Self::Absent,
            (true, false) => Self::LocalOnly,
            (false, true) => Self::StoreOnly,
            (true, true) => Self::BothExist,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Absent => "absent",
            Self::LocalOnly => "local-only",
            Self::StoreOnly => "store-only",
            Self::Linked => "linked",
            Self::Misdirected => "misdirected",
            Self::StaleSymlink => "stale-symlink",
            Self::BothExist => "both-exist",
        }
    }
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    #[test]
    fn test_detect_all_shapes() {
        let temp = TempDir::new().unwrap();
        let local = temp.path().join("local");
        let store = temp.path().join("store");
        fs::create_dir_all(&local).unwrap();
        fs::create_dir_all(&store).unwrap();

        let pair = |name: &str| (local.join(name), store.join(name));

        let (src, dst) = pair("absent");
        assert_eq!(EntryState::detect(&src, &dst), EntryState::Absent);

        let (src, dst) = pair("local");
        fs::write(&src, "x").unwrap();
        assert_eq!(EntryState::detect(&src, &dst), EntryState::LocalOnly);

        let (src, dst) = pair("store");
        fs::write(&dst, "x").unwrap();
        assert_eq!(EntryState::detect(&src, &dst), EntryState::StoreOnly);

        let (src, dst) = pair("both");
        fs::write(&src, "x").unwrap();
        fs::write(&dst, "y").unwrap();
        assert_eq!(EntryState::detect(&src, &dst), EntryState::BothExist);

        let (src, dst) = pair("linked");
        fs::write(&dst, "x").unwrap();
        symlink(&dst, &src).unwrap();
        assert_eq!(EntryState::detect(&src, &dst), EntryState::Linked);

        let (src, dst) = pair("misdirected");
        fs::write(&dst, "x").unwrap();
        symlink(temp.path(), &src).unwrap();
        assert_eq!(EntryState::detect(&src, &dst), EntryState::Misdirected);

        let (src, dst) = pair("stale");
        symlink(temp.path().join("elsewhere"), &src).unwrap();
        assert_eq!(EntryState::detect(&src, &dst), EntryState::StaleSymlink);
    }

    #[test]
    fn test_display_matches_serde() {
        let json = serde_json::to_string(&EntryState::StaleSymlink).unwrap();
        assert_eq!(json, format!("\"{}\"", EntryState::StaleSymlink));
    }
}
