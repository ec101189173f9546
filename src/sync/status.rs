use serde::Serialize;
use std::path::PathBuf;

use crate::error::Result;
use crate::model::Config;

use super::state::EntryState;

/// Current state of one sync entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryStatus {
    pub section: String,
    pub entry: String,
    /// Local path
    pub source: PathBuf,
    /// Path inside the sync directory
    pub dest: PathBuf,
    pub state: EntryState,
}

/// Inspect every `sync` entry without touching anything
pub fn entry_states(config: &Config) -> Result<Vec<EntryStatus>> {
    let sync_dir = config.sync_dir()?;

    Ok(config
        .sync
        .iter()
        .flat_map(|section| {
            section.entries.iter().map(move |entry| {
                let source = section.source(entry);
                let dest = section.store_path(sync_dir, entry);
                let state = EntryState::detect(&source, &dest);
                EntryStatus {
                    section: section.name.clone(),
                    entry: entry.clone(),
                    source,
                    dest,
                    state,
                }
            })
        })
        .collect())
}
