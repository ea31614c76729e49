use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Filesystem sync events, emitted per entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SyncEvent {
    FileCopied { src: PathBuf, dst: PathBuf },

    /// An entry was deleted, either by `remove` or as stale during `replace`
    EntryRemoved { path: PathBuf, stale: bool },

    Replaced {
        src: PathBuf,
        dst: PathBuf,
        copied: usize,
        removed: usize,
    },
}
