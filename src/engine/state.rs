//! Durable cursor for round-robin selection.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Position of the next round-robin pick over the roster snapshot. Persisted
/// so a restarted worker resumes where the previous one stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    pub last_index: usize,
}

pub trait StateStore: Send + Sync {
    /// Loads the persisted state; a missing or unreadable file yields the
    /// zero state rather than an error.
    fn load(&self) -> SelectionState;

    fn save(&self, state: SelectionState) -> io::Result<()>;
}

pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StateStore for FileStateStore {
    fn load(&self) -> SelectionState {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return SelectionState::default();
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to read selection state");
                return SelectionState::default();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|err| {
            warn!(path = %self.path.display(), error = %err, "corrupt selection state; starting over");
            SelectionState::default()
        })
    }

    fn save(&self, state: SelectionState) -> io::Result<()> {
        let raw = serde_json::to_string(&state).map_err(io::Error::other)?;
        std::fs::write(&self.path, raw)
    }
}
