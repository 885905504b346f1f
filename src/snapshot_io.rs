//*** START FILE: src/snapshot_io.rs ***//
use crate::errors::FlashcardError;
use crate::session::evaluator::Evaluation;
use crate::types::entry_data::RawRow;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};

// Persisted session progress. Every key is optional on disk; a missing key
// reads as its default (empty list, no current card, zero counters).
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSnapshot {
    pub entries: Vec<RawRow>,
    pub already_shown_indices: Vec<usize>,
    pub current_index: Option<usize>,
    pub answer_resolved_flag: bool,
    pub correct_count: u32,
    pub incorrect_count: u32,
    pub total_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_evaluation: Option<Evaluation>,
}

/// Durable key-value home for a [`SessionSnapshot`].
pub trait SnapshotStore {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<SessionSnapshot>, FlashcardError>;
    fn save(&mut self, snapshot: &SessionSnapshot) -> Result<(), FlashcardError>;
    fn clear(&mut self) -> Result<(), FlashcardError>;
}

/// Stores the snapshot as pretty JSON in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<Option<SessionSnapshot>, FlashcardError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                debug!("No session snapshot at {:?}", self.path);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let reader = BufReader::new(file);

        let snapshot: SessionSnapshot = serde_json::from_reader(reader)?;
        info!(
            "Restored session snapshot from {:?} ({} entries)",
            self.path,
            snapshot.entries.len()
        );
        Ok(Some(snapshot))
    }

    fn save(&mut self, snapshot: &SessionSnapshot) -> Result<(), FlashcardError> {
        // Write next to the target and rename, so a crash never leaves half a file.
        let tmp_path = self.path.with_extension("json.tmp");
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, snapshot)?;
        writer.flush()?;
        fs::rename(&tmp_path, &self.path)?;

        debug!("Saved session snapshot to {:?}", self.path);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), FlashcardError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Keeps the last snapshot in memory. Used by tests and embedders that
/// persist elsewhere.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    snapshot: Option<SessionSnapshot>,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: SessionSnapshot) -> Self {
        Self { snapshot: Some(snapshot), saves: 0 }
    }

    pub fn snapshot(&self) -> Option<&SessionSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Option<SessionSnapshot>, FlashcardError> {
        Ok(self.snapshot.clone())
    }

    fn save(&mut self, snapshot: &SessionSnapshot) -> Result<(), FlashcardError> {
        self.snapshot = Some(snapshot.clone());
        self.saves += 1;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), FlashcardError> {
        self.snapshot = None;
        Ok(())
    }
}

//*** END FILE: src/snapshot_io.rs ***//
