use std::fs::OpenOptions;
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::StoreError;

/// Append-only JSON-lines writer, one record per line, never truncated.
/// Used for the artifact streams spec §6 names directly (`decisions.jsonl`,
/// `llm_conversations.jsonl`, `self_critique.jsonl`, ...): write-mostly logs
/// that are read back sequentially, not queried, so they don't belong in the
/// relational store.
pub struct JsonlWriter<T> {
    path: PathBuf,
    lock: Mutex<()>,
    _marker: PhantomData<T>,
}

impl<T: Serialize> JsonlWriter<T> {
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
            _marker: PhantomData,
        }
    }

    pub fn append(&self, record: &T) -> Result<(), StoreError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("jsonl writer mutex poisoned: {e}")))?;
        let line = serde_json::to_string(record)?;
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Reads every record back in append order. Used by the `replay` CLI
    /// surface and by callers that need the most recent entry (e.g.
    /// TradingAgent's morning hand-off read). `Ok(vec![])` when the file has
    /// never been written, matching the store's missing-range contract.
    pub fn read_all(&self) -> Result<Vec<T>, StoreError>
    where
        T: DeserializeOwned,
    {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(StoreError::from))
            .collect()
    }
}
