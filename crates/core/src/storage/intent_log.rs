use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::NamedTempFile;
use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::intent::{IntentStage, TradeIntent};

use super::format;

/// Journal of operations that are mid-way through their record-store writes.
///
/// An intent is recorded before the first write and removed once the
/// operation is either fully applied or fully rolled back. Whatever is left
/// in the journal when a session opens is recovered from.
pub trait IntentLog: Send + Sync {
    fn record(&self, intent: &TradeIntent) -> Result<(), CoreError>;

    fn update_stage(&self, id: Uuid, stage: IntentStage) -> Result<(), CoreError>;

    /// Remove an intent. Removing an unknown id is not an error.
    fn remove(&self, id: Uuid) -> Result<(), CoreError>;

    /// Intents left behind for a user, oldest first.
    fn pending_for(&self, user_id: &str) -> Result<Vec<TradeIntent>, CoreError>;
}

fn pending_in(intents: &[TradeIntent], user_id: &str) -> Vec<TradeIntent> {
    let mut pending: Vec<TradeIntent> = intents
        .iter()
        .filter(|i| i.user_id == user_id)
        .cloned()
        .collect();
    pending.sort_by_key(|i| i.created_at);
    pending
}

fn set_stage(intents: &mut [TradeIntent], id: Uuid, stage: IntentStage) -> Result<(), CoreError> {
    let intent = intents
        .iter_mut()
        .find(|i| i.id == id)
        .ok_or_else(|| CoreError::Validation(format!("Unknown intent {id}")))?;
    intent.stage = stage;
    Ok(())
}

/// Process-local journal. Survives session teardown but not a restart.
#[derive(Debug, Default)]
pub struct MemoryIntentLog {
    intents: Mutex<Vec<TradeIntent>>,
}

impl MemoryIntentLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of journaled intents across all users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.intents.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IntentLog for MemoryIntentLog {
    fn record(&self, intent: &TradeIntent) -> Result<(), CoreError> {
        let mut intents = self.intents.lock().unwrap_or_else(|e| e.into_inner());
        intents.push(intent.clone());
        Ok(())
    }

    fn update_stage(&self, id: Uuid, stage: IntentStage) -> Result<(), CoreError> {
        let mut intents = self.intents.lock().unwrap_or_else(|e| e.into_inner());
        set_stage(&mut intents, id, stage)
    }

    fn remove(&self, id: Uuid) -> Result<(), CoreError> {
        let mut intents = self.intents.lock().unwrap_or_else(|e| e.into_inner());
        intents.retain(|i| i.id != id);
        Ok(())
    }

    fn pending_for(&self, user_id: &str) -> Result<Vec<TradeIntent>, CoreError> {
        let intents = self.intents.lock().unwrap_or_else(|e| e.into_inner());
        Ok(pending_in(&intents, user_id))
    }
}

/// Journal persisted to a single file, rewritten on every change.
///
/// Flow: Vec<TradeIntent> → bincode → MFIL format bytes → synced temp file → rename
pub struct FileIntentLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileIntentLog {
    /// Open (or lazily create) the journal at `path`.
    /// An existing file is validated immediately.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let log = Self {
            path: path.into(),
            lock: Mutex::new(()),
        };
        log.load()?;
        Ok(log)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<TradeIntent>, CoreError> {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let (_version, payload) = format::read_file(&data)?;
        bincode::deserialize(payload)
            .map_err(|e| CoreError::Deserialization(format!("Failed to read intent log: {e}")))
    }

    fn store(&self, intents: &[TradeIntent]) -> Result<(), CoreError> {
        let payload = bincode::serialize(intents)
            .map_err(|e| CoreError::Serialization(format!("Failed to write intent log: {e}")))?;
        let bytes = format::write_file(format::CURRENT_VERSION, &payload);

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        // Seal the rename itself.
        #[cfg(unix)]
        std::fs::File::open(dir)?.sync_all()?;
        Ok(())
    }

    fn modify(
        &self,
        f: impl FnOnce(&mut Vec<TradeIntent>) -> Result<(), CoreError>,
    ) -> Result<(), CoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut intents = self.load()?;
        f(&mut intents)?;
        self.store(&intents)
    }
}

impl IntentLog for FileIntentLog {
    fn record(&self, intent: &TradeIntent) -> Result<(), CoreError> {
        self.modify(|intents| {
            intents.push(intent.clone());
            Ok(())
        })
    }

    fn update_stage(&self, id: Uuid, stage: IntentStage) -> Result<(), CoreError> {
        self.modify(|intents| set_stage(intents, id, stage))
    }

    fn remove(&self, id: Uuid) -> Result<(), CoreError> {
        self.modify(|intents| {
            intents.retain(|i| i.id != id);
            Ok(())
        })
    }

    fn pending_for(&self, user_id: &str) -> Result<Vec<TradeIntent>, CoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(pending_in(&self.load()?, user_id))
    }
}
