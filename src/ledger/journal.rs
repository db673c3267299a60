use super::types::{Gate, PlanningMetadata, Run, Step};
use crate::error::LedgerError;
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// One line of the JSONL journal.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JournalRecord {
    RunStarted { run: Run },
    RunPlanned { run_id: String, planning: PlanningMetadata },
    StepLogged { step: Step },
    GateCreated { gate: Gate },
    GateResolved { gate: Gate },
    GateConsumed { gate: Gate },
    RunCompleted { run: Run },
}

/// Append-only JSONL mirror of ledger mutations.
#[derive(Debug)]
pub struct LedgerJournal {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl LedgerJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, record: &JournalRecord) -> Result<(), LedgerError> {
        let mut line = serde_json::json!({ "recorded_at": Utc::now().to_rfc3339() });
        let body = serde_json::to_value(record).map_err(|e| LedgerError::Journal(e.to_string()))?;
        if let (Some(map), serde_json::Value::Object(body)) = (line.as_object_mut(), body) {
            map.extend(body);
        }

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LedgerError::Journal(e.to_string()))?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| LedgerError::Journal(e.to_string()))?;

        file.write_all(line.to_string().as_bytes())
            .await
            .map_err(|e| LedgerError::Journal(e.to_string()))?;
        file.write_all(b"\n")
            .await
            .map_err(|e| LedgerError::Journal(e.to_string()))?;
        Ok(())
    }
}
