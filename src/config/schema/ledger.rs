use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Append-only JSONL mirror of every ledger write. Disabled when unset.
    #[serde(default)]
    pub journal_path: Option<PathBuf>,
}
