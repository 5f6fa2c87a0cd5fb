use chrono::{DateTime, Utc};
use journal_core::ConversationContext;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};
use uuid::Uuid;

/// File-based conversation storage, one JSON record per conversation id.
///
/// All operations are best-effort: the in-memory cache stays authoritative
/// for the session, so I/O and serialization failures are logged and
/// swallowed rather than surfaced to a user-facing turn.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    base_dir: PathBuf,
}

impl ConversationStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn record_path(&self, id: &Uuid) -> PathBuf {
        self.base_dir.join(format!("{}.json", id))
    }

    fn ensure_dir(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.base_dir)
    }

    /// Serialize and write the record, replacing any prior content.
    pub fn save(&self, id: &Uuid, context: &ConversationContext) {
        if let Err(e) = self.ensure_dir() {
            warn!("Failed to create conversation directory: {}", e);
            return;
        }

        let json = match serde_json::to_string_pretty(context) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize conversation {}: {}", id, e);
                return;
            }
        };

        match fs::write(self.record_path(id), json) {
            Ok(()) => debug!("Saved conversation {}", id),
            Err(e) => warn!("Failed to write conversation {}: {}", id, e),
        }
    }

    /// Read and deserialize the record. A missing file or an unreadable
    /// record is a miss, not an error.
    pub fn load(&self, id: &Uuid) -> Option<ConversationContext> {
        let path = self.record_path(id);
        if !path.exists() {
            return None;
        }

        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to read conversation {}: {}", id, e);
                return None;
            }
        };

        match serde_json::from_str(&json) {
            Ok(context) => Some(context),
            Err(e) => {
                warn!("Failed to parse conversation {}: {}", id, e);
                None
            }
        }
    }

    /// Remove the record. A missing record is a no-op.
    pub fn delete(&self, id: &Uuid) {
        let path = self.record_path(id);
        if !path.exists() {
            return;
        }
        match fs::remove_file(&path) {
            Ok(()) => debug!("Deleted conversation {}", id),
            Err(e) => warn!("Failed to delete conversation {}: {}", id, e),
        }
    }

    /// Remove every record created strictly before `cutoff`. Per-record
    /// failures are logged and the sweep continues. Returns the number of
    /// records removed.
    pub fn sweep(&self, cutoff: DateTime<Utc>) -> usize {
        let entries = match fs::read_dir(&self.base_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to enumerate conversation directory: {}", e);
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    warn!("Failed to read directory entry: {}", e);
                    continue;
                }
            };
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }

            let context: ConversationContext = match fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|json| serde_json::from_str(&json).map_err(|e| e.to_string()))
            {
                Ok(context) => context,
                Err(e) => {
                    warn!("Skipping unreadable record {:?}: {}", path, e);
                    continue;
                }
            };

            if context.created_at < cutoff {
                match fs::remove_file(&path) {
                    Ok(()) => {
                        debug!("Swept stale conversation record {:?}", path);
                        removed += 1;
                    }
                    Err(e) => warn!("Failed to remove stale record {:?}: {}", path, e),
                }
            }
        }

        removed
    }
}
