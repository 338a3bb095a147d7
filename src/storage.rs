//! Persistence of the card being edited
//!
//! Stores the markdown source, theme, typography and import history as one
//! JSON document in the data directory. Provides:
//! - Load/save with graceful fallback on unreadable data
//! - Field-level updates that keep the rest of the document
//! - Import history capped to the most recent entries
//! - Debounced autosave on a tokio task

use crate::config::{Config, StorageConfig};
use crate::error::{StorageError, StorageResult};
use crate::file_handler::io;
use crate::text::detection::word_count;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Schema version written with every save
pub const CURRENT_VERSION: &str = "1.1.0";

/// File name of the stored document inside the data directory
pub const STORAGE_FILE: &str = "orca-insta-data.json";

/// Theme used when nothing has been chosen yet
pub const DEFAULT_THEME_ID: &str = "simple-light";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FontSize {
    Sm,
    #[default]
    Base,
    Lg,
    Xl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LineHeight {
    Tight,
    Normal,
    Relaxed,
    #[default]
    Loose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FontFamily {
    #[default]
    Sans,
    Serif,
    Mono,
}

/// Typography settings of the card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Typography {
    pub font_size: FontSize,
    pub line_height: LineHeight,
    pub font_family: FontFamily,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_css: Option<String>,
}

/// Where imported text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportSource {
    TextSelection,
    AiChatResponse,
    MarkdownCodeblock,
}

/// One imported piece of text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportEntry {
    pub id: Uuid,
    pub source: ImportSource,
    pub content: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Document statistics kept alongside the content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub word_count: usize,
    pub last_edited: i64,
    pub export_count: u32,
}

/// Everything persisted between sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredData {
    pub version: String,
    /// Milliseconds since the Unix epoch of the last save
    pub timestamp: i64,
    pub markdown: String,
    pub theme_id: String,
    #[serde(default)]
    pub typography: Typography,
    #[serde(default)]
    pub import_history: Vec<ImportEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DocumentMetadata>,
}

impl Default for StoredData {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION.to_string(),
            timestamp: now_millis(),
            markdown: String::new(),
            theme_id: DEFAULT_THEME_ID.to_string(),
            typography: Typography::default(),
            import_history: Vec::new(),
            metadata: None,
        }
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// JSON file holding the stored document
#[derive(Debug, Clone)]
pub struct DocumentStore {
    path: PathBuf,
    max_import_history: usize,
}

impl DocumentStore {
    /// Store at an explicit path
    pub fn at(path: impl Into<PathBuf>, config: &StorageConfig) -> Self {
        Self {
            path: path.into(),
            max_import_history: config.max_import_history,
        }
    }

    /// Store in the platform data directory
    pub fn open_default(config: &StorageConfig) -> StorageResult<Self> {
        let dir = Config::data_dir().map_err(|_| StorageError::DirectoryError)?;
        Ok(Self::at(dir.join(STORAGE_FILE), config))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored document.
    ///
    /// Missing or unreadable data yields `None`; data written by another
    /// schema version is replaced by defaults.
    pub fn load(&self) -> Option<StoredData> {
        match self.try_load() {
            Ok(data) => data,
            Err(e) => {
                log::warn!("Failed to load stored data: {}", e);
                None
            }
        }
    }

    fn try_load(&self) -> StorageResult<Option<StoredData>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let read = io::read_file_sync(&self.path)
            .map_err(|e| StorageError::LoadError(e.to_string()))?;
        let data: StoredData = serde_json::from_str(&read.content)
            .map_err(|e| StorageError::ParseError(e.to_string()))?;

        if data.version != CURRENT_VERSION {
            log::warn!(
                "Unknown data version: {}, resetting to defaults",
                data.version
            );
            return Ok(Some(StoredData::default()));
        }
        Ok(Some(data))
    }

    /// Write the document as-is
    pub fn save(&self, data: &StoredData) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::SaveError(e.to_string()))?;
        }
        let content = serde_json::to_string_pretty(data)
            .map_err(|e| StorageError::SaveError(e.to_string()))?;
        io::write_file_atomic_sync(&self.path, content.as_bytes())
            .map_err(|e| StorageError::SaveError(e.to_string()))
    }

    /// Apply a change to the stored document (or to defaults) and save it
    pub fn update(&self, apply: impl FnOnce(&mut StoredData)) -> StorageResult<StoredData> {
        let mut data = self.load().unwrap_or_default();
        apply(&mut data);
        data.version = CURRENT_VERSION.to_string();
        data.timestamp = now_millis();
        self.save(&data)?;
        Ok(data)
    }

    pub fn save_markdown(&self, markdown: &str) -> StorageResult<StoredData> {
        self.update(|data| {
            data.markdown = markdown.to_string();
            let metadata = data.metadata.get_or_insert_with(DocumentMetadata::default);
            metadata.word_count = word_count(markdown);
            metadata.last_edited = now_millis();
        })
    }

    pub fn save_theme(&self, theme_id: &str) -> StorageResult<StoredData> {
        self.update(|data| data.theme_id = theme_id.to_string())
    }

    pub fn save_typography(&self, typography: Typography) -> StorageResult<StoredData> {
        self.update(|data| data.typography = typography)
    }

    /// Count a finished export
    pub fn record_export(&self) -> StorageResult<StoredData> {
        self.update(|data| {
            data.metadata
                .get_or_insert_with(DocumentMetadata::default)
                .export_count += 1;
        })
    }

    /// Prepend an import to the history, keeping only the most recent entries
    pub fn add_import(
        &self,
        source: ImportSource,
        content: &str,
        url: Option<String>,
    ) -> StorageResult<Uuid> {
        let id = Uuid::new_v4();
        let max = self.max_import_history;
        self.update(|data| {
            data.import_history.insert(
                0,
                ImportEntry {
                    id,
                    source,
                    content: content.to_string(),
                    timestamp: now_millis(),
                    url,
                },
            );
            data.import_history.truncate(max);
        })?;
        Ok(id)
    }

    pub fn import_history(&self) -> Vec<ImportEntry> {
        self.load()
            .map(|data| data.import_history)
            .unwrap_or_default()
    }

    /// Remove the stored document
    pub fn clear(&self) -> StorageResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::SaveError(e.to_string())),
        }
    }
}

/// Debounced background saves.
///
/// Each scheduled change cancels the one still waiting, so a burst of
/// keystrokes results in a single write after the delay.
pub struct AutoSaver {
    store: Arc<DocumentStore>,
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl AutoSaver {
    pub fn new(store: Arc<DocumentStore>, delay: Duration) -> Self {
        Self {
            store,
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Autosaver configured from settings, `None` when autosave is disabled
    pub fn from_config(store: Arc<DocumentStore>, config: &StorageConfig) -> Option<Self> {
        if !config.autosave_enabled {
            log::debug!("Autosave disabled");
            return None;
        }
        Some(Self::new(store, config.autosave_delay()))
    }

    /// Schedule a change; must be called from within a tokio runtime
    pub fn schedule(&self, apply: impl FnOnce(&mut StoredData) + Send + 'static) {
        let store = Arc::clone(&self.store);
        let delay = self.delay;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = store.update(apply) {
                log::error!("Autosave failed: {}", e);
            }
        });

        let mut pending = self.pending.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(previous) = pending.replace(task) {
            previous.abort();
        }
    }

    pub fn schedule_markdown(&self, markdown: String) {
        self.schedule(move |data| data.markdown = markdown);
    }

    /// Wait for the pending save, if any, to finish
    pub async fn flush(&self) {
        let task = self
            .pending
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    log::error!("Autosave task failed: {}", e);
                }
            }
        }
    }
}
