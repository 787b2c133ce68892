//! Candidate store: the narrow upsert/exclude interface the pipeline writes
//! through, with an in-memory implementation and a JSON-file one.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::core::exclusion::ExclusionReason;

/// One stored candidate, keyed by its extracted text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreRecord
{
    pub text: String,
    /// Length in characters
    pub text_length: usize,
    /// Translations keyed by the service that produced them
    #[serde(default)]
    pub translations: BTreeMap<String, String>,
    #[serde(default)]
    pub best_translation: String,
    #[serde(default)]
    pub excluded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusion_reason: Option<ExclusionReason>,
}

impl StoreRecord
{
    fn new(text: &str) -> Self
    {
        Self {
            text: text.to_string(),
            text_length: text
                .chars()
                .count(),
            ..Default::default()
        }
    }

    /// Not excluded and still without a chosen translation.
    pub fn is_pending(&self) -> bool
    {
        !self.excluded && self.best_translation.is_empty()
    }

    /// Not excluded and still without a translation from `service`.
    pub fn is_pending_for(
        &self,
        service: &str,
    ) -> bool
    {
        !self.excluded && !self.translations.contains_key(service)
    }

    /// Not excluded and carrying a translation ready for export.
    pub fn is_exportable(&self) -> bool
    {
        !self.excluded && !self.best_translation.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError
{
    #[error("store I/O failed for {path}")]
    Io
    {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("store file {path} is not valid JSON")]
    Json
    {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to replace store file")]
    Persist(#[from] tempfile::PersistError),

    #[error("no stored candidate for text: {0}")]
    UnknownText(String),
}

/// Persistence seam for candidates. Upserts are idempotent on content.
pub trait CandidateStore
{
    /// Insert `text` if absent; returns true when it was new.
    fn upsert(
        &mut self,
        text: &str,
    ) -> Result<bool, StoreError>;

    /// Mark `text` excluded with `reason`.
    fn exclude(
        &mut self,
        text: &str,
        reason: ExclusionReason,
    ) -> Result<(), StoreError>;

    /// Clear every exclusion so a fresh pass can recompute them.
    fn reset_exclusions(&mut self) -> Result<(), StoreError>;

    /// Record a translation from `service`; the first one becomes the best.
    fn set_translation(
        &mut self,
        text: &str,
        service: &str,
        translation: &str,
    ) -> Result<(), StoreError>;

    /// Snapshot of all records, ordered by text.
    fn records(&self) -> Vec<StoreRecord>;

    /// Records still waiting for a translation.
    fn pending(&self) -> Vec<StoreRecord>
    {
        self.records()
            .into_iter()
            .filter(StoreRecord::is_pending)
            .collect()
    }

    /// Records `service` has not translated yet, whatever other services did.
    fn pending_for(
        &self,
        service: &str,
    ) -> Vec<StoreRecord>
    {
        self.records()
            .into_iter()
            .filter(|r| r.is_pending_for(service))
            .collect()
    }

    fn flush(&mut self) -> Result<(), StoreError>
    {
        Ok(())
    }
}

/// Store kept entirely in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore
{
    records: BTreeMap<String, StoreRecord>,
}

impl MemoryStore
{
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn get(
        &self,
        text: &str,
    ) -> Option<&StoreRecord>
    {
        self.records
            .get(text)
    }

    pub fn len(&self) -> usize
    {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.records.is_empty()
    }

    fn record_mut(
        &mut self,
        text: &str,
    ) -> Result<&mut StoreRecord, StoreError>
    {
        self.records
            .get_mut(text)
            .ok_or_else(|| StoreError::UnknownText(text.to_string()))
    }
}

impl FromIterator<StoreRecord> for MemoryStore
{
    fn from_iter<I: IntoIterator<Item = StoreRecord>>(iter: I) -> Self
    {
        Self {
            records: iter
                .into_iter()
                .map(|r| (r.text.clone(), r))
                .collect(),
        }
    }
}

impl CandidateStore for MemoryStore
{
    fn upsert(
        &mut self,
        text: &str,
    ) -> Result<bool, StoreError>
    {
        if self
            .records
            .contains_key(text)
        {
            return Ok(false);
        }

        self.records
            .insert(text.to_string(), StoreRecord::new(text));
        Ok(true)
    }

    fn exclude(
        &mut self,
        text: &str,
        reason: ExclusionReason,
    ) -> Result<(), StoreError>
    {
        let record = self.record_mut(text)?;
        record.excluded = true;
        record.exclusion_reason = Some(reason);
        Ok(())
    }

    fn reset_exclusions(&mut self) -> Result<(), StoreError>
    {
        for record in self
            .records
            .values_mut()
        {
            record.excluded = false;
            record.exclusion_reason = None;
        }
        Ok(())
    }

    fn set_translation(
        &mut self,
        text: &str,
        service: &str,
        translation: &str,
    ) -> Result<(), StoreError>
    {
        let record = self.record_mut(text)?;
        record
            .translations
            .insert(service.to_string(), translation.to_string());
        if record
            .best_translation
            .is_empty()
        {
            record.best_translation = translation.to_string();
        }
        Ok(())
    }

    fn records(&self) -> Vec<StoreRecord>
    {
        self.records
            .values()
            .cloned()
            .collect()
    }
}

/// [`MemoryStore`] persisted as a JSON array, replaced atomically on flush.
#[derive(Debug)]
pub struct JsonStore
{
    path: PathBuf,
    inner: MemoryStore,
}

impl JsonStore
{
    /// Load `path` if it exists, otherwise start empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError>
    {
        let path = path.into();
        let inner = if path.exists()
        {
            let raw = fs::read(&path).map_err(|source| StoreError::Io { path: path.clone(), source })?;
            let records: Vec<StoreRecord> = serde_json::from_slice(&raw)
                .map_err(|source| StoreError::Json { path: path.clone(), source })?;
            debug!(records = records.len(), path = %path.display(), "store loaded");
            records
                .into_iter()
                .collect()
        }
        else
        {
            MemoryStore::new()
        };

        Ok(Self { path, inner })
    }

    pub fn path(&self) -> &Path
    {
        &self.path
    }

    pub fn inner(&self) -> &MemoryStore
    {
        &self.inner
    }
}

impl CandidateStore for JsonStore
{
    fn upsert(
        &mut self,
        text: &str,
    ) -> Result<bool, StoreError>
    {
        self.inner
            .upsert(text)
    }

    fn exclude(
        &mut self,
        text: &str,
        reason: ExclusionReason,
    ) -> Result<(), StoreError>
    {
        self.inner
            .exclude(text, reason)
    }

    fn reset_exclusions(&mut self) -> Result<(), StoreError>
    {
        self.inner
            .reset_exclusions()
    }

    fn set_translation(
        &mut self,
        text: &str,
        service: &str,
        translation: &str,
    ) -> Result<(), StoreError>
    {
        self.inner
            .set_translation(text, service, translation)
    }

    fn records(&self) -> Vec<StoreRecord>
    {
        self.inner
            .records()
    }

    fn flush(&mut self) -> Result<(), StoreError>
    {
        let dir = match self
            .path
            .parent()
        {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io { path: dir.clone(), source })?;

        let io_err = |source| StoreError::Io { path: self.path.clone(), source };
        let tmp = NamedTempFile::new_in(&dir).map_err(io_err)?;
        {
            let mut w = BufWriter::new(tmp.as_file());
            let records: Vec<&StoreRecord> = self
                .inner
                .records
                .values()
                .collect();
            serde_json::to_writer_pretty(&mut w, &records)
                .map_err(|source| StoreError::Json { path: self.path.clone(), source })?;
            w.flush().map_err(io_err)?;
        }
        tmp.persist(&self.path)?;

        info!(records = self.inner.len(), path = %self.path.display(), "store saved");
        Ok(())
    }
}
