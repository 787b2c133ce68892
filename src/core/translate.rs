//! Translation seam: a `Translator` trait, a parallel batch driver that
//! tolerates per-item failure, and a table-backed translator.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

/// Placeholder replies meaning "do not translate this".
pub const DEFAULT_SENTINELS: &[&str] = &["NNN", "PPP", "CCC", "XXX"];

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("{service} failed to translate: {message}")]
    Service { service: String, message: String },

    #[error("failed to read translation table {path}")]
    TableIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("translation table {path} must be a JSON object of strings")]
    TableFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Something that turns Japanese text into a translation.
///
/// `Ok(None)` means the translator has nothing for this text, which is not a
/// failure.
pub trait Translator: Sync {
    fn name(&self) -> &str;

    fn translate(&self, text: &str) -> Result<Option<String>, TranslateError>;
}

/// Results of one batch, in input order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub translations: IndexMap<String, String>,
    pub untranslated: usize,
    pub failed: usize,
}

enum ItemResult {
    Translated(String),
    Untranslated,
    Failed,
}

/// Translate `texts` in parallel. A failing item is logged and counted;
/// the rest of the batch continues.
#[instrument(skip_all, fields(service = translator.name(), texts = texts.len()))]
pub fn translate_batch<T>(translator: &T, texts: &[String]) -> BatchOutcome
where
    T: Translator + ?Sized,
{
    let results: Vec<ItemResult> = texts
        .par_iter()
        .map(|text| match translator.translate(text) {
            Ok(Some(t)) => ItemResult::Translated(t),
            Ok(None) => ItemResult::Untranslated,
            Err(e) => {
                warn!(error = %e, text = text.as_str(), "translation failed");
                ItemResult::Failed
            }
        })
        .collect();

    let mut outcome = BatchOutcome::default();
    for (text, result) in texts.iter().zip(results) {
        match result {
            ItemResult::Translated(t) => {
                outcome.translations.insert(text.clone(), t);
            }
            ItemResult::Untranslated => outcome.untranslated += 1,
            ItemResult::Failed => outcome.failed += 1,
        }
    }

    info!(
        translated = outcome.translations.len(),
        untranslated = outcome.untranslated,
        failed = outcome.failed,
        "batch translated"
    );
    outcome
}

/// True when `translation` is exactly one of `sentinels`, ignoring
/// surrounding whitespace.
pub fn is_sentinel<S: AsRef<str>>(translation: &str, sentinels: &[S]) -> bool {
    let t = translation.trim();
    sentinels.iter().any(|s| s.as_ref() == t)
}

/// Drop translations that are sentinel replies. Returns how many were removed.
pub fn cull_sentinels<S: AsRef<str>>(
    translations: &mut IndexMap<String, String>,
    sentinels: &[S],
) -> usize {
    let before = translations.len();
    translations.retain(|_, t| !is_sentinel(t, sentinels));

    let removed = before - translations.len();
    debug!(removed, "sentinel translations culled");
    removed
}

/// Translator backed by a reviewed JSON table `{ "原文": "translation" }`.
#[derive(Debug, Clone, Default)]
pub struct TableTranslator {
    name: String,
    table: IndexMap<String, String>,
}

impl TableTranslator {
    pub fn new(name: impl Into<String>, table: IndexMap<String, String>) -> Self {
        Self { name: name.into(), table }
    }

    /// Load a table file; the service name is the file stem.
    pub fn from_path(path: &Path) -> Result<Self, TranslateError> {
        let raw = fs::read(path).map_err(|source| TranslateError::TableIo {
            path: path.to_path_buf(),
            source,
        })?;
        let table: IndexMap<String, String> =
            serde_json::from_slice(&raw).map_err(|source| TranslateError::TableFormat {
                path: path.to_path_buf(),
                source,
            })?;

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "table".to_string());
        debug!(entries = table.len(), name = %name, "translation table loaded");
        Ok(Self::new(name, table))
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Translator for TableTranslator {
    fn name(&self) -> &str {
        &self.name
    }

    fn translate(&self, text: &str) -> Result<Option<String>, TranslateError> {
        Ok(self
            .table
            .get(text)
            .filter(|t| !t.trim().is_empty())
            .cloned())
    }
}
