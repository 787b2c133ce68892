//! Decode raw runs and keep the unique, trimmed results.

use bstr::ByteSlice;
use indexmap::IndexSet;
use rayon::prelude::*;
use tracing::{debug, instrument, trace};

use crate::core::codec::Dialect;
use crate::core::exclusion::ExclusionReason;
use crate::core::scan::RawByteRun;
use crate::core::tally::{Tally, TallyKind};

/// Result of feeding one run into the set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome
{
    New(String),
    AlreadyExists(String),
    Whitespace,
    DecodeError,
}

impl IngestOutcome
{
    pub fn kind(&self) -> TallyKind
    {
        match self
        {
            IngestOutcome::New(_) => TallyKind::New,
            IngestOutcome::AlreadyExists(_) => TallyKind::AlreadyExists,
            IngestOutcome::Whitespace => TallyKind::Whitespace,
            IngestOutcome::DecodeError => TallyKind::Excluded(ExclusionReason::DecodeError),
        }
    }

    /// The candidate text, when the run decoded to something usable.
    pub fn candidate(&self) -> Option<&str>
    {
        match self
        {
            IngestOutcome::New(t) | IngestOutcome::AlreadyExists(t) => Some(t),
            _ => None,
        }
    }
}

/// Content-keyed set of decoded candidate strings, kept in first-seen order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CandidateSet
{
    texts: IndexSet<String>,
}

enum Decoded
{
    Text(String),
    Whitespace,
    Failed,
}

/// Decode `run` under `dialect` and trim surrounding whitespace.
fn decode_run(
    run: &RawByteRun<'_>,
    dialect: Dialect,
) -> Decoded
{
    match dialect.decode(run.bytes)
    {
        Ok(text) =>
        {
            let trimmed = text.trim();
            if trimmed.is_empty()
            {
                Decoded::Whitespace
            }
            else if trimmed.len() == text.len()
            {
                Decoded::Text(text)
            }
            else
            {
                Decoded::Text(trimmed.to_string())
            }
        }
        Err(_) =>
        {
            trace!(offset = run.offset, bytes = ?run.bytes.as_bstr(), "decode failed");
            Decoded::Failed
        }
    }
}

impl CandidateSet
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Build a set from already decoded texts (e.g. loaded from a store).
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            texts: texts
                .into_iter()
                .map(Into::into)
                .collect(),
        }
    }

    /// Decode one run and insert it if new.
    pub fn ingest(
        &mut self,
        run: &RawByteRun<'_>,
        dialect: Dialect,
    ) -> IngestOutcome
    {
        match decode_run(run, dialect)
        {
            Decoded::Failed => IngestOutcome::DecodeError,
            Decoded::Whitespace => IngestOutcome::Whitespace,
            Decoded::Text(text) => self.commit(text),
        }
    }

    fn commit(
        &mut self,
        text: String,
    ) -> IngestOutcome
    {
        if self
            .texts
            .contains(&text)
        {
            IngestOutcome::AlreadyExists(text)
        }
        else
        {
            self.texts
                .insert(text.clone());
            IngestOutcome::New(text)
        }
    }

    /// Decode a batch in parallel, then commit every success in one step.
    ///
    /// The set is only touched after all decodes finish, and the exclusive
    /// borrow means no reader can observe a half-applied batch.
    #[instrument(skip_all, fields(runs = runs.len(), dialect = %dialect))]
    pub fn ingest_batch(
        &mut self,
        runs: &[RawByteRun<'_>],
        dialect: Dialect,
    ) -> Tally
    {
        let decoded: Vec<Decoded> = runs
            .par_iter()
            .map(|run| decode_run(run, dialect))
            .collect();

        let mut tally = Tally::new();
        for item in decoded
        {
            let outcome = match item
            {
                Decoded::Failed => IngestOutcome::DecodeError,
                Decoded::Whitespace => IngestOutcome::Whitespace,
                Decoded::Text(text) => self.commit(text),
            };
            tally.bump(outcome.kind());
        }

        debug!(unique = self.len(), ?tally, "batch ingested");
        tally
    }

    pub fn contains(
        &self,
        text: &str,
    ) -> bool
    {
        self.texts
            .contains(text)
    }

    pub fn len(&self) -> usize
    {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.texts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str>
    {
        self.texts
            .iter()
            .map(String::as_str)
    }
}
