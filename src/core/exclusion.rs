//! Exclusion vocabulary and the append-only ledger of rejected candidates.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::dedup::CandidateSet;

/// Why a candidate was removed from consideration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ExclusionReason
{
    HasEscapeSequence,
    TooShort,
    NotJapaneseEnough,
    LowCharacterVariety,
    ExcessiveRepetition,
    ContainsChineseCharacters,
    MissingInSource,
    ErrorCheckingSource,
    DecodeError,
}

impl ExclusionReason
{
    /// Human label, as stored next to excluded rows.
    pub fn label(self) -> &'static str
    {
        match self
        {
            ExclusionReason::HasEscapeSequence => "Has Escape Sequence",
            ExclusionReason::TooShort => "Too Short",
            ExclusionReason::NotJapaneseEnough => "Not Japanese Enough",
            ExclusionReason::LowCharacterVariety => "No Character Variety",
            ExclusionReason::ExcessiveRepetition => "Character Repeats",
            ExclusionReason::ContainsChineseCharacters => "Contains Chinese Characters",
            ExclusionReason::MissingInSource => "Missing In Source",
            ExclusionReason::ErrorCheckingSource => "Error Checking Source",
            ExclusionReason::DecodeError => "Decode Error",
        }
    }
}

impl fmt::Display for ExclusionReason
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result
    {
        f.write_str(self.label())
    }
}

/// A candidate's text paired with the reason it was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionRecord
{
    pub text: String,
    pub reason: ExclusionReason,
}

/// Append-only record of exclusions for one pass. The first reason recorded
/// for a text wins; later attempts are ignored.
#[derive(Debug, Default, Clone)]
pub struct ExclusionLedger
{
    entries: IndexMap<String, ExclusionReason>,
}

impl ExclusionLedger
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Returns false if the text already carried a reason.
    pub fn record(
        &mut self,
        record: ExclusionRecord,
    ) -> bool
    {
        if self
            .entries
            .contains_key(&record.text)
        {
            return false;
        }

        self.entries
            .insert(record.text, record.reason);
        true
    }

    pub fn extend(
        &mut self,
        records: impl IntoIterator<Item = ExclusionRecord>,
    ) -> usize
    {
        let mut added = 0;
        for record in records
        {
            if self.record(record)
            {
                added += 1;
            }
        }
        added
    }

    pub fn is_excluded(
        &self,
        text: &str,
    ) -> bool
    {
        self.entries
            .contains_key(text)
    }

    pub fn reason_of(
        &self,
        text: &str,
    ) -> Option<ExclusionReason>
    {
        self.entries
            .get(text)
            .copied()
    }

    pub fn len(&self) -> usize
    {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ExclusionReason)>
    {
        self.entries
            .iter()
            .map(|(t, r)| (t.as_str(), *r))
    }

    /// Candidates with no recorded reason, in candidate order.
    pub fn survivors<'a>(
        &'a self,
        candidates: &'a CandidateSet,
    ) -> impl Iterator<Item = &'a str> + 'a
    {
        candidates
            .iter()
            .filter(move |t| !self.is_excluded(t))
    }
}
