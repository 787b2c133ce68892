//! Round-trip verification: every survivor must re-encode to bytes that are
//! physically present in the source binary.

use memchr::memmem;
use rayon::prelude::*;
use tracing::{debug, instrument, warn};

use crate::core::codec::Dialect;
use crate::core::dedup::CandidateSet;
use crate::core::exclusion::{ExclusionLedger, ExclusionReason, ExclusionRecord};

/// Outcome of checking one candidate against the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification
{
    Found
    {
        offset: usize
    },
    Missing,
    Unencodable,
}

impl Verification
{
    pub fn is_ok(self) -> bool
    {
        matches!(self, Verification::Found { .. })
    }

    pub fn reason(self) -> Option<ExclusionReason>
    {
        match self
        {
            Verification::Found { .. } => None,
            Verification::Missing => Some(ExclusionReason::MissingInSource),
            Verification::Unencodable => Some(ExclusionReason::ErrorCheckingSource),
        }
    }
}

/// Re-encode `candidate` and search for it in `source`.
pub fn verify(
    candidate: &str,
    source: &[u8],
    dialect: Dialect,
) -> Verification
{
    let Ok(needle) = dialect.encode(candidate)
    else
    {
        return Verification::Unencodable;
    };

    match memmem::find(source, &needle)
    {
        Some(offset) => Verification::Found { offset },
        None => Verification::Missing,
    }
}

/// Verify every candidate still standing in `ledger`, in parallel.
///
/// This is one full-buffer search per candidate, so it belongs at the end of
/// the pipeline after the cheap heuristics have thinned the set.
#[instrument(skip_all, fields(candidates = candidates.len(), source_len = source.len()))]
pub fn verify_all(
    candidates: &CandidateSet,
    ledger: &ExclusionLedger,
    source: &[u8],
    dialect: Dialect,
) -> Vec<ExclusionRecord>
{
    let pending: Vec<&str> = ledger
        .survivors(candidates)
        .collect();

    let records: Vec<ExclusionRecord> = pending
        .par_iter()
        .filter_map(|&text| {
            let reason = verify(text, source, dialect).reason()?;
            warn!(%reason, text, "extracted string does not round-trip to the source");
            Some(ExclusionRecord { text: text.to_string(), reason })
        })
        .collect();

    debug!(checked = pending.len(), failed = records.len(), "verification finished");
    records
}
