//! The extraction-and-culling pipeline: scan, ingest, heuristics, verify.
//!
//! The store is handed in by the caller; nothing here holds global state.
//! `extract` and `cull` are usable on their own, `run` chains them and
//! writes the results through a [`CandidateStore`].

use std::fmt;

use indicatif::ProgressBar;
use serde::Serialize;
use tracing::{info, instrument};

use crate::core::codec::Dialect;
use crate::core::dedup::CandidateSet;
use crate::core::exclusion::{ExclusionLedger, ExclusionRecord};
use crate::core::heuristics::{HeuristicsConfig, PredicateChain, exclude_strings};
use crate::core::scan::Scanner;
use crate::core::tally::{Tally, TallyKind};
use crate::core::verify::verify_all;
use crate::infra::config::ScanConfig;
use crate::infra::store::{CandidateStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError
{
    #[error("invalid escape pattern")]
    InvalidPattern(#[from] regex::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Stage
{
    Scan,
    Ingest,
    Heuristics,
    Verify,
}

impl fmt::Display for Stage
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result
    {
        f.write_str(match self
        {
            Stage::Scan => "scan",
            Stage::Ingest => "ingest",
            Stage::Heuristics => "heuristics",
            Stage::Verify => "verify",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport
{
    pub stage: Stage,
    pub tally: Tally,
}

/// Everything one pass produced.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport
{
    pub stages: Vec<StageReport>,
    pub candidates: CandidateSet,
    pub ledger: ExclusionLedger,
}

impl PipelineReport
{
    /// Candidates that passed every filter, in first-seen order.
    pub fn translation_candidates(&self) -> Vec<&str>
    {
        self.ledger
            .survivors(&self.candidates)
            .collect()
    }

    /// All stage tallies added together.
    pub fn tally(&self) -> Tally
    {
        self.stages
            .iter()
            .fold(Tally::new(), |acc, s| acc.merge(s.tally.clone()))
    }

    pub fn stage(
        &self,
        stage: Stage,
    ) -> Option<&StageReport>
    {
        self.stages
            .iter()
            .find(|s| s.stage == stage)
    }

    pub fn exclusions(&self) -> impl Iterator<Item = ExclusionRecord> + '_
    {
        self.ledger
            .iter()
            .map(|(text, reason)| ExclusionRecord { text: text.to_string(), reason })
    }
}

pub struct Pipeline
{
    scanner: Scanner,
    chunk_size: usize,
    chain: PredicateChain,
    progress: ProgressBar,
}

impl Pipeline
{
    pub fn new(
        scan: &ScanConfig,
        heuristics: &HeuristicsConfig,
    ) -> Result<Self, PipelineError>
    {
        Ok(Self {
            scanner: Scanner::new(scan.dialect).with_min_units(scan.min_units),
            chunk_size: scan.chunk_size,
            chain: PredicateChain::standard(heuristics)?,
            progress: ProgressBar::hidden(),
        })
    }

    /// Replace the predicate chain, e.g. with a custom composition.
    pub fn with_chain(
        mut self,
        chain: PredicateChain,
    ) -> Self
    {
        self.chain = chain;
        self
    }

    /// Advance `progress` once per finished stage.
    pub fn with_progress(
        mut self,
        progress: ProgressBar,
    ) -> Self
    {
        self.progress = progress;
        self
    }

    pub fn dialect(&self) -> Dialect
    {
        self.scanner
            .dialect()
    }

    fn finish_stage(
        &self,
        stage: Stage,
        tally: Tally,
    ) -> StageReport
    {
        info!(%stage, total = tally.total(), ?tally, "stage finished");
        self.progress
            .set_message(stage.to_string());
        self.progress
            .inc(1);
        if self
            .progress
            .length()
            .is_some_and(|len| self.progress.position() >= len)
        {
            self.progress
                .finish_and_clear();
        }
        StageReport { stage, tally }
    }

    /// Scan `source` and decode the runs into a fresh candidate set.
    #[instrument(skip_all, fields(source_len = source.len(), dialect = %self.dialect()))]
    pub fn extract(
        &self,
        source: &[u8],
    ) -> (CandidateSet, Vec<StageReport>)
    {
        let runs = self
            .scanner
            .scan_parallel(source, self.chunk_size);

        let mut scan_tally = Tally::new();
        scan_tally.add(TallyKind::Run, runs.len());
        let scan = self.finish_stage(Stage::Scan, scan_tally);

        let mut candidates = CandidateSet::new();
        let ingest_tally = candidates.ingest_batch(&runs, self.dialect());
        let ingest = self.finish_stage(Stage::Ingest, ingest_tally);

        (candidates, vec![scan, ingest])
    }

    /// Run the heuristics, then round-trip verification on what is left.
    #[instrument(skip_all, fields(candidates = candidates.len()))]
    pub fn cull(
        &self,
        candidates: &CandidateSet,
        source: &[u8],
    ) -> (ExclusionLedger, Vec<StageReport>)
    {
        let mut ledger = ExclusionLedger::new();

        let rejected = exclude_strings(candidates, &ledger, &self.chain);
        let heuristics = self.record_stage(Stage::Heuristics, &mut ledger, candidates, rejected);

        let missing = verify_all(candidates, &ledger, source, self.dialect());
        let verify = self.record_stage(Stage::Verify, &mut ledger, candidates, missing);

        (ledger, vec![heuristics, verify])
    }

    fn record_stage(
        &self,
        stage: Stage,
        ledger: &mut ExclusionLedger,
        candidates: &CandidateSet,
        records: Vec<ExclusionRecord>,
    ) -> StageReport
    {
        let mut tally: Tally = records
            .iter()
            .map(|r| TallyKind::Excluded(r.reason))
            .collect();
        ledger.extend(records);
        tally.add(
            TallyKind::Survived,
            ledger
                .survivors(candidates)
                .count(),
        );
        self.finish_stage(stage, tally)
    }

    /// Cull everything already in `store` against `source` and write the
    /// exclusions back. Earlier exclusions are cleared first.
    pub fn cull_store(
        &self,
        source: &[u8],
        store: &mut dyn CandidateStore,
    ) -> Result<PipelineReport, PipelineError>
    {
        let candidates = CandidateSet::from_texts(
            store
                .records()
                .into_iter()
                .map(|r| r.text),
        );
        self.cull_into(candidates, source, store)
    }

    fn cull_into(
        &self,
        candidates: CandidateSet,
        source: &[u8],
        store: &mut dyn CandidateStore,
    ) -> Result<PipelineReport, PipelineError>
    {
        let (ledger, stages) = self.cull(&candidates, source);

        store.reset_exclusions()?;
        for (text, reason) in ledger.iter()
        {
            store.exclude(text, reason)?;
        }

        Ok(PipelineReport { stages, candidates, ledger })
    }

    /// Full pass: extract, upsert every unique candidate, then cull the
    /// whole store. This pass's candidates come first, in first-seen order,
    /// followed by rows left from earlier passes.
    #[instrument(skip_all, fields(source_len = source.len()))]
    pub fn run(
        &self,
        source: &[u8],
        store: &mut dyn CandidateStore,
    ) -> Result<PipelineReport, PipelineError>
    {
        let (extracted, mut stages) = self.extract(source);

        let mut added = 0usize;
        for text in extracted.iter()
        {
            if store.upsert(text)?
            {
                added += 1;
            }
        }
        info!(added, unique = extracted.len(), "candidates stored");

        let earlier: Vec<String> = store
            .records()
            .into_iter()
            .map(|r| r.text)
            .filter(|t| !extracted.contains(t))
            .collect();
        let candidates = CandidateSet::from_texts(
            extracted
                .iter()
                .map(str::to_string)
                .chain(earlier),
        );

        let mut report = self.cull_into(candidates, source, store)?;
        stages.append(&mut report.stages);
        report.stages = stages;
        Ok(report)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::core::exclusion::ExclusionReason;
    use crate::infra::store::MemoryStore;

    fn pipeline(
        dialect: Dialect,
        heuristics: HeuristicsConfig,
    ) -> Pipeline
    {
        let scan = ScanConfig { dialect, ..Default::default() };
        Pipeline::new(&scan, &heuristics).unwrap()
    }

    /// Encode each text and separate them with NUL padding.
    fn synthetic_binary(texts: &[&str]) -> Vec<u8>
    {
        let mut out = vec![0u8; 4];
        for text in texts
        {
            out.extend(
                Dialect::ShiftJis
                    .encode(text)
                    .unwrap(),
            );
            out.extend([0u8; 4]);
        }
        out
    }

    #[test]
    fn two_pairs_survive_with_relaxed_length()
    {
        let p = pipeline(
            Dialect::ShiftJis,
            HeuristicsConfig { min_length: 2, ..Default::default() },
        );
        let mut store = MemoryStore::new();
        let report = p
            .run(&[0x82, 0xA0, 0x82, 0xA2], &mut store)
            .unwrap();

        assert_eq!(report.translation_candidates(), vec!["あい"]);
        assert_eq!(
            report
                .stage(Stage::Scan)
                .unwrap()
                .tally
                .get(TallyKind::Run),
            1
        );
        assert!(!store.get("あい").unwrap().excluded);
    }

    #[test]
    fn escape_sequence_is_excluded_in_store()
    {
        let p = pipeline(Dialect::Cp932, HeuristicsConfig::default());
        let source = synthetic_binary(&["あいうえお%dかきくけこ"]);
        let mut store = MemoryStore::new();
        let report = p
            .run(&source, &mut store)
            .unwrap();

        let text = "あいうえお%dかきくけこ";
        assert_eq!(report.ledger.reason_of(text), Some(ExclusionReason::HasEscapeSequence));
        assert_eq!(
            store
                .get(text)
                .unwrap()
                .exclusion_reason,
            Some(ExclusionReason::HasEscapeSequence)
        );
    }

    #[test]
    fn survivors_round_trip_to_source()
    {
        let p = pipeline(Dialect::ShiftJis, HeuristicsConfig::default());
        let source = synthetic_binary(&["こんにちは", "ありがとう", "カタカナです", "ああああああ"]);
        let mut store = MemoryStore::new();
        let report = p
            .run(&source, &mut store)
            .unwrap();

        let survivors = report.translation_candidates();
        assert_eq!(survivors, vec!["こんにちは", "ありがとう", "カタカナです"]);
        for text in survivors
        {
            let needle = p
                .dialect()
                .encode(text)
                .unwrap();
            assert!(memchr::memmem::find(&source, &needle).is_some(), "{text}");
        }
    }

    #[test]
    fn stale_store_rows_are_missing_in_source()
    {
        let p = pipeline(Dialect::ShiftJis, HeuristicsConfig::default());
        let mut store = MemoryStore::new();
        store
            .upsert("べつのもじれつ")
            .unwrap();
        store
            .exclude("べつのもじれつ", ExclusionReason::TooShort)
            .unwrap();

        let report = p
            .run(&synthetic_binary(&["こんにちは"]), &mut store)
            .unwrap();

        // Earlier exclusion is replaced by this pass's verdict
        assert_eq!(
            store
                .get("べつのもじれつ")
                .unwrap()
                .exclusion_reason,
            Some(ExclusionReason::MissingInSource)
        );
        assert_eq!(report.translation_candidates(), vec!["こんにちは"]);
    }

    #[test]
    fn rerun_is_stable()
    {
        let p = pipeline(Dialect::ShiftJis, HeuristicsConfig::default());
        let source = synthetic_binary(&["こんにちは", "%sテスト", "こんにちは"]);
        let mut store = MemoryStore::new();

        let first = p
            .run(&source, &mut store)
            .unwrap();
        let snapshot = store.records();
        let second = p
            .run(&source, &mut store)
            .unwrap();

        assert_eq!(store.records(), snapshot);
        assert_eq!(first.translation_candidates(), second.translation_candidates());
        assert_eq!(
            first
                .stage(Stage::Ingest)
                .unwrap()
                .tally
                .get(TallyKind::AlreadyExists),
            1
        );
    }

    #[test]
    fn stage_tallies_account_for_every_candidate()
    {
        // CP932 so the ASCII escape stays inside the run
        let p = pipeline(Dialect::Cp932, HeuristicsConfig::default());
        let source = synthetic_binary(&["こんにちは", "あい", "です%d"]);
        let (candidates, _) = p.extract(&source);
        let (ledger, stages) = p.cull(&candidates, &source);

        let heuristics = &stages[0].tally;
        assert_eq!(heuristics.get(TallyKind::Excluded(ExclusionReason::TooShort)), 1);
        assert_eq!(heuristics.get(TallyKind::Excluded(ExclusionReason::HasEscapeSequence)), 1);
        assert_eq!(heuristics.get(TallyKind::Survived), 1);
        assert_eq!(ledger.len(), 2);
    }
}
