//! Text heuristics that separate real Japanese prose from accidental decodes.
//!
//! Predicates run cheapest first and short-circuit: the first one that
//! rejects a string decides its [`ExclusionReason`].
//!
//! Character classes use one canonical table:
//!
//! | class       | range                               |
//! |-------------|-------------------------------------|
//! | punctuation | U+3000–U+303F                       |
//! | hiragana    | U+3040–U+309F                       |
//! | katakana    | U+30A0–U+30FF                       |
//! | kanji       | U+4E00–U+9FFF, U+3400–U+4DBF        |
//!
//! Full-width Latin (U+FF00–U+FFEF) is profiled but never counts as
//! Japanese.

use std::collections::HashSet;

use itertools::Itertools;
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::core::dedup::CandidateSet;
use crate::core::exclusion::{ExclusionLedger, ExclusionReason, ExclusionRecord};

pub const DEFAULT_ESCAPE_PATTERN: &str = "%[A-Za-z]";

/// Thresholds for the standard predicate chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicsConfig
{
    /// Strings with fewer characters are excluded
    pub min_length: usize,
    /// Minimum share of Japanese characters, in percent
    pub min_japaneseness_percent: u32,
    /// Minimum distinct/total characters, in percent
    pub min_variety_percent: u32,
    /// A character repeated this many times in a row excludes the string (0 = off)
    pub max_repeat_run: usize,
    /// Reject any string containing a CJK unified ideograph
    pub exclude_chinese: bool,
    /// Regex for program format placeholders
    pub escape_pattern: String,
}

impl Default for HeuristicsConfig
{
    fn default() -> Self
    {
        Self {
            min_length: 3,
            min_japaneseness_percent: 40,
            min_variety_percent: 50,
            max_repeat_run: 5,
            exclude_chinese: true,
            escape_pattern: DEFAULT_ESCAPE_PATTERN.to_string(),
        }
    }
}

/// Character classes used by the Japanese-ness table and profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass
{
    Punctuation,
    Hiragana,
    Katakana,
    Kanji,
    FullWidth,
    Ascii,
    Other,
}

pub fn classify(c: char) -> CharClass
{
    match c
    {
        '\u{3000}'..='\u{303F}' => CharClass::Punctuation,
        '\u{3040}'..='\u{309F}' => CharClass::Hiragana,
        '\u{30A0}'..='\u{30FF}' => CharClass::Katakana,
        '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' => CharClass::Kanji,
        '\u{FF00}'..='\u{FFEF}' => CharClass::FullWidth,
        c if c.is_ascii() => CharClass::Ascii,
        _ => CharClass::Other,
    }
}

#[inline]
pub fn is_japanese(c: char) -> bool
{
    matches!(
        classify(c),
        CharClass::Punctuation | CharClass::Hiragana | CharClass::Katakana | CharClass::Kanji
    )
}

/// CJK Unified Ideographs block only; Extension A is not treated as Chinese.
#[inline]
pub fn is_cjk_ideograph(c: char) -> bool
{
    ('\u{4E00}'..='\u{9FFF}').contains(&c)
}

/// Percentage of characters in the Japanese table; 0 for empty text.
pub fn japaneseness_percent(text: &str) -> f64
{
    let (total, japanese) = text
        .chars()
        .fold((0usize, 0usize), |(t, j), c| (t + 1, j + usize::from(is_japanese(c))));
    percent(japanese, total)
}

/// Distinct characters over total characters, in percent; 0 for empty text.
pub fn variety_percent(text: &str) -> f64
{
    let total = text
        .chars()
        .count();
    let distinct = text
        .chars()
        .collect::<HashSet<_>>()
        .len();
    percent(distinct, total)
}

/// Length of the longest run of one repeated character.
pub fn longest_repeat(text: &str) -> usize
{
    text.chars()
        .dedup_with_count()
        .map(|(n, _)| n)
        .max()
        .unwrap_or(0)
}

fn percent(
    part: usize,
    total: usize,
) -> f64
{
    if total == 0
    {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}

/// One exclusion test.
pub trait Predicate: Send + Sync
{
    /// Reason recorded when this predicate rejects.
    fn reason(&self) -> ExclusionReason;

    fn rejects(
        &self,
        text: &str,
    ) -> bool;
}

pub struct EscapeSequence
{
    pattern: Regex,
}

impl EscapeSequence
{
    pub fn new(pattern: &str) -> Result<Self, regex::Error>
    {
        Ok(Self { pattern: Regex::new(pattern)? })
    }
}

impl Predicate for EscapeSequence
{
    fn reason(&self) -> ExclusionReason
    {
        ExclusionReason::HasEscapeSequence
    }

    fn rejects(
        &self,
        text: &str,
    ) -> bool
    {
        self.pattern
            .is_match(text)
    }
}

pub struct MinLength(pub usize);

impl Predicate for MinLength
{
    fn reason(&self) -> ExclusionReason
    {
        ExclusionReason::TooShort
    }

    fn rejects(
        &self,
        text: &str,
    ) -> bool
    {
        // Stop counting once the minimum is reached
        text.chars()
            .take(self.0)
            .count()
            < self.0
    }
}

pub struct MinJapaneseness(pub u32);

impl Predicate for MinJapaneseness
{
    fn reason(&self) -> ExclusionReason
    {
        ExclusionReason::NotJapaneseEnough
    }

    fn rejects(
        &self,
        text: &str,
    ) -> bool
    {
        japaneseness_percent(text) < f64::from(self.0)
    }
}

pub struct MinVariety(pub u32);

impl Predicate for MinVariety
{
    fn reason(&self) -> ExclusionReason
    {
        ExclusionReason::LowCharacterVariety
    }

    fn rejects(
        &self,
        text: &str,
    ) -> bool
    {
        variety_percent(text) < f64::from(self.0)
    }
}

pub struct MaxRepeatRun(pub usize);

impl Predicate for MaxRepeatRun
{
    fn reason(&self) -> ExclusionReason
    {
        ExclusionReason::ExcessiveRepetition
    }

    fn rejects(
        &self,
        text: &str,
    ) -> bool
    {
        self.0 > 0 && longest_repeat(text) >= self.0
    }
}

pub struct ChineseCharacters;

impl Predicate for ChineseCharacters
{
    fn reason(&self) -> ExclusionReason
    {
        ExclusionReason::ContainsChineseCharacters
    }

    fn rejects(
        &self,
        text: &str,
    ) -> bool
    {
        text.chars()
            .any(is_cjk_ideograph)
    }
}

/// Ordered list of predicates.
#[derive(Default)]
pub struct PredicateChain
{
    predicates: Vec<Box<dyn Predicate>>,
}

impl PredicateChain
{
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn push(
        mut self,
        predicate: impl Predicate + 'static,
    ) -> Self
    {
        self.predicates
            .push(Box::new(predicate));
        self
    }

    /// The six standard predicates in their fixed order.
    pub fn standard(config: &HeuristicsConfig) -> Result<Self, regex::Error>
    {
        let chain = Self::new()
            .push(EscapeSequence::new(&config.escape_pattern)?)
            .push(MinLength(config.min_length))
            .push(MinJapaneseness(config.min_japaneseness_percent))
            .push(MinVariety(config.min_variety_percent))
            .push(MaxRepeatRun(config.max_repeat_run));

        Ok(if config.exclude_chinese { chain.push(ChineseCharacters) } else { chain })
    }

    /// Reasons in evaluation order.
    pub fn reasons(&self) -> Vec<ExclusionReason>
    {
        self.predicates
            .iter()
            .map(|p| p.reason())
            .collect()
    }

    /// First rejecting predicate's reason, or `None` if every one accepts.
    pub fn evaluate(
        &self,
        text: &str,
    ) -> Option<ExclusionReason>
    {
        self.predicates
            .iter()
            .find(|p| p.rejects(text))
            .map(|p| p.reason())
    }
}

/// Run `chain` over every candidate not already in `ledger`.
///
/// Candidates are independent, so evaluation is parallel; the returned
/// records keep candidate order.
#[instrument(skip_all, fields(candidates = candidates.len(), excluded = ledger.len()))]
pub fn exclude_strings(
    candidates: &CandidateSet,
    ledger: &ExclusionLedger,
    chain: &PredicateChain,
) -> Vec<ExclusionRecord>
{
    let pending: Vec<&str> = ledger
        .survivors(candidates)
        .collect();

    let records: Vec<ExclusionRecord> = pending
        .par_iter()
        .filter_map(|&text| {
            chain
                .evaluate(text)
                .map(|reason| {
                    trace!(%reason, text, "excluded");
                    ExclusionRecord { text: text.to_string(), reason }
                })
        })
        .collect();

    debug!(reviewed = pending.len(), excluded = records.len(), "heuristics applied");
    records
}

/// Per-class character counts for review output.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct TextProfile
{
    pub total: usize,
    pub hiragana: usize,
    pub katakana: usize,
    pub kanji: usize,
    pub punctuation: usize,
    pub full_width: usize,
    pub ascii: usize,
    pub other: usize,
}

impl TextProfile
{
    pub fn of(text: &str) -> Self
    {
        let mut p = TextProfile::default();
        for c in text.chars()
        {
            p.total += 1;
            match classify(c)
            {
                CharClass::Hiragana => p.hiragana += 1,
                CharClass::Katakana => p.katakana += 1,
                CharClass::Kanji => p.kanji += 1,
                CharClass::Punctuation => p.punctuation += 1,
                CharClass::FullWidth => p.full_width += 1,
                CharClass::Ascii => p.ascii += 1,
                CharClass::Other => p.other += 1,
            }
        }
        p
    }

    pub fn japanese(&self) -> usize
    {
        self.hiragana + self.katakana + self.kanji + self.punctuation
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn chain() -> PredicateChain
    {
        PredicateChain::standard(&HeuristicsConfig::default()).unwrap()
    }

    #[test]
    fn standard_order_is_fixed()
    {
        use ExclusionReason::*;
        assert_eq!(
            chain().reasons(),
            vec![
                HasEscapeSequence,
                TooShort,
                NotJapaneseEnough,
                LowCharacterVariety,
                ExcessiveRepetition,
                ContainsChineseCharacters
            ]
        );
    }

    #[test]
    fn escape_sequence_beats_everything()
    {
        assert_eq!(chain().evaluate("%dこんにちは"), Some(ExclusionReason::HasEscapeSequence));
        // Would otherwise be too short and not Japanese
        assert_eq!(chain().evaluate("%s"), Some(ExclusionReason::HasEscapeSequence));
        assert_eq!(chain().evaluate("きょうは%です"), None);
    }

    #[test]
    fn min_length_boundary()
    {
        let config = HeuristicsConfig { min_length: 4, ..Default::default() };
        let chain = PredicateChain::standard(&config).unwrap();
        assert_eq!(chain.evaluate("あいうえ"), None);
        assert_eq!(chain.evaluate("あいう"), Some(ExclusionReason::TooShort));
    }

    #[test]
    fn mostly_latin_is_not_japanese_enough()
    {
        assert_eq!(chain().evaluate("ERROR: ファイル"), Some(ExclusionReason::NotJapaneseEnough));
        assert_eq!(chain().evaluate("ＡＢＣＤＥ"), Some(ExclusionReason::NotJapaneseEnough));
    }

    #[test]
    fn low_variety_fires_before_repetition()
    {
        assert_eq!(chain().evaluate("ああああああ"), Some(ExclusionReason::LowCharacterVariety));
    }

    #[test]
    fn repetition_inside_varied_text()
    {
        assert_eq!(
            chain().evaluate("ああああああいうえおかきくけこさしす"),
            Some(ExclusionReason::ExcessiveRepetition)
        );
        assert_eq!(chain().evaluate("ああああいうえおかきくけこ"), None);
    }

    #[test]
    fn pure_repeat_with_variety_disabled()
    {
        let config = HeuristicsConfig { min_variety_percent: 0, ..Default::default() };
        let chain = PredicateChain::standard(&config).unwrap();
        assert_eq!(chain.evaluate("ああああああ"), Some(ExclusionReason::ExcessiveRepetition));
    }

    #[test]
    fn kanji_counts_as_japanese_but_is_rejected_as_chinese()
    {
        assert_eq!(japaneseness_percent("日本語"), 100.0);
        assert_eq!(chain().evaluate("日本語です"), Some(ExclusionReason::ContainsChineseCharacters));

        let config = HeuristicsConfig { exclude_chinese: false, ..Default::default() };
        let chain = PredicateChain::standard(&config).unwrap();
        assert_eq!(chain.evaluate("日本語です"), None);
    }

    #[test]
    fn metrics_on_edge_inputs()
    {
        assert_eq!(japaneseness_percent(""), 0.0);
        assert_eq!(variety_percent(""), 0.0);
        assert_eq!(longest_repeat(""), 0);
        assert_eq!(longest_repeat("あいいいう"), 3);
        assert_eq!(variety_percent("ab"), 100.0);
    }

    #[test]
    fn exclude_strings_skips_already_excluded()
    {
        let set = CandidateSet::from_texts(["%dテスト", "あいうえお", "ab"]);
        let mut ledger = ExclusionLedger::new();
        ledger.record(ExclusionRecord {
            text: "ab".into(),
            reason: ExclusionReason::MissingInSource,
        });

        let records = exclude_strings(&set, &ledger, &chain());
        assert_eq!(
            records,
            vec![ExclusionRecord {
                text: "%dテスト".into(),
                reason: ExclusionReason::HasEscapeSequence
            }]
        );
    }

    #[test]
    fn profile_counts_classes()
    {
        let p = TextProfile::of("あア漢、Ａa?");
        assert_eq!(p.total, 7);
        assert_eq!(p.hiragana, 1);
        assert_eq!(p.katakana, 1);
        assert_eq!(p.kanji, 1);
        assert_eq!(p.punctuation, 1);
        assert_eq!(p.full_width, 1);
        assert_eq!(p.ascii, 2);
        assert_eq!(p.japanese(), 4);
    }
}
