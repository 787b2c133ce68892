//! Per-kind counters accumulated across a pass, for reporting only.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::core::exclusion::ExclusionReason;

/// What a tally entry counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TallyKind
{
    /// Byte run emitted by the scanner
    Run,
    New,
    AlreadyExists,
    Whitespace,
    Survived,
    Excluded(ExclusionReason),
}

impl fmt::Display for TallyKind
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result
    {
        match self
        {
            TallyKind::Run => f.write_str("Runs"),
            TallyKind::New => f.write_str("New"),
            TallyKind::AlreadyExists => f.write_str("Already Exists"),
            TallyKind::Whitespace => f.write_str("Whitespace"),
            TallyKind::Survived => f.write_str("Survived"),
            TallyKind::Excluded(reason) => write!(f, "{reason}"),
        }
    }
}

impl Serialize for TallyKind
{
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    {
        serializer.collect_str(self)
    }
}

/// Counts per [`TallyKind`]. Merging is plain addition, so the order in
/// which partial tallies are combined never changes the result.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Tally
{
    counts: BTreeMap<TallyKind, usize>,
}

impl Tally
{
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn add(
        &mut self,
        kind: TallyKind,
        n: usize,
    )
    {
        if n > 0
        {
            *self
                .counts
                .entry(kind)
                .or_default() += n;
        }
    }

    pub fn bump(
        &mut self,
        kind: TallyKind,
    )
    {
        self.add(kind, 1);
    }

    pub fn get(
        &self,
        kind: TallyKind,
    ) -> usize
    {
        self.counts
            .get(&kind)
            .copied()
            .unwrap_or(0)
    }

    pub fn merge(
        mut self,
        other: Tally,
    ) -> Tally
    {
        for (kind, n) in other.counts
        {
            self.add(kind, n);
        }
        self
    }

    pub fn total(&self) -> usize
    {
        self.counts
            .values()
            .sum()
    }

    pub fn is_empty(&self) -> bool
    {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TallyKind, usize)> + '_
    {
        self.counts
            .iter()
            .map(|(k, n)| (*k, *n))
    }
}

impl FromIterator<TallyKind> for Tally
{
    fn from_iter<I: IntoIterator<Item = TallyKind>>(iter: I) -> Self
    {
        let mut tally = Tally::new();
        for kind in iter
        {
            tally.bump(kind);
        }
        tally
    }
}
