//! Byte-stream scanner that recovers plausible Shift-JIS runs.
//!
//! Single left-to-right pass, no backtracking. A run starts only on a valid
//! lead/trail pair and may then be extended by further pairs or, for dialects
//! that allow it, by single-byte continuation bytes. When the run breaks the
//! breaking byte is re-tested as the start of the next run.

use rayon::prelude::*;
use tracing::{debug, instrument, trace};

use crate::core::codec::Dialect;

/// Default minimum unit count for an emitted run.
pub const DEFAULT_MIN_UNITS: usize = 2;

/// A run of candidate text bytes borrowed from the scanned buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawByteRun<'a>
{
    /// Absolute byte offset in the scanned buffer
    pub offset: usize,
    pub bytes: &'a [u8],
    /// Total units (one per double-byte pair or single byte)
    pub units: usize,
    pub double_units: usize,
}

impl RawByteRun<'_>
{
    pub fn end(&self) -> usize
    {
        self.offset + self.bytes.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State
{
    Idle,
    InWord,
}

/// Scanner configuration.
#[derive(Debug, Clone, Copy)]
pub struct Scanner
{
    dialect: Dialect,
    min_units: usize,
}

impl Scanner
{
    pub fn new(dialect: Dialect) -> Self
    {
        Self { dialect, min_units: DEFAULT_MIN_UNITS }
    }

    /// Minimum units for a run to be emitted (clamped to at least 1).
    pub fn with_min_units(
        mut self,
        min_units: usize,
    ) -> Self
    {
        self.min_units = min_units.max(1);
        self
    }

    pub fn dialect(&self) -> Dialect
    {
        self.dialect
    }

    /// Lazily iterate runs in `data`.
    pub fn scan_iter<'a>(
        &self,
        data: &'a [u8],
    ) -> Runs<'a>
    {
        Runs {
            data,
            base: 0,
            pos: 0,
            dialect: self.dialect,
            min_units: self.min_units,
        }
    }

    /// Scan the whole buffer on the current thread.
    #[instrument(skip_all, fields(len = data.len(), dialect = %self.dialect))]
    pub fn scan<'a>(
        &self,
        data: &'a [u8],
    ) -> Vec<RawByteRun<'a>>
    {
        let runs: Vec<_> = self
            .scan_iter(data)
            .collect();
        debug!(runs = runs.len(), "scan complete");
        runs
    }

    /// Scan in parallel chunks of roughly `chunk_size` bytes.
    ///
    /// Chunks are cut only at separator bytes, where the state machine is
    /// provably Idle, so the result is identical to [`Scanner::scan`].
    #[instrument(skip_all, fields(len = data.len(), chunk_size = chunk_size))]
    pub fn scan_parallel<'a>(
        &self,
        data: &'a [u8],
        chunk_size: usize,
    ) -> Vec<RawByteRun<'a>>
    {
        if chunk_size == 0 || data.len() <= chunk_size
        {
            return self.scan(data);
        }

        let bounds = self.chunk_bounds(data, chunk_size);
        debug!(chunks = bounds.len(), "scanning chunks in parallel");

        // Ordered collect keeps runs sorted by offset
        let per_chunk: Vec<Vec<RawByteRun<'a>>> = bounds
            .par_iter()
            .map(|&(lo, hi)| {
                let mut it = self.scan_iter(&data[lo..hi]);
                it.base = lo;
                it.collect()
            })
            .collect();

        per_chunk
            .into_iter()
            .flatten()
            .collect()
    }

    /// Split `data` into `[lo, hi)` spans whose boundaries sit on separator
    /// bytes. A span with no separator near its target end grows until one
    /// is found or the buffer ends.
    fn chunk_bounds(
        &self,
        data: &[u8],
        chunk_size: usize,
    ) -> Vec<(usize, usize)>
    {
        let mut bounds = Vec::new();
        let mut lo = 0;

        while lo < data.len()
        {
            let target = lo.saturating_add(chunk_size);
            if target >= data.len()
            {
                bounds.push((lo, data.len()));
                break;
            }

            let cut = data[target..]
                .iter()
                .position(|&b| self.dialect.is_separator(b))
                .map(|p| target + p);

            match cut
            {
                Some(hi) =>
                {
                    bounds.push((lo, hi));
                    lo = hi;
                }
                None =>
                {
                    bounds.push((lo, data.len()));
                    break;
                }
            }
        }

        bounds
    }
}

/// Iterator over runs; see [`Scanner::scan_iter`].
#[derive(Debug, Clone)]
pub struct Runs<'a>
{
    data: &'a [u8],
    base: usize,
    pos: usize,
    dialect: Dialect,
    min_units: usize,
}

impl<'a> Iterator for Runs<'a>
{
    type Item = RawByteRun<'a>;

    fn next(&mut self) -> Option<Self::Item>
    {
        let data = self.data;
        let d = self.dialect;

        let mut state = State::Idle;
        let mut start = self.pos;
        let mut units = 0usize;
        let mut doubles = 0usize;

        while self.pos < data.len()
        {
            let i = self.pos;
            let b = data[i];

            // Double-byte unit: strong evidence, may start or extend a run
            if i + 1 < data.len() && d.is_valid_lead_byte(b) && d.is_valid_trail_byte(data[i + 1])
            {
                if state == State::Idle
                {
                    start = i;
                    state = State::InWord;
                }
                units += 1;
                doubles += 1;
                self.pos += 2;
                continue;
            }

            // Single-byte unit: only extends an open run
            if state == State::InWord && d.is_valid_single_byte(b)
            {
                units += 1;
                self.pos += 1;
                continue;
            }

            if state == State::InWord
            {
                // Leave pos on the breaking byte so it is re-tested
                if let Some(run) = self.finish(start, units, doubles)
                {
                    return Some(run);
                }
                state = State::Idle;
                units = 0;
                doubles = 0;
                continue;
            }

            self.pos += 1;
        }

        // End of buffer closes any open run; a dangling lead byte was never
        // consumed and is silently dropped.
        if state == State::InWord
        {
            return self.finish(start, units, doubles);
        }

        None
    }
}

impl<'a> Runs<'a>
{
    fn finish(
        &self,
        start: usize,
        units: usize,
        doubles: usize,
    ) -> Option<RawByteRun<'a>>
    {
        if units >= self.min_units && doubles >= 1
        {
            Some(RawByteRun {
                offset: self.base + start,
                bytes: &self.data[start..self.pos],
                units,
                double_units: doubles,
            })
        }
        else
        {
            trace!(offset = self.base + start, units, "discarding short run");
            None
        }
    }
}
