//! **sjismine** - mine legacy binaries for embedded Shift-JIS text
//!
//! Scans raw bytes for plausible Shift-JIS runs, decodes and deduplicates
//! them, culls false positives with text heuristics, and keeps only strings
//! that re-encode to bytes actually present in the source.

/// Command-line interface with clap integration
pub mod cli;

/// Command handlers behind the CLI
pub mod cli_ext {
    /// `extract`, `cull` and `run`
    pub mod pipeline_cmd;

    /// `translate --table`
    pub mod translate_cmd;

    /// `export`
    pub mod export_cmd;

    /// Tables, progress bars and status lines
    pub mod report;
}

/// Shell completion generation
pub mod completion;

/// Extraction and culling pipeline
pub mod core {
    /// Dialect byte tables and strict decode/encode
    pub mod codec;
    pub use codec::{CodecError, Dialect};

    /// Byte-stream scanner (sequential and chunk-parallel)
    pub mod scan;
    pub use scan::{RawByteRun, Scanner};

    /// Decoding and content-keyed deduplication
    pub mod dedup;
    pub use dedup::{CandidateSet, IngestOutcome};

    /// Exclusion reasons and the per-pass ledger
    pub mod exclusion;
    pub use exclusion::{ExclusionLedger, ExclusionReason, ExclusionRecord};

    /// Per-kind counters for reporting
    pub mod tally;
    pub use tally::{Tally, TallyKind};

    /// Ordered exclusion predicates
    pub mod heuristics;
    pub use heuristics::{HeuristicsConfig, Predicate, PredicateChain};

    /// Source round-trip verification
    pub mod verify;

    /// Stage orchestration over an injected store
    pub mod pipeline;
    pub use pipeline::{Pipeline, PipelineError, PipelineReport};

    /// Translator seam and batch driver
    pub mod translate;
    pub use translate::{TableTranslator, Translator};

    /// Dictionary file writer
    pub mod export;
}

/// Infrastructure - configuration, I/O and the candidate store
pub mod infra {
    /// Layered configuration (file + SJISMINE_ env)
    pub mod config;
    pub use config::{Config, init as config_init, load_config};

    /// Memory-mapped binary input (>1MB threshold)
    pub mod io;
    pub use io::{BinaryContent, read_binary};

    /// Candidate persistence
    pub mod store;
    pub use store::{CandidateStore, JsonStore, MemoryStore, StoreRecord};
}

pub use cli::{AppContext, Cli, Commands};
pub use core::{Dialect, Pipeline, PipelineReport};
pub use infra::{Config, load_config};
