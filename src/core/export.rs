//! Dictionary export: one `;original;translation` line per entry, closed by
//! a lone `;`, encoded in the target dialect.

use std::io::Write;

use serde::Serialize;
use tracing::{debug, warn};

use crate::core::codec::Dialect;
use crate::infra::store::StoreRecord;

/// Counts from one export.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    pub written: usize,
    /// Entries dropped because they could not be encoded or carried a
    /// field delimiter
    pub skipped: usize,
}

/// True when `field` would add a delimiter or a line to the dictionary.
fn breaks_line(field: &str) -> bool {
    field.contains([';', '\n', '\r'])
}

/// Entries ready for export, in text order.
pub fn dictionary_entries(records: &[StoreRecord]) -> Vec<(&str, &str)> {
    let mut entries: Vec<(&str, &str)> = records
        .iter()
        .filter(|r| r.is_exportable())
        .map(|r| (r.text.as_str(), r.best_translation.as_str()))
        .collect();
    entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
    entries
}

/// Write `entries` to `out`. Each line is encoded on its own so one
/// unencodable entry does not spoil the file. Fields holding `;` or a line
/// break are skipped.
pub fn write_dictionary<'a, W, I>(
    out: &mut W,
    entries: I,
    dialect: Dialect,
) -> std::io::Result<ExportSummary>
where
    W: Write,
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut summary = ExportSummary::default();

    for (original, translation) in entries {
        if breaks_line(original) || breaks_line(translation) {
            warn!(original, translation, "skipping dictionary entry with a delimiter in a field");
            summary.skipped += 1;
            continue;
        }

        let line = format!(";{original};{translation}\n");
        match dialect.encode(&line) {
            Ok(bytes) => {
                out.write_all(&bytes)?;
                summary.written += 1;
            }
            Err(e) => {
                warn!(error = %e, original, "skipping dictionary entry");
                summary.skipped += 1;
            }
        }
    }

    // Terminator, no trailing newline
    out.write_all(b";")?;
    out.flush()?;

    debug!(written = summary.written, skipped = summary.skipped, "dictionary written");
    Ok(summary)
}
