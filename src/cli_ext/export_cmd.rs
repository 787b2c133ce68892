use std::fs::File;
use std::io::BufWriter;

use anyhow::{Context, Result};

use crate::cli::{AppContext, ExportArgs, store_path};
use crate::cli_ext::report;
use crate::core::export::{dictionary_entries, write_dictionary};
use crate::core::translate::is_sentinel;
use crate::infra::config::load_config;
use crate::infra::store::{CandidateStore, JsonStore};

/// Write the `;original;translation` dictionary for every translated,
/// non-excluded candidate.
pub fn run(args: ExportArgs, ctx: &AppContext) -> Result<()> {
    let config = load_config(ctx.config.as_deref())?;
    let path = store_path(ctx, &config);
    if !path.exists() {
        anyhow::bail!("No candidate store at {}", path.display());
    }
    let store =
        JsonStore::open(&path).with_context(|| format!("Failed to open store {}", path.display()))?;

    let records = store.records();
    let sentinels = config.export.sentinels.as_slice();
    let entries: Vec<(&str, &str)> = dictionary_entries(&records)
        .into_iter()
        .filter(|(_, t)| !is_sentinel(t, sentinels))
        .collect();

    let dialect = args.dialect.unwrap_or(config.scan.dialect);
    let output = args.output.unwrap_or(config.export.output_file);

    if ctx.dry_run {
        report::dry_run(
            ctx,
            &format!("Would write {} entries to {} ({dialect})", entries.len(), output.display()),
        );
        return Ok(());
    }

    let file =
        File::create(&output).with_context(|| format!("Failed to create {}", output.display()))?;
    let mut writer = BufWriter::new(file);
    let summary = write_dictionary(&mut writer, entries, dialect)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    report::success(
        ctx,
        &format!(
            "Exported {} entries to {} ({} skipped as unencodable)",
            summary.written,
            output.display(),
            summary.skipped
        ),
    );
    Ok(())
}
