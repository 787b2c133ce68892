use anyhow::{Context, Result};

use crate::cli::{AppContext, TranslateArgs, store_path};
use crate::cli_ext::report;
use crate::core::translate::{TableTranslator, Translator, cull_sentinels, translate_batch};
use crate::infra::config::load_config;
use crate::infra::store::{CandidateStore, JsonStore};

/// Apply a reviewed translation table to every candidate this table has not
/// translated yet. Each table is its own service, named by its file stem.
pub fn run(args: TranslateArgs, ctx: &AppContext) -> Result<()> {
    let config = load_config(ctx.config.as_deref())?;
    let translator = TableTranslator::from_path(&args.table)
        .with_context(|| format!("Failed to load translation table {}", args.table.display()))?;

    let path = store_path(ctx, &config);
    let mut store = JsonStore::open(&path)
        .with_context(|| format!("Failed to open store {}", path.display()))?;

    let pending: Vec<String> = store
        .pending_for(translator.name())
        .into_iter()
        .map(|r| r.text)
        .collect();
    if pending.is_empty() {
        report::success(ctx, &format!("No candidates pending for {}", translator.name()));
        return Ok(());
    }

    let mut outcome = translate_batch(&translator, &pending);
    let culled = cull_sentinels(&mut outcome.translations, config.export.sentinels.as_slice());

    if ctx.dry_run {
        report::dry_run(
            ctx,
            &format!(
                "Would store {} of {} pending translations ({} sentinel replies dropped)",
                outcome.translations.len(),
                pending.len(),
                culled
            ),
        );
        return Ok(());
    }

    for (text, translation) in &outcome.translations {
        store.set_translation(text, translator.name(), translation)?;
    }
    store.flush()?;

    report::success(
        ctx,
        &format!(
            "Translated {} of {} pending ({} untranslated, {} sentinel, {} failed)",
            outcome.translations.len(),
            pending.len(),
            outcome.untranslated,
            culled,
            outcome.failed
        ),
    );
    Ok(())
}
