//! `extract`, `cull` and `run` handlers.

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::{AppContext, CullArgs, ExtractArgs, HeuristicsArgs, RunArgs, ScanArgs, store_path};
use crate::cli_ext::report;
use crate::core::exclusion::ExclusionRecord;
use crate::core::pipeline::{Pipeline, PipelineReport};
use crate::infra::config::{Config, load_config};
use crate::infra::io::{read_binary, write_lines};
use crate::infra::store::{CandidateStore, JsonStore};

/// Load config, apply flag overrides and build the pipeline.
fn prepare(
    ctx: &AppContext,
    scan: &ScanArgs,
    heuristics: Option<&HeuristicsArgs>,
    stages: u64,
) -> Result<(Config, Pipeline)> {
    let mut config = load_config(ctx.config.as_deref())?;
    scan.apply(&mut config.scan);
    if let Some(h) = heuristics {
        h.apply(&mut config.heuristics);
    }

    let pipeline = Pipeline::new(&config.scan, &config.heuristics)
        .context("Invalid heuristics configuration")?
        .with_progress(report::stage_progress(ctx, stages));
    Ok((config, pipeline))
}

fn open_store(ctx: &AppContext, config: &Config) -> Result<JsonStore> {
    let path = store_path(ctx, config);
    JsonStore::open(&path).with_context(|| format!("Failed to open store {}", path.display()))
}

fn print_report(ctx: &AppContext, pass: &PipelineReport, explain: bool) {
    if ctx.quiet {
        return;
    }
    println!("{}", report::tally_table(&pass.stages));

    if explain && !pass.ledger.is_empty() {
        report::heading(ctx, "Excluded strings");
        let records: Vec<ExclusionRecord> = pass.exclusions().collect();
        println!("{}", report::profile_table(&records));
    }
}

pub fn extract(args: ExtractArgs, ctx: &AppContext) -> Result<()> {
    let (config, pipeline) = prepare(ctx, &args.scan, None, 2)?;
    let source = read_binary(&args.binary)?;

    let (candidates, stages) = pipeline.extract(source.as_ref());

    let mut store = open_store(ctx, &config)?;
    let before = store.records().len();
    if ctx.dry_run {
        let mut preview = store.inner().clone();
        for text in candidates.iter() {
            preview.upsert(text)?;
        }
        report::dry_run(
            ctx,
            &format!(
                "Would add {} new candidates to {}",
                preview.len() - before,
                store.path().display()
            ),
        );
        return Ok(());
    }

    for text in candidates.iter() {
        store.upsert(text)?;
    }
    store.flush()?;

    let added = store.records().len() - before;
    info!(added, unique = candidates.len(), "extract finished");
    if !ctx.quiet {
        println!("{}", report::tally_table(&stages));
    }
    report::success(
        ctx,
        &format!(
            "Stored {} new candidates ({} unique in {}) in {}",
            added,
            candidates.len(),
            args.binary.display(),
            store.path().display()
        ),
    );
    Ok(())
}

pub fn cull(args: CullArgs, ctx: &AppContext) -> Result<()> {
    // Culling never rescans, so only the dialect applies
    let scan = ScanArgs { dialect: args.dialect, ..Default::default() };
    let (config, pipeline) = prepare(ctx, &scan, Some(&args.heuristics), 2)?;
    let source = read_binary(&args.binary)?;
    let mut store = open_store(ctx, &config)?;

    if store.records().is_empty() {
        anyhow::bail!(
            "No candidates in {}. Run `sjm extract` first.",
            store.path().display()
        );
    }

    let pass = if ctx.dry_run {
        let mut preview = store.inner().clone();
        pipeline.cull_store(source.as_ref(), &mut preview)?
    } else {
        let pass = pipeline.cull_store(source.as_ref(), &mut store)?;
        store.flush()?;
        pass
    };

    print_report(ctx, &pass, args.explain);
    let kept = pass.translation_candidates().len();
    if ctx.dry_run {
        report::dry_run(ctx, &format!("Would keep {kept} of {}", pass.candidates.len()));
    } else {
        report::success(ctx, &format!("Kept {kept} of {} candidates", pass.candidates.len()));
    }
    Ok(())
}

pub fn run(args: RunArgs, ctx: &AppContext) -> Result<()> {
    let (config, pipeline) = prepare(ctx, &args.scan, Some(&args.heuristics), 4)?;
    let source = read_binary(&args.binary)?;
    let mut store = open_store(ctx, &config)?;

    let pass = if ctx.dry_run {
        let mut preview = store.inner().clone();
        pipeline.run(source.as_ref(), &mut preview)?
    } else {
        let pass = pipeline.run(source.as_ref(), &mut store)?;
        store.flush()?;
        pass
    };

    print_report(ctx, &pass, args.explain);

    let survivors = pass.translation_candidates();
    if let Some(path) = &args.candidates_out {
        if ctx.dry_run {
            report::dry_run(
                ctx,
                &format!("Would write {} candidates to {}", survivors.len(), path.display()),
            );
        } else {
            let n = write_lines(path, survivors.iter().copied())?;
            report::success(ctx, &format!("Wrote {n} candidates to {}", path.display()));
        }
    }

    if !ctx.dry_run {
        report::success(
            ctx,
            &format!(
                "{} translation candidates from {}",
                survivors.len(),
                args.binary.display()
            ),
        );
    }
    Ok(())
}
