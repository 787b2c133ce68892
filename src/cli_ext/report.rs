//! Terminal output for the pipeline commands: stage tables, exclusion
//! profiles, progress bars and status lines.

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tabled::{Table, Tabled};

use crate::cli::AppContext;
use crate::core::exclusion::ExclusionRecord;
use crate::core::heuristics::TextProfile;
use crate::core::pipeline::StageReport;

#[derive(Tabled)]
struct TallyRow {
    #[tabled(rename = "Stage")]
    stage: String,
    #[tabled(rename = "Outcome")]
    outcome: String,
    #[tabled(rename = "Count")]
    count: usize,
}

/// One row per (stage, outcome) pair, in stage order.
pub fn tally_table(stages: &[StageReport]) -> String {
    let rows: Vec<TallyRow> = stages
        .iter()
        .flat_map(|s| {
            s.tally.iter().map(move |(kind, count)| TallyRow {
                stage: s.stage.to_string(),
                outcome: kind.to_string(),
                count,
            })
        })
        .collect();

    Table::new(rows).to_string()
}

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "Text")]
    text: String,
    #[tabled(rename = "Reason")]
    reason: String,
    #[tabled(rename = "Chars")]
    chars: usize,
    #[tabled(rename = "Japanese %")]
    japanese: String,
    #[tabled(rename = "Hira")]
    hiragana: usize,
    #[tabled(rename = "Kata")]
    katakana: usize,
    #[tabled(rename = "Kanji")]
    kanji: usize,
    #[tabled(rename = "Full-width")]
    full_width: usize,
    #[tabled(rename = "ASCII")]
    ascii: usize,
}

/// Character-class breakdown of each excluded string.
pub fn profile_table<'a>(records: impl IntoIterator<Item = &'a ExclusionRecord>) -> String {
    let rows: Vec<ProfileRow> = records
        .into_iter()
        .map(|r| {
            let p = TextProfile::of(&r.text);
            let japanese = if p.total == 0 {
                0.0
            } else {
                p.japanese() as f64 / p.total as f64 * 100.0
            };
            ProfileRow {
                text: r.text.clone(),
                reason: r.reason.to_string(),
                chars: p.total,
                japanese: format!("{japanese:.0}"),
                hiragana: p.hiragana,
                katakana: p.katakana,
                kanji: p.kanji,
                full_width: p.full_width,
                ascii: p.ascii,
            }
        })
        .collect();

    Table::new(rows).to_string()
}

/// Stage progress bar, hidden in quiet mode.
pub fn stage_progress(ctx: &AppContext, stages: u64) -> ProgressBar {
    if ctx.quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(stages);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style.progress_chars("#>-"));
    pb
}

pub fn success(ctx: &AppContext, message: &str) {
    if ctx.quiet {
        return;
    }
    if ctx.no_color {
        println!("✓ {message}");
    } else {
        println!("{} {}", "✓".green(), message);
    }
}

pub fn dry_run(ctx: &AppContext, message: &str) {
    if ctx.quiet {
        return;
    }
    if ctx.no_color {
        println!("DRY RUN: {message}");
    } else {
        println!("{} {}", "DRY RUN:".yellow(), message.yellow());
    }
}

pub fn heading(ctx: &AppContext, title: &str) {
    if ctx.no_color {
        println!("\n{title}");
    } else {
        println!("\n{}", title.bold());
    }
}
