//! `sjm completions <shell>`: print a completion script, or write it into
//! `--out-dir` for the shell to pick up (e.g. `~/.local/share/bash-completion/completions`).

use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_complete::{Shell as CompletionShell, generate, generate_to};
use std::{fs, io};

use crate::cli::{AppContext, Cli, CompletionsArgs, Shell};
use crate::cli_ext::report;

const BIN_NAME: &str = "sjm";

impl From<Shell> for CompletionShell {
    fn from(shell: Shell) -> Self {
        match shell {
            Shell::Bash => CompletionShell::Bash,
            Shell::Zsh => CompletionShell::Zsh,
            Shell::Fish => CompletionShell::Fish,
            Shell::PowerShell => CompletionShell::PowerShell,
            Shell::Elvish => CompletionShell::Elvish,
        }
    }
}

/// Completion script for `shell` written into `out`.
pub fn render(shell: Shell, out: &mut dyn io::Write) {
    generate(CompletionShell::from(shell), &mut Cli::command(), BIN_NAME, out);
}

pub fn run(args: CompletionsArgs, ctx: &AppContext) -> Result<()> {
    if args.stdout {
        render(args.shell, &mut io::stdout());
        return Ok(());
    }

    let dir = args
        .out_dir
        .ok_or_else(|| anyhow::anyhow!("--out-dir is required unless --stdout is set"))?;
    let shell = CompletionShell::from(args.shell);

    if ctx.dry_run {
        report::dry_run(ctx, &format!("Would write {shell} completion to {}", dir.display()));
        return Ok(());
    }

    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create completion dir {}", dir.display()))?;
    let path = generate_to(shell, &mut Cli::command(), BIN_NAME, &dir)
        .context("Failed to write completion script")?;

    report::success(ctx, &format!("Wrote {shell} completion to {}", path.display()));
    Ok(())
}
