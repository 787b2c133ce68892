use anyhow::Result;
use clap::Parser;
use sjismine::cli::{AppContext, Cli, Commands};
use sjismine::cli_ext::{export_cmd, pipeline_cmd, translate_cmd};
use tracing_subscriber::EnvFilter;

fn init_tracing(ctx: &AppContext) {
    let default = if ctx.quiet {
        "sjismine=warn"
    } else if ctx.verbose {
        "sjismine=debug"
    } else {
        "sjismine=info"
    };

    // RUST_LOG wins when set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!ctx.no_color)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Build a context once, pass everywhere
    let ctx = cli.context();
    init_tracing(&ctx);

    match cli.command {
        Commands::Extract(args) => pipeline_cmd::extract(args, &ctx),
        Commands::Cull(args) => pipeline_cmd::cull(args, &ctx),
        Commands::Run(args) => pipeline_cmd::run(args, &ctx),
        Commands::Translate(args) => translate_cmd::run(args, &ctx),
        Commands::Export(args) => export_cmd::run(args, &ctx),
        Commands::Init(args) => sjismine::infra::config::init(args, &ctx),
        Commands::Completions(args) => sjismine::completion::run(args, &ctx),
    }
}
