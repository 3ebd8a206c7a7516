//! callstate CLI main entry point

use callstate_cli::{
    cli::{Cli, Commands},
    commands::{BatchCommand, CommandContext, PaginateCommand, RunCommand},
    error::CliResult,
    utils::{init_tracing, ColoredOutput},
};
use clap::Parser;
use tracing::debug;

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{} {}", ColoredOutput::error("Error:"), e);
            1
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose)?;

    if cli.no_color {
        colored::control::set_override(false);
    }

    debug!("callstate CLI v{}", env!("CARGO_PKG_VERSION"));

    let ctx = CommandContext::load(cli.config.as_deref(), cli.format)?;

    match &cli.command {
        Commands::Run { args } => RunCommand::run(&ctx, args).await,
        Commands::Batch { args } => BatchCommand::run(&ctx, args).await,
        Commands::Paginate {
            args,
            page_size,
            pages,
        } => PaginateCommand::run(&ctx, args, *page_size, *pages).await,
    }
}
