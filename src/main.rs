use anyhow::Result;
use clap::Parser;
use tracing::debug;

use takebin::cli_style::get_styles;
use takebin::config::ProjectArgs;
use takebin::console::{self, ConsoleCommand};

/// Runs one catalog command against a project and exits.
#[derive(Parser, Debug)]
#[command(styles = get_styles(), version = env!("GIT_HASH"))]
struct CliArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    #[command(subcommand)]
    pub command: ConsoleCommand,
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    let config = cli_args.project.resolve()?;
    console::init_tracing(config.log_level)?;
    debug!("Resolved config: {:?}", config);

    let controller = console::open_controller(&config)?;
    if let Err(err) = console::run(cli_args.command, &controller) {
        console::report_error(&err);
        std::process::exit(1);
    }
    Ok(())
}
