use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use dice_academy::config::load_config;
use dice_academy::lifecycle::signals::wait_for_termination;
use dice_academy::lifecycle::{BootError, Bootstrapper};
use dice_academy::observability::init_logging;

#[derive(Parser)]
#[command(name = "dice-academy", version)]
#[command(about = "Dice Academy backend service", long_about = None)]
struct Cli {
    /// TOML configuration file. Without it, defaults and DICE_* variables apply.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => return report(BootError::from(e)),
    };

    if cli.check {
        println!("configuration OK");
        return ExitCode::SUCCESS;
    }

    if let Err(e) = init_logging(&config.observability) {
        return report(BootError::from(e));
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        persistence = ?config.persistence.backend,
        auditing = config.audit.enabled,
        "Configuration loaded"
    );

    match Bootstrapper::new(config).run(wait_for_termination()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(e),
    }
}

fn report(error: BootError) -> ExitCode {
    eprintln!("dice-academy: {}", error);
    ExitCode::from(error.exit_code())
}
