use std::process::ExitCode;
use std::sync::Arc;

use log::*;
use portal_auth::notify::Notifier;
use service::logging::Logger;

mod cli;
mod output;
mod views;

use cli::Cli;
use output::ConsoleNotifier;
use views::{App, Reported};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::load();
    if let Err(err) = Logger::init_logger(&cli.config) {
        eprintln!("Failed to start logging: {err}");
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if err.downcast_ref::<Reported>().is_none() {
                ConsoleNotifier.error(&format!("{err:#}"));
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    debug!(
        "Using API at {} with session file {}",
        cli.config.base_url(),
        cli.config.session_file().display()
    );

    let app = App::start(&cli.config, Arc::new(ConsoleNotifier)).await?;
    app.run(cli.command).await
}
