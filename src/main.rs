use anyhow::Context;
use clap::Parser;
use std::io;
use std::process::ExitCode;

use datax_runner::batch;
use datax_runner::cli::Cli;
use datax_runner::filter::Filter;
use datax_runner::runner::SystemLauncher;
use datax_runner::Error;

/// Exit status after Ctrl-C, as a shell reports SIGINT.
const INTERRUPTED_STATUS: u8 = 130;

fn main() -> anyhow::Result<ExitCode> {
    // Logs go to stderr; the test suites own stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let filter = Filter::new(&cli.filter_spec()).context("Invalid test case filter")?;

    if cli.list {
        let stdout = io::stdout();
        batch::list_batch(&cli.executables, &filter, &mut stdout.lock())?;
        return Ok(ExitCode::SUCCESS);
    }

    let config = cli.run_config();
    let mut launcher = SystemLauncher::with_interrupt_handler()?;
    match batch::run_batch(&cli.executables, &filter, &config, &mut launcher) {
        Ok(status) => Ok(ExitCode::from(status.clamp(0, 255) as u8)),
        Err(Error::Interrupted) => {
            tracing::warn!("interrupted, remaining test suites skipped");
            Ok(ExitCode::from(INTERRUPTED_STATUS))
        }
        Err(e) => Err(e.into()),
    }
}
