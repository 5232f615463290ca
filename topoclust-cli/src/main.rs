//! `topoclust` binary: node selection over a JSON host topology.
//!
//! Parses arguments, runs the command, prints the summary on stdout and maps
//! failures to a non-zero exit status after logging their stable code.

use std::{
    io::{self, BufWriter, Write},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::Parser;
use topoclust_cli::{
    cli::{Cli, CliError, render_summary, run_cli},
    logging::{self, LoggingError},
};
use tracing::{error, field};

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    let summary = run_cli(cli).context("failed to execute command")?;
    let mut writer = BufWriter::new(io::stdout().lock());
    render_summary(&summary, &mut writer).context("failed to render summary")?;
    writer.flush().context("failed to flush output")?;
    Ok(())
}

fn error_code(err: &anyhow::Error) -> Option<&'static str> {
    match err.downcast_ref::<CliError>()? {
        CliError::Core(core) => Some(core.code().as_str()),
        CliError::Descriptor(descriptor) => Some(descriptor.code().as_str()),
        _ => None,
    }
}

fn main() -> ExitCode {
    if let Err(err) = logging::init_logging() {
        report_logging_init_error(&err);
        return ExitCode::FAILURE;
    }

    if let Err(err) = try_main() {
        error!(
            error = %format!("{err:#}"),
            code = error_code(&err).map(field::display),
            "command execution failed"
        );
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

#[expect(
    clippy::print_stderr,
    reason = "Emit one-off diagnostic before tracing is initialized"
)]
fn report_logging_init_error(err: &LoggingError) {
    eprintln!("failed to initialize logging: {err}");
}
