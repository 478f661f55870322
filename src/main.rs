use std::{path::Path, process::ExitCode};

use clap::{CommandFactory, Parser};
use miette::{IntoDiagnostic, NamedSource, Report};
use tracing_subscriber::EnvFilter;

mod cli;
mod repl;

fn main() -> miette::Result<ExitCode> {
    // Install the panic handler.
    bupropion::install(bupropion::BupropionHandlerOpts::new).into_diagnostic()?;

    // Parse the command line arguments.
    let args = cli::Args::parse();

    init_tracing(args.debug)?;

    if args.repl {
        repl::run()?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(path) = args.file else {
        cli::Args::command().print_help().into_diagnostic()?;
        return Ok(ExitCode::FAILURE);
    };

    if !path.is_file() {
        eprintln!("no such file: {}", path.display());
        return Ok(ExitCode::FAILURE);
    }

    let source = std::fs::read_to_string(&path).into_diagnostic()?;

    let listing = match gccl::compile(&source) {
        Ok(listing) => listing,
        Err(error) => return Err(with_source(error, &path, source)),
    };

    tracing::debug!(instructions = listing.instruction_count(), "compiled");

    match args.output {
        Some(output) => std::fs::write(output, listing.to_string()).into_diagnostic()?,
        None => print!("{listing}"),
    }

    Ok(ExitCode::SUCCESS)
}

fn init_tracing(debug: bool) -> miette::Result<()> {
    let mut filter = EnvFilter::from_default_env();

    if debug {
        filter = filter.add_directive("gccl=debug".parse().into_diagnostic()?);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn with_source(error: gccl::Error, path: &Path, source: String) -> Report {
    Report::new(error).with_source_code(NamedSource::new(path.display().to_string(), source))
}
