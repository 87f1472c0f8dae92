//! mapsnipe - Map-feed sniping worker runner
//!
//! Usage:
//!   mapsnipe <command> [options]   Run a headless command
//!   mapsnipe --help                Show help

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

mod cli;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        cli::print_help();
        return Ok(());
    }

    match cli::parse_args(&args) {
        Ok((command, options)) => {
            init_logging(options.log_file.as_deref())?;
            cli::run(command, options)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            cli::print_help();
            std::process::exit(1);
        }
    }
}

/// Log to stderr, or to `log_file` when given. `RUST_LOG` overrides the `info` default.
fn init_logging(log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match log_file {
        Some(path) => {
            let file = File::create(path)?;
            let _ = builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
    Ok(())
}
