//! hypogen-rs binary entry point.

use clap::Parser;
use hypogen_rs::cli::{Cli, execute};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let output = execute(&cli)?;

    #[allow(clippy::print_stdout)]
    {
        print!("{output}");
    }
    Ok(())
}

/// Logs go to stderr so stdout carries only command output.
///
/// `HYPOGEN_LOG` takes precedence over `RUST_LOG`; `--verbose` forces debug.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("hypogen_rs=debug")
    } else {
        EnvFilter::try_from_env("HYPOGEN_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| "hypogen_rs=warn".into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}
