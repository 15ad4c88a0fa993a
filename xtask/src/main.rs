// Desktop/tooling crate — unwrap/expect/panic acceptable in non-embedded code.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod check;
mod doc;
mod inspect;
mod trace;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use inspect::Variant;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Rigel configuration-block driver development tasks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the drivers for the Cortex-M target and the host
    Check,
    /// Run all tests (unit, integration, doc)
    Test {
        /// Run only unit tests
        #[arg(long)]
        unit: bool,
        /// Run only integration tests
        #[arg(long)]
        integration: bool,
    },
    /// Build and optionally open documentation
    Doc {
        /// Open documentation in browser
        #[arg(long)]
        open: bool,
    },
    /// Decode a bitstream header file
    Inspect {
        /// Controller the header belongs to
        #[arg(long, value_enum)]
        variant: Variant,
        /// Header (metadata) file
        file: PathBuf,
    },
    /// Run a full session against the register simulator and print the bus trace
    Trace {
        /// Controller to simulate
        #[arg(long, value_enum)]
        variant: Variant,
        /// Header (metadata) file
        header: PathBuf,
        /// Payload file (zero-filled payload when omitted)
        #[arg(long)]
        image: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check => check::run(),
        Commands::Test { unit, integration } => test::run(unit, integration),
        Commands::Doc { open } => doc::run(open),
        Commands::Inspect { variant, file } => inspect::run(variant, &file),
        Commands::Trace {
            variant,
            header,
            image,
        } => trace::run(variant, &header, image.as_deref()),
    }
}
