//! Command-line front end for the scrub-and-defrag copy.
//!
//! Usage:
//!   scrub_defrag [--verify] [--json] [--no-checkpoint] [-v...] <SOURCE> <DEST>

use btree_scrub::{scrub_and_defrag, ScrubConfig, ScrubError};
use clap::Parser;
use std::path::PathBuf;
use std::process::exit;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "scrub_defrag",
    version,
    about = "Copy a database, zeroing deleted content and dropping free pages"
)]
struct Args {
    /// Database to copy
    source: PathBuf,

    /// File to create; must not already hold a database
    dest: PathBuf,

    /// Run PRAGMA quick_check on the copy
    #[arg(long)]
    verify: bool,

    /// Print the copy report as JSON
    #[arg(long)]
    json: bool,

    /// Do not checkpoint the source write-ahead log first
    #[arg(long)]
    no_checkpoint: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // Only fails if a subscriber is already installed
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = ScrubConfig::new(&args.source, &args.dest)
        .verify(args.verify)
        .checkpoint(!args.no_checkpoint);

    let report = match scrub_and_defrag(&config) {
        Ok(report) => report,
        Err(ScrubError::OutOfMemory) => {
            eprintln!("scrub_defrag: out of memory");
            exit(1);
        }
        Err(e) => {
            eprintln!("scrub_defrag: {}", e);
            exit(1);
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("scrub_defrag: cannot encode report: {}", e);
                exit(1);
            }
        }
    }
}
