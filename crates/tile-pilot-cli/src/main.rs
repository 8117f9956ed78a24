//! tile-pilot - AI-assisted autoplayer for tile-matching games
//!
//! Usage:
//!   tile-pilot capture [--duration <secs>]   Capture + retention loop only
//!   tile-pilot play [--api-key <key>]        Full capture/analyze/act loop
//!   tile-pilot analyze <image>               One-shot analysis of a PNG
//!   tile-pilot sweep                         Single retention sweep
//!   tile-pilot latest                        Print the newest capture path
//!   tile-pilot --help                        Show help

use std::fs::File;

use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::FmtSubscriber;

mod cli;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        cli::print_help();
        return Ok(());
    }

    init_logging();

    match cli::parse_args(&args) {
        Ok((command, options)) => cli::run(command, options),
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            cli::print_help();
            std::process::exit(1);
        }
    }
}

fn init_logging() {
    // Full log to a file, warnings and up mirrored to stderr so stdout
    // stays clean for command output.
    if let Ok(log_file) = File::create("tile-pilot.log") {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::INFO)
            .with_target(false)
            .with_ansi(false)
            .with_writer(log_file.and(std::io::stderr.with_max_level(Level::WARN)))
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::WARN)
            .with_target(false)
            .with_writer(std::io::stderr)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}
