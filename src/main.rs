#![forbid(unsafe_code)]

//! sgauge: Storage Gauge CLI entry point.

use clap::Parser;

mod cli_app;

fn main() {
    let args = cli_app::Cli::parse();
    if let Err(error) = cli_app::run(&args) {
        eprintln!("sgauge: {error}");
        std::process::exit(error.exit_code());
    }
}
