//! wcl - parallel newline counter
//!
//! Main entry point for the command-line application.

use clap::Parser;
use std::io;
use std::process;

use wcl::cli::Args;
use wcl::engine::{Engine, EngineConfig};
use wcl::output::ReportWriter;
use wcl::progress::{print_error, print_info, print_warning};
use wcl::reader::ReadStrategy;
use wcl::target::TargetSet;

fn main() {
    // Parse command-line arguments
    let args = Args::parse();

    // Set up logging; RUST_LOG still wins when set
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_level()))
        .init();

    match run(args) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            print_error(&format!("{}", e));

            // Print chain of errors
            for cause in e.chain().skip(1) {
                print_error(&format!("  Caused by: {}", cause));
            }

            process::exit(1);
        }
    }
}

/// Returns whether every target was counted
fn run(args: Args) -> anyhow::Result<bool> {
    let config = EngineConfig::from_args(&args)?;
    let targets = TargetSet::from_args(&args.files, args.recursive);

    if targets.is_empty() && !args.quiet {
        print_warning("No files found to count");
    }

    if targets.is_stdin_only() && !args.quiet && !matches!(config.strategy, ReadStrategy::Streaming { .. }) {
        print_warning("Standard input is always streamed");
    }

    let engine = Engine::new(config)?;

    if args.verbose {
        print_config(&engine, &targets);
    }

    let report = engine.run(targets)?;

    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock());
    writer.write_report(&report)?;
    writer.flush()?;
    log::debug!("wrote {} output lines", writer.lines_written());

    for (_, error) in report.errors() {
        print_error(&error.to_string());
    }

    if args.stats {
        let engine_config = engine.config();
        engine.stats().print_summary(
            engine.worker_count(),
            engine.counter().backend().name(),
            engine_config.strategy.name(),
        );
    }

    Ok(report.is_success())
}

/// Print configuration summary
fn print_config(engine: &Engine, targets: &TargetSet) {
    let config = engine.config();

    print_info(&format!("Targets:  {}", targets.len()));
    print_info(&format!("Mode:     {:?}", config.mode));
    print_info(&format!("Strategy: {}", config.strategy.name()));
    print_info(&format!("Kernel:   {}", engine.counter().backend()));
    print_info(&format!("Workers:  {}", engine.worker_count()));
}
