//! Benchmark runner binary.
//!
//! Usage:
//!   CLI=/path/to/redis-cli expiry-bench <ITEMS> <SINGLE_HASH> <BACKEND> <EXPIRE_SEC> <MULTI_CLIENTS> <ALL_SPECIFIC_TIME>
//!
//! Exit codes: 0 on a clean run, 1 on bad arguments or configuration, 2 when
//! the run was aborted or collected errors.

use std::io;
use std::process;

use anyhow::Context;
use clap::Parser;

use expiry_bench::cli::Args;
use expiry_bench::orchestrator::{CancellationToken, Orchestrator};
use expiry_bench::report::write_report;
use expiry_bench::runner::ShellRunner;

fn main() {
    match run() {
        Ok(code) => process::exit(code),
        Err(err) => {
            log::error!("{err:#}");
            eprintln!("Error: {err:#}");
            process::exit(1);
        }
    }
}

fn run() -> anyhow::Result<i32> {
    // Before parsing, so `.env` can feed the env-backed options.
    let dotenv = hfe_core::env::load_dotenv();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            return Ok(code);
        }
    };

    let level = hfe_core::parse_level(&args.log_level)?;
    hfe_core::initialize_logger(level, args.log_file.as_deref())
        .context("failed to initialize logger")?;
    if let Some(path) = dotenv {
        log::debug!("Loaded environment from {}", path.display());
    }

    let scenario = args.raw_scenario().validate()?;
    let env = args.resolve_environment()?;

    let cancel = CancellationToken::new();
    if let Err(err) = cancel.cancel_on_ctrlc() {
        log::warn!("Ctrl-C handler not installed: {err}");
    }

    let runner = ShellRunner::new();
    let orchestrator = Orchestrator::new(&runner, args.run_options(), cancel);
    let report = orchestrator.run(&scenario, scenario.backend.adapter(), &env);

    let stdout = io::stdout();
    write_report(&mut stdout.lock(), &report, args.format).context("failed to write report")?;

    Ok(if report.is_clean() { 0 } else { 2 })
}
