//! Report module: renders a `RunReport` for operators (text) or for
//! downstream comparison (JSON, TSV).

use std::io::{self, Write};

use crate::orchestrator::{Outcome, RunReport};
use crate::parse::MEMORY_METRIC;
use crate::scenario::{ExpiryMode, Topology};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// `name : value` lines per step.
    #[default]
    Text,
    /// The whole report as one JSON document.
    Json,
    /// One row per (step, metric), tab separated, with a header.
    Tsv,
}

pub fn write_report<W: Write>(out: &mut W, report: &RunReport, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Text => write_text(out, report),
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, report)?;
            writeln!(out)
        }
        OutputFormat::Tsv => write_tsv(out, report),
    }
}

fn write_text<W: Write>(out: &mut W, report: &RunReport) -> io::Result<()> {
    let scenario = &report.scenario;
    let topology = match scenario.topology {
        Topology::SingleContainerManyFields => "single hash",
        Topology::ManyContainersSingleField => "one field per hash",
    };
    let expiry = match scenario.expiry {
        ExpiryMode::Relative { seconds } => format!("{seconds}s relative"),
        ExpiryMode::Absolute { unix_seconds } => format!("at {unix_seconds}"),
    };
    writeln!(
        out,
        ">>> {} | {} items | {} | expiry {} | {} client(s) x {} thread(s)",
        scenario.backend, scenario.item_count, topology, expiry, scenario.clients, scenario.threads
    )?;

    for step in &report.steps {
        let status = if step.succeeded { "" } else { " FAILED" };
        writeln!(
            out,
            "[{}] {} ({} ms){status}",
            step.step_name, step.description, step.elapsed_ms
        )?;
        if let Some(human) = &step.memory_human {
            writeln!(out, "{MEMORY_METRIC} : {human}")?;
        }
        for (label, value) in &step.throughput_metrics {
            writeln!(out, "{label} : {value}")?;
        }
    }

    if let Some(overhead) = report.expiry_memory_overhead() {
        writeln!(out, "Expiry memory overhead: {overhead:+} bytes")?;
    }

    if !report.errors.is_empty() {
        writeln!(out, "Errors:")?;
        for e in &report.errors {
            writeln!(out, "  {}: {}", e.step, e.error)?;
        }
    }

    match &report.outcome {
        Outcome::Completed => writeln!(out, "Outcome: completed"),
        Outcome::Aborted { reason } => writeln!(out, "Outcome: aborted ({reason})"),
    }
}

fn write_tsv<W: Write>(out: &mut W, report: &RunReport) -> io::Result<()> {
    let backend = report.scenario.backend;
    writeln!(out, "backend\titems\tstep\tmetric\tvalue")?;
    for step in &report.steps {
        let prefix = format!("{backend}\t{}\t{}", report.scenario.item_count, step.step_name);
        if let Some(bytes) = step.memory_usage_bytes {
            writeln!(out, "{prefix}\t{MEMORY_METRIC}\t{bytes}")?;
        }
        for (label, value) in &step.throughput_metrics {
            writeln!(out, "{prefix}\t{label}\t{value}")?;
        }
    }
    Ok(())
}
