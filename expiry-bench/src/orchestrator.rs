//! Orchestrator: runs the translated plan step by step and gathers the
//! results into a `RunReport`.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Serialize, Serializer};

use crate::backend::Backend;
use crate::error::BenchError;
use crate::parse::{parse_output, MEMORY_METRIC};
use crate::runner::StepRunner;
use crate::scenario::ScenarioConfig;
use crate::translate::{CommandTranslator, Environment, Step, StepKind};

/// What to do when a step fails or its output cannot be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Record the error and carry on with the next step.
    #[default]
    Continue,
    /// Stop at the first error.
    Abort,
}

/// Shared flag checked between steps. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Cancel on Ctrl-C. The step already running is allowed to finish.
    pub fn cancel_on_ctrlc(&self) -> Result<(), ctrlc::Error> {
        let token = self.clone();
        ctrlc::set_handler(move || {
            if !token.is_cancelled() {
                log::info!("Got interrupt, stopping after the current step...");
            } else {
                log::info!("Alright, alright, already stopping!");
            }
            token.cancel();
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub step_timeout: Option<Duration>,
    pub policy: FailurePolicy,
    /// Append a delete pass after the measured plan.
    pub cleanup: bool,
}

/// Outcome of one step.
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub step_name: &'static str,
    pub description: String,
    pub succeeded: bool,
    pub memory_usage_bytes: Option<u64>,
    pub memory_human: Option<String>,
    pub throughput_metrics: BTreeMap<String, i64>,
    pub elapsed_ms: u64,
}

impl StepResult {
    fn empty(step: &Step, elapsed: Duration) -> Self {
        Self {
            step_name: step.kind.name(),
            description: step.description.clone(),
            succeeded: false,
            memory_usage_bytes: None,
            memory_human: None,
            throughput_metrics: BTreeMap::new(),
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StepError {
    pub step: &'static str,
    #[serde(serialize_with = "serialize_display")]
    pub error: BenchError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Outcome {
    Completed,
    Aborted { reason: String },
}

/// Everything one orchestration pass produced.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub scenario: ScenarioConfig,
    pub steps: Vec<StepResult>,
    pub errors: Vec<StepError>,
    pub outcome: Outcome,
}

impl RunReport {
    /// Completed with no collected errors.
    pub fn is_clean(&self) -> bool {
        self.outcome == Outcome::Completed && self.errors.is_empty()
    }

    /// Memory growth caused by attaching expiry: second snapshot minus first.
    pub fn expiry_memory_overhead(&self) -> Option<i64> {
        let mut snapshots = self
            .steps
            .iter()
            .filter(|s| s.step_name == StepKind::MemorySnapshot.name())
            .filter_map(|s| s.memory_usage_bytes);
        let before = snapshots.next()?;
        let after = snapshots.next()?;
        Some(after as i64 - before as i64)
    }
}

pub struct Orchestrator<'a> {
    runner: &'a dyn StepRunner,
    options: RunOptions,
    cancel: CancellationToken,
}

impl<'a> Orchestrator<'a> {
    pub fn new(runner: &'a dyn StepRunner, options: RunOptions, cancel: CancellationToken) -> Self {
        Self {
            runner,
            options,
            cancel,
        }
    }

    /// Run the whole plan for `scenario` against `backend`.
    ///
    /// Never fails: in-run errors end up in the report, next to whatever
    /// results were gathered before them.
    pub fn run(&self, scenario: &ScenarioConfig, backend: &dyn Backend, env: &Environment) -> RunReport {
        let translator = CommandTranslator::new(scenario, backend, env);
        let mut steps = translator.plan();
        if self.options.cleanup {
            steps.push(translator.cleanup_step());
        }

        let mut report = RunReport {
            scenario: scenario.clone(),
            steps: Vec::with_capacity(steps.len()),
            errors: Vec::new(),
            outcome: Outcome::Completed,
        };

        log::info!(
            "Benchmarking {} with {} items ({} step(s))",
            backend.name(),
            scenario.item_count,
            steps.len()
        );

        let total = steps.len();
        for (idx, step) in steps.iter().enumerate() {
            if self.cancel.is_cancelled() {
                let err = BenchError::Cancelled {
                    step: step.kind.name().to_string(),
                };
                report.outcome = Outcome::Aborted {
                    reason: err.to_string(),
                };
                report.errors.push(StepError {
                    step: step.kind.name(),
                    error: err,
                });
                break;
            }

            log::info!("[{}/{}] {}", idx + 1, total, step.description);
            let errors = self.run_step(step, &mut report);
            if errors.is_empty() {
                continue;
            }

            let terminal = errors.iter().any(BenchError::is_terminal);
            let reason = errors[0].to_string();
            for err in errors {
                log::warn!("Step {} failed: {err}", step.kind);
                report.errors.push(StepError {
                    step: step.kind.name(),
                    error: err,
                });
            }
            if terminal || self.options.policy == FailurePolicy::Abort {
                report.outcome = Outcome::Aborted { reason };
                break;
            }
        }

        if let Outcome::Aborted { reason } = &report.outcome {
            log::warn!("Run aborted: {reason}");
        }
        report
    }

    /// Runs one step and appends its result. Returns the errors it ran into.
    fn run_step(&self, step: &Step, report: &mut RunReport) -> Vec<BenchError> {
        let started = Instant::now();
        let output = self.runner.run(step, self.options.step_timeout);
        let elapsed = started.elapsed();

        let output = match output {
            Ok(output) => output,
            Err(err) => {
                report.steps.push(StepResult::empty(step, elapsed));
                return vec![err];
            }
        };

        let parsed = parse_output(&output);
        let mut result = StepResult::empty(step, elapsed);
        result.succeeded = true;
        if let Some(memory) = parsed.memory {
            log::info!("{} : {}", MEMORY_METRIC, memory.human);
            result.memory_usage_bytes = memory.bytes;
            result.memory_human = Some(memory.human);
        }
        for (label, value) in &parsed.metrics {
            log::info!("{label} : {value}");
        }
        result.throughput_metrics = parsed.metrics;
        log::debug!("{} finished in {:.2?}", step.kind, elapsed);
        report.steps.push(result);

        parsed.errors
    }
}

fn serialize_display<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}
