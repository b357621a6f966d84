//! Command-line surface.

use std::time::Duration;

use clap::Parser;

use crate::error::{BenchError, Result};
use crate::orchestrator::{FailurePolicy, RunOptions};
use crate::report::OutputFormat;
use crate::scenario::RawScenario;
use crate::translate::{Environment, LoadGenerator, DEFAULT_HOST, DEFAULT_LOAD_GENERATOR, DEFAULT_PORT};

/// Environment variable holding the path to `redis-cli` / `keydb-cli`.
pub const CLI_PATH_VAR: &str = "CLI";

/// Benchmark per-field expiration on a key-value server.
///
/// Example: `expiry-bench 10000000 1 redis 10000 0 0` fills one hash with ten
/// million fields, expires them in 10000 seconds, and reads their TTLs back.
#[derive(Debug, Parser)]
#[command(version, after_help = "The CLI environment variable must point to redis-cli or keydb-cli.")]
pub struct Args {
    /// Number of keys/fields used in the benchmark.
    pub item_count: String,

    /// 1: a single hash with <ITEM_COUNT> fields, 0: <ITEM_COUNT> hashes with one field each.
    pub topology: String,

    /// Tested server: redis, keydb, tairhash or redis-expire.
    pub backend: String,

    /// Expiry time in seconds.
    pub expire_seconds: String,

    /// 1: five clients on two threads, 0: one client on one thread.
    pub concurrency: String,

    /// 1: every item expires at the same timestamp, 0: relative expiry.
    pub synchronized_expiry: String,

    /// Server host.
    #[arg(long, env = "HFE_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Server port.
    #[arg(long, env = "HFE_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Load generator executable.
    #[arg(long, default_value = DEFAULT_LOAD_GENERATOR)]
    pub load_generator: String,

    /// Abort the run when a single step takes longer than this.
    #[arg(long, value_name = "SECS")]
    pub step_timeout_secs: Option<u64>,

    /// What to do when a step fails.
    #[arg(long, value_enum, default_value_t = FailurePolicy::Continue)]
    pub on_failure: FailurePolicy,

    /// Result format on stdout.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Delete all fields after the measured steps.
    #[arg(long)]
    pub cleanup: bool,

    /// Log level for stderr (error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Also write logs to this file.
    #[arg(long)]
    pub log_file: Option<String>,
}

impl Args {
    pub fn raw_scenario(&self) -> RawScenario {
        RawScenario {
            item_count: self.item_count.clone(),
            topology: self.topology.clone(),
            backend: self.backend.clone(),
            expire_seconds: self.expire_seconds.clone(),
            concurrency: self.concurrency.clone(),
            synchronized_expiry: self.synchronized_expiry.clone(),
        }
    }

    pub fn environment(&self, cli_path: String) -> Environment {
        Environment {
            cli_path,
            host: self.host.clone(),
            port: self.port,
            load_generator: LoadGenerator {
                binary: self.load_generator.clone(),
                ..LoadGenerator::default()
            },
        }
    }

    /// Endpoint settings with the client path taken from `CLI`.
    ///
    /// Fails with `ConfigurationMissing` when the variable is unset or blank.
    pub fn resolve_environment(&self) -> Result<Environment> {
        self.environment_from_var(CLI_PATH_VAR)
    }

    fn environment_from_var(&self, name: &str) -> Result<Environment> {
        let cli_path = hfe_core::env::required_var(name)
            .map_err(|name| BenchError::ConfigurationMissing { name })?;
        Ok(self.environment(cli_path))
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            step_timeout: self.step_timeout_secs.map(Duration::from_secs),
            policy: self.on_failure,
            cleanup: self.cleanup,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_arguments_only() {
        let args = Args::try_parse_from(["expiry-bench", "1000", "1", "redis", "10000", "0", "0"]).unwrap();
        assert_eq!(args.item_count, "1000");
        assert_eq!(args.backend, "redis");
        assert_eq!(args.load_generator, "memtier_benchmark");
        assert_eq!(args.on_failure, FailurePolicy::Continue);
        assert_eq!(args.format, OutputFormat::Text);
        assert!(args.run_options().step_timeout.is_none());
    }

    #[test]
    fn options_after_positionals() {
        let args = Args::try_parse_from([
            "expiry-bench",
            "10",
            "0",
            "keydb",
            "3",
            "1",
            "1",
            "--port",
            "6380",
            "--format",
            "json",
            "--on-failure",
            "abort",
            "--step-timeout-secs",
            "30",
            "--cleanup",
        ])
        .unwrap();
        let env = args.environment("/usr/bin/keydb-cli".into());
        assert_eq!(env.port, 6380);
        assert_eq!(env.load_generator.pipeline, 200);
        let options = args.run_options();
        assert_eq!(options.policy, FailurePolicy::Abort);
        assert_eq!(options.step_timeout, Some(Duration::from_secs(30)));
        assert!(options.cleanup);
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn missing_client_path_is_configuration_error() {
        let args = Args::try_parse_from(["expiry-bench", "1000", "1", "redis", "10000", "0", "0"]).unwrap();
        let err = args.environment_from_var("HFE_CLI_TEST_UNSET").unwrap_err();
        assert!(matches!(err, BenchError::ConfigurationMissing { ref name } if name == "HFE_CLI_TEST_UNSET"));

        unsafe { std::env::set_var("HFE_CLI_TEST_BLANK", "  ") };
        let err = args.environment_from_var("HFE_CLI_TEST_BLANK").unwrap_err();
        assert!(matches!(err, BenchError::ConfigurationMissing { .. }));
    }

    #[test]
    fn client_path_comes_from_environment() {
        let args = Args::try_parse_from(["expiry-bench", "1000", "1", "redis", "10000", "0", "0"]).unwrap();
        unsafe { std::env::set_var("HFE_CLI_TEST_SET", " /opt/redis/bin/redis-cli\n") };
        let env = args.environment_from_var("HFE_CLI_TEST_SET").unwrap();
        assert_eq!(env.cli_path, "/opt/redis/bin/redis-cli");
        assert_eq!(env.host, DEFAULT_HOST);
    }

    #[test]
    fn wrong_arity_is_rejected() {
        assert!(Args::try_parse_from(["expiry-bench", "1000", "1", "redis"]).is_err());
        assert!(Args::try_parse_from(["expiry-bench", "1", "1", "redis", "1", "0", "0", "extra"]).is_err());
    }
}
