//! Command translation: turns a scenario and a backend into the ordered shell
//! invocations of one benchmark pass.

use std::fmt;

use serde::Serialize;

use crate::backend::{Backend, TemplateArgs};
use crate::scenario::{ExpiryMode, ScenarioConfig};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 6379;
pub const DEFAULT_LOAD_GENERATOR: &str = "memtier_benchmark";
pub const DEFAULT_PIPELINE: u32 = 200;
pub const DEFAULT_DATA_SIZE: u32 = 1;

/// Load generator binary and its fixed tuning.
#[derive(Debug, Clone)]
pub struct LoadGenerator {
    pub binary: String,
    pub pipeline: u32,
    /// Payload size in bytes for populate.
    pub data_size: u32,
}

impl Default for LoadGenerator {
    fn default() -> Self {
        Self {
            binary: DEFAULT_LOAD_GENERATOR.to_string(),
            pipeline: DEFAULT_PIPELINE,
            data_size: DEFAULT_DATA_SIZE,
        }
    }
}

/// Everything about the target that does not come from the scenario.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Path to the server's command-line client.
    pub cli_path: String,
    pub host: String,
    pub port: u16,
    pub load_generator: LoadGenerator,
}

impl Environment {
    pub fn new(cli_path: impl Into<String>) -> Self {
        Self {
            cli_path: cli_path.into(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            load_generator: LoadGenerator::default(),
        }
    }

    fn cli(&self, command: &str) -> String {
        format!("{} -h {} -p {} {command}", self.cli_path, self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    Clear,
    Populate,
    MemorySnapshot,
    Expire,
    ReadTtl,
    Delete,
}

impl StepKind {
    pub fn name(self) -> &'static str {
        match self {
            StepKind::Clear => "clear",
            StepKind::Populate => "populate",
            StepKind::MemorySnapshot => "memory",
            StepKind::Expire => "expire",
            StepKind::ReadTtl => "read-ttl",
            StepKind::Delete => "delete",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One external invocation of the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub kind: StepKind,
    pub description: String,
    pub invocation: String,
}

pub struct CommandTranslator<'a> {
    scenario: &'a ScenarioConfig,
    backend: &'a dyn Backend,
    env: &'a Environment,
}

impl<'a> CommandTranslator<'a> {
    pub fn new(scenario: &'a ScenarioConfig, backend: &'a dyn Backend, env: &'a Environment) -> Self {
        Self {
            scenario,
            backend,
            env,
        }
    }

    fn args(&self) -> TemplateArgs<'a> {
        TemplateArgs::new(&self.scenario.naming, self.scenario.expiry)
    }

    /// The ordered benchmark steps: clear, populate, memory, expire, memory,
    /// and a TTL read when the expiry is far enough away to be observed.
    pub fn plan(&self) -> Vec<Step> {
        let args = self.args();
        let count = self.scenario.item_count;
        let mut steps = vec![
            Step {
                kind: StepKind::Clear,
                description: "Flush all data on the target".to_string(),
                invocation: self.env.cli("FLUSHALL"),
            },
            Step {
                kind: StepKind::Populate,
                description: format!("Populate {count} fields"),
                invocation: self.load(&self.backend.populate_template(&args), true),
            },
            self.memory_snapshot("Memory after populate"),
            Step {
                kind: StepKind::Expire,
                description: format!("Set expiry on {count} fields ({})", self.expiry_label()),
                invocation: self.load(&self.backend.expire_template(&args), false),
            },
            self.memory_snapshot("Memory after expire"),
        ];
        if self.scenario.reads_ttl() {
            steps.push(Step {
                kind: StepKind::ReadTtl,
                description: format!("Read TTL of {count} fields"),
                invocation: self.load(&self.backend.ttl_template(&args), false),
            });
        }
        steps
    }

    /// Deletes every populated field. Not part of the measured plan.
    pub fn cleanup_step(&self) -> Step {
        Step {
            kind: StepKind::Delete,
            description: format!("Delete {} fields", self.scenario.item_count),
            invocation: self.load(&self.backend.delete_template(&self.args()), false),
        }
    }

    fn memory_snapshot(&self, description: &str) -> Step {
        Step {
            kind: StepKind::MemorySnapshot,
            description: description.to_string(),
            invocation: self.env.cli("INFO memory"),
        }
    }

    fn expiry_label(&self) -> String {
        match self.scenario.expiry {
            ExpiryMode::Relative { seconds } => format!("relative {seconds}s"),
            ExpiryMode::Absolute { unix_seconds } => format!("at {unix_seconds}"),
        }
    }

    /// A load generator run issuing `command` once per item. `P` walks the key
    /// space sequentially so every step addresses the same item set.
    fn load(&self, command: &str, with_payload: bool) -> String {
        let lg = &self.env.load_generator;
        let payload = if with_payload {
            format!(" --data-size {}", lg.data_size)
        } else {
            String::new()
        };
        format!(
            "{} --port {} --host {}{payload} --command='{command}' --command-key-pattern=P -c {} -t {} --pipeline {} --hide-histogram --key-maximum {} -n allkeys 2>&1",
            lg.binary,
            self.env.port,
            self.env.host,
            self.scenario.clients,
            self.scenario.threads,
            lg.pipeline,
            self.scenario.item_count,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::RawScenario;
    use chrono::{TimeZone, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn scenario(args: [&str; 6]) -> ScenarioConfig {
        RawScenario {
            item_count: args[0].into(),
            topology: args[1].into(),
            backend: args[2].into(),
            expire_seconds: args[3].into(),
            concurrency: args[4].into(),
            synchronized_expiry: args[5].into(),
        }
        .validate_at(Utc.timestamp_opt(1_000, 0).unwrap(), &mut StdRng::seed_from_u64(1))
        .unwrap()
    }

    fn plan(args: [&str; 6]) -> Vec<Step> {
        let scenario = scenario(args);
        let env = Environment::new("/opt/redis/redis-cli");
        CommandTranslator::new(&scenario, scenario.backend.adapter(), &env).plan()
    }

    fn kinds(steps: &[Step]) -> Vec<StepKind> {
        steps.iter().map(|s| s.kind).collect()
    }

    #[test]
    fn distant_expiry_reads_ttl() {
        let steps = plan(["1000", "1", "redis", "10000", "0", "0"]);
        assert_eq!(
            kinds(&steps),
            vec![
                StepKind::Clear,
                StepKind::Populate,
                StepKind::MemorySnapshot,
                StepKind::Expire,
                StepKind::MemorySnapshot,
                StepKind::ReadTtl,
            ]
        );
    }

    #[test]
    fn imminent_expiry_skips_ttl() {
        let steps = plan(["1000", "1", "redis", "3", "0", "0"]);
        assert_eq!(steps.len(), 5);
        assert!(steps.iter().all(|s| s.kind != StepKind::ReadTtl));
    }

    #[test]
    fn clear_and_snapshot_use_the_client() {
        let steps = plan(["10", "1", "keydb", "3", "0", "0"]);
        assert_eq!(steps[0].invocation, "/opt/redis/redis-cli -h 127.0.0.1 -p 6379 FLUSHALL");
        assert_eq!(steps[2].invocation, "/opt/redis/redis-cli -h 127.0.0.1 -p 6379 INFO memory");
        assert_eq!(steps[2].invocation, steps[4].invocation);
    }

    #[test]
    fn populate_invocation_matches_loadgen_contract() {
        let steps = plan(["1000", "1", "redis", "10000", "0", "0"]);
        assert_eq!(
            steps[1].invocation,
            "memtier_benchmark --port 6379 --host 127.0.0.1 --data-size 1 \
             --command='HSET myhash __key__ __data__' --command-key-pattern=P -c 1 -t 1 \
             --pipeline 200 --hide-histogram --key-maximum 1000 -n allkeys 2>&1"
        );
        assert!(!steps[3].invocation.contains("--data-size"));
        assert!(steps[3]
            .invocation
            .contains("--command='HEXPIRE myhash 10000 FIELDS 1 __key__'"));
    }

    #[test]
    fn multi_client_flags() {
        let steps = plan(["10", "0", "tairhash", "10", "1", "0"]);
        assert!(steps[1].invocation.contains(" -c 5 -t 2 "));
    }

    #[test]
    fn synchronized_expiry_uses_one_timestamp() {
        let steps = plan(["1000", "1", "redis", "10000", "0", "1"]);
        assert!(steps[3]
            .invocation
            .contains("--command='HEXPIREAT myhash 11000 FIELDS 1 __key__'"));
    }

    #[test]
    fn cleanup_uses_delete_template() {
        let scenario = scenario(["10", "1", "tairhash", "10", "0", "0"]);
        let env = Environment::new("cli");
        let step = CommandTranslator::new(&scenario, scenario.backend.adapter(), &env).cleanup_step();
        assert_eq!(step.kind, StepKind::Delete);
        assert!(step.invocation.contains("--command='EXHDEL myhash __key__'"));
    }
}
