//! Scenario configuration: the validated, immutable parameters of one run.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;

use crate::backend::BackendKind;
use crate::error::{BenchError, Result};

/// Container key used when every item is a field of one hash.
pub const SINGLE_CONTAINER_KEY: &str = "myhash";

/// Placeholder the load generator replaces with the per-item key.
pub const ITEM_PLACEHOLDER: &str = "__key__";

/// Placeholder the load generator replaces with the generated payload.
pub const VALUE_PLACEHOLDER: &str = "__data__";

const GENERATED_FIELD_LEN: usize = 8;
const FIELD_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topology {
    /// One container holding `item_count` fields.
    SingleContainerManyFields,
    /// `item_count` containers holding one field each.
    ManyContainersSingleField,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Concurrency {
    Single,
    Multi,
}

impl Concurrency {
    /// Load generator clients per thread.
    pub fn clients(self) -> u32 {
        match self {
            Concurrency::Single => 1,
            Concurrency::Multi => 5,
        }
    }

    /// Load generator worker threads.
    pub fn threads(self) -> u32 {
        match self {
            Concurrency::Single => 1,
            Concurrency::Multi => 2,
        }
    }
}

/// When items expire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum ExpiryMode {
    /// Each item gets `seconds` from the moment its expire command runs.
    Relative { seconds: u64 },
    /// Every item expires at the same Unix timestamp.
    Absolute { unix_seconds: i64 },
}

impl ExpiryMode {
    pub fn is_absolute(self) -> bool {
        matches!(self, ExpiryMode::Absolute { .. })
    }

    /// Seconds as a signed 64-bit value, `None` when it does not fit.
    pub fn checked_seconds(self) -> Option<i64> {
        match self {
            ExpiryMode::Relative { seconds } => i64::try_from(seconds).ok(),
            ExpiryMode::Absolute { unix_seconds } => Some(unix_seconds),
        }
    }

    /// Milliseconds as a signed 64-bit value, `None` when it does not fit.
    pub fn checked_millis(self) -> Option<i64> {
        self.checked_seconds()?.checked_mul(1000)
    }

    /// The number placed in a seconds-granularity command. Saturates at
    /// `i64::MAX`; validated scenarios never reach it.
    pub fn seconds_value(self) -> i64 {
        self.checked_seconds().unwrap_or(i64::MAX)
    }

    /// The number placed in a milliseconds-granularity command. Saturates
    /// like [`ExpiryMode::seconds_value`].
    pub fn millis_value(self) -> i64 {
        self.checked_millis().unwrap_or(i64::MAX)
    }
}

/// How the load generator's per-item placeholder maps onto key and field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyFieldNaming {
    pub container_key: String,
    pub field: String,
}

impl KeyFieldNaming {
    /// Single container: fixed key, per-item field. Many containers: per-item
    /// key, one field name drawn from `rng` and shared by every container.
    pub fn for_topology<R: Rng + ?Sized>(topology: Topology, rng: &mut R) -> Self {
        match topology {
            Topology::SingleContainerManyFields => Self {
                container_key: SINGLE_CONTAINER_KEY.to_string(),
                field: ITEM_PLACEHOLDER.to_string(),
            },
            Topology::ManyContainersSingleField => Self {
                container_key: ITEM_PLACEHOLDER.to_string(),
                field: random_field_name(rng),
            },
        }
    }
}

fn random_field_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..GENERATED_FIELD_LEN)
        .map(|_| char::from(FIELD_ALPHABET[rng.gen_range(0..FIELD_ALPHABET.len())]))
        .collect()
}

/// Unvalidated scenario input, as typed by the operator.
#[derive(Debug, Clone)]
pub struct RawScenario {
    pub item_count: String,
    pub topology: String,
    pub backend: String,
    pub expire_seconds: String,
    pub concurrency: String,
    pub synchronized_expiry: String,
}

/// Parameters of one benchmark run. Immutable once built.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioConfig {
    pub item_count: u64,
    pub topology: Topology,
    pub backend: BackendKind,
    pub expire_seconds: u64,
    pub concurrency: Concurrency,
    pub synchronized_expiry: bool,
    pub clients: u32,
    pub threads: u32,
    pub expiry: ExpiryMode,
    pub naming: KeyFieldNaming,
}

/// Expiry steps shorter than this finish before a TTL read could observe them.
pub const TTL_OBSERVABLE_AFTER_SECS: u64 = 100;

impl RawScenario {
    /// Validate against the wall clock and a thread-local random source.
    pub fn validate(&self) -> Result<ScenarioConfig> {
        self.validate_at(Utc::now(), &mut rand::thread_rng())
    }

    /// Validate with an explicit "now" and random source.
    pub fn validate_at<R: Rng + ?Sized>(
        &self,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<ScenarioConfig> {
        let item_count = parse_positive("item_count", &self.item_count)?;
        let topology = if parse_flag("topology", &self.topology)? {
            Topology::SingleContainerManyFields
        } else {
            Topology::ManyContainersSingleField
        };
        let backend = self.backend.parse::<BackendKind>()?;
        let expire_seconds = parse_positive("expire_seconds", &self.expire_seconds)?;
        let concurrency = if parse_flag("concurrency", &self.concurrency)? {
            Concurrency::Multi
        } else {
            Concurrency::Single
        };
        let synchronized_expiry = parse_flag("synchronized_expiry", &self.synchronized_expiry)?;

        let expiry = if synchronized_expiry {
            let offset = i64::try_from(expire_seconds)
                .map_err(|_| BenchError::invalid("expire_seconds", "too large"))?;
            let unix_seconds = now
                .timestamp()
                .checked_add(offset)
                .ok_or_else(|| BenchError::invalid("expire_seconds", "too large"))?;
            log::info!("All items expire at {unix_seconds}");
            ExpiryMode::Absolute { unix_seconds }
        } else {
            ExpiryMode::Relative {
                seconds: expire_seconds,
            }
        };
        // Every backend must be able to express the expiry, milliseconds included.
        if expiry.checked_millis().is_none() {
            return Err(BenchError::invalid(
                "expire_seconds",
                "expiry in milliseconds does not fit a 64-bit integer",
            ));
        }

        Ok(ScenarioConfig {
            item_count,
            topology,
            backend,
            expire_seconds,
            concurrency,
            synchronized_expiry,
            clients: concurrency.clients(),
            threads: concurrency.threads(),
            expiry,
            naming: KeyFieldNaming::for_topology(topology, rng),
        })
    }
}

impl ScenarioConfig {
    /// Whether the run ends with a TTL read.
    pub fn reads_ttl(&self) -> bool {
        self.expire_seconds > TTL_OBSERVABLE_AFTER_SECS
    }
}

fn parse_positive(field: &'static str, raw: &str) -> Result<u64> {
    let value = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| BenchError::invalid(field, format!("expected a positive integer, got '{raw}'")))?;
    if value == 0 {
        return Err(BenchError::invalid(field, "must be greater than zero"));
    }
    Ok(value)
}

fn parse_flag(field: &'static str, raw: &str) -> Result<bool> {
    match raw.trim() {
        "0" => Ok(false),
        "1" => Ok(true),
        other => Err(BenchError::invalid(field, format!("expected 0 or 1, got '{other}'"))),
    }
}
