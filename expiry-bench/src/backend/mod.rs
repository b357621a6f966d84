//! Backend adapters and the common `Backend` trait.
//!
//! Each server under test speaks its own command dialect for per-field
//! expiry. Four implementations are provided:
//! - [`redis::RedisHfe`]: native hash-field expiration (`HEXPIRE ... FIELDS`)
//! - [`keydb::KeyDb`]: subkey expiration (`EXPIREMEMBER`)
//! - [`tairhash::TairHash`]: the TairHash module (`EXHPEXPIRE`, milliseconds)
//! - [`redis_expire::RedisKeyExpire`]: plain `EXPIRE` on the whole container,
//!   used as the reference point

pub mod keydb;
pub mod redis;
pub mod redis_expire;
pub mod tairhash;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::BenchError;
use crate::scenario::{ExpiryMode, KeyFieldNaming, VALUE_PLACEHOLDER};

/// Inputs shared by every template operation.
#[derive(Debug, Clone, Copy)]
pub struct TemplateArgs<'a> {
    /// Container key, possibly the load generator's per-item placeholder.
    pub key: &'a str,
    /// Field name, possibly the load generator's per-item placeholder.
    pub field: &'a str,
    /// Placeholder substituted with the generated payload.
    pub value: &'a str,
    pub expiry: ExpiryMode,
}

impl<'a> TemplateArgs<'a> {
    pub fn new(naming: &'a KeyFieldNaming, expiry: ExpiryMode) -> Self {
        Self {
            key: &naming.container_key,
            field: &naming.field,
            value: VALUE_PLACEHOLDER,
            expiry,
        }
    }
}

/// Trait implemented by each backend dialect.
///
/// Every method is a pure function of its arguments and returns a single
/// command line in the server's own protocol syntax.
pub trait Backend {
    /// Name the operator selects the backend by.
    fn name(&self) -> &'static str;

    /// Write one field with its value.
    fn populate_template(&self, args: &TemplateArgs<'_>) -> String;

    /// Attach the expiry to one field (or its container).
    fn expire_template(&self, args: &TemplateArgs<'_>) -> String;

    /// Read back the remaining time to live.
    fn ttl_template(&self, args: &TemplateArgs<'_>) -> String;

    /// Remove one field.
    fn delete_template(&self, args: &TemplateArgs<'_>) -> String;
}

/// Identity of a supported backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BackendKind {
    #[serde(rename = "redis")]
    Redis,
    #[serde(rename = "keydb")]
    KeyDb,
    #[serde(rename = "tairhash")]
    TairHash,
    #[serde(rename = "redis-expire")]
    RedisExpire,
}

impl BackendKind {
    pub const ALL: [BackendKind; 4] = [
        BackendKind::Redis,
        BackendKind::KeyDb,
        BackendKind::TairHash,
        BackendKind::RedisExpire,
    ];

    pub fn adapter(self) -> &'static dyn Backend {
        match self {
            BackendKind::Redis => &redis::RedisHfe,
            BackendKind::KeyDb => &keydb::KeyDb,
            BackendKind::TairHash => &tairhash::TairHash,
            BackendKind::RedisExpire => &redis_expire::RedisKeyExpire,
        }
    }

    pub fn name(self) -> &'static str {
        self.adapter().name()
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendKind {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        BackendKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let known: Vec<&str> = BackendKind::ALL.iter().map(|k| k.name()).collect();
                BenchError::invalid(
                    "backend",
                    format!("unknown backend '{wanted}', expected one of {}", known.join(", ")),
                )
            })
    }
}
