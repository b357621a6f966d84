//! Hash-field expiration benchmark orchestration.
//!
//! Drives an external load generator (`memtier_benchmark`) and a server
//! command-line client to measure the throughput and memory overhead of
//! per-field expiry on several key-value servers:
//! - **redis**: native `HEXPIRE`/`HEXPIREAT`
//! - **keydb**: `EXPIREMEMBER`/`EXPIREMEMBERAT`
//! - **tairhash**: `EXHPEXPIRE`/`EXHPEXPIREAT`
//! - **redis-expire**: plain `EXPIRE` on the container, as a reference
//!
//! One pass flushes the server, populates it, snapshots memory, attaches
//! expiry, snapshots memory again and, for distant expiries, reads the TTLs
//! back.
//!
//! Run tests: `cargo test`
//! Run the parser benchmark: `cargo bench`

pub mod backend;
pub mod cli;
pub mod error;
pub mod orchestrator;
pub mod parse;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod translate;

pub use error::{BenchError, Result};
