//! # upgrade-post-checker
//!
//! Post-upgrade verification for OceanBase clusters.
//!
//! After a software upgrade the checker confirms that every node reports
//! the target version and that the internal upgrade self-inspection has
//! finished, then turns the cluster switches that are kept off during an
//! upgrade window back on: DDL, rebalance, rereplication and major freeze.
//!
//! ## Architecture
//!
//! ```text
//! CLI (main.rs, config.rs)
//!     │
//!     ├── PostUpgradeVerifier (service/verifier)
//!     │       │
//!     │       ├── ParameterSynchronizer (service/parameter_sync)
//!     │       │
//!     │       └── poll_until / wait_for (service/poller)
//!     │
//!     ├── QueryGateway (gateway/)
//!     │
//!     └── MySqlSession ── OceanBase coordinator
//! ```
//!
//! Every step runs sequentially on one session. A step that cannot
//! converge within its budget ends the run with a typed error.

pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod service;
