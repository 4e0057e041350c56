#![deny(unsafe_code)]

//! Shared test utilities for the supctl workspace.
//!
//! Provides scripted transports, an in-process stub daemon, config builders,
//! and tracing helpers so that individual crate tests stay concise.
//!
//! Add this crate as a `[dev-dependency]` in any workspace member:
//!
//! ```toml
//! [dev-dependencies]
//! supctl-test-utils = { workspace = true }
//! ```

pub mod config;
pub mod daemon;
pub mod tracing_setup;
pub mod transport;

pub use config::{TestConfigBuilder, TestConfigFile};
pub use daemon::StubDaemon;
pub use tracing_setup::init_test_tracing;
pub use transport::{Reply, ScriptedTransport};
