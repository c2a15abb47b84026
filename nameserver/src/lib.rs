//! A single-threaded UDP nameserver that resolves one fixed hostname to
//! a replica, either round-robin or by shortest path over an LSA-derived
//! topology (spec.md §2, §4.10).

pub mod config;
pub mod server;
pub mod state;

pub use config::{Config, Mode};
pub use state::State;
