//! A single-threaded video-streaming proxy that interposes itself
//! between a browser and an origin HTTP server, rewriting video-fragment
//! requests to select a bitrate from a measured throughput estimate
//! (spec.md §2).

pub mod bitrate;
pub mod config;
pub mod connection;
pub mod dns_client;
pub mod framer;
pub mod inspect;
pub mod rewrite;
pub mod server;

pub use config::Config;
pub use connection::ConnTable;
pub use server::ProxyState;
