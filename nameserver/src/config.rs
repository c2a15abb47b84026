//! Command-line configuration.
//!
//! No argument-parsing crate appears anywhere in the reference corpus, so
//! this mirrors `nameserver.c`'s hand-rolled `argv` walk: a leading `-r`
//! flag switches the load-balancing mode, and the remaining five
//! positional arguments are taken in order.

use std::net::Ipv4Addr;
use std::path::PathBuf;

use utils::error::{Error, Result};

/// The two ways the nameserver can pick a server to answer a query with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
	/// Cycle through the servers list in order, independent of the client.
	RoundRobin,
	/// Resolve to the server with the shortest path from the client, per
	/// the LSA-derived topology graph.
	Geographic,
}

#[derive(Debug, Clone)]
pub struct Config {
	pub mode: Mode,
	pub log_path: PathBuf,
	pub bind_ip: Ipv4Addr,
	pub bind_port: u16,
	pub servers_path: PathBuf,
	pub lsa_path: PathBuf,
}

const USAGE: &str = "usage: nameserver [-r] <log> <ip> <port> <servers-file> <lsa-file>";

impl Config {
	/// Parse from `std::env::args()`-style argv, excluding argv[0].
	pub fn parse(args: &[String]) -> Result<Self> {
		let mut args = args.iter();
		let mut first = args.next().ok_or_else(|| Error::Config(USAGE.into()))?;

		let mode = if first == "-r" {
			first = args.next().ok_or_else(|| Error::Config(USAGE.into()))?;
			Mode::RoundRobin
		} else {
			Mode::Geographic
		};

		let log_path = PathBuf::from(first);

		let ip = args.next().ok_or_else(|| Error::Config(USAGE.into()))?;
		let bind_ip: Ipv4Addr = ip.parse().map_err(|_| Error::Config(format!("invalid bind ip: {ip}")))?;

		let port = args.next().ok_or_else(|| Error::Config(USAGE.into()))?;
		let bind_port: u16 = port.parse().map_err(|_| Error::Config(format!("invalid port: {port}")))?;

		let servers_path = PathBuf::from(args.next().ok_or_else(|| Error::Config(USAGE.into()))?);
		let lsa_path = PathBuf::from(args.next().ok_or_else(|| Error::Config(USAGE.into()))?);

		if args.next().is_some() {
			return Err(Error::Config(USAGE.into()));
		}

		Ok(Self { mode, log_path, bind_ip, bind_port, servers_path, lsa_path })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn args(s: &str) -> Vec<String> {
		s.split_whitespace().map(str::to_owned).collect()
	}

	#[test]
	fn defaults_to_geographic() {
		let cfg = Config::parse(&args("log.txt 10.0.0.1 5300 servers.txt lsa.txt")).unwrap();
		assert_eq!(cfg.mode, Mode::Geographic);
		assert_eq!(cfg.bind_port, 5300);
	}

	#[test]
	fn dash_r_selects_round_robin() {
		let cfg = Config::parse(&args("-r log.txt 10.0.0.1 5300 servers.txt lsa.txt")).unwrap();
		assert_eq!(cfg.mode, Mode::RoundRobin);
	}

	#[test]
	fn missing_arguments_is_a_config_error() {
		assert!(Config::parse(&args("log.txt 10.0.0.1")).is_err());
	}

	#[test]
	fn trailing_arguments_is_a_config_error() {
		assert!(Config::parse(&args("log.txt 10.0.0.1 5300 servers.txt lsa.txt extra")).is_err());
	}
}
