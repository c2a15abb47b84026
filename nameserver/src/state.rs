//! Process-wide nameserver state: the servers list, the round-robin
//! cursor, and (in geographic mode) the LSA-derived topology graph.

use std::net::Ipv4Addr;

use topo::Graph;
use utils::error::{Error, Result};

use crate::config::Mode;

/// Servers file is newline-separated IPv4 literals, capped at 100
/// (spec.md §6).
pub const MAX_SERVERS: usize = 100;

pub struct State {
	mode: Mode,
	/// Servers kept as their original textual form: this is also how they
	/// key into the topology graph's nodes.
	servers: Vec<String>,
	rr: u64,
	graph: Option<Graph>,
}

impl State {
	pub fn new(mode: Mode, servers: Vec<String>, graph: Option<Graph>) -> Result<Self> {
		if servers.is_empty() {
			return Err(Error::Config("servers file named no servers".into()));
		}

		if servers.len() > MAX_SERVERS {
			return Err(Error::Config(format!("servers file names more than {MAX_SERVERS} servers")));
		}

		Ok(Self { mode, servers, rr: 0, graph })
	}

	/// Resolve the server to answer a query from `client`, per the
	/// configured mode. In geographic mode, a client or servers list
	/// entirely absent from the graph resolves to the `0.0.0.0` sentinel
	/// (spec.md §4.4) rather than failing the query outright — `None` is
	/// returned only if that resolved text somehow isn't a valid IPv4
	/// literal, which cannot happen for the sentinel or a servers-file
	/// entry (both are validated up front).
	pub fn resolve(&mut self, client: Ipv4Addr) -> Option<Ipv4Addr> {
		match self.mode {
			Mode::RoundRobin => {
				let chosen = &self.servers[(self.rr as usize) % self.servers.len()];
				self.rr = self.rr.wrapping_add(1);
				chosen.parse().ok()
			}
			Mode::Geographic => {
				let graph = self.graph.as_ref().expect("geographic mode always carries a graph");
				let chosen = topo::nearest_server(graph, &self.servers, &client.to_string());
				chosen.parse().ok()
			}
		}
	}
}

/// Parse a servers file: one IPv4 literal per non-empty line.
pub fn parse_servers(contents: &str) -> Result<Vec<String>> {
	contents
		.lines()
		.map(str::trim)
		.filter(|l| !l.is_empty())
		.map(|l| {
			l.parse::<Ipv4Addr>()
				.map(|_| l.to_owned())
				.map_err(|_| Error::Config(format!("invalid server address: {l}")))
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_robin_cycles_in_order() {
		let mut state = State::new(Mode::RoundRobin, vec!["10.0.0.1".into(), "10.0.0.2".into(), "10.0.0.3".into()], None).unwrap();

		let client: Ipv4Addr = "192.168.0.1".parse().unwrap();
		let got: Vec<_> = (0..7).map(|_| state.resolve(client).unwrap().to_string()).collect();

		assert_eq!(got, vec!["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.1"]);
	}

	#[test]
	fn parse_servers_rejects_bad_lines() {
		assert!(parse_servers("10.0.0.1\nnot-an-ip\n").is_err());
	}

	#[test]
	fn parse_servers_skips_blank_lines() {
		let servers = parse_servers("10.0.0.1\n\n10.0.0.2\n").unwrap();
		assert_eq!(servers, vec!["10.0.0.1", "10.0.0.2"]);
	}

	#[test]
	fn too_many_servers_is_rejected() {
		let servers: Vec<String> = (0..101).map(|i| format!("10.0.{}.{}", i / 256, i % 256)).collect();
		assert!(State::new(Mode::RoundRobin, servers, None).is_err());
	}

	#[test]
	fn geographic_unreachable_client_resolves_to_sentinel() {
		let mut graph = topo::Graph::new();
		let a = graph.get_or_insert("10.0.0.1");
		let b = graph.get_or_insert("10.0.0.2");
		graph.add_edge(a, b);

		let mut state = State::new(Mode::Geographic, vec!["10.0.0.2".into()], Some(graph)).unwrap();

		// "192.168.0.1" never appears in the graph.
		let client: Ipv4Addr = "192.168.0.1".parse().unwrap();
		assert_eq!(state.resolve(client), Some("0.0.0.0".parse().unwrap()));
	}
}
