//! Parsing and latest-wins ingestion of Link-State Advertisements, and
//! construction of the [`Graph`] they describe.
//!
//! Grounded on `dns_ConstructGraph` (`nameserver/nameserver-core.c`): each
//! line is `sscanf`'d as `"%s %d %s"` (whitespace-delimited id, sequence
//! number, comma-separated neighbor blob), then the neighbor blob is
//! `strtok`'d on `",\n"` — so a trailing newline on the last neighbor is
//! stripped by the same split rather than needing separate trimming.

use collections::AHashMap;
use utils::error::{Error, Result};

use crate::graph::Graph;

/// One parsed LSA line: an origin's current neighbor set at a given
/// sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lsa {
	pub origin: String,
	pub seq: u32,
	pub neighbors: Vec<String>,
}

/// Parse a single LSA line of the form `"<ip> <seqnum> <csv_neighbors>"`.
pub fn parse_line(line: &str) -> Result<Lsa> {
	let mut fields = line.split_whitespace();

	let origin = fields.next().ok_or_else(|| Error::Parse("LSA line is missing its origin field".into()))?;
	let seq = fields
		.next()
		.ok_or_else(|| Error::Parse("LSA line is missing its sequence number".into()))?
		.parse::<u32>()
		.map_err(|_| Error::Parse("LSA sequence number is not an integer".into()))?;
	let neighbors = fields.next().ok_or_else(|| Error::Parse("LSA line is missing its neighbor list".into()))?;

	let neighbors = neighbors
		.split(',')
		.map(str::trim)
		.filter(|s| !s.is_empty())
		.map(str::to_owned)
		.collect();

	Ok(Lsa { origin: origin.to_owned(), seq, neighbors })
}

/// The retained, latest-per-origin view of all ingested LSAs.
#[derive(Default)]
pub struct LsaStore {
	latest: AHashMap<String, Lsa>,
}

impl LsaStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Ingest one LSA, keeping it only if no record for its origin exists
	/// yet, or the existing one has a strictly lower sequence number.
	/// Returns whether this record replaced the prior one.
	pub fn ingest(&mut self, lsa: Lsa) -> bool {
		match self.latest.get(&lsa.origin) {
			Some(existing) if existing.seq >= lsa.seq => false,
			_ => {
				self.latest.insert(lsa.origin.clone(), lsa);
				true
			}
		}
	}

	/// Parse and ingest every line of an LSA file. A malformed line is a
	/// fatal parse error, matching `dns_ConstructGraph`'s `EXIT_FAILURE`.
	pub fn ingest_file(&mut self, contents: &str) -> Result<()> {
		for line in contents.lines() {
			if line.trim().is_empty() {
				continue;
			}

			self.ingest(parse_line(line)?);
		}

		Ok(())
	}

	/// Build the undirected graph described by the retained LSAs: every
	/// origin and every neighbor it names becomes a node (created on
	/// demand), and an edge is added between them.
	pub fn build_graph(&self) -> Graph {
		let mut graph = Graph::new();

		for lsa in self.latest.values() {
			let origin = graph.get_or_insert(&lsa.origin);

			for neighbor in &lsa.neighbors {
				let neighbor = graph.get_or_insert(neighbor);
				graph.add_edge(origin, neighbor);
			}
		}

		graph
	}
}
