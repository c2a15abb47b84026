//! Unweighted shortest-path resolution, i.e. Dijkstra with every edge
//! weight fixed at 1 — equivalent to BFS, but structured as the source's
//! `findMinWeight`/relax loop so its tie-breaking and "relax only if `u`
//! still unvisited" quirk (spec.md §4.4, §9 open question (b)) carry over
//! exactly rather than being simplified away by a queue-based rewrite.

use crate::graph::{Graph, NodeIndex};

/// Per-node hop distance from some root, indexed by [`NodeIndex`]. `None`
/// means unreached.
pub struct Distances(Vec<Option<u32>>);

impl Distances {
	pub fn get(&self, idx: NodeIndex) -> Option<u32> {
		self.0[idx.position()]
	}
}

/// Compute hop distances from `root` to every other node in `graph`.
///
/// Per iteration: scan the still-unvisited set in arena order for the
/// minimum-weight node (ties keep the first encountered — arena order is
/// first-LSA-neighbor-seen order, per `constructNetworkGraph`); relax its
/// neighbors; remove it from the unvisited set. The `visited` guard is
/// checked before relaxing (always true at that point, since `u` is only
/// removed afterward) to preserve the source's literal structure rather
/// than a textbook Dijkstra relax.
pub fn shortest_paths(graph: &Graph, root: NodeIndex) -> Distances {
	let n = graph.len();
	let mut weight: Vec<Option<u32>> = vec![None; n];
	let mut visited = vec![false; n];

	weight[root.position()] = Some(0);

	let remaining = |visited: &[bool]| visited.iter().any(|&v| !v);

	while remaining(&visited) {
		let mut best: Option<usize> = None;

		for (pos, &done) in visited.iter().enumerate() {
			if done {
				continue;
			}

			if let Some(w) = weight[pos] {
				if best.map_or(true, |b| w < weight[b].unwrap()) {
					best = Some(pos);
				}
			}
		}

		let Some(u_pos) = best else {
			// Every remaining node is unreached; nothing left to relax.
			break;
		};

		let u = graph.indices().nth(u_pos).unwrap();
		let u_weight = weight[u_pos].unwrap();

		for &v in graph.neighbors(u) {
			// The source's redundant-but-preserved guard: relax only if
			// `u` is (still) among the unvisited. At this point in the
			// loop it always is, since removal happens below.
			if !visited[u_pos] {
				let v_pos = v.position();
				let candidate = u_weight + 1;

				if weight[v_pos].map_or(true, |w| candidate < w) {
					weight[v_pos] = Some(candidate);
				}
			}
		}

		visited[u_pos] = true;
	}

	Distances(weight)
}

/// The sentinel address returned when resolution fails outright: the
/// client is absent from the graph (spec.md §4.4 step 2's SHOULD), or no
/// server in the list was ever reached (step 4).
pub const UNREACHABLE: &str = "0.0.0.0";

/// Resolve the nearest entry of `servers` (by hop count from `client`),
/// ties broken by first-in-list order. Returns the [`UNREACHABLE`]
/// sentinel if `client` is absent from the graph, or if no server in the
/// list is reachable from it — the nameserver still replies with this
/// address rather than dropping the query (spec.md §4.4).
pub fn nearest_server(graph: &Graph, servers: &[String], client: &str) -> String {
	let Some(root) = graph.find(client) else {
		return UNREACHABLE.to_owned();
	};

	let distances = shortest_paths(graph, root);

	let mut best: Option<(usize, u32)> = None;

	for (i, server) in servers.iter().enumerate() {
		let Some(idx) = graph.find(server) else { continue };
		let Some(d) = distances.get(idx) else { continue };

		if best.map_or(true, |(_, bd)| d < bd) {
			best = Some((i, d));
		}
	}

	match best {
		Some((i, _)) => servers[i].clone(),
		None => UNREACHABLE.to_owned(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::lsa::{parse_line, LsaStore};

	fn chain_graph() -> Graph {
		let mut store = LsaStore::new();
		store.ingest(parse_line("A 1 B").unwrap());
		store.ingest(parse_line("B 1 A,C").unwrap());
		store.ingest(parse_line("C 1 B,D").unwrap());
		store.ingest(parse_line("D 1 C").unwrap());
		store.build_graph()
	}

	#[test]
	fn bfs_distance_along_a_chain() {
		let graph = chain_graph();
		let a = graph.find("A").unwrap();
		let d = graph.find("D").unwrap();

		let distances = shortest_paths(&graph, a);
		assert_eq!(distances.get(d), Some(3));
	}

	#[test]
	fn nearest_server_picks_closer_of_two() {
		let graph = chain_graph();
		let servers = vec!["D".to_string()];
		assert_eq!(nearest_server(&graph, &servers, "A"), "D");

		let servers = vec!["C".to_string(), "D".to_string()];
		assert_eq!(nearest_server(&graph, &servers, "A"), "C");
	}

	#[test]
	fn absent_client_yields_sentinel() {
		let graph = chain_graph();
		let servers = vec!["D".to_string()];
		assert_eq!(nearest_server(&graph, &servers, "not-a-node"), UNREACHABLE);
	}

	#[test]
	fn disconnected_component_yields_sentinel() {
		let mut store = LsaStore::new();
		store.ingest(parse_line("A 1 B").unwrap());
		store.ingest(parse_line("B 1 A").unwrap());
		store.ingest(parse_line("X 1 Y").unwrap());
		store.ingest(parse_line("Y 1 X").unwrap());

		let graph = store.build_graph();
		let servers = vec!["X".to_string()];
		assert_eq!(nearest_server(&graph, &servers, "A"), UNREACHABLE);
	}
}
