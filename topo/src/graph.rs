//! An undirected graph of IPv4-literal nodes, stored in an arena so that
//! neighbor references are indices rather than owned/shared pointers.
//!
//! Mirrors `constructNetworkGraph`'s `struct node *neighbors[]` adjacency
//! lists from the original nameserver, but replaces the pointer cycles with
//! a `Vec<Node>` arena addressed by [`NodeIndex`] — per the design note on
//! avoiding ownership ambiguity in the self-referential node graph.

use collections::AHashMap;

/// An index into a [`Graph`]'s node arena. Cheap to copy, stable for the
/// lifetime of the graph (nodes are never removed, only added).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(usize);

impl NodeIndex {
	fn get(self) -> usize {
		self.0
	}

	/// The dense arena position backing this index, for crate-internal
	/// code (the BFS) that wants to index a parallel `Vec` directly
	/// instead of re-deriving the position by scanning.
	pub(crate) fn position(self) -> usize {
		self.0
	}
}

struct Node {
	/// The IPv4 literal this node names.
	id: String,
	neighbors: Vec<NodeIndex>,
}

/// An undirected graph with no multi-edges, keyed by IPv4-literal node id.
#[derive(Default)]
pub struct Graph {
	nodes: Vec<Node>,
	by_id: AHashMap<String, NodeIndex>,
}

impl Graph {
	pub fn new() -> Self {
		Self { nodes: Vec::new(), by_id: AHashMap::default() }
	}

	/// The number of nodes in the graph.
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Look up a node by id without creating one.
	pub fn find(&self, id: &str) -> Option<NodeIndex> {
		self.by_id.get(id).copied()
	}

	/// Look up a node by id, creating it (with no neighbors) if absent.
	/// Insertion order becomes the arena's iteration order, which is what
	/// drives the BFS tie-break on "first node encountered".
	pub fn get_or_insert(&mut self, id: &str) -> NodeIndex {
		if let Some(&idx) = self.by_id.get(id) {
			return idx;
		}

		let idx = NodeIndex(self.nodes.len());
		self.nodes.push(Node { id: id.to_owned(), neighbors: Vec::new() });
		self.by_id.insert(id.to_owned(), idx);
		idx
	}

	pub fn id(&self, idx: NodeIndex) -> &str {
		&self.nodes[idx.get()].id
	}

	pub fn neighbors(&self, idx: NodeIndex) -> &[NodeIndex] {
		&self.nodes[idx.get()].neighbors
	}

	/// All node indices, in arena (first-inserted) order.
	pub fn indices(&self) -> impl Iterator<Item = NodeIndex> {
		(0..self.nodes.len()).map(NodeIndex)
	}

	/// Whether `a` lists `b` as a neighbor.
	fn has_neighbor(&self, a: NodeIndex, b: NodeIndex) -> bool {
		self.nodes[a.get()].neighbors.contains(&b)
	}

	/// Whether the undirected edge `a`-`b` exists on both sides.
	pub fn edge_exists(&self, a: NodeIndex, b: NodeIndex) -> bool {
		self.has_neighbor(a, b) && self.has_neighbor(b, a)
	}

	/// Add the undirected edge `a`-`b`, idempotently: each direction is
	/// only appended if not already present, so repeated calls never
	/// create a multi-edge.
	pub fn add_edge(&mut self, a: NodeIndex, b: NodeIndex) {
		if !self.has_neighbor(a, b) {
			self.nodes[a.get()].neighbors.push(b);
		}

		if a != b && !self.has_neighbor(b, a) {
			self.nodes[b.get()].neighbors.push(a);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::Graph;

	#[test]
	fn add_edge_is_symmetric() {
		let mut g = Graph::new();
		let a = g.get_or_insert("10.0.0.1");
		let b = g.get_or_insert("10.0.0.2");

		g.add_edge(a, b);

		assert!(g.edge_exists(a, b));
		assert!(g.edge_exists(b, a));
	}

	#[test]
	fn add_edge_is_idempotent() {
		let mut g = Graph::new();
		let a = g.get_or_insert("10.0.0.1");
		let b = g.get_or_insert("10.0.0.2");

		g.add_edge(a, b);
		g.add_edge(a, b);
		g.add_edge(b, a);

		assert_eq!(g.neighbors(a), &[b]);
		assert_eq!(g.neighbors(b), &[a]);
	}

	#[test]
	fn get_or_insert_is_stable() {
		let mut g = Graph::new();
		let a1 = g.get_or_insert("10.0.0.1");
		let a2 = g.get_or_insert("10.0.0.1");
		assert_eq!(a1, a2);
		assert_eq!(g.len(), 1);
	}
}
