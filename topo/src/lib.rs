//! Network topology for the nameserver's geographic load-balancing mode:
//! an arena-backed undirected graph built from Link-State Advertisements,
//! and unweighted shortest-path resolution over it.

pub mod bfs;
pub mod graph;
pub mod lsa;

pub use bfs::{nearest_server, shortest_paths, Distances, UNREACHABLE};
pub use graph::{Graph, NodeIndex};
pub use lsa::{parse_line as parse_lsa_line, Lsa, LsaStore};
