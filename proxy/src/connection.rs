//! The connection table: one record per browser↔origin pair, indexed so
//! the event loop can look up which connection (and which side) produced
//! a given ready socket (spec.md §3, §4.5, §9 design note).
//!
//! The source keys a fixed-size array by raw file descriptor and uses a
//! sentinel fd (`0`) to mark "no browser side" for the startup manifest
//! connection. Here the browser side is simply `Option<TcpStream>`, which
//! rules out the descriptor-aliasing hazard the design note warns about
//! by construction instead of by convention.

use std::net::TcpStream;
use std::os::fd::RawFd;

use collections::{AHashMap, Buffer};

pub type ConnId = u64;

/// Which side of a connection a ready socket belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
	Browser,
	Origin,
}

/// One browser↔origin connection pair and its framing/rewrite state.
pub struct Connection {
	pub browser: Option<TcpStream>,
	pub origin: TcpStream,

	/// Bytes queued to be written to the browser.
	pub browser_out: Buffer,
	/// Bytes queued to be written to the origin.
	pub origin_out: Buffer,

	/// Raw bytes received from the browser, awaiting request framing.
	pub request_recv: Buffer,
	/// Raw bytes received from the origin, awaiting response framing.
	pub response_recv: Buffer,

	/// The origin's peer address, stringified once at connect time for
	/// logging (spec.md §3).
	pub origin_ip_text: String,

	/// Set when a fragment GET was just rewritten and forwarded; cleared
	/// once its response has been inspected.
	pub expecting_video_response: bool,
	pub modified_bitrate: Option<u32>,
	pub seg: Option<u32>,
	pub frag: Option<u32>,

	/// Microsecond timestamps bracketing the in-flight fragment transfer
	/// (spec.md §4.8): `t_start` when the request last left the proxy
	/// toward the origin, `t_final` when origin bytes next arrived.
	pub frag_t_start: Option<u64>,
	pub frag_t_final: Option<u64>,
}

impl Connection {
	pub fn new(browser: Option<TcpStream>, origin: TcpStream, origin_ip_text: String) -> Self {
		Self {
			browser,
			origin,
			browser_out: Buffer::new(),
			origin_out: Buffer::new(),
			request_recv: Buffer::new(),
			response_recv: Buffer::new(),
			origin_ip_text,
			expecting_video_response: false,
			modified_bitrate: None,
			seg: None,
			frag: None,
			frag_t_start: None,
			frag_t_final: None,
		}
	}

	/// Whether this is the browser-less startup connection that primes
	/// the manifest bootstrap request.
	pub fn is_manifest_bootstrap(&self) -> bool {
		self.browser.is_none()
	}
}

/// Maps socket identifiers to the connection (and side) they belong to,
/// and owns every live [`Connection`].
#[derive(Default)]
pub struct ConnTable {
	next_id: ConnId,
	connections: AHashMap<ConnId, Connection>,
	by_fd: AHashMap<RawFd, (ConnId, Side)>,
}

impl ConnTable {
	pub fn new() -> Self {
		Self { next_id: 1, connections: AHashMap::default(), by_fd: AHashMap::default() }
	}

	/// Register a new connection, indexing both its sockets (skipping the
	/// browser side if absent).
	pub fn insert(&mut self, conn: Connection) -> ConnId {
		let id = self.next_id;
		self.next_id += 1;

		self.by_fd.insert(as_fd(&conn.origin), (id, Side::Origin));

		if let Some(browser) = &conn.browser {
			self.by_fd.insert(as_fd(browser), (id, Side::Browser));
		}

		self.connections.insert(id, conn);
		id
	}

	pub fn get(&self, id: ConnId) -> Option<&Connection> {
		self.connections.get(&id)
	}

	pub fn get_mut(&mut self, id: ConnId) -> Option<&mut Connection> {
		self.connections.get_mut(&id)
	}

	pub fn lookup(&self, fd: RawFd) -> Option<(ConnId, Side)> {
		self.by_fd.get(&fd).copied()
	}

	pub fn ids(&self) -> impl Iterator<Item = ConnId> + '_ {
		self.connections.keys().copied()
	}

	/// Tear down a connection: both sockets are dropped (closing them),
	/// and both table slots are cleared. A missing browser side means
	/// there was never a second fd to skip-close, matching spec.md §4.5's
	/// "idempotently; skip duplicate close when browser==origin".
	pub fn remove(&mut self, id: ConnId) {
		if let Some(conn) = self.connections.remove(&id) {
			self.by_fd.remove(&as_fd(&conn.origin));

			if let Some(browser) = &conn.browser {
				self.by_fd.remove(&as_fd(browser));
			}
		}
	}
}

fn as_fd(stream: &TcpStream) -> RawFd {
	use std::os::fd::AsRawFd;
	stream.as_raw_fd()
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::net::{TcpListener, TcpStream};

	fn pair() -> (TcpStream, TcpStream) {
		let listener = TcpListener::bind("127.0.0.1:0").unwrap();
		let addr = listener.local_addr().unwrap();
		let client = TcpStream::connect(addr).unwrap();
		let (server, _) = listener.accept().unwrap();
		(client, server)
	}

	#[test]
	fn insert_indexes_both_sides() {
		let (browser, origin) = pair();
		let browser_fd = as_fd(&browser);
		let origin_fd = as_fd(&origin);

		let mut table = ConnTable::new();
		let id = table.insert(Connection::new(Some(browser), origin, "10.0.0.1".into()));

		assert_eq!(table.lookup(browser_fd), Some((id, Side::Browser)));
		assert_eq!(table.lookup(origin_fd), Some((id, Side::Origin)));
	}

	#[test]
	fn manifest_bootstrap_has_no_browser_side() {
		let (_browser, origin) = pair();
		let mut table = ConnTable::new();
		let id = table.insert(Connection::new(None, origin, "10.0.0.1".into()));

		assert!(table.get(id).unwrap().is_manifest_bootstrap());
	}

	#[test]
	fn remove_clears_both_slots() {
		let (browser, origin) = pair();
		let browser_fd = as_fd(&browser);
		let origin_fd = as_fd(&origin);

		let mut table = ConnTable::new();
		let id = table.insert(Connection::new(Some(browser), origin, "10.0.0.1".into()));
		table.remove(id);

		assert!(table.get(id).is_none());
		assert!(table.lookup(browser_fd).is_none());
		assert!(table.lookup(origin_fd).is_none());
	}
}
