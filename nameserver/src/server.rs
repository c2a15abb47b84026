//! The UDP request/response loop (spec.md §4.10): receive a datagram,
//! resolve a server, reply, and append one activity-log line per query.

use std::net::{SocketAddr, UdpSocket};

use runtime::ActivityLog;
use utils::error::Result;

use crate::state::State;

const MAX_DATAGRAM: usize = 512;

/// Handle one received datagram, returning the reply bytes to send back
/// to `peer`, or `None` if the query should be silently dropped. A
/// resolution failure (unreachable client, no server ever reached) is
/// not such a case — `State::resolve` answers with the `0.0.0.0`
/// sentinel instead (spec.md §4.4), so only a non-IPv4 peer or a
/// malformed query drops silently.
pub fn handle_datagram(state: &mut State, activity_log: &mut ActivityLog, buf: &[u8], peer: SocketAddr) -> Result<Option<Vec<u8>>> {
	let SocketAddr::V4(peer) = peer else {
		log::warn!("dropping query from non-IPv4 peer {peer}");
		return Ok(None);
	};

	let query = dns::deserialize(buf)?;

	let Some(chosen) = state.resolve(*peer.ip()) else {
		log::warn!("no server could be resolved for client {}", peer.ip());
		return Ok(None);
	};

	let name_valid = query.name.as_deref() == Some(dns::DOMAIN);

	let response = if name_valid {
		dns::Message::response(query.id, dns::DOMAIN, chosen)
	} else {
		dns::Message::response_invalid(query.id)
	};

	activity_log.line(&format!("{:.6} {} {} {}", runtime::time::unix_secs(), peer.ip(), dns::DOMAIN, chosen))?;

	Ok(Some(dns::serialize(&response)))
}

/// Run the receive loop forever: block on the socket's readiness (no
/// timeout, per spec.md §5), then service exactly one datagram per wake.
pub fn run(socket: &UdpSocket, state: &mut State, activity_log: &mut ActivityLog) -> Result<()> {
	let mut buf = [0u8; MAX_DATAGRAM];

	loop {
		let mut fds = [runtime::watch(socket, runtime::POLLIN)];
		runtime::poll(&mut fds, None)?;

		let (n, peer) = match socket.recv_from(&mut buf) {
			Ok(pair) => pair,
			Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => continue,
			Err(err) => return Err(err.into()),
		};

		match handle_datagram(state, activity_log, &buf[..n], peer) {
			Ok(Some(reply)) => {
				if let Err(err) = socket.send_to(&reply, peer) {
					log::warn!("failed to send reply to {peer}: {err}");
				}
			}
			Ok(None) => {}
			Err(err) => log::warn!("dropping malformed query from {peer}: {err}"),
		}
	}
}

#[cfg(test)]
mod tests {
	use std::net::Ipv4Addr;

	use super::*;
	use crate::config::Mode;

	fn peer(ip: &str) -> SocketAddr {
		SocketAddr::new(ip.parse::<Ipv4Addr>().unwrap().into(), 5000)
	}

	#[test]
	fn valid_domain_query_resolves() {
		let mut state = State::new(Mode::RoundRobin, vec!["10.0.0.1".into()], None).unwrap();
		let mut log = tempfile_log();

		let query = dns::Message::query(42, dns::DOMAIN);
		let bytes = dns::serialize(&query);

		let reply = handle_datagram(&mut state, &mut log, &bytes, peer("192.168.1.1")).unwrap().unwrap();
		let decoded = dns::deserialize(&reply).unwrap();

		assert!(!decoded.invalid);
		assert_eq!(decoded.ip, Some("10.0.0.1".parse().unwrap()));
		assert_eq!(decoded.id, 42);
	}

	#[test]
	fn foreign_domain_query_is_marked_invalid() {
		let mut state = State::new(Mode::RoundRobin, vec!["10.0.0.1".into()], None).unwrap();
		let mut log = tempfile_log();

		let query = dns::Message::query(1, "example.com");
		let bytes = dns::serialize(&query);

		let reply = handle_datagram(&mut state, &mut log, &bytes, peer("192.168.1.1")).unwrap().unwrap();
		let decoded = dns::deserialize(&reply).unwrap();

		assert!(decoded.invalid);
	}

	fn tempfile_log() -> ActivityLog {
		use std::sync::atomic::{AtomicU32, Ordering};
		static COUNTER: AtomicU32 = AtomicU32::new(0);

		let path = std::env::temp_dir().join(format!(
			"nameserver-test-{}-{}.log",
			std::process::id(),
			COUNTER.fetch_add(1, Ordering::Relaxed)
		));
		ActivityLog::open(path).unwrap()
	}
}
