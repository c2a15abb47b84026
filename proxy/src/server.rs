//! The single-threaded, readiness-multiplexed event loop (spec.md §4.5):
//! accept browser connections, open their paired origin connection,
//! frame and rewrite bytes in both directions, and forward them.

use std::net::{TcpListener, TcpStream};
use std::os::fd::RawFd;

use collections::Buffer;
use runtime::ActivityLog;
use utils::error::{Error, Result};

use crate::bitrate::{self, Throughput};
use crate::config::Config;
use crate::connection::{ConnId, ConnTable, Connection, Side};
use crate::{dns_client, framer, inspect, rewrite};

const RECV_CHUNK: usize = 4096;

/// The literal manifest bootstrap request (spec.md §4.6) — byte-exact,
/// including the double space after the path, which is preserved rather
/// than "fixed" as a typo.
pub const MANIFEST_REQUEST: &[u8] = b"GET /vod/big_buck_bunny.f4m  HTTP/1.0\r\nConnection: close\r\n\r\n";

/// Process-wide adaptive-bitrate state, shared across every connection
/// (spec.md §3): the EWMA throughput estimate and the manifest's
/// advertised bitrate list.
pub struct ProxyState {
	pub throughput: Throughput,
	pub bitrates: Vec<u32>,
}

impl ProxyState {
	pub fn new(alpha: f64) -> Self {
		Self { throughput: Throughput::new(alpha), bitrates: Vec::new() }
	}
}

/// Open the browser-less startup connection and prime it with the
/// hard-coded manifest bootstrap request, before the event loop starts
/// (spec.md §4.6). Failure here is startup-fatal.
pub fn bootstrap_manifest(config: &Config, table: &mut ConnTable) -> Result<()> {
	let (origin, origin_ip_text) = dns_client::open_origin_connection(config)?;

	let mut conn = Connection::new(None, origin, origin_ip_text);
	conn.origin_out.append(MANIFEST_REQUEST);
	table.insert(conn);

	Ok(())
}

fn accept_connection(listener: &TcpListener, config: &Config, table: &mut ConnTable) {
	let (browser, _addr) = match listener.accept() {
		Ok(pair) => pair,
		Err(err) => {
			log::warn!("accept() failed: {err}");
			return;
		}
	};

	if let Err(err) = browser.set_nonblocking(true) {
		log::warn!("failed to set the accepted socket nonblocking: {err}");
		return;
	}

	// A DNS failure or refused connection here aborts only this
	// browser's connection, not the proxy (spec.md §4.11) — the browser
	// socket is simply dropped, closing it.
	match dns_client::open_origin_connection(config) {
		Ok((origin, origin_ip_text)) => {
			table.insert(Connection::new(Some(browser), origin, origin_ip_text));
		}
		Err(err) => log::warn!("failed to open an origin connection for an accepted browser: {err}"),
	}
}

/// Whether an I/O error is one of the "peer is gone" cases spec.md §4.11
/// calls out by name, versus anything else (still torn down, but logged
/// at a different level since it's unexpected).
fn is_expected_teardown(err: &std::io::Error) -> bool {
	use std::io::ErrorKind::*;
	matches!(err.kind(), BrokenPipe | ConnectionReset | ConnectionAborted | NotConnected)
}

fn log_io_failure(what: &str, id: ConnId, err: &Error) {
	if let Error::Io(io_err) = err {
		if is_expected_teardown(io_err) {
			log::debug!("connection {id} closed during {what}: {io_err}");
			return;
		}
	}

	log::warn!("connection {id} torn down during {what}: {err}");
}

/// Flush as much of `buf` as a single non-blocking send will accept,
/// retaining any remainder (spec.md §4.11: partial sends stay queued for
/// the next writability). Returns whether any bytes were actually sent.
fn flush(stream: &TcpStream, buf: &mut Buffer) -> Result<bool> {
	match runtime::send(stream, buf.as_slice())? {
		Some(n) => {
			buf.remove_content(n);
			Ok(n > 0)
		}
		None => Ok(false),
	}
}

/// Service write-readiness for one side of a connection. Returns `false`
/// if the connection should be torn down.
fn handle_writable(table: &mut ConnTable, id: ConnId, side: Side) -> bool {
	let Some(conn) = table.get_mut(id) else { return false };

	let result = match side {
		Side::Origin => flush(&conn.origin, &mut conn.origin_out),
		Side::Browser => match &conn.browser {
			Some(browser) => flush(browser, &mut conn.browser_out),
			None => Ok(false),
		},
	};

	match result {
		Ok(sent) => {
			// t_start anchors the next fragment-RTT measurement: the
			// moment a request byte most recently left the proxy toward
			// the origin (spec.md §4.5, §4.8).
			if sent && side == Side::Origin {
				conn.frag_t_start = Some(runtime::time::micros());
			}

			true
		}
		Err(err) => {
			log_io_failure("send", id, &err);
			false
		}
	}
}

fn on_browser_bytes(conn: &mut Connection, bytes: &[u8], proxy: &mut ProxyState) {
	conn.request_recv.append(bytes);

	while let Some(msg) = framer::try_frame(&mut conn.request_recv) {
		let rewritten = rewrite::rewrite_request(&msg, || bitrate::select(&proxy.bitrates, proxy.throughput.value()));

		if let Some((fragment, chosen)) = rewritten.fragment {
			conn.modified_bitrate = Some(chosen);
			conn.seg = Some(fragment.seg);
			conn.frag = Some(fragment.frag);
			conn.expecting_video_response = true;
		}

		conn.origin_out.append(&rewritten.bytes);
	}
}

fn on_origin_bytes(conn: &mut Connection, bytes: &[u8], proxy: &mut ProxyState, activity_log: &mut ActivityLog) -> Result<()> {
	conn.response_recv.append(bytes);
	// t_final: the moment origin bytes arrived that (may) trigger framing
	// of the in-flight fragment response (spec.md §4.8).
	conn.frag_t_final = Some(runtime::time::micros());

	while let Some(msg) = framer::try_frame(&mut conn.response_recv) {
		let (_, body) = framer::split_message(&msg);

		let dt = match (conn.frag_t_start, conn.frag_t_final) {
			(Some(start), Some(end)) => end.saturating_sub(start).max(1),
			_ => 1,
		};

		let ctx = inspect::FragmentContext {
			expecting_video_response: conn.expecting_video_response,
			modified_bitrate: conn.modified_bitrate,
			seg: conn.seg,
			frag: conn.frag,
			origin_ip_text: conn.origin_ip_text.clone(),
			dt_micros: dt,
		};

		match inspect::inspect_response(&mut proxy.throughput, &mut proxy.bitrates, body, &ctx) {
			inspect::Inspected::Drop => {}
			inspect::Inspected::Forward(log) => {
				if let Some(log) = log {
					activity_log.line(&log.format())?;
					conn.expecting_video_response = false;
				}

				conn.browser_out.append(&msg);
			}
		}
	}

	Ok(())
}

/// Service read-readiness for one side of a connection. Returns `false`
/// if the connection should be torn down.
fn handle_readable(table: &mut ConnTable, proxy: &mut ProxyState, activity_log: &mut ActivityLog, id: ConnId, side: Side) -> bool {
	let Some(conn) = table.get_mut(id) else { return false };

	let stream = match side {
		Side::Browser => conn.browser.as_ref(),
		Side::Origin => Some(&conn.origin),
	};

	let Some(stream) = stream else { return true };

	let mut buf = [0u8; RECV_CHUNK];

	match runtime::recv(stream, &mut buf) {
		Ok(Some(0)) => !(!conn.browser_out.has_content() && !conn.origin_out.has_content()),
		Ok(Some(n)) => {
			match side {
				Side::Browser => on_browser_bytes(conn, &buf[..n], proxy),
				Side::Origin => {
					if let Err(err) = on_origin_bytes(conn, &buf[..n], proxy, activity_log) {
						log::warn!("failed to process an origin response on connection {id}: {err}");
					}
				}
			}

			true
		}
		Ok(None) => true,
		Err(err) => {
			log_io_failure("recv", id, &err);
			false
		}
	}
}

/// Run the event loop forever. Returns only on a fatal I/O error from
/// `poll` itself.
pub fn run(listener: &TcpListener, config: &Config, table: &mut ConnTable, proxy: &mut ProxyState, activity_log: &mut ActivityLog) -> Result<()> {
	let listener_fd = {
		use runtime::AsRawFd;
		listener.as_raw_fd()
	};

	loop {
		let mut poll_fds = vec![runtime::watch(listener, runtime::POLLIN)];

		for id in table.ids().collect::<Vec<_>>() {
			let conn = table.get(id).expect("id came from a live iteration of the table");

			let origin_events = runtime::POLLIN | if conn.origin_out.has_content() { runtime::POLLOUT } else { 0 };
			poll_fds.push(runtime::watch(&conn.origin, origin_events));

			if let Some(browser) = &conn.browser {
				let browser_events = runtime::POLLIN | if conn.browser_out.has_content() { runtime::POLLOUT } else { 0 };
				poll_fds.push(runtime::watch(browser, browser_events));
			}
		}

		runtime::poll(&mut poll_fds, None)?;

		let mut ready: Vec<(RawFd, i16)> = poll_fds.into_iter().filter(|p| p.revents != 0).map(|p| (p.fd, p.revents)).collect();

		// Descending fd order, so write-readiness is serviced ahead of
		// read-readiness across different sockets too (spec.md §4.5,
		// §5's approximate fairness policy).
		ready.sort_by(|a, b| b.0.cmp(&a.0));

		let mut to_remove = Vec::new();

		for (fd, revents) in ready {
			if fd == listener_fd {
				if revents & runtime::POLLIN != 0 {
					accept_connection(listener, config, table);
				}
				continue;
			}

			// The table's fd index is the source of truth for which
			// connection (and side) a ready socket belongs to; a miss
			// means it was already torn down earlier in this same pass.
			let Some((id, side)) = table.lookup(fd) else { continue };
			let mut keep = true;

			// Write-readiness before read-readiness for the same
			// socket, in the same iteration (spec.md §4.5, §5).
			if revents & runtime::POLLOUT != 0 {
				keep = handle_writable(table, id, side);
			}

			if keep && revents & runtime::POLLIN != 0 {
				keep = handle_readable(table, proxy, activity_log, id, side);
			}

			if !keep {
				to_remove.push(id);
			}
		}

		for id in to_remove {
			table.remove(id);
		}
	}
}
