//! DNS-assisted origin connection setup (spec.md §4.6): resolve the
//! origin's address (via the configured nameserver, or a literal
//! `www_ip` override), then open a TCP connection to it that itself
//! originates from the proxy's impersonated "fake" client address.

use std::net::{Ipv4Addr, SocketAddr, TcpStream, UdpSocket};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use utils::error::{Error, Result};

use crate::config::Config;

const ORIGIN_PORT: u16 = 8080;
const DNS_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_DATAGRAM: usize = 512;

/// Query the configured nameserver for the fixed domain, from a UDP
/// socket bound to `fake_ip`, with a 5 second readiness timeout.
fn query_nameserver(fake_ip: Ipv4Addr, dns_ip: Ipv4Addr, dns_port: u16) -> Result<Ipv4Addr> {
	let socket = UdpSocket::bind(SocketAddr::from((fake_ip, 0)))?;
	socket.set_nonblocking(true)?;

	let query = dns::Message::query(0, dns::DOMAIN);
	socket.send_to(&dns::serialize(&query), SocketAddr::from((dns_ip, dns_port)))?;

	let mut fds = [runtime::watch(&socket, runtime::POLLIN)];
	let ready = runtime::poll(&mut fds, Some(DNS_TIMEOUT))?;

	if ready == 0 {
		return Err(Error::Timeout);
	}

	let mut buf = [0u8; MAX_DATAGRAM];
	let (n, _) = socket.recv_from(&mut buf)?;
	let response = dns::deserialize(&buf[..n])?;

	if response.invalid {
		return Err(Error::Protocol("nameserver rejected the fixed domain".into()));
	}

	response.ip.ok_or_else(|| Error::Protocol("DNS response carried no address".into()))
}

/// Resolve the origin's IPv4 address: the configured `www_ip` override
/// if present, otherwise a DNS query.
pub fn resolve_origin(config: &Config) -> Result<Ipv4Addr> {
	match config.www_ip {
		Some(ip) => Ok(ip),
		None => query_nameserver(config.fake_ip, config.dns_ip, config.dns_port),
	}
}

/// Open a TCP connection to `origin` at the fixed origin port, with its
/// local endpoint bound to `fake_ip` so the origin sees the proxy's
/// impersonated client address (spec.md §4.6, §4.9's "Fake IP").
pub fn connect_to_origin(fake_ip: Ipv4Addr, origin: Ipv4Addr) -> Result<TcpStream> {
	let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
	socket.bind(&SocketAddr::from((fake_ip, 0)).into())?;
	socket.connect(&SocketAddr::from((origin, ORIGIN_PORT)).into())?;
	socket.set_nonblocking(true)?;

	Ok(socket.into())
}

/// Resolve and connect to the origin in one step, returning the
/// connected stream and the peer address stringified for logging.
pub fn open_origin_connection(config: &Config) -> Result<(TcpStream, String)> {
	let origin = resolve_origin(config)?;
	let stream = connect_to_origin(config.fake_ip, origin)?;
	Ok((stream, SocketAddr::from((origin, ORIGIN_PORT)).to_string()))
}
