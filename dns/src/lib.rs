//! Codec for the restricted DNS subset the proxy and nameserver speak to
//! each other: one question, at most one A-record answer, one fixed domain.
//!
//! The wire layout (header/flags bitfields, `Cast` zero-copy structs) is
//! grounded directly on `net::dns::Resolver`'s query builder and response
//! parser; this crate generalizes it to also serialize responses and to
//! report (rather than assert away) a name mismatch.

use core::net::Ipv4Addr;

use bilge::prelude::*;
use utils::bytes::{cast, Cast};
use utils::endian::{u16be, u32be, BigEndian};
use utils::error::{Error, Result};

/// The one hostname this system resolves.
pub const DOMAIN: &str = "video.cs.cmu.edu";

const TY_A: u16 = 1;
const CLASS_IN: u16 = 1;

const HEADER_LEN: usize = 12;
const RR_LEN: usize = 10;

/// Length of a serialized Query message (header + question, for the fixed domain).
pub const REQUEST_LEN: usize = HEADER_LEN + DOMAIN_NAME_LEN + 4;
/// Length of a serialized valid Response (header + question + answer, for the fixed domain).
pub const RESPONSE_LEN: usize = HEADER_LEN + DOMAIN_NAME_LEN + 4 + DOMAIN_NAME_LEN + RR_LEN + 4;
/// Length of a serialized invalid Response: header only.
pub const INVALID_LEN: usize = HEADER_LEN;

const DOMAIN_NAME_LEN: usize = 18;

#[bitsize(4)]
#[derive(FromBits)]
enum Opcode {
	/// a standard query
	Query = 0,
	/// an inverse query
	IQuery = 1,
	/// a server status request
	Status = 2,
	#[fallback]
	Reserved,
}

#[bitsize(4)]
#[derive(FromBits)]
enum Rcode {
	/// No error condition
	Ok = 0,
	FormatErr = 1,
	ServerFailure = 2,
	/// The queried name does not exist (our stand-in for "wrong domain").
	NameErr = 3,
	NotImplemented = 4,
	Refused = 5,
	#[fallback]
	Reserved,
}

#[bitsize(16)]
#[derive(FromBits)]
struct Flags {
	rcode: Rcode,
	z: u3,
	ra: bool,
	rd: bool,
	tc: bool,
	aa: bool,
	opcode: Opcode,
	/// false = query, true = response.
	qr: bool,
}

/// The 12-byte DNS header, present in every message.
#[derive(Cast)]
#[repr(C)]
struct Header {
	id: u16be,
	flags: BigEndian<Flags>,
	qdcount: u16be,
	ancount: u16be,
	nscount: u16be,
	arcount: u16be,
}

/// The fixed part of a resource record, preceding its RDATA.
#[derive(Cast)]
#[repr(C)]
struct RR {
	ty: u16be,
	class: u16be,
	ttl: u32be,
	rdlength: u16be,
}

/// Whether a message is a request or a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
	Query,
	Response,
}

/// A decoded DNS message: either a Query for a name, or a Response that is
/// either a resolved A record or a "no such name" rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
	pub id: u16,
	pub kind: Kind,
	pub invalid: bool,
	/// The queried name. Present for every Query, and for a valid Response
	/// (which echoes the question section back).
	pub name: Option<String>,
	/// The resolved address. Present only for a valid Response.
	pub ip: Option<Ipv4Addr>,
}

impl Message {
	/// Build a Query for `name`.
	pub fn query(id: u16, name: impl Into<String>) -> Self {
		Self { id, kind: Kind::Query, invalid: false, name: Some(name.into()), ip: None }
	}

	/// Build a Response resolving `name` to `ip`.
	pub fn response(id: u16, name: impl Into<String>, ip: Ipv4Addr) -> Self {
		Self { id, kind: Kind::Response, invalid: false, name: Some(name.into()), ip: Some(ip) }
	}

	/// Build a Response rejecting the query (wrong domain).
	pub fn response_invalid(id: u16) -> Self {
		Self { id, kind: Kind::Response, invalid: true, name: None, ip: None }
	}
}

fn encode_name(buf: &mut Vec<u8>, name: &str) {
	for label in name.split('.') {
		let bytes = label.as_bytes();
		assert!(bytes.len() <= 63, "DNS labels are limited to 63 octets");

		buf.push(bytes.len() as u8);
		buf.extend_from_slice(bytes);
	}

	buf.push(0);
}

fn decode_name(buf: &[u8]) -> Result<(String, usize)> {
	let mut labels = Vec::new();
	let mut pos = 0;

	loop {
		let len = *buf
			.get(pos)
			.ok_or_else(|| Error::Parse("DNS message truncated while reading a name".into()))? as usize;

		pos += 1;

		if len == 0 {
			break;
		}

		let label = buf
			.get(pos..pos + len)
			.ok_or_else(|| Error::Parse("DNS message truncated while reading a label".into()))?;

		labels.push(
			std::str::from_utf8(label)
				.map_err(|_| Error::Parse("DNS label was not valid UTF-8".into()))?
				.to_owned(),
		);

		pos += len;
	}

	Ok((labels.join("."), pos))
}

fn push_header(buf: &mut Vec<u8>, id: u16, qr: bool, rcode: Rcode, qdcount: u16, ancount: u16) {
	// AA is set exactly on responses; RD/RA/TC/Z carry no meaning in this
	// restricted subset, so they are left at zero.
	let flags = Flags::new(rcode, u3::new(0), false, false, false, qr, Opcode::Query, qr);

	buf.extend_from_slice(&id.to_be_bytes());
	buf.extend_from_slice(&u16::from(flags).to_be_bytes());
	buf.extend_from_slice(&qdcount.to_be_bytes());
	buf.extend_from_slice(&ancount.to_be_bytes());
	buf.extend_from_slice(&0u16.to_be_bytes());
	buf.extend_from_slice(&0u16.to_be_bytes());
}

/// Serialize a Message to its wire form.
pub fn serialize(msg: &Message) -> Vec<u8> {
	match (msg.kind, msg.invalid) {
		(Kind::Query, _) => {
			let name = msg.name.as_deref().expect("a Query always carries a name");

			let mut buf = Vec::with_capacity(REQUEST_LEN);
			push_header(&mut buf, msg.id, false, Rcode::Ok, 1, 0);
			encode_name(&mut buf, name);
			buf.extend_from_slice(&TY_A.to_be_bytes());
			buf.extend_from_slice(&CLASS_IN.to_be_bytes());

			assert_eq!(buf.len(), REQUEST_LEN, "serialized query length invariant violated");
			buf
		}
		(Kind::Response, true) => {
			let mut buf = Vec::with_capacity(INVALID_LEN);
			push_header(&mut buf, msg.id, true, Rcode::NameErr, 0, 0);

			assert_eq!(buf.len(), INVALID_LEN, "serialized invalid-response length invariant violated");
			buf
		}
		(Kind::Response, false) => {
			let name = msg.name.as_deref().expect("a valid Response always carries a name");
			let ip = msg.ip.expect("a valid Response always carries an address");

			let mut buf = Vec::with_capacity(RESPONSE_LEN);
			push_header(&mut buf, msg.id, true, Rcode::Ok, 1, 1);
			encode_name(&mut buf, name);
			buf.extend_from_slice(&TY_A.to_be_bytes());
			buf.extend_from_slice(&CLASS_IN.to_be_bytes());
			encode_name(&mut buf, name);
			buf.extend_from_slice(&TY_A.to_be_bytes());
			buf.extend_from_slice(&CLASS_IN.to_be_bytes());
			buf.extend_from_slice(&0u32.to_be_bytes());
			buf.extend_from_slice(&4u16.to_be_bytes());
			buf.extend_from_slice(&ip.octets());

			assert_eq!(buf.len(), RESPONSE_LEN, "serialized response length invariant violated");
			buf
		}
	}
}

/// Deserialize a wire-format DNS message, validating structural invariants
/// but not the queried domain — callers compare `name` against [`DOMAIN`]
/// themselves to decide whether the query is in-scope.
pub fn deserialize(buf: &[u8]) -> Result<Message> {
	if buf.len() < HEADER_LEN {
		return Err(Error::Parse("DNS message shorter than a header".into()));
	}

	let header: &Header = cast(&buf[..HEADER_LEN]);
	let flags = header.flags.get();

	let id = header.id.get();
	let kind = if flags.qr() { Kind::Response } else { Kind::Query };
	let invalid = matches!(flags.rcode(), Rcode::NameErr);

	let mut pos = HEADER_LEN;

	let name = if header.qdcount.get() == 1 {
		let (name, len) = decode_name(&buf[pos..])?;
		pos += len + 4;
		Some(name)
	} else {
		None
	};

	let ip = if header.ancount.get() == 1 {
		let (_rname, len) = decode_name(&buf[pos..])?;
		pos += len;

		let rr: &RR = cast(buf.get(pos..pos + RR_LEN).ok_or_else(|| Error::Parse("DNS message truncated before its answer".into()))?);

		if rr.ty.get() != TY_A || rr.class.get() != CLASS_IN || rr.rdlength.get() != 4 {
			return Err(Error::Protocol("unexpected resource record in DNS answer".into()));
		}

		pos += RR_LEN;

		let octets = buf.get(pos..pos + 4).ok_or_else(|| Error::Parse("DNS message truncated before its address".into()))?;
		Some(Ipv4Addr::new(octets[0], octets[1], octets[2], octets[3]))
	} else {
		None
	};

	Ok(Message { id, kind, invalid, name, ip })
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn query_round_trips() {
		let msg = Message::query(0x1234, DOMAIN);
		let bytes = serialize(&msg);
		assert_eq!(bytes.len(), REQUEST_LEN);
		assert_eq!(deserialize(&bytes).unwrap(), msg);
	}

	#[test]
	fn valid_response_round_trips() {
		let msg = Message::response(7, DOMAIN, Ipv4Addr::new(10, 0, 0, 1));
		let bytes = serialize(&msg);
		assert_eq!(bytes.len(), RESPONSE_LEN);
		assert_eq!(deserialize(&bytes).unwrap(), msg);
	}

	#[test]
	fn invalid_response_round_trips() {
		let msg = Message::response_invalid(9);
		let bytes = serialize(&msg);
		assert_eq!(bytes.len(), INVALID_LEN);
		assert_eq!(deserialize(&bytes).unwrap(), msg);
	}

	#[test]
	fn foreign_name_is_distinguishable() {
		let msg = Message::query(1, "example.com");
		let bytes = serialize(&msg);
		let decoded = deserialize(&bytes).unwrap();
		assert_ne!(decoded.name.as_deref(), Some(DOMAIN));
	}

	#[test]
	fn fixed_domain_encodes_to_eighteen_bytes() {
		let mut buf = Vec::new();
		encode_name(&mut buf, DOMAIN);
		assert_eq!(buf.len(), DOMAIN_NAME_LEN);
	}
}
