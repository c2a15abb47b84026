//! Accumulates raw bytes from a peer and emits exactly one complete HTTP
//! message at a time (spec.md §4.7.1, §4.7.2).
//!
//! Only the subset of HTTP/1.x needed to frame a request or response is
//! understood: a `\r\n\r\n`-terminated header, and an optional
//! `Content-Length` line giving the body size. Anything else in the
//! header (method, status line, other fields) is opaque and passed
//! through untouched.

use collections::Buffer;

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";
const CONTENT_LENGTH: &[u8] = b"Content-Length: ";

/// Find the first occurrence of `needle` in `haystack`.
pub fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
	if needle.is_empty() || haystack.len() < needle.len() {
		return None;
	}

	haystack.windows(needle.len()).position(|w| w == needle)
}

/// The declared `Content-Length` of a header block, or 0 if absent — per
/// spec.md §9 open question (a), a header with no `Content-Length` is
/// always treated as a zero-length body, even if more bytes are actually
/// buffered after it (those bytes begin the next pipelined message).
fn content_length(header: &[u8]) -> usize {
	let Some(pos) = find(header, CONTENT_LENGTH) else { return 0 };
	let rest = &header[pos + CONTENT_LENGTH.len()..];
	let end = find(rest, b"\r\n").unwrap_or(rest.len());

	std::str::from_utf8(&rest[..end]).ok().and_then(|s| s.trim().parse().ok()).unwrap_or(0)
}

/// Attempt to frame exactly one complete message off the front of `recv`.
/// On success, the framed bytes are removed from `recv` (the remainder
/// shifts forward, available for the next call) and returned.
pub fn try_frame(recv: &mut Buffer) -> Option<Vec<u8>> {
	let data = recv.as_slice();
	let header_end = find(data, HEADER_TERMINATOR)?;
	let header_length = header_end + HEADER_TERMINATOR.len();
	let body_length = content_length(&data[..header_end]);
	let total = header_length + body_length;

	if data.len() < total {
		return None;
	}

	let message = data[..total].to_vec();
	recv.remove_content(total);
	Some(message)
}

/// Split a framed message into its header block (without the trailing
/// `\r\n\r\n`) and its body.
pub fn split_message(msg: &[u8]) -> (&[u8], &[u8]) {
	match find(msg, HEADER_TERMINATOR) {
		Some(header_end) => (&msg[..header_end], &msg[header_end + HEADER_TERMINATOR.len()..]),
		None => (msg, &[]),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn frames_a_header_only_message() {
		let mut buf = Buffer::new();
		buf.append(b"GET /x HTTP/1.1\r\nHost: a\r\n\r\n");

		let msg = try_frame(&mut buf).unwrap();
		assert_eq!(msg, b"GET /x HTTP/1.1\r\nHost: a\r\n\r\n");
		assert!(!buf.has_content());
	}

	#[test]
	fn waits_for_the_full_body() {
		let mut buf = Buffer::new();
		buf.append(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhel");
		assert!(try_frame(&mut buf).is_none());

		buf.append(b"lo");
		let msg = try_frame(&mut buf).unwrap();
		assert_eq!(msg, b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello");
	}

	#[test]
	fn frames_two_pipelined_messages_independently() {
		let mut buf = Buffer::new();
		buf.append(b"GET /a HTTP/1.1\r\n\r\nGET /b HTTP/1.1\r\n\r\n");

		let first = try_frame(&mut buf).unwrap();
		assert_eq!(first, b"GET /a HTTP/1.1\r\n\r\n");

		let second = try_frame(&mut buf).unwrap();
		assert_eq!(second, b"GET /b HTTP/1.1\r\n\r\n");

		assert!(!buf.has_content());
	}

	#[test]
	fn body_without_content_length_is_not_waited_for() {
		let mut buf = Buffer::new();
		buf.append(b"GET /a HTTP/1.1\r\n\r\nextra-bytes-for-the-next-message");

		let msg = try_frame(&mut buf).unwrap();
		assert_eq!(msg, b"GET /a HTTP/1.1\r\n\r\n");
		assert!(buf.has_content());
	}
}
