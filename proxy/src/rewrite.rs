//! Browser→origin request rewriting (spec.md §4.7.3): connection-header
//! downgrade, fragment detection, manifest duplication, and bitrate
//! substitution.

use crate::framer::find;

const VOD: &[u8] = b"vod/";
const SEG: &[u8] = b"Seg";
const FRAG: &[u8] = b"Frag";
const F4M: &[u8] = b".f4m";
const NOLIST: &[u8] = b"_nolist";

/// A detected `SegN-FragM` video-fragment request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment {
	pub seg: u32,
	pub frag: u32,
}

/// Downgrade `Connection: keep-alive` to `close`, or insert an explicit
/// `Connection: close` before `Accept:` if no keep-alive is present.
/// Leaves the request untouched if neither anchor exists.
///
/// Ported verbatim from `connection_alive_to_close`: the `keep-alive`
/// substring is replaced in place (not the whole header line), and the
/// `Accept:` insertion anchors on the literal header name, not a parsed
/// header list.
pub fn downgrade_connection(req: &[u8]) -> Vec<u8> {
	if let Some(pos) = find(req, b"keep-alive") {
		let mut out = Vec::with_capacity(req.len());
		out.extend_from_slice(&req[..pos]);
		out.extend_from_slice(b"close");
		out.extend_from_slice(&req[pos + b"keep-alive".len()..]);
		return out;
	}

	if let Some(pos) = find(req, b"Accept:") {
		let mut out = Vec::with_capacity(req.len() + b"Connection: close\r\n".len());
		out.extend_from_slice(&req[..pos]);
		out.extend_from_slice(b"Connection: close\r\n");
		out.extend_from_slice(&req[pos..]);
		return out;
	}

	req.to_vec()
}

/// Extract the `SegN-FragM` pair from a request URI, if both are present.
fn decimal_after(data: &[u8], marker: &[u8], terminator: &[u8]) -> Option<u32> {
	let start = find(data, marker)? + marker.len();
	let rest = &data[start..];
	let end = find(rest, terminator)?;

	std::str::from_utf8(&rest[..end]).ok()?.parse().ok()
}

pub fn detect_fragment(req: &[u8]) -> Option<Fragment> {
	let seg = decimal_after(req, SEG, b"-")?;
	let frag = decimal_after(req, FRAG, b" ")?;
	Some(Fragment { seg, frag })
}

/// Whether the request URI names a manifest (`.f4m`).
pub fn is_manifest_request(req: &[u8]) -> bool {
	find(req, F4M).is_some()
}

/// Emit the original request, a blank line, and a copy with `_nolist`
/// inserted immediately before `.f4m` — the origin sees both requests
/// back-to-back and only the `_nolist` response carries the full
/// bitrate list (spec.md §4.7.3 step 3).
pub fn duplicate_manifest_request(req: &[u8]) -> Vec<u8> {
	let pos = find(req, F4M).expect("caller already checked is_manifest_request");

	let mut out = Vec::with_capacity(2 * req.len() + 4 + NOLIST.len());
	out.extend_from_slice(req);
	out.extend_from_slice(b"\r\n\r\n");
	out.extend_from_slice(&req[..pos]);
	out.extend_from_slice(NOLIST);
	out.extend_from_slice(&req[pos..]);
	out
}

/// Replace the bitrate tag between `vod/` and `Seg` with `bitrate`'s
/// decimal form. Returns `None` if the URI doesn't contain both anchors
/// in order (caller should leave the request unmodified in that case).
pub fn substitute_bitrate(req: &[u8], bitrate: u32) -> Option<Vec<u8>> {
	let vod_end = find(req, VOD)? + VOD.len();
	let seg_start = find(&req[vod_end..], SEG)? + vod_end;

	let mut out = Vec::with_capacity(req.len());
	out.extend_from_slice(&req[..vod_end]);
	out.extend_from_slice(bitrate.to_string().as_bytes());
	out.extend_from_slice(&req[seg_start..]);
	Some(out)
}

/// The outcome of rewriting one freshly-framed browser request: the bytes
/// to forward to the origin, and (if this was a fragment request) the
/// segment/fragment numbers and the bitrate substituted in.
pub struct Rewritten {
	pub bytes: Vec<u8>,
	pub fragment: Option<(Fragment, u32)>,
}

/// Apply the full browser→origin rewrite pipeline in spec order:
/// connection downgrade, then either bitrate substitution (fragment
/// requests) or manifest duplication (non-fragment `.f4m` requests).
/// `select_bitrate` is only invoked for fragment requests, so it can
/// defer the EWMA/manifest lookup until it's known to be needed.
pub fn rewrite_request(req: &[u8], select_bitrate: impl FnOnce() -> u32) -> Rewritten {
	let req = downgrade_connection(req);

	if let Some(fragment) = detect_fragment(&req) {
		let bitrate = select_bitrate();
		let bytes = substitute_bitrate(&req, bitrate).unwrap_or(req);
		Rewritten { bytes, fragment: Some((fragment, bitrate)) }
	} else if is_manifest_request(&req) {
		Rewritten { bytes: duplicate_manifest_request(&req), fragment: None }
	} else {
		Rewritten { bytes: req, fragment: None }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn keep_alive_is_downgraded_in_place() {
		let req = b"GET / HTTP/1.1\r\nConnection: keep-alive\r\n\r\n";
		let out = downgrade_connection(req);
		assert_eq!(out, b"GET / HTTP/1.1\r\nConnection: close\r\n\r\n");
		assert_eq!(out.len() as isize - req.len() as isize, -5);
	}

	#[test]
	fn close_is_inserted_before_accept_when_no_keep_alive() {
		let req = b"GET / HTTP/1.1\r\nAccept: */*\r\n\r\n";
		let out = downgrade_connection(req);
		assert_eq!(out, b"GET / HTTP/1.1\r\nConnection: close\r\nAccept: */*\r\n\r\n");
	}

	#[test]
	fn neither_anchor_present_is_unchanged() {
		let req = b"GET / HTTP/1.1\r\nHost: a\r\n\r\n";
		assert_eq!(downgrade_connection(req), req);
	}

	#[test]
	fn manifest_request_is_duplicated_with_nolist_variant() {
		let req = b"GET /vod/foo.f4m HTTP/1.1\r\n\r\n";
		assert!(is_manifest_request(req));
		assert!(detect_fragment(req).is_none());

		let out = duplicate_manifest_request(req);
		let expected = [req.as_slice(), b"\r\n\r\n", b"GET /vod/foo_nolist.f4m HTTP/1.1\r\n\r\n"].concat();
		assert_eq!(out, expected);
	}

	#[test]
	fn fragment_request_substitutes_bitrate() {
		// `vod/` is matched exclusive of its trailing slash up to `Seg`
		// (inclusive of its own leading "500"), so the bitrate tag carries
		// no separating slash on either side — "500Seg1-Frag2", not
		// "500/Seg1-Frag2" (spec.md §4.7.3 step 4; `modfiy_bitrate` in the
		// original produces the same unseparated form).
		let req = b"GET /vod/500Seg1-Frag2 HTTP/1.1\r\n\r\n";
		let fragment = detect_fragment(req).unwrap();
		assert_eq!(fragment, Fragment { seg: 1, frag: 2 });

		let out = substitute_bitrate(req, 1000).unwrap();
		assert_eq!(out, b"GET /vod/1000Seg1-Frag2 HTTP/1.1\r\n\r\n");
	}

	#[test]
	fn rewrite_request_sets_fragment_and_bitrate() {
		let req = b"GET /vod/500Seg1-Frag2 HTTP/1.1\r\nConnection: keep-alive\r\n\r\n";
		let rewritten = rewrite_request(req, || 1000);

		assert_eq!(rewritten.bytes, b"GET /vod/1000Seg1-Frag2 HTTP/1.1\r\nConnection: close\r\n\r\n");
		assert_eq!(rewritten.fragment, Some((Fragment { seg: 1, frag: 2 }, 1000)));
	}
}
