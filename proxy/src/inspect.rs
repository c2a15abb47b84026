//! Origin→browser response inspection (spec.md §4.7.4): manifest
//! bitrate-list extraction and fragment throughput measurement.

use crate::bitrate::{Throughput, MAX_BITRATES};
use crate::framer::find;

/// The manifest sentinel that marks a "nolist" response as the one
/// carrying the full bitrate enumeration (spec.md §9 open question (c):
/// taken as-is, including its dependence on 500 Kbps being advertised).
const NOLIST_SENTINEL: &[u8] = b"bitrate=\"500\"";
const BITRATE_MARKER: &[u8] = b"bitrate=\"";

pub fn is_nolist_manifest(body: &[u8]) -> bool {
	find(body, NOLIST_SENTINEL).is_some()
}

/// Extract every `bitrate="<n>"` occurrence from a manifest body, capped
/// at [`MAX_BITRATES`]. Ported from `extract_bitrates_from_response`,
/// which resets the bitrate list before each re-parse rather than
/// appending to it — callers should replace, not extend, their stored
/// list with this return value.
pub fn extract_bitrates(body: &[u8]) -> Vec<u32> {
	let mut out = Vec::new();
	let mut pos = 0;

	while out.len() < MAX_BITRATES {
		let Some(rel) = find(&body[pos..], BITRATE_MARKER) else { break };
		let start = pos + rel + BITRATE_MARKER.len();
		let Some(end_rel) = find(&body[start..], b"\"") else { break };
		let end = start + end_rel;

		if let Ok(n) = std::str::from_utf8(&body[start..end]).unwrap_or_default().parse::<u32>() {
			out.push(n);
		}

		pos = end + 1;
	}

	out
}

/// One line of the proxy's activity log, emitted per forwarded fragment
/// response (spec.md §6): `epoch_s duration_s inst_kbps avg_kbps bitrate
/// origin_ip chunk_name`.
pub struct FragmentLog {
	pub epoch_secs: u64,
	pub duration_secs: f64,
	pub inst_kbps: u64,
	pub avg_kbps: u64,
	pub bitrate: u32,
	pub origin_ip: String,
	pub chunk_name: String,
}

impl FragmentLog {
	pub fn format(&self) -> String {
		format!(
			"{} {:.6} {} {} {} {} {}",
			self.epoch_secs, self.duration_secs, self.inst_kbps, self.avg_kbps, self.bitrate, self.origin_ip, self.chunk_name
		)
	}
}

/// What to do with a freshly-framed origin→browser response, and the
/// activity-log line to emit (if any).
pub enum Inspected {
	/// A nolist-manifest response: its bitrates were recorded, and it
	/// must not reach the browser.
	Drop,
	/// Everything else: forward the bytes, optionally emitting a
	/// fragment-throughput log line.
	Forward(Option<FragmentLog>),
}

/// Context a response inspection needs about the connection whose
/// fragment request it answers.
pub struct FragmentContext {
	pub expecting_video_response: bool,
	pub modified_bitrate: Option<u32>,
	pub seg: Option<u32>,
	pub frag: Option<u32>,
	pub origin_ip_text: String,
	/// Microseconds between the request leaving the proxy and this
	/// response's bytes arriving, clamped to at least 1 (spec.md §4.8).
	pub dt_micros: u64,
}

/// Apply spec.md §4.7.4's decision ladder to one framed response.
pub fn inspect_response(throughput: &mut Throughput, bitrates: &mut Vec<u32>, body: &[u8], ctx: &FragmentContext) -> Inspected {
	if is_nolist_manifest(body) {
		// `parse_response` only calls `extract_bitrates_from_response` the
		// first time: `if (bitrates_count > 0) return 0;` short-circuits a
		// second nolist manifest response without re-parsing it (spec.md
		// §9 open question (c)).
		if bitrates.is_empty() {
			*bitrates = extract_bitrates(body);
		}

		return Inspected::Drop;
	}

	if throughput.is_unset() {
		if let Some(&min) = bitrates.iter().min() {
			throughput.seed(min);
		}
		return Inspected::Forward(None);
	}

	if !ctx.expecting_video_response {
		return Inspected::Forward(None);
	}

	let frag_size = body.len() as u64;
	let inst = throughput.record(frag_size, ctx.dt_micros);

	let log = FragmentLog {
		epoch_secs: runtime::time::unix_secs() as u64,
		duration_secs: ctx.dt_micros as f64 / 1_000_000.0,
		inst_kbps: inst / 1000,
		avg_kbps: throughput.value() / 1000,
		bitrate: ctx.modified_bitrate.unwrap_or(0),
		origin_ip: ctx.origin_ip_text.clone(),
		chunk_name: format!("{}Seg{}-Frag{}", ctx.modified_bitrate.unwrap_or(0), ctx.seg.unwrap_or(0), ctx.frag.unwrap_or(0)),
	};

	Inspected::Forward(Some(log))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn nolist_manifest_populates_bitrates_and_drops() {
		let mut throughput = Throughput::new(0.5);
		let mut bitrates = Vec::new();

		let body = br#"<manifest><media bitrate="500"/><media bitrate="1000"/><media bitrate="3000"/></manifest>"#;
		let ctx = FragmentContext {
			expecting_video_response: false,
			modified_bitrate: None,
			seg: None,
			frag: None,
			origin_ip_text: "10.0.0.1".into(),
			dt_micros: 1,
		};

		let outcome = inspect_response(&mut throughput, &mut bitrates, body, &ctx);
		assert!(matches!(outcome, Inspected::Drop));
		assert_eq!(bitrates, vec![500, 1000, 3000]);
	}

	#[test]
	fn first_real_response_seeds_throughput_from_min_bitrate() {
		let mut throughput = Throughput::new(0.5);
		let mut bitrates = vec![500, 1000, 3000];

		let ctx = FragmentContext {
			expecting_video_response: false,
			modified_bitrate: None,
			seg: None,
			frag: None,
			origin_ip_text: "10.0.0.1".into(),
			dt_micros: 1,
		};

		let outcome = inspect_response(&mut throughput, &mut bitrates, b"irrelevant body", &ctx);
		assert!(matches!(outcome, Inspected::Forward(None)));
		assert_eq!(throughput.value(), 500);
	}

	#[test]
	fn fragment_response_updates_ewma_and_logs() {
		let mut throughput = Throughput::new(0.5);
		throughput.seed(500);
		// force past the "unset" branch: seed() only sets the raw value,
		// and is_unset() checks for exactly zero, so any nonzero seed works.
		let mut bitrates = vec![500, 1000];

		let ctx = FragmentContext {
			expecting_video_response: true,
			modified_bitrate: Some(1000),
			seg: Some(1),
			frag: Some(2),
			origin_ip_text: "10.0.0.1".into(),
			dt_micros: 1_000_000,
		};

		let outcome = inspect_response(&mut throughput, &mut bitrates, b"binary-fragment-bytes", &ctx);
		match outcome {
			Inspected::Forward(Some(log)) => {
				assert_eq!(log.bitrate, 1000);
				assert_eq!(log.chunk_name, "1000Seg1-Frag2");
			}
			_ => panic!("expected a fragment log line"),
		}
	}

	#[test]
	fn second_nolist_manifest_does_not_reparse() {
		let mut throughput = Throughput::new(0.5);
		let mut bitrates = Vec::new();

		let first = br#"<manifest><media bitrate="500"/><media bitrate="1000"/></manifest>"#;
		let ctx = FragmentContext {
			expecting_video_response: false,
			modified_bitrate: None,
			seg: None,
			frag: None,
			origin_ip_text: "10.0.0.1".into(),
			dt_micros: 1,
		};

		inspect_response(&mut throughput, &mut bitrates, first, &ctx);
		assert_eq!(bitrates, vec![500, 1000]);

		// A second nolist manifest response (e.g. a stray duplicate) is
		// dropped without touching the already-populated bitrate list.
		let second = br#"<manifest><media bitrate="500"/><media bitrate="3000"/></manifest>"#;
		let outcome = inspect_response(&mut throughput, &mut bitrates, second, &ctx);
		assert!(matches!(outcome, Inspected::Drop));
		assert_eq!(bitrates, vec![500, 1000]);
	}

	#[test]
	fn bitrate_extraction_is_capped() {
		let mut body = Vec::new();
		for i in 0..40 {
			body.extend_from_slice(format!(r#"<b bitrate="{i}"/>"#).as_bytes());
		}
		assert_eq!(extract_bitrates(&body).len(), MAX_BITRATES);
	}
}
