//! EWMA throughput tracking and the "highest advertised bitrate ≤ 2·T/3"
//! selection rule (spec.md §4.8, §4.9).

/// Advertised manifest bitrates are capped at this count
/// (`MAX_BITRATES_NUM` in `bitrate.c`).
pub const MAX_BITRATES: usize = 32;

/// A process-wide exponentially-weighted moving average of measured
/// fragment throughput, in bits/sec.
pub struct Throughput {
	alpha: f64,
	/// Zero means "never sampled yet" — the sentinel spec.md §4.7.4 checks
	/// before the first real EWMA update.
	t: u64,
}

impl Throughput {
	pub fn new(alpha: f64) -> Self {
		Self { alpha, t: 0 }
	}

	pub fn value(&self) -> u64 {
		self.t
	}

	pub fn is_unset(&self) -> bool {
		self.t == 0
	}

	/// Prime `T` from the lowest advertised bitrate, the first time a
	/// throughput-dependent decision is needed and no sample has landed
	/// yet. Preserved verbatim from `bitrate.c`: the assignment takes the
	/// raw Kbps number with no ×1000 conversion, even though `T` is
	/// nominally bits/sec everywhere else — a unit quirk of the source,
	/// not a bug to silently fix.
	pub fn seed(&mut self, min_bitrate_kbps: u32) {
		self.t = min_bitrate_kbps as u64;
	}

	/// Fold one instantaneous throughput sample (bits/sec) into the EWMA,
	/// returning the instantaneous value that was folded in.
	pub fn record(&mut self, frag_size_bytes: u64, dt_micros: u64) -> u64 {
		let dt = dt_micros.max(1);
		let inst = (frag_size_bytes * 8 * 1_000_000) / dt;

		self.t = (self.alpha * inst as f64 + (1.0 - self.alpha) * self.t as f64).floor() as u64;
		inst
	}
}

/// Choose the highest advertised bitrate not exceeding `2·T/3` (expressed
/// in Kbps); if none qualify, fall back to the lowest advertised bitrate.
pub fn select(bitrates: &[u32], t: u64) -> u32 {
	assert!(!bitrates.is_empty(), "bitrate selection requires a non-empty manifest");

	let target_bps = (2 * t) / 3;
	let target_kbps = target_bps / 1000;

	bitrates
		.iter()
		.copied()
		.filter(|&b| (b as u64) <= target_kbps)
		.max()
		.unwrap_or_else(|| *bitrates.iter().min().unwrap())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn selects_highest_bitrate_at_or_below_target() {
		let bitrates = [500, 1000, 3000];
		assert_eq!(select(&bitrates, 4_500_000), 3000);
		assert_eq!(select(&bitrates, 1_500_000), 1000);
	}

	#[test]
	fn falls_back_to_lowest_when_below_all() {
		let bitrates = [500, 1000, 3000];
		assert_eq!(select(&bitrates, 300_000), 500);
	}

	#[test]
	fn ewma_update_matches_formula() {
		let mut t = Throughput::new(0.5);
		t.t = 1000;
		// frag_size chosen so inst == 3000 bits/sec exactly: (f*8*1e6)/1e6 = f*8 = 3000 => f=375
		let inst = t.record(375, 1_000_000);
		assert_eq!(inst, 3000);
		assert_eq!(t.value(), 2000);
	}

	#[test]
	fn unset_until_first_sample() {
		let t = Throughput::new(0.5);
		assert!(t.is_unset());
	}
}
