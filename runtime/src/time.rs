//! Wall-clock helpers.
//!
//! The original implementation's `mytime_t` is a microsecond-resolution
//! `gettimeofday` reading used both to time fragment transfers and to stamp
//! activity log lines. `std::time::SystemTime` gives the same resolution
//! without the raw syscall.

use std::time::{SystemTime, UNIX_EPOCH};

/// Microseconds since the UNIX epoch, matching `microtime()`.
pub fn micros() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("the current time should be after the UNIX epoch")
		.as_micros()
		.try_into()
		.expect("microsecond timestamp should fit in a u64")
}

/// Seconds since the UNIX epoch, as used in activity log timestamps.
pub fn unix_secs() -> f64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("the current time should be after the UNIX epoch")
		.as_secs_f64()
}
