//! The plain per-event activity log both binaries append to, distinct
//! from the ANSI diagnostic logger in [`crate::logger`].
//!
//! Mirrors `common/log.c`'s `logSetup`/`log_printf`: the file is truncated
//! at startup (`File::create`) and every line is flushed immediately so a
//! crash does not lose the most recent event.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use utils::error::Result;

/// An append-only, flush-per-line log file.
pub struct ActivityLog {
	file: BufWriter<File>,
}

impl ActivityLog {
	/// Open `path` for writing, truncating any existing contents.
	pub fn open(path: impl AsRef<Path>) -> Result<Self> {
		let file = File::create(path)?;
		Ok(Self { file: BufWriter::new(file) })
	}

	/// Write one already-formatted line (without a trailing newline) and
	/// flush immediately.
	pub fn line(&mut self, line: &str) -> io::Result<()> {
		writeln!(self.file, "{line}")?;
		self.file.flush()
	}
}
