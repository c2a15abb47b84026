use core::fmt;
use std::io;

/// The kinds of failure the proxy and nameserver can report.
///
/// Mirrors the error taxonomy the original implementation signalled through
/// return codes and `errno`: allocation failure, malformed input, I/O
/// failure, protocol violation, a timed-out operation, and bad configuration.
#[derive(Debug)]
pub enum Error {
	/// A buffer or table could not grow to hold more data.
	OutOfMemory,
	/// Malformed input that could not be parsed (an LSA line, a DNS message, an HTTP header).
	Parse(String),
	/// A syscall or I/O operation failed.
	Io(io::Error),
	/// Well-formed input that violated a protocol invariant.
	Protocol(String),
	/// An operation did not complete within its allotted time.
	Timeout,
	/// Invalid or missing configuration (CLI arguments, files).
	Config(String),
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Error::OutOfMemory => write!(f, "out of memory"),
			Error::Parse(msg) => write!(f, "parse error: {msg}"),
			Error::Io(err) => write!(f, "i/o error: {err}"),
			Error::Protocol(msg) => write!(f, "protocol error: {msg}"),
			Error::Timeout => write!(f, "operation timed out"),
			Error::Config(msg) => write!(f, "configuration error: {msg}"),
		}
	}
}

impl std::error::Error for Error {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Error::Io(err) => Some(err),
			_ => None,
		}
	}
}

impl From<io::Error> for Error {
	fn from(err: io::Error) -> Self {
		Error::Io(err)
	}
}

pub type Result<T = ()> = result::Result<T, Error>;

#[doc(hidden)]
pub trait Ext<T, E> {
	fn ok_or(self, f: impl FnOnce(E)) -> Option<T>;
}

impl<T, E> Ext<T, E> for result::Result<T, E> {
	fn ok_or(self, f: impl FnOnce(E)) -> Option<T> {
		match self {
			Ok(v) => Some(v),
			Err(e) => {
				f(e);
				None
			}
		}
	}
}

#[doc(hidden)]
pub trait ExtOpaque<T> {
	fn some_or(self, f: impl FnOnce()) -> Option<T>;
}

impl<T> ExtOpaque<T> for Option<T> {
	fn some_or(self, f: impl FnOnce()) -> Option<T> {
		match self {
			Some(_) => {}
			None => f(),
		}

		self
	}
}

use core::result;

pub use Ext as _;
