//! A thin, blocking `poll(2)` wrapper.
//!
//! The proxy and nameserver are both single-threaded, readiness-driven
//! programs: they own their sockets directly, build a `pollfd` array once
//! per loop iteration, and decide for themselves in which order to service
//! ready descriptors. This crate supplies only the syscall plumbing —
//! `poll`, non-blocking `recv`/`send` with `WouldBlock` folded into `None` —
//! the dispatch policy itself lives in the binaries.

use std::io::{self, ErrorKind};
use std::time::Duration;

use utils::error::{Error, Result};

pub mod activity_log;
pub mod logger;
pub mod time;

pub use activity_log::ActivityLog;

#[cfg(target_family = "unix")]
mod sys {
	pub use std::os::fd::{AsRawFd, RawFd};

	pub use libc::{c_void as BufType, poll, pollfd as Poll, recv, send, POLLERR, POLLHUP, POLLIN, POLLNVAL, POLLOUT};

	pub fn as_raw<T: AsRawFd>(t: &T) -> RawFd {
		t.as_raw_fd()
	}
}

#[cfg(target_family = "windows")]
mod sys {
	pub use std::os::windows::io::AsRawSocket as AsRawFd;

	pub use u8 as BufType;
	pub use windows_sys::Win32::Networking::WinSock::{
		recv, send, WSAPoll as poll, POLLERR, POLLHUP, POLLNVAL, POLLRDNORM as POLLIN, POLLWRNORM as POLLOUT, SOCKET as RawFd, WSAPOLLFD as Poll,
	};

	pub fn as_raw<T: AsRawFd>(t: &T) -> RawFd {
		t.as_raw_socket() as _
	}
}

pub use sys::{AsRawFd, Poll, RawFd, POLLERR, POLLHUP, POLLIN, POLLNVAL, POLLOUT};

/// Build a `pollfd` entry watching `fd` for the given event mask.
pub fn watch<T: AsRawFd>(socket: &T, events: i16) -> Poll {
	Poll { fd: sys::as_raw(socket), events, revents: 0 }
}

fn as_timeout(t: Option<Duration>) -> i32 {
	t.and_then(|d| d.as_millis().try_into().ok()).unwrap_or(-1)
}

/// Block until at least one of `fds` is ready, or `timeout` elapses.
/// Returns the number of file descriptors with a non-zero `revents`.
pub fn poll(fds: &mut [Poll], timeout: Option<Duration>) -> Result<usize> {
	let ret = unsafe { sys::poll(fds.as_mut_ptr(), fds.len().try_into().expect("fewer than u32::MAX fds"), as_timeout(timeout)) };

	ret.try_into().map_err(|_| {
		let err = io::Error::last_os_error();
		log::error!("poll() failed: {err}");
		Error::Io(err)
	})
}

fn ret_to_count(val: isize) -> Result<Option<usize>> {
	match TryInto::<usize>::try_into(val) {
		Ok(n) => Ok(Some(n)),
		Err(_) => {
			let err = io::Error::last_os_error();

			if matches!(err.kind(), ErrorKind::WouldBlock) {
				return Ok(None);
			}

			Err(Error::Io(err))
		}
	}
}

/// Receive into `buf`. `Ok(None)` means the socket would have blocked;
/// `Ok(Some(0))` means the peer has performed an orderly shutdown.
pub fn recv<T: AsRawFd>(socket: &T, buf: &mut [u8]) -> Result<Option<usize>> {
	let fd = sys::as_raw(socket);
	let r = unsafe { sys::recv(fd, buf.as_mut_ptr() as *mut sys::BufType, buf.len() as _, 0) };
	ret_to_count(r as _)
}

/// Send as much of `buf` as the socket will currently accept without
/// blocking. `Ok(None)` means the socket would have blocked; otherwise the
/// number of bytes actually written is returned (which may be less than
/// `buf.len()`).
pub fn send<T: AsRawFd>(socket: &T, buf: &[u8]) -> Result<Option<usize>> {
	let fd = sys::as_raw(socket);
	let r = unsafe { sys::send(fd, buf.as_ptr() as *mut sys::BufType, buf.len() as _, 0) };
	ret_to_count(r as _)
}
