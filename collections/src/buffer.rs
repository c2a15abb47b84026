//! A growable FIFO byte buffer.
//!
//! Mirrors the `struct buffer` used throughout the original proxy: bytes are
//! appended at the tail as they arrive from a socket, and consumed from the
//! head once a complete unit (an HTTP message, a DNS datagram) has been
//! framed out of it.

/// A growable byte queue: append at the tail, consume from the head.
#[derive(Default)]
pub struct Buffer {
	buf: Vec<u8>,
}

impl Buffer {
	/// Create an empty buffer with no backing allocation yet.
	pub fn new() -> Self {
		Self { buf: Vec::new() }
	}

	/// The number of bytes currently queued.
	pub fn len(&self) -> usize {
		self.buf.len()
	}

	/// Whether any bytes are queued.
	pub fn has_content(&self) -> bool {
		!self.buf.is_empty()
	}

	/// The number of bytes that can be appended before the backing
	/// allocation needs to grow.
	pub fn free_space(&self) -> usize {
		self.buf.capacity() - self.buf.len()
	}

	/// Append `data` to the tail of the buffer, growing the backing
	/// allocation if there isn't enough free space.
	pub fn append(&mut self, data: &[u8]) {
		if self.free_space() < data.len() {
			self.buf.reserve(data.len() - self.free_space());
		}

		self.buf.extend_from_slice(data);
	}

	/// Remove the first `n` bytes from the buffer, shifting the remainder
	/// to the front. A no-op if `n` exceeds the current content length.
	pub fn remove_content(&mut self, n: usize) {
		if n > self.buf.len() {
			return;
		}

		if n == self.buf.len() {
			self.buf.clear();
		} else {
			self.buf.drain(..n);
		}
	}

	/// Drop all queued content without releasing the backing allocation.
	pub fn clear(&mut self) {
		self.buf.clear();
	}

	/// A view of the currently queued bytes.
	pub fn as_slice(&self) -> &[u8] {
		&self.buf
	}
}

#[cfg(test)]
mod tests {
	use super::Buffer;

	#[test]
	fn append_then_remove_partial() {
		let mut buf = Buffer::new();
		buf.append(b"hello world");
		buf.remove_content(6);
		assert_eq!(buf.as_slice(), b"world");
	}

	#[test]
	fn remove_more_than_content_is_noop() {
		let mut buf = Buffer::new();
		buf.append(b"abc");
		buf.remove_content(10);
		assert_eq!(buf.as_slice(), b"abc");
	}

	#[test]
	fn remove_exact_content_clears() {
		let mut buf = Buffer::new();
		buf.append(b"abc");
		buf.remove_content(3);
		assert!(!buf.has_content());
	}

	#[test]
	fn clear_empties_without_deallocating() {
		let mut buf = Buffer::new();
		buf.append(b"abcdef");
		let cap_before = buf.free_space() + buf.len();
		buf.clear();
		assert!(!buf.has_content());
		assert_eq!(buf.free_space() + buf.len(), cap_before);
	}
}
