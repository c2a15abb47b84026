//! Small, single-purpose data structures shared by the proxy and nameserver.

pub mod buffer;

pub use buffer::Buffer;

/// A `HashMap` keyed with `ahash` instead of the default `SipHash`.
///
/// Connection tables and graph-node indices are keyed by small integers
/// (raw file descriptors, dense node indices) looked up on every poll
/// iteration, so a faster non-cryptographic hasher is worth the dependency.
pub type AHashMap<K, V> = std::collections::HashMap<K, V, ahash::RandomState>;
