// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for token cache activity.
#[derive(Debug, Default)]
pub struct TokenMetrics {
	exchanges: AtomicU64,
	cache_hits: AtomicU64,
	failures: AtomicU64,
	invalidations: AtomicU64,
}
impl TokenMetrics {
	/// Returns the number of client credentials exchanges sent upstream.
	pub fn exchanges(&self) -> u64 {
		self.exchanges.load(Ordering::Relaxed)
	}

	/// Returns the number of calls answered from the cached token.
	pub fn cache_hits(&self) -> u64 {
		self.cache_hits.load(Ordering::Relaxed)
	}

	/// Returns the number of failed `get_token` calls (configuration or upstream).
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	/// Returns the number of times a cached token was discarded.
	pub fn invalidations(&self) -> u64 {
		self.invalidations.load(Ordering::Relaxed)
	}

	pub(crate) fn record_exchange(&self) {
		self.exchanges.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_cache_hit(&self) {
		self.cache_hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_invalidation(&self) {
		self.invalidations.fetch_add(1, Ordering::Relaxed);
	}
}
