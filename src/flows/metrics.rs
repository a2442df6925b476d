// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing how acquisitions were satisfied.
#[derive(Debug, Default)]
pub struct AcquisitionMetrics {
	attempts: AtomicU64,
	cache_hits: AtomicU64,
	refresh_attempts: AtomicU64,
	refresh_fallbacks: AtomicU64,
	full_exchanges: AtomicU64,
	failures: AtomicU64,
}
impl AcquisitionMetrics {
	/// Returns the total number of acquisitions.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of acquisitions served straight from the cache.
	pub fn cache_hits(&self) -> u64 {
		self.cache_hits.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh exchanges attempted with cached refresh tokens.
	pub fn refresh_attempts(&self) -> u64 {
		self.refresh_attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of refreshes that failed softly and fell back to a full exchange.
	pub fn refresh_fallbacks(&self) -> u64 {
		self.refresh_fallbacks.load(Ordering::Relaxed)
	}

	/// Returns the number of full token exchanges.
	pub fn full_exchanges(&self) -> u64 {
		self.full_exchanges.load(Ordering::Relaxed)
	}

	/// Returns the number of acquisitions that failed.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_cache_hit(&self) {
		self.cache_hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_refresh_attempt(&self) {
		self.refresh_attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_refresh_fallback(&self) {
		self.refresh_fallbacks.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_full_exchange(&self) {
		self.full_exchanges.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}
}
