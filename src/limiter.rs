//! Process-wide request gate enforcing a minimum spacing between upstream calls.
//!
//! Every outbound request (token exchanges and resource fetches alike) passes through the same
//! [`RateLimiter`], so the system-wide request rate is capped at `1 / min_interval`. Callers
//! queue on a fair async mutex that is held from the moment `last_release` is read until it is
//! rewritten, so concurrent callers on a multi-threaded runtime are spaced with a hard bound
//! rather than racing on a stale timestamp.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{
	_prelude::*,
	clock::{Clock, SystemClock},
	obs,
};

/// Minimum-spacing gate shared by every upstream call of a process.
pub struct RateLimiter {
	min_interval: StdDuration,
	clock: Arc<dyn Clock>,
	last_release: AsyncMutex<Option<Instant>>,
	stats: GateStats,
}
impl RateLimiter {
	/// Spacing the upstream provider tolerates without throttling.
	pub const DEFAULT_MIN_INTERVAL: StdDuration = StdDuration::from_millis(500);

	/// Creates a gate backed by the system clock.
	pub fn new(min_interval: StdDuration) -> Self {
		Self::with_clock(min_interval, Arc::new(SystemClock))
	}

	/// Creates a gate that reads and sleeps on the provided clock.
	pub fn with_clock(min_interval: StdDuration, clock: Arc<dyn Clock>) -> Self {
		Self { min_interval, clock, last_release: AsyncMutex::new(None), stats: Default::default() }
	}

	/// Configured minimum spacing between two releases.
	pub fn min_interval(&self) -> StdDuration {
		self.min_interval
	}

	/// Clock the gate reads and sleeps on.
	pub fn clock(&self) -> &Arc<dyn Clock> {
		&self.clock
	}

	/// Counters describing how often callers passed or were delayed.
	pub fn stats(&self) -> &GateStats {
		&self.stats
	}

	/// Instant of the most recent release, or `None` before the first call.
	pub async fn last_release(&self) -> Option<Instant> {
		*self.last_release.lock().await
	}

	/// Blocks until at least `min_interval` has elapsed since the previous release, then
	/// records the current instant as the new release.
	///
	/// The first call ever proceeds immediately. The method never fails; it only delays.
	pub async fn wait(&self) {
		let mut last_release = self.last_release.lock().await;
		let delay = self.delay_for(*last_release, self.clock.now());

		if !delay.is_zero() {
			#[cfg(feature = "tracing")]
			tracing::debug!(delay_ms = delay.as_millis() as u64, "Request gate delaying caller.");

			self.clock.sleep(delay).await;

			obs::record_gate_delay(delay);
			self.stats.record_delayed();
		}

		*last_release = Some(self.clock.now());

		self.stats.record_pass();
	}

	/// Computes how long a caller arriving at `now` must wait given the previous release.
	pub fn delay_for(&self, last_release: Option<Instant>, now: Instant) -> StdDuration {
		match last_release {
			None => StdDuration::ZERO,
			Some(previous) =>
				self.min_interval.saturating_sub(now.saturating_duration_since(previous)),
		}
	}
}
impl Default for RateLimiter {
	fn default() -> Self {
		Self::new(Self::DEFAULT_MIN_INTERVAL)
	}
}
impl Debug for RateLimiter {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RateLimiter")
			.field("min_interval", &self.min_interval)
			.field("stats", &self.stats)
			.finish()
	}
}

/// Thread-safe counters for gate activity.
#[derive(Debug, Default)]
pub struct GateStats {
	passes: AtomicU64,
	delayed: AtomicU64,
}
impl GateStats {
	/// Returns the number of callers released by the gate.
	pub fn passes(&self) -> u64 {
		self.passes.load(Ordering::Relaxed)
	}

	/// Returns the number of releases that had to be delayed.
	pub fn delayed(&self) -> u64 {
		self.delayed.load(Ordering::Relaxed)
	}

	fn record_pass(&self) {
		self.passes.fetch_add(1, Ordering::Relaxed);
	}

	fn record_delayed(&self) {
		self.delayed.fetch_add(1, Ordering::Relaxed);
	}
}
