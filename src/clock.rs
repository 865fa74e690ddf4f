//! Time sources used by the request gate and the token cache.
//!
//! [`SystemClock`] delegates to the monotonic system clock and tokio timers. [`ManualClock`]
//! keeps virtual time that only moves when a caller sleeps or advances it, which makes gate
//! spacing and token expiry deterministic in tests.

// self
use crate::_prelude::*;

/// Boxed future returned by [`Clock::sleep`].
pub type ClockFuture<'a> = Pin<Box<dyn Future<Output = ()> + 'a + Send>>;

/// Source of monotonic instants, wall-clock timestamps, and suspension.
pub trait Clock
where
	Self: 'static + Send + Sync,
{
	/// Monotonic instant used for request spacing.
	fn now(&self) -> Instant;

	/// Wall-clock timestamp used for token issue/expiry bookkeeping.
	fn now_utc(&self) -> OffsetDateTime;

	/// Suspends the caller for `duration`.
	fn sleep(&self, duration: StdDuration) -> ClockFuture<'_>;
}

/// Real clock backed by [`Instant::now`] and tokio timers.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> Instant {
		Instant::now()
	}

	fn now_utc(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}

	fn sleep(&self, duration: StdDuration) -> ClockFuture<'_> {
		Box::pin(tokio::time::sleep(duration))
	}
}

/// Virtual clock whose `sleep` advances time instantly and records the requested duration.
#[derive(Clone, Debug)]
pub struct ManualClock(Arc<Mutex<ManualClockState>>);
#[derive(Debug)]
struct ManualClockState {
	origin: Instant,
	origin_utc: OffsetDateTime,
	elapsed: StdDuration,
	sleeps: Vec<StdDuration>,
}
impl ManualClock {
	/// Starts a clock pinned at the current system instant.
	pub fn new() -> Self {
		Self::starting_at(OffsetDateTime::now_utc())
	}

	/// Starts a clock whose wall-clock reading begins at `origin_utc`.
	pub fn starting_at(origin_utc: OffsetDateTime) -> Self {
		Self(Arc::new(Mutex::new(ManualClockState {
			origin: Instant::now(),
			origin_utc,
			elapsed: StdDuration::ZERO,
			sleeps: Vec::new(),
		})))
	}

	/// Moves virtual time forward without recording a sleep.
	pub fn advance(&self, duration: StdDuration) {
		self.0.lock().elapsed += duration;
	}

	/// Total virtual time elapsed since the clock was created.
	pub fn elapsed(&self) -> StdDuration {
		self.0.lock().elapsed
	}

	/// Every duration passed to [`Clock::sleep`] so far, in call order.
	pub fn sleeps(&self) -> Vec<StdDuration> {
		self.0.lock().sleeps.clone()
	}
}
impl Default for ManualClock {
	fn default() -> Self {
		Self::new()
	}
}
impl Clock for ManualClock {
	fn now(&self) -> Instant {
		let state = self.0.lock();

		state.origin + state.elapsed
	}

	fn now_utc(&self) -> OffsetDateTime {
		let state = self.0.lock();

		state.origin_utc + state.elapsed
	}

	fn sleep(&self, duration: StdDuration) -> ClockFuture<'_> {
		{
			let mut state = self.0.lock();

			state.elapsed += duration;
			state.sleeps.push(duration);
		}

		Box::pin(std::future::ready(()))
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[tokio::test]
	async fn manual_clock_sleep_advances_both_readings() {
		let clock = ManualClock::starting_at(macros::datetime!(2025-01-01 00:00 UTC));
		let start = clock.now();

		clock.sleep(StdDuration::from_millis(400)).await;
		clock.advance(StdDuration::from_millis(100));

		assert_eq!(clock.now() - start, StdDuration::from_millis(500));
		assert_eq!(clock.now_utc(), macros::datetime!(2025-01-01 00:00:00.5 UTC));
		assert_eq!(clock.sleeps(), vec![StdDuration::from_millis(400)]);
		assert_eq!(clock.elapsed(), StdDuration::from_millis(500));
	}

	#[tokio::test]
	async fn system_clock_sleeps_for_real() {
		let clock = SystemClock;
		let start = Instant::now();

		clock.sleep(StdDuration::from_millis(20)).await;

		assert!(start.elapsed() >= StdDuration::from_millis(20));
	}
}
