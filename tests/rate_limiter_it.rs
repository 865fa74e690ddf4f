// std
use std::{
	sync::Arc,
	time::{Duration, Instant},
};
// self
use oauth2_gateway::{
	clock::{Clock, ManualClock},
	limiter::RateLimiter,
};

#[tokio::test]
async fn sequential_waits_are_spaced_on_the_system_clock() {
	let interval = Duration::from_millis(40);
	let gate = RateLimiter::new(interval);
	let started = Instant::now();

	gate.wait().await;

	let first = gate.last_release().await.expect("First release should be recorded.");

	gate.wait().await;

	let second = gate.last_release().await.expect("Second release should be recorded.");

	gate.wait().await;

	let third = gate.last_release().await.expect("Third release should be recorded.");

	assert!(first.duration_since(started) < interval, "The first caller must not be delayed.");
	assert!(second.duration_since(first) >= interval);
	assert!(third.duration_since(second) >= interval);
	assert_eq!(gate.stats().passes(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_waits_are_serialized_on_the_manual_clock() {
	let clock = ManualClock::new();
	let start = clock.now();
	let gate = Arc::new(RateLimiter::with_clock(Duration::from_millis(500), Arc::new(clock.clone())));
	let handles = (0..5)
		.map(|_| {
			let gate = gate.clone();

			tokio::spawn(async move { gate.wait().await })
		})
		.collect::<Vec<_>>();

	for handle in handles {
		handle.await.expect("Gate task should not panic.");
	}

	assert_eq!(clock.sleeps(), vec![Duration::from_millis(500); 4]);
	assert_eq!(gate.last_release().await, Some(start + Duration::from_millis(2000)));
	assert_eq!(gate.stats().passes(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_waits_respect_the_hard_bound_in_real_time() {
	let interval = Duration::from_millis(30);
	let gate = Arc::new(RateLimiter::new(interval));
	let started = Instant::now();
	let handles = (0..4)
		.map(|_| {
			let gate = gate.clone();

			tokio::spawn(async move { gate.wait().await })
		})
		.collect::<Vec<_>>();

	for handle in handles {
		handle.await.expect("Gate task should not panic.");
	}

	assert!(started.elapsed() >= interval * 3, "Four callers need at least three intervals.");
	assert_eq!(gate.stats().passes(), 4);
}

#[tokio::test]
async fn cancelled_wait_leaves_the_gate_untouched() {
	let interval = Duration::from_millis(250);
	let gate = RateLimiter::new(interval);

	gate.wait().await;

	let released = gate.last_release().await.expect("First release should be recorded.");
	let cancelled = tokio::time::timeout(Duration::from_millis(50), gate.wait()).await;

	assert!(cancelled.is_err(), "The caller must still be sleeping inside the gate.");
	assert_eq!(gate.last_release().await, Some(released));
	assert_eq!(gate.stats().passes(), 1);
	assert_eq!(gate.stats().delayed(), 0, "A cancelled sleep is not a delayed release.");

	gate.wait().await;

	let next = gate.last_release().await.expect("Next release should be recorded.");

	assert!(next.duration_since(released) >= interval);
	assert_eq!(gate.stats().passes(), 2);
	assert_eq!(gate.stats().delayed(), 1);
}
