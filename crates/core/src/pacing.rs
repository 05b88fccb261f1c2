//! Randomized, human-like delays between actions.

use std::time::Duration;

use rand::Rng;
use tracing::debug;

use crate::config::WaitBounds;

/// Draws uniform delays in `[min, max]` and sleeps for them.
#[derive(Debug, Clone, Copy)]
pub struct Pacer {
	bounds: WaitBounds,
}

impl Pacer {
	/// Bounds are validated by [`Limits::validate`](crate::config::Limits::validate)
	/// before a run starts; an inverted pair here collapses to `min`.
	pub fn new(bounds: WaitBounds) -> Self {
		Self { bounds }
	}

	pub fn bounds(&self) -> WaitBounds {
		self.bounds
	}

	pub fn draw(&self) -> Duration {
		let min = u64::try_from(self.bounds.min.as_nanos()).unwrap_or(u64::MAX);
		let max = u64::try_from(self.bounds.max.as_nanos()).unwrap_or(u64::MAX);
		if max <= min {
			return self.bounds.min;
		}
		Duration::from_nanos(rand::thread_rng().gen_range(min..=max))
	}

	/// Sleeps for one drawn delay and returns it.
	pub async fn pause(&self) -> Duration {
		let delay = self.draw();
		debug!(target = "outreach.pacing", delay_ms = delay.as_millis() as u64, "pausing");
		tokio::time::sleep(delay).await;
		delay
	}
}

#[cfg(test)]
mod tests {
	use std::time::Instant;

	use super::*;

	#[test]
	fn draws_stay_within_bounds() {
		let bounds = WaitBounds::from_secs(10, 30);
		let pacer = Pacer::new(bounds);
		for _ in 0..1000 {
			let delay = pacer.draw();
			assert!(delay >= bounds.min && delay <= bounds.max, "{delay:?} out of bounds");
		}
	}

	#[test]
	fn draws_are_not_constant() {
		let pacer = Pacer::new(WaitBounds::from_secs(1, 60));
		let first = pacer.draw();
		assert!((0..50).any(|_| pacer.draw() != first));
	}

	#[test]
	fn equal_bounds_yield_exact_delay() {
		let bounds = WaitBounds::new(Duration::from_millis(250), Duration::from_millis(250));
		assert_eq!(Pacer::new(bounds).draw(), Duration::from_millis(250));
	}

	#[test]
	fn oversized_max_saturates_instead_of_wrapping() {
		let bounds = WaitBounds::new(Duration::from_secs(1), Duration::from_secs(u64::MAX));
		let pacer = Pacer::new(bounds);
		for _ in 0..100 {
			let delay = pacer.draw();
			assert!(delay >= bounds.min && delay <= bounds.max, "{delay:?} out of bounds");
		}
		assert!((0..50).any(|_| pacer.draw() > Duration::from_secs(1)));
	}

	#[tokio::test]
	async fn pause_sleeps_for_drawn_delay() {
		let pacer = Pacer::new(WaitBounds::new(Duration::from_millis(5), Duration::from_millis(15)));
		let started = Instant::now();
		let slept = pacer.pause().await;
		assert!(slept >= Duration::from_millis(5) && slept <= Duration::from_millis(15));
		assert!(started.elapsed() >= slept);
	}
}
