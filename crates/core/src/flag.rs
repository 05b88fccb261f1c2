//! Shared cooperative run flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cloneable "keep running" flag.
///
/// The controller raises it when a run starts; any holder may clear it. The
/// crawl loop reads it at every candidate, page and pacing boundary.
#[derive(Debug, Clone, Default)]
pub struct RunFlag(Arc<AtomicBool>);

impl RunFlag {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn is_running(&self) -> bool {
		self.0.load(Ordering::SeqCst)
	}

	pub(crate) fn raise(&self) {
		self.0.store(true, Ordering::SeqCst);
	}

	/// Requests a stop. Idempotent. Returns whether the flag was set before.
	pub fn clear(&self) -> bool {
		self.0.swap(false, Ordering::SeqCst)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn clones_share_state() {
		let flag = RunFlag::new();
		let other = flag.clone();
		assert!(!other.is_running());
		flag.raise();
		assert!(other.is_running());
		assert!(other.clear());
		assert!(!flag.is_running());
		assert!(!flag.clear());
	}
}
