/// Polling never runs faster than 10 Hz.
pub const MIN_POLL_INTERVAL_MS: f64 = 100.0;

/// How an adapter learns that its element's geometry may have changed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MeasureStrategy {
	/// A resize/intersection observer reports changes through
	/// [`GeometryWatcher::notify`].
	Observed,
	/// Fallback for hosts without observers: re-measure on a fixed interval.
	Polling {
		/// Milliseconds between measurements, at least [`MIN_POLL_INTERVAL_MS`].
		interval_ms: f64,
	},
}

/// Decides when an adapter should re-measure.
#[derive(Debug)]
pub struct GeometryWatcher {
	strategy: MeasureStrategy,
	dirty: bool,
	next_due: Option<f64>,
	cancelled: bool,
}

impl GeometryWatcher {
	/// A watcher that reports its first measurement as due.
	pub fn new(strategy: MeasureStrategy) -> Self {
		let strategy = match strategy {
			MeasureStrategy::Polling { interval_ms } => MeasureStrategy::Polling {
				interval_ms: interval_ms.max(MIN_POLL_INTERVAL_MS),
			},
			observed => observed,
		};
		Self {
			strategy,
			dirty: true,
			next_due: None,
			cancelled: false,
		}
	}

	/// Shorthand for [`MeasureStrategy::Observed`].
	pub fn observed() -> Self {
		Self::new(MeasureStrategy::Observed)
	}

	/// Shorthand for [`MeasureStrategy::Polling`].
	pub fn polling(interval_ms: f64) -> Self {
		Self::new(MeasureStrategy::Polling { interval_ms })
	}

	/// The strategy in effect, with the polling interval capped.
	pub fn strategy(&self) -> MeasureStrategy {
		self.strategy
	}

	/// An observer saw a resize or visibility change.
	pub fn notify(&mut self) {
		if !self.cancelled {
			self.dirty = true;
		}
	}

	/// Whether a measurement should run now; consumes the pending change.
	pub fn due(&mut self, now: f64) -> bool {
		if self.cancelled {
			return false;
		}
		match self.strategy {
			MeasureStrategy::Observed => std::mem::take(&mut self.dirty),
			MeasureStrategy::Polling { interval_ms } => {
				if self.dirty || self.next_due.is_none_or(|due| now >= due) {
					self.dirty = false;
					self.next_due = Some(now + interval_ms);
					true
				} else {
					false
				}
			}
		}
	}

	/// Stops reporting measurements for good.
	pub fn cancel(&mut self) {
		self.cancelled = true;
		self.dirty = false;
		self.next_due = None;
	}

	/// Whether [`cancel`](Self::cancel) has been called.
	pub fn is_cancelled(&self) -> bool {
		self.cancelled
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn polling_is_capped_at_ten_hertz() {
		let mut watcher = GeometryWatcher::polling(16.0);
		assert_eq!(
			watcher.strategy(),
			MeasureStrategy::Polling {
				interval_ms: MIN_POLL_INTERVAL_MS
			}
		);
		assert!(watcher.due(0.0));
		assert!(!watcher.due(50.0));
		assert!(watcher.due(100.0));
	}

	#[test]
	fn observed_measures_only_after_notification() {
		let mut watcher = GeometryWatcher::observed();
		assert!(watcher.due(0.0));
		assert!(!watcher.due(1000.0));
		watcher.notify();
		assert!(watcher.due(1001.0));
	}

	#[test]
	fn cancelled_watcher_never_fires() {
		let mut watcher = GeometryWatcher::polling(100.0);
		watcher.cancel();
		watcher.notify();
		assert!(!watcher.due(1e9));
	}
}
