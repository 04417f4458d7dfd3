//! Leading-edge throttle with a trailing value, driven by an injected clock.

/// Millisecond time source.
pub trait Clock {
	/// Current time. Only differences between readings matter.
	fn now_ms(&self) -> f64;
}

/// Wall-clock time: `performance`-style milliseconds since creation.
#[derive(Clone, Debug)]
pub struct MonotonicClock {
	#[cfg(not(target_arch = "wasm32"))]
	start: std::time::Instant,
}

impl Default for MonotonicClock {
	fn default() -> Self {
		Self {
			#[cfg(not(target_arch = "wasm32"))]
			start: std::time::Instant::now(),
		}
	}
}

impl Clock for MonotonicClock {
	#[cfg(not(target_arch = "wasm32"))]
	fn now_ms(&self) -> f64 {
		self.start.elapsed().as_secs_f64() * 1000.0
	}

	#[cfg(target_arch = "wasm32")]
	fn now_ms(&self) -> f64 {
		js_sys::Date::now()
	}
}

impl<C: Clock + ?Sized> Clock for std::rc::Rc<C> {
	fn now_ms(&self) -> f64 {
		(**self).now_ms()
	}
}

/// Passes the first value through immediately, then at most one value per
/// interval. Values arriving inside the interval replace any pending value,
/// which the host delivers later through [`Throttle::flush`].
#[derive(Debug)]
pub struct Throttle<T> {
	interval_ms: f64,
	last_fired: Option<f64>,
	pending: Option<T>,
}

impl<T> Throttle<T> {
	/// A throttle with nothing pending.
	pub fn new(interval_ms: f64) -> Self {
		Self {
			interval_ms: interval_ms.max(0.0),
			last_fired: None,
			pending: None,
		}
	}

	/// Returns `value` if the interval is open, otherwise holds it as pending.
	pub fn call(&mut self, now: f64, value: T) -> Option<T> {
		if self.is_open(now) {
			self.last_fired = Some(now);
			self.pending = None;
			Some(value)
		} else {
			self.pending = Some(value);
			None
		}
	}

	/// Releases the pending value once its interval has elapsed.
	pub fn flush(&mut self, now: f64) -> Option<T> {
		if self.pending.is_some() && self.is_open(now) {
			self.last_fired = Some(now);
			self.pending.take()
		} else {
			None
		}
	}

	/// Drops any pending value and resets the interval.
	pub fn cancel(&mut self) {
		self.pending = None;
		self.last_fired = None;
	}

	/// Whether a value is waiting for `flush`.
	pub fn has_pending(&self) -> bool {
		self.pending.is_some()
	}

	/// When the pending value becomes deliverable.
	pub fn next_due(&self) -> Option<f64> {
		self.pending.as_ref()?;
		Some(self.last_fired.map_or(0.0, |last| last + self.interval_ms))
	}

	fn is_open(&self, now: f64) -> bool {
		self.last_fired
			.is_none_or(|last| now - last >= self.interval_ms)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn leading_call_passes_then_trailing_waits() {
		let mut throttle = Throttle::new(60.0);
		assert_eq!(throttle.call(0.0, 1), Some(1));
		assert_eq!(throttle.call(10.0, 2), None);
		assert_eq!(throttle.call(20.0, 3), None);
		assert_eq!(throttle.next_due(), Some(60.0));
		assert_eq!(throttle.flush(59.0), None);
		assert_eq!(throttle.flush(60.0), Some(3));
		assert!(!throttle.has_pending());
		assert_eq!(throttle.call(130.0, 4), Some(4));
	}

	#[test]
	fn cancel_discards_pending() {
		let mut throttle = Throttle::new(60.0);
		throttle.call(0.0, 1);
		throttle.call(1.0, 2);
		throttle.cancel();
		assert_eq!(throttle.flush(500.0), None);
		assert_eq!(throttle.call(2.0, 3), Some(3));
	}
}
