use log::debug;

use super::measure::{GeometryWatcher, MeasureStrategy};
use super::registry::{Obstacle, Registry};
use crate::geometry::{ElementRef, Point, Rect, absolute_bounds};

/// Publishes an element's bounds as an obstacle. No acceptance semantics.
pub struct ObstacleAdapter<E> {
	id: String,
	registry: Registry,
	element: Option<E>,
	watcher: GeometryWatcher,
	page_offset: Point,
	published: Option<Rect>,
	mounted: bool,
}

impl<E: ElementRef> ObstacleAdapter<E> {
	/// A mounted adapter with no element yet.
	pub fn new(id: impl Into<String>, registry: Registry, strategy: MeasureStrategy) -> Self {
		Self {
			id: id.into(),
			registry,
			element: None,
			watcher: GeometryWatcher::new(strategy),
			page_offset: Point::ORIGIN,
			published: None,
			mounted: true,
		}
	}

	/// Sets the element to measure.
	pub fn attach(&mut self, element: E) {
		self.element = Some(element);
		self.watcher.notify();
	}

	/// Page scroll added to measured bounds.
	pub fn set_page_offset(&mut self, offset: Point) {
		self.page_offset = offset.sanitized();
	}

	/// Observer callback: re-measures immediately.
	pub fn geometry_changed(&mut self) -> bool {
		self.watcher.notify();
		self.measure()
	}

	/// Re-measures if the watcher says a measurement is due.
	pub fn poll(&mut self, now: f64) -> bool {
		self.watcher.due(now) && self.measure()
	}

	/// Publishes changed bounds. Returns whether the element could be measured.
	pub fn measure(&mut self) -> bool {
		if !self.mounted {
			return false;
		}
		let Some(element) = self.element.as_ref() else {
			return false;
		};
		match absolute_bounds(element, self.page_offset) {
			Ok(bounds) => {
				if self.published != Some(bounds) {
					self.registry
						.upsert_obstacle(Obstacle::new(self.id.clone(), bounds));
					self.published = Some(bounds);
				}
				true
			}
			Err(err) => {
				debug!("obstacle `{}` not ready: {err}", self.id);
				false
			}
		}
	}
}

impl<E> ObstacleAdapter<E> {
	/// Removes the obstacle and stops measuring. Idempotent.
	pub fn unmount(&mut self) {
		if !self.mounted {
			return;
		}
		self.mounted = false;
		self.watcher.cancel();
		self.element = None;
		self.registry.remove_obstacle(&self.id);
	}
}

impl<E> Drop for ObstacleAdapter<E> {
	fn drop(&mut self) {
		self.unmount();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::drag_and_drop::fakes::FakeElement;

	#[test]
	fn publishes_and_cleans_up() {
		let registry = Registry::new();
		let element = FakeElement::new(Rect::new(0.0, 500.0, 300.0, 80.0));
		{
			let mut tray = ObstacleAdapter::new("unplaced", registry.clone(), MeasureStrategy::Observed);
			tray.set_page_offset(Point::new(0.0, 20.0));
			tray.attach(element);
			assert!(tray.poll(0.0));
			assert_eq!(
				registry.obstacle("unplaced").unwrap().bounds,
				Rect::new(0.0, 520.0, 300.0, 80.0)
			);
			assert!(registry.snapshot().targets().is_empty());
		}
		assert!(registry.obstacle("unplaced").is_none());
	}
}
