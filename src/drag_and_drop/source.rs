use std::rc::Rc;

use log::debug;

use super::drag_manager::{DragListener, DragMovement};
use super::registry::{DragSourceRecord, Meta, Registry};
use super::throttle::{Clock, Throttle};
use crate::geometry::Point;

/// Visual stand-in that follows the pointer while dragging.
pub trait DragPreview {
	/// The drag started.
	fn show(&mut self, movement: DragMovement);
	/// The pointer moved.
	fn update(&mut self, movement: DragMovement);
	/// The drag ended or was cancelled.
	fn remove(&mut self);
}

type PreviewFactory = Box<dyn FnMut() -> Box<dyn DragPreview>>;

/// Publishes a draggable element's drag into the registry.
///
/// The preview follows every pointer event; registry updates are throttled.
/// `meta` is evaluated once per drag, at start.
pub struct DragSource<C> {
	id: String,
	registry: Registry,
	meta: Box<dyn Fn() -> Meta>,
	preview_factory: Option<PreviewFactory>,
	preview: Option<Box<dyn DragPreview>>,
	throttle: Throttle<Point>,
	clock: C,
	page_offset: Point,
	origin: Point,
	active: bool,
	enabled: bool,
}

impl<C: Clock> DragSource<C> {
	/// A source publishing as `id`. `meta` runs once per drag; `throttle_ms`
	/// spaces out registry updates.
	pub fn new(
		id: impl Into<String>,
		registry: Registry,
		meta: impl Fn() -> Meta + 'static,
		clock: C,
		throttle_ms: f64,
	) -> Self {
		Self {
			id: id.into(),
			registry,
			meta: Box::new(meta),
			preview_factory: None,
			preview: None,
			throttle: Throttle::new(throttle_ms),
			clock,
			page_offset: Point::ORIGIN,
			origin: Point::ORIGIN,
			active: false,
			enabled: true,
		}
	}

	/// Shows a preview built by `factory` for each drag.
	pub fn with_preview(mut self, factory: impl FnMut() -> Box<dyn DragPreview> + 'static) -> Self {
		self.preview_factory = Some(Box::new(factory));
		self
	}
}

impl<C> DragSource<C> {
	/// Registry id.
	pub fn id(&self) -> &str {
		&self.id
	}

	/// Whether a drag is in progress and published.
	pub fn is_dragging(&self) -> bool {
		self.active
	}

	/// Page scroll at the time of the press; registry points are absolute.
	pub fn set_page_offset(&mut self, offset: Point) {
		self.page_offset = offset.sanitized();
	}

	/// A disabled source ignores drags (positioning not allowed).
	pub fn set_enabled(&mut self, enabled: bool) {
		self.enabled = enabled;
	}

	/// Removes the preview, cancels pending updates and clears the record.
	pub fn unmount(&mut self) {
		self.throttle.cancel();
		self.remove_preview();
		if self.active {
			self.active = false;
			self.registry.remove_source(&self.id);
		}
	}

	fn publish(&self, point: Point) {
		let Some(current) = self.registry.source(&self.id) else {
			return;
		};
		self.registry
			.upsert_source(DragSourceRecord::new(self.id.clone(), current.meta, point));
	}

	fn remove_preview(&mut self) {
		if let Some(mut preview) = self.preview.take() {
			preview.remove();
		}
	}

	fn absolute(&self, movement: DragMovement) -> Point {
		self.origin + movement.delta
	}
}

impl<C: Clock> DragListener for DragSource<C> {
	fn on_drag_start(&mut self, movement: DragMovement) {
		if !self.enabled {
			return;
		}
		self.active = true;
		self.throttle.cancel();
		self.origin = movement.press_point() + self.page_offset;
		let meta = Rc::new((self.meta)());
		let point = self.absolute(movement);
		if let Some(factory) = self.preview_factory.as_mut() {
			let mut preview = factory();
			preview.show(movement);
			self.preview = Some(preview);
		}
		debug!("drag source `{}` started", self.id);
		self.throttle.call(self.clock.now_ms(), point);
		self.registry
			.upsert_source(DragSourceRecord::new(self.id.clone(), meta, point));
	}

	fn on_drag_move(&mut self, movement: DragMovement) {
		if !self.active {
			return;
		}
		if let Some(preview) = self.preview.as_mut() {
			preview.update(movement);
		}
		let point = self.absolute(movement);
		if let Some(point) = self.throttle.call(self.clock.now_ms(), point) {
			self.publish(point);
		}
	}

	fn on_drag_end(&mut self, movement: DragMovement) {
		if !self.active {
			return;
		}
		self.active = false;
		self.throttle.cancel();
		self.remove_preview();
		let point = self.absolute(movement);
		debug!("drag source `{}` ended", self.id);
		self.registry.end_drag(&self.id, point);
	}

	fn on_drag_cancel(&mut self, _movement: DragMovement) {
		self.unmount();
	}

	fn flush_delay(&self) -> Option<f64> {
		if !self.active {
			return None;
		}
		let due = self.throttle.next_due()?;
		Some((due - self.clock.now_ms()).max(0.0))
	}

	/// Delivers a throttled position once its interval has elapsed.
	fn flush(&mut self) {
		if !self.active {
			return;
		}
		if let Some(point) = self.throttle.flush(self.clock.now_ms()) {
			self.publish(point);
		}
	}
}

impl<C> Drop for DragSource<C> {
	fn drop(&mut self) {
		self.unmount();
	}
}

#[cfg(test)]
mod tests {
	use std::cell::{Cell, RefCell};

	use serde_json::json;

	use super::*;
	use crate::config::DragConfig;
	use crate::drag_and_drop::DragManager;

	#[derive(Clone, Default)]
	struct ManualClock(Rc<Cell<f64>>);

	impl Clock for ManualClock {
		fn now_ms(&self) -> f64 {
			self.0.get()
		}
	}

	struct Preview(Rc<RefCell<Vec<&'static str>>>);

	impl DragPreview for Preview {
		fn show(&mut self, _: DragMovement) {
			self.0.borrow_mut().push("show");
		}

		fn update(&mut self, _: DragMovement) {
			self.0.borrow_mut().push("update");
		}

		fn remove(&mut self) {
			self.0.borrow_mut().push("remove");
		}
	}

	fn source(registry: &Registry, clock: &ManualClock, log: &Rc<RefCell<Vec<&'static str>>>) -> DragManager<DragSource<ManualClock>> {
		let log = Rc::clone(log);
		let source = DragSource::new(
			"node-1",
			registry.clone(),
			|| json!({ "itemType": "EXISTING_NODE" }).as_object().cloned().unwrap_or_default(),
			clock.clone(),
			60.0,
		)
		.with_preview(move || -> Box<dyn DragPreview> { Box::new(Preview(Rc::clone(&log))) });
		DragManager::new(source, &DragConfig::default())
	}

	#[test]
	fn moves_are_throttled_but_preview_is_not() {
		let registry = Registry::new();
		let clock = ManualClock::default();
		let log = Rc::new(RefCell::new(Vec::new()));
		let mut drag = source(&registry, &clock, &log);

		drag.pointer_down(Point::new(0.0, 0.0));
		drag.pointer_move(Point::new(10.0, 0.0));
		assert_eq!(registry.source("node-1").unwrap().point(), Point::new(10.0, 0.0));

		clock.0.set(20.0);
		drag.pointer_move(Point::new(20.0, 0.0));
		clock.0.set(40.0);
		drag.pointer_move(Point::new(30.0, 0.0));
		assert_eq!(registry.source("node-1").unwrap().x, 10.0);
		assert_eq!(*log.borrow(), vec!["show", "update", "update"]);

		clock.0.set(60.0);
		drag.listener_mut().flush();
		assert_eq!(registry.source("node-1").unwrap().x, 30.0);
	}

	#[test]
	fn trailing_position_is_delivered_when_due() {
		let registry = Registry::new();
		let clock = ManualClock::default();
		let log = Rc::new(RefCell::new(Vec::new()));
		let mut drag = source(&registry, &clock, &log);

		drag.pointer_down(Point::new(0.0, 0.0));
		drag.pointer_move(Point::new(10.0, 0.0));
		assert_eq!(drag.flush_delay(), None);

		clock.0.set(20.0);
		drag.pointer_move(Point::new(25.0, 5.0));
		assert_eq!(drag.flush_delay(), Some(40.0));
		drag.flush();
		assert_eq!(registry.source("node-1").unwrap().point(), Point::new(10.0, 0.0));

		clock.0.set(60.0);
		assert_eq!(drag.flush_delay(), Some(0.0));
		drag.flush();
		assert_eq!(registry.source("node-1").unwrap().point(), Point::new(25.0, 5.0));
		assert_eq!(drag.flush_delay(), None);

		clock.0.set(70.0);
		drag.pointer_move(Point::new(30.0, 5.0));
		drag.pointer_up(Point::new(30.0, 5.0));
		assert_eq!(drag.flush_delay(), None);
	}

	#[test]
	fn meta_is_snapshotted_once() {
		let registry = Registry::new();
		let clock = ManualClock::default();
		let log = Rc::new(RefCell::new(Vec::new()));
		let mut drag = source(&registry, &clock, &log);
		drag.pointer_down(Point::new(0.0, 0.0));
		drag.pointer_move(Point::new(10.0, 0.0));
		let first = registry.source("node-1").unwrap().meta;
		clock.0.set(100.0);
		drag.pointer_move(Point::new(20.0, 0.0));
		assert!(Rc::ptr_eq(&first, &registry.source("node-1").unwrap().meta));
	}

	#[test]
	fn end_and_unmount_clear_the_record() {
		let registry = Registry::new();
		let clock = ManualClock::default();
		let log = Rc::new(RefCell::new(Vec::new()));
		let mut drag = source(&registry, &clock, &log);
		drag.pointer_down(Point::new(0.0, 0.0));
		drag.pointer_move(Point::new(10.0, 0.0));
		drag.pointer_up(Point::new(12.0, 0.0));
		assert!(registry.snapshot().sources().is_empty());
		assert_eq!(log.borrow().last(), Some(&"remove"));

		drag.pointer_down(Point::new(0.0, 0.0));
		drag.pointer_move(Point::new(10.0, 0.0));
		drop(drag);
		assert!(registry.snapshot().sources().is_empty());
	}

	#[test]
	fn disabled_source_publishes_nothing() {
		let registry = Registry::new();
		let clock = ManualClock::default();
		let log = Rc::new(RefCell::new(Vec::new()));
		let mut drag = source(&registry, &clock, &log);
		drag.listener_mut().set_enabled(false);
		drag.pointer_down(Point::new(0.0, 0.0));
		drag.pointer_move(Point::new(10.0, 0.0));
		assert!(registry.snapshot().sources().is_empty());
		assert!(log.borrow().is_empty());
	}
}
