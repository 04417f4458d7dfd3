use std::rc::Rc;

use log::debug;

use super::callbacks::{CallbackHandle, TargetCallbacks};
use super::measure::{GeometryWatcher, MeasureStrategy};
use super::registry::{DropTargetRecord, Meta, Registry};
use crate::geometry::{ElementRef, Point, Rect, absolute_bounds};

/// Keeps a drop target's bounds, meta and behaviour published in the registry.
pub struct DropTarget<E> {
	id: String,
	registry: Registry,
	element: Option<E>,
	callbacks: CallbackHandle,
	meta: Box<dyn Fn() -> Meta>,
	watcher: GeometryWatcher,
	page_offset: Point,
	published: Option<(Rect, Rc<Meta>)>,
	mounted: bool,
}

impl<E: ElementRef> DropTarget<E> {
	/// Registers `callbacks` now; the record appears on the first successful measure.
	pub fn new(
		id: impl Into<String>,
		registry: Registry,
		callbacks: TargetCallbacks,
		strategy: MeasureStrategy,
	) -> Self {
		let callbacks = registry.register_callbacks(callbacks);
		Self {
			id: id.into(),
			registry,
			element: None,
			callbacks,
			meta: Box::new(Meta::new),
			watcher: GeometryWatcher::new(strategy),
			page_offset: Point::ORIGIN,
			published: None,
			mounted: true,
		}
	}

	/// Meta published with the target, re-evaluated on every measure.
	pub fn with_meta(mut self, meta: impl Fn() -> Meta + 'static) -> Self {
		self.meta = Box::new(meta);
		self
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

	/// Swaps behaviour in place; the handle and record stay the same.
	pub fn set_callbacks(&mut self, callbacks: TargetCallbacks) {
		if self.mounted {
			self.registry.replace_callbacks(self.callbacks, callbacks);
		}
	}

	/// Observer callback: the element resized or changed visibility.
	pub fn geometry_changed(&mut self) -> bool {
		self.watcher.notify();
		self.measure()
	}

	/// Timer or frame tick; measures only when the watcher says so.
	pub fn poll(&mut self, now: f64) -> bool {
		self.watcher.due(now) && self.measure()
	}

	/// Measures the element and republishes the target. Returns `false`
	/// when the element is missing or detached; the next cycle retries.
	pub fn measure(&mut self) -> bool {
		if !self.mounted {
			return false;
		}
		let Some(element) = self.element.as_ref() else {
			debug!("drop target `{}` has no element yet", self.id);
			return false;
		};
		let bounds = match absolute_bounds(element, self.page_offset) {
			Ok(bounds) => bounds,
			Err(err) => {
				debug!("drop target `{}` not ready: {err}", self.id);
				return false;
			}
		};
		let meta = (self.meta)();
		if let Some((published_bounds, published_meta)) = &self.published {
			if *published_bounds == bounds && **published_meta == meta {
				return true;
			}
		}
		let meta = Rc::new(meta);
		self.registry.upsert_target(DropTargetRecord::new(
			self.id.clone(),
			bounds,
			Rc::clone(&meta),
			self.callbacks,
		));
		self.published = Some((bounds, meta));
		true
	}
}

impl<E> DropTarget<E> {
	/// Registry id.
	pub fn id(&self) -> &str {
		&self.id
	}

	/// Handle the record carries.
	pub fn callbacks(&self) -> CallbackHandle {
		self.callbacks
	}

	/// Removes the record and callbacks and stops measuring.
	pub fn unmount(&mut self) {
		if !self.mounted {
			return;
		}
		self.mounted = false;
		self.watcher.cancel();
		self.element = None;
		self.published = None;
		self.registry.remove_target(&self.id);
		self.registry.release_callbacks(self.callbacks);
	}
}

impl<E> Drop for DropTarget<E> {
	fn drop(&mut self) {
		self.unmount();
	}
}
