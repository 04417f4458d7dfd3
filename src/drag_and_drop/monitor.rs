//! Derived per-id drag state with change gating.
//!
//! A monitor recomputes a small tuple from every registry snapshot but only
//! notifies its owner when the tuple changes under shallow equality. Source
//! meta is compared by pointer, so a drag moving across the canvas re-renders
//! only the targets whose `is_over`/`will_accept` actually flipped.

use std::cell::RefCell;
use std::rc::Rc;

use super::registry::{Meta, Registry, RegistrySnapshot, Subscription};

/// Cheap equality: values compare field by field, shared meta by pointer.
pub trait ShallowEq {
	/// Whether `self` and `other` would render the same.
	fn shallow_eq(&self, other: &Self) -> bool;
}

fn same_meta(a: &Option<Rc<Meta>>, b: &Option<Rc<Meta>>) -> bool {
	match (a, b) {
		(Some(a), Some(b)) => Rc::ptr_eq(a, b),
		(None, None) => true,
		_ => false,
	}
}

/// What a drop target renders from.
#[derive(Clone, Debug, Default)]
pub struct TargetState {
	/// The active source is over this target.
	pub is_over: bool,
	/// This target is the drop target and accepts the source.
	pub will_accept: bool,
	/// Meta of the drag in progress, if any.
	pub source: Option<Rc<Meta>>,
}

impl ShallowEq for TargetState {
	/// Whether `self` and `other` would render the same.
	fn shallow_eq(&self, other: &Self) -> bool {
		self.is_over == other.is_over
			&& self.will_accept == other.will_accept
			&& same_meta(&self.source, &other.source)
	}
}

impl TargetState {
	/// State of target `id`; a missing target reads as idle.
	pub fn derive(snapshot: &RegistrySnapshot, id: &str) -> Self {
		let target = snapshot.target(id);
		Self {
			is_over: target.is_some_and(|t| t.is_over),
			will_accept: target.is_some_and(|t| t.will_accept),
			source: snapshot.active_source().map(|s| Rc::clone(&s.meta)),
		}
	}
}

/// What a drag source or the canvas renders from.
#[derive(Clone, Debug, Default)]
pub struct SourceState {
	/// Some source is being dragged.
	pub is_dragging: bool,
	/// Id of the dragged source.
	pub source_id: Option<String>,
	/// Meta of the dragged source.
	pub meta: Option<Rc<Meta>>,
}

impl ShallowEq for SourceState {
	/// Whether `self` and `other` would render the same.
	fn shallow_eq(&self, other: &Self) -> bool {
		self.is_dragging == other.is_dragging
			&& self.source_id == other.source_id
			&& same_meta(&self.meta, &other.meta)
	}
}

impl SourceState {
	/// State of the active drag.
	pub fn derive(snapshot: &RegistrySnapshot) -> Self {
		let source = snapshot.active_source();
		Self {
			is_dragging: source.is_some(),
			source_id: source.map(|s| s.id.clone()),
			meta: source.map(|s| Rc::clone(&s.meta)),
		}
	}
}

/// Keeps a derived value current and reports when it changes.
///
/// Unsubscribes when dropped.
pub struct Monitor<T> {
	state: Rc<RefCell<T>>,
	_subscription: Subscription,
}

impl<T: ShallowEq + Clone + 'static> Monitor<T> {
	/// Derives the initial value now and calls `on_change` for each later change.
	pub fn new(
		registry: &Registry,
		derive: impl Fn(&RegistrySnapshot) -> T + 'static,
		on_change: impl Fn(&T) + 'static,
	) -> Self {
		let state = Rc::new(RefCell::new(derive(&registry.snapshot())));
		let current = Rc::clone(&state);
		let subscription = registry.subscribe(move |snapshot| {
			let next = derive(snapshot);
			if current.borrow().shallow_eq(&next) {
				return;
			}
			*current.borrow_mut() = next.clone();
			on_change(&next);
		});
		Self {
			state,
			_subscription: subscription,
		}
	}

	/// The latest derived value.
	pub fn get(&self) -> T {
		self.state.borrow().clone()
	}
}

impl Monitor<TargetState> {
	/// Watches drop target `id`.
	pub fn target(registry: &Registry, id: impl Into<String>, on_change: impl Fn(&TargetState) + 'static) -> Self {
		let id = id.into();
		Self::new(registry, move |snapshot| TargetState::derive(snapshot, &id), on_change)
	}
}

impl Monitor<SourceState> {
	/// Watches the active drag.
	pub fn source(registry: &Registry, on_change: impl Fn(&SourceState) + 'static) -> Self {
		Self::new(registry, SourceState::derive, on_change)
	}
}

#[cfg(test)]
mod tests {
	use std::cell::Cell;

	use super::*;
	use crate::drag_and_drop::{DragSourceRecord, DropTargetRecord, TargetCallbacks};
	use crate::geometry::{Point, Rect};

	#[test]
	fn only_transitions_are_emitted() {
		let registry = Registry::new();
		let handle = registry.register_callbacks(TargetCallbacks::new().accepts(|_| true));
		registry.upsert_target(DropTargetRecord::new(
			"bin",
			Rect::new(0.0, 0.0, 100.0, 100.0),
			Rc::new(Meta::new()),
			handle,
		));
		let changes = Rc::new(Cell::new(0));
		let counter = Rc::clone(&changes);
		let monitor = Monitor::target(&registry, "bin", move |_| counter.set(counter.get() + 1));

		let meta = Rc::new(Meta::new());
		for x in [200.0, 210.0, 220.0] {
			registry.upsert_source(DragSourceRecord::new("n1", Rc::clone(&meta), Point::new(x, 50.0)));
		}
		assert_eq!(changes.get(), 1);
		assert!(!monitor.get().is_over);
		assert!(monitor.get().source.is_some());

		for x in [10.0, 20.0, 30.0, 40.0] {
			registry.upsert_source(DragSourceRecord::new("n1", Rc::clone(&meta), Point::new(x, 50.0)));
		}
		assert_eq!(changes.get(), 2);
		let state = monitor.get();
		assert!(state.is_over && state.will_accept);

		registry.remove_source("n1");
		assert_eq!(changes.get(), 3);
		assert!(!monitor.get().is_over);
	}

	#[test]
	fn source_monitor_tracks_the_current_drag() {
		let registry = Registry::new();
		let changes = Rc::new(Cell::new(0));
		let counter = Rc::clone(&changes);
		let monitor = Monitor::source(&registry, move |_| counter.set(counter.get() + 1));
		assert!(!monitor.get().is_dragging);

		let meta = Rc::new(Meta::new());
		registry.upsert_source(DragSourceRecord::new("n1", Rc::clone(&meta), Point::ORIGIN));
		registry.upsert_source(DragSourceRecord::new("n1", Rc::clone(&meta), Point::new(5.0, 5.0)));
		assert_eq!(monitor.get().source_id.as_deref(), Some("n1"));
		assert_eq!(changes.get(), 1);

		drop(monitor);
		registry.remove_source("n1");
		assert_eq!(changes.get(), 1);
	}
}
