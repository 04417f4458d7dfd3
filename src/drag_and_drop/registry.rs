//! The spatial registry: single source of truth for drag sources, drop
//! targets and obstacles.
//!
//! Every mutation is a [`Command`] pushed onto a FIFO queue. One writer drains
//! the queue, folding each command into a fresh immutable [`RegistrySnapshot`]
//! through a pure reducer; callbacks and subscribers run after the new
//! snapshot is published. Commands dispatched from inside a callback are
//! queued behind the current one, so a drag's start, moves and end are applied
//! strictly in order and readers never observe a half-applied update.
//!
//! The handle is `Rc`-based and stays on the interaction thread.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use log::debug;

use super::callbacks::{CallbackHandle, CallbackTable, TargetCallbacks};
use crate::geometry::{Point, Rect};

/// Metadata snapshot carried by a drag source or published by a target.
pub type Meta = serde_json::Map<String, serde_json::Value>;

/// An in-flight drag.
#[derive(Clone, Debug, PartialEq)]
pub struct DragSourceRecord {
	/// Source id, unique among sources.
	pub id: String,
	/// Snapshot taken when the drag started.
	pub meta: Rc<Meta>,
	/// Absolute pointer x.
	pub x: f64,
	/// Absolute pointer y.
	pub y: f64,
}

impl DragSourceRecord {
	/// A record at `point`; non-finite coordinates become zero.
	pub fn new(id: impl Into<String>, meta: Rc<Meta>, point: Point) -> Self {
		let point = point.sanitized();
		Self {
			id: id.into(),
			meta,
			x: point.x,
			y: point.y,
		}
	}

	/// Pointer position as a point.
	pub fn point(&self) -> Point {
		Point::new(self.x, self.y)
	}
}

/// A registered drop target with its derived hover state.
#[derive(Clone, Debug, PartialEq)]
pub struct DropTargetRecord {
	/// Target id, unique among targets.
	pub id: String,
	/// Absolute bounds.
	pub bounds: Rect,
	/// Meta published by the target.
	pub meta: Rc<Meta>,
	/// Behaviour in the callback table.
	pub callbacks: CallbackHandle,
	/// The active source point lies within `bounds`.
	pub is_over: bool,
	/// Over, and the target accepts the active source.
	pub will_accept: bool,
	sequence: u64,
}

impl DropTargetRecord {
	/// A record with no hover state yet.
	pub fn new(id: impl Into<String>, bounds: Rect, meta: Rc<Meta>, callbacks: CallbackHandle) -> Self {
		Self {
			id: id.into(),
			bounds: bounds.sanitized(),
			meta,
			callbacks,
			is_over: false,
			will_accept: false,
			sequence: 0,
		}
	}
}

/// A region drops and placement should avoid.
#[derive(Clone, Debug, PartialEq)]
pub struct Obstacle {
	/// Obstacle id.
	pub id: String,
	/// Absolute bounds.
	pub bounds: Rect,
}

impl Obstacle {
	/// An obstacle covering `bounds`.
	pub fn new(id: impl Into<String>, bounds: Rect) -> Self {
		Self {
			id: id.into(),
			bounds: bounds.sanitized(),
		}
	}
}

/// A registry mutation.
#[derive(Clone, Debug)]
pub enum Command {
	/// Adds or replaces a source by id.
	UpsertSource(DragSourceRecord),
	/// Removes a source without resolving a drop.
	RemoveSource(String),
	/// Moves the source to its final point, resolves the drop and removes the source.
	EndDrag {
		/// Source being released.
		id: String,
		/// Absolute release point.
		point: Point,
	},
	/// Adds or replaces a target by id.
	UpsertTarget(DropTargetRecord),
	/// Removes a target.
	RemoveTarget(String),
	/// Adds or replaces an obstacle by id.
	UpsertObstacle(Obstacle),
	/// Removes an obstacle.
	RemoveObstacle(String),
	/// Re-evaluates acceptance, e.g. after target callbacks were swapped.
	Refresh,
}

/// Immutable view of the registry after some number of applied commands.
#[derive(Clone, Debug, Default)]
pub struct RegistrySnapshot {
	sources: Vec<DragSourceRecord>,
	targets: Vec<DropTargetRecord>,
	obstacles: Vec<Obstacle>,
	revision: u64,
	next_sequence: u64,
}

impl RegistrySnapshot {
	/// In-flight drags, oldest first.
	pub fn sources(&self) -> &[DragSourceRecord] {
		&self.sources
	}

	/// Targets in registration order.
	pub fn targets(&self) -> &[DropTargetRecord] {
		&self.targets
	}

	/// Obstacles in registration order.
	pub fn obstacles(&self) -> &[Obstacle] {
		&self.obstacles
	}

	/// Source `id`.
	pub fn source(&self, id: &str) -> Option<&DragSourceRecord> {
		self.sources.iter().find(|source| source.id == id)
	}

	/// Target `id`.
	pub fn target(&self, id: &str) -> Option<&DropTargetRecord> {
		self.targets.iter().find(|target| target.id == id)
	}

	/// Obstacle `id`.
	pub fn obstacle(&self, id: &str) -> Option<&Obstacle> {
		self.obstacles.iter().find(|obstacle| obstacle.id == id)
	}

	/// The most recently started drag, if any.
	pub fn active_source(&self) -> Option<&DragSourceRecord> {
		self.sources.last()
	}

	/// Number of commands applied so far.
	pub fn revision(&self) -> u64 {
		self.revision
	}

	/// The target that would receive the drop if the active source were
	/// released now.
	pub fn drop_target(&self) -> Option<&DropTargetRecord> {
		self.targets
			.iter()
			.filter(|target| target.will_accept)
			.min_by(|a, b| drop_priority(a, b))
	}

	/// Obstacles whose interiors overlap `rect`.
	pub fn obstacles_overlapping<'a>(&'a self, rect: &'a Rect) -> impl Iterator<Item = &'a Obstacle> + 'a {
		self.obstacles
			.iter()
			.filter(move |obstacle| obstacle.bounds.intersects(rect))
	}

	/// Whether no obstacle overlaps `rect`.
	pub fn is_clear_of_obstacles(&self, rect: &Rect) -> bool {
		self.obstacles_overlapping(rect).next().is_none()
	}

	fn recompute_overlap(&mut self, callbacks: &CallbackTable) {
		let sources = &self.sources;
		for target in &mut self.targets {
			let behaviour = callbacks.get(target.callbacks);
			let mut is_over = false;
			let mut will_accept = false;
			for source in sources.iter().filter(|s| target.bounds.contains(s.point())) {
				is_over = true;
				if behaviour.as_ref().is_some_and(|cb| cb.will_accept(source)) {
					will_accept = true;
					break;
				}
			}
			target.is_over = is_over;
			target.will_accept = will_accept;
		}
	}
}

/// Overlapping targets: the smallest area wins, then the most recently registered.
fn drop_priority(a: &DropTargetRecord, b: &DropTargetRecord) -> Ordering {
	a.bounds
		.area()
		.total_cmp(&b.bounds.area())
		.then(b.sequence.cmp(&a.sequence))
}

enum Effect {
	Drag(Rc<TargetCallbacks>, DragSourceRecord),
	Drop(Rc<TargetCallbacks>, Rc<Meta>),
	DragEnd(Rc<TargetCallbacks>, Rc<Meta>),
}

impl Effect {
	fn run(self) {
		match self {
			Effect::Drag(callbacks, source) => callbacks.dragged(&source),
			Effect::Drop(callbacks, meta) => callbacks.dropped(&meta),
			Effect::DragEnd(callbacks, meta) => callbacks.drag_ended(&meta),
		}
	}
}

fn upsert<T>(items: &mut Vec<T>, item: T, same: impl Fn(&T) -> bool) {
	match items.iter_mut().find(|existing| same(existing)) {
		Some(existing) => *existing = item,
		None => items.push(item),
	}
}

fn reduce(
	state: &RegistrySnapshot,
	callbacks: &CallbackTable,
	command: Command,
) -> (RegistrySnapshot, Vec<Effect>) {
	let mut next = state.clone();
	next.revision += 1;
	let mut effects = Vec::new();

	match command {
		Command::UpsertSource(mut source) => {
			let point = source.point().sanitized();
			source.x = point.x;
			source.y = point.y;
			upsert(&mut next.sources, source.clone(), |s| s.id == source.id);
			next.recompute_overlap(callbacks);
			for target in next.targets.iter().filter(|t| t.bounds.contains(point)) {
				if let Some(behaviour) = callbacks.get(target.callbacks) {
					effects.push(Effect::Drag(behaviour, source.clone()));
				}
			}
		}
		Command::RemoveSource(id) => {
			next.sources.retain(|source| source.id != id);
			next.recompute_overlap(callbacks);
		}
		Command::EndDrag { id, point } => {
			let Some(index) = next.sources.iter().position(|source| source.id == id) else {
				debug!("drag end for unknown source `{id}` ignored");
				return (next, effects);
			};
			let mut source = next.sources.remove(index);
			let point = point.sanitized();
			source.x = point.x;
			source.y = point.y;

			let hits: Vec<(&DropTargetRecord, Rc<TargetCallbacks>)> = next
				.targets
				.iter()
				.filter(|target| target.bounds.contains(point))
				.filter_map(|target| callbacks.get(target.callbacks).map(|cb| (target, cb)))
				.collect();
			let winner = hits
				.iter()
				.filter(|(_, behaviour)| behaviour.will_accept(&source))
				.min_by(|(a, _), (b, _)| drop_priority(a, b));
			if let Some((target, behaviour)) = winner {
				debug!("source `{}` dropped on `{}`", source.id, target.id);
				effects.push(Effect::Drop(Rc::clone(behaviour), Rc::clone(&source.meta)));
			}
			for (_, behaviour) in &hits {
				effects.push(Effect::DragEnd(Rc::clone(behaviour), Rc::clone(&source.meta)));
			}
			next.recompute_overlap(callbacks);
		}
		Command::UpsertTarget(mut target) => {
			target.bounds = target.bounds.sanitized();
			match next.targets.iter().find(|t| t.id == target.id) {
				Some(existing) => target.sequence = existing.sequence,
				None => {
					next.next_sequence += 1;
					target.sequence = next.next_sequence;
				}
			}
			let id = target.id.clone();
			upsert(&mut next.targets, target, |t| t.id == id);
			next.recompute_overlap(callbacks);
		}
		Command::RemoveTarget(id) => {
			next.targets.retain(|target| target.id != id);
		}
		Command::UpsertObstacle(obstacle) => {
			let obstacle = Obstacle::new(obstacle.id, obstacle.bounds);
			let id = obstacle.id.clone();
			upsert(&mut next.obstacles, obstacle, |o| o.id == id);
		}
		Command::RemoveObstacle(id) => {
			next.obstacles.retain(|obstacle| obstacle.id != id);
		}
		Command::Refresh => next.recompute_overlap(callbacks),
	}

	(next, effects)
}

type Listener = Rc<dyn Fn(&RegistrySnapshot)>;

#[derive(Default)]
struct Inner {
	snapshot: Rc<RegistrySnapshot>,
	callbacks: CallbackTable,
	queue: VecDeque<Command>,
	draining: bool,
	listeners: Vec<(u64, Listener)>,
	next_listener: u64,
}

/// Clears `draining` when a drain ends, including by a panicking callback.
struct DrainGuard<'a>(&'a RefCell<Inner>);

impl Drop for DrainGuard<'_> {
	fn drop(&mut self) {
		if let Ok(mut inner) = self.0.try_borrow_mut() {
			inner.draining = false;
		}
	}
}

/// Shared handle to the registry. Cloning yields another handle to the same store.
#[derive(Clone, Default)]
pub struct Registry {
	inner: Rc<RefCell<Inner>>,
}

impl fmt::Debug for Registry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Registry")
			.field("snapshot", &self.inner.borrow().snapshot)
			.finish_non_exhaustive()
	}
}

impl Registry {
	/// An empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// The current snapshot. Cheap; shares the published state.
	pub fn snapshot(&self) -> Rc<RegistrySnapshot> {
		Rc::clone(&self.inner.borrow().snapshot)
	}

	/// Queues `command` and drains the queue unless a drain is already running.
	pub fn dispatch(&self, command: Command) {
		{
			let mut inner = self.inner.borrow_mut();
			inner.queue.push_back(command);
			if inner.draining {
				return;
			}
			inner.draining = true;
		}
		let _drain = DrainGuard(&self.inner);

		loop {
			let (state, callbacks, command) = {
				let mut inner = self.inner.borrow_mut();
				let Some(command) = inner.queue.pop_front() else {
					return;
				};
				(Rc::clone(&inner.snapshot), inner.callbacks.clone(), command)
			};

			let (next, effects) = reduce(&state, &callbacks, command);
			let next = Rc::new(next);
			let listeners = {
				let mut inner = self.inner.borrow_mut();
				inner.snapshot = Rc::clone(&next);
				inner.listeners.clone()
			};

			for effect in effects {
				effect.run();
			}
			for (id, listener) in listeners {
				if self.is_subscribed(id) {
					listener(&next);
				}
			}
		}
	}

	/// Dispatches [`Command::UpsertSource`].
	pub fn upsert_source(&self, source: DragSourceRecord) {
		self.dispatch(Command::UpsertSource(source));
	}

	/// Dispatches [`Command::RemoveSource`].
	pub fn remove_source(&self, id: &str) {
		self.dispatch(Command::RemoveSource(id.to_owned()));
	}

	/// Dispatches [`Command::EndDrag`].
	pub fn end_drag(&self, id: &str, point: Point) {
		self.dispatch(Command::EndDrag {
			id: id.to_owned(),
			point,
		});
	}

	/// Dispatches [`Command::UpsertTarget`].
	pub fn upsert_target(&self, target: DropTargetRecord) {
		self.dispatch(Command::UpsertTarget(target));
	}

	/// Dispatches [`Command::RemoveTarget`].
	pub fn remove_target(&self, id: &str) {
		self.dispatch(Command::RemoveTarget(id.to_owned()));
	}

	/// Dispatches [`Command::UpsertObstacle`].
	pub fn upsert_obstacle(&self, obstacle: Obstacle) {
		self.dispatch(Command::UpsertObstacle(obstacle));
	}

	/// Dispatches [`Command::RemoveObstacle`].
	pub fn remove_obstacle(&self, id: &str) {
		self.dispatch(Command::RemoveObstacle(id.to_owned()));
	}

	/// A copy of source `id` from the current snapshot.
	pub fn source(&self, id: &str) -> Option<DragSourceRecord> {
		self.snapshot().source(id).cloned()
	}

	/// A copy of target `id` from the current snapshot.
	pub fn target(&self, id: &str) -> Option<DropTargetRecord> {
		self.snapshot().target(id).cloned()
	}

	/// A copy of obstacle `id` from the current snapshot.
	pub fn obstacle(&self, id: &str) -> Option<Obstacle> {
		self.snapshot().obstacle(id).cloned()
	}

	/// Stores target behaviour and returns its handle.
	pub fn register_callbacks(&self, callbacks: TargetCallbacks) -> CallbackHandle {
		self.inner.borrow_mut().callbacks.insert(callbacks)
	}

	/// Swaps a target's behaviour in place. The handle, and therefore the
	/// target's identity, is unchanged.
	pub fn replace_callbacks(&self, handle: CallbackHandle, callbacks: TargetCallbacks) {
		let replaced = self.inner.borrow_mut().callbacks.replace(handle, callbacks);
		if replaced {
			self.dispatch(Command::Refresh);
		}
	}

	/// Forgets the behaviour behind `handle`.
	pub fn release_callbacks(&self, handle: CallbackHandle) {
		self.inner.borrow_mut().callbacks.remove(handle);
	}

	/// Calls `listener` with every new snapshot until the returned guard drops.
	pub fn subscribe(&self, listener: impl Fn(&RegistrySnapshot) + 'static) -> Subscription {
		let mut inner = self.inner.borrow_mut();
		inner.next_listener += 1;
		let id = inner.next_listener;
		inner.listeners.push((id, Rc::new(listener)));
		Subscription {
			registry: Rc::downgrade(&self.inner),
			id,
		}
	}

	fn is_subscribed(&self, id: u64) -> bool {
		self.inner
			.borrow()
			.listeners
			.iter()
			.any(|(listener, _)| *listener == id)
	}
}

/// Unsubscribes on drop.
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
	registry: Weak<RefCell<Inner>>,
	id: u64,
}

impl Drop for Subscription {
	fn drop(&mut self) {
		if let Some(inner) = self.registry.upgrade() {
			inner
				.borrow_mut()
				.listeners
				.retain(|(listener, _)| *listener != self.id);
		}
	}
}

#[cfg(test)]
mod tests {
	use std::cell::Cell;

	use serde_json::json;

	use super::*;

	fn meta(value: serde_json::Value) -> Rc<Meta> {
		match value {
			serde_json::Value::Object(map) => Rc::new(map),
			_ => Rc::new(Meta::new()),
		}
	}

	fn target(registry: &Registry, id: &str, bounds: Rect, callbacks: TargetCallbacks) -> CallbackHandle {
		let handle = registry.register_callbacks(callbacks);
		registry.upsert_target(DropTargetRecord::new(id, bounds, meta(json!({})), handle));
		handle
	}

	#[test]
	fn remove_after_upsert_leaves_no_record() {
		let registry = Registry::new();
		for id in ["a", "b", "c"] {
			target(&registry, id, Rect::new(0.0, 0.0, 10.0, 10.0), TargetCallbacks::new());
			registry.remove_target(id);
			assert!(registry.target(id).is_none());
		}
		registry.remove_target("never-added");
		registry.remove_source("never-added");
		registry.remove_obstacle("never-added");
		assert!(registry.snapshot().targets().is_empty());
	}

	#[test]
	fn panicking_callback_does_not_wedge_the_queue() {
		let registry = Registry::new();
		target(
			&registry,
			"bin",
			Rect::new(0.0, 0.0, 50.0, 50.0),
			TargetCallbacks::new()
				.accepts(|_| true)
				.on_drop(|_| panic!("drop handler failed")),
		);
		registry.upsert_source(DragSourceRecord::new("n1", meta(json!({})), Point::new(10.0, 10.0)));

		let ended = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
			registry.end_drag("n1", Point::new(10.0, 10.0));
		}));
		assert!(ended.is_err());

		target(&registry, "tray", Rect::new(100.0, 0.0, 50.0, 50.0), TargetCallbacks::new());
		assert!(registry.target("tray").is_some());
		registry.remove_target("bin");
		assert!(registry.target("bin").is_none());
	}

	#[test]
	fn upsert_is_last_writer_wins() {
		let registry = Registry::new();
		registry.upsert_obstacle(Obstacle::new("tray", Rect::new(0.0, 0.0, 5.0, 5.0)));
		registry.upsert_obstacle(Obstacle::new("tray", Rect::new(1.0, 1.0, -5.0, 7.0)));
		let snapshot = registry.snapshot();
		assert_eq!(snapshot.obstacles().len(), 1);
		assert_eq!(snapshot.obstacle("tray").unwrap().bounds, Rect::new(1.0, 1.0, 0.0, 7.0));
	}

	#[test]
	fn is_over_follows_the_source_point() {
		let registry = Registry::new();
		target(
			&registry,
			"bin",
			Rect::new(100.0, 100.0, 50.0, 50.0),
			TargetCallbacks::new().accepts(|_| true),
		);
		let source_meta = meta(json!({ "itemType": "EXISTING_NODE" }));

		registry.upsert_source(DragSourceRecord::new("n1", Rc::clone(&source_meta), Point::new(120.0, 120.0)));
		let bin = registry.target("bin").unwrap();
		assert!(bin.is_over && bin.will_accept);

		registry.upsert_source(DragSourceRecord::new("n1", source_meta, Point::new(10.0, 10.0)));
		let bin = registry.target("bin").unwrap();
		assert!(!bin.is_over);
		assert!(!bin.will_accept);
	}

	#[test]
	fn will_accept_requires_the_predicate() {
		let registry = Registry::new();
		target(
			&registry,
			"bin",
			Rect::new(0.0, 0.0, 50.0, 50.0),
			TargetCallbacks::new().accepts(|source| source.meta.get("itemType") == Some(&json!("NEW_NODE"))),
		);
		registry.upsert_source(DragSourceRecord::new(
			"n1",
			meta(json!({ "itemType": "EXISTING_NODE" })),
			Point::new(10.0, 10.0),
		));
		let bin = registry.target("bin").unwrap();
		assert!(bin.is_over);
		assert!(!bin.will_accept);
	}

	#[test]
	fn smallest_accepting_target_receives_the_drop() {
		let registry = Registry::new();
		let drops = Rc::new(RefCell::new(Vec::new()));
		let ends = Rc::new(Cell::new(0));
		for (id, bounds) in [
			("outer", Rect::new(0.0, 0.0, 200.0, 200.0)),
			("inner", Rect::new(50.0, 50.0, 20.0, 20.0)),
		] {
			let drops = Rc::clone(&drops);
			let ends = Rc::clone(&ends);
			target(
				&registry,
				id,
				bounds,
				TargetCallbacks::new()
					.accepts(|_| true)
					.on_drop(move |_| drops.borrow_mut().push(id))
					.on_drag_end(move |_| ends.set(ends.get() + 1)),
			);
		}

		registry.upsert_source(DragSourceRecord::new("n1", meta(json!({})), Point::new(55.0, 55.0)));
		assert_eq!(registry.snapshot().drop_target().unwrap().id, "inner");
		registry.end_drag("n1", Point::new(60.0, 60.0));

		assert_eq!(*drops.borrow(), vec!["inner"]);
		assert_eq!(ends.get(), 2);
		assert!(registry.snapshot().sources().is_empty());
		assert!(registry.snapshot().targets().iter().all(|t| !t.is_over && !t.will_accept));
	}

	#[test]
	fn equal_areas_prefer_the_latest_registration() {
		let registry = Registry::new();
		let winner = Rc::new(RefCell::new(None));
		for id in ["first", "second"] {
			let winner = Rc::clone(&winner);
			target(
				&registry,
				id,
				Rect::new(0.0, 0.0, 40.0, 40.0),
				TargetCallbacks::new()
					.accepts(|_| true)
					.on_drop(move |_| *winner.borrow_mut() = Some(id)),
			);
		}
		// Re-measuring an existing target keeps its original registration order.
		let handle = registry.target("first").unwrap().callbacks;
		registry.upsert_target(DropTargetRecord::new("first", Rect::new(0.0, 0.0, 40.0, 40.0), meta(json!({})), handle));

		registry.upsert_source(DragSourceRecord::new("n1", meta(json!({})), Point::new(1.0, 1.0)));
		registry.end_drag("n1", Point::new(1.0, 1.0));
		assert_eq!(*winner.borrow(), Some("second"));
	}

	#[test]
	fn rejected_drop_is_not_delivered() {
		let registry = Registry::new();
		let dropped = Rc::new(Cell::new(false));
		let flag = Rc::clone(&dropped);
		target(
			&registry,
			"bin",
			Rect::new(0.0, 0.0, 40.0, 40.0),
			TargetCallbacks::new().on_drop(move |_| flag.set(true)),
		);
		registry.upsert_source(DragSourceRecord::new("n1", meta(json!({})), Point::new(1.0, 1.0)));
		registry.end_drag("n1", Point::new(1.0, 1.0));
		assert!(!dropped.get());
		assert!(registry.source("n1").is_none());
	}

	#[test]
	fn replacing_callbacks_keeps_identity_and_reevaluates() {
		let registry = Registry::new();
		let handle = target(&registry, "bin", Rect::new(0.0, 0.0, 40.0, 40.0), TargetCallbacks::new());
		registry.upsert_source(DragSourceRecord::new("n1", meta(json!({})), Point::new(1.0, 1.0)));
		assert!(!registry.target("bin").unwrap().will_accept);

		registry.replace_callbacks(handle, TargetCallbacks::new().accepts(|_| true));
		let bin = registry.target("bin").unwrap();
		assert_eq!(bin.callbacks, handle);
		assert!(bin.will_accept);
	}

	#[test]
	fn nested_dispatch_is_queued_in_order() {
		let registry = Registry::new();
		let seen = Rc::new(RefCell::new(Vec::new()));
		let inner_registry = registry.clone();
		let log = Rc::clone(&seen);
		let _subscription = registry.subscribe(move |snapshot| {
			log.borrow_mut().push(snapshot.revision());
			if snapshot.revision() == 1 {
				inner_registry.upsert_obstacle(Obstacle::new("late", Rect::new(0.0, 0.0, 1.0, 1.0)));
			}
		});
		registry.upsert_obstacle(Obstacle::new("early", Rect::new(0.0, 0.0, 1.0, 1.0)));
		assert_eq!(*seen.borrow(), vec![1, 2]);
		assert_eq!(registry.snapshot().obstacles().len(), 2);
	}

	#[test]
	fn dropped_subscription_stops_notifications() {
		let registry = Registry::new();
		let count = Rc::new(Cell::new(0));
		let counter = Rc::clone(&count);
		let subscription = registry.subscribe(move |_| counter.set(counter.get() + 1));
		registry.upsert_obstacle(Obstacle::new("a", Rect::default()));
		drop(subscription);
		registry.upsert_obstacle(Obstacle::new("b", Rect::default()));
		assert_eq!(count.get(), 1);
	}

	#[test]
	fn obstacle_queries() {
		let registry = Registry::new();
		registry.upsert_obstacle(Obstacle::new("tray", Rect::new(0.0, 0.0, 100.0, 40.0)));
		let snapshot = registry.snapshot();
		assert!(!snapshot.is_clear_of_obstacles(&Rect::new(90.0, 30.0, 20.0, 20.0)));
		assert!(snapshot.is_clear_of_obstacles(&Rect::new(0.0, 40.0, 20.0, 20.0)));
		assert!(snapshot.is_clear_of_obstacles(&Rect::new(10.0, 10.0, 0.0, 0.0)));
	}
}
