use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::registry::{DragSourceRecord, Meta};

/// Opaque handle into the callback side table. Registry records carry the
/// handle, never the closures themselves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackHandle(u64);

type Accepts = Box<dyn Fn(&DragSourceRecord) -> bool>;
type OnSource = Box<dyn Fn(&DragSourceRecord)>;
type OnMeta = Box<dyn Fn(&Meta)>;

/// Behaviour attached to a drop target.
///
/// `accepts` defaults to rejecting every source; the other callbacks default
/// to doing nothing.
pub struct TargetCallbacks {
	accepts: Accepts,
	on_drop: OnMeta,
	on_drag: OnSource,
	on_drag_end: OnMeta,
}

impl Default for TargetCallbacks {
	fn default() -> Self {
		Self {
			accepts: Box::new(|_| false),
			on_drop: Box::new(|_| {}),
			on_drag: Box::new(|_| {}),
			on_drag_end: Box::new(|_| {}),
		}
	}
}

impl fmt::Debug for TargetCallbacks {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TargetCallbacks").finish_non_exhaustive()
	}
}

impl TargetCallbacks {
	/// Callbacks that accept nothing and ignore every event.
	pub fn new() -> Self {
		Self::default()
	}

	/// Decides whether a hovering source can be dropped here.
	pub fn accepts(mut self, f: impl Fn(&DragSourceRecord) -> bool + 'static) -> Self {
		self.accepts = Box::new(f);
		self
	}

	/// Receives the meta of a source released over this target.
	pub fn on_drop(mut self, f: impl Fn(&Meta) + 'static) -> Self {
		self.on_drop = Box::new(f);
		self
	}

	/// Called for every source update while this target is the drop target.
	pub fn on_drag(mut self, f: impl Fn(&DragSourceRecord) + 'static) -> Self {
		self.on_drag = Box::new(f);
		self
	}

	/// Called on every target when any drag ends, with the source meta.
	pub fn on_drag_end(mut self, f: impl Fn(&Meta) + 'static) -> Self {
		self.on_drag_end = Box::new(f);
		self
	}

	pub(crate) fn will_accept(&self, source: &DragSourceRecord) -> bool {
		(self.accepts)(source)
	}

	pub(crate) fn dropped(&self, meta: &Meta) {
		(self.on_drop)(meta)
	}

	pub(crate) fn dragged(&self, source: &DragSourceRecord) {
		(self.on_drag)(source)
	}

	pub(crate) fn drag_ended(&self, meta: &Meta) {
		(self.on_drag_end)(meta)
	}
}

#[derive(Clone, Default)]
pub(crate) struct CallbackTable {
	next: u64,
	entries: HashMap<CallbackHandle, Rc<TargetCallbacks>>,
}

impl CallbackTable {
	pub fn insert(&mut self, callbacks: TargetCallbacks) -> CallbackHandle {
		self.next += 1;
		let handle = CallbackHandle(self.next);
		self.entries.insert(handle, Rc::new(callbacks));
		handle
	}

	/// Swaps the behaviour behind an existing handle. Unknown handles are ignored.
	pub fn replace(&mut self, handle: CallbackHandle, callbacks: TargetCallbacks) -> bool {
		match self.entries.get_mut(&handle) {
			Some(slot) => {
				*slot = Rc::new(callbacks);
				true
			}
			None => false,
		}
	}

	pub fn remove(&mut self, handle: CallbackHandle) {
		self.entries.remove(&handle);
	}

	pub fn get(&self, handle: CallbackHandle) -> Option<Rc<TargetCallbacks>> {
		self.entries.get(&handle).cloned()
	}
}
