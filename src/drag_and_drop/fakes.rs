use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::geometry::{ElementRef, Point, Rect};

/// In-memory element whose geometry tests can change between measurements.
#[derive(Clone, Default)]
pub struct FakeElement {
	rect: Rc<RefCell<Rect>>,
	detached: Rc<Cell<bool>>,
	pub measured: Rc<Cell<usize>>,
}

impl FakeElement {
	pub fn new(rect: Rect) -> Self {
		let element = Self::default();
		element.set_rect(rect);
		element
	}

	pub fn set_rect(&self, rect: Rect) {
		*self.rect.borrow_mut() = rect;
	}

	pub fn set_attached(&self, attached: bool) {
		self.detached.set(!attached);
	}
}

impl ElementRef for FakeElement {
	fn is_attached(&self) -> bool {
		!self.detached.get()
	}

	fn client_rect(&self) -> Rect {
		self.measured.set(self.measured.get() + 1);
		*self.rect.borrow()
	}

	fn scroll_offset(&self) -> Point {
		Point::ORIGIN
	}

	fn parent(&self) -> Option<Self> {
		None
	}
}
