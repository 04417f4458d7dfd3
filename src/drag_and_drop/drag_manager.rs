//! Pointer gesture state machine: Idle → (Pressed) → Dragging → Idle.
//!
//! The manager is fed raw pointer positions by a host binding and reports
//! cumulative movement to a [`DragListener`]. While dragging near an edge of
//! its scroll container it scrolls that container once per animation frame
//! and folds the scrolled distance into the reported delta, so the dragged
//! item stays under the pointer.

use log::debug;

use crate::config::{DragConfig, ScrollDirection};
use crate::geometry::{Point, Rect};

/// Offset of a drag in absolute pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DragMovement {
	/// Current pointer position in viewport pixels.
	pub pointer: Point,
	/// Cumulative offset since the press, including any auto-scroll.
	pub delta: Point,
}

impl DragMovement {
	/// Pointer position at the press that started this drag.
	pub fn press_point(&self) -> Point {
		self.pointer - self.delta
	}
}

/// Receives the phases of a drag gesture.
pub trait DragListener {
	/// The pointer crossed the threshold.
	fn on_drag_start(&mut self, movement: DragMovement);
	/// The pointer moved, or auto-scroll moved the content under it.
	fn on_drag_move(&mut self, movement: DragMovement);
	/// The pointer was released.
	fn on_drag_end(&mut self, movement: DragMovement);
	/// The gesture was aborted (pointer-cancel or unmount mid-drag).
	fn on_drag_cancel(&mut self, movement: DragMovement) {
		self.on_drag_end(movement);
	}
	/// Milliseconds until deferred work becomes due, if any is pending.
	fn flush_delay(&self) -> Option<f64> {
		None
	}
	/// Delivers deferred work that has come due.
	fn flush(&mut self) {}
}

/// The nearest scrollable ancestor of a draggable element.
pub trait ScrollContainer {
	/// Visible bounds in viewport pixels.
	fn bounds(&self) -> Rect;
	/// Current scroll position.
	fn scroll_offset(&self) -> Point;
	/// Scrolls by `delta`, clamped to the scrollable range.
	fn scroll_by(&mut self, delta: Point);
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Phase {
	Idle,
	Pressed {
		origin: Point,
	},
	Dragging {
		origin: Point,
		pointer: Point,
		scroll_origin: Point,
	},
}

/// Turns raw pointer input into drag phases for a listener `L`.
pub struct DragManager<L> {
	listener: L,
	scroller: Option<Box<dyn ScrollContainer>>,
	phase: Phase,
	threshold: f64,
	direction: ScrollDirection,
	scroll_edge: f64,
	max_scroll_speed: f64,
	scroll_stalled: bool,
	detached: bool,
}

impl<L: DragListener> DragManager<L> {
	/// An idle manager configured by `config`.
	pub fn new(listener: L, config: &DragConfig) -> Self {
		Self {
			listener,
			scroller: None,
			phase: Phase::Idle,
			threshold: config.threshold.max(0.0),
			direction: config.scroll_direction,
			scroll_edge: config.scroll_edge.max(0.0),
			max_scroll_speed: config.max_scroll_speed.max(0.0),
			scroll_stalled: false,
			detached: false,
		}
	}

	/// Auto-scrolls `scroller` while dragging near its edges.
	pub fn with_scroller(mut self, scroller: impl ScrollContainer + 'static) -> Self {
		self.scroller = Some(Box::new(scroller));
		self
	}

	/// The listener.
	pub fn listener(&self) -> &L {
		&self.listener
	}

	/// The listener, mutably.
	pub fn listener_mut(&mut self) -> &mut L {
		&mut self.listener
	}

	/// Whether a drag is past its threshold and in progress.
	pub fn is_dragging(&self) -> bool {
		matches!(self.phase, Phase::Dragging { .. })
	}

	/// Whether [`detach`](Self::detach) has been called.
	pub fn is_detached(&self) -> bool {
		self.detached
	}

	/// Milliseconds until the host should call [`flush`](Self::flush).
	pub fn flush_delay(&self) -> Option<f64> {
		if self.detached {
			return None;
		}
		self.listener.flush_delay()
	}

	/// Lets the listener deliver deferred work, such as a throttled position.
	pub fn flush(&mut self) {
		if !self.detached {
			self.listener.flush();
		}
	}

	/// A primary-button press.
	pub fn pointer_down(&mut self, pointer: Point) {
		if self.detached || self.phase != Phase::Idle {
			return;
		}
		self.phase = Phase::Pressed {
			origin: pointer.sanitized(),
		};
	}

	/// Pointer movement, pressed or not.
	pub fn pointer_move(&mut self, pointer: Point) {
		let pointer = pointer.sanitized();
		match self.phase {
			Phase::Idle => {}
			Phase::Pressed { origin } => {
				if pointer.distance(origin) < self.threshold {
					return;
				}
				self.phase = Phase::Dragging {
					origin,
					pointer,
					scroll_origin: self.scroll_offset(),
				};
				self.scroll_stalled = false;
				debug!("drag started at ({}, {})", origin.x, origin.y);
				let movement = self.movement();
				self.listener.on_drag_start(movement);
			}
			Phase::Dragging {
				origin,
				scroll_origin,
				..
			} => {
				self.phase = Phase::Dragging {
					origin,
					pointer,
					scroll_origin,
				};
				self.scroll_stalled = false;
				let movement = self.movement();
				self.listener.on_drag_move(movement);
			}
		}
	}

	/// Pointer release.
	pub fn pointer_up(&mut self, pointer: Point) {
		match self.phase {
			Phase::Dragging {
				origin,
				scroll_origin,
				..
			} => {
				self.phase = Phase::Dragging {
					origin,
					pointer: pointer.sanitized(),
					scroll_origin,
				};
				let movement = self.movement();
				self.phase = Phase::Idle;
				self.listener.on_drag_end(movement);
			}
			// Released before the threshold: a click, not a drag.
			Phase::Pressed { .. } => self.phase = Phase::Idle,
			Phase::Idle => {}
		}
	}

	/// The platform aborted the gesture.
	pub fn pointer_cancel(&mut self) {
		match self.phase {
			Phase::Dragging { .. } => {
				let movement = self.movement();
				self.phase = Phase::Idle;
				self.listener.on_drag_cancel(movement);
			}
			Phase::Pressed { .. } => self.phase = Phase::Idle,
			Phase::Idle => {}
		}
	}

	/// Whether the host should schedule an animation frame for auto-scroll.
	pub fn wants_frame(&self) -> bool {
		!self.detached && !self.scroll_stalled && self.is_dragging() && self.scroll_velocity() != Point::ORIGIN
	}

	/// One auto-scroll step. Returns whether another frame is wanted.
	pub fn animation_frame(&mut self) -> bool {
		if !self.wants_frame() {
			return false;
		}
		let velocity = self.scroll_velocity();
		let before = self.scroll_offset();
		if let Some(scroller) = self.scroller.as_mut() {
			scroller.scroll_by(velocity);
		}
		if self.scroll_offset() == before {
			// At the end of the scrollable range; wait for the pointer to move.
			self.scroll_stalled = true;
			return false;
		}
		let movement = self.movement();
		self.listener.on_drag_move(movement);
		self.wants_frame()
	}

	/// Detaches from input: any drag in progress is cancelled and later
	/// events are ignored.
	pub fn detach(&mut self) {
		if self.detached {
			return;
		}
		self.pointer_cancel();
		self.detached = true;
		self.scroller = None;
	}

	/// Per-frame scroll step for the current pointer position, capped at
	/// the configured speed.
	pub fn scroll_velocity(&self) -> Point {
		let (Phase::Dragging { pointer, .. }, Some(scroller)) = (self.phase, self.scroller.as_ref()) else {
			return Point::ORIGIN;
		};
		let bounds = scroller.bounds();
		if bounds.is_empty() {
			return Point::ORIGIN;
		}
		let speed = |position: f64, start: f64, end: f64| {
			edge_speed(position, start, end, self.scroll_edge, self.max_scroll_speed)
		};
		match self.direction {
			ScrollDirection::Vertical => Point::new(0.0, speed(pointer.y, bounds.y, bounds.bottom())),
			ScrollDirection::Horizontal => Point::new(speed(pointer.x, bounds.x, bounds.right()), 0.0),
			ScrollDirection::None => Point::ORIGIN,
		}
	}

	fn scroll_offset(&self) -> Point {
		self.scroller
			.as_ref()
			.map_or(Point::ORIGIN, |scroller| scroller.scroll_offset().sanitized())
	}

	fn movement(&self) -> DragMovement {
		match self.phase {
			Phase::Dragging {
				origin,
				pointer,
				scroll_origin,
			} => DragMovement {
				pointer,
				delta: (pointer - origin) + (self.scroll_offset() - scroll_origin),
			},
			_ => DragMovement::default(),
		}
	}
}

fn edge_speed(position: f64, start: f64, end: f64, edge: f64, max: f64) -> f64 {
	if edge <= 0.0 || max <= 0.0 {
		return 0.0;
	}
	if position < start + edge {
		-max * ((start + edge - position) / edge).min(1.0)
	} else if position > end - edge {
		max * ((position - (end - edge)) / edge).min(1.0)
	} else {
		0.0
	}
}
