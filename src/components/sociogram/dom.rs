//! web-sys implementations of the element, scroll, preview and pointer seams.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use log::debug;
use wasm_bindgen::prelude::*;
use web_sys::{Element, HtmlElement, PointerEvent, ResizeObserver, Window};

use crate::drag_and_drop::{DragListener, DragManager, DragMovement, DragPreview, ScrollContainer};
use crate::geometry::{ElementRef, Point, Rect};

fn window() -> Option<Window> {
	web_sys::window()
}

fn client_rect(element: &Element) -> Rect {
	let rect = element.get_bounding_client_rect();
	Rect::new(rect.left(), rect.top(), rect.width(), rect.height())
}

/// Current page scroll, for absolute registry coordinates.
pub fn page_offset() -> Point {
	window()
		.map(|w| Point::new(w.scroll_x().unwrap_or(0.0), w.scroll_y().unwrap_or(0.0)))
		.unwrap_or(Point::ORIGIN)
}

/// Viewport position of a pointer event.
pub fn pointer_point(ev: &PointerEvent) -> Point {
	Point::new(ev.client_x() as f64, ev.client_y() as f64)
}

/// A DOM element measured through [`ElementRef`].
#[derive(Clone, Debug)]
pub struct DomElement(pub Element);

impl ElementRef for DomElement {
	fn is_attached(&self) -> bool {
		self.0.is_connected()
	}

	fn client_rect(&self) -> Rect {
		client_rect(&self.0)
	}

	fn scroll_offset(&self) -> Point {
		Point::new(self.0.scroll_left() as f64, self.0.scroll_top() as f64)
	}

	fn parent(&self) -> Option<Self> {
		let parent = self.0.parent_element()?;
		if parent.tag_name().eq_ignore_ascii_case("body") {
			return None;
		}
		Some(DomElement(parent))
	}

	fn describe(&self) -> String {
		let id = self.0.id();
		if id.is_empty() {
			self.0.tag_name().to_lowercase()
		} else {
			format!("{}#{id}", self.0.tag_name().to_lowercase())
		}
	}
}

/// A scrollable ancestor driven by auto-scroll.
pub struct DomScroller(pub Element);

impl DomScroller {
	/// Nearest ancestor of `element` whose content overflows.
	pub fn nearest(element: &Element) -> Option<Self> {
		let mut current = element.parent_element();
		while let Some(candidate) = current {
			if candidate.scroll_height() > candidate.client_height()
				|| candidate.scroll_width() > candidate.client_width()
			{
				return Some(DomScroller(candidate));
			}
			current = candidate.parent_element();
		}
		None
	}
}

impl ScrollContainer for DomScroller {
	fn bounds(&self) -> Rect {
		client_rect(&self.0)
	}

	fn scroll_offset(&self) -> Point {
		Point::new(self.0.scroll_left() as f64, self.0.scroll_top() as f64)
	}

	fn scroll_by(&mut self, delta: Point) {
		// The browser clamps to the scrollable range.
		self.0
			.set_scroll_left(self.0.scroll_left() + delta.x.round() as i32);
		self.0
			.set_scroll_top(self.0.scroll_top() + delta.y.round() as i32);
	}
}

/// A deep clone of the dragged element, fixed to the viewport under the pointer.
pub struct ClonePreview {
	source: Element,
	clone: Option<HtmlElement>,
	anchor: Point,
}

impl ClonePreview {
	/// A preview cloned from `source` when the drag starts.
	pub fn new(source: Element) -> Self {
		Self {
			source,
			clone: None,
			anchor: Point::ORIGIN,
		}
	}

	fn place(&self, movement: DragMovement) {
		let Some(clone) = self.clone.as_ref() else {
			return;
		};
		let style = clone.style();
		let _ = style.set_property("left", &format!("{}px", self.anchor.x + movement.pointer.x));
		let _ = style.set_property("top", &format!("{}px", self.anchor.y + movement.pointer.y));
	}
}

impl DragPreview for ClonePreview {
	fn show(&mut self, movement: DragMovement) {
		let Some(body) = window().and_then(|w| w.document()).and_then(|d| d.body()) else {
			return;
		};
		let Ok(node) = self.source.clone_node_with_deep(true) else {
			return;
		};
		let Ok(clone) = node.dyn_into::<HtmlElement>() else {
			return;
		};
		let rect = client_rect(&self.source);
		self.anchor = Point::new(rect.x, rect.y) - movement.press_point();
		let style = clone.style();
		let (width, height) = (format!("{}px", rect.width), format!("{}px", rect.height));
		for (key, value) in [
			("position", "fixed"),
			("pointer-events", "none"),
			("margin", "0"),
			("opacity", "0.8"),
			("z-index", "1000"),
			("width", width.as_str()),
			("height", height.as_str()),
		] {
			let _ = style.set_property(key, value);
		}
		if body.append_child(&clone).is_ok() {
			self.clone = Some(clone);
			self.place(movement);
		}
	}

	fn update(&mut self, movement: DragMovement) {
		self.place(movement);
	}

	fn remove(&mut self) {
		if let Some(clone) = self.clone.take() {
			clone.remove();
		}
	}
}

type PointerClosure = Closure<dyn FnMut(PointerEvent)>;
type Callback = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

/// Wires pointer events on an element to a [`DragManager`].
///
/// Press is heard on the element; move/up/cancel on the window so a drag
/// survives leaving the element. Auto-scroll runs on animation frames and a
/// timeout delivers the last throttled position once its interval elapses.
/// Dropping the binding detaches every listener, cancels the pending frame
/// and timeout, and cancels any drag in progress.
pub struct PointerBinding<L: DragListener + 'static> {
	manager: Rc<RefCell<DragManager<L>>>,
	element: Element,
	listeners: Vec<(bool, &'static str, PointerClosure)>,
	frame: Callback,
	frame_handle: Rc<Cell<Option<i32>>>,
	timer: Callback,
	timer_handle: Rc<Cell<Option<i32>>>,
}

impl<L: DragListener + 'static> PointerBinding<L> {
	/// `on_press` runs before each press reaches the manager.
	pub fn bind(
		element: Element,
		manager: DragManager<L>,
		on_press: impl Fn(&mut DragManager<L>) + 'static,
	) -> Self {
		let manager = Rc::new(RefCell::new(manager));
		let frame: Callback = Rc::new(RefCell::new(None));
		let frame_handle = Rc::new(Cell::new(None));
		let timer: Callback = Rc::new(RefCell::new(None));
		let timer_handle = Rc::new(Cell::new(None));

		let (timer_manager, timer_inner, timer_handle_inner) =
			(manager.clone(), timer.clone(), timer_handle.clone());
		*timer.borrow_mut() = Some(Closure::new(move || {
			timer_handle_inner.set(None);
			let delay = {
				let mut manager = timer_manager.borrow_mut();
				manager.flush();
				manager.flush_delay()
			};
			if let Some(delay) = delay {
				schedule_flush(&timer_inner, &timer_handle_inner, delay);
			}
		}));

		let (frame_manager, frame_inner, handle_inner) =
			(manager.clone(), frame.clone(), frame_handle.clone());
		let (frame_timer, frame_timer_handle) = (timer.clone(), timer_handle.clone());
		*frame.borrow_mut() = Some(Closure::new(move || {
			handle_inner.set(None);
			let (again, delay) = {
				let mut manager = frame_manager.borrow_mut();
				(manager.animation_frame(), manager.flush_delay())
			};
			if again {
				request_frame(&frame_inner, &handle_inner);
			}
			if let (Some(delay), None) = (delay, frame_timer_handle.get()) {
				schedule_flush(&frame_timer, &frame_timer_handle, delay);
			}
		}));

		let mut binding = Self {
			manager,
			element,
			listeners: Vec::new(),
			frame,
			frame_handle,
			timer,
			timer_handle,
		};
		binding.listen(false, "pointerdown", move |manager, ev| {
			if ev.button() == 0 {
				on_press(manager);
				manager.pointer_down(pointer_point(&ev));
			}
		});
		binding.listen(true, "pointermove", |manager, ev| {
			manager.pointer_move(pointer_point(&ev));
		});
		binding.listen(true, "pointerup", |manager, ev| {
			manager.pointer_up(pointer_point(&ev));
		});
		binding.listen(true, "pointercancel", |manager, _| {
			manager.pointer_cancel();
		});
		binding
	}

	/// The shared manager, for host code that feeds it directly.
	pub fn manager(&self) -> Rc<RefCell<DragManager<L>>> {
		self.manager.clone()
	}

	fn listen(
		&mut self,
		on_window: bool,
		event: &'static str,
		handler: impl Fn(&mut DragManager<L>, PointerEvent) + 'static,
	) {
		let (manager, frame, handle) = (
			self.manager.clone(),
			self.frame.clone(),
			self.frame_handle.clone(),
		);
		let (timer, timer_handle) = (self.timer.clone(), self.timer_handle.clone());
		let closure: PointerClosure = Closure::new(move |ev: PointerEvent| {
			let (wants_frame, delay) = {
				let mut manager = manager.borrow_mut();
				handler(&mut *manager, ev);
				(manager.wants_frame(), manager.flush_delay())
			};
			if wants_frame && handle.get().is_none() {
				request_frame(&frame, &handle);
			}
			if let (Some(delay), None) = (delay, timer_handle.get()) {
				schedule_flush(&timer, &timer_handle, delay);
			}
		});
		let added = if on_window {
			window().map(|w| w.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref()))
		} else {
			Some(
				self.element
					.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref()),
			)
		};
		if matches!(added, Some(Ok(()))) {
			self.listeners.push((on_window, event, closure));
		} else {
			debug!("could not listen for {event}");
		}
	}
}

fn request_frame(frame: &Callback, handle: &Rc<Cell<Option<i32>>>) {
	let Some(window) = window() else {
		return;
	};
	if let Some(cb) = frame.borrow().as_ref() {
		if let Ok(id) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
			handle.set(Some(id));
		}
	}
}

fn schedule_flush(timer: &Callback, handle: &Rc<Cell<Option<i32>>>, delay_ms: f64) {
	let Some(window) = window() else {
		return;
	};
	if let Some(cb) = timer.borrow().as_ref() {
		let timeout = delay_ms.max(0.0).ceil() as i32;
		if let Ok(id) =
			window.set_timeout_with_callback_and_timeout_and_arguments_0(cb.as_ref().unchecked_ref(), timeout)
		{
			handle.set(Some(id));
		}
	}
}

impl<L: DragListener + 'static> Drop for PointerBinding<L> {
	fn drop(&mut self) {
		let window = window();
		if let (Some(window), Some(id)) = (window.as_ref(), self.frame_handle.take()) {
			let _ = window.cancel_animation_frame(id);
		}
		if let (Some(window), Some(id)) = (window.as_ref(), self.timer_handle.take()) {
			window.clear_timeout_with_handle(id);
		}
		for (on_window, event, closure) in self.listeners.drain(..) {
			let callback: &js_sys::Function = closure.as_ref().unchecked_ref();
			if on_window {
				if let Some(window) = window.as_ref() {
					let _ = window.remove_event_listener_with_callback(event, callback);
				}
			} else {
				let _ = self.element.remove_event_listener_with_callback(event, callback);
			}
		}
		self.frame.borrow_mut().take();
		self.timer.borrow_mut().take();
		if let Ok(mut manager) = self.manager.try_borrow_mut() {
			manager.detach();
		}
	}
}

/// Geometry change notifications for an element.
///
/// Uses `ResizeObserver` where available and falls back to a cancellable
/// interval otherwise. Dropping the watch stops both.
pub struct ResizeWatch {
	observer: Option<ResizeObserver>,
	interval: Option<i32>,
	_callback: Closure<dyn FnMut()>,
}

impl ResizeWatch {
	/// Calls `on_change` whenever `element` may have changed size.
	pub fn new(element: &Element, poll_interval_ms: f64, on_change: impl FnMut() + 'static) -> Self {
		let callback: Closure<dyn FnMut()> = Closure::new(on_change);
		let observer = ResizeObserver::new(callback.as_ref().unchecked_ref()).ok();
		let mut interval = None;
		match observer.as_ref() {
			Some(observer) => observer.observe(element),
			None => {
				debug!("ResizeObserver unavailable, polling every {poll_interval_ms}ms");
				interval = window().and_then(|w| {
					w.set_interval_with_callback_and_timeout_and_arguments_0(
						callback.as_ref().unchecked_ref(),
						poll_interval_ms as i32,
					)
					.ok()
				});
			}
		}
		Self {
			observer,
			interval,
			_callback: callback,
		}
	}

	/// Whether a `ResizeObserver` is in use rather than polling.
	pub fn is_observing(&self) -> bool {
		self.observer.is_some()
	}
}

impl Drop for ResizeWatch {
	fn drop(&mut self) {
		if let Some(observer) = self.observer.take() {
			observer.disconnect();
		}
		if let (Some(id), Some(window)) = (self.interval.take(), window()) {
			window.clear_interval_with_handle(id);
		}
	}
}
