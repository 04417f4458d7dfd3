use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::prelude::*;
use log::{debug, info};
use serde_json::Value;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, Element, HtmlCanvasElement, PointerEvent, WheelEvent};

use super::dom::{DomElement, ResizeWatch, page_offset};
use super::model::SignalNetwork;
use super::render::{self, Scene};
use crate::config::SociogramConfig;
use crate::drag_and_drop::{
	DragListener, DragManager, DragMovement, DropTarget, MeasureStrategy, Meta, Registry, TargetCallbacks,
};
use crate::geometry::{Point, Rect, absolute_bounds};
use crate::layout::{
	LayoutContext, LayoutEngine, LayoutVariable, MemoryNetwork, NetworkModel, PositionAccessor,
	SimulationLink, derive_links, position_value,
};

/// Meta `itemType` accepted when dropping onto the canvas.
pub const EXISTING_NODE: &str = "EXISTING_NODE";

type Shared<T> = Rc<RefCell<T>>;

#[derive(Clone, Copy, Debug, PartialEq)]
enum Grab {
	Node(usize),
	Canvas,
}

/// Turns canvas gestures into node drags or panning.
struct CanvasGesture {
	context: Shared<LayoutContext<SignalNetwork>>,
	grab: Option<Grab>,
	last_delta: Point,
}

impl DragListener for CanvasGesture {
	fn on_drag_start(&mut self, movement: DragMovement) {
		self.last_delta = Point::ORIGIN;
		if let Some(Grab::Node(index)) = self.grab {
			if !self.context.borrow_mut().begin_drag(index) {
				self.grab = Some(Grab::Canvas);
			}
		}
		self.on_drag_move(movement);
	}

	fn on_drag_move(&mut self, movement: DragMovement) {
		let mut context = self.context.borrow_mut();
		match self.grab {
			Some(Grab::Node(_)) => context.drag_to(movement.pointer),
			Some(Grab::Canvas) => context.pan_by(movement.delta - self.last_delta),
			None => {}
		}
		self.last_delta = movement.delta;
	}

	fn on_drag_end(&mut self, movement: DragMovement) {
		self.on_drag_move(movement);
		if let Some(Grab::Node(_)) = self.grab.take() {
			self.context.borrow_mut().end_drag();
		}
	}
}

struct CanvasState {
	context: Shared<LayoutContext<SignalNetwork>>,
	positions: PositionAccessor,
	gesture: DragManager<CanvasGesture>,
	links: Vec<SimulationLink>,
	hover: Option<usize>,
	width: f64,
	height: f64,
	drop_target: Option<DropTarget<DomElement>>,
	resize: Option<ResizeWatch>,
}

impl CanvasState {
	fn sync(&mut self) {
		let mut context = self.context.borrow_mut();
		context.sync_network();
		self.links = derive_links(context.nodes(), &context.network().0.with_untracked(|n| n.edges.clone()));
	}

	fn resize(&mut self, canvas: &HtmlCanvasElement, width: f64, height: f64) {
		canvas.set_width(width as u32);
		canvas.set_height(height as u32);
		self.width = width;
		self.height = height;
		self.context
			.borrow_mut()
			.set_frame(Rect::new(0.0, 0.0, width, height));
		if let Some(target) = self.drop_target.as_mut() {
			target.set_page_offset(page_offset());
			target.geometry_changed();
		}
	}
}

fn parent_size(canvas: &HtmlCanvasElement) -> (f64, f64) {
	canvas
		.parent_element()
		.map(|p| (p.client_width() as f64, p.client_height() as f64))
		.filter(|(w, h)| *w > 0.0 && *h > 0.0)
		.unwrap_or((800.0, 600.0))
}

fn local_point(canvas: &HtmlCanvasElement, client: Point) -> Point {
	let rect = canvas.get_bounding_client_rect();
	Point::new(client.x - rect.left(), client.y - rect.top())
}

/// Writes the dropped node's position as the relative point under `page_point`.
fn place_dropped_node(
	network: RwSignal<MemoryNetwork>,
	variable: &LayoutVariable,
	canvas: &HtmlCanvasElement,
	positions: &PositionAccessor,
	meta: &Meta,
	page_point: Point,
) {
	let Some(node_id) = meta.get("nodeId").and_then(Value::as_str) else {
		debug!("dropped item has no nodeId");
		return;
	};
	let element: Element = canvas.clone().into();
	let Ok(bounds) = absolute_bounds(&DomElement(element), page_offset()) else {
		return;
	};
	let local = page_point - Point::new(bounds.x, bounds.y);
	let relative = positions.frame().to_relative(local);
	let relative = Point::new(relative.x.clamp(0.0, 1.0), relative.y.clamp(0.0, 1.0));
	network.update(|network| {
		let key = network
			.node(node_id)
			.and_then(|node| variable.key_for(&node.node_type))
			.map(str::to_string);
		if let Some(key) = key {
			info!("placed node `{node_id}` at {relative:?}");
			network.update_node_attribute(node_id, &key, position_value(relative));
		}
	});
}

/// Drains layout events and draws one frame.
fn draw_frame(s: &mut CanvasState, ctx: &CanvasRenderingContext2d, ready: Option<RwSignal<bool>>) {
	let mut context = s.context.borrow_mut();
	context.pump();
	if let Some(ready) = ready {
		let can_proceed = context.can_proceed();
		if ready.get_untracked() != can_proceed {
			ready.set(can_proceed);
		}
	}
	let scene = Scene {
		positions: &s.positions,
		nodes: context.nodes(),
		links: &s.links,
		hover: s.hover,
		width: s.width,
		height: s.height,
		zoom: s.positions.frame().zoom(),
	};
	render::render(&scene, ctx);
}

/// A sociogram drawn on a canvas.
///
/// Node positions are read through the layout's position accessor on every
/// animation frame; only committed positions go through `network`. When a
/// `registry` is supplied the canvas is also a drop target for
/// `EXISTING_NODE` items carrying a `nodeId`.
#[component]
pub fn SociogramCanvas(
	/// The network drawn and committed into.
	network: RwSignal<MemoryNetwork>,
	/// Attribute(s) holding persisted positions.
	#[prop(into)]
	variable: LayoutVariable,
	/// Drag, physics and capability defaults.
	#[prop(optional)]
	config: SociogramConfig,
	/// Overrides `config.capabilities.automatic_layout` reactively.
	#[prop(into, optional)]
	automatic_layout: Option<Signal<bool>>,
	/// Overrides `config.capabilities.allow_positioning` reactively.
	#[prop(into, optional)]
	allow_positioning: Option<Signal<bool>>,
	/// Makes the canvas a drop target in this registry.
	#[prop(optional)]
	registry: Option<Registry>,
	/// Set to `true` once a simulated layout has settled.
	#[prop(optional)]
	ready: Option<RwSignal<bool>>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: Shared<Option<CanvasState>> = Rc::new(RefCell::new(None));
	let animate: Shared<Option<Closure<dyn FnMut()>>> = Rc::new(RefCell::new(None));
	let frame_handle: Rc<Cell<Option<i32>>> = Rc::new(Cell::new(None));
	let (state_init, animate_init, handle_init) = (state.clone(), animate.clone(), frame_handle.clone());

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		if state_init.borrow().is_some() {
			return;
		}
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(ctx) = canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())
		else {
			return;
		};

		let mut capabilities = config.capabilities;
		if let Some(automatic) = automatic_layout {
			capabilities.automatic_layout = automatic.get_untracked();
		}
		if let Some(allowed) = allow_positioning {
			capabilities.allow_positioning = allowed.get_untracked();
		}
		let context = Rc::new(RefCell::new(LayoutContext::new(
			SignalNetwork(network),
			variable.clone(),
			capabilities,
			config.simulation.clone(),
			LayoutEngine::spawn(),
		)));
		let positions = context.borrow().positions();
		let gesture = DragManager::new(
			CanvasGesture {
				context: context.clone(),
				grab: None,
				last_delta: Point::ORIGIN,
			},
			&config.drag,
		);

		let drop_target = registry.clone().map(|registry| {
			let last_point = Rc::new(Cell::new(Point::ORIGIN));
			let hovering = last_point.clone();
			let (drop_canvas, drop_positions, drop_variable) =
				(canvas.clone(), positions.clone(), variable.clone());
			let callbacks = TargetCallbacks::new()
				.accepts(|source| {
					source.meta.get("itemType").and_then(Value::as_str) == Some(EXISTING_NODE)
				})
				.on_drag(move |source| hovering.set(source.point()))
				.on_drop(move |meta| {
					place_dropped_node(
						network,
						&drop_variable,
						&drop_canvas,
						&drop_positions,
						meta,
						last_point.get(),
					)
				});
			let mut target = DropTarget::new("sociogram-canvas", registry, callbacks, MeasureStrategy::Observed);
			target.attach(DomElement(canvas.clone().into()));
			target
		});

		let (w, h) = parent_size(&canvas);
		let mut canvas_state = CanvasState {
			context,
			positions,
			gesture,
			links: Vec::new(),
			hover: None,
			width: w,
			height: h,
			drop_target,
			resize: None,
		};
		canvas_state.resize(&canvas, w, h);
		canvas_state.sync();

		if let Some(parent) = canvas.parent_element() {
			let (state_resize, canvas_resize) = (state_init.clone(), canvas.clone());
			canvas_state.resize = Some(ResizeWatch::new(&parent, config.drag.poll_interval_ms, move || {
				let (nw, nh) = parent_size(&canvas_resize);
				if let Ok(mut guard) = state_resize.try_borrow_mut() {
					if let Some(s) = guard.as_mut() {
						s.resize(&canvas_resize, nw, nh);
					}
				}
			}));
		}
		*state_init.borrow_mut() = Some(canvas_state);

		let (state_anim, animate_inner, handle_inner) =
			(state_init.clone(), animate_init.clone(), handle_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			handle_inner.set(None);
			let keep_running = match state_anim.try_borrow_mut() {
				Ok(mut guard) => match guard.as_mut() {
					Some(s) => {
						draw_frame(s, &ctx, ready);
						true
					}
					// Unmounted.
					None => false,
				},
				Err(_) => true,
			};
			if !keep_running {
				return;
			}
			if let (Some(window), Some(cb)) = (web_sys::window(), animate_inner.borrow().as_ref()) {
				if let Ok(id) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
					handle_inner.set(Some(id));
				}
			}
		}));
		if let (Some(window), Some(cb)) = (web_sys::window(), animate_init.borrow().as_ref()) {
			if let Ok(id) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
				handle_init.set(Some(id));
			}
		}
	});

	let state_sync = state.clone();
	Effect::new(move |_| {
		network.track();
		if let Ok(mut guard) = state_sync.try_borrow_mut() {
			if let Some(s) = guard.as_mut() {
				s.sync();
			}
		}
	});

	let state_caps = state.clone();
	Effect::new(move |_| {
		let automatic = automatic_layout.map(|s| s.get());
		let allowed = allow_positioning.map(|s| s.get());
		let Ok(guard) = state_caps.try_borrow() else {
			return;
		};
		let Some(s) = guard.as_ref() else {
			return;
		};
		let mut context = s.context.borrow_mut();
		if let Some(automatic) = automatic {
			context.set_automatic_layout(automatic);
		}
		if let Some(allowed) = allowed {
			context.set_allow_positioning(allowed);
		}
	});

	let cleanup = StoredValue::new_local((state.clone(), animate.clone(), frame_handle.clone()));
	on_cleanup(move || {
		let _ = cleanup.try_with_value(|(state, animate, handle)| {
			if let (Some(window), Some(id)) = (web_sys::window(), handle.take()) {
				let _ = window.cancel_animation_frame(id);
			}
			let taken = state.borrow_mut().take();
			drop(taken);
			animate.borrow_mut().take();
		});
	});

	let state_pd = state.clone();
	let on_pointerdown = move |ev: PointerEvent| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let point = local_point(&canvas, Point::new(ev.client_x() as f64, ev.client_y() as f64));
		if let Some(ref mut s) = *state_pd.borrow_mut() {
			let grab = render::node_at_position(&s.positions, point)
				.map(Grab::Node)
				.unwrap_or(Grab::Canvas);
			s.gesture.listener_mut().grab = Some(grab);
			s.gesture.pointer_down(point);
			let _ = canvas.set_pointer_capture(ev.pointer_id());
		}
	};

	let state_pm = state.clone();
	let on_pointermove = move |ev: PointerEvent| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let point = local_point(&canvas, Point::new(ev.client_x() as f64, ev.client_y() as f64));
		if let Some(ref mut s) = *state_pm.borrow_mut() {
			if !s.gesture.is_dragging() {
				s.hover = render::node_at_position(&s.positions, point);
			}
			s.gesture.pointer_move(point);
		}
	};

	let state_pu = state.clone();
	let on_pointerup = move |ev: PointerEvent| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let point = local_point(&canvas, Point::new(ev.client_x() as f64, ev.client_y() as f64));
		if let Some(ref mut s) = *state_pu.borrow_mut() {
			s.gesture.pointer_up(point);
			s.gesture.listener_mut().grab = None;
		}
	};

	let state_pc = state.clone();
	let on_pointercancel = move |_: PointerEvent| {
		if let Some(ref mut s) = *state_pc.borrow_mut() {
			s.gesture.pointer_cancel();
			s.gesture.listener_mut().grab = None;
			s.hover = None;
		}
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let point = local_point(&canvas, Point::new(ev.client_x() as f64, ev.client_y() as f64));
		if let Some(ref s) = *state_wh.borrow() {
			let factor = if ev.delta_y() > 0.0 { 0.9 } else { 1.1 };
			s.context.borrow_mut().zoom_at(point, factor);
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="sociogram-canvas"
			on:pointerdown=on_pointerdown
			on:pointermove=on_pointermove
			on:pointerup=on_pointerup
			on:pointercancel=on_pointercancel
			on:wheel=on_wheel
			style="display: block; cursor: grab; touch-action: none;"
		/>
	}
}
