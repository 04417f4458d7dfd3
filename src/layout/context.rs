//! Chooses between persisted and simulated node positions and mediates drags.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, info, warn};

use super::coords::CoordinateFrame;
use super::engine::LayoutEngine;
use super::network::{
	LayoutVariable, NetworkModel, NetworkNode, derive_links, position_value, read_position,
};
use super::protocol::{LayoutEvent, SimulationNode, SimulationOptions};
use crate::config::Capabilities;
use crate::error::Result;
use crate::geometry::{Point, Rect};

/// Where the view reads node positions from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutMode {
	/// Positions come from the persisted layout attribute.
	Manual,
	/// Positions come from the running layout engine.
	Simulated,
}

#[derive(Debug, Default)]
struct LivePositions {
	relative: Vec<Option<Point>>,
	frame: CoordinateFrame,
}

/// Imperative position reads for the render loop.
///
/// Cloned into the view; reading never triggers reactive updates.
#[derive(Clone, Debug)]
pub struct PositionAccessor(Rc<RefCell<LivePositions>>);

impl PositionAccessor {
	/// Screen position of node `index`, or `None` while it has no position yet.
	pub fn get(&self, index: usize) -> Option<Point> {
		let live = self.0.borrow();
		let relative = (*live.relative.get(index)?)?;
		Some(live.frame.to_screen(relative))
	}

	/// Position of node `index` in the unit square.
	pub fn relative(&self, index: usize) -> Option<Point> {
		*self.0.borrow().relative.get(index)?
	}

	/// Number of node slots, placed or not.
	pub fn len(&self) -> usize {
		self.0.borrow().relative.len()
	}

	/// Whether there are no node slots.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// A copy of the current viewport frame.
	pub fn frame(&self) -> CoordinateFrame {
		self.0.borrow().frame.clone()
	}
}

/// Owns the layout mode, the live positions and the engine for one network.
///
/// Node indices follow the order of [`NetworkModel::nodes`] at the last
/// [`sync_network`](Self::sync_network); live positions and an active drag
/// follow their node by id across reorders.
pub struct LayoutContext<M> {
	network: M,
	variable: LayoutVariable,
	capabilities: Capabilities,
	options: SimulationOptions,
	engine: Option<LayoutEngine>,
	live: Rc<RefCell<LivePositions>>,
	nodes: Vec<NetworkNode>,
	mode: LayoutMode,
	initialized: bool,
	settled: bool,
	dragging: Option<usize>,
}

impl<M: NetworkModel> LayoutContext<M> {
	/// An unavailable `engine` permanently disables automatic layout.
	pub fn new(
		network: M,
		variable: LayoutVariable,
		capabilities: Capabilities,
		options: SimulationOptions,
		engine: Result<LayoutEngine>,
	) -> Self {
		let engine = match engine {
			Ok(engine) => Some(engine),
			Err(err) => {
				warn!("automatic layout disabled: {err}");
				None
			}
		};
		let mut context = Self {
			network,
			variable,
			capabilities,
			options,
			engine,
			live: Rc::default(),
			nodes: Vec::new(),
			mode: LayoutMode::Manual,
			initialized: false,
			settled: false,
			dragging: None,
		};
		context.sync_network();
		let automatic = context.capabilities.automatic_layout;
		context.set_automatic_layout(automatic);
		context
	}

	/// The mode in effect.
	pub fn mode(&self) -> LayoutMode {
		self.mode
	}

	/// Whether an engine is still attached.
	pub fn automatic_layout_available(&self) -> bool {
		self.engine.is_some()
	}

	/// A shared reader over the live positions.
	pub fn positions(&self) -> PositionAccessor {
		PositionAccessor(Rc::clone(&self.live))
	}

	/// The model positions are committed into.
	pub fn network(&self) -> &M {
		&self.network
	}

	/// Mutable access to the model. Call [`sync_network`](Self::sync_network)
	/// after changing its nodes or edges.
	pub fn network_mut(&mut self) -> &mut M {
		&mut self.network
	}

	/// Nodes as of the last sync, in index order.
	pub fn nodes(&self) -> &[NetworkNode] {
		&self.nodes
	}

	/// `false` in simulated mode until the layout has settled at least once.
	pub fn can_proceed(&self) -> bool {
		self.mode == LayoutMode::Manual || self.settled
	}

	/// Switches mode. Returns the mode actually in effect.
	pub fn set_automatic_layout(&mut self, enabled: bool) -> LayoutMode {
		self.capabilities.automatic_layout = enabled;
		let wanted = if enabled && self.engine.is_some() {
			LayoutMode::Simulated
		} else {
			LayoutMode::Manual
		};
		if wanted == self.mode {
			return self.mode;
		}
		info!("layout mode {:?} -> {wanted:?}", self.mode);
		self.dragging = None;
		self.mode = wanted;
		match wanted {
			LayoutMode::Simulated => {
				self.settled = false;
				self.initialize_engine();
			}
			LayoutMode::Manual => {
				self.with_engine(|engine| engine.stop());
				self.initialized = false;
				self.load_persisted();
			}
		}
		self.mode
	}

	/// Enables or disables dragging. Disabling abandons an active drag.
	pub fn set_allow_positioning(&mut self, allowed: bool) {
		self.capabilities.allow_positioning = allowed;
		if !allowed {
			self.dragging = None;
		}
	}

	/// Re-reads the model and forwards topology changes to the engine.
	pub fn sync_network(&mut self) {
		let previous = std::mem::replace(&mut self.nodes, self.network.nodes());
		let index_of = index_by_id(&self.nodes);
		self.dragging = self
			.dragging
			.and_then(|index| previous.get(index))
			.and_then(|node| index_of.get(node.id.as_str()).copied());
		match self.mode {
			LayoutMode::Manual => self.load_persisted(),
			LayoutMode::Simulated if !self.initialized => self.initialize_engine(),
			LayoutMode::Simulated => {
				{
					let mut live = self.live.borrow_mut();
					let by_id: HashMap<&str, Option<Point>> = previous
						.iter()
						.zip(live.relative.iter().copied())
						.map(|(node, relative)| (node.id.as_str(), relative))
						.collect();
					live.relative = self
						.nodes
						.iter()
						.map(|node| by_id.get(node.id.as_str()).copied().flatten())
						.collect();
				}
				let seeds = self.seeds();
				let links = derive_links(&self.nodes, &self.network.edges());
				self.with_engine(|engine| engine.update_network(Some(seeds), Some(links)));
			}
		}
	}

	/// Resizes the viewport.
	pub fn set_frame(&mut self, viewport: Rect) {
		self.live.borrow_mut().frame.resize(viewport);
	}

	/// Zooms by `factor` keeping the screen point `focus` fixed.
	pub fn zoom_at(&mut self, focus: Point, factor: f64) {
		self.live.borrow_mut().frame.zoom_at(focus, factor);
	}

	/// Pans by a screen-space delta.
	pub fn pan_by(&mut self, delta: Point) {
		self.live.borrow_mut().frame.pan_by(delta);
	}

	/// Wakes a settled simulation. No-op in manual mode.
	pub fn reheat(&mut self) {
		if self.mode == LayoutMode::Simulated {
			self.with_engine(|engine| engine.reheat());
		}
	}

	/// Starts dragging node `index`. Ignored when positioning is not allowed.
	pub fn begin_drag(&mut self, index: usize) -> bool {
		if !self.capabilities.allow_positioning || index >= self.nodes.len() {
			return false;
		}
		self.dragging = Some(index);
		true
	}

	/// Moves the dragged node under the screen point `screen`.
	pub fn drag_to(&mut self, screen: Point) {
		let Some(index) = self.dragging else {
			return;
		};
		let (relative, simulated) = {
			let mut live = self.live.borrow_mut();
			let relative = clamp_unit(live.frame.to_relative(screen));
			if let Some(slot) = live.relative.get_mut(index) {
				*slot = Some(relative);
			}
			(relative, live.frame.to_simulation(relative))
		};
		if self.mode == LayoutMode::Simulated {
			self.with_engine(|engine| engine.move_node(simulated, index));
		} else {
			debug!("manual drag of node {index} to {relative:?}");
		}
	}

	/// Finishes the drag, committing manual positions or releasing the pin.
	pub fn end_drag(&mut self) {
		let Some(index) = self.dragging.take() else {
			return;
		};
		match self.mode {
			LayoutMode::Simulated => self.with_engine(|engine| engine.release_node(index)),
			LayoutMode::Manual => {
				let relative = self.positions().relative(index);
				if let Some(relative) = relative {
					self.commit(index, relative);
				}
			}
		}
	}

	/// Drains engine events into the live positions. Returns `true` when a
	/// settlement was committed.
	pub fn pump(&mut self) -> bool {
		if self.mode != LayoutMode::Simulated {
			return false;
		}
		let events = match self.engine.as_mut() {
			Some(engine) => engine.poll(),
			None => return false,
		};
		let mut settled = false;
		for event in events {
			match event {
				LayoutEvent::Tick { nodes, .. } => self.apply_tick(&nodes),
				LayoutEvent::End { nodes, .. } => {
					self.apply_end(&nodes);
					settled = true;
				}
			}
		}
		settled
	}

	fn apply_tick(&mut self, nodes: &[SimulationNode]) {
		let index_of = index_by_id(&self.nodes);
		let mut live = self.live.borrow_mut();
		let live = &mut *live;
		for node in nodes {
			let Some(index) = resolve(&index_of, node) else {
				continue;
			};
			if let Some(slot) = live.relative.get_mut(index) {
				if node.position().is_finite() {
					*slot = Some(live.frame.from_simulation(node.position()));
				}
			}
		}
	}

	fn apply_end(&mut self, nodes: &[SimulationNode]) {
		let committed: Vec<(usize, Point)> = {
			let index_of = index_by_id(&self.nodes);
			let mut live = self.live.borrow_mut();
			let live = &mut *live;
			let points: Vec<Point> = nodes.iter().map(SimulationNode::position).collect();
			live.frame.fit_to(&points);
			nodes
				.iter()
				.filter(|node| node.position().is_finite())
				.filter_map(|node| {
					let index = resolve(&index_of, node)?;
					let relative = clamp_unit(live.frame.from_simulation(node.position()));
					let slot = live.relative.get_mut(index)?;
					*slot = Some(relative);
					Some((index, relative))
				})
				.collect()
		};
		for (index, relative) in committed {
			self.commit(index, relative);
		}
		self.settled = true;
		info!("layout settled, committed {} positions", self.nodes.len());
	}

	fn commit(&mut self, index: usize, relative: Point) {
		let Some(node) = self.nodes.get(index) else {
			return;
		};
		let Some(key) = self.variable.key_for(&node.node_type) else {
			debug!("no layout variable for node type `{}`", node.node_type);
			return;
		};
		self.network
			.update_node_attribute(&node.id, key, position_value(relative));
	}

	fn load_persisted(&mut self) {
		let relative = self
			.nodes
			.iter()
			.map(|node| read_position(node, &self.variable))
			.collect();
		self.live.borrow_mut().relative = relative;
	}

	/// Simulation-space seeds; unplaced nodes get a non-finite position for the
	/// engine to place.
	fn seeds(&self) -> Vec<SimulationNode> {
		let live = self.live.borrow();
		self.nodes
			.iter()
			.enumerate()
			.map(|(index, node)| {
				let point = read_position(node, &self.variable)
					.map(|relative| live.frame.to_simulation(relative))
					.unwrap_or(Point::new(f64::NAN, f64::NAN));
				SimulationNode::at(index, point).with_id(node.id.as_str())
			})
			.collect()
	}

	fn initialize_engine(&mut self) {
		self.load_persisted();
		let seeds = self.seeds();
		let links = derive_links(&self.nodes, &self.network.edges());
		let options = self.options.clone();
		self.with_engine(|engine| {
			engine.initialize(seeds, links, options)?;
			engine.start()
		});
		self.initialized = self.engine.is_some();
	}

	/// Runs `f` against the engine, degrading to manual layout if it has gone away.
	fn with_engine(&mut self, f: impl FnOnce(&mut LayoutEngine) -> Result<()>) {
		let Some(engine) = self.engine.as_mut() else {
			return;
		};
		if let Err(err) = f(engine) {
			warn!("automatic layout disabled: {err}");
			self.engine = None;
			self.initialized = false;
			if self.mode == LayoutMode::Simulated {
				self.mode = LayoutMode::Manual;
				self.load_persisted();
			}
		}
	}
}

fn index_by_id(nodes: &[NetworkNode]) -> HashMap<&str, usize> {
	nodes
		.iter()
		.enumerate()
		.map(|(index, node)| (node.id.as_str(), index))
		.collect()
}

/// Current index of a simulation node. Anonymous nodes keep their own index;
/// nodes whose id has left the network resolve to nothing.
fn resolve(index_of: &HashMap<&str, usize>, node: &SimulationNode) -> Option<usize> {
	match node.id.as_deref() {
		Some(id) => index_of.get(id).copied(),
		None => Some(node.index),
	}
}

fn clamp_unit(point: Point) -> Point {
	let point = point.sanitized();
	Point::new(point.x.clamp(0.0, 1.0), point.y.clamp(0.0, 1.0))
}
