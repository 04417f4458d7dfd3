//! Alpha-cooled force simulation over `force_graph`.
//!
//! The node array owned here is canonical; the `ForceGraph` is rebuilt from it
//! whenever the topology changes and read back after every integration step.

use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};
use log::{debug, info};

use super::protocol::{LayoutCommand, LayoutEvent, SimulationLink, SimulationNode, SimulationOptions};
use crate::geometry::Point;

/// Alpha a reheated or dragged simulation resumes from.
pub const REHEAT_ALPHA: f64 = 0.3;

const SEED_RADIUS: f64 = 10.0;

/// What one [`Simulation::tick`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
	/// Integrated one step; still cooling.
	Ticked,
	/// Alpha fell below the minimum and the simulation stopped.
	Settled,
}

/// The layout state machine served by every backend.
pub struct Simulation {
	options: SimulationOptions,
	generation: u64,
	nodes: Vec<SimulationNode>,
	links: Vec<SimulationLink>,
	graph: ForceGraph<usize, ()>,
	handles: Vec<DefaultNodeIdx>,
	alpha: f64,
	running: bool,
}

impl Default for Simulation {
	fn default() -> Self {
		Self::new()
	}
}

impl Simulation {
	/// An empty, stopped simulation.
	pub fn new() -> Self {
		let options = SimulationOptions::default();
		Self {
			graph: ForceGraph::new(parameters(&options)),
			options,
			generation: 0,
			nodes: Vec::new(),
			links: Vec::new(),
			handles: Vec::new(),
			alpha: 1.0,
			running: false,
		}
	}

	/// Resets all state and seeds positions. The simulation stays inert until `start`.
	pub fn initialize(
		&mut self,
		nodes: Vec<SimulationNode>,
		links: Vec<SimulationLink>,
		options: SimulationOptions,
	) {
		info!("layout initialized with {} nodes, {} links", nodes.len(), links.len());
		self.options = options;
		self.nodes = prepare(nodes);
		self.links = links;
		self.alpha = 1.0;
		self.running = false;
		self.rebuild();
	}

	/// Resumes ticking.
	pub fn start(&mut self) {
		self.running = true;
	}

	/// Pauses ticking. Safe before `initialize` and when already stopped.
	pub fn stop(&mut self) {
		self.running = false;
	}

	/// Resumes from [`REHEAT_ALPHA`].
	pub fn reheat(&mut self) {
		self.alpha = REHEAT_ALPHA;
		self.running = true;
	}

	/// Replaces nodes and/or links. Returns whether the simulation restarted.
	///
	/// A same-count node set is adopted in place without restarting: nodes
	/// whose id matches a current node keep that node's position, velocity and
	/// pin wherever they now sit in the array. A count change in either set
	/// adopts the incoming positions and restarts.
	pub fn update_network(
		&mut self,
		nodes: Option<Vec<SimulationNode>>,
		links: Option<Vec<SimulationLink>>,
	) -> bool {
		let mut restart = false;
		let mut rebuild = false;
		if let Some(nodes) = nodes {
			if nodes.len() != self.nodes.len() {
				self.nodes = prepare(nodes);
				restart = true;
			} else {
				let nodes = carry_over(&self.nodes, nodes);
				self.nodes = prepare(nodes);
			}
			rebuild = true;
		}
		if let Some(links) = links {
			restart |= links.len() != self.links.len();
			rebuild |= links != self.links;
			self.links = links;
		}
		if rebuild {
			self.rebuild();
		}
		if restart {
			debug!("network size changed, restarting layout");
			self.alpha = 1.0;
			self.running = true;
		}
		restart
	}

	/// Pins node `index` at `point`, waking a settled simulation so its
	/// neighbours follow the drag.
	pub fn move_node(&mut self, point: Point, index: usize) {
		if !point.is_finite() {
			return;
		}
		let Some(node) = self.nodes.get_mut(index) else {
			return;
		};
		node.fx = Some(point.x);
		node.fy = Some(point.y);
		node.x = point.x;
		node.y = point.y;
		node.vx = 0.0;
		node.vy = 0.0;
		self.sync_node(index);
		if !self.running {
			self.alpha = self.alpha.max(REHEAT_ALPHA);
			self.running = true;
		}
	}

	/// Unpins node `index`.
	pub fn release_node(&mut self, index: usize) {
		let Some(node) = self.nodes.get_mut(index) else {
			return;
		};
		node.fx = None;
		node.fy = None;
		self.sync_node(index);
	}

	/// Advances one integration step. `None` while stopped.
	pub fn tick(&mut self) -> Option<TickOutcome> {
		if !self.running {
			return None;
		}
		self.alpha += (0.0 - self.alpha) * self.options.alpha_decay;
		self.graph.update(self.options.time_step * self.alpha as f32);

		let mut integrated = vec![None; self.nodes.len()];
		self.graph.visit_nodes(|node| {
			if let Some(slot) = integrated.get_mut(node.data.user_data) {
				*slot = Some(Point::new(node.x() as f64, node.y() as f64));
			}
		});

		let mut resync = Vec::new();
		for (index, node) in self.nodes.iter_mut().enumerate() {
			if let (Some(fx), Some(fy)) = (node.fx, node.fy) {
				node.x = fx;
				node.y = fy;
				node.vx = 0.0;
				node.vy = 0.0;
				resync.push(index);
				continue;
			}
			match integrated[index] {
				Some(next) if next.is_finite() => {
					node.vx = next.x - node.x;
					node.vy = next.y - node.y;
					node.x = next.x;
					node.y = next.y;
				}
				_ => {
					node.vx = 0.0;
					node.vy = 0.0;
					resync.push(index);
				}
			}
		}
		for index in resync {
			self.sync_node(index);
		}

		if self.alpha < self.options.alpha_min {
			self.running = false;
			info!("layout settled");
			Some(TickOutcome::Settled)
		} else {
			Some(TickOutcome::Ticked)
		}
	}

	/// `tick` translated into the outbound event.
	pub fn step(&mut self) -> Option<LayoutEvent> {
		let outcome = self.tick()?;
		let (generation, nodes) = (self.generation, self.nodes.clone());
		Some(match outcome {
			TickOutcome::Ticked => LayoutEvent::Tick { generation, nodes },
			TickOutcome::Settled => LayoutEvent::End { generation, nodes },
		})
	}

	/// Applies one inbound command. Returns `false` once the worker should exit.
	pub fn handle(&mut self, command: LayoutCommand) -> bool {
		match command {
			LayoutCommand::Initialize {
				nodes,
				links,
				options,
				generation,
			} => {
				self.generation = generation;
				self.initialize(nodes, links, options);
			}
			LayoutCommand::Start => self.start(),
			LayoutCommand::Stop => self.stop(),
			LayoutCommand::Reheat => self.reheat(),
			LayoutCommand::UpdateNetwork { nodes, links } => {
				self.update_network(nodes, links);
			}
			LayoutCommand::UpdateNode {
				index,
				pin: Some(point),
			} => self.move_node(point, index),
			LayoutCommand::UpdateNode { index, pin: None } => self.release_node(index),
			LayoutCommand::Shutdown => return false,
		}
		true
	}

	/// Current nodes, in index order.
	pub fn nodes(&self) -> &[SimulationNode] {
		&self.nodes
	}

	/// Current links.
	pub fn links(&self) -> &[SimulationLink] {
		&self.links
	}

	/// Options of the current run.
	pub fn options(&self) -> &SimulationOptions {
		&self.options
	}

	/// Run marker stamped on outgoing events.
	pub fn generation(&self) -> u64 {
		self.generation
	}

	/// Current cooling level, from 1 down to `alpha_min`.
	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	/// Whether `tick` currently advances.
	pub fn is_running(&self) -> bool {
		self.running
	}

	fn rebuild(&mut self) {
		let mut graph = ForceGraph::new(parameters(&self.options));
		let mass = self.options.node_mass;
		self.handles = self
			.nodes
			.iter()
			.enumerate()
			.map(|(index, node)| {
				graph.add_node(NodeData {
					x: node.x as f32,
					y: node.y as f32,
					mass,
					is_anchor: node.is_pinned(),
					user_data: index,
				})
			})
			.collect();
		let mut dropped = 0;
		for link in &self.links {
			match (self.handles.get(link.source), self.handles.get(link.target)) {
				(Some(&source), Some(&target)) if source != target => {
					graph.add_edge(source, target, EdgeData::default());
				}
				_ => dropped += 1,
			}
		}
		if dropped > 0 {
			debug!("dropped {dropped} links with missing or identical endpoints");
		}
		self.graph = graph;
	}

	fn sync_node(&mut self, index: usize) {
		let Some(node) = self.nodes.get(index) else {
			return;
		};
		let Some(&handle) = self.handles.get(index) else {
			return;
		};
		let (x, y, pinned) = (node.x as f32, node.y as f32, node.is_pinned());
		self.graph.visit_nodes_mut(|graph_node| {
			if graph_node.index() == handle {
				graph_node.data.x = x;
				graph_node.data.y = y;
				graph_node.data.is_anchor = pinned;
			}
		});
	}
}

fn parameters(options: &SimulationOptions) -> SimulationParameters {
	SimulationParameters {
		force_charge: options.force_charge,
		force_spring: options.force_spring,
		force_max: options.force_max,
		node_speed: options.node_speed,
		damping_factor: options.damping_factor,
	}
}

/// Copies live state onto incoming nodes whose id matches a current node.
/// Nodes without an id, or with an unknown one, keep their incoming state.
fn carry_over(current: &[SimulationNode], incoming: Vec<SimulationNode>) -> Vec<SimulationNode> {
	let live: HashMap<&str, &SimulationNode> = current
		.iter()
		.filter_map(|node| Some((node.id.as_deref()?, node)))
		.collect();
	incoming
		.into_iter()
		.map(|mut node| {
			let matched = node.id.as_deref().and_then(|id| live.get(id));
			if let Some(previous) = matched {
				node.x = previous.x;
				node.y = previous.y;
				node.vx = previous.vx;
				node.vy = previous.vy;
				node.fx = previous.fx;
				node.fy = previous.fy;
			}
			node
		})
		.collect()
}

/// Renumbers nodes by position, seeds unplaced nodes on a phyllotaxis spiral
/// and pulls coincident nodes apart.
fn prepare(nodes: Vec<SimulationNode>) -> Vec<SimulationNode> {
	let golden_angle = PI * (3.0 - 5.0_f64.sqrt());
	let mut seen = HashSet::new();
	nodes
		.into_iter()
		.enumerate()
		.map(|(index, mut node)| {
			node.index = index;
			if !node.position().is_finite() {
				let radius = SEED_RADIUS * (0.5 + index as f64).sqrt();
				let angle = index as f64 * golden_angle;
				node.x = radius * angle.cos();
				node.y = radius * angle.sin();
			}
			if !node.vx.is_finite() || !node.vy.is_finite() {
				node.vx = 0.0;
				node.vy = 0.0;
			}
			node.fx = node.fx.filter(|v| v.is_finite());
			node.fy = node.fy.filter(|v| v.is_finite());
			let mut attempt = 1.0;
			while !seen.insert((node.x.to_bits(), node.y.to_bits())) {
				let angle = (index as f64 + attempt) * golden_angle;
				node.x += attempt * angle.cos();
				node.y += attempt * angle.sin();
				attempt += 1.0;
			}
			node
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn triangle() -> (Vec<SimulationNode>, Vec<SimulationLink>) {
		let nodes = vec![
			SimulationNode::at(0, Point::new(-50.0, 0.0)),
			SimulationNode::at(1, Point::new(50.0, 0.0)),
			SimulationNode::at(2, Point::new(0.0, 60.0)),
			SimulationNode::at(3, Point::new(f64::NAN, f64::NAN)),
		];
		let links = vec![
			SimulationLink { source: 0, target: 1 },
			SimulationLink { source: 1, target: 2 },
			SimulationLink { source: 2, target: 3 },
			SimulationLink { source: 3, target: 9 },
		];
		(nodes, links)
	}

	fn run_to_settle(simulation: &mut Simulation) -> (usize, Vec<LayoutEvent>) {
		let mut ends = 0;
		let mut events = Vec::new();
		for _ in 0..2000 {
			match simulation.step() {
				Some(event @ LayoutEvent::End { .. }) => {
					ends += 1;
					events.push(event);
				}
				Some(event) => events.push(event),
				None => {}
			}
		}
		(ends, events)
	}

	#[test]
	fn initialize_is_inert_and_stop_is_safe_anywhere() {
		let mut simulation = Simulation::new();
		simulation.stop();
		simulation.stop();
		assert!(simulation.tick().is_none());

		let (nodes, links) = triangle();
		simulation.initialize(nodes, links, SimulationOptions::default());
		assert!(!simulation.is_running());
		assert!(simulation.step().is_none());
	}

	#[test]
	fn settles_once_per_cycle_without_nan() {
		let mut simulation = Simulation::new();
		for _ in 0..2 {
			let (nodes, links) = triangle();
			simulation.initialize(nodes, links, SimulationOptions::default());
			simulation.start();
			let (ends, events) = run_to_settle(&mut simulation);
			assert_eq!(ends, 1);
			assert!(matches!(events.last(), Some(LayoutEvent::End { .. })));
			for event in &events {
				assert_eq!(event.nodes().len(), 4);
				assert!(event.nodes().iter().all(|n| n.position().is_finite()));
			}
		}
	}

	#[test]
	fn unplaced_and_coincident_nodes_are_separated() {
		let mut simulation = Simulation::new();
		let nodes = vec![
			SimulationNode::at(0, Point::ORIGIN),
			SimulationNode::at(1, Point::ORIGIN),
			SimulationNode::at(2, Point::new(f64::NAN, 1.0)),
		];
		simulation.initialize(nodes, Vec::new(), SimulationOptions::default());
		let positions: Vec<Point> = simulation.nodes().iter().map(|n| n.position()).collect();
		assert!(positions.iter().all(|p| p.is_finite()));
		assert!(positions[0].distance(positions[1]) > 0.0);
	}

	#[test]
	fn pinned_node_holds_until_released() {
		let mut simulation = Simulation::new();
		let (nodes, links) = triangle();
		simulation.initialize(nodes, links, SimulationOptions::default());
		simulation.start();
		let pin = Point::new(200.0, -120.0);
		simulation.move_node(pin, 1);
		for _ in 0..20 {
			simulation.tick();
			assert!(simulation.nodes()[1].position().distance(pin) < 1e-6);
		}

		simulation.release_node(1);
		simulation.reheat();
		for _ in 0..20 {
			simulation.tick();
		}
		assert!(!simulation.nodes()[1].is_pinned());
		assert!(simulation.nodes()[1].position().distance(pin) > 1e-3);
	}

	#[test]
	fn moving_a_settled_node_wakes_the_simulation() {
		let mut simulation = Simulation::new();
		let (nodes, links) = triangle();
		simulation.initialize(nodes, links, SimulationOptions::default());
		simulation.start();
		run_to_settle(&mut simulation);
		assert!(!simulation.is_running());

		simulation.move_node(Point::new(10.0, 10.0), 0);
		assert!(simulation.is_running());
		assert!((simulation.alpha() - REHEAT_ALPHA).abs() < 1e-9);
	}

	fn named(nodes: Vec<SimulationNode>) -> Vec<SimulationNode> {
		let ids = ["a", "b", "c", "d"];
		nodes.into_iter().zip(ids).map(|(node, id)| node.with_id(id)).collect()
	}

	#[test]
	fn reordered_nodes_keep_their_own_positions() {
		let mut simulation = Simulation::new();
		let (nodes, mut links) = triangle();
		links.truncate(3);
		simulation.initialize(named(nodes.clone()), links.clone(), SimulationOptions::default());
		simulation.move_node(Point::new(5.0, 5.0), 0);
		simulation.stop();
		let before: HashMap<String, Point> = simulation
			.nodes()
			.iter()
			.map(|node| (node.id.clone().unwrap_or_default(), node.position()))
			.collect();

		let mut reordered = named(nodes);
		reordered.reverse();
		let reindexed: Vec<SimulationLink> = links
			.iter()
			.map(|link| SimulationLink {
				source: 3 - link.source,
				target: 3 - link.target,
			})
			.collect();
		assert!(!simulation.update_network(Some(reordered), Some(reindexed.clone())));
		assert!(!simulation.is_running());
		assert_eq!(simulation.links(), reindexed.as_slice());
		for (index, node) in simulation.nodes().iter().enumerate() {
			let id = node.id.clone().unwrap_or_default();
			assert_eq!(node.index, index);
			assert_eq!(node.position(), before[&id], "node {id} moved");
		}
		let a = &simulation.nodes()[3];
		assert_eq!(a.id.as_deref(), Some("a"));
		assert!(a.is_pinned());
		assert!(!simulation.nodes()[0].is_pinned());
	}

	#[test]
	fn anonymous_same_count_nodes_are_adopted_in_place() {
		let mut simulation = Simulation::new();
		let nodes = vec![
			SimulationNode::at(0, Point::new(-50.0, 0.0)),
			SimulationNode::at(1, Point::new(50.0, 0.0)),
		];
		simulation.initialize(nodes.clone(), Vec::new(), SimulationOptions::default());
		let mut reversed = nodes;
		reversed.reverse();
		assert!(!simulation.update_network(Some(reversed), None));
		assert_eq!(simulation.nodes()[0].position(), Point::new(50.0, 0.0));
		assert_eq!(simulation.nodes()[1].position(), Point::new(-50.0, 0.0));
		assert_eq!(simulation.nodes()[0].index, 0);
	}

	#[test]
	fn update_network_restarts_only_on_count_change() {
		let mut simulation = Simulation::new();
		let (nodes, links) = triangle();
		simulation.initialize(nodes.clone(), links.clone(), SimulationOptions::default());
		simulation.move_node(Point::new(5.0, 5.0), 0);
		simulation.stop();
		assert!(!simulation.update_network(None, Some(links.clone())));
		assert!(!simulation.is_running());

		let mut grown = nodes;
		grown.push(SimulationNode::at(4, Point::new(30.0, 30.0)));
		assert!(simulation.update_network(Some(grown), None));
		assert!(simulation.is_running());
		assert_eq!(simulation.nodes().len(), 5);
		assert!(!simulation.nodes()[0].is_pinned());

		assert!(simulation.update_network(None, Some(links[..2].to_vec())));
	}

	#[test]
	fn handle_maps_commands() {
		let mut simulation = Simulation::new();
		let (nodes, links) = triangle();
		assert!(simulation.handle(LayoutCommand::Initialize {
			nodes,
			links,
			options: SimulationOptions::default(),
			generation: 7,
		}));
		assert!(simulation.handle(LayoutCommand::Start));
		assert!(simulation.is_running());
		assert_eq!(simulation.step().map(|event| event.generation()), Some(7));
		assert!(simulation.handle(LayoutCommand::UpdateNode {
			index: 2,
			pin: Some(Point::new(1.0, 2.0)),
		}));
		assert!(simulation.nodes()[2].is_pinned());
		assert!(simulation.handle(LayoutCommand::UpdateNode { index: 2, pin: None }));
		assert!(!simulation.nodes()[2].is_pinned());
		assert!(simulation.handle(LayoutCommand::Stop));
		assert!(!simulation.handle(LayoutCommand::Shutdown));
	}
}
