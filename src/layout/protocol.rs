//! Typed messages between the interaction thread and the layout worker.
//!
//! Everything crossing the boundary is an owned, serializable value, so the
//! same protocol can be served by a thread, a process or an in-process task.

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// One node's state in simulation space.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationNode {
	/// Position in the node array the node was sent in.
	pub index: usize,
	/// Entity id. Same-count network updates match nodes by it.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	/// Current x.
	pub x: f64,
	/// Current y.
	pub y: f64,
	/// Last step's x displacement.
	#[serde(default)]
	pub vx: f64,
	/// Last step's y displacement.
	#[serde(default)]
	pub vy: f64,
	/// Pinned x; present only while a drag holds the node.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub fx: Option<f64>,
	/// Pinned y.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub fy: Option<f64>,
}

impl SimulationNode {
	/// An anonymous, unpinned node at `point`.
	pub fn at(index: usize, point: Point) -> Self {
		Self {
			index,
			x: point.x,
			y: point.y,
			..Self::default()
		}
	}

	/// Tags the node with its entity id.
	pub fn with_id(mut self, id: impl Into<String>) -> Self {
		self.id = Some(id.into());
		self
	}

	/// Current position.
	pub fn position(&self) -> Point {
		Point::new(self.x, self.y)
	}

	/// Whether a drag currently holds the node.
	pub fn is_pinned(&self) -> bool {
		self.fx.is_some() || self.fy.is_some()
	}
}

/// An edge between two node indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimulationLink {
	/// Index of the first endpoint.
	pub source: usize,
	/// Index of the second endpoint.
	pub target: usize,
}

/// Physics and cooling parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulationOptions {
	/// Repulsion between every pair of nodes.
	pub force_charge: f32,
	/// Spring stiffness along links.
	pub force_spring: f32,
	/// Cap on the force applied to one node per step.
	pub force_max: f32,
	/// Velocity scale.
	pub node_speed: f32,
	/// Velocity kept between steps.
	pub damping_factor: f32,
	/// Mass given to every node.
	pub node_mass: f32,
	/// Integration step handed to the physics per tick, scaled by alpha.
	pub time_step: f32,
	/// Alpha below which the layout counts as settled.
	pub alpha_min: f64,
	/// Fraction of the remaining alpha lost per tick.
	pub alpha_decay: f64,
	/// Delay between ticks on a threaded backend.
	pub tick_interval_ms: u64,
}

impl Default for SimulationOptions {
	fn default() -> Self {
		Self {
			force_charge: 150.0,
			force_spring: 0.05,
			force_max: 100.0,
			node_speed: 3000.0,
			damping_factor: 0.9,
			node_mass: 10.0,
			time_step: 0.016,
			alpha_min: 0.001,
			// Settles in roughly 300 ticks.
			alpha_decay: 1.0 - 0.001_f64.powf(1.0 / 300.0),
			tick_interval_ms: 16,
		}
	}
}

/// Engine input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayoutCommand {
	/// Resets the simulation. Events of the new run carry `generation`.
	Initialize {
		/// Seed nodes; non-finite positions are placed by the engine.
		nodes: Vec<SimulationNode>,
		/// Links between seed indices.
		links: Vec<SimulationLink>,
		/// Physics for the new run.
		options: SimulationOptions,
		/// Run marker echoed by every event until the next `Initialize`.
		#[serde(default)]
		generation: u64,
	},
	/// Resumes ticking.
	Start,
	/// Pauses ticking. Valid in any state.
	Stop,
	/// Raises alpha and resumes.
	Reheat,
	/// Replaces nodes and/or links.
	UpdateNetwork {
		/// New node array, if it changed.
		nodes: Option<Vec<SimulationNode>>,
		/// New link array, if it changed.
		links: Option<Vec<SimulationLink>>,
	},
	/// Pins (`Some`) or releases (`None`) one node.
	UpdateNode {
		/// Node index.
		index: usize,
		/// Simulation-space pin.
		pin: Option<Point>,
	},
	/// Ends the worker.
	Shutdown,
}

/// Engine output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayoutEvent {
	/// Node positions after one integration step.
	Tick {
		/// Run that produced the event.
		#[serde(default)]
		generation: u64,
		/// Every node, in engine order.
		nodes: Vec<SimulationNode>,
	},
	/// Final positions; sent once per settlement.
	End {
		/// Run that produced the event.
		#[serde(default)]
		generation: u64,
		/// Every node, in engine order.
		nodes: Vec<SimulationNode>,
	},
}

impl LayoutEvent {
	/// The node array carried by either variant.
	pub fn nodes(&self) -> &[SimulationNode] {
		match self {
			LayoutEvent::Tick { nodes, .. } | LayoutEvent::End { nodes, .. } => nodes,
		}
	}

	/// The run that produced the event.
	pub fn generation(&self) -> u64 {
		match self {
			LayoutEvent::Tick { generation, .. } | LayoutEvent::End { generation, .. } => *generation,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn commands_are_tagged_messages() {
		let command = LayoutCommand::UpdateNode {
			index: 3,
			pin: Some(Point::new(1.0, 2.0)),
		};
		let json = serde_json::to_value(&command).unwrap();
		assert_eq!(json["type"], "update_node");
		let back: LayoutCommand = serde_json::from_value(json).unwrap();
		assert_eq!(back, command);
	}

	#[test]
	fn unpinned_nodes_omit_fixed_coordinates() {
		let json = serde_json::to_value(SimulationNode::at(0, Point::new(1.0, 1.0))).unwrap();
		assert!(json.get("fx").is_none());
		assert!(json.get("id").is_none());
	}

	#[test]
	fn events_default_to_the_first_generation() {
		let event: LayoutEvent = serde_json::from_value(serde_json::json!({
			"type": "end",
			"nodes": [{ "index": 0, "id": "a", "x": 1.0, "y": 2.0 }],
		}))
		.unwrap();
		assert_eq!(event.generation(), 0);
		assert_eq!(event.nodes()[0].id.as_deref(), Some("a"));
	}
}
