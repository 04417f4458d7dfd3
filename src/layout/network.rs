//! The persisted network the layout reads from and commits into.

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::protocol::SimulationLink;
use crate::geometry::Point;

/// A participant or entity in the interview network.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkNode {
	/// Stable identity.
	pub id: String,
	/// Node type, used to pick the layout variable.
	#[serde(rename = "type")]
	pub node_type: String,
	/// Display label.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub label: Option<String>,
	/// Attribute values, including persisted positions.
	#[serde(default)]
	pub attributes: Map<String, Value>,
}

impl NetworkNode {
	/// A node with no label or attributes.
	pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			node_type: node_type.into(),
			..Self::default()
		}
	}

	/// Sets the label.
	pub fn with_label(mut self, label: impl Into<String>) -> Self {
		self.label = Some(label.into());
		self
	}

	/// Sets one attribute.
	pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
		self.attributes.insert(key.into(), value);
		self
	}
}

/// A tie between two nodes, by id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkEdge {
	/// Source node id.
	pub from: String,
	/// Target node id.
	pub to: String,
	/// Edge type; layout ignores it.
	#[serde(rename = "type", default)]
	pub edge_type: String,
}

impl NetworkEdge {
	/// An untyped edge.
	pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
		Self {
			from: from.into(),
			to: to.into(),
			edge_type: String::new(),
		}
	}
}

/// Read access to nodes and edges plus the single write the layout performs.
pub trait NetworkModel {
	/// All nodes, in a stable order.
	fn nodes(&self) -> Vec<NetworkNode>;
	/// All edges.
	fn edges(&self) -> Vec<NetworkEdge>;
	/// Writes one attribute on one node. Unknown nodes are ignored.
	fn update_node_attribute(&mut self, node_id: &str, key: &str, value: Value);
}

/// Which node attribute holds a persisted position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LayoutVariable {
	/// One attribute for every node type.
	Single(String),
	/// Two-mode graphs: one attribute per node type.
	ByType(HashMap<String, String>),
}

impl LayoutVariable {
	/// The attribute holding positions for `node_type`, if any.
	pub fn key_for(&self, node_type: &str) -> Option<&str> {
		match self {
			LayoutVariable::Single(key) => Some(key.as_str()),
			LayoutVariable::ByType(keys) => keys.get(node_type).map(String::as_str),
		}
	}
}

/// Persisted relative position of `node`, if it has a valid one.
pub fn read_position(node: &NetworkNode, variable: &LayoutVariable) -> Option<Point> {
	let key = variable.key_for(&node.node_type)?;
	let value = node.attributes.get(key)?;
	let point = Point::new(value.get("x")?.as_f64()?, value.get("y")?.as_f64()?);
	point.is_finite().then_some(point)
}

/// The persisted form of a relative position.
pub fn position_value(point: Point) -> Value {
	json!({ "x": point.x, "y": point.y })
}

/// Index-based links for `edges`. Edges naming unknown nodes are dropped.
pub fn derive_links(nodes: &[NetworkNode], edges: &[NetworkEdge]) -> Vec<SimulationLink> {
	let index: HashMap<&str, usize> = nodes
		.iter()
		.enumerate()
		.map(|(i, node)| (node.id.as_str(), i))
		.collect();
	let links: Vec<SimulationLink> = edges
		.iter()
		.filter_map(|edge| {
			Some(SimulationLink {
				source: *index.get(edge.from.as_str())?,
				target: *index.get(edge.to.as_str())?,
			})
		})
		.collect();
	if links.len() < edges.len() {
		debug!("dropped {} edges with missing endpoints", edges.len() - links.len());
	}
	links
}

/// A network held in memory.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryNetwork {
	/// Nodes in index order.
	pub nodes: Vec<NetworkNode>,
	/// Edges.
	pub edges: Vec<NetworkEdge>,
	#[serde(skip)]
	writes: usize,
}

impl MemoryNetwork {
	/// A network with no writes recorded.
	pub fn new(nodes: Vec<NetworkNode>, edges: Vec<NetworkEdge>) -> Self {
		Self {
			nodes,
			edges,
			writes: 0,
		}
	}

	/// Node `id`.
	pub fn node(&self, id: &str) -> Option<&NetworkNode> {
		self.nodes.iter().find(|node| node.id == id)
	}

	/// Attribute `key` of node `id`.
	pub fn attribute(&self, id: &str, key: &str) -> Option<&Value> {
		self.node(id)?.attributes.get(key)
	}

	/// Number of attribute writes applied so far.
	pub fn writes(&self) -> usize {
		self.writes
	}
}

impl NetworkModel for MemoryNetwork {
	fn nodes(&self) -> Vec<NetworkNode> {
		self.nodes.clone()
	}

	fn edges(&self) -> Vec<NetworkEdge> {
		self.edges.clone()
	}

	fn update_node_attribute(&mut self, node_id: &str, key: &str, value: Value) {
		if let Some(node) = self.nodes.iter_mut().find(|node| node.id == node_id) {
			node.attributes.insert(key.to_string(), value);
			self.writes += 1;
		}
	}
}
