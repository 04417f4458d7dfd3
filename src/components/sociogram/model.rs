use leptos::prelude::*;
use serde_json::Value;

use crate::layout::{MemoryNetwork, NetworkEdge, NetworkModel, NetworkNode};

/// A [`MemoryNetwork`] living in a signal, so committed positions re-render
/// whatever else reads the network.
#[derive(Clone, Copy)]
pub struct SignalNetwork(pub RwSignal<MemoryNetwork>);

impl NetworkModel for SignalNetwork {
	fn nodes(&self) -> Vec<NetworkNode> {
		self.0.with_untracked(|network| network.nodes.clone())
	}

	fn edges(&self) -> Vec<NetworkEdge> {
		self.0.with_untracked(|network| network.edges.clone())
	}

	fn update_node_attribute(&mut self, node_id: &str, key: &str, value: Value) {
		self.0
			.update(|network| network.update_node_attribute(node_id, key, value));
	}
}
