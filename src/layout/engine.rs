use log::debug;

use super::backend::{InlineBackend, LayoutBackend};
use super::protocol::{LayoutCommand, LayoutEvent, SimulationLink, SimulationNode, SimulationOptions};
use crate::error::Result;
use crate::geometry::Point;

/// Caller-facing handle on a layout backend.
///
/// Every `initialize` opens a new run. Events still in flight from an earlier
/// run are dropped by [`LayoutEngine::poll`].
pub struct LayoutEngine {
	backend: Box<dyn LayoutBackend>,
	generation: u64,
}

impl LayoutEngine {
	/// Wraps a backend.
	pub fn new(backend: impl LayoutBackend + 'static) -> Self {
		Self {
			backend: Box::new(backend),
			generation: 0,
		}
	}

	/// The platform's preferred backend: a worker thread natively, in-process on wasm.
	#[cfg(not(target_arch = "wasm32"))]
	pub fn spawn() -> Result<Self> {
		super::backend::ThreadBackend::spawn().map(Self::new)
	}

	/// The platform's preferred backend: a worker thread natively, in-process on wasm.
	#[cfg(target_arch = "wasm32")]
	pub fn spawn() -> Result<Self> {
		Ok(Self::inline())
	}

	/// An engine stepped from `poll` on the calling thread.
	pub fn inline() -> Self {
		Self::new(InlineBackend::new())
	}

	/// Starts a new run with fresh nodes and links. The run stays stopped until `start`.
	pub fn initialize(
		&mut self,
		nodes: Vec<SimulationNode>,
		links: Vec<SimulationLink>,
		options: SimulationOptions,
	) -> Result<()> {
		self.generation += 1;
		let generation = self.generation;
		self.send(LayoutCommand::Initialize {
			nodes,
			links,
			options,
			generation,
		})
	}

	/// The run that `poll` currently reports.
	pub fn generation(&self) -> u64 {
		self.generation
	}

	/// Resumes ticking.
	pub fn start(&mut self) -> Result<()> {
		self.send(LayoutCommand::Start)
	}

	/// Pauses ticking.
	pub fn stop(&mut self) -> Result<()> {
		self.send(LayoutCommand::Stop)
	}

	/// Wakes a settled run at a low alpha.
	pub fn reheat(&mut self) -> Result<()> {
		self.send(LayoutCommand::Reheat)
	}

	/// Replaces nodes and/or links of the current run.
	pub fn update_network(
		&mut self,
		nodes: Option<Vec<SimulationNode>>,
		links: Option<Vec<SimulationLink>>,
	) -> Result<()> {
		self.send(LayoutCommand::UpdateNetwork { nodes, links })
	}

	/// Pins node `index` at a simulation-space point.
	pub fn move_node(&mut self, point: Point, index: usize) -> Result<()> {
		self.send(LayoutCommand::UpdateNode {
			index,
			pin: Some(point),
		})
	}

	/// Unpins node `index`.
	pub fn release_node(&mut self, index: usize) -> Result<()> {
		self.send(LayoutCommand::UpdateNode { index, pin: None })
	}

	/// Drains the events of the current run. Never blocks.
	pub fn poll(&mut self) -> Vec<LayoutEvent> {
		let mut events = self.backend.poll();
		let received = events.len();
		events.retain(|event| event.generation() == self.generation);
		if events.len() < received {
			debug!("dropped {} events from an earlier layout run", received - events.len());
		}
		events
	}

	fn send(&mut self, command: LayoutCommand) -> Result<()> {
		debug!("layout <- {command:?}");
		self.backend.send(command)
	}
}
