//! Transports serving the layout protocol.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};

use super::protocol::{LayoutCommand, LayoutEvent};
use super::simulation::Simulation;
use crate::error::{Error, Result};

/// Anything that accepts layout commands and yields layout events.
pub trait LayoutBackend {
	/// Queues a command for the simulation.
	fn send(&mut self, command: LayoutCommand) -> Result<()>;
	/// Drains the events produced since the last call. Never blocks.
	fn poll(&mut self) -> Vec<LayoutEvent>;
}

/// Runs the simulation on a dedicated OS thread.
pub struct ThreadBackend {
	commands: Sender<LayoutCommand>,
	events: Receiver<LayoutEvent>,
	worker: Option<JoinHandle<()>>,
}

impl ThreadBackend {
	/// Spawns the worker. Fails with [`Error::EngineUnavailable`] where the
	/// platform cannot start threads.
	pub fn spawn() -> Result<Self> {
		let (command_tx, command_rx) = mpsc::channel();
		let (event_tx, event_rx) = mpsc::channel();
		let worker = thread::Builder::new()
			.name("sociogram-layout".into())
			.spawn(move || run_worker(command_rx, event_tx))
			.map_err(|err| Error::EngineUnavailable(err.to_string()))?;
		info!("layout worker started");
		Ok(Self {
			commands: command_tx,
			events: event_rx,
			worker: Some(worker),
		})
	}
}

impl LayoutBackend for ThreadBackend {
	fn send(&mut self, command: LayoutCommand) -> Result<()> {
		self.commands.send(command).map_err(|_| {
			warn!("layout worker is gone");
			Error::EngineDisconnected
		})
	}

	fn poll(&mut self) -> Vec<LayoutEvent> {
		self.events.try_iter().collect()
	}
}

impl Drop for ThreadBackend {
	fn drop(&mut self) {
		let _ = self.commands.send(LayoutCommand::Shutdown);
		if let Some(worker) = self.worker.take() {
			if worker.join().is_err() {
				warn!("layout worker panicked");
			}
		}
	}
}

fn run_worker(commands: Receiver<LayoutCommand>, events: Sender<LayoutEvent>) {
	let mut simulation = Simulation::new();
	loop {
		// Idle workers block; running ones only check for new commands.
		let command = if simulation.is_running() {
			match commands.try_recv() {
				Ok(command) => Some(command),
				Err(TryRecvError::Empty) => None,
				Err(TryRecvError::Disconnected) => break,
			}
		} else {
			match commands.recv() {
				Ok(command) => Some(command),
				Err(_) => break,
			}
		};
		if let Some(command) = command {
			debug!("layout worker <- {command:?}");
			if !simulation.handle(command) {
				break;
			}
			continue;
		}
		if let Some(event) = simulation.step() {
			if events.send(event).is_err() {
				break;
			}
		}
		thread::sleep(Duration::from_millis(simulation.options().tick_interval_ms));
	}
	debug!("layout worker stopped");
}

/// Steps the simulation in-process, once per `poll`.
///
/// Used where threads are unavailable; the host drives it from its frame loop.
pub struct InlineBackend {
	simulation: Simulation,
	steps_per_poll: usize,
	closed: bool,
}

impl Default for InlineBackend {
	fn default() -> Self {
		Self::new()
	}
}

impl InlineBackend {
	/// A stopped backend stepping one tick per poll.
	pub fn new() -> Self {
		Self {
			simulation: Simulation::new(),
			steps_per_poll: 1,
			closed: false,
		}
	}

	/// Ticks to run per `poll`, at least one.
	pub fn with_steps_per_poll(mut self, steps: usize) -> Self {
		self.steps_per_poll = steps.max(1);
		self
	}
}

impl LayoutBackend for InlineBackend {
	fn send(&mut self, command: LayoutCommand) -> Result<()> {
		if self.closed {
			return Err(Error::EngineDisconnected);
		}
		self.closed = !self.simulation.handle(command);
		Ok(())
	}

	fn poll(&mut self) -> Vec<LayoutEvent> {
		if self.closed {
			return Vec::new();
		}
		let mut events = Vec::new();
		for _ in 0..self.steps_per_poll {
			match self.simulation.step() {
				Some(event @ LayoutEvent::End { .. }) => {
					events.push(event);
					break;
				}
				Some(event) => events.push(event),
				None => break,
			}
		}
		events
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::geometry::Point;
	use crate::layout::protocol::{SimulationLink, SimulationNode, SimulationOptions};

	fn initialize() -> LayoutCommand {
		LayoutCommand::Initialize {
			nodes: vec![
				SimulationNode::at(0, Point::new(-10.0, 0.0)),
				SimulationNode::at(1, Point::new(10.0, 0.0)),
			],
			links: vec![SimulationLink { source: 0, target: 1 }],
			options: SimulationOptions::default(),
			generation: 1,
		}
	}

	#[test]
	fn inline_backend_stops_at_settlement() {
		let mut backend = InlineBackend::new().with_steps_per_poll(10_000);
		backend.send(initialize()).unwrap();
		assert!(backend.poll().is_empty());

		backend.send(LayoutCommand::Start).unwrap();
		let events = backend.poll();
		assert!(matches!(events.last(), Some(LayoutEvent::End { .. })));
		assert_eq!(
			events.iter().filter(|e| matches!(e, LayoutEvent::End { .. })).count(),
			1
		);
		assert!(backend.poll().is_empty());
	}

	#[test]
	fn inline_backend_rejects_commands_after_shutdown() {
		let mut backend = InlineBackend::new();
		backend.send(LayoutCommand::Stop).unwrap();
		backend.send(LayoutCommand::Shutdown).unwrap();
		assert!(matches!(
			backend.send(LayoutCommand::Start),
			Err(Error::EngineDisconnected)
		));
	}
}
