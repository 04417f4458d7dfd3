//! Force-directed layout and the coordinate frames around it.
//!
//! The [`Simulation`] runs behind a [`LayoutBackend`], usually on its own
//! thread, and talks only through the [`protocol`] types. [`LayoutContext`]
//! decides whether the view reads persisted or simulated positions.

mod backend;
mod context;
mod coords;
mod engine;
mod network;
pub mod protocol;
mod simulation;

pub use backend::{InlineBackend, LayoutBackend, ThreadBackend};
pub use context::{LayoutContext, LayoutMode, PositionAccessor};
pub use coords::{CoordinateFrame, FIT_PADDING, MAX_ZOOM, MIN_ZOOM};
pub use engine::LayoutEngine;
pub use network::{
	LayoutVariable, MemoryNetwork, NetworkEdge, NetworkModel, NetworkNode, derive_links,
	position_value, read_position,
};
pub use protocol::{LayoutCommand, LayoutEvent, SimulationLink, SimulationNode, SimulationOptions};
pub use simulation::{REHEAT_ALPHA, Simulation, TickOutcome};
