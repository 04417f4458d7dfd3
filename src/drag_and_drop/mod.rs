//! Pointer-driven drag and drop without native browser drag APIs.
//!
//! Pointer input flows through a [`DragManager`] into a [`DragSource`], which
//! publishes into the shared [`Registry`]. [`DropTarget`]s and
//! [`ObstacleAdapter`]s keep their measured geometry in the same registry, and
//! [`Monitor`]s turn registry snapshots into per-id state for the view.

mod callbacks;
mod drag_manager;
mod measure;
mod monitor;
mod obstacle;
mod registry;
mod source;
mod target;
mod throttle;

#[cfg(test)]
mod fakes;

pub use callbacks::{CallbackHandle, TargetCallbacks};
pub use drag_manager::{DragListener, DragManager, DragMovement, ScrollContainer};
pub use measure::{GeometryWatcher, MIN_POLL_INTERVAL_MS, MeasureStrategy};
pub use monitor::{Monitor, ShallowEq, SourceState, TargetState};
pub use obstacle::ObstacleAdapter;
pub use registry::{
	Command, DragSourceRecord, DropTargetRecord, Meta, Obstacle, Registry, RegistrySnapshot,
	Subscription,
};
pub use source::{DragPreview, DragSource};
pub use target::DropTarget;
pub use throttle::{Clock, MonotonicClock, Throttle};
