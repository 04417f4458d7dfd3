//! The sociogram canvas and draggable items, bound to the DOM.

mod component;
mod dom;
mod draggable;
mod model;
mod render;

pub use component::{EXISTING_NODE, SociogramCanvas};
pub use dom::{ClonePreview, DomElement, DomScroller, PointerBinding, ResizeWatch, page_offset};
pub use draggable::DraggableItem;
pub use model::SignalNetwork;
