//! Drag-and-drop coordination and force-directed layout for sociogram canvases.
//!
//! The core ([`drag_and_drop`], [`layout`], [`geometry`]) is plain Rust and
//! runs anywhere. The browser component in `components` is compiled for
//! `wasm32` only.

pub mod config;
pub mod drag_and_drop;
pub mod error;
pub mod geometry;
pub mod layout;

#[cfg(target_arch = "wasm32")]
pub mod components;

pub use config::{Capabilities, DragConfig, ScrollDirection, SociogramConfig};
pub use error::{Error, Result};
pub use geometry::{ElementRef, Point, Rect};

/// Initialize logging and panic hooks for the WASM target.
#[cfg(target_arch = "wasm32")]
pub fn init_logging() {
	use log::{Level, info};

	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("Logging initialized");
}
