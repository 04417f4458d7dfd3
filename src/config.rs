//! Runtime configuration for drag handling, physics and capabilities.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::layout::SimulationOptions;

/// Everything a sociogram view can be configured with.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SociogramConfig {
	/// Gesture and auto-scroll tuning.
	pub drag: DragConfig,
	/// Force layout parameters.
	pub simulation: SimulationOptions,
	/// What the interview stage allows.
	pub capabilities: Capabilities,
}

impl SociogramConfig {
	/// Parses a JSON document; missing keys fall back to defaults.
	pub fn from_json(source: &str) -> Result<Self> {
		Ok(serde_json::from_str(source)?)
	}
}

/// Axis along which a drag may auto-scroll its container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScrollDirection {
	/// Up and down.
	#[default]
	Vertical,
	/// Left and right.
	Horizontal,
	/// Never auto-scroll.
	None,
}

/// Drag gesture tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DragConfig {
	/// Pointer travel in pixels before a press becomes a drag.
	pub threshold: f64,
	/// Minimum interval between registry updates during a drag.
	pub throttle_ms: f64,
	/// Axis the scroll container auto-scrolls along.
	pub scroll_direction: ScrollDirection,
	/// Width of the band along a container edge that triggers auto-scroll.
	pub scroll_edge: f64,
	/// Auto-scroll speed cap, in pixels per animation frame.
	pub max_scroll_speed: f64,
	/// Interval for geometry polling where observation is unavailable.
	pub poll_interval_ms: f64,
}

impl Default for DragConfig {
	fn default() -> Self {
		Self {
			threshold: 4.0,
			throttle_ms: 60.0,
			scroll_direction: ScrollDirection::Vertical,
			scroll_edge: 40.0,
			max_scroll_speed: 20.0,
			poll_interval_ms: 100.0,
		}
	}
}

/// Feature switches set by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Capabilities {
	/// Run the force simulation instead of reading persisted positions.
	pub automatic_layout: bool,
	/// Let the user drag nodes.
	pub allow_positioning: bool,
}

impl Default for Capabilities {
	fn default() -> Self {
		Self {
			automatic_layout: false,
			allow_positioning: true,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn partial_documents_keep_defaults() {
		let config = SociogramConfig::from_json(
			r#"{ "drag": { "throttleMs": 30, "scrollDirection": "horizontal" },
			     "capabilities": { "automaticLayout": true } }"#,
		)
		.unwrap();
		assert_eq!(config.drag.throttle_ms, 30.0);
		assert_eq!(config.drag.scroll_direction, ScrollDirection::Horizontal);
		assert_eq!(config.drag.threshold, 4.0);
		assert!(config.capabilities.automatic_layout);
		assert!(config.capabilities.allow_positioning);
		assert_eq!(config.simulation, SimulationOptions::default());
	}

	#[test]
	fn malformed_json_is_a_config_error() {
		let err = SociogramConfig::from_json("{ drag: ").unwrap_err();
		assert!(matches!(err, crate::error::Error::Config(_)));
	}
}
