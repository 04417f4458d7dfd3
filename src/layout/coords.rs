//! Conversions between screen pixels, relative `[0, 1]` space and simulation space.
//!
//! Relative space is what gets persisted. Screen space adds the viewport, zoom
//! and pan; simulation space is centred on `simulation_origin` and scaled so
//! that a settled layout fills the viewport.

use crate::geometry::{Point, Rect};

/// Smallest zoom factor.
pub const MIN_ZOOM: f64 = 0.1;
/// Largest zoom factor.
pub const MAX_ZOOM: f64 = 10.0;
/// Margin kept around fitted layouts, in relative units.
pub const FIT_PADDING: f64 = 0.05;

/// Extent used for simulation space before the viewport has been measured.
const FALLBACK_EXTENT: f64 = 1000.0;

/// Viewport, zoom and pan plus the fit of simulation space into it.
#[derive(Clone, Debug, PartialEq)]
pub struct CoordinateFrame {
	/// Canvas bounds in screen pixels.
	pub viewport: Rect,
	/// Screen offset of the relative centre from the viewport centre.
	pub pan: Point,
	zoom: f64,
	simulation_scale: f64,
	simulation_origin: Point,
}

impl Default for CoordinateFrame {
	fn default() -> Self {
		Self::new(Rect::default())
	}
}

impl CoordinateFrame {
	/// Unzoomed, unpanned frame over `viewport`.
	pub fn new(viewport: Rect) -> Self {
		Self {
			viewport,
			pan: Point::ORIGIN,
			zoom: 1.0,
			simulation_scale: 1.0,
			simulation_origin: Point::ORIGIN,
		}
	}

	/// Current zoom factor.
	pub fn zoom(&self) -> f64 {
		self.zoom
	}

	/// Sets the zoom, clamped to [`MIN_ZOOM`, `MAX_ZOOM`]. Non-finite values are ignored.
	pub fn set_zoom(&mut self, zoom: f64) {
		if zoom.is_finite() {
			self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
		}
	}

	/// Screen pixels per simulation unit at zoom 1.
	pub fn simulation_scale(&self) -> f64 {
		self.simulation_scale
	}

	/// Replaces the viewport.
	pub fn resize(&mut self, viewport: Rect) {
		self.viewport = viewport;
	}

	/// Adds a screen-space delta to the pan.
	pub fn pan_by(&mut self, delta: Point) {
		self.pan = self.pan + delta.sanitized();
	}

	/// Screen position of the relative origin `(0.5, 0.5)`.
	fn centre(&self) -> Point {
		Point::new(
			self.viewport.x + self.viewport.width / 2.0 + self.pan.x,
			self.viewport.y + self.viewport.height / 2.0 + self.pan.y,
		)
	}

	/// Screen pixel position of a relative point.
	pub fn to_screen(&self, relative: Point) -> Point {
		let centre = self.centre();
		Point::new(
			centre.x + (relative.x - 0.5) * self.viewport.width * self.zoom,
			centre.y + (relative.y - 0.5) * self.viewport.height * self.zoom,
		)
	}

	/// Inverse of [`to_screen`](Self::to_screen). A zero-sized axis maps to its centre.
	pub fn to_relative(&self, screen: Point) -> Point {
		let centre = self.centre();
		let axis = |value: f64, origin: f64, extent: f64| {
			let span = extent * self.zoom;
			if span > 0.0 { (value - origin) / span + 0.5 } else { 0.5 }
		};
		Point::new(
			axis(screen.x, centre.x, self.viewport.width),
			axis(screen.y, centre.y, self.viewport.height),
		)
	}

	fn extent(&self) -> (f64, f64) {
		let or_fallback = |v: f64| if v > 0.0 { v } else { FALLBACK_EXTENT };
		(
			or_fallback(self.viewport.width),
			or_fallback(self.viewport.height),
		)
	}

	/// Simulation-space position of a relative point.
	pub fn to_simulation(&self, relative: Point) -> Point {
		let (width, height) = self.extent();
		Point::new(
			self.simulation_origin.x + (relative.x - 0.5) * width / self.simulation_scale,
			self.simulation_origin.y + (relative.y - 0.5) * height / self.simulation_scale,
		)
	}

	/// Inverse of [`to_simulation`](Self::to_simulation). Not clamped.
	pub fn from_simulation(&self, point: Point) -> Point {
		let (width, height) = self.extent();
		Point::new(
			(point.x - self.simulation_origin.x) * self.simulation_scale / width + 0.5,
			(point.y - self.simulation_origin.y) * self.simulation_scale / height + 0.5,
		)
	}

	/// Zooms by `factor` keeping the screen point `focus` fixed.
	pub fn zoom_at(&mut self, focus: Point, factor: f64) {
		if !focus.is_finite() || !factor.is_finite() || factor <= 0.0 {
			return;
		}
		let zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
		let ratio = zoom / self.zoom;
		let centre = self.centre();
		let next = Point::new(
			focus.x - (focus.x - centre.x) * ratio,
			focus.y - (focus.y - centre.y) * ratio,
		);
		self.pan = self.pan + (next - centre);
		self.zoom = zoom;
	}

	/// Rescales simulation space so every point lands inside the padded
	/// relative square. Non-finite points are ignored.
	pub fn fit_to(&mut self, points: &[Point]) {
		let mut bounds: Option<(Point, Point)> = None;
		for point in points.iter().filter(|p| p.is_finite()) {
			bounds = Some(match bounds {
				None => (*point, *point),
				Some((min, max)) => (
					Point::new(min.x.min(point.x), min.y.min(point.y)),
					Point::new(max.x.max(point.x), max.y.max(point.y)),
				),
			});
		}
		let Some((min, max)) = bounds else {
			return;
		};
		let (width, height) = self.extent();
		let usable = 1.0 - 2.0 * FIT_PADDING;
		let fit = |span: f64, extent: f64| (span > 0.0).then(|| usable * extent / span);
		let scale = match (fit(max.x - min.x, width), fit(max.y - min.y, height)) {
			(Some(sx), Some(sy)) => sx.min(sy),
			(Some(s), None) | (None, Some(s)) => s,
			(None, None) => self.simulation_scale,
		};
		if scale.is_finite() && scale > 0.0 {
			self.simulation_scale = scale;
		}
		self.simulation_origin = Point::new((min.x + max.x) / 2.0, (min.y + max.y) / 2.0);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	struct Lcg(u64);

	impl Lcg {
		fn next_f64(&mut self) -> f64 {
			self.0 = self
				.0
				.wrapping_mul(6364136223846793005)
				.wrapping_add(1442695040888963407);
			(self.0 >> 11) as f64 / (1u64 << 53) as f64
		}

		fn range(&mut self, lo: f64, hi: f64) -> f64 {
			lo + (hi - lo) * self.next_f64()
		}
	}

	#[test]
	fn round_trips_under_random_zoom_and_pan() {
		let mut rng = Lcg(42);
		let viewport = Rect::new(12.0, 40.0, 1280.0, 720.0);
		for _ in 0..1000 {
			let mut frame = CoordinateFrame::new(viewport);
			frame.set_zoom(rng.range(0.5, 2.0));
			frame.pan = Point::new(rng.range(-300.0, 300.0), rng.range(-300.0, 300.0));
			let screen = Point::new(
				rng.range(viewport.x, viewport.right()),
				rng.range(viewport.y, viewport.bottom()),
			);
			let back = frame.to_screen(frame.to_relative(screen));
			assert!(back.distance(screen) < 1e-3, "{screen:?} -> {back:?}");

			let relative = Point::new(rng.next_f64(), rng.next_f64());
			let again = frame.to_relative(frame.to_screen(relative));
			assert!(again.distance(relative) < 1e-9);
		}
	}

	#[test]
	fn zero_viewport_maps_to_centre() {
		let frame = CoordinateFrame::default();
		assert_eq!(frame.to_relative(Point::new(100.0, -4.0)), Point::new(0.5, 0.5));
		let sim = frame.to_simulation(Point::new(1.0, 0.0));
		assert_eq!(sim, Point::new(500.0, -500.0));
	}

	#[test]
	fn zoom_at_keeps_focus_fixed() {
		let mut frame = CoordinateFrame::new(Rect::new(0.0, 0.0, 800.0, 600.0));
		let focus = Point::new(620.0, 150.0);
		let under = frame.to_relative(focus);
		frame.zoom_at(focus, 1.1);
		frame.zoom_at(focus, 1.1);
		assert!(frame.to_screen(under).distance(focus) < 1e-9);

		frame.zoom_at(focus, 1000.0);
		assert_eq!(frame.zoom(), MAX_ZOOM);
		assert!(frame.to_screen(under).distance(focus) < 1e-6);
	}

	#[test]
	fn fit_places_points_inside_padding() {
		let mut frame = CoordinateFrame::new(Rect::new(0.0, 0.0, 800.0, 600.0));
		let points = [
			Point::new(-900.0, 40.0),
			Point::new(1500.0, -20.0),
			Point::new(300.0, 700.0),
			Point::new(f64::NAN, 0.0),
		];
		frame.fit_to(&points);
		for point in points.iter().filter(|p| p.is_finite()) {
			let relative = frame.from_simulation(*point);
			for v in [relative.x, relative.y] {
				assert!((FIT_PADDING - 1e-9..=1.0 - FIT_PADDING + 1e-9).contains(&v));
			}
		}
		let relative = Point::new(0.25, 0.8);
		let back = frame.from_simulation(frame.to_simulation(relative));
		assert!(back.distance(relative) < 1e-9);
	}
}
