//! Points, rectangles and scroll-corrected element measurement.

use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A 2D point or offset in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
	/// Horizontal coordinate.
	pub x: f64,
	/// Vertical coordinate.
	pub y: f64,
}

impl Point {
	/// `(0, 0)`.
	pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

	/// A point at `(x, y)`.
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	/// Euclidean distance to `other`.
	pub fn distance(self, other: Point) -> f64 {
		let (dx, dy) = (self.x - other.x, self.y - other.y);
		(dx * dx + dy * dy).sqrt()
	}

	/// Whether both components are finite.
	pub fn is_finite(self) -> bool {
		self.x.is_finite() && self.y.is_finite()
	}

	/// Replaces non-finite components with zero.
	pub fn sanitized(self) -> Self {
		Self {
			x: finite_or_zero(self.x),
			y: finite_or_zero(self.y),
		}
	}
}

impl Add for Point {
	type Output = Point;

	fn add(self, rhs: Point) -> Point {
		Point::new(self.x + rhs.x, self.y + rhs.y)
	}
}

impl Sub for Point {
	type Output = Point;

	fn sub(self, rhs: Point) -> Point {
		Point::new(self.x - rhs.x, self.y - rhs.y)
	}
}

/// Axis-aligned rectangle in absolute, scroll-corrected pixels.
///
/// Width and height are never negative. A zero-sized rect is valid (the
/// element has not been laid out yet) and contains no point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
	/// Left edge.
	pub x: f64,
	/// Top edge.
	pub y: f64,
	/// Never negative.
	pub width: f64,
	/// Never negative.
	pub height: f64,
}

impl Rect {
	/// A sanitized rect.
	pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
		Self {
			x,
			y,
			width,
			height,
		}
		.sanitized()
	}

	/// Clamps negative or non-finite sizes to zero and non-finite origins to the origin.
	pub fn sanitized(self) -> Self {
		Self {
			x: finite_or_zero(self.x),
			y: finite_or_zero(self.y),
			width: finite_or_zero(self.width).max(0.0),
			height: finite_or_zero(self.height).max(0.0),
		}
	}

	/// Right edge.
	pub fn right(&self) -> f64 {
		self.x + self.width
	}

	/// Bottom edge.
	pub fn bottom(&self) -> f64 {
		self.y + self.height
	}

	/// Width times height.
	pub fn area(&self) -> f64 {
		self.width * self.height
	}

	/// Whether either side is zero.
	pub fn is_empty(&self) -> bool {
		self.width <= 0.0 || self.height <= 0.0
	}

	/// Midpoint of the rect.
	pub fn center(&self) -> Point {
		Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
	}

	/// Edge-inclusive containment. Empty rects contain nothing.
	pub fn contains(&self, point: Point) -> bool {
		!self.is_empty()
			&& point.x >= self.x
			&& point.x <= self.right()
			&& point.y >= self.y
			&& point.y <= self.bottom()
	}

	/// Whether the interiors overlap. Touching edges do not count.
	pub fn intersects(&self, other: &Rect) -> bool {
		!self.is_empty()
			&& !other.is_empty()
			&& self.x < other.right()
			&& other.x < self.right()
			&& self.y < other.bottom()
			&& other.y < self.bottom()
	}

	/// The same rect moved by `offset`.
	pub fn translate(&self, offset: Point) -> Rect {
		Rect::new(self.x + offset.x, self.y + offset.y, self.width, self.height)
	}
}

fn finite_or_zero(value: f64) -> f64 {
	if value.is_finite() { value } else { 0.0 }
}

/// A measurable element in a document tree.
///
/// `parent` walks up to, but not including, the document body.
pub trait ElementRef: Sized {
	/// Whether the element is attached to a live document.
	fn is_attached(&self) -> bool;
	/// Bounding box relative to the viewport.
	fn client_rect(&self) -> Rect;
	/// Current scroll offset of this element's content.
	fn scroll_offset(&self) -> Point;
	/// The containing element, or `None` at the body.
	fn parent(&self) -> Option<Self>;
	/// Short description used in log lines.
	fn describe(&self) -> String {
		String::from("element")
	}
}

/// Absolute bounding box of `element`, corrected for the page scroll and the
/// scroll offsets of every ancestor.
pub fn absolute_bounds<E: ElementRef>(element: &E, page_offset: Point) -> Result<Rect> {
	if !element.is_attached() {
		return Err(Error::DetachedElement(element.describe()));
	}
	let mut offset = page_offset.sanitized();
	let mut ancestor = element.parent();
	while let Some(parent) = ancestor {
		offset = offset + parent.scroll_offset().sanitized();
		ancestor = parent.parent();
	}
	Ok(element.client_rect().sanitized().translate(offset))
}

/// Strict check for call sites that guarantee a live element.
pub fn assert_element<E: ElementRef>(element: Option<E>) -> Result<E> {
	let element = element.ok_or(Error::MissingElement)?;
	if !element.is_attached() {
		return Err(Error::DetachedElement(element.describe()));
	}
	Ok(element)
}

#[cfg(test)]
mod tests {
	use std::rc::Rc;

	use super::*;

	#[derive(Clone)]
	struct Node {
		rect: Rect,
		scroll: Point,
		attached: bool,
		parent: Option<Rc<Node>>,
	}

	#[derive(Clone)]
	struct FakeElement(Rc<Node>);

	impl ElementRef for FakeElement {
		fn is_attached(&self) -> bool {
			self.0.attached
		}

		fn client_rect(&self) -> Rect {
			self.0.rect
		}

		fn scroll_offset(&self) -> Point {
			self.0.scroll
		}

		fn parent(&self) -> Option<Self> {
			self.0.parent.clone().map(FakeElement)
		}
	}

	fn leaf(rect: Rect, parents: &[Point]) -> FakeElement {
		let mut parent = None;
		for scroll in parents.iter().rev() {
			parent = Some(Rc::new(Node {
				rect: Rect::default(),
				scroll: *scroll,
				attached: true,
				parent,
			}));
		}
		FakeElement(Rc::new(Node {
			rect,
			scroll: Point::ORIGIN,
			attached: true,
			parent,
		}))
	}

	#[test]
	fn negative_and_nan_sizes_clamp_to_zero() {
		let rect = Rect::new(5.0, f64::NAN, -10.0, f64::INFINITY);
		assert_eq!(rect, Rect::new(5.0, 0.0, 0.0, 0.0));
		assert!(rect.is_empty());
		assert!(!rect.contains(Point::new(5.0, 0.0)));
	}

	#[test]
	fn contains_is_inclusive_of_edges() {
		let rect = Rect::new(10.0, 10.0, 20.0, 20.0);
		assert!(rect.contains(Point::new(10.0, 10.0)));
		assert!(rect.contains(Point::new(30.0, 30.0)));
		assert!(!rect.contains(Point::new(30.1, 15.0)));
	}

	#[test]
	fn bounds_add_page_and_ancestor_scroll() {
		let element = leaf(
			Rect::new(10.0, 20.0, 30.0, 40.0),
			&[Point::new(0.0, 100.0), Point::new(5.0, 7.0)],
		);
		let bounds = absolute_bounds(&element, Point::new(1.0, 2.0)).unwrap();
		assert_eq!(bounds, Rect::new(16.0, 129.0, 30.0, 40.0));
	}

	#[test]
	fn detached_element_is_rejected() {
		let element = FakeElement(Rc::new(Node {
			rect: Rect::new(0.0, 0.0, 1.0, 1.0),
			scroll: Point::ORIGIN,
			attached: false,
			parent: None,
		}));
		assert!(matches!(
			absolute_bounds(&element, Point::ORIGIN),
			Err(Error::DetachedElement(_))
		));
		assert!(matches!(
			assert_element::<FakeElement>(None),
			Err(Error::MissingElement)
		));
	}
}
