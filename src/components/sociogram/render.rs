use std::f64::consts::PI;

use web_sys::CanvasRenderingContext2d;

use crate::geometry::Point;
use crate::layout::{NetworkNode, PositionAccessor, SimulationLink};

const COLORS: &[&str] = &[
	"#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
	"#bcbd22", "#17becf",
];

/// Drawn node radius in screen pixels.
pub const NODE_RADIUS: f64 = 6.0;
/// Hit radius in screen pixels.
pub const HIT_RADIUS: f64 = 12.0;

/// One frame's worth of drawing input.
pub struct Scene<'a> {
	/// Live screen positions.
	pub positions: &'a PositionAccessor,
	/// Nodes in index order.
	pub nodes: &'a [NetworkNode],
	/// Edges as index pairs.
	pub links: &'a [SimulationLink],
	/// Node under the pointer, highlighted with its neighbours.
	pub hover: Option<usize>,
	/// Canvas width in pixels.
	pub width: f64,
	/// Canvas height in pixels.
	pub height: f64,
	/// Current zoom; node radius grows with its square root.
	pub zoom: f64,
}

impl Scene<'_> {
	fn is_neighbor(&self, index: usize) -> bool {
		let Some(hover) = self.hover else {
			return false;
		};
		self.links.iter().any(|link| {
			(link.source == hover && link.target == index)
				|| (link.target == hover && link.source == index)
		})
	}
}

/// Topmost node under the screen point, if any.
pub fn node_at_position(positions: &PositionAccessor, point: Point) -> Option<usize> {
	(0..positions.len())
		.rev()
		.find(|&index| positions.get(index).is_some_and(|p| p.distance(point) < HIT_RADIUS))
}

fn color_for(node_type: &str) -> &'static str {
	let hash = node_type
		.bytes()
		.fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
	COLORS[hash % COLORS.len()]
}

/// Clears the canvas and draws edges, then nodes.
pub fn render(scene: &Scene, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str("#1a1a2e");
	ctx.fill_rect(0.0, 0.0, scene.width, scene.height);
	draw_edges(scene, ctx);
	draw_nodes(scene, ctx);
}

fn draw_edges(scene: &Scene, ctx: &CanvasRenderingContext2d) {
	let radius = NODE_RADIUS * scene.zoom.sqrt();
	let arrow_size = 8.0;
	for link in scene.links {
		// Nodes without a position yet are skipped, not drawn at the origin.
		let (Some(from), Some(to)) = (scene.positions.get(link.source), scene.positions.get(link.target)) else {
			continue;
		};
		let (dx, dy) = (to.x - from.x, to.y - from.y);
		let dist = (dx * dx + dy * dy).sqrt();
		if dist < radius * 2.0 {
			continue;
		}
		let highlighted = scene.hover.is_some_and(|h| h == link.source || h == link.target);
		let alpha = match (scene.hover.is_some(), highlighted) {
			(false, _) => 0.6,
			(true, true) => 0.9,
			(true, false) => 0.15,
		};
		let (ux, uy) = (dx / dist, dy / dist);
		ctx.set_stroke_style_str(&format!("rgba(100, 180, 255, {alpha})"));
		ctx.set_line_width(1.5);
		ctx.begin_path();
		ctx.move_to(from.x + ux * radius, from.y + uy * radius);
		ctx.line_to(to.x - ux * (radius + arrow_size), to.y - uy * (radius + arrow_size));
		ctx.stroke();

		ctx.set_fill_style_str(&format!("rgba(100, 180, 255, {alpha})"));
		let (tip_x, tip_y) = (to.x - ux * radius, to.y - uy * radius);
		let (back_x, back_y) = (tip_x - ux * arrow_size, tip_y - uy * arrow_size);
		let (px, py) = (-uy * arrow_size * 0.5, ux * arrow_size * 0.5);
		ctx.begin_path();
		ctx.move_to(tip_x, tip_y);
		ctx.line_to(back_x + px, back_y + py);
		ctx.line_to(back_x - px, back_y - py);
		ctx.close_path();
		ctx.fill();
	}
}

fn draw_nodes(scene: &Scene, ctx: &CanvasRenderingContext2d) {
	let base = NODE_RADIUS * scene.zoom.sqrt();
	for (index, node) in scene.nodes.iter().enumerate() {
		let Some(point) = scene.positions.get(index) else {
			continue;
		};
		let hovered = scene.hover == Some(index);
		let dimmed = scene.hover.is_some() && !hovered && !scene.is_neighbor(index);
		let radius = if hovered { base * 1.35 } else { base };

		ctx.set_global_alpha(if dimmed { 0.3 } else { 1.0 });
		ctx.begin_path();
		let _ = ctx.arc(point.x, point.y, radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(color_for(&node.node_type));
		ctx.fill();
		if hovered {
			ctx.set_stroke_style_str("rgba(255, 255, 255, 0.7)");
			ctx.set_line_width(1.5);
			ctx.stroke();
		}

		if let Some(label) = &node.label {
			ctx.set_fill_style_str("rgba(255, 255, 255, 0.8)");
			ctx.set_font("11px sans-serif");
			let _ = ctx.fill_text(label, point.x + radius + 3.0, point.y + 3.0);
		}
		ctx.set_global_alpha(1.0);
	}
}
