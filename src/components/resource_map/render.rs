//! Canvas rendering for the resource map.
//!
//! Drawing happens in passes for correct z-ordering:
//! 1. Background (screen space)
//! 2. Expanded group frames, outermost first (world space)
//! 3. Edges, with the highlighted ones last
//! 4. Resource cards and collapsed groups, highlighted cards on top

use std::borrow::Cow;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::graph::{GraphEdge, GraphNode, LayoutResult, PositionedNode, Rect};
use super::highlight::HighlightState;
use super::theme::{Color, Theme};
use super::viewport::Viewport;

const LABEL_FONT: &str = "600 13px sans-serif";
const CAPTION_FONT: &str = "11px sans-serif";
const TITLE_FONT: &str = "600 12px sans-serif";
/// Rough advance of one character at the card fonts, for truncation.
const CHAR_WIDTH: f64 = 7.0;
const TEXT_INSET: f64 = 12.0;

/// Attempt to smooth values that would otherwise cause abrupt visual changes.
fn smooth_step(t: f64) -> f64 {
	t * t * (3.0 - 2.0 * t)
}

/// Everything one frame draws.
pub struct Scene<'a> {
	pub layout: &'a LayoutResult,
	pub viewport: &'a Viewport,
	pub highlight: &'a HighlightState,
	pub selected: Option<&'a str>,
}

impl Scene<'_> {
	/// Opacity of an element at highlight intensity `t`.
	fn alpha(&self, theme: &Theme, t: f64) -> f64 {
		let max_t = smooth_step(self.highlight.max_intensity());
		let dimmed = 1.0 - (1.0 - theme.dim_alpha) * max_t;
		dimmed + (1.0 - dimmed) * smooth_step(t)
	}
}

/// Renders the complete map to the canvas.
pub fn render(ctx: &CanvasRenderingContext2d, scene: &Scene<'_>, theme: &Theme) {
	draw_background(ctx, scene.viewport, theme);

	let transform = scene.viewport.transform;
	ctx.save();
	let _ = ctx.translate(transform.x, transform.y);
	let _ = ctx.scale(transform.k, transform.k);

	for node in &scene.layout.nodes {
		if let GraphNode::Group(group) = &node.node {
			if !group.collapsed {
				draw_group_frame(ctx, scene, theme, node);
			}
		}
	}

	draw_edges(ctx, scene, theme);

	let (highlighted, rest): (Vec<&PositionedNode>, Vec<&PositionedNode>) = scene
		.layout
		.nodes
		.iter()
		.filter(|node| is_card(&node.node))
		.partition(|node| scene.highlight.intensity(&node.id) > 0.001);
	for node in rest.into_iter().chain(highlighted) {
		draw_card(ctx, scene, theme, node);
	}

	ctx.restore();
}

fn is_card(node: &GraphNode) -> bool {
	match node {
		GraphNode::Object(_) => true,
		GraphNode::Group(group) => group.collapsed,
	}
}

fn draw_background(ctx: &CanvasRenderingContext2d, viewport: &Viewport, theme: &Theme) {
	let (w, h) = (viewport.width, viewport.height);
	let gradient = theme
		.background
		.use_gradient
		.then(|| ctx.create_radial_gradient(w / 2.0, h / 2.0, 0.0, w / 2.0, h / 2.0, w.max(h) * 0.8).ok())
		.flatten();

	match gradient {
		Some(gradient) => {
			let _ = gradient.add_color_stop(0.0, &theme.background.color_secondary.to_css());
			let _ = gradient.add_color_stop(1.0, &theme.background.color.to_css());
			#[allow(deprecated)]
			ctx.set_fill_style(&gradient);
		}
		None => ctx.set_fill_style_str(&theme.background.color.to_css()),
	}
	ctx.fill_rect(0.0, 0.0, w, h);
}

fn draw_group_frame(
	ctx: &CanvasRenderingContext2d,
	scene: &Scene<'_>,
	theme: &Theme,
	node: &PositionedNode,
) {
	let style = &theme.group;
	let t = scene.highlight.intensity(&node.id);
	ctx.set_global_alpha(scene.alpha(theme, t));

	rounded_rect(ctx, &node.rect, style.corner_radius);
	ctx.set_fill_style_str(&style.fill.to_css());
	ctx.fill();
	ctx.set_stroke_style_str(&style.border.lerp(theme.edge.highlight_color, smooth_step(t) * 0.6).to_css());
	ctx.set_line_width(1.0);
	ctx.stroke();

	let status = node.node.status();
	let title = match &node.node {
		GraphNode::Group(group) => format!("{} · {}", group.kind.label(), group.label),
		GraphNode::Object(object) => object.label.clone(),
	};
	let max_chars = ((node.rect.width - 2.0 * TEXT_INSET) / CHAR_WIDTH) as usize;
	ctx.set_font(TITLE_FONT);
	ctx.set_fill_style_str(&style.title.to_css());
	let _ = ctx.fill_text(
		&truncate_label(&title, max_chars),
		node.rect.x + TEXT_INSET,
		node.rect.y + 20.0,
	);
	if status.is_problem() {
		let (dot_x, dot_y) = (node.rect.right() - TEXT_INSET, node.rect.y + 16.0);
		ctx.begin_path();
		let _ = ctx.arc(dot_x, dot_y, 4.0, 0.0, std::f64::consts::TAU);
		ctx.set_fill_style_str(&theme.status.get(status).to_css());
		ctx.fill();
	}

	draw_selection_marks(ctx, scene, theme, node, style.corner_radius);
	ctx.set_global_alpha(1.0);
}

fn draw_edges(ctx: &CanvasRenderingContext2d, scene: &Scene<'_>, theme: &Theme) {
	let (highlighted, rest): (Vec<&GraphEdge>, Vec<&GraphEdge>) = scene
		.layout
		.edges
		.iter()
		.partition(|edge| scene.highlight.edge_intensity(&edge.id) > 0.01);
	for edge in rest.into_iter().chain(highlighted) {
		let (Some(source), Some(target)) = (scene.layout.get(&edge.source), scene.layout.get(&edge.target))
		else {
			continue;
		};
		draw_edge(ctx, scene, theme, edge, &source.rect, &target.rect);
	}
}

fn draw_edge(
	ctx: &CanvasRenderingContext2d,
	scene: &Scene<'_>,
	theme: &Theme,
	edge: &GraphEdge,
	from: &Rect,
	to: &Rect,
) {
	let style = &theme.edge;
	let (start, end) = (border_point(from, to.center()), border_point(to, from.center()));
	let (dx, dy) = (end.0 - start.0, end.1 - start.1);
	let dist = (dx * dx + dy * dy).sqrt();
	if dist < 0.001 {
		return;
	}

	let t = smooth_step(scene.highlight.edge_intensity(&edge.id));
	let color = style.color.lerp(style.highlight_color, t);
	ctx.set_global_alpha(scene.alpha(theme, t));
	ctx.set_stroke_style_str(&color.to_css());
	ctx.set_fill_style_str(&color.to_css());
	ctx.set_line_width(style.width * (1.0 + 0.6 * t));

	let (ux, uy) = (dx / dist, dy / dist);
	let (back_x, back_y) = (end.0 - ux * style.arrow_size, end.1 - uy * style.arrow_size);
	ctx.begin_path();
	ctx.move_to(start.0, start.1);
	ctx.line_to(back_x, back_y);
	ctx.stroke();

	let (px, py) = (-uy * style.arrow_size * 0.5, ux * style.arrow_size * 0.5);
	ctx.begin_path();
	ctx.move_to(end.0, end.1);
	ctx.line_to(back_x + px, back_y + py);
	ctx.line_to(back_x - px, back_y - py);
	ctx.close_path();
	ctx.fill();
	ctx.set_global_alpha(1.0);
}

fn draw_card(ctx: &CanvasRenderingContext2d, scene: &Scene<'_>, theme: &Theme, node: &PositionedNode) {
	let style = &theme.node;
	let rect = &node.rect;
	let t = scene.highlight.intensity(&node.id);
	ctx.set_global_alpha(scene.alpha(theme, t));

	rounded_rect(ctx, rect, style.corner_radius);
	ctx.set_fill_style_str(&style.fill.lerp(Color::rgb(255, 255, 255), 0.06 * smooth_step(t)).to_css());
	ctx.fill();

	let collapsed = node.node.is_group();
	if collapsed {
		let dash = js_sys::Array::of2(
			&JsValue::from_f64(theme.group.collapsed_dash[0]),
			&JsValue::from_f64(theme.group.collapsed_dash[1]),
		);
		let _ = ctx.set_line_dash(&dash);
		ctx.set_stroke_style_str(&theme.group.border.to_css());
	} else {
		ctx.set_stroke_style_str(&style.border.to_css());
	}
	ctx.set_line_width(1.0);
	ctx.stroke();
	let _ = ctx.set_line_dash(&js_sys::Array::new());

	let status = node.node.status();
	let accent = match &node.node {
		GraphNode::Object(object) if !status.is_problem() => theme.palette.for_kind(&object.kind),
		_ => theme.status.get(status),
	};
	ctx.set_fill_style_str(&accent.to_css());
	ctx.fill_rect(rect.x, rect.y + style.corner_radius, style.accent_width, rect.height - 2.0 * style.corner_radius);

	let (caption, label): (Cow<'_, str>, &str) = match &node.node {
		GraphNode::Object(object) => (
			match &object.namespace {
				Some(ns) => Cow::Owned(format!("{} · {}", object.kind, ns)),
				None => Cow::Borrowed(object.kind.as_str()),
			},
			object.label.as_str(),
		),
		GraphNode::Group(group) => (
			Cow::Owned(format!("{} · {} resources", group.kind.label(), group.object_count)),
			group.label.as_str(),
		),
	};
	let max_chars = ((rect.width - 2.0 * TEXT_INSET) / CHAR_WIDTH) as usize;
	ctx.set_font(CAPTION_FONT);
	ctx.set_fill_style_str(&style.caption.to_css());
	let _ = ctx.fill_text(&truncate_label(&caption, max_chars), rect.x + TEXT_INSET, rect.y + 20.0);
	ctx.set_font(LABEL_FONT);
	ctx.set_fill_style_str(&style.label.to_css());
	let _ = ctx.fill_text(&truncate_label(label, max_chars), rect.x + TEXT_INSET, rect.y + 40.0);

	draw_selection_marks(ctx, scene, theme, node, style.corner_radius);
	ctx.set_global_alpha(1.0);
}

/// Selection outline and hover ring.
fn draw_selection_marks(
	ctx: &CanvasRenderingContext2d,
	scene: &Scene<'_>,
	theme: &Theme,
	node: &PositionedNode,
	radius: f64,
) {
	if scene.selected == Some(node.id.as_str()) {
		rounded_rect(ctx, &node.rect, radius);
		ctx.set_stroke_style_str(&theme.selection.to_css());
		ctx.set_line_width(2.5 / scene.viewport.transform.k.max(0.5));
		ctx.stroke();
	}

	let ring_t = smooth_step(scene.highlight.hover_ring(&node.id));
	if ring_t > 0.01 {
		let grown = Rect::new(node.rect.x - 3.0, node.rect.y - 3.0, node.rect.width + 6.0, node.rect.height + 6.0);
		rounded_rect(ctx, &grown, radius + 3.0);
		ctx.set_stroke_style_str(&format!("rgba(255, 255, 255, {})", 0.6 * ring_t));
		ctx.set_line_width(1.5);
		ctx.stroke();
	}
}

fn rounded_rect(ctx: &CanvasRenderingContext2d, rect: &Rect, radius: f64) {
	let r = radius.min(rect.width / 2.0).min(rect.height / 2.0).max(0.0);
	let (x, y, right, bottom) = (rect.x, rect.y, rect.right(), rect.bottom());
	ctx.begin_path();
	ctx.move_to(x + r, y);
	let _ = ctx.arc_to(right, y, right, bottom, r);
	let _ = ctx.arc_to(right, bottom, x, bottom, r);
	let _ = ctx.arc_to(x, bottom, x, y, r);
	let _ = ctx.arc_to(x, y, right, y, r);
	ctx.close_path();
}

/// Point where the segment from the centre of `rect` towards `toward`
/// leaves the rectangle.
fn border_point(rect: &Rect, toward: (f64, f64)) -> (f64, f64) {
	let (cx, cy) = rect.center();
	let (dx, dy) = (toward.0 - cx, toward.1 - cy);
	if dx.abs() < f64::EPSILON && dy.abs() < f64::EPSILON {
		return (cx, cy);
	}
	let scale_x = if dx.abs() > f64::EPSILON { (rect.width / 2.0) / dx.abs() } else { f64::INFINITY };
	let scale_y = if dy.abs() > f64::EPSILON { (rect.height / 2.0) / dy.abs() } else { f64::INFINITY };
	let s = scale_x.min(scale_y);
	(cx + dx * s, cy + dy * s)
}

/// Shortens `label` to at most `max_chars` characters, ending in an ellipsis.
fn truncate_label(label: &str, max_chars: usize) -> Cow<'_, str> {
	if label.chars().count() <= max_chars {
		return Cow::Borrowed(label);
	}
	if max_chars == 0 {
		return Cow::Borrowed("");
	}
	let kept: String = label.chars().take(max_chars - 1).collect();
	Cow::Owned(format!("{kept}…"))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn assert_near(actual: (f64, f64), expected: (f64, f64)) {
		assert!(
			(actual.0 - expected.0).abs() < 1e-9 && (actual.1 - expected.1).abs() < 1e-9,
			"{actual:?} != {expected:?}"
		);
	}

	#[test]
	fn border_point_exits_through_the_facing_side() {
		let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
		assert_near(border_point(&rect, (500.0, 25.0)), (100.0, 25.0));
		assert_near(border_point(&rect, (50.0, -300.0)), (50.0, 0.0));
		assert_near(border_point(&rect, (150.0, 75.0)), (100.0, 50.0));
		assert_near(border_point(&rect, (50.0, 25.0)), (50.0, 25.0));
	}

	#[test]
	fn long_labels_are_ellipsized() {
		assert_eq!(truncate_label("web", 10), "web");
		assert_eq!(truncate_label("frontend-deployment", 9), "frontend…");
		assert_eq!(truncate_label("abc", 0), "");
	}
}
