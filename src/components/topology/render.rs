//! Canvas drawing for the main view and the mini-map.
//!
//! The main view draws in passes for correct z-ordering:
//! 1. Background (screen space)
//! 2. Edge lines, then edge throughput labels (world space)
//! 3. Dimmed nodes, then highlighted nodes with hover ring and labels on top

use std::f64::consts::PI;

use web_sys::CanvasRenderingContext2d;

use super::geometry::Point;
use super::highlight::HighlightState;
use super::minimap::{MinimapConfig, MinimapFrame};
use super::scale::{ScaleConfig, ScaledValues};
use super::store::{Edge, GraphStore, Node};
use super::theme::{Color, Theme};
use super::types::Status;
use super::viewport::{Viewport, smooth_step};

/// Everything the main canvas draws from, borrowed for one frame.
pub struct Scene<'a> {
	pub store: &'a GraphStore,
	pub viewport: &'a Viewport,
	pub highlight: &'a HighlightState,
	pub theme: &'a Theme,
	pub scale: &'a ScaleConfig,
}

/// Renders the complete graph to the canvas.
pub fn render(scene: &Scene<'_>, ctx: &CanvasRenderingContext2d) {
	let view = scene.viewport;
	let scale = ScaledValues::new(scene.scale, view.scale);

	ctx.set_fill_style_str(&scene.theme.background.to_css());
	ctx.fill_rect(0.0, 0.0, view.width, view.height);

	ctx.save();
	let _ = ctx.translate(view.width / 2.0, view.height / 2.0);
	let _ = ctx.scale(view.scale, view.scale);
	let _ = ctx.translate(-view.center.x, -view.center.y);

	draw_edges(scene, ctx, &scale);
	draw_nodes(scene, ctx, &scale);

	ctx.restore();
}

/// Dimming factor for elements outside the hover highlight.
fn dim(scene: &Scene<'_>) -> f64 {
	1.0 - 0.6 * smooth_step(scene.highlight.max_intensity())
}

fn draw_edges(scene: &Scene<'_>, ctx: &CanvasRenderingContext2d, scale: &ScaledValues) {
	let dim = dim(scene);

	for (edge, source, target) in scene.store.renderable_edges() {
		let t = smooth_step(scene.highlight.edge_intensity(&edge.id));
		let alpha = dim + (1.0 - dim) * t;
		let color = scene.theme.edge_color(edge.status, t);

		ctx.set_stroke_style_str(&color.with_alpha(color.a * alpha).to_css());
		ctx.set_line_width(scale.edge_width(edge.width, t));
		if edge.status == Status::Down {
			let dash = 6.0 / scale.k;
			let _ = ctx.set_line_dash(&js_sys::Array::of2(&dash.into(), &dash.into()));
		}
		ctx.begin_path();
		ctx.move_to(source.position.x, source.position.y);
		ctx.line_to(target.position.x, target.position.y);
		ctx.stroke();
		if edge.status == Status::Down {
			let _ = ctx.set_line_dash(&js_sys::Array::new());
		}
	}

	if scale.edge_label_alpha <= 0.01 {
		return;
	}
	ctx.set_font(&scale.edge_label_font);
	ctx.set_text_align("center");
	ctx.set_text_baseline("middle");
	for (edge, source, target) in scene.store.renderable_edges() {
		if edge.label.is_empty() {
			continue;
		}
		let t = smooth_step(scene.highlight.edge_intensity(&edge.id));
		let alpha = scale.edge_label_alpha * (dim + (1.0 - dim) * t);
		draw_edge_label(ctx, scene.theme, scale, edge, source.position.lerp(target.position, 0.5), alpha);
	}
	ctx.set_text_align("start");
	ctx.set_text_baseline("alphabetic");
}

fn draw_edge_label(
	ctx: &CanvasRenderingContext2d,
	theme: &Theme,
	scale: &ScaledValues,
	edge: &Edge,
	at: Point,
	alpha: f64,
) {
	let pad = 3.0 / scale.k;
	let width = ctx
		.measure_text(&edge.label)
		.map(|m| m.width())
		.unwrap_or(0.0);
	let height = 12.0 / scale.k;

	ctx.set_global_alpha(alpha);
	ctx.set_fill_style_str(&theme.labels.background.to_css());
	ctx.fill_rect(
		at.x - width / 2.0 - pad,
		at.y - height / 2.0 - pad / 2.0,
		width + 2.0 * pad,
		height + pad,
	);
	ctx.set_fill_style_str(&theme.labels.text.to_css());
	let _ = ctx.fill_text(&edge.label, at.x, at.y);
	ctx.set_global_alpha(1.0);
}

fn draw_nodes(scene: &Scene<'_>, ctx: &CanvasRenderingContext2d, scale: &ScaledValues) {
	let dim = dim(scene);
	let hovered = scene.highlight.hovered();

	// Pass 1: nodes outside the highlight
	for node in scene.store.visible_nodes() {
		if scene.highlight.node_intensity(&node.id) > 0.001 {
			continue;
		}
		draw_node(ctx, scene.theme, scale, node, dim, 1.0);
	}

	// Pass 2: highlighted or fading nodes on top
	for node in scene.store.visible_nodes() {
		let raw = scene.highlight.node_intensity(&node.id);
		if raw <= 0.001 {
			continue;
		}
		let t = smooth_step(raw);
		let alpha = dim + (1.0 - dim) * t;
		let grow = 1.0 + 0.25 * t;
		draw_node(ctx, scene.theme, scale, node, alpha, grow);

		if hovered == Some(node.id.as_str()) {
			let radius = scale.node_radius(node.role()) * grow;
			ctx.begin_path();
			let _ = ctx.arc(node.position.x, node.position.y, radius + scale.ring_offset, 0.0, 2.0 * PI);
			ctx.set_stroke_style_str(&scene.theme.ring.with_alpha(scene.theme.ring.a * t).to_css());
			ctx.set_line_width(scale.ring_width);
			ctx.stroke();
		}
	}
}

fn draw_node(
	ctx: &CanvasRenderingContext2d,
	theme: &Theme,
	scale: &ScaledValues,
	node: &Node,
	alpha: f64,
	radius_mult: f64,
) {
	let Point { x, y } = node.position;
	let radius = scale.node_radius(node.role()) * radius_mult;
	let fill = theme.node_fill(node.role(), node.status);

	ctx.set_global_alpha(alpha);
	ctx.begin_path();
	let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
	ctx.set_fill_style_str(&fill.to_css());
	ctx.fill();
	ctx.set_stroke_style_str(&fill.lighten(0.35).to_css());
	ctx.set_line_width(1.5 / scale.k);
	ctx.stroke();

	let label_alpha = alpha * scale.label_alpha;
	if label_alpha > 0.05 {
		ctx.set_global_alpha(label_alpha);
		ctx.set_fill_style_str(&theme.labels.text.to_css());
		ctx.set_font(&scale.label_font);
		let _ = ctx.fill_text(&node.label, x + radius + 4.0 / scale.k, y + 4.0 / scale.k);
	}
	ctx.set_global_alpha(1.0);
}

/// Draw one mini-map frame: backdrop, node dots and the viewport rectangle.
pub fn render_minimap(
	frame: Option<&MinimapFrame>,
	ctx: &CanvasRenderingContext2d,
	config: &MinimapConfig,
	theme: &Theme,
) {
	let style = &theme.minimap;
	ctx.clear_rect(0.0, 0.0, config.width, config.height);
	ctx.set_fill_style_str(&style.background.to_css());
	ctx.fill_rect(0.0, 0.0, config.width, config.height);
	ctx.set_stroke_style_str(&style.border.to_css());
	ctx.set_line_width(1.0);
	ctx.stroke_rect(0.5, 0.5, config.width - 1.0, config.height - 1.0);

	let Some(frame) = frame else {
		return;
	};

	for dot in &frame.dots {
		let color: Color = theme.node_fill(dot.role, dot.status);
		ctx.begin_path();
		let _ = ctx.arc(dot.position.x, dot.position.y, dot.radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(&color.to_css());
		ctx.fill();
	}

	let rect = frame.viewport;
	ctx.set_fill_style_str(&style.viewport_fill.to_css());
	ctx.fill_rect(rect.min_x, rect.min_y, rect.width(), rect.height());
	ctx.set_stroke_style_str(&style.viewport_stroke.to_css());
	ctx.set_line_width(1.5);
	ctx.stroke_rect(rect.min_x, rect.min_y, rect.width(), rect.height());
}
