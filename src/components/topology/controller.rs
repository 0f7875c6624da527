//! View state and the operations user input and telemetry drive.
//!
//! [`TopologyController`] owns everything the topology view needs between
//! frames: the graph, layout mode, camera, hover, detail panel and the
//! registries of open channels and timers. It never touches the DOM; the
//! component feeds it events and draws what it exposes. Channel and timer
//! handles are generic so the lifecycle can be exercised with plain mocks.

use std::collections::HashMap;
use std::fmt::Display;

use log::{debug, info, warn};

use super::config::TopologyConfig;
use super::detail::DetailPanel;
use super::fusion::{FusionReport, FusionService};
use super::geometry::{Point, Rect};
use super::highlight::HighlightState;
use super::layout::{LayoutEngine, LayoutMode, LayoutOutcome};
use super::minimap::{MinimapConfig, MinimapFrame, Projection};
use super::scale::{ScaleConfig, ScaledValues};
use super::store::GraphStore;
use super::tasks::{Cancel, ChannelRegistry, Holder, TaskRegistry, TimerKind};
use super::theme::{Theme, ThemeMode};
use super::types::{Frame, InterfaceRecord, TopologyResponse, TopologyStats};
use super::viewport::Viewport;

/// Handles released by [`TopologyController::teardown`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Teardown {
	/// Channels closed.
	pub channels: usize,
	/// Timers cancelled.
	pub timers: usize,
}

/// Node drag in progress. The node follows the pointer's travel since the
/// press, keeping the offset at which it was grabbed.
#[derive(Clone, Debug)]
struct DragState {
	node_id: String,
	start: Point,
	node_start: Point,
}

/// State of one topology view, generic over its channel (`C`) and timer
/// (`T`) handles.
pub struct TopologyController<C, T> {
	store: GraphStore,
	layout: LayoutEngine,
	fusion: FusionService,
	mode: LayoutMode,
	/// Camera of the main canvas.
	pub viewport: Viewport,
	/// Hover highlight with its fade state.
	pub highlight: HighlightState,
	/// Zoom-dependent sizing.
	pub scale: ScaleConfig,
	theme: Theme,
	panel: DetailPanel,
	query: String,
	stats: TopologyStats,
	minimap_config: MinimapConfig,
	/// Projection of the last drawn mini-map frame, used to map clicks.
	projection: Option<Projection>,
	/// Latest interface list per core node.
	last_interfaces: HashMap<String, Vec<InterfaceRecord>>,
	channels: ChannelRegistry<C>,
	timers: TaskRegistry<TimerKind, T>,
	drag: Option<DragState>,
	view_dirty: bool,
	minimap_dirty: bool,
}

impl<C: Cancel, T: Cancel> TopologyController<C, T> {
	/// Empty view over a `width` x `height` canvas.
	pub fn new(config: &TopologyConfig, width: f64, height: f64) -> Self {
		Self {
			store: GraphStore::new(),
			layout: LayoutEngine::new(config.layout.clone()),
			fusion: FusionService::new(config.fusion.clone()),
			mode: config.initial_layout,
			viewport: Viewport::new(width, height),
			highlight: HighlightState::default(),
			scale: ScaleConfig::default(),
			theme: Theme::default(),
			panel: DetailPanel::Closed,
			query: String::new(),
			stats: TopologyStats::default(),
			minimap_config: config.minimap.clone(),
			projection: None,
			last_interfaces: HashMap::new(),
			channels: ChannelRegistry::new(),
			timers: TaskRegistry::new(),
			drag: None,
			view_dirty: true,
			minimap_dirty: true,
		}
	}

	/// Replace the graph with a fetched topology, lay it out in the current
	/// mode and fit the view to it.
	pub fn load(&mut self, response: TopologyResponse) -> LayoutOutcome {
		let reported = response.stats;
		self.store = GraphStore::from_response(response);
		self.stats = reported.unwrap_or_else(|| self.store.stats());
		self.last_interfaces.clear();

		let dangling = self.store.dangling_edges().count();
		if dangling > 0 {
			warn!("topology: {dangling} edges reference unknown nodes, skipped when drawing");
		}
		info!(
			"topology loaded: {} nodes, {} edges",
			self.store.node_count(),
			self.store.edges().len()
		);

		let outcome = self.layout.apply(self.mode, &mut self.store);
		if let Some(bounds) = self.visible_bounds() {
			self.viewport.fit(&bounds);
		}
		self.mark_dirty();
		outcome
	}

	/// Use `fusion` instead of the configured service, e.g. with a custom
	/// matcher chain.
	pub fn with_fusion(mut self, fusion: FusionService) -> Self {
		self.fusion = fusion;
		self
	}

	/// The graph as currently laid out and fused.
	pub fn store(&self) -> &GraphStore {
		&self.store
	}

	/// Active layout mode.
	pub fn mode(&self) -> LayoutMode {
		self.mode
	}

	/// Active palette.
	pub fn theme(&self) -> &Theme {
		&self.theme
	}

	/// Detail panel contents.
	pub fn panel(&self) -> &DetailPanel {
		&self.panel
	}

	/// Last applied search, trimmed.
	pub fn query(&self) -> &str {
		&self.query
	}

	/// Header counts, as loaded or last recomputed.
	pub fn stats(&self) -> TopologyStats {
		self.stats
	}

	/// Ids of the core routers, in store order.
	pub fn core_nodes(&self) -> Vec<String> {
		self.store.core_node_ids()
	}

	/// Switch layout mode and animate the view onto the visible nodes.
	pub fn set_layout(&mut self, mode: LayoutMode) -> LayoutOutcome {
		self.mode = mode;
		let outcome = self.layout.apply(mode, &mut self.store);
		info!(
			"layout switched to {} ({} iterations, converged={})",
			mode, outcome.iterations, outcome.converged
		);
		self.refit();
		self.mark_dirty();
		outcome
	}

	/// World bounds of the visible nodes, `None` when nothing is visible.
	pub fn visible_bounds(&self) -> Option<Rect> {
		Rect::bounding(self.store.visible_nodes().map(|n| n.position))
	}

	/// Animate the view onto every visible node.
	pub fn refit(&mut self) {
		if let Some(bounds) = self.visible_bounds() {
			self.viewport.animate_fit(&bounds);
			self.mark_dirty();
		}
	}

	/// Topmost visible node under a screen position.
	pub fn node_at(&self, screen: Point) -> Option<String> {
		let world = self.viewport.screen_to_world(screen);
		let scaled = ScaledValues::new(&self.scale, self.viewport.scale);
		self.store
			.visible_nodes()
			.filter(|n| n.position.distance(world) <= scaled.hit_radius(n.role()))
			.last()
			.map(|n| n.id.clone())
	}

	/// Select the node under `screen`, or close the panel on empty space.
	/// Returns the selected node id.
	pub fn click<E: Display>(
		&mut self,
		screen: Point,
		open: impl FnOnce(&str) -> Result<C, E>,
	) -> Option<String> {
		match self.node_at(screen) {
			Some(id) => {
				self.select_node(&id, open);
				Some(id)
			}
			None => {
				self.close_panel();
				None
			}
		}
	}

	/// Open the detail panel for `node_id`. Core routers also get their live
	/// channel for the panel, opened through `open` unless the overlay
	/// already holds one. A channel that fails to open only marks the panel.
	pub fn select_node<E: Display>(
		&mut self,
		node_id: &str,
		open: impl FnOnce(&str) -> Result<C, E>,
	) {
		if self.panel.node_id() == Some(node_id) {
			// A router whose channel failed is retried on reselection.
			let is_core = self.store.node(node_id).is_some_and(|n| n.is_core());
			if !is_core || self.channels.is_held_by(node_id, Holder::Panel) {
				return;
			}
			debug!("reselecting {node_id}: reopening its channel");
		}
		self.close_panel();
		let Some(node) = self.store.node(node_id) else {
			debug!("select: unknown node {node_id}");
			return;
		};
		self.panel = DetailPanel::open(node);
		self.view_dirty = true;
		if !node.is_core() {
			return;
		}

		match self.channels.acquire(node_id, Holder::Panel, open) {
			Ok(true) => info!("channel opened for {node_id} (panel)"),
			Ok(false) => debug!("panel reuses channel for {node_id}"),
			Err(e) => {
				warn!("channel for {node_id} failed to open: {e}");
				self.panel.fail(node_id, e.to_string());
				return;
			}
		}
		if let Some(interfaces) = self.last_interfaces.get(node_id) {
			self.panel.show_interfaces(node_id, interfaces);
		}
	}

	/// Close the detail panel and release its channel. Returns whether a
	/// channel was closed.
	pub fn close_panel(&mut self) -> bool {
		let previous = std::mem::take(&mut self.panel);
		let Some(node_id) = previous.node_id() else {
			return false;
		};
		self.view_dirty = true;
		let closed = self.channels.release(node_id, Holder::Panel);
		if closed {
			info!("channel closed for {node_id}");
		}
		closed
	}

	/// Keep a live channel open for the edge overlay of `node_id`.
	pub fn hold_overlay_channel<E: Display>(
		&mut self,
		node_id: &str,
		open: impl FnOnce(&str) -> Result<C, E>,
	) -> bool {
		match self.channels.acquire(node_id, Holder::Overlay, open) {
			Ok(opened) => {
				if opened {
					info!("channel opened for {node_id} (overlay)");
				}
				true
			}
			Err(e) => {
				warn!("overlay channel for {node_id} failed to open: {e}");
				false
			}
		}
	}

	/// Whether `node_id` has a live channel, whoever holds it.
	pub fn channel_open(&self, node_id: &str) -> bool {
		self.channels.is_open(node_id)
	}

	/// Number of live channels.
	pub fn open_channels(&self) -> usize {
		self.channels.len()
	}

	/// Restrict visible nodes to those whose label or description contains
	/// `query`, case-insensitively. An empty query shows everything. Returns
	/// the number of visible nodes.
	pub fn apply_search(&mut self, query: &str) -> usize {
		let query = query.trim();
		self.query = query.to_string();
		if query.is_empty() {
			self.store.show_all();
		} else {
			let needle = query.to_lowercase();
			let ids: Vec<String> = self
				.store
				.nodes()
				.iter()
				.filter(|n| n.matches_query(&needle))
				.map(|n| n.id.clone())
				.collect();
			self.store.set_visible(ids.iter().map(String::as_str));
		}
		let visible = self.store.visible_nodes().count();
		debug!("search {:?}: {} nodes visible", query, visible);
		if let Some(hovered) = self.highlight.hovered().map(str::to_string) {
			if self.store.node(&hovered).is_some_and(|n| !n.visible) {
				self.highlight.set_hover(None, &self.store);
			}
		}
		self.refit();
		self.mark_dirty();
		visible
	}

	/// Highlight `node_id` and its neighbourhood, or clear the highlight.
	pub fn set_hover(&mut self, node_id: Option<&str>) {
		if self.highlight.set_hover(node_id, &self.store) {
			self.view_dirty = true;
		}
	}

	/// Swap palettes. Layout and positions are left alone.
	pub fn set_theme(&mut self, mode: ThemeMode) {
		if self.theme.mode != mode {
			debug!("theme switched to {}", mode.as_str());
			self.theme = Theme::for_mode(mode);
			self.mark_dirty();
		}
	}

	/// Start dragging the node under `screen`, if any. Returns its id.
	pub fn begin_drag(&mut self, screen: Point) -> Option<String> {
		let node_id = self.node_at(screen)?;
		let node_start = self.store.node(&node_id)?.position;
		self.drag = Some(DragState {
			node_id: node_id.clone(),
			start: screen,
			node_start,
		});
		Some(node_id)
	}

	/// Move the dragged node by the pointer's travel since the press.
	pub fn drag_to(&mut self, screen: Point) -> bool {
		let Some(drag) = &self.drag else {
			return false;
		};
		let k = self.viewport.scale;
		let position = Point::new(
			drag.node_start.x + (screen.x - drag.start.x) / k,
			drag.node_start.y + (screen.y - drag.start.y) / k,
		);
		let node_id = drag.node_id.clone();
		self.store.set_position(&node_id, position);
		self.mark_dirty();
		true
	}

	/// Stop dragging; the node stays where it was left.
	pub fn end_drag(&mut self) {
		self.drag = None;
	}

	/// Topmost visible edge under a screen position.
	pub fn edge_at(&self, screen: Point) -> Option<String> {
		let world = self.viewport.screen_to_world(screen);
		let scaled = ScaledValues::new(&self.scale, self.viewport.scale);
		self.store
			.renderable_edges()
			.filter(|(edge, source, target)| {
				let reach = scaled.edge_width(edge.width, 0.0) / 2.0 + scaled.hit_slop;
				world.distance_to_segment(source.position, target.position) <= reach
			})
			.last()
			.map(|(edge, _, _)| edge.id.clone())
	}

	/// Tooltip of the edge under `screen`, unless a node covers that point or
	/// the edge has nothing to show.
	pub fn edge_tooltip_at(&self, screen: Point) -> Option<String> {
		if self.node_at(screen).is_some() {
			return None;
		}
		let edge = self.store.edge(&self.edge_at(screen)?)?;
		(!edge.tooltip.is_empty()).then(|| edge.tooltip.clone())
	}

	/// Move the camera by a screen-space delta.
	pub fn pan_by(&mut self, dx: f64, dy: f64) {
		self.viewport.pan_by(dx, dy);
		self.mark_dirty();
	}

	/// Zoom by `factor`, keeping the world point under `anchor` fixed.
	pub fn zoom_at(&mut self, anchor: Point, factor: f64) {
		self.viewport.zoom_at(anchor, factor);
		self.mark_dirty();
	}

	/// Zoom about the canvas center, as the toolbar buttons do.
	pub fn zoom_by(&mut self, factor: f64) {
		let center = Point::new(self.viewport.width / 2.0, self.viewport.height / 2.0);
		self.zoom_at(center, factor);
	}

	/// Track a new canvas size.
	pub fn resize(&mut self, width: f64, height: f64) {
		self.viewport.resize(width, height);
		self.mark_dirty();
	}

	/// Fuse an interface list reported by `node_id` into its edges and the
	/// panel, if it shows that node.
	pub fn apply_interfaces(
		&mut self,
		node_id: &str,
		interfaces: Vec<InterfaceRecord>,
	) -> FusionReport {
		let report = self.fusion.apply(&mut self.store, node_id, &interfaces);
		for name in &report.unmatched {
			debug!("interface {node_id}/{name} matched no edge");
		}
		self.panel.show_interfaces(node_id, &interfaces);
		self.last_interfaces.insert(node_id.to_string(), interfaces);
		self.mark_dirty();
		report
	}

	/// Handle one frame from the channel of `node_id`. Only interface
	/// updates touch the graph.
	pub fn apply_frame(&mut self, node_id: &str, frame: Frame) -> Option<FusionReport> {
		match frame {
			Frame::Update { interfaces } => Some(self.apply_interfaces(node_id, interfaces)),
			Frame::Connected => {
				debug!("channel for {node_id} connected");
				None
			}
			Frame::Error { message } => {
				warn!("channel for {node_id} reported: {message}");
				if self.panel.fail(node_id, message) {
					self.view_dirty = true;
				}
				None
			}
			Frame::Other => None,
		}
	}

	/// The channel of `node_id` ended by itself. Its handle is detached and
	/// dropped; other channels are unaffected and a later selection may open
	/// a fresh one.
	pub fn channel_failed(&mut self, node_id: &str, message: &str) {
		if let Some(handle) = self.channels.forget(node_id) {
			warn!("channel for {node_id} failed: {message}");
			handle.cancel();
		}
		if self.panel.fail(node_id, message) {
			self.view_dirty = true;
		}
	}

	/// Build the next mini-map frame and remember its projection for clicks.
	pub fn minimap_frame(&mut self) -> Option<MinimapFrame> {
		let frame = MinimapFrame::build(&self.store, &self.viewport, &self.minimap_config);
		self.projection = frame.as_ref().map(|f| f.projection);
		frame
	}

	/// Mini-map canvas size and padding.
	pub fn minimap_config(&self) -> &MinimapConfig {
		&self.minimap_config
	}

	/// Pan the main view to the world point under a mini-map pixel, keeping
	/// the zoom. Returns that world point.
	pub fn minimap_click(&mut self, pixel: Point) -> Option<Point> {
		let world = self.projection?.unproject(pixel);
		self.viewport.pan_to(world);
		self.mark_dirty();
		Some(world)
	}

	/// Recount stats from the store.
	pub fn recompute_stats(&mut self) -> TopologyStats {
		self.stats = self.store.stats();
		self.stats
	}

	/// Advance animations. Returns whether the canvas needs a redraw.
	pub fn tick(&mut self, dt: f64) -> bool {
		let moved = self.viewport.tick(dt);
		let fading = !self.highlight.is_settled();
		self.highlight.tick(dt);
		if moved {
			self.minimap_dirty = true;
		}
		let dirty = moved || fading || self.view_dirty;
		self.view_dirty = false;
		dirty
	}

	/// Whether anything the mini-map shows changed since the last call.
	pub fn take_minimap_dirty(&mut self) -> bool {
		std::mem::take(&mut self.minimap_dirty)
	}

	fn mark_dirty(&mut self) {
		self.view_dirty = true;
		self.minimap_dirty = true;
	}

	/// Store a timer handle, cancelling any previous timer of that kind.
	pub fn set_timer(&mut self, kind: TimerKind, handle: T) {
		self.timers.insert(kind, handle);
	}

	/// Cancel the timer of `kind`. Returns whether one was registered.
	pub fn cancel_timer(&mut self, kind: TimerKind) -> bool {
		self.timers.cancel(&kind)
	}

	/// Whether a timer of `kind` is registered.
	pub fn has_timer(&self, kind: TimerKind) -> bool {
		self.timers.contains(&kind)
	}

	/// Tear down and forget the graph: the store, stats, search, hover and
	/// mini-map projection go back to empty so nothing of the previous
	/// topology is drawn until the next [`load`](Self::load).
	pub fn reset(&mut self) -> Teardown {
		let released = self.teardown();
		self.store = GraphStore::new();
		self.stats = TopologyStats::default();
		self.query.clear();
		self.projection = None;
		self.last_interfaces.clear();
		self.highlight = HighlightState::default();
		self.drag = None;
		self.mark_dirty();
		released
	}

	/// Close every channel, cancel every timer and drop the panel.
	pub fn teardown(&mut self) -> Teardown {
		self.panel = DetailPanel::Closed;
		let released = Teardown {
			channels: self.channels.close_all(),
			timers: self.timers.cancel_all(),
		};
		info!(
			"topology view torn down: {} channels closed, {} timers cancelled",
			released.channels, released.timers
		);
		released
	}
}

#[cfg(test)]
mod tests {
	use std::cell::RefCell;
	use std::rc::Rc;

	use super::*;
	use crate::components::topology::detail::LinkState;
	use crate::components::topology::fusion::DEFAULT_MATCHERS;
	use crate::components::topology::tasks::tests::{Probe, probe_factory};
	use crate::components::topology::types::Status;

	type Controller = TopologyController<Probe, Probe>;

	const TOPOLOGY: &str = r#"{
		"nodes": [
			{ "id": "r1", "label": "Core-1", "level": 0, "status": "up" },
			{ "id": "r2", "label": "Core-2", "level": 0, "status": "up" },
			{ "id": "s1", "label": "Branch-North", "level": 1, "info": "north campus" },
			{ "id": "s2", "label": "Branch-South", "level": 1 },
			{ "id": "pc1", "label": "Laptop", "status": "offline" }
		],
		"edges": [
			{ "id": "r1-s1", "from": "r1", "to": "s1", "label": "Gi0/1" },
			{ "id": "r2-s2", "from": "r2", "to": "s2", "label": "Gi0/2" },
			{ "id": "s1-pc1", "from": "s1", "to": "pc1" },
			{ "id": "ghost", "from": "s2", "to": "nowhere" }
		]
	}"#;

	fn loaded() -> Controller {
		let mut controller = Controller::new(&TopologyConfig::default(), 1200.0, 800.0);
		controller.load(TopologyResponse::parse(TOPOLOGY).unwrap());
		controller
	}

	fn log() -> Rc<RefCell<Vec<String>>> {
		Rc::new(RefCell::new(Vec::new()))
	}

	fn screen_of(controller: &Controller, id: &str) -> Point {
		let node = controller.store().node(id).unwrap();
		controller.viewport.world_to_screen(node.position)
	}

	#[test]
	fn load_lays_out_and_counts() {
		let controller = loaded();
		assert_eq!(controller.mode(), LayoutMode::Hierarchical);
		assert_eq!(controller.stats().nodes, 5);
		assert_eq!(controller.stats().down, 1);
		assert_eq!(controller.core_nodes(), ["r1", "r2"]);
		let bounds = controller.visible_bounds().unwrap();
		assert!(bounds.is_within(&controller.viewport.visible_rect()));
	}

	#[test]
	fn layout_switch_keeps_identities_and_animates() {
		let mut controller = loaded();
		let before: Vec<String> = controller.store().nodes().iter().map(|n| n.id.clone()).collect();
		controller.set_layout(LayoutMode::Radial);
		let after: Vec<String> = controller.store().nodes().iter().map(|n| n.id.clone()).collect();
		assert_eq!(before, after);
		assert!(controller.viewport.is_animating());
		controller.viewport.finish();
		let bounds = controller.visible_bounds().unwrap();
		assert!(bounds.is_within(&controller.viewport.visible_rect()));
	}

	#[test]
	fn clicking_a_router_opens_its_channel_and_empty_space_closes_it() {
		let log = log();
		let mut controller = loaded();
		let at = screen_of(&controller, "r1");
		let selected = controller.click(at, probe_factory(&log));
		assert_eq!(selected.as_deref(), Some("r1"));
		assert!(controller.channel_open("r1"));
		assert!(matches!(
			controller.panel(),
			DetailPanel::Router {
				link: LinkState::Connecting,
				..
			}
		));

		assert_eq!(controller.click(Point::new(-5000.0, -5000.0), probe_factory(&log)), None);
		assert!(!controller.panel().is_open());
		assert!(!controller.channel_open("r1"));
		assert_eq!(*log.borrow(), ["r1"]);
	}

	#[test]
	fn device_selection_opens_no_channel() {
		let log = log();
		let mut controller = loaded();
		controller.select_node("pc1", probe_factory(&log));
		assert!(matches!(controller.panel(), DetailPanel::Device(_)));
		assert_eq!(controller.open_channels(), 0);
	}

	#[test]
	fn closing_panel_keeps_overlay_channel() {
		let log = log();
		let mut controller = loaded();
		assert!(controller.hold_overlay_channel("r1", probe_factory(&log)));
		controller.select_node("r1", probe_factory(&log));
		assert_eq!(controller.open_channels(), 1);
		assert!(!controller.close_panel());
		assert!(controller.channel_open("r1"));
		assert!(log.borrow().is_empty());
	}

	#[test]
	fn switching_selection_releases_previous_channel() {
		let log = log();
		let mut controller = loaded();
		controller.select_node("r1", probe_factory(&log));
		controller.select_node("r2", probe_factory(&log));
		assert!(!controller.channel_open("r1"));
		assert!(controller.channel_open("r2"));
		assert_eq!(*log.borrow(), ["r1"]);
	}

	#[test]
	fn failed_open_marks_panel_only() {
		let mut controller = loaded();
		controller.select_node("r1", |_: &str| Err::<Probe, _>("refused"));
		assert!(matches!(
			controller.panel(),
			DetailPanel::Router {
				link: LinkState::Failed(_),
				..
			}
		));
		assert_eq!(controller.open_channels(), 0);
	}

	#[test]
	fn frames_drive_fusion_and_panel() {
		let log = log();
		let mut controller = loaded();
		controller.select_node("r1", probe_factory(&log));

		assert!(controller.apply_frame("r1", Frame::Connected).is_none());
		let frame = Frame::parse(
			r#"{"type":"update","interfaces":[{"name":"Gi0/1","in_rate":5000000,"out_rate":2000000,"status":"up"}]}"#,
		)
		.unwrap();
		let report = controller.apply_frame("r1", frame).unwrap();
		assert_eq!(report.matched.len(), 1);
		assert_eq!(controller.store().edge("r1-s1").unwrap().label, "▼5.0M ▲2.0M");
		assert!(matches!(
			controller.panel(),
			DetailPanel::Router {
				link: LinkState::Live(rows),
				..
			} if rows.len() == 1
		));

		controller.apply_frame(
			"r1",
			Frame::Error {
				message: "device unreachable".into(),
			},
		);
		assert!(matches!(
			controller.panel(),
			DetailPanel::Router {
				link: LinkState::Failed(m),
				..
			} if m == "device unreachable"
		));
	}

	#[test]
	fn one_channel_failing_leaves_others_alone() {
		let log = log();
		let mut controller = loaded();
		controller.hold_overlay_channel("r1", probe_factory(&log));
		controller.hold_overlay_channel("r2", probe_factory(&log));
		controller.channel_failed("r1", "closed");
		assert!(!controller.channel_open("r1"));
		assert!(controller.channel_open("r2"));
		assert_eq!(*log.borrow(), ["r1"]);

		assert!(controller.hold_overlay_channel("r1", probe_factory(&log)));
		assert!(controller.channel_open("r1"));
	}

	#[test]
	fn reselecting_failed_router_reopens_its_channel() {
		let log = log();
		let mut controller = loaded();
		controller.select_node("r1", probe_factory(&log));
		controller.channel_failed("r1", "closed");
		assert!(matches!(
			controller.panel(),
			DetailPanel::Router {
				link: LinkState::Failed(_),
				..
			}
		));

		controller.select_node("r1", probe_factory(&log));
		assert!(controller.channel_open("r1"));
		assert!(matches!(
			controller.panel(),
			DetailPanel::Router {
				link: LinkState::Connecting,
				..
			}
		));

		// A healthy selection is left alone.
		controller.select_node("r1", probe_factory(&log));
		assert_eq!(controller.open_channels(), 1);
		assert_eq!(*log.borrow(), ["r1"]);
	}

	#[test]
	fn reselecting_after_refused_open_retries() {
		let log = log();
		let mut controller = loaded();
		controller.select_node("r1", |_: &str| Err::<Probe, _>("refused"));
		assert_eq!(controller.open_channels(), 0);
		controller.select_node("r1", probe_factory(&log));
		assert!(controller.channel_open("r1"));
	}

	#[test]
	fn reset_forgets_the_previous_graph() {
		let log = log();
		let mut controller = loaded();
		let r1 = screen_of(&controller, "r1");
		controller.select_node("r1", probe_factory(&log));
		controller.set_timer(TimerKind::TelemetryRefresh, probe_factory(&log)("refresh").unwrap());
		controller.apply_search("core");
		controller.take_minimap_dirty();

		let released = controller.reset();
		assert_eq!(released, Teardown { channels: 1, timers: 1 });
		assert!(controller.store().is_empty());
		assert_eq!(controller.stats(), TopologyStats::default());
		assert_eq!(controller.query(), "");
		assert_eq!(controller.node_at(r1), None);
		assert!(!controller.panel().is_open());
		assert!(controller.minimap_frame().is_none());
		assert_eq!(controller.minimap_click(Point::new(10.0, 10.0)), None);
		assert!(controller.take_minimap_dirty());
		assert!(controller.tick(0.016));

		controller.load(TopologyResponse::parse(TOPOLOGY).unwrap());
		assert_eq!(controller.store().node_count(), 5);
	}

	#[test]
	fn drag_keeps_grab_offset() {
		let mut controller = loaded();
		let start = controller.store().node("r1").unwrap().position;
		let centre = screen_of(&controller, "r1");
		let grab = Point::new(centre.x + 2.0, centre.y);
		assert_eq!(controller.begin_drag(grab).as_deref(), Some("r1"));

		// Holding still does not snap the centre onto the pointer.
		assert!(controller.drag_to(grab));
		assert_eq!(controller.store().node("r1").unwrap().position, start);

		assert!(controller.drag_to(Point::new(grab.x + 30.0, grab.y)));
		let k = controller.viewport.scale;
		let moved = controller.store().node("r1").unwrap().position;
		assert!((moved.x - (start.x + 30.0 / k)).abs() < 1e-9);
		assert!((moved.y - start.y).abs() < 1e-9);

		controller.end_drag();
		assert!(!controller.drag_to(Point::new(0.0, 0.0)));
		assert_eq!(controller.begin_drag(Point::new(-5000.0, -5000.0)), None);
	}

	#[test]
	fn hovering_a_fused_edge_shows_its_detail() {
		let mut controller = loaded();
		controller.apply_interfaces(
			"r1",
			vec![InterfaceRecord {
				name: "Gi0/1".into(),
				rx: 5e6,
				tx: 2e6,
				status: Status::Up,
				..Default::default()
			}],
		);
		let (a, b) = (screen_of(&controller, "r1"), screen_of(&controller, "s1"));
		let middle = a.lerp(b, 0.5);
		assert_eq!(controller.edge_at(middle).as_deref(), Some("r1-s1"));
		let tooltip = controller.edge_tooltip_at(middle).unwrap();
		assert!(tooltip.starts_with("Gi0/1\nIn: 5.00 Mbps"));

		assert_eq!(controller.edge_at(Point::new(-5000.0, -5000.0)), None);
		assert_eq!(controller.edge_tooltip_at(a), None);
	}

	#[test]
	fn custom_matcher_chain_drives_fusion() {
		let fusion = FusionService::default().with_matchers(vec![DEFAULT_MATCHERS[2]]);
		let mut controller = loaded().with_fusion(fusion);
		let report = controller.apply_interfaces(
			"r1",
			vec![InterfaceRecord {
				name: "Gi0/1".into(),
				description: "To_Branch-North".into(),
				rx: 2e6,
				..Default::default()
			}],
		);
		assert_eq!(
			report.matched,
			[("Gi0/1".to_string(), "r1-s1".to_string(), "description")]
		);
	}

	#[test]
	fn selecting_router_shows_last_known_interfaces() {
		let log = log();
		let mut controller = loaded();
		controller.apply_interfaces(
			"r2",
			vec![InterfaceRecord {
				name: "Gi0/2".into(),
				rx: 1e6,
				tx: 1e6,
				status: Status::Down,
				..Default::default()
			}],
		);
		controller.select_node("r2", probe_factory(&log));
		assert!(matches!(
			controller.panel(),
			DetailPanel::Router {
				link: LinkState::Live(_),
				..
			}
		));
		assert_eq!(controller.store().edge("r2-s2").unwrap().status, Status::Down);
	}

	#[test]
	fn search_filters_and_restores() {
		let mut controller = loaded();
		assert_eq!(controller.apply_search("CORE"), 2);
		assert_eq!(controller.store().renderable_edges().count(), 0);
		assert_eq!(controller.apply_search("north campus"), 1);
		assert_eq!(controller.apply_search("no such device"), 0);
		assert!(controller.visible_bounds().is_none());
		assert_eq!(controller.apply_search("  "), 5);
		assert_eq!(controller.store().renderable_edges().count(), 3);
	}

	#[test]
	fn hidden_hovered_node_loses_highlight() {
		let mut controller = loaded();
		controller.set_hover(Some("pc1"));
		controller.apply_search("core");
		assert_eq!(controller.highlight.hovered(), None);
	}

	#[test]
	fn theme_switch_keeps_positions() {
		let mut controller = loaded();
		let before: Vec<Point> = controller.store().nodes().iter().map(|n| n.position).collect();
		controller.set_theme(ThemeMode::Light);
		let after: Vec<Point> = controller.store().nodes().iter().map(|n| n.position).collect();
		assert_eq!(before, after);
		assert_eq!(controller.theme().mode, ThemeMode::Light);
	}

	#[test]
	fn minimap_click_pans_without_zoom() {
		let mut controller = loaded();
		assert_eq!(controller.minimap_click(Point::new(10.0, 10.0)), None);
		assert!(controller.take_minimap_dirty());
		assert!(!controller.take_minimap_dirty());
		let frame = controller.minimap_frame().unwrap();
		let scale = controller.viewport.scale;
		let pixel = frame.projection.project(Point::new(120.0, 340.0));
		let world = controller.minimap_click(pixel).unwrap();
		assert!((world.x - 120.0).abs() < 1e-9 && (world.y - 340.0).abs() < 1e-9);
		controller.viewport.finish();
		assert!((controller.viewport.center.x - 120.0).abs() < 1e-9);
		assert!((controller.viewport.center.y - 340.0).abs() < 1e-9);
		assert_eq!(controller.viewport.scale, scale);
		assert!(controller.take_minimap_dirty());
	}

	#[test]
	fn teardown_releases_everything() {
		let log = log();
		let mut controller = loaded();
		for id in controller.core_nodes() {
			controller.hold_overlay_channel(&id, probe_factory(&log));
		}
		controller.select_node("r1", probe_factory(&log));
		let make = probe_factory(&log);
		controller.set_timer(TimerKind::TelemetryRefresh, make("refresh").unwrap());
		controller.set_timer(TimerKind::MinimapSafety, make("safety").unwrap());
		controller.set_timer(TimerKind::MetricsRecompute, make("metrics").unwrap());

		let released = controller.teardown();
		assert_eq!(released, Teardown { channels: 2, timers: 3 });
		assert_eq!(controller.open_channels(), 0);
		assert!(!controller.has_timer(TimerKind::TelemetryRefresh));
		assert_eq!(log.borrow().len(), 5);
		assert!(!controller.panel().is_open());
	}

	#[test]
	fn debounce_timer_is_replaced_not_stacked() {
		let log = log();
		let make = probe_factory(&log);
		let mut controller = loaded();
		controller.set_timer(TimerKind::MinimapDebounce, make("first").unwrap());
		controller.set_timer(TimerKind::MinimapDebounce, make("second").unwrap());
		assert_eq!(*log.borrow(), ["first"]);
		assert!(controller.has_timer(TimerKind::MinimapDebounce));
		assert!(controller.cancel_timer(TimerKind::MinimapDebounce));
		assert_eq!(*log.borrow(), ["first", "second"]);
		assert_eq!(controller.teardown().timers, 0);
	}

	#[test]
	fn metrics_recompute_counts_live_links() {
		let mut controller = loaded();
		controller.apply_interfaces(
			"r1",
			vec![InterfaceRecord {
				name: "Gi0/1".into(),
				rx: 3e6,
				tx: 1e6,
				status: Status::Up,
				..Default::default()
			}],
		);
		let stats = controller.recompute_stats();
		assert_eq!(stats.live_links, 1);
		assert_eq!(stats.throughput_bps, 4e6);
	}
}
