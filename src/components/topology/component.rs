//! Leptos component wiring the topology controller to the page.
//!
//! Two canvases (main view and mini-map) plus a toolbar, a detail panel and
//! an error overlay. The controller lives in an `Rc<RefCell<_>>` shared by
//! event handlers, socket callbacks and timers; reactive signals only carry
//! the plain data the surrounding markup displays. An animation loop runs via
//! `requestAnimationFrame` and redraws the main canvas when the controller
//! reports a change.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::prelude::*;
use leptos::task::spawn_local;
use log::{debug, error, info, warn};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::api::ApiClient;
use super::channel::{ChannelEvent, LiveChannel};
use super::config::{OverlayMode, TopologyConfig};
use super::controller::TopologyController;
use super::detail::{DetailPanel, InterfaceRow, LinkState, NodeSummary};
use super::error::TopologyError;
use super::geometry::Point;
use super::layout::LayoutMode;
use super::render::{self, Scene};
use super::tasks::TimerKind;
use super::theme::ThemeMode;
use super::timer::Timer;
use super::types::{TopologyResponse, TopologyStats};

type Controller = TopologyController<LiveChannel, Timer>;

/// Fixed animation step, seconds.
const FRAME_DT: f64 = 0.016;

/// Pointer travel (pixels) below which a press counts as a click.
const CLICK_SLOP: f64 = 3.0;

#[derive(Clone, Debug, PartialEq)]
enum LoadState {
	Loading,
	Ready,
	Failed(String),
}

/// Detail text of the hovered edge, shown next to the pointer.
#[derive(Clone, Debug, PartialEq)]
struct EdgeTip {
	text: String,
	at: Point,
}

/// Signals the markup renders from.
#[derive(Clone, Copy)]
struct Ui {
	status: RwSignal<LoadState>,
	panel: RwSignal<DetailPanel>,
	stats: RwSignal<TopologyStats>,
	mode: RwSignal<LayoutMode>,
	tooltip: RwSignal<Option<EdgeTip>>,
}

#[derive(Clone, Debug, Default)]
enum Pointer {
	#[default]
	Idle,
	Pressed {
		/// Whether the press landed on a node (drag) or the background (pan).
		on_node: bool,
		origin: Point,
		last: Point,
		moved: bool,
	},
}

/// Everything a mounted view shares between callbacks.
#[derive(Clone)]
struct Session {
	controller: Rc<RefCell<Controller>>,
	api: ApiClient,
	config: Rc<TopologyConfig>,
	ui: Ui,
	pointer: Rc<RefCell<Pointer>>,
	minimap_ctx: Rc<RefCell<Option<CanvasRenderingContext2d>>>,
	frame: Rc<RefCell<Option<Closure<dyn FnMut()>>>>,
	frame_id: Rc<Cell<Option<i32>>>,
	running: Rc<Cell<bool>>,
	resize: Rc<RefCell<Option<Closure<dyn FnMut()>>>>,
}

fn context_2d(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d, TopologyError> {
	canvas
		.get_context("2d")
		.map_err(|e| TopologyError::Surface(format!("{e:?}")))?
		.ok_or_else(|| TopologyError::Surface("canvas has no 2d context".into()))?
		.dyn_into()
		.map_err(|_| TopologyError::Surface("unexpected context type".into()))
}

fn window_size(window: &Window) -> Option<(f64, f64)> {
	Some((
		window.inner_width().ok()?.as_f64()?,
		window.inner_height().ok()?.as_f64()?,
	))
}

fn local_point(ev: &MouseEvent) -> Point {
	Point::new(ev.offset_x() as f64, ev.offset_y() as f64)
}

impl Session {
	fn new(config: TopologyConfig, ui: Ui) -> Self {
		Self {
			controller: Rc::new(RefCell::new(Controller::new(&config, 800.0, 600.0))),
			api: ApiClient::new(&config.api_base, &config.ws_base),
			config: Rc::new(config),
			ui,
			pointer: Rc::default(),
			minimap_ctx: Rc::default(),
			frame: Rc::default(),
			frame_id: Rc::default(),
			running: Rc::new(Cell::new(false)),
			resize: Rc::default(),
		}
	}

	fn mount(
		&self,
		canvas: HtmlCanvasElement,
		minimap: HtmlCanvasElement,
		fullscreen: bool,
	) -> Result<(), TopologyError> {
		if self.running.get() {
			return Ok(());
		}
		let window = web_sys::window().ok_or_else(|| TopologyError::Surface("no window".into()))?;
		let (w, h) = if fullscreen {
			window_size(&window).unwrap_or((800.0, 600.0))
		} else {
			canvas
				.parent_element()
				.map(|p| (p.client_width() as f64, p.client_height() as f64))
				.filter(|(w, h)| *w > 0.0 && *h > 0.0)
				.unwrap_or((800.0, 600.0))
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);
		minimap.set_width(self.config.minimap.width as u32);
		minimap.set_height(self.config.minimap.height as u32);

		let ctx = context_2d(&canvas)?;
		*self.minimap_ctx.borrow_mut() = Some(context_2d(&minimap)?);
		self.controller.borrow_mut().resize(w, h);

		if fullscreen {
			let (s, canvas) = (self.clone(), canvas.clone());
			let on_resize = Closure::<dyn FnMut()>::new(move || {
				let Some((nw, nh)) = web_sys::window().as_ref().and_then(window_size) else {
					return;
				};
				canvas.set_width(nw as u32);
				canvas.set_height(nh as u32);
				s.controller.borrow_mut().resize(nw, nh);
			});
			let _ = window.add_event_listener_with_callback("resize", on_resize.as_ref().unchecked_ref());
			*self.resize.borrow_mut() = Some(on_resize);
		}

		self.run_animation(ctx);
		self.start();
		Ok(())
	}

	fn run_animation(&self, ctx: CanvasRenderingContext2d) {
		let s = self.clone();
		*self.frame.borrow_mut() = Some(Closure::new(move || {
			if !s.running.get() {
				return;
			}
			s.animate(&ctx);
			if let Some(cb) = s.frame.borrow().as_ref() {
				s.request_frame(cb);
			}
		}));
		self.running.set(true);
		if let Some(cb) = self.frame.borrow().as_ref() {
			self.request_frame(cb);
		}
	}

	fn request_frame(&self, cb: &Closure<dyn FnMut()>) {
		let id = web_sys::window()
			.and_then(|w| w.request_animation_frame(cb.as_ref().unchecked_ref()).ok());
		self.frame_id.set(id);
	}

	fn animate(&self, ctx: &CanvasRenderingContext2d) {
		let minimap_changed = {
			let mut c = self.controller.borrow_mut();
			if c.tick(FRAME_DT) {
				let scene = Scene {
					store: c.store(),
					viewport: &c.viewport,
					highlight: &c.highlight,
					theme: c.theme(),
					scale: &c.scale,
				};
				render::render(&scene, ctx);
			}
			c.take_minimap_dirty()
		};
		if minimap_changed {
			self.schedule_minimap();
		}
	}

	/// Restart the trailing mini-map redraw.
	fn schedule_minimap(&self) {
		let s = self.clone();
		match Timer::timeout(self.config.minimap_debounce_ms, move || s.draw_minimap()) {
			Ok(timer) => self
				.controller
				.borrow_mut()
				.set_timer(TimerKind::MinimapDebounce, timer),
			Err(e) => warn!("mini-map redraw not scheduled: {e}"),
		}
	}

	fn draw_minimap(&self) {
		let Some(ctx) = self.minimap_ctx.borrow().clone() else {
			return;
		};
		let mut c = self.controller.borrow_mut();
		let frame = c.minimap_frame();
		render::render_minimap(frame.as_ref(), &ctx, c.minimap_config(), c.theme());
	}

	/// Fetch the topology and bring the view up.
	fn start(&self) {
		self.ui.status.set(LoadState::Loading);
		let s = self.clone();
		spawn_local(async move {
			match s.api.fetch_topology(&s.config.view, s.config.limit).await {
				Ok(response) => s.on_loaded(response),
				Err(e) => {
					error!("topology load failed: {e}");
					s.ui.status.set(LoadState::Failed(e.to_string()));
				}
			}
		});
	}

	fn on_loaded(&self, response: TopologyResponse) {
		let outcome = self.controller.borrow_mut().load(response);
		self.ui.mode.set(outcome.mode);

		let cores = self.controller.borrow().core_nodes();
		if self.config.overlay == OverlayMode::Live {
			for id in &cores {
				self.controller
					.borrow_mut()
					.hold_overlay_channel(id, self.opener());
			}
		}
		// Initial snapshot for every core node, whichever overlay is used.
		for id in cores {
			self.poll(id);
		}

		self.start_timers();
		self.sync();
		self.draw_minimap();
		self.ui.status.set(LoadState::Ready);
	}

	fn start_timers(&self) {
		let s = self.clone();
		self.start_timer(
			TimerKind::TelemetryRefresh,
			Timer::interval(self.config.refresh_interval_ms, move || s.refresh_all()),
		);
		let s = self.clone();
		self.start_timer(
			TimerKind::MinimapSafety,
			Timer::interval(self.config.minimap_safety_ms, move || s.draw_minimap()),
		);
		let s = self.clone();
		self.start_timer(
			TimerKind::MetricsRecompute,
			Timer::interval(self.config.metrics_interval_ms, move || {
				let stats = s.controller.borrow_mut().recompute_stats();
				s.ui.stats.set(stats);
			}),
		);
	}

	fn start_timer(&self, kind: TimerKind, timer: Result<Timer, TopologyError>) {
		match timer {
			Ok(timer) => self.controller.borrow_mut().set_timer(kind, timer),
			Err(e) => warn!("{kind:?} timer not started: {e}"),
		}
	}

	/// Poll every core node that has no live channel pushing updates.
	fn refresh_all(&self) {
		let targets: Vec<String> = {
			let c = self.controller.borrow();
			c.core_nodes()
				.into_iter()
				.filter(|id| !c.channel_open(id))
				.collect()
		};
		for id in targets {
			self.poll(id);
		}
	}

	fn poll(&self, node_id: String) {
		let s = self.clone();
		spawn_local(async move {
			match s.api.fetch_interfaces(&node_id).await {
				Ok(interfaces) => {
					s.controller
						.borrow_mut()
						.apply_interfaces(&node_id, interfaces);
					s.sync();
				}
				Err(e) => debug!("interface poll for {node_id} failed: {e}"),
			}
		});
	}

	/// Channel factory handed to the controller.
	fn opener(&self) -> impl FnOnce(&str) -> Result<LiveChannel, TopologyError> + 'static {
		let s = self.clone();
		move |node_id: &str| {
			let (handler, node) = (s.clone(), node_id.to_string());
			LiveChannel::open(&s.api.channel_url(node_id), node_id, move |event| {
				handler.on_channel_event(&node, event)
			})
		}
	}

	fn on_channel_event(&self, node_id: &str, event: ChannelEvent) {
		match event {
			ChannelEvent::Frame(frame) => {
				let report = self.controller.borrow_mut().apply_frame(node_id, frame);
				if report.is_some() {
					self.sync();
				} else {
					self.sync_panel();
				}
			}
			ChannelEvent::Ended(reason) => {
				// Dropping the channel from inside its own callback is not
				// allowed; finish on the next tick.
				let (s, node_id) = (self.clone(), node_id.to_string());
				spawn_local(async move {
					s.controller.borrow_mut().channel_failed(&node_id, &reason);
					s.sync_panel();
				});
			}
		}
	}

	fn sync_panel(&self) {
		let panel = self.controller.borrow().panel().clone();
		self.ui.panel.set(panel);
	}

	fn sync(&self) {
		self.sync_panel();
		let stats = self.controller.borrow().stats();
		self.ui.stats.set(stats);
	}

	fn pointer_down(&self, at: Point) {
		let on_node = self.controller.borrow_mut().begin_drag(at).is_some();
		*self.pointer.borrow_mut() = Pointer::Pressed {
			on_node,
			origin: at,
			last: at,
			moved: false,
		};
		self.show_tooltip(None);
	}

	fn pointer_move(&self, at: Point) {
		let tip = {
			let mut pointer = self.pointer.borrow_mut();
			let mut c = self.controller.borrow_mut();
			match &mut *pointer {
				Pointer::Idle => {
					let hovered = c.node_at(at);
					c.set_hover(hovered.as_deref());
					c.edge_tooltip_at(at).map(|text| EdgeTip { text, at })
				}
				Pointer::Pressed {
					on_node,
					origin,
					last,
					moved,
				} => {
					*moved |= origin.distance(at) > CLICK_SLOP;
					if *moved {
						if *on_node {
							c.drag_to(at);
						} else {
							c.pan_by(at.x - last.x, at.y - last.y);
						}
					}
					*last = at;
					None
				}
			}
		};
		self.show_tooltip(tip);
	}

	fn pointer_up(&self, at: Point) {
		let pointer = std::mem::take(&mut *self.pointer.borrow_mut());
		self.controller.borrow_mut().end_drag();
		if let Pointer::Pressed { moved: false, .. } = pointer {
			self.controller.borrow_mut().click(at, self.opener());
			self.sync_panel();
		}
	}

	fn pointer_leave(&self) {
		*self.pointer.borrow_mut() = Pointer::Idle;
		let mut c = self.controller.borrow_mut();
		c.end_drag();
		c.set_hover(None);
		drop(c);
		self.show_tooltip(None);
	}

	fn show_tooltip(&self, tip: Option<EdgeTip>) {
		if tip.is_some() || self.ui.tooltip.with_untracked(Option::is_some) {
			self.ui.tooltip.set(tip);
		}
	}

	fn close_panel(&self) {
		self.controller.borrow_mut().close_panel();
		self.sync_panel();
	}

	fn set_layout(&self, mode: LayoutMode) {
		let outcome = self.controller.borrow_mut().set_layout(mode);
		self.ui.mode.set(outcome.mode);
	}

	/// Drop the current graph and fetch again. Nothing of the old topology
	/// stays on screen, whether or not the new fetch succeeds.
	fn reload(&self) {
		info!("reloading topology");
		self.controller.borrow_mut().reset();
		self.show_tooltip(None);
		self.sync();
		self.draw_minimap();
		self.start();
	}

	fn shutdown(&self) {
		self.running.set(false);
		if let (Some(window), Some(id)) = (web_sys::window(), self.frame_id.take()) {
			let _ = window.cancel_animation_frame(id);
		}
		self.frame.borrow_mut().take();
		if let (Some(window), Some(cb)) = (web_sys::window(), self.resize.borrow_mut().take()) {
			let _ = window.remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
		}
		self.controller.borrow_mut().teardown();
	}
}

fn stats_line(stats: &TopologyStats) -> String {
	format!(
		"{} devices · {} links · {} up · {} down · {} live links · {:.1} Mbps",
		stats.nodes,
		stats.edges,
		stats.up,
		stats.down,
		stats.live_links,
		stats.throughput_bps / 1e6
	)
}

fn summary_view(node: &NodeSummary) -> impl IntoView {
	view! {
		<h2>{node.label.clone()}</h2>
		<dl>
			<dt>"Role"</dt><dd>{node.role.as_str()}</dd>
			<dt>"Type"</dt><dd>{node.device_type.clone()}</dd>
			<dt>"Status"</dt><dd class=format!("status-{}", node.status.as_str())>{node.status.as_str()}</dd>
			<dt>"Branch"</dt><dd>{node.branch.clone().unwrap_or_default()}</dd>
			<dt>"Details"</dt><dd>{node.info.clone()}</dd>
		</dl>
	}
}

fn interface_table(rows: Vec<InterfaceRow>) -> impl IntoView {
	view! {
		<table class="interface-table">
			<thead>
				<tr><th>"Interface"</th><th>"Description"</th><th>"In"</th><th>"Out"</th><th>"Status"</th></tr>
			</thead>
			<tbody>
				{rows
					.into_iter()
					.map(|row| view! {
						<tr class=format!("status-{}", row.status.as_str())>
							<td>{row.name}</td>
							<td>{row.description}</td>
							<td>{format!("{:.2} Mbps", row.rx_mbps)}</td>
							<td>{format!("{:.2} Mbps", row.tx_mbps)}</td>
							<td>{row.status.as_str()}</td>
						</tr>
					})
					.collect_view()}
			</tbody>
		</table>
	}
}

fn link_view(link: LinkState) -> AnyView {
	match link {
		LinkState::Connecting => view! { <p class="link-connecting">"Connecting…"</p> }.into_any(),
		LinkState::Failed(message) => {
			view! { <p class="link-failed">{format!("Connection failed: {message}")}</p> }.into_any()
		}
		LinkState::Live(rows) => interface_table(rows).into_any(),
	}
}

/// Live network topology: layout modes, telemetry on edges, detail panel and
/// mini-map.
///
/// `theme` follows the surrounding page; switching it recolors the view
/// without touching the layout.
#[component]
pub fn TopologyView(
	/// Endpoints, overlay mode, intervals and tuning.
	config: TopologyConfig,
	/// Palette to draw with; followed live.
	#[prop(into)]
	theme: Signal<ThemeMode>,
	/// Size the canvas to the window and follow its resizes.
	#[prop(default = false)]
	fullscreen: bool,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let minimap_ref = NodeRef::<leptos::html::Canvas>::new();
	let ui = Ui {
		status: RwSignal::new(LoadState::Loading),
		panel: RwSignal::new(DetailPanel::Closed),
		stats: RwSignal::new(TopologyStats::default()),
		mode: RwSignal::new(config.initial_layout),
		tooltip: RwSignal::new(None),
	};
	let session = StoredValue::new_local(Session::new(config, ui));

	Effect::new(move |_| {
		let (Some(canvas), Some(minimap)) = (canvas_ref.get(), minimap_ref.get()) else {
			return;
		};
		let mounted = session.with_value(|s| s.mount(canvas, minimap, fullscreen));
		if let Err(e) = mounted {
			error!("topology view cannot draw: {e}");
			ui.status.set(LoadState::Failed(e.to_string()));
		}
	});

	Effect::new(move |_| {
		let mode = theme.get();
		session.with_value(|s| s.controller.borrow_mut().set_theme(mode));
	});

	on_cleanup(move || {
		session.try_with_value(Session::shutdown);
	});

	let on_mousedown = move |ev: MouseEvent| session.with_value(|s| s.pointer_down(local_point(&ev)));
	let on_mousemove = move |ev: MouseEvent| session.with_value(|s| s.pointer_move(local_point(&ev)));
	let on_mouseup = move |ev: MouseEvent| session.with_value(|s| s.pointer_up(local_point(&ev)));
	let on_mouseleave = move |_: MouseEvent| session.with_value(Session::pointer_leave);
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let factor = if ev.delta_y() > 0.0 { 0.9 } else { 1.1 };
		session.with_value(|s| s.controller.borrow_mut().zoom_at(local_point(&ev), factor));
	};
	let on_minimap_click = move |ev: MouseEvent| {
		session.with_value(|s| {
			s.controller.borrow_mut().minimap_click(local_point(&ev));
		});
	};
	let on_search = move |ev| {
		let query = event_target_value(&ev);
		session.with_value(|s| {
			let shown = s.controller.borrow_mut().apply_search(&query);
			debug!("search {query:?}: {shown} devices shown");
		});
	};
	let on_layout = move |ev| match event_target_value(&ev).parse::<LayoutMode>() {
		Ok(mode) => session.with_value(|s| s.set_layout(mode)),
		Err(e) => warn!("{e}"),
	};

	view! {
		<div class=move || format!("topology-view theme-{}", theme.get().as_str())>
			<div class="topology-toolbar">
				<input type="search" placeholder="Search devices" on:input=on_search />
				<select on:change=on_layout>
					{LayoutMode::ALL
						.into_iter()
						.map(|m| view! {
							<option value=m.as_str() selected=move || ui.mode.get() == m>{m.label()}</option>
						})
						.collect_view()}
				</select>
				<button on:click=move |_| session.with_value(|s| s.controller.borrow_mut().refit())>"Fit"</button>
				<button on:click=move |_| session.with_value(|s| s.controller.borrow_mut().zoom_by(1.25))>"+"</button>
				<button on:click=move |_| session.with_value(|s| s.controller.borrow_mut().zoom_by(0.8))>"−"</button>
				<span class="topology-stats">{move || stats_line(&ui.stats.get())}</span>
			</div>
			<div class="topology-stage" style="position: relative;">
				<canvas
					node_ref=canvas_ref
					class="topology-canvas"
					on:mousedown=on_mousedown
					on:mousemove=on_mousemove
					on:mouseup=on_mouseup
					on:mouseleave=on_mouseleave
					on:wheel=on_wheel
					style="display: block; cursor: grab;"
				/>
				{move || ui.tooltip.get().map(|tip| view! {
					<div
						class="topology-tooltip"
						style=format!(
							"position: absolute; left: {}px; top: {}px; white-space: pre-line; pointer-events: none;",
							tip.at.x + 12.0,
							tip.at.y + 12.0,
						)
					>
						{tip.text}
					</div>
				})}
			</div>
			<canvas node_ref=minimap_ref class="topology-minimap" on:click=on_minimap_click />
			{move || match ui.panel.get() {
				DetailPanel::Closed => ().into_any(),
				DetailPanel::Device(node) => view! {
					<aside class="topology-panel">
						<button class="panel-close" on:click=move |_| session.with_value(Session::close_panel)>"×"</button>
						{summary_view(&node)}
					</aside>
				}.into_any(),
				DetailPanel::Router { node, link } => view! {
					<aside class="topology-panel">
						<button class="panel-close" on:click=move |_| session.with_value(Session::close_panel)>"×"</button>
						{summary_view(&node)}
						{link_view(link)}
					</aside>
				}.into_any(),
			}}
			{move || match ui.status.get() {
				LoadState::Ready => ().into_any(),
				LoadState::Loading => view! { <div class="topology-status">"Loading topology…"</div> }.into_any(),
				LoadState::Failed(message) => view! {
					<div class="topology-status topology-error">
						<p>{message}</p>
						<button on:click=move |_| session.with_value(Session::reload)>"Reload"</button>
					</div>
				}.into_any(),
			}}
		</div>
	}
}
