//! Leptos component drawing the laid-out resource map on a canvas.
//!
//! The component owns the camera, the highlight animation and the current
//! layout. Whenever the visible graph or the canvas size changes it submits
//! a new layout run; runs that are superseded before they finish are
//! dropped, so the canvas always shows one complete layout. An animation
//! loop driven by `requestAnimationFrame` eases highlights and redraws.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use leptos::html::Canvas;
use leptos::prelude::*;
use leptos::task::spawn_local;
use log::{debug, info, warn};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent};

use super::graph::{GroupBy, LayoutConfig, LayoutError, LayoutResult, LayoutScheduler, apply_layout};
use super::highlight::HighlightState;
use super::pipeline::VisibleGraph;
use super::render::{self, Scene};
use super::theme::Theme;
use super::viewport::Viewport;

/// Bundles the camera, animation state and the applied layout.
struct MapContext {
	viewport: Viewport,
	highlight: HighlightState,
	layout: LayoutResult,
	selected: Option<String>,
	theme: Theme,
}

enum Click {
	Element(String),
	Background,
}

/// View settings whose change lets the next layout reframe the camera.
pub type ViewKey = (Option<String>, GroupBy, bool);

/// Size of the canvas' container, `None` while it is hidden.
fn canvas_size(canvas: &HtmlCanvasElement) -> Option<(f64, f64)> {
	canvas
		.parent_element()
		.map(|parent| (parent.client_width() as f64, parent.client_height() as f64))
		.filter(|&(w, h)| w > 0.0 && h > 0.0)
}

fn pointer(canvas_ref: NodeRef<Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

/// Renders the visible graph and reports clicks.
///
/// `on_select` receives the id of a clicked node or group; `on_background`
/// fires for clicks on empty canvas. Drags pan, the wheel zooms.
#[component]
pub fn ResourceMapCanvas(
	#[prop(into)] visible: Signal<VisibleGraph>,
	/// Ids to emphasize, already mapped onto visible elements.
	#[prop(into)]
	highlights: Signal<BTreeSet<String>>,
	/// Edge ids to emphasize, already mapped onto visible edges.
	#[prop(into)]
	highlighted_edges: Signal<BTreeSet<String>>,
	#[prop(into)] selected: Signal<Option<String>>,
	#[prop(into)] view_key: Signal<ViewKey>,
	layout_config: LayoutConfig,
	#[prop(default = 50.0)] padding: f64,
	#[prop(into)] on_select: Callback<String>,
	#[prop(into)] on_background: Callback<()>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<Canvas>::new();
	let size = RwSignal::new((0.0_f64, 0.0_f64));
	let context: Rc<RefCell<Option<MapContext>>> = Rc::new(RefCell::new(None));
	let animate_init: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb_init: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let context_init = context.clone();

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};
		let ctx: CanvasRenderingContext2d = match canvas.get_context("2d") {
			Ok(Some(ctx)) => match ctx.dyn_into() {
				Ok(ctx) => ctx,
				Err(_) => return,
			},
			_ => {
				warn!("resource-map: canvas 2d context unavailable");
				return;
			}
		};

		let (w, h) = canvas_size(&canvas).unwrap_or((800.0, 600.0));
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let mut highlight = HighlightState::default();
		highlight.set_targets(&highlights.get_untracked());
		highlight.set_edge_targets(&highlighted_edges.get_untracked());
		*context_init.borrow_mut() = Some(MapContext {
			viewport: Viewport::new(w, h, padding),
			highlight,
			layout: LayoutResult::default(),
			selected: selected.get_untracked(),
			theme: Theme::default(),
		});
		size.set((w, h));

		let (context_resize, canvas_resize) = (context_init.clone(), canvas.clone());
		*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
			let Some((nw, nh)) = canvas_size(&canvas_resize) else {
				size.set((0.0, 0.0));
				return;
			};
			canvas_resize.set_width(nw as u32);
			canvas_resize.set_height(nh as u32);
			if let Some(ref mut c) = *context_resize.borrow_mut() {
				c.viewport.resize(nw, nh);
			}
			size.set((nw, nh));
		}));
		if let Some(ref cb) = *resize_cb_init.borrow() {
			let _ = window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
		}

		let (context_anim, animate_inner) = (context_init.clone(), animate_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			if let Some(ref mut c) = *context_anim.borrow_mut() {
				c.highlight.tick(0.016);
				let scene = Scene {
					layout: &c.layout,
					viewport: &c.viewport,
					highlight: &c.highlight,
					selected: c.selected.as_deref(),
				};
				render::render(&ctx, &scene, &c.theme);
			}
			if let (Some(cb), Some(window)) = (animate_inner.borrow().as_ref(), web_sys::window()) {
				let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let scheduler = LayoutScheduler::new();
	let context_layout = context.clone();
	Effect::new(move |_| {
		let graph = visible.with(|v| v.graph.clone());
		let (width, height) = size.get();
		if width <= 0.0 || height <= 0.0 {
			// Hidden canvas: nothing in flight may land on it.
			scheduler.cancel_all();
			return;
		}
		let ticket = scheduler.submit();
		let (context, config) = (context_layout.clone(), layout_config.clone());
		spawn_local(async move {
			let generation = ticket.generation();
			match apply_layout(graph, width / height, config, ticket.clone()).await {
				Ok(layout) if ticket.is_current() => {
					info!(
						"resource-map: layout {} placed {} elements",
						generation,
						layout.nodes.len()
					);
					if let Some(ref mut c) = *context.borrow_mut() {
						c.viewport.frame_layout(&layout.bounds);
						c.layout = layout;
					}
				}
				Ok(_) | Err(LayoutError::Superseded) => {
					debug!("resource-map: dropped stale layout {}", generation);
				}
				Err(err) => warn!("resource-map: layout failed, keeping previous: {}", err),
			}
		});
	});

	let context_hl = context.clone();
	Effect::new(move |_| {
		let targets = highlights.get();
		let edge_targets = highlighted_edges.get();
		let selected = selected.get();
		if let Some(ref mut c) = *context_hl.borrow_mut() {
			c.highlight.set_targets(&targets);
			c.highlight.set_edge_targets(&edge_targets);
			c.selected = selected;
		}
	});

	let context_key = context.clone();
	Effect::new(move |_| {
		view_key.track();
		if let Some(ref mut c) = *context_key.borrow_mut() {
			c.viewport.reset_moved();
		}
	});

	let context_md = context.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = pointer(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut c) = *context_md.borrow_mut() {
			c.viewport.begin_pan(x, y);
		}
	};

	let context_mm = context.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = pointer(canvas_ref, &ev) else {
			return;
		};
		let hovering = {
			let mut guard = context_mm.borrow_mut();
			let Some(c) = guard.as_mut() else {
				return;
			};
			c.viewport.pan_to(x, y);
			let (gx, gy) = c.viewport.screen_to_graph(x, y);
			let hovered = c.layout.node_at(gx, gy).map(|node| node.id.clone());
			c.highlight.set_hover(hovered.as_deref());
			hovered.is_some()
		};
		if let Some(canvas) = canvas_ref.get() {
			let canvas: HtmlCanvasElement = canvas.into();
			let _ = web_sys::HtmlElement::style(&canvas)
				.set_property("cursor", if hovering { "pointer" } else { "grab" });
		}
	};

	let context_mu = context.clone();
	let on_mouseup = move |ev: MouseEvent| {
		let Some((x, y)) = pointer(canvas_ref, &ev) else {
			return;
		};
		let click = {
			let mut guard = context_mu.borrow_mut();
			let Some(c) = guard.as_mut() else {
				return;
			};
			if !c.viewport.end_pan() {
				return;
			}
			let (gx, gy) = c.viewport.screen_to_graph(x, y);
			match c.layout.node_at(gx, gy) {
				Some(node) => Click::Element(node.id.clone()),
				None => Click::Background,
			}
		};
		match click {
			Click::Element(id) => on_select.run(id),
			Click::Background => on_background.run(()),
		}
	};

	let context_ml = context.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut c) = *context_ml.borrow_mut() {
			c.viewport.end_pan();
			c.highlight.set_hover(None);
		}
	};

	let context_wh = context.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = pointer(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut c) = *context_wh.borrow_mut() {
			c.viewport.zoom_at(x, y, ev.delta_y());
		}
	};

	let context_100 = context.clone();
	let zoom_to_100 = move |_| {
		if let Some(ref mut c) = *context_100.borrow_mut() {
			let bounds = c.layout.bounds;
			c.viewport.zoom_to_100(&bounds);
		}
	};

	let context_fit = context.clone();
	let zoom_to_fit = move |_| {
		if let Some(ref mut c) = *context_fit.borrow_mut() {
			let bounds = c.layout.bounds;
			c.viewport.zoom_to_fit(&bounds);
		}
	};

	view! {
		<div class="resource-map-canvas">
			<canvas
				node_ref=canvas_ref
				on:mousedown=on_mousedown
				on:mousemove=on_mousemove
				on:mouseup=on_mouseup
				on:mouseleave=on_mouseleave
				on:wheel=on_wheel
				style="display: block; cursor: grab;"
			/>
			<div class="zoom-controls">
				<button title="Zoom to 100%" on:click=zoom_to_100>"100%"</button>
				<button title="Zoom to fit" on:click=zoom_to_fit>"Fit"</button>
			</div>
		</div>
	}
}
