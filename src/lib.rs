//! resource-map: Interactive resource relationship map for cluster dashboards.
//!
//! This crate provides a WASM-based view that groups, filters and lays out
//! the resources of a cluster and the relationships between them, rendered
//! on a canvas with pan/zoom, selection and highlight effects.

use leptos::prelude::*;
use leptos_meta::*;
use log::{Level, info, warn};
use wasm_bindgen::JsCast;
use web_sys::{HtmlScriptElement, Window};

pub mod components;

pub use components::resource_map::{GraphData, GraphSource, MapConfig, ResourceMapView};

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("resource-map: logging initialized");
}

/// Text of the `<script>` element with the given id.
fn script_text(id: &str) -> Option<String> {
	let window: Window = web_sys::window()?;
	let document = window.document()?;
	let element = document.get_element_by_id(id)?;
	let script: HtmlScriptElement = element.dyn_into().ok()?;
	script.text().ok()
}

/// Load graph data from a script element with id="graph-data".
/// Expected format: JSON with { sources: [{ id, label, nodes, edges }] }
fn load_graph_data() -> Option<GraphData> {
	let json_text = script_text("graph-data")?;
	match GraphData::from_json(&json_text) {
		Ok(data) => Some(data),
		Err(e) => {
			warn!("resource-map: failed to parse graph data: {}", e);
			None
		}
	}
}

/// Load overrides from a script element with id="resource-map-config".
fn load_config() -> MapConfig {
	let Some(json_text) = script_text("resource-map-config") else {
		return MapConfig::default();
	};
	MapConfig::from_json(&json_text).unwrap_or_else(|e| {
		warn!("resource-map: failed to parse config, using defaults: {}", e);
		MapConfig::default()
	})
}

/// Main application component.
/// Loads graph data and configuration from the DOM and renders the map.
#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();

	let graph_data = load_graph_data().unwrap_or_default();
	let graph_signal = Signal::derive(move || graph_data.clone());
	let config = load_config();

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="dark" />
		<Title text="Resource Map" />
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<div class="fullscreen-map">
			<ResourceMapView data=graph_signal config=config />
			<div class="map-overlay">
				<h1>"Resources"</h1>
				<p class="subtitle">"Click to select. Click the background to step out. Scroll to zoom, drag to pan."</p>
			</div>
		</div>
	}
}
