//! Navigable view state: selection and grouping persisted in the page URL.
//!
//! Reading a link restores the selected resource and grouping; every change
//! is written back with `history.replaceState`, so reloads and shared links
//! land on the same view without adding history entries.

use std::collections::BTreeMap;

use log::warn;
use thiserror::Error;

use super::graph::{GroupBy, ParseGroupByError, ROOT_ID};

/// Query key holding the selected node id.
pub const NODE_KEY: &str = "node";
/// Query key holding the group-by mode.
pub const GROUP_KEY: &str = "group";

/// Failures reading or writing view state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViewStateError {
	/// The stored grouping is not a known mode.
	#[error(transparent)]
	GroupBy(#[from] ParseGroupByError),
	/// No page URL or history to work with.
	#[error("view state unavailable: {0}")]
	Unavailable(String),
}

/// String key/value storage for view state.
pub trait ViewStateStore {
	/// Value stored under `key`.
	fn get(&self, key: &str) -> Option<String>;

	/// Stores `value` under `key`, or removes the key for `None`.
	fn set(&mut self, key: &str, value: Option<&str>) -> Result<(), ViewStateError>;
}

/// In-memory store.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
	values: BTreeMap<String, String>,
}

impl ViewStateStore for MemoryStore {
	fn get(&self, key: &str) -> Option<String> {
		self.values.get(key).cloned()
	}

	fn set(&mut self, key: &str, value: Option<&str>) -> Result<(), ViewStateError> {
		match value {
			Some(value) => self.values.insert(key.to_string(), value.to_string()),
			None => self.values.remove(key),
		};
		Ok(())
	}
}

/// Store backed by the query string of the current page.
#[derive(Clone, Copy, Debug, Default)]
pub struct QueryParamsStore;

impl QueryParamsStore {
	fn current_url() -> Result<web_sys::Url, ViewStateError> {
		let window = web_sys::window().ok_or_else(|| unavailable("no window"))?;
		let href = window.location().href().map_err(|_| unavailable("no location"))?;
		web_sys::Url::new(&href).map_err(|_| unavailable("malformed location"))
	}
}

fn unavailable(reason: &str) -> ViewStateError {
	ViewStateError::Unavailable(reason.to_string())
}

impl ViewStateStore for QueryParamsStore {
	fn get(&self, key: &str) -> Option<String> {
		Self::current_url().ok()?.search_params().get(key)
	}

	fn set(&mut self, key: &str, value: Option<&str>) -> Result<(), ViewStateError> {
		let url = Self::current_url()?;
		// Live view of the URL's query; edits update `url`.
		let params = url.search_params();
		if params.get(key).as_deref() == value {
			return Ok(());
		}
		match value {
			Some(value) => params.set(key, value),
			None => params.delete(key),
		}

		let history = web_sys::window()
			.ok_or_else(|| unavailable("no window"))?
			.history()
			.map_err(|_| unavailable("no history"))?;
		history
			.replace_state_with_url(&wasm_bindgen::JsValue::NULL, "", Some(&url.href()))
			.map_err(|_| unavailable("replaceState rejected"))
	}
}

/// Selected node id, `None` when absent or set to the root.
pub fn read_selection(store: &impl ViewStateStore) -> Option<String> {
	store
		.get(NODE_KEY)
		.filter(|id| !id.is_empty() && id != ROOT_ID)
}

/// Stores the selected id. No selection removes the key.
pub fn write_selection(store: &mut impl ViewStateStore, selected: Option<&str>) {
	let selected = selected.filter(|&id| id != ROOT_ID);
	if let Err(err) = store.set(NODE_KEY, selected) {
		warn!("resource-map: failed to persist selection: {}", err);
	}
}

/// Grouping from the store; an absent key means `default`.
pub fn read_group_by(store: &impl ViewStateStore, default: GroupBy) -> Result<GroupBy, ViewStateError> {
	match store.get(GROUP_KEY) {
		Some(value) => Ok(value.parse()?),
		None => Ok(default),
	}
}

/// Stores `group_by`, leaving the key out while it equals `default` so
/// links do not pin the default grouping.
pub fn write_group_by(store: &mut impl ViewStateStore, group_by: GroupBy, default: GroupBy) {
	let value = (group_by != default).then(|| group_by.as_str());
	if let Err(err) = store.set(GROUP_KEY, value) {
		warn!("resource-map: failed to persist grouping: {}", err);
	}
}
