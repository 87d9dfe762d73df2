//! Runtime configuration for the resource map.
//!
//! Every field has a default, so the host page only needs to embed the
//! values it wants to change:
//!
//! ```json
//! { "expand_all_threshold": 80, "layout": { "spacing": 32 } }
//! ```

use serde::Deserialize;

use super::graph::{GroupBy, LayoutConfig};

/// Tunables for the resource map view.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct MapConfig {
	/// Expand-all is only offered while the visible graph is smaller than this.
	pub expand_all_threshold: usize,
	/// Grouping used when the view state carries no `group` key.
	#[serde(deserialize_with = "group_by_from_str")]
	pub default_group_by: GroupBy,
	/// Selection restored when the details panel closes outside any group.
	pub default_selection: Option<String>,
	/// Namespaces preselected in the namespace filter.
	pub default_namespaces: Vec<String>,
	/// Screen margin (px) kept around the graph when framing it.
	pub viewport_padding: f64,
	/// Maximum number of search results shown.
	pub search_limit: usize,
	/// Node geometry and simulation forces.
	pub layout: LayoutConfig,
}

impl Default for MapConfig {
	fn default() -> Self {
		Self {
			expand_all_threshold: 50,
			default_group_by: GroupBy::Namespace,
			default_selection: None,
			default_namespaces: Vec::new(),
			viewport_padding: 50.0,
			search_limit: 20,
			layout: LayoutConfig::default(),
		}
	}
}

impl MapConfig {
	/// Parses a JSON payload, falling back to defaults for missing keys.
	pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(json)
	}
}

fn group_by_from_str<'de, D>(deserializer: D) -> Result<GroupBy, D::Error>
where
	D: serde::Deserializer<'de>,
{
	let raw = String::deserialize(deserializer)?;
	raw.parse().map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_payload_uses_defaults() {
		let config = MapConfig::from_json("{}").unwrap();
		assert_eq!(config, MapConfig::default());
		assert_eq!(config.expand_all_threshold, 50);
		assert_eq!(config.default_group_by, GroupBy::Namespace);
	}

	#[test]
	fn partial_payload_overrides_selected_fields() {
		let config = MapConfig::from_json(
			r#"{ "default_group_by": "node", "layout": { "spacing": 40 } }"#,
		)
		.unwrap();
		assert_eq!(config.default_group_by, GroupBy::Node);
		assert_eq!(config.layout.spacing, 40.0);
		assert_eq!(config.layout.node_width, LayoutConfig::default().node_width);
	}

	#[test]
	fn rejects_unknown_group_by() {
		assert!(MapConfig::from_json(r#"{ "default_group_by": "cluster" }"#).is_err());
	}
}
