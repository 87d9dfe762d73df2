//! Graph sources and the payload they arrive in.
//!
//! Each source contributes the resources and relationships of one kind of
//! object (workloads, networking, storage, ...). The view unions whichever
//! sources the user has enabled before filtering.

use std::collections::{BTreeSet, HashSet};

use log::{info, warn};
use serde::Deserialize;

use super::graph::{FlatGraph, GraphEdge, GraphNode, ObjectNode};

/// Resources and relationships supplied by one source adapter.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct GraphSource {
	/// Stable source id, used by the source toggles.
	pub id: String,
	/// Name shown on the source chip.
	pub label: String,
	/// Resources reported by the source.
	#[serde(default)]
	pub nodes: Vec<ObjectNode>,
	/// Relationships between resources of this or other sources.
	#[serde(default)]
	pub edges: Vec<GraphEdge>,
}

/// The graph payload embedded in the host page.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct GraphData {
	/// Sources in priority order.
	pub sources: Vec<GraphSource>,
}

impl GraphData {
	/// Parses the payload, failing on malformed JSON or missing fields.
	pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
		let data: GraphData = serde_json::from_str(json)?;
		info!(
			"resource-map: loaded {} sources, {} resources",
			data.sources.len(),
			data.sources.iter().map(|s| s.nodes.len()).sum::<usize>()
		);
		Ok(data)
	}
}

/// Which sources contribute to the graph. All sources start enabled.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceSelection {
	disabled: BTreeSet<String>,
}

impl SourceSelection {
	/// True unless the source was switched off.
	pub fn is_selected(&self, source_id: &str) -> bool {
		!self.disabled.contains(source_id)
	}

	/// Switches a source off, or back on.
	pub fn toggle(&mut self, source_id: &str) {
		if !self.disabled.remove(source_id) {
			self.disabled.insert(source_id.to_string());
		}
	}
}

/// Unions the enabled sources into one flat graph.
///
/// The first occurrence of a node id or edge id wins; later duplicates are
/// dropped with a warning.
pub fn merge_sources(sources: &[GraphSource], selection: &SourceSelection) -> FlatGraph {
	let mut node_ids: HashSet<&str> = HashSet::new();
	let mut edge_ids: HashSet<&str> = HashSet::new();
	let mut graph = FlatGraph::default();

	for source in sources.iter().filter(|s| selection.is_selected(&s.id)) {
		for node in &source.nodes {
			if node_ids.insert(&node.id) {
				graph.nodes.push(GraphNode::from(node.clone()));
			} else {
				warn!("resource-map: source {} repeats resource {}", source.id, node.id);
			}
		}
		for edge in &source.edges {
			if edge_ids.insert(&edge.id) {
				graph.edges.push(edge.clone());
			}
		}
	}
	graph
}
