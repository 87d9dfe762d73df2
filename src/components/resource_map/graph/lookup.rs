//! Constant-time indexes over a fixed node/edge snapshot.

use std::collections::{BTreeSet, HashMap};

use log::warn;

use super::model::{GraphEdge, GraphNode};

/// Read-only index of nodes by id and edges by endpoint.
///
/// Built once per snapshot and never mutated. Edges whose source or target
/// is not among the nodes are left out of every index.
#[derive(Clone, Debug, Default)]
pub struct GraphLookup {
	nodes: Vec<GraphNode>,
	edges: Vec<GraphEdge>,
	node_index: HashMap<String, usize>,
	outgoing: HashMap<String, Vec<usize>>,
	incoming: HashMap<String, Vec<usize>>,
}

impl GraphLookup {
	/// Indexes `nodes` and every edge between two of them.
	pub fn build(
		nodes: impl IntoIterator<Item = GraphNode>,
		edges: impl IntoIterator<Item = GraphEdge>,
	) -> Self {
		let mut lookup = Self::default();

		for node in nodes {
			if lookup.node_index.contains_key(node.id()) {
				warn!("resource-map: duplicate node id {} in lookup", node.id());
				continue;
			}
			let id = node.id().to_string();
			lookup.outgoing.insert(id.clone(), Vec::new());
			lookup.incoming.insert(id.clone(), Vec::new());
			lookup.node_index.insert(id, lookup.nodes.len());
			lookup.nodes.push(node);
		}

		for edge in edges {
			if !lookup.node_index.contains_key(&edge.source)
				|| !lookup.node_index.contains_key(&edge.target)
			{
				warn!(
					"resource-map: edge {} references a missing node, skipping",
					edge.id
				);
				continue;
			}
			let position = lookup.edges.len();
			if let Some(list) = lookup.outgoing.get_mut(&edge.source) {
				list.push(position);
			}
			if let Some(list) = lookup.incoming.get_mut(&edge.target) {
				list.push(position);
			}
			lookup.edges.push(edge);
		}

		lookup
	}

	/// Looks up a node by id.
	pub fn node(&self, id: &str) -> Option<&GraphNode> {
		self.node_index.get(id).map(|&i| &self.nodes[i])
	}

	/// Edges leaving `id` in input order, or `None` if `id` is unknown.
	pub fn outgoing_edges(&self, id: &str) -> Option<Vec<&GraphEdge>> {
		self.outgoing
			.get(id)
			.map(|list| list.iter().map(|&i| &self.edges[i]).collect())
	}

	/// Edges arriving at `id` in input order, or `None` if `id` is unknown.
	pub fn incoming_edges(&self, id: &str) -> Option<Vec<&GraphEdge>> {
		self.incoming
			.get(id)
			.map(|list| list.iter().map(|&i| &self.edges[i]).collect())
	}

	/// Ids directly connected to `id` in either direction, excluding `id`.
	pub fn neighbors(&self, id: &str) -> BTreeSet<&str> {
		let outgoing = self.outgoing_edges(id).unwrap_or_default();
		let incoming = self.incoming_edges(id).unwrap_or_default();
		outgoing
			.into_iter()
			.map(|edge| edge.target.as_str())
			.chain(incoming.into_iter().map(|edge| edge.source.as_str()))
			.filter(|&other| other != id)
			.collect()
	}

	/// Number of indexed nodes.
	pub fn node_count(&self) -> usize {
		self.nodes.len()
	}

	/// Number of indexed edges. Dangling edges are not counted.
	pub fn edge_count(&self) -> usize {
		self.edges.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::resource_map::graph::model::ObjectNode;

	fn fixture() -> GraphLookup {
		let nodes = ["1", "2", "3"]
			.into_iter()
			.map(|id| GraphNode::from(ObjectNode::new(id, "Pod", id)));
		let edges = vec![
			GraphEdge::new("e1", "1", "2", "typeA"),
			GraphEdge::new("e2", "2", "3", "typeB"),
			GraphEdge::new("e3", "1", "3", "typeC"),
		];
		GraphLookup::build(nodes, edges)
	}

	fn ids(edges: Option<Vec<&GraphEdge>>) -> Option<Vec<&str>> {
		edges.map(|list| list.into_iter().map(|e| e.id.as_str()).collect())
	}

	#[test]
	fn outgoing_edges_keep_input_order() {
		let lookup = fixture();
		assert_eq!(ids(lookup.outgoing_edges("1")), Some(vec!["e1", "e3"]));
		let first = &lookup.outgoing_edges("1").unwrap()[0];
		assert_eq!(first.edge_type, "typeA");
		assert_eq!(first.target, "2");
	}

	#[test]
	fn incoming_edges_keep_input_order() {
		let lookup = fixture();
		assert_eq!(ids(lookup.incoming_edges("3")), Some(vec!["e2", "e3"]));
	}

	#[test]
	fn finds_nodes_by_id() {
		let lookup = fixture();
		assert_eq!(lookup.node("2").map(GraphNode::id), Some("2"));
		assert!(lookup.node("non-existent").is_none());
	}

	#[test]
	fn unknown_node_differs_from_node_without_edges() {
		let lookup = fixture();
		assert_eq!(lookup.outgoing_edges("non-existent"), None);
		assert_eq!(lookup.incoming_edges("non-existent"), None);
		assert_eq!(ids(lookup.outgoing_edges("3")), Some(vec![]));
		assert_eq!(ids(lookup.incoming_edges("1")), Some(vec![]));
	}

	#[test]
	fn self_loops_are_both_incoming_and_outgoing() {
		let lookup = GraphLookup::build(
			vec![GraphNode::from(ObjectNode::new("a", "Pod", "a"))],
			vec![GraphEdge::new("loop", "a", "a", "network")],
		);
		assert_eq!(ids(lookup.outgoing_edges("a")), Some(vec!["loop"]));
		assert_eq!(ids(lookup.incoming_edges("a")), Some(vec!["loop"]));
		assert!(lookup.neighbors("a").is_empty());
	}

	#[test]
	fn skips_edges_to_missing_nodes() {
		let lookup = GraphLookup::build(
			vec![GraphNode::from(ObjectNode::new("a", "Pod", "a"))],
			vec![GraphEdge::new("dangling", "a", "gone", "owner")],
		);
		assert_eq!(lookup.edge_count(), 0);
		assert_eq!(ids(lookup.outgoing_edges("a")), Some(vec![]));
	}

	#[test]
	fn neighbors_cover_both_directions() {
		let lookup = fixture();
		let neighbors: Vec<&str> = lookup.neighbors("2").into_iter().collect();
		assert_eq!(neighbors, vec!["1", "3"]);
	}
}
