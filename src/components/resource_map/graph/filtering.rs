//! Predicate filters over a flat node/edge set.

use std::collections::{BTreeSet, HashSet};

use super::model::{FlatGraph, GraphEdge, GraphNode};

/// A single node predicate. Active filters combine with AND semantics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GraphFilter {
	/// Keep resources reporting a warning or an error.
	HasErrors,
	/// Keep resources in one of these namespaces. Cluster-scoped resources
	/// have no namespace and never match.
	Namespace(BTreeSet<String>),
	/// Keep resources of one of these kinds.
	Kind(BTreeSet<String>),
}

impl GraphFilter {
	/// Group nodes are not subject to resource predicates and always pass.
	pub fn matches(&self, node: &GraphNode) -> bool {
		let GraphNode::Object(object) = node else {
			return true;
		};
		match self {
			GraphFilter::HasErrors => object.status.is_problem(),
			GraphFilter::Namespace(namespaces) => object
				.namespace
				.as_ref()
				.is_some_and(|ns| namespaces.contains(ns)),
			GraphFilter::Kind(kinds) => kinds.contains(&object.kind),
		}
	}
}

/// Removes nodes failing any filter, then every edge touching a removed node.
///
/// Surviving nodes and edges keep their relative order. With no filters the
/// input is returned unchanged.
pub fn filter_graph(nodes: &[GraphNode], edges: &[GraphEdge], filters: &[GraphFilter]) -> FlatGraph {
	if filters.is_empty() {
		return FlatGraph {
			nodes: nodes.to_vec(),
			edges: edges.to_vec(),
		};
	}

	let nodes: Vec<GraphNode> = nodes
		.iter()
		.filter(|node| filters.iter().all(|filter| filter.matches(node)))
		.cloned()
		.collect();
	let surviving: HashSet<&str> = nodes.iter().map(GraphNode::id).collect();
	let edges = edges
		.iter()
		.filter(|edge| {
			surviving.contains(edge.source.as_str()) && surviving.contains(edge.target.as_str())
		})
		.cloned()
		.collect();

	FlatGraph { nodes, edges }
}
