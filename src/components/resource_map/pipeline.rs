//! Wiring of the pure graph stages into the snapshots the view consumes.
//!
//! Work is split at the point where the selection enters: [`build_full`]
//! depends only on data, filters and grouping, while [`build_visible`]
//! re-collapses the full graph for each selection. Both results share their
//! graphs through `Arc` and compare by content, so reactive memos skip
//! downstream work (and relayout) when a recomputation yields the same graph.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use super::graph::{
	FlatGraph, GraphEdge, GraphFilter, GraphLookup, GraphNode, GroupBy, HierarchicalGraph,
	collapse_graph, filter_graph, get_graph_size, group_graph,
};

/// Filter chips toggled in the toolbar.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterToggles {
	/// Keep only resources with warnings or errors.
	pub has_errors: bool,
	/// Selected namespaces; empty means all.
	pub namespaces: BTreeSet<String>,
	/// Selected kinds; empty means all.
	pub kinds: BTreeSet<String>,
}

impl FilterToggles {
	/// Active filters: the caller's defaults followed by the toggled ones.
	pub fn filters(&self, defaults: &[GraphFilter]) -> Vec<GraphFilter> {
		let mut filters = defaults.to_vec();
		if self.has_errors {
			filters.push(GraphFilter::HasErrors);
		}
		if !self.namespaces.is_empty() {
			filters.push(GraphFilter::Namespace(self.namespaces.clone()));
		}
		if !self.kinds.is_empty() {
			filters.push(GraphFilter::Kind(self.kinds.clone()));
		}
		filters
	}

	/// Grouping by namespace is pointless with a single namespace selected.
	pub fn namespace_grouping_available(&self) -> bool {
		self.namespaces.len() != 1
	}

	/// Adds `namespace` to the filter, or removes it if present.
	pub fn toggle_namespace(&mut self, namespace: &str) {
		if !self.namespaces.remove(namespace) {
			self.namespaces.insert(namespace.to_string());
		}
	}

	/// Adds `kind` to the filter, or removes it if present.
	pub fn toggle_kind(&mut self, kind: &str) {
		if !self.kinds.remove(kind) {
			self.kinds.insert(kind.to_string());
		}
	}
}

/// Grouping actually applied: namespace grouping falls back to none while
/// it is unavailable.
pub fn effective_group_by(group_by: GroupBy, toggles: &FilterToggles) -> GroupBy {
	if group_by == GroupBy::Namespace && !toggles.namespace_grouping_available() {
		GroupBy::None
	} else {
		group_by
	}
}

/// Whether the expand-all toggle is offered for a visible graph this size.
pub fn expand_all_offered(visible_size: usize, threshold: usize) -> bool {
	visible_size < threshold
}

/// Whether an active expand-all may stay on; it is forced off once the
/// expanded graph grows past `threshold`.
pub fn keep_expand_all(expand_all: bool, visible_size: usize, threshold: usize) -> bool {
	expand_all && visible_size <= threshold
}

/// Distinct namespaces among the resources, for the namespace filter.
pub fn namespaces_in(nodes: &[GraphNode]) -> BTreeSet<String> {
	nodes
		.iter()
		.filter_map(GraphNode::namespace)
		.map(str::to_string)
		.collect()
}

/// Distinct kinds among the resources, for the kind filter.
pub fn kinds_in(nodes: &[GraphNode]) -> BTreeSet<String> {
	nodes
		.iter()
		.filter_map(GraphNode::as_object)
		.map(|object| object.kind.clone())
		.collect()
}

/// The filtered, grouped graph before any collapsing.
#[derive(Clone, Debug, Default)]
pub struct FullGraph {
	/// Filtered, ungrouped nodes and edges.
	pub filtered: Arc<FlatGraph>,
	/// Every group fully expanded.
	pub graph: Arc<HierarchicalGraph>,
	/// Index over every node of `graph` and every raw or promoted edge.
	pub lookup: Arc<GraphLookup>,
}

impl PartialEq for FullGraph {
	fn eq(&self, other: &Self) -> bool {
		// The lookup is derived from the other two.
		self.filtered == other.filtered && self.graph == other.graph
	}
}

/// Filters and groups the merged source data.
pub fn build_full(
	nodes: &[GraphNode],
	edges: &[GraphEdge],
	filters: &[GraphFilter],
	group_by: GroupBy,
) -> FullGraph {
	let filtered = filter_graph(nodes, edges, filters);
	let graph = group_graph(&filtered.nodes, &filtered.edges, group_by);

	let mut seen: HashSet<&str> = HashSet::new();
	let lookup_edges: Vec<GraphEdge> = filtered
		.edges
		.iter()
		.chain(graph.all_edges())
		.filter(|edge| seen.insert(edge.id.as_str()))
		.cloned()
		.collect();
	let lookup = GraphLookup::build(graph.nodes().cloned(), lookup_edges);

	FullGraph {
		filtered: Arc::new(filtered),
		graph: Arc::new(graph),
		lookup: Arc::new(lookup),
	}
}

/// The collapsed graph actually laid out and drawn.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VisibleGraph {
	/// Collapsed hierarchy.
	pub graph: Arc<HierarchicalGraph>,
	/// Nodes plus edges, compared against the expand-all threshold.
	pub size: usize,
}

/// Collapses `full` around `selected`, or expands everything.
pub fn build_visible(full: &FullGraph, selected: Option<&str>, expand_all: bool) -> VisibleGraph {
	let graph = collapse_graph(&full.graph, selected, expand_all);
	VisibleGraph {
		size: get_graph_size(&graph),
		graph: Arc::new(graph),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::resource_map::graph::{NodeStatus, ObjectNode};

	fn fixture() -> (Vec<GraphNode>, Vec<GraphEdge>) {
		let mut nodes = Vec::new();
		for (ns, count) in [("shop", 4), ("data", 2)] {
			for i in 0..count {
				let id = format!("{ns}-{i}");
				let mut object = ObjectNode::new(&id, "Pod", &id).with_namespace(ns);
				if i == 0 {
					object = object.with_status(NodeStatus::Warning);
				}
				nodes.push(GraphNode::from(object));
			}
		}
		nodes.push(GraphNode::from(ObjectNode::new("worker", "Node", "worker")));
		let edges = vec![
			GraphEdge::new("s0-s1", "shop-0", "shop-1", "owner"),
			GraphEdge::new("s0-d0", "shop-0", "data-0", "network"),
		];
		(nodes, edges)
	}

	#[test]
	fn toggles_assemble_filters_after_defaults() {
		let mut toggles = FilterToggles {
			has_errors: true,
			..Default::default()
		};
		toggles.toggle_namespace("shop");
		let defaults = [GraphFilter::Kind(["Pod".to_string()].into())];

		let filters = toggles.filters(&defaults);
		assert_eq!(filters.len(), 3);
		assert_eq!(filters[0], defaults[0]);
		assert_eq!(filters[1], GraphFilter::HasErrors);
		assert!(FilterToggles::default().filters(&[]).is_empty());
	}

	#[test]
	fn single_namespace_disables_namespace_grouping() {
		let mut toggles = FilterToggles::default();
		assert_eq!(effective_group_by(GroupBy::Namespace, &toggles), GroupBy::Namespace);

		toggles.toggle_namespace("shop");
		assert!(!toggles.namespace_grouping_available());
		assert_eq!(effective_group_by(GroupBy::Namespace, &toggles), GroupBy::None);
		assert_eq!(effective_group_by(GroupBy::Node, &toggles), GroupBy::Node);

		toggles.toggle_namespace("data");
		assert!(toggles.namespace_grouping_available());
	}

	#[test]
	fn visible_graph_collapses_by_default() {
		let (nodes, edges) = fixture();
		let full = build_full(&nodes, &edges, &[], GroupBy::Namespace);
		assert_eq!(build_visible(&full, None, false).size, 3);
		assert_eq!(full.graph.len(), nodes.len() + 2);
	}

	#[test]
	fn selection_and_expand_all_grow_the_visible_graph() {
		let (nodes, edges) = fixture();
		let full = build_full(&nodes, &edges, &[], GroupBy::Namespace);
		assert_eq!(build_visible(&full, Some("data-1"), false).size, 5);
		assert_eq!(build_visible(&full, None, true).size, nodes.len() + 2);
	}

	#[test]
	fn lookup_covers_raw_and_promoted_edges() {
		let (nodes, edges) = fixture();
		let full = build_full(&nodes, &edges, &[], GroupBy::Namespace);
		assert_eq!(
			full.lookup.neighbors("shop-0").into_iter().collect::<Vec<_>>(),
			vec!["data-0", "shop-1"]
		);
		assert_eq!(
			full.lookup.neighbors("namespace/shop").into_iter().collect::<Vec<_>>(),
			vec!["namespace/data"]
		);
		assert_eq!(full.lookup.edge_count(), 3);
	}

	#[test]
	fn filters_apply_before_grouping() {
		let (nodes, edges) = fixture();
		let filters = [GraphFilter::HasErrors];
		let full = build_full(&nodes, &edges, &filters, GroupBy::Namespace);
		assert_eq!(full.filtered.nodes.len(), 2);
		assert!(full.filtered.edges.iter().all(|e| e.id == "s0-d0"));
		assert_eq!(full.graph.root().edges.len(), 1);
	}

	#[test]
	fn identical_inputs_give_equal_graphs() {
		let (nodes, edges) = fixture();
		let first = build_full(&nodes, &edges, &[], GroupBy::Namespace);
		let second = build_full(&nodes, &edges, &[], GroupBy::Namespace);
		assert_eq!(first, second);
		assert_eq!(
			build_visible(&first, Some("shop-2"), false),
			build_visible(&second, Some("shop-2"), false)
		);
	}

	#[test]
	fn kind_toggle_adds_a_kind_filter() {
		let (nodes, edges) = fixture();
		assert_eq!(kinds_in(&nodes).into_iter().collect::<Vec<_>>(), vec!["Node", "Pod"]);

		let mut toggles = FilterToggles::default();
		toggles.toggle_kind("Node");
		let full = build_full(&nodes, &edges, &toggles.filters(&[]), GroupBy::Namespace);
		assert_eq!(full.filtered.nodes.len(), 1);

		toggles.toggle_kind("Node");
		assert!(toggles.filters(&[]).is_empty());
	}

	#[test]
	fn expand_all_gate_follows_threshold() {
		assert!(expand_all_offered(49, 50));
		assert!(!expand_all_offered(50, 50));
		assert!(keep_expand_all(true, 50, 50));
		assert!(!keep_expand_all(true, 51, 50));
		assert!(!keep_expand_all(false, 1, 50));
	}

	#[test]
	fn lists_namespaces() {
		let (nodes, _) = fixture();
		let namespaces: Vec<String> = namespaces_in(&nodes).into_iter().collect();
		assert_eq!(namespaces, vec!["data", "shop"]);
	}
}
