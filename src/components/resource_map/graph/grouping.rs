//! Grouping resources into a hierarchy and collapsing it for display.
//!
//! [`group_graph`] partitions resources by namespace, owning instance or
//! hosting node and re-homes every edge to the level where both of its
//! endpoints are visible siblings. [`collapse_graph`] then hides the
//! contents of groups unrelated to the current selection.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use log::warn;
use thiserror::Error;

use super::model::{GraphEdge, GraphNode, GroupKind, GroupNode, HierarchicalGraph, ROOT_ID};

/// The attribute resources are grouped by.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum GroupBy {
	/// Every resource at the top level.
	#[default]
	None,
	/// Namespace groups, with instance groups nested inside.
	Namespace,
	/// Application instance groups.
	Instance,
	/// The cluster node hosting each resource.
	Node,
}

impl GroupBy {
	/// Lowercase name, as stored in the URL.
	pub fn as_str(self) -> &'static str {
		match self {
			GroupBy::None => "none",
			GroupBy::Namespace => "namespace",
			GroupBy::Instance => "instance",
			GroupBy::Node => "node",
		}
	}
}

impl fmt::Display for GroupBy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A group-by value that is not one of `none|namespace|instance|node`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown group-by value {0:?}")]
pub struct ParseGroupByError(
	/// The rejected input.
	pub String,
);

impl FromStr for GroupBy {
	type Err = ParseGroupByError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"none" | "" => Ok(GroupBy::None),
			"namespace" => Ok(GroupBy::Namespace),
			"instance" => Ok(GroupBy::Instance),
			"node" => Ok(GroupBy::Node),
			other => Err(ParseGroupByError(other.to_string())),
		}
	}
}

#[derive(Debug)]
struct Draft {
	kind: GroupKind,
	label: String,
	/// Nested groups keyed by label so they come out sorted.
	sub_groups: BTreeMap<String, String>,
	members: Vec<String>,
}

impl Draft {
	fn new(kind: GroupKind, label: impl Into<String>) -> Self {
		Self {
			kind,
			label: label.into(),
			sub_groups: BTreeMap::new(),
			members: Vec::new(),
		}
	}
}

/// Collects group drafts and the parent of every placed id.
struct Hierarchy {
	drafts: HashMap<String, Draft>,
	parents: HashMap<String, String>,
}

impl Hierarchy {
	fn new() -> Self {
		let mut drafts = HashMap::new();
		drafts.insert(
			ROOT_ID.to_string(),
			Draft::new(GroupKind::Root, GroupKind::Root.label()),
		);
		Self {
			drafts,
			parents: HashMap::new(),
		}
	}

	/// Returns the id of the group, creating it under `parent` if needed.
	fn ensure_group(&mut self, parent: &str, id: String, kind: GroupKind, label: &str) -> String {
		if !self.drafts.contains_key(&id) {
			self.drafts.insert(id.clone(), Draft::new(kind, label));
			self.parents.insert(id.clone(), parent.to_string());
			if let Some(draft) = self.drafts.get_mut(parent) {
				draft.sub_groups.insert(label.to_string(), id.clone());
			}
		}
		id
	}

	fn place(&mut self, group: &str, id: &str) {
		if let Some(draft) = self.drafts.get_mut(group) {
			draft.members.push(id.to_string());
			self.parents.insert(id.to_string(), group.to_string());
		}
	}

	/// Ids from the root down to and including `id`.
	fn path<'a>(&'a self, id: &'a str) -> Vec<&'a str> {
		let mut path = vec![id];
		let mut current = id;
		while let Some(parent) = self.parents.get(current).map(String::as_str) {
			path.push(parent);
			current = parent;
		}
		if current != ROOT_ID {
			path.push(ROOT_ID);
		}
		path.reverse();
		path
	}

	/// Lowest common group of both endpoints and the endpoints promoted to
	/// be direct children of it.
	fn rehome<'a>(&'a self, source: &'a str, target: &'a str) -> (&'a str, &'a str, &'a str) {
		let source_path = self.path(source);
		let target_path = self.path(target);
		let common = source_path
			.iter()
			.zip(&target_path)
			.take_while(|(a, b)| a == b)
			.count();
		let lca = common
			.min(source_path.len() - 1)
			.min(target_path.len() - 1)
			.saturating_sub(1);
		(source_path[lca], source_path[lca + 1], target_path[lca + 1])
	}
}

/// Groups resources into a hierarchy under the root group.
///
/// Resources lacking the grouping attribute stay at the top level. Groups
/// exist only for keys that occur. Edges with an unknown endpoint are
/// dropped. An edge crossing group boundaries is promoted to connect the
/// outermost distinct ancestors of its endpoints; promoted edges collapse
/// into one per (source, target, type).
pub fn group_graph(nodes: &[GraphNode], edges: &[GraphEdge], group_by: GroupBy) -> HierarchicalGraph {
	let mut hierarchy = Hierarchy::new();
	let mut by_id: HashMap<&str, &GraphNode> = HashMap::with_capacity(nodes.len());

	for node in nodes {
		let id = node.id();
		if id == ROOT_ID || by_id.contains_key(id) {
			warn!("resource-map: ignoring duplicate resource {}", id);
			continue;
		}
		by_id.insert(id, node);

		let GraphNode::Object(object) = node else {
			hierarchy.place(ROOT_ID, id);
			continue;
		};
		let group = match group_by {
			GroupBy::None => ROOT_ID.to_string(),
			GroupBy::Namespace => match (&object.namespace, &object.instance) {
				(Some(ns), instance) => {
					let ns_group = hierarchy.ensure_group(
						ROOT_ID,
						format!("namespace/{ns}"),
						GroupKind::Namespace,
						ns,
					);
					match instance {
						Some(inst) => hierarchy.ensure_group(
							&ns_group,
							format!("instance/{ns}/{inst}"),
							GroupKind::Instance,
							inst,
						),
						None => ns_group,
					}
				}
				(None, _) => ROOT_ID.to_string(),
			},
			GroupBy::Instance => match &object.instance {
				Some(inst) => hierarchy.ensure_group(
					ROOT_ID,
					format!("instance/{inst}"),
					GroupKind::Instance,
					inst,
				),
				None => ROOT_ID.to_string(),
			},
			GroupBy::Node => match &object.host {
				Some(host) => {
					hierarchy.ensure_group(ROOT_ID, format!("node/{host}"), GroupKind::Node, host)
				}
				None => ROOT_ID.to_string(),
			},
		};
		hierarchy.place(&group, id);
	}

	let mut group_edges: HashMap<String, Vec<GraphEdge>> = HashMap::new();
	let mut seen_edges: HashSet<String> = HashSet::new();
	for edge in edges {
		if !by_id.contains_key(edge.source.as_str()) || !by_id.contains_key(edge.target.as_str()) {
			warn!(
				"resource-map: dropping edge {} with a missing endpoint ({} -> {})",
				edge.id, edge.source, edge.target
			);
			continue;
		}
		let (level, source, target) = hierarchy.rehome(&edge.source, &edge.target);
		let rehomed = if source == edge.source && target == edge.target {
			edge.clone()
		} else {
			GraphEdge::new(
				format!("{source}->{target}:{}", edge.edge_type),
				source,
				target,
				edge.edge_type.clone(),
			)
		};
		if seen_edges.insert(rehomed.id.clone()) {
			group_edges.entry(level.to_string()).or_default().push(rehomed);
		}
	}

	let mut out = Vec::with_capacity(nodes.len() + hierarchy.drafts.len());
	let root = finish_group(ROOT_ID, &hierarchy, &by_id, &mut group_edges, &mut out);
	HierarchicalGraph::new(root, out)
}

/// Materializes a draft and its subtree, aggregating status bottom-up.
fn finish_group(
	id: &str,
	hierarchy: &Hierarchy,
	by_id: &HashMap<&str, &GraphNode>,
	group_edges: &mut HashMap<String, Vec<GraphEdge>>,
	out: &mut Vec<GraphNode>,
) -> GroupNode {
	let Some(draft) = hierarchy.drafts.get(id) else {
		return GroupNode::root();
	};
	let mut group = GroupNode::new(id, draft.kind, draft.label.clone());
	group.edges = group_edges.remove(id).unwrap_or_default();

	for child_id in draft.sub_groups.values() {
		let child = finish_group(child_id, hierarchy, by_id, group_edges, out);
		group.status = group.status.max(child.status);
		group.object_count += child.object_count;
		group.children.push(child_id.clone());
		out.push(GraphNode::Group(child));
	}
	for member in &draft.members {
		let Some(&node) = by_id.get(member.as_str()) else {
			continue;
		};
		group.status = group.status.max(node.status());
		group.object_count += match node {
			GraphNode::Object(_) => 1,
			GraphNode::Group(inner) => inner.object_count,
		};
		group.children.push(member.clone());
		out.push(node.clone());
	}
	group
}

/// Produces the visible graph for a selection.
///
/// A group keeps its children iff `expand_all` is set, it is the selected
/// node, or it encloses the selected node. Every other group is emitted as
/// a single collapsed node with its children and inner edges elided.
pub fn collapse_graph(
	graph: &HierarchicalGraph,
	selected_node_id: Option<&str>,
	expand_all: bool,
) -> HierarchicalGraph {
	let mut expanded: HashSet<&str> = HashSet::new();
	if let Some(selected) = selected_node_id {
		expanded.insert(selected);
		expanded.extend(graph.ancestors(selected).into_iter().map(|g| g.id.as_str()));
	}
	let is_expanded = |id: &str| expand_all || expanded.contains(id);

	let mut out = Vec::with_capacity(graph.len());
	collect_visible(graph, ROOT_ID, &is_expanded, &mut out);
	HierarchicalGraph::new(graph.root().clone(), out)
}

fn collect_visible(
	graph: &HierarchicalGraph,
	id: &str,
	is_expanded: &dyn Fn(&str) -> bool,
	out: &mut Vec<GraphNode>,
) {
	for child in graph.children(id) {
		match child {
			GraphNode::Object(_) => out.push(child.clone()),
			GraphNode::Group(group) if is_expanded(&group.id) => {
				out.push(child.clone());
				collect_visible(graph, &group.id, is_expanded, out);
			}
			GraphNode::Group(group) => {
				let mut collapsed = group.clone();
				collapsed.children.clear();
				collapsed.edges.clear();
				collapsed.collapsed = true;
				out.push(GraphNode::Group(collapsed));
			}
		}
	}
}

/// Number of nodes and groups present in a (visible) graph.
pub fn get_graph_size(graph: &HierarchicalGraph) -> usize {
	graph.len()
}

/// Nearest group whose children include `node_id`, found by walking down
/// from the root. `None` for top-level and unknown nodes.
pub fn find_group_containing<'a>(graph: &'a HierarchicalGraph, node_id: &str) -> Option<&'a GroupNode> {
	fn search<'a>(
		graph: &'a HierarchicalGraph,
		group_id: &str,
		node_id: &str,
	) -> Option<&'a GroupNode> {
		for child in graph.children(group_id) {
			if let GraphNode::Group(inner) = child {
				if inner.children.iter().any(|c| c == node_id) {
					return Some(inner);
				}
				if let Some(found) = search(graph, &inner.id, node_id) {
					return Some(found);
				}
			}
		}
		None
	}
	search(graph, ROOT_ID, node_id)
}

/// Immediate parent group of `node_id`, `None` at the top level.
pub fn get_parent_node<'a>(graph: &'a HierarchicalGraph, node_id: &str) -> Option<&'a GroupNode> {
	graph
		.parent_id(node_id)
		.filter(|&parent| parent != ROOT_ID)
		.and_then(|parent| graph.group(parent))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::resource_map::graph::model::{NodeStatus, ObjectNode};

	fn pod(id: &str, ns: &str) -> ObjectNode {
		ObjectNode::new(id, "Pod", id).with_namespace(ns)
	}

	fn nodes(objects: Vec<ObjectNode>) -> Vec<GraphNode> {
		objects.into_iter().map(GraphNode::from).collect()
	}

	fn group_ids(graph: &HierarchicalGraph) -> Vec<&str> {
		graph
			.nodes()
			.filter(|n| n.is_group())
			.map(GraphNode::id)
			.collect()
	}

	fn edge_ids(edges: &[GraphEdge]) -> Vec<&str> {
		edges.iter().map(|e| e.id.as_str()).collect()
	}

	/// Namespace `a` holds instance `web` (w1, w2) and `lone`; namespace `b`
	/// holds `db`; `cluster` is unnamespaced.
	fn nested_fixture() -> (Vec<GraphNode>, Vec<GraphEdge>) {
		let nodes = nodes(vec![
			pod("w1", "a").with_instance("web"),
			pod("w2", "a")
				.with_instance("web")
				.with_status(NodeStatus::Error),
			pod("lone", "a"),
			pod("db", "b"),
			ObjectNode::new("cluster", "Node", "worker-1"),
		]);
		let edges = vec![
			GraphEdge::new("w1-w2", "w1", "w2", "network"),
			GraphEdge::new("w1-lone", "w1", "lone", "network"),
			GraphEdge::new("w1-db", "w1", "db", "network"),
			GraphEdge::new("w2-db", "w2", "db", "network"),
			GraphEdge::new("w2-db-mount", "w2", "db", "mount"),
			GraphEdge::new("cluster-w1", "cluster", "w1", "scheduling"),
		];
		(nodes, edges)
	}

	#[test]
	fn ungrouped_graph_matches_input() {
		let (input_nodes, input_edges) = nested_fixture();
		let graph = group_graph(&input_nodes, &input_edges, GroupBy::None);

		let top: Vec<&str> = graph.root().children.iter().map(String::as_str).collect();
		let input_ids: Vec<&str> = input_nodes.iter().map(GraphNode::id).collect();
		assert_eq!(top, input_ids);
		assert_eq!(graph.nodes().cloned().collect::<Vec<_>>(), input_nodes);
		assert_eq!(graph.all_edges().cloned().collect::<Vec<_>>(), input_edges);
	}

	#[test]
	fn namespace_grouping_keeps_inner_edges_nested() {
		let input = nodes(vec![pod("1", "a"), pod("2", "a"), pod("3", "b")]);
		let edges = vec![
			GraphEdge::new("e12", "1", "2", "owner"),
			GraphEdge::new("e13", "1", "3", "network"),
		];
		let graph = group_graph(&input, &edges, GroupBy::Namespace);

		assert_eq!(group_ids(&graph), vec!["namespace/a", "namespace/b"]);
		let a = graph.group("namespace/a").unwrap();
		assert_eq!(a.children, vec!["1", "2"]);
		assert_eq!(edge_ids(&a.edges), vec!["e12"]);
		assert_eq!(
			edge_ids(&graph.root().edges),
			vec!["namespace/a->namespace/b:network"]
		);
	}

	#[test]
	fn instance_groups_nest_inside_namespaces() {
		let (input, edges) = nested_fixture();
		let graph = group_graph(&input, &edges, GroupBy::Namespace);

		assert_eq!(
			graph.root().children,
			vec!["namespace/a", "namespace/b", "cluster"]
		);
		assert_eq!(
			graph.group("namespace/a").unwrap().children,
			vec!["instance/a/web", "lone"]
		);
		assert_eq!(graph.parent_id("w1"), Some("instance/a/web"));
		assert_eq!(graph.parent_id("instance/a/web"), Some("namespace/a"));
	}

	#[test]
	fn cross_group_edges_are_promoted_once_per_type() {
		let (input, edges) = nested_fixture();
		let graph = group_graph(&input, &edges, GroupBy::Namespace);

		let web = graph.group("instance/a/web").unwrap();
		assert_eq!(edge_ids(&web.edges), vec!["w1-w2"]);

		let a = graph.group("namespace/a").unwrap();
		assert_eq!(edge_ids(&a.edges), vec!["instance/a/web->lone:network"]);

		assert_eq!(
			edge_ids(&graph.root().edges),
			vec![
				"namespace/a->namespace/b:network",
				"namespace/a->namespace/b:mount",
				"cluster->namespace/a:scheduling",
			]
		);
	}

	#[test]
	fn group_status_reflects_worst_descendant() {
		let (input, edges) = nested_fixture();
		let graph = group_graph(&input, &edges, GroupBy::Namespace);

		assert_eq!(graph.group("instance/a/web").unwrap().status, NodeStatus::Error);
		assert_eq!(graph.group("namespace/a").unwrap().status, NodeStatus::Error);
		assert_eq!(graph.group("namespace/b").unwrap().status, NodeStatus::Ok);
		assert_eq!(graph.root().status, NodeStatus::Error);
		assert_eq!(graph.group("namespace/a").unwrap().object_count, 3);
	}

	#[test]
	fn groups_by_instance_and_host() {
		let input = nodes(vec![
			pod("p1", "a").with_instance("web").with_host("n1"),
			pod("p2", "b").with_instance("web").with_host("n2"),
			pod("p3", "b").with_host("n2"),
		]);

		let by_instance = group_graph(&input, &[], GroupBy::Instance);
		assert_eq!(group_ids(&by_instance), vec!["instance/web"]);
		assert_eq!(by_instance.parent_id("p3"), Some(ROOT_ID));

		let by_host = group_graph(&input, &[], GroupBy::Node);
		assert_eq!(group_ids(&by_host), vec!["node/n1", "node/n2"]);
		assert_eq!(by_host.group("node/n2").unwrap().children, vec!["p2", "p3"]);
	}

	#[test]
	fn drops_edges_with_missing_endpoints() {
		let input = nodes(vec![pod("1", "a")]);
		let edges = vec![GraphEdge::new("dangling", "1", "ghost", "owner")];
		let graph = group_graph(&input, &edges, GroupBy::Namespace);
		assert_eq!(graph.all_edges().count(), 0);
	}

	#[test]
	fn parses_group_by() {
		assert_eq!("namespace".parse::<GroupBy>(), Ok(GroupBy::Namespace));
		assert_eq!("none".parse::<GroupBy>(), Ok(GroupBy::None));
		assert_eq!(
			"cluster".parse::<GroupBy>(),
			Err(ParseGroupByError("cluster".into()))
		);
		assert_eq!(GroupBy::Node.to_string(), "node");
	}

	#[test]
	fn collapse_expands_only_the_selection_chain() {
		let (input, edges) = nested_fixture();
		let full = group_graph(&input, &edges, GroupBy::Namespace);
		let visible = collapse_graph(&full, Some("w1"), false);

		assert!(!visible.group("namespace/a").unwrap().collapsed);
		assert!(!visible.group("instance/a/web").unwrap().collapsed);
		assert!(visible.contains("w1"));
		assert!(visible.contains("w2"));
		let b = visible.group("namespace/b").unwrap();
		assert!(b.collapsed);
		assert!(b.children.is_empty());
		assert!(!visible.contains("db"));
	}

	#[test]
	fn collapse_without_selection_shows_top_level_only() {
		let (input, edges) = nested_fixture();
		let full = group_graph(&input, &edges, GroupBy::Namespace);
		let visible = collapse_graph(&full, None, false);

		assert_eq!(get_graph_size(&visible), 3);
		assert_eq!(visible.all_edges().count(), full.root().edges.len());
	}

	#[test]
	fn selecting_a_group_expands_it() {
		let (input, edges) = nested_fixture();
		let full = group_graph(&input, &edges, GroupBy::Namespace);
		let visible = collapse_graph(&full, Some("namespace/a"), false);

		assert!(!visible.group("namespace/a").unwrap().collapsed);
		assert!(visible.group("instance/a/web").unwrap().collapsed);
		assert!(visible.contains("lone"));
		assert!(!visible.contains("w1"));
	}

	#[test]
	fn expand_all_shows_everything() {
		let (input, edges) = nested_fixture();
		let full = group_graph(&input, &edges, GroupBy::Namespace);
		let visible = collapse_graph(&full, None, true);
		assert_eq!(get_graph_size(&visible), get_graph_size(&full));
	}

	#[test]
	fn collapsing_again_restores_visible_size() {
		let (input, edges) = nested_fixture();
		let full = group_graph(&input, &edges, GroupBy::Namespace);
		let before = get_graph_size(&collapse_graph(&full, None, false));
		let expanded = get_graph_size(&collapse_graph(&full, Some("w2"), false));
		let after = get_graph_size(&collapse_graph(&full, None, false));

		assert!(expanded > before);
		assert_eq!(before, after);
	}

	#[test]
	fn finds_containing_group() {
		let (input, edges) = nested_fixture();
		let graph = group_graph(&input, &edges, GroupBy::Namespace);

		for id in ["w1", "w2", "lone", "db", "instance/a/web"] {
			let found = find_group_containing(&graph, id).map(|g| g.id.as_str());
			let parent = get_parent_node(&graph, id).map(|g| g.id.as_str());
			assert!(found.is_some(), "{id}");
			assert_eq!(found, parent, "{id}");
		}
		assert_eq!(
			find_group_containing(&graph, "w1").map(|g| g.id.as_str()),
			Some("instance/a/web")
		);
		assert!(find_group_containing(&graph, "cluster").is_none());
		assert!(find_group_containing(&graph, "namespace/a").is_none());
		assert!(find_group_containing(&graph, "missing").is_none());
		assert!(get_parent_node(&graph, "cluster").is_none());
	}
}
