//! Graph data structures shared by every pipeline stage.
//!
//! Resource objects arrive as [`ObjectNode`]s; grouping adds synthetic
//! [`GroupNode`]s. Both are carried in the [`GraphNode`] sum type so that
//! grouping, collapsing and layout match exhaustively over every case.

use std::collections::{HashMap, HashSet};

use log::warn;
use serde::Deserialize;

/// Id of the synthetic group at the top of every hierarchy.
pub const ROOT_ID: &str = "root";

/// Health reported by a resource, or aggregated over a group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
	/// Healthy, the default when a source reports nothing.
	#[default]
	Ok,
	/// Degraded but serving.
	Warning,
	/// Failing.
	Error,
}

impl NodeStatus {
	/// True for warnings and errors.
	pub fn is_problem(self) -> bool {
		self != NodeStatus::Ok
	}

	/// Display name.
	pub fn label(self) -> &'static str {
		match self {
			NodeStatus::Ok => "Ok",
			NodeStatus::Warning => "Warning",
			NodeStatus::Error => "Error",
		}
	}
}

/// A single resource object from one of the graph sources.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ObjectNode {
	/// Stable resource UID.
	pub id: String,
	/// Display name.
	pub label: String,
	/// Resource kind, e.g. `Deployment`.
	pub kind: String,
	/// Namespace, `None` for cluster-scoped resources.
	pub namespace: Option<String>,
	/// Id of the owning application instance.
	pub instance: Option<String>,
	/// Name of the cluster node hosting this resource.
	pub host: Option<String>,
	/// Health reported by the source.
	#[serde(default)]
	pub status: NodeStatus,
	/// Source payload, opaque to the graph pipeline.
	#[serde(default)]
	pub detail: serde_json::Value,
}

impl ObjectNode {
	/// Creates a healthy object with no namespace, instance or host.
	pub fn new(id: impl Into<String>, kind: impl Into<String>, label: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			label: label.into(),
			kind: kind.into(),
			namespace: None,
			instance: None,
			host: None,
			status: NodeStatus::Ok,
			detail: serde_json::Value::Null,
		}
	}

	/// Places the object in `namespace`.
	pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
		self.namespace = Some(namespace.into());
		self
	}

	/// Attributes the object to the application instance `instance`.
	pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
		self.instance = Some(instance.into());
		self
	}

	/// Schedules the object on the cluster node `host`.
	pub fn with_host(mut self, host: impl Into<String>) -> Self {
		self.host = Some(host.into());
		self
	}

	/// Overrides the reported health.
	pub fn with_status(mut self, status: NodeStatus) -> Self {
		self.status = status;
		self
	}
}

/// What a [`GroupNode`] aggregates over.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GroupKind {
	/// The implicit top of the hierarchy.
	Root,
	/// All objects of one namespace.
	Namespace,
	/// All objects owned by one application instance.
	Instance,
	/// A cluster node hosting workloads.
	Node,
}

impl GroupKind {
	/// Title shown for groups of this kind.
	pub fn label(self) -> &'static str {
		match self {
			GroupKind::Root => "Resources",
			GroupKind::Namespace => "Namespace",
			GroupKind::Instance => "Instance",
			GroupKind::Node => "Node",
		}
	}
}

/// A synthetic node clustering other nodes under one grouping key.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupNode {
	/// Derived from the kind and grouping key, e.g. `namespace/shop`.
	pub id: String,
	/// What the group aggregates over.
	pub kind: GroupKind,
	/// Display name, usually the grouping key.
	pub label: String,
	/// Direct children, in display order. Empty while collapsed.
	pub children: Vec<String>,
	/// Edges whose endpoints are both direct children of this group.
	pub edges: Vec<GraphEdge>,
	/// Worst status of any descendant.
	pub status: NodeStatus,
	/// Number of resource objects below this group.
	pub object_count: usize,
	/// Set on groups whose children are elided in a visible graph.
	pub collapsed: bool,
}

impl GroupNode {
	/// Creates an empty, expanded group.
	pub fn new(id: impl Into<String>, kind: GroupKind, label: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			kind,
			label: label.into(),
			children: Vec::new(),
			edges: Vec::new(),
			status: NodeStatus::Ok,
			object_count: 0,
			collapsed: false,
		}
	}

	pub(crate) fn root() -> Self {
		Self::new(ROOT_ID, GroupKind::Root, GroupKind::Root.label())
	}
}

/// Any node in a graph snapshot.
#[derive(Clone, Debug, PartialEq)]
pub enum GraphNode {
	/// A resource from a source.
	Object(ObjectNode),
	/// A group synthesized by the grouping stage.
	Group(GroupNode),
}

impl GraphNode {
	/// Unique id of either variant.
	pub fn id(&self) -> &str {
		match self {
			GraphNode::Object(node) => &node.id,
			GraphNode::Group(group) => &group.id,
		}
	}

	/// Display name of either variant.
	pub fn label(&self) -> &str {
		match self {
			GraphNode::Object(node) => &node.label,
			GraphNode::Group(group) => &group.label,
		}
	}

	/// Reported or aggregated health.
	pub fn status(&self) -> NodeStatus {
		match self {
			GraphNode::Object(node) => node.status,
			GraphNode::Group(group) => group.status,
		}
	}

	/// Namespace of an object. Groups have none.
	pub fn namespace(&self) -> Option<&str> {
		match self {
			GraphNode::Object(node) => node.namespace.as_deref(),
			GraphNode::Group(_) => None,
		}
	}

	/// The object, if this is one.
	pub fn as_object(&self) -> Option<&ObjectNode> {
		match self {
			GraphNode::Object(node) => Some(node),
			GraphNode::Group(_) => None,
		}
	}

	/// The group, if this is one.
	pub fn as_group(&self) -> Option<&GroupNode> {
		match self {
			GraphNode::Object(_) => None,
			GraphNode::Group(group) => Some(group),
		}
	}

	/// True for synthetic groups.
	pub fn is_group(&self) -> bool {
		matches!(self, GraphNode::Group(_))
	}
}

impl From<ObjectNode> for GraphNode {
	fn from(node: ObjectNode) -> Self {
		GraphNode::Object(node)
	}
}

/// A directed, typed relationship between two nodes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct GraphEdge {
	/// Unique within a source.
	pub id: String,
	/// Id of the node the edge leaves.
	pub source: String,
	/// Id of the node the edge enters.
	pub target: String,
	/// Source-defined relation, e.g. `owner`, `network`, `mount`.
	#[serde(rename = "type")]
	pub edge_type: String,
}

impl GraphEdge {
	/// Creates an edge of type `edge_type` from `source` to `target`.
	pub fn new(
		id: impl Into<String>,
		source: impl Into<String>,
		target: impl Into<String>,
		edge_type: impl Into<String>,
	) -> Self {
		Self {
			id: id.into(),
			source: source.into(),
			target: target.into(),
			edge_type: edge_type.into(),
		}
	}
}

/// An ungrouped node/edge set.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlatGraph {
	/// Nodes, in source order.
	pub nodes: Vec<GraphNode>,
	/// Edges, in source order.
	pub edges: Vec<GraphEdge>,
}

/// A forest of nodes under the implicit [`ROOT_ID`] group.
///
/// Parent links are stored as ids, never as references, and resolved through
/// the graph's own index. Snapshots are immutable once built; every
/// transform produces a new one.
#[derive(Clone, Debug, PartialEq)]
pub struct HierarchicalGraph {
	root: GroupNode,
	nodes: Vec<GraphNode>,
	index: HashMap<String, usize>,
	parents: HashMap<String, String>,
}

impl Default for HierarchicalGraph {
	fn default() -> Self {
		Self::new(GroupNode::root(), Vec::new())
	}
}

impl HierarchicalGraph {
	/// Builds a hierarchy from a root group and every non-root node.
	///
	/// Duplicate ids keep their first occurrence. Children that reference
	/// unknown ids, or that already belong to another group, are dropped, as
	/// are group edges with an endpoint outside the group.
	pub fn new(root: GroupNode, nodes: Vec<GraphNode>) -> Self {
		let mut kept = Vec::with_capacity(nodes.len());
		let mut index = HashMap::with_capacity(nodes.len());
		for node in nodes {
			if node.id() == ROOT_ID || index.contains_key(node.id()) {
				warn!("resource-map: dropping duplicate node id {}", node.id());
				continue;
			}
			index.insert(node.id().to_string(), kept.len());
			kept.push(node);
		}

		let mut parents: HashMap<String, String> = HashMap::new();
		let mut root = root;
		claim_children(&mut root, &index, &mut parents);
		for node in &mut kept {
			if let GraphNode::Group(group) = node {
				claim_children(group, &index, &mut parents);
			}
		}

		Self {
			root,
			nodes: kept,
			index,
			parents,
		}
	}

	/// The implicit top-level group.
	pub fn root(&self) -> &GroupNode {
		&self.root
	}

	/// Looks up any non-root node.
	pub fn node(&self, id: &str) -> Option<&GraphNode> {
		self.index.get(id).map(|&i| &self.nodes[i])
	}

	/// Looks up a group, including the root.
	pub fn group(&self, id: &str) -> Option<&GroupNode> {
		if id == ROOT_ID {
			return Some(&self.root);
		}
		self.node(id).and_then(GraphNode::as_group)
	}

	/// True if a non-root node has this id.
	pub fn contains(&self, id: &str) -> bool {
		self.index.contains_key(id)
	}

	/// Id of the direct parent, [`ROOT_ID`] for top-level nodes.
	pub fn parent_id(&self, id: &str) -> Option<&str> {
		self.parents.get(id).map(String::as_str)
	}

	/// Direct children of a group, in display order.
	pub fn children<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a GraphNode> + use<'a> {
		self.group(id)
			.map(|group| group.children.as_slice())
			.unwrap_or_default()
			.iter()
			.filter_map(|child| self.node(child))
	}

	/// Every non-root node, in insertion order.
	pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
		self.nodes.iter()
	}

	/// Non-root groups enclosing `id`, nearest first.
	pub fn ancestors(&self, id: &str) -> Vec<&GroupNode> {
		let mut chain = Vec::new();
		let mut current = self.parent_id(id);
		while let Some(parent) = current {
			if parent == ROOT_ID || chain.len() > self.nodes.len() {
				break;
			}
			match self.group(parent) {
				Some(group) => chain.push(group),
				None => break,
			}
			current = self.parent_id(parent);
		}
		chain
	}

	/// True if `ancestor` is a non-root group enclosing `id`.
	pub fn is_ancestor(&self, ancestor: &str, id: &str) -> bool {
		self.ancestors(id).iter().any(|group| group.id == ancestor)
	}

	/// Edges at every level, root first, each group's edges in order.
	pub fn all_edges(&self) -> impl Iterator<Item = &GraphEdge> {
		self.root.edges.iter().chain(
			self.nodes
				.iter()
				.filter_map(GraphNode::as_group)
				.flat_map(|group| group.edges.iter()),
		)
	}

	/// Number of non-root nodes.
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	/// True if only the root exists.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}
}

fn claim_children(
	group: &mut GroupNode,
	index: &HashMap<String, usize>,
	parents: &mut HashMap<String, String>,
) {
	group.children.retain(|child| {
		if !index.contains_key(child) || child == &group.id {
			warn!("resource-map: group {} references unknown child {}", group.id, child);
			return false;
		}
		if parents.contains_key(child) {
			warn!("resource-map: {} already has a parent, ignoring {}", child, group.id);
			return false;
		}
		parents.insert(child.clone(), group.id.clone());
		true
	});
	let members: HashSet<&str> = group.children.iter().map(String::as_str).collect();
	group
		.edges
		.retain(|edge| members.contains(edge.source.as_str()) && members.contains(edge.target.as_str()));
}

#[cfg(test)]
mod tests {
	use super::*;

	fn group(id: &str, children: &[&str]) -> GraphNode {
		let mut group = GroupNode::new(id, GroupKind::Namespace, id);
		group.children = children.iter().map(|c| c.to_string()).collect();
		GraphNode::Group(group)
	}

	fn object(id: &str) -> GraphNode {
		ObjectNode::new(id, "Pod", id).into()
	}

	#[test]
	fn resolves_parents_and_ancestors() {
		let mut root = GroupNode::root();
		root.children = vec!["ns".into(), "lone".into()];
		let graph = HierarchicalGraph::new(
			root,
			vec![group("ns", &["inst"]), group("inst", &["pod"]), object("pod"), object("lone")],
		);

		assert_eq!(graph.parent_id("pod"), Some("inst"));
		assert_eq!(graph.parent_id("lone"), Some(ROOT_ID));
		let chain: Vec<&str> = graph.ancestors("pod").iter().map(|g| g.id.as_str()).collect();
		assert_eq!(chain, vec!["inst", "ns"]);
		assert!(graph.is_ancestor("ns", "pod"));
		assert!(graph.ancestors("lone").is_empty());
	}

	#[test]
	fn drops_unknown_and_doubly_claimed_children() {
		let mut root = GroupNode::root();
		root.children = vec!["a".into(), "b".into(), "ghost".into()];
		let graph = HierarchicalGraph::new(root, vec![group("a", &["x"]), group("b", &["x"]), object("x")]);

		assert_eq!(graph.root().children, vec!["a", "b"]);
		assert_eq!(graph.group("a").map(|g| g.children.len()), Some(1));
		assert_eq!(graph.group("b").map(|g| g.children.len()), Some(0));
	}
}
