//! Resource search and the selection breadcrumb trail.

use super::graph::{GraphNode, GroupKind, HierarchicalGraph, ObjectNode, ROOT_ID};
use super::selection::Selection;

/// Finds resources whose label, kind or namespace contains `query`.
///
/// Matching ignores case. Results are ranked in three tiers: label prefix,
/// label substring, then kind or namespace; within a tier input order is
/// kept. A blank query matches nothing.
pub fn search_resources<'a>(nodes: &'a [GraphNode], query: &str, limit: usize) -> Vec<&'a ObjectNode> {
	let query = query.trim().to_lowercase();
	if query.is_empty() {
		return Vec::new();
	}

	let mut tiers: [Vec<&ObjectNode>; 3] = Default::default();
	for object in nodes.iter().filter_map(GraphNode::as_object) {
		let label = object.label.to_lowercase();
		let tier = if label.starts_with(&query) {
			0
		} else if label.contains(&query) {
			1
		} else if object.kind.to_lowercase().contains(&query)
			|| object
				.namespace
				.as_ref()
				.is_some_and(|ns| ns.to_lowercase().contains(&query))
		{
			2
		} else {
			continue;
		};
		tiers[tier].push(object);
	}
	tiers.into_iter().flatten().take(limit).collect()
}

/// Text typed into the search box.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchQuery {
	text: String,
}

impl SearchQuery {
	/// The raw text, as typed.
	pub fn text(&self) -> &str {
		&self.text
	}

	/// Replaces the text.
	pub fn set(&mut self, text: impl Into<String>) {
		self.text = text.into();
	}

	/// Resources matching the current text; see [`search_resources`].
	pub fn results<'a>(&self, nodes: &'a [GraphNode], limit: usize) -> Vec<&'a ObjectNode> {
		search_resources(nodes, &self.text, limit)
	}

	/// Selects the chosen result and clears the box. Returns whether the
	/// selection changed.
	pub fn choose(&mut self, selection: &mut Selection, id: &str) -> bool {
		self.text.clear();
		selection.select(Some(id))
	}
}

/// One step of the path from the root to the selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Breadcrumb {
	/// Id selected when the crumb is clicked.
	pub id: String,
	/// Text shown on the crumb.
	pub label: String,
}

/// Path from the root through every enclosing group to `selected`.
///
/// Empty when nothing is selected or the id is not in `graph`.
pub fn selection_breadcrumbs(graph: &HierarchicalGraph, selected: Option<&str>) -> Vec<Breadcrumb> {
	let Some(node) = selected.and_then(|id| graph.node(id)) else {
		return Vec::new();
	};

	let mut trail = vec![Breadcrumb {
		id: ROOT_ID.to_string(),
		label: GroupKind::Root.label().to_string(),
	}];
	trail.extend(graph.ancestors(node.id()).into_iter().rev().map(|group| Breadcrumb {
		id: group.id.clone(),
		label: group.label.clone(),
	}));
	trail.push(Breadcrumb {
		id: node.id().to_string(),
		label: node.label().to_string(),
	});
	trail
}
