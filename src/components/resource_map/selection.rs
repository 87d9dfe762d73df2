//! Selection state machine and the highlight set derived from it.
//!
//! The selected id is owned by the navigable view state; everything else
//! (containing group, highlighted nodes and edges) is recomputed from the
//! full graph whenever the selection or the graph changes.

use std::collections::BTreeSet;

use log::debug;

use super::graph::{
	GraphEdge, GraphLookup, GraphNode, HierarchicalGraph, ROOT_ID, find_group_containing,
};

/// The selected node id, `None` meaning the top level.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
	selected: Option<String>,
}

impl Selection {
	/// Selection restored from view state.
	pub fn new(selected: Option<&str>) -> Self {
		let mut selection = Self::default();
		selection.select(selected);
		selection
	}

	/// Selected id, `None` at the top level.
	pub fn selected(&self) -> Option<&str> {
		self.selected.as_deref()
	}

	/// Selects `id`; [`ROOT_ID`] clears the selection. Returns whether the
	/// selection changed.
	pub fn select(&mut self, id: Option<&str>) -> bool {
		let next = id.filter(|&id| id != ROOT_ID).map(str::to_string);
		if next == self.selected {
			return false;
		}
		self.selected = next;
		true
	}

	/// Drops a selection that no longer exists in `full`.
	///
	/// An empty graph is treated as still loading and leaves the selection
	/// alone, so a deep link survives until its data arrives.
	pub fn reconcile(&mut self, full: &HierarchicalGraph) -> bool {
		match &self.selected {
			Some(id) if !full.is_empty() && !full.contains(id) => {
				debug!("resource-map: selection {} disappeared, clearing", id);
				self.selected = None;
				true
			}
			_ => false,
		}
	}

	/// Handles a click on empty canvas.
	///
	/// A selected resource gives way to its parent group; a selected group
	/// gives way to the top level.
	pub fn background_click(&mut self, full: &HierarchicalGraph) -> bool {
		let next = match self.selected.as_deref().and_then(|id| full.node(id)) {
			Some(GraphNode::Object(object)) => {
				find_group_containing(full, &object.id).map(|group| group.id.clone())
			}
			_ => None,
		};
		let changed = next != self.selected;
		self.selected = next;
		changed
	}

	/// Handles closing the details panel: selects the containing group, or
	/// `default_selection` when the selection is top-level.
	pub fn close_details(&mut self, full: &HierarchicalGraph, default_selection: Option<&str>) -> bool {
		let next = self
			.selected
			.as_deref()
			.and_then(|id| find_group_containing(full, id))
			.map(|group| group.id.as_str())
			.or(default_selection);
		self.select(next)
	}
}

/// Elements emphasized because of their relation to the selection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Highlights {
	/// The selection, its enclosing groups and its graph neighbors.
	pub nodes: BTreeSet<String>,
	/// Edges touching the selection, outgoing before incoming.
	pub edges: Vec<GraphEdge>,
}

impl Highlights {
	/// Computes the highlight set of `selected` in the full graph.
	///
	/// `lookup` indexes the full graph's nodes together with its raw and
	/// promoted edges. Unknown or absent selections highlight nothing.
	pub fn compute(full: &HierarchicalGraph, lookup: &GraphLookup, selected: Option<&str>) -> Self {
		let Some(id) = selected.filter(|id| full.contains(id)) else {
			return Self::default();
		};

		let mut nodes: BTreeSet<String> = BTreeSet::new();
		nodes.insert(id.to_string());
		nodes.extend(full.ancestors(id).into_iter().map(|group| group.id.clone()));
		nodes.extend(lookup.neighbors(id).into_iter().map(str::to_string));

		let mut edges: Vec<GraphEdge> = Vec::new();
		for edge in lookup
			.outgoing_edges(id)
			.unwrap_or_default()
			.into_iter()
			.chain(lookup.incoming_edges(id).unwrap_or_default())
		{
			if !edges.iter().any(|seen| seen.id == edge.id) {
				edges.push(edge.clone());
			}
		}

		Self { nodes, edges }
	}

	/// Maps each highlighted id onto the element drawn for it in `visible`:
	/// itself when visible, otherwise its nearest visible enclosing group.
	pub fn visible_in(&self, full: &HierarchicalGraph, visible: &HierarchicalGraph) -> BTreeSet<String> {
		self.nodes
			.iter()
			.filter_map(|id| {
				if visible.contains(id) {
					return Some(id.clone());
				}
				full.ancestors(id)
					.into_iter()
					.find(|group| visible.contains(&group.id))
					.map(|group| group.id.clone())
			})
			.collect()
	}

	/// Ids of the highlighted edges of the full graph.
	pub fn edge_ids(&self) -> BTreeSet<String> {
		self.edges.iter().map(|edge| edge.id.clone()).collect()
	}

	/// Ids of the edges of `visible` drawn for a highlighted edge.
	///
	/// A highlighted edge is drawn either as itself or, once its endpoints
	/// sit in different groups, as the promoted edge of the same type whose
	/// endpoints enclose its own. Edges that merely join two highlighted
	/// nodes are not included.
	pub fn visible_edges(&self, full: &HierarchicalGraph, visible: &HierarchicalGraph) -> BTreeSet<String> {
		let encloses = |outer: &str, id: &str| outer == id || full.is_ancestor(outer, id);
		visible
			.all_edges()
			.filter(|drawn| {
				self.edges.iter().any(|edge| {
					drawn.id == edge.id
						|| (drawn.edge_type == edge.edge_type
							&& encloses(&drawn.source, &edge.source)
							&& encloses(&drawn.target, &edge.target))
				})
			})
			.map(|drawn| drawn.id.clone())
			.collect()
	}

	/// True if nothing is highlighted.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}
}

/// Everything derived from one selection against one full graph.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectionSnapshot {
	/// Selected id, if it exists in the graph.
	pub selected: Option<String>,
	/// Nearest group containing the selection.
	pub group: Option<String>,
	/// Elements emphasized around the selection.
	pub highlights: Highlights,
}

impl SelectionSnapshot {
	/// Resolves `selection` against `full`.
	pub fn derive(full: &HierarchicalGraph, lookup: &GraphLookup, selection: &Selection) -> Self {
		let selected = selection.selected();
		Self {
			selected: selected.map(str::to_string),
			group: selected
				.and_then(|id| find_group_containing(full, id))
				.map(|group| group.id.clone()),
			highlights: Highlights::compute(full, lookup, selected),
		}
	}
}
