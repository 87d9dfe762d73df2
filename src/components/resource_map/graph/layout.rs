//! Hierarchical layout of the visible graph.
//!
//! Groups are laid out bottom-up. Inside each group a short force simulation
//! pulls connected siblings together; the settled positions only decide the
//! reading order, and siblings are then packed into rows whose width follows
//! the target aspect ratio. Each group box is sized to its packed children
//! plus padding and a header, and absolute positions are assigned top-down
//! once every group is measured.
//!
//! [`LayoutJob`] measures one group per [`LayoutJob::step`], which lets
//! [`apply_layout`] yield to the event loop between groups and abandon the
//! run as soon as its [`LayoutTicket`] is superseded.

use std::collections::HashMap;
use std::f64::consts::TAU;
use std::sync::Arc;

use force_graph::{EdgeData, ForceGraph, NodeData, SimulationParameters};
use log::debug;
use serde::Deserialize;
use thiserror::Error;

use super::model::{GraphEdge, GraphNode, GroupNode, HierarchicalGraph, ROOT_ID};
use super::task::{LayoutTicket, yield_now};

/// Physics parameters for the sibling-ordering simulation.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
	/// Repulsion between every pair of siblings.
	pub force_charge: f32,
	/// Attraction along edges between siblings.
	pub force_spring: f32,
	/// Cap on the force applied to one sibling per step.
	pub force_max: f32,
	/// Cap on the distance a sibling moves per unit of time.
	pub node_speed: f32,
	/// Velocity kept from one step to the next.
	pub damping_factor: f32,
}

impl Default for SimulationSettings {
	fn default() -> Self {
		Self {
			force_charge: 150.0,
			force_spring: 0.05,
			force_max: 100.0,
			node_speed: 3000.0,
			damping_factor: 0.9,
		}
	}
}

impl SimulationSettings {
	fn parameters(&self) -> SimulationParameters {
		SimulationParameters {
			force_charge: self.force_charge,
			force_spring: self.force_spring,
			force_max: self.force_max,
			node_speed: self.node_speed,
			damping_factor: self.damping_factor,
		}
	}
}

/// Geometry used when measuring nodes and groups, in graph units.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
	/// Size of a resource node, also used for collapsed groups.
	pub node_width: f64,
	/// Height of a resource node.
	pub node_height: f64,
	/// Gap between siblings, horizontally and between rows.
	pub spacing: f64,
	/// Inner margin of a group box.
	pub group_padding: f64,
	/// Space reserved above a group's children for its title.
	pub group_header: f64,
	/// Simulation steps per group.
	pub iterations: usize,
	/// Simulated time per step.
	pub time_step: f32,
	/// Groups with more children than this keep their input order.
	pub max_simulated_children: usize,
	/// Forces driving the simulation.
	pub simulation: SimulationSettings,
}

impl Default for LayoutConfig {
	fn default() -> Self {
		Self {
			node_width: 200.0,
			node_height: 56.0,
			spacing: 24.0,
			group_padding: 16.0,
			group_header: 32.0,
			iterations: 120,
			time_step: 0.035,
			max_simulated_children: 300,
			simulation: SimulationSettings::default(),
		}
	}
}

/// Why a layout run produced no result. The caller keeps its previous layout.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
	/// The canvas has no usable shape.
	#[error("aspect ratio must be finite and positive, got {0}")]
	InvalidAspectRatio(f64),
	/// A newer submission replaced this one before it finished.
	#[error("layout superseded by newer input")]
	Superseded,
}

/// Axis-aligned rectangle in graph coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
	/// Left edge.
	pub x: f64,
	/// Top edge.
	pub y: f64,
	/// Horizontal extent.
	pub width: f64,
	/// Vertical extent.
	pub height: f64,
}

impl Rect {
	/// Rectangle with its top-left corner at `(x, y)`.
	pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
		Self {
			x,
			y,
			width,
			height,
		}
	}

	/// X of the right edge.
	pub fn right(&self) -> f64 {
		self.x + self.width
	}

	/// Y of the bottom edge.
	pub fn bottom(&self) -> f64 {
		self.y + self.height
	}

	/// Midpoint.
	pub fn center(&self) -> (f64, f64) {
		(self.x + self.width / 2.0, self.y + self.height / 2.0)
	}

	/// True if the point lies inside or on the border.
	pub fn contains_point(&self, x: f64, y: f64) -> bool {
		x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
	}

	/// True if `other` lies entirely within this rectangle.
	pub fn contains(&self, other: &Rect) -> bool {
		other.x >= self.x
			&& other.y >= self.y
			&& other.right() <= self.right()
			&& other.bottom() <= self.bottom()
	}

	/// True if the interiors overlap.
	pub fn intersects(&self, other: &Rect) -> bool {
		self.x < other.right()
			&& other.x < self.right()
			&& self.y < other.bottom()
			&& other.y < self.bottom()
	}

	/// Smallest rectangle enclosing both.
	pub fn union(&self, other: &Rect) -> Rect {
		let x = self.x.min(other.x);
		let y = self.y.min(other.y);
		Rect::new(
			x,
			y,
			self.right().max(other.right()) - x,
			self.bottom().max(other.bottom()) - y,
		)
	}
}

/// A visible node or group with its absolute box.
#[derive(Clone, Debug, PartialEq)]
pub struct PositionedNode {
	/// Id of the node or group.
	pub id: String,
	/// Enclosing group, `None` at the top level.
	pub parent: Option<String>,
	/// Nesting depth, 0 at the top level.
	pub depth: usize,
	/// Absolute box in graph coordinates.
	pub rect: Rect,
	/// The visible node this box was laid out for.
	pub node: GraphNode,
}

/// A complete layout of one visible graph.
///
/// Nodes are ordered parents before children, so drawing in order paints
/// nested content over its group box.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayoutResult {
	/// Every laid-out element, parents before children.
	pub nodes: Vec<PositionedNode>,
	/// Edges whose endpoints are both laid out. Routing is left to the renderer.
	pub edges: Vec<GraphEdge>,
	/// Bounding box of every top-level element.
	pub bounds: Rect,
	index: HashMap<String, usize>,
}

impl LayoutResult {
	/// Box of the element with this id.
	pub fn get(&self, id: &str) -> Option<&PositionedNode> {
		self.index.get(id).map(|&i| &self.nodes[i])
	}

	/// Deepest element containing the point.
	pub fn node_at(&self, x: f64, y: f64) -> Option<&PositionedNode> {
		self.nodes
			.iter()
			.rev()
			.find(|node| node.rect.contains_point(x, y))
	}

	/// True if nothing was laid out.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}
}

struct Frame<'a> {
	width: f64,
	height: f64,
	/// Child ids with offsets relative to the group's top-left corner.
	offsets: Vec<(&'a str, f64, f64)>,
}

/// Incremental layout of one graph, measured one group per step.
pub struct LayoutJob<'a> {
	graph: &'a HierarchicalGraph,
	config: &'a LayoutConfig,
	aspect_ratio: f64,
	/// Expanded groups, children before parents, root last.
	pending: Vec<&'a str>,
	next: usize,
	frames: HashMap<&'a str, Frame<'a>>,
}

impl<'a> LayoutJob<'a> {
	/// Prepares a layout of `graph` fitted to `aspect_ratio` (width over height).
	pub fn new(
		graph: &'a HierarchicalGraph,
		config: &'a LayoutConfig,
		aspect_ratio: f64,
	) -> Result<Self, LayoutError> {
		if !aspect_ratio.is_finite() || aspect_ratio <= 0.0 {
			return Err(LayoutError::InvalidAspectRatio(aspect_ratio));
		}
		let mut pending = Vec::new();
		collect_expanded(graph, ROOT_ID, &mut pending);
		Ok(Self {
			graph,
			config,
			aspect_ratio,
			pending,
			next: 0,
			frames: HashMap::new(),
		})
	}

	/// Measures the next group. Returns whether groups remain.
	pub fn step(&mut self) -> bool {
		let Some(&id) = self.pending.get(self.next) else {
			return false;
		};
		self.next += 1;
		let frame = self.measure_group(id);
		self.frames.insert(id, frame);
		self.next < self.pending.len()
	}

	/// Assigns absolute positions. Unmeasured groups lay out empty.
	pub fn finish(self) -> LayoutResult {
		let mut nodes = Vec::with_capacity(self.graph.len());
		self.place(ROOT_ID, (0.0, 0.0), None, 0, &mut nodes);

		let index: HashMap<String, usize> = nodes
			.iter()
			.enumerate()
			.map(|(i, node)| (node.id.clone(), i))
			.collect();
		let edges = self
			.graph
			.all_edges()
			.filter(|edge| index.contains_key(&edge.source) && index.contains_key(&edge.target))
			.cloned()
			.collect();
		let bounds = nodes
			.iter()
			.filter(|node| node.depth == 0)
			.map(|node| node.rect)
			.reduce(|acc, rect| acc.union(&rect))
			.unwrap_or_default();

		LayoutResult {
			nodes,
			edges,
			bounds,
			index,
		}
	}

	fn size_of(&self, node: &GraphNode) -> (f64, f64) {
		let fallback = (self.config.node_width, self.config.node_height);
		match node {
			GraphNode::Object(_) => fallback,
			GraphNode::Group(group) if group.collapsed => fallback,
			GraphNode::Group(group) => self
				.frames
				.get(group.id.as_str())
				.map(|frame| (frame.width, frame.height))
				.unwrap_or(fallback),
		}
	}

	fn measure_group(&self, id: &'a str) -> Frame<'a> {
		let config = self.config;
		let (padding, header) = if id == ROOT_ID {
			(0.0, 0.0)
		} else {
			(config.group_padding, config.group_header)
		};
		let Some(group) = self.graph.group(id) else {
			return Frame {
				width: 0.0,
				height: 0.0,
				offsets: Vec::new(),
			};
		};
		let children: Vec<&'a GraphNode> = self.graph.children(id).collect();
		if children.is_empty() {
			return Frame {
				width: config.node_width + 2.0 * padding,
				height: header + 2.0 * padding,
				offsets: Vec::new(),
			};
		}

		let sizes: Vec<(f64, f64)> = children.iter().map(|child| self.size_of(child)).collect();
		let order = self.sibling_order(group, &children);

		let spacing = config.spacing;
		let area: f64 = sizes
			.iter()
			.map(|(w, h)| (w + spacing) * (h + spacing))
			.sum();
		let widest = sizes.iter().map(|(w, _)| *w).fold(0.0, f64::max);
		let row_limit = (area * self.aspect_ratio).sqrt().max(widest);

		let mut offsets = Vec::with_capacity(children.len());
		let (mut x, mut y, mut row_height, mut content_width) = (0.0_f64, 0.0_f64, 0.0_f64, 0.0_f64);
		for i in order {
			let (w, h) = sizes[i];
			if x > 0.0 && x + w > row_limit {
				y += row_height + spacing;
				x = 0.0;
				row_height = 0.0;
			}
			offsets.push((children[i].id(), padding + x, header + padding + y));
			content_width = content_width.max(x + w);
			row_height = row_height.max(h);
			x += w + spacing;
		}

		Frame {
			width: content_width + 2.0 * padding,
			height: y + row_height + header + 2.0 * padding,
			offsets,
		}
	}

	/// Reading order of a group's children.
	///
	/// Runs the force simulation from a fixed circular start, slices the
	/// settled positions into horizontal bands and reads each band left to
	/// right. Falls back to input order for tiny or oversized groups.
	fn sibling_order(&self, group: &GroupNode, children: &[&GraphNode]) -> Vec<usize> {
		let n = children.len();
		let config = self.config;
		if n <= 2 || n > config.max_simulated_children {
			return (0..n).collect();
		}

		let position: HashMap<&str, usize> = children
			.iter()
			.enumerate()
			.map(|(i, child)| (child.id(), i))
			.collect();

		let mut simulation: ForceGraph<usize, ()> = ForceGraph::new(config.simulation.parameters());
		let radius = 40.0 + 12.0 * n as f64;
		let handles: Vec<_> = (0..n)
			.map(|i| {
				let angle = i as f64 * TAU / n as f64;
				simulation.add_node(NodeData {
					x: (radius * angle.cos()) as f32,
					y: (radius * angle.sin()) as f32,
					mass: 10.0,
					is_anchor: false,
					user_data: i,
				})
			})
			.collect();
		for edge in &group.edges {
			if let (Some(&a), Some(&b)) = (
				position.get(edge.source.as_str()),
				position.get(edge.target.as_str()),
			) {
				if a != b {
					simulation.add_edge(handles[a], handles[b], EdgeData::default());
				}
			}
		}
		for _ in 0..config.iterations {
			simulation.update(config.time_step);
		}

		let mut settled: Vec<(usize, f64, f64)> = Vec::with_capacity(n);
		simulation.visit_nodes(|node| {
			settled.push((node.data.user_data, node.x() as f64, node.y() as f64));
		});
		if settled.len() != n || settled.iter().any(|(_, x, y)| !x.is_finite() || !y.is_finite()) {
			debug!("resource-map: simulation diverged for {}, keeping input order", group.id);
			return (0..n).collect();
		}

		let rows = ((n as f64 / self.aspect_ratio).sqrt().ceil() as usize).clamp(1, n);
		let min_y = settled.iter().map(|(_, _, y)| *y).fold(f64::INFINITY, f64::min);
		let max_y = settled.iter().map(|(_, _, y)| *y).fold(f64::NEG_INFINITY, f64::max);
		let band_height = (max_y - min_y) / rows as f64;
		let band = |y: f64| {
			if band_height <= f64::EPSILON {
				0
			} else {
				(((y - min_y) / band_height) as usize).min(rows - 1)
			}
		};

		settled.sort_by(|a, b| {
			band(a.2)
				.cmp(&band(b.2))
				.then(a.1.total_cmp(&b.1))
				.then(a.0.cmp(&b.0))
		});
		settled.into_iter().map(|(i, _, _)| i).collect()
	}

	fn place(
		&self,
		group_id: &str,
		origin: (f64, f64),
		parent: Option<&str>,
		depth: usize,
		out: &mut Vec<PositionedNode>,
	) {
		let Some(frame) = self.frames.get(group_id) else {
			return;
		};
		for &(child_id, dx, dy) in &frame.offsets {
			let Some(node) = self.graph.node(child_id) else {
				continue;
			};
			let (width, height) = self.size_of(node);
			let rect = Rect::new(origin.0 + dx, origin.1 + dy, width, height);
			out.push(PositionedNode {
				id: child_id.to_string(),
				parent: parent.map(str::to_string),
				depth,
				rect,
				node: node.clone(),
			});
			if let GraphNode::Group(group) = node {
				if !group.collapsed {
					self.place(child_id, (rect.x, rect.y), Some(child_id), depth + 1, out);
				}
			}
		}
	}
}

fn collect_expanded<'a>(graph: &'a HierarchicalGraph, id: &'a str, out: &mut Vec<&'a str>) {
	for child in graph.children(id) {
		if let GraphNode::Group(group) = child {
			if !group.collapsed {
				collect_expanded(graph, &group.id, out);
			}
		}
	}
	out.push(id);
}

/// Lays out a visible graph synchronously.
pub fn compute_layout(
	graph: &HierarchicalGraph,
	aspect_ratio: f64,
	config: &LayoutConfig,
) -> Result<LayoutResult, LayoutError> {
	let mut job = LayoutJob::new(graph, config, aspect_ratio)?;
	while job.step() {}
	Ok(job.finish())
}

/// Lays out a visible graph, yielding to the event loop after every group.
///
/// Fails with [`LayoutError::Superseded`] as soon as `ticket` stops being
/// current, so a stale run never produces a result.
pub async fn apply_layout(
	graph: Arc<HierarchicalGraph>,
	aspect_ratio: f64,
	config: LayoutConfig,
	ticket: LayoutTicket,
) -> Result<LayoutResult, LayoutError> {
	let mut job = LayoutJob::new(&graph, &config, aspect_ratio)?;
	loop {
		if !ticket.is_current() {
			debug!(
				"resource-map: layout {} superseded, discarding",
				ticket.generation()
			);
			return Err(LayoutError::Superseded);
		}
		if !job.step() {
			break;
		}
		yield_now().await;
	}
	if !ticket.is_current() {
		return Err(LayoutError::Superseded);
	}
	Ok(job.finish())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::resource_map::graph::grouping::{GroupBy, collapse_graph, group_graph};
	use crate::components::resource_map::graph::model::ObjectNode;
	use crate::components::resource_map::graph::task::{LayoutScheduler, block_on};

	fn fixture() -> HierarchicalGraph {
		let mut nodes = Vec::new();
		for ns in ["alpha", "beta"] {
			for i in 0..5 {
				let id = format!("{ns}-{i}");
				let mut object = ObjectNode::new(&id, "Pod", &id).with_namespace(ns);
				if i < 3 {
					object = object.with_instance("web");
				}
				nodes.push(GraphNode::from(object));
			}
		}
		nodes.push(GraphNode::from(ObjectNode::new("worker", "Node", "worker")));
		let edges = vec![
			GraphEdge::new("a0-a1", "alpha-0", "alpha-1", "owner"),
			GraphEdge::new("a1-a2", "alpha-1", "alpha-2", "owner"),
			GraphEdge::new("a3-a4", "alpha-3", "alpha-4", "network"),
			GraphEdge::new("a4-b4", "alpha-4", "beta-4", "network"),
			GraphEdge::new("w-b0", "worker", "beta-0", "scheduling"),
		];
		group_graph(&nodes, &edges, GroupBy::Namespace)
	}

	#[test]
	fn layout_is_deterministic() {
		let graph = collapse_graph(&fixture(), None, true);
		let config = LayoutConfig::default();
		let first = compute_layout(&graph, 16.0 / 9.0, &config).unwrap();
		let second = compute_layout(&graph, 16.0 / 9.0, &config).unwrap();
		assert_eq!(first, second);
	}

	#[test]
	fn positions_every_visible_node() {
		let full = fixture();
		let visible = collapse_graph(&full, Some("alpha-0"), false);
		let layout = compute_layout(&visible, 1.5, &LayoutConfig::default()).unwrap();

		assert_eq!(layout.nodes.len(), visible.len());
		for node in visible.nodes() {
			assert!(layout.get(node.id()).is_some(), "{}", node.id());
		}
		assert!(layout.get("beta-0").is_none());
	}

	#[test]
	fn groups_contain_their_children_with_padding() {
		let graph = collapse_graph(&fixture(), None, true);
		let config = LayoutConfig::default();
		let layout = compute_layout(&graph, 1.0, &config).unwrap();

		for node in &layout.nodes {
			let Some(parent) = node.parent.as_deref() else {
				continue;
			};
			let outer = layout.get(parent).unwrap().rect;
			let slack = 1e-6;
			let inner = Rect::new(
				outer.x + config.group_padding - slack,
				outer.y + config.group_header + config.group_padding - slack,
				outer.width - 2.0 * config.group_padding + 2.0 * slack,
				outer.height - config.group_header - 2.0 * config.group_padding + 2.0 * slack,
			);
			assert!(inner.contains(&node.rect), "{} escapes {}", node.id, parent);
		}
	}

	#[test]
	fn siblings_do_not_overlap() {
		let graph = collapse_graph(&fixture(), None, true);
		let layout = compute_layout(&graph, 1.0, &LayoutConfig::default()).unwrap();

		for (i, a) in layout.nodes.iter().enumerate() {
			for b in &layout.nodes[i + 1..] {
				if a.parent == b.parent {
					assert!(!a.rect.intersects(&b.rect), "{} overlaps {}", a.id, b.id);
				}
			}
		}
	}

	#[test]
	fn collapsed_groups_are_node_sized() {
		let graph = collapse_graph(&fixture(), None, false);
		let config = LayoutConfig::default();
		let layout = compute_layout(&graph, 1.0, &config).unwrap();

		let alpha = layout.get("namespace/alpha").unwrap();
		assert_eq!(alpha.rect.width, config.node_width);
		assert_eq!(alpha.rect.height, config.node_height);
		assert!(layout.nodes.iter().all(|n| n.depth == 0));
	}

	#[test]
	fn emits_only_edges_between_laid_out_nodes() {
		let graph = collapse_graph(&fixture(), Some("alpha-3"), false);
		let layout = compute_layout(&graph, 1.0, &LayoutConfig::default()).unwrap();

		let ids: Vec<&str> = layout.edges.iter().map(|e| e.id.as_str()).collect();
		assert!(ids.contains(&"a3-a4"));
		assert!(ids.contains(&"namespace/alpha->namespace/beta:network"));
		assert!(!ids.contains(&"a0-a1"));
	}

	#[test]
	fn hit_testing_finds_the_deepest_element() {
		let graph = collapse_graph(&fixture(), Some("alpha-0"), false);
		let layout = compute_layout(&graph, 1.0, &LayoutConfig::default()).unwrap();

		let pod = layout.get("alpha-0").unwrap();
		let (cx, cy) = pod.rect.center();
		assert_eq!(layout.node_at(cx, cy).map(|n| n.id.as_str()), Some("alpha-0"));

		let group = layout.get("namespace/alpha").unwrap();
		let hit = layout.node_at(group.rect.x + 1.0, group.rect.y + 1.0);
		assert_eq!(hit.map(|n| n.id.as_str()), Some("namespace/alpha"));
		assert!(layout.node_at(-10_000.0, -10_000.0).is_none());
	}

	#[test]
	fn rejects_degenerate_aspect_ratios() {
		let graph = fixture();
		let config = LayoutConfig::default();
		for ratio in [0.0, -1.0, f64::NAN, f64::INFINITY] {
			assert!(matches!(
				compute_layout(&graph, ratio, &config),
				Err(LayoutError::InvalidAspectRatio(_))
			));
		}
	}

	#[test]
	fn empty_graph_lays_out_empty() {
		let layout =
			compute_layout(&HierarchicalGraph::default(), 1.0, &LayoutConfig::default()).unwrap();
		assert!(layout.is_empty());
		assert_eq!(layout.bounds, Rect::default());
	}

	#[test]
	fn async_layout_matches_sync_layout() {
		let graph = Arc::new(collapse_graph(&fixture(), Some("beta-1"), false));
		let config = LayoutConfig::default();
		let scheduler = LayoutScheduler::new();

		let ticket = scheduler.submit();
		let result = block_on(apply_layout(graph.clone(), 2.0, config.clone(), ticket));
		assert_eq!(result, compute_layout(&graph, 2.0, &config));
	}

	#[test]
	fn superseded_layout_is_discarded() {
		let graph = Arc::new(collapse_graph(&fixture(), None, true));
		let scheduler = LayoutScheduler::new();

		let stale = scheduler.submit();
		let fresh = scheduler.submit();
		let stale_result = block_on(apply_layout(
			graph.clone(),
			1.0,
			LayoutConfig::default(),
			stale,
		));
		assert_eq!(stale_result, Err(LayoutError::Superseded));

		let fresh_result = block_on(apply_layout(graph, 1.0, LayoutConfig::default(), fresh));
		assert!(fresh_result.is_ok());
	}
}
