//! The resource graph pipeline.
//!
//! Raw resource nodes and edges flow through these stages, each a pure
//! function producing a new snapshot:
//!
//! 1. [`lookup`]: O(1) indexes over a flat node/edge set
//! 2. [`filtering`]: predicate filters with edge closure
//! 3. [`grouping`]: namespace/instance/node hierarchy, collapse and queries
//! 4. [`layout`]: positions and sizes for the visible hierarchy
//!
//! [`task`] provides the generation-keyed scheduling used to run layout
//! asynchronously without applying stale results.

pub mod filtering;
pub mod grouping;
pub mod layout;
pub mod lookup;
pub mod model;
pub mod task;

pub use filtering::{GraphFilter, filter_graph};
pub use grouping::{
	GroupBy, ParseGroupByError, collapse_graph, find_group_containing, get_graph_size, get_parent_node, group_graph,
};
pub use layout::{
	LayoutConfig, LayoutError, LayoutResult, PositionedNode, Rect, apply_layout, compute_layout,
};
pub use lookup::GraphLookup;
pub use model::{
	FlatGraph, GraphEdge, GraphNode, GroupKind, GroupNode, HierarchicalGraph, NodeStatus,
	ObjectNode, ROOT_ID,
};
pub use task::{LayoutScheduler, LayoutTicket};
