//! Resource relationship map.
//!
//! Turns the resources and relationships reported by each source into an
//! interactive canvas map:
//! - Filtering by status, namespace and kind
//! - Grouping by namespace, owning instance or hosting node
//! - Collapsing groups outside the selection, with optional expand-all
//! - Asynchronous, cancellable hierarchical layout
//! - Selection highlighting, search and breadcrumbs
//! - Selection and grouping persisted in the page URL
//!
//! # Example
//!
//! ```ignore
//! use resource_map::{GraphData, MapConfig, ResourceMapView};
//!
//! let data = GraphData::from_json(payload).unwrap_or_default();
//! view! { <ResourceMapView data=Signal::derive(move || data.clone()) config=MapConfig::default() /> }
//! ```

mod component;
pub mod config;
pub mod graph;
pub mod highlight;
pub mod pipeline;
mod render;
pub mod search;
pub mod selection;
pub mod sources;
pub mod theme;
mod view;
pub mod view_state;
pub mod viewport;

pub use config::MapConfig;
pub use sources::{GraphData, GraphSource};
pub use theme::Theme;
pub use view::ResourceMapView;
