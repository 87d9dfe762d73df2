//! UI components.

pub mod resource_map;
