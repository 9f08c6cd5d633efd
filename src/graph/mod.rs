//! The in-memory knowledge graph.
//!
//! A directed multigraph on top of petgraph. Nodes carry a type, edges carry a relation type.
//! The persisted form is loaded by [crate::io::graphbson].

/// Defines node and edge data stored in petgraph, and the graph itself.
pub mod pgraph;

pub use pgraph::{KEdge, KGraph, KNode};

#[cfg(test)]
pub(crate) mod testgraph;
