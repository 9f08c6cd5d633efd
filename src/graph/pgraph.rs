//! This module describes Node and Edge data we store in petgraph.
//!
//! Nodes have an identity (as found in the source graph) and exactly one categorical type
//! (drug, protein, function, phenotype ...).
//! Edges are directed and carry exactly one relation type. There can be many edges between
//! 2 given nodes, with the same or with different relation types.

use indexmap::IndexMap;

use petgraph::graph::{DiGraph, EdgeReference, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::errors::{EmbedError, Result};


/// data attached to a node
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KNode {
    /// node identity, unique in the graph
    id: String,
    /// node type
    ntype: String,
}

impl KNode {
    pub fn new(id: &str, ntype: &str) -> Self {
        KNode {
            id: id.to_string(),
            ntype: ntype.to_string(),
        }
    }

    pub fn get_id(&self) -> &str {
        &self.id
    }

    pub fn get_type(&self) -> &str {
        &self.ntype
    }
} // end of impl KNode


/// Our edge label. Called KEdge as petgraph data attached to an edge is called a weight
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KEdge {
    /// relation type
    relation: String,
}

impl KEdge {
    pub fn new(relation: &str) -> Self {
        KEdge {
            relation: relation.to_string(),
        }
    }

    /// retrieve the relation type of the edge
    pub fn get_relation(&self) -> &str {
        &self.relation
    }
} // end of impl KEdge


//=============================================================================


/// A directed typed multigraph.
///
/// Nodes are kept in insertion order, which is the graph-native iteration order used
/// by the indexation.
#[derive(Debug)]
pub struct KGraph {
    /// the graph
    graph: DiGraph<KNode, KEdge>,
    /// given a node identity get its NodeIndex in graph
    nodeset: IndexMap<String, NodeIndex>,
} // end of KGraph


impl Default for KGraph {
    fn default() -> Self {
        KGraph::new()
    }
}


impl KGraph {
    pub fn new() -> Self {
        KGraph {
            graph: DiGraph::new(),
            nodeset: IndexMap::new(),
        }
    }

    /// allocates for nb_nodes and nb_edges
    pub fn with_capacity(nb_nodes: usize, nb_edges: usize) -> Self {
        KGraph {
            graph: DiGraph::with_capacity(nb_nodes, nb_edges),
            nodeset: IndexMap::with_capacity(nb_nodes),
        }
    }

    /// adds a node. A node identity can be inserted only once.
    pub fn add_node(&mut self, id: &str, ntype: &str) -> Result<NodeIndex> {
        if self.nodeset.contains_key(id) {
            log::error!("node {} declared twice", id);
            return Err(EmbedError::Load(format!("node {} declared twice", id)));
        }
        if ntype.is_empty() {
            return Err(EmbedError::Load(format!("node {} has an empty type", id)));
        }
        let idx = self.graph.add_node(KNode::new(id, ntype));
        self.nodeset.insert(id.to_string(), idx);
        Ok(idx)
    } // end of add_node

    /// adds a directed edge from source to target. Both nodes must have been declared.
    pub fn add_edge(&mut self, source: &str, target: &str, relation: &str) -> Result<()> {
        let s = self.nodeset.get(source).copied();
        let t = self.nodeset.get(target).copied();
        match (s, t) {
            (Some(s), Some(t)) => {
                if relation.is_empty() {
                    return Err(EmbedError::Load(format!(
                        "edge {} -> {} has an empty relation type",
                        source, target
                    )));
                }
                self.graph.add_edge(s, t, KEdge::new(relation));
                Ok(())
            }
            _ => {
                log::error!("edge {} -> {} has an undeclared extremity", source, target);
                Err(EmbedError::Load(format!(
                    "edge {} -> {} has an undeclared extremity",
                    source, target
                )))
            }
        }
    } // end of add_edge

    pub fn nb_nodes(&self) -> usize {
        self.graph.node_count()
    }

    pub fn nb_edges(&self) -> usize {
        self.graph.edge_count()
    }

    /// NodeIndex of a node identity
    pub fn get_node_index(&self, id: &str) -> Option<NodeIndex> {
        self.nodeset.get(id).copied()
    }

    /// node data of a NodeIndex
    pub fn get_node(&self, idx: NodeIndex) -> &KNode {
        &self.graph[idx]
    }

    /// type of a node given its identity
    pub fn get_node_type(&self, id: &str) -> Option<&str> {
        self.nodeset
            .get(id)
            .map(|idx| self.graph[*idx].get_type())
    }

    /// node identities in graph-native (insertion) order
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodeset.keys().map(|s| s.as_str())
    }

    /// NodeIndex in graph-native (insertion) order
    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.nodeset.values().copied()
    }

    /// iterates on edges as (source identity, relation, target identity), in edge insertion order
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.graph.edge_references().map(move |e| {
            (
                self.graph[e.source()].get_id(),
                e.weight().get_relation(),
                self.graph[e.target()].get_id(),
            )
        })
    }

    /// edges going out of node
    pub fn out_edges(&self, idx: NodeIndex) -> impl Iterator<Item = EdgeReference<'_, KEdge>> {
        self.graph.edges_directed(idx, Direction::Outgoing)
    }

    /// edges coming into node
    pub fn in_edges(&self, idx: NodeIndex) -> impl Iterator<Item = EdgeReference<'_, KEdge>> {
        self.graph.edges_directed(idx, Direction::Incoming)
    }

    /// true if node has neither in nor out edge
    pub fn is_isolated(&self, idx: NodeIndex) -> bool {
        self.out_edges(idx).next().is_none() && self.in_edges(idx).next().is_none()
    }

    /// the distinct node types in first seen order
    pub fn node_types(&self) -> Vec<&str> {
        let mut types = indexmap::IndexSet::<&str>::new();
        for idx in self.node_indices() {
            types.insert(self.graph[idx].get_type());
        }
        types.into_iter().collect()
    }

    /// access to the underlying petgraph
    pub fn as_petgraph(&self) -> &DiGraph<KNode, KEdge> {
        &self.graph
    }
} // end of impl KGraph


//=============================================================================


// end of mod tests
