//! Bidirectional mapping between node identities (resp. relation types) and dense ranks.
//!
//! The mapping is rebuilt at each run and never persisted. It is deterministic : for an
//! unmodified graph two builds give the same ranks.
//!
//! Two node enumerations are provided :
//! - [IdMap::from_graph] : all nodes in graph-native (insertion) order, isolated nodes included.
//! - [IdMap::from_edges] : only nodes incident to an edge, in first-seen order over the edge list
//!   (source before target).
//!
//! Relation types are always enumerated in first-seen order over the edge list.

use indexmap::IndexSet;

use crate::graph::KGraph;

/// given a node identity get its rank, given a rank get back the node identity. Same for relations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdMap {
    /// node indexation
    nodes: IndexSet<String>,
    /// relation type indexation
    relations: IndexSet<String>,
} // end of struct IdMap

impl IdMap {
    /// index all nodes of the graph, in graph order.
    pub fn from_graph(graph: &KGraph) -> Self {
        let nodes: IndexSet<String> = graph.node_ids().map(|s| s.to_string()).collect();
        let relations = Self::collect_relations(graph);
        log::debug!(
            "IdMap::from_graph nb nodes : {}, nb relations : {}",
            nodes.len(),
            relations.len()
        );
        IdMap { nodes, relations }
    } // end of from_graph

    /// index nodes incident to at least one edge, first-seen order over edges.
    pub fn from_edges(graph: &KGraph) -> Self {
        let mut nodes = IndexSet::<String>::with_capacity(graph.nb_nodes());
        for (source, _, target) in graph.edges() {
            if !nodes.contains(source) {
                nodes.insert(source.to_string());
            }
            if !nodes.contains(target) {
                nodes.insert(target.to_string());
            }
        }
        let relations = Self::collect_relations(graph);
        log::debug!(
            "IdMap::from_edges nb nodes : {}, nb relations : {}",
            nodes.len(),
            relations.len()
        );
        IdMap { nodes, relations }
    } // end of from_edges

    fn collect_relations(graph: &KGraph) -> IndexSet<String> {
        let mut relations = IndexSet::<String>::new();
        for (_, relation, _) in graph.edges() {
            if !relations.contains(relation) {
                relations.insert(relation.to_string());
            }
        }
        relations
    }

    pub fn get_nb_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn get_nb_relations(&self) -> usize {
        self.relations.len()
    }

    /// rank of a node identity
    pub fn get_node_rank(&self, node_id: &str) -> Option<usize> {
        self.nodes.get_index_of(node_id)
    }

    /// node identity of a rank
    pub fn get_node_id(&self, rank: usize) -> Option<&str> {
        self.nodes.get_index(rank).map(|s| s.as_str())
    }

    /// rank of a relation type
    pub fn get_relation_rank(&self, relation: &str) -> Option<usize> {
        self.relations.get_index_of(relation)
    }

    /// relation type of a rank
    pub fn get_relation(&self, rank: usize) -> Option<&str> {
        self.relations.get_index(rank).map(|s| s.as_str())
    }

    /// to retrieve the node indexation
    pub fn get_node_indexation(&self) -> &IndexSet<String> {
        &self.nodes
    }

    /// consumes the map and returns the node indexation, to be used in an EmbeddingTable
    pub fn into_node_indexation(self) -> IndexSet<String> {
        self.nodes
    }
} // end of impl IdMap

//=====================================================================================

#[cfg(test)]
mod tests {

    use super::*;
    use crate::graph::testgraph;

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_idmap_bijection() {
        log_init_test();
        //
        let graph = testgraph::scenario_a();
        let idmap = IdMap::from_graph(&graph);
        assert_eq!(idmap.get_nb_nodes(), 10);
        assert_eq!(idmap.get_nb_relations(), 2);
        for rank in 0..idmap.get_nb_nodes() {
            let id = idmap.get_node_id(rank).unwrap();
            assert_eq!(idmap.get_node_rank(id), Some(rank));
        }
        for id in graph.node_ids() {
            let rank = idmap.get_node_rank(id).unwrap();
            assert_eq!(idmap.get_node_id(rank), Some(id));
        }
        assert!(idmap.get_node_id(10).is_none());
        assert_eq!(idmap.get_relation(0), Some("targets"));
        assert_eq!(idmap.get_relation_rank("involved_in"), Some(1));
    } // end of test_idmap_bijection

    #[test]
    fn test_idmap_stable() {
        log_init_test();
        //
        let graph = testgraph::with_isolated();
        assert_eq!(IdMap::from_graph(&graph), IdMap::from_graph(&graph));
        assert_eq!(IdMap::from_edges(&graph), IdMap::from_edges(&graph));
    }

    #[test]
    fn test_idmap_from_edges() {
        log_init_test();
        //
        let graph = testgraph::with_isolated();
        let idmap = IdMap::from_edges(&graph);
        assert_eq!(idmap.get_nb_nodes(), graph.nb_nodes() - 1);
        assert!(idmap.get_node_rank("orphan").is_none());
        assert_eq!(idmap.get_node_id(0), Some("aspirin"));
        assert_eq!(idmap.get_node_id(1), Some("COX1"));
        assert_eq!(idmap.get_node_id(2), Some("COX2"));
        assert_eq!(idmap.get_node_id(3), Some("ibuprofen"));
    }
} // end of mod tests
