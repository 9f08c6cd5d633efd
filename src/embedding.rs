//! Describes the embedded vectors produced by a training strategy.
//!
//! Embedded vectors are stored in an Array2\<f32\>, each row corresponds to a node.
//! The association between node identities and rows is kept in an IndexSet :
//! given a node id we get its rank in the Array using IndexSet::get_index_of,
//! given a rank we get the original node id by using IndexSet::get_index.
//!
//! Some strategies (skip-gram over walks, dot-product embedding) do not see nodes without edges.
//! These nodes are absent from the table, [EmbeddingTable::missing_nodes] lists them.

use indexmap::IndexSet;
use ndarray::{Array2, ArrayView1};

use crate::errors::{EmbedError, Result};
use crate::graph::KGraph;

/// The structure collecting the result of the embedding process
#[derive(Debug)]
pub struct EmbeddingTable {
    /// association of node id to a rank (row) in data
    nodeindexation: IndexSet<String>,
    /// array (n,d) with n number of nodes, d dimension of embedding
    data: Array2<f32>,
    /// name of strategy that produced the table
    model: String,
} // end of EmbeddingTable

impl EmbeddingTable {
    /// The number of rows of data must be equal to the size of nodeindexation
    pub fn new(model: &str, nodeindexation: IndexSet<String>, data: Array2<f32>) -> Result<Self> {
        if nodeindexation.len() != data.nrows() {
            log::error!(
                "EmbeddingTable::new indexation size {} , nb rows {}",
                nodeindexation.len(),
                data.nrows()
            );
            return Err(EmbedError::training(
                model,
                format!(
                    "indexation has {} nodes, embedded data has {} rows",
                    nodeindexation.len(),
                    data.nrows()
                ),
            ));
        }
        if data.iter().any(|x| !x.is_finite()) {
            log::error!("EmbeddingTable::new, model {} produced non finite values", model);
            return Err(EmbedError::training(model, "numerical divergence, non finite embedded values"));
        }
        Ok(EmbeddingTable {
            nodeindexation,
            data,
            model: model.to_string(),
        })
    } // end of new

    /// name of the strategy that produced the table
    pub fn get_model(&self) -> &str {
        &self.model
    }

    /// get dimension of vectors
    pub fn get_dimension(&self) -> usize {
        self.data.ncols()
    }

    /// get number of embedded nodes
    pub fn get_nb_nodes(&self) -> usize {
        self.data.nrows()
    }

    /// embedded vector of a node, None if the node was not embedded
    pub fn get(&self, node_id: &str) -> Option<ArrayView1<f32>> {
        self.nodeindexation
            .get_index_of(node_id)
            .map(|rank| self.data.row(rank))
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.nodeindexation.contains(node_id)
    }

    /// node identities in row order
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodeindexation.iter().map(|s| s.as_str())
    }

    /// get rank of a node_id
    pub fn get_node_rank(&self, node_id: &str) -> Option<usize> {
        self.nodeindexation.get_index_of(node_id)
    }

    /// get node_id given its rank in indexation (and matrix representation)
    pub fn get_node_id(&self, rank: usize) -> Option<&str> {
        self.nodeindexation.get_index(rank).map(|s| s.as_str())
    }

    /// to retrieve the indexation
    pub fn get_node_indexation(&self) -> &IndexSet<String> {
        &self.nodeindexation
    }

    /// retrieves the embedded data
    pub fn get_embedded_data(&self) -> &Array2<f32> {
        &self.data
    }

    /// nodes of graph that have no vector in the table, in graph order.
    pub fn missing_nodes<'a>(&self, graph: &'a KGraph) -> Vec<&'a str> {
        graph
            .node_ids()
            .filter(|id| !self.nodeindexation.contains(*id))
            .collect()
    } // end of missing_nodes

    /// cosine similarity between embedded vectors of 2 nodes. None if a node is missing or a vector is null
    pub fn cosine_similarity(&self, node1: &str, node2: &str) -> Option<f32> {
        let v1 = self.get(node1)?;
        let v2 = self.get(node2)?;
        let n1 = v1.dot(&v1).sqrt();
        let n2 = v2.dot(&v2).sqrt();
        if n1 <= 0. || n2 <= 0. {
            return None;
        }
        Some(v1.dot(&v2) / (n1 * n2))
    } // end of cosine_similarity
} // end of impl EmbeddingTable

//========================================================================================

#[cfg(test)]
mod tests {

    use super::*;
    use ndarray::array;

    use crate::graph::testgraph;

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn small_table() -> EmbeddingTable {
        let ids: IndexSet<String> = ["aspirin", "COX1", "COX2"].iter().map(|s| s.to_string()).collect();
        let data = array![[1., 0.], [0., 1.], [1., 1.]];
        EmbeddingTable::new("test", ids, data).unwrap()
    }

    #[test]
    fn test_table_access() {
        log_init_test();
        //
        let table = small_table();
        assert_eq!(table.get_nb_nodes(), 3);
        assert_eq!(table.get_dimension(), 2);
        assert_eq!(table.get_node_rank("COX1"), Some(1));
        assert_eq!(table.get_node_id(2), Some("COX2"));
        assert!(table.contains("aspirin"));
        assert!(table.get("orphan").is_none());
        assert_eq!(table.get("COX2").unwrap().to_vec(), vec![1., 1.]);
        let sim = table.cosine_similarity("aspirin", "COX1").unwrap();
        assert!(sim.abs() < 1.0e-6);
        let sim = table.cosine_similarity("aspirin", "COX2").unwrap();
        assert!((sim - std::f32::consts::FRAC_1_SQRT_2).abs() < 1.0e-5);
    }

    #[test]
    fn test_size_mismatch() {
        log_init_test();
        let ids: IndexSet<String> = ["a"].iter().map(|s| s.to_string()).collect();
        let res = EmbeddingTable::new("test", ids, Array2::zeros((2, 4)));
        assert!(res.unwrap_err().is_training());
    }

    #[test]
    fn test_missing_nodes() {
        log_init_test();
        //
        let graph = testgraph::with_isolated();
        let ids: IndexSet<String> = graph
            .node_ids()
            .filter(|id| *id != "orphan")
            .map(|s| s.to_string())
            .collect();
        let data = Array2::<f32>::zeros((ids.len(), 3));
        let table = EmbeddingTable::new("test", ids, data).unwrap();
        assert_eq!(table.missing_nodes(&graph), vec!["orphan"]);
    }
} // end of mod tests
