//! Dot-product neural embedding (DLemb).
//!
//! One embedding matrix is shared by heads and tails. A (head, tail) pair is scored by the cosine
//! of their vectors, trained with a squared error against labels +1 (true pair) and -1 (random non pair).
//! Batches come from a [BatchStream], an epoch is `nb_triples / n_positive` batches.
//!
//! Entities are the nodes incident to at least one edge, isolated nodes are absent from the output.

use std::time::SystemTime;

use cpu_time::ProcessTime;
use indexmap::IndexMap;
use ndarray::{Array1, Array2, ArrayView1};
use rand::distributions::{Distribution, Uniform};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use crate::embed::optim::Adam;
use crate::embedder::{EmbedderT, DLEMB};
use crate::embedding::EmbeddingTable;
use crate::errors::{EmbedError, Result};
use crate::graph::KGraph;
use crate::sampling::negative::{BatchStream, LabeledPair, TruePairs};
use crate::tools::idmap::IdMap;
use crate::tools::triples::extract_triples;

// under this norm a vector is considered null
const NORM_EPSILON: f32 = 1.0e-8;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DlEmbParams {
    /// dimension of embedded vectors
    dimension: usize,
    /// number of true pairs in a batch
    n_positive: usize,
    /// number of negative pairs by true pair
    negative_ratio: usize,
    /// Adam learning rate
    learning_rate: f32,
} // end of DlEmbParams

impl DlEmbParams {
    pub fn new(dimension: usize, n_positive: usize, negative_ratio: usize, learning_rate: f32) -> Self {
        DlEmbParams {
            dimension,
            n_positive,
            negative_ratio,
            learning_rate,
        }
    }

    pub fn get_dimension(&self) -> usize {
        self.dimension
    }

    pub fn get_n_positive(&self) -> usize {
        self.n_positive
    }

    pub fn get_negative_ratio(&self) -> usize {
        self.negative_ratio
    }

    pub fn get_learning_rate(&self) -> f32 {
        self.learning_rate
    }
} // end of impl DlEmbParams

impl Default for DlEmbParams {
    fn default() -> Self {
        DlEmbParams {
            dimension: 100,
            n_positive: 1500,
            negative_ratio: 1,
            learning_rate: 0.001,
        }
    }
}

// cosine and its gradients with respect to u and v
fn cosine_with_gradient(u: ArrayView1<f32>, v: ArrayView1<f32>) -> (f32, Array1<f32>, Array1<f32>) {
    let nu = u.dot(&u).sqrt().max(NORM_EPSILON);
    let nv = v.dot(&v).sqrt().max(NORM_EPSILON);
    let cos = u.dot(&v) / (nu * nv);
    let gu = &v / (nu * nv) - &u * (cos / (nu * nu));
    let gv = &u / (nu * nv) - &v * (cos / (nv * nv));
    (cos, gu, gv)
}

/// one Adam step on a batch, returns the mean squared error of the batch
fn train_batch(embedding: &mut Array2<f32>, batch: &[LabeledPair], adam: &mut Adam) -> f64 {
    let dim = embedding.ncols();
    let mut grads = IndexMap::<usize, Array1<f32>>::new();
    let mut loss = 0f64;
    let coef = 2. / batch.len() as f32;
    for pair in batch {
        let (cos, gu, gv) = cosine_with_gradient(embedding.row(pair.head), embedding.row(pair.tail));
        let err = cos - pair.label;
        loss += (err * err) as f64;
        grads
            .entry(pair.head)
            .or_insert_with(|| Array1::zeros(dim))
            .scaled_add(coef * err, &gu);
        grads
            .entry(pair.tail)
            .or_insert_with(|| Array1::zeros(dim))
            .scaled_add(coef * err, &gv);
    }
    let rows: Vec<usize> = grads.keys().copied().collect();
    let views: Vec<ArrayView1<f32>> = grads.values().map(|g| g.view()).collect();
    adam.step_rows(embedding, &rows, &views);
    loss / batch.len() as f64
} // end of train_batch

/// The DLemb strategy
pub struct DlEmbedder {
    params: DlEmbParams,
    seed: u64,
}

impl DlEmbedder {
    pub fn new(params: DlEmbParams, seed: u64) -> Self {
        DlEmbedder { params, seed }
    }

    pub fn get_params(&self) -> &DlEmbParams {
        &self.params
    }

    /// returns entity indexation, embedding and mean loss by epoch
    pub(crate) fn fit(&self, graph: &KGraph, epochs: usize) -> Result<(IdMap, Array2<f32>, Vec<f64>)> {
        let dimension = self.params.get_dimension();
        if dimension == 0 {
            return Err(EmbedError::training(DLEMB, "dimension must be positive"));
        }
        let idmap = IdMap::from_edges(graph);
        let triples = extract_triples(graph, &idmap)?;
        let pairs = TruePairs::new(&triples);
        if pairs.is_empty() {
            log::error!("DlEmbedder : graph has no edge");
            return Err(EmbedError::training(DLEMB, "graph has no edge"));
        }
        let n_positive = self.params.get_n_positive().min(pairs.len());
        if n_positive < self.params.get_n_positive() {
            log::info!(
                "DlEmbedder : n_positive reduced from {} to number of pairs {}",
                self.params.get_n_positive(),
                n_positive
            );
        }
        let steps = (triples.len() / n_positive.max(1)).max(1);
        let nb_entities = idmap.get_nb_nodes();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.seed);
        let init = Uniform::new(-0.05f32, 0.05);
        let mut embedding = Array2::from_shape_fn((nb_entities, dimension), |_| init.sample(&mut rng));
        let mut stream = BatchStream::new(
            DLEMB,
            &pairs,
            nb_entities,
            n_positive,
            self.params.get_negative_ratio(),
            steps * epochs,
            rng,
        )?;
        log::info!(
            "DlEmbedder : {} entities, {} pairs, batch size {}, {} steps by epoch",
            nb_entities,
            pairs.len(),
            stream.batch_size(),
            steps
        );
        let mut adam = Adam::new(embedding.dim(), self.params.get_learning_rate());
        let mut losses = Vec::<f64>::with_capacity(epochs);
        for epoch in 0..epochs {
            let mut epoch_loss = 0f64;
            let mut nb_batches = 0;
            for batch in stream.by_ref().take(steps) {
                epoch_loss += train_batch(&mut embedding, &batch, &mut adam);
                nb_batches += 1;
            }
            let loss = epoch_loss / nb_batches.max(1) as f64;
            log::info!("DLemb epoch {}, loss : {:.5e}", epoch, loss);
            if !loss.is_finite() {
                return Err(EmbedError::training(DLEMB, format!("loss diverged at epoch {}", epoch)));
            }
            losses.push(loss);
        }
        Ok((idmap, embedding, losses))
    } // end of fit
} // end of impl DlEmbedder

impl EmbedderT for DlEmbedder {
    fn name(&self) -> &'static str {
        DLEMB
    }

    fn embed(&mut self, graph: &KGraph, epochs: usize) -> Result<EmbeddingTable> {
        log::info!("DlEmbedder::embed, epochs : {}, params : {:?}", epochs, self.params);
        let cpu_start = ProcessTime::now();
        let sys_start = SystemTime::now();
        let (idmap, embedding, _) = self.fit(graph, epochs)?;
        log::info!(
            "DlEmbedder::embed done, sys time(ms) {:?} cpu time(ms) {:?}",
            sys_start.elapsed().map(|d| d.as_millis()).unwrap_or(0),
            cpu_start.elapsed().as_millis()
        );
        EmbeddingTable::new(DLEMB, idmap.into_node_indexation(), embedding)
    }
} // end of impl EmbedderT for DlEmbedder

//=====================================================================================

#[cfg(test)]
mod tests {

    use super::*;
    use crate::graph::testgraph;
    use ndarray::array;

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_cosine_gradient() {
        let u = array![0.3f32, -0.7, 0.2];
        let v = array![0.5f32, 0.1, -0.4];
        let (cos, gu, gv) = cosine_with_gradient(u.view(), v.view());
        let eps = 1.0e-3;
        for i in 0..3 {
            let mut up = u.clone();
            up[i] += eps;
            let (cp, _, _) = cosine_with_gradient(up.view(), v.view());
            let mut um = u.clone();
            um[i] -= eps;
            let (cm, _, _) = cosine_with_gradient(um.view(), v.view());
            assert!(((cp - cm) / (2. * eps) - gu[i]).abs() < 1.0e-2);
            let mut vp = v.clone();
            vp[i] += eps;
            let (cp, _, _) = cosine_with_gradient(u.view(), vp.view());
            let mut vm = v.clone();
            vm[i] -= eps;
            let (cm, _, _) = cosine_with_gradient(u.view(), vm.view());
            assert!(((cp - cm) / (2. * eps) - gv[i]).abs() < 1.0e-2);
        }
        assert!(cos.abs() <= 1.);
    } // end of test_cosine_gradient

    #[test]
    fn test_isolated_node_absent() {
        log_init_test();
        //
        let graph = testgraph::with_isolated();
        let mut embedder = DlEmbedder::new(DlEmbParams::default(), 14);
        let table = embedder.embed(&graph, 2).unwrap();
        assert_eq!(table.get_nb_nodes(), graph.nb_nodes() - 1);
        assert_eq!(table.get_dimension(), 100);
        assert_eq!(table.missing_nodes(&graph), vec!["orphan"]);
        // first seen order over edges
        assert_eq!(table.get_node_id(0), Some("aspirin"));
        assert_eq!(table.get_node_id(1), Some("COX1"));
    }

    #[test]
    fn test_loss_decreases() {
        log_init_test();
        //
        let graph = testgraph::ring(40);
        let embedder = DlEmbedder::new(DlEmbParams::new(16, 10, 1, 0.01), 5);
        let (idmap, embedding, losses) = embedder.fit(&graph, 60).unwrap();
        assert_eq!(idmap.get_nb_nodes(), 40);
        assert_eq!(embedding.dim(), (40, 16));
        let first: f64 = losses[..5].iter().sum::<f64>() / 5.;
        let last: f64 = losses[55..].iter().sum::<f64>() / 5.;
        log::info!("first losses {:.3e}, last losses {:.3e}", first, last);
        assert!(last < first);
    }

    #[test]
    fn test_saturated_graph() {
        log_init_test();
        //
        let mut graph = KGraph::new();
        graph.add_node("a", "drug").unwrap();
        graph.add_node("b", "drug").unwrap();
        for s in ["a", "b"] {
            for t in ["a", "b"] {
                graph.add_edge(s, t, "similar").unwrap();
            }
        }
        let mut embedder = DlEmbedder::new(DlEmbParams::default(), 1);
        assert!(embedder.embed(&graph, 1).unwrap_err().is_training());
    }
} // end of mod tests
