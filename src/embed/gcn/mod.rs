//! Graph convolution link predictor (GCN).
//!
//! Nodes get random gaussian features. A 2 layers graph convolution encoder
//! Z = Â relu(Â X W1 + b1) W2 + b2, with Â = D^-1/2 (A + I) D^-1/2 the normalized adjacency of
//! undirected training pairs, is trained to predict links with a dot product decoder and a binary
//! cross entropy with logits against negatives resampled at each epoch.
//!
//! Node pairs (unordered, self loops dropped) are split 80/10/10. Validation AUC is logged at each epoch,
//! test AUC after training, both are observational only.
//! The embedding is a last encoder pass using all pairs of the graph.

use std::time::SystemTime;

use ahash::AHashSet;
use cpu_time::ProcessTime;
use indexmap::IndexSet;

use ndarray::{Array2, Axis};
use rayon::prelude::*;
use sprs::{CsMatI, TriMatI};

use rand::distributions::{Distribution, Uniform};
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::embed::optim::Adam;
use crate::embedder::{EmbedderT, GCN};
use crate::embedding::EmbeddingTable;
use crate::errors::{EmbedError, Result};
use crate::graph::KGraph;
use crate::sampling::negative::{sample_non_edges, undirected};
use crate::tools::idmap::IdMap;
use crate::tools::triples::coverage_split;
use crate::validation::auc::roc_auc;

pub mod params;

pub use params::GcnParams;

/// distinct unordered pairs of node ranks linked by some edge, self loops excluded. First seen order.
pub(crate) fn undirected_pairs(graph: &KGraph, idmap: &IdMap) -> Result<IndexSet<(usize, usize)>> {
    let mut pairs = IndexSet::<(usize, usize)>::with_capacity(graph.nb_edges());
    for (source, relation, target) in graph.edges() {
        match (idmap.get_node_rank(source), idmap.get_node_rank(target)) {
            (Some(s), Some(t)) => {
                if s != t {
                    pairs.insert(undirected(s, t));
                }
            }
            _ => {
                return Err(EmbedError::Load(format!(
                    "edge {} -[{}]-> {} has an extremity missing in indexation",
                    source, relation, target
                )));
            }
        }
    }
    Ok(pairs)
} // end of undirected_pairs

/// D^-1/2 (A + I) D^-1/2 where A is the symmetric adjacency of pairs (which must be distinct and without self loop)
pub(crate) fn normalized_adjacency(nb_nodes: usize, pairs: &[(usize, usize)]) -> CsMatI<f32, usize> {
    let mut degrees = vec![1f32; nb_nodes];
    for (a, b) in pairs {
        degrees[*a] += 1.;
        degrees[*b] += 1.;
    }
    let nb_values = nb_nodes + 2 * pairs.len();
    let mut rows = Vec::<usize>::with_capacity(nb_values);
    let mut cols = Vec::<usize>::with_capacity(nb_values);
    let mut values = Vec::<f32>::with_capacity(nb_values);
    for (i, d) in degrees.iter().enumerate() {
        rows.push(i);
        cols.push(i);
        values.push(1. / d);
    }
    for (a, b) in pairs {
        let v = 1. / (degrees[*a] * degrees[*b]).sqrt();
        rows.push(*a);
        cols.push(*b);
        values.push(v);
        rows.push(*b);
        cols.push(*a);
        values.push(v);
    }
    let trimat = TriMatI::<f32, usize>::from_triplets((nb_nodes, nb_nodes), rows, cols, values);
    trimat.to_csr()
} // end of normalized_adjacency

/// sparse by dense product, rows in parallel
pub(crate) fn spmm(adj: &CsMatI<f32, usize>, dense: &Array2<f32>) -> Array2<f32> {
    let mut out = Array2::<f32>::zeros((adj.rows(), dense.ncols()));
    out.axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(row, mut out_row)| {
            if let Some(adj_row) = adj.outer_view(row) {
                for (col, val) in adj_row.iter() {
                    out_row.scaled_add(*val, &dense.row(col));
                }
            }
        });
    out
} // end of spmm

fn glorot(fan_in: usize, fan_out: usize, rng: &mut Xoshiro256PlusPlus) -> Array2<f32> {
    let bound = (6. / (fan_in + fan_out) as f32).sqrt();
    let law = Uniform::new_inclusive(-bound, bound);
    Array2::from_shape_fn((fan_in, fan_out), |_| law.sample(rng))
}

/// numerically stable binary cross entropy with logits
fn bce_with_logits(x: f32, y: f32) -> f32 {
    x.max(0.) - x * y + (-x.abs()).exp().ln_1p()
}

fn sigmoid(x: f32) -> f32 {
    1. / (1. + (-x).exp())
}

// intermediate results of the encoder needed for the backward pass
struct Forward {
    /// Â X W1 + b1
    h1: Array2<f32>,
    /// Â relu(h1)
    p1: Array2<f32>,
    /// embedding
    z: Array2<f32>,
}

struct Gradients {
    w1: Array2<f32>,
    b1: Array2<f32>,
    w2: Array2<f32>,
    b2: Array2<f32>,
}

/// the 2 layers encoder. Biases are 1 row matrices.
struct GcnEncoder {
    w1: Array2<f32>,
    b1: Array2<f32>,
    w2: Array2<f32>,
    b2: Array2<f32>,
}

impl GcnEncoder {
    fn new(params: &GcnParams, rng: &mut Xoshiro256PlusPlus) -> Self {
        GcnEncoder {
            w1: glorot(params.get_feature_dim(), params.get_hidden_dim(), rng),
            b1: Array2::zeros((1, params.get_hidden_dim())),
            w2: glorot(params.get_hidden_dim(), params.get_output_dim(), rng),
            b2: Array2::zeros((1, params.get_output_dim())),
        }
    }

    /// ax is Â X, the propagated features
    fn forward(&self, adj: &CsMatI<f32, usize>, ax: &Array2<f32>) -> Forward {
        let h1 = ax.dot(&self.w1) + &self.b1;
        let z1 = h1.mapv(|x| x.max(0.));
        let p1 = spmm(adj, &z1);
        let z = p1.dot(&self.w2) + &self.b2;
        Forward { h1, p1, z }
    }

    /// dz is the gradient of loss with respect to the embedding
    fn backward(&self, adj: &CsMatI<f32, usize>, ax: &Array2<f32>, fwd: &Forward, dz: &Array2<f32>) -> Gradients {
        let w2 = fwd.p1.t().dot(dz);
        let b2 = dz.sum_axis(Axis(0)).insert_axis(Axis(0));
        let dp1 = dz.dot(&self.w2.t());
        // Â is symmetric
        let mut dh1 = spmm(adj, &dp1);
        ndarray::Zip::from(&mut dh1).and(&fwd.h1).for_each(|d, h| {
            if *h <= 0. {
                *d = 0.;
            }
        });
        let w1 = ax.t().dot(&dh1);
        let b1 = dh1.sum_axis(Axis(0)).insert_axis(Axis(0));
        Gradients { w1, b1, w2, b2 }
    } // end of backward
} // end of impl GcnEncoder

/// logits of pairs
fn decode(z: &Array2<f32>, pairs: &[(usize, usize)]) -> Vec<f32> {
    pairs.iter().map(|(a, b)| z.row(*a).dot(&z.row(*b))).collect()
}

/// mean loss and its gradient with respect to z
fn link_loss(z: &Array2<f32>, pairs: &[(usize, usize)], labels: &[f32]) -> (f64, Array2<f32>) {
    let logits = decode(z, pairs);
    let mut dz = Array2::<f32>::zeros(z.dim());
    let coef = 1. / pairs.len().max(1) as f32;
    let mut loss = 0f64;
    for (((a, b), x), y) in pairs.iter().zip(logits.iter()).zip(labels.iter()) {
        loss += bce_with_logits(*x, *y) as f64;
        let g = (sigmoid(*x) - y) * coef;
        let (za, zb) = (z.row(*a).to_owned(), z.row(*b).to_owned());
        dz.row_mut(*a).scaled_add(g, &zb);
        dz.row_mut(*b).scaled_add(g, &za);
    }
    (loss * coef as f64, dz)
} // end of link_loss

/// AUC of positives against negatives, None (and a warning) if it cannot be computed
fn link_auc(z: &Array2<f32>, positives: &[(usize, usize)], negatives: &[(usize, usize)]) -> Option<f64> {
    let mut labels = vec![true; positives.len()];
    labels.extend(std::iter::repeat(false).take(negatives.len()));
    let mut scores = decode(z, positives);
    scores.extend(decode(z, negatives));
    match roc_auc(GCN, &labels, &scores) {
        Ok(auc) => Some(auc),
        Err(e) => {
            log::warn!("auc not available : {}", e);
            None
        }
    }
}

/// what a training run produces
pub(crate) struct GcnFit {
    pub(crate) idmap: IdMap,
    pub(crate) embedding: Array2<f32>,
    pub(crate) train_losses: Vec<f64>,
    pub(crate) test_auc: Option<f64>,
}

/// The GCN strategy
pub struct GcnEmbedder {
    params: GcnParams,
    seed: u64,
}

impl GcnEmbedder {
    pub fn new(params: GcnParams, seed: u64) -> Self {
        GcnEmbedder { params, seed }
    }

    pub fn get_params(&self) -> &GcnParams {
        &self.params
    }

    pub(crate) fn fit(&self, graph: &KGraph, epochs: usize) -> Result<GcnFit> {
        let params = &self.params;
        if params.get_feature_dim() == 0 || params.get_hidden_dim() == 0 || params.get_output_dim() == 0 {
            return Err(EmbedError::training(GCN, "layer dimensions must be positive"));
        }
        let idmap = IdMap::from_graph(graph);
        let nb_nodes = idmap.get_nb_nodes();
        let pairs: Vec<(usize, usize)> = undirected_pairs(graph, &idmap)?.into_iter().collect();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.seed);
        let split = coverage_split(&pairs, |_| Vec::<usize>::new(), &mut rng, GCN)?;
        // evaluation negatives, as many as positives, among non edges of the whole graph
        let all_pairs: AHashSet<(usize, usize)> = pairs.iter().copied().collect();
        let mut eval_negatives = sample_non_edges(nb_nodes, &all_pairs, split.valid.len() + split.test.len(), &mut rng);
        let test_negatives = eval_negatives.split_off(split.valid.len().min(eval_negatives.len()));
        let valid_negatives = eval_negatives;
        //
        let features = Array2::<f32>::from_shape_fn((nb_nodes, params.get_feature_dim()), |_| {
            rng.sample::<f32, _>(StandardNormal)
        });
        let mut encoder = GcnEncoder::new(params, &mut rng);
        let lr = params.get_learning_rate();
        let mut adam_w1 = Adam::new(encoder.w1.dim(), lr);
        let mut adam_b1 = Adam::new(encoder.b1.dim(), lr);
        let mut adam_w2 = Adam::new(encoder.w2.dim(), lr);
        let mut adam_b2 = Adam::new(encoder.b2.dim(), lr);
        //
        let train_adj = normalized_adjacency(nb_nodes, &split.train);
        let train_ax = spmm(&train_adj, &features);
        let train_set: AHashSet<(usize, usize)> = split.train.iter().copied().collect();
        let mut train_losses = Vec::<f64>::with_capacity(epochs);
        for epoch in 1..=epochs {
            let negatives = sample_non_edges(nb_nodes, &train_set, split.train.len(), &mut rng);
            let mut batch = split.train.clone();
            batch.extend_from_slice(&negatives);
            let mut labels = vec![1f32; split.train.len()];
            labels.extend(std::iter::repeat(0.).take(negatives.len()));
            //
            let fwd = encoder.forward(&train_adj, &train_ax);
            let (loss, dz) = link_loss(&fwd.z, &batch, &labels);
            if !loss.is_finite() {
                log::error!("GCN diverged at epoch {}", epoch);
                return Err(EmbedError::training(GCN, format!("loss diverged at epoch {}", epoch)));
            }
            let grads = encoder.backward(&train_adj, &train_ax, &fwd, &dz);
            adam_w1.step(&mut encoder.w1, &grads.w1);
            adam_b1.step(&mut encoder.b1, &grads.b1);
            adam_w2.step(&mut encoder.w2, &grads.w2);
            adam_b2.step(&mut encoder.b2, &grads.b2);
            //
            let z = encoder.forward(&train_adj, &train_ax).z;
            let val_auc = link_auc(&z, &split.valid, &valid_negatives).unwrap_or(f64::NAN);
            log::info!("Epoch: {:03}, Train Loss: {:.3}, Val AUC: {:.3}", epoch, loss, val_auc);
            train_losses.push(loss);
        }
        // test messages go through training and validation pairs
        let mut test_pairs = split.train.clone();
        test_pairs.extend_from_slice(&split.valid);
        let test_adj = normalized_adjacency(nb_nodes, &test_pairs);
        let z = encoder.forward(&test_adj, &spmm(&test_adj, &features)).z;
        let test_auc = link_auc(&z, &split.test, &test_negatives);
        match test_auc {
            Some(auc) => log::info!("GCN test AUC : {:.3}", auc),
            None => log::info!("GCN test AUC not available"),
        }
        //
        let full_adj = normalized_adjacency(nb_nodes, &pairs);
        let embedding = encoder.forward(&full_adj, &spmm(&full_adj, &features)).z;
        Ok(GcnFit {
            idmap,
            embedding,
            train_losses,
            test_auc,
        })
    } // end of fit
} // end of impl GcnEmbedder

impl EmbedderT for GcnEmbedder {
    fn name(&self) -> &'static str {
        GCN
    }

    fn embed(&mut self, graph: &KGraph, epochs: usize) -> Result<EmbeddingTable> {
        log::info!("GcnEmbedder::embed, epochs : {}, params : {:?}", epochs, self.params);
        let cpu_start = ProcessTime::now();
        let sys_start = SystemTime::now();
        let fit = self.fit(graph, epochs)?;
        log::info!(
            "GcnEmbedder::embed done, sys time(ms) {:?} cpu time(ms) {:?}",
            sys_start.elapsed().map(|d| d.as_millis()).unwrap_or(0),
            cpu_start.elapsed().as_millis()
        );
        EmbeddingTable::new(GCN, fit.idmap.into_node_indexation(), fit.embedding)
    }
} // end of impl EmbedderT for GcnEmbedder

//=====================================================================================

// end of mod tests
