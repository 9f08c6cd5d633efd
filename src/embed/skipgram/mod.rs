//! Skip-gram with negative sampling over a corpus of typed random walks (BioKG2Vec).
//!
//! Walks are the sentences and nodes the words :
//! - the vocabulary is made of nodes seen at least min_count times in walks, sorted by decreasing
//!   frequency (ties in first seen order).
//! - each (node, context node) pair in a window is a positive example, negative nodes are drawn
//!   from the unigram distribution raised to the power 0.75.
//!
//! Nodes not visited by any walk (isolated nodes in particular) are absent from the output table.

use std::time::SystemTime;

use ahash::AHashMap;
use cpu_time::ProcessTime;
use indexmap::{IndexMap, IndexSet};

use ndarray::{Array1, Array2};
use petgraph::graph::NodeIndex;

use rand::distributions::{Distribution, Uniform, WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::embedder::{EmbedderT, BIOKG2VEC};
use crate::embedding::EmbeddingTable;
use crate::errors::{EmbedError, Result};
use crate::graph::KGraph;
use crate::walk::{TypedWalker, Walk};

pub mod params;

pub use params::SkipGramParams;

/// nodes of the corpus with their count, sorted by decreasing count, ties in first seen order.
pub(crate) fn build_vocabulary(corpus: &[Walk], min_count: usize) -> Vec<(NodeIndex, u64)> {
    let mut counts = IndexMap::<NodeIndex, u64>::new();
    for walk in corpus {
        for node in walk {
            *counts.entry(*node).or_insert(0) += 1;
        }
    }
    let mut vocabulary: Vec<(NodeIndex, u64)> = counts
        .into_iter()
        .filter(|(_, c)| *c >= min_count as u64)
        .collect();
    // stable sort keeps first seen order for equal counts
    vocabulary.sort_by(|a, b| b.1.cmp(&a.1));
    vocabulary
} // end of build_vocabulary

fn sigmoid(x: f32) -> f32 {
    1. / (1. + (-x).exp())
}

// the 2 weight matrices and the negative sampling law
struct SkipGram {
    /// input vectors, the embedding
    syn0: Array2<f32>,
    /// output vectors used for negative sampling
    syn1neg: Array2<f32>,
    neg_law: WeightedIndex<f64>,
    window: usize,
    negative: usize,
}

impl SkipGram {
    fn new(counts: &[u64], dimension: usize, window: usize, negative: usize, rng: &mut Xoshiro256PlusPlus) -> Result<Self> {
        let nb_words = counts.len();
        let init = Uniform::new(-0.5 / dimension as f32, 0.5 / dimension as f32);
        let syn0 = Array2::from_shape_fn((nb_words, dimension), |_| init.sample(rng));
        let syn1neg = Array2::<f32>::zeros((nb_words, dimension));
        let weights: Vec<f64> = counts.iter().map(|c| (*c as f64).powf(0.75)).collect();
        let neg_law = WeightedIndex::new(&weights)
            .map_err(|e| EmbedError::training(BIOKG2VEC, format!("negative sampling table : {}", e)))?;
        Ok(SkipGram {
            syn0,
            syn1neg,
            neg_law,
            window,
            negative,
        })
    }

    /// one (input, target) update with negatives, returns the loss of the positive pair
    fn train_pair(&mut self, input: usize, target: usize, alpha: f32, neu1e: &mut Array1<f32>, rng: &mut Xoshiro256PlusPlus) -> f32 {
        neu1e.fill(0.);
        let mut loss = 0.;
        for d in 0..=self.negative {
            let (out, label) = if d == 0 {
                (target, 1.)
            } else {
                let neg = self.neg_law.sample(rng);
                if neg == target {
                    continue;
                }
                (neg, 0.)
            };
            let f = self.syn0.row(input).dot(&self.syn1neg.row(out));
            let s = sigmoid(f);
            if d == 0 {
                loss = -(s.max(1.0e-7)).ln();
            }
            let g = (label - s) * alpha;
            neu1e.scaled_add(g, &self.syn1neg.row(out));
            let l1 = self.syn0.row(input).to_owned();
            self.syn1neg.row_mut(out).scaled_add(g, &l1);
        }
        self.syn0.row_mut(input).scaled_add(1., &*neu1e);
        loss
    } // end of train_pair

    /// trains on one sentence of vocabulary ranks, returns accumulated loss and number of pairs
    fn train_sentence(&mut self, sentence: &[usize], alpha: f32, neu1e: &mut Array1<f32>, rng: &mut Xoshiro256PlusPlus) -> (f64, usize) {
        let mut loss = 0f64;
        let mut nb_pairs = 0;
        if self.window == 0 {
            return (loss, nb_pairs);
        }
        for (i, center) in sentence.iter().enumerate() {
            let reduced = self.window - rng.gen_range(0..self.window);
            let first = i.saturating_sub(reduced);
            let last = (i + reduced).min(sentence.len() - 1);
            for j in first..=last {
                if j == i {
                    continue;
                }
                // context vector predicts center
                loss += self.train_pair(sentence[j], *center, alpha, neu1e, rng) as f64;
                nb_pairs += 1;
            }
        }
        (loss, nb_pairs)
    } // end of train_sentence
} // end of impl SkipGram

/// The BioKG2Vec strategy
pub struct SkipGramEmbedder {
    params: SkipGramParams,
    seed: u64,
}

impl SkipGramEmbedder {
    pub fn new(params: SkipGramParams, seed: u64) -> Self {
        SkipGramEmbedder { params, seed }
    }

    pub fn get_params(&self) -> &SkipGramParams {
        &self.params
    }
} // end of impl SkipGramEmbedder

impl EmbedderT for SkipGramEmbedder {
    fn name(&self) -> &'static str {
        BIOKG2VEC
    }

    fn embed(&mut self, graph: &KGraph, epochs: usize) -> Result<EmbeddingTable> {
        //
        log::info!("SkipGramEmbedder::embed, epochs : {}, params : {:?}", epochs, self.params);
        if self.params.get_dimension() == 0 {
            return Err(EmbedError::training(BIOKG2VEC, "embedding dimension must be at least 1"));
        }
        let cpu_start = ProcessTime::now();
        let sys_start = SystemTime::now();
        //
        self.params
            .get_walk_params()
            .get_transitions()
            .check()
            .map_err(|e| EmbedError::training(BIOKG2VEC, e.to_string()))?;
        let walker = TypedWalker::new(graph, self.params.get_walk_params());
        let corpus = walker.generate(self.seed);
        if corpus.is_empty() {
            log::error!("SkipGramEmbedder : no walk could be generated");
            return Err(EmbedError::training(BIOKG2VEC, "no walk could be generated, no traversable edge"));
        }
        let vocabulary = build_vocabulary(&corpus, self.params.get_min_count());
        if vocabulary.is_empty() {
            return Err(EmbedError::training(
                BIOKG2VEC,
                format!("no node seen at least {} times in walks", self.params.get_min_count()),
            ));
        }
        log::info!("vocabulary size : {}, corpus : {} walks", vocabulary.len(), corpus.len());
        let ranks: AHashMap<NodeIndex, usize> = vocabulary
            .iter()
            .enumerate()
            .map(|(rank, (node, _))| (*node, rank))
            .collect();
        let sentences: Vec<Vec<usize>> = corpus
            .iter()
            .map(|walk| walk.iter().filter_map(|n| ranks.get(n).copied()).collect::<Vec<usize>>())
            .filter(|s| s.len() > 1)
            .collect();
        drop(corpus);
        //
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.seed);
        let counts: Vec<u64> = vocabulary.iter().map(|(_, c)| *c).collect();
        let dimension = self.params.get_dimension();
        let mut model = SkipGram::new(
            &counts,
            dimension,
            self.params.get_window(),
            self.params.get_negative(),
            &mut rng,
        )?;
        let nb_words: usize = sentences.iter().map(|s| s.len()).sum();
        let total = (nb_words * epochs).max(1) as f32;
        let (alpha, min_alpha) = (self.params.get_alpha(), self.params.get_min_alpha());
        let mut processed = 0usize;
        let mut neu1e = Array1::<f32>::zeros(dimension);
        for epoch in 0..epochs {
            let mut epoch_loss = 0f64;
            let mut epoch_pairs = 0usize;
            for sentence in &sentences {
                let lr = (alpha - (alpha - min_alpha) * processed as f32 / total).max(min_alpha);
                let (loss, nb_pairs) = model.train_sentence(sentence, lr, &mut neu1e, &mut rng);
                epoch_loss += loss;
                epoch_pairs += nb_pairs;
                processed += sentence.len();
            }
            log::info!(
                "skip-gram epoch {}, mean positive pair loss : {:.5e}, nb pairs : {}",
                epoch,
                epoch_loss / epoch_pairs.max(1) as f64,
                epoch_pairs
            );
        }
        //
        let nodeindexation: IndexSet<String> = vocabulary
            .iter()
            .map(|(node, _)| graph.get_node(*node).get_id().to_string())
            .collect();
        log::info!(
            "SkipGramEmbedder::embed done, sys time(ms) {:?} cpu time(ms) {:?}",
            sys_start.elapsed().map(|d| d.as_millis()).unwrap_or(0),
            cpu_start.elapsed().as_millis()
        );
        EmbeddingTable::new(BIOKG2VEC, nodeindexation, model.syn0)
    } // end of embed
} // end of impl EmbedderT for SkipGramEmbedder

//=====================================================================================

// end of mod tests
