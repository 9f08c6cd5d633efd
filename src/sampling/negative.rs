//! Negative sampling.
//!
//! 2 modes :
//! - a batch stream for the dot-product embedding. Each batch has n_positive true pairs drawn
//!   (without replacement) from the pair list, and n_positive * negative_ratio random pairs
//!   that are not true pairs. The stream is bounded by an explicit number of steps.
//! - a structural sampler for the graph convolution link predictor, drawing undirected non-edges.
//!
//! **The negative draw of a batch is a rejection loop without iteration cap** : it never ends on
//! a graph where every (head, tail) pair is a true pair, and slows down as the density of true pairs
//! approaches 1. A fully saturated pair set is refused at construction, a dense one is logged.

use ahash::AHashSet;

use rand::distributions::{Distribution, Uniform};
use rand::seq::SliceRandom;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::errors::{EmbedError, Result};
use crate::tools::triples::Triple;

/// density of true pairs above which a warning is logged
pub const DENSITY_WARNING: f64 = 0.5;

/// the (head, tail) pairs of a list of triples. Relations are forgotten.
pub struct TruePairs {
    /// one pair by triple, duplicates kept
    pairs: Vec<(usize, usize)>,
    /// distinct pairs
    set: AHashSet<(usize, usize)>,
} // end of TruePairs

impl TruePairs {
    pub fn new(triples: &[Triple]) -> Self {
        let pairs: Vec<(usize, usize)> = triples.iter().map(|t| (t.head, t.tail)).collect();
        let set: AHashSet<(usize, usize)> = pairs.iter().copied().collect();
        TruePairs { pairs, set }
    }

    /// number of pairs, one by triple
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// number of distinct pairs
    pub fn nb_distinct(&self) -> usize {
        self.set.len()
    }

    pub fn contains(&self, head: usize, tail: usize) -> bool {
        self.set.contains(&(head, tail))
    }

    /// fraction of the nb_entities * nb_entities ordered pairs that are true pairs
    pub fn density(&self, nb_entities: usize) -> f64 {
        if nb_entities == 0 {
            return 1.;
        }
        self.set.len() as f64 / (nb_entities as f64 * nb_entities as f64)
    }
} // end of impl TruePairs

/// a row of a batch. label is 1. for a true pair, -1. for a negative one.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LabeledPair {
    pub head: usize,
    pub tail: usize,
    pub label: f32,
}

/// A bounded stream of shuffled labeled batches.
pub struct BatchStream<'a> {
    pairs: &'a TruePairs,
    n_positive: usize,
    negative_ratio: usize,
    /// number of batches still to produce
    steps_left: usize,
    entity_law: Uniform<usize>,
    rng: Xoshiro256PlusPlus,
} // end of BatchStream

impl<'a> BatchStream<'a> {
    /// pairs : true pairs on entities [0, nb_entities).
    /// n_positive must be in [1, pairs.len()]. steps is the number of batches the stream yields.
    pub fn new(
        model: &str,
        pairs: &'a TruePairs,
        nb_entities: usize,
        n_positive: usize,
        negative_ratio: usize,
        steps: usize,
        rng: Xoshiro256PlusPlus,
    ) -> Result<Self> {
        if nb_entities == 0 || pairs.is_empty() {
            return Err(EmbedError::training(model, "no true pair to sample from"));
        }
        if n_positive == 0 || n_positive > pairs.len() {
            return Err(EmbedError::training(
                model,
                format!("n_positive {} must be in [1, {}]", n_positive, pairs.len()),
            ));
        }
        let density = pairs.density(nb_entities);
        if negative_ratio > 0 && pairs.nb_distinct() >= nb_entities * nb_entities {
            log::error!("BatchStream : all {} entity pairs are true pairs", nb_entities * nb_entities);
            return Err(EmbedError::training(
                model,
                "every entity pair is a true pair, no negative pair can be drawn",
            ));
        }
        if density > DENSITY_WARNING {
            log::warn!(
                "BatchStream : true pair density {:.3e}, negative rejection sampling will be slow",
                density
            );
        }
        log::debug!(
            "BatchStream n_positive : {}, negative_ratio : {}, steps : {}, density : {:.3e}",
            n_positive,
            negative_ratio,
            steps,
            density
        );
        Ok(BatchStream {
            pairs,
            n_positive,
            negative_ratio,
            steps_left: steps,
            entity_law: Uniform::new(0, nb_entities),
            rng,
        })
    } // end of new

    /// number of rows of a batch
    pub fn batch_size(&self) -> usize {
        self.n_positive * (1 + self.negative_ratio)
    }

    // draws a batch, ignoring the step budget
    fn draw_batch(&mut self) -> Vec<LabeledPair> {
        let mut batch = Vec::<LabeledPair>::with_capacity(self.batch_size());
        let positives = rand::seq::index::sample(&mut self.rng, self.pairs.len(), self.n_positive);
        for i in positives.iter() {
            let (head, tail) = self.pairs.pairs[i];
            batch.push(LabeledPair { head, tail, label: 1. });
        }
        let mut nb_rejected: usize = 0;
        while batch.len() < self.batch_size() {
            let head = self.entity_law.sample(&mut self.rng);
            let tail = self.entity_law.sample(&mut self.rng);
            if self.pairs.contains(head, tail) {
                nb_rejected += 1;
                continue;
            }
            batch.push(LabeledPair { head, tail, label: -1. });
        }
        log::trace!("draw_batch, nb rejected : {}", nb_rejected);
        batch.shuffle(&mut self.rng);
        batch
    } // end of draw_batch
} // end of impl BatchStream

impl<'a> Iterator for BatchStream<'a> {
    type Item = Vec<LabeledPair>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.steps_left == 0 {
            return None;
        }
        self.steps_left -= 1;
        Some(self.draw_batch())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.steps_left, Some(self.steps_left))
    }
} // end of impl Iterator for BatchStream

impl<'a> ExactSizeIterator for BatchStream<'a> {}

//=====================================================================================

/// undirected pair with smallest node first
pub fn undirected(a: usize, b: usize) -> (usize, usize) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// draws up to nb distinct undirected pairs of distinct nodes in [0, nb_nodes) not in forbidden.
/// forbidden must contain pairs in [undirected] form.
/// The number of draws is bounded, so on a dense graph less than nb pairs can be returned.
pub fn sample_non_edges(
    nb_nodes: usize,
    forbidden: &AHashSet<(usize, usize)>,
    nb: usize,
    rng: &mut Xoshiro256PlusPlus,
) -> Vec<(usize, usize)> {
    let mut sampled = AHashSet::<(usize, usize)>::with_capacity(nb);
    let mut non_edges = Vec::<(usize, usize)>::with_capacity(nb);
    if nb_nodes < 2 || nb == 0 {
        return non_edges;
    }
    let node_law = Uniform::new(0, nb_nodes);
    let max_draws = 10 * nb + 100;
    let mut nb_draws = 0;
    while non_edges.len() < nb && nb_draws < max_draws {
        nb_draws += 1;
        let a = node_law.sample(rng);
        let b = node_law.sample(rng);
        if a == b {
            continue;
        }
        let pair = undirected(a, b);
        if forbidden.contains(&pair) || !sampled.insert(pair) {
            continue;
        }
        non_edges.push(pair);
    }
    if non_edges.len() < nb {
        log::warn!(
            "sample_non_edges : got only {} non edges out of {} asked",
            non_edges.len(),
            nb
        );
    }
    non_edges
} // end of sample_non_edges

//=====================================================================================

// end of mod tests
