//! Flattening of the graph into (head, relation, tail) triples and train/validation/test splits.
//!
//! One triple is produced by edge. There is no deduplication : parallel edges with distinct
//! relations give distinct triples, and a duplicated edge gives 2 identical triples.

use std::hash::Hash;

use ahash::AHashSet;

use rand::seq::SliceRandom;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::errors::{EmbedError, Result};
use crate::graph::KGraph;
use crate::tools::idmap::IdMap;

/// An edge expressed with ranks given by an [IdMap]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Triple {
    pub head: usize,
    pub relation: usize,
    pub tail: usize,
}

impl Triple {
    pub fn new(head: usize, relation: usize, tail: usize) -> Self {
        Triple { head, relation, tail }
    }
} // end of impl Triple

/// returns the triples of graph in edge order. All edge extremities and relations must be in idmap.
pub fn extract_triples(graph: &KGraph, idmap: &IdMap) -> Result<Vec<Triple>> {
    let mut triples = Vec::<Triple>::with_capacity(graph.nb_edges());
    for (source, relation, target) in graph.edges() {
        let head = idmap.get_node_rank(source);
        let tail = idmap.get_node_rank(target);
        let rel = idmap.get_relation_rank(relation);
        match (head, rel, tail) {
            (Some(h), Some(r), Some(t)) => triples.push(Triple::new(h, r, t)),
            _ => {
                log::error!("edge {} {} {} not indexed", source, relation, target);
                return Err(EmbedError::Load(format!(
                    "edge {} -[{}]-> {} has an extremity or relation missing in indexation",
                    source, relation, target
                )));
            }
        }
    }
    log::debug!("extract_triples got {} triples", triples.len());
    Ok(triples)
} // end of extract_triples

//=====================================================================================

/// fraction of items going to validation, and to test.
pub const HOLDOUT_FRACTION: f64 = 0.1;

/// result of a split. Training gets the rest.
#[derive(Clone, Debug)]
pub struct DataSplit<T> {
    pub train: Vec<T>,
    pub valid: Vec<T>,
    pub test: Vec<T>,
}

/// A 80/10/10 split that keeps every key (entity, relation ...) returned by `keys` present in training.
///
/// Items are shuffled, then a first pass keeps in training each item that brings a key not yet
/// seen in training. Validation and test take max(1, round(0.1 n)) items each among the remaining ones
/// (reduced to 1 each if the remaining items are too few), the rest goes to training.
/// Fails with a TrainingError with fewer than 3 items or if no validation and test item can be found.
pub fn coverage_split<T, K, F>(
    items: &[T],
    keys: F,
    rng: &mut Xoshiro256PlusPlus,
    model: &str,
) -> Result<DataSplit<T>>
where
    T: Copy,
    K: Hash + Eq,
    F: Fn(&T) -> Vec<K>,
{
    let nb_items = items.len();
    if nb_items < 3 {
        log::error!("coverage_split, model {} : only {} items", model, nb_items);
        return Err(EmbedError::training(
            model,
            format!("cannot split {} items in train/validation/test", nb_items),
        ));
    }
    let mut order: Vec<usize> = (0..nb_items).collect();
    order.shuffle(rng);
    //
    let mut covered = AHashSet::<K>::new();
    let mut train = Vec::<T>::with_capacity(nb_items);
    let mut remaining = Vec::<T>::with_capacity(nb_items);
    for i in order {
        let item = items[i];
        let mut new_key = false;
        for k in keys(&item) {
            if covered.insert(k) {
                new_key = true;
            }
        }
        if new_key {
            train.push(item);
        } else {
            remaining.push(item);
        }
    }
    log::debug!(
        "coverage_split : {} items needed in training for coverage, {} remaining",
        train.len(),
        remaining.len()
    );
    let mut holdout = ((HOLDOUT_FRACTION * nb_items as f64).round() as usize).max(1);
    if remaining.len() < 2 * holdout {
        holdout = 1;
    }
    if remaining.len() < 2 {
        log::error!(
            "coverage_split, model {} : {} items cannot give validation and test items",
            model,
            nb_items
        );
        return Err(EmbedError::training(
            model,
            format!(
                "split infeasible, {} of {} items are needed in training",
                train.len(),
                nb_items
            ),
        ));
    }
    let valid: Vec<T> = remaining.drain(0..holdout).collect();
    let test: Vec<T> = remaining.drain(0..holdout).collect();
    train.append(&mut remaining);
    log::info!(
        "split sizes train : {}, validation : {}, test : {}",
        train.len(),
        valid.len(),
        test.len()
    );
    Ok(DataSplit { train, valid, test })
} // end of coverage_split

/// keys of a triple for coverage : entities and relation, in 2 distinct namespaces
pub fn triple_keys(t: &Triple) -> Vec<(u8, usize)> {
    vec![(0, t.head), (0, t.tail), (1, t.relation)]
}

//=====================================================================================

// end of mod tests
