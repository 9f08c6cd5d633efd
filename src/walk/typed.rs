//! Biased random walks over a typed graph.
//!
//! At each step the next edge is drawn among the candidate edges of the current node
//! (out edges if walks are directed, out and in edges otherwise) with probability proportional to
//! the weight of the (type of current node, type of neighbour) pair. A walk stops after `depth`
//! steps or when no candidate has a positive weight.
//!
//! Walks from different start nodes are generated in parallel, each start node having its own
//! random generator derived from the seed, so the corpus does not depend on the number of threads.

use std::time::SystemTime;

use ahash::AHashMap;
use cpu_time::ProcessTime;

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;

use rand::distributions::{Distribution, WeightedIndex};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use rayon::prelude::*;

use crate::graph::KGraph;
use super::params::WalkParams;

/// A walk : the sequence of visited nodes, start node included.
pub type Walk = Vec<NodeIndex>;

pub struct TypedWalker<'a> {
    graph: &'a KGraph,
    params: &'a WalkParams,
    /// weights hashed on type pairs
    lookup: AHashMap<(&'a str, &'a str), f64>,
} // end of TypedWalker

impl<'a> TypedWalker<'a> {
    pub fn new(graph: &'a KGraph, params: &'a WalkParams) -> Self {
        let lookup = params.get_transitions().lookup();
        TypedWalker { graph, params, lookup }
    }

    fn step_weight(&self, from: NodeIndex, to: NodeIndex) -> f64 {
        let from_type = self.graph.get_node(from).get_type();
        let to_type = self.graph.get_node(to).get_type();
        self.lookup
            .get(&(from_type, to_type))
            .copied()
            .unwrap_or_else(|| self.params.get_transitions().get_baseline())
    }

    /// one walk from start
    pub fn walk_from(&self, start: NodeIndex, rng: &mut Xoshiro256PlusPlus) -> Walk {
        let depth = self.params.get_depth();
        let mut walk = Vec::<NodeIndex>::with_capacity(depth + 1);
        walk.push(start);
        let mut current = start;
        let mut candidates = Vec::<NodeIndex>::new();
        let mut weights = Vec::<f64>::new();
        for _ in 0..depth {
            candidates.clear();
            weights.clear();
            for e in self.graph.out_edges(current) {
                candidates.push(e.target());
            }
            if !self.params.is_directed() {
                for e in self.graph.in_edges(current) {
                    candidates.push(e.source());
                }
            }
            for next in &candidates {
                weights.push(self.step_weight(current, *next));
            }
            // fails when there is no candidate or all weights are 0
            let law = match WeightedIndex::new(&weights) {
                Ok(law) => law,
                Err(_) => break,
            };
            current = candidates[law.sample(rng)];
            walk.push(current);
        }
        log::trace!("walk from {:?} , length {}", start, walk.len());
        walk
    } // end of walk_from

    /// generates `iterations` walks from each node, in graph order then iteration order.
    /// Walks reduced to their start node are dropped, so nodes without any traversable edge
    /// (isolated nodes in particular) may not appear in the corpus.
    pub fn generate(&self, seed: u64) -> Vec<Walk> {
        //
        let cpu_start = ProcessTime::now();
        let sys_start = SystemTime::now();
        //
        let starts: Vec<NodeIndex> = self.graph.node_indices().collect();
        let iterations = self.params.get_iterations();
        let by_node: Vec<Vec<Walk>> = starts
            .par_iter()
            .enumerate()
            .map(|(rank, start)| {
                let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed.wrapping_add(rank as u64));
                (0..iterations)
                    .map(|_| self.walk_from(*start, &mut rng))
                    .filter(|w| w.len() > 1)
                    .collect()
            })
            .collect();
        let corpus: Vec<Walk> = by_node.into_iter().flatten().collect();
        //
        log::info!(
            "TypedWalker::generate, {} walks, sys time(ms) {:?} cpu time(ms) {:?}",
            corpus.len(),
            sys_start.elapsed().map(|d| d.as_millis()).unwrap_or(0),
            cpu_start.elapsed().as_millis()
        );
        corpus
    } // end of generate
} // end of impl TypedWalker

//=====================================================================================

// end of mod tests
