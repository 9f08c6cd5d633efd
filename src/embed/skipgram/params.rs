//! Parameters of the skip-gram strategy.
//!
//! The learning rate decreases linearly from alpha to min_alpha over all epochs.
//! Each position of a walk uses a context window drawn uniformly in [1, window].

use serde::{Deserialize, Serialize};

use crate::walk::WalkParams;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkipGramParams {
    /// dimension of embedded vectors
    dimension: usize,
    /// maximal distance between a node and its context in a walk
    window: usize,
    /// number of negative nodes drawn for each (node, context) pair
    negative: usize,
    /// initial learning rate
    alpha: f32,
    /// final learning rate
    min_alpha: f32,
    /// nodes seen less than min_count times in walks are not embedded
    min_count: usize,
    /// walks generating the corpus
    walk: WalkParams,
} // end of SkipGramParams

impl SkipGramParams {
    pub fn new(
        dimension: usize,
        window: usize,
        negative: usize,
        alpha: f32,
        min_alpha: f32,
        min_count: usize,
        walk: WalkParams,
    ) -> Self {
        SkipGramParams {
            dimension,
            window,
            negative,
            alpha,
            min_alpha,
            min_count,
            walk,
        }
    }

    pub fn get_dimension(&self) -> usize {
        self.dimension
    }

    pub fn get_window(&self) -> usize {
        self.window
    }

    pub fn get_negative(&self) -> usize {
        self.negative
    }

    pub fn get_alpha(&self) -> f32 {
        self.alpha
    }

    pub fn get_min_alpha(&self) -> f32 {
        self.min_alpha
    }

    pub fn get_min_count(&self) -> usize {
        self.min_count
    }

    pub fn get_walk_params(&self) -> &WalkParams {
        &self.walk
    }

    /// to replace walk parameters
    pub fn set_walk_params(&mut self, walk: WalkParams) {
        self.walk = walk;
    }
} // end of impl SkipGramParams

impl Default for SkipGramParams {
    fn default() -> Self {
        SkipGramParams {
            dimension: 100,
            window: 5,
            negative: 5,
            alpha: 0.03,
            min_alpha: 0.0007,
            min_count: 1,
            walk: WalkParams::default(),
        }
    }
}
