//! Parameters shared by the factorization strategies (TransE, DistMult).

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KgeParams {
    /// dimension of entity and relation vectors
    dimension: usize,
    /// Adam learning rate
    learning_rate: f32,
    /// number of positive triples in a mini batch
    batch_size: usize,
    /// margin of the ranking loss
    margin: f32,
} // end of KgeParams

impl KgeParams {
    pub fn new(dimension: usize, learning_rate: f32, batch_size: usize, margin: f32) -> Self {
        KgeParams {
            dimension,
            learning_rate,
            batch_size,
            margin,
        }
    }

    pub fn get_dimension(&self) -> usize {
        self.dimension
    }

    pub fn get_learning_rate(&self) -> f32 {
        self.learning_rate
    }

    pub fn get_batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn get_margin(&self) -> f32 {
        self.margin
    }
} // end of impl KgeParams

impl Default for KgeParams {
    fn default() -> Self {
        KgeParams {
            dimension: 100,
            learning_rate: 0.01,
            batch_size: 256,
            margin: 1.,
        }
    }
}
