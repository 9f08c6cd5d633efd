//! Parameters of the graph convolution link predictor.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GcnParams {
    /// dimension of the random node features
    feature_dim: usize,
    /// output dimension of the first convolution
    hidden_dim: usize,
    /// output dimension of the second convolution, the embedding dimension
    output_dim: usize,
    /// Adam learning rate
    learning_rate: f32,
} // end of GcnParams

impl GcnParams {
    pub fn new(feature_dim: usize, hidden_dim: usize, output_dim: usize, learning_rate: f32) -> Self {
        GcnParams {
            feature_dim,
            hidden_dim,
            output_dim,
            learning_rate,
        }
    }

    pub fn get_feature_dim(&self) -> usize {
        self.feature_dim
    }

    pub fn get_hidden_dim(&self) -> usize {
        self.hidden_dim
    }

    pub fn get_output_dim(&self) -> usize {
        self.output_dim
    }

    pub fn get_learning_rate(&self) -> f32 {
        self.learning_rate
    }
} // end of impl GcnParams

impl Default for GcnParams {
    fn default() -> Self {
        GcnParams {
            feature_dim: 100,
            hidden_dim: 100,
            output_dim: 100,
            learning_rate: 0.001,
        }
    }
}
