//! Evaluators used during and after training.
//!
//! - auc : area under the ROC curve of link prediction, used by the graph convolution strategy each epoch.
//! - rank : filtered mean reciprocal rank and hits@k, reported by the factorization strategies.

pub mod auc;
pub mod rank;
