//! Generation of negative (non existing) pairs for contrastive training.

pub mod negative;
