//! The training strategies, one module each, and the optimizer they share.

pub mod optim;

pub mod dlemb;
pub mod gcn;
pub mod kge;
pub mod node2vec;
pub mod skipgram;
