//! Typed random walks feeding the skip-gram strategy.

pub mod params;
pub mod typed;

pub use params::{TransitionWeights, TypeTransition, WalkParams};
pub use typed::{TypedWalker, Walk};
