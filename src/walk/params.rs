//! Parameters of typed random walks.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::errors::{EmbedError, Result};

/// weight of a step from a node of type `from` to a node of type `to`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypeTransition {
    pub from: String,
    pub to: String,
    pub weight: f64,
}

impl TypeTransition {
    pub fn new(from: &str, to: &str, weight: f64) -> Self {
        TypeTransition {
            from: from.to_string(),
            to: to.to_string(),
            weight,
        }
    }
} // end of impl TypeTransition

/// Bias of walk steps, keyed on (type of current node, type of next node).
///
/// The table need not be symetric nor complete : pairs not in the table get the baseline weight.
/// A weight of 0 forbids the step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionWeights {
    transitions: Vec<TypeTransition>,
    baseline: f64,
}

impl TransitionWeights {
    pub fn new(transitions: Vec<TypeTransition>, baseline: f64) -> Self {
        TransitionWeights { transitions, baseline }
    }

    /// no bias, every step has the baseline weight 1.
    pub fn uniform() -> Self {
        TransitionWeights {
            transitions: Vec::new(),
            baseline: 1.,
        }
    }

    pub fn get_baseline(&self) -> f64 {
        self.baseline
    }

    pub fn get_transitions(&self) -> &[TypeTransition] {
        &self.transitions
    }

    /// weight of a step. The last occurrence of a pair in the table wins.
    pub fn get_weight(&self, from: &str, to: &str) -> f64 {
        self.transitions
            .iter()
            .rev()
            .find(|t| t.from == from && t.to == to)
            .map(|t| t.weight)
            .unwrap_or(self.baseline)
    }

    /// weights must be finite and non negative, baseline included
    pub fn check(&self) -> Result<()> {
        if !self.baseline.is_finite() || self.baseline < 0. {
            log::error!("bad baseline transition weight {}", self.baseline);
            return Err(EmbedError::Config(format!("baseline transition weight {} must be finite and >= 0", self.baseline)));
        }
        if let Some(t) = self.transitions.iter().find(|t| !t.weight.is_finite() || t.weight < 0.) {
            log::error!("bad transition weight {} -> {} : {}", t.from, t.to, t.weight);
            return Err(EmbedError::Config(format!(
                "transition weight {} -> {} is {}, must be finite and >= 0",
                t.from, t.to, t.weight
            )));
        }
        Ok(())
    }

    /// a hashed version of the table for use in walks
    pub(crate) fn lookup(&self) -> AHashMap<(&str, &str), f64> {
        let mut map = AHashMap::with_capacity(self.transitions.len());
        for t in &self.transitions {
            map.insert((t.from.as_str(), t.to.as_str()), t.weight);
        }
        map
    }
} // end of impl TransitionWeights

impl Default for TransitionWeights {
    /// drug -> protein favoured, protein -> function forbidden, function -> phenotype strongly favoured
    fn default() -> Self {
        TransitionWeights {
            transitions: vec![
                TypeTransition::new("drug", "protein", 100.),
                TypeTransition::new("protein", "function", 0.),
                TypeTransition::new("function", "phenotype", 1000.),
            ],
            baseline: 1.,
        }
    }
}

/// Walks from each node : `iterations` walks of at most `depth` steps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WalkParams {
    /// number of walks started from each node
    iterations: usize,
    /// maximum number of steps of a walk. A walk has at most depth + 1 nodes
    depth: usize,
    /// if true steps follow edge orientation, else edges are followed both ways
    directed: bool,
    /// type bias of steps
    transitions: TransitionWeights,
} // end of WalkParams

impl WalkParams {
    pub fn new(iterations: usize, depth: usize, directed: bool, transitions: TransitionWeights) -> Self {
        WalkParams {
            iterations,
            depth,
            directed,
            transitions,
        }
    }

    pub fn get_iterations(&self) -> usize {
        self.iterations
    }

    pub fn get_depth(&self) -> usize {
        self.depth
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    pub fn get_transitions(&self) -> &TransitionWeights {
        &self.transitions
    }
} // end of impl WalkParams

impl Default for WalkParams {
    fn default() -> Self {
        WalkParams {
            iterations: 5,
            depth: 50,
            directed: true,
            transitions: TransitionWeights::default(),
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_weight_lookup() {
        let weights = TransitionWeights::default();
        assert_eq!(weights.get_weight("drug", "protein"), 100.);
        assert_eq!(weights.get_weight("protein", "drug"), 1.);
        assert_eq!(weights.get_weight("protein", "function"), 0.);
        assert_eq!(weights.get_weight("gene", "gene"), 1.);
        let lookup = weights.lookup();
        assert_eq!(lookup.get(&("function", "phenotype")), Some(&1000.));
    }

    #[test]
    fn test_bad_weights() {
        assert!(TransitionWeights::default().check().is_ok());
        let negative = TransitionWeights::new(vec![TypeTransition::new("drug", "protein", -1.)], 1.);
        assert!(negative.check().unwrap_err().is_config());
        let nan = TransitionWeights::new(vec![TypeTransition::new("drug", "protein", f64::NAN)], 1.);
        assert!(nan.check().unwrap_err().is_config());
        let infinite = TransitionWeights::new(Vec::new(), f64::INFINITY);
        assert!(infinite.check().unwrap_err().is_config());
    }
} // end of mod tests
