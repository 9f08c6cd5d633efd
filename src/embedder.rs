//! describes the embedder trait to be able to manipulate training strategies in a unified way,
//! and the registry mapping model names to strategies.
//!
//! Every strategy consumes the same input, a typed directed multigraph, and produces the same output,
//! an [EmbeddingTable]. Each one owns its sampling, negative generation and optimization loop.

use indexmap::IndexMap;

use crate::config::EmbedConfig;
use crate::embedding::EmbeddingTable;
use crate::errors::{EmbedError, Result};
use crate::graph::KGraph;

use crate::embed::dlemb::DlEmbedder;
use crate::embed::gcn::GcnEmbedder;
use crate::embed::kge::{distmult::DistMult, transe::TransE};
use crate::embed::node2vec::{CommandRunner, Node2VecEmbedder};
use crate::embed::skipgram::SkipGramEmbedder;

/// skip-gram over typed random walks
pub const BIOKG2VEC: &str = "BioKG2Vec";
/// node2vec delegated to an external executable
pub const N2V: &str = "N2V";
/// translational factorization
pub const TRANSE: &str = "TransE";
/// bilinear factorization
pub const DISTMULT: &str = "DistMult";
/// dot-product neural embedding
pub const DLEMB: &str = "DLemb";
/// graph convolution link predictor
pub const GCN: &str = "GCN";

/// The trait EmbedderT is something whose method embed trains on a graph and produces an [EmbeddingTable]
pub trait EmbedderT {
    /// name of the strategy as given in the registry
    fn name(&self) -> &'static str;
    /// train on graph for epochs, and return the vectors of the nodes the strategy was exposed to.
    fn embed(&mut self, graph: &KGraph, epochs: usize) -> Result<EmbeddingTable>;
} // end of trait EmbedderT

/// builds a strategy from the configuration record
pub type EmbedderBuilder = Box<dyn Fn(&EmbedConfig) -> Box<dyn EmbedderT> + Send + Sync>;

/// association of model names to strategy builders. Name lookup is case insensitive.
pub struct ModelRegistry {
    builders: IndexMap<&'static str, EmbedderBuilder>,
}

impl ModelRegistry {
    /// an empty registry
    pub fn new() -> Self {
        ModelRegistry {
            builders: IndexMap::new(),
        }
    }

    /// registers (or replaces) a strategy
    pub fn register(&mut self, name: &'static str, builder: EmbedderBuilder) {
        log::debug!("registering model {}", name);
        self.builders.insert(name, builder);
    }

    /// registered names in registration order
    pub fn names(&self) -> Vec<&'static str> {
        self.builders.keys().copied().collect()
    }

    /// returns the registered name matching name (case insensitive), ConfigError if none
    pub fn resolve(&self, name: &str) -> Result<&'static str> {
        self.builders
            .keys()
            .find(|k| k.eq_ignore_ascii_case(name))
            .copied()
            .ok_or_else(|| {
                log::error!("unknown model name : {}", name);
                EmbedError::Config(format!(
                    "unknown model {}, expected one of {}",
                    name,
                    self.names().join(", ")
                ))
            })
    } // end of resolve

    /// builds the strategy for name
    pub fn build(&self, name: &str, config: &EmbedConfig) -> Result<Box<dyn EmbedderT>> {
        let key = self.resolve(name)?;
        match self.builders.get(key) {
            Some(builder) => Ok(builder(config)),
            None => Err(EmbedError::Config(format!("unknown model {}", name))),
        }
    }
} // end of impl ModelRegistry

impl Default for ModelRegistry {
    /// the 6 strategies
    fn default() -> Self {
        let mut registry = ModelRegistry::new();
        registry.register(
            BIOKG2VEC,
            Box::new(|c: &EmbedConfig| -> Box<dyn EmbedderT> {
                Box::new(SkipGramEmbedder::new(c.get_skipgram().clone(), c.get_seed()))
            }),
        );
        registry.register(
            N2V,
            Box::new(|c: &EmbedConfig| -> Box<dyn EmbedderT> {
                let params = c.get_node2vec().clone();
                let runner = CommandRunner::new(params.clone());
                Box::new(Node2VecEmbedder::new(params, Box::new(runner)))
            }),
        );
        registry.register(
            TRANSE,
            Box::new(|c: &EmbedConfig| -> Box<dyn EmbedderT> {
                Box::new(TransE::new(c.get_kge().clone(), c.get_seed()))
            }),
        );
        registry.register(
            DISTMULT,
            Box::new(|c: &EmbedConfig| -> Box<dyn EmbedderT> {
                Box::new(DistMult::new(c.get_kge().clone(), c.get_seed()))
            }),
        );
        registry.register(
            DLEMB,
            Box::new(|c: &EmbedConfig| -> Box<dyn EmbedderT> {
                Box::new(DlEmbedder::new(c.get_dlemb().clone(), c.get_seed()))
            }),
        );
        registry.register(
            GCN,
            Box::new(|c: &EmbedConfig| -> Box<dyn EmbedderT> {
                Box::new(GcnEmbedder::new(c.get_gcn().clone(), c.get_seed()))
            }),
        );
        registry
    } // end of default
} // end of impl Default for ModelRegistry

//=====================================================================================

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_registry_names() {
        let registry = ModelRegistry::default();
        assert_eq!(registry.names(), vec![BIOKG2VEC, N2V, TRANSE, DISTMULT, DLEMB, GCN]);
        assert_eq!(registry.resolve("transe").unwrap(), TRANSE);
        assert_eq!(registry.resolve("BIOKG2VEC").unwrap(), BIOKG2VEC);
        assert!(registry.resolve("word2vec").unwrap_err().is_config());
        let config = EmbedConfig::default();
        for name in registry.names() {
            let embedder = registry.build(name, &config).unwrap();
            assert_eq!(embedder.name(), name);
        }
        assert!(registry.build("ComplEx", &config).is_err());
    }
} // end of mod tests
