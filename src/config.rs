//! Configuration records.
//!
//! [EmbedConfig] gathers the parameters of every strategy and the seed; the registry hands it to
//! the builder of the selected strategy. [PipelineConfig] is the invocation record : input graph,
//! model name, epochs and output.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::embed::dlemb::DlEmbParams;
use crate::embed::gcn::GcnParams;
use crate::embed::kge::KgeParams;
use crate::embed::node2vec::Node2VecParams;
use crate::embed::skipgram::SkipGramParams;
use crate::embedder::ModelRegistry;
use crate::errors::{EmbedError, Result};
use crate::io::output::Output;

/// default seed of random generators
pub const DEFAULT_SEED: u64 = 14;

/// parameters of all strategies
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmbedConfig {
    /// seed of all random generators of a run
    seed: u64,
    skipgram: SkipGramParams,
    node2vec: Node2VecParams,
    /// shared by TransE and DistMult
    kge: KgeParams,
    dlemb: DlEmbParams,
    gcn: GcnParams,
} // end of EmbedConfig

impl EmbedConfig {
    pub fn get_seed(&self) -> u64 {
        self.seed
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
    }

    pub fn get_skipgram(&self) -> &SkipGramParams {
        &self.skipgram
    }

    pub fn set_skipgram(&mut self, params: SkipGramParams) {
        self.skipgram = params;
    }

    pub fn get_node2vec(&self) -> &Node2VecParams {
        &self.node2vec
    }

    /// node2vec parameters are often adjusted (path to executable, timeout)
    pub fn get_node2vec_mut(&mut self) -> &mut Node2VecParams {
        &mut self.node2vec
    }

    pub fn get_kge(&self) -> &KgeParams {
        &self.kge
    }

    pub fn set_kge(&mut self, params: KgeParams) {
        self.kge = params;
    }

    pub fn get_dlemb(&self) -> &DlEmbParams {
        &self.dlemb
    }

    pub fn set_dlemb(&mut self, params: DlEmbParams) {
        self.dlemb = params;
    }

    pub fn get_gcn(&self) -> &GcnParams {
        &self.gcn
    }

    pub fn set_gcn(&mut self, params: GcnParams) {
        self.gcn = params;
    }
} // end of impl EmbedConfig

impl Default for EmbedConfig {
    fn default() -> Self {
        EmbedConfig {
            seed: DEFAULT_SEED,
            skipgram: SkipGramParams::default(),
            node2vec: Node2VecParams::default(),
            kge: KgeParams::default(),
            dlemb: DlEmbParams::default(),
            gcn: GcnParams::default(),
        }
    }
}

//=====================================================================================

/// what to run : graph path, model name, epochs, output and strategy parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    graph: PathBuf,
    model: String,
    epochs: usize,
    output: Output,
    embed: EmbedConfig,
} // end of PipelineConfig

impl PipelineConfig {
    pub fn new(graph: &Path, model: &str, epochs: usize, output: Output, embed: EmbedConfig) -> Self {
        PipelineConfig {
            graph: graph.to_path_buf(),
            model: model.to_string(),
            epochs,
            output,
            embed,
        }
    }

    pub fn get_graph_path(&self) -> &Path {
        &self.graph
    }

    pub fn get_model(&self) -> &str {
        &self.model
    }

    pub fn get_epochs(&self) -> usize {
        self.epochs
    }

    pub fn get_output(&self) -> &Output {
        &self.output
    }

    pub fn get_embed_config(&self) -> &EmbedConfig {
        &self.embed
    }

    /// checks model name against registry and epochs. Returns the registered model name.
    pub fn validate(&self, registry: &ModelRegistry) -> Result<&'static str> {
        let name = registry.resolve(&self.model)?;
        if self.epochs == 0 {
            log::error!("epochs must be at least 1");
            return Err(EmbedError::Config(String::from("epochs must be at least 1")));
        }
        self.embed.get_skipgram().get_walk_params().get_transitions().check()?;
        Ok(name)
    }
} // end of impl PipelineConfig

//=====================================================================================

#[cfg(test)]
mod tests {

    use super::*;
    use crate::embedder::DISTMULT;
    use crate::io::output::Format;
    use crate::walk::{TransitionWeights, TypeTransition, WalkParams};

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_defaults() {
        log_init_test();
        //
        let config = EmbedConfig::default();
        assert_eq!(config.get_seed(), 14);
        assert_eq!(config.get_skipgram().get_window(), 5);
        let walk = config.get_skipgram().get_walk_params();
        assert_eq!(walk.get_iterations(), 5);
        assert_eq!(walk.get_depth(), 50);
        assert_eq!(walk.get_transitions().get_weight("drug", "protein"), 100.);
        assert_eq!(walk.get_transitions().get_weight("protein", "function"), 0.);
        assert_eq!(walk.get_transitions().get_weight("function", "phenotype"), 1000.);
        assert_eq!(walk.get_transitions().get_weight("phenotype", "drug"), 1.);
        assert_eq!(config.get_dlemb().get_n_positive(), 1500);
        assert_eq!(config.get_gcn().get_output_dim(), 100);
        assert_eq!(config.get_kge().get_dimension(), 100);
    }

    #[test]
    fn test_validate() {
        log_init_test();
        //
        let registry = ModelRegistry::default();
        let output = Output::new(Format::BSON, Path::new("out.bson"));
        let config = PipelineConfig::new(Path::new("g.bson"), "distmult", 3, output.clone(), EmbedConfig::default());
        assert_eq!(config.validate(&registry).unwrap(), DISTMULT);
        let config = PipelineConfig::new(Path::new("g.bson"), "ComplEx", 3, output.clone(), EmbedConfig::default());
        assert!(config.validate(&registry).unwrap_err().is_config());
        let config = PipelineConfig::new(Path::new("g.bson"), "GCN", 0, output.clone(), EmbedConfig::default());
        assert!(config.validate(&registry).unwrap_err().is_config());
        // negative transition weight
        let mut embed = EmbedConfig::default();
        let transitions = TransitionWeights::new(vec![TypeTransition::new("drug", "protein", -5.)], 1.);
        let mut skipgram = embed.get_skipgram().clone();
        skipgram.set_walk_params(WalkParams::new(5, 50, true, transitions));
        embed.set_skipgram(skipgram);
        let config = PipelineConfig::new(Path::new("g.bson"), "BioKG2Vec", 3, output, embed);
        assert!(config.validate(&registry).unwrap_err().is_config());
    }
} // end of mod tests
