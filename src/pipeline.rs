//! The embedding pipeline : validate the invocation, load the graph, train the selected strategy,
//! dump the table.
//!
//! Configuration and load errors abort before training. Whatever the failure, the output file is
//! created only by a complete dump, so a failed run leaves no output (and an existing output untouched).

use std::path::PathBuf;
use std::time::SystemTime;

use cpu_time::ProcessTime;

use crate::config::PipelineConfig;
use crate::embedder::ModelRegistry;
use crate::errors::Result;
use crate::io::dump_table;
use crate::io::graphbson::load_graph_bson;

/// what a successful run did
#[derive(Clone, Debug)]
pub struct RunSummary {
    /// registered name of the strategy
    pub model: &'static str,
    pub nb_graph_nodes: usize,
    /// number of vectors written
    pub nb_embedded: usize,
    pub dimension: usize,
    /// graph nodes with no vector (isolated nodes for walk based strategies)
    pub missing_nodes: Vec<String>,
    pub output: PathBuf,
}

/// runs the whole pipeline described by config, strategies being taken from registry
pub fn run(config: &PipelineConfig, registry: &ModelRegistry) -> Result<RunSummary> {
    //
    let cpu_start = ProcessTime::now();
    let sys_start = SystemTime::now();
    //
    let model = config.validate(registry)?;
    log::info!(
        "pipeline, model : {}, epochs : {}, graph : {:?}",
        model,
        config.get_epochs(),
        config.get_graph_path()
    );
    let graph = load_graph_bson(config.get_graph_path())?;
    let mut embedder = registry.build(model, config.get_embed_config())?;
    let table = embedder.embed(&graph, config.get_epochs()).map_err(|e| {
        log::error!("training of {} failed : {}", model, e);
        e
    })?;
    let missing_nodes: Vec<String> = table
        .missing_nodes(&graph)
        .into_iter()
        .map(|s| s.to_string())
        .collect();
    if !missing_nodes.is_empty() {
        log::info!(
            "{} graph nodes have no vector, first ones : {:?}",
            missing_nodes.len(),
            &missing_nodes[..missing_nodes.len().min(10)]
        );
    }
    dump_table(&table, config.get_output())?;
    //
    log::info!(
        "pipeline done, sys time(ms) {:?} cpu time(ms) {:?}",
        sys_start.elapsed().map(|d| d.as_millis()).unwrap_or(0),
        cpu_start.elapsed().as_millis()
    );
    Ok(RunSummary {
        model,
        nb_graph_nodes: graph.nb_nodes(),
        nb_embedded: table.get_nb_nodes(),
        dimension: table.get_dimension(),
        missing_nodes,
        output: config.get_output().get_output_name().to_path_buf(),
    })
} // end of run

//=====================================================================================

#[cfg(test)]
mod tests {

    use super::*;
    use std::path::Path;

    use crate::config::EmbedConfig;
    use crate::embedder::{BIOKG2VEC, TRANSE};
    use crate::graph::{testgraph, KGraph};
    use crate::io::csv::csv_load_table;
    use crate::io::embeddedbson::bson_load_table;
    use crate::io::graphbson::dump_graph_bson;
    use crate::io::output::{Format, Output};
    use crate::tools::idmap::IdMap;

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn write_graph(graph: &KGraph, dir: &Path) -> PathBuf {
        let path = dir.join("graph.bson");
        dump_graph_bson(graph, &path).unwrap();
        path
    }

    #[test]
    fn test_scenario_a_transe() {
        log_init_test();
        //
        let dir = tempfile::tempdir().unwrap();
        let graph_path = write_graph(&testgraph::scenario_a(), dir.path());
        let out = dir.path().join("transe.bson");
        let config = PipelineConfig::new(
            &graph_path,
            "TransE",
            1,
            Output::new(Format::BSON, &out),
            EmbedConfig::default(),
        );
        let summary = run(&config, &ModelRegistry::default()).unwrap();
        assert_eq!(summary.model, TRANSE);
        assert_eq!(summary.nb_embedded, 10);
        let table = bson_load_table(&out).unwrap();
        assert_eq!(table.get_nb_nodes(), 10);
        assert_eq!(table.get_dimension(), 100);
        assert_eq!(table.get_model(), TRANSE);
    } // end of test_scenario_a_transe

    #[test]
    fn test_scenario_b_skipgram() {
        log_init_test();
        //
        let dir = tempfile::tempdir().unwrap();
        let graph = testgraph::with_isolated();
        let graph_path = write_graph(&graph, dir.path());
        let out = dir.path().join("biokg2vec.csv");
        let config = PipelineConfig::new(
            &graph_path,
            "biokg2vec",
            1,
            Output::new(Format::CSV, &out),
            EmbedConfig::default(),
        );
        let summary = run(&config, &ModelRegistry::default()).unwrap();
        assert_eq!(summary.model, BIOKG2VEC);
        assert_eq!(summary.nb_embedded, graph.nb_nodes() - 1);
        assert_eq!(summary.missing_nodes, vec![String::from("orphan")]);
        let table = csv_load_table(&out, BIOKG2VEC).unwrap();
        assert_eq!(table.get_nb_nodes(), graph.nb_nodes() - 1);
        assert!(!table.contains("orphan"));
    } // end of test_scenario_b_skipgram

    #[test]
    fn test_scenario_c_unknown_model() {
        log_init_test();
        //
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.bson");
        // graph file does not even exist, config is checked first
        let config = PipelineConfig::new(
            &dir.path().join("nograph.bson"),
            "word2vec",
            1,
            Output::new(Format::BSON, &out),
            EmbedConfig::default(),
        );
        let err = run(&config, &ModelRegistry::default()).unwrap_err();
        assert!(err.is_config());
        assert_eq!(err.stage(), "config");
        assert!(!out.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_graph() {
        log_init_test();
        //
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.bson");
        let config = PipelineConfig::new(
            &dir.path().join("nograph.bson"),
            "DLemb",
            1,
            Output::new(Format::BSON, &out),
            EmbedConfig::default(),
        );
        assert!(run(&config, &ModelRegistry::default()).unwrap_err().is_load());
        assert!(!out.exists());
    }

    #[test]
    fn test_training_failure_keeps_previous_output() {
        log_init_test();
        //
        let dir = tempfile::tempdir().unwrap();
        let mut graph = KGraph::new();
        graph.add_node("a", "drug").unwrap();
        graph.add_node("b", "protein").unwrap();
        graph.add_edge("a", "b", "targets").unwrap();
        let graph_path = write_graph(&graph, dir.path());
        let out = dir.path().join("out.csv");
        std::fs::write(&out, "previous").unwrap();
        let config = PipelineConfig::new(
            &graph_path,
            "DistMult",
            1,
            Output::new(Format::CSV, &out),
            EmbedConfig::default(),
        );
        let err = run(&config, &ModelRegistry::default()).unwrap_err();
        assert!(err.is_training());
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "previous");
        // only the graph and the previous output
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    } // end of test_training_failure_keeps_previous_output

    #[test]
    fn test_index_identical_across_loads() {
        log_init_test();
        //
        let dir = tempfile::tempdir().unwrap();
        let graph_path = write_graph(&testgraph::scenario_a(), dir.path());
        let g1 = load_graph_bson(&graph_path).unwrap();
        let g2 = load_graph_bson(&graph_path).unwrap();
        assert_eq!(IdMap::from_graph(&g1), IdMap::from_graph(&g2));
        assert_eq!(IdMap::from_edges(&g1), IdMap::from_edges(&g2));
    }
} // end of mod tests
