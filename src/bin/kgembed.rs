//! an executable for embedding a knowledge graph
//! example usage:
//! kgembed -k graph.bson -m BioKG2Vec -e 10 -o embedding.bson
//! kgembed -k graph.bson -m TransE -e 100 -o embedding.csv --format csv --seed 3
//! kgembed -k graph.bson -m N2V -e 1 -o embedding.bson --node2vec /usr/local/bin/node2vec --timeout 600
//!
//! Models are BioKG2Vec, N2V, TransE, DistMult, DLemb and GCN (case insensitive).
//! Log level is set with RUST_LOG, for example RUST_LOG=info

use std::path::Path;

use anyhow::anyhow;
use clap::{Arg, ArgMatches, Command};
use env_logger::Builder;

use kgembed::prelude::*;

// parse an optional numeric argument
fn parse_opt<T: std::str::FromStr>(matches: &ArgMatches, name: &str) -> Result<Option<T>, anyhow::Error> {
    match matches.value_of(name) {
        Some(str) => match str.parse::<T>() {
            Ok(val) => Ok(Some(val)),
            _ => Err(anyhow!("could not parse {} : {}", name, str)),
        },
        None => Ok(None),
    }
}

fn parse_args(matches: &ArgMatches) -> Result<PipelineConfig, anyhow::Error> {
    let graph = matches
        .value_of("graph")
        .ok_or_else(|| anyhow!("graph file required"))?;
    let model = matches
        .value_of("model")
        .ok_or_else(|| anyhow!("model name required"))?;
    let epochs: usize = parse_opt(matches, "epochs")?.ok_or_else(|| anyhow!("epochs required"))?;
    let output = matches
        .value_of("output")
        .ok_or_else(|| anyhow!("output file required"))?;
    let format = match matches.value_of("format") {
        Some(str) => str.parse::<Format>()?,
        None => Format::default(),
    };
    //
    let mut embed_config = EmbedConfig::default();
    if let Some(seed) = parse_opt::<u64>(matches, "seed")? {
        embed_config.set_seed(seed);
    }
    if let Some(exe) = matches.value_of("node2vec") {
        embed_config.get_node2vec_mut().set_executable(Path::new(exe));
    }
    if let Some(timeout) = parse_opt::<u64>(matches, "timeout")? {
        embed_config.get_node2vec_mut().set_timeout_secs(timeout);
    }
    let output = Output::new(format, Path::new(output));
    Ok(PipelineConfig::new(Path::new(graph), model, epochs, output, embed_config))
} // end of parse_args

pub fn main() -> Result<(), anyhow::Error> {
    //
    Builder::from_default_env().init();
    log::info!("logger initialized");
    //
    let matches = Command::new("kgembed")
        .about("node embeddings of a typed knowledge graph")
        .arg_required_else_help(true)
        .arg(
            Arg::new("graph")
                .short('k')
                .long("graph")
                .takes_value(true)
                .required(true)
                .help("graph file, bson dump"),
        )
        .arg(
            Arg::new("model")
                .short('m')
                .long("model")
                .takes_value(true)
                .required(true)
                .help("BioKG2Vec, N2V, TransE, DistMult, DLemb or GCN"),
        )
        .arg(
            Arg::new("epochs")
                .short('e')
                .long("epochs")
                .takes_value(true)
                .required(true)
                .help("number of training epochs, at least 1"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .takes_value(true)
                .required(true)
                .help("output file of the embedding table"),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .takes_value(true)
                .possible_values(["bson", "csv"])
                .help("output format, bson by default"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .takes_value(true)
                .help("seed of random generators, default 14"),
        )
        .arg(
            Arg::new("node2vec")
                .long("node2vec")
                .takes_value(true)
                .help("path to node2vec executable used by N2V"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .takes_value(true)
                .help("N2V external process is killed after this number of seconds"),
        )
        .get_matches();
    //
    let config = parse_args(&matches).map_err(|e| {
        log::error!("ConfigError (stage config) : {}", e);
        e
    })?;
    let registry = ModelRegistry::default();
    match run(&config, &registry) {
        Ok(summary) => {
            log::info!(
                "{} embedded {} nodes out of {} in dimension {}, written in {:?}",
                summary.model,
                summary.nb_embedded,
                summary.nb_graph_nodes,
                summary.dimension,
                summary.output
            );
            Ok(())
        }
        Err(e) => {
            log::error!("{}", e);
            log::error!("run failed at stage {}", e.stage());
            Err(anyhow!(e))
        }
    }
} // end of main
