//! To ease access to most frequently used items
//!

pub use crate::errors::EmbedError;

pub use crate::graph::KGraph;
pub use crate::io::graphbson::{dump_graph_bson, load_graph_bson};
pub use crate::io::output::{Format, Output};
pub use crate::io::{csv::csv_load_table, dump_table, embeddedbson::bson_load_table};

pub use crate::embedding::EmbeddingTable;
pub use crate::embedder::*;

pub use crate::config::{EmbedConfig, PipelineConfig};
pub use crate::pipeline::{run, RunSummary};

pub use crate::walk::{TransitionWeights, TypeTransition, WalkParams};
