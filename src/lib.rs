//! Node embeddings of typed, multi relational knowledge graphs.
//!
//! One graph, six interchangeable strategies behind the [embedder::EmbedderT] trait:
//! skip-gram over typed random walks (BioKG2Vec), node2vec through an external executable (N2V),
//! TransE and DistMult factorizations, a dot-product neural embedding (DLemb) and a graph
//! convolution link predictor (GCN). Each produces an [embedding::EmbeddingTable] mapping node
//! identities to vectors, dumped in bson or csv.

pub mod errors;

pub mod graph;

pub mod io;

pub mod tools;

pub mod sampling;

pub mod walk;

pub mod embed;

pub mod validation;

pub mod embedding;

pub mod embedder;

pub mod config;

pub mod pipeline;

pub mod prelude;
