//! Indexation of nodes and relations, extraction of triples.

pub mod idmap;
pub mod triples;
