//! Load or dump a typed multi-relational graph in bson format.
//!
//! The file is a sequence of bson documents (a Bson document must not be larger than 16Mb,
//! so each node and each edge gets its own document):
//!
//! 1. A header document with key "header" : see [GraphBsonHeader]
//! 2. nbnodes documents with key "node", each holding the node identity ("id") and its type ("type")
//! 3. nbedges documents with key "edge", each holding "source", "target" and the relation type "rel_type"
//!
//! Both "type" and "rel_type" are mandatory. A missing attribute is a load error.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use bson::Document;
use serde::{Deserialize, Serialize};

use num::cast::FromPrimitive;

use crate::errors::{EmbedError, Result};
use crate::graph::KGraph;

/// version of the graph dump format
pub const GRAPH_FORMAT_VERSION: i64 = 1;

// header counts are not trusted for allocation
const MAX_PREALLOC: usize = 1 << 16;

/// header of a graph dump
#[derive(Debug, Serialize, Deserialize)]
pub struct GraphBsonHeader {
    /// version of dump format
    pub version: i64,
    /// edges are oriented from source to target
    pub directed: bool,
    /// number of node documents following the header
    pub nbnodes: i64,
    /// number of edge documents following the nodes
    pub nbedges: i64,
} // end of GraphBsonHeader


#[derive(Debug, Serialize, Deserialize)]
struct NodeRecord {
    id: String,
    #[serde(rename = "type")]
    ntype: String,
}


#[derive(Debug, Serialize, Deserialize)]
struct EdgeRecord {
    source: String,
    target: String,
    rel_type: String,
}


// reads next document and extracts sub document of key
fn next_record(reader: &mut BufReader<std::fs::File>, key: &str, rank: usize) -> Result<Document> {
    let doc = Document::from_reader(&mut *reader).map_err(|e| {
        log::error!("could not read {} document {} : {}", key, rank, e);
        EmbedError::Load(format!("could not read {} document {} : {}", key, rank, e))
    })?;
    let sub = doc.get_document(key).map_err(|_| {
        EmbedError::Load(format!("document {} has no {} key", rank, key))
    })?;
    Ok(sub.clone())
} // end of next_record


/// reloads a graph from a bson dump.
pub fn load_graph_bson(path: &Path) -> Result<KGraph> {
    //
    log::info!("load_graph_bson, loading file {:?}", path);
    //
    if !path.exists() {
        log::error!("load_graph_bson : file {:?} does not exist", path);
        return Err(EmbedError::Load(format!("graph file {} does not exist", path.display())));
    }
    let file = OpenOptions::new().read(true).open(path).map_err(|e| {
        log::error!("load_graph_bson could not open file {:?}", path.as_os_str());
        EmbedError::Load(format!("could not open graph file {} : {}", path.display(), e))
    })?;
    let mut bufreader = BufReader::new(file);
    // load header
    let header_doc = next_record(&mut bufreader, "header", 0)?;
    let header: GraphBsonHeader = bson::from_document(header_doc)
        .map_err(|e| EmbedError::Load(format!("could not decode graph header : {}", e)))?;
    log::info!("header : {:?}", header);
    if header.version != GRAPH_FORMAT_VERSION {
        log::error!("header format version : {}", header.version);
        return Err(EmbedError::Load(format!(
            "graph format version {} , expected {}",
            header.version, GRAPH_FORMAT_VERSION
        )));
    }
    if !header.directed {
        log::warn!("graph dump is flagged undirected, edges are loaded as oriented in the file");
    }
    let nb_nodes: usize = FromPrimitive::from_i64(header.nbnodes)
        .ok_or_else(|| EmbedError::Load(format!("bad number of nodes {}", header.nbnodes)))?;
    let nb_edges: usize = FromPrimitive::from_i64(header.nbedges)
        .ok_or_else(|| EmbedError::Load(format!("bad number of edges {}", header.nbedges)))?;
    //
    let mut graph = KGraph::with_capacity(nb_nodes.min(MAX_PREALLOC), nb_edges.min(MAX_PREALLOC));
    for i in 0..nb_nodes {
        let doc = next_record(&mut bufreader, "node", i)?;
        let node: NodeRecord = bson::from_document(doc).map_err(|e| {
            log::error!("node document {} not decoded : {}", i, e);
            EmbedError::Load(format!("node document {} : {}", i, e))
        })?;
        graph.add_node(&node.id, &node.ntype)?;
    }
    log::debug!("load_graph_bson got {} nodes", nb_nodes);
    for i in 0..nb_edges {
        let doc = next_record(&mut bufreader, "edge", i)?;
        let edge: EdgeRecord = bson::from_document(doc).map_err(|e| {
            log::error!("edge document {} not decoded : {}", i, e);
            EmbedError::Load(format!("edge document {} : {}", i, e))
        })?;
        graph.add_edge(&edge.source, &edge.target, &edge.rel_type)?;
    }
    // header counts must match file content
    let remaining = bufreader
        .fill_buf()
        .map_err(|e| EmbedError::Load(format!("could not read graph file {} : {}", path.display(), e)))?;
    if !remaining.is_empty() {
        log::error!("load_graph_bson : trailing documents after {} edges", nb_edges);
        return Err(EmbedError::Load(format!(
            "trailing documents after the {} nodes and {} edges declared in header",
            nb_nodes, nb_edges
        )));
    }
    //
    log::info!(
        "load_graph_bson done, nb nodes : {}, nb edges : {}",
        graph.nb_nodes(),
        graph.nb_edges()
    );
    Ok(graph)
} // end of load_graph_bson


/// dump a graph in bson format
pub fn dump_graph_bson(graph: &KGraph, path: &Path) -> anyhow::Result<()> {
    //
    log::info!("entering dump_graph_bson, file {:?}", path);
    //
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    let mut bufwriter = BufWriter::new(file);
    let nbnodes: i64 = FromPrimitive::from_usize(graph.nb_nodes())
        .ok_or_else(|| anyhow::anyhow!("too many nodes"))?;
    let nbedges: i64 = FromPrimitive::from_usize(graph.nb_edges())
        .ok_or_else(|| anyhow::anyhow!("too many edges"))?;
    let header = GraphBsonHeader {
        version: GRAPH_FORMAT_VERSION,
        directed: true,
        nbnodes,
        nbedges,
    };
    let mut doc = Document::new();
    doc.insert("header", bson::to_document(&header)?);
    doc.to_writer(&mut bufwriter)?;
    //
    for idx in graph.node_indices() {
        let node = graph.get_node(idx);
        let record = NodeRecord {
            id: node.get_id().to_string(),
            ntype: node.get_type().to_string(),
        };
        let mut doc = Document::new();
        doc.insert("node", bson::to_document(&record)?);
        doc.to_writer(&mut bufwriter)?;
    }
    for (source, relation, target) in graph.edges() {
        let record = EdgeRecord {
            source: source.to_string(),
            target: target.to_string(),
            rel_type: relation.to_string(),
        };
        let mut doc = Document::new();
        doc.insert("edge", bson::to_document(&record)?);
        doc.to_writer(&mut bufwriter)?;
    }
    bufwriter.flush()?;
    log::info!("dump_graph_bson in file {} finished", path.display());
    Ok(())
} // end of dump_graph_bson


//=========================================================================================


#[cfg(test)]
mod tests {

    use super::*;
    use bson::doc;

    use crate::graph::testgraph;

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_graph_dump_reload() {
        log_init_test();
        //
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kg.bson");
        let graph = testgraph::scenario_a();
        dump_graph_bson(&graph, &path).unwrap();
        let reloaded = load_graph_bson(&path).unwrap();
        assert_eq!(reloaded.nb_nodes(), graph.nb_nodes());
        assert_eq!(reloaded.nb_edges(), graph.nb_edges());
        let ids: Vec<&str> = graph.node_ids().collect();
        let ids_reloaded: Vec<&str> = reloaded.node_ids().collect();
        assert_eq!(ids, ids_reloaded);
        let edges: Vec<_> = graph.edges().collect();
        let edges_reloaded: Vec<_> = reloaded.edges().collect();
        assert_eq!(edges, edges_reloaded);
        assert_eq!(reloaded.get_node_type("f1"), Some("function"));
    } // end of test_graph_dump_reload

    #[test]
    fn test_missing_file() {
        log_init_test();
        let res = load_graph_bson(Path::new("/nonexistent/dir/kg.bson"));
        assert!(res.unwrap_err().is_load());
    }

    #[test]
    fn test_missing_relation_type() {
        log_init_test();
        //
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.bson");
        {
            let file = std::fs::File::create(&path).unwrap();
            let mut writer = BufWriter::new(file);
            let docs = vec![
                doc! {"header": {"version": 1_i64, "directed": true, "nbnodes": 2_i64, "nbedges": 1_i64}},
                doc! {"node": {"id": "a", "type": "drug"}},
                doc! {"node": {"id": "b", "type": "protein"}},
                // no rel_type
                doc! {"edge": {"source": "a", "target": "b"}},
            ];
            for d in docs {
                d.to_writer(&mut writer).unwrap();
            }
            writer.flush().unwrap();
        }
        let res = load_graph_bson(&path);
        assert!(res.unwrap_err().is_load());
    } // end of test_missing_relation_type

    #[test]
    fn test_missing_node_type() {
        log_init_test();
        //
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.bson");
        {
            let file = std::fs::File::create(&path).unwrap();
            let mut writer = BufWriter::new(file);
            let header = doc! {"header": {"version": 1_i64, "directed": true, "nbnodes": 1_i64, "nbedges": 0_i64}};
            header.to_writer(&mut writer).unwrap();
            let node = doc! {"node": {"id": "a"}};
            node.to_writer(&mut writer).unwrap();
            writer.flush().unwrap();
        }
        assert!(load_graph_bson(&path).unwrap_err().is_load());
    } // end of test_missing_node_type

    // writes a sequence of documents as a graph file
    fn write_docs(path: &Path, docs: Vec<Document>) {
        let file = std::fs::File::create(path).unwrap();
        let mut writer = BufWriter::new(file);
        for d in docs {
            d.to_writer(&mut writer).unwrap();
        }
        writer.flush().unwrap();
    }

    #[test]
    fn test_huge_header_count() {
        log_init_test();
        //
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.bson");
        let docs = vec![
            doc! {"header": {"version": 1_i64, "directed": true, "nbnodes": 4_000_000_000_000_000_000_i64, "nbedges": 4_000_000_000_000_000_000_i64}},
            doc! {"node": {"id": "a", "type": "drug"}},
        ];
        write_docs(&path, docs);
        assert!(load_graph_bson(&path).unwrap_err().is_load());
    } // end of test_huge_header_count

    #[test]
    fn test_trailing_documents() {
        log_init_test();
        //
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trailing.bson");
        let docs = vec![
            doc! {"header": {"version": 1_i64, "directed": true, "nbnodes": 2_i64, "nbedges": 1_i64}},
            doc! {"node": {"id": "a", "type": "drug"}},
            doc! {"node": {"id": "b", "type": "protein"}},
            doc! {"edge": {"source": "a", "target": "b", "rel_type": "targets"}},
            doc! {"edge": {"source": "b", "target": "a", "rel_type": "targets"}},
            doc! {"node": {"id": "c"}},
        ];
        write_docs(&path, docs);
        assert!(load_graph_bson(&path).unwrap_err().is_load());
        // same file without the extra documents loads
        let docs = vec![
            doc! {"header": {"version": 1_i64, "directed": true, "nbnodes": 2_i64, "nbedges": 1_i64}},
            doc! {"node": {"id": "a", "type": "drug"}},
            doc! {"node": {"id": "b", "type": "protein"}},
            doc! {"edge": {"source": "a", "target": "b", "rel_type": "targets"}},
        ];
        write_docs(&path, docs);
        let graph = load_graph_bson(&path).unwrap();
        assert_eq!((graph.nb_nodes(), graph.nb_edges()), (2, 1));
    } // end of test_trailing_documents

    #[test]
    fn test_not_a_graph() {
        log_init_test();
        //
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.bson");
        std::fs::write(&path, b"this is not bson at all").unwrap();
        assert!(load_graph_bson(&path).unwrap_err().is_load());
    }
} // end of mod tests
