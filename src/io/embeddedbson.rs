//! module to do bson io for embedding tables
//!
//!  The encoding is done in 2 parts:
//! 1. A header structure with key "header". The structure is described below see struct [Header](EmbeddedBsonHeader)
//! - a version index
//! - base type name (f32) encoded as a String. key is type_name.
//! - dimension of vectors
//! - number of vectors
//! - name of the strategy that produced the vectors
//!
//! 2. The embedded vectors, one document by node with key "id" for node identity and key "vector"
//!    for the vector, stored as an array of doubles.
//!
//! The node identity is in each document, so the indexation is always recovered at reload.

// Note : a Bson document must not be larger than 16Mb!
// So we need to have many Documents in the file dumped

use std::fs::OpenOptions;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::anyhow;

use bson::{Bson, Document};
use serde::{Deserialize, Serialize};

use indexmap::IndexSet;
use ndarray::{Array2, ArrayView1};
use num::cast::FromPrimitive;

use crate::embedding::EmbeddingTable;

/// version of the table dump format
pub const TABLE_FORMAT_VERSION: i64 = 1;

/// This structure defines the header of the bson document
#[derive(Debug, Serialize, Deserialize)]
pub struct EmbeddedBsonHeader {
    /// version of dump format
    pub version: i64,
    /// encodes type of vectors used in the embedding.
    pub type_name: String,
    /// dimension of the embedding (length of vectors)
    pub dimension: i64,
    /// number of vectors.
    pub nbdata: i64,
    /// strategy that produced the vectors
    pub model: String,
} // end of EmbeddedBsonHeader

impl EmbeddedBsonHeader {
    pub fn new(dimension: i64, nbdata: i64, model: &str) -> Self {
        EmbeddedBsonHeader {
            version: TABLE_FORMAT_VERSION,
            type_name: String::from("f32"),
            dimension,
            nbdata,
            model: model.to_string(),
        }
    }
} // end of impl EmbeddedBsonHeader

/// dump an embedding table in bson format into writer.
/// The dump consists in a header document. Then each node is dumped in its document.
pub(crate) fn bson_dump<W: Write>(table: &EmbeddingTable, writer: &mut W) -> anyhow::Result<()> {
    //
    log::info!("entering bson_dump, model : {}", table.get_model());
    //
    let dim: i64 = FromPrimitive::from_usize(table.get_dimension()).ok_or_else(|| anyhow!("bad dimension"))?;
    let nbdata: i64 = FromPrimitive::from_usize(table.get_nb_nodes()).ok_or_else(|| anyhow!("bad number of nodes"))?;
    let header = EmbeddedBsonHeader::new(dim, nbdata, table.get_model());
    let mut doc = Document::new();
    doc.insert("header", bson::to_document(&header)?);
    doc.to_writer(&mut *writer)
        .map_err(|e| anyhow!("dump of bson header failed: {}", e))?;
    // now loop on data vectors
    let data = table.get_embedded_data();
    for (i, node_id) in table.node_ids().enumerate() {
        let vector: Vec<Bson> = data.row(i).iter().map(|x| Bson::Double(*x as f64)).collect();
        let mut doc = Document::new();
        doc.insert("id", node_id);
        doc.insert("vector", vector);
        doc.to_writer(&mut *writer).map_err(|e| {
            log::error!("bson dump error in node {i}");
            anyhow!("bson dump error for node {} {}", node_id, e)
        })?;
    }
    writer.flush()?;
    log::debug!("bson_dump wrote {} vectors", nbdata);
    Ok(())
} // end of bson_dump

/// returns the bson header of an embedding table dump.
pub fn get_bson_header(path: &Path) -> anyhow::Result<EmbeddedBsonHeader> {
    log::info!("get_bson_header: trying to open file : {:?}", path);
    let file = OpenOptions::new()
        .read(true)
        .open(path)
        .map_err(|e| anyhow!("could not open {} : {}", path.display(), e))?;
    let mut bufreader = BufReader::new(file);
    read_header(&mut bufreader, path)
} // end of get_bson_header

fn read_header(bufreader: &mut BufReader<std::fs::File>, path: &Path) -> anyhow::Result<EmbeddedBsonHeader> {
    let doc = Document::from_reader(&mut *bufreader).map_err(|e| {
        log::error!("could not load document from file {}", path.display());
        anyhow!(e)
    })?;
    let bson_header = doc
        .get("header")
        .ok_or_else(|| anyhow!("could not find header in document"))?
        .clone();
    let header: EmbeddedBsonHeader = bson::from_bson(bson_header)?;
    if header.version != TABLE_FORMAT_VERSION {
        log::error!("header format version : {}", header.version);
        return Err(anyhow!("format version error, inconsistent with header"));
    }
    if header.type_name != "f32" {
        return Err(anyhow!("type error, header has {} expected f32", header.type_name));
    }
    Ok(header)
} // end of read_header

/// reloads an embedding table from a previous bson dump.
pub fn bson_load_table(path: &Path) -> anyhow::Result<EmbeddingTable> {
    //
    log::info!("entering bson_load_table, file name : {:?}", path);
    //
    let file = OpenOptions::new().read(true).open(path).map_err(|e| {
        log::error!("reload of bson dump failed");
        anyhow!("reload failed: {}", e)
    })?;
    let mut bufreader = BufReader::new(file);
    let header = read_header(&mut bufreader, path)?;
    log::info!("header : {:?}", header);
    let nb_data: usize = FromPrimitive::from_i64(header.nbdata).ok_or_else(|| anyhow!("bad nbdata"))?;
    let dim: usize = FromPrimitive::from_i64(header.dimension).ok_or_else(|| anyhow!("bad dimension"))?;
    //
    let mut nodeindexation = IndexSet::<String>::with_capacity(nb_data);
    let mut data = Array2::<f32>::zeros((0, dim));
    for i in 0..nb_data {
        // we have one document for each node
        let doc = Document::from_reader(&mut bufreader).map_err(|e| {
            log::error!("could not load document for node {i} from file {}", path.display());
            anyhow!(e)
        })?;
        let node_id = doc.get_str("id").map_err(|e| anyhow!("node {} has no id : {}", i, e))?;
        let values = doc
            .get_array("vector")
            .map_err(|e| anyhow!("node {} has no vector : {}", node_id, e))?;
        let vector = values
            .iter()
            .map(|v| match v {
                Bson::Double(x) => Ok(*x as f32),
                _ => Err(anyhow!("node {} : vector has a non double value", node_id)),
            })
            .collect::<anyhow::Result<Vec<f32>>>()?;
        data.push_row(ArrayView1::from(vector.as_slice()))
            .map_err(|_| anyhow!("node {} has vector of length {}, expected {}", node_id, vector.len(), dim))?;
        if !nodeindexation.insert(node_id.to_string()) {
            return Err(anyhow!("node {} dumped twice", node_id));
        }
    }
    log::info!("\t finished bson decoding of {} embedded vectors", nb_data);
    let table = EmbeddingTable::new(&header.model, nodeindexation, data)?;
    Ok(table)
} // end of bson_load_table

//=============================================================================

#[cfg(test)]
mod tests {

    use super::*;
    use ndarray::array;

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_bson_dump_reload() {
        log_init_test();
        //
        let ids: IndexSet<String> = ["d0", "p0", "f0"].iter().map(|s| s.to_string()).collect();
        let data = array![[0.1_f32, -2.5e-7, 3.3333333], [1.0e10, 0., -0.], [f32::MIN_POSITIVE, 7., 1.5]];
        let table = EmbeddingTable::new("DistMult", ids, data).unwrap();
        //
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.bson");
        {
            let file = std::fs::File::create(&path).unwrap();
            let mut writer = BufWriter::new(file);
            bson_dump(&table, &mut writer).unwrap();
        }
        let header = get_bson_header(&path).unwrap();
        assert_eq!(header.dimension, 3);
        assert_eq!(header.nbdata, 3);
        assert_eq!(header.model, "DistMult");
        //
        let reloaded = bson_load_table(&path).unwrap();
        assert_eq!(reloaded.get_model(), "DistMult");
        let ids: Vec<&str> = reloaded.node_ids().collect();
        assert_eq!(ids, vec!["d0", "p0", "f0"]);
        assert_eq!(reloaded.get_embedded_data(), table.get_embedded_data());
    } // end of test_bson_dump_reload
} // end of mod tests
