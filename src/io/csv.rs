//! Dump or reload an embedding table as a csv file.
//!
//! One record by node : node id followed by the vector components. No header line.
//! Floats are written with their shortest representation that reads back to the same f32.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use anyhow::anyhow;

use csv::{ReaderBuilder, WriterBuilder};

use indexmap::IndexSet;
use ndarray::Array2;

use crate::embedding::EmbeddingTable;

/// dump table into writer, one record by node
pub(crate) fn csv_dump<W: Write>(table: &EmbeddingTable, writer: W) -> anyhow::Result<()> {
    log::info!("entering csv_dump, model : {}", table.get_model());
    //
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);
    let data = table.get_embedded_data();
    let mut record = Vec::<String>::with_capacity(table.get_dimension() + 1);
    for (i, node_id) in table.node_ids().enumerate() {
        record.clear();
        record.push(node_id.to_string());
        record.extend(data.row(i).iter().map(|x| x.to_string()));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
} // end of csv_dump

/// reloads a table dumped by csv_dump. All records must have the same length.
pub fn csv_load_table(path: &Path, model: &str) -> anyhow::Result<EmbeddingTable> {
    log::info!("entering csv_load_table, file name : {:?}", path);
    //
    let file = OpenOptions::new().read(true).open(path).map_err(|e| {
        log::error!("csv_load_table could not open file {:?}", path.as_os_str());
        anyhow!("could not open {} : {}", path.display(), e)
    })?;
    let mut rdr = ReaderBuilder::new().has_headers(false).flexible(false).from_reader(file);
    //
    let mut nodeindexation = IndexSet::<String>::new();
    let mut values = Vec::<f32>::new();
    let mut dim: Option<usize> = None;
    for result in rdr.records() {
        let record = result?;
        if record.len() < 2 {
            return Err(anyhow!("record {:?} has no vector", record.position()));
        }
        let node_id = &record[0];
        if !nodeindexation.insert(node_id.to_string()) {
            return Err(anyhow!("node {} dumped twice", node_id));
        }
        dim.get_or_insert(record.len() - 1);
        for field in record.iter().skip(1) {
            let x: f32 = field
                .trim()
                .parse()
                .map_err(|e| anyhow!("node {} , bad float {} : {}", node_id, field, e))?;
            values.push(x);
        }
        log::trace!("csv_load_table read node {}", node_id);
    }
    let dim = dim.unwrap_or(0);
    let data = if dim > 0 {
        Array2::from_shape_vec((nodeindexation.len(), dim), values)?
    } else {
        Array2::<f32>::zeros((0, 0))
    };
    log::info!("csv_load_table read {} vectors of dim {}", nodeindexation.len(), dim);
    let table = EmbeddingTable::new(model, nodeindexation, data)?;
    Ok(table)
} // end of csv_load_table

// end of mod tests
