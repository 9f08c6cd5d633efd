//! Input of graphs and output of embedding tables.
//!
//! The embedding table sink writes into a temporary file created in the directory of the output,
//! and renames it over the output only once the dump is complete. An existing output is never
//! partially overwritten and a failed dump leaves no file behind.

use std::io::{BufWriter, Write};

use tempfile::NamedTempFile;

use crate::embedding::EmbeddingTable;
use crate::errors::{EmbedError, Result};

pub mod csv;
pub mod embeddedbson;
pub mod graphbson;
pub mod output;

use output::{Format, Output};

/// serializes table in the format and at the path described by output.
pub fn dump_table(table: &EmbeddingTable, output: &Output) -> Result<()> {
    //
    let path = output.get_output_name();
    log::info!(
        "dump_table, model {}, {} vectors of dim {} into {:?}",
        table.get_model(),
        table.get_nb_nodes(),
        table.get_dimension(),
        path
    );
    let mut tmp = NamedTempFile::new_in(output.get_output_dir()).map_err(|e| {
        log::error!("dump_table could not create temporary file in {:?}", output.get_output_dir());
        EmbedError::Persist(format!(
            "could not create temporary file in {} : {}",
            output.get_output_dir().display(),
            e
        ))
    })?;
    {
        let mut bufwriter = BufWriter::new(tmp.as_file_mut());
        let res = match output.get_fmt() {
            Format::BSON => embeddedbson::bson_dump(table, &mut bufwriter),
            Format::CSV => self::csv::csv_dump(table, &mut bufwriter),
        };
        res.and_then(|_| bufwriter.flush().map_err(anyhow::Error::from))
            .map_err(|e| {
                log::error!("dump_table write failed : {}", e);
                EmbedError::Persist(format!("write of {} failed : {}", path.display(), e))
            })?;
    }
    tmp.as_file().sync_all().map_err(|e| EmbedError::Persist(e.to_string()))?;
    tmp.persist(path).map_err(|e| {
        log::error!("dump_table could not rename temporary file to {:?}", path);
        EmbedError::Persist(format!("could not replace {} : {}", path.display(), e.error))
    })?;
    log::info!("dump_table, {} written", path.display());
    Ok(())
} // end of dump_table

//=========================================================================================

#[cfg(test)]
mod tests {

    use super::*;
    use indexmap::IndexSet;
    use ndarray::Array2;

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn table() -> EmbeddingTable {
        let ids: IndexSet<String> = (0..4).map(|i| format!("n{}", i)).collect();
        let data = Array2::from_shape_fn((4, 5), |(i, j)| (i * 5 + j) as f32 / 7.);
        EmbeddingTable::new("TransE", ids, data).unwrap()
    }

    #[test]
    fn test_dump_both_formats() {
        log_init_test();
        //
        let dir = tempfile::tempdir().unwrap();
        let table = table();
        let bson_path = dir.path().join("out.bson");
        dump_table(&table, &Output::new(Format::BSON, &bson_path)).unwrap();
        let reloaded = embeddedbson::bson_load_table(&bson_path).unwrap();
        assert_eq!(reloaded.get_embedded_data(), table.get_embedded_data());
        //
        let csv_path = dir.path().join("out.csv");
        dump_table(&table, &Output::new(Format::CSV, &csv_path)).unwrap();
        let reloaded = super::csv::csv_load_table(&csv_path, "TransE").unwrap();
        assert_eq!(reloaded.get_embedded_data(), table.get_embedded_data());
        // only our 2 outputs remain in directory
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    } // end of test_dump_both_formats

    #[test]
    fn test_dump_replaces_existing() {
        log_init_test();
        //
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "old content\n").unwrap();
        dump_table(&table(), &Output::new(Format::CSV, &path)).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("n0,"));
    }

    #[test]
    fn test_dump_fails_without_leftover() {
        log_init_test();
        //
        let dir = tempfile::tempdir().unwrap();
        // output is an existing directory, rename must fail
        let path = dir.path().join("adir");
        std::fs::create_dir(&path).unwrap();
        let err = dump_table(&table(), &Output::new(Format::BSON, &path)).unwrap_err();
        assert!(err.is_persist());
        assert!(path.is_dir());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
        // unwritable location
        let path = dir.path().join("nodir").join("out.bson");
        let err = dump_table(&table(), &Output::new(Format::BSON, &path)).unwrap_err();
        assert!(err.is_persist());
        assert!(!path.exists());
    } // end of test_dump_fails_without_leftover
} // end of mod tests
