//! To describe dump of embedding

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::EmbedError;

/// Bson (default) or Csv.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Format {
    BSON,
    CSV,
}

impl Default for Format {
    fn default() -> Self {
        Format::BSON
    }
}

impl FromStr for Format {
    type Err = EmbedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bson" => Ok(Format::BSON),
            "csv" => Ok(Format::CSV),
            _ => Err(EmbedError::Config(format!("unknown output format {}, expected bson or csv", s))),
        }
    }
} // end of impl FromStr for Format

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Output {
    /// describe output format
    fmt: Format,
    /// name of output file
    output_name: PathBuf,
}

impl Output {
    pub fn new(fmt: Format, output_name: &Path) -> Self {
        Output {
            fmt,
            output_name: output_name.to_path_buf(),
        }
    }

    /// get ouput format
    pub fn get_fmt(&self) -> Format {
        self.fmt
    }

    /// get output_name
    pub fn get_output_name(&self) -> &Path {
        &self.output_name
    }

    /// directory where the temporary file of a dump is created, so that the final rename stays on one filesystem
    pub(crate) fn get_output_dir(&self) -> &Path {
        match self.output_name.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }
} // end of Output

impl Default for Output {
    fn default() -> Self {
        Output {
            fmt: Format::BSON,
            output_name: PathBuf::from("embedding.bson"),
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_format_parse() {
        assert_eq!("CSV".parse::<Format>().unwrap(), Format::CSV);
        assert_eq!("bson".parse::<Format>().unwrap(), Format::BSON);
        assert!("json".parse::<Format>().unwrap_err().is_config());
        let output = Output::new(Format::CSV, Path::new("vectors.csv"));
        assert_eq!(output.get_output_dir(), Path::new("."));
    }
} // end of mod tests
