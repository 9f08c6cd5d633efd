//! Error taxonomy of the embedding pipeline.
//!
//! Each kind corresponds to one pipeline stage:
//! - Load     : the graph could not be read or has not the expected shape
//! - Config   : the invocation record is invalid (unknown model, bad epoch count ...)
//! - Training : a strategy failed (infeasible split, external process failure, divergence ...)
//! - Persist  : the embedding table could not be written.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbedError {
    /// bad or missing input graph
    #[error("LoadError (stage load) : {0}")]
    Load(String),

    /// unknown strategy name, invalid epoch count
    #[error("ConfigError (stage config) : {0}")]
    Config(String),

    /// failure inside a training strategy. No partial table is written.
    #[error("TrainingError (stage training, model {model}) : {reason}")]
    Training { model: String, reason: String },

    /// output could not be written
    #[error("PersistError (stage persist) : {0}")]
    Persist(String),
} // end of EmbedError


impl EmbedError {
    /// shortcut to build a training error
    pub fn training(model: &str, reason: impl Into<String>) -> Self {
        EmbedError::Training {
            model: model.to_string(),
            reason: reason.into(),
        }
    }

    /// name of the pipeline stage the error comes from
    pub fn stage(&self) -> &'static str {
        match self {
            EmbedError::Load(_) => "load",
            EmbedError::Config(_) => "config",
            EmbedError::Training { .. } => "training",
            EmbedError::Persist(_) => "persist",
        }
    }

    pub fn is_load(&self) -> bool {
        matches!(self, EmbedError::Load(_))
    }

    pub fn is_config(&self) -> bool {
        matches!(self, EmbedError::Config(_))
    }

    pub fn is_training(&self) -> bool {
        matches!(self, EmbedError::Training { .. })
    }

    pub fn is_persist(&self) -> bool {
        matches!(self, EmbedError::Persist(_))
    }
} // end of impl EmbedError


/// Result type of the library
pub type Result<T> = std::result::Result<T, EmbedError>;


#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_display_names_kind_and_stage() {
        let err = EmbedError::training("TransE", "split infeasible");
        let msg = err.to_string();
        assert!(msg.contains("TrainingError"));
        assert!(msg.contains("TransE"));
        assert_eq!(err.stage(), "training");
        //
        let err = EmbedError::Config(String::from("unknown model foo"));
        assert!(err.to_string().starts_with("ConfigError"));
        assert!(err.is_config());
        assert_eq!(err.stage(), "config");
    }
} // end of mod tests
