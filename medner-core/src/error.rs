//! # Erros do pipeline
//!
//! Um único tipo de erro para todo o crate. Registros malformados são
//! recuperáveis (o pipeline descarta a linha e segue); erros de E/S e de
//! configuração abortam a execução.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, MedNerError>;

#[derive(Debug, thiserror::Error)]
pub enum MedNerError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Malformed corpus at line {line}: {message}")]
    MalformedCorpus { line: usize, message: String },

    #[error("Automaton build failed for {category}: {message}")]
    Automaton { category: String, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MedNerError {
    /// Associa um `std::io::Error` ao caminho que o provocou.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MedNerError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<std::io::Error> for MedNerError {
    fn from(e: std::io::Error) -> Self {
        MedNerError::Io {
            path: PathBuf::new(),
            source: e,
        }
    }
}
