//! # Configuração do Pipeline
//!
//! Tudo tem valor padrão; um arquivo JSON só precisa trazer o que muda:
//!
//! ```json
//! { "records_path": "data/medical.json", "seed": 42, "parallel": true,
//!   "segmenter": { "max_len": 40 } }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MedNerError, Result};
use crate::segmenter::SegmenterConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Registros de doenças, um objeto JSON por linha.
    pub records_path: PathBuf,
    /// Diretório dos dicionários `<rótulo>.txt`.
    pub dictionary_dir: PathBuf,
    /// Arquivo de relações gravado pela extração do grafo.
    pub relationship_path: PathBuf,
    /// Corpus de saída.
    pub corpus_path: PathBuf,
    pub segmenter: SegmenterConfig,
    /// Semente da segmentação. Sem semente, cada execução sorteia uma.
    pub seed: Option<u64>,
    /// Processa os documentos em paralelo (rayon).
    pub parallel: bool,
    /// Regrava os dicionários e relações a partir dos registros antes de gerar o corpus.
    pub extract_graph: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            records_path: PathBuf::from("data/medical.json"),
            dictionary_dir: PathBuf::from("data/ent_aug"),
            relationship_path: PathBuf::from("data/rel_aug.txt"),
            corpus_path: PathBuf::from("data/ner_data_aug.txt"),
            segmenter: SegmenterConfig::default(),
            seed: None,
            parallel: false,
            extract_graph: true,
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| MedNerError::io(path, e))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| MedNerError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.segmenter.validate()
    }
}
