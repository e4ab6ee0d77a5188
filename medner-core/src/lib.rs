//! # medner-core — Corpus NER e Grafo de Conhecimento Médico
//!
//! Este crate prepara material de treino a partir de registros de doenças:
//! entidades e relações para um banco de grafos, e texto rotulado caractere a
//! caractere (BIO) para treinar um reconhecedor de entidades.
//!
//! ## Arquitetura do Sistema
//!
//! O dado flui em linha reta, do registro bruto ao corpus:
//!
//! 1.  **Entrada** ([`record`]): uma linha JSON por doença, lida de forma tolerante.
//! 2.  **Grafo** ([`graph`]): entidades por categoria, propriedades das doenças e
//!     relações. Os dicionários gravados aqui alimentam o passo 3.
//! 3.  **Dicionários** ([`dictionary`]): entidades conhecidas, por categoria.
//! 4.  **Autômatos** ([`automaton`]): um Aho-Corasick por categoria, construído uma vez.
//! 5.  **Segmentação** ([`segmenter`]): textos longos viram trechos curtos, de forma aleatória.
//! 6.  **Rotulagem** ([`tagger`]): maior ocorrência primeiro, sem sobreposição.
//! 7.  **Saída** ([`corpus`]): só trechos com pelo menos uma entidade.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use medner_core::{CategoryDictionary, EntityCategory, EntityTagger, IndexSet};
//!
//! let mut dict = CategoryDictionary::new();
//! dict.insert(EntityCategory::Disease, "感冒");
//! dict.insert(EntityCategory::Symptom, "发烧");
//!
//! let indices = IndexSet::build(&dict).unwrap();
//! let tagged = EntityTagger::new(&indices).tag("感冒伴有发烧。");
//!
//! assert_eq!(tagged.match_count, 2);
//! assert_eq!(tagged.labels[0].label(), "B-Disease");
//! ```

pub mod automaton;
pub mod config;
pub mod corpus;
pub mod dictionary;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod record;
pub mod segmenter;
pub mod tagger;

pub use automaton::{IndexSet, Match, PatternIndex};
pub use config::PipelineConfig;
pub use corpus::{read_corpus, CorpusBuilder, CorpusStats};
pub use dictionary::CategoryDictionary;
pub use error::{MedNerError, Result};
pub use graph::{FileGraphSink, GraphExtraction, GraphSink, Relationship};
pub use pipeline::{CorpusPipeline, RunSummary};
pub use record::MedicalRecord;
pub use segmenter::{SegmenterConfig, TextSegmenter};
pub use tagger::{EntityCategory, EntityTagger, Tag, TaggedSpan};
