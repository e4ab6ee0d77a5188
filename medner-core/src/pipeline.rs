//! # Pipeline de Geração do Corpus
//!
//! Coordena os módulos na ordem do fluxo de dados:
//!
//! 1. **Leitura** ([`read_records`], [`parse_records`]): linhas JSON →
//!    [`MedicalRecord`]; linhas ruins (inclusive UTF-8 inválido) são contadas e descartadas.
//! 2. **Grafo** (opcional, [`GraphExtraction`]): regrava os dicionários.
//! 3. **Segmentação** ([`TextSegmenter`]): cada texto vira trechos curtos.
//! 4. **Rotulagem** ([`EntityTagger`]): os 8 autômatos, construídos uma vez.
//! 5. **Corpus** ([`CorpusBuilder`]): só trechos com entidades.
//!
//! Cada documento é independente dos outros. No modo semeado, o documento `i`
//! usa um `StdRng` com semente `seed ^ i`, de modo que a execução sequencial e
//! a paralela (rayon) produzem exatamente o mesmo corpus.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::automaton::IndexSet;
use crate::config::PipelineConfig;
use crate::corpus::{CorpusBuilder, CorpusStats};
use crate::dictionary::CategoryDictionary;
use crate::error::{MedNerError, Result};
use crate::graph::{FileGraphSink, GraphExtraction, GraphSink};
use crate::record::MedicalRecord;
use crate::segmenter::{SegmenterConfig, TextSegmenter};
use crate::tagger::{EntityTagger, TaggedSpan};

/// Resultado da leitura do arquivo de registros.
#[derive(Debug, Clone, Default)]
pub struct RecordBatch {
    pub records: Vec<MedicalRecord>,
    /// Linhas curtas demais (vazias, `[`, `]`).
    pub skipped: usize,
    /// Linhas que não são um objeto JSON válido.
    pub malformed: usize,
}

impl RecordBatch {
    fn push_line(&mut self, line_no: usize, line: &str) {
        match MedicalRecord::parse_line(line) {
            Ok(Some(record)) => self.records.push(record),
            Ok(None) => self.skipped += 1,
            Err(e) => {
                debug!("Linha {} descartada: {}", line_no, e);
                self.malformed += 1;
            }
        }
    }
}

/// Parseia todas as linhas; nenhuma linha ruim interrompe a leitura.
pub fn parse_records<I, S>(lines: I) -> RecordBatch
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut batch = RecordBatch::default();
    for (i, line) in lines.into_iter().enumerate() {
        batch.push_line(i + 1, line.as_ref());
    }
    batch
}

/// Lê os registros linha a linha. Uma linha que não é UTF-8 válido conta
/// como malformada, como qualquer outra linha ruim.
pub fn read_records<R: BufRead>(reader: R) -> Result<RecordBatch> {
    let mut batch = RecordBatch::default();
    for (i, line) in reader.split(b'\n').enumerate() {
        let line = line?;
        match std::str::from_utf8(&line) {
            Ok(line) => batch.push_line(i + 1, line),
            Err(e) => {
                debug!("Linha {} descartada: {}", i + 1, e);
                batch.malformed += 1;
            }
        }
    }
    Ok(batch)
}

pub fn read_records_file(path: &Path) -> Result<RecordBatch> {
    let file = File::open(path).map_err(|e| MedNerError::io(path, e))?;
    read_records(BufReader::new(file)).map_err(|e| match e {
        MedNerError::Io { source, .. } => MedNerError::io(path, source),
        other => other,
    })
}

/// Contadores de uma execução.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub records: usize,
    pub skipped_lines: usize,
    pub malformed_lines: usize,
    pub relationships: usize,
    /// Trechos produzidos pela segmentação.
    pub spans: usize,
    pub corpus: CorpusStats,
}

/// Segmentação + rotulagem sobre um conjunto fixo de autômatos.
#[derive(Debug, Clone)]
pub struct CorpusPipeline {
    indices: IndexSet,
    segmenter: TextSegmenter,
}

impl CorpusPipeline {
    pub fn new(indices: IndexSet, segmenter: TextSegmenter) -> Self {
        Self { indices, segmenter }
    }

    pub fn from_dictionary(dictionary: &CategoryDictionary, config: SegmenterConfig) -> Result<Self> {
        Ok(Self::new(
            IndexSet::build(dictionary)?,
            TextSegmenter::new(config)?,
        ))
    }

    pub fn tagger(&self) -> EntityTagger<'_> {
        EntityTagger::new(&self.indices)
    }

    /// Segmenta e rotula um texto. Devolve todos os trechos, inclusive os sem entidades.
    pub fn process_text<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> Vec<TaggedSpan> {
        let tagger = self.tagger();
        self.segmenter
            .segment(text, rng)
            .iter()
            .filter(|span| !span.is_empty())
            .map(|span| tagger.tag(span))
            .collect()
    }

    /// Todos os textos livres de um registro (`desc`, `prevent`, `cause`).
    pub fn process_record<R: Rng + ?Sized>(
        &self,
        record: &MedicalRecord,
        rng: &mut R,
    ) -> Vec<TaggedSpan> {
        record
            .corpus_texts()
            .flat_map(|text| self.process_text(text, rng))
            .collect()
    }

    /// Processa os registros em ordem com um único gerador.
    pub fn run_with_rng<R: Rng + ?Sized>(
        &self,
        records: &[MedicalRecord],
        rng: &mut R,
    ) -> (CorpusBuilder, usize) {
        let mut builder = CorpusBuilder::new();
        let mut spans = 0;
        for record in records {
            let tagged = self.process_record(record, rng);
            spans += tagged.len();
            builder.extend(tagged);
        }
        (builder, spans)
    }

    /// Processa os registros com um gerador por documento, semeado com `seed ^ índice`.
    ///
    /// `parallel` não altera o resultado, só a distribuição do trabalho.
    pub fn run_seeded(
        &self,
        records: &[MedicalRecord],
        seed: u64,
        parallel: bool,
    ) -> (CorpusBuilder, usize) {
        let per_doc = |(i, record): (usize, &MedicalRecord)| {
            let mut rng = StdRng::seed_from_u64(seed ^ i as u64);
            self.process_record(record, &mut rng)
        };

        let tagged: Vec<Vec<TaggedSpan>> = if parallel {
            records.par_iter().enumerate().map(per_doc).collect()
        } else {
            records.iter().enumerate().map(per_doc).collect()
        };

        let mut builder = CorpusBuilder::new();
        let mut spans = 0;
        for doc in tagged {
            spans += doc.len();
            builder.extend(doc);
        }
        (builder, spans)
    }
}

/// Executa o fluxo completo descrito por `config`.
pub fn run(config: &PipelineConfig) -> Result<RunSummary> {
    config.validate()?;

    let batch = read_records_file(&config.records_path)?;
    info!(
        "Registros lidos: {} ({} linhas curtas, {} malformadas)",
        batch.records.len(),
        batch.skipped,
        batch.malformed
    );

    let mut summary = RunSummary {
        records: batch.records.len(),
        skipped_lines: batch.skipped,
        malformed_lines: batch.malformed,
        ..Default::default()
    };

    if config.extract_graph {
        let mut graph = GraphExtraction::new();
        for record in &batch.records {
            graph.add_record(record);
        }
        let mut sink = FileGraphSink::new(&config.dictionary_dir, &config.relationship_path);
        sink.write_entities(&graph)?;
        sink.write_relationships(graph.relationships())?;
        summary.relationships = graph.relationships().len();
    }

    let dictionary = CategoryDictionary::load_dir(&config.dictionary_dir)?;
    let pipeline = CorpusPipeline::from_dictionary(&dictionary, config.segmenter.clone())?;

    let seed = config.seed.unwrap_or_else(rand::random);
    info!("Segmentando com semente {}", seed);
    let (builder, spans) = pipeline.run_seeded(&batch.records, seed, config.parallel);

    builder.write_file(&config.corpus_path)?;
    summary.spans = spans;
    summary.corpus = builder.stats();
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::corpus::read_corpus_file;
    use crate::tagger::{validate_bio, EntityCategory};

    // linha 2 truncada, linha 3 não é JSON, linha 4 curta demais
    const RECORDS: &str = r#"{"name": "感冒", "desc": "感冒是常见病，常伴有发烧、咳嗽。多喝水！", "prevent": "注意保暖", "cause": ["病毒感染引起感冒"], "symptom": ["发烧", "咳嗽"], "common_drug": ["感冒灵"]}
{"name": "肺炎", "desc": "肺炎多由感冒发展而来；常见症状有发烧和咳嗽。可以用阿莫西林治疗?严重时住院。"
not json at all
]
{"name": "糖尿病", "desc": "糖尿病患者应控制饮食，定期检查血糖。", "check": ["血糖"], "acompany": ["肺炎"]},
"#;

    fn dictionary() -> CategoryDictionary {
        let mut dict = CategoryDictionary::new();
        dict.extend(EntityCategory::Disease, ["感冒", "肺炎", "糖尿病"]);
        dict.extend(EntityCategory::Symptom, ["发烧", "咳嗽"]);
        dict.extend(EntityCategory::Drug, ["阿莫西林", "感冒灵"]);
        dict.extend(EntityCategory::Checkup, ["血糖"]);
        dict
    }

    fn pipeline() -> CorpusPipeline {
        CorpusPipeline::from_dictionary(&dictionary(), SegmenterConfig::default()).unwrap()
    }

    #[test]
    fn test_parse_records_skips_bad_lines() {
        let batch = parse_records(RECORDS.lines());
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.malformed, 2);
        assert_eq!(batch.skipped, 1);
    }

    #[test]
    fn test_invalid_utf8_line_counts_as_malformed() {
        let mut bytes = RECORDS.as_bytes().to_vec();
        bytes.extend_from_slice(b"{\"name\": \"\xff\xfe\"}\n");
        bytes.extend_from_slice("{\"name\": \"胃炎\"}\n".as_bytes());

        let batch = read_records(bytes.as_slice()).unwrap();
        assert_eq!(batch.records.len(), 3);
        assert_eq!(batch.malformed, 3);
        assert_eq!(batch.skipped, 1);
        assert_eq!(batch.records[2].name, "胃炎");
    }

    #[test]
    fn test_every_span_is_aligned_and_well_formed() {
        let batch = parse_records(RECORDS.lines());
        let pipeline = pipeline();
        for seed in 0..10 {
            let (builder, _) = pipeline.run_seeded(&batch.records, seed, false);
            assert!(!builder.is_empty());
            for span in builder.spans() {
                assert!(span.is_aligned());
                assert!(validate_bio(&span.labels));
                assert!(span.match_count >= 1);
            }
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let batch = parse_records(RECORDS.lines());
        let pipeline = pipeline();
        let (seq, seq_spans) = pipeline.run_seeded(&batch.records, 42, false);
        let (par, par_spans) = pipeline.run_seeded(&batch.records, 42, true);
        assert_eq!(seq.spans(), par.spans());
        assert_eq!(seq_spans, par_spans);
    }

    #[test]
    fn test_process_text_keeps_untagged_spans() {
        let pipeline = pipeline();
        let mut rng = rand::rngs::mock::StepRng::new(0, 0);
        let spans = pipeline.process_text("感冒了，多喝水，发烧", &mut rng);
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[1].text, "多喝水。");
        assert_eq!(spans[1].match_count, 0);

        let (builder, total) = pipeline.run_with_rng(
            &[MedicalRecord {
                desc: vec!["感冒了，多喝水，发烧".to_string()],
                ..Default::default()
            }],
            &mut rand::rngs::mock::StepRng::new(0, 0),
        );
        assert_eq!(total, 3);
        assert_eq!(builder.len(), 2);
        assert_eq!(builder.dropped(), 1);
    }

    #[test]
    fn test_run_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let records_path = dir.path().join("medical.json");
        fs::write(&records_path, RECORDS).unwrap();

        let config = PipelineConfig {
            records_path,
            dictionary_dir: dir.path().join("ent"),
            relationship_path: dir.path().join("rel.txt"),
            corpus_path: dir.path().join("ner.txt"),
            seed: Some(3),
            ..Default::default()
        };
        let summary = run(&config).unwrap();

        assert_eq!(summary.records, 2);
        assert_eq!(summary.malformed_lines, 2);
        assert!(summary.relationships > 0);
        assert!(summary.corpus.spans >= 1);

        let spans = read_corpus_file(&config.corpus_path).unwrap();
        assert_eq!(spans.len(), summary.corpus.spans);
        assert!(spans.iter().all(|s| s.match_count >= 1));

        // mesma semente, mesmo corpus
        let first = fs::read_to_string(&config.corpus_path).unwrap();
        run(&config).unwrap();
        assert_eq!(fs::read_to_string(&config.corpus_path).unwrap(), first);
    }
}
