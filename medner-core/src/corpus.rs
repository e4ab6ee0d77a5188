//! # Corpus de Treino com Anotações BIO
//!
//! Formato em disco, um caractere por linha e uma linha em branco entre trechos:
//!
//! ```text
//! 感 B-Disease
//! 冒 I-Disease
//! 伴 O
//! 有 O
//! 发 B-Disease Symptoms
//! 烧 I-Disease Symptoms
//! 。 O
//!
//! ```
//!
//! O rótulo vai do primeiro espaço até o fim da linha; alguns nomes de
//! categoria têm espaço (`Disease Symptoms`, `Drug Company`).

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{MedNerError, Result};
use crate::tagger::{EntityCategory, Tag, TaggedSpan};

/// Acumula os trechos que vão para o corpus.
///
/// Só entram trechos com pelo menos uma entidade. A ordem de entrada é
/// preservada e não há deduplicação.
#[derive(Debug, Clone, Default)]
pub struct CorpusBuilder {
    spans: Vec<TaggedSpan>,
    dropped: usize,
}

impl CorpusBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adiciona um trecho rotulado. Retorna `false` se ele foi descartado
    /// por não ter entidades.
    ///
    /// # Panics
    ///
    /// Se o número de rótulos diferir do número de caracteres: isso é bug do
    /// rotulador, e o corpus não pode ser gravado com o trecho desalinhado.
    pub fn push(&mut self, tagged: TaggedSpan) -> bool {
        assert_eq!(
            tagged.labels.len(),
            tagged.text.chars().count(),
            "label/text length mismatch for span {:?}",
            tagged.text
        );
        if tagged.match_count == 0 {
            self.dropped += 1;
            return false;
        }
        self.spans.push(tagged);
        true
    }

    pub fn extend(&mut self, spans: impl IntoIterator<Item = TaggedSpan>) {
        for span in spans {
            self.push(span);
        }
    }

    pub fn spans(&self) -> &[TaggedSpan] {
        &self.spans
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Trechos descartados por não terem nenhuma entidade.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn write_to<W: Write>(&self, mut out: W) -> io::Result<()> {
        for span in &self.spans {
            write_span(&mut out, span)?;
        }
        out.flush()
    }

    pub fn write_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| MedNerError::io(parent, e))?;
        }
        let file = File::create(path).map_err(|e| MedNerError::io(path, e))?;
        self.write_to(BufWriter::new(file))
            .map_err(|e| MedNerError::io(path, e))?;
        info!(
            "Corpus gravado em {}: {} trechos ({} descartados sem entidades)",
            path.display(),
            self.len(),
            self.dropped
        );
        Ok(())
    }

    pub fn stats(&self) -> CorpusStats {
        CorpusStats::from_spans(&self.spans)
    }
}

/// Grava um trecho: `caractere rótulo` por linha e uma linha em branco.
pub fn write_span<W: Write>(out: &mut W, span: &TaggedSpan) -> io::Result<()> {
    for (c, tag) in span.text.chars().zip(&span.labels) {
        writeln!(out, "{} {}", c, tag.label())?;
    }
    writeln!(out)
}

/// Lê um corpus no formato acima de volta para trechos rotulados.
pub fn read_corpus<R: BufRead>(reader: R) -> Result<Vec<TaggedSpan>> {
    let mut spans = Vec::new();
    let mut text = String::new();
    let mut labels = Vec::new();

    let mut flush = |text: &mut String, labels: &mut Vec<Tag>| {
        if !labels.is_empty() {
            let labels = std::mem::take(labels);
            spans.push(TaggedSpan {
                text: std::mem::take(text),
                match_count: labels.iter().filter(|t| matches!(t, Tag::Begin(_))).count(),
                labels,
            });
        }
    };

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.is_empty() {
            flush(&mut text, &mut labels);
            continue;
        }

        let mut chars = line.chars();
        let (Some(c), Some(' ')) = (chars.next(), chars.next()) else {
            return Err(MedNerError::MalformedCorpus {
                line: i + 1,
                message: format!("expected `<char> <label>`, got {line:?}"),
            });
        };
        let tag = Tag::from_label(chars.as_str()).ok_or_else(|| MedNerError::MalformedCorpus {
            line: i + 1,
            message: format!("unknown label {:?}", chars.as_str()),
        })?;

        text.push(c);
        labels.push(tag);
    }
    flush(&mut text, &mut labels);

    Ok(spans)
}

pub fn read_corpus_file(path: &Path) -> Result<Vec<TaggedSpan>> {
    let file = File::open(path).map_err(|e| MedNerError::io(path, e))?;
    read_corpus(BufReader::new(file))
}

/// Estatísticas do corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusStats {
    pub spans: usize,
    pub chars: usize,
    /// Entidades por categoria (contagem de `B-`).
    pub entities: BTreeMap<EntityCategory, usize>,
}

impl CorpusStats {
    pub fn from_spans(spans: &[TaggedSpan]) -> Self {
        let mut stats = CorpusStats {
            spans: spans.len(),
            ..Default::default()
        };
        for span in spans {
            stats.chars += span.labels.len();
            for tag in &span.labels {
                if let Tag::Begin(cat) = tag {
                    *stats.entities.entry(*cat).or_insert(0) += 1;
                }
            }
        }
        stats
    }

    pub fn total_entities(&self) -> usize {
        self.entities.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::IndexSet;
    use crate::dictionary::CategoryDictionary;
    use crate::tagger::EntityTagger;

    fn tagger_set() -> IndexSet {
        let mut dict = CategoryDictionary::new();
        dict.insert(EntityCategory::Disease, "感冒");
        dict.insert(EntityCategory::Symptom, "发烧");
        dict.insert(EntityCategory::DrugCompany, "同仁堂");
        IndexSet::build(&dict).unwrap()
    }

    #[test]
    fn test_filters_spans_without_entities() {
        let set = tagger_set();
        let tagger = EntityTagger::new(&set);
        let mut builder = CorpusBuilder::new();

        assert!(builder.push(tagger.tag("感冒伴有发烧。")));
        assert!(!builder.push(tagger.tag("多喝热水。")));
        assert!(!builder.push(tagger.tag("")));
        assert!(builder.push(tagger.tag("感冒伴有发烧。")));

        assert_eq!(builder.len(), 2);
        assert_eq!(builder.dropped(), 2);
        assert!(builder.spans().iter().all(|s| s.match_count >= 1));
    }

    #[test]
    fn test_write_format() {
        let set = tagger_set();
        let mut builder = CorpusBuilder::new();
        builder.push(EntityTagger::new(&set).tag("感冒了"));

        let mut out = Vec::new();
        builder.write_to(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "感 B-Disease\n冒 I-Disease\n了 O\n\n"
        );
    }

    #[test]
    #[should_panic(expected = "label/text length mismatch")]
    fn test_misaligned_span_panics() {
        let mut builder = CorpusBuilder::new();
        builder.push(TaggedSpan {
            text: "感冒".to_string(),
            labels: vec![Tag::Begin(EntityCategory::Disease)],
            match_count: 1,
        });
    }

    #[test]
    fn test_read_back_written_corpus() {
        let set = tagger_set();
        let tagger = EntityTagger::new(&set);
        let mut builder = CorpusBuilder::new();
        builder.push(tagger.tag("感冒伴有发烧。"));
        builder.push(tagger.tag("同仁堂 出品"));

        let mut out = Vec::new();
        builder.write_to(&mut out).unwrap();
        let spans = read_corpus(out.as_slice()).unwrap();

        assert_eq!(spans, builder.spans());
        assert_eq!(spans[1].labels[3], Tag::Outside);
        assert_eq!(spans[1].labels[0], Tag::Begin(EntityCategory::DrugCompany));
    }

    #[test]
    fn test_read_rejects_bad_lines() {
        let err = read_corpus("感 B-Disease\n冒\n".as_bytes()).unwrap_err();
        assert!(matches!(err, MedNerError::MalformedCorpus { line: 2, .. }));
        let err = read_corpus("感 B-Virus\n".as_bytes()).unwrap_err();
        assert!(matches!(err, MedNerError::MalformedCorpus { line: 1, .. }));
    }

    #[test]
    fn test_stats() {
        let set = tagger_set();
        let tagger = EntityTagger::new(&set);
        let mut builder = CorpusBuilder::new();
        builder.push(tagger.tag("感冒伴有发烧。"));
        builder.push(tagger.tag("感冒。"));

        let stats = builder.stats();
        assert_eq!(stats.spans, 2);
        assert_eq!(stats.chars, 10);
        assert_eq!(stats.entities[&EntityCategory::Disease], 2);
        assert_eq!(stats.entities[&EntityCategory::Symptom], 1);
        assert_eq!(stats.total_entities(), 3);
    }

    #[test]
    fn test_write_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ner_data.txt");
        let set = tagger_set();
        let mut builder = CorpusBuilder::new();
        builder.push(EntityTagger::new(&set).tag("发烧"));
        builder.write_file(&path).unwrap();

        let spans = read_corpus_file(&path).unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].match_count, 1);
    }
}
