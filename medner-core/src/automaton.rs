//! # Índice de Padrões — Autômato Aho-Corasick por Categoria
//!
//! Cada categoria de entidade ganha o seu próprio autômato, construído uma única
//! vez a partir do [`CategoryDictionary`](crate::dictionary::CategoryDictionary).
//! Uma busca percorre o texto uma vez só e devolve **todas** as ocorrências,
//! inclusive as sobrepostas: "感冒" e "感冒发烧" começando na mesma posição
//! aparecem ambas. Quem decide qual delas fica é o [`EntityTagger`](crate::tagger::EntityTagger).
//!
//! ## Coordenadas
//!
//! O autômato trabalha em bytes, mas o corpus é rotulado caractere a caractere.
//! Toda [`Match`] sai em índices de caractere (`char`), com `end` **inclusivo**.

use aho_corasick::{AhoCorasick, MatchKind};
use serde::{Deserialize, Serialize};

use crate::dictionary::{CategoryDictionary, MIN_ENTITY_CHARS};
use crate::error::{MedNerError, Result};
use crate::tagger::EntityCategory;

/// Uma ocorrência de entrada do dicionário dentro de um texto.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// Índice do primeiro caractere.
    pub start: usize,
    /// Índice do último caractere (inclusivo).
    pub end: usize,
    pub category: EntityCategory,
    /// A string do dicionário que casou.
    pub text: String,
}

impl Match {
    /// Comprimento em caracteres.
    pub fn char_len(&self) -> usize {
        self.end - self.start + 1
    }
}

/// Tabela de conversão byte → caractere para um texto.
pub(crate) struct CharOffsets {
    byte_starts: Vec<usize>,
}

impl CharOffsets {
    pub(crate) fn new(text: &str) -> Self {
        Self {
            byte_starts: text.char_indices().map(|(b, _)| b).collect(),
        }
    }

    /// Índice de caractere para um offset de byte que cai numa fronteira de char.
    fn char_at(&self, byte: usize) -> usize {
        self.byte_starts
            .binary_search(&byte)
            .unwrap_or_else(|i| i)
    }
}

/// Autômato de uma categoria. Imutável depois de construído.
#[derive(Debug, Clone)]
pub struct PatternIndex {
    category: EntityCategory,
    /// `None` quando o dicionário da categoria está vazio.
    automaton: Option<AhoCorasick>,
    /// Padrão de cada `PatternID`, na ordem em que foi inserido.
    patterns: Vec<String>,
}

impl PatternIndex {
    /// Constrói o autômato. Strings com menos de 2 caracteres são descartadas
    /// em silêncio.
    pub fn build<I, S>(category: EntityCategory, strings: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns: Vec<String> = strings
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .filter(|s| s.chars().count() >= MIN_ENTITY_CHARS)
            .collect();

        if patterns.is_empty() {
            return Ok(Self {
                category,
                automaton: None,
                patterns,
            });
        }

        // Standard é o único modo que suporta busca sobreposta
        let automaton = AhoCorasick::builder()
            .match_kind(MatchKind::Standard)
            .build(&patterns)
            .map_err(|e| MedNerError::Automaton {
                category: category.name().to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            category,
            automaton: Some(automaton),
            patterns,
        })
    }

    pub fn category(&self) -> EntityCategory {
        self.category
    }

    /// Número de padrões efetivamente indexados.
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Todas as ocorrências de qualquer padrão em `text`, em todas as posições.
    pub fn search(&self, text: &str) -> Vec<Match> {
        self.search_with(text, &CharOffsets::new(text))
    }

    pub(crate) fn search_with(&self, text: &str, offsets: &CharOffsets) -> Vec<Match> {
        let Some(automaton) = &self.automaton else {
            return Vec::new();
        };

        automaton
            .find_overlapping_iter(text)
            .map(|m| {
                let start = offsets.char_at(m.start());
                // m.end() é exclusivo em bytes; o último char começa antes dele
                let end = offsets.char_at(m.end()) - 1;
                Match {
                    start,
                    end,
                    category: self.category,
                    text: self.patterns[m.pattern().as_usize()].clone(),
                }
            })
            .collect()
    }
}

/// Os 8 autômatos de uma execução, um por categoria, na ordem de
/// [`EntityCategory::ALL`]. Compartilhado somente para leitura entre threads.
#[derive(Debug, Clone)]
pub struct IndexSet {
    indices: Vec<PatternIndex>,
}

impl IndexSet {
    /// Constrói um índice para cada categoria do dicionário.
    pub fn build(dictionary: &CategoryDictionary) -> Result<Self> {
        let indices = EntityCategory::ALL
            .iter()
            .map(|&cat| PatternIndex::build(cat, dictionary.entries(cat)))
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(
            "Autômatos construídos: {} padrões em {} categorias",
            indices.iter().map(|i| i.pattern_count()).sum::<usize>(),
            indices.len()
        );

        Ok(Self { indices })
    }

    pub fn get(&self, category: EntityCategory) -> &PatternIndex {
        &self.indices[category.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &PatternIndex> {
        self.indices.iter()
    }

    /// Roda os 8 autômatos sobre `text`, em ordem de categoria.
    pub fn search_all(&self, text: &str) -> Vec<Match> {
        let offsets = CharOffsets::new(text);
        self.indices
            .iter()
            .flat_map(|index| index.search_with(text, &offsets))
            .collect()
    }
}
