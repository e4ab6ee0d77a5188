//! # Esquema de Tags BIO, Categorias Médicas e Rotulador
//!
//! Define o esquema de anotação **BIO** (Beginning-Inside-Outside) usado para
//! rotular cada **caractere** de um trecho de texto, e o [`EntityTagger`] que
//! produz esses rótulos a partir dos dicionários de entidades.
//!
//! ## Categorias de Entidades
//!
//! | Variante      | Nome no rótulo     | Rótulo no grafo | Exemplos             |
//! |---------------|--------------------|-----------------|----------------------|
//! | `Disease`     | Disease            | Disease         | 感冒, 糖尿病          |
//! | `Symptom`     | Disease Symptoms   | Symptom         | 发烧, 咳嗽            |
//! | `Checkup`     | Checkup Item       | Checkup         | 血常规, CT检查        |
//! | `Department`  | Department         | Department      | 内科, 儿科            |
//! | `Food`        | Food               | Food            | 鸡蛋, 苹果            |
//! | `DrugCompany` | Drug Company       | DrugCompany     | 同仁堂                |
//! | `Treatment`   | Treatment Method   | Treatment       | 药物治疗, 手术治疗    |
//! | `Drug`        | Drug               | Drug            | 阿莫西林              |
//!
//! ## Esquema BIO
//!
//! - `B-TAG`: Begin — primeiro caractere de uma entidade
//! - `I-TAG`: Inside — caracteres seguintes da mesma entidade
//! - `O`: Outside — fora de qualquer entidade

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::automaton::{IndexSet, Match};

/// Categorias de entidade do grafo médico.
///
/// A ordem das variantes é estável e serve de desempate no rotulador quando
/// duas ocorrências têm o mesmo comprimento.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityCategory {
    /// **Doença**: 感冒, 肺炎.
    Disease,
    /// **Sintoma**: 发烧, 头痛.
    Symptom,
    /// **Exame**: 血常规, 胸部CT.
    Checkup,
    /// **Departamento**: 呼吸内科.
    Department,
    /// **Alimento**: recomendado ou a evitar.
    Food,
    /// **Fabricante** de medicamentos.
    DrugCompany,
    /// **Tratamento**: 药物治疗, 支持性治疗.
    Treatment,
    /// **Medicamento**.
    Drug,
}

impl EntityCategory {
    /// Todas as categorias, na ordem de desempate.
    pub const ALL: [EntityCategory; 8] = [
        EntityCategory::Disease,
        EntityCategory::Symptom,
        EntityCategory::Checkup,
        EntityCategory::Department,
        EntityCategory::Food,
        EntityCategory::DrugCompany,
        EntityCategory::Treatment,
        EntityCategory::Drug,
    ];

    /// Nome legível, usado nos rótulos do corpus (ex: `B-Disease Symptoms`).
    pub fn name(&self) -> &'static str {
        match self {
            EntityCategory::Disease => "Disease",
            EntityCategory::Symptom => "Disease Symptoms",
            EntityCategory::Checkup => "Checkup Item",
            EntityCategory::Department => "Department",
            EntityCategory::Food => "Food",
            EntityCategory::DrugCompany => "Drug Company",
            EntityCategory::Treatment => "Treatment Method",
            EntityCategory::Drug => "Drug",
        }
    }

    /// Rótulo do nó no grafo; também é o nome do arquivo de dicionário.
    pub fn graph_label(&self) -> &'static str {
        match self {
            EntityCategory::Disease => "Disease",
            EntityCategory::Symptom => "Symptom",
            EntityCategory::Checkup => "Checkup",
            EntityCategory::Department => "Department",
            EntityCategory::Food => "Food",
            EntityCategory::DrugCompany => "DrugCompany",
            EntityCategory::Treatment => "Treatment",
            EntityCategory::Drug => "Drug",
        }
    }

    /// Posição em [`EntityCategory::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Tenta parsear a partir do nome legível (ex: "Checkup Item" → Some(Checkup))
    pub fn from_name(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == s)
    }

    /// Tenta parsear a partir do rótulo do grafo (ex: "DrugCompany")
    pub fn from_graph_label(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.graph_label() == s)
    }
}

impl std::fmt::Display for EntityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Tag BIO aplicada a um caractere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tag {
    /// **Begin**: primeiro caractere da entidade. Ex: **感**冒 (B-Disease).
    Begin(EntityCategory),
    /// **Inside**: continuação da entidade. Ex: 感**冒** (I-Disease).
    Inside(EntityCategory),
    /// **Outside**: fora de qualquer entidade.
    Outside,
}

impl Tag {
    /// Representação textual da tag (ex: "B-Disease", "I-Drug", "O")
    pub fn label(&self) -> String {
        match self {
            Tag::Begin(cat) => format!("B-{}", cat.name()),
            Tag::Inside(cat) => format!("I-{}", cat.name()),
            Tag::Outside => "O".to_string(),
        }
    }

    /// Retorna a categoria desta tag (se for B- ou I-)
    pub fn category(&self) -> Option<EntityCategory> {
        match self {
            Tag::Begin(c) | Tag::Inside(c) => Some(*c),
            Tag::Outside => None,
        }
    }

    /// Verifica se a transição tag_prev → self é válida no esquema BIO
    ///
    /// Regras:
    /// - `I-X` só pode seguir `B-X` ou `I-X` (mesma categoria)
    /// - `B-X` pode seguir qualquer tag
    /// - `O` pode seguir qualquer tag
    pub fn is_valid_transition(prev: &Tag, next: &Tag) -> bool {
        match next {
            Tag::Inside(cat) => match prev {
                Tag::Begin(prev_cat) | Tag::Inside(prev_cat) => prev_cat == cat,
                _ => false,
            },
            _ => true,
        }
    }

    /// Parseia uma tag a partir de string (ex: "B-Drug Company" → Begin(DrugCompany))
    pub fn from_label(s: &str) -> Option<Self> {
        if s == "O" {
            return Some(Tag::Outside);
        }
        let (prefix, name) = s.split_once('-')?;
        let cat = EntityCategory::from_name(name)?;
        match prefix {
            "B" => Some(Tag::Begin(cat)),
            "I" => Some(Tag::Inside(cat)),
            _ => None,
        }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Verifica se uma sequência inteira é BIO bem formada: nenhum `I-X` abre
/// uma sequência nem segue algo que não seja `B-X`/`I-X`.
pub fn validate_bio(labels: &[Tag]) -> bool {
    let mut prev = Tag::Outside;
    for tag in labels {
        if !Tag::is_valid_transition(&prev, tag) {
            return false;
        }
        prev = *tag;
    }
    true
}

/// Um trecho de texto com um rótulo por caractere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedSpan {
    pub text: String,
    pub labels: Vec<Tag>,
    /// Quantidade de entidades aceitas pelo rotulador.
    pub match_count: usize,
}

impl TaggedSpan {
    /// `labels.len() == text.chars().count()`
    pub fn is_aligned(&self) -> bool {
        self.labels.len() == self.text.chars().count()
    }
}

/// Uma entidade reconstruída a partir da sequência BIO.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpan {
    /// Texto da entidade (ex: "感冒发烧")
    pub text: String,
    pub category: EntityCategory,
    /// Índice de caractere inicial
    pub start: usize,
    /// Índice de caractere final (inclusivo)
    pub end: usize,
}

/// Converte uma sequência BIO em entidades.
///
/// Máquina de estados do esquema BIO:
/// - Inicia uma nova entidade ao encontrar `B-XXX`.
/// - Continua enquanto encontrar `I-XXX` da **mesma** categoria.
/// - Finaliza ao encontrar `O`, `B-YYY` ou `I-YYY` de outra categoria.
///
/// # Exemplo
/// `[B-Disease, I-Disease, O, B-Drug, I-Drug]` -> `[EntitySpan(Disease), EntitySpan(Drug)]`
pub fn labels_to_entities(text: &str, labels: &[Tag]) -> Vec<EntitySpan> {
    let chars: Vec<char> = text.chars().collect();
    let mut spans = Vec::new();
    let mut i = 0;

    while i < labels.len().min(chars.len()) {
        if let Tag::Begin(cat) = labels[i] {
            let mut j = i + 1;
            while j < labels.len().min(chars.len()) && labels[j] == Tag::Inside(cat) {
                j += 1;
            }
            spans.push(EntitySpan {
                text: chars[i..j].iter().collect(),
                category: cat,
                start: i,
                end: j - 1,
            });
            i = j;
        } else {
            i += 1;
        }
    }

    spans
}

/// Intervalos `[start, end]` já rotulados numa única chamada de [`EntityTagger::tag`].
///
/// Os intervalos guardados são sempre disjuntos, indexados pelo início.
#[derive(Debug, Default)]
struct OccupiedSpans {
    intervals: BTreeMap<usize, usize>,
}

impl OccupiedSpans {
    fn overlaps(&self, start: usize, end: usize) -> bool {
        // O último intervalo que começa até `end` é o único candidato
        self.intervals
            .range(..=end)
            .next_back()
            .is_some_and(|(_, &occupied_end)| occupied_end >= start)
    }

    /// Reserva `[start, end]` se estiver livre.
    fn try_claim(&mut self, start: usize, end: usize) -> bool {
        if self.overlaps(start, end) {
            return false;
        }
        self.intervals.insert(start, end);
        true
    }
}

/// Rotulador por dicionário: maior ocorrência primeiro, sem sobreposição.
///
/// Função pura do texto e dos autômatos: rotular o mesmo texto duas vezes
/// devolve os mesmos rótulos.
#[derive(Debug, Clone, Copy)]
pub struct EntityTagger<'a> {
    indices: &'a IndexSet,
}

impl<'a> EntityTagger<'a> {
    pub fn new(indices: &'a IndexSet) -> Self {
        Self { indices }
    }

    /// Rotula cada caractere de `text`.
    ///
    /// 1. Todos os caracteres começam como `O`.
    /// 2. Coleta as ocorrências das 8 categorias.
    /// 3. Ordena por comprimento decrescente, depois categoria, depois início.
    /// 4. Aceita gulosamente as que não colidem com nenhuma já aceita,
    ///    independentemente da categoria.
    pub fn tag(&self, text: &str) -> TaggedSpan {
        let len = text.chars().count();
        let mut labels = vec![Tag::Outside; len];

        let mut matches = self.indices.search_all(text);
        matches.sort_by(|a, b| {
            b.char_len()
                .cmp(&a.char_len())
                .then(a.category.cmp(&b.category))
                .then(a.start.cmp(&b.start))
        });

        let mut occupied = OccupiedSpans::default();
        let mut match_count = 0;

        for m in &matches {
            if !occupied.try_claim(m.start, m.end) {
                continue;
            }
            apply_match(&mut labels, m);
            match_count += 1;
        }

        TaggedSpan {
            text: text.to_string(),
            labels,
            match_count,
        }
    }
}

fn apply_match(labels: &mut [Tag], m: &Match) {
    labels[m.start] = Tag::Begin(m.category);
    for label in &mut labels[m.start + 1..=m.end] {
        *label = Tag::Inside(m.category);
    }
}
