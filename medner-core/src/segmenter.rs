//! # Segmentador de Texto — Trechos Curtos para Treino
//!
//! Os campos de texto dos registros (`desc`, `prevent`, `cause`) são longos
//! demais para virar uma amostra de treino só. O segmentador:
//!
//! 1. Troca quebras de linha por `,`.
//! 2. Quebra o texto em pseudo-sentenças na pontuação, guardando cada sinal
//!    junto da sentença que ele fecha.
//! 3. Junta as sentenças num buffer e decide, a cada uma, se descarrega o
//!    buffer como um trecho pronto. Dois gatilhos aleatórios independentes:
//!    buffer acima de `max_len` (90%) ou descarga incondicional (15%).
//! 4. Com 30% de chance, troca (ou acrescenta) a pontuação final por `。`.
//!
//! O resultado tem comprimento irregular, tendendo a `max_len` caracteres.
//! A aleatoriedade vem sempre de fora (`rng`), nunca de um gerador global.

use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{MedNerError, Result};

/// Pontuação que fecha uma pseudo-sentença (conjunto `P`).
pub const PUNCTUATION: [char; 10] = ['，', '。', '！', '；', '：', ',', '.', '?', '!', ';'];

/// Sinal usado na reescrita da pontuação final.
pub const FULL_STOP: char = '。';

/// Interrogação de largura cheia: separa sentenças mas não é preservada.
const DROPPED_SEPARATOR: char = '？';

static BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[，。！；：,.?!;？]").expect("boundary regex is valid"));

pub fn is_punctuation(c: char) -> bool {
    PUNCTUATION.contains(&c)
}

/// Parâmetros do segmentador.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Comprimento (em caracteres) a partir do qual o buffer tende a ser descarregado.
    pub max_len: usize,
    /// Chance de descarregar quando o buffer passou de `max_len`.
    pub long_flush_prob: f64,
    /// Chance de descarregar a qualquer momento.
    pub random_flush_prob: f64,
    /// Chance de reescrever a pontuação final como `。`.
    pub full_stop_prob: f64,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            max_len: 30,
            long_flush_prob: 0.9,
            random_flush_prob: 0.15,
            full_stop_prob: 0.3,
        }
    }
}

impl SegmenterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_len == 0 {
            return Err(MedNerError::Config("max_len must be positive".into()));
        }
        let probs = [
            ("long_flush_prob", self.long_flush_prob),
            ("random_flush_prob", self.random_flush_prob),
            ("full_stop_prob", self.full_stop_prob),
        ];
        for (name, p) in probs {
            if !(0.0..=1.0).contains(&p) {
                return Err(MedNerError::Config(format!(
                    "{name} must be within [0, 1], got {p}"
                )));
            }
        }
        Ok(())
    }
}

/// Uma pseudo-sentença e o sinal de pontuação que a encerra.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    pub text: String,
    pub punctuation: Option<char>,
}

impl Sentence {
    fn char_len(&self) -> usize {
        self.text.chars().count() + usize::from(self.punctuation.is_some())
    }

    fn push_onto(&self, buf: &mut String) {
        buf.push_str(&self.text);
        if let Some(p) = self.punctuation {
            buf.push(p);
        }
    }
}

/// Quebra o texto em pseudo-sentenças.
///
/// - Um sinal de `P` seguido de mais texto fecha a sentença corrente.
/// - Um sinal de `P` no fim do texto fica dentro da última sentença, exceto `,`,
///   que é descartado.
/// - `？` separa sentenças e é descartado.
/// - Fragmentos vazios são descartados junto com o seu sinal, assim como um
///   resto final que seja só um sinal de `P` (`感冒。。`).
pub fn split_sentences(text: &str) -> Vec<Sentence> {
    let text = text.replace('\n', ",");
    let mut sentences = Vec::new();
    let mut last = 0;

    let mut push = |fragment: &str, punctuation: Option<char>| {
        if !fragment.is_empty() {
            sentences.push(Sentence {
                text: fragment.to_string(),
                punctuation,
            });
        }
    };

    for m in BOUNDARY.find_iter(&text) {
        let Some(mark) = m.as_str().chars().next() else {
            continue;
        };
        let at_end = m.end() == text.len();
        let fragment = &text[last..m.start()];

        if mark == DROPPED_SEPARATOR || (mark == ',' && at_end) {
            push(fragment, None);
        } else if at_end {
            break;
        } else {
            push(fragment, Some(mark));
        }
        last = m.end();
    }
    let rest = &text[last..];
    let mut rest_chars = rest.chars();
    let lone_mark = matches!(
        (rest_chars.next(), rest_chars.next()),
        (Some(c), None) if is_punctuation(c)
    );
    if !lone_mark {
        push(rest, None);
    }

    sentences
}

/// Troca a pontuação final por `。`, ou acrescenta `。` se não houver.
pub fn force_full_stop(mut span: String) -> String {
    if span.chars().next_back().is_some_and(is_punctuation) {
        span.pop();
    }
    span.push(FULL_STOP);
    span
}

/// Segmentador estocástico de texto.
#[derive(Debug, Clone, Default)]
pub struct TextSegmenter {
    config: SegmenterConfig,
}

impl TextSegmenter {
    pub fn new(config: SegmenterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Divide `text` em trechos de treino.
    pub fn segment<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> Vec<String> {
        let cfg = &self.config;
        let mut spans = Vec::new();
        let mut buf = String::new();
        let mut buf_len = 0;

        for sentence in split_sentences(text) {
            let long = buf_len > cfg.max_len && rng.gen_bool(cfg.long_flush_prob);
            let flush = (long || rng.gen_bool(cfg.random_flush_prob)) && buf_len > 0;

            if flush {
                spans.push(std::mem::take(&mut buf));
                buf_len = 0;
            }
            sentence.push_onto(&mut buf);
            buf_len += sentence.char_len();
        }
        if !buf.is_empty() {
            spans.push(buf);
        }

        spans
            .into_iter()
            .map(|span| {
                if rng.gen_bool(cfg.full_stop_prob) {
                    force_full_stop(span)
                } else {
                    span
                }
            })
            .collect()
    }
}
