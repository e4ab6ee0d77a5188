//! # Registros Médicos — Leitura Tolerante de JSON por Linha
//!
//! Cada linha do arquivo de origem é um objeto JSON descrevendo uma doença.
//! A leitura é **estrita** quanto à sintaxe (JSON inválido é rejeitado, nada é
//! avaliado) e **tolerante** quanto ao conteúdo: campos ausentes ou de tipo
//! inesperado simplesmente ficam vazios.
//!
//! Campos lidos:
//!
//! | Campo                                   | Uso                          |
//! |-----------------------------------------|------------------------------|
//! | `desc`, `prevent`, `cause`              | texto livre para o corpus    |
//! | `name`, `cure_lasttime`, `cured_prob`, `easy_get` | propriedades da doença |
//! | `common_drug`, `recommand_drug`         | medicamentos                 |
//! | `do_eat`, `recommand_eat`, `not_eat`    | alimentos                    |
//! | `check`, `cure_department`, `symptom`   | exames, departamentos, sintomas |
//! | `cure_way`, `acompany`, `drug_detail`   | tratamentos, comorbidades, fabricantes |

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{MedNerError, Result};

/// Um registro de doença já extraído do JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalRecord {
    pub name: String,
    /// Introdução (`desc`); listas viram vários textos.
    pub desc: Vec<String>,
    pub prevent: Vec<String>,
    pub cause: Vec<String>,
    pub cure_lasttime: String,
    pub cured_prob: String,
    pub easy_get: String,
    pub common_drug: Vec<String>,
    pub recommand_drug: Vec<String>,
    pub do_eat: Vec<String>,
    pub recommand_eat: Vec<String>,
    pub not_eat: Vec<String>,
    pub check: Vec<String>,
    pub cure_department: Vec<String>,
    pub symptom: Vec<String>,
    /// Cada item pode ser string ou lista; de listas fica o primeiro elemento.
    pub cure_way: Vec<String>,
    pub acompany: Vec<String>,
    /// Itens `produto,fabricante`.
    pub drug_detail: Vec<String>,
}

impl MedicalRecord {
    /// Parseia uma linha do arquivo de origem.
    ///
    /// Linhas com menos de 2 caracteres (depois do trim) devolvem `Ok(None)`.
    /// Uma vírgula final (exportações em formato de array) é tolerada.
    pub fn parse_line(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.chars().count() < 2 {
            return Ok(None);
        }
        let line = line.strip_suffix(',').unwrap_or(line);

        let value: Value = serde_json::from_str(line)
            .map_err(|e| MedNerError::MalformedRecord(e.to_string()))?;
        let Value::Object(obj) = value else {
            return Err(MedNerError::MalformedRecord(
                "top-level value is not an object".into(),
            ));
        };

        Ok(Some(Self::from_object(&obj)))
    }

    fn from_object(obj: &Map<String, Value>) -> Self {
        Self {
            name: scalar(obj, "name"),
            desc: texts(obj, "desc"),
            prevent: texts(obj, "prevent"),
            cause: texts(obj, "cause"),
            cure_lasttime: scalar(obj, "cure_lasttime"),
            cured_prob: scalar(obj, "cured_prob"),
            easy_get: scalar(obj, "easy_get"),
            common_drug: texts(obj, "common_drug"),
            recommand_drug: texts(obj, "recommand_drug"),
            do_eat: texts(obj, "do_eat"),
            recommand_eat: texts(obj, "recommand_eat"),
            not_eat: texts(obj, "not_eat"),
            check: texts(obj, "check"),
            cure_department: texts(obj, "cure_department"),
            symptom: texts(obj, "symptom"),
            cure_way: first_of_each(obj, "cure_way"),
            acompany: texts(obj, "acompany"),
            drug_detail: texts(obj, "drug_detail"),
        }
    }

    /// Os textos livres que alimentam o corpus, na ordem `desc`, `prevent`, `cause`.
    pub fn corpus_texts(&self) -> impl Iterator<Item = &str> {
        self.desc
            .iter()
            .chain(&self.prevent)
            .chain(&self.cause)
            .map(String::as_str)
            .filter(|t| !t.is_empty())
    }
}

/// Campo escalar como string. Números viram texto; listas são concatenadas.
fn scalar(obj: &Map<String, Value>, key: &str) -> String {
    match obj.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        _ => String::new(),
    }
}

/// Campo string-ou-lista como lista de strings. Itens não-string são ignorados.
fn texts(obj: &Map<String, Value>, key: &str) -> Vec<String> {
    match obj.get(key) {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn first_of_each(obj: &Map<String, Value>, key: &str) -> Vec<String> {
    let Some(Value::Array(items)) = obj.get(key) else {
        return texts(obj, key);
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.clone()),
            Value::Array(inner) => inner.first().and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_record() {
        let line = r#"{"name": "感冒", "desc": "感冒是常见病。", "prevent": ["多喝水", "勤洗手"],
            "cause": "病毒感染", "cured_prob": "95%", "easy_get": "所有人群",
            "common_drug": ["感冒灵"], "cure_way": [["药物治疗", "x"], "支持性治疗", 3],
            "drug_detail": ["感冒灵,华润三九"], "_id": {"$oid": "abc"}}"#;
        let record = MedicalRecord::parse_line(&line.replace('\n', " "))
            .unwrap()
            .unwrap();

        assert_eq!(record.name, "感冒");
        assert_eq!(record.desc, vec!["感冒是常见病。"]);
        assert_eq!(record.prevent, vec!["多喝水", "勤洗手"]);
        assert_eq!(record.cured_prob, "95%");
        assert_eq!(record.cure_way, vec!["药物治疗", "支持性治疗"]);
        assert_eq!(record.drug_detail, vec!["感冒灵,华润三九"]);
        assert!(record.symptom.is_empty());

        let texts: Vec<&str> = record.corpus_texts().collect();
        assert_eq!(texts, vec!["感冒是常见病。", "多喝水", "勤洗手", "病毒感染"]);
    }

    #[test]
    fn test_short_lines_skipped() {
        assert_eq!(MedicalRecord::parse_line("").unwrap(), None);
        assert_eq!(MedicalRecord::parse_line(" ]\n").unwrap(), None);
    }

    #[test]
    fn test_trailing_comma_tolerated() {
        let record = MedicalRecord::parse_line(r#"{"name": "肺炎"},"#).unwrap().unwrap();
        assert_eq!(record.name, "肺炎");
    }

    #[test]
    fn test_malformed_lines_rejected() {
        assert!(matches!(
            MedicalRecord::parse_line(r#"{"name": "肺炎""#),
            Err(MedNerError::MalformedRecord(_))
        ));
        assert!(matches!(
            MedicalRecord::parse_line("__import__('os')"),
            Err(MedNerError::MalformedRecord(_))
        ));
        assert!(matches!(
            MedicalRecord::parse_line(r#"["a", "b"]"#),
            Err(MedNerError::MalformedRecord(_))
        ));
    }

    #[test]
    fn test_wrong_types_ignored() {
        let record =
            MedicalRecord::parse_line(r#"{"name": 12, "desc": {"x": 1}, "symptom": "发烧"}"#)
                .unwrap()
                .unwrap();
        assert_eq!(record.name, "12");
        assert!(record.desc.is_empty());
        assert_eq!(record.symptom, vec!["发烧"]);
    }
}
