//! # Dicionários de Entidades (Gazetteers)
//!
//! Listas de entidades conhecidas, uma por categoria. São a única fonte de
//! conhecimento do rotulador: tudo o que não estiver aqui sai como `O`.
//!
//! No disco, cada categoria é um arquivo `<dir>/<rótulo do grafo>.txt` com uma
//! entidade por linha — o mesmo layout gravado por
//! [`FileGraphSink`](crate::graph::FileGraphSink).

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{MedNerError, Result};
use crate::tagger::EntityCategory;

/// Entradas com menos caracteres do que isso são ignoradas.
pub const MIN_ENTITY_CHARS: usize = 2;

/// Conjunto de strings por categoria, sem duplicatas dentro da categoria.
///
/// A mesma string pode estar em categorias diferentes; cada categoria é
/// casada de forma independente.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryDictionary {
    entries: [BTreeSet<String>; 8],
}

impl CategoryDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adiciona uma entidade. Retorna `false` se ela for curta demais ou já existir.
    ///
    /// Só um `\r` final é removido; o resto da string entra como veio.
    pub fn insert(&mut self, category: EntityCategory, name: &str) -> bool {
        let name = name.strip_suffix('\r').unwrap_or(name);
        if name.chars().count() < MIN_ENTITY_CHARS {
            return false;
        }
        self.entries[category.index()].insert(name.to_string())
    }

    pub fn extend<I, S>(&mut self, category: EntityCategory, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.insert(category, name.as_ref());
        }
    }

    pub fn contains(&self, category: EntityCategory, name: &str) -> bool {
        self.entries[category.index()].contains(name)
    }

    /// Entradas de uma categoria, em ordem lexicográfica.
    pub fn entries(&self, category: EntityCategory) -> impl Iterator<Item = &str> {
        self.entries[category.index()].iter().map(String::as_str)
    }

    pub fn len(&self, category: EntityCategory) -> usize {
        self.entries[category.index()].len()
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Caminho do arquivo de uma categoria dentro de `dir`.
    pub fn file_path(dir: &Path, category: EntityCategory) -> PathBuf {
        dir.join(format!("{}.txt", category.graph_label()))
    }

    /// Lê um arquivo de dicionário para dentro de uma categoria.
    pub fn load_file(&mut self, category: EntityCategory, path: &Path) -> Result<usize> {
        let content = fs::read_to_string(path).map_err(|e| MedNerError::io(path, e))?;
        let before = self.len(category);
        for line in content.lines() {
            self.insert(category, line);
        }
        Ok(self.len(category) - before)
    }

    /// Carrega as 8 categorias de `dir`. Arquivo ausente vira categoria vazia.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut dict = Self::new();
        for category in EntityCategory::ALL {
            let path = Self::file_path(dir, category);
            if !path.exists() {
                warn!("Dicionário ausente para {}: {}", category, path.display());
                continue;
            }
            let added = dict.load_file(category, &path)?;
            info!("Dicionário {}: {} entidades", category, added);
        }
        Ok(dict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_dedup_and_min_length() {
        let mut dict = CategoryDictionary::new();
        assert!(dict.insert(EntityCategory::Drug, "阿莫西林"));
        assert!(!dict.insert(EntityCategory::Drug, "阿莫西林"));
        assert!(!dict.insert(EntityCategory::Drug, "药"));
        assert!(!dict.insert(EntityCategory::Drug, "药\r"));
        assert_eq!(dict.len(EntityCategory::Drug), 1);
    }

    #[test]
    fn test_insert_keeps_surrounding_spaces() {
        let mut dict = CategoryDictionary::new();
        assert!(dict.insert(EntityCategory::Disease, " 癌"));
        assert!(dict.contains(EntityCategory::Disease, " 癌"));
        assert!(!dict.contains(EntityCategory::Disease, "癌"));
        assert!(dict.insert(EntityCategory::Disease, "肺炎\r"));
        assert!(dict.contains(EntityCategory::Disease, "肺炎"));
    }

    #[test]
    fn test_cross_category_duplicates_allowed() {
        let mut dict = CategoryDictionary::new();
        assert!(dict.insert(EntityCategory::Food, "阿胶"));
        assert!(dict.insert(EntityCategory::Drug, "阿胶"));
        assert_eq!(dict.total(), 2);
        assert!(dict.contains(EntityCategory::Food, "阿胶"));
        assert!(dict.contains(EntityCategory::Drug, "阿胶"));
    }

    #[test]
    fn test_load_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("Disease.txt"),
            "感冒\r\n肺炎\n\n感冒\n癌\n",
        )
        .unwrap();
        fs::write(dir.path().join("Symptom.txt"), "发烧\n咳嗽\n").unwrap();

        let dict = CategoryDictionary::load_dir(dir.path()).unwrap();
        assert_eq!(dict.len(EntityCategory::Disease), 2);
        assert_eq!(dict.len(EntityCategory::Symptom), 2);
        assert_eq!(dict.len(EntityCategory::Drug), 0);
        let diseases: Vec<&str> = dict.entries(EntityCategory::Disease).collect();
        assert_eq!(diseases, vec!["感冒", "肺炎"]);
    }

    #[test]
    fn test_file_path_uses_graph_label() {
        let path = CategoryDictionary::file_path(Path::new("data"), EntityCategory::DrugCompany);
        assert_eq!(path, Path::new("data").join("DrugCompany.txt"));
    }
}
