//! # Extração do Grafo de Conhecimento
//!
//! Transforma registros médicos em entidades e relações para importação num
//! banco de grafos. A importação em si fica fora deste crate: quem consome o
//! resultado implementa [`GraphSink`]. O [`FileGraphSink`] grava:
//!
//! - `<dir>/<rótulo>.txt` — uma entidade por linha, por categoria. São os
//!   mesmos arquivos que o [`CategoryDictionary`] lê para gerar o corpus.
//! - `<dir>/disease_properties.jsonl` — propriedades de cada doença.
//! - o arquivo de relações — uma tupla por linha, campos separados por espaço.
//!
//! ## Relações
//!
//! | Sujeito     | Relação             | Objeto      | Origem                      |
//! |-------------|---------------------|-------------|-----------------------------|
//! | Disease     | UsesDrug            | Drug        | `common_drug`, `recommand_drug` |
//! | Disease     | RecommendedFood     | Food        | `do_eat`, `recommand_eat`   |
//! | Disease     | AvoidFood           | Food        | `not_eat`                   |
//! | Disease     | RequiresCheckup     | Checkup     | `check`                     |
//! | Disease     | BelongsToDepartment | Department  | último de `cure_department` |
//! | Disease     | HasSymptom          | Symptom     | `symptom`                   |
//! | Disease     | TreatmentMethod     | Treatment   | `cure_way`                  |
//! | Disease     | ComorbidWith        | Disease     | `acompany`                  |
//! | DrugCompany | Produces            | Drug        | `drug_detail`               |

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dictionary::{CategoryDictionary, MIN_ENTITY_CHARS};
use crate::error::{MedNerError, Result};
use crate::record::MedicalRecord;
use crate::tagger::EntityCategory;

/// Tipos de relação do grafo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    UsesDrug,
    RecommendedFood,
    AvoidFood,
    RequiresCheckup,
    BelongsToDepartment,
    HasSymptom,
    TreatmentMethod,
    ComorbidWith,
    Produces,
}

impl RelationKind {
    pub fn name(&self) -> &'static str {
        match self {
            RelationKind::UsesDrug => "UsesDrug",
            RelationKind::RecommendedFood => "RecommendedFood",
            RelationKind::AvoidFood => "AvoidFood",
            RelationKind::RequiresCheckup => "RequiresCheckup",
            RelationKind::BelongsToDepartment => "BelongsToDepartment",
            RelationKind::HasSymptom => "HasSymptom",
            RelationKind::TreatmentMethod => "TreatmentMethod",
            RelationKind::ComorbidWith => "ComorbidWith",
            RelationKind::Produces => "Produces",
        }
    }
}

/// Uma tupla `(categoria, nome, relação, categoria, nome)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Relationship {
    pub subject: EntityCategory,
    pub subject_name: String,
    pub relation: RelationKind,
    pub object: EntityCategory,
    pub object_name: String,
}

impl Relationship {
    fn new(
        subject: EntityCategory,
        subject_name: &str,
        relation: RelationKind,
        object: EntityCategory,
        object_name: &str,
    ) -> Self {
        Self {
            subject,
            subject_name: subject_name.to_string(),
            relation,
            object,
            object_name: object_name.to_string(),
        }
    }

    /// A tupla como strings, com os rótulos do grafo.
    pub fn as_tuple(&self) -> [&str; 5] {
        [
            self.subject.graph_label(),
            &self.subject_name,
            self.relation.name(),
            self.object.graph_label(),
            &self.object_name,
        ]
    }
}

/// Nó de doença com as propriedades que o grafo guarda.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiseaseNode {
    pub name: String,
    pub introduction: String,
    pub cause: String,
    pub prevention: String,
    pub treatment_duration: String,
    pub cure_probability: String,
    pub susceptible_population: String,
}

impl DiseaseNode {
    fn from_record(record: &MedicalRecord) -> Self {
        Self {
            name: record.name.clone(),
            introduction: record.desc.concat(),
            cause: record.cause.concat(),
            prevention: record.prevent.concat(),
            treatment_duration: record.cure_lasttime.clone(),
            cure_probability: record.cured_prob.clone(),
            susceptible_population: record.easy_get.clone(),
        }
    }
}

/// Entidades e relações acumuladas de todos os registros, sem duplicatas.
#[derive(Debug, Clone, Default)]
pub struct GraphExtraction {
    entities: BTreeMap<EntityCategory, BTreeSet<String>>,
    /// Na ordem em que apareceram; uma entrada por nome.
    diseases: Vec<DiseaseNode>,
    relationships: BTreeSet<Relationship>,
}

impl GraphExtraction {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_entity(&mut self, category: EntityCategory, name: &str) {
        if !name.is_empty() {
            self.entities
                .entry(category)
                .or_default()
                .insert(name.to_string());
        }
    }

    fn relate(
        &mut self,
        disease: &str,
        relation: RelationKind,
        object: EntityCategory,
        names: &[String],
    ) {
        for name in names.iter().filter(|n| !n.is_empty()) {
            self.add_entity(object, name);
            if !disease.is_empty() {
                self.relationships.insert(Relationship::new(
                    EntityCategory::Disease,
                    disease,
                    relation,
                    object,
                    name,
                ));
            }
        }
    }

    /// Incorpora um registro.
    pub fn add_record(&mut self, record: &MedicalRecord) {
        use EntityCategory as C;
        use RelationKind as R;

        let disease = record.name.as_str();
        if !disease.is_empty() && !self.contains(C::Disease, disease) {
            self.add_entity(C::Disease, disease);
            self.diseases.push(DiseaseNode::from_record(record));
        }

        let drugs: Vec<String> = record
            .common_drug
            .iter()
            .chain(&record.recommand_drug)
            .cloned()
            .collect();
        self.relate(disease, R::UsesDrug, C::Drug, &drugs);

        let do_eat: Vec<String> = record
            .do_eat
            .iter()
            .chain(&record.recommand_eat)
            .cloned()
            .collect();
        self.relate(disease, R::RecommendedFood, C::Food, &do_eat);
        self.relate(disease, R::AvoidFood, C::Food, &record.not_eat);

        self.relate(disease, R::RequiresCheckup, C::Checkup, &record.check);

        for department in &record.cure_department {
            self.add_entity(C::Department, department);
        }
        // só o departamento mais específico (o último) vira relação
        if let Some(last) = record.cure_department.last() {
            self.relate(
                disease,
                R::BelongsToDepartment,
                C::Department,
                std::slice::from_ref(last),
            );
        }

        let symptoms: Vec<String> = record
            .symptom
            .iter()
            .map(|s| s.trim_end_matches('.').to_string())
            .collect();
        self.relate(disease, R::HasSymptom, C::Symptom, &symptoms);

        let cure_way: Vec<String> = record
            .cure_way
            .iter()
            .filter(|c| c.chars().count() >= MIN_ENTITY_CHARS)
            .cloned()
            .collect();
        self.relate(disease, R::TreatmentMethod, C::Treatment, &cure_way);

        if !disease.is_empty() {
            for other in record.acompany.iter().filter(|n| !n.is_empty()) {
                self.relationships.insert(Relationship::new(
                    C::Disease,
                    disease,
                    R::ComorbidWith,
                    C::Disease,
                    other,
                ));
            }
        }

        for detail in &record.drug_detail {
            let parts: Vec<&str> = detail.split(',').collect();
            let [product, company] = parts.as_slice() else {
                continue;
            };
            if product.is_empty() || company.is_empty() {
                continue;
            }
            self.add_entity(C::DrugCompany, company);
            self.add_entity(C::Drug, product);
            self.relationships.insert(Relationship::new(
                C::DrugCompany,
                company,
                R::Produces,
                C::Drug,
                product,
            ));
        }
    }

    pub fn contains(&self, category: EntityCategory, name: &str) -> bool {
        self.entities
            .get(&category)
            .is_some_and(|set| set.contains(name))
    }

    /// Nomes de uma categoria, em ordem lexicográfica.
    pub fn entities(&self, category: EntityCategory) -> impl Iterator<Item = &str> {
        self.entities
            .get(&category)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    pub fn diseases(&self) -> &[DiseaseNode] {
        &self.diseases
    }

    pub fn relationships(&self) -> &BTreeSet<Relationship> {
        &self.relationships
    }

    /// Dicionário de entidades para o rotulador, sem passar pelo disco.
    pub fn to_dictionary(&self) -> CategoryDictionary {
        let mut dict = CategoryDictionary::new();
        for category in EntityCategory::ALL {
            dict.extend(category, self.entities(category));
        }
        dict
    }
}

/// Destino das entidades e relações extraídas (ex: um cliente de banco de grafos).
///
/// Implementações devem ser idempotentes por tupla.
pub trait GraphSink {
    fn write_entities(&mut self, graph: &GraphExtraction) -> Result<()>;
    fn write_relationships(&mut self, relationships: &BTreeSet<Relationship>) -> Result<()>;
}

/// Grava o grafo em arquivos de texto.
#[derive(Debug, Clone)]
pub struct FileGraphSink {
    entity_dir: PathBuf,
    relationship_path: PathBuf,
}

impl FileGraphSink {
    pub const DISEASE_PROPERTIES_FILE: &'static str = "disease_properties.jsonl";

    pub fn new(entity_dir: impl Into<PathBuf>, relationship_path: impl Into<PathBuf>) -> Self {
        Self {
            entity_dir: entity_dir.into(),
            relationship_path: relationship_path.into(),
        }
    }
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| MedNerError::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| MedNerError::io(path, e))?;
    Ok(BufWriter::new(file))
}

impl GraphSink for FileGraphSink {
    fn write_entities(&mut self, graph: &GraphExtraction) -> Result<()> {
        fs::create_dir_all(&self.entity_dir).map_err(|e| MedNerError::io(&self.entity_dir, e))?;

        for category in EntityCategory::ALL {
            let path = CategoryDictionary::file_path(&self.entity_dir, category);
            let mut out = create(&path)?;
            let mut count = 0;
            for name in graph.entities(category) {
                writeln!(out, "{name}").map_err(|e| MedNerError::io(&path, e))?;
                count += 1;
            }
            out.flush().map_err(|e| MedNerError::io(&path, e))?;
            info!("Entidades {}: {}", category.graph_label(), count);
        }

        let path = self.entity_dir.join(Self::DISEASE_PROPERTIES_FILE);
        let mut out = create(&path)?;
        for disease in graph.diseases() {
            serde_json::to_writer(&mut out, disease)?;
            writeln!(out).map_err(|e| MedNerError::io(&path, e))?;
        }
        out.flush().map_err(|e| MedNerError::io(&path, e))?;
        Ok(())
    }

    fn write_relationships(&mut self, relationships: &BTreeSet<Relationship>) -> Result<()> {
        let path = &self.relationship_path;
        let mut out = create(path)?;
        for rel in relationships {
            writeln!(out, "{}", rel.as_tuple().join(" ")).map_err(|e| MedNerError::io(path, e))?;
        }
        out.flush().map_err(|e| MedNerError::io(path, e))?;
        info!("Relações gravadas: {}", relationships.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> MedicalRecord {
        MedicalRecord::parse_line(
            r#"{"name": "感冒", "desc": "感冒是常见病。", "cure_lasttime": "7天",
                "common_drug": ["感冒灵", "板蓝根"], "recommand_drug": ["感冒灵"],
                "do_eat": ["鸡蛋"], "recommand_eat": ["小米粥"], "not_eat": ["辣椒"],
                "check": ["血常规"], "cure_department": ["内科", "呼吸内科"],
                "symptom": ["发烧...", "咳嗽"], "cure_way": [["药物治疗"], "休"],
                "acompany": ["肺炎"], "drug_detail": ["感冒灵,华润三九", "坏数据"]}"#
                .replace('\n', " ")
                .as_str(),
        )
        .unwrap()
        .unwrap()
    }

    fn has(graph: &GraphExtraction, tuple: [&str; 5]) -> bool {
        graph.relationships().iter().any(|r| r.as_tuple() == tuple)
    }

    #[test]
    fn test_extracts_entities() {
        let mut graph = GraphExtraction::new();
        graph.add_record(&record());

        let drugs: Vec<&str> = graph.entities(EntityCategory::Drug).collect();
        assert_eq!(drugs, vec!["感冒灵", "板蓝根"]);
        let departments: Vec<&str> = graph.entities(EntityCategory::Department).collect();
        assert_eq!(departments.len(), 2);
        assert!(graph.contains(EntityCategory::Symptom, "发烧"));
        assert!(graph.contains(EntityCategory::Treatment, "药物治疗"));
        assert!(!graph.contains(EntityCategory::Treatment, "休"));
        assert!(graph.contains(EntityCategory::DrugCompany, "华润三九"));
        // comorbidades não viram nós de doença
        assert!(!graph.contains(EntityCategory::Disease, "肺炎"));
        assert_eq!(graph.diseases().len(), 1);
        assert_eq!(graph.diseases()[0].treatment_duration, "7天");
    }

    #[test]
    fn test_extracts_relationships() {
        let mut graph = GraphExtraction::new();
        graph.add_record(&record());
        graph.add_record(&record());

        assert!(has(&graph, ["Disease", "感冒", "UsesDrug", "Drug", "感冒灵"]));
        assert!(has(&graph, ["Disease", "感冒", "RecommendedFood", "Food", "小米粥"]));
        assert!(has(&graph, ["Disease", "感冒", "AvoidFood", "Food", "辣椒"]));
        assert!(has(&graph, ["Disease", "感冒", "BelongsToDepartment", "Department", "呼吸内科"]));
        assert!(!has(&graph, ["Disease", "感冒", "BelongsToDepartment", "Department", "内科"]));
        assert!(has(&graph, ["Disease", "感冒", "HasSymptom", "Symptom", "发烧"]));
        assert!(has(&graph, ["Disease", "感冒", "ComorbidWith", "Disease", "肺炎"]));
        assert!(has(&graph, ["DrugCompany", "华润三九", "Produces", "Drug", "感冒灵"]));

        // registro repetido não duplica nada
        let uses_drug = graph
            .relationships()
            .iter()
            .filter(|r| r.relation == RelationKind::UsesDrug)
            .count();
        assert_eq!(uses_drug, 2);
        assert_eq!(graph.diseases().len(), 1);
    }

    #[test]
    fn test_file_sink_round_trips_through_dictionary() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = GraphExtraction::new();
        graph.add_record(&record());

        let rel_path = dir.path().join("rel.txt");
        let mut sink = FileGraphSink::new(dir.path().join("ent"), &rel_path);
        sink.write_entities(&graph).unwrap();
        sink.write_relationships(graph.relationships()).unwrap();

        let dict = CategoryDictionary::load_dir(&dir.path().join("ent")).unwrap();
        assert_eq!(dict, graph.to_dictionary());

        let rels = fs::read_to_string(&rel_path).unwrap();
        assert_eq!(rels.lines().count(), graph.relationships().len());
        assert!(rels.contains("DrugCompany 华润三九 Produces Drug 感冒灵"));

        let props =
            fs::read_to_string(dir.path().join("ent").join(FileGraphSink::DISEASE_PROPERTIES_FILE))
                .unwrap();
        let node: DiseaseNode = serde_json::from_str(props.lines().next().unwrap()).unwrap();
        assert_eq!(node.name, "感冒");
        assert_eq!(node.introduction, "感冒是常见病。");
    }
}
