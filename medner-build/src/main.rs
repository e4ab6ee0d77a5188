//! Executável que gera dicionários, relações e o corpus NER a partir dos registros médicos
//!
//! Uso: `medner-build [config.json]`. Sem argumento, usa os caminhos padrão em `data/`.

use std::path::PathBuf;

use medner_core::{pipeline, PipelineConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => {
            info!("Configuração: {}", path.display());
            PipelineConfig::load(&path)?
        }
        None => PipelineConfig::default(),
    };

    let summary = pipeline::run(&config)?;

    info!(
        "Concluído: {} registros, {} relações, {} trechos, {} no corpus com {} entidades",
        summary.records,
        summary.relationships,
        summary.spans,
        summary.corpus.spans,
        summary.corpus.total_entities()
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
