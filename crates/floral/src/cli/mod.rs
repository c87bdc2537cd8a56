//! CLI commands for the floral launcher
//!
//! `mcp` runs the stdio server; `enhance`, `workflow` and `styles` run the
//! same pipeline offline against the configured taxonomy.

pub mod enhance;
pub mod mcp;
pub mod styles;
pub mod workflow;

use crate::config::FloralConfig;
use crate::synthesis::CommandSynthesizer;
use anyhow::{bail, Context, Result};
use floral_intent::{Hints, IntentPipeline};
use floral_taxonomy::TaxonomyStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Load the configured taxonomy, bundled unless `[taxonomy] path` is set.
pub fn load_store(config: &FloralConfig) -> Result<TaxonomyStore> {
    match &config.taxonomy.path {
        Some(path) => TaxonomyStore::from_path(path)
            .with_context(|| format!("Failed to load taxonomy from {}", path.display())),
        None => TaxonomyStore::bundled().context("Bundled taxonomy failed validation"),
    }
}

/// Build the pipeline, attaching the synthesis command when one is configured.
pub fn build_pipeline(config: &FloralConfig) -> Result<IntentPipeline> {
    let store = load_store(config)?;
    info!(entries = store.entry_count(), "Taxonomy loaded");

    let pipeline = IntentPipeline::new(Arc::new(store), config.pipeline_config());
    Ok(match &config.synthesis.command {
        Some(command) => {
            info!(command = %command, "Synthesis command configured");
            pipeline.with_synthesizer(Arc::new(CommandSynthesizer::new(
                command.clone(),
                config.synthesis.args.clone(),
                Duration::from_millis(config.gateway.timeout_ms),
            )))
        }
        None => pipeline,
    })
}

/// clap value parser for `--hint category=id`.
pub fn parse_hint(raw: &str) -> Result<(String, String), String> {
    let (category, id) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected <category>=<id>, got '{raw}'"))?;
    let (category, id) = (category.trim(), id.trim());
    if category.is_empty() || id.is_empty() {
        return Err(format!("expected <category>=<id>, got '{raw}'"));
    }
    Ok((category.to_string(), id.to_string()))
}

/// Collect parsed `--hint` pairs; a category may be pinned only once.
pub fn collect_hints(pairs: Vec<(String, String)>) -> Result<Hints> {
    let mut hints = Hints::new();
    for (category, id) in pairs {
        if hints.contains_key(&category) {
            bail!("hint for '{category}' given more than once");
        }
        hints.insert(category, id);
    }
    Ok(hints)
}
