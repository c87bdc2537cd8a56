//! `floral workflow` - print the workflow slots for a request as JSON.

use super::{build_pipeline, collect_hints};
use crate::config::FloralConfig;
use anyhow::Result;
use floral_intent::PipelineOptions;

#[derive(Debug)]
pub struct WorkflowArgs {
    pub text: String,
    pub hints: Vec<(String, String)>,
}

pub fn run(args: WorkflowArgs, config: &FloralConfig) -> Result<()> {
    let pipeline = build_pipeline(config)?;
    let hints = collect_hints(args.hints)?;
    let result = pipeline.workflow(&args.text, &hints, &PipelineOptions::default());

    for warning in &result.warnings {
        eprintln!("warning: {warning}");
    }
    println!("{}", serde_json::to_string_pretty(&result.workflow_slots)?);
    Ok(())
}
