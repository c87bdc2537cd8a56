//! `floral enhance` - run the pipeline offline and print the enhanced prompt.

use super::{build_pipeline, collect_hints};
use crate::config::FloralConfig;
use anyhow::Result;
use floral_intent::{EnhancedResult, PipelineOptions};

#[derive(Debug)]
pub struct EnhanceArgs {
    pub text: String,
    pub hints: Vec<(String, String)>,
    pub json: bool,
}

pub fn run(args: EnhanceArgs, config: &FloralConfig) -> Result<()> {
    let pipeline = build_pipeline(config)?;
    let hints = collect_hints(args.hints)?;
    let result = pipeline.enhance(&args.text, &hints, &PipelineOptions::default());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("{}", result.enhanced_text);
    for line in diagnostics(&result) {
        eprintln!("{line}");
    }
    Ok(())
}

/// Warnings, conflict notes and a confidence summary, for stderr.
fn diagnostics(result: &EnhancedResult<'_>) -> Vec<String> {
    let mut lines: Vec<String> = result
        .warnings
        .iter()
        .map(|w| format!("warning: {w}"))
        .collect();
    lines.extend(
        result
            .selection
            .notes
            .iter()
            .map(|note| format!("note: {}", note.message)),
    );
    lines.push(format!(
        "confidence {:.2}, synthesis {}",
        result.selection.confidence.score, result.synthesis
    ));
    lines
}
