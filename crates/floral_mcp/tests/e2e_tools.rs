//! End-to-end tests for the MCP tools
//!
//! Every test drives the server through newline-delimited JSON-RPC exactly
//! as a client would, with the real bundled taxonomy.

use floral_intent::{FnSynthesizer, IntentPipeline, PipelineConfig, SynthesisError};
use floral_mcp::{McpServer, McpServerConfig};
use floral_taxonomy::TaxonomyStore;
use serde_json::{json, Value};
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

fn bundled_pipeline() -> IntentPipeline {
    IntentPipeline::new(
        Arc::new(TaxonomyStore::bundled().expect("bundled taxonomy")),
        PipelineConfig::default(),
    )
}

/// Run a whole session and return the parsed responses, in order.
fn session(pipeline: IntentPipeline, requests: &[Value]) -> Vec<Value> {
    let mut server = McpServer::new(McpServerConfig::default(), Arc::new(pipeline));
    let mut input = String::new();
    input.push_str(
        &json!({"jsonrpc": "2.0", "id": 0, "method": "initialize",
                "params": {"protocolVersion": "2024-11-05", "capabilities": {},
                           "clientInfo": {"name": "e2e", "version": "1"}}})
        .to_string(),
    );
    input.push('\n');
    input.push_str(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#);
    input.push('\n');
    for request in requests {
        input.push_str(&request.to_string());
        input.push('\n');
    }

    let mut output = Vec::new();
    server.serve(input.as_bytes(), &mut output).unwrap();
    let mut responses: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(responses[0]["id"], 0, "initialize response first");
    responses.remove(0);
    responses
}

fn call(id: i64, name: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments}
    })
}

/// Decode the single JSON text block of a successful tool result.
fn payload(response: &Value) -> Value {
    let result = &response["result"];
    assert_ne!(result["isError"], true, "tool error: {response}");
    let text = result["content"][0]["text"].as_str().unwrap();
    serde_json::from_str(text).unwrap()
}

// =============================================================================
// TOOL LISTING
// =============================================================================

#[test]
fn test_all_tools_listed() {
    let responses = session(
        bundled_pipeline(),
        &[json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"})],
    );
    let tools = responses[0]["result"]["tools"].as_array().unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();

    assert_eq!(tools.len(), 10);
    for expected in [
        "enhance_floral_prompt",
        "generate_floral_workflow",
        "list_arrangement_styles",
        "list_flowers_by_role",
        "list_color_palettes",
        "list_foliage_types",
        "get_cultural_traditions",
        "get_structural_techniques",
        "suggest_flowers_for_occasion",
        "get_server_info",
    ] {
        assert!(names.contains(&expected), "{expected} not listed");
    }
    for tool in tools {
        assert_eq!(tool["inputSchema"]["type"], "object");
    }
}

// =============================================================================
// PIPELINE TOOLS
// =============================================================================

#[test]
fn test_enhance_romantic_wedding() {
    let responses = session(
        bundled_pipeline(),
        &[call(1, "enhance_floral_prompt", json!({"text": "romantic spring wedding centerpiece"}))],
    );
    let result = payload(&responses[0]);
    let selections = &result["selection"]["selections"];

    assert_eq!(selections.as_object().unwrap().len(), 6);
    assert_eq!(selections["palette"]["id"], "spring");
    assert!(result["enhancedText"].as_str().unwrap().contains("spring palette"));
    let confidence = result["selection"]["confidence"]["score"].as_f64().unwrap();
    assert!(confidence > 0.5 && confidence <= 1.0);
    assert_eq!(result["usedSynthesis"], false);
}

#[test]
fn test_enhance_uses_synthesis_below_threshold_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let pipeline = bundled_pipeline().with_synthesizer(Arc::new(FnSynthesizer::new(move |payload| {
        counter.fetch_add(1, Ordering::SeqCst);
        assert!(!payload.selections.is_empty());
        Ok("Petals catch the soft window light.".to_string())
    })));

    let responses = session(
        pipeline,
        &[call(
            1,
            "enhance_floral_prompt",
            json!({"text": "roses", "options": {"confidenceThreshold": 1.0}}),
        )],
    );
    let result = payload(&responses[0]);
    assert_eq!(result["usedSynthesis"], true);
    assert_eq!(result["synthesis"], "used");
    assert!(result["enhancedText"]
        .as_str()
        .unwrap()
        .ends_with("Petals catch the soft window light."));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_enhance_falls_back_when_synthesis_fails() {
    let pipeline = bundled_pipeline().with_synthesizer(Arc::new(FnSynthesizer::new(|_| {
        Err(SynthesisError::Failed("upstream unavailable".to_string()))
    })));
    let responses = session(
        pipeline,
        &[call(1, "enhance_floral_prompt", json!({"text": "", "options": {"confidenceThreshold": 1.0}}))],
    );
    let result = payload(&responses[0]);
    assert_eq!(result["usedSynthesis"], false);
    assert_eq!(result["synthesis"], "fallback");
    assert!(!result["enhancedText"].as_str().unwrap().is_empty());
}

#[test]
fn test_hint_conflict_is_reported_not_failed() {
    let responses = session(
        bundled_pipeline(),
        &[call(
            1,
            "enhance_floral_prompt",
            json!({"text": "", "hints": {"tradition": "victorian", "style": "nageire"}}),
        )],
    );
    let result = payload(&responses[0]);
    let selection = &result["selection"];
    assert_eq!(selection["selections"]["tradition"]["id"], "victorian");
    assert_ne!(selection["selections"]["style"]["id"], "nageire");
    assert_eq!(selection["notes"][0]["kind"], "hint_overridden");
}

#[test]
fn test_workflow_minimalist_ikebana() {
    let responses = session(
        bundled_pipeline(),
        &[call(
            1,
            "generate_floral_workflow",
            json!({"text": "minimalist ikebana arrangement", "output_size": "768x1024", "steps": 30}),
        )],
    );
    let result = payload(&responses[0]);

    assert_eq!(result["selection"]["selections"]["tradition"]["id"], "japanese_ikebana");
    let slots = result["workflowSlots"].as_object().unwrap();
    assert_eq!(slots.len(), 10);
    assert!(slots.values().all(|v| !v.as_str().unwrap().is_empty()));

    let graph = &result["workflow"];
    assert_eq!(graph["4"]["inputs"]["width"], 768);
    assert_eq!(graph["4"]["inputs"]["height"], 1024);
    assert_eq!(graph["5"]["inputs"]["steps"], 30);
    assert_eq!(graph["2"]["inputs"]["text"], slots["positive_prompt"]);
    assert_eq!(graph["3"]["inputs"]["text"], slots["negative_prompt"]);
}

#[test]
fn test_workflow_rejects_out_of_range_steps() {
    let responses = session(
        bundled_pipeline(),
        &[call(1, "generate_floral_workflow", json!({"text": "roses", "steps": 80}))],
    );
    assert_eq!(responses[0]["result"]["isError"], true);
}

// =============================================================================
// REFERENCE TOOLS
// =============================================================================

#[test]
fn test_list_flowers_focal() {
    let responses = session(
        bundled_pipeline(),
        &[call(1, "list_flowers_by_role", json!({"role": "focal"}))],
    );
    let result = payload(&responses[0]);
    let ids: Vec<&str> = result["flowers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["id"].as_str().unwrap())
        .collect();
    assert_eq!(
        ids,
        vec!["roses", "peonies", "lilies", "orchids", "hydrangeas", "sunflowers", "dahlias"]
    );
}

#[test]
fn test_reference_tools_are_stateless() {
    let request = call(1, "get_cultural_traditions", json!({}));
    let mut second = request.clone();
    second["id"] = json!(2);
    let responses = session(bundled_pipeline(), &[request, second]);
    assert_eq!(payload(&responses[0]), payload(&responses[1]));
}

#[test]
fn test_suggest_for_sympathy() {
    let responses = session(
        bundled_pipeline(),
        &[call(1, "suggest_flowers_for_occasion", json!({"occasion": "sympathy"}))],
    );
    let result = payload(&responses[0]);
    assert_eq!(result["matched_occasion"], "funeral");
    assert!(!result["flowers"].as_array().unwrap().is_empty());
}

#[test]
fn test_server_info_lists_tools() {
    let responses = session(bundled_pipeline(), &[call(1, "get_server_info", json!({}))]);
    let result = payload(&responses[0]);
    assert_eq!(result["tools"].as_array().unwrap().len(), 10);
    assert_eq!(result["taxonomy"]["occasions"], 4);
}

// =============================================================================
// CUSTOM TAXONOMY
// =============================================================================

const SMALL_TAXONOMY: &str = r#"
[[tradition]]
id = "wild"
name = "Wild Meadow"
group = "western"
keywords = ["meadow"]

[[style]]
id = "loose"
name = "Loose Gathering"
group = "contemporary"
keywords = ["loose", "casual"]

[[flower]]
id = "cosmos"
name = "Cosmos"
group = "focal"
keywords = ["cosmos"]

[[foliage]]
id = "grasses"
name = "Grasses"
group = "accent"

[[palette]]
id = "sunlit"
name = "Sunlit"
group = "mood"
[palette.attributes]
colors = ["butter yellow", "straw"]

[[technique]]
id = "airy"
name = "Airy Spacing"
group = "density"
"#;

#[test]
fn test_custom_taxonomy_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("meadow.toml");
    fs::write(&path, SMALL_TAXONOMY).unwrap();
    let store = TaxonomyStore::from_path(&path).unwrap();
    let pipeline = IntentPipeline::new(Arc::new(store), PipelineConfig::default());

    let responses = session(
        pipeline,
        &[call(1, "generate_floral_workflow", json!({"text": "casual meadow cosmos"}))],
    );
    let result = payload(&responses[0]);
    let slots = &result["workflowSlots"];
    assert_eq!(slots["style"], "Loose Gathering");
    assert_eq!(slots["tradition"], "Wild Meadow");
    assert_eq!(slots["focal_flower"], "Cosmos");
    assert_eq!(slots["palette_colors"], "butter yellow, straw");
}
