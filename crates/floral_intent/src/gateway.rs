//! Layer 3 boundary: decide whether a resolved selection needs external
//! synthesis, and if so call it exactly once under a timeout.
//!
//! Synthesis never fails a request. Timeouts, errors and empty responses
//! all fall back to the structured text and are reported through
//! [`SynthesisStatus::Fallback`].

use crate::error::SynthesisError;
use crate::types::ResolvedSelection;
use floral_taxonomy::TaxonomyCategory;
use serde::Serialize;
use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Instruction sent to the synthesis collaborator with every payload.
pub const SYNTHESIS_INSTRUCTION: &str = "Use the structured data above to synthesize a vivid, cohesive image generation prompt. \
Weave together the style characteristics, specific flowers, foliage, color palette, and structural techniques into flowing descriptive prose. \
Emphasize the sensory qualities (texture, color, form, movement) and the overall aesthetic effect. \
Keep the prompt 60-100 words, suitable for Flux, SDXL, or Midjourney.";

/// Alternates forwarded per category.
const MAX_ALTERNATES: usize = 2;

/// Cap on the synthesis text merged into the result, in characters.
const MAX_SYNTHESIS_CHARS: usize = 1200;

// ============================================================================
// Collaborator
// ============================================================================

/// The external creative call: structured selections in, descriptive text out.
pub trait Synthesizer: Send + Sync {
    fn synthesize(&self, payload: &SynthesisPayload) -> Result<String, SynthesisError>;
}

/// Adapts a closure into a [`Synthesizer`].
pub struct FnSynthesizer<F>(F);

impl<F> FnSynthesizer<F>
where
    F: Fn(&SynthesisPayload) -> Result<String, SynthesisError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Synthesizer for FnSynthesizer<F>
where
    F: Fn(&SynthesisPayload) -> Result<String, SynthesisError> + Send + Sync,
{
    fn synthesize(&self, payload: &SynthesisPayload) -> Result<String, SynthesisError> {
        (self.0)(payload)
    }
}

// ============================================================================
// Payload
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayloadEntry {
    pub category: TaxonomyCategory,
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayloadAlternate {
    pub category: TaxonomyCategory,
    pub id: String,
    pub name: String,
    pub score: f64,
}

/// Compact structured request for the synthesis collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisPayload {
    pub request: String,
    pub selections: Vec<PayloadEntry>,
    pub alternates: Vec<PayloadAlternate>,
    pub confidence: f64,
    pub notes: Vec<String>,
    pub instruction: String,
}

impl SynthesisPayload {
    pub fn from_selection(request: &str, selection: &ResolvedSelection<'_>) -> Self {
        let mut selections = Vec::new();
        let mut alternates = Vec::new();
        for category in TaxonomyCategory::RESOLUTION_ORDER {
            if let Some(chosen) = selection.get(category) {
                selections.push(PayloadEntry {
                    category,
                    id: chosen.entry.id.clone(),
                    name: chosen.entry.name.clone(),
                    description: chosen.entry.description.clone(),
                });
            }
            alternates.extend(selection.alternates(category).iter().take(MAX_ALTERNATES).map(
                |alt| PayloadAlternate {
                    category,
                    id: alt.entry.id.clone(),
                    name: alt.entry.name.clone(),
                    score: alt.score,
                },
            ));
        }

        Self {
            request: request.to_string(),
            selections,
            alternates,
            confidence: selection.confidence.score,
            notes: selection.notes.iter().map(|n| n.message.clone()).collect(),
            instruction: SYNTHESIS_INSTRUCTION.to_string(),
        }
    }

    /// Plain-text rendering for text-in/text-out collaborators.
    pub fn render_prompt(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Request: {}\n\nResolved selections:\n", self.request));
        for entry in &self.selections {
            out.push_str(&format!(
                "- {}: {} ({})\n",
                entry.category, entry.name, entry.description
            ));
        }
        if !self.alternates.is_empty() {
            out.push_str("\nAlternates:\n");
            for alt in &self.alternates {
                out.push_str(&format!("- {}: {}\n", alt.category, alt.name));
            }
        }
        out.push_str(&format!("\nConfidence: {:.2}\n", self.confidence));
        if !self.notes.is_empty() {
            out.push_str("Unresolved conflicts:\n");
            for note in &self.notes {
                out.push_str(&format!("- {note}\n"));
            }
        }
        out.push('\n');
        out.push_str(&self.instruction);
        out
    }
}

// ============================================================================
// Gateway
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisStatus {
    /// Confident, conflict-free selection; no call made.
    Skipped,
    /// Synthesis turned off or no collaborator configured.
    Disabled,
    /// Collaborator text merged into the result.
    Used,
    /// Collaborator failed; structured text returned.
    Fallback,
}

impl SynthesisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SynthesisStatus::Skipped => "skipped",
            SynthesisStatus::Disabled => "disabled",
            SynthesisStatus::Used => "used",
            SynthesisStatus::Fallback => "fallback",
        }
    }
}

impl fmt::Display for SynthesisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    pub confidence_threshold: f64,
    pub allow_synthesis: bool,
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.75,
            allow_synthesis: true,
            timeout: Duration::from_millis(15_000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewayOutcome {
    pub text: String,
    pub status: SynthesisStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl GatewayOutcome {
    pub fn used_synthesis(&self) -> bool {
        self.status == SynthesisStatus::Used
    }
}

#[derive(Clone, Default)]
pub struct SynthesisGateway {
    synthesizer: Option<Arc<dyn Synthesizer>>,
}

impl fmt::Debug for SynthesisGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynthesisGateway")
            .field("synthesizer", &self.synthesizer.is_some())
            .finish()
    }
}

impl SynthesisGateway {
    pub fn new(synthesizer: Option<Arc<dyn Synthesizer>>) -> Self {
        Self { synthesizer }
    }

    pub fn has_synthesizer(&self) -> bool {
        self.synthesizer.is_some()
    }

    /// Whether `selection` is good enough to skip the external call.
    pub fn is_confident(selection: &ResolvedSelection<'_>, threshold: f64) -> bool {
        selection.confidence.score >= threshold && selection.notes.is_empty()
    }

    /// Produce the final text for `selection`, starting from the structured
    /// `template` rendering.
    pub fn finalize(
        &self,
        request: &str,
        selection: &ResolvedSelection<'_>,
        template: String,
        config: &GatewayConfig,
    ) -> GatewayOutcome {
        if Self::is_confident(selection, config.confidence_threshold) {
            debug!(
                confidence = selection.confidence.score,
                synthesis = "skipped",
                "Selection confident; skipping synthesis"
            );
            return GatewayOutcome {
                text: template,
                status: SynthesisStatus::Skipped,
                failure: None,
            };
        }

        let synthesizer = match (&self.synthesizer, config.allow_synthesis) {
            (Some(synthesizer), true) => Arc::clone(synthesizer),
            _ => {
                debug!(synthesis = "disabled", "Synthesis not available");
                return GatewayOutcome {
                    text: template,
                    status: SynthesisStatus::Disabled,
                    failure: None,
                };
            }
        };

        let payload = SynthesisPayload::from_selection(request, selection);
        match call_with_timeout(synthesizer, payload, config.timeout) {
            Ok(text) => {
                info!(
                    confidence = selection.confidence.score,
                    synthesis = "used",
                    chars = text.len(),
                    "Merged synthesis text"
                );
                GatewayOutcome {
                    text: merge(template, &text),
                    status: SynthesisStatus::Used,
                    failure: None,
                }
            }
            Err(err) => {
                warn!(synthesis = "fallback", reason = %err, "Synthesis unavailable; using structured text");
                GatewayOutcome {
                    text: template,
                    status: SynthesisStatus::Fallback,
                    failure: Some(err.to_string()),
                }
            }
        }
    }
}

/// Run the collaborator on a worker thread and wait at most `timeout`.
/// On timeout the worker is abandoned; its late result is discarded.
fn call_with_timeout(
    synthesizer: Arc<dyn Synthesizer>,
    payload: SynthesisPayload,
    timeout: Duration,
) -> Result<String, SynthesisError> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("floral-synthesis".to_string())
        .spawn(move || {
            let _ = tx.send(synthesizer.synthesize(&payload));
        })
        .map_err(|e| SynthesisError::Failed(format!("failed to spawn synthesis worker: {e}")))?;

    let text = match rx.recv_timeout(timeout) {
        Ok(result) => result?,
        Err(RecvTimeoutError::Timeout) => return Err(SynthesisError::Timeout(timeout)),
        Err(RecvTimeoutError::Disconnected) => return Err(SynthesisError::Disconnected),
    };

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return Err(SynthesisError::Empty);
    }
    Ok(collapsed)
}

/// Structured text first, synthesis text as a capped continuation.
fn merge(template: String, synthesis: &str) -> String {
    let capped: String = synthesis.chars().take(MAX_SYNTHESIS_CHARS).collect();
    format!("{template}\n\n{capped}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{LexicalMatcher, MatcherConfig};
    use crate::resolver::StructuralResolver;
    use crate::types::Hints;
    use floral_taxonomy::TaxonomyStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn selection<'a>(store: &'a TaxonomyStore, text: &str) -> ResolvedSelection<'a> {
        let matcher = LexicalMatcher::new(store, MatcherConfig::default());
        StructuralResolver::new(store).resolve(&matcher.match_text(text, &Hints::new()))
    }

    fn gateway<F>(f: F) -> SynthesisGateway
    where
        F: Fn(&SynthesisPayload) -> Result<String, SynthesisError> + Send + Sync + 'static,
    {
        SynthesisGateway::new(Some(Arc::new(FnSynthesizer::new(f))))
    }

    #[test]
    fn test_confident_selection_skips_call() {
        let store = TaxonomyStore::bundled().unwrap();
        let selection = selection(&store, "romantic spring wedding centerpiece");
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let gateway = gateway(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok("unused".to_string())
        });
        let config = GatewayConfig {
            confidence_threshold: 0.0,
            ..GatewayConfig::default()
        };

        let outcome = gateway.finalize("x", &selection, "template".to_string(), &config);
        assert_eq!(outcome.status, SynthesisStatus::Skipped);
        assert_eq!(outcome.text, "template");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_low_confidence_calls_exactly_once_and_merges() {
        let store = TaxonomyStore::bundled().unwrap();
        let selection = selection(&store, "");
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let gateway = gateway(move |payload| {
            counter.fetch_add(1, Ordering::SeqCst);
            assert_eq!(payload.selections.len(), 6);
            Ok("  Soft   light falls\n on petals. ".to_string())
        });

        let outcome = gateway.finalize("", &selection, "template".to_string(), &GatewayConfig::default());
        assert_eq!(outcome.status, SynthesisStatus::Used);
        assert!(outcome.used_synthesis());
        assert_eq!(outcome.text, "template\n\nSoft light falls on petals.");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failures_fall_back() {
        let store = TaxonomyStore::bundled().unwrap();
        let selection = selection(&store, "");

        let failing = gateway(|_| Err(SynthesisError::Failed("boom".to_string())));
        let outcome = failing.finalize("", &selection, "template".to_string(), &GatewayConfig::default());
        assert_eq!(outcome.status, SynthesisStatus::Fallback);
        assert_eq!(outcome.text, "template");
        assert!(outcome.failure.unwrap().contains("boom"));

        let empty = gateway(|_| Ok("   \n".to_string()));
        let outcome = empty.finalize("", &selection, "template".to_string(), &GatewayConfig::default());
        assert_eq!(outcome.status, SynthesisStatus::Fallback);
        assert!(!outcome.used_synthesis());
    }

    #[test]
    fn test_timeout_falls_back() {
        let store = TaxonomyStore::bundled().unwrap();
        let selection = selection(&store, "");
        let slow = gateway(|_| {
            thread::sleep(Duration::from_millis(500));
            Ok("too late".to_string())
        });
        let config = GatewayConfig {
            timeout: Duration::from_millis(20),
            ..GatewayConfig::default()
        };

        let outcome = slow.finalize("", &selection, "template".to_string(), &config);
        assert_eq!(outcome.status, SynthesisStatus::Fallback);
        assert_eq!(outcome.text, "template");
        assert!(outcome.failure.unwrap().contains("timed out"));
    }

    #[test]
    fn test_panicking_collaborator_falls_back() {
        let store = TaxonomyStore::bundled().unwrap();
        let selection = selection(&store, "");
        let panicking = gateway(|_| panic!("collaborator crashed"));
        let outcome = panicking.finalize("", &selection, "template".to_string(), &GatewayConfig::default());
        assert_eq!(outcome.status, SynthesisStatus::Fallback);
    }

    #[test]
    fn test_disabled_without_collaborator_or_when_turned_off() {
        let store = TaxonomyStore::bundled().unwrap();
        let selection = selection(&store, "");

        let none = SynthesisGateway::default();
        let outcome = none.finalize("", &selection, "t".to_string(), &GatewayConfig::default());
        assert_eq!(outcome.status, SynthesisStatus::Disabled);

        let off = gateway(|_| Ok("text".to_string()));
        let config = GatewayConfig {
            allow_synthesis: false,
            ..GatewayConfig::default()
        };
        let outcome = off.finalize("", &selection, "t".to_string(), &config);
        assert_eq!(outcome.status, SynthesisStatus::Disabled);
        assert_eq!(outcome.text, "t");
    }

    #[test]
    fn test_payload_is_compact() {
        let store = TaxonomyStore::bundled().unwrap();
        let selection = selection(&store, "romantic spring wedding centerpiece");
        let payload = SynthesisPayload::from_selection("romantic spring wedding centerpiece", &selection);

        assert_eq!(payload.selections.len(), 6);
        assert_eq!(payload.selections[0].category, TaxonomyCategory::Tradition);
        for category in TaxonomyCategory::ALL {
            assert!(payload.alternates.iter().filter(|a| a.category == category).count() <= 2);
        }
        let prompt = payload.render_prompt();
        assert!(prompt.starts_with("Request: romantic spring wedding centerpiece"));
        assert!(prompt.ends_with(SYNTHESIS_INSTRUCTION));
    }

    #[test]
    fn test_merge_caps_synthesis_text() {
        let long = "a".repeat(5000);
        let merged = merge("t".to_string(), &long);
        assert_eq!(merged.chars().count(), 1 + 2 + MAX_SYNTHESIS_CHARS);
    }
}
