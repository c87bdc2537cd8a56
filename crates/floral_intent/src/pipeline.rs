//! The intent pipeline facade: matcher, resolver, gateway, adapter, in order.

use crate::adapter::{self, ArrangementPlan};
use crate::gateway::{GatewayConfig, SynthesisGateway, SynthesisStatus, Synthesizer};
use crate::matcher::{LexicalMatcher, MatcherConfig, MAX_TOP_K};
use crate::resolver::StructuralResolver;
use crate::types::{Hints, MatchCandidate, PipelineOptions, ResolvedSelection};
use floral_taxonomy::{TaxonomyCategory, TaxonomyStore};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineConfig {
    pub matcher: MatcherConfig,
    pub gateway: GatewayConfig,
}

/// Selection plus the hint warnings produced while matching.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution<'a> {
    pub selection: ResolvedSelection<'a>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedResult<'a> {
    pub enhanced_text: String,
    pub selection: ResolvedSelection<'a>,
    pub arrangement: ArrangementPlan<'a>,
    pub used_synthesis: bool,
    pub synthesis: SynthesisStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowResult<'a> {
    pub workflow_slots: BTreeMap<String, String>,
    pub selection: ResolvedSelection<'a>,
    pub arrangement: ArrangementPlan<'a>,
    pub used_synthesis: bool,
    pub synthesis: SynthesisStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Shared, read-only pipeline. One instance serves every request.
#[derive(Debug, Clone)]
pub struct IntentPipeline {
    store: Arc<TaxonomyStore>,
    config: PipelineConfig,
    gateway: SynthesisGateway,
}

impl IntentPipeline {
    pub fn new(store: Arc<TaxonomyStore>, config: PipelineConfig) -> Self {
        Self {
            store,
            config,
            gateway: SynthesisGateway::default(),
        }
    }

    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn Synthesizer>) -> Self {
        self.gateway = SynthesisGateway::new(Some(synthesizer));
        self
    }

    pub fn store(&self) -> &TaxonomyStore {
        &self.store
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn has_synthesizer(&self) -> bool {
        self.gateway.has_synthesizer()
    }

    fn matcher_config(&self, options: &PipelineOptions) -> MatcherConfig {
        let mut config = self.config.matcher.clone();
        if let Some(top_k) = options.top_k {
            config.top_k = top_k.clamp(1, MAX_TOP_K);
        }
        config
    }

    fn gateway_config(&self, options: &PipelineOptions) -> GatewayConfig {
        let mut config = self.config.gateway.clone();
        if let Some(threshold) = options.confidence_threshold {
            config.confidence_threshold = threshold.clamp(0.0, 1.0);
        }
        if let Some(allow) = options.allow_synthesis {
            config.allow_synthesis = allow;
        }
        config
    }

    /// Layers 1 and 2.
    pub fn resolve(&self, request: &str, hints: &Hints, options: &PipelineOptions) -> Resolution<'_> {
        let matcher = LexicalMatcher::new(&self.store, self.matcher_config(options));
        let candidates = matcher.match_text(request, hints);
        let selection = StructuralResolver::new(&self.store).resolve(&candidates);
        Resolution {
            warnings: candidates.warnings().iter().map(|w| w.to_string()).collect(),
            selection,
        }
    }

    pub fn enhance(&self, request: &str, hints: &Hints, options: &PipelineOptions) -> EnhancedResult<'_> {
        let Resolution { selection, warnings } = self.resolve(request, hints, options);
        let arrangement = adapter::plan(&self.store, &selection);
        let template = adapter::enhanced_text(&selection, &arrangement);
        let outcome = self
            .gateway
            .finalize(request, &selection, template, &self.gateway_config(options));

        info!(
            confidence = selection.confidence.score,
            notes = selection.notes.len(),
            synthesis = %outcome.status,
            fingerprint = %selection.fingerprint,
            "Enhanced prompt"
        );
        EnhancedResult {
            enhanced_text: outcome.text,
            used_synthesis: outcome.status == SynthesisStatus::Used,
            synthesis: outcome.status,
            selection,
            arrangement,
            warnings,
        }
    }

    pub fn workflow(&self, request: &str, hints: &Hints, options: &PipelineOptions) -> WorkflowResult<'_> {
        let Resolution { selection, warnings } = self.resolve(request, hints, options);
        let arrangement = adapter::plan(&self.store, &selection);
        let template = adapter::enhanced_text(&selection, &arrangement);
        let outcome = self
            .gateway
            .finalize(request, &selection, template, &self.gateway_config(options));
        let workflow_slots = adapter::workflow_slots(&selection, &arrangement, &outcome.text);

        info!(
            confidence = selection.confidence.score,
            notes = selection.notes.len(),
            synthesis = %outcome.status,
            fingerprint = %selection.fingerprint,
            "Built workflow slots"
        );
        WorkflowResult {
            workflow_slots,
            used_synthesis: outcome.status == SynthesisStatus::Used,
            synthesis: outcome.status,
            selection,
            arrangement,
            warnings,
        }
    }

    /// Matcher restricted to one category.
    pub fn suggest(&self, category: TaxonomyCategory, request: &str, k: usize) -> Vec<MatchCandidate<'_>> {
        LexicalMatcher::new(&self.store, self.config.matcher.clone()).suggest_for_category(category, request, k)
    }
}
