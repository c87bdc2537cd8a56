//! Layer 1: lexical matching of free text against the taxonomy.
//!
//! Scores are IDF-weighted phrase overlaps: a keyword shared by many entries
//! contributes little, a keyword unique to one entry contributes a lot.
//! Every category always yields at least one candidate. When nothing in a
//! category matches lexically, entries with affinity to a caller pin and the
//! store's general-purpose entries fill in at the default score. Fallbacks
//! never pad a category that has real matches.

use crate::error::HintError;
use crate::types::{CandidateSet, Hints, MatchCandidate};
use floral_taxonomy::{text, TaxonomyCategory, TaxonomyEntry, TaxonomyStore};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Score decay between consecutive fallback candidates.
const FALLBACK_DECAY: f64 = 0.05;

/// Upper bound on candidates kept per category.
pub const MAX_TOP_K: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct MatcherConfig {
    /// Candidates kept per category.
    pub top_k: usize,
    /// Score given to general-purpose fallbacks when nothing matched.
    pub default_score: f64,
    /// Weight (in units of a unique tag) at which a score saturates at 1.
    pub saturation: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            default_score: 0.35,
            saturation: 1.5,
        }
    }
}

pub struct LexicalMatcher<'a> {
    store: &'a TaxonomyStore,
    config: MatcherConfig,
}

impl<'a> LexicalMatcher<'a> {
    pub fn new(store: &'a TaxonomyStore, config: MatcherConfig) -> Self {
        Self { store, config }
    }

    fn top_k(&self) -> usize {
        self.config.top_k.clamp(1, MAX_TOP_K)
    }

    /// Rank candidates for every category.
    pub fn match_text(&self, request: &str, hints: &Hints) -> CandidateSet<'a> {
        let (pins, warnings) = self.parse_hints(hints);
        for warning in &warnings {
            warn!(hint = %warning, "Dropping invalid hint");
        }

        let tokens = text::tokenize(request);
        let mut by_category = BTreeMap::new();
        for category in TaxonomyCategory::ALL {
            let mut candidates = self.assemble(category, &tokens, &pins);
            if let Some(&pin) = pins.get(&category) {
                candidates = self.inject_pin(pin, candidates);
            }
            debug!(
                category = %category,
                top = candidates.first().map(|c| c.id()).unwrap_or(""),
                count = candidates.len(),
                "Ranked candidates"
            );
            by_category.insert(category, candidates);
        }

        CandidateSet {
            by_category,
            pins,
            warnings,
        }
    }

    /// Matcher restricted to one category, without hints.
    pub fn suggest_for_category(
        &self,
        category: TaxonomyCategory,
        request: &str,
        k: usize,
    ) -> Vec<MatchCandidate<'a>> {
        let tokens = text::tokenize(request);
        let mut candidates = self.lexical(category, &tokens);
        if candidates.is_empty() {
            candidates = self.fallbacks(category, &[], self.config.default_score);
        }
        candidates.truncate(k.clamp(1, MAX_TOP_K));
        candidates
    }

    /// Split raw hints into valid pins and warnings.
    pub fn parse_hints(
        &self,
        hints: &Hints,
    ) -> (BTreeMap<TaxonomyCategory, &'a TaxonomyEntry>, Vec<HintError>) {
        let mut pins = BTreeMap::new();
        let mut warnings = Vec::new();
        for (key, id) in hints {
            let category: TaxonomyCategory = match key.parse() {
                Ok(category) => category,
                Err(_) => {
                    warnings.push(HintError::UnknownCategory(key.clone()));
                    continue;
                }
            };
            match self.store.lookup(category, id.trim()) {
                Some(entry) => {
                    pins.insert(category, entry);
                }
                None => warnings.push(HintError::UnknownEntry {
                    category,
                    id: id.clone(),
                }),
            }
        }
        (pins, warnings)
    }

    // ------------------------------------------------------------------------
    // Scoring
    // ------------------------------------------------------------------------

    fn idf(&self, tag: &str) -> f64 {
        let n = self.store.entry_count() as f64;
        let df = self.store.keyword_document_frequency(tag).max(1) as f64;
        (1.0 + n / df).ln()
    }

    /// Positive lexical scores for one category, ranked.
    fn lexical(&self, category: TaxonomyCategory, tokens: &[String]) -> Vec<MatchCandidate<'a>> {
        if tokens.is_empty() {
            return Vec::new();
        }
        let n = self.store.entry_count() as f64;
        let norm = self.config.saturation.max(f64::EPSILON) * (1.0 + n).ln();

        let mut scored: Vec<MatchCandidate<'a>> = self
            .store
            .all_entries(category)
            .iter()
            .filter_map(|entry| {
                let mut weight = 0.0;
                let mut matched_keywords = Vec::new();
                for phrase in entry.phrases() {
                    if text::contains_phrase(tokens, &phrase.tokens) {
                        weight += self.idf(&phrase.tag);
                        matched_keywords.push(phrase.text.clone());
                    }
                }
                (weight > 0.0).then(|| MatchCandidate {
                    entry,
                    score: (weight / norm).min(1.0),
                    matched_keywords,
                    pinned: false,
                })
            })
            .collect();
        scored.sort_by(rank_order);
        scored
    }

    /// Affinity entries first, then general-purpose entries, decaying from
    /// `base`.
    fn fallbacks(
        &self,
        category: TaxonomyCategory,
        affinity: &[&'a TaxonomyEntry],
        base: f64,
    ) -> Vec<MatchCandidate<'a>> {
        let mut picked: Vec<&'a TaxonomyEntry> = Vec::new();
        for entry in affinity
            .iter()
            .copied()
            .chain(self.store.general_entries(category))
        {
            if !picked.iter().any(|p| p.is(entry)) {
                picked.push(entry);
            }
        }
        picked
            .into_iter()
            .enumerate()
            .map(|(i, entry)| {
                let decay = (1.0 - FALLBACK_DECAY * i as f64).max(FALLBACK_DECAY);
                MatchCandidate::fallback(entry, base * decay)
            })
            .collect()
    }

    /// Lexical matches when there are any, otherwise fallbacks. Never more
    /// than `top_k`.
    fn assemble(
        &self,
        category: TaxonomyCategory,
        tokens: &[String],
        pins: &BTreeMap<TaxonomyCategory, &'a TaxonomyEntry>,
    ) -> Vec<MatchCandidate<'a>> {
        let mut candidates = self.lexical(category, tokens);
        if candidates.is_empty() {
            let affinity: Vec<&'a TaxonomyEntry> = self
                .store
                .all_entries(category)
                .iter()
                .filter(|entry| {
                    pins.iter().any(|(pinned_category, pin)| {
                        *pinned_category != category && (pin.prefers(entry) || entry.prefers(pin))
                    })
                })
                .collect();
            candidates = self.fallbacks(category, &affinity, self.config.default_score);
        }
        candidates.truncate(self.top_k());
        candidates
    }

    /// Pin at rank 1, followed by up to `top_k` other candidates.
    fn inject_pin(
        &self,
        pin: &'a TaxonomyEntry,
        candidates: Vec<MatchCandidate<'a>>,
    ) -> Vec<MatchCandidate<'a>> {
        let mut out = Vec::with_capacity(candidates.len().saturating_add(1));
        out.push(MatchCandidate::pinned(pin));
        out.extend(candidates.into_iter().filter(|c| !c.entry.is(pin)));
        out.truncate(self.top_k().saturating_add(1));
        out
    }
}

/// Score descending, then id ascending.
fn rank_order(a: &MatchCandidate<'_>, b: &MatchCandidate<'_>) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.entry.id.cmp(&b.entry.id))
}
