//! Per-request pipeline types.
//!
//! Everything here borrows from the [`TaxonomyStore`](floral_taxonomy::TaxonomyStore)
//! and lives for a single request.

use crate::confidence::Confidence;
use crate::error::HintError;
use floral_taxonomy::{TaxonomyCategory, TaxonomyEntry};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Raw caller hints: category name to entry id.
pub type Hints = BTreeMap<String, String>;

// ============================================================================
// Candidates
// ============================================================================

/// A scored, unconfirmed match between the request and one entry.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate<'a> {
    pub entry: &'a TaxonomyEntry,
    /// In `[0, 1]`.
    pub score: f64,
    /// Keyword phrases that matched, as written in the dataset.
    pub matched_keywords: Vec<String>,
    /// Injected from a caller hint rather than matched.
    pub pinned: bool,
}

impl<'a> MatchCandidate<'a> {
    pub fn pinned(entry: &'a TaxonomyEntry) -> Self {
        Self {
            entry,
            score: 1.0,
            matched_keywords: Vec::new(),
            pinned: true,
        }
    }

    pub fn fallback(entry: &'a TaxonomyEntry, score: f64) -> Self {
        Self {
            entry,
            score,
            matched_keywords: Vec::new(),
            pinned: false,
        }
    }

    pub fn category(&self) -> TaxonomyCategory {
        self.entry.category
    }

    pub fn id(&self) -> &'a str {
        &self.entry.id
    }
}

impl Serialize for MatchCandidate<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("MatchCandidate", 6)?;
        state.serialize_field("id", &self.entry.id)?;
        state.serialize_field("name", &self.entry.name)?;
        state.serialize_field("group", &self.entry.group)?;
        state.serialize_field("score", &round3(self.score))?;
        state.serialize_field("matched_keywords", &self.matched_keywords)?;
        state.serialize_field("pinned", &self.pinned)?;
        state.end()
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Layer 1 output: ranked candidates for every category, plus the valid pins
/// and the hints that were dropped.
#[derive(Debug, Clone)]
pub struct CandidateSet<'a> {
    pub(crate) by_category: BTreeMap<TaxonomyCategory, Vec<MatchCandidate<'a>>>,
    pub(crate) pins: BTreeMap<TaxonomyCategory, &'a TaxonomyEntry>,
    pub(crate) warnings: Vec<HintError>,
}

impl<'a> CandidateSet<'a> {
    /// Ranked candidates for `category`; never empty for a loaded store.
    pub fn candidates(&self, category: TaxonomyCategory) -> &[MatchCandidate<'a>] {
        self.by_category
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn pin(&self, category: TaxonomyCategory) -> Option<&'a TaxonomyEntry> {
        self.pins.get(&category).copied()
    }

    pub fn pins(&self) -> &BTreeMap<TaxonomyCategory, &'a TaxonomyEntry> {
        &self.pins
    }

    pub fn warnings(&self) -> &[HintError] {
        &self.warnings
    }
}

// ============================================================================
// Resolution
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// A caller pin lost to an earlier, incompatible pin.
    HintOverridden,
    /// Two selected entries remain incompatible.
    IncompatiblePair,
}

/// An unresolved conflict recorded by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictNote {
    pub kind: ConflictKind,
    pub categories: Vec<TaxonomyCategory>,
    /// `"<category>:<id>"` references of the entries involved.
    pub entries: Vec<String>,
    pub message: String,
}

/// Layer 2 output: exactly one entry per category.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedSelection<'a> {
    pub selections: BTreeMap<TaxonomyCategory, MatchCandidate<'a>>,
    /// Remaining candidates per category, in rank order.
    pub alternates: BTreeMap<TaxonomyCategory, Vec<MatchCandidate<'a>>>,
    pub confidence: Confidence,
    pub notes: Vec<ConflictNote>,
    /// Stable hash of the selected ids.
    pub fingerprint: String,
}

impl<'a> ResolvedSelection<'a> {
    pub fn get(&self, category: TaxonomyCategory) -> Option<&MatchCandidate<'a>> {
        self.selections.get(&category)
    }

    pub fn entry(&self, category: TaxonomyCategory) -> Option<&'a TaxonomyEntry> {
        self.selections.get(&category).map(|c| c.entry)
    }

    pub fn alternates(&self, category: TaxonomyCategory) -> &[MatchCandidate<'a>] {
        self.alternates
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_conflicts(&self) -> bool {
        !self.notes.is_empty()
    }

    /// `(category, id)` pairs in category order.
    pub fn ids(&self) -> Vec<(TaxonomyCategory, &'a str)> {
        self.selections
            .iter()
            .map(|(category, c)| (*category, c.id()))
            .collect()
    }
}

// ============================================================================
// Request options
// ============================================================================

/// Per-request overrides of the configured pipeline defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineOptions {
    pub top_k: Option<usize>,
    pub confidence_threshold: Option<f64>,
    pub allow_synthesis: Option<bool>,
}
