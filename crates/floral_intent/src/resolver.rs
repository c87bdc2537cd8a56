//! Layer 2: structural resolution of ranked candidates into one coherent
//! selection per category.
//!
//! Greedy in [`TaxonomyCategory::RESOLUTION_ORDER`]: each category takes its
//! best candidate compatible with everything already chosen and with every
//! surviving pin of a later category. If nothing fits, the constraint
//! against the most recently chosen entry is dropped once; if still nothing
//! fits, the top candidate is taken and the conflict is recorded. The
//! resolver is total: it never fails and always fills every category.

use crate::confidence::Confidence;
use crate::types::{CandidateSet, ConflictKind, ConflictNote, MatchCandidate, ResolvedSelection};
use floral_taxonomy::{TaxonomyCategory, TaxonomyEntry, TaxonomyStore};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::debug;

/// Hex characters kept from the selection digest.
const FINGERPRINT_LEN: usize = 16;

pub struct StructuralResolver<'a> {
    store: &'a TaxonomyStore,
}

impl<'a> StructuralResolver<'a> {
    pub fn new(store: &'a TaxonomyStore) -> Self {
        Self { store }
    }

    pub fn resolve(&self, candidates: &CandidateSet<'a>) -> ResolvedSelection<'a> {
        let mut notes = Vec::new();
        let surviving = self.surviving_pins(candidates, &mut notes);

        let mut chosen: Vec<MatchCandidate<'a>> = Vec::with_capacity(TaxonomyCategory::ALL.len());
        for (position, category) in TaxonomyCategory::RESOLUTION_ORDER.iter().enumerate() {
            let ranked = candidates.candidates(*category);

            if let Some(&pin) = surviving.get(category) {
                let selected = ranked
                    .iter()
                    .find(|c| c.entry.is(pin))
                    .cloned()
                    .unwrap_or_else(|| MatchCandidate::pinned(pin));
                chosen.push(selected);
                continue;
            }

            // An overridden pin is not eligible for its own category.
            let overridden = candidates.pin(*category);
            let mut options: Vec<&MatchCandidate<'a>> = ranked
                .iter()
                .filter(|c| overridden.map_or(true, |pin| !c.entry.is(pin)))
                .collect();
            if options.is_empty() {
                options = ranked.iter().collect();
            }

            let later_pins: Vec<&'a TaxonomyEntry> = TaxonomyCategory::RESOLUTION_ORDER
                [position + 1..]
                .iter()
                .filter_map(|later| surviving.get(later).copied())
                .collect();

            if let Some(selected) = self.pick(*category, &options, &chosen, &later_pins) {
                chosen.push(selected);
            }
        }

        self.record_incompatible_pairs(&chosen, &mut notes);

        let scores: Vec<f64> = chosen.iter().map(|c| c.score).collect();
        let confidence = Confidence::from_scores(&scores, notes.len());
        let fingerprint = fingerprint(&chosen);

        let mut alternates = BTreeMap::new();
        for selected in &chosen {
            let rest: Vec<MatchCandidate<'a>> = candidates
                .candidates(selected.category())
                .iter()
                .filter(|c| !c.entry.is(selected.entry))
                .cloned()
                .collect();
            alternates.insert(selected.category(), rest);
        }
        let selections = chosen.into_iter().map(|c| (c.category(), c)).collect();

        ResolvedSelection {
            selections,
            alternates,
            confidence,
            notes,
            fingerprint,
        }
    }

    /// Pins kept after checking each against every earlier kept pin.
    fn surviving_pins(
        &self,
        candidates: &CandidateSet<'a>,
        notes: &mut Vec<ConflictNote>,
    ) -> BTreeMap<TaxonomyCategory, &'a TaxonomyEntry> {
        let mut surviving: BTreeMap<TaxonomyCategory, &'a TaxonomyEntry> = BTreeMap::new();
        let mut kept_in_order: Vec<&'a TaxonomyEntry> = Vec::new();

        for category in TaxonomyCategory::RESOLUTION_ORDER {
            let Some(pin) = candidates.pin(category) else {
                continue;
            };
            match kept_in_order
                .iter()
                .find(|earlier| !self.store.compatible_pairs(earlier, pin))
            {
                None => {
                    surviving.insert(category, pin);
                    kept_in_order.push(pin);
                }
                Some(winner) => {
                    debug!(
                        category = %category,
                        pin = %pin.id,
                        winner = %winner.entry_ref(),
                        "Overriding conflicting pin"
                    );
                    notes.push(ConflictNote {
                        kind: ConflictKind::HintOverridden,
                        categories: vec![winner.category, category],
                        entries: vec![winner.entry_ref().to_string(), pin.entry_ref().to_string()],
                        message: format!(
                            "{} hint '{}' overridden: incompatible with {} hint '{}', which resolves first",
                            category, pin.id, winner.category, winner.id
                        ),
                    });
                }
            }
        }
        surviving
    }

    fn compatible_with_all(&self, entry: &TaxonomyEntry, constraints: &[&TaxonomyEntry]) -> bool {
        constraints
            .iter()
            .all(|other| self.store.compatible_pairs(entry, other))
    }

    fn first_compatible(
        &self,
        options: &[&MatchCandidate<'a>],
        constraints: &[&TaxonomyEntry],
    ) -> Option<MatchCandidate<'a>> {
        options
            .iter()
            .find(|c| self.compatible_with_all(c.entry, constraints))
            .map(|c| (*c).clone())
    }

    fn pick(
        &self,
        category: TaxonomyCategory,
        options: &[&MatchCandidate<'a>],
        chosen: &[MatchCandidate<'a>],
        later_pins: &[&'a TaxonomyEntry],
    ) -> Option<MatchCandidate<'a>> {
        let mut constraints: Vec<&TaxonomyEntry> = chosen.iter().map(|c| c.entry).collect();
        constraints.extend(later_pins.iter().copied());

        if let Some(found) = self.first_compatible(options, &constraints) {
            return Some(found);
        }

        // Relax once: drop the lowest-priority entry chosen so far.
        if !chosen.is_empty() {
            let mut relaxed: Vec<&TaxonomyEntry> =
                chosen[..chosen.len() - 1].iter().map(|c| c.entry).collect();
            relaxed.extend(later_pins.iter().copied());
            if let Some(found) = self.first_compatible(options, &relaxed) {
                debug!(
                    category = %category,
                    selected = %found.entry.id,
                    dropped = %chosen[chosen.len() - 1].entry.entry_ref(),
                    "Resolved after relaxing one constraint"
                );
                return Some(found);
            }
        }

        let fallback = options.first().map(|c| (*c).clone());
        if let Some(top) = &fallback {
            debug!(category = %category, selected = %top.entry.id, "No compatible candidate; taking top");
        }
        fallback
    }

    fn record_incompatible_pairs(&self, chosen: &[MatchCandidate<'a>], notes: &mut Vec<ConflictNote>) {
        for (i, a) in chosen.iter().enumerate() {
            for b in &chosen[i + 1..] {
                if self.store.compatible_pairs(a.entry, b.entry) {
                    continue;
                }
                notes.push(ConflictNote {
                    kind: ConflictKind::IncompatiblePair,
                    categories: vec![a.category(), b.category()],
                    entries: vec![a.entry.entry_ref().to_string(), b.entry.entry_ref().to_string()],
                    message: format!(
                        "{} '{}' is not compatible with {} '{}'",
                        a.category(),
                        a.entry.name,
                        b.category(),
                        b.entry.name
                    ),
                });
            }
        }
    }
}

/// Truncated SHA-256 over the selected ids in category order.
fn fingerprint(chosen: &[MatchCandidate<'_>]) -> String {
    let mut ordered: Vec<&MatchCandidate<'_>> = chosen.iter().collect();
    ordered.sort_by_key(|c| c.category().index());
    let canonical: Vec<String> = ordered
        .iter()
        .map(|c| c.entry.entry_ref().to_string())
        .collect();

    let mut hasher = Sha256::new();
    hasher.update(canonical.join("\n").as_bytes());
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(FINGERPRINT_LEN);
    digest
}
