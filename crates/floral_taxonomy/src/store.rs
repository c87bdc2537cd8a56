//! Immutable in-memory taxonomy store.
//!
//! Loaded once at process start and shared by reference; there is no
//! mutation API.

use crate::category::{EntryRef, TaxonomyCategory};
use crate::entry::{AttributeValue, Occasion, TaxonomyEntry};
use crate::error::{Result, TaxonomyError};
use crate::text;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tracing::debug;

/// The dataset compiled into the binary.
const BUNDLED_TAXONOMY: &str = include_str!("../data/taxonomy.toml");

/// Valid flower roles, in display order.
pub const FLOWER_ROLES: [&str; 4] = ["focal", "line", "filler", "texture"];

// ============================================================================
// On-disk format
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTaxonomy {
    #[serde(default)]
    style: Vec<RawEntry>,
    #[serde(default)]
    flower: Vec<RawEntry>,
    #[serde(default)]
    foliage: Vec<RawEntry>,
    #[serde(default)]
    palette: Vec<RawEntry>,
    #[serde(default)]
    technique: Vec<RawEntry>,
    #[serde(default)]
    tradition: Vec<RawEntry>,
    #[serde(default)]
    occasion: Vec<Occasion>,
}

impl RawTaxonomy {
    fn into_sections(self) -> ([(TaxonomyCategory, Vec<RawEntry>); 6], Vec<Occasion>) {
        (
            [
                (TaxonomyCategory::Style, self.style),
                (TaxonomyCategory::FlowerRole, self.flower),
                (TaxonomyCategory::Foliage, self.foliage),
                (TaxonomyCategory::Palette, self.palette),
                (TaxonomyCategory::Technique, self.technique),
                (TaxonomyCategory::Tradition, self.tradition),
            ],
            self.occasion,
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEntry {
    id: String,
    name: String,
    #[serde(default)]
    group: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    compatible: Vec<String>,
    #[serde(default)]
    excludes: Vec<String>,
    #[serde(default)]
    general: Option<u32>,
    #[serde(default)]
    attributes: BTreeMap<String, AttributeValue>,
}

impl RawEntry {
    fn into_entry(self, category: TaxonomyCategory) -> Result<TaxonomyEntry> {
        let label = format!("{}:{}", category, self.id);
        if self.id.trim().is_empty() || self.name.trim().is_empty() {
            return Err(TaxonomyError::InvalidAttribute {
                entry: label,
                message: "entries need a non-empty id and name".to_string(),
            });
        }

        let parse_refs = |refs: Vec<String>| -> Result<Vec<EntryRef>> {
            refs.iter()
                .map(|r| {
                    let parsed: EntryRef =
                        r.parse().map_err(|e| TaxonomyError::InvalidAttribute {
                            entry: label.clone(),
                            message: format!("{e}"),
                        })?;
                    if parsed.category == category {
                        return Err(TaxonomyError::InvalidAttribute {
                            entry: label.clone(),
                            message: format!("reference '{r}' points into its own category"),
                        });
                    }
                    Ok(parsed)
                })
                .collect()
        };
        let compatible = parse_refs(self.compatible)?;
        let excludes = parse_refs(self.excludes)?;

        Ok(TaxonomyEntry::new(
            category,
            self.id,
            self.name,
            self.group,
            self.description,
            self.keywords,
            compatible,
            excludes,
            self.general,
            self.attributes,
        ))
    }
}

// ============================================================================
// Store
// ============================================================================

/// Entry counts per category, for server info.
#[derive(Debug, Clone, Serialize)]
pub struct TaxonomySummary {
    pub categories: BTreeMap<String, usize>,
    pub occasions: usize,
    pub total_entries: usize,
}

#[derive(Debug)]
pub struct TaxonomyStore {
    entries: [Vec<TaxonomyEntry>; 6],
    index: [HashMap<String, usize>; 6],
    occasions: Vec<Occasion>,
    document_frequency: HashMap<String, usize>,
    total_entries: usize,
}

impl TaxonomyStore {
    /// Load the dataset compiled into the binary.
    pub fn bundled() -> Result<Self> {
        Self::from_toml_str(BUNDLED_TAXONOMY)
    }

    /// Load a replacement dataset from disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|source| TaxonomyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        let raw: RawTaxonomy = toml::from_str(source)?;
        let (sections, occasions) = raw.into_sections();

        let mut entries: [Vec<TaxonomyEntry>; 6] = Default::default();
        let mut index: [HashMap<String, usize>; 6] = Default::default();
        for (category, raw_entries) in sections {
            let slot = category.index();
            for raw_entry in raw_entries {
                let entry = raw_entry.into_entry(category)?;
                if index[slot].insert(entry.id.clone(), entries[slot].len()).is_some() {
                    return Err(TaxonomyError::DuplicateId {
                        category,
                        id: entry.id,
                    });
                }
                entries[slot].push(entry);
            }
        }

        let mut document_frequency: HashMap<String, usize> = HashMap::new();
        for entry in entries.iter().flatten() {
            for phrase in entry.phrases() {
                *document_frequency.entry(phrase.tag.clone()).or_insert(0) += 1;
            }
        }
        let total_entries = entries.iter().map(Vec::len).sum();

        let store = Self {
            entries,
            index,
            occasions,
            document_frequency,
            total_entries,
        };
        store.validate()?;

        debug!(
            entries = store.total_entries,
            tags = store.document_frequency.len(),
            occasions = store.occasions.len(),
            "Loaded taxonomy"
        );
        Ok(store)
    }

    fn validate(&self) -> Result<()> {
        for category in TaxonomyCategory::ALL {
            if self.all_entries(category).is_empty() {
                return Err(TaxonomyError::EmptyTaxonomy(category));
            }
        }

        for entry in self.entries.iter().flatten() {
            for reference in entry.compatible.iter().chain(entry.excludes.iter()) {
                if self.entry(reference).is_none() {
                    return Err(TaxonomyError::DanglingReference {
                        entry: entry.entry_ref().to_string(),
                        reference: reference.to_string(),
                    });
                }
            }
        }

        for flower in self.all_entries(TaxonomyCategory::FlowerRole) {
            if !FLOWER_ROLES.contains(&flower.group.as_str()) {
                return Err(TaxonomyError::InvalidAttribute {
                    entry: flower.entry_ref().to_string(),
                    message: format!(
                        "flower role '{}' is not one of {}",
                        flower.group,
                        FLOWER_ROLES.join(", ")
                    ),
                });
            }
        }

        let mut seen = HashSet::new();
        for occasion in &self.occasions {
            if !seen.insert(occasion.id.as_str()) {
                return Err(TaxonomyError::InvalidAttribute {
                    entry: format!("occasion:{}", occasion.id),
                    message: "duplicate occasion id".to_string(),
                });
            }
        }

        Ok(())
    }

    // ------------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------------

    pub fn lookup(&self, category: TaxonomyCategory, id: &str) -> Option<&TaxonomyEntry> {
        let slot = category.index();
        self.index[slot].get(id).map(|&i| &self.entries[slot][i])
    }

    pub fn entry(&self, reference: &EntryRef) -> Option<&TaxonomyEntry> {
        self.lookup(reference.category, &reference.id)
    }

    /// Entries of one category in store order.
    pub fn all_entries(&self, category: TaxonomyCategory) -> &[TaxonomyEntry] {
        &self.entries[category.index()]
    }

    /// Every entry, categories in [`TaxonomyCategory::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = &TaxonomyEntry> {
        self.entries.iter().flatten()
    }

    pub fn entry_count(&self) -> usize {
        self.total_entries
    }

    /// Symmetric compatibility between two entries.
    ///
    /// Entries of the same category never constrain each other. Otherwise a
    /// pair is incompatible when either side excludes the other, or when
    /// either side has an allow-list for the other's category that does not
    /// name it.
    pub fn compatible_pairs(&self, a: &TaxonomyEntry, b: &TaxonomyEntry) -> bool {
        if a.category == b.category {
            return true;
        }
        if a.excludes_entry(b) || b.excludes_entry(a) {
            return false;
        }
        a.allows(b) && b.allows(a)
    }

    /// General-purpose fallbacks for a category, best first.
    ///
    /// Falls back to the category's first entry when none is ranked.
    pub fn general_entries(&self, category: TaxonomyCategory) -> Vec<&TaxonomyEntry> {
        let mut ranked: Vec<(u32, usize, &TaxonomyEntry)> = self
            .all_entries(category)
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.general.map(|rank| (rank, i, e)))
            .collect();
        ranked.sort_by_key(|&(rank, i, _)| (rank, i));

        if ranked.is_empty() {
            return self.all_entries(category).iter().take(1).collect();
        }
        ranked.into_iter().map(|(_, _, e)| e).collect()
    }

    /// Number of entries carrying `tag` (compared after tokenisation).
    pub fn keyword_document_frequency(&self, tag: &str) -> usize {
        let key = text::phrase_key(&text::tokenize(tag));
        self.document_frequency.get(&key).copied().unwrap_or(0)
    }

    // ------------------------------------------------------------------------
    // Reference projections
    // ------------------------------------------------------------------------

    /// Flowers whose role is exactly `role`, in store order.
    pub fn flowers_by_role(&self, role: &str) -> Vec<&TaxonomyEntry> {
        let role = role.trim().to_ascii_lowercase();
        self.all_entries(TaxonomyCategory::FlowerRole)
            .iter()
            .filter(|e| e.group == role)
            .collect()
    }

    pub fn flower_roles(&self) -> &'static [&'static str] {
        &FLOWER_ROLES
    }

    pub fn occasions(&self) -> &[Occasion] {
        &self.occasions
    }

    /// Resolve an occasion by id first, then by name, keyword or setting.
    pub fn find_occasion(&self, name: &str) -> Option<&Occasion> {
        let id = name.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        self.occasions
            .iter()
            .find(|o| o.id == id)
            .or_else(|| self.occasions.iter().find(|o| o.matches(name)))
    }

    pub fn summary(&self) -> TaxonomySummary {
        TaxonomySummary {
            categories: TaxonomyCategory::ALL
                .iter()
                .map(|c| (c.as_str().to_string(), self.all_entries(*c).len()))
                .collect(),
            occasions: self.occasions.len(),
            total_entries: self.total_entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[[style]]
id = "nageire"
name = "Nageire"
group = "ikebana"
keywords = ["ikebana"]
compatible = ["tradition:japanese_ikebana"]

[[style]]
id = "dome"
name = "Dome"
group = "western_classical"
excludes = ["technique:asymmetrical"]
general = 1

[[flower]]
id = "roses"
name = "Roses"
group = "focal"

[[foliage]]
id = "ivy"
name = "Ivy"
group = "accent"

[[palette]]
id = "spring"
name = "Spring"
group = "season"
keywords = ["pastel"]

[[technique]]
id = "asymmetrical"
name = "Asymmetrical"
group = "balance"
keywords = ["ikebana"]

[[tradition]]
id = "japanese_ikebana"
name = "Japanese Ikebana"
group = "eastern"
keywords = ["ikebana"]

[[tradition]]
id = "victorian"
name = "Victorian"
group = "western"
"#;

    fn minimal() -> TaxonomyStore {
        TaxonomyStore::from_toml_str(MINIMAL).unwrap()
    }

    #[test]
    fn test_lookup_and_order() {
        let store = minimal();
        let styles: Vec<&str> = store
            .all_entries(TaxonomyCategory::Style)
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(styles, vec!["nageire", "dome"]);
        assert!(store.lookup(TaxonomyCategory::Style, "dome").is_some());
        assert!(store.lookup(TaxonomyCategory::Style, "cascade").is_none());
        assert!(store.lookup(TaxonomyCategory::Tradition, "dome").is_none());
        assert_eq!(store.entry_count(), 8);
    }

    #[test]
    fn test_compatible_pairs_rules() {
        let store = minimal();
        let nageire = store.lookup(TaxonomyCategory::Style, "nageire").unwrap();
        let dome = store.lookup(TaxonomyCategory::Style, "dome").unwrap();
        let ikebana = store.lookup(TaxonomyCategory::Tradition, "japanese_ikebana").unwrap();
        let victorian = store.lookup(TaxonomyCategory::Tradition, "victorian").unwrap();
        let asym = store.lookup(TaxonomyCategory::Technique, "asymmetrical").unwrap();
        let roses = store.lookup(TaxonomyCategory::FlowerRole, "roses").unwrap();

        // Same category
        assert!(store.compatible_pairs(nageire, dome));
        // Allow-list
        assert!(store.compatible_pairs(nageire, ikebana));
        assert!(!store.compatible_pairs(nageire, victorian));
        assert!(!store.compatible_pairs(victorian, nageire));
        // Deny-list, both directions
        assert!(!store.compatible_pairs(dome, asym));
        assert!(!store.compatible_pairs(asym, dome));
        // Unrelated
        assert!(store.compatible_pairs(roses, victorian));
    }

    #[test]
    fn test_general_entries_ranked_or_first() {
        let store = minimal();
        let styles: Vec<&str> = store
            .general_entries(TaxonomyCategory::Style)
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(styles, vec!["dome"]);

        let traditions: Vec<&str> = store
            .general_entries(TaxonomyCategory::Tradition)
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(traditions, vec!["japanese_ikebana"]);
    }

    #[test]
    fn test_document_frequency() {
        let store = minimal();
        assert_eq!(store.keyword_document_frequency("ikebana"), 3);
        assert_eq!(store.keyword_document_frequency("Pastel"), 1);
        assert_eq!(store.keyword_document_frequency("baroque"), 0);
    }

    #[test]
    fn test_empty_category_is_fatal() {
        let source = MINIMAL.replace("[[foliage]]\nid = \"ivy\"\nname = \"Ivy\"\ngroup = \"accent\"\n", "");
        let err = TaxonomyStore::from_toml_str(&source).unwrap_err();
        assert!(matches!(err, TaxonomyError::EmptyTaxonomy(TaxonomyCategory::Foliage)));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let source = format!("{MINIMAL}\n[[foliage]]\nid = \"ivy\"\nname = \"Ivy again\"\n");
        let err = TaxonomyStore::from_toml_str(&source).unwrap_err();
        assert!(matches!(err, TaxonomyError::DuplicateId { .. }));
    }

    #[test]
    fn test_dangling_reference_rejected() {
        let source = MINIMAL.replace("technique:asymmetrical", "technique:spiral");
        let err = TaxonomyStore::from_toml_str(&source).unwrap_err();
        match err {
            TaxonomyError::DanglingReference { entry, reference } => {
                assert_eq!(entry, "style:dome");
                assert_eq!(reference, "technique:spiral");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_self_category_reference_rejected() {
        let source = MINIMAL.replace("technique:asymmetrical", "style:nageire");
        let err = TaxonomyStore::from_toml_str(&source).unwrap_err();
        assert!(matches!(err, TaxonomyError::InvalidAttribute { .. }));
    }

    #[test]
    fn test_invalid_flower_role_rejected() {
        let source = MINIMAL.replace("group = \"focal\"", "group = \"hero\"");
        let err = TaxonomyStore::from_toml_str(&source).unwrap_err();
        assert!(matches!(err, TaxonomyError::InvalidAttribute { .. }));
    }

    #[test]
    fn test_parse_error_surfaces() {
        let err = TaxonomyStore::from_toml_str("[[style]\nid = ").unwrap_err();
        assert!(matches!(err, TaxonomyError::Parse(_)));
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = TaxonomyStore::from_path(Path::new("/nonexistent/taxonomy.toml")).unwrap_err();
        assert!(matches!(err, TaxonomyError::Io { .. }));
    }

    #[test]
    fn test_from_path_reads_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("taxonomy.toml");
        std::fs::write(&path, MINIMAL).unwrap();
        let store = TaxonomyStore::from_path(&path).unwrap();
        assert_eq!(store.entry_count(), 8);
    }
}
