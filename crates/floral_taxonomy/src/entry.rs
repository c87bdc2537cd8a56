//! Taxonomy entries and occasion reference records.

use crate::category::{EntryRef, TaxonomyCategory};
use crate::text;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A descriptive attribute: either a single phrase or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Text(String),
    List(Vec<String>),
}

impl AttributeValue {
    pub fn items(&self) -> Vec<&str> {
        match self {
            AttributeValue::Text(s) => vec![s.as_str()],
            AttributeValue::List(items) => items.iter().map(String::as_str).collect(),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Text(s) => f.write_str(s),
            AttributeValue::List(items) => f.write_str(&items.join(", ")),
        }
    }
}

/// A searchable keyword phrase, pre-tokenised at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordPhrase {
    /// The phrase as written in the dataset.
    pub text: String,
    /// Canonical form (folded tokens joined by a space).
    pub tag: String,
    pub tokens: Vec<String>,
}

/// One immutable record of the reference dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxonomyEntry {
    pub category: TaxonomyCategory,
    pub id: String,
    pub name: String,
    /// Sub-family; for flowers this is the role.
    pub group: String,
    pub description: String,
    pub keywords: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub compatible: Vec<EntryRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub excludes: Vec<EntryRef>,
    /// Rank among the general-purpose fallbacks, if this is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub general: Option<u32>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, AttributeValue>,
    #[serde(skip)]
    phrases: Vec<KeywordPhrase>,
}

impl TaxonomyEntry {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        category: TaxonomyCategory,
        id: String,
        name: String,
        group: String,
        description: String,
        keywords: Vec<String>,
        compatible: Vec<EntryRef>,
        excludes: Vec<EntryRef>,
        general: Option<u32>,
        attributes: BTreeMap<String, AttributeValue>,
    ) -> Self {
        let mut phrases: Vec<KeywordPhrase> = Vec::new();
        let implicit = [name.clone(), id.replace('_', " ")];
        for source in implicit.iter().chain(keywords.iter()) {
            let tokens = text::tokenize(source);
            if tokens.is_empty() {
                continue;
            }
            let tag = text::phrase_key(&tokens);
            if phrases.iter().all(|p| p.tag != tag) {
                phrases.push(KeywordPhrase {
                    text: source.clone(),
                    tag,
                    tokens,
                });
            }
        }

        Self {
            category,
            id,
            name,
            group,
            description,
            keywords,
            compatible,
            excludes,
            general,
            attributes,
            phrases,
        }
    }

    pub fn entry_ref(&self) -> EntryRef {
        EntryRef::new(self.category, self.id.clone())
    }

    /// Keyword phrases including the implicit name and id phrases.
    pub fn phrases(&self) -> &[KeywordPhrase] {
        &self.phrases
    }

    /// Whether this entry carries `tag` (compared after tokenisation).
    pub fn has_tag(&self, tag: &str) -> bool {
        let key = text::phrase_key(&text::tokenize(tag));
        self.phrases.iter().any(|p| p.tag == key)
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    pub fn is(&self, other: &TaxonomyEntry) -> bool {
        self.category == other.category && self.id == other.id
    }

    /// Deny-list check: does this entry exclude `other`?
    pub fn excludes_entry(&self, other: &TaxonomyEntry) -> bool {
        self.excludes
            .iter()
            .any(|r| r.category == other.category && r.id == other.id)
    }

    /// Allow-list check: an empty allow-list for `other`'s category allows everything.
    pub fn allows(&self, other: &TaxonomyEntry) -> bool {
        let mut scoped = self
            .compatible
            .iter()
            .filter(|r| r.category == other.category)
            .peekable();
        if scoped.peek().is_none() {
            return true;
        }
        scoped.any(|r| r.id == other.id)
    }

    /// Whether this entry names `other` in either its allow- or deny-list.
    pub fn references(&self, other: &TaxonomyEntry) -> bool {
        self.compatible
            .iter()
            .chain(self.excludes.iter())
            .any(|r| r.category == other.category && r.id == other.id)
    }

    /// Positive affinity: `other` is on this entry's allow-list.
    pub fn prefers(&self, other: &TaxonomyEntry) -> bool {
        self.compatible
            .iter()
            .any(|r| r.category == other.category && r.id == other.id)
    }
}

/// A specific setting within an occasion (e.g. a wedding reception).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccasionSetting {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arrangements: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub styles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub characteristics: Option<String>,
}

/// Occasion reference data used for flower recommendations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occasion {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub settings: Vec<OccasionSetting>,
}

impl Occasion {
    /// Whether `query` names this occasion, one of its settings, or a keyword.
    pub fn matches(&self, query: &str) -> bool {
        let tokens = text::tokenize(query);
        let candidates = std::iter::once(self.id.replace('_', " "))
            .chain(std::iter::once(self.name.clone()))
            .chain(self.keywords.iter().cloned())
            .chain(self.settings.iter().map(|s| s.id.replace('_', " ")));
        candidates
            .map(|c| text::tokenize(&c))
            .any(|phrase| text::contains_phrase(&tokens, &phrase))
    }
}
