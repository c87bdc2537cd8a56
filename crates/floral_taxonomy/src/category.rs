//! Taxonomy categories and cross-category entry references.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The closed set of categories every resolved selection covers.
///
/// Declaration order is the store order used for listings; resolution
/// order lives in [`TaxonomyCategory::RESOLUTION_ORDER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxonomyCategory {
    Style,
    #[serde(rename = "flower")]
    FlowerRole,
    Foliage,
    Palette,
    Technique,
    Tradition,
}

impl TaxonomyCategory {
    /// All categories in store order.
    pub const ALL: [TaxonomyCategory; 6] = [
        TaxonomyCategory::Style,
        TaxonomyCategory::FlowerRole,
        TaxonomyCategory::Foliage,
        TaxonomyCategory::Palette,
        TaxonomyCategory::Technique,
        TaxonomyCategory::Tradition,
    ];

    /// Most constraining first: tradition and style anchor everything else.
    pub const RESOLUTION_ORDER: [TaxonomyCategory; 6] = [
        TaxonomyCategory::Tradition,
        TaxonomyCategory::Style,
        TaxonomyCategory::FlowerRole,
        TaxonomyCategory::Foliage,
        TaxonomyCategory::Palette,
        TaxonomyCategory::Technique,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaxonomyCategory::Style => "style",
            TaxonomyCategory::FlowerRole => "flower",
            TaxonomyCategory::Foliage => "foliage",
            TaxonomyCategory::Palette => "palette",
            TaxonomyCategory::Technique => "technique",
            TaxonomyCategory::Tradition => "tradition",
        }
    }

    /// Dense index into per-category arrays.
    pub fn index(&self) -> usize {
        match self {
            TaxonomyCategory::Style => 0,
            TaxonomyCategory::FlowerRole => 1,
            TaxonomyCategory::Foliage => 2,
            TaxonomyCategory::Palette => 3,
            TaxonomyCategory::Technique => 4,
            TaxonomyCategory::Tradition => 5,
        }
    }

    /// Position in [`Self::RESOLUTION_ORDER`]; lower resolves earlier.
    pub fn priority(&self) -> usize {
        match self {
            TaxonomyCategory::Tradition => 0,
            TaxonomyCategory::Style => 1,
            TaxonomyCategory::FlowerRole => 2,
            TaxonomyCategory::Foliage => 3,
            TaxonomyCategory::Palette => 4,
            TaxonomyCategory::Technique => 5,
        }
    }
}

impl fmt::Display for TaxonomyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown taxonomy category '{0}'")]
pub struct UnknownCategory(pub String);

impl FromStr for TaxonomyCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "style" | "arrangement_style" => Ok(TaxonomyCategory::Style),
            "flower" | "flower_role" | "flowerrole" | "flowers" => Ok(TaxonomyCategory::FlowerRole),
            "foliage" => Ok(TaxonomyCategory::Foliage),
            "palette" | "color" | "color_palette" => Ok(TaxonomyCategory::Palette),
            "technique" | "structural_technique" => Ok(TaxonomyCategory::Technique),
            "tradition" | "cultural_tradition" => Ok(TaxonomyCategory::Tradition),
            _ => Err(UnknownCategory(s.to_string())),
        }
    }
}

/// A `"<category>:<id>"` pointer to an entry in another category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryRef {
    pub category: TaxonomyCategory,
    pub id: String,
}

impl EntryRef {
    pub fn new(category: TaxonomyCategory, id: impl Into<String>) -> Self {
        Self {
            category,
            id: id.into(),
        }
    }
}

impl Serialize for EntryRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl fmt::Display for EntryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryRefParseError {
    #[error("reference '{0}' is not of the form <category>:<id>")]
    Malformed(String),
    #[error(transparent)]
    Category(#[from] UnknownCategory),
}

impl FromStr for EntryRef {
    type Err = EntryRefParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (category, id) = s
            .split_once(':')
            .ok_or_else(|| EntryRefParseError::Malformed(s.to_string()))?;
        let id = id.trim();
        if id.is_empty() {
            return Err(EntryRefParseError::Malformed(s.to_string()));
        }
        Ok(EntryRef::new(category.parse()?, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_aliases() {
        assert_eq!("Flower_Role".parse::<TaxonomyCategory>().unwrap(), TaxonomyCategory::FlowerRole);
        assert_eq!("color".parse::<TaxonomyCategory>().unwrap(), TaxonomyCategory::Palette);
        assert_eq!(" tradition ".parse::<TaxonomyCategory>().unwrap(), TaxonomyCategory::Tradition);
        assert!("vase".parse::<TaxonomyCategory>().is_err());
    }

    #[test]
    fn test_resolution_order_matches_priority() {
        for (i, category) in TaxonomyCategory::RESOLUTION_ORDER.iter().enumerate() {
            assert_eq!(category.priority(), i);
        }
        for (i, category) in TaxonomyCategory::ALL.iter().enumerate() {
            assert_eq!(category.index(), i);
        }
    }

    #[test]
    fn test_entry_ref_parse() {
        let r: EntryRef = "tradition:japanese_ikebana".parse().unwrap();
        assert_eq!(r.category, TaxonomyCategory::Tradition);
        assert_eq!(r.id, "japanese_ikebana");
        assert_eq!(r.to_string(), "tradition:japanese_ikebana");

        assert!(matches!(
            "japanese_ikebana".parse::<EntryRef>(),
            Err(EntryRefParseError::Malformed(_))
        ));
        assert!(matches!(
            "vase:tall".parse::<EntryRef>(),
            Err(EntryRefParseError::Category(_))
        ));
        assert!("style:".parse::<EntryRef>().is_err());
    }

    #[test]
    fn test_category_serde_name() {
        let json = serde_json::to_string(&TaxonomyCategory::FlowerRole).unwrap();
        assert_eq!(json, "\"flower\"");
    }
}
