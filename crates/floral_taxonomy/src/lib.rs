//! Floral design reference taxonomy.
//!
//! The store is the read-only input of the intent pipeline: arrangement
//! styles, flowers by role, foliage, color palettes, structural techniques
//! and cultural traditions, each entry carrying searchable keyword tags and
//! compatibility references into the other categories.

pub mod category;
pub mod entry;
pub mod error;
pub mod store;
pub mod text;

pub use category::{EntryRef, EntryRefParseError, TaxonomyCategory, UnknownCategory};
pub use entry::{AttributeValue, KeywordPhrase, Occasion, OccasionSetting, TaxonomyEntry};
pub use error::{Result, TaxonomyError};
pub use store::{TaxonomyStore, TaxonomySummary, FLOWER_ROLES};
