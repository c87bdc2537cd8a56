//! Projection of a resolved selection into the two output shapes: an
//! enhanced prompt and a flat workflow slot mapping. No matching happens here.
//!
//! Between the two sits an [`ArrangementPlan`]: flowers per role, several
//! foliage entries and the structural techniques, all drawn from the
//! selection, its alternates and the store, and all compatible with the
//! selection.

use crate::types::ResolvedSelection;
use floral_taxonomy::{TaxonomyCategory, TaxonomyEntry, TaxonomyStore, FLOWER_ROLES};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Default negative prompt for image generation workflows.
pub const DEFAULT_NEGATIVE_PROMPT: &str = "wilted, dead, brown, artificial, plastic, fake flowers, \
low quality, blurry, distorted, malformed flowers, ugly arrangement, chaotic, messy, cluttered";

/// Fixed slot names expected by the downstream workflow builder.
pub const WORKFLOW_SLOT_KEYS: [&str; 10] = [
    "style",
    "style_group",
    "tradition",
    "focal_flower",
    "foliage",
    "palette",
    "palette_colors",
    "technique",
    "positive_prompt",
    "negative_prompt",
];

/// Technique groups that make up an arrangement's structure, in prose order.
pub const STRUCTURE_ASPECTS: [&str; 4] = ["balance", "movement", "proportion", "density"];

const MAX_FLOWERS_PER_ROLE: usize = 2;
const MAX_FOLIAGE: usize = 3;

/// Style id to movement technique id. Other styles spiral.
const MOVEMENT_BY_STYLE: [(&str, &str); 3] = [
    ("cascade", "cascade_fall"),
    ("vertical", "vertical_lift"),
    ("horizontal", "horizontal_sweep"),
];
const DEFAULT_MOVEMENT: &str = "spiral_rotation";

/// Style id to density technique id. Other styles cluster.
const DENSITY_BY_STYLE: [(&str, &str); 2] = [
    ("minimalist", "airy_spacious"),
    ("garden_style", "packed_abundant"),
];
const DEFAULT_DENSITY: &str = "clustered_with_voids";

const DEFAULT_PROPORTION: &str = "golden_ratio";

// ============================================================================
// Arrangement plan
// ============================================================================

/// One entry placed in the plan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanItem<'a> {
    pub entry: &'a TaxonomyEntry,
}

impl PlanItem<'_> {
    pub fn id(&self) -> &str {
        &self.entry.id
    }
}

impl Serialize for PlanItem<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PlanItem", 4)?;
        state.serialize_field("id", &self.entry.id)?;
        state.serialize_field("name", &self.entry.name)?;
        state.serialize_field("group", &self.entry.group)?;
        state.serialize_field("description", &self.entry.description)?;
        state.end()
    }
}

/// Flowers by role, foliage and structure for one selection.
///
/// The focal role always holds a focal flower when the store has one, so a
/// filler or line flower never stands in as the centerpiece.
#[derive(Debug, Clone, Serialize)]
pub struct ArrangementPlan<'a> {
    /// Role (`focal`, `line`, `filler`, `texture`) to flowers, best first.
    /// Roles with nothing suitable are absent.
    pub flowers: BTreeMap<&'static str, Vec<PlanItem<'a>>>,
    /// Selected foliage first.
    pub foliage: Vec<PlanItem<'a>>,
    /// Aspect (`balance`, `movement`, `proportion`, `density`) to technique.
    pub structure: BTreeMap<&'static str, PlanItem<'a>>,
}

impl<'a> ArrangementPlan<'a> {
    pub fn flowers(&self, role: &str) -> &[PlanItem<'a>] {
        self.flowers.get(role).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn focal_flower(&self) -> Option<&'a TaxonomyEntry> {
        self.flowers("focal").first().map(|item| item.entry)
    }
}

/// Compatible with every selected entry.
fn fits(store: &TaxonomyStore, selection: &ResolvedSelection<'_>, entry: &TaxonomyEntry) -> bool {
    selection
        .selections
        .values()
        .all(|selected| store.compatible_pairs(entry, selected.entry))
}

fn push_unique<'a>(items: &mut Vec<PlanItem<'a>>, entry: &'a TaxonomyEntry, limit: usize) {
    if items.len() < limit && !items.iter().any(|item| item.entry.is(entry)) {
        items.push(PlanItem { entry });
    }
}

fn role_flowers<'a>(
    store: &'a TaxonomyStore,
    selection: &ResolvedSelection<'a>,
    role: &str,
) -> Vec<PlanItem<'a>> {
    let mut items = Vec::new();
    if let Some(selected) = selection
        .entry(TaxonomyCategory::FlowerRole)
        .filter(|entry| entry.group == role)
    {
        items.push(PlanItem { entry: selected });
    }
    let alternates = selection
        .alternates(TaxonomyCategory::FlowerRole)
        .iter()
        .map(|c| c.entry)
        .filter(|entry| entry.group == role && fits(store, selection, entry));
    for entry in alternates {
        push_unique(&mut items, entry, MAX_FLOWERS_PER_ROLE);
    }

    // Every arrangement gets a focal bloom and a filler.
    if items.is_empty() && (role == "focal" || role == "filler") {
        let any = store.flowers_by_role(role);
        let fallback = store
            .general_entries(TaxonomyCategory::FlowerRole)
            .into_iter()
            .filter(|entry| entry.group == role)
            .chain(any.iter().copied())
            .find(|entry| fits(store, selection, entry))
            .or_else(|| any.first().copied());
        if let Some(entry) = fallback {
            items.push(PlanItem { entry });
        }
    }
    items
}

fn foliage<'a>(store: &'a TaxonomyStore, selection: &ResolvedSelection<'a>) -> Vec<PlanItem<'a>> {
    let mut items = Vec::new();
    if let Some(selected) = selection.entry(TaxonomyCategory::Foliage) {
        items.push(PlanItem { entry: selected });
    }
    let extra = selection
        .alternates(TaxonomyCategory::Foliage)
        .iter()
        .map(|c| c.entry)
        .chain(store.general_entries(TaxonomyCategory::Foliage))
        .filter(|entry| fits(store, selection, entry));
    for entry in extra {
        push_unique(&mut items, entry, MAX_FOLIAGE);
    }
    items
}

fn by_style(table: &[(&str, &'static str)], style_id: &str, default: &'static str) -> &'static str {
    table
        .iter()
        .find(|(id, _)| *id == style_id)
        .map(|(_, technique)| *technique)
        .unwrap_or(default)
}

/// Technique id implied by the style for one aspect.
fn derived_technique(style: Option<&TaxonomyEntry>, aspect: &str) -> Option<&'static str> {
    let style_id = style.map(|s| s.id.as_str()).unwrap_or_default();
    match aspect {
        "balance" => {
            let balance = style
                .and_then(|s| s.attribute("balance"))
                .map(|v| v.to_string())
                .unwrap_or_default();
            Some(if balance == "symmetrical" || balance == "radial symmetrical" {
                "symmetrical_radial"
            } else {
                "asymmetrical"
            })
        }
        "movement" => Some(by_style(&MOVEMENT_BY_STYLE, style_id, DEFAULT_MOVEMENT)),
        "density" => Some(by_style(&DENSITY_BY_STYLE, style_id, DEFAULT_DENSITY)),
        "proportion" => Some(DEFAULT_PROPORTION),
        _ => None,
    }
}

fn structure<'a>(
    store: &'a TaxonomyStore,
    selection: &ResolvedSelection<'a>,
) -> BTreeMap<&'static str, PlanItem<'a>> {
    let style = selection.entry(TaxonomyCategory::Style);
    let technique = selection.entry(TaxonomyCategory::Technique);
    let mut out = BTreeMap::new();

    for aspect in STRUCTURE_ASPECTS {
        if let Some(selected) = technique.filter(|t| t.group == aspect) {
            out.insert(aspect, PlanItem { entry: selected });
            continue;
        }
        let derived = derived_technique(style, aspect)
            .and_then(|id| store.lookup(TaxonomyCategory::Technique, id))
            .filter(|entry| fits(store, selection, entry));
        let chosen = derived.or_else(|| {
            store
                .all_entries(TaxonomyCategory::Technique)
                .iter()
                .find(|entry| entry.group == aspect && fits(store, selection, entry))
        });
        if let Some(entry) = chosen {
            out.insert(aspect, PlanItem { entry });
        }
    }
    out
}

/// Expand a selection into an arrangement plan.
pub fn plan<'a>(store: &'a TaxonomyStore, selection: &ResolvedSelection<'a>) -> ArrangementPlan<'a> {
    let flowers = FLOWER_ROLES
        .iter()
        .filter_map(|role| {
            let items = role_flowers(store, selection, role);
            (!items.is_empty()).then_some((*role, items))
        })
        .collect();
    ArrangementPlan {
        flowers,
        foliage: foliage(store, selection),
        structure: structure(store, selection),
    }
}

// ============================================================================
// Text
// ============================================================================

fn name(selection: &ResolvedSelection<'_>, category: TaxonomyCategory) -> String {
    selection
        .entry(category)
        .map(|e| e.name.clone())
        .unwrap_or_default()
}

fn lowercase_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Common nouns (flowers, foliage, palettes, techniques) read in lowercase.
fn common(entry: &TaxonomyEntry) -> String {
    entry.name.to_lowercase()
}

/// "a" or "an" for the word that follows.
fn article(word: &str) -> &'static str {
    match word.chars().next().map(|c| c.to_ascii_lowercase()) {
        Some('a' | 'e' | 'i' | 'o' | 'u') => "an",
        _ => "a",
    }
}

/// "a", "a and b", "a, b and c".
fn join_names(items: &[PlanItem<'_>]) -> String {
    let names: Vec<String> = items.iter().map(|item| common(item.entry)).collect();
    match names.split_last() {
        None => String::new(),
        Some((last, [])) => last.clone(),
        Some((last, rest)) => format!("{} and {}", rest.join(", "), last),
    }
}

/// Colors of a palette: its explicit colors, else its examples, else its description.
pub fn palette_colors(palette: &TaxonomyEntry) -> String {
    palette
        .attribute("colors")
        .or_else(|| palette.attribute("examples"))
        .map(|v| v.to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| {
            if palette.description.is_empty() {
                palette.name.clone()
            } else {
                palette.description.clone()
            }
        })
}

/// Deterministic prompt text in the fixed order: style, tradition, flowers by
/// role (focal first), foliage, palette, technique, structure, then the
/// style's characteristics.
pub fn enhanced_text(selection: &ResolvedSelection<'_>, plan: &ArrangementPlan<'_>) -> String {
    let mut clauses: Vec<String> = Vec::new();

    if let Some(style) = selection.entry(TaxonomyCategory::Style) {
        if style.description.is_empty() {
            clauses.push(format!("{} floral arrangement", style.name));
        } else {
            clauses.push(format!(
                "{} floral arrangement, {}",
                style.name,
                lowercase_first(&style.description)
            ));
        }
    }
    if let Some(tradition) = selection.entry(TaxonomyCategory::Tradition) {
        clauses.push(format!("in the {} tradition", tradition.name));
    }

    let focal = plan.flowers("focal");
    if !focal.is_empty() {
        let noun = if focal.len() == 1 { "the focal flower" } else { "focal flowers" };
        clauses.push(format!("featuring {} as {}", join_names(focal), noun));
    }
    let line = plan.flowers("line");
    if !line.is_empty() {
        clauses.push(format!("with {} creating vertical lines", join_names(line)));
    }
    let filler = plan.flowers("filler");
    if !filler.is_empty() {
        clauses.push(format!("filled with {}", join_names(filler)));
    }
    let texture = plan.flowers("texture");
    if !texture.is_empty() {
        clauses.push(format!("with {} for texture", join_names(texture)));
    }
    if !plan.foliage.is_empty() {
        clauses.push(format!("accented with {} foliage", join_names(&plan.foliage)));
    }

    if let Some(palette) = selection.entry(TaxonomyCategory::Palette) {
        let palette_name = common(palette);
        clauses.push(format!(
            "in {} {} palette of {}",
            article(&palette_name),
            palette_name,
            palette_colors(palette)
        ));
    }
    let technique = selection.entry(TaxonomyCategory::Technique);
    if let Some(technique) = technique {
        clauses.push(format!("composed with {}", common(technique)));
    }
    for aspect in STRUCTURE_ASPECTS {
        let Some(item) = plan.structure.get(aspect) else {
            continue;
        };
        if technique.is_some_and(|t| t.is(item.entry)) {
            continue;
        }
        let detail = if item.entry.description.is_empty() {
            common(item.entry)
        } else {
            lowercase_first(&item.entry.description)
        };
        clauses.push(match aspect {
            "balance" => format!("using {detail}"),
            "movement" => format!("with {detail}"),
            _ => detail,
        });
    }

    let mut text = clauses.join(", ");
    text.push('.');

    if let Some(style) = selection.entry(TaxonomyCategory::Style) {
        if let Some(characteristics) = style.attribute("characteristics") {
            text.push_str(&format!(" Characteristics: {characteristics}."));
        }
        if let Some(container) = style.attribute("container") {
            text.push_str(&format!(" Container: {container}."));
        }
    }
    text
}

/// Flat slot mapping for workflow assembly. Every key in
/// [`WORKFLOW_SLOT_KEYS`] is present and non-empty.
pub fn workflow_slots(
    selection: &ResolvedSelection<'_>,
    plan: &ArrangementPlan<'_>,
    positive_prompt: &str,
) -> BTreeMap<String, String> {
    let style = selection.entry(TaxonomyCategory::Style);
    let style_group = style
        .map(|s| if s.group.is_empty() { s.id.clone() } else { s.group.clone() })
        .unwrap_or_default();
    let focal_flower = plan
        .focal_flower()
        .map(|e| e.name.clone())
        .unwrap_or_else(|| name(selection, TaxonomyCategory::FlowerRole));
    let foliage = if plan.foliage.is_empty() {
        name(selection, TaxonomyCategory::Foliage)
    } else {
        plan.foliage
            .iter()
            .map(|item| item.entry.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    let palette_colors = selection
        .entry(TaxonomyCategory::Palette)
        .map(palette_colors)
        .unwrap_or_default();
    let positive_prompt = if positive_prompt.trim().is_empty() {
        enhanced_text(selection, plan)
    } else {
        positive_prompt.to_string()
    };

    let values = [
        name(selection, TaxonomyCategory::Style),
        style_group,
        name(selection, TaxonomyCategory::Tradition),
        focal_flower,
        foliage,
        name(selection, TaxonomyCategory::Palette),
        palette_colors,
        name(selection, TaxonomyCategory::Technique),
        positive_prompt,
        DEFAULT_NEGATIVE_PROMPT.to_string(),
    ];
    WORKFLOW_SLOT_KEYS
        .iter()
        .zip(values)
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{LexicalMatcher, MatcherConfig};
    use crate::resolver::StructuralResolver;
    use crate::types::Hints;

    fn selection<'a>(store: &'a TaxonomyStore, text: &str) -> ResolvedSelection<'a> {
        let matcher = LexicalMatcher::new(store, MatcherConfig::default());
        StructuralResolver::new(store).resolve(&matcher.match_text(text, &Hints::new()))
    }

    #[test]
    fn test_enhanced_text_fixed_order() {
        let store = TaxonomyStore::bundled().unwrap();
        let selection = selection(&store, "minimalist ikebana arrangement");
        let plan = plan(&store, &selection);
        let text = enhanced_text(&selection, &plan);

        let order = [
            selection.entry(TaxonomyCategory::Style).unwrap().name.clone(),
            "Japanese Ikebana".to_string(),
            common(plan.focal_flower().unwrap()),
            common(plan.foliage[0].entry),
            common(selection.entry(TaxonomyCategory::Palette).unwrap()),
            common(selection.entry(TaxonomyCategory::Technique).unwrap()),
        ];
        let mut last = 0;
        for part in &order {
            let at = text[last..].find(part.as_str()).map(|i| i + last);
            assert!(at.is_some(), "{part} missing or out of order in {text}");
            last = at.unwrap_or(last);
        }
        assert!(text.contains("Characteristics:"));
    }

    #[test]
    fn test_enhanced_text_deterministic() {
        let store = TaxonomyStore::bundled().unwrap();
        let a = selection(&store, "cascade of peonies");
        let b = selection(&store, "cascade of peonies");
        assert_eq!(
            enhanced_text(&a, &plan(&store, &a)),
            enhanced_text(&b, &plan(&store, &b))
        );
    }

    #[test]
    fn test_filler_request_still_gets_focal_flower() {
        let store = TaxonomyStore::bundled().unwrap();
        let selection = selection(&store, "airy gypsophila baby breath cloud");
        assert_eq!(
            selection.entry(TaxonomyCategory::FlowerRole).unwrap().id,
            "baby_breath"
        );
        let plan = plan(&store, &selection);

        let focal = plan.focal_flower().unwrap();
        assert_eq!(focal.group, "focal");
        assert!(plan.flowers("filler").iter().any(|f| f.id() == "baby_breath"));

        let slots = workflow_slots(&selection, &plan, "");
        assert_eq!(slots["focal_flower"], focal.name);
        let text = enhanced_text(&selection, &plan);
        assert!(text.contains("filled with baby's breath"), "{text}");
        assert!(!text.contains("baby's Breath"), "{text}");
    }

    #[test]
    fn test_plan_covers_roles_foliage_and_structure() {
        let store = TaxonomyStore::bundled().unwrap();
        let selection = selection(&store, "romantic garden wedding with roses and snapdragons");
        let plan = plan(&store, &selection);

        assert!(!plan.flowers("focal").is_empty());
        assert!(!plan.flowers("filler").is_empty());
        for (role, flowers) in &plan.flowers {
            assert!(flowers.len() <= MAX_FLOWERS_PER_ROLE);
            assert!(flowers.iter().all(|f| f.entry.group == *role));
        }
        assert!(plan.foliage.len() >= 2, "{:?}", plan.foliage);
        assert!(plan.foliage.len() <= MAX_FOLIAGE);
        for aspect in STRUCTURE_ASPECTS {
            let item = plan.structure.get(aspect).unwrap();
            assert_eq!(item.entry.group, aspect);
        }

        let json = serde_json::to_value(&plan).unwrap();
        assert!(json["flowers"]["focal"][0]["id"].is_string());
        assert!(json["structure"]["balance"]["description"].is_string());
    }

    #[test]
    fn test_structure_follows_style_and_tradition() {
        let store = TaxonomyStore::bundled().unwrap();

        let cascade = selection(&store, "cascade waterfall bouquet");
        assert_eq!(cascade.entry(TaxonomyCategory::Style).unwrap().id, "cascade");
        let cascade_plan = plan(&store, &cascade);
        if cascade.entry(TaxonomyCategory::Technique).unwrap().group != "movement" {
            assert_eq!(cascade_plan.structure["movement"].id(), "cascade_fall");
        }

        // Ikebana rules out symmetrical radial balance and packed density.
        let ikebana = selection(&store, "rikka ikebana");
        let ikebana_plan = plan(&store, &ikebana);
        for item in ikebana_plan.structure.values() {
            for selected in ikebana.selections.values() {
                assert!(store.compatible_pairs(item.entry, selected.entry));
            }
        }
        assert_ne!(ikebana_plan.structure["balance"].id(), "symmetrical_radial");
    }

    #[test]
    fn test_article_and_name_casing() {
        assert_eq!(article("analogous"), "an");
        assert_eq!(article("triadic"), "a");
        assert_eq!(article("ivory"), "an");

        let store = TaxonomyStore::bundled().unwrap();
        let mut hints = Hints::new();
        hints.insert("palette".to_string(), "analogous".to_string());
        let matcher = LexicalMatcher::new(&store, MatcherConfig::default());
        let selection = StructuralResolver::new(&store).resolve(&matcher.match_text("", &hints));
        let text = enhanced_text(&selection, &plan(&store, &selection));
        assert!(text.contains("in an analogous palette"), "{text}");
        assert!(!text.contains(" a analogous"), "{text}");
    }

    #[test]
    fn test_join_names() {
        let store = TaxonomyStore::bundled().unwrap();
        let item = |id| PlanItem {
            entry: store.lookup(TaxonomyCategory::FlowerRole, id).unwrap(),
        };
        assert_eq!(join_names(&[item("roses")]), "roses");
        assert_eq!(join_names(&[item("roses"), item("peonies")]), "roses and peonies");
        assert_eq!(
            join_names(&[item("roses"), item("peonies"), item("bells_of_ireland")]),
            "roses, peonies and bells of ireland"
        );
    }

    #[test]
    fn test_workflow_slots_complete() {
        let store = TaxonomyStore::bundled().unwrap();
        let selection = selection(&store, "");
        let plan = plan(&store, &selection);
        let slots = workflow_slots(&selection, &plan, "");
        assert_eq!(slots.len(), WORKFLOW_SLOT_KEYS.len());
        for key in WORKFLOW_SLOT_KEYS {
            assert!(!slots[key].is_empty(), "{key}");
        }
        assert_eq!(slots["negative_prompt"], DEFAULT_NEGATIVE_PROMPT);
        assert_eq!(slots["positive_prompt"], enhanced_text(&selection, &plan));
        assert_eq!(slots["style_group"], "contemporary");
        assert_eq!(slots["focal_flower"], "Roses");
    }

    #[test]
    fn test_palette_colors_prefers_explicit_colors() {
        let store = TaxonomyStore::bundled().unwrap();
        let spring = store.lookup(TaxonomyCategory::Palette, "spring").unwrap();
        assert!(palette_colors(spring).starts_with("tulip yellow"));
        let analogous = store.lookup(TaxonomyCategory::Palette, "analogous").unwrap();
        assert!(palette_colors(analogous).contains("yellow-orange-red"));
    }
}
