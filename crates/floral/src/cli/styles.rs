//! `floral styles` - print the arrangement styles table.

use super::load_store;
use crate::config::FloralConfig;
use anyhow::Result;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};
use floral_taxonomy::{TaxonomyCategory, TaxonomyStore};

pub fn run(config: &FloralConfig) -> Result<()> {
    let store = load_store(config)?;
    println!("{}", styles_table(&store));
    Ok(())
}

fn styles_table(store: &TaxonomyStore) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        ["Group", "ID", "Name", "Description"]
            .iter()
            .map(|h| Cell::new(h).fg(Color::Cyan))
            .collect::<Vec<_>>(),
    );

    for style in store.all_entries(TaxonomyCategory::Style) {
        table.add_row(vec![
            style.group.clone(),
            style.id.clone(),
            style.name.clone(),
            style.description.clone(),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_row_per_style() {
        let store = TaxonomyStore::bundled().unwrap();
        let table = styles_table(&store);
        assert_eq!(table.row_iter().count(), 14);

        let rendered = table.to_string();
        assert!(rendered.contains("moribana"));
        assert!(rendered.contains("garden_style"));
    }
}
