//! The `panelscore dimensions` command.

use anyhow::Result;
use comfy_table::Table;
use serde::Serialize;

use panelscore_core::catalog::{Category, Dimension};

#[derive(Serialize)]
struct DimensionRow {
    key: &'static str,
    name: &'static str,
    category: Category,
    weight: u32,
    description: &'static str,
}

pub fn execute(json: bool) -> Result<()> {
    if json {
        let rows: Vec<DimensionRow> = Dimension::ALL
            .iter()
            .map(|d| DimensionRow {
                key: d.key(),
                name: d.display_name(),
                category: d.category(),
                weight: d.default_weight(),
                description: d.description(),
            })
            .collect();
        return super::print_json(&rows);
    }

    let mut table = Table::new();
    table.set_header(vec!["Key", "Dimension", "Category", "Weight"]);
    for category in Category::ALL {
        for dimension in category.dimensions() {
            table.add_row(vec![
                dimension.key().to_string(),
                dimension.display_name().to_string(),
                category.display_name().to_string(),
                dimension.default_weight().to_string(),
            ]);
        }
    }
    println!("{table}");

    for category in Category::ALL {
        println!(
            "{}: {} dimensions, total weight {}",
            category,
            category.dimensions().len(),
            category.total_weight()
        );
    }
    Ok(())
}
