//! The `panelscore summarize` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::Table;

use panelscore_core::summary::Summary;

use super::Session;

pub async fn execute(session_path: PathBuf, format: String, config: Option<PathBuf>) -> Result<()> {
    let config = super::load_config(config)?;
    let session = Session::load(&session_path)?;
    let service = super::build_service(&config)?;

    session.replay(&service).await?;
    let summary = service.summary(&session.interview_id).await?;

    match format.as_str() {
        "json" => super::print_json(&summary),
        _ => {
            print_summary(&summary);
            Ok(())
        }
    }
}

fn print_summary(summary: &Summary) {
    println!(
        "Interview {} ({}, revision {})",
        summary.interview_id,
        summary.state(),
        summary.revision
    );
    println!(
        "Raters: {} | Total: {:.1} | Grade: {}",
        summary.rater_count, summary.normalized_total, summary.grade
    );

    let mut table = Table::new();
    table.set_header(vec![
        "Dimension",
        "Mean",
        "Std Dev",
        "Raters",
        "Consistency",
        "Final",
        "AI",
    ]);
    for (dimension, stat) in &summary.dimensions {
        table.add_row(vec![
            dimension.display_name().to_string(),
            format!("{:.1}", stat.mean),
            format!("{:.1}", stat.stddev),
            stat.count.to_string(),
            summary
                .consistency(*dimension)
                .map(|c| c.to_string())
                .unwrap_or_default(),
            summary
                .final_scores
                .get(dimension)
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".into()),
            summary
                .ai_reference
                .get(dimension)
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".into()),
        ]);
    }
    println!("{table}");

    let breakdown: Vec<String> = summary
        .consistency_breakdown()
        .iter()
        .map(|(level, count)| format!("{level}: {count}"))
        .collect();
    println!("Consistency: {}", breakdown.join(", "));

    if !summary.notes.is_empty() {
        println!("\nNotes:");
        for note in &summary.notes {
            println!("  {note}");
        }
    }
}
