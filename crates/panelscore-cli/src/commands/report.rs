//! The `panelscore report` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::Table;

use panelscore_core::extract;
use panelscore_core::report::{BlendWeights, CompositeReport};

use super::Session;

/// Rater id recorded for an AI response read from a file.
const FILE_AI_RATER: &str = "ai-response";

pub struct ReportArgs {
    pub session: PathBuf,
    pub ai_response: Option<PathBuf>,
    pub human_weight: Option<f64>,
    pub ai_weight: Option<f64>,
    pub seed: Option<u64>,
    pub format: String,
    pub config: Option<PathBuf>,
}

pub async fn execute(args: ReportArgs) -> Result<()> {
    let mut config = super::load_config(args.config)?;
    if args.seed.is_some() {
        config.suggestion_seed = args.seed;
    }
    let weights = match (args.human_weight, args.ai_weight) {
        (None, None) => None,
        (human, ai) => Some(
            BlendWeights::new(
                human.unwrap_or(config.blend.human_weight),
                ai.unwrap_or(config.blend.ai_weight),
            )
            .context("invalid blend weights")?,
        ),
    };

    let session = Session::load(&args.session)?;
    let service = super::build_service(&config)?;
    session.replay(&service).await?;

    if let Some(path) = &args.ai_response {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read AI response: {}", path.display()))?;
        let extraction = extract::extract(&raw);
        match service
            .submit_ai_extraction(&session.interview_id, FILE_AI_RATER, &extraction)
            .await
        {
            Ok(_) => {}
            // Carry on with the human panel alone.
            Err(e) if e.is_recoverable() => {
                tracing::warn!(error = %e, "AI response unusable, reporting without it");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let report = service
        .generate_report(&session.interview_id, weights)
        .await?;

    match args.format.as_str() {
        "json" => super::print_json(&report),
        _ => {
            print_report(&report);
            Ok(())
        }
    }
}

fn print_report(report: &CompositeReport) {
    println!("Interview {} ({})", report.interview_id, report.basis);
    println!(
        "Total: {:.1} | Grade: {} | Weights: human {:.2} / ai {:.2}",
        report.total_score, report.grade, report.weights.human_weight, report.weights.ai_weight
    );

    let mut table = Table::new();
    table.set_header(vec!["Category", "Score"]);
    for (category, score) in &report.category_scores {
        table.add_row(vec![category.to_string(), format!("{score:.1}")]);
    }
    println!("{table}");

    print_list(
        "Strengths",
        report.strengths.iter().map(|d| d.display_name().to_string()),
    );
    print_list(
        "Weaknesses",
        report.weaknesses.iter().map(|d| d.display_name().to_string()),
    );
    print_list("Suggestions", report.suggestions.iter().cloned());
    print_list("Suitable positions", report.suitable_positions.iter().cloned());

    println!("\n{}", report.narrative);
}

fn print_list(title: &str, items: impl Iterator<Item = String>) {
    let items: Vec<String> = items.collect();
    if items.is_empty() {
        return;
    }
    println!("\n{title}:");
    for item in items {
        println!("  - {item}");
    }
}
