//! The `panelscore analyze` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

pub async fn execute(
    interview_id: String,
    prompt_path: PathBuf,
    provider: Option<String>,
    config: Option<PathBuf>,
) -> Result<()> {
    let config = super::load_config(config)?;
    let prompt = std::fs::read_to_string(&prompt_path)
        .with_context(|| format!("failed to read prompt: {}", prompt_path.display()))?;

    let client = config.client(provider.as_deref())?;
    let request = config.completion_request(prompt);
    let service = super::build_service(&config)?;

    tracing::info!(provider = client.name(), %interview_id, "requesting analysis");
    let record = service
        .run_ai_analysis(client.as_ref(), &interview_id, &request)
        .await
        .with_context(|| format!("analysis with provider '{}' failed", client.name()))?;

    super::print_json(&record)
}
