//! The `panelscore extract` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use panelscore_core::extract;

pub fn execute(input: PathBuf) -> Result<()> {
    let raw = std::fs::read_to_string(&input)
        .with_context(|| format!("failed to read response: {}", input.display()))?;

    let result = extract::extract(&raw);
    if let Some(failure) = &result.failure {
        tracing::warn!(%failure, "no scoring payload extracted");
    }
    super::print_json(&result)
}
