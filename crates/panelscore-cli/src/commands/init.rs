//! The `panelscore init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    write_if_missing("panelscore.toml", SAMPLE_CONFIG)?;
    write_if_missing("session.json", SAMPLE_SESSION)?;

    println!("\nNext steps:");
    println!("  1. Edit panelscore.toml with your API keys");
    println!("  2. Run: panelscore summarize --session session.json");
    println!("  3. Run: panelscore report --session session.json");

    Ok(())
}

fn write_if_missing(path: &str, content: &str) -> Result<()> {
    if Path::new(path).exists() {
        println!("{path} already exists, skipping.");
    } else {
        std::fs::write(path, content)?;
        println!("Created {path}");
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# panelscore configuration

default_provider = "deepseek-thinking"
timeout_secs = 60
temperature = 0.7
max_tokens = 2048
# suggestion_seed = 42

[providers.deepseek-thinking]
type = "deepseek-thinking"
api_key = "${DEEPSEEK_API_KEY}"

[providers.openai]
type = "openai"
api_key = "${OPENAI_API_KEY}"

[providers.anthropic]
type = "anthropic"
api_key = "${ANTHROPIC_API_KEY}"

[providers.local]
type = "local"
endpoint = "http://localhost:8000"

[blend]
human_weight = 0.6
ai_weight = 0.4

[consistency]
high = 5.0
moderate = 10.0
divergent = 15.0
"#;

const SAMPLE_SESSION: &str = r#"{
  "interview_id": "interview-001",
  "submissions": [
    {
      "rater_id": "alice",
      "scores": {
        "PROGRAMMING_SKILL": 85,
        "CODE_QUALITY": 80,
        "DEBUGGING": 78,
        "SYSTEM_DESIGN": 72,
        "LOGIC": 88,
        "RIGOR": 75,
        "BASIC_MATH": 70
      },
      "comment": "Strong fundamentals, clear reasoning."
    },
    {
      "rater_id": "bob",
      "scores": {
        "PROGRAMMING_SKILL": 80,
        "CODE_QUALITY": 76,
        "DEBUGGING": 82,
        "SYSTEM_DESIGN": 65,
        "LOGIC": 84,
        "RIGOR": 70,
        "BASIC_MATH": 68
      }
    }
  ],
  "overrides": []
}
"#;
