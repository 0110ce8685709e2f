//! panelscore CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "panelscore",
    version,
    about = "Multi-rater interview evaluation engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the scoring dimensions and their weights
    Dimensions {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Extract scores from a raw completion response
    Extract {
        /// File holding the raw response body
        #[arg(long)]
        input: PathBuf,
    },

    /// Aggregate the human scores in a session file
    Summarize {
        /// Session JSON file
        #[arg(long)]
        session: PathBuf,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Blend human and AI scores into a composite report
    Report {
        /// Session JSON file
        #[arg(long)]
        session: PathBuf,

        /// Raw AI completion response to include as the AI rater
        #[arg(long)]
        ai_response: Option<PathBuf>,

        /// Human share of the blend
        #[arg(long)]
        human_weight: Option<f64>,

        /// AI share of the blend
        #[arg(long)]
        ai_weight: Option<f64>,

        /// Seed for suggestion picks
        #[arg(long)]
        seed: Option<u64>,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Ask a configured provider to score an interview
    Analyze {
        /// Interview identifier
        #[arg(long)]
        interview_id: String,

        /// File holding the evaluation prompt
        #[arg(long)]
        prompt: PathBuf,

        /// Provider name from the config (defaults to default_provider)
        #[arg(long)]
        provider: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create a starter config and sample session
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("panelscore=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Dimensions { json } => commands::dimensions::execute(json),
        Commands::Extract { input } => commands::extract::execute(input),
        Commands::Summarize {
            session,
            format,
            config,
        } => commands::summarize::execute(session, format, config).await,
        Commands::Report {
            session,
            ai_response,
            human_weight,
            ai_weight,
            seed,
            format,
            config,
        } => {
            commands::report::execute(commands::report::ReportArgs {
                session,
                ai_response,
                human_weight,
                ai_weight,
                seed,
                format,
                config,
            })
            .await
        }
        Commands::Analyze {
            interview_id,
            prompt,
            provider,
            config,
        } => commands::analyze::execute(interview_id, prompt, provider, config).await,
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
