use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chartwise::{
    analysis::Recommender, config::Config, dataset::load_path, routes::upload::recommend_dataset,
    utils::init_tracing, AppState,
};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Chart recommendations for CSV and Excel data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP API (default)
    Serve,

    /// Print chart suggestions for a local CSV or Excel file
    Recommend {
        /// Path to the data file
        path: PathBuf,

        /// Skip the AI suggestions and use the rule-based charts only
        #[arg(long)]
        no_ai: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Recommend { path, no_ai } => recommend(config, path, no_ai).await,
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    info!(
        host = %config.server.host,
        port = config.server.port,
        provider = %config.llm.provider,
        model = %config.llm.model,
        "Configuration loaded"
    );

    let state = AppState {
        recommender: Arc::new(Recommender::from_config(&config.llm)),
        config: config.clone(),
    };
    let app = chartwise::create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}

async fn recommend(config: Config, path: PathBuf, no_ai: bool) -> anyhow::Result<()> {
    let recommender = if no_ai {
        Recommender::fallback_only()
    } else {
        Recommender::from_config(&config.llm)
    };

    let dataset = load_path(&path).with_context(|| format!("Failed to load {}", path.display()))?;
    let response = recommend_dataset(&recommender, &dataset).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}
