//! Spark CLI
//!
//! Main entry point for the `spark` command-line tool: ask the youth-safe
//! brain buddy a question, check how a question would be classified, or run
//! the HTTP service.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ClassifyCommand, ServeCommand};
use spark_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Spark - a friendly brain buddy answering questions about neurodiversity
#[derive(Parser, Debug)]
#[command(name = "spark")]
#[command(about = "Youth-safe answers about neurodiversity", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "SPARK_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "SPARK_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// LLM provider (ollama, openai)
    #[arg(short, long, global = true, env = "SPARK_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "SPARK_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a question
    Ask(AskCommand),

    /// Show how a question would be classified, without answering it
    Classify(ClassifyCommand),

    /// Serve the HTTP API
    Serve(ServeCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_with(cli.workspace, cli.config)?;

    let config = config.with_overrides(
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("Spark starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.engine.provider);
    tracing::debug!("Model: {}", config.engine.model);

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Classify(_) => "classify",
        Commands::Serve(_) => "serve",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Classify(cmd) => cmd.execute(&config),
        Commands::Serve(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
