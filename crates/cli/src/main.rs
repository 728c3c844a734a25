//! Housing Price Predictor CLI
//!
//! A command-line client for opening pricing sessions, loading artifacts,
//! submitting properties and resetting predictions.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{predict, session, status};
use std::path::PathBuf;

/// Housing Price Predictor CLI
#[derive(Parser)]
#[command(name = "hpp")]
#[command(author, version, about = "CLI for Housing Price Predictor", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via HPP_API_URL env var)
    #[arg(long, env = "HPP_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage pricing sessions
    #[command(subcommand)]
    Session(SessionCommands),

    /// Manage the artifact of a session
    #[command(subcommand)]
    Artifact(ArtifactCommands),

    /// Submit a property and show the estimated price
    Predict {
        /// Session ID
        id: String,

        #[command(flatten)]
        property: predict::PropertyArgs,
    },

    /// Clear the displayed prediction (the artifact is kept)
    Reset {
        /// Session ID
        id: String,
    },

    /// Show service health
    Health,

    /// List input fields with their ranges and defaults
    Fields,
}

#[derive(Subcommand)]
pub enum SessionCommands {
    /// Open a new session
    Create {
        /// Scaler file to load into the session
        #[arg(long, requires = "model")]
        scaler: Option<PathBuf>,

        /// Model file to load into the session (.onnx or .json)
        #[arg(long, requires = "scaler")]
        model: Option<PathBuf>,
    },

    /// Show a session's state, artifact and prediction
    Show {
        /// Session ID
        id: String,
    },

    /// Close a session
    Delete {
        /// Session ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum ArtifactCommands {
    /// Load a scaler/model pair into a session
    Load {
        /// Session ID
        id: String,

        /// Scaler file
        #[arg(long)]
        scaler: PathBuf,

        /// Model file (.onnx or .json)
        #[arg(long)]
        model: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let api_url = config::Config::load()?.resolve_api_url(cli.api_url);
    if cli.verbose {
        output::print_info(&format!("Using API at {}", api_url));
    }

    // Initialize client
    let client = client::ApiClient::new(&api_url)?;

    // Execute command
    match cli.command {
        Commands::Session(session_cmd) => match session_cmd {
            SessionCommands::Create { scaler, model } => {
                let artifact = scaler.as_deref().zip(model.as_deref());
                session::create_session(&client, artifact, cli.format).await?;
            }
            SessionCommands::Show { id } => {
                session::show_session(&client, &id, cli.format).await?;
            }
            SessionCommands::Delete { id } => {
                session::delete_session(&client, &id).await?;
            }
        },
        Commands::Artifact(artifact_cmd) => match artifact_cmd {
            ArtifactCommands::Load { id, scaler, model } => {
                session::load_artifact(&client, &id, &scaler, &model, cli.format).await?;
            }
        },
        Commands::Predict { id, property } => {
            predict::predict(&client, &id, &property, cli.format).await?;
        }
        Commands::Reset { id } => {
            session::reset_session(&client, &id, cli.format).await?;
        }
        Commands::Health => {
            status::show_health(&client, cli.format).await?;
        }
        Commands::Fields => {
            status::show_fields(&client, cli.format).await?;
        }
    }

    Ok(())
}
