//! Session lifecycle CLI commands

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

use crate::client::{ApiClient, ArtifactSource, CreateSessionRequest, SessionView};
use crate::output::{color_status, format_timestamp, print_json, print_success, OutputFormat};

fn artifact_source(scaler: &Path, model: &Path) -> Result<ArtifactSource> {
    // The server resolves paths against its own working directory
    let absolute = |p: &Path| -> Result<String> {
        if p.is_absolute() {
            return Ok(p.display().to_string());
        }
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        Ok(cwd.join(p).display().to_string())
    };
    Ok(ArtifactSource {
        scaler_path: absolute(scaler)?,
        model_path: absolute(model)?,
    })
}

/// Open a new session, optionally loading an artifact into it
pub async fn create_session(
    client: &ApiClient,
    artifact: Option<(&Path, &Path)>,
    format: OutputFormat,
) -> Result<()> {
    let request = CreateSessionRequest {
        artifact: artifact
            .map(|(scaler, model)| artifact_source(scaler, model))
            .transpose()?,
    };
    let view: SessionView = client.post("api/v1/sessions", &request).await?;

    if matches!(format, OutputFormat::Table) {
        print_success(&format!("Created session {}", view.id));
    }
    print_session(&view, format)
}

pub async fn show_session(client: &ApiClient, id: &str, format: OutputFormat) -> Result<()> {
    let view: SessionView = client.get(&format!("api/v1/sessions/{}", id)).await?;
    print_session(&view, format)
}

pub async fn delete_session(client: &ApiClient, id: &str) -> Result<()> {
    client.delete(&format!("api/v1/sessions/{}", id)).await?;
    print_success(&format!("Deleted session {}", id));
    Ok(())
}

/// Replace the artifact of an existing session
pub async fn load_artifact(
    client: &ApiClient,
    id: &str,
    scaler: &Path,
    model: &Path,
    format: OutputFormat,
) -> Result<()> {
    let source = artifact_source(scaler, model)?;
    let view: SessionView = client
        .put(&format!("api/v1/sessions/{}/artifact", id), &source)
        .await?;

    if matches!(format, OutputFormat::Table) {
        print_success("Artifact loaded");
    }
    print_session(&view, format)
}

/// Clear the displayed prediction, keeping the artifact
pub async fn reset_session(client: &ApiClient, id: &str, format: OutputFormat) -> Result<()> {
    let view: SessionView = client
        .post(&format!("api/v1/sessions/{}/reset", id), &serde_json::json!({}))
        .await?;

    if matches!(format, OutputFormat::Table) {
        print_success("Session reset");
    }
    print_session(&view, format)
}

/// Render a session view
pub fn print_session(view: &SessionView, format: OutputFormat) -> Result<()> {
    if let OutputFormat::Json = format {
        return print_json(view);
    }

    println!("{}", "Session".bold());
    println!("{}", "=".repeat(50));
    println!("ID:           {}", view.id.cyan());
    println!("State:        {}", color_status(&view.state));
    println!("Created:      {}", format_timestamp(view.created_at));
    println!("Last Active:  {}", format_timestamp(view.last_active));
    println!();

    println!("{}", "Artifact".bold());
    println!("{}", "-".repeat(50));
    match &view.artifact {
        Some(artifact) => {
            println!("Version:      {}", artifact.version);
            println!("Scaler:       {}", artifact.scaler_kind);
            println!("Model:        {}", artifact.model_kind);
            match &artifact.feature_names {
                Some(names) => println!("Features:     {}", names.len()),
                None => println!("Features:     {}", "undeclared (field order)".yellow()),
            }
        }
        None => println!("{}", "No artifact loaded".yellow()),
    }

    if let Some(prediction) = &view.prediction {
        println!();
        println!("{}", "Prediction".bold());
        println!("{}", "-".repeat(50));
        println!("Estimated Price: {}", prediction.formatted.green().bold());
        println!("Mode:            {}", prediction.mode);
        println!("Generated:       {}", format_timestamp(prediction.generated_at));
    }

    Ok(())
}
