//! Web server command.

use crate::cli::preflight;
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::web::{router, AppState};
use std::sync::Arc;
use tracing::info;

/// Run the web form server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(&settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let backend = settings.vector_store.backend.clone();

    let orchestrator = Orchestrator::new(settings)?;
    let app = router(Arc::new(AppState::new(orchestrator)));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    Output::header("vidqa");
    println!();
    Output::success(&format!("Open http://{} in your browser", addr));
    println!();
    Output::kv("Form", "GET  /  POST /");
    Output::kv("JSON", "POST /api/ask");
    Output::kv("Health", "GET  /health");
    Output::kv("Vector store", &backend);
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}
