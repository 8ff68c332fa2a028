//! Summarize command implementation.

use crate::cli::preflight;
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the summarize command.
pub async fn run_summarize(url: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(&settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Transcribing and summarizing...");
    let result = orchestrator.summarize(url).await;
    spinner.finish_and_clear();

    match result {
        Ok(summary) => {
            Output::header("Summary");
            println!("\n{}\n", summary.text);
            Output::kv("Strategy", &summary.strategy.to_string());
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Failed to summarize: {}", e));
            Err(e.into())
        }
    }
}
