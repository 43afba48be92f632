use anyhow::Result;
use learning_engine::{
    DocumentStore, LearnerConfig, LearningService, Scheduler, YouTubeSearch, YouTubeTranscripts,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, Level};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("🚀 Starting CRT continuous-learning engine");

    let config = LearnerConfig::from_env();
    let store = DocumentStore::new(config.data_dir.clone());
    let search = Arc::new(YouTubeSearch::new(config.api_key.clone()));
    let transcripts = Arc::new(YouTubeTranscripts::new());

    let service = Arc::new(LearningService::new(config, store, search, transcripts));
    let scheduler = Scheduler::new(service);

    // Ctrl-C flips the shutdown flag; the scheduler honors it between
    // ticks, never mid-cycle.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("👋 Shutdown requested, finishing current cycle...");
            let _ = shutdown_tx.send(true);
        }
    });

    let counters = scheduler.run(shutdown_rx).await?;
    info!(
        "Final stats: score {} | wins {} | losses {} | sessions {}",
        counters.total_score, counters.wins, counters.losses, counters.sessions
    );

    Ok(())
}
