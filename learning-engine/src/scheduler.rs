//! Scheduled learning loop
//!
//! Two-phase state machine: Idle (waiting for the next tick) and Running
//! (cycle in progress). The first cycle runs immediately on start, then one
//! cycle per interval. Waiting is a coarse poll of due-ness rather than a
//! precise timer, so drift up to the poll granularity is expected. Cycles
//! are strictly serialized and never overlap; any failure inside a cycle is
//! caught at the cycle boundary and the next tick proceeds. Shutdown is
//! honored only between ticks, never mid-cycle.

use crate::service::LearningService;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::time::Instant;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPhase {
    Idle,
    Running,
}

/// Final counters reported when the scheduler stops
#[derive(Debug, Clone)]
pub struct FinalCounters {
    pub total_score: i64,
    pub wins: u64,
    pub losses: u64,
    pub sessions: u64,
}

pub struct Scheduler {
    service: Arc<LearningService>,
    interval: Duration,
    poll: Duration,
    phase: RwLock<SchedulerPhase>,
}

impl Scheduler {
    pub fn new(service: Arc<LearningService>) -> Self {
        let config = service.config();
        Self {
            interval: Duration::from_secs(config.cycle_interval_secs),
            poll: Duration::from_secs(config.poll_interval_secs),
            service,
            phase: RwLock::new(SchedulerPhase::Idle),
        }
    }

    pub async fn phase(&self) -> SchedulerPhase {
        *self.phase.read().await
    }

    /// Run cycles until the shutdown flag flips. Returns the final reward
    /// counters once stopped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<FinalCounters> {
        info!(
            interval_secs = self.interval.as_secs(),
            poll_secs = self.poll.as_secs(),
            "scheduler started, first cycle runs immediately"
        );

        loop {
            self.run_cycle().await;

            if *shutdown.borrow() {
                break;
            }

            // Coarse poll until the next tick is due or shutdown arrives.
            let next_due = Instant::now() + self.interval;
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(self.poll) => {
                        if Instant::now() >= next_due {
                            break;
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            return self.final_counters().await;
                        }
                    }
                }
            }
        }

        self.final_counters().await
    }

    /// One cycle, failure-isolated: an error is logged and does not
    /// terminate the scheduler.
    async fn run_cycle(&self) {
        *self.phase.write().await = SchedulerPhase::Running;
        match self.service.update_learning().await {
            Ok(summary) => info!(
                new_sources = summary.new_sources,
                total_sources = summary.total_sources,
                performance_validated = summary.performance_validated,
                "cycle complete"
            ),
            Err(e) => error!("learning cycle failed: {e:#}"),
        }
        *self.phase.write().await = SchedulerPhase::Idle;
    }

    async fn final_counters(&self) -> Result<FinalCounters> {
        let rewards = self.service.reward_state().await?;
        let counters = FinalCounters {
            total_score: rewards.total_score,
            wins: rewards.wins,
            losses: rewards.losses,
            sessions: rewards.sessions,
        };
        info!(
            score = counters.total_score,
            wins = counters.wins,
            losses = counters.losses,
            sessions = counters.sessions,
            "scheduler stopped"
        );
        Ok(counters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChannelSpec, LearnerConfig};
    use crate::connectors::{SourceSearch, TranscriptProvider};
    use crate::storage::DocumentStore;
    use async_trait::async_trait;
    use common::VideoSource;

    struct EmptySearch;

    #[async_trait]
    impl SourceSearch for EmptySearch {
        async fn search_channel(
            &self,
            _channel: &ChannelSpec,
            _max_results: usize,
        ) -> Result<Vec<VideoSource>> {
            Ok(Vec::new())
        }

        async fn search_query(
            &self,
            _query: &str,
            _priority: f64,
            _max_results: usize,
        ) -> Result<Vec<VideoSource>> {
            Ok(Vec::new())
        }
    }

    struct FailingSearch;

    #[async_trait]
    impl SourceSearch for FailingSearch {
        async fn search_channel(
            &self,
            _channel: &ChannelSpec,
            _max_results: usize,
        ) -> Result<Vec<VideoSource>> {
            Err(anyhow::anyhow!("quota exceeded"))
        }

        async fn search_query(
            &self,
            _query: &str,
            _priority: f64,
            _max_results: usize,
        ) -> Result<Vec<VideoSource>> {
            Err(anyhow::anyhow!("quota exceeded"))
        }
    }

    struct NoTranscripts;

    #[async_trait]
    impl TranscriptProvider for NoTranscripts {
        async fn fetch(&self, _video_id: &str) -> Result<Option<String>> {
            Ok(None)
        }
    }

    fn scheduler_with(dir: &std::path::Path, search: Arc<dyn SourceSearch>) -> Scheduler {
        let mut config = LearnerConfig::default();
        config.data_dir = dir.to_path_buf();
        config.fetch_delay_ms = 0;
        config.cycle_interval_secs = 3600;
        config.poll_interval_secs = 1;
        let service = Arc::new(LearningService::new(
            config,
            DocumentStore::new(dir),
            search,
            Arc::new(NoTranscripts),
        ));
        Scheduler::new(service)
    }

    #[tokio::test]
    async fn test_first_cycle_runs_immediately_then_idles() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = scheduler_with(dir.path(), Arc::new(EmptySearch));

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move { scheduler.run(rx).await });

        // Give the first cycle time to finish, then request shutdown.
        tokio::time::sleep(Duration::from_millis(200)).await;
        tx.send(true).unwrap();

        let counters = handle.await.unwrap().unwrap();
        assert_eq!(counters.sessions, 1);
        assert_eq!(counters.total_score, 0);
    }

    #[tokio::test]
    async fn test_cycle_failure_does_not_kill_the_scheduler() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = scheduler_with(dir.path(), Arc::new(FailingSearch));

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move { scheduler.run(rx).await });

        tokio::time::sleep(Duration::from_millis(200)).await;
        tx.send(true).unwrap();

        // Search failures are contained inside the cycle; the scheduler
        // still ran a session and reports counters on shutdown.
        let counters = handle.await.unwrap().unwrap();
        assert_eq!(counters.sessions, 1);
    }

    #[tokio::test]
    async fn test_phase_starts_idle() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = scheduler_with(dir.path(), Arc::new(EmptySearch));
        assert_eq!(scheduler.phase().await, SchedulerPhase::Idle);
    }
}
