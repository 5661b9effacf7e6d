//! Periodic retraining on the tokio runtime.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{error, info, warn};

use crate::service::RecommendationService;

/// Retrain every `period`, first run one period from now. Each run goes to
/// the blocking pool; a failed run is logged and the installed model is
/// kept. Abort the returned handle to stop.
pub fn spawn_retrain_loop(service: Arc<RecommendationService>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let svc = Arc::clone(&service);
            match tokio::task::spawn_blocking(move || svc.train_model()).await {
                Ok(Ok(model)) => info!(
                    instances = model.training_set_size,
                    accuracy = model.accuracy,
                    "scheduled retrain complete"
                ),
                Ok(Err(e)) => warn!(error = %e, "scheduled retrain failed, keeping previous model"),
                Err(e) => error!(error = %e, "retrain task did not complete"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexmatch_core::{
        CaseHistory, CaseRecord, LawyerDirectory, LawyerRecord, RecommenderConfig, SourceError,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Empty;

    impl CaseHistory for Empty {
        fn find_closed_cases_with_assigned_lawyer(
            &self,
        ) -> Result<Vec<(CaseRecord, LawyerRecord)>, SourceError> {
            Ok(Vec::new())
        }
    }

    impl LawyerDirectory for Empty {
        fn find_all_lawyers(&self) -> Result<Vec<LawyerRecord>, SourceError> {
            Ok(Vec::new())
        }
    }

    fn service(config: RecommenderConfig) -> Arc<RecommendationService> {
        Arc::new(RecommendationService::new(
            Arc::new(Empty),
            Arc::new(Empty),
            &config,
        ))
    }

    #[tokio::test]
    async fn loop_installs_a_model() {
        let svc = service(RecommenderConfig {
            synthetic_count: 50,
            ..Default::default()
        });
        let handle = spawn_retrain_loop(Arc::clone(&svc), Duration::from_millis(20));

        let deadline = Instant::now() + Duration::from_secs(10);
        while !svc.is_ready() && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();
        assert!(svc.is_ready());
    }

    /// Empty history that counts how often it was read.
    #[derive(Default)]
    struct CountingEmpty(AtomicUsize);

    impl CaseHistory for CountingEmpty {
        fn find_closed_cases_with_assigned_lawyer(
            &self,
        ) -> Result<Vec<(CaseRecord, LawyerRecord)>, SourceError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failing_runs_keep_loop_alive() {
        let history = Arc::new(CountingEmpty::default());
        let config = RecommenderConfig {
            synthetic_count: 0,
            ..Default::default()
        };
        let svc = Arc::new(RecommendationService::new(
            Arc::clone(&history) as Arc<dyn CaseHistory>,
            Arc::new(Empty),
            &config,
        ));
        let period = Duration::from_secs(60);
        let handle = spawn_retrain_loop(Arc::clone(&svc), period);

        for _ in 0..50 {
            if history.0.load(Ordering::SeqCst) >= 3 {
                break;
            }
            tokio::time::sleep(period).await;
        }
        assert!(history.0.load(Ordering::SeqCst) >= 3);
        assert!(!handle.is_finished());
        assert!(!svc.is_ready());
        handle.abort();
    }
}
