//! Concurrent fan-out with per-target timeouts.
//!
//! One call per target is dispatched at once and joined. A slow or failed
//! target never delays the outcome of another beyond its own timeout.

use std::future::Future;
use std::time::Duration;

use futures::future::join_all;
use stockgrid_core::{Endpoint, TargetOutcome};
use tracing::{debug, warn};

use crate::error::ClientError;

/// Call `call(target)` for every target concurrently and collect one
/// outcome per target, in target order.
pub async fn fan_out<'a, F, Fut, T>(
    targets: &'a [Endpoint],
    timeout: Duration,
    call: F,
) -> Vec<TargetOutcome>
where
    F: Fn(&'a Endpoint) -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let calls = targets.iter().map(|target| {
        let fut = call(target);
        async move {
            match tokio::time::timeout(timeout, fut).await {
                Ok(Ok(_)) => {
                    debug!(%target, "fan-out call succeeded");
                    TargetOutcome::success(target.as_str())
                }
                Ok(Err(e)) => {
                    warn!(%target, error = %e, "fan-out call failed");
                    TargetOutcome::failure(target.as_str(), e.to_string())
                }
                Err(_) => {
                    warn!(%target, ?timeout, "fan-out call timed out");
                    TargetOutcome::failure(target.as_str(), format!("timed out after {timeout:?}"))
                }
            }
        }
    });
    join_all(calls).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn targets() -> Vec<Endpoint> {
        ["http://c1:4000", "http://c2:4000", "http://c3:4000"]
            .into_iter()
            .map(Endpoint::new)
            .collect()
    }

    #[tokio::test]
    async fn collects_one_outcome_per_target() {
        let targets = targets();
        let outcomes = fan_out(&targets, Duration::from_secs(1), |target| async move {
            if target.as_str().ends_with("c2:4000") {
                Err(ClientError::Unreachable {
                    target: target.to_string(),
                    reason: "connection refused".into(),
                })
            } else {
                Ok(())
            }
        })
        .await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].ok);
        assert!(!outcomes[1].ok);
        assert!(outcomes[1].error.as_deref().unwrap().contains("refused"));
        assert!(outcomes[2].ok);
    }

    #[tokio::test]
    async fn slow_target_times_out_without_blocking_others() {
        let targets = targets();
        let started = Instant::now();
        let outcomes = fan_out(&targets, Duration::from_millis(100), |target| async move {
            if target.as_str().ends_with("c1:4000") {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            Ok::<_, ClientError>(())
        })
        .await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!outcomes[0].ok);
        assert!(outcomes[0].error.as_deref().unwrap().contains("timed out"));
        assert!(outcomes[1].ok && outcomes[2].ok);
    }

    #[tokio::test]
    async fn empty_target_list() {
        let outcomes = fan_out(&[], Duration::from_secs(1), |_| async { Ok::<_, ClientError>(()) }).await;
        assert!(outcomes.is_empty());
    }
}
