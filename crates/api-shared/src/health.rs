use crate::types::HealthRes;
use handoff_core::ReferenceStore;
use std::time::Duration;

/// Health check shared by every API surface.
///
/// Reports healthy only when the reference store answers its own health check in time.
#[derive(Clone)]
pub struct HealthService;

impl HealthService {
    /// Probes `store`, giving up after `timeout`.
    ///
    /// Failure details are logged, not returned.
    pub async fn check_health(store: &dyn ReferenceStore, timeout: Duration) -> HealthRes {
        match tokio::time::timeout(timeout, store.health_check()).await {
            Ok(Ok(())) => HealthRes {
                ok: true,
                message: "handoff is alive".into(),
            },
            Ok(Err(e)) => {
                tracing::error!("store health check failed: {}", e);
                Self::unavailable()
            }
            Err(_) => {
                tracing::error!("store health check timed out after {:?}", timeout);
                Self::unavailable()
            }
        }
    }

    fn unavailable() -> HealthRes {
        HealthRes {
            ok: false,
            message: "storage unavailable".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handoff_core::MemoryStore;

    #[tokio::test]
    async fn healthy_store_reports_ok() {
        let store = MemoryStore::new();
        let res = HealthService::check_health(&store, Duration::from_secs(1)).await;
        assert!(res.ok);
    }
}
