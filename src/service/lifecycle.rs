// Service lifecycle - at most one live transform service per plugin

use super::{ServiceLauncher, TransformService};
use crate::error::ServiceError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Owns the plugin's transform service handle
///
/// The handle is either absent or running. `start` and `stop` are
/// idempotent, and both hold the slot lock for their whole duration, so
/// concurrent callers never launch a second service or stop one twice.
pub struct ServiceManager {
    launcher: Arc<dyn ServiceLauncher>,
    slot: Mutex<Option<Arc<dyn TransformService>>>,
    launches: AtomicUsize,
}

impl ServiceManager {
    pub fn new(launcher: Arc<dyn ServiceLauncher>) -> Self {
        Self {
            launcher,
            slot: Mutex::new(None),
            launches: AtomicUsize::new(0),
        }
    }

    /// Start the service unless it is already running
    pub async fn start(&self) -> Result<Arc<dyn TransformService>, ServiceError> {
        let mut slot = self.slot.lock().await;
        if let Some(service) = slot.as_ref() {
            return Ok(service.clone());
        }

        let service = self.launcher.launch().await?;
        self.launches.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(launches = self.launches(), "esbuild service started");
        *slot = Some(service.clone());
        Ok(service)
    }

    /// Stop and release the service; a no-op when not running
    pub async fn stop(&self) {
        let mut slot = self.slot.lock().await;
        if let Some(service) = slot.take() {
            service.stop().await;
            tracing::debug!("esbuild service stopped");
        }
    }

    /// The running service, if any
    pub async fn current(&self) -> Option<Arc<dyn TransformService>> {
        self.slot.lock().await.clone()
    }

    pub async fn is_running(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    /// How many services this manager has launched over its lifetime
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::Relaxed)
    }
}
