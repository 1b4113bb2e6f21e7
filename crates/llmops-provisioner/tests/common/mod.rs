//! Common test utilities for provisioner integration tests.

pub mod fixtures;

use std::sync::Arc;
use std::time::Duration;

use llmops_provisioner::{MemoryRegistry, Provisioner, ReadinessPolicy};

/// Poll interval used by the test policy.
pub const POLL: Duration = Duration::from_secs(30);

/// Readiness timeout used by the test policy.
pub const TIMEOUT: Duration = Duration::from_secs(300);

/// How long the test policy waits for a replaced endpoint to disappear.
pub const DELETION_TIMEOUT: Duration = Duration::from_secs(120);

/// A provisioner wired to an in-memory registry the test can inspect.
pub struct TestProvisioner {
    pub registry: Arc<MemoryRegistry>,
    pub provisioner: Provisioner,
}

impl TestProvisioner {
    /// Registry whose endpoints report `Creating` once, then `InService`.
    pub fn new() -> Self {
        Self::with_registry(MemoryRegistry::new())
    }

    /// Wire a pre-configured registry.
    pub fn with_registry(registry: MemoryRegistry) -> Self {
        let registry = Arc::new(registry);
        let provisioner = Provisioner::new(
            registry.clone(),
            ReadinessPolicy {
                poll_interval: POLL,
                timeout: TIMEOUT,
                deletion_timeout: DELETION_TIMEOUT,
            },
        );
        Self {
            registry,
            provisioner,
        }
    }
}
