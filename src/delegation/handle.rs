//! Handle to a fire-and-forget delegation.

use tokio::task::JoinHandle;

use super::result::DelegationResult;

/// A pending fire-and-forget delegation.
///
/// Created at dispatch; resolves or cancels exactly once. Cancelling an
/// already-completed handle is a no-op.
#[derive(Debug)]
pub struct DelegationHandle {
    blueprint_name: String,
    join: JoinHandle<DelegationResult>,
}

impl DelegationHandle {
    pub(crate) fn new(blueprint_name: String, join: JoinHandle<DelegationResult>) -> Self {
        Self {
            blueprint_name,
            join,
        }
    }

    /// The blueprint this delegation targets.
    pub fn blueprint_name(&self) -> &str {
        &self.blueprint_name
    }

    /// Whether the background run has finished (or been cancelled).
    pub fn is_complete(&self) -> bool {
        self.join.is_finished()
    }

    /// Cancel the background run. No-op once the run has completed.
    pub fn cancel(&self) {
        self.join.abort();
    }

    /// Wait for the delegation to resolve.
    ///
    /// Cancellation surfaces as a failed result, never as a panic or an
    /// error the caller must unwrap.
    pub async fn await_result(self) -> DelegationResult {
        match self.join.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => {
                DelegationResult::failed(self.blueprint_name, "delegation cancelled", 0.0)
            }
            Err(e) => DelegationResult::failed(
                self.blueprint_name,
                format!("delegation task failed: {e}"),
                0.0,
            ),
        }
    }
}
