//! Semaphore utilities for bounding concurrent module work

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use wsb_errors::{Error, InstallError};

/// Acquire a semaphore permit, mapping a closed semaphore to an error
///
/// `operation` names the work waiting for the permit in the error message.
///
/// # Errors
///
/// Returns `InstallError::ConcurrencyError` if the semaphore is closed.
pub async fn acquire_semaphore_permit(
    semaphore: Arc<Semaphore>,
    operation: &str,
) -> Result<OwnedSemaphorePermit, Error> {
    semaphore.acquire_owned().await.map_err(|_| {
        InstallError::ConcurrencyError {
            message: format!("failed to acquire semaphore for {operation}"),
        }
        .into()
    })
}

/// Create a shared semaphore; at least one permit is always available
#[must_use]
pub fn create_semaphore(permits: usize) -> Arc<Semaphore> {
    Arc::new(Semaphore::new(permits.max(1)))
}
