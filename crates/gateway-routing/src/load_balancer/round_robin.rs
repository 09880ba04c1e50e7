//! Round robin driven by a shared counter.

use crate::error::{cancellable, RoutingError, RoutingResult};
use gateway_coordination::CoordinationStore;
use tokio_util::sync::CancellationToken;

/// Next rotation slot in `[0, size)` for the counter under `key`
///
/// Every call advances the shared counter, so concurrent callers (in this
/// process or others sharing the store) spread evenly over the slots.
///
/// # Errors
/// - [`RoutingError::EmptyRotation`] when `size` is zero; the counter is
///   left untouched
/// - store failures, propagated unchanged
/// - [`RoutingError::Cancelled`] when `cancel` fires first
pub async fn round_robin_index(
    store: &dyn CoordinationStore,
    key: &str,
    size: usize,
    cancel: &CancellationToken,
) -> RoutingResult<usize> {
    if size == 0 {
        return Err(RoutingError::EmptyRotation {
            key: key.to_string(),
        });
    }

    let counter = cancellable(cancel, store.next_counter(key)).await?;
    Ok((counter % size as u64) as usize)
}
