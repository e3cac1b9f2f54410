use tracing::info;

/// Consumes the result of a committed upsert batch to drive a transient UI
/// signal. Implementations run only after the transaction resolves and must
/// stay advisory: their failure never affects store state.
pub trait BadgeHook: Send + Sync {
    fn batch_committed(&self, new_listings: u64);
}

/// Default hook for headless deployments: logs instead of driving a badge.
pub struct LogBadgeHook;

impl BadgeHook for LogBadgeHook {
    fn batch_committed(&self, new_listings: u64) {
        if new_listings > 0 {
            info!(new_listings, "new listings collected");
        }
    }
}
