//! Monthly edit quota.

use tracing::warn;

use crate::error::BulkEditError;
use crate::ports::UsageCounter;

/// Edits allowed per shop per calendar month. `None` is unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuotaPolicy {
    pub monthly_limit: Option<u32>,
}

impl QuotaPolicy {
    #[must_use]
    pub const fn limited(monthly_limit: u32) -> Self {
        Self {
            monthly_limit: Some(monthly_limit),
        }
    }

    #[must_use]
    pub const fn unlimited() -> Self {
        Self { monthly_limit: None }
    }

    /// Check a usage count against the limit.
    ///
    /// # Errors
    ///
    /// Returns `BulkEditError::QuotaExceeded` when usage is at or over the
    /// limit.
    pub fn ensure(&self, usage: u32) -> Result<(), BulkEditError> {
        match self.monthly_limit {
            Some(limit) if usage >= limit => Err(BulkEditError::QuotaExceeded { usage, limit }),
            _ => Ok(()),
        }
    }

    /// Read current usage and check it. Runs before any planning.
    ///
    /// # Errors
    ///
    /// Returns `BulkEditError::QuotaExceeded` when the shop is at its limit,
    /// or `BulkEditError::Collaborator` if usage cannot be read.
    pub async fn check(&self, usage: &dyn UsageCounter, shop: &str) -> Result<u32, BulkEditError> {
        let current = usage.current_usage(shop).await?;
        if let Err(e) = self.ensure(current) {
            warn!(shop, usage = current, "Monthly edit limit reached");
            return Err(e);
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlimited_never_blocks() {
        assert!(QuotaPolicy::unlimited().ensure(u32::MAX).is_ok());
    }

    #[test]
    fn test_blocks_at_limit() {
        let policy = QuotaPolicy::limited(10);
        assert!(policy.ensure(9).is_ok());
        assert_eq!(
            policy.ensure(10),
            Err(BulkEditError::QuotaExceeded {
                usage: 10,
                limit: 10
            })
        );
    }
}
