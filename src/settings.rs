//! Per-address size limits derived from plan entitlements.
//!
//! An address plan entitles an address to a fraction of the broker's
//! shared capacity, optionally split across partitions. This module
//! turns that entitlement plus a global capacity into the concrete
//! settings record the broker client applies.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// Share of shared capacity an address is entitled to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanStatus {
    /// Resource entitlements from the plan.
    #[serde(default)]
    pub resources: PlanResources,
    /// Number of partitions the entitlement is split across.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partitions: Option<u32>,
}

/// Resource entitlements within a plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanResources {
    /// Fraction of the broker's shared capacity, in (0, 1].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broker: Option<f64>,
}

/// Computed settings applied to a single address downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSettings {
    /// Maximum size of the address in bytes.
    pub max_size_bytes: u64,
}

/// Derives the per-address size limit from a plan entitlement.
///
/// The allocation is `broker / partitions` when partitions are present
/// and nonzero, otherwise `broker` alone. Returns `None` (no setting
/// should be applied) when the broker entitlement is absent or
/// non-positive, rather than a zero-valued setting.
#[must_use]
pub fn compute_max_size(plan: &PlanStatus, global_max_size: u64) -> Option<AddressSettings> {
    let broker = plan.resources.broker?;
    if broker <= 0.0 {
        debug!("no broker resource required, not applying address settings");
        return None;
    }

    let allocation = match plan.partitions {
        Some(partitions) if partitions > 0 => broker / f64::from(partitions),
        _ => broker,
    };

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
    let max_size_bytes = (allocation * global_max_size as f64).round() as u64;
    Some(AddressSettings { max_size_bytes })
}

/// Resolves the global capacity and computes address settings.
///
/// A statically configured capacity takes precedence over querying the
/// broker; the query future is only awaited when no positive static
/// value is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddressSettingsProvider {
    global_max_size: u64,
}

impl AddressSettingsProvider {
    /// Creates a provider with a statically configured capacity.
    /// Zero means "not configured" and forces the async query path.
    #[must_use]
    pub const fn new(global_max_size: u64) -> Self {
        Self { global_max_size }
    }

    /// Resolves the effective global capacity, querying the broker only
    /// when no static capacity is configured.
    ///
    /// # Errors
    ///
    /// Propagates the query failure unchanged.
    pub async fn resolve_capacity<F, Fut>(&self, query: F) -> Result<u64>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<u64>>,
    {
        if self.global_max_size > 0 {
            return Ok(self.global_max_size);
        }
        query().await
    }

    /// Computes the settings for one address, resolving capacity first.
    ///
    /// Returns `Ok(None)` when neither capacity source yields a positive
    /// value or the plan carries no broker entitlement.
    ///
    /// # Errors
    ///
    /// Propagates a capacity query failure unchanged.
    pub async fn settings_for<F, Fut>(
        &self,
        plan: &PlanStatus,
        query: F,
    ) -> Result<Option<AddressSettings>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<u64>>,
    {
        let capacity = self.resolve_capacity(query).await?;
        if capacity == 0 {
            debug!("no global max size available, not applying address settings");
            return Ok(None);
        }
        Ok(compute_max_size(plan, capacity))
    }
}
