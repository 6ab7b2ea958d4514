//! Reconciler converging broker addressing state with desired state.
//!
//! A sync cycle lists the broker's current addresses, diffs them against
//! the desired snapshot, and applies the resulting creates, updates and
//! deletes in chunked batches. The cycle is wired behind a single-flight
//! gate and a coalescer so that bursts of change notifications collapse
//! into bounded-latency, non-overlapping cycles.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::batch::apply_chunked;
use crate::broker::{Address, AddressDefinition, BrokerClient, DesiredSource};
use crate::coalesce::Coalescer;
use crate::config::{AgentConfig, SyncTuning};
use crate::diff::changes;
use crate::error::Result;
use crate::gate::SerialGate;
use crate::naming::resource_name;
use crate::settings::{compute_max_size, AddressSettingsProvider};

/// Reconciler for one broker's addressing configuration.
pub struct AddressSyncer<C> {
    /// Broker management client.
    client: Arc<C>,
    /// Capacity resolution for size settings.
    settings: AddressSettingsProvider,
    /// Maximum addresses per management batch.
    chunk_size: usize,
}

/// Result of a single sync cycle.
#[derive(Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct SyncResult {
    /// Number of addresses created.
    pub created: usize,
    /// Number of addresses updated.
    pub updated: usize,
    /// Number of addresses deleted.
    pub deleted: usize,
    /// Number of addresses already converged.
    pub unchanged: usize,
}

impl SyncResult {
    /// Returns true if the cycle made no changes.
    #[must_use]
    pub const fn is_converged(&self) -> bool {
        self.created == 0 && self.updated == 0 && self.deleted == 0
    }
}

impl std::fmt::Display for SyncResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} deleted, {} unchanged",
            self.created, self.updated, self.deleted, self.unchanged
        )
    }
}

impl<C: BrokerClient> AddressSyncer<C> {
    /// Creates a syncer from the agent configuration.
    #[must_use]
    pub fn new(client: Arc<C>, config: &AgentConfig) -> Self {
        Self {
            client,
            settings: AddressSettingsProvider::new(config.global_max_size_bytes()),
            chunk_size: config.sync.chunk_size,
        }
    }

    /// Performs one sync cycle against the desired snapshot.
    ///
    /// Both snapshots are sorted by name before diffing. A cycle with no
    /// changes short-circuits without touching the broker further.
    ///
    /// # Errors
    ///
    /// Fails on the first failing management batch or capacity query;
    /// the cycle is aborted and the caller's retry policy applies.
    pub async fn sync_once(&self, desired: &[Address]) -> Result<SyncResult> {
        let mut desired = desired.to_vec();
        desired.sort_by(|a, b| a.name.cmp(&b.name));

        let mut current = self.client.list_addresses().await?;
        current.sort_by(|a, b| a.name.cmp(&b.name));

        let Some(delta) = changes(
            &current,
            &desired,
            |a, b| a.name.cmp(&b.name),
            |a, b| a == b,
        ) else {
            debug!("no changes required, addressing configuration is converged");
            return Ok(SyncResult {
                unchanged: desired.len(),
                ..SyncResult::default()
            });
        };
        info!("applying address changes: {delta}");

        // Capacity is resolved at most once per cycle, and only when
        // some changed address actually carries a plan entitlement.
        let needs_sizing = delta
            .added
            .iter()
            .chain(delta.modified.iter())
            .any(|a| a.plan_status.is_some());
        let global_max = if needs_sizing {
            self.settings
                .resolve_capacity(|| async { self.client.global_max_size().await })
                .await?
        } else {
            0
        };

        let unchanged = desired.len() - delta.added.len() - delta.modified.len();

        let created = delta.added.len();
        let creates: Vec<AddressDefinition> = delta
            .added
            .iter()
            .map(|a| self.definition_for(a, global_max))
            .collect();
        apply_chunked(creates, self.chunk_size, |chunk| async move {
            for definition in &chunk {
                self.client.create_address(definition).await?;
            }
            Ok::<_, crate::error::SyncError>(())
        })
        .await?;

        let updated = delta.modified.len();
        let updates: Vec<AddressDefinition> = delta
            .modified
            .iter()
            .map(|a| self.definition_for(a, global_max))
            .collect();
        apply_chunked(updates, self.chunk_size, |chunk| async move {
            for definition in &chunk {
                self.client.update_address(definition).await?;
            }
            Ok::<_, crate::error::SyncError>(())
        })
        .await?;

        let deleted = delta.removed.len();
        let deletes: Vec<String> = delta
            .removed
            .iter()
            .map(|a| resource_name(&a.name))
            .collect();
        apply_chunked(deletes, self.chunk_size, |chunk| async move {
            for name in &chunk {
                self.client.delete_address(name).await?;
            }
            Ok::<_, crate::error::SyncError>(())
        })
        .await?;

        Ok(SyncResult {
            created,
            updated,
            deleted,
            unchanged,
        })
    }

    /// Builds the downstream definition for one desired address.
    fn definition_for(&self, address: &Address, global_max: u64) -> AddressDefinition {
        let settings = address.plan_status.as_ref().and_then(|plan| {
            if global_max > 0 {
                compute_max_size(plan, global_max)
            } else {
                if plan.resources.broker.is_some() {
                    warn!(
                        "no global max size available for {}, skipping size settings",
                        address.name
                    );
                }
                None
            }
        });

        AddressDefinition {
            resource_name: resource_name(&address.name),
            address: address.name.clone(),
            kind: address.kind,
            settings,
        }
    }
}

/// Wires a syncer behind the single-flight gate and the coalescer.
///
/// Returns the [`Coalescer`] whose `trigger()` the cluster watcher calls
/// on every change notification. Each fired burst fetches the desired
/// snapshot from `source` and runs one guarded sync cycle; a failed
/// cycle is retried per the tuning's retry delay.
pub fn spawn_sync_loop<C, S>(
    syncer: Arc<AddressSyncer<C>>,
    source: Arc<S>,
    tuning: &SyncTuning,
) -> Coalescer<impl Fn() + Send + Sync + 'static>
where
    C: BrokerClient + 'static,
    S: DesiredSource + 'static,
{
    let gate = SerialGate::new(
        move || {
            let syncer = Arc::clone(&syncer);
            let source = Arc::clone(&source);
            async move {
                let desired = source.desired_addresses().await?;
                let result = syncer.sync_once(&desired).await?;
                info!("sync cycle complete: {result}");
                Ok(())
            }
        },
        tuning.retry_delay(),
    );

    Coalescer::new(
        move || gate.request(),
        tuning.min_delay(),
        tuning.max_delay(),
    )
}
