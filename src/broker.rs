//! Contracts for the external collaborators of the sync core.
//!
//! The core is consumed as a library by a reconciliation controller; the
//! cluster API watcher and the broker management client stay behind
//! these trait seams so the reconciler can be exercised without either.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::settings::{AddressSettings, PlanStatus};

/// Routing semantics of an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressKind {
    /// Competing-consumer queue.
    Queue,
    /// Publish/subscribe topic.
    Topic,
    /// Direct anycast address.
    Anycast,
    /// Direct multicast address.
    Multicast,
}

/// A named address record participating in a diff.
///
/// Addresses are matched by `name`; all fields take part in equality, so
/// a plan change on an unchanged name shows up as a modification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    /// Logical address name.
    pub name: String,
    /// Routing kind.
    pub kind: AddressKind,
    /// Plan entitlement, when the address is size-limited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_status: Option<PlanStatus>,
}

impl Address {
    /// Creates an address without a plan entitlement.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: AddressKind) -> Self {
        Self {
            name: name.into(),
            kind,
            plan_status: None,
        }
    }

    /// Attaches a plan entitlement.
    #[must_use]
    pub fn with_plan_status(mut self, plan_status: PlanStatus) -> Self {
        self.plan_status = Some(plan_status);
        self
    }
}

/// The concrete per-address record applied downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressDefinition {
    /// Collision-free downstream resource name.
    pub resource_name: String,
    /// The raw routing address.
    pub address: String,
    /// Routing kind.
    pub kind: AddressKind,
    /// Computed size settings, when applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<AddressSettings>,
}

/// Asynchronous management client for the downstream broker or router.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Lists the currently configured addresses.
    async fn list_addresses(&self) -> Result<Vec<Address>>;

    /// Creates an address from its definition.
    async fn create_address(&self, definition: &AddressDefinition) -> Result<()>;

    /// Updates an existing address to match its definition.
    async fn update_address(&self, definition: &AddressDefinition) -> Result<()>;

    /// Deletes the address with the given downstream resource name.
    async fn delete_address(&self, resource_name: &str) -> Result<()>;

    /// Queries the broker's global capacity in bytes.
    async fn global_max_size(&self) -> Result<u64>;
}

/// Source of desired state, fed by the cluster API watcher.
#[async_trait]
pub trait DesiredSource: Send + Sync {
    /// Returns the currently desired addresses, in any order.
    async fn desired_addresses(&self) -> Result<Vec<Address>>;
}
