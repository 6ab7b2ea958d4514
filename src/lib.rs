// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![forbid(unsafe_code)]               // Unsafe code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![warn(missing_docs)]                // All public items should be documented

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::redundant_clone)]     // Useless clones warning

// ============================================================================
// Crate Documentation
// ============================================================================

//! # addrsync
//!
//! The synchronization core of an in-cluster agent that keeps a messaging
//! broker's live addressing configuration converged with declaratively
//! specified desired state.
//!
//! ## Overview
//!
//! The crate provides the concurrency-and-consistency primitives that make
//! reconciliation correct under concurrent updates, bursty change events and
//! transient broker failures:
//!
//! - Diff two ordered address snapshots into added/removed/modified sets
//! - Collapse notification storms into bounded-latency sync cycles
//! - Serialize sync cycles so they never overlap, with failure retry
//! - Apply management changes in fixed-size ordered batches
//! - Map arbitrary address names to valid, collision-free resource names
//! - Derive per-address size limits from plan entitlements
//!
//! Watching the cluster API and speaking the broker's management protocol
//! are the consuming controller's job; they appear here only as the
//! [`DesiredSource`] and [`BrokerClient`] trait seams.
//!
//! ## Modules
//!
//! - [`config`]: Agent configuration loading and tuning knobs
//! - [`size`]: Human-readable byte-size parsing
//! - [`naming`]: Collision-free downstream resource names
//! - [`diff`]: Ordered-snapshot differencing
//! - [`gate`]: Single-flight invocation gate with failure retry
//! - [`coalesce`]: Bounded-latency trigger coalescing
//! - [`batch`]: Chunked application of management batches
//! - [`settings`]: Plan-entitlement size calculation
//! - [`broker`]: Collaborator trait contracts and address records
//! - [`reconciler`]: The sync cycle and its loop wiring
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use addrsync::{AddressSyncer, AgentConfig, spawn_sync_loop};
//! # use addrsync::{Address, AddressDefinition, BrokerClient, DesiredSource, Result};
//! # struct MyBroker;
//! # #[async_trait::async_trait]
//! # impl BrokerClient for MyBroker {
//! #     async fn list_addresses(&self) -> Result<Vec<Address>> { Ok(vec![]) }
//! #     async fn create_address(&self, _: &AddressDefinition) -> Result<()> { Ok(()) }
//! #     async fn update_address(&self, _: &AddressDefinition) -> Result<()> { Ok(()) }
//! #     async fn delete_address(&self, _: &str) -> Result<()> { Ok(()) }
//! #     async fn global_max_size(&self) -> Result<u64> { Ok(0) }
//! # }
//! # struct MyWatcher;
//! # #[async_trait::async_trait]
//! # impl DesiredSource for MyWatcher {
//! #     async fn desired_addresses(&self) -> Result<Vec<Address>> { Ok(vec![]) }
//! # }
//!
//! # #[tokio::main] async fn main() -> Result<()> {
//! let config = AgentConfig::load_with_env("addrsync.yaml")?;
//! let syncer = Arc::new(AddressSyncer::new(Arc::new(MyBroker), &config));
//! let trigger = spawn_sync_loop(syncer, Arc::new(MyWatcher), &config.sync);
//!
//! // Call trigger.trigger() from the cluster watch callback.
//! trigger.trigger();
//! # Ok(()) }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod batch;
pub mod broker;
pub mod coalesce;
pub mod config;
pub mod diff;
pub mod error;
pub mod gate;
pub mod naming;
pub mod reconciler;
pub mod settings;
pub mod size;

// ============================================================================
// Re-exports
// ============================================================================

pub use batch::apply_chunked;
pub use broker::{Address, AddressDefinition, AddressKind, BrokerClient, DesiredSource};
pub use coalesce::Coalescer;
pub use config::{AgentConfig, SyncTuning};
pub use diff::{changes, ChangeSet};
pub use error::{BrokerError, ConfigError, Result, SyncError};
pub use gate::SerialGate;
pub use naming::resource_name;
pub use reconciler::{spawn_sync_loop, AddressSyncer, SyncResult};
pub use settings::{
    compute_max_size, AddressSettings, AddressSettingsProvider, PlanResources, PlanStatus,
};
pub use size::parse_to_bytes;
