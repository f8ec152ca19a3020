//! plfm Scheduler Client
//!
//! Compute-side services talk to the scheduler through two collaborators:
//!
//! - The **query service** picks destinations for new instances and keeps the
//!   scheduler's view of aggregates and per-host instances in sync
//! - The **report service** publishes compute-node capacity and resource
//!   provider inventory
//!
//! [`SchedulerClient`] is the single entry point. It connects each
//! collaborator on first use, forwards every call unchanged, and retries
//! `select_destinations` according to its [`RetryPolicy`].
//!
//! ```text
//! SchedulerClient
//! ├── LazyHandle<Q: QueryService>   select_destinations (retried)
//! │                                 update_aggregates, delete_aggregate
//! │                                 update/delete/sync_instance_info
//! └── LazyHandle<R: ReportService>  set_inventory_for_provider
//!                                   update_compute_node
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod lazy;
pub mod service;
pub mod types;

pub use client::SchedulerClient;
pub use config::{ConfigError, SchedulerClientConfig};
pub use error::ClientError;
pub use lazy::LazyHandle;
pub use plfm_retry::{BackoffSchedule, RetryPolicy};
pub use service::{Connect, QueryService, ReportService};
pub use types::*;
