//! # plfm-id
//!
//! Typed identifiers carried in scheduler requests and reports.
//!
//! ## Design Principles
//!
//! - Compute-side resources are keyed by UUIDs minted by the services that
//!   own them; the scheduler never invents them
//! - Each resource kind gets its own newtype so an instance UUID cannot be
//!   passed where a resource provider UUID is expected
//! - Hosts are addressed by name, validated once at the boundary
//!
//! ## Format
//!
//! UUID-backed IDs render as hyphenated lowercase UUIDs:
//!
//! - `InstanceUuid`: `6f1c2a6e-3c1b-4d8e-9a51-0b9f6c3f2d11`
//! - `RequestId`: `req-6f1c2a6e-3c1b-4d8e-9a51-0b9f6c3f2d11`
//!
//! Host names are opaque labels such as `compute-07.dc1`.

mod error;
mod macros;
mod types;

pub use error::IdError;
pub use types::*;

/// Re-export uuid for consumers that need raw UUID operations
pub use uuid::Uuid;
