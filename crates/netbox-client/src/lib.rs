//! Generic, class-driven NetBox REST API client.
//!
//! This crate owns transport only: authenticated paginated GET, POST/PATCH/
//! DELETE with a bounded flat retry on transient failure, `API-Version`
//! discovery and enforcement, and a per-class JSON disk cache with
//! delta-reconstruction. It knows nothing about NetBox's object model —
//! every operation is keyed by a caller-supplied `api_path` string and moves
//! `serde_json::Value`. The typed entity model and the three-phase sync
//! algorithm that decide *what* to send live in `nb-inventory` and
//! `sync-core`.

pub mod backoff;
pub mod cache;
pub mod client;
pub mod common;
pub mod error;

pub use backoff::FibonacciBackoff;
pub use cache::DiskCache;
pub use client::{NetBoxClient, MIN_API_VERSION};
pub use common::{HttpClient, PaginatedResponse};
pub use error::NetBoxError;
