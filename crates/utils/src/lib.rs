//! Small ambient utilities shared by every component crate: environment-style
//! configuration, opaque id generation, a TTL cache for health/DNS-shaped
//! lookups, and a backoff helper for retry loops (§4.H, §5).

pub mod backoff;
pub mod cache;
pub mod config;
pub mod ids;

pub use config::Config;
pub use ids::{new_opaque_id, OpaqueId};
