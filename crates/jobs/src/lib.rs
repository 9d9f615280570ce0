//! Long-running job execution: export (§4.E) and deletion (§4.F) workers,
//! plus the lease table shared between them for single-flight execution.

pub mod crypto;
pub mod deletion;
pub mod export;
pub mod lease;

pub use lease::LeaseTable;
