//! Concrete [`llm_core::Provider`] implementations (§4.I): two hosted chat
//! vendors and a local inference runtime, all built on [`transport`]'s
//! `VendorTransport` seam.

pub mod error_mapping;
pub mod hosted_chat_a;
pub mod hosted_chat_b;
pub mod local_runtime;
pub mod transport;

pub use hosted_chat_a::HostedChatA;
pub use hosted_chat_b::HostedChatB;
pub use local_runtime::LocalRuntime;
pub use transport::{ReqwestTransport, VendorTransport};
