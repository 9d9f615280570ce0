pub mod error;
pub mod router;
pub mod server;
pub mod state;

pub use router::{handle, ApiResponse};
pub use server::serve;
pub use state::AppState;
