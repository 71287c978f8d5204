// Application layer - use cases and orchestration.
// Every client (HTTP API, CLI) goes through `TabService`.

pub mod error;
pub mod service;
pub mod view;

pub use error::*;
pub use service::*;
pub use view::*;
