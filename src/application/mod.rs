// Application layer - use cases and orchestration over the identity
// provider and the document store.

pub mod error;
pub mod service;

pub use error::*;
pub use service::*;
