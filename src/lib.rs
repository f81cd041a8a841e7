pub mod api;
pub mod cache;
pub mod error;
pub mod nav;
pub mod refs;
pub mod resolve;

#[cfg(test)]
mod test_helpers;

// Convenience re-exports
pub use api::client::BasecampClient;
pub use api::Remote;
pub use cache::Store;
pub use error::{BcqError, Result};
pub use refs::{CanonicalReference, Reference};
pub use resolve::Resolver;
