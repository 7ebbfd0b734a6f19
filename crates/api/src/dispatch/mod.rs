//! Invocation dispatch: executor lookup and the execution lifecycle.

pub mod dispatcher;
pub mod registry;

pub use dispatcher::{CatalogListing, DispatchResult, Dispatcher, ListingSettings};
pub use registry::ExecutorRegistry;
