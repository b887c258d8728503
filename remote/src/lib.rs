//! HTTP-backed implementations of the `inkpost_core` storage and identity
//! traits: a document table for articles, a public-read bucket for uploads,
//! and a token-exchange identity broker.
//!
//! Each client wraps a shared [`shared::ServiceClient`] and translates its
//! internal [`error::RemoteError`] into the core error types at the trait
//! boundary.

pub mod assets;
pub mod error;
pub mod identity;
pub mod shared;
pub mod table;

pub use assets::{BucketClient, BucketConfig};
pub use error::RemoteError;
pub use identity::{IdentityClient, IdentityConfig};
pub use shared::ServiceConfig;
pub use table::{TableClient, TableConfig};
