//! # Request Facade
//!
//! [`Service`] is the single dispatch core: it normalizes a [`Request`](crate::Request)
//! into native arguments, runs reads through the cache and turns deletes into
//! soft-delete updates. [`TypedService`] wraps the same core with typed
//! inputs, decoded results and derived cache keys.
//!
//! ```rust,ignore
//! let service = Service::new(store, users, ServiceConfig::new().with_cache(cache));
//!
//! let page = service
//!     .find_many(
//!         QueryOptions::new()
//!             .filter("age:gte", 18)
//!             .search("mo", ["name", "bio"])
//!             .paginate(Pagination::page(2, 10))
//!             .into(),
//!         &CacheOptions::new().key("adults:2"),
//!     )
//!     .await?;
//!
//! service.delete(Request::bare(json!({"id": 7})), DeleteMode::Soft).await?;
//! ```

pub mod base;
pub mod config;
pub mod typed;

pub use base::{DeleteMode, Operation, Service, cache_key};
pub use config::{ServiceConfig, ServiceSettings};
pub use typed::{Model, TypedService};
