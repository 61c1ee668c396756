pub mod cache;
pub mod compiler;
pub mod core;
pub mod errors;
pub mod filtering;
pub mod models;
pub mod request;
pub mod service;
pub mod sql;

pub use cache::{CacheAdapter, CacheError, CacheOptions, MemoryCache};
pub use compiler::{DEFAULT_SOFT_DELETE_FIELD, QueryCompiler, compile};
pub use crate::core::{Delegate, Store, TransactionFn, TransactionFuture};
pub use errors::ServiceError;
pub use filtering::{FieldSet, FieldSpec, OrderBy, Pagination, RelationArgs, SearchSpec, SortOrder};
pub use models::{FilterMap, NativeArgs, QueryOptions};
pub use request::Request;
pub use service::{DeleteMode, Model, Operation, Service, ServiceConfig, ServiceSettings, TypedService};
pub use serde_with;
