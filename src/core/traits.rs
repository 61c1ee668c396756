use async_trait::async_trait;
use sea_orm::DbErr;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::models::NativeArgs;

/// Per-model operations of the underlying data-store client.
///
/// Every method receives arguments in the native shape and returns the
/// store's JSON result unchanged. Store failures are reported as `DbErr`.
#[async_trait]
pub trait Delegate: Send + Sync {
    async fn create(&self, args: NativeArgs) -> Result<Value, DbErr>;

    async fn find_unique(&self, args: NativeArgs) -> Result<Value, DbErr>;

    async fn find_first(&self, args: NativeArgs) -> Result<Value, DbErr>;

    async fn find_many(&self, args: NativeArgs) -> Result<Value, DbErr>;

    async fn update(&self, args: NativeArgs) -> Result<Value, DbErr>;

    /// Physically remove the matching row
    async fn delete(&self, args: NativeArgs) -> Result<Value, DbErr>;

    async fn upsert(&self, args: NativeArgs) -> Result<Value, DbErr>;

    async fn create_many(&self, args: NativeArgs) -> Result<Value, DbErr>;

    async fn update_many(&self, args: NativeArgs) -> Result<Value, DbErr>;

    /// Physically remove every matching row
    async fn delete_many(&self, args: NativeArgs) -> Result<Value, DbErr>;

    async fn aggregate(&self, args: NativeArgs) -> Result<Value, DbErr>;

    async fn group_by(&self, args: NativeArgs) -> Result<Value, DbErr>;
}

/// Future returned by a unit of work run inside a transaction
pub type TransactionFuture<'c> = Pin<Box<dyn Future<Output = Result<Value, DbErr>> + Send + 'c>>;

/// Unit of work handed to [`Store::transaction`]
pub type TransactionFn = Box<dyn for<'c> FnOnce(&'c dyn Store) -> TransactionFuture<'c> + Send>;

/// Store-level operations that are not tied to one model
#[async_trait]
pub trait Store: Send + Sync {
    /// Run a raw query and return its rows
    ///
    /// # Errors
    ///
    /// Returns a `DbErr` if the store rejects or fails the query.
    async fn raw_query(&self, query: &str) -> Result<Vec<Value>, DbErr>;

    /// Run `work` atomically
    ///
    /// The store passed to `work` is scoped to the transaction; whatever it
    /// returns is committed on `Ok` and rolled back on `Err`.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `work`, or a `DbErr` if the store cannot
    /// begin or commit.
    async fn transaction(&self, work: TransactionFn) -> Result<Value, DbErr>;

    /// Delegate for `name`, if the store exposes per-model access
    fn model(&self, _name: &str) -> Option<Arc<dyn Delegate>> {
        None
    }
}
