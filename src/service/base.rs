use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;

use super::config::ServiceConfig;
use crate::cache::CacheOptions;
use crate::compiler::QueryCompiler;
use crate::core::traits::{Delegate, Store, TransactionFuture};
use crate::errors::{ServiceError, logged};
use crate::filtering::conditions::merge_maps;
use crate::models::NativeArgs;
use crate::request::Request;

/// Delegate method a call is dispatched to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    FindUnique,
    FindFirst,
    FindMany,
    Update,
    Delete,
    Upsert,
    CreateMany,
    UpdateMany,
    DeleteMany,
    Aggregate,
    GroupBy,
}

impl Operation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::FindUnique => "findUnique",
            Self::FindFirst => "findFirst",
            Self::FindMany => "findMany",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Upsert => "upsert",
            Self::CreateMany => "createMany",
            Self::UpdateMany => "updateMany",
            Self::DeleteMany => "deleteMany",
            Self::Aggregate => "aggregate",
            Self::GroupBy => "groupBy",
        }
    }
}

/// Whether a delete may be turned into a soft-delete update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeleteMode {
    /// Set the soft-delete marker when one is configured
    #[default]
    Soft,
    /// Always remove the row
    Hard,
}

/// Cache key for a call: `"<method>:<json of the final arguments>"`
#[must_use]
pub fn cache_key(operation: Operation, args: &NativeArgs) -> Option<String> {
    serde_json::to_string(args)
        .ok()
        .map(|json| format!("{}:{json}", operation.as_str()))
}

/// Untyped request facade over one model delegate.
///
/// Accepts native, shorthand or bare requests, compiles shorthand, swaps
/// deletes for soft-delete updates and runs reads through the configured
/// cache when the caller supplies a key.
#[derive(Clone)]
pub struct Service {
    store: Arc<dyn Store>,
    delegate: Arc<dyn Delegate>,
    compiler: QueryCompiler,
    config: ServiceConfig,
    model: Option<String>,
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("model", &self.model)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Service {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, delegate: Arc<dyn Delegate>, config: ServiceConfig) -> Self {
        Self {
            store,
            delegate,
            compiler: QueryCompiler::new(config.soft_delete_field.clone()),
            config,
            model: None,
        }
    }

    /// Name used in log events
    #[must_use]
    pub fn with_model_name(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    #[must_use]
    pub fn compiler(&self) -> &QueryCompiler {
        &self.compiler
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Bring any request into native form.
    ///
    /// A `base` condition is merged into the request's `where` without
    /// dropping either side. When both give a plain value for one field,
    /// shorthand requests keep the base value; native and bare requests keep
    /// the caller's.
    #[must_use]
    pub fn normalize(&self, request: Request, base: Option<&Map<String, Value>>) -> NativeArgs {
        match request {
            Request::Shorthand(options) => {
                let mut args = self.compiler.compile(&options);
                args.where_clause = merge_where(args.where_clause, base);
                args
            }
            Request::Native(mut args) => {
                let caller = args.where_clause.take();
                args.where_clause = merge_where(base.cloned(), caller.as_ref());
                args
            }
            Request::Bare(Value::Object(condition)) => NativeArgs {
                where_clause: merge_where(base.cloned(), Some(&condition)),
                ..NativeArgs::default()
            },
            Request::Bare(other) => {
                if !other.is_null() {
                    tracing::warn!(value = %other, "Ignoring bare request that is not an object");
                }
                NativeArgs {
                    where_clause: base.cloned(),
                    ..NativeArgs::default()
                }
            }
        }
    }

    /// Invoke the delegate method for `operation`
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Database` with the delegate's error unchanged.
    pub async fn call(&self, operation: Operation, args: NativeArgs) -> Result<Value, ServiceError> {
        tracing::debug!(
            operation = operation.as_str(),
            model = self.model.as_deref().unwrap_or("-"),
            "Dispatching to delegate"
        );

        let delegate = &self.delegate;
        let result = match operation {
            Operation::Create => delegate.create(args).await,
            Operation::FindUnique => delegate.find_unique(args).await,
            Operation::FindFirst => delegate.find_first(args).await,
            Operation::FindMany => delegate.find_many(args).await,
            Operation::Update => delegate.update(args).await,
            Operation::Delete => delegate.delete(args).await,
            Operation::Upsert => delegate.upsert(args).await,
            Operation::CreateMany => delegate.create_many(args).await,
            Operation::UpdateMany => delegate.update_many(args).await,
            Operation::DeleteMany => delegate.delete_many(args).await,
            Operation::Aggregate => delegate.aggregate(args).await,
            Operation::GroupBy => delegate.group_by(args).await,
        };

        result.map_err(logged)
    }

    /// Run `producer` behind the cache.
    ///
    /// Without an adapter or a key the producer runs directly. A stored
    /// non-null value short-circuits unless `force_refresh` is set; otherwise
    /// the fresh result is written with the call TTL, falling back to the
    /// configured default. A `null` result is returned but never stored.
    ///
    /// # Errors
    ///
    /// Returns the producer's error, or `ServiceError::Cache` if the adapter
    /// fails.
    pub async fn with_cache<F, Fut>(
        &self,
        key: Option<&str>,
        options: &CacheOptions,
        producer: F,
    ) -> Result<Value, ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, ServiceError>>,
    {
        let (Some(cache), Some(key)) = (self.config.cache.as_ref(), key) else {
            return producer().await;
        };

        if options.force_refresh {
            tracing::debug!(key = %key, "Cache refresh forced");
        } else {
            let cached = cache.get(key).await.map_err(logged)?;
            if let Some(hit) = cached.filter(|value| !value.is_null()) {
                tracing::debug!(key = %key, "Cache hit");
                return Ok(hit);
            }
            tracing::debug!(key = %key, "Cache miss");
        }

        let value = producer().await?;
        if value.is_null() {
            return Ok(value);
        }
        cache
            .set(key, value.clone(), options.ttl.or(self.config.ttl))
            .await
            .map_err(logged)?;
        Ok(value)
    }

    /// Dispatch already-native arguments through the cache under `key`
    pub(crate) async fn cached_call(
        &self,
        operation: Operation,
        args: NativeArgs,
        key: Option<&str>,
        options: &CacheOptions,
    ) -> Result<Value, ServiceError> {
        self.with_cache(key, options, move || self.call(operation, args))
            .await
    }

    async fn read(
        &self,
        operation: Operation,
        request: Request,
        base: Option<&Map<String, Value>>,
        options: &CacheOptions,
    ) -> Result<Value, ServiceError> {
        let args = self.normalize(request, base);
        self.cached_call(operation, args, options.key.as_deref(), options)
            .await
    }

    /// Create one record; a bare value is the payload
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Database` if the delegate fails.
    pub async fn create(&self, request: Request) -> Result<Value, ServiceError> {
        let args = self.payload_args(request);
        self.call(Operation::Create, args).await
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Database` if the delegate fails, or
    /// `ServiceError::Cache` if the cache does.
    pub async fn find_unique(&self, request: Request, options: &CacheOptions) -> Result<Value, ServiceError> {
        self.read(Operation::FindUnique, request, None, options).await
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Database` if the delegate fails, or
    /// `ServiceError::Cache` if the cache does.
    pub async fn find_first(&self, request: Request, options: &CacheOptions) -> Result<Value, ServiceError> {
        self.read(Operation::FindFirst, request, None, options).await
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Database` if the delegate fails, or
    /// `ServiceError::Cache` if the cache does.
    pub async fn find_many(&self, request: Request, options: &CacheOptions) -> Result<Value, ServiceError> {
        self.read(Operation::FindMany, request, None, options).await
    }

    /// Look up one record by `condition`, with optional extra arguments
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Database` if the delegate fails, or
    /// `ServiceError::Cache` if the cache does.
    pub async fn find_unique_where(
        &self,
        condition: Map<String, Value>,
        request: Option<Request>,
        options: &CacheOptions,
    ) -> Result<Value, ServiceError> {
        self.read(Operation::FindUnique, request.unwrap_or_default(), Some(&condition), options)
            .await
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Database` if the delegate fails, or
    /// `ServiceError::Cache` if the cache does.
    pub async fn find_first_where(
        &self,
        condition: Map<String, Value>,
        request: Option<Request>,
        options: &CacheOptions,
    ) -> Result<Value, ServiceError> {
        self.read(Operation::FindFirst, request.unwrap_or_default(), Some(&condition), options)
            .await
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Database` if the delegate fails, or
    /// `ServiceError::Cache` if the cache does.
    pub async fn find_many_where(
        &self,
        condition: Map<String, Value>,
        request: Option<Request>,
        options: &CacheOptions,
    ) -> Result<Value, ServiceError> {
        self.read(Operation::FindMany, request.unwrap_or_default(), Some(&condition), options)
            .await
    }

    /// Update the record matching `condition`.
    ///
    /// `request` is either native `{where, data}`, shorthand whose compiled
    /// `where` is merged with `condition` and whose `data` is the payload, or
    /// a bare payload.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Database` if the delegate fails.
    pub async fn update(
        &self,
        condition: Option<Map<String, Value>>,
        request: Request,
    ) -> Result<Value, ServiceError> {
        let args = self.update_args(condition, request);
        self.call(Operation::Update, args).await
    }

    /// Delete the matching record, as a soft-delete update unless `mode` is
    /// [`DeleteMode::Hard`] or no marker is configured
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Database` if the delegate fails.
    pub async fn delete(&self, request: Request, mode: DeleteMode) -> Result<Value, ServiceError> {
        let args = self.normalize(request, None);
        match self.soft_delete_args(args, mode) {
            Ok(update) => self.call(Operation::Update, update).await,
            Err(args) => self.call(Operation::Delete, args).await,
        }
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Database` if the delegate fails.
    pub async fn upsert(&self, request: Request) -> Result<Value, ServiceError> {
        let args = self.normalize(request, None);
        self.call(Operation::Upsert, args).await
    }

    /// Create several records; a bare value is the payload list
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Database` if the delegate fails.
    pub async fn create_many(&self, request: Request) -> Result<Value, ServiceError> {
        let args = self.payload_args(request);
        self.call(Operation::CreateMany, args).await
    }

    /// Same shapes as [`Service::update`], for every matching record
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Database` if the delegate fails.
    pub async fn update_many(
        &self,
        condition: Option<Map<String, Value>>,
        request: Request,
    ) -> Result<Value, ServiceError> {
        let args = self.update_args(condition, request);
        self.call(Operation::UpdateMany, args).await
    }

    /// Same substitution as [`Service::delete`], for every matching record
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Database` if the delegate fails.
    pub async fn delete_many(&self, request: Request, mode: DeleteMode) -> Result<Value, ServiceError> {
        let args = self.normalize(request, None);
        match self.soft_delete_args(args, mode) {
            Ok(update) => self.call(Operation::UpdateMany, update).await,
            Err(args) => self.call(Operation::DeleteMany, args).await,
        }
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Database` if the delegate fails, or
    /// `ServiceError::Cache` if the cache does.
    pub async fn aggregate(&self, request: Request, options: &CacheOptions) -> Result<Value, ServiceError> {
        self.read(Operation::Aggregate, request, None, options).await
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Database` if the delegate fails, or
    /// `ServiceError::Cache` if the cache does.
    pub async fn group_by(&self, request: Request, options: &CacheOptions) -> Result<Value, ServiceError> {
        self.read(Operation::GroupBy, request, None, options).await
    }

    /// Run a raw query on the store
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Database` if the store fails.
    pub async fn raw(&self, query: &str) -> Result<Vec<Value>, ServiceError> {
        tracing::debug!(model = self.model.as_deref().unwrap_or("-"), "Running raw query");
        self.store.raw_query(query).await.map_err(logged)
    }

    /// Run `work` inside a store transaction
    ///
    /// # Example
    /// ```rust,ignore
    /// service
    ///     .transaction(|tx| Box::pin(async move {
    ///         let users = tx.model("User").ok_or(DbErr::Custom("no User".into()))?;
    ///         users.create(NativeArgs::with_data(json!({"name": "a"}))).await
    ///     }))
    ///     .await?;
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Database` with whatever the store or `work`
    /// failed with.
    pub async fn transaction<F>(&self, work: F) -> Result<Value, ServiceError>
    where
        F: for<'c> FnOnce(&'c dyn Store) -> TransactionFuture<'c> + Send + 'static,
    {
        self.store.transaction(Box::new(work)).await.map_err(logged)
    }

    fn payload_args(&self, request: Request) -> NativeArgs {
        match request {
            Request::Bare(payload) => NativeArgs::with_data(payload),
            Request::Shorthand(options) => self.compiler.compile(&options),
            Request::Native(args) => args,
        }
    }

    fn update_args(&self, condition: Option<Map<String, Value>>, request: Request) -> NativeArgs {
        match request {
            Request::Bare(payload) => NativeArgs {
                where_clause: condition,
                data: Some(payload),
                ..NativeArgs::default()
            },
            Request::Shorthand(options) => {
                let mut args = self.normalize(Request::Shorthand(options), condition.as_ref());
                args.data.get_or_insert_with(|| Value::Object(Map::new()));
                args
            }
            native @ Request::Native(_) => self.normalize(native, condition.as_ref()),
        }
    }

    // Ok(update args) when the delete becomes a soft delete, Err(args) otherwise.
    fn soft_delete_args(&self, mut args: NativeArgs, mode: DeleteMode) -> Result<NativeArgs, NativeArgs> {
        let Some(field) = self.config.soft_delete_field.as_ref().filter(|_| mode == DeleteMode::Soft)
        else {
            return Err(args);
        };

        let mut data = Map::new();
        data.insert(
            field.clone(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        args.data = Some(Value::Object(data));

        tracing::debug!(
            field = %field,
            model = self.model.as_deref().unwrap_or("-"),
            "Substituting soft delete for physical delete"
        );
        Ok(args)
    }
}

// Entries of `top` are merged into `bottom` field by field. On a plain
// equality clash `top` wins; operator objects are unioned and logical
// clauses end up in conjunction.
fn merge_where(
    bottom: Option<Map<String, Value>>,
    top: Option<&Map<String, Value>>,
) -> Option<Map<String, Value>> {
    match (bottom, top) {
        (bottom, None) => bottom,
        (None, Some(top)) => Some(top.clone()),
        (Some(mut bottom), Some(top)) => {
            merge_maps(&mut bottom, top.clone());
            Some(bottom)
        }
    }
}
