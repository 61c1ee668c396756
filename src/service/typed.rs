use serde::Serialize;
use serde::de::{DeserializeOwned, Error as _};
use serde_json::{Map, Value};
use std::marker::PhantomData;

use super::base::{DeleteMode, Operation, Service, cache_key};
use crate::cache::CacheOptions;
use crate::errors::{ServiceError, logged};
use crate::models::NativeArgs;
use crate::request::Request;

/// A record type served by a [`TypedService`].
///
/// ```rust,ignore
/// #[derive(Deserialize)]
/// struct User { id: i64, name: String }
///
/// #[derive(Serialize)]
/// struct UserWhere { id: i64 }
///
/// impl Model for User {
///     const NAME: &'static str = "User";
///     type Where = UserWhere;
///     type Create = NewUser;
///     type Update = UserPatch;
/// }
/// ```
pub trait Model: DeserializeOwned + Send + Sync {
    /// Model name, used in logs and decode errors
    const NAME: &'static str;
    /// Unique lookup condition; must serialize to an object
    type Where: Serialize + Send + Sync;
    /// Create payload
    type Create: Serialize + Send + Sync;
    /// Update payload
    type Update: Serialize + Send + Sync;
}

/// Typed adapter over a [`Service`].
///
/// Results are decoded into `M` and reads are cached under a key derived
/// from the final arguments, unless the call supplies its own.
pub struct TypedService<M: Model> {
    base: Service,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Clone for TypedService<M> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            _model: PhantomData,
        }
    }
}

impl<M: Model> std::fmt::Debug for TypedService<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedService")
            .field("model", &M::NAME)
            .field("base", &self.base)
            .finish()
    }
}

impl<M: Model> TypedService<M> {
    #[must_use]
    pub fn new(base: Service) -> Self {
        Self {
            base: base.with_model_name(M::NAME),
            _model: PhantomData,
        }
    }

    /// The untyped core every call goes through
    #[must_use]
    pub fn service(&self) -> &Service {
        &self.base
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Database`/`Cache` on store or cache failure, or
    /// `ServiceError::Decode` if the row does not decode into `M`.
    pub async fn find_unique(&self, request: Request, cache: &CacheOptions) -> Result<Option<M>, ServiceError> {
        let args = self.base.normalize(request, None);
        let value = self.read(Operation::FindUnique, args, cache).await?;
        decode_optional(value)
    }

    /// Look up one record by its unique condition
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InvalidRequest` if `condition` does not
    /// serialize to an object, plus the errors of [`TypedService::find_unique`].
    pub async fn find_unique_by(&self, condition: &M::Where, cache: &CacheOptions) -> Result<Option<M>, ServiceError> {
        let args = NativeArgs::with_where(to_object(condition)?);
        let value = self.read(Operation::FindUnique, args, cache).await?;
        decode_optional(value)
    }

    /// # Errors
    ///
    /// Same as [`TypedService::find_unique`].
    pub async fn find_first(&self, request: Request, cache: &CacheOptions) -> Result<Option<M>, ServiceError> {
        let args = self.base.normalize(request, None);
        let value = self.read(Operation::FindFirst, args, cache).await?;
        decode_optional(value)
    }

    /// # Errors
    ///
    /// Same as [`TypedService::find_unique`].
    pub async fn find_many(&self, request: Request, cache: &CacheOptions) -> Result<Vec<M>, ServiceError> {
        let args = self.base.normalize(request, None);
        let value = self.read(Operation::FindMany, args, cache).await?;
        decode(M::NAME, value)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::InvalidRequest` if `data` cannot be serialized,
    /// `ServiceError::Database` if the delegate fails, or
    /// `ServiceError::Decode` for an undecodable result.
    pub async fn create(&self, data: &M::Create) -> Result<M, ServiceError> {
        let args = NativeArgs::with_data(to_value(data)?);
        let value = self.base.call(Operation::Create, args).await?;
        decode(M::NAME, value)
    }

    /// # Errors
    ///
    /// Same as [`TypedService::create`].
    pub async fn update(&self, condition: &M::Where, data: &M::Update) -> Result<M, ServiceError> {
        let args = NativeArgs {
            where_clause: Some(to_object(condition)?),
            data: Some(to_value(data)?),
            ..NativeArgs::default()
        };
        let value = self.base.call(Operation::Update, args).await?;
        decode(M::NAME, value)
    }

    /// Delete, as a soft delete unless `mode` is [`DeleteMode::Hard`]
    ///
    /// # Errors
    ///
    /// Same as [`TypedService::create`].
    pub async fn delete(&self, condition: &M::Where, mode: DeleteMode) -> Result<M, ServiceError> {
        let args = NativeArgs::with_where(to_object(condition)?);
        let value = self.base.delete(Request::Native(args), mode).await?;
        decode(M::NAME, value)
    }

    /// # Errors
    ///
    /// Same as [`TypedService::create`].
    pub async fn upsert(
        &self,
        condition: &M::Where,
        create: &M::Create,
        update: &M::Update,
    ) -> Result<M, ServiceError> {
        let args = NativeArgs::with_where(to_object(condition)?)
            .set("create", to_value(create)?)
            .set("update", to_value(update)?);
        let value = self.base.upsert(Request::Native(args)).await?;
        decode(M::NAME, value)
    }

    /// Aggregates are returned undecoded
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Database`/`Cache` on store or cache failure.
    pub async fn aggregate(&self, request: Request, cache: &CacheOptions) -> Result<Value, ServiceError> {
        let args = self.base.normalize(request, None);
        self.read(Operation::Aggregate, args, cache).await
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Database`/`Cache` on store or cache failure.
    pub async fn group_by(&self, request: Request, cache: &CacheOptions) -> Result<Value, ServiceError> {
        let args = self.base.normalize(request, None);
        self.read(Operation::GroupBy, args, cache).await
    }

    /// Run a raw query and decode each row into `T`
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Database` if the store fails or
    /// `ServiceError::Decode` if a row does not decode.
    pub async fn raw<T: DeserializeOwned>(&self, query: &str) -> Result<Vec<T>, ServiceError> {
        self.base
            .raw(query)
            .await?
            .into_iter()
            .map(|row| decode(std::any::type_name::<T>(), row))
            .collect()
    }

    async fn read(&self, operation: Operation, args: NativeArgs, cache: &CacheOptions) -> Result<Value, ServiceError> {
        let key = cache.key.clone().or_else(|| cache_key(operation, &args));
        self.base
            .cached_call(operation, args, key.as_deref(), cache)
            .await
    }
}

fn to_value(value: &impl Serialize) -> Result<Value, ServiceError> {
    serde_json::to_value(value).map_err(|err| logged(ServiceError::InvalidRequest(err)))
}

fn to_object(value: &impl Serialize) -> Result<Map<String, Value>, ServiceError> {
    match to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(logged(ServiceError::InvalidRequest(serde_json::Error::custom(
            format!("expected a condition object, found {other}"),
        )))),
    }
}

fn decode<T: DeserializeOwned>(model: &'static str, value: Value) -> Result<T, ServiceError> {
    serde_json::from_value(value).map_err(|err| logged(ServiceError::decode(model, err)))
}

fn decode_optional<M: Model>(value: Value) -> Result<Option<M>, ServiceError> {
    if value.is_null() {
        return Ok(None);
    }
    decode(M::NAME, value).map(Some)
}
