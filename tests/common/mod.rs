#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use querycrate::{
    CacheAdapter, CacheError, Delegate, NativeArgs, Operation, Service, ServiceConfig, Store,
    TransactionFn,
};
use sea_orm::DbErr;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Install a test subscriber so `RUST_LOG`-style output shows up with `--nocapture`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

/// Delegate that records every call and answers with canned or echo values
#[derive(Default)]
pub struct RecordingDelegate {
    calls: Mutex<Vec<(Operation, NativeArgs)>>,
    responses: Mutex<HashMap<Operation, Value>>,
    fail: bool,
}

impl RecordingDelegate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every call fails with `DbErr::Custom("<operation> failed")`
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub fn respond(&self, operation: Operation, value: Value) {
        self.responses.lock().insert(operation, value);
    }

    pub fn calls(&self) -> Vec<(Operation, NativeArgs)> {
        self.calls.lock().clone()
    }

    pub fn operations(&self) -> Vec<Operation> {
        self.calls.lock().iter().map(|(operation, _)| *operation).collect()
    }

    pub fn count(&self, operation: Operation) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|(recorded, _)| *recorded == operation)
            .count()
    }

    pub fn last_args(&self) -> NativeArgs {
        self.calls
            .lock()
            .last()
            .map(|(_, args)| args.clone())
            .expect("no delegate call recorded")
    }

    async fn record(&self, operation: Operation, args: NativeArgs) -> Result<Value, DbErr> {
        let call = {
            let mut calls = self.calls.lock();
            calls.push((operation, args.clone()));
            calls.len()
        };

        // Let concurrent callers interleave like a real round trip would
        tokio::task::yield_now().await;

        if self.fail {
            return Err(DbErr::Custom(format!("{} failed", operation.as_str())));
        }

        let canned = self.responses.lock().get(&operation).cloned();
        Ok(canned.unwrap_or_else(|| {
            json!({"call": call, "operation": operation.as_str(), "args": args.to_value()})
        }))
    }
}

#[async_trait]
impl Delegate for RecordingDelegate {
    async fn create(&self, args: NativeArgs) -> Result<Value, DbErr> {
        self.record(Operation::Create, args).await
    }

    async fn find_unique(&self, args: NativeArgs) -> Result<Value, DbErr> {
        self.record(Operation::FindUnique, args).await
    }

    async fn find_first(&self, args: NativeArgs) -> Result<Value, DbErr> {
        self.record(Operation::FindFirst, args).await
    }

    async fn find_many(&self, args: NativeArgs) -> Result<Value, DbErr> {
        self.record(Operation::FindMany, args).await
    }

    async fn update(&self, args: NativeArgs) -> Result<Value, DbErr> {
        self.record(Operation::Update, args).await
    }

    async fn delete(&self, args: NativeArgs) -> Result<Value, DbErr> {
        self.record(Operation::Delete, args).await
    }

    async fn upsert(&self, args: NativeArgs) -> Result<Value, DbErr> {
        self.record(Operation::Upsert, args).await
    }

    async fn create_many(&self, args: NativeArgs) -> Result<Value, DbErr> {
        self.record(Operation::CreateMany, args).await
    }

    async fn update_many(&self, args: NativeArgs) -> Result<Value, DbErr> {
        self.record(Operation::UpdateMany, args).await
    }

    async fn delete_many(&self, args: NativeArgs) -> Result<Value, DbErr> {
        self.record(Operation::DeleteMany, args).await
    }

    async fn aggregate(&self, args: NativeArgs) -> Result<Value, DbErr> {
        self.record(Operation::Aggregate, args).await
    }

    async fn group_by(&self, args: NativeArgs) -> Result<Value, DbErr> {
        self.record(Operation::GroupBy, args).await
    }
}

/// Store whose transactions run the unit of work directly against itself
#[derive(Default)]
pub struct RecordingStore {
    models: HashMap<String, Arc<RecordingDelegate>>,
    rows: Vec<Value>,
    queries: Mutex<Vec<String>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, name: &str, delegate: Arc<RecordingDelegate>) -> Self {
        self.models.insert(name.to_owned(), delegate);
        self
    }

    pub fn with_rows(mut self, rows: Vec<Value>) -> Self {
        self.rows = rows;
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl Store for RecordingStore {
    async fn raw_query(&self, query: &str) -> Result<Vec<Value>, DbErr> {
        self.queries.lock().push(query.to_owned());
        Ok(self.rows.clone())
    }

    async fn transaction(&self, work: TransactionFn) -> Result<Value, DbErr> {
        work(self).await
    }

    fn model(&self, name: &str) -> Option<Arc<dyn Delegate>> {
        self.models
            .get(name)
            .map(|delegate| Arc::clone(delegate) as Arc<dyn Delegate>)
    }
}

/// Cache adapter whose backend is always unreachable
pub struct FailingCache;

#[async_trait]
impl CacheAdapter for FailingCache {
    async fn get(&self, _key: &str) -> Result<Option<Value>, CacheError> {
        Err(CacheError::new("cache unavailable"))
    }

    async fn set(&self, _key: &str, _value: Value, _ttl: Option<Duration>) -> Result<(), CacheError> {
        Err(CacheError::new("cache unavailable"))
    }

    async fn del(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::new("cache unavailable"))
    }
}

pub fn setup_service(delegate: &Arc<RecordingDelegate>, config: ServiceConfig) -> Service {
    Service::new(Arc::new(RecordingStore::new()), delegate.clone(), config)
}

/// Shorthand for building a JSON object map in tests
pub fn object(value: Value) -> serde_json::Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}
