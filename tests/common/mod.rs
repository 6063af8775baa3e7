//! Shared utilities for integration and failure-injection tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use finance_store::db::{BatchStep, DataClient, DbError, DbResult, MemoryClient};
use finance_store::{Database, RetryPolicy, SafeQuery};

/// Postgres error seen behind PgBouncer when a statement name is reused.
pub fn statement_exists() -> DbError {
    DbError::with_code("42P05", "prepared statement \"s0\" already exists")
}

/// Postgres error seen when a pooled backend lost the session's statements.
pub fn statement_missing(n: u32) -> DbError {
    DbError::with_code("26000", format!("prepared statement \"s{}\" does not exist", n))
}

type BatchHook = Box<dyn FnOnce(&MemoryClient) + Send>;

/// A client that fails queries on demand and can refuse to reconnect.
#[derive(Default)]
pub struct FlakyClient {
    pub inner: MemoryClient,
    injected: Mutex<VecDeque<DbError>>,
    before_batch: Mutex<Option<BatchHook>>,
    fail_connect: AtomicBool,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    queries: AtomicUsize,
}

impl FlakyClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `errors.len()` queries fail with these errors, in order.
    pub fn inject<I: IntoIterator<Item = DbError>>(&self, errors: I) {
        self.injected.lock().unwrap().extend(errors);
    }

    /// Run `hook` against the stored records right before the next batch.
    pub fn before_next_batch<F>(&self, hook: F)
    where
        F: FnOnce(&MemoryClient) + Send + 'static,
    {
        *self.before_batch.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn refuse_connections(&self, refuse: bool) {
        self.fail_connect.store(refuse, Ordering::SeqCst);
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn next_failure(&self) -> DbResult<()> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        match self.injected.lock().unwrap().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DataClient for FlakyClient {
    async fn connect(&self) -> DbResult<()> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(DbError::with_code(
                "P1001",
                "Can't reach database server at `pooler.local:6543`",
            ));
        }
        self.inner.connect().await
    }

    async fn disconnect(&self) -> DbResult<()> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.inner.disconnect().await
    }

    async fn find_many(&self, model: &str, args: Value) -> DbResult<Value> {
        self.next_failure()?;
        self.inner.find_many(model, args).await
    }

    async fn find_first(&self, model: &str, args: Value) -> DbResult<Value> {
        self.next_failure()?;
        self.inner.find_first(model, args).await
    }

    async fn find_unique(&self, model: &str, args: Value) -> DbResult<Value> {
        self.next_failure()?;
        self.inner.find_unique(model, args).await
    }

    async fn create(&self, model: &str, args: Value) -> DbResult<Value> {
        self.next_failure()?;
        self.inner.create(model, args).await
    }

    async fn update(&self, model: &str, args: Value) -> DbResult<Value> {
        self.next_failure()?;
        self.inner.update(model, args).await
    }

    async fn upsert(&self, model: &str, args: Value) -> DbResult<Value> {
        self.next_failure()?;
        self.inner.upsert(model, args).await
    }

    async fn delete(&self, model: &str, args: Value) -> DbResult<Value> {
        self.next_failure()?;
        self.inner.delete(model, args).await
    }

    async fn aggregate(&self, model: &str, args: Value) -> DbResult<Value> {
        self.next_failure()?;
        self.inner.aggregate(model, args).await
    }

    async fn count(&self, model: &str, args: Value) -> DbResult<Value> {
        self.next_failure()?;
        self.inner.count(model, args).await
    }

    async fn transaction(&self, steps: Vec<BatchStep>) -> DbResult<Vec<Value>> {
        let hook = self.before_batch.lock().unwrap().take();
        if let Some(hook) = hook {
            hook(&self.inner);
        }
        self.next_failure()?;
        self.inner.transaction(steps).await
    }
}

/// Database over a fresh [`FlakyClient`] with the default policy.
pub fn flaky_database() -> Arc<Database<FlakyClient>> {
    Arc::new(Database::with_policy(FlakyClient::new(), RetryPolicy::default()))
}

pub fn flaky_queries() -> SafeQuery<FlakyClient> {
    SafeQuery::new(flaky_database())
}

/// Database over a [`MemoryClient`] with the default policy.
pub fn memory_database() -> Database<MemoryClient> {
    Database::with_policy(MemoryClient::new(), RetryPolicy::default())
}
