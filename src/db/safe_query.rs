//! Retry-wrapped convenience queries.
//!
//! Each method builds the matching call on the underlying client and runs it
//! through [`Database::with_retry`] with the configured attempt ceiling.
//! Callers get exactly the client's result or error.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;

use crate::db::client::{BatchStep, DataClient, Operation};
use crate::db::connection::Database;
use crate::db::error::DbResult;
use crate::observability::metrics;
use crate::resilience::classify::Classify;

/// Cloneable handle for issuing retried queries.
pub struct SafeQuery<C: DataClient> {
    db: Arc<Database<C>>,
}

impl<C: DataClient> Clone for SafeQuery<C> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
        }
    }
}

impl<C: DataClient> SafeQuery<C> {
    pub fn new(db: Arc<Database<C>>) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Arc<Database<C>> {
        &self.db
    }

    /// Run `operation` on `model` with retries.
    pub async fn run(&self, operation: Operation, model: &str, args: Value) -> DbResult<Value> {
        tracing::debug!(model, operation = operation.as_str(), args = %args, "query");

        let client = self.db.client();
        let result = self
            .db
            .with_retry(|| operation.invoke(client.as_ref(), model, args.clone()))
            .await;

        metrics::record_operation(model, operation.as_str(), result.is_ok());
        result
    }

    pub async fn find_many(&self, model: &str, args: Value) -> DbResult<Value> {
        self.run(Operation::FindMany, model, args).await
    }

    pub async fn find_first(&self, model: &str, args: Value) -> DbResult<Value> {
        self.run(Operation::FindFirst, model, args).await
    }

    pub async fn find_unique(&self, model: &str, args: Value) -> DbResult<Value> {
        self.run(Operation::FindUnique, model, args).await
    }

    pub async fn create(&self, model: &str, args: Value) -> DbResult<Value> {
        self.run(Operation::Create, model, args).await
    }

    pub async fn update(&self, model: &str, args: Value) -> DbResult<Value> {
        self.run(Operation::Update, model, args).await
    }

    pub async fn upsert(&self, model: &str, args: Value) -> DbResult<Value> {
        self.run(Operation::Upsert, model, args).await
    }

    pub async fn delete(&self, model: &str, args: Value) -> DbResult<Value> {
        self.run(Operation::Delete, model, args).await
    }

    pub async fn aggregate(&self, model: &str, args: Value) -> DbResult<Value> {
        self.run(Operation::Aggregate, model, args).await
    }

    pub async fn count(&self, model: &str, args: Value) -> DbResult<Value> {
        self.run(Operation::Count, model, args).await
    }

    /// Run `steps` as one atomic batch, retrying the whole batch.
    pub async fn transaction(&self, steps: Vec<BatchStep>) -> DbResult<Vec<Value>> {
        tracing::debug!(steps = steps.len(), "transaction");

        let client = self.db.client();
        let result = self
            .db
            .with_retry(|| client.transaction(steps.clone()))
            .await;

        metrics::record_operation("$transaction", "transaction", result.is_ok());
        result
    }

    /// Run an arbitrary operation with retries.
    pub async fn with_retry<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        E: Classify,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.db.with_retry(operation).await
    }
}
