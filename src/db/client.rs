//! Underlying data-client abstraction.
//!
//! # Responsibilities
//! - Describe the capability set the retry wrapper needs from an ORM client:
//!   per-model operations plus explicit connect/disconnect
//! - Name each operation so it can be dispatched, logged and batched
//!
//! # Design Decisions
//! - Arguments and results are JSON documents in the ORM's
//!   `{ where, data, ... }` shape; the client owns their interpretation
//! - `model` is the ORM's model name (`account`, `transaction`, ...)
//! - Clients must tolerate `disconnect` followed by `connect` at any time

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::error::DbResult;

/// An ORM-like client over a relational store.
#[async_trait]
pub trait DataClient: Send + Sync + 'static {
    /// Open the connection (or pool).
    async fn connect(&self) -> DbResult<()>;

    /// Close the connection (or pool).
    async fn disconnect(&self) -> DbResult<()>;

    async fn find_many(&self, model: &str, args: Value) -> DbResult<Value>;

    async fn find_first(&self, model: &str, args: Value) -> DbResult<Value>;

    async fn find_unique(&self, model: &str, args: Value) -> DbResult<Value>;

    async fn create(&self, model: &str, args: Value) -> DbResult<Value>;

    async fn update(&self, model: &str, args: Value) -> DbResult<Value>;

    async fn upsert(&self, model: &str, args: Value) -> DbResult<Value>;

    async fn delete(&self, model: &str, args: Value) -> DbResult<Value>;

    async fn aggregate(&self, model: &str, args: Value) -> DbResult<Value>;

    async fn count(&self, model: &str, args: Value) -> DbResult<Value>;

    /// Run `steps` atomically: either every step is applied or none is.
    /// Returns one result per step, in order.
    async fn transaction(&self, steps: Vec<BatchStep>) -> DbResult<Vec<Value>>;
}

/// The per-model operations of a [`DataClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    FindMany,
    FindFirst,
    FindUnique,
    Create,
    Update,
    Upsert,
    Delete,
    Aggregate,
    Count,
}

impl Operation {
    pub const ALL: [Operation; 9] = [
        Operation::FindMany,
        Operation::FindFirst,
        Operation::FindUnique,
        Operation::Create,
        Operation::Update,
        Operation::Upsert,
        Operation::Delete,
        Operation::Aggregate,
        Operation::Count,
    ];

    /// ORM method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::FindMany => "findMany",
            Operation::FindFirst => "findFirst",
            Operation::FindUnique => "findUnique",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Upsert => "upsert",
            Operation::Delete => "delete",
            Operation::Aggregate => "aggregate",
            Operation::Count => "count",
        }
    }

    /// True for operations that never modify data.
    pub fn is_read(&self) -> bool {
        matches!(
            self,
            Operation::FindMany
                | Operation::FindFirst
                | Operation::FindUnique
                | Operation::Aggregate
                | Operation::Count
        )
    }

    /// Call the matching method on `client`.
    pub async fn invoke<C>(self, client: &C, model: &str, args: Value) -> DbResult<Value>
    where
        C: DataClient + ?Sized,
    {
        match self {
            Operation::FindMany => client.find_many(model, args).await,
            Operation::FindFirst => client.find_first(model, args).await,
            Operation::FindUnique => client.find_unique(model, args).await,
            Operation::Create => client.create(model, args).await,
            Operation::Update => client.update(model, args).await,
            Operation::Upsert => client.upsert(model, args).await,
            Operation::Delete => client.delete(model, args).await,
            Operation::Aggregate => client.aggregate(model, args).await,
            Operation::Count => client.count(model, args).await,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of an atomic batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchStep {
    pub model: String,
    pub operation: Operation,
    pub args: Value,
}

impl BatchStep {
    pub fn new(model: impl Into<String>, operation: Operation, args: Value) -> Self {
        Self {
            model: model.into(),
            operation,
            args,
        }
    }
}
