//! In-memory data client.
//!
//! Keeps one table of JSON records per model and interprets the ORM argument
//! shapes the rest of the crate uses. Backs the binary's diagnostics and the
//! test suite; production deployments plug a real client into
//! [`DataClient`].
//!
//! Supported arguments:
//! - `where`: field equality, or an operator object using `equals`, `not`,
//!   `in`, `gt`, `gte`, `lt`, `lte`
//! - `orderBy` (`{field: "asc" | "desc"}` or a list of those), `skip`, `take`
//! - `data` (plain values or `set`, `increment`, `decrement`, `multiply`,
//!   `divide`), `create` / `update` for upserts
//! - `_count`, `_sum`, `_avg`, `_min`, `_max` for aggregates

use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{Map, Number, Value};
use uuid::Uuid;

use crate::db::client::{BatchStep, DataClient, Operation};
use crate::db::error::{DbError, DbResult};

type Record = Map<String, Value>;

const FILTER_OPERATORS: [&str; 7] = ["equals", "not", "in", "gt", "gte", "lt", "lte"];
const UPDATE_OPERATORS: [&str; 5] = ["set", "increment", "decrement", "multiply", "divide"];

/// A [`DataClient`] holding every record in process memory.
#[derive(Debug, Default)]
pub struct MemoryClient {
    tables: Mutex<Tables>,
    connected: AtomicBool,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert records directly, bypassing connection state.
    pub fn seed<I>(&self, model: &str, records: I) -> DbResult<()>
    where
        I: IntoIterator<Item = Value>,
    {
        let mut tables = self.lock();
        for record in records {
            tables.create(model, &serde_json::json!({ "data": record }))?;
        }
        Ok(())
    }

    /// Remove the record with `id` directly, bypassing connection state.
    pub fn remove(&self, model: &str, id: &str) -> Option<Value> {
        let mut tables = self.lock();
        let rows = tables.models.get_mut(model)?;
        let index = rows
            .iter()
            .position(|row| row.get("id").and_then(Value::as_str) == Some(id))?;
        Some(Value::Object(rows.remove(index)))
    }

    /// Snapshot of a model's records, in insertion order.
    pub fn records(&self, model: &str) -> Vec<Value> {
        self.lock()
            .models
            .get(model)
            .map(|rows| rows.iter().cloned().map(Value::Object).collect())
            .unwrap_or_default()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Explicit `connect` calls so far.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Explicit `disconnect` calls so far.
    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn execute(&self, model: &str, operation: Operation, args: Value) -> DbResult<Value> {
        // Queries connect lazily, like the ORM does.
        self.connected.store(true, Ordering::SeqCst);
        self.lock().dispatch(model, operation, &args)
    }
}

#[async_trait]
impl DataClient for MemoryClient {
    async fn connect(&self) -> DbResult<()> {
        self.connected.store(true, Ordering::SeqCst);
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> DbResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn find_many(&self, model: &str, args: Value) -> DbResult<Value> {
        self.execute(model, Operation::FindMany, args)
    }

    async fn find_first(&self, model: &str, args: Value) -> DbResult<Value> {
        self.execute(model, Operation::FindFirst, args)
    }

    async fn find_unique(&self, model: &str, args: Value) -> DbResult<Value> {
        self.execute(model, Operation::FindUnique, args)
    }

    async fn create(&self, model: &str, args: Value) -> DbResult<Value> {
        self.execute(model, Operation::Create, args)
    }

    async fn update(&self, model: &str, args: Value) -> DbResult<Value> {
        self.execute(model, Operation::Update, args)
    }

    async fn upsert(&self, model: &str, args: Value) -> DbResult<Value> {
        self.execute(model, Operation::Upsert, args)
    }

    async fn delete(&self, model: &str, args: Value) -> DbResult<Value> {
        self.execute(model, Operation::Delete, args)
    }

    async fn aggregate(&self, model: &str, args: Value) -> DbResult<Value> {
        self.execute(model, Operation::Aggregate, args)
    }

    async fn count(&self, model: &str, args: Value) -> DbResult<Value> {
        self.execute(model, Operation::Count, args)
    }

    async fn transaction(&self, steps: Vec<BatchStep>) -> DbResult<Vec<Value>> {
        self.connected.store(true, Ordering::SeqCst);
        let mut tables = self.lock();

        let mut staged = tables.clone();
        let mut results = Vec::with_capacity(steps.len());
        for step in &steps {
            results.push(staged.dispatch(&step.model, step.operation, &step.args)?);
        }

        *tables = staged;
        Ok(results)
    }
}

#[derive(Debug, Default, Clone)]
struct Tables {
    models: HashMap<String, Vec<Record>>,
}

impl Tables {
    fn dispatch(&mut self, model: &str, operation: Operation, args: &Value) -> DbResult<Value> {
        if !(args.is_object() || args.is_null()) {
            return Err(DbError::invalid_arguments(format!(
                "Arguments to `{}.{}` must be an object",
                model, operation
            )));
        }

        match operation {
            Operation::FindMany => self.find_many(model, args).map(Value::Array),
            Operation::FindFirst => Ok(self
                .find_many(model, args)?
                .into_iter()
                .next()
                .unwrap_or(Value::Null)),
            Operation::FindUnique => {
                let filter = required(args, "where", model, operation)?;
                Ok(self
                    .rows(model)
                    .iter()
                    .find_map(|row| match matches(row, Some(filter)) {
                        Ok(true) => Some(Ok(Value::Object(row.clone()))),
                        Ok(false) => None,
                        Err(e) => Some(Err(e)),
                    })
                    .transpose()?
                    .unwrap_or(Value::Null))
            }
            Operation::Create => self.create(model, args),
            Operation::Update => self.update(model, args),
            Operation::Upsert => self.upsert(model, args),
            Operation::Delete => self.delete(model, args),
            Operation::Aggregate => self.aggregate(model, args),
            Operation::Count => {
                let n = self.matching(model, args.get("where"))?.len();
                Ok(Value::from(n as u64))
            }
        }
    }

    fn rows(&self, model: &str) -> &[Record] {
        self.models.get(model).map(Vec::as_slice).unwrap_or(&[])
    }

    fn matching(&self, model: &str, filter: Option<&Value>) -> DbResult<Vec<&Record>> {
        let mut found = Vec::new();
        for row in self.rows(model) {
            if matches(row, filter)? {
                found.push(row);
            }
        }
        Ok(found)
    }

    fn position(&self, model: &str, filter: &Value) -> DbResult<Option<usize>> {
        for (i, row) in self.rows(model).iter().enumerate() {
            if matches(row, Some(filter))? {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    fn find_many(&self, model: &str, args: &Value) -> DbResult<Vec<Value>> {
        let mut rows = self.matching(model, args.get("where"))?;

        if let Some(order) = args.get("orderBy") {
            let keys = order_keys(order)?;
            rows.sort_by(|a, b| {
                for (field, descending) in &keys {
                    let ord = compare(
                        a.get(field).unwrap_or(&Value::Null),
                        b.get(field).unwrap_or(&Value::Null),
                    )
                    .unwrap_or(CmpOrdering::Equal);
                    let ord = if *descending { ord.reverse() } else { ord };
                    if ord != CmpOrdering::Equal {
                        return ord;
                    }
                }
                CmpOrdering::Equal
            });
        }

        let skip = optional_count(args, "skip")?.unwrap_or(0);
        let take = optional_count(args, "take")?.unwrap_or(usize::MAX);

        Ok(rows
            .into_iter()
            .skip(skip)
            .take(take)
            .cloned()
            .map(Value::Object)
            .collect())
    }

    fn create(&mut self, model: &str, args: &Value) -> DbResult<Value> {
        let data = required_object(args, "data", model, Operation::Create)?;
        self.insert(model, data.clone())
    }

    fn insert(&mut self, model: &str, mut record: Record) -> DbResult<Value> {
        let id = record
            .entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()))
            .clone();

        let rows = self.models.entry(model.to_string()).or_default();
        if rows.iter().any(|row| row.get("id") == Some(&id)) {
            return Err(DbError::unique_violation(model, "id"));
        }

        rows.push(record.clone());
        Ok(Value::Object(record))
    }

    fn update(&mut self, model: &str, args: &Value) -> DbResult<Value> {
        let filter = required(args, "where", model, Operation::Update)?;
        let data = required_object(args, "data", model, Operation::Update)?;

        let index = self
            .position(model, filter)?
            .ok_or_else(|| DbError::record_not_found(model, "update"))?;
        self.apply(model, index, data)
    }

    fn apply(&mut self, model: &str, index: usize, data: &Record) -> DbResult<Value> {
        let rows = self
            .models
            .get_mut(model)
            .ok_or_else(|| DbError::record_not_found(model, "update"))?;

        let mut updated = rows[index].clone();
        for (field, change) in data {
            let next = apply_change(updated.get(field), change)?;
            updated.insert(field.clone(), next);
        }

        if updated.get("id") != rows[index].get("id")
            && rows.iter().any(|row| row.get("id") == updated.get("id"))
        {
            return Err(DbError::unique_violation(model, "id"));
        }

        rows[index] = updated.clone();
        Ok(Value::Object(updated))
    }

    fn upsert(&mut self, model: &str, args: &Value) -> DbResult<Value> {
        let filter = required(args, "where", model, Operation::Upsert)?;
        let create = required_object(args, "create", model, Operation::Upsert)?;
        let update = required_object(args, "update", model, Operation::Upsert)?;

        match self.position(model, filter)? {
            Some(index) => self.apply(model, index, update),
            None => self.insert(model, create.clone()),
        }
    }

    fn delete(&mut self, model: &str, args: &Value) -> DbResult<Value> {
        let filter = required(args, "where", model, Operation::Delete)?;
        let index = self
            .position(model, filter)?
            .ok_or_else(|| DbError::record_not_found(model, "delete"))?;

        let removed = self
            .models
            .get_mut(model)
            .map(|rows| rows.remove(index))
            .ok_or_else(|| DbError::record_not_found(model, "delete"))?;
        Ok(Value::Object(removed))
    }

    fn aggregate(&self, model: &str, args: &Value) -> DbResult<Value> {
        let rows = self.matching(model, args.get("where"))?;
        let mut result = Map::new();

        if let Some(selection) = args.get("_count") {
            let counted = match selection {
                Value::Bool(true) => Value::from(rows.len() as u64),
                Value::Object(fields) => {
                    let mut per_field = Map::new();
                    for field in selected_fields(fields) {
                        let n = rows
                            .iter()
                            .filter(|row| !row.get(field).unwrap_or(&Value::Null).is_null())
                            .count();
                        per_field.insert(field.to_string(), Value::from(n as u64));
                    }
                    Value::Object(per_field)
                }
                _ => return Err(DbError::invalid_arguments("`_count` must be true or an object")),
            };
            result.insert("_count".to_string(), counted);
        }

        for (key, reducer) in [
            ("_sum", Reducer::Sum),
            ("_avg", Reducer::Avg),
            ("_min", Reducer::Min),
            ("_max", Reducer::Max),
        ] {
            let Some(selection) = args.get(key) else {
                continue;
            };
            let fields = selection
                .as_object()
                .ok_or_else(|| DbError::invalid_arguments(format!("`{}` must be an object", key)))?;

            let mut per_field = Map::new();
            for field in selected_fields(fields) {
                let values: Vec<&Value> = rows
                    .iter()
                    .filter_map(|row| row.get(field))
                    .filter(|v| !v.is_null())
                    .collect();
                per_field.insert(field.to_string(), reducer.reduce(&values));
            }
            result.insert(key.to_string(), Value::Object(per_field));
        }

        Ok(Value::Object(result))
    }
}

#[derive(Debug, Clone, Copy)]
enum Reducer {
    Sum,
    Avg,
    Min,
    Max,
}

impl Reducer {
    fn reduce(self, values: &[&Value]) -> Value {
        if values.is_empty() {
            return Value::Null;
        }

        match self {
            Reducer::Sum | Reducer::Avg => {
                let numbers: Vec<f64> = values.iter().filter_map(|v| v.as_f64()).collect();
                if numbers.is_empty() {
                    return Value::Null;
                }
                let sum: f64 = numbers.iter().sum();
                let total = match self {
                    Reducer::Avg => sum / numbers.len() as f64,
                    _ => sum,
                };
                number(total)
            }
            Reducer::Min | Reducer::Max => {
                let want = if matches!(self, Reducer::Min) {
                    CmpOrdering::Less
                } else {
                    CmpOrdering::Greater
                };
                values
                    .iter()
                    .copied()
                    .fold(None::<&Value>, |best, v| match best {
                        Some(b) if compare(v, b) != Some(want) => Some(b),
                        _ => Some(v),
                    })
                    .cloned()
                    .unwrap_or(Value::Null)
            }
        }
    }
}

fn selected_fields(fields: &Record) -> impl Iterator<Item = &str> {
    fields
        .iter()
        .filter(|(_, selected)| selected.as_bool() == Some(true))
        .map(|(field, _)| field.as_str())
}

fn required<'a>(args: &'a Value, key: &str, model: &str, op: Operation) -> DbResult<&'a Value> {
    args.get(key).ok_or_else(|| {
        DbError::invalid_arguments(format!("Argument `{}` is missing in `{}.{}`", key, model, op))
    })
}

fn required_object<'a>(
    args: &'a Value,
    key: &str,
    model: &str,
    op: Operation,
) -> DbResult<&'a Record> {
    required(args, key, model, op)?.as_object().ok_or_else(|| {
        DbError::invalid_arguments(format!("Argument `{}` in `{}.{}` must be an object", key, model, op))
    })
}

fn optional_count(args: &Value, key: &str) -> DbResult<Option<usize>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .map(|n| Some(n as usize))
            .ok_or_else(|| DbError::invalid_arguments(format!("`{}` must be a non-negative integer", key))),
    }
}

fn order_keys(order: &Value) -> DbResult<Vec<(String, bool)>> {
    let clauses: Vec<&Value> = match order {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    let mut keys = Vec::new();
    for clause in clauses {
        let fields = clause
            .as_object()
            .ok_or_else(|| DbError::invalid_arguments("`orderBy` entries must be objects"))?;
        for (field, direction) in fields {
            let descending = match direction.as_str() {
                Some("asc") => false,
                Some("desc") => true,
                _ => {
                    return Err(DbError::invalid_arguments(format!(
                        "`orderBy.{}` must be \"asc\" or \"desc\"",
                        field
                    )))
                }
            };
            keys.push((field.clone(), descending));
        }
    }
    Ok(keys)
}

fn is_operator_object(value: &Value, operators: &[&str]) -> bool {
    match value.as_object() {
        Some(map) => !map.is_empty() && map.keys().all(|k| operators.contains(&k.as_str())),
        None => false,
    }
}

fn matches(row: &Record, filter: Option<&Value>) -> DbResult<bool> {
    let conditions = match filter {
        None | Some(Value::Null) => return Ok(true),
        Some(Value::Object(conditions)) => conditions,
        Some(_) => return Err(DbError::invalid_arguments("`where` must be an object")),
    };

    for (field, condition) in conditions {
        let actual = row.get(field).unwrap_or(&Value::Null);
        if !field_matches(actual, condition)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn field_matches(actual: &Value, condition: &Value) -> DbResult<bool> {
    if !is_operator_object(condition, &FILTER_OPERATORS) {
        return Ok(values_equal(actual, condition));
    }

    for (op, operand) in condition.as_object().into_iter().flatten() {
        let ok = match op.as_str() {
            "equals" => values_equal(actual, operand),
            "not" => !field_matches(actual, operand)?,
            "in" => operand
                .as_array()
                .ok_or_else(|| DbError::invalid_arguments("`in` expects a list"))?
                .iter()
                .any(|candidate| values_equal(actual, candidate)),
            "gt" => compare(actual, operand) == Some(CmpOrdering::Greater),
            "gte" => matches!(
                compare(actual, operand),
                Some(CmpOrdering::Greater | CmpOrdering::Equal)
            ),
            "lt" => compare(actual, operand) == Some(CmpOrdering::Less),
            "lte" => matches!(
                compare(actual, operand),
                Some(CmpOrdering::Less | CmpOrdering::Equal)
            ),
            _ => unreachable!("checked by is_operator_object"),
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn compare(a: &Value, b: &Value) -> Option<CmpOrdering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::Number(x), Value::String(_)) => x.as_f64()?.partial_cmp(&decimal(b)?),
        (Value::String(_), Value::Number(y)) => decimal(a)?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn apply_change(current: Option<&Value>, change: &Value) -> DbResult<Value> {
    if !is_operator_object(change, &UPDATE_OPERATORS) {
        return Ok(change.clone());
    }

    let mut value = current.cloned().unwrap_or(Value::Null);
    for (op, operand) in change.as_object().into_iter().flatten() {
        value = match op.as_str() {
            "set" => operand.clone(),
            arith => arithmetic(&value, arith, operand)?,
        };
    }
    Ok(value)
}

/// Decimal columns travel as numeric strings, e.g. `"500.00"`.
fn decimal(value: &Value) -> Option<f64> {
    value
        .as_str()?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

fn arithmetic(current: &Value, op: &str, operand: &Value) -> DbResult<Value> {
    if let Value::String(_) = current {
        let a = decimal(current).ok_or_else(|| {
            DbError::invalid_arguments(format!("`{}` applied to a non-numeric field", op))
        })?;
        let b = operand
            .as_f64()
            .ok_or_else(|| DbError::invalid_arguments(format!("`{}` expects a number", op)))?;
        return float_op(op, a, b).map(|n| Value::String(n.to_string()));
    }

    let operand_num = match operand {
        Value::Number(n) => n,
        _ => {
            return Err(DbError::invalid_arguments(format!(
                "`{}` expects a number",
                op
            )))
        }
    };
    let zero = Number::from(0);
    let current_num = match current {
        Value::Null => &zero,
        Value::Number(n) => n,
        _ => {
            return Err(DbError::invalid_arguments(format!(
                "`{}` applied to a non-numeric field",
                op
            )))
        }
    };

    if let (Some(a), Some(b)) = (current_num.as_i64(), operand_num.as_i64()) {
        let exact = match op {
            "increment" => a.checked_add(b),
            "decrement" => a.checked_sub(b),
            "multiply" => a.checked_mul(b),
            _ => None,
        };
        if let Some(n) = exact {
            return Ok(Value::from(n));
        }
    }

    let a = current_num.as_f64().unwrap_or(0.0);
    let b = operand_num.as_f64().unwrap_or(0.0);
    float_op(op, a, b).map(number)
}

fn float_op(op: &str, a: f64, b: f64) -> DbResult<f64> {
    match op {
        "increment" => Ok(a + b),
        "decrement" => Ok(a - b),
        "multiply" => Ok(a * b),
        "divide" if b == 0.0 => Err(DbError::invalid_arguments("division by zero")),
        "divide" => Ok(a / b),
        other => Err(DbError::invalid_arguments(format!(
            "unknown update operator `{}`",
            other
        ))),
    }
}

fn number(n: f64) -> Value {
    Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seeded() -> MemoryClient {
        let client = MemoryClient::new();
        client
            .seed(
                "account",
                vec![
                    json!({ "id": "acc-1", "userId": "u1", "name": "Checking", "balance": 500 }),
                    json!({ "id": "acc-2", "userId": "u1", "name": "Savings", "balance": 1200.5 }),
                    json!({ "id": "acc-3", "userId": "u2", "name": "Cash", "balance": 40 }),
                ],
            )
            .unwrap();
        client
    }

    #[tokio::test]
    async fn test_find_many_filters_and_orders() {
        let client = seeded();
        let rows = client
            .find_many(
                "account",
                json!({ "where": { "userId": "u1" }, "orderBy": { "balance": "desc" } }),
            )
            .await
            .unwrap();
        let ids: Vec<&str> = rows
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["acc-2", "acc-1"]);
    }

    #[tokio::test]
    async fn test_skip_take_and_operators() {
        let client = seeded();
        let rows = client
            .find_many(
                "account",
                json!({
                    "where": { "balance": { "gte": 40, "lt": 1000 } },
                    "orderBy": [{ "balance": "asc" }],
                    "skip": 1,
                    "take": 5
                }),
            )
            .await
            .unwrap();
        assert_eq!(rows, json!([{ "id": "acc-1", "userId": "u1", "name": "Checking", "balance": 500 }]));

        let rows = client
            .find_many("account", json!({ "where": { "id": { "in": ["acc-3", "nope"] } } }))
            .await
            .unwrap();
        assert_eq!(rows.as_array().unwrap().len(), 1);

        let rows = client
            .find_many("account", json!({ "where": { "userId": { "not": "u1" } } }))
            .await
            .unwrap();
        assert_eq!(rows[0]["id"], "acc-3");
    }

    #[tokio::test]
    async fn test_find_first_and_unique() {
        let client = seeded();
        let first = client
            .find_first("account", json!({ "where": { "userId": "u2" } }))
            .await
            .unwrap();
        assert_eq!(first["name"], "Cash");

        let missing = client
            .find_unique("account", json!({ "where": { "id": "acc-9" } }))
            .await
            .unwrap();
        assert!(missing.is_null());

        let err = client.find_unique("account", json!({})).await.unwrap_err();
        assert!(err.has_code(crate::db::error::INVALID_ARGUMENTS));
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_rejects_duplicates() {
        let client = seeded();
        let created = client
            .create("account", json!({ "data": { "userId": "u3", "balance": 0 } }))
            .await
            .unwrap();
        assert!(created["id"].is_string());

        let err = client
            .create("account", json!({ "data": { "id": "acc-1" } }))
            .await
            .unwrap_err();
        assert!(err.has_code(crate::db::error::UNIQUE_CONSTRAINT));
    }

    #[tokio::test]
    async fn test_update_with_atomic_operators() {
        let client = seeded();
        let updated = client
            .update(
                "account",
                json!({ "where": { "id": "acc-1" }, "data": { "balance": { "decrement": 125 }, "name": "Main" } }),
            )
            .await
            .unwrap();
        assert_eq!(updated["balance"], 375);
        assert_eq!(updated["name"], "Main");

        let updated = client
            .update(
                "account",
                json!({ "where": { "id": "acc-2" }, "data": { "balance": { "increment": 0.25 } } }),
            )
            .await
            .unwrap();
        assert_eq!(updated["balance"], 1200.75);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_record() {
        let client = seeded();
        let err = client
            .update("account", json!({ "where": { "id": "x" }, "data": { "name": "y" } }))
            .await
            .unwrap_err();
        assert!(err.has_code(crate::db::error::RECORD_NOT_FOUND));

        let err = client
            .delete("account", json!({ "where": { "id": "x" } }))
            .await
            .unwrap_err();
        assert!(err.has_code(crate::db::error::RECORD_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_upsert_both_paths() {
        let client = seeded();
        let args = json!({
            "where": { "id": "acc-9" },
            "create": { "id": "acc-9", "userId": "u9", "balance": 1 },
            "update": { "balance": { "increment": 1 } }
        });

        let created = client.upsert("account", args.clone()).await.unwrap();
        assert_eq!(created["balance"], 1);
        let updated = client.upsert("account", args).await.unwrap();
        assert_eq!(updated["balance"], 2);
        assert_eq!(client.records("account").len(), 4);
    }

    #[tokio::test]
    async fn test_count_and_aggregate() {
        let client = seeded();
        let n = client
            .count("account", json!({ "where": { "userId": "u1" } }))
            .await
            .unwrap();
        assert_eq!(n, 2);

        let agg = client
            .aggregate(
                "account",
                json!({
                    "where": { "userId": "u1" },
                    "_count": true,
                    "_sum": { "balance": true },
                    "_max": { "balance": true },
                    "_min": { "name": true }
                }),
            )
            .await
            .unwrap();
        assert_eq!(agg["_count"], 2);
        assert_eq!(agg["_sum"]["balance"], 1700.5);
        assert_eq!(agg["_max"]["balance"], 1200.5);
        assert_eq!(agg["_min"]["name"], "Checking");

        let empty = client
            .aggregate("account", json!({ "where": { "userId": "nobody" }, "_avg": { "balance": true } }))
            .await
            .unwrap();
        assert!(empty["_avg"]["balance"].is_null());
    }

    #[tokio::test]
    async fn test_transaction_is_all_or_nothing() {
        let client = seeded();
        let steps = vec![
            BatchStep::new(
                "account",
                Operation::Update,
                json!({ "where": { "id": "acc-1" }, "data": { "balance": 0 } }),
            ),
            BatchStep::new(
                "account",
                Operation::Delete,
                json!({ "where": { "id": "missing" } }),
            ),
        ];
        assert!(client.transaction(steps).await.is_err());
        assert_eq!(client.records("account")[0]["balance"], 500);

        let steps = vec![
            BatchStep::new(
                "account",
                Operation::Update,
                json!({ "where": { "id": "acc-1" }, "data": { "balance": 0 } }),
            ),
            BatchStep::new("ledger", Operation::Create, json!({ "data": { "note": "x" } })),
        ];
        let results = client.transaction(steps).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(client.records("account")[0]["balance"], 0);
        assert_eq!(client.records("ledger").len(), 1);
    }

    #[tokio::test]
    async fn test_decimal_strings_compare_and_decrement() {
        let client = MemoryClient::new();
        client
            .seed("account", vec![json!({ "id": "acc-9", "balance": "500.00" })])
            .unwrap();

        let found = client
            .find_first("account", json!({ "where": { "balance": { "gte": 499.5 } } }))
            .await
            .unwrap();
        assert_eq!(found["id"], "acc-9");

        let updated = client
            .update(
                "account",
                json!({ "where": { "id": "acc-9" }, "data": { "balance": { "decrement": 10.25 } } }),
            )
            .await
            .unwrap();
        assert_eq!(updated["balance"], "489.75");

        let err = client
            .update(
                "account",
                json!({ "where": { "id": "acc-9" }, "data": { "balance": { "decrement": "1" } } }),
            )
            .await
            .unwrap_err();
        assert!(err.has_code(crate::db::error::INVALID_ARGUMENTS));
    }

    #[test]
    fn test_remove_record() {
        let client = seeded();
        assert_eq!(client.remove("account", "acc-1").unwrap()["id"], "acc-1");
        assert!(client.remove("account", "acc-1").is_none());
        assert!(client.remove("nothing", "acc-1").is_none());
    }

    #[tokio::test]
    async fn test_rejects_non_object_arguments() {
        let client = seeded();
        let err = client.find_many("account", json!([1, 2])).await.unwrap_err();
        assert!(err.has_code(crate::db::error::INVALID_ARGUMENTS));
    }

    #[tokio::test]
    async fn test_lazy_connect_after_disconnect() {
        let client = seeded();
        client.disconnect().await.unwrap();
        assert!(!client.is_connected());
        client.count("account", Value::Null).await.unwrap();
        assert!(client.is_connected());
        assert_eq!(client.connect_count(), 0);
    }
}
