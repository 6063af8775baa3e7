//! Savings-goal actions.
//!
//! # Responsibilities
//! - Move money from an account into a savings goal
//! - Create savings goals for the signed-in user
//!
//! # Design Decisions
//! - The caller passes the authenticated user id; no id means unauthorized
//! - Balance decrement and the ledger entry commit in one batch
//! - The decrement is guarded by `balance >= amount`, so a concurrent debit
//!   between the balance check and the batch cannot overdraw the account

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::actions::ActionError;
use crate::db::client::{BatchStep, DataClient, Operation};
use crate::db::error::RECORD_NOT_FOUND;
use crate::db::safe_query::SafeQuery;

pub const ACCOUNT_MODEL: &str = "account";
pub const TRANSACTION_MODEL: &str = "transaction";
pub const SAVINGS_GOAL_MODEL: &str = "savingsGoal";

/// Request to move money from an account into a goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalDeposit {
    pub account_id: String,
    pub amount: f64,
    pub goal_id: String,
    pub goal_title: String,
}

/// Result of a successful deposit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalContribution {
    pub updated_balance: f64,
    pub transaction: Value,
}

/// Fields supplied when creating a goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsGoalDraft {
    pub title: String,
    pub target_amount: f64,
    #[serde(default)]
    pub current_amount: f64,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

/// A stored savings goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsGoal {
    pub id: String,
    pub title: String,
    pub target_amount: f64,
    pub current_amount: f64,
    pub deadline: Option<DateTime<Utc>>,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// Debit `deposit.amount` from the user's account into the goal.
pub async fn add_money_to_goal<C: DataClient>(
    db: &SafeQuery<C>,
    user_id: Option<&str>,
    deposit: &GoalDeposit,
) -> Result<GoalContribution, ActionError> {
    let user_id = user_id.ok_or(ActionError::Unauthorized)?;

    if !deposit.amount.is_finite() || deposit.amount <= 0.0 {
        return Err(ActionError::InvalidAmount(deposit.amount));
    }

    let balance = match owned_account(db, user_id, &deposit.account_id).await? {
        Some(account) => decimal_field(&account, ACCOUNT_MODEL, "balance")?,
        None => return Err(ActionError::AccountNotFound),
    };
    if balance < deposit.amount {
        return Err(ActionError::InsufficientBalance {
            balance,
            requested: deposit.amount,
        });
    }

    let steps = vec![
        BatchStep::new(
            ACCOUNT_MODEL,
            Operation::Update,
            json!({
                "where": { "id": deposit.account_id, "balance": { "gte": deposit.amount } },
                "data": { "balance": { "decrement": deposit.amount } }
            }),
        ),
        BatchStep::new(
            TRANSACTION_MODEL,
            Operation::Create,
            json!({
                "data": {
                    "accountId": deposit.account_id,
                    "amount": -deposit.amount,
                    "type": "EXPENSE",
                    "category": "SAVINGS",
                    "description": format!("Savings for {}", deposit.goal_title),
                    "date": Utc::now().to_rfc3339(),
                    "userId": user_id,
                    "goalId": deposit.goal_id
                }
            }),
        ),
    ];

    let mut results = match db.transaction(steps).await {
        Ok(results) => results,
        Err(e) if e.has_code(RECORD_NOT_FOUND) => {
            // The guarded update matched nothing: the account changed after our check.
            return Err(match owned_account(db, user_id, &deposit.account_id).await? {
                Some(account) => ActionError::InsufficientBalance {
                    balance: decimal_field(&account, ACCOUNT_MODEL, "balance")?,
                    requested: deposit.amount,
                },
                None => ActionError::AccountNotFound,
            });
        }
        Err(e) => return Err(e.into()),
    };

    let transaction = results.pop().unwrap_or(Value::Null);
    let updated_account = results.pop().unwrap_or(Value::Null);

    tracing::info!(
        account_id = %deposit.account_id,
        goal_id = %deposit.goal_id,
        amount = deposit.amount,
        "Money added to savings goal"
    );

    Ok(GoalContribution {
        updated_balance: decimal_field(&updated_account, ACCOUNT_MODEL, "balance")?,
        transaction,
    })
}

async fn owned_account<C: DataClient>(
    db: &SafeQuery<C>,
    user_id: &str,
    account_id: &str,
) -> Result<Option<Value>, ActionError> {
    let account = db
        .find_first(
            ACCOUNT_MODEL,
            json!({ "where": { "id": account_id, "userId": user_id } }),
        )
        .await?;
    Ok(Some(account).filter(|a| !a.is_null()))
}

/// Read a money column. Decimal columns arrive as numeric strings.
fn decimal_field(
    record: &Value,
    model: &'static str,
    field: &'static str,
) -> Result<f64, ActionError> {
    let value = match &record[field] {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    value
        .filter(|n| n.is_finite())
        .ok_or(ActionError::MalformedRecord { model, field })
}

/// Store a new goal owned by the user.
pub async fn create_savings_goal<C: DataClient>(
    db: &SafeQuery<C>,
    user_id: Option<&str>,
    draft: &SavingsGoalDraft,
) -> Result<SavingsGoal, ActionError> {
    let user_id = user_id.ok_or(ActionError::Unauthorized)?;

    if !draft.target_amount.is_finite() || draft.target_amount <= 0.0 {
        return Err(ActionError::InvalidAmount(draft.target_amount));
    }

    let created_at = Utc::now();
    let goal = SavingsGoal {
        id: format!(
            "goal_{}_{}",
            created_at.timestamp_millis(),
            Uuid::new_v4().simple()
        ),
        title: draft.title.clone(),
        target_amount: draft.target_amount,
        current_amount: draft.current_amount,
        deadline: draft.deadline,
        user_id: user_id.to_string(),
        created_at,
    };

    let data = serde_json::to_value(&goal)?;
    let stored = db
        .create(SAVINGS_GOAL_MODEL, json!({ "data": data }))
        .await?;

    Ok(serde_json::from_value(stored)?)
}
