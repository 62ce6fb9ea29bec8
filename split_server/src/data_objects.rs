use std::fmt::Display;

use se_common::Money;
use serde::{Deserialize, Serialize};
use split_engine::db_types::{ExpenseWithSplits, Group, GroupId, MemberDetail, MemberRole, NewSplit, UserId};

// All monetary fields on the wire are integer minor units (cents), matching the engine's Money type.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUserRequest {
    pub id: Option<UserId>,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGroupRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateGroupRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: UserId,
    #[serde(default)]
    pub role: MemberRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExpenseRequest {
    pub description: String,
    pub amount: Money,
    /// Defaults to the authenticated caller when omitted.
    pub paid_by_id: Option<UserId>,
    #[serde(default)]
    pub splits: Vec<NewSplit>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateExpenseRequest {
    pub description: Option<String>,
    pub amount: Option<Money>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSplitRequest {
    pub user_id: UserId,
    pub amount_owed: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSplitRequest {
    pub amount_owed: Money,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummaryQuery {
    pub group_id: Option<GroupId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

/// The full group view: metadata, membership and the expense history.
#[derive(Debug, Clone, Serialize)]
pub struct GroupDetailResponse {
    #[serde(flatten)]
    pub group: Group,
    pub members: Vec<MemberDetail>,
    pub expenses: Vec<ExpenseWithSplits>,
}

impl NewExpenseRequest {
    /// Lowers the request into the engine's `NewExpense`, defaulting the payer to the caller.
    pub fn into_new_expense(self, caller: &UserId) -> split_engine::db_types::NewExpense {
        split_engine::db_types::NewExpense {
            paid_by_id: self.paid_by_id.unwrap_or_else(|| caller.clone()),
            description: self.description,
            amount: self.amount,
            splits: self.splits,
        }
    }
}
