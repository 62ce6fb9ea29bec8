use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use se_common::Money;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;
use uuid::Uuid;

//--------------------------------------   ValidationError   ---------------------------------------------------------
/// Raised when an identifier supplied by a caller is structurally unusable. The engine rejects these before doing any
/// work rather than computing garbage against a nonsense key.
#[derive(Debug, Clone, Error)]
#[error("Invalid identifier: {0}")]
pub struct ValidationError(pub String);

fn validate_id(s: &str, what: &str) -> Result<(), ValidationError> {
    if s.is_empty() {
        return Err(ValidationError(format!("{what} must not be empty")));
    }
    if s.len() > 64 {
        return Err(ValidationError(format!("{what} exceeds 64 characters")));
    }
    if s.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ValidationError(format!("{what} contains whitespace or control characters")));
    }
    Ok(())
}

macro_rules! id_type {
    ($name:ident, $what:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
        #[sqlx(transparent)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn random() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn validate(&self) -> Result<(), ValidationError> {
                validate_id(&self.0, $what)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                validate_id(s, $what)?;
                Ok(Self(s.to_string()))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(UserId, "user id");
id_type!(GroupId, "group id");
id_type!(ExpenseId, "expense id");
id_type!(SplitId, "split id");
id_type!(SettlementId, "settlement id");

//--------------------------------------     MemberRole      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum MemberRole {
    Owner,
    Admin,
    Member,
}

impl MemberRole {
    /// Owners and admins may manage group membership and metadata.
    pub fn is_admin(&self) -> bool {
        matches!(self, MemberRole::Owner | MemberRole::Admin)
    }
}

impl Default for MemberRole {
    fn default() -> Self {
        MemberRole::Member
    }
}

impl Display for MemberRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemberRole::Owner => write!(f, "Owner"),
            MemberRole::Admin => write!(f, "Admin"),
            MemberRole::Member => write!(f, "Member"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid member role: {0}")]
pub struct RoleConversionError(String);

impl FromStr for MemberRole {
    type Err = RoleConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Owner" => Ok(Self::Owner),
            "Admin" => Ok(Self::Admin),
            "Member" => Ok(Self::Member),
            s => Err(RoleConversionError(s.to_string())),
        }
    }
}

impl From<String> for MemberRole {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid member role: {value}. But this conversion cannot fail. Defaulting to Member");
            MemberRole::Member
        })
    }
}

//--------------------------------------  SettlementStatus   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum SettlementStatus {
    /// The transfer is the matcher's current answer for the group. Pending settlements are derived state and may be
    /// deleted and recreated freely by the recompute protocol.
    Pending,
    /// The debtor has marked the transfer as paid. Paid settlements are historical facts: they are never deleted or
    /// regenerated, and they feed back into balance computation as discharged transfers.
    Paid,
}

impl Display for SettlementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettlementStatus::Pending => write!(f, "Pending"),
            SettlementStatus::Paid => write!(f, "Paid"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid settlement status: {0}")]
pub struct StatusConversionError(String);

impl FromStr for SettlementStatus {
    type Err = StatusConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Paid" => Ok(Self::Paid),
            s => Err(StatusConversionError(s.to_string())),
        }
    }
}

impl From<String> for SettlementStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid settlement status: {value}. But this conversion cannot fail. Defaulting to Pending");
            SettlementStatus::Pending
        })
    }
}

//--------------------------------------        User         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    /// Caller-supplied identity (from the external identity provider). Generated when absent.
    pub id: Option<UserId>,
    pub name: String,
    pub email: String,
}

//--------------------------------------        Group        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGroup {
    pub name: String,
}

/// One row of the "my groups" listing: the group plus aggregate counts.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GroupSummary {
    pub id: GroupId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub member_count: i64,
    pub expense_count: i64,
}

//--------------------------------------     GroupMember     ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GroupMember {
    pub id: i64,
    pub group_id: GroupId,
    pub user_id: UserId,
    pub role: MemberRole,
    pub created_at: DateTime<Utc>,
}

/// Membership joined with the user record, for member listings.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MemberDetail {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub role: MemberRole,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------       Expense       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub group_id: GroupId,
    /// The user who fronted the money. They are owed the full amount back; their own share comes out of the splits.
    pub paid_by_id: UserId,
    pub description: String,
    pub amount: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExpense {
    pub paid_by_id: UserId,
    pub description: String,
    pub amount: Money,
    #[serde(default)]
    pub splits: Vec<NewSplit>,
}

impl NewExpense {
    pub fn new(paid_by_id: UserId, description: impl Into<String>, amount: Money) -> Self {
        Self { paid_by_id, description: description.into(), amount, splits: Vec::new() }
    }

    pub fn with_split(mut self, user_id: UserId, amount_owed: Money) -> Self {
        self.splits.push(NewSplit { user_id, amount_owed });
        self
    }
}

/// The fields of an expense that may be edited after creation. The split records carry their own edit operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpenseUpdate {
    pub description: Option<String>,
    pub amount: Option<Money>,
}

//--------------------------------------    ExpenseSplit     ---------------------------------------------------------
/// One member's share of one expense. The engine trusts split values as given; whether splits sum to the expense
/// amount is a concern for the caller.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ExpenseSplit {
    pub id: SplitId,
    pub expense_id: ExpenseId,
    pub user_id: UserId,
    pub amount_owed: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSplit {
    pub user_id: UserId,
    pub amount_owed: Money,
}

/// An expense together with its split records, in split insertion order.
#[derive(Debug, Clone, Serialize)]
pub struct ExpenseWithSplits {
    #[serde(flatten)]
    pub expense: Expense,
    pub splits: Vec<ExpenseSplit>,
}

//--------------------------------------      Settlement     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Settlement {
    pub id: SettlementId,
    pub group_id: GroupId,
    /// The debtor: this user owes the amount.
    pub from_user_id: UserId,
    /// The creditor: this user is owed the amount.
    pub to_user_id: UserId,
    pub amount: Money,
    pub status: SettlementStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn id_validation_rejects_junk() {
        assert!("".parse::<UserId>().is_err());
        assert!("has space".parse::<GroupId>().is_err());
        assert!("a\tb".parse::<ExpenseId>().is_err());
        assert!("x".repeat(65).parse::<SettlementId>().is_err());
        assert!("cku2qp0jq0000yz".parse::<UserId>().is_ok());
    }

    #[test]
    fn random_ids_are_valid() {
        assert!(UserId::random().validate().is_ok());
        assert!(SettlementId::random().validate().is_ok());
    }

    #[test]
    fn role_round_trip() {
        for role in [MemberRole::Owner, MemberRole::Admin, MemberRole::Member] {
            assert_eq!(role.to_string().parse::<MemberRole>().unwrap(), role);
        }
        assert!(MemberRole::Owner.is_admin());
        assert!(!MemberRole::Member.is_admin());
    }

    #[test]
    fn status_round_trip() {
        for status in [SettlementStatus::Pending, SettlementStatus::Paid] {
            assert_eq!(status.to_string().parse::<SettlementStatus>().unwrap(), status);
        }
    }
}
