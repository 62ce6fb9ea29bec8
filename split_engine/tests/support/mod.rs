#![allow(dead_code)]
pub mod prepare_env;

use se_common::Money;
use split_engine::{
    db_types::{GroupId, MemberRole, NewExpense, NewGroup, NewUser, UserId},
    events::EventProducers,
    ExpenseFlowApi,
    GroupApi,
    SettlementApi,
    SqliteDatabase,
    UserApi,
};

pub struct TestContext {
    pub db: SqliteDatabase,
    pub expenses: ExpenseFlowApi<SqliteDatabase>,
    pub settlements: SettlementApi<SqliteDatabase>,
    pub groups: GroupApi<SqliteDatabase>,
    pub users: UserApi<SqliteDatabase>,
}

pub async fn setup() -> TestContext {
    let url = prepare_env::random_db_path();
    prepare_env::prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    TestContext {
        expenses: ExpenseFlowApi::new(db.clone(), EventProducers::default()),
        settlements: SettlementApi::new(db.clone(), EventProducers::default()),
        groups: GroupApi::new(db.clone()),
        users: UserApi::new(db.clone()),
        db,
    }
}

pub async fn tear_down(ctx: TestContext) {
    use split_engine::LedgerDatabase;
    use sqlx::{migrate::MigrateDatabase, Sqlite};
    let mut db = ctx.db;
    let url = db.url().to_string();
    if let Err(e) = db.close().await {
        log::error!("🚀️ Failed to close database: {e}");
    }
    Sqlite::drop_database(&url).await.ok();
}

pub fn uid(s: &str) -> UserId {
    UserId(s.to_string())
}

/// Registers the named users and creates a group owned by the first, with the rest as plain members.
pub async fn group_of(ctx: &TestContext, name: &str, members: &[&str]) -> GroupId {
    for member in members {
        ctx.users
            .upsert_user(NewUser {
                id: Some(uid(member)),
                name: member.to_string(),
                email: format!("{member}@example.com"),
            })
            .await
            .expect("Error registering user");
    }
    let owner = uid(members[0]);
    let group = ctx.groups.create_group(&owner, NewGroup { name: name.to_string() }).await.expect("Error creating group");
    for member in &members[1..] {
        ctx.groups
            .add_member(&group.id, &owner, &uid(member), MemberRole::Member)
            .await
            .expect("Error adding member");
    }
    group.id
}

/// An expense paid by `paid_by`, split over `(user, cents)` pairs.
pub fn expense_of(paid_by: &str, description: &str, cents: i64, splits: &[(&str, i64)]) -> NewExpense {
    let mut expense = NewExpense::new(uid(paid_by), description, Money::from_cents(cents));
    for (user, owed) in splits {
        expense = expense.with_split(uid(user), Money::from_cents(*owed));
    }
    expense
}
