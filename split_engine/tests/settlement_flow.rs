//! End-to-end settlement behaviour against a real sqlite store: the acceptance scenarios for the expense-sharing
//! flow, plus the idempotence and paid-preservation guarantees the recompute protocol makes.

mod support;

use se_common::Money;
use split_engine::db_types::{ExpenseUpdate, SettlementStatus};

use support::{expense_of, group_of, setup, tear_down, uid};

#[tokio::test]
async fn single_expense_creates_one_pending_settlement() {
    let ctx = setup().await;
    let group = group_of(&ctx, "flat 42", &["alice", "bob"]).await;

    // Alice fronts $30, split evenly.
    ctx.expenses
        .create_expense(&group, &uid("alice"), expense_of("alice", "groceries", 3000, &[
            ("alice", 1500),
            ("bob", 1500),
        ]))
        .await
        .expect("Error creating expense");

    let pending = ctx.settlements.group_settlements(&group, Some(SettlementStatus::Pending)).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].from_user_id, uid("bob"));
    assert_eq!(pending[0].to_user_id, uid("alice"));
    assert_eq!(pending[0].amount, Money::from_cents(1500));
    tear_down(ctx).await;
}

#[tokio::test]
async fn cross_expenses_net_to_one_transfer() {
    let ctx = setup().await;
    let group = group_of(&ctx, "roadtrip", &["alice", "bob"]).await;

    ctx.expenses
        .create_expense(&group, &uid("alice"), expense_of("alice", "fuel", 3000, &[("alice", 1500), ("bob", 1500)]))
        .await
        .unwrap();
    ctx.expenses
        .create_expense(&group, &uid("bob"), expense_of("bob", "snacks", 1500, &[("bob", 750), ("alice", 750)]))
        .await
        .unwrap();

    let pending = ctx.settlements.group_settlements(&group, Some(SettlementStatus::Pending)).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].from_user_id, uid("bob"));
    assert_eq!(pending[0].to_user_id, uid("alice"));
    assert_eq!(pending[0].amount, Money::from_cents(750));
    tear_down(ctx).await;
}

#[tokio::test]
async fn paying_a_settlement_clears_the_group() {
    let ctx = setup().await;
    let group = group_of(&ctx, "dinner club", &["alice", "bob"]).await;

    ctx.expenses
        .create_expense(&group, &uid("alice"), expense_of("alice", "fuel", 3000, &[("alice", 1500), ("bob", 1500)]))
        .await
        .unwrap();
    ctx.expenses
        .create_expense(&group, &uid("bob"), expense_of("bob", "snacks", 1500, &[("bob", 750), ("alice", 750)]))
        .await
        .unwrap();

    let pending = ctx.settlements.group_settlements(&group, Some(SettlementStatus::Pending)).await.unwrap();
    let paid = ctx.settlements.mark_paid(&pending[0].id, &uid("bob")).await.expect("Error marking settlement paid");
    assert_eq!(paid.status, SettlementStatus::Paid);

    // The paid transfer is folded in as a discharged balance, so the next recompute leaves nothing pending.
    ctx.expenses.recompute_settlements(&group).await.unwrap();
    let pending = ctx.settlements.group_settlements(&group, Some(SettlementStatus::Pending)).await.unwrap();
    assert!(pending.is_empty());

    // And the paid row itself survives as a historical fact.
    let all = ctx.settlements.group_settlements(&group, None).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].status, SettlementStatus::Paid);
    assert_eq!(all[0].amount, Money::from_cents(750));
    tear_down(ctx).await;
}

#[tokio::test]
async fn three_way_split_produces_two_transfers() {
    let ctx = setup().await;
    let group = group_of(&ctx, "ski trip", &["alice", "bob", "carol"]).await;

    // Alice pays $60 split three ways: alice +40, bob -20, carol -20.
    ctx.expenses
        .create_expense(&group, &uid("alice"), expense_of("alice", "cabin", 6000, &[
            ("alice", 2000),
            ("bob", 2000),
            ("carol", 2000),
        ]))
        .await
        .unwrap();

    let mut pending = ctx.settlements.group_settlements(&group, Some(SettlementStatus::Pending)).await.unwrap();
    pending.sort_by(|a, b| a.from_user_id.as_str().cmp(b.from_user_id.as_str()));
    assert_eq!(pending.len(), 2);
    assert_eq!((pending[0].from_user_id.as_str(), pending[0].amount), ("bob", Money::from_cents(2000)));
    assert_eq!((pending[1].from_user_id.as_str(), pending[1].amount), ("carol", Money::from_cents(2000)));
    assert!(pending.iter().all(|s| s.to_user_id == uid("alice")));
    tear_down(ctx).await;
}

#[tokio::test]
async fn recompute_is_idempotent() {
    let ctx = setup().await;
    let group = group_of(&ctx, "book club", &["alice", "bob", "carol"]).await;
    ctx.expenses
        .create_expense(&group, &uid("alice"), expense_of("alice", "books", 2100, &[
            ("alice", 700),
            ("bob", 700),
            ("carol", 700),
        ]))
        .await
        .unwrap();

    let first = ctx.expenses.recompute_settlements(&group).await.unwrap();
    let second = ctx.expenses.recompute_settlements(&group).await.unwrap();

    let shape = |s: &split_engine::db_types::Settlement| {
        (s.from_user_id.clone(), s.to_user_id.clone(), s.amount, s.status)
    };
    assert_eq!(first.iter().map(shape).collect::<Vec<_>>(), second.iter().map(shape).collect::<Vec<_>>());
    tear_down(ctx).await;
}

#[tokio::test]
async fn paid_settlements_survive_recomputes_untouched() {
    let ctx = setup().await;
    let group = group_of(&ctx, "tab", &["alice", "bob"]).await;
    ctx.expenses
        .create_expense(&group, &uid("alice"), expense_of("alice", "round one", 2000, &[("bob", 1000), ("alice", 1000)]))
        .await
        .unwrap();
    let pending = ctx.settlements.group_settlements(&group, Some(SettlementStatus::Pending)).await.unwrap();
    let paid = ctx.settlements.mark_paid(&pending[0].id, &uid("bob")).await.unwrap();

    for _ in 0..3 {
        ctx.expenses.recompute_settlements(&group).await.unwrap();
    }
    ctx.expenses
        .create_expense(&group, &uid("bob"), expense_of("bob", "round two", 1000, &[("alice", 500), ("bob", 500)]))
        .await
        .unwrap();

    let survivor = ctx
        .settlements
        .settlement_detail(&paid.id, &uid("bob"))
        .await
        .expect("Paid settlement should still exist");
    assert_eq!(survivor.status, SettlementStatus::Paid);
    assert_eq!(survivor.amount, paid.amount);

    // Paying can't happen twice.
    let err = ctx.settlements.mark_paid(&paid.id, &uid("bob")).await.unwrap_err();
    assert!(matches!(err, split_engine::SettlementApiError::AlreadyPaid));
    tear_down(ctx).await;
}

#[tokio::test]
async fn only_the_debtor_can_mark_paid() {
    let ctx = setup().await;
    let group = group_of(&ctx, "tab", &["alice", "bob"]).await;
    ctx.expenses
        .create_expense(&group, &uid("alice"), expense_of("alice", "lunch", 1000, &[("bob", 1000)]))
        .await
        .unwrap();
    let pending = ctx.settlements.group_settlements(&group, Some(SettlementStatus::Pending)).await.unwrap();

    let err = ctx.settlements.mark_paid(&pending[0].id, &uid("alice")).await.unwrap_err();
    assert!(matches!(err, split_engine::SettlementApiError::NotYourDebt));
    tear_down(ctx).await;
}

#[tokio::test]
async fn editing_and_deleting_expenses_refreshes_pending_settlements() {
    let ctx = setup().await;
    let group = group_of(&ctx, "office", &["alice", "bob"]).await;
    let stored = ctx
        .expenses
        .create_expense(&group, &uid("alice"), expense_of("alice", "coffee", 1000, &[("bob", 1000)]))
        .await
        .unwrap();

    // Shrink bob's share via the split record.
    let split_id = stored.splits[0].id.clone();
    ctx.expenses.update_split(&group, &split_id, &uid("alice"), Money::from_cents(400)).await.unwrap();
    let pending = ctx.settlements.group_settlements(&group, Some(SettlementStatus::Pending)).await.unwrap();
    assert_eq!(pending[0].amount, Money::from_cents(400));

    // Deleting the expense cascades to its splits and empties the pending set.
    ctx.expenses.delete_expense(&group, &stored.expense.id, &uid("alice")).await.unwrap();
    let pending = ctx.settlements.group_settlements(&group, Some(SettlementStatus::Pending)).await.unwrap();
    assert!(pending.is_empty());
    tear_down(ctx).await;
}

#[tokio::test]
async fn expense_amount_edit_moves_the_payers_balance() {
    let ctx = setup().await;
    let group = group_of(&ctx, "office", &["alice", "bob"]).await;
    let stored = ctx
        .expenses
        .create_expense(&group, &uid("alice"), expense_of("alice", "team lunch", 2000, &[("bob", 1000), ("alice", 1000)]))
        .await
        .unwrap();

    ctx.expenses
        .update_expense(&group, &stored.expense.id, &uid("alice"), ExpenseUpdate {
            description: None,
            amount: Some(Money::from_cents(3000)),
        })
        .await
        .unwrap();

    // Alice now fronted $30 with only $10 owed by bob: bob still owes his $10 share.
    let pending = ctx.settlements.group_settlements(&group, Some(SettlementStatus::Pending)).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].from_user_id, uid("bob"));
    assert_eq!(pending[0].amount, Money::from_cents(1000));
    tear_down(ctx).await;
}

#[tokio::test]
async fn summary_aggregates_across_groups() {
    let ctx = setup().await;
    let tab = group_of(&ctx, "tab", &["alice", "bob"]).await;
    let trip = group_of(&ctx, "trip", &["bob", "alice"]).await;

    ctx.expenses
        .create_expense(&tab, &uid("alice"), expense_of("alice", "lunch", 1000, &[("bob", 1000)]))
        .await
        .unwrap();
    ctx.expenses
        .create_expense(&trip, &uid("bob"), expense_of("bob", "tolls", 600, &[("alice", 600)]))
        .await
        .unwrap();

    // Cross-group: bob owes 10.00 in "tab" and is owed 6.00 in "trip".
    let summary = ctx.settlements.user_settlement_summary(&uid("bob"), None).await.unwrap();
    assert_eq!(summary.total_owing, Money::from_cents(1000));
    assert_eq!(summary.total_owed, Money::from_cents(600));
    assert_eq!(summary.net_balance, Money::from_cents(-400));
    assert_eq!(summary.settlements.len(), 2);

    // Scoped to one group.
    let summary = ctx.settlements.user_settlement_summary(&uid("bob"), Some(&tab)).await.unwrap();
    assert_eq!(summary.total_owing, Money::from_cents(1000));
    assert_eq!(summary.total_owed, Money::ZERO);
    tear_down(ctx).await;
}

#[tokio::test]
async fn malformed_identifiers_are_rejected_before_any_work() {
    let ctx = setup().await;
    let bad_group = split_engine::db_types::GroupId("not a group".to_string());
    let err = ctx.expenses.recompute_settlements(&bad_group).await.unwrap_err();
    assert!(matches!(err, split_engine::ExpenseApiError::Validation(_)));
    tear_down(ctx).await;
}
