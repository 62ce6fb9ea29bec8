//! Verifies that the engine's event hooks fire on ledger mutations and recomputes.

mod support;

use std::sync::{
    atomic::{AtomicI32, Ordering},
    Arc,
};

use futures_util::FutureExt;
use log::*;
use split_engine::{
    events::{EventHandlers, EventHooks},
    ExpenseFlowApi,
};

use support::{expense_of, group_of, setup, tear_down, uid};

#[derive(Default, Clone)]
struct HookCalled {
    called: Arc<AtomicI32>,
}

impl HookCalled {
    pub fn called(&self) {
        let _ = self.called.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> i32 {
        self.called.load(Ordering::Relaxed)
    }
}

#[tokio::test]
async fn expense_and_recompute_hooks_fire() {
    let expense_events = HookCalled::default();
    let recompute_events = HookCalled::default();
    let e2 = expense_events.clone();
    let r2 = recompute_events.clone();

    let mut hooks = EventHooks::default();
    hooks.on_expense_changed(move |event| {
        info!("🪝️ {event:?}");
        e2.called();
        async {}.boxed()
    });
    hooks.on_settlements_recomputed(move |event| {
        info!("🪝️ recompute produced {} pending settlements", event.pending.len());
        r2.called();
        async {}.boxed()
    });
    let handlers = EventHandlers::new(10, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let ctx = setup().await;
    let group = group_of(&ctx, "hooked", &["alice", "bob"]).await;
    let api = ExpenseFlowApi::new(ctx.db.clone(), producers);

    let stored = api
        .create_expense(&group, &uid("alice"), expense_of("alice", "pizza", 2000, &[("bob", 1000), ("alice", 1000)]))
        .await
        .expect("Error creating expense");
    api.delete_expense(&group, &stored.expense.id, &uid("alice")).await.expect("Error deleting expense");

    // Handlers run on spawned tasks; give them a moment to drain.
    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;
    assert_eq!(expense_events.count(), 2, "created + deleted");
    assert_eq!(recompute_events.count(), 2, "one recompute per mutation");
    tear_down(ctx).await;
}
