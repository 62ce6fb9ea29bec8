use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    EventHandler,
    EventProducer,
    ExpenseChangedEvent,
    Handler,
    SettlementPaidEvent,
    SettlementsRecomputedEvent,
};

/// The producer ends of every registered hook. Cloned into each API that emits events.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub expense_changed_producer: Vec<EventProducer<ExpenseChangedEvent>>,
    pub settlements_recomputed_producer: Vec<EventProducer<SettlementsRecomputedEvent>>,
    pub settlement_paid_producer: Vec<EventProducer<SettlementPaidEvent>>,
}

pub struct EventHandlers {
    pub on_expense_changed: Option<EventHandler<ExpenseChangedEvent>>,
    pub on_settlements_recomputed: Option<EventHandler<SettlementsRecomputedEvent>>,
    pub on_settlement_paid: Option<EventHandler<SettlementPaidEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_expense_changed = hooks.on_expense_changed.map(|f| EventHandler::new(buffer_size, f));
        let on_settlements_recomputed = hooks.on_settlements_recomputed.map(|f| EventHandler::new(buffer_size, f));
        let on_settlement_paid = hooks.on_settlement_paid.map(|f| EventHandler::new(buffer_size, f));
        Self { on_expense_changed, on_settlements_recomputed, on_settlement_paid }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_expense_changed {
            result.expense_changed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_settlements_recomputed {
            result.settlements_recomputed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_settlement_paid {
            result.settlement_paid_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_expense_changed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_settlements_recomputed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_settlement_paid {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_expense_changed: Option<Handler<ExpenseChangedEvent>>,
    pub on_settlements_recomputed: Option<Handler<SettlementsRecomputedEvent>>,
    pub on_settlement_paid: Option<Handler<SettlementPaidEvent>>,
}

impl EventHooks {
    pub fn on_expense_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(ExpenseChangedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_expense_changed = Some(Arc::new(f));
        self
    }

    pub fn on_settlements_recomputed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(SettlementsRecomputedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_settlements_recomputed = Some(Arc::new(f));
        self
    }

    pub fn on_settlement_paid<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(SettlementPaidEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_settlement_paid = Some(Arc::new(f));
        self
    }
}
