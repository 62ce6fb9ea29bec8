mod channel;
mod event_types;
mod hooks;
mod registry;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
pub use registry::SubscriberRegistry;
