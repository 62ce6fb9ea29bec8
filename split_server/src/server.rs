use std::{sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use futures::FutureExt;
use log::*;
use split_engine::{
    events::{EngineEvent, EventHooks, EventProducers, SubscriberRegistry},
    ExpenseFlowApi,
    GroupApi,
    SettlementApi,
    SqliteDatabase,
    UserApi,
};

use crate::{
    auth::TokenIssuer,
    config::ServerConfig,
    errors::ServerError,
    mailer::{EmailNotifier, LoggingTransport},
    routes::{
        health,
        AddMemberRoute,
        AddSplitRoute,
        CreateExpenseRoute,
        CreateGroupRoute,
        DeleteExpenseRoute,
        DeleteGroupRoute,
        DeleteSplitRoute,
        ExpenseDetailRoute,
        GroupDetailRoute,
        GroupExpensesRoute,
        GroupSettlementsRoute,
        MarkSettlementPaidRoute,
        MyGroupsRoute,
        RecomputeGroupSettlementsRoute,
        RegisterUserRoute,
        SearchUsersRoute,
        SettlementDetailRoute,
        UpdateExpenseRoute,
        UpdateGroupRoute,
        UpdateSplitRoute,
        UserSettlementSummaryRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let registry = SubscriberRegistry::new();
    let producers = start_event_handlers(&config, db.clone(), registry).await;
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Wires the engine's event hooks: expense changes drive notification emails, recomputes are fanned out to each
/// affected user's live subscriptions. Both run on their own tasks, off the request path.
pub async fn start_event_handlers(
    config: &ServerConfig,
    db: SqliteDatabase,
    registry: SubscriberRegistry,
) -> EventProducers {
    let notifier = Arc::new(EmailNotifier::new(db, LoggingTransport));
    let mut hooks = EventHooks::default();
    hooks.on_expense_changed(move |event| {
        let notifier = Arc::clone(&notifier);
        async move {
            notifier.notify_expense_changed(event).await;
        }
        .boxed()
    });
    hooks.on_settlements_recomputed(move |event| {
        let registry = registry.clone();
        async move {
            let participants = event.participants();
            registry.notify_many(&participants, EngineEvent::SettlementsRecomputed(event)).await;
        }
        .boxed()
    });
    let handlers = split_engine::events::EventHandlers::new(config.event_buffer_size, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;
    producers
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let expenses_api = ExpenseFlowApi::new(db.clone(), producers.clone());
        let settlements_api = SettlementApi::new(db.clone(), producers.clone());
        let groups_api = GroupApi::new(db.clone());
        let users_api = UserApi::new(db.clone());
        let jwt_signer = TokenIssuer::new(&config.auth);
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("spe::access_log"))
            .app_data(web::Data::new(expenses_api))
            .app_data(web::Data::new(settlements_api))
            .app_data(web::Data::new(groups_api))
            .app_data(web::Data::new(users_api))
            .app_data(web::Data::new(jwt_signer))
            .service(health)
            .service(RegisterUserRoute::<SqliteDatabase>::new())
            .service(SearchUsersRoute::<SqliteDatabase>::new())
            .service(CreateGroupRoute::<SqliteDatabase>::new())
            .service(MyGroupsRoute::<SqliteDatabase>::new())
            .service(GroupDetailRoute::<SqliteDatabase>::new())
            .service(UpdateGroupRoute::<SqliteDatabase>::new())
            .service(DeleteGroupRoute::<SqliteDatabase>::new())
            .service(AddMemberRoute::<SqliteDatabase>::new())
            .service(GroupExpensesRoute::<SqliteDatabase>::new())
            .service(CreateExpenseRoute::<SqliteDatabase>::new())
            .service(ExpenseDetailRoute::<SqliteDatabase>::new())
            .service(UpdateExpenseRoute::<SqliteDatabase>::new())
            .service(DeleteExpenseRoute::<SqliteDatabase>::new())
            .service(AddSplitRoute::<SqliteDatabase>::new())
            .service(UpdateSplitRoute::<SqliteDatabase>::new())
            .service(DeleteSplitRoute::<SqliteDatabase>::new())
            .service(GroupSettlementsRoute::<SqliteDatabase>::new())
            .service(RecomputeGroupSettlementsRoute::<SqliteDatabase>::new())
            // `/settlements/user` must be registered ahead of `/settlements/{settlement_id}`
            .service(UserSettlementSummaryRoute::<SqliteDatabase>::new())
            .service(SettlementDetailRoute::<SqliteDatabase>::new())
            .service(MarkSettlementPaidRoute::<SqliteDatabase>::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    info!("💻️ Server instance created on {host}:{port}");
    Ok(srv)
}
