//! Endpoint tests: the expense-sharing flow driven through the HTTP surface against a real sqlite store.

use actix_web::{http::StatusCode, test, web, App};
use serde_json::{json, Value};
use split_engine::{
    db_types::UserId,
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    ExpenseFlowApi,
    GroupApi,
    SettlementApi,
    SqliteDatabase,
    UserApi,
};
use split_server::{
    auth::TokenIssuer,
    config::AuthConfig,
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

macro_rules! test_app {
    ($db:expr, $issuer:expr) => {{
        let producers = EventProducers::default();
        test::init_service(
            App::new()
                .app_data(web::Data::new(ExpenseFlowApi::new($db.clone(), producers.clone())))
                .app_data(web::Data::new(SettlementApi::new($db.clone(), producers.clone())))
                .app_data(web::Data::new(GroupApi::new($db.clone())))
                .app_data(web::Data::new(UserApi::new($db.clone())))
                .app_data(web::Data::new($issuer.clone()))
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
                .service(UserSettlementSummaryRoute::<SqliteDatabase>::new())
                .service(SettlementDetailRoute::<SqliteDatabase>::new())
                .service(MarkSettlementPaidRoute::<SqliteDatabase>::new()),
        )
        .await
    }};
}

async fn setup_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

fn issuer() -> TokenIssuer {
    TokenIssuer::new(&AuthConfig {
        jwt_secret: se_common_secret(),
        token_ttl: chrono::Duration::hours(1),
    })
}

fn se_common_secret() -> se_common::Secret<String> {
    se_common::Secret::new("endpoint-test-secret-endpoint-test-secret".to_string())
}

fn bearer(issuer: &TokenIssuer, user: &str) -> (&'static str, String) {
    let token = issuer.issue_token(&UserId(user.to_string()), None).expect("Error issuing token");
    ("Authorization", format!("Bearer {token}"))
}

#[actix_web::test]
async fn expense_flow_end_to_end() {
    let db = setup_db().await;
    let issuer = issuer();
    let app = test_app!(db, issuer);

    // Register two users.
    for (id, name) in [("alice", "Alice"), ("bob", "Bob")] {
        let req = test::TestRequest::post()
            .uri("/users")
            .set_json(json!({ "id": id, "name": name, "email": format!("{id}@example.com") }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    // Alice creates a group and adds Bob.
    let req = test::TestRequest::post()
        .uri("/groups")
        .insert_header(bearer(&issuer, "alice"))
        .set_json(json!({ "name": "flat 42" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let group: Value = test::read_body_json(resp).await;
    let group_id = group["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri(&format!("/groups/{group_id}/members"))
        .insert_header(bearer(&issuer, "alice"))
        .set_json(json!({ "user_id": "bob" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    // Alice logs a $30 expense split evenly. Amounts are integer cents.
    let req = test::TestRequest::post()
        .uri(&format!("/groups/{group_id}/expenses"))
        .insert_header(bearer(&issuer, "alice"))
        .set_json(json!({
            "description": "groceries",
            "amount": 3000,
            "splits": [
                { "user_id": "alice", "amount_owed": 1500 },
                { "user_id": "bob", "amount_owed": 1500 }
            ]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    // Bob's summary shows he owes $15.
    let req = test::TestRequest::get()
        .uri("/settlements/user")
        .insert_header(bearer(&issuer, "bob"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let summary: Value = test::read_body_json(resp).await;
    assert_eq!(summary["total_owing"], 1500);
    assert_eq!(summary["total_owed"], 0);
    assert_eq!(summary["net_balance"], -1500);
    let settlement_id = summary["settlements"][0]["id"].as_str().unwrap().to_string();

    // Alice cannot mark Bob's debt as paid.
    let req = test::TestRequest::patch()
        .uri(&format!("/settlements/{settlement_id}/paid"))
        .insert_header(bearer(&issuer, "alice"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Bob settles up; afterwards nothing is pending and the paid row remains.
    let req = test::TestRequest::patch()
        .uri(&format!("/settlements/{settlement_id}/paid"))
        .insert_header(bearer(&issuer, "bob"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/groups/{group_id}/settlements"))
        .insert_header(bearer(&issuer, "bob"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let settlements: Value = test::read_body_json(resp).await;
    let statuses: Vec<&str> = settlements.as_array().unwrap().iter().map(|s| s["status"].as_str().unwrap()).collect();
    assert_eq!(statuses, vec!["Paid"]);

    // Paying twice is a conflict.
    let req = test::TestRequest::patch()
        .uri(&format!("/settlements/{settlement_id}/paid"))
        .insert_header(bearer(&issuer, "bob"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn membership_gates_group_access() {
    let db = setup_db().await;
    let issuer = issuer();
    let app = test_app!(db, issuer);

    for (id, name) in [("alice", "Alice"), ("mallory", "Mallory")] {
        let req = test::TestRequest::post()
            .uri("/users")
            .set_json(json!({ "id": id, "name": name, "email": format!("{id}@example.com") }))
            .to_request();
        test::call_service(&app, req).await;
    }
    let req = test::TestRequest::post()
        .uri("/groups")
        .insert_header(bearer(&issuer, "alice"))
        .set_json(json!({ "name": "private" }))
        .to_request();
    let group: Value = test::read_body_json(test::call_service(&app, req).await).await;
    let group_id = group["id"].as_str().unwrap();

    // A non-member cannot read the group or its expenses.
    let req = test::TestRequest::get()
        .uri(&format!("/groups/{group_id}"))
        .insert_header(bearer(&issuer, "mallory"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    // Plain members cannot add other members.
    let req = test::TestRequest::post()
        .uri(&format!("/groups/{group_id}/members"))
        .insert_header(bearer(&issuer, "mallory"))
        .set_json(json!({ "user_id": "mallory" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn requests_without_a_token_are_unauthorized() {
    let db = setup_db().await;
    let issuer = issuer();
    let app = test_app!(db, issuer);

    let req = test::TestRequest::get().uri("/groups").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/groups")
        .insert_header(("Authorization", "Bearer not-a-real-token"))
        .to_request();
    let status = test::call_service(&app, req).await.status();
    assert!(status == StatusCode::UNAUTHORIZED || status == StatusCode::BAD_REQUEST);

    // Health stays open.
    let req = test::TestRequest::get().uri("/health").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn explicit_recompute_endpoint_rebuilds_pending_settlements() {
    let db = setup_db().await;
    let issuer = issuer();
    let app = test_app!(db, issuer);

    for (id, name) in [("alice", "Alice"), ("bob", "Bob")] {
        let req = test::TestRequest::post()
            .uri("/users")
            .set_json(json!({ "id": id, "name": name, "email": format!("{id}@example.com") }))
            .to_request();
        test::call_service(&app, req).await;
    }
    let req = test::TestRequest::post()
        .uri("/groups")
        .insert_header(bearer(&issuer, "alice"))
        .set_json(json!({ "name": "tab" }))
        .to_request();
    let group: Value = test::read_body_json(test::call_service(&app, req).await).await;
    let group_id = group["id"].as_str().unwrap();

    let req = test::TestRequest::post()
        .uri(&format!("/groups/{group_id}/members"))
        .insert_header(bearer(&issuer, "alice"))
        .set_json(json!({ "user_id": "bob" }))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::post()
        .uri(&format!("/groups/{group_id}/expenses"))
        .insert_header(bearer(&issuer, "alice"))
        .set_json(json!({
            "description": "lunch",
            "amount": 1000,
            "splits": [{ "user_id": "bob", "amount_owed": 1000 }]
        }))
        .to_request();
    test::call_service(&app, req).await;

    // Recompute twice; the pending set is stable (idempotence over the HTTP surface).
    let mut shapes = Vec::new();
    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri(&format!("/groups/{group_id}/settlements/recompute"))
            .insert_header(bearer(&issuer, "alice"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let pending: Value = test::read_body_json(resp).await;
        let shape: Vec<(String, String, i64)> = pending
            .as_array()
            .unwrap()
            .iter()
            .map(|s| {
                (
                    s["from_user_id"].as_str().unwrap().to_string(),
                    s["to_user_id"].as_str().unwrap().to_string(),
                    s["amount"].as_i64().unwrap(),
                )
            })
            .collect();
        shapes.push(shape);
    }
    assert_eq!(shapes[0], shapes[1]);
    assert_eq!(shapes[0], vec![("bob".to_string(), "alice".to_string(), 1000)]);
}
