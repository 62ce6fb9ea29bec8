//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause
//! the current worker to stop processing new requests. For this reason, any long, non-cpu-bound operation (I/O,
//! database calls, the settlement recompute) is expressed as a future so worker threads stay free to interleave
//! other requests while one request is suspended on I/O.

use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use serde_json::json;
use split_engine::{
    db_types::{ExpenseId, ExpenseUpdate, GroupId, NewGroup, NewSplit, NewUser, SettlementId, SplitId},
    ExpenseFlowApi,
    GroupApi,
    GroupManagement,
    LedgerDatabase,
    SettlementApi,
    UserApi,
    UserManagement,
};

use crate::{
    auth::JwtClaims,
    data_objects::{
        AddMemberRequest,
        GroupDetailResponse,
        JsonResponse,
        NewExpenseRequest,
        NewGroupRequest,
        NewSplitRequest,
        RegisterUserRequest,
        SearchQuery,
        SummaryQuery,
        UpdateExpenseRequest,
        UpdateGroupRequest,
        UpdateSplitRequest,
    },
    errors::ServerError,
};

// Actix cannot handle generics in handlers, so the registration is implemented manually with the `route!` macro:
// each invocation generates a unit struct implementing `HttpServiceFactory` for a generic backend `B`.
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:path),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<B>(core::marker::PhantomData<fn() -> B>); }
        paste::paste! {
            impl<B> [<$name:camel Route>]<B> {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self {
                    Self(core::marker::PhantomData)
                }
            }
        }
        paste::paste! {
            impl<B> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<B>
            where B: $($bounds +)+ 'static
            {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name::<B>);
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };
}

// ----------------------------------------------   Health   ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

// ----------------------------------------------   Users   -----------------------------------------------------
route!(register_user => Post "/users" impl UserManagement);
/// Registers (or refreshes) a user record. This is the seam to the external identity provider: it owns credentials
/// and sessions, and pushes the user records the engine needs for membership and notifications through here.
pub async fn register_user<B: UserManagement>(
    body: web::Json<RegisterUserRequest>,
    api: web::Data<UserApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let body = body.into_inner();
    let user = api.upsert_user(NewUser { id: body.id, name: body.name, email: body.email }).await?;
    Ok(HttpResponse::Created().json(user))
}

route!(search_users => Get "/users/search" impl UserManagement);
pub async fn search_users<B: UserManagement>(
    claims: JwtClaims,
    query: web::Query<SearchQuery>,
    api: web::Data<UserApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET user search by {}", claims.user_id());
    let users = api.search(&query.q).await?;
    let count = users.len();
    Ok(HttpResponse::Ok().json(json!({ "users": users, "count": count })))
}

// ----------------------------------------------   Groups   ----------------------------------------------------
route!(create_group => Post "/groups" impl GroupManagement, UserManagement);
pub async fn create_group<B: GroupManagement + UserManagement>(
    claims: JwtClaims,
    body: web::Json<NewGroupRequest>,
    api: web::Data<GroupApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let group = api.create_group(claims.user_id(), NewGroup { name: body.into_inner().name }).await?;
    Ok(HttpResponse::Created().json(group))
}

route!(my_groups => Get "/groups" impl GroupManagement, UserManagement);
pub async fn my_groups<B: GroupManagement + UserManagement>(
    claims: JwtClaims,
    api: web::Data<GroupApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let groups = api.groups_for_user(claims.user_id()).await?;
    Ok(HttpResponse::Ok().json(groups))
}

route!(group_detail => Get "/groups/{group_id}" impl LedgerDatabase, GroupManagement, UserManagement);
pub async fn group_detail<B: LedgerDatabase + GroupManagement + UserManagement>(
    claims: JwtClaims,
    path: web::Path<GroupId>,
    groups: web::Data<GroupApi<B>>,
    expenses: web::Data<ExpenseFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let group_id = path.into_inner();
    groups.require_member(&group_id, claims.user_id()).await?;
    let group = groups.group(&group_id).await?;
    let members = groups.members(&group_id).await?;
    let expenses = expenses.group_expenses(&group_id).await?;
    Ok(HttpResponse::Ok().json(GroupDetailResponse { group, members, expenses }))
}

route!(update_group => Put "/groups/{group_id}" impl GroupManagement, UserManagement);
pub async fn update_group<B: GroupManagement + UserManagement>(
    claims: JwtClaims,
    path: web::Path<GroupId>,
    body: web::Json<UpdateGroupRequest>,
    api: web::Data<GroupApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let group = api.update_group(&path.into_inner(), claims.user_id(), &body.name).await?;
    Ok(HttpResponse::Ok().json(group))
}

route!(delete_group => Delete "/groups/{group_id}" impl GroupManagement, UserManagement);
pub async fn delete_group<B: GroupManagement + UserManagement>(
    claims: JwtClaims,
    path: web::Path<GroupId>,
    api: web::Data<GroupApi<B>>,
) -> Result<HttpResponse, ServerError> {
    api.delete_group(&path.into_inner(), claims.user_id()).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Group deleted successfully")))
}

route!(add_member => Post "/groups/{group_id}/members" impl GroupManagement, UserManagement);
pub async fn add_member<B: GroupManagement + UserManagement>(
    claims: JwtClaims,
    path: web::Path<GroupId>,
    body: web::Json<AddMemberRequest>,
    api: web::Data<GroupApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let body = body.into_inner();
    let member = api.add_member(&path.into_inner(), claims.user_id(), &body.user_id, body.role).await?;
    Ok(HttpResponse::Created().json(member))
}

// ----------------------------------------------   Expenses   --------------------------------------------------
route!(group_expenses => Get "/groups/{group_id}/expenses" impl LedgerDatabase, GroupManagement, UserManagement);
pub async fn group_expenses<B: LedgerDatabase + GroupManagement + UserManagement>(
    claims: JwtClaims,
    path: web::Path<GroupId>,
    groups: web::Data<GroupApi<B>>,
    api: web::Data<ExpenseFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let group_id = path.into_inner();
    groups.require_member(&group_id, claims.user_id()).await?;
    let expenses = api.group_expenses(&group_id).await?;
    Ok(HttpResponse::Ok().json(expenses))
}

route!(create_expense => Post "/groups/{group_id}/expenses" impl LedgerDatabase, GroupManagement, UserManagement);
pub async fn create_expense<B: LedgerDatabase + GroupManagement + UserManagement>(
    claims: JwtClaims,
    path: web::Path<GroupId>,
    body: web::Json<NewExpenseRequest>,
    groups: web::Data<GroupApi<B>>,
    api: web::Data<ExpenseFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let group_id = path.into_inner();
    groups.require_member(&group_id, claims.user_id()).await?;
    let expense = body.into_inner().into_new_expense(claims.user_id());
    let stored = api.create_expense(&group_id, claims.user_id(), expense).await?;
    Ok(HttpResponse::Created().json(stored))
}

route!(expense_detail => Get "/groups/{group_id}/expenses/{expense_id}" impl LedgerDatabase, GroupManagement, UserManagement);
pub async fn expense_detail<B: LedgerDatabase + GroupManagement + UserManagement>(
    claims: JwtClaims,
    path: web::Path<(GroupId, ExpenseId)>,
    groups: web::Data<GroupApi<B>>,
    api: web::Data<ExpenseFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (group_id, expense_id) = path.into_inner();
    groups.require_member(&group_id, claims.user_id()).await?;
    let expense = api
        .expense(&group_id, &expense_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Expense {expense_id} not found")))?;
    Ok(HttpResponse::Ok().json(expense))
}

route!(update_expense => Put "/groups/{group_id}/expenses/{expense_id}" impl LedgerDatabase, GroupManagement, UserManagement);
pub async fn update_expense<B: LedgerDatabase + GroupManagement + UserManagement>(
    claims: JwtClaims,
    path: web::Path<(GroupId, ExpenseId)>,
    body: web::Json<UpdateExpenseRequest>,
    groups: web::Data<GroupApi<B>>,
    api: web::Data<ExpenseFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (group_id, expense_id) = path.into_inner();
    groups.require_member(&group_id, claims.user_id()).await?;
    let body = body.into_inner();
    let update = ExpenseUpdate { description: body.description, amount: body.amount };
    let expense = api.update_expense(&group_id, &expense_id, claims.user_id(), update).await?;
    Ok(HttpResponse::Ok().json(expense))
}

route!(delete_expense => Delete "/groups/{group_id}/expenses/{expense_id}" impl LedgerDatabase, GroupManagement, UserManagement);
/// Only the member who logged the expense (its payer) or a group admin may delete it.
pub async fn delete_expense<B: LedgerDatabase + GroupManagement + UserManagement>(
    claims: JwtClaims,
    path: web::Path<(GroupId, ExpenseId)>,
    groups: web::Data<GroupApi<B>>,
    api: web::Data<ExpenseFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (group_id, expense_id) = path.into_inner();
    let membership = groups.require_member(&group_id, claims.user_id()).await?;
    let expense = api
        .expense(&group_id, &expense_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Expense {expense_id} not found")))?;
    let is_creator = &expense.expense.paid_by_id == claims.user_id();
    if !membership.role.is_admin() && !is_creator {
        return Err(ServerError::InsufficientPermissions(
            "Only the expense creator or a group admin can delete an expense".to_string(),
        ));
    }
    api.delete_expense(&group_id, &expense_id, claims.user_id()).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Expense deleted successfully")))
}

// ----------------------------------------------   Splits   ----------------------------------------------------
route!(add_split => Post "/groups/{group_id}/expenses/{expense_id}/splits" impl LedgerDatabase, GroupManagement, UserManagement);
pub async fn add_split<B: LedgerDatabase + GroupManagement + UserManagement>(
    claims: JwtClaims,
    path: web::Path<(GroupId, ExpenseId)>,
    body: web::Json<NewSplitRequest>,
    groups: web::Data<GroupApi<B>>,
    api: web::Data<ExpenseFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (group_id, expense_id) = path.into_inner();
    groups.require_member(&group_id, claims.user_id()).await?;
    let body = body.into_inner();
    let split = NewSplit { user_id: body.user_id, amount_owed: body.amount_owed };
    let stored = api.add_split(&group_id, &expense_id, claims.user_id(), split).await?;
    Ok(HttpResponse::Created().json(stored))
}

route!(update_split => Put "/groups/{group_id}/expenses/{expense_id}/splits/{split_id}" impl LedgerDatabase, GroupManagement, UserManagement);
pub async fn update_split<B: LedgerDatabase + GroupManagement + UserManagement>(
    claims: JwtClaims,
    path: web::Path<(GroupId, ExpenseId, SplitId)>,
    body: web::Json<UpdateSplitRequest>,
    groups: web::Data<GroupApi<B>>,
    api: web::Data<ExpenseFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (group_id, _expense_id, split_id) = path.into_inner();
    groups.require_member(&group_id, claims.user_id()).await?;
    let split = api.update_split(&group_id, &split_id, claims.user_id(), body.amount_owed).await?;
    Ok(HttpResponse::Ok().json(split))
}

route!(delete_split => Delete "/groups/{group_id}/expenses/{expense_id}/splits/{split_id}" impl LedgerDatabase, GroupManagement, UserManagement);
pub async fn delete_split<B: LedgerDatabase + GroupManagement + UserManagement>(
    claims: JwtClaims,
    path: web::Path<(GroupId, ExpenseId, SplitId)>,
    groups: web::Data<GroupApi<B>>,
    api: web::Data<ExpenseFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (group_id, _expense_id, split_id) = path.into_inner();
    groups.require_member(&group_id, claims.user_id()).await?;
    api.delete_split(&group_id, &split_id, claims.user_id()).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Expense split deleted successfully")))
}

// ----------------------------------------------   Settlements   -----------------------------------------------
route!(group_settlements => Get "/groups/{group_id}/settlements" impl LedgerDatabase, GroupManagement, UserManagement);
pub async fn group_settlements<B: LedgerDatabase + GroupManagement + UserManagement>(
    claims: JwtClaims,
    path: web::Path<GroupId>,
    groups: web::Data<GroupApi<B>>,
    api: web::Data<SettlementApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let group_id = path.into_inner();
    groups.require_member(&group_id, claims.user_id()).await?;
    let settlements = api.group_settlements(&group_id, None).await?;
    Ok(HttpResponse::Ok().json(settlements))
}

route!(recompute_group_settlements => Post "/groups/{group_id}/settlements/recompute" impl LedgerDatabase, GroupManagement, UserManagement);
/// Explicit recompute trigger: regenerates the group's pending settlements from the current ledger. The usual path
/// is the automatic refresh after each ledger mutation; this endpoint exists to recover from a refresh that failed.
pub async fn recompute_group_settlements<B: LedgerDatabase + GroupManagement + UserManagement>(
    claims: JwtClaims,
    path: web::Path<GroupId>,
    groups: web::Data<GroupApi<B>>,
    api: web::Data<ExpenseFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let group_id = path.into_inner();
    groups.require_member(&group_id, claims.user_id()).await?;
    let pending = api.recompute_settlements(&group_id).await?;
    Ok(HttpResponse::Ok().json(pending))
}

route!(user_settlement_summary => Get "/settlements/user" impl LedgerDatabase);
pub async fn user_settlement_summary<B: LedgerDatabase>(
    claims: JwtClaims,
    query: web::Query<SummaryQuery>,
    api: web::Data<SettlementApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET settlement summary for {}", claims.user_id());
    let summary = api.user_settlement_summary(claims.user_id(), query.group_id.as_ref()).await?;
    Ok(HttpResponse::Ok().json(summary))
}

route!(settlement_detail => Get "/settlements/{settlement_id}" impl LedgerDatabase);
pub async fn settlement_detail<B: LedgerDatabase>(
    claims: JwtClaims,
    path: web::Path<SettlementId>,
    api: web::Data<SettlementApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let settlement = api.settlement_detail(&path.into_inner(), claims.user_id()).await?;
    Ok(HttpResponse::Ok().json(settlement))
}

route!(mark_settlement_paid => Patch "/settlements/{settlement_id}/paid" impl LedgerDatabase);
/// The debtor marks their settlement as paid, then the group's pending set is refreshed so the discharged amount
/// nets out. The refresh is best-effort: the payment has already been recorded, and a stale pending set heals on
/// the next recompute.
pub async fn mark_settlement_paid<B: LedgerDatabase>(
    claims: JwtClaims,
    path: web::Path<SettlementId>,
    api: web::Data<SettlementApi<B>>,
    expenses: web::Data<ExpenseFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let settlement_id = path.into_inner();
    let paid = api.mark_paid(&settlement_id, claims.user_id()).await?;
    if let Err(e) = expenses.recompute_settlements(&paid.group_id).await {
        warn!("💻️ Settlement recompute after payment of {settlement_id} failed: {e}");
    }
    Ok(HttpResponse::Ok().json(paid))
}
