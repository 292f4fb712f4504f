use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    Actor, BrokerRequestId, ListingDraft, ListingEdit, ListingId, Role, UserId, UserPreferences,
};
use super::repository::{ListingStore, PaymentRecorder, PreferenceStore};
use super::service::{MarketplaceDesk, MarketplaceError};
use super::takeover::TakeoverResponse;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";
const DEFAULT_RECOMMENDATION_LIMIT: usize = 10;

type Desk<S, P, F> = State<Arc<MarketplaceDesk<S, P, F>>>;

/// Router exposing the marketplace operations. The gateway in front of it resolves the
/// caller and forwards it in the `x-actor-id` / `x-actor-role` headers.
pub fn marketplace_router<S, P, F>(desk: Arc<MarketplaceDesk<S, P, F>>) -> Router
where
    S: ListingStore + 'static,
    P: PaymentRecorder + 'static,
    F: PreferenceStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/listings",
            post(submit_handler::<S, P, F>).get(published_handler::<S, P, F>),
        )
        .route(
            "/api/v1/listings/review-queue",
            get(review_queue_handler::<S, P, F>),
        )
        .route(
            "/api/v1/listings/:listing_id",
            get(get_handler::<S, P, F>).patch(edit_handler::<S, P, F>),
        )
        .route(
            "/api/v1/listings/:listing_id/approve",
            post(approve_handler::<S, P, F>),
        )
        .route(
            "/api/v1/listings/:listing_id/reject",
            post(reject_handler::<S, P, F>),
        )
        .route(
            "/api/v1/listings/:listing_id/activate",
            post(activate_handler::<S, P, F>),
        )
        .route(
            "/api/v1/listings/:listing_id/complete",
            post(complete_handler::<S, P, F>),
        )
        .route(
            "/api/v1/listings/:listing_id/cancel",
            post(cancel_handler::<S, P, F>),
        )
        .route(
            "/api/v1/listings/:listing_id/report",
            post(report_handler::<S, P, F>),
        )
        .route(
            "/api/v1/listings/:listing_id/push",
            post(push_handler::<S, P, F>),
        )
        .route(
            "/api/v1/listings/:listing_id/payments",
            get(listing_payments_handler::<S, P, F>),
        )
        .route(
            "/api/v1/listings/:listing_id/broker-requests",
            post(takeover_request_handler::<S, P, F>),
        )
        .route(
            "/api/v1/listings/:listing_id/broker-requests/:request_id",
            patch(takeover_respond_handler::<S, P, F>),
        )
        .route(
            "/api/v1/listings/:listing_id/broker/payment",
            post(takeover_confirm_handler::<S, P, F>),
        )
        .route(
            "/api/v1/listings/:listing_id/broker",
            delete(takeover_unassign_handler::<S, P, F>),
        )
        .route(
            "/api/v1/preferences",
            put(save_preferences_handler::<S, P, F>).get(preferences_handler::<S, P, F>),
        )
        .route(
            "/api/v1/recommendations",
            get(recommend_for_handler::<S, P, F>).post(recommend_with_handler::<S, P, F>),
        )
        .route(
            "/api/v1/payments/summary",
            get(revenue_summary_handler::<S, P, F>),
        )
        .with_state(desk)
}

impl IntoResponse for MarketplaceError {
    fn into_response(self) -> Response {
        let status = match &self {
            MarketplaceError::ListingNotFound(_) | MarketplaceError::BrokerRequestNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            MarketplaceError::NotAuthorized { .. } => StatusCode::FORBIDDEN,
            MarketplaceError::InvalidTransition { .. }
            | MarketplaceError::AlreadyResolved(_)
            | MarketplaceError::AlreadyManaged { .. } => StatusCode::CONFLICT,
            MarketplaceError::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            MarketplaceError::Store(_)
            | MarketplaceError::Payment(_)
            | MarketplaceError::Preferences(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let payload = json!({
            "error": self.to_string(),
            "refresh": self.is_benign_conflict(),
        });
        (status, Json(payload)).into_response()
    }
}

/// Reads the caller forwarded by the gateway. No id means an anonymous guest; an id without
/// a role is a plain user.
pub(crate) fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, Response> {
    let id = headers
        .get(ACTOR_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    let role = headers
        .get(ACTOR_ROLE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    let Some(id) = id else {
        return Ok(Actor::new("anonymous", Role::Guest));
    };
    let role = match role {
        None => Role::User,
        Some(raw) => Role::parse(raw).ok_or_else(|| {
            let payload = json!({ "error": format!("unknown actor role '{raw}'") });
            (StatusCode::BAD_REQUEST, Json(payload)).into_response()
        })?,
    };
    Ok(Actor::new(id, role))
}

fn respond<T: serde::Serialize>(
    status: StatusCode,
    result: Result<T, MarketplaceError>,
) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(err) => err.into_response(),
    }
}

macro_rules! actor_or_return {
    ($headers:expr) => {
        match actor_from_headers(&$headers) {
            Ok(actor) => actor,
            Err(response) => return response,
        }
    };
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReasonPayload {
    #[serde(default)]
    pub(crate) reason: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TakeoverRequestPayload {
    pub(crate) broker_id: String,
    #[serde(default)]
    pub(crate) seller_name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TakeoverRespondPayload {
    pub(crate) response: TakeoverResponse,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LimitQuery {
    pub(crate) limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RangeQuery {
    pub(crate) start: DateTime<Utc>,
    pub(crate) end: DateTime<Utc>,
}

pub(crate) async fn submit_handler<S, P, F>(
    State(desk): Desk<S, P, F>,
    headers: HeaderMap,
    Json(draft): Json<ListingDraft>,
) -> Response
where
    S: ListingStore + 'static,
    P: PaymentRecorder + 'static,
    F: PreferenceStore + 'static,
{
    let actor = actor_or_return!(headers);
    respond(StatusCode::CREATED, desk.lifecycle().submit(&actor, draft))
}

pub(crate) async fn published_handler<S, P, F>(State(desk): Desk<S, P, F>) -> Response
where
    S: ListingStore + 'static,
    P: PaymentRecorder + 'static,
    F: PreferenceStore + 'static,
{
    respond(StatusCode::OK, desk.lifecycle().published())
}

pub(crate) async fn review_queue_handler<S, P, F>(
    State(desk): Desk<S, P, F>,
    headers: HeaderMap,
) -> Response
where
    S: ListingStore + 'static,
    P: PaymentRecorder + 'static,
    F: PreferenceStore + 'static,
{
    let actor = actor_or_return!(headers);
    respond(StatusCode::OK, desk.lifecycle().review_queue(&actor))
}

pub(crate) async fn get_handler<S, P, F>(
    State(desk): Desk<S, P, F>,
    Path(listing_id): Path<String>,
) -> Response
where
    S: ListingStore + 'static,
    P: PaymentRecorder + 'static,
    F: PreferenceStore + 'static,
{
    respond(StatusCode::OK, desk.lifecycle().get(&ListingId(listing_id)))
}

pub(crate) async fn edit_handler<S, P, F>(
    State(desk): Desk<S, P, F>,
    headers: HeaderMap,
    Path(listing_id): Path<String>,
    Json(edit): Json<ListingEdit>,
) -> Response
where
    S: ListingStore + 'static,
    P: PaymentRecorder + 'static,
    F: PreferenceStore + 'static,
{
    let actor = actor_or_return!(headers);
    respond(
        StatusCode::OK,
        desk.lifecycle().edit(&actor, &ListingId(listing_id), edit),
    )
}

pub(crate) async fn approve_handler<S, P, F>(
    State(desk): Desk<S, P, F>,
    headers: HeaderMap,
    Path(listing_id): Path<String>,
) -> Response
where
    S: ListingStore + 'static,
    P: PaymentRecorder + 'static,
    F: PreferenceStore + 'static,
{
    let actor = actor_or_return!(headers);
    respond(
        StatusCode::OK,
        desk.lifecycle().approve(&actor, &ListingId(listing_id)),
    )
}

pub(crate) async fn reject_handler<S, P, F>(
    State(desk): Desk<S, P, F>,
    headers: HeaderMap,
    Path(listing_id): Path<String>,
    Json(payload): Json<ReasonPayload>,
) -> Response
where
    S: ListingStore + 'static,
    P: PaymentRecorder + 'static,
    F: PreferenceStore + 'static,
{
    let actor = actor_or_return!(headers);
    respond(
        StatusCode::OK,
        desk.lifecycle()
            .reject(&actor, &ListingId(listing_id), &payload.reason),
    )
}

pub(crate) async fn activate_handler<S, P, F>(
    State(desk): Desk<S, P, F>,
    headers: HeaderMap,
    Path(listing_id): Path<String>,
) -> Response
where
    S: ListingStore + 'static,
    P: PaymentRecorder + 'static,
    F: PreferenceStore + 'static,
{
    let actor = actor_or_return!(headers);
    respond(
        StatusCode::OK,
        desk.lifecycle().activate(&actor, &ListingId(listing_id)),
    )
}

pub(crate) async fn complete_handler<S, P, F>(
    State(desk): Desk<S, P, F>,
    headers: HeaderMap,
    Path(listing_id): Path<String>,
) -> Response
where
    S: ListingStore + 'static,
    P: PaymentRecorder + 'static,
    F: PreferenceStore + 'static,
{
    let actor = actor_or_return!(headers);
    respond(
        StatusCode::OK,
        desk.lifecycle().complete(&actor, &ListingId(listing_id)),
    )
}

pub(crate) async fn cancel_handler<S, P, F>(
    State(desk): Desk<S, P, F>,
    headers: HeaderMap,
    Path(listing_id): Path<String>,
) -> Response
where
    S: ListingStore + 'static,
    P: PaymentRecorder + 'static,
    F: PreferenceStore + 'static,
{
    let actor = actor_or_return!(headers);
    respond(
        StatusCode::OK,
        desk.lifecycle().cancel(&actor, &ListingId(listing_id)),
    )
}

pub(crate) async fn report_handler<S, P, F>(
    State(desk): Desk<S, P, F>,
    headers: HeaderMap,
    Path(listing_id): Path<String>,
    Json(payload): Json<ReasonPayload>,
) -> Response
where
    S: ListingStore + 'static,
    P: PaymentRecorder + 'static,
    F: PreferenceStore + 'static,
{
    let actor = actor_or_return!(headers);
    respond(
        StatusCode::OK,
        desk.lifecycle()
            .report(&actor, &ListingId(listing_id), &payload.reason),
    )
}

pub(crate) async fn push_handler<S, P, F>(
    State(desk): Desk<S, P, F>,
    headers: HeaderMap,
    Path(listing_id): Path<String>,
) -> Response
where
    S: ListingStore + 'static,
    P: PaymentRecorder + 'static,
    F: PreferenceStore + 'static,
{
    let actor = actor_or_return!(headers);
    match desk.lifecycle().push(&actor, &ListingId(listing_id)) {
        Ok((listing, payment)) => (
            StatusCode::OK,
            Json(json!({ "listing": listing, "payment": payment })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn listing_payments_handler<S, P, F>(
    State(desk): Desk<S, P, F>,
    headers: HeaderMap,
    Path(listing_id): Path<String>,
) -> Response
where
    S: ListingStore + 'static,
    P: PaymentRecorder + 'static,
    F: PreferenceStore + 'static,
{
    let actor = actor_or_return!(headers);
    respond(
        StatusCode::OK,
        desk.lifecycle().payments_for(&actor, &ListingId(listing_id)),
    )
}

pub(crate) async fn takeover_request_handler<S, P, F>(
    State(desk): Desk<S, P, F>,
    headers: HeaderMap,
    Path(listing_id): Path<String>,
    Json(payload): Json<TakeoverRequestPayload>,
) -> Response
where
    S: ListingStore + 'static,
    P: PaymentRecorder + 'static,
    F: PreferenceStore + 'static,
{
    let actor = actor_or_return!(headers);
    respond(
        StatusCode::CREATED,
        desk.takeover().request(
            &actor,
            &ListingId(listing_id),
            UserId(payload.broker_id),
            &payload.seller_name,
        ),
    )
}

pub(crate) async fn takeover_respond_handler<S, P, F>(
    State(desk): Desk<S, P, F>,
    headers: HeaderMap,
    Path((listing_id, request_id)): Path<(String, String)>,
    Json(payload): Json<TakeoverRespondPayload>,
) -> Response
where
    S: ListingStore + 'static,
    P: PaymentRecorder + 'static,
    F: PreferenceStore + 'static,
{
    let actor = actor_or_return!(headers);
    respond(
        StatusCode::OK,
        desk.takeover().respond(
            &actor,
            &ListingId(listing_id),
            &BrokerRequestId(request_id),
            payload.response,
        ),
    )
}

pub(crate) async fn takeover_confirm_handler<S, P, F>(
    State(desk): Desk<S, P, F>,
    headers: HeaderMap,
    Path(listing_id): Path<String>,
) -> Response
where
    S: ListingStore + 'static,
    P: PaymentRecorder + 'static,
    F: PreferenceStore + 'static,
{
    let actor = actor_or_return!(headers);
    respond(
        StatusCode::OK,
        desk.takeover()
            .confirm_payment(&actor, &ListingId(listing_id)),
    )
}

pub(crate) async fn takeover_unassign_handler<S, P, F>(
    State(desk): Desk<S, P, F>,
    headers: HeaderMap,
    Path(listing_id): Path<String>,
) -> Response
where
    S: ListingStore + 'static,
    P: PaymentRecorder + 'static,
    F: PreferenceStore + 'static,
{
    let actor = actor_or_return!(headers);
    respond(
        StatusCode::OK,
        desk.takeover().unassign(&actor, &ListingId(listing_id)),
    )
}

pub(crate) async fn save_preferences_handler<S, P, F>(
    State(desk): Desk<S, P, F>,
    headers: HeaderMap,
    Json(preferences): Json<UserPreferences>,
) -> Response
where
    S: ListingStore + 'static,
    P: PaymentRecorder + 'static,
    F: PreferenceStore + 'static,
{
    let actor = actor_or_return!(headers);
    respond(
        StatusCode::OK,
        desk.recommendations().save_preferences(&actor, preferences),
    )
}

pub(crate) async fn preferences_handler<S, P, F>(
    State(desk): Desk<S, P, F>,
    headers: HeaderMap,
) -> Response
where
    S: ListingStore + 'static,
    P: PaymentRecorder + 'static,
    F: PreferenceStore + 'static,
{
    let actor = actor_or_return!(headers);
    respond(StatusCode::OK, desk.recommendations().preferences_for(&actor))
}

pub(crate) async fn recommend_for_handler<S, P, F>(
    State(desk): Desk<S, P, F>,
    headers: HeaderMap,
    Query(query): Query<LimitQuery>,
) -> Response
where
    S: ListingStore + 'static,
    P: PaymentRecorder + 'static,
    F: PreferenceStore + 'static,
{
    let actor = actor_or_return!(headers);
    let limit = query.limit.unwrap_or(DEFAULT_RECOMMENDATION_LIMIT);
    respond(
        StatusCode::OK,
        desk.recommendations().recommend_for(&actor, limit),
    )
}

pub(crate) async fn recommend_with_handler<S, P, F>(
    State(desk): Desk<S, P, F>,
    Query(query): Query<LimitQuery>,
    Json(preferences): Json<UserPreferences>,
) -> Response
where
    S: ListingStore + 'static,
    P: PaymentRecorder + 'static,
    F: PreferenceStore + 'static,
{
    let limit = query.limit.unwrap_or(DEFAULT_RECOMMENDATION_LIMIT);
    respond(
        StatusCode::OK,
        desk.recommendations().recommend_with(&preferences, limit),
    )
}

pub(crate) async fn revenue_summary_handler<S, P, F>(
    State(desk): Desk<S, P, F>,
    headers: HeaderMap,
    Query(range): Query<RangeQuery>,
) -> Response
where
    S: ListingStore + 'static,
    P: PaymentRecorder + 'static,
    F: PreferenceStore + 'static,
{
    let actor = actor_or_return!(headers);
    match desk
        .lifecycle()
        .revenue_summary(&actor, range.start, range.end)
    {
        Ok(totals) => {
            let by_type: serde_json::Map<String, serde_json::Value> = totals
                .into_iter()
                .map(|(payment_type, totals)| {
                    (
                        payment_type.label().to_string(),
                        json!({ "count": totals.count, "total": totals.total }),
                    )
                })
                .collect();
            (StatusCode::OK, Json(json!({ "totals": by_type }))).into_response()
        }
        Err(err) => err.into_response(),
    }
}
