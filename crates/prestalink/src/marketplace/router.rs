//! HTTP surface for the marketplace core. Callers authenticate with a bearer
//! token resolved through the identity directory; error kinds map one-to-one
//! onto response statuses.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::identity::{IdentityDirectory, Notifier};

use super::domain::{ApplicationId, Bid, CategoryId, NewRequest, NewReview, RequestId, UserId};
use super::error::MarketplaceError;
use super::store::{MarketplaceStore, PublishedFilter};
use super::{domain::RequestPatch, Marketplace};

impl IntoResponse for MarketplaceError {
    fn into_response(self) -> Response {
        let status = match &self {
            MarketplaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            MarketplaceError::Forbidden(_) => StatusCode::FORBIDDEN,
            MarketplaceError::InvalidTransition(_) => StatusCode::UNPROCESSABLE_ENTITY,
            MarketplaceError::Conflict(_) => StatusCode::CONFLICT,
            MarketplaceError::Unauthenticated => StatusCode::UNAUTHORIZED,
            MarketplaceError::Validation(_) => StatusCode::BAD_REQUEST,
            MarketplaceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

/// Router builder exposing the marketplace endpoints.
pub fn marketplace_router<S, D, N>(service: Arc<Marketplace<S, D, N>>) -> Router
where
    S: MarketplaceStore + 'static,
    D: IdentityDirectory + 'static,
    N: Notifier + 'static,
{
    Router::new()
        .route(
            "/api/v1/requests",
            post(create_request::<S, D, N>).get(list_published::<S, D, N>),
        )
        .route("/api/v1/requests/search", get(search_requests::<S, D, N>))
        .route("/api/v1/requests/mine", get(list_my_requests::<S, D, N>))
        .route(
            "/api/v1/requests/:id",
            get(get_request::<S, D, N>)
                .put(update_request::<S, D, N>)
                .delete(cancel_request::<S, D, N>),
        )
        .route(
            "/api/v1/requests/:id/complete",
            post(complete_request::<S, D, N>),
        )
        .route(
            "/api/v1/requests/:id/applications",
            get(list_request_applications::<S, D, N>),
        )
        .route(
            "/api/v1/applications",
            post(apply::<S, D, N>).get(list_my_applications::<S, D, N>),
        )
        .route(
            "/api/v1/applications/:id/withdraw",
            post(withdraw::<S, D, N>),
        )
        .route("/api/v1/applications/:id/accept", post(accept::<S, D, N>))
        .route("/api/v1/applications/:id/reject", post(reject::<S, D, N>))
        .route("/api/v1/messages", post(send_message::<S, D, N>))
        .route(
            "/api/v1/messages/unread-count",
            get(unread_count::<S, D, N>),
        )
        .route("/api/v1/conversations", get(list_conversations::<S, D, N>))
        .route(
            "/api/v1/conversations/:application_id",
            get(get_conversation::<S, D, N>),
        )
        .route(
            "/api/v1/reviews",
            post(create_review::<S, D, N>).get(recent_reviews::<S, D, N>),
        )
        .route(
            "/api/v1/providers/:id/reviews",
            get(provider_reviews::<S, D, N>),
        )
        .route(
            "/api/v1/providers/:id/rating",
            get(provider_rating::<S, D, N>),
        )
        .with_state(service)
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
}

#[derive(Debug, Deserialize)]
struct CreateRequestBody {
    #[serde(flatten)]
    request: NewRequest,
    #[serde(default)]
    publish: bool,
}

#[derive(Debug, Deserialize)]
struct PublishedQuery {
    #[serde(default)]
    category: Option<u64>,
    #[serde(default)]
    locality: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    q: String,
}

#[derive(Debug, Deserialize)]
struct ApplyBody {
    request_id: u64,
    #[serde(flatten)]
    bid: Bid,
}

#[derive(Debug, Default, Deserialize)]
struct RejectBody {
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SendMessageBody {
    application_id: u64,
    content: String,
}

#[derive(Debug, Deserialize)]
struct CreateReviewBody {
    application_id: u64,
    #[serde(flatten)]
    review: NewReview,
}

#[derive(Debug, Deserialize)]
struct RecentQuery {
    #[serde(default)]
    limit: Option<usize>,
}

async fn create_request<S, D, N>(
    State(service): State<Arc<Marketplace<S, D, N>>>,
    headers: HeaderMap,
    Json(body): Json<CreateRequestBody>,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    D: IdentityDirectory + 'static,
    N: Notifier + 'static,
{
    let caller = service.authenticate(bearer(&headers))?;
    let view = service.create_request(caller.id, body.request, body.publish)?;
    Ok((StatusCode::CREATED, Json(view)).into_response())
}

async fn update_request<S, D, N>(
    State(service): State<Arc<Marketplace<S, D, N>>>,
    Path(id): Path<u64>,
    headers: HeaderMap,
    Json(patch): Json<RequestPatch>,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    D: IdentityDirectory + 'static,
    N: Notifier + 'static,
{
    let caller = service.authenticate(bearer(&headers))?;
    let view = service.update_request(RequestId(id), caller.id, patch)?;
    Ok(Json(view).into_response())
}

async fn cancel_request<S, D, N>(
    State(service): State<Arc<Marketplace<S, D, N>>>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    D: IdentityDirectory + 'static,
    N: Notifier + 'static,
{
    let caller = service.authenticate(bearer(&headers))?;
    service.cancel_request(RequestId(id), caller.id)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn complete_request<S, D, N>(
    State(service): State<Arc<Marketplace<S, D, N>>>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    D: IdentityDirectory + 'static,
    N: Notifier + 'static,
{
    let caller = service.authenticate(bearer(&headers))?;
    let view = service.complete_request(RequestId(id), caller.id)?;
    Ok(Json(view).into_response())
}

async fn get_request<S, D, N>(
    State(service): State<Arc<Marketplace<S, D, N>>>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    D: IdentityDirectory + 'static,
    N: Notifier + 'static,
{
    let caller = service.authenticate(bearer(&headers))?;
    let view = service.request_by_id(RequestId(id), caller.id)?;
    Ok(Json(view).into_response())
}

async fn list_published<S, D, N>(
    State(service): State<Arc<Marketplace<S, D, N>>>,
    Query(query): Query<PublishedQuery>,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    D: IdentityDirectory + 'static,
    N: Notifier + 'static,
{
    let filter = PublishedFilter {
        category_id: query.category.map(CategoryId),
        locality: query.locality,
    };
    let views = service.list_published(filter)?;
    Ok(Json(views).into_response())
}

async fn search_requests<S, D, N>(
    State(service): State<Arc<Marketplace<S, D, N>>>,
    Query(query): Query<SearchQuery>,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    D: IdentityDirectory + 'static,
    N: Notifier + 'static,
{
    let views = service.search(&query.q)?;
    Ok(Json(views).into_response())
}

async fn list_my_requests<S, D, N>(
    State(service): State<Arc<Marketplace<S, D, N>>>,
    headers: HeaderMap,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    D: IdentityDirectory + 'static,
    N: Notifier + 'static,
{
    let caller = service.authenticate(bearer(&headers))?;
    let views = service.list_mine(caller.id)?;
    Ok(Json(views).into_response())
}

async fn apply<S, D, N>(
    State(service): State<Arc<Marketplace<S, D, N>>>,
    headers: HeaderMap,
    Json(body): Json<ApplyBody>,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    D: IdentityDirectory + 'static,
    N: Notifier + 'static,
{
    let caller = service.authenticate(bearer(&headers))?;
    let view = service.apply(RequestId(body.request_id), &caller, body.bid)?;
    Ok((StatusCode::CREATED, Json(view)).into_response())
}

async fn withdraw<S, D, N>(
    State(service): State<Arc<Marketplace<S, D, N>>>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    D: IdentityDirectory + 'static,
    N: Notifier + 'static,
{
    let caller = service.authenticate(bearer(&headers))?;
    service.withdraw(ApplicationId(id), caller.id)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn accept<S, D, N>(
    State(service): State<Arc<Marketplace<S, D, N>>>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    D: IdentityDirectory + 'static,
    N: Notifier + 'static,
{
    let caller = service.authenticate(bearer(&headers))?;
    let view = service.accept(ApplicationId(id), caller.id)?;
    Ok(Json(view).into_response())
}

async fn reject<S, D, N>(
    State(service): State<Arc<Marketplace<S, D, N>>>,
    Path(id): Path<u64>,
    headers: HeaderMap,
    body: Option<Json<RejectBody>>,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    D: IdentityDirectory + 'static,
    N: Notifier + 'static,
{
    let caller = service.authenticate(bearer(&headers))?;
    let reason = body.and_then(|Json(body)| body.reason);
    let view = service.reject(ApplicationId(id), caller.id, reason)?;
    Ok(Json(view).into_response())
}

async fn list_my_applications<S, D, N>(
    State(service): State<Arc<Marketplace<S, D, N>>>,
    headers: HeaderMap,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    D: IdentityDirectory + 'static,
    N: Notifier + 'static,
{
    let caller = service.authenticate(bearer(&headers))?;
    let views = service.list_by_provider(caller.id)?;
    Ok(Json(views).into_response())
}

async fn list_request_applications<S, D, N>(
    State(service): State<Arc<Marketplace<S, D, N>>>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    D: IdentityDirectory + 'static,
    N: Notifier + 'static,
{
    let caller = service.authenticate(bearer(&headers))?;
    let views = service.list_by_request(RequestId(id), caller.id)?;
    Ok(Json(views).into_response())
}

async fn send_message<S, D, N>(
    State(service): State<Arc<Marketplace<S, D, N>>>,
    headers: HeaderMap,
    Json(body): Json<SendMessageBody>,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    D: IdentityDirectory + 'static,
    N: Notifier + 'static,
{
    let caller = service.authenticate(bearer(&headers))?;
    let view = service.send_message(ApplicationId(body.application_id), caller.id, body.content)?;
    Ok((StatusCode::CREATED, Json(view)).into_response())
}

async fn get_conversation<S, D, N>(
    State(service): State<Arc<Marketplace<S, D, N>>>,
    Path(application_id): Path<u64>,
    headers: HeaderMap,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    D: IdentityDirectory + 'static,
    N: Notifier + 'static,
{
    let caller = service.authenticate(bearer(&headers))?;
    let views = service.conversation(ApplicationId(application_id), caller.id)?;
    Ok(Json(views).into_response())
}

async fn list_conversations<S, D, N>(
    State(service): State<Arc<Marketplace<S, D, N>>>,
    headers: HeaderMap,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    D: IdentityDirectory + 'static,
    N: Notifier + 'static,
{
    let caller = service.authenticate(bearer(&headers))?;
    let views = service.conversations(caller.id)?;
    Ok(Json(views).into_response())
}

async fn unread_count<S, D, N>(
    State(service): State<Arc<Marketplace<S, D, N>>>,
    headers: HeaderMap,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    D: IdentityDirectory + 'static,
    N: Notifier + 'static,
{
    let caller = service.authenticate(bearer(&headers))?;
    let count = service.unread_count(caller.id)?;
    Ok(Json(json!({ "unread": count })).into_response())
}

async fn create_review<S, D, N>(
    State(service): State<Arc<Marketplace<S, D, N>>>,
    headers: HeaderMap,
    Json(body): Json<CreateReviewBody>,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    D: IdentityDirectory + 'static,
    N: Notifier + 'static,
{
    let caller = service.authenticate(bearer(&headers))?;
    let view = service.create_review(ApplicationId(body.application_id), caller.id, body.review)?;
    Ok((StatusCode::CREATED, Json(view)).into_response())
}

async fn provider_reviews<S, D, N>(
    State(service): State<Arc<Marketplace<S, D, N>>>,
    Path(id): Path<u64>,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    D: IdentityDirectory + 'static,
    N: Notifier + 'static,
{
    let views = service.reviews_by_provider(UserId(id))?;
    Ok(Json(views).into_response())
}

async fn provider_rating<S, D, N>(
    State(service): State<Arc<Marketplace<S, D, N>>>,
    Path(id): Path<u64>,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    D: IdentityDirectory + 'static,
    N: Notifier + 'static,
{
    let average = service.average_rating(UserId(id))?;
    Ok(Json(json!({ "provider_id": id, "average": average })).into_response())
}

async fn recent_reviews<S, D, N>(
    State(service): State<Arc<Marketplace<S, D, N>>>,
    Query(query): Query<RecentQuery>,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    D: IdentityDirectory + 'static,
    N: Notifier + 'static,
{
    let views = service.recent_reviews(query.limit.unwrap_or(20))?;
    Ok(Json(views).into_response())
}
