use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::notification::{NotificationView, Recipient};
use crate::errors::AppError;
use crate::state::AppState;

use super::caller_role;

#[derive(Debug, Deserialize)]
pub struct RecipientParams {
    /// Customer whose notifications are wanted; omit for the staff feed.
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub unread_only: bool,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationResponse {
    pub id: Uuid,
    /// `customer` or `staff`
    pub audience: String,
    pub user_id: Option<Uuid>,
    pub title: String,
    pub message: String,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<NotificationView> for NotificationResponse {
    fn from(n: NotificationView) -> Self {
        Self {
            id: n.id,
            audience: n.recipient.audience().to_string(),
            user_id: n.recipient.user_id(),
            title: n.title,
            message: n.message,
            metadata: n.metadata.to_json(),
            is_read: n.is_read,
            created_at: n.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UnreadCountResponse {
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarkAllReadResponse {
    pub updated: usize,
}

/// A `user_id` addresses that customer's feed; without one the caller must be
/// staff and gets the shared staff feed.
fn resolve_recipient(req: &HttpRequest, user_id: Option<Uuid>) -> Result<Recipient, AppError> {
    match user_id {
        Some(id) => Ok(Recipient::Customer(id)),
        None if caller_role(req)?.is_staff() => Ok(Recipient::Staff),
        None => Err(AppError::BadRequest("user_id is required".to_string())),
    }
}

/// GET /notifications
#[utoipa::path(
    get,
    path = "/notifications",
    params(
        ("user_id" = Option<Uuid>, Query, description = "Customer id; omit for the staff feed"),
        ("unread_only" = Option<bool>, Query, description = "Only unread notifications"),
        ("limit" = Option<i64>, Query, description = "Max items (default 20, max 100)"),
    ),
    responses(
        (status = 200, description = "Newest first", body = [NotificationResponse]),
        (status = 400, description = "No user_id and caller is not staff"),
    ),
    tag = "notifications"
)]
pub async fn list_notifications(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<RecipientParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let recipient = resolve_recipient(&req, params.user_id)?;
    let notifications = state.notifications.clone();

    let items = web::block(move || notifications.list(recipient, params.unread_only, params.limit))
        .await??;

    let body: Vec<NotificationResponse> = items.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// GET /notifications/unread-count
#[utoipa::path(
    get,
    path = "/notifications/unread-count",
    params(("user_id" = Option<Uuid>, Query, description = "Customer id; omit for the staff feed")),
    responses((status = 200, description = "Unread notifications", body = UnreadCountResponse)),
    tag = "notifications"
)]
pub async fn unread_count(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<RecipientParams>,
) -> Result<HttpResponse, AppError> {
    let recipient = resolve_recipient(&req, query.user_id)?;
    let notifications = state.notifications.clone();

    let count = web::block(move || notifications.unread_count(recipient)).await??;

    Ok(HttpResponse::Ok().json(UnreadCountResponse { count }))
}

/// POST /notifications/{id}/read
#[utoipa::path(
    post,
    path = "/notifications/{id}/read",
    params(("id" = Uuid, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Marked read", body = NotificationResponse),
        (status = 404, description = "Notification not found"),
    ),
    tag = "notifications"
)]
pub async fn mark_read(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let notifications = state.notifications.clone();

    let updated = web::block(move || notifications.mark_read(id)).await??;

    Ok(HttpResponse::Ok().json(NotificationResponse::from(updated)))
}

/// POST /notifications/read-all
#[utoipa::path(
    post,
    path = "/notifications/read-all",
    params(("user_id" = Option<Uuid>, Query, description = "Customer id; omit for the staff feed")),
    responses((status = 200, description = "Number of notifications marked read", body = MarkAllReadResponse)),
    tag = "notifications"
)]
pub async fn mark_all_read(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<RecipientParams>,
) -> Result<HttpResponse, AppError> {
    let recipient = resolve_recipient(&req, query.user_id)?;
    let notifications = state.notifications.clone();

    let updated = web::block(move || notifications.mark_all_read(recipient)).await??;

    Ok(HttpResponse::Ok().json(MarkAllReadResponse { updated }))
}

/// GET /notifications/stream
///
/// Server-sent events: one `data:` frame per notification addressed to the
/// caller, until the client disconnects or the hub stops.
#[utoipa::path(
    get,
    path = "/notifications/stream",
    params(("user_id" = Option<Uuid>, Query, description = "Customer id; omit for the staff feed")),
    responses(
        (status = 200, description = "text/event-stream of NotificationResponse frames"),
        (status = 503, description = "Notification hub is not running"),
    ),
    tag = "notifications"
)]
pub async fn stream_notifications(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<RecipientParams>,
) -> Result<HttpResponse, AppError> {
    let recipient = resolve_recipient(&req, query.user_id)?;
    let Some(subscription) = state.hub.subscribe(recipient) else {
        return Ok(HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "success": false,
            "message": "Notification stream is not available"
        })));
    };
    log::debug!("SSE subscriber connected for {:?}", recipient);

    let events = subscription.into_stream().map(|n| {
        let json = serde_json::to_string(&NotificationResponse::from(n))
            .unwrap_or_else(|_| "{}".to_string());
        Ok::<_, actix_web::Error>(web::Bytes::from(format!("data: {json}\n\n")))
    });

    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(events))
}
