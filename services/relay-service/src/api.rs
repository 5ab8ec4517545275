//! API handlers for Relay Service

use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use p2pchat_core::Message;
use p2pchat_crypto::PublicKey;
use p2pchat_relay::{AuthHeaders, RequestParts};
use serde::Serialize;
use tracing::debug;

use crate::error::ServiceError;
use crate::service::Listing;
use crate::AppState;

/// Configure API routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route(
            "/.well-known/p2pchat/{username}",
            web::get().to(well_known),
        )
        .service(
            web::scope("/api")
                .route("/forward", web::post().to(forward))
                .route("/users/{public_key}/messages", web::get().to(inbox))
                .route("/users/{public_key}/messages/every", web::get().to(every))
                .route("/users/{public_key}/messages/read", web::get().to(read_messages))
                .route("/users/{public_key}/messages/unread", web::get().to(unread_messages))
                .route("/messages/{id}/read", web::put().to(mark_read))
                .route("/messages/{id}/unread", web::put().to(mark_unread)),
        );
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub domain: String,
    pub messages: usize,
}

/// Health check
async fn health_check(state: web::Data<AppState>) -> ActixResult<HttpResponse, ServiceError> {
    Ok(HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        domain: state.service.domain().to_string(),
        messages: state.service.message_count()?,
    }))
}

/// Public key lookup for a local user
async fn well_known(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse, ServiceError> {
    let entry = state.service.well_known(&path)?;
    Ok(HttpResponse::Ok().json(entry))
}

/// Store a message for its recipient
async fn forward(
    state: web::Data<AppState>,
    body: web::Bytes,
) -> ActixResult<HttpResponse, ServiceError> {
    let text = std::str::from_utf8(&body)
        .map_err(|_| ServiceError::BadRequest("body is not UTF-8".to_string()))?;
    let message = Message::from_json(text)?;

    let (stored, created) = state.service.forward(message)?;
    if created {
        Ok(HttpResponse::Created().json(stored))
    } else {
        Ok(HttpResponse::Ok().json(stored))
    }
}

/// Check the auth headers against the exact request received
fn authenticate(
    state: &AppState,
    req: &HttpRequest,
    body: &[u8],
) -> Result<PublicKey, ServiceError> {
    let headers = AuthHeaders::from_lookup(|name| {
        req.headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    });
    let parts = RequestParts::new(req.method().as_str(), req.path(), req.query_string(), body);
    state.service.authenticate(&headers, &parts)
}

async fn list(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
    owner: String,
    listing: Listing,
) -> ActixResult<HttpResponse, ServiceError> {
    let caller = authenticate(&state, &req, &body)?;
    let messages = state.service.messages(&caller, &owner, listing)?;
    Ok(HttpResponse::Ok().json(messages))
}

/// Messages received by the caller, newest first
async fn inbox(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
    path: web::Path<String>,
) -> ActixResult<HttpResponse, ServiceError> {
    list(state, req, body, path.into_inner(), Listing::Inbox).await
}

/// Messages sent or received by the caller
async fn every(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
    path: web::Path<String>,
) -> ActixResult<HttpResponse, ServiceError> {
    list(state, req, body, path.into_inner(), Listing::Every).await
}

async fn read_messages(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
    path: web::Path<String>,
) -> ActixResult<HttpResponse, ServiceError> {
    list(state, req, body, path.into_inner(), Listing::Read).await
}

async fn unread_messages(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
    path: web::Path<String>,
) -> ActixResult<HttpResponse, ServiceError> {
    list(state, req, body, path.into_inner(), Listing::Unread).await
}

async fn set_read(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
    id: String,
    read: bool,
) -> ActixResult<HttpResponse, ServiceError> {
    let caller = authenticate(&state, &req, &body)?;
    let message = state.service.set_read(&caller, &id, read)?;
    debug!(id = %id, read, "Updated read flag");
    Ok(HttpResponse::Ok().json(message))
}

/// Mark a received message read
async fn mark_read(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
    path: web::Path<String>,
) -> ActixResult<HttpResponse, ServiceError> {
    set_read(state, req, body, path.into_inner(), true).await
}

/// Mark a received message unread
async fn mark_unread(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
    path: web::Path<String>,
) -> ActixResult<HttpResponse, ServiceError> {
    set_read(state, req, body, path.into_inner(), false).await
}
