use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest, HttpResponse};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::domain::intent::ParsedIntent;
use crate::domain::order::CreationJob;
use crate::domain::ports::ApiUser;
use crate::errors::AppError;
use crate::AppServices;

pub const API_KEY_HEADER: &str = "x-api-key";

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct TextOrderRequest {
    /// Free-text order description, e.g. "2 cơm rang dưa bò bàn 3".
    pub text: String,
    /// Opaque message id from the originating chat channel. Present for
    /// text-origin orders, absent for direct submissions.
    pub correlation_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TextOrderResponse {
    pub status: String,
    pub message: String,
    pub parsed: ParsedIntent,
}

// ── API-key resolution ───────────────────────────────────────────────────────

/// User resolved from the `X-Api-Key` header. The full auth middleware
/// lives in front of this service; this extractor covers direct callers.
pub struct AuthedUser(pub ApiUser);

impl FromRequest for AuthedUser {
    type Error = AppError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, AppError>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let header = req
            .headers()
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let services = req.app_data::<web::Data<AppServices>>().cloned();

        Box::pin(async move {
            let api_key = header
                .filter(|k| !k.is_empty())
                .ok_or_else(|| AppError::Unauthorized("missing X-Api-Key header".to_string()))?;
            let services = services
                .ok_or_else(|| AppError::Internal("app services not configured".to_string()))?;

            let users = Arc::clone(&services.users);
            let key = api_key.clone();
            let user = web::block(move || users.user_by_api_key(&key))
                .await
                .map_err(|e| AppError::Internal(e.to_string()))??;

            user.map(AuthedUser)
                .ok_or_else(|| AppError::Unauthorized("unknown API key".to_string()))
        })
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /order
///
/// Parses a free-text order, builds a domain order against the caller's
/// catalog and durably queues it for out-of-band creation. Returns as soon
/// as the job is accepted; downstream failures are reported over the relay,
/// never through this response.
#[utoipa::path(
    post,
    path = "/order",
    request_body = TextOrderRequest,
    responses(
        (status = 200, description = "Order accepted for processing", body = TextOrderResponse),
        (status = 400, description = "Empty or unparseable text"),
        (status = 401, description = "Missing or unknown API key"),
        (status = 503, description = "Catalog lookup or job queue unavailable"),
    ),
    tag = "orders"
)]
pub async fn submit_text_order(
    services: web::Data<AppServices>,
    user: AuthedUser,
    body: web::Json<TextOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    if body.text.trim().is_empty() {
        return Err(AppError::Validation("text input is required".to_string()));
    }

    info!("parsing text order (user {})", user.0.id);
    let parsed = services.parser.parse(&body.text).await?;

    let queued = parsed.clone();
    let job_id = web::block(move || {
        let order = services.builder.build(&queued, user.0.id)?;
        services.queue.submit(&CreationJob {
            order,
            user_id: user.0.id,
            api_key: user.0.api_key,
            correlation_id: body.correlation_id,
            raw_text: Some(body.text),
        })
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    info!("accepted order job {}", job_id);

    Ok(HttpResponse::Ok().json(TextOrderResponse {
        status: "success".to_string(),
        message: "Order accepted for processing".to_string(),
        parsed,
    }))
}

/// GET /
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service is up")),
    tag = "health"
)]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "Text Order Service Running" }))
}
