//! Client for the external order-creation API.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::debug;
use serde_json::{json, Value};

use crate::domain::order::CreationJob;
use crate::domain::ports::{BackendError, BackendOrder, OrderBackend};

/// Fixed request timeout for order-creation calls. A timed-out call is
/// treated identically to a network failure.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpOrderBackend {
    http: reqwest::Client,
    base_url: String,
}

impl HttpOrderBackend {
    pub fn new(base_url: &str) -> reqwest::Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

/// Backend contract: room ids travel base64-encoded in their string form.
pub fn encode_room_id(room_id: Option<i64>) -> Option<String> {
    room_id.map(|id| STANDARD.encode(id.to_string()))
}

pub fn creation_request_body(job: &CreationJob) -> Value {
    json!({
        "api_key": job.api_key,
        "room_id_b64": encode_room_id(job.order.room_id),
        "lines": job.order.lines,
        "note": job.order.note,
        "discount": job.order.discount,
        "discount_type": job.order.discount_type,
    })
}

/// Interpret a 2xx response body. Success requires `status == "success"`;
/// anything else is a rejection carrying the backend's message.
pub fn parse_creation_response(body: Value) -> Result<BackendOrder, BackendError> {
    match body.get("status").and_then(Value::as_str) {
        Some("success") => Ok(BackendOrder {
            order_id: body
                .pointer("/data/order/id")
                .and_then(Value::as_i64),
            socket_data: body
                .pointer("/data/socket_data")
                .cloned()
                .unwrap_or_else(|| json!({})),
        }),
        Some(_) => Err(BackendError::Rejected(
            body.get("message")
                .and_then(Value::as_str)
                .unwrap_or("Order creation failed")
                .to_string(),
        )),
        None => Err(BackendError::InvalidResponse(
            "missing status field".to_string(),
        )),
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BackendError::Timeout
        } else {
            BackendError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl OrderBackend for HttpOrderBackend {
    async fn create_order(&self, job: &CreationJob) -> Result<BackendOrder, BackendError> {
        let url = format!("{}/order-create", self.base_url);
        debug!("POST {} (user {})", url, job.user_id);

        let response = self
            .http
            .post(url)
            .json(&creation_request_body(job))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(BackendError::Rejected(format!(
                "backend API error {}: {}",
                status,
                text.chars().take(100).collect::<String>()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;
        parse_creation_response(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::intent::DiscountType;
    use crate::domain::order::{DomainOrder, OrderLine, OrderStatus, OrderType, RoomState};

    fn job(room_id: Option<i64>) -> CreationJob {
        CreationJob {
            order: DomainOrder {
                order_type: OrderType::Sale,
                room_id,
                room_state: RoomState::InUse,
                note: Some("ít cay".into()),
                discount: 10000,
                discount_type: DiscountType::Absolute,
                status: OrderStatus::Unpaid,
                payment: None,
                lines: vec![OrderLine {
                    product_id: Some(1),
                    quantity: 2,
                    price: 50000,
                }],
                user_id: 3,
            },
            user_id: 3,
            api_key: "key-abc".into(),
            correlation_id: Some("m-1".into()),
            raw_text: None,
        }
    }

    #[test]
    fn room_id_is_base64_of_decimal_string() {
        // base64("9") == "OQ=="
        assert_eq!(encode_room_id(Some(9)).as_deref(), Some("OQ=="));
        assert_eq!(encode_room_id(None), None);
    }

    #[test]
    fn request_body_shape() {
        let body = creation_request_body(&job(Some(9)));
        assert_eq!(body["api_key"], "key-abc");
        assert_eq!(body["room_id_b64"], "OQ==");
        assert_eq!(body["discount"], 10000);
        assert_eq!(body["discount_type"], 1);
        assert_eq!(body["lines"][0]["price"], 50000);
    }

    #[test]
    fn unassigned_room_travels_as_null() {
        let body = creation_request_body(&job(None));
        assert!(body["room_id_b64"].is_null());
    }

    #[test]
    fn success_response_yields_order_and_socket_data() {
        let body = serde_json::json!({
            "status": "success",
            "data": {
                "order": {"id": 77},
                "socket_data": {"user_id": 3, "room_id": 9}
            }
        });
        let ok = parse_creation_response(body).unwrap();
        assert_eq!(ok.order_id, Some(77));
        assert_eq!(ok.socket_data["room_id"], 9);
    }

    #[test]
    fn non_success_status_is_rejected_with_message() {
        let body = serde_json::json!({"status": "error", "message": "room is closed"});
        let err = parse_creation_response(body).unwrap_err();
        assert!(matches!(err, BackendError::Rejected(m) if m == "room is closed"));
    }

    #[test]
    fn missing_status_is_invalid_response() {
        let err = parse_creation_response(serde_json::json!({"data": {}})).unwrap_err();
        assert!(matches!(err, BackendError::InvalidResponse(_)));
    }
}
