use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::intent::DiscountType;

/// Order kind. Only sales orders exist in this pipeline; the backend wire
/// code for a sale is `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "i32", into = "i32")]
pub enum OrderType {
    Sale,
}

impl TryFrom<i32> for OrderType {
    type Error = String;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(OrderType::Sale),
            other => Err(format!("unknown order type code: {}", other)),
        }
    }
}

impl From<OrderType> for i32 {
    fn from(_: OrderType) -> i32 {
        1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RoomState {
    Free,
    #[serde(rename = "using")]
    InUse,
}

/// Payment status wire codes: `1` = paid, `2` = unpaid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "i32", into = "i32")]
pub enum OrderStatus {
    Paid,
    Unpaid,
}

impl TryFrom<i32> for OrderStatus {
    type Error = String;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(OrderStatus::Paid),
            2 => Ok(OrderStatus::Unpaid),
            other => Err(format!("unknown order status code: {}", other)),
        }
    }
}

impl From<OrderStatus> for i32 {
    fn from(s: OrderStatus) -> i32 {
        match s {
            OrderStatus::Paid => 1,
            OrderStatus::Unpaid => 2,
        }
    }
}

/// One line of a built order. `product_id = None` means the requested name
/// could not be resolved against the catalog; the line is still carried so
/// the creation request surfaces the gap downstream instead of silently
/// dropping an item.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderLine {
    pub product_id: Option<i64>,
    pub quantity: i32,
    pub price: i64,
}

/// Validated domain order, built once from a `ParsedIntent` and never
/// mutated afterwards. The queued copy is the single source of truth for
/// the creation job.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DomainOrder {
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub room_id: Option<i64>,
    pub room_state: RoomState,
    pub note: Option<String>,
    pub discount: i64,
    pub discount_type: DiscountType,
    pub status: OrderStatus,
    pub payment: Option<Value>,
    pub lines: Vec<OrderLine>,
    pub user_id: i64,
}

/// Where an order entered the system. Decided once at ingestion time and
/// carried explicitly instead of re-inferred downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderOrigin {
    /// Parsed from free text; the correlation id ties relay events back to
    /// the originating conversation/message.
    Text { correlation_id: String },
    /// Submitted directly (QR flow, web form); no correlation id exists.
    Direct,
}

impl OrderOrigin {
    /// Classification rule shared with external relay clients: a payload
    /// carrying a non-null `correlation_id` field is a text-origin order.
    pub fn classify(payload: &Value) -> OrderOrigin {
        match payload.get("correlation_id") {
            Some(v) if !v.is_null() => OrderOrigin::Text {
                correlation_id: v
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| v.to_string()),
            },
            _ => OrderOrigin::Direct,
        }
    }
}

/// Payload of one queued creation job. Serialized losslessly to the queue
/// (JSONB); `room_id` inside the order must survive as an explicit null.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreationJob {
    pub order: DomainOrder,
    pub user_id: i64,
    pub api_key: String,
    pub correlation_id: Option<String>,
    pub raw_text: Option<String>,
}

impl CreationJob {
    pub fn origin(&self) -> OrderOrigin {
        match &self.correlation_id {
            Some(id) => OrderOrigin::Text {
                correlation_id: id.clone(),
            },
            None => OrderOrigin::Direct,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_order() -> DomainOrder {
        DomainOrder {
            order_type: OrderType::Sale,
            room_id: None,
            room_state: RoomState::InUse,
            note: None,
            discount: 0,
            discount_type: DiscountType::Absolute,
            status: OrderStatus::Unpaid,
            payment: None,
            lines: vec![OrderLine {
                product_id: Some(7),
                quantity: 2,
                price: 45000,
            }],
            user_id: 3,
        }
    }

    #[test]
    fn order_serializes_wire_codes() {
        let v = serde_json::to_value(sample_order()).unwrap();
        assert_eq!(v["type"], 1);
        assert_eq!(v["status"], 2);
        assert_eq!(v["room_state"], "using");
        assert_eq!(v["room_id"], Value::Null);
    }

    #[test]
    fn null_room_id_round_trips_through_job_payload() {
        let job = CreationJob {
            order: sample_order(),
            user_id: 3,
            api_key: "key".into(),
            correlation_id: None,
            raw_text: Some("2 cơm rang".into()),
        };
        let v = serde_json::to_value(&job).unwrap();
        assert!(v["order"].get("room_id").unwrap().is_null());
        let back: CreationJob = serde_json::from_value(v).unwrap();
        assert_eq!(back.order.room_id, None);
        assert_eq!(back.origin(), OrderOrigin::Direct);
    }

    #[test]
    fn classify_on_correlation_id_presence() {
        let text = json!({"correlation_id": "m-1", "user_id": 3});
        assert_eq!(
            OrderOrigin::classify(&text),
            OrderOrigin::Text {
                correlation_id: "m-1".into()
            }
        );

        let direct = json!({"user_id": 3});
        assert_eq!(OrderOrigin::classify(&direct), OrderOrigin::Direct);

        // An explicit null counts as absent.
        let null_id = json!({"correlation_id": null});
        assert_eq!(OrderOrigin::classify(&null_id), OrderOrigin::Direct);
    }
}
