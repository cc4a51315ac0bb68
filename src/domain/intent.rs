use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Discount interpretation on the wire: `1` = absolute VND amount,
/// `2` = percentage. Unknown codes are rejected at deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "i32", into = "i32")]
pub enum DiscountType {
    Absolute,
    Percent,
}

impl Default for DiscountType {
    fn default() -> Self {
        DiscountType::Absolute
    }
}

impl TryFrom<i32> for DiscountType {
    type Error = String;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(DiscountType::Absolute),
            2 => Ok(DiscountType::Percent),
            other => Err(format!("unknown discount_type code: {}", other)),
        }
    }
}

impl From<DiscountType> for i32 {
    fn from(dt: DiscountType) -> i32 {
        match dt {
            DiscountType::Absolute => 1,
            DiscountType::Percent => 2,
        }
    }
}

/// One requested product as the parser understood it. `quantity` defaults
/// to 1 and `price` to 0 when the parser omits them.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductIntent {
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    #[serde(default)]
    pub price: i64,
}

fn default_quantity() -> i32 {
    1
}

/// Structured result of parsing one free-text order description.
///
/// Produced once per inbound text and immutable afterwards. The parser
/// returns loosely-typed JSON; deserializing into this struct is the
/// validation step — wrong field types or a missing product name are
/// rejected here rather than trusted downstream.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ParsedIntent {
    pub products: Vec<ProductIntent>,
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub discount: i64,
    #[serde(default)]
    pub discount_type: DiscountType,
}
