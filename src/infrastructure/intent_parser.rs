//! LLM-backed free-text intent parsing.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde_json::{json, Value};

use crate::domain::errors::DomainError;
use crate::domain::intent::ParsedIntent;
use crate::domain::ports::IntentParser;

const OPENAI_API_URL: &str = "https://api.openai.com/v1";
const MODEL: &str = "gpt-4o-mini";

const SYSTEM_PROMPT: &str = r#"You are a parser for a restaurant ordering system. Analyze the sentence and return JSON:

{
  "products": [
    { "name": "dish name", "quantity": 1, "price": 0 }
  ],
  "room": "table/room name or null",
  "note": "note or null",
  "discount": 0,
  "discount_type": 1
}

Rules:
- products: list of dishes, separated by commas or "và"
- quantity: amount ordered (default 1)
- price: price if mentioned, otherwise 0
- room: table/room name if mentioned (e.g. "bàn 1", "phòng VIP")
- discount: discount amount if mentioned
- discount_type: 1 = VND, 2 = %

Examples:
"2 cơm rang dưa bò bàn 3" -> {"products":[{"name":"cơm rang dưa bò","quantity":2,"price":0}],"room":"bàn 3","note":null,"discount":0,"discount_type":1}
"phở bò, 3 chả giò giảm 10k" -> {"products":[{"name":"phở bò","quantity":1,"price":0},{"name":"chả giò","quantity":3,"price":0}],"room":null,"note":null,"discount":10000,"discount_type":1}"#;

pub struct OpenAiIntentParser {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiIntentParser {
    pub fn new(api_key: String) -> reqwest::Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()?,
            base_url: OPENAI_API_URL.to_string(),
            api_key,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

/// Pull the model's JSON reply out of a chat-completion response and
/// validate it into a `ParsedIntent`. Structural problems are rejected
/// here; nothing downstream trusts the model's shape.
pub fn intent_from_completion(body: &Value) -> Result<ParsedIntent, DomainError> {
    let content = body
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            DomainError::Internal("completion response missing message content".to_string())
        })?;

    serde_json::from_str(content)
        .map_err(|e| DomainError::Validation(format!("parser returned malformed intent: {}", e)))
}

#[async_trait]
impl IntentParser for OpenAiIntentParser {
    async fn parse(&self, text: &str) -> Result<ParsedIntent, DomainError> {
        debug!("parsing text ({} chars)", text.len());

        let request = json!({
            "model": MODEL,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": text}
            ],
            "temperature": 0,
            "response_format": {"type": "json_object"}
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| DomainError::Internal(format!("intent parser request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::Internal(format!(
                "intent parser API error {}",
                status
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| DomainError::Internal(format!("intent parser response: {}", e)))?;
        intent_from_completion(&body)
    }
}
