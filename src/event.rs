//! Gateway event and response shapes, plus the CORS header sets attached to every reply.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type, X-User-Id";
/// Preflight cache lifetime in seconds (24 hours).
pub const MAX_AGE_SECS: u32 = 86_400;

/// Abstracted HTTP request as delivered by the function gateway.
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct GatewayEvent {
    #[serde(default)]
    pub http_method: Option<String>,
    #[serde(default)]
    pub query_string_parameters: Option<HashMap<String, String>>,
    /// JSON-encoded request body.
    #[serde(default)]
    pub body: Option<String>,
}

impl GatewayEvent {
    pub fn new(method: &str) -> Self {
        GatewayEvent {
            http_method: Some(method.to_string()),
            ..Default::default()
        }
    }

    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.query_string_parameters
            .get_or_insert_with(HashMap::new)
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Method name as sent. Missing method is treated as GET.
    pub fn method(&self) -> &str {
        self.http_method.as_deref().unwrap_or("GET")
    }

    pub fn query(&self, key: &str) -> Option<&str> {
        self.query_string_parameters
            .as_ref()
            .and_then(|q| q.get(key))
            .map(String::as_str)
    }

    /// Logical operation selector; empty when absent.
    pub fn path(&self) -> &str {
        self.query("path").unwrap_or("")
    }
}

/// Response handed back to the gateway.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub is_base64_encoded: bool,
}

impl GatewayResponse {
    /// JSON reply with the standard content-type and origin headers.
    pub fn json(status_code: u16, body: &serde_json::Value) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert(
            "Access-Control-Allow-Origin".to_string(),
            ALLOW_ORIGIN.to_string(),
        );
        GatewayResponse {
            status_code,
            headers,
            body: body.to_string(),
            is_base64_encoded: false,
        }
    }

    /// Empty 200 answering a CORS preflight.
    pub fn preflight() -> Self {
        let headers = [
            ("Access-Control-Allow-Origin", ALLOW_ORIGIN.to_string()),
            ("Access-Control-Allow-Methods", ALLOW_METHODS.to_string()),
            ("Access-Control-Allow-Headers", ALLOW_HEADERS.to_string()),
            ("Access-Control-Max-Age", MAX_AGE_SECS.to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        GatewayResponse {
            status_code: 200,
            headers,
            body: String::new(),
            is_base64_encoded: false,
        }
    }

    pub fn body_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}
