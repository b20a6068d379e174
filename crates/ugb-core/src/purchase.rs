//! The UVIP purchase attempt, written against the [`UgPhoneApi`] port.
//!
//! One attempt walks five endpoints in order and never retries internally:
//! claim bonus (result ignored) -> config list -> meal list -> price quote ->
//! free payment. Every failure collapses into an [`Outcome`] with a readable
//! message; the polling job decides what to do with it.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::{domain::Credentials, Result};

pub const UVIP_CONFIG_NAME: &str = "UVIP";

pub const MSG_NO_UVIP_CONFIG: &str = "Could not find UVIP config ID.";
pub const MSG_NO_NETWORK_ID: &str = "Could not extract network ID from meal list.";
pub const MSG_TIMED_OUT: &str = "Request timed out.";

/// Failure texts that mean the account can never succeed (e.g. the trial was
/// already used). Matched verbatim against the server's wording, so an
/// upstream change only needs an edit here.
pub const FATAL_FAILURE_MESSAGES: [&str; 2] = [
    MSG_NO_UVIP_CONFIG,
    "Failed to get Amount ID. Msg: Do not repeat the activity",
];

pub fn is_fatal_failure(message: &str) -> bool {
    FATAL_FAILURE_MESSAGES.contains(&message)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// UgPhone endpoints used by the bot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    NewPackage,
    ConfigList,
    MealList,
    QueryResourcePrice,
    Payment,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::NewPackage => "/api/apiv1/fee/newPackage",
            Endpoint::ConfigList => "/api/apiv1/info/configList2",
            Endpoint::MealList => "/api/apiv1/info/mealList",
            Endpoint::QueryResourcePrice => "/api/apiv1/fee/queryResourcePrice",
            Endpoint::Payment => "/api/apiv1/fee/payment",
        }
    }

    pub fn method(self) -> HttpMethod {
        match self {
            Endpoint::ConfigList => HttpMethod::Get,
            _ => HttpMethod::Post,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ApiRequest {
    pub endpoint: Endpoint,
    pub body: Option<Value>,
    /// Overrides the adapter's default per-request timeout.
    pub timeout: Option<Duration>,
}

impl ApiRequest {
    pub fn get(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            body: None,
            timeout: None,
        }
    }

    pub fn post(endpoint: Endpoint, body: Value) -> Self {
        Self {
            endpoint,
            body: Some(body),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Raw HTTP outcome. `body` is `Value::Null` unless the server answered 200
/// with a JSON body.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Port for the UgPhone HTTP API.
///
/// Implementations must map request timeouts to [`crate::Error::Timeout`].
#[async_trait]
pub trait UgPhoneApi: Send + Sync {
    async fn call(&self, creds: &Credentials, req: ApiRequest) -> Result<ApiResponse>;
}

/// Uniform result of a purchase attempt or a credential check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub success: bool,
    pub message: String,
}

impl Outcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }

    /// Failed in a way that retrying cannot fix.
    pub fn is_fatal(&self) -> bool {
        !self.success && is_fatal_failure(&self.message)
    }
}

/// Run one purchase attempt for `creds`.
pub async fn attempt_purchase(api: &dyn UgPhoneApi, creds: &Credentials) -> Outcome {
    match run_purchase(api, creds).await {
        Ok(outcome) => outcome,
        Err(e) if e.is_timeout() => Outcome::failure(MSG_TIMED_OUT),
        Err(e) => Outcome::failure(format!("Exception occurred: {e}")),
    }
}

async fn run_purchase(api: &dyn UgPhoneApi, creds: &Credentials) -> Result<Outcome> {
    // 1. Claim the new-user bonus. Status and body are irrelevant.
    api.call(creds, ApiRequest::post(Endpoint::NewPackage, json!({})))
        .await?;

    // 2. Locate the UVIP config id.
    let configs = api
        .call(creds, ApiRequest::get(Endpoint::ConfigList))
        .await?;
    if !configs.is_ok() {
        return Ok(Outcome::failure(format!(
            "Failed to get config list. Status: {}",
            configs.status
        )));
    }
    let Some(config_id) = find_uvip_config_id(&configs.body) else {
        return Ok(Outcome::failure(MSG_NO_UVIP_CONFIG));
    };

    // 3. Network id for that config.
    let meals = api
        .call(
            creds,
            ApiRequest::post(Endpoint::MealList, json!({ "config_id": config_id })),
        )
        .await?;
    if !meals.is_ok() {
        return Ok(Outcome::failure(format!(
            "Failed to get meal list. Status: {}",
            meals.status
        )));
    }
    let Some(network_id) = find_network_id(&meals.body) else {
        return Ok(Outcome::failure(MSG_NO_NETWORK_ID));
    };

    // 4. Price quote for a 4-hour subscription paid with points.
    let price = api
        .call(
            creds,
            ApiRequest::post(
                Endpoint::QueryResourcePrice,
                price_request(&config_id, &network_id),
            ),
        )
        .await?;
    if !price.is_ok() {
        return Ok(Outcome::failure(format!(
            "Failed to query price. Status: {}",
            price.status
        )));
    }
    let Some(amount_id) = data_field(&price.body, "amount_id") else {
        return Ok(Outcome::failure(format!(
            "Failed to get Amount ID. Msg: {}",
            server_msg(&price.body)
        )));
    };

    // 5. Pay through the free channel.
    let order = api
        .call(
            creds,
            ApiRequest::post(
                Endpoint::Payment,
                json!({ "amount_id": amount_id, "pay_channel": "free" }),
            ),
        )
        .await?;
    if !order.is_ok() {
        return Ok(Outcome::failure(format!(
            "Payment request failed. Status: {}",
            order.status
        )));
    }
    match data_field(&order.body, "order_id") {
        Some(order_id) => Ok(Outcome::success(format!(
            "Ordered successful, Order ID: {}",
            display_value(&order_id)
        ))),
        None => Ok(Outcome::failure(format!(
            "Order Failed. Msg: {}",
            server_msg(&order.body)
        ))),
    }
}

/// Lightweight credential check used before storing an account.
pub async fn validate_credentials(
    api: &dyn UgPhoneApi,
    creds: &Credentials,
    timeout: Duration,
) -> Outcome {
    let req = ApiRequest::get(Endpoint::ConfigList).with_timeout(timeout);
    match api.call(creds, req).await {
        Ok(resp) if resp.is_ok() => {
            if resp.body.get("code").and_then(Value::as_i64) == Some(200) {
                Outcome::success("Credentials valid.")
            } else {
                Outcome::failure(format!("API Error: {}", server_msg(&resp.body)))
            }
        }
        Ok(resp) => Outcome::failure(format!("HTTP Error: {}", resp.status)),
        Err(e) if e.is_timeout() => Outcome::failure("Validation request timed out."),
        Err(e) => Outcome::failure(format!("Validation error: {e}")),
    }
}

fn price_request(config_id: &Value, network_id: &Value) -> Value {
    json!({
        "order_type": "newpay",
        "period_time": "4",
        "unit": "hour",
        "resource_type": "cloudphone",
        "resource_param": {
            "pay_mode": "subscription",
            "config_id": config_id,
            "network_id": network_id,
            "count": 1,
            "use_points": 3,
            "points": 250,
        },
    })
}

fn find_uvip_config_id(body: &Value) -> Option<Value> {
    let item = body
        .pointer("/data/list")?
        .as_array()?
        .iter()
        .find(|item| item.get("config_name").and_then(Value::as_str) == Some(UVIP_CONFIG_NAME))?;
    let id = item.pointer("/android_version/0/config_id")?;
    is_present(id).then(|| id.clone())
}

fn find_network_id(body: &Value) -> Option<Value> {
    body.pointer("/data/list/subscription/0/network_id")
        .filter(|v| !v.is_null())
        .cloned()
}

fn data_field(body: &Value, key: &str) -> Option<Value> {
    body.get("data")?
        .get(key)
        .filter(|v| !v.is_null())
        .cloned()
}

/// Server-supplied `msg`, or "Unknown error".
fn server_msg(body: &Value) -> String {
    match body.get("msg") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "Unknown error".to_string(),
        Some(other) => other.to_string(),
    }
}

fn display_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Ids arrive as strings or numbers; empty/zero/false mean "not configured".
fn is_present(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
