use bytes::Bytes;
use http::{header, Response, StatusCode};
use http_body_util::Full;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const OK: u16 = 0;
pub const PARAM_INVALID: u16 = 400;
pub const ROUTE_NOT_FOUND: u16 = 404;
pub const RULE_NOT_FOUND: u16 = 4004;
pub const SYSTEM_ERR: u16 = 500;

/// Uniform reply wrapper. A zero code means success; errors ride in `code`
/// and `message` while the HTTP status stays 200 (route misses excepted).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub code: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Envelope {
    pub fn ok(data: Value) -> Self {
        Self { code: OK, message: "ok".into(), data: Some(data) }
    }

    pub fn ok_empty() -> Self {
        Self { code: OK, message: "ok".into(), data: None }
    }

    pub fn param_invalid(msg: impl Into<String>) -> Self {
        Self { code: PARAM_INVALID, message: msg.into(), data: None }
    }

    pub fn route_not_found() -> Self {
        Self { code: ROUTE_NOT_FOUND, message: "ConfigAPI: route not found".into(), data: None }
    }

    pub fn rule_not_found(what: impl Into<String>) -> Self {
        Self { code: RULE_NOT_FOUND, message: what.into(), data: None }
    }

    pub fn system_err(msg: impl Into<String>) -> Self {
        Self { code: SYSTEM_ERR, message: msg.into(), data: None }
    }
}

/// The one envelope writer. The status line is fixed before the body is
/// attached, for every reply shape.
pub fn respond(status: StatusCode, env: &Envelope) -> Response<Full<Bytes>> {
    let body = serde_json::to_vec(env)
        .unwrap_or_else(|_| br#"{"code":500,"message":"envelope encode failure"}"#.to_vec());
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

/// Success envelope around any serializable payload.
pub(crate) fn ok_json<T: Serialize>(data: &T) -> anyhow::Result<Response<Full<Bytes>>> {
    Ok(respond(StatusCode::OK, &Envelope::ok(serde_json::to_value(data)?)))
}
