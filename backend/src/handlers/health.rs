use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};

pub async fn health() -> Json<Value> {
    Json(json!({
        "ok": true,
        "ts": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}
