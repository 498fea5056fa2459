use crate::server::AdminState;
use axum::extract::State;
use axum::response::Json;
use serde_json::{Value, json};
use std::sync::Arc;

pub async fn health_check(State(state): State<Arc<AdminState>>) -> Json<Value> {
    let options = state.handler.options();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "metrics_path": state.metrics_path,
        "error_handling": options.error_handling.as_str(),
        "compression": !options.disable_compression,
    }))
}
