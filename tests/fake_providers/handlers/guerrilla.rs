//! Guerrilla Mail dialect.
//!
//! One endpoint dispatches on the `f` query parameter. An address
//! comes with a `sid_token` that later calls must echo back.

use crate::fake_providers::upstream::{Mode, Upstream};
use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;

pub const DOMAIN: &str = "sharklasers.com";

const TIMESTAMP: i64 = 1_714_555_800;

pub async fn ajax(
    State(upstream): State<Arc<Upstream>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let provider = &upstream.guerrilla;
    if !provider.hit() {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    match params.get("f").map(String::as_str) {
        Some("get_email_address") => {
            if provider.mode() == Mode::Rejecting {
                return Json(json!({ "error": "rate limited" })).into_response();
            }
            let mut sessions = upstream.sessions.lock().unwrap();
            let sid = format!("sid-{}", sessions.len() + 1);
            sessions.push(sid.clone());
            Json(json!({
                "email_addr": format!("guest{}@{DOMAIN}", sessions.len()),
                "email_timestamp": TIMESTAMP,
                "alias": "guest",
                "sid_token": sid,
            }))
            .into_response()
        }
        Some("check_email") => {
            if !valid_session(&upstream, &params) {
                return StatusCode::FORBIDDEN.into_response();
            }
            let list: Vec<Value> = upstream
                .messages()
                .iter()
                .map(|m| {
                    json!({
                        "mail_id": m.id,
                        "mail_from": m.from,
                        "mail_subject": m.subject.clone().unwrap_or_default(),
                        "mail_excerpt": m.body,
                        "mail_timestamp": TIMESTAMP.to_string(),
                    })
                })
                .collect();
            Json(json!({ "list": list, "count": list.len() })).into_response()
        }
        Some("fetch_email") => {
            if !valid_session(&upstream, &params) {
                return StatusCode::FORBIDDEN.into_response();
            }
            let found = params
                .get("email_id")
                .and_then(|id| upstream.find_message(id));
            match found {
                Some(m) => {
                    provider.record_read();
                    Json(json!({
                        "mail_id": m.id,
                        "mail_from": m.from,
                        "mail_subject": m.subject.clone().unwrap_or_default(),
                        "mail_timestamp": TIMESTAMP.to_string(),
                        "mail_body": format!("<div>{}</div>", m.body),
                    }))
                    .into_response()
                }
                None => Json(json!(false)).into_response(),
            }
        }
        _ => StatusCode::BAD_REQUEST.into_response(),
    }
}

fn valid_session(
    upstream: &Upstream,
    params: &HashMap<String, String>,
) -> bool {
    params
        .get("sid_token")
        .is_some_and(|sid| upstream.sessions.lock().unwrap().contains(sid))
}
