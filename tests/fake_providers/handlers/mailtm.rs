//! mail.tm dialect.
//!
//! Accounts are registered with `POST /accounts`, exchanged for a
//! bearer token at `POST /token`, and the token is required on every
//! message call. Collections are JSON-LD `hydra:member` arrays.

use crate::fake_providers::upstream::{Account, Mode, Upstream};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use std::sync::Arc;

pub const DOMAIN: &str = "mailtm.test";

const CREATED_AT: &str = "2024-05-01T09:30:00+00:00";

pub async fn domains(State(upstream): State<Arc<Upstream>>) -> Response {
    if !upstream.mailtm.hit() {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    Json(json!({
        "hydra:member": [
            { "id": "d1", "domain": DOMAIN, "isActive": true },
            { "id": "d2", "domain": "retired.test", "isActive": false }
        ],
        "hydra:totalItems": 2
    }))
    .into_response()
}

pub async fn accounts(
    State(upstream): State<Arc<Upstream>>,
    Json(body): Json<Value>,
) -> Response {
    let provider = &upstream.mailtm;
    if !provider.hit() {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    if provider.mode() == Mode::Rejecting {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "detail": "address: This value is already used." })),
        )
            .into_response();
    }

    let (Some(address), Some(password)) =
        (body["address"].as_str(), body["password"].as_str())
    else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let mut accounts = upstream.accounts.lock().unwrap();
    let token = format!("tok-{}", accounts.len() + 1);
    accounts.push(Account {
        address: address.to_string(),
        password: password.to_string(),
        token,
    });

    (
        StatusCode::CREATED,
        Json(json!({
            "id": format!("acc-{}", accounts.len()),
            "address": address,
        })),
    )
        .into_response()
}

pub async fn token(
    State(upstream): State<Arc<Upstream>>,
    Json(body): Json<Value>,
) -> Response {
    if !upstream.mailtm.hit() {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    let accounts = upstream.accounts.lock().unwrap();
    let account = accounts.iter().find(|a| {
        body["address"].as_str() == Some(a.address.as_str())
            && body["password"].as_str() == Some(a.password.as_str())
    });
    match account {
        Some(a) => {
            Json(json!({ "id": "acc", "token": a.token })).into_response()
        }
        None => StatusCode::UNAUTHORIZED.into_response(),
    }
}

pub async fn messages(
    State(upstream): State<Arc<Upstream>>,
    headers: HeaderMap,
) -> Response {
    if !upstream.mailtm.hit() {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    if !authorized(&upstream, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let members: Vec<Value> = upstream
        .messages()
        .iter()
        .map(|m| {
            json!({
                "@id": format!("/messages/{}", m.id),
                "from": { "address": m.from, "name": "" },
                "subject": m.subject.clone().unwrap_or_default(),
                "intro": m.body.chars().take(20).collect::<String>(),
                "createdAt": CREATED_AT,
            })
        })
        .collect();
    Json(json!({
        "hydra:member": members,
        "hydra:totalItems": members.len(),
    }))
    .into_response()
}

pub async fn message(
    State(upstream): State<Arc<Upstream>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let provider = &upstream.mailtm;
    if !provider.hit() {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    if !authorized(&upstream, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    match upstream.find_message(&id) {
        Some(m) => {
            provider.record_read();
            Json(json!({
                "id": m.id,
                "from": { "address": m.from, "name": "" },
                "subject": m.subject.clone().unwrap_or_default(),
                "createdAt": CREATED_AT,
                "text": m.body,
                "html": [format!("<p>{}</p>", m.body)],
                "attachments": [{
                    "id": "att1",
                    "filename": "invoice.pdf",
                    "size": 1024,
                }],
            }))
            .into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

fn authorized(upstream: &Upstream, headers: &HeaderMap) -> bool {
    let Some(token) = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    else {
        return false;
    };
    upstream
        .accounts
        .lock()
        .unwrap()
        .iter()
        .any(|a| a.token == token)
}
