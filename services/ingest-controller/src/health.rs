//! `GET /healthz` / `GET /readyz` — standard operational surface carried by
//! every teacher binary regardless of domain (spec §9 ambient note),
//! identical to the chat gateway's `health` module.

use axum::response::IntoResponse;

pub async fn healthz() -> impl IntoResponse {
    "ok"
}

pub async fn readyz() -> impl IntoResponse {
    "ok"
}
