//! `GET /healthz` / `GET /readyz` — standard operational surface carried by
//! every teacher binary regardless of domain (spec §9 ambient note),
//! grounded in `services/server/src/lib.rs::health`.

use axum::response::IntoResponse;

pub async fn healthz() -> impl IntoResponse {
    "ok"
}

pub async fn readyz() -> impl IntoResponse {
    "ok"
}
