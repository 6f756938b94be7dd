use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::collections::HashMap;

use crate::core::metrics;
use crate::core::redis::RedisHealth;
use crate::core::state::AppState;
use crate::schemas::{AboutResponse, HealthResponse, RoleDescription, RootResponse};
use crate::services::route_guard::LOGIN_PATH;

pub(crate) async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    let api_v1 = &state.settings().api().api_v1_str;
    let response = RootResponse {
        message: "ExamVerse API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        login_url: LOGIN_PATH.to_string(),
        signup_url: format!("{api_v1}/auth/signup"),
    };

    Json(response)
}

pub(crate) async fn about(State(state): State<AppState>) -> Json<AboutResponse> {
    Json(AboutResponse {
        name: state.settings().api().project_name.clone(),
        description: "Practice exams online: download papers, upload answers, get written feedback.",
        roles: vec![
            RoleDescription {
                role: "user",
                summary: "Takes practice exams and uploads answer files",
            },
            RoleDescription {
                role: "assessor",
                summary: "Reviews pending submissions and writes feedback",
            },
            RoleDescription { role: "admin", summary: "Publishes exam papers and manages roles" },
        ],
    })
}

pub(crate) async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut status = "healthy".to_string();
    let mut components = HashMap::new();

    match state.redis().health().await {
        RedisHealth::Healthy => {
            components.insert("redis".to_string(), "healthy".to_string());
        }
        RedisHealth::Disconnected => {
            components.insert("redis".to_string(), "disconnected".to_string());
        }
        RedisHealth::Unhealthy(error) => {
            components.insert("redis".to_string(), format!("unhealthy: {error}"));
            status = "degraded".to_string();
        }
    }

    match state.records().ping().await {
        Ok(()) => {
            components.insert("database".to_string(), "healthy".to_string());
        }
        Err(err) => {
            components.insert("database".to_string(), format!("unhealthy: {err}"));
            status = "unhealthy".to_string();
        }
    }

    let storage = if state.uploads().is_some() { "configured" } else { "not configured" };
    components.insert("storage".to_string(), storage.to_string());
    components.insert("sessions".to_string(), state.sessions().len().await.to_string());

    Json(HealthResponse { service: "examverse-api".to_string(), status, components })
}

pub(crate) async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    if !state.settings().telemetry().prometheus_enabled {
        return StatusCode::NOT_FOUND.into_response();
    }

    match metrics::render() {
        Some(body) => ([(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
            .into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}
