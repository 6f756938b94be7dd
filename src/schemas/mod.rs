use std::collections::HashMap;

use serde::Serialize;

pub(crate) mod auth;
pub(crate) mod exam;
pub(crate) mod submission;
pub(crate) mod user;

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) service: String,
    pub(crate) status: String,
    pub(crate) components: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RootResponse {
    pub(crate) message: String,
    pub(crate) version: String,
    pub(crate) login_url: String,
    pub(crate) signup_url: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct AboutResponse {
    pub(crate) name: String,
    pub(crate) description: &'static str,
    pub(crate) roles: Vec<RoleDescription>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RoleDescription {
    pub(crate) role: &'static str,
    pub(crate) summary: &'static str,
}
