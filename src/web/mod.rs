pub mod dashboard;
pub mod error;
pub mod polls;
pub mod profile;
pub mod votes;

use crate::app_config;
use crate::backend::Backend;
use actix_web::{web, HttpResponse};
use error::ApiError;
use serde::Serialize;
use std::sync::Arc;

/// The backend as registered in app data.
pub type BackendData = web::Data<Arc<dyn Backend>>;

/// Success envelope: `{"data": ...}`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct Ack {
    pub ok: bool,
}

/// 200 with `data`.
pub fn ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(Envelope { data })
}

/// 201 with `data`.
pub fn created<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Created().json(Envelope { data })
}

/// 200 with `{"data": {"ok": true}}`.
pub fn acknowledged() -> HttpResponse {
    ok(Ack { ok: true })
}

/// JSON bodies: size limit from config, parse failures rendered as 400 envelopes.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(app_config::limits().max_json_bytes())
        .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into())
}

/// Path segments that fail to parse (e.g. a malformed poll id) name nothing.
pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|_err, _req| ApiError::not_found().into())
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into())
}

/// Fallback for unmatched routes so they also answer with an error envelope.
pub async fn not_found() -> Result<HttpResponse, ApiError> {
    Err(ApiError::not_found())
}

/// Configures the web app by adding services from each web file.
///
/// @see https://docs.rs/actix-web/4.0.1/actix_web/struct.App.html#method.configure
pub fn configure(conf: &mut web::ServiceConfig) {
    conf.app_data(json_config())
        .app_data(path_config())
        .app_data(query_config());

    // Descending order. Order is important.
    // Route resolution will stop at the first match.
    polls::configure(conf);
    votes::configure(conf);
    profile::configure(conf);
    dashboard::configure(conf);
}
