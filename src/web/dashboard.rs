use super::error::ApiError;
use super::{ok, BackendData};
use crate::app_config;
use crate::backend::StatsQuery;
use crate::middleware::ClientCtx;
use crate::poll::{summaries_from_rows, DashboardStats};
use actix_web::{get, HttpResponse};
use chrono::Utc;
use uuid::Uuid;

/// Polls shown in the dashboard's recent list.
const RECENT_POLLS: usize = 5;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_dashboard);
}

#[get("/api/dashboard")]
pub async fn view_dashboard(
    client: ClientCtx,
    backend: BackendData,
) -> Result<HttpResponse, ApiError> {
    let user_id = client.require_login()?;
    let token = client.access_token();
    let limits = app_config::limits();

    let stats = backend
        .list_poll_stats(
            token,
            &StatsQuery {
                author_id: Some(user_id),
                limit: None,
            },
        )
        .await
        .map_err(|e| {
            log::error!("view_dashboard: {}", e);
            ApiError::internal(e)
        })?;

    let ids: Vec<Uuid> = stats.iter().map(|p| p.poll_id).collect();
    let options = backend.list_option_stats(token, &ids).await.map_err(|e| {
        log::error!("view_dashboard: option stats: {}", e);
        ApiError::internal(e)
    })?;

    let polls = summaries_from_rows(stats, &options, limits.options_preview as usize);
    Ok(ok(DashboardStats::from_summaries(
        polls,
        Utc::now(),
        RECENT_POLLS,
    )))
}
