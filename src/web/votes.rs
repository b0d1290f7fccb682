use super::error::ApiError;
use super::{acknowledged, ok, BackendData};
use crate::middleware::ClientCtx;
use actix_web::{delete, get, web, HttpResponse};
use uuid::Uuid;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(retract_votes).service(view_own_votes);
}

/// Removes every vote the caller cast on the poll.
#[delete("/api/polls/{poll_id}/vote")]
pub async fn retract_votes(
    client: ClientCtx,
    backend: BackendData,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let voter_id = client.require_login()?;
    let poll_id = path.into_inner();

    backend
        .delete_votes(client.access_token(), poll_id, voter_id)
        .await
        .map_err(ApiError::bad_request)?;

    Ok(acknowledged())
}

#[get("/api/polls/{poll_id}/votes")]
pub async fn view_own_votes(
    client: ClientCtx,
    backend: BackendData,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let voter_id = client.require_login()?;
    let poll_id = path.into_inner();

    let votes = backend
        .list_votes(client.access_token(), poll_id, voter_id)
        .await
        .map_err(ApiError::bad_request)?;

    Ok(ok(votes))
}
