//! Poll endpoints: listing, creation, detail, editing, deletion and voting.

use super::error::ApiError;
use super::{acknowledged, created, ok, Ack, BackendData};
use crate::app_config;
use crate::backend::{NewVote, StatsQuery};
use crate::middleware::ClientCtx;
use crate::poll::{
    detail_from_rows, option_rows, summaries_from_rows, CreatePollRequest, ListQuery,
    UpdatePollRequest, VoteRequest,
};
use actix_web::{delete, get, patch, post, web, HttpResponse};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_polls)
        .service(create_poll)
        .service(view_poll)
        .service(vote_on_poll)
        .service(vote_on_poll_alias)
        .service(update_poll)
        .service(delete_poll);
}

#[derive(Serialize)]
struct CreatedPoll {
    id: Uuid,
}

#[get("/api/polls")]
pub async fn view_polls(
    client: ClientCtx,
    backend: BackendData,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, ApiError> {
    let limits = app_config::limits();
    let token = client.access_token();

    let stats = backend
        .list_poll_stats(
            token,
            &StatsQuery {
                author_id: None,
                limit: Some(limits.polls_per_page),
            },
        )
        .await
        .map_err(|e| {
            log::error!("view_polls: poll_stats: {}", e);
            ApiError::internal(e)
        })?;

    let ids: Vec<Uuid> = stats.iter().map(|p| p.poll_id).collect();
    let options = backend.list_option_stats(token, &ids).await.map_err(|e| {
        log::error!("view_polls: poll_option_stats: {}", e);
        ApiError::internal(e)
    })?;

    let polls = summaries_from_rows(stats, &options, limits.options_preview as usize);
    Ok(ok(query.apply(polls, Utc::now())))
}

#[post("/api/polls")]
pub async fn create_poll(
    client: ClientCtx,
    backend: BackendData,
    body: web::Json<CreatePollRequest>,
) -> Result<HttpResponse, ApiError> {
    let user_id = client.require_login()?;
    let token = client.access_token();

    let (poll, options) = body
        .into_inner()
        .into_new_poll(user_id)
        .map_err(ApiError::BadRequest)?;

    let poll_id = backend.insert_poll(token, poll).await.map_err(|e| {
        log::error!("create_poll: insert poll: {}", e);
        ApiError::internal(e)
    })?;

    // Not transactional: a failure here leaves the poll without options.
    backend
        .insert_options(token, option_rows(poll_id, options))
        .await
        .map_err(|e| {
            log::error!("create_poll: insert options for {}: {}", poll_id, e);
            ApiError::internal(e)
        })?;

    log::info!("Poll {} created by {}", poll_id, user_id);
    Ok(created(CreatedPoll { id: poll_id }))
}

#[get("/api/polls/{poll_id}")]
pub async fn view_poll(
    client: ClientCtx,
    backend: BackendData,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let poll_id = path.into_inner();
    let token = client.access_token();

    let poll = match backend.get_poll(token, poll_id).await {
        Ok(Some(poll)) => poll,
        Ok(None) => return Err(ApiError::not_found()),
        Err(e) => {
            log::warn!("view_poll: {}: {}", poll_id, e);
            return Err(ApiError::NotFound(e.to_string()));
        }
    };

    let options = match backend.list_option_stats(token, &[poll_id]).await {
        Ok(options) => options,
        Err(e) => {
            log::warn!("view_poll: option stats for {}: {}", poll_id, e);
            Vec::new()
        }
    };

    Ok(ok(detail_from_rows(poll, &options, Utc::now())))
}

/// Insert one vote row per selected option. The backend enforces expiry,
/// single-vote polls and duplicates; its message is passed back as a 400.
async fn cast_vote(
    client: ClientCtx,
    backend: BackendData,
    poll_id: Uuid,
    body: VoteRequest,
) -> Result<HttpResponse, ApiError> {
    let voter_id = client.require_login()?;

    if body.option_ids.is_empty() {
        return Err(ApiError::BadRequest("No options selected".to_string()));
    }

    let votes = body
        .option_ids
        .into_iter()
        .map(|option_id| NewVote {
            poll_id,
            option_id,
            voter_id,
        })
        .collect();

    backend
        .insert_votes(client.access_token(), votes)
        .await
        .map_err(|e| {
            log::debug!("cast_vote: {} on {} rejected: {}", voter_id, poll_id, e);
            ApiError::bad_request(e)
        })?;

    Ok(created(Ack { ok: true }))
}

#[post("/api/polls/{poll_id}")]
pub async fn vote_on_poll(
    client: ClientCtx,
    backend: BackendData,
    path: web::Path<Uuid>,
    body: web::Json<VoteRequest>,
) -> Result<HttpResponse, ApiError> {
    cast_vote(client, backend, path.into_inner(), body.into_inner()).await
}

#[post("/api/polls/{poll_id}/vote")]
pub async fn vote_on_poll_alias(
    client: ClientCtx,
    backend: BackendData,
    path: web::Path<Uuid>,
    body: web::Json<VoteRequest>,
) -> Result<HttpResponse, ApiError> {
    cast_vote(client, backend, path.into_inner(), body.into_inner()).await
}

/// Confirms the caller authored the poll. A poll the caller cannot see is
/// treated the same as one they don't own.
async fn require_author(
    client: &ClientCtx,
    backend: &BackendData,
    poll_id: Uuid,
) -> Result<(), ApiError> {
    client.require_login()?;

    let author_id = match backend.get_poll(client.access_token(), poll_id).await {
        Ok(poll) => poll.map(|p| p.author_id),
        Err(e) => {
            log::warn!("Ownership read for poll {} failed: {}", poll_id, e);
            None
        }
    };

    client.require_ownership(author_id)
}

#[patch("/api/polls/{poll_id}")]
pub async fn update_poll(
    client: ClientCtx,
    backend: BackendData,
    path: web::Path<Uuid>,
    body: web::Json<UpdatePollRequest>,
) -> Result<HttpResponse, ApiError> {
    let poll_id = path.into_inner();
    require_author(&client, &backend, poll_id).await?;
    let token = client.access_token();

    let (changes, options) = body.into_inner().into_changes().map_err(ApiError::BadRequest)?;

    if !changes.is_empty() {
        backend
            .update_poll(token, poll_id, &changes)
            .await
            .map_err(ApiError::bad_request)?;
    }

    if let Some(options) = options {
        backend
            .delete_options(token, poll_id)
            .await
            .map_err(ApiError::bad_request)?;
        backend
            .insert_options(token, option_rows(poll_id, options))
            .await
            .map_err(ApiError::bad_request)?;
    }

    Ok(acknowledged())
}

#[delete("/api/polls/{poll_id}")]
pub async fn delete_poll(
    client: ClientCtx,
    backend: BackendData,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let poll_id = path.into_inner();
    require_author(&client, &backend, poll_id).await?;

    backend
        .delete_poll(client.access_token(), poll_id)
        .await
        .map_err(ApiError::bad_request)?;

    log::info!("Poll {} deleted", poll_id);
    Ok(acknowledged())
}
