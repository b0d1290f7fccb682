use super::error::ApiError;
use super::{acknowledged, ok, BackendData};
use crate::app_config;
use crate::constants::FALLBACK_CONTENT_TYPE;
use crate::middleware::ClientCtx;
use crate::user::{avatar_path, ProfileView, UpdateProfileRequest};
use actix_multipart::{Field, Multipart};
use actix_web::{get, post, put, web, HttpResponse};
use chrono::Utc;
use futures::TryStreamExt;
use serde::Serialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_profile)
        .service(update_profile)
        .service(upload_avatar);
}

#[derive(Serialize)]
struct UploadedAvatar {
    url: String,
}

/// A file part read into memory.
struct UploadedFile {
    file_name: String,
    content_type: String,
    data: Vec<u8>,
}

#[get("/api/profile")]
pub async fn view_profile(
    client: ClientCtx,
    backend: BackendData,
) -> Result<HttpResponse, ApiError> {
    let user = client.get_user().ok_or(ApiError::Unauthorized)?;

    let profile = match backend.get_profile(client.access_token(), user.id).await {
        Ok(profile) => profile,
        Err(e) => {
            log::warn!("view_profile: {}: {}", user.id, e);
            None
        }
    };

    Ok(ok(ProfileView::new(user, profile)))
}

#[put("/api/profile")]
pub async fn update_profile(
    client: ClientCtx,
    backend: BackendData,
    body: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, ApiError> {
    let user_id = client.require_login()?;
    let token = client.access_token();

    backend
        .upsert_profile(token, body.to_upsert(user_id))
        .await
        .map_err(ApiError::bad_request)?;

    // The identity keeps its own copy of the display name.
    if let (Some(name), Some(token)) = (body.metadata_name(), token) {
        if let Err(e) = backend.update_user_name(token, name).await {
            log::warn!("update_profile: metadata name for {}: {}", user_id, e);
        }
    }

    Ok(acknowledged())
}

/// Reads a file part, refusing anything over `limit` bytes.
async fn read_file_field(field: &mut Field, limit: usize) -> Result<UploadedFile, ApiError> {
    let file_name = field
        .content_disposition()
        .get_filename()
        .unwrap_or_default()
        .to_owned();
    let content_type = field
        .content_type()
        .map(mime::Mime::to_string)
        .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_owned());

    let mut data: Vec<u8> = Vec::new();
    while let Some(chunk) = field.try_next().await.map_err(|e| {
        log::warn!("upload_avatar: multipart read error: {}", e);
        ApiError::BadRequest(e.to_string())
    })? {
        if data.len() + chunk.len() > limit {
            return Err(ApiError::BadRequest("File too large".to_string()));
        }
        data.extend_from_slice(&chunk);
    }

    Ok(UploadedFile {
        file_name,
        content_type,
        data,
    })
}

#[post("/api/profile/upload")]
pub async fn upload_avatar(
    client: ClientCtx,
    backend: BackendData,
    mut multipart: Multipart,
) -> Result<HttpResponse, ApiError> {
    let user_id = client.require_login()?;
    let limit = app_config::limits().max_upload_bytes();

    let mut upload: Option<UploadedFile> = None;
    while let Some(mut field) = multipart.try_next().await.map_err(|e| {
        log::debug!("upload_avatar: unreadable form: {}", e);
        ApiError::BadRequest("No file".to_string())
    })? {
        if field.content_disposition().get_name() == Some("file") && upload.is_none() {
            upload = Some(read_file_field(&mut field, limit).await?);
        } else {
            // Drain parts we don't use so the stream can advance.
            while field
                .try_next()
                .await
                .map_err(|e| ApiError::BadRequest(e.to_string()))?
                .is_some()
            {}
        }
    }

    let upload = upload.ok_or_else(|| ApiError::BadRequest("No file".to_string()))?;

    let bucket = app_config::storage().avatar_bucket;
    let path = avatar_path(user_id, Utc::now().timestamp_millis(), &upload.file_name);

    let stored = backend
        .upload_object(
            client.access_token(),
            &bucket,
            &path,
            upload.data,
            &upload.content_type,
        )
        .await
        .map_err(|e| {
            log::warn!("upload_avatar: {}/{}: {}", bucket, path, e);
            ApiError::bad_request(e)
        })?;

    Ok(ok(UploadedAvatar {
        url: backend.public_url(&bucket, &stored),
    }))
}
