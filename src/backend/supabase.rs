//! Hosted backend over its REST, auth and storage APIs.

use super::{
    AuthUser, Backend, BackendError, NewOption, NewPoll, NewVote, OptionStatsRow, PollChanges,
    PollRow, PollStatsRow, ProfileRow, ProfileUpsert, StatsQuery, VoteRow,
};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

const POLL_COLUMNS: &str =
    "id,title,description,author_id,is_public,allow_multiple_votes,expires_at,created_at";
const POLL_STATS_COLUMNS: &str = "poll_id,title,description,author_id,is_public,allow_multiple_votes,expires_at,created_at,total_votes";
const OPTION_STATS_COLUMNS: &str = "option_id,poll_id,option_text,position,vote_count";
const VOTE_COLUMNS: &str = "id,option_id,created_at";
const PROFILE_COLUMNS: &str = "id,name,avatar_url,created_at";

/// Identity as returned by `GET /auth/v1/user`.
#[derive(Deserialize)]
struct UserResponse {
    id: Uuid,
    email: Option<String>,
    #[serde(default)]
    user_metadata: serde_json::Value,
}

#[derive(Deserialize)]
struct InsertedId {
    id: Uuid,
}

#[derive(Deserialize)]
struct UploadResponse {
    #[serde(rename = "Key")]
    key: Option<String>,
}

/// Hosted backend.
pub struct SupabaseBackend {
    client: reqwest::Client,
    base_url: Url,
    anon_key: String,
}

impl SupabaseBackend {
    /// Create a backend for the project at `url`.
    pub fn new(url: &str, anon_key: String, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = Url::parse(url)?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Backend URL '{}' cannot be used as a base URL", url);
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("quickpoll/", env!("CARGO_PKG_VERSION")))
            .build()?;

        log::info!("SupabaseBackend initialized for {}", base_url);

        Ok(Self {
            client,
            base_url,
            anon_key,
        })
    }

    /// Build a URL below the project root from unencoded path segments.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            for segment in segments {
                // Object paths may hold several segments.
                path.extend(segment.split('/').filter(|s| !s.is_empty()));
            }
        }
        url
    }

    fn request(&self, method: Method, url: Url, token: Option<&str>) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(token.unwrap_or(&self.anon_key))
    }

    fn table(&self, method: Method, table: &str, token: Option<&str>) -> RequestBuilder {
        self.request(method, self.endpoint(&["rest", "v1", table]), token)
    }

    /// Pull a human readable message out of an error body.
    ///
    /// The REST, auth and storage services each name the field differently.
    fn error_message(status: StatusCode, body: &str) -> String {
        serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|json| {
                ["message", "msg", "error_description", "error"]
                    .iter()
                    .find_map(|field| json.get(field).and_then(|v| v.as_str()).map(String::from))
            })
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Backend request failed")
                    .to_string()
            })
    }

    async fn check(response: Response) -> Result<Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = Self::error_message(status, &body);
        log::debug!("SupabaseBackend: {} {}", status, message);
        Err(BackendError::api(status.as_u16(), message))
    }

    async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, BackendError> {
        let response = Self::check(request.send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    async fn send(request: RequestBuilder) -> Result<(), BackendError> {
        Self::check(request.send().await?).await?;
        Ok(())
    }

    fn eq(value: impl std::fmt::Display) -> String {
        format!("eq.{}", value)
    }

    /// Option stats for several polls, each poll's options in position order.
    fn option_stats_request(&self, token: Option<&str>, poll_ids: &[Uuid]) -> RequestBuilder {
        let ids = poll_ids
            .iter()
            .map(Uuid::to_string)
            .collect::<Vec<_>>()
            .join(",");
        self.table(Method::GET, "poll_option_stats", token)
            .query(&[
                ("select", OPTION_STATS_COLUMNS.to_string()),
                ("poll_id", format!("in.({})", ids)),
                ("order", "poll_id.asc,position.asc".to_string()),
            ])
    }
}

#[async_trait]
impl Backend for SupabaseBackend {
    async fn get_user(&self, token: &str) -> Result<Option<AuthUser>, BackendError> {
        let request = self.request(
            Method::GET,
            self.endpoint(&["auth", "v1", "user"]),
            Some(token),
        );
        match Self::send_json::<UserResponse>(request).await {
            Ok(user) => Ok(Some(AuthUser {
                id: user.id,
                email: user.email,
                name: user
                    .user_metadata
                    .get("name")
                    .and_then(|v| v.as_str())
                    .map(String::from),
            })),
            Err(BackendError::Api { status, .. }) if status == 401 || status == 403 => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn update_user_name(&self, token: &str, name: &str) -> Result<(), BackendError> {
        let request = self
            .request(
                Method::PUT,
                self.endpoint(&["auth", "v1", "user"]),
                Some(token),
            )
            .json(&serde_json::json!({ "data": { "name": name } }));
        Self::send(request).await
    }

    async fn list_poll_stats(
        &self,
        token: Option<&str>,
        query: &StatsQuery,
    ) -> Result<Vec<PollStatsRow>, BackendError> {
        let mut params = vec![
            ("select", POLL_STATS_COLUMNS.to_string()),
            ("order", "created_at.desc".to_string()),
        ];
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(author_id) = query.author_id {
            params.push(("author_id", Self::eq(author_id)));
        }
        let request = self.table(Method::GET, "poll_stats", token).query(&params);
        Self::send_json(request).await
    }

    async fn list_option_stats(
        &self,
        token: Option<&str>,
        poll_ids: &[Uuid],
    ) -> Result<Vec<OptionStatsRow>, BackendError> {
        if poll_ids.is_empty() {
            return Ok(Vec::new());
        }
        Self::send_json(self.option_stats_request(token, poll_ids)).await
    }

    async fn get_poll(
        &self,
        token: Option<&str>,
        id: Uuid,
    ) -> Result<Option<PollRow>, BackendError> {
        let request = self.table(Method::GET, "polls", token).query(&[
            ("select", POLL_COLUMNS.to_string()),
            ("id", Self::eq(id)),
            ("limit", "1".to_string()),
        ]);
        let rows: Vec<PollRow> = Self::send_json(request).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_poll(&self, token: Option<&str>, poll: NewPoll) -> Result<Uuid, BackendError> {
        let request = self
            .table(Method::POST, "polls", token)
            .query(&[("select", "id")])
            .header("Prefer", "return=representation")
            .json(&poll);
        let rows: Vec<InsertedId> = Self::send_json(request).await?;
        rows.into_iter()
            .next()
            .map(|row| row.id)
            .ok_or_else(|| BackendError::Decode("Insert returned no rows".to_string()))
    }

    async fn update_poll(
        &self,
        token: Option<&str>,
        id: Uuid,
        changes: &PollChanges,
    ) -> Result<(), BackendError> {
        let request = self
            .table(Method::PATCH, "polls", token)
            .query(&[("id", Self::eq(id))])
            .json(changes);
        Self::send(request).await
    }

    async fn delete_poll(&self, token: Option<&str>, id: Uuid) -> Result<(), BackendError> {
        let request = self
            .table(Method::DELETE, "polls", token)
            .query(&[("id", Self::eq(id))]);
        Self::send(request).await
    }

    async fn delete_options(&self, token: Option<&str>, poll_id: Uuid) -> Result<(), BackendError> {
        let request = self
            .table(Method::DELETE, "poll_options", token)
            .query(&[("poll_id", Self::eq(poll_id))]);
        Self::send(request).await
    }

    async fn insert_options(
        &self,
        token: Option<&str>,
        options: Vec<NewOption>,
    ) -> Result<(), BackendError> {
        let request = self
            .table(Method::POST, "poll_options", token)
            .json(&options);
        Self::send(request).await
    }

    async fn insert_votes(
        &self,
        token: Option<&str>,
        votes: Vec<NewVote>,
    ) -> Result<(), BackendError> {
        let request = self.table(Method::POST, "votes", token).json(&votes);
        Self::send(request).await
    }

    async fn delete_votes(
        &self,
        token: Option<&str>,
        poll_id: Uuid,
        voter_id: Uuid,
    ) -> Result<(), BackendError> {
        let request = self.table(Method::DELETE, "votes", token).query(&[
            ("poll_id", Self::eq(poll_id)),
            ("voter_id", Self::eq(voter_id)),
        ]);
        Self::send(request).await
    }

    async fn list_votes(
        &self,
        token: Option<&str>,
        poll_id: Uuid,
        voter_id: Uuid,
    ) -> Result<Vec<VoteRow>, BackendError> {
        let request = self.table(Method::GET, "votes", token).query(&[
            ("select", VOTE_COLUMNS.to_string()),
            ("poll_id", Self::eq(poll_id)),
            ("voter_id", Self::eq(voter_id)),
        ]);
        Self::send_json(request).await
    }

    async fn get_profile(
        &self,
        token: Option<&str>,
        id: Uuid,
    ) -> Result<Option<ProfileRow>, BackendError> {
        let request = self.table(Method::GET, "profiles", token).query(&[
            ("select", PROFILE_COLUMNS.to_string()),
            ("id", Self::eq(id)),
            ("limit", "1".to_string()),
        ]);
        let rows: Vec<ProfileRow> = Self::send_json(request).await?;
        Ok(rows.into_iter().next())
    }

    async fn upsert_profile(
        &self,
        token: Option<&str>,
        profile: ProfileUpsert,
    ) -> Result<(), BackendError> {
        let request = self
            .table(Method::POST, "profiles", token)
            .header("Prefer", "resolution=merge-duplicates")
            .json(&profile);
        Self::send(request).await
    }

    async fn upload_object(
        &self,
        token: Option<&str>,
        bucket: &str,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BackendError> {
        log::info!("SupabaseBackend: upload_object: {}/{}", bucket, path);

        let url = self.endpoint(&["storage", "v1", "object", bucket, path]);
        let request = self
            .request(Method::POST, url, token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(data);
        let uploaded: UploadResponse = Self::send_json(request).await?;

        // The returned key is prefixed with the bucket name.
        let stored = uploaded
            .key
            .as_deref()
            .and_then(|key| key.strip_prefix(&format!("{}/", bucket)))
            .unwrap_or(path)
            .to_string();
        Ok(stored)
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        self.endpoint(&["storage", "v1", "object", "public", bucket, path])
            .to_string()
    }
}
