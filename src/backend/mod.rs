//! Backend abstraction for persistence, identity and object storage.
//!
//! Every poll, vote and profile lives in the hosted backend. Access rules
//! (row-level security, unique constraints, vote triggers, cascades) are the
//! backend's job; this crate only issues calls on behalf of the caller.
//!
//! Supports two implementations:
//! - `supabase`: the hosted service over its REST, auth and storage APIs
//! - `memory`: an in-process emulation of the same schema and rules

pub mod memory;
pub mod supabase;

use crate::app_config::AppConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

pub use memory::MemoryBackend;
pub use supabase::SupabaseBackend;

/// An authenticated identity as reported by the identity service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
    /// Display name from the identity's metadata, if any.
    pub name: Option<String>,
}

/// Row of the `polls` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PollRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub author_id: Uuid,
    pub is_public: bool,
    pub allow_multiple_votes: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Row of the `poll_stats` view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PollStatsRow {
    pub poll_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub author_id: Uuid,
    pub is_public: bool,
    pub allow_multiple_votes: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub total_votes: Option<i64>,
}

/// Row of the `poll_option_stats` view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptionStatsRow {
    pub option_id: Uuid,
    pub poll_id: Uuid,
    pub option_text: String,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub vote_count: Option<i64>,
}

/// Insert payload for `polls`.
#[derive(Clone, Debug, Serialize)]
pub struct NewPoll {
    pub author_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub allow_multiple_votes: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Partial update payload for `polls`. `None` leaves a column untouched;
/// `Some(None)` writes NULL.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PollChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_multiple_votes: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Option<DateTime<Utc>>>,
}

impl PollChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Insert payload for `poll_options`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NewOption {
    pub poll_id: Uuid,
    pub option_text: String,
    pub position: i32,
}

/// Insert payload for `votes`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NewVote {
    pub poll_id: Uuid,
    pub option_id: Uuid,
    pub voter_id: Uuid,
}

/// A caller's own vote row, as selected from `votes`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoteRow {
    pub id: Uuid,
    pub option_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Row of the `profiles` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProfileRow {
    pub id: Uuid,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Upsert payload for `profiles`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProfileUpsert {
    pub id: Uuid,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Selection for the `poll_stats` view, always newest first.
#[derive(Clone, Debug, Default)]
pub struct StatsQuery {
    pub author_id: Option<Uuid>,
    /// `None` returns every matching row.
    pub limit: Option<u32>,
}

/// Backend operation errors.
///
/// The display text of `Api` is the backend's message unmodified so routes
/// can hand it to clients as-is.
#[derive(Debug)]
pub enum BackendError {
    /// The backend rejected the call.
    Api { status: u16, message: String },
    /// The backend could not be reached.
    Transport(String),
    /// The backend answered with something we couldn't read.
    Decode(String),
}

impl BackendError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        BackendError::Api {
            status,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::Api { message, .. } => write!(f, "{}", message),
            BackendError::Transport(msg) => write!(f, "Backend unreachable: {}", msg),
            BackendError::Decode(msg) => write!(f, "Unreadable backend response: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            BackendError::Decode(e.to_string())
        } else {
            BackendError::Transport(e.to_string())
        }
    }
}

/// Trait for backends.
///
/// `token` is the caller's access token; `None` calls as the anonymous role.
/// Row-level rules are evaluated against that identity, so a row the caller
/// may not see is reported as absent rather than as an error.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Resolve an access token. Unknown or expired tokens yield `Ok(None)`.
    async fn get_user(&self, token: &str) -> Result<Option<AuthUser>, BackendError>;

    /// Store a display name in the identity's metadata.
    async fn update_user_name(&self, token: &str, name: &str) -> Result<(), BackendError>;

    async fn list_poll_stats(
        &self,
        token: Option<&str>,
        query: &StatsQuery,
    ) -> Result<Vec<PollStatsRow>, BackendError>;

    async fn list_option_stats(
        &self,
        token: Option<&str>,
        poll_ids: &[Uuid],
    ) -> Result<Vec<OptionStatsRow>, BackendError>;

    async fn get_poll(&self, token: Option<&str>, id: Uuid)
        -> Result<Option<PollRow>, BackendError>;

    /// Insert a poll and return its id.
    async fn insert_poll(&self, token: Option<&str>, poll: NewPoll) -> Result<Uuid, BackendError>;

    async fn update_poll(
        &self,
        token: Option<&str>,
        id: Uuid,
        changes: &PollChanges,
    ) -> Result<(), BackendError>;

    async fn delete_poll(&self, token: Option<&str>, id: Uuid) -> Result<(), BackendError>;

    async fn delete_options(&self, token: Option<&str>, poll_id: Uuid) -> Result<(), BackendError>;

    async fn insert_options(
        &self,
        token: Option<&str>,
        options: Vec<NewOption>,
    ) -> Result<(), BackendError>;

    /// Insert vote rows as one statement: all are written or none.
    async fn insert_votes(&self, token: Option<&str>, votes: Vec<NewVote>)
        -> Result<(), BackendError>;

    async fn delete_votes(
        &self,
        token: Option<&str>,
        poll_id: Uuid,
        voter_id: Uuid,
    ) -> Result<(), BackendError>;

    async fn list_votes(
        &self,
        token: Option<&str>,
        poll_id: Uuid,
        voter_id: Uuid,
    ) -> Result<Vec<VoteRow>, BackendError>;

    async fn get_profile(
        &self,
        token: Option<&str>,
        id: Uuid,
    ) -> Result<Option<ProfileRow>, BackendError>;

    async fn upsert_profile(
        &self,
        token: Option<&str>,
        profile: ProfileUpsert,
    ) -> Result<(), BackendError>;

    /// Store an object without overwriting. Returns the stored path.
    async fn upload_object(
        &self,
        token: Option<&str>,
        bucket: &str,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BackendError>;

    /// Public URL of a stored object.
    fn public_url(&self, bucket: &str, path: &str) -> String;
}

/// Build the backend named by the configuration.
pub fn from_config(config: &AppConfig) -> anyhow::Result<Arc<dyn Backend>> {
    match config.backend.kind.as_str() {
        "supabase" => {
            let backend = SupabaseBackend::new(
                &config.backend.url,
                config.backend.anon_key.clone(),
                std::time::Duration::from_secs(config.backend.timeout_seconds),
            )?;
            Ok(Arc::new(backend))
        }
        "memory" => {
            log::warn!("Using the in-process memory backend. Data is lost on restart.");
            let backend = MemoryBackend::new(config.storage.public_url.clone());
            for seed in &config.backend.seed_users {
                let user = backend.add_user(&seed.token, &seed.email, seed.name.clone());
                log::info!("Seeded memory backend user {} ({})", user.id, seed.email);
            }
            Ok(Arc::new(backend))
        }
        other => anyhow::bail!("Unknown backend kind '{}'", other),
    }
}
