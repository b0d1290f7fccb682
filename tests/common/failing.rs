//! A backend whose chosen operations fail, for exercising route error paths
#![allow(dead_code)]

use async_trait::async_trait;
use quickpoll::backend::{
    AuthUser, Backend, BackendError, MemoryBackend, NewOption, NewPoll, NewVote, OptionStatsRow,
    PollChanges, PollRow, PollStatsRow, ProfileRow, ProfileUpsert, StatsQuery, VoteRow,
};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Message carried by every injected failure.
pub const OUTAGE: &str = "backend is down";

/// Wraps a memory backend and fails the operations named in `failing`.
pub struct FailingBackend {
    inner: Arc<MemoryBackend>,
    failing: HashSet<&'static str>,
}

impl FailingBackend {
    pub fn new(inner: Arc<MemoryBackend>, failing: &[&'static str]) -> Arc<Self> {
        Arc::new(Self {
            inner,
            failing: failing.iter().copied().collect(),
        })
    }

    fn check(&self, operation: &str) -> Result<(), BackendError> {
        if self.failing.contains(operation) {
            Err(BackendError::api(503, OUTAGE))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Backend for FailingBackend {
    async fn get_user(&self, token: &str) -> Result<Option<AuthUser>, BackendError> {
        self.check("get_user")?;
        self.inner.get_user(token).await
    }

    async fn update_user_name(&self, token: &str, name: &str) -> Result<(), BackendError> {
        self.check("update_user_name")?;
        self.inner.update_user_name(token, name).await
    }

    async fn list_poll_stats(
        &self,
        token: Option<&str>,
        query: &StatsQuery,
    ) -> Result<Vec<PollStatsRow>, BackendError> {
        self.check("list_poll_stats")?;
        self.inner.list_poll_stats(token, query).await
    }

    async fn list_option_stats(
        &self,
        token: Option<&str>,
        poll_ids: &[Uuid],
    ) -> Result<Vec<OptionStatsRow>, BackendError> {
        self.check("list_option_stats")?;
        self.inner.list_option_stats(token, poll_ids).await
    }

    async fn get_poll(
        &self,
        token: Option<&str>,
        id: Uuid,
    ) -> Result<Option<PollRow>, BackendError> {
        self.check("get_poll")?;
        self.inner.get_poll(token, id).await
    }

    async fn insert_poll(&self, token: Option<&str>, poll: NewPoll) -> Result<Uuid, BackendError> {
        self.check("insert_poll")?;
        self.inner.insert_poll(token, poll).await
    }

    async fn update_poll(
        &self,
        token: Option<&str>,
        id: Uuid,
        changes: &PollChanges,
    ) -> Result<(), BackendError> {
        self.check("update_poll")?;
        self.inner.update_poll(token, id, changes).await
    }

    async fn delete_poll(&self, token: Option<&str>, id: Uuid) -> Result<(), BackendError> {
        self.check("delete_poll")?;
        self.inner.delete_poll(token, id).await
    }

    async fn delete_options(&self, token: Option<&str>, poll_id: Uuid) -> Result<(), BackendError> {
        self.check("delete_options")?;
        self.inner.delete_options(token, poll_id).await
    }

    async fn insert_options(
        &self,
        token: Option<&str>,
        options: Vec<NewOption>,
    ) -> Result<(), BackendError> {
        self.check("insert_options")?;
        self.inner.insert_options(token, options).await
    }

    async fn insert_votes(
        &self,
        token: Option<&str>,
        votes: Vec<NewVote>,
    ) -> Result<(), BackendError> {
        self.check("insert_votes")?;
        self.inner.insert_votes(token, votes).await
    }

    async fn delete_votes(
        &self,
        token: Option<&str>,
        poll_id: Uuid,
        voter_id: Uuid,
    ) -> Result<(), BackendError> {
        self.check("delete_votes")?;
        self.inner.delete_votes(token, poll_id, voter_id).await
    }

    async fn list_votes(
        &self,
        token: Option<&str>,
        poll_id: Uuid,
        voter_id: Uuid,
    ) -> Result<Vec<VoteRow>, BackendError> {
        self.check("list_votes")?;
        self.inner.list_votes(token, poll_id, voter_id).await
    }

    async fn get_profile(
        &self,
        token: Option<&str>,
        id: Uuid,
    ) -> Result<Option<ProfileRow>, BackendError> {
        self.check("get_profile")?;
        self.inner.get_profile(token, id).await
    }

    async fn upsert_profile(
        &self,
        token: Option<&str>,
        profile: ProfileUpsert,
    ) -> Result<(), BackendError> {
        self.check("upsert_profile")?;
        self.inner.upsert_profile(token, profile).await
    }

    async fn upload_object(
        &self,
        token: Option<&str>,
        bucket: &str,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BackendError> {
        self.check("upload_object")?;
        self.inner
            .upload_object(token, bucket, path, data, content_type)
            .await
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        self.inner.public_url(bucket, path)
    }
}
