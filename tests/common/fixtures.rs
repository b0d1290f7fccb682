//! Test fixtures for creating test data
#![allow(dead_code)]

use chrono::{DateTime, Utc};
use quickpoll::backend::{Backend, MemoryBackend, NewOption, NewPoll, NewVote};
use uuid::Uuid;

/// Poll fixture
pub struct TestPoll {
    pub id: Uuid,
    /// Option ids in position order.
    pub options: Vec<Uuid>,
}

/// Options on a fixture poll
pub struct PollSpec<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub options: &'a [&'a str],
    pub is_public: bool,
    pub allow_multiple_votes: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Default for PollSpec<'_> {
    fn default() -> Self {
        Self {
            title: "Best lunch spot",
            description: None,
            options: &["Pizza", "Sushi", "Tacos"],
            is_public: true,
            allow_multiple_votes: false,
            expires_at: None,
        }
    }
}

/// Create a poll owned by the user behind `token`.
pub async fn create_test_poll(
    backend: &MemoryBackend,
    token: &str,
    spec: PollSpec<'_>,
) -> TestPoll {
    let author = backend
        .get_user(token)
        .await
        .unwrap()
        .expect("fixture token is registered");

    let id = backend
        .insert_poll(
            Some(token),
            NewPoll {
                author_id: author.id,
                title: spec.title.to_string(),
                description: spec.description.map(str::to_string),
                is_public: spec.is_public,
                allow_multiple_votes: spec.allow_multiple_votes,
                expires_at: spec.expires_at,
            },
        )
        .await
        .expect("Failed to create test poll");

    backend
        .insert_options(
            Some(token),
            spec.options
                .iter()
                .enumerate()
                .map(|(i, text)| NewOption {
                    poll_id: id,
                    option_text: text.to_string(),
                    position: i as i32,
                })
                .collect(),
        )
        .await
        .expect("Failed to create test poll options");

    let options = backend
        .list_option_stats(Some(token), &[id])
        .await
        .unwrap()
        .into_iter()
        .map(|o| o.option_id)
        .collect();

    TestPoll { id, options }
}

/// Cast votes directly through the backend.
pub async fn cast_test_votes(
    backend: &MemoryBackend,
    token: &str,
    poll_id: Uuid,
    option_ids: &[Uuid],
) {
    let voter = backend.get_user(token).await.unwrap().unwrap();
    backend
        .insert_votes(
            Some(token),
            option_ids
                .iter()
                .map(|&option_id| NewVote {
                    poll_id,
                    option_id,
                    voter_id: voter.id,
                })
                .collect(),
        )
        .await
        .expect("Failed to cast test votes");
}
