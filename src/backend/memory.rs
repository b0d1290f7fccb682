//! In-process backend.
//!
//! Keeps the hosted schema's tables in memory and applies the same rules the
//! hosted database enforces through row-level security, constraints and
//! triggers. Error messages follow Postgres wording so routes behave the same
//! against either backend.

use super::{
    AuthUser, Backend, BackendError, NewOption, NewPoll, NewVote, OptionStatsRow, PollChanges,
    PollRow, PollStatsRow, ProfileRow, ProfileUpsert, StatsQuery, VoteRow,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use url::Url;
use uuid::Uuid;

const STATUS_BAD_REQUEST: u16 = 400;
const STATUS_UNAUTHORIZED: u16 = 401;
const STATUS_FORBIDDEN: u16 = 403;
const STATUS_CONFLICT: u16 = 409;

/// Fewest options the `poll_options` trigger lets a poll start with.
const MIN_POLL_OPTIONS: usize = 2;

fn rls_violation(table: &str) -> BackendError {
    BackendError::api(
        STATUS_FORBIDDEN,
        format!(
            "new row violates row-level security policy for table \"{}\"",
            table
        ),
    )
}

fn foreign_key_violation(table: &str, constraint: &str) -> BackendError {
    BackendError::api(
        STATUS_CONFLICT,
        format!(
            "insert or update on table \"{}\" violates foreign key constraint \"{}\"",
            table, constraint
        ),
    )
}

#[derive(Clone, Debug)]
struct OptionRecord {
    id: Uuid,
    poll_id: Uuid,
    option_text: String,
    position: i32,
}

#[derive(Clone, Debug)]
struct VoteRecord {
    row: VoteRow,
    poll_id: Uuid,
    voter_id: Uuid,
}

/// An object held in the in-process store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Default)]
struct Tables {
    /// Access token -> identity.
    users: HashMap<String, AuthUser>,
    /// Polls with their insertion sequence, used to break timestamp ties.
    polls: Vec<(u64, PollRow)>,
    next_seq: u64,
    options: Vec<OptionRecord>,
    votes: Vec<VoteRecord>,
    profiles: HashMap<Uuid, ProfileRow>,
    /// "bucket/path" -> object.
    objects: HashMap<String, StoredObject>,
}

impl Tables {
    fn caller(&self, token: Option<&str>) -> Option<Uuid> {
        token.and_then(|t| self.users.get(t)).map(|u| u.id)
    }

    fn poll(&self, id: Uuid) -> Option<&PollRow> {
        self.polls.iter().map(|(_, p)| p).find(|p| p.id == id)
    }

    /// Row policy on `polls`: public polls for everyone, private ones for their author.
    fn is_visible(poll: &PollRow, caller: Option<Uuid>) -> bool {
        poll.is_public || Some(poll.author_id) == caller
    }

    fn is_author(&self, poll_id: Uuid, caller: Option<Uuid>) -> bool {
        match (self.poll(poll_id), caller) {
            (Some(poll), Some(caller)) => poll.author_id == caller,
            _ => false,
        }
    }

    fn votes_for_option(&self, option_id: Uuid) -> i64 {
        self.votes
            .iter()
            .filter(|v| v.row.option_id == option_id)
            .count() as i64
    }

    fn votes_for_poll(&self, poll_id: Uuid) -> i64 {
        self.votes.iter().filter(|v| v.poll_id == poll_id).count() as i64
    }

    /// Checks a vote batch against the vote policies, constraints and triggers.
    fn check_votes(&self, caller: Option<Uuid>, votes: &[NewVote]) -> Result<(), BackendError> {
        let caller = caller.ok_or_else(|| rls_violation("votes"))?;
        let now = Utc::now();
        let mut batch: HashSet<(Uuid, Uuid)> = HashSet::new();
        let mut per_poll: HashMap<Uuid, usize> = HashMap::new();

        for vote in votes {
            if vote.voter_id != caller {
                return Err(rls_violation("votes"));
            }

            let poll = self
                .poll(vote.poll_id)
                .filter(|p| Tables::is_visible(p, Some(caller)))
                .ok_or_else(|| foreign_key_violation("votes", "votes_poll_id_fkey"))?;

            let option_matches = self
                .options
                .iter()
                .any(|o| o.id == vote.option_id && o.poll_id == vote.poll_id);
            if !option_matches {
                return Err(foreign_key_violation("votes", "votes_option_id_fkey"));
            }

            if let Some(expires_at) = poll.expires_at {
                if expires_at <= now {
                    return Err(BackendError::api(STATUS_BAD_REQUEST, "Poll has expired"));
                }
            }

            let duplicate_in_table = self.votes.iter().any(|v| {
                v.poll_id == vote.poll_id
                    && v.row.option_id == vote.option_id
                    && v.voter_id == caller
            });
            if duplicate_in_table || !batch.insert((vote.poll_id, vote.option_id)) {
                return Err(BackendError::api(
                    STATUS_CONFLICT,
                    "duplicate key value violates unique constraint \"votes_poll_id_option_id_voter_id_key\"",
                ));
            }

            let count = per_poll.entry(vote.poll_id).or_insert(0);
            *count += 1;

            if !poll.allow_multiple_votes {
                let existing = self
                    .votes
                    .iter()
                    .any(|v| v.poll_id == vote.poll_id && v.voter_id == caller);
                if existing || *count > 1 {
                    return Err(BackendError::api(
                        STATUS_BAD_REQUEST,
                        "This poll does not allow multiple votes",
                    ));
                }
            }
        }

        Ok(())
    }
}

/// In-process backend.
pub struct MemoryBackend {
    tables: RwLock<Tables>,
    /// Base of public object URLs.
    public_url: String,
}

impl MemoryBackend {
    /// Create an empty backend whose public object URLs start with `public_url`.
    pub fn new(public_url: String) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    /// Register an identity reachable through `token`.
    ///
    /// Registering the same token twice returns the existing identity.
    pub fn add_user(&self, token: &str, email: &str, name: Option<String>) -> AuthUser {
        let mut tables = match self.tables.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        tables
            .users
            .entry(token.to_string())
            .or_insert_with(|| AuthUser {
                id: Uuid::new_v4(),
                email: Some(email.to_string()),
                name,
            })
            .clone()
    }

    /// A stored object, if present.
    pub fn object(&self, bucket: &str, path: &str) -> Option<StoredObject> {
        self.read()
            .ok()?
            .objects
            .get(&format!("{}/{}", bucket, path))
            .cloned()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, BackendError> {
        self.tables
            .read()
            .map_err(|e| BackendError::Transport(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, BackendError> {
        self.tables
            .write()
            .map_err(|e| BackendError::Transport(e.to_string()))
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn get_user(&self, token: &str) -> Result<Option<AuthUser>, BackendError> {
        Ok(self.read()?.users.get(token).cloned())
    }

    async fn update_user_name(&self, token: &str, name: &str) -> Result<(), BackendError> {
        let mut tables = self.write()?;
        let user = tables
            .users
            .get_mut(token)
            .ok_or_else(|| BackendError::api(STATUS_UNAUTHORIZED, "invalid JWT"))?;
        user.name = Some(name.to_string());
        Ok(())
    }

    async fn list_poll_stats(
        &self,
        token: Option<&str>,
        query: &StatsQuery,
    ) -> Result<Vec<PollStatsRow>, BackendError> {
        let tables = self.read()?;
        let caller = tables.caller(token);

        let mut polls: Vec<&(u64, PollRow)> = tables
            .polls
            .iter()
            .filter(|(_, p)| Tables::is_visible(p, caller))
            .filter(|(_, p)| query.author_id.map_or(true, |a| p.author_id == a))
            .collect();
        polls.sort_by(|(seq_a, a), (seq_b, b)| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| seq_b.cmp(seq_a))
        });

        Ok(polls
            .into_iter()
            .take(query.limit.map_or(usize::MAX, |l| l as usize))
            .map(|(_, p)| PollStatsRow {
                poll_id: p.id,
                title: p.title.clone(),
                description: p.description.clone(),
                author_id: p.author_id,
                is_public: p.is_public,
                allow_multiple_votes: p.allow_multiple_votes,
                expires_at: p.expires_at,
                created_at: p.created_at,
                total_votes: Some(tables.votes_for_poll(p.id)),
            })
            .collect())
    }

    async fn list_option_stats(
        &self,
        token: Option<&str>,
        poll_ids: &[Uuid],
    ) -> Result<Vec<OptionStatsRow>, BackendError> {
        let tables = self.read()?;
        let caller = tables.caller(token);

        let mut options: Vec<&OptionRecord> = tables
            .options
            .iter()
            .filter(|o| poll_ids.contains(&o.poll_id))
            .filter(|o| {
                tables
                    .poll(o.poll_id)
                    .map_or(false, |p| Tables::is_visible(p, caller))
            })
            .collect();
        options.sort_by_key(|o| o.position);

        Ok(options
            .into_iter()
            .map(|o| OptionStatsRow {
                option_id: o.id,
                poll_id: o.poll_id,
                option_text: o.option_text.clone(),
                position: o.position,
                vote_count: Some(tables.votes_for_option(o.id)),
            })
            .collect())
    }

    async fn get_poll(
        &self,
        token: Option<&str>,
        id: Uuid,
    ) -> Result<Option<PollRow>, BackendError> {
        let tables = self.read()?;
        let caller = tables.caller(token);
        Ok(tables
            .poll(id)
            .filter(|p| Tables::is_visible(p, caller))
            .cloned())
    }

    async fn insert_poll(&self, token: Option<&str>, poll: NewPoll) -> Result<Uuid, BackendError> {
        let mut tables = self.write()?;
        if tables.caller(token) != Some(poll.author_id) {
            return Err(rls_violation("polls"));
        }

        let id = Uuid::new_v4();
        let seq = tables.next_seq;
        tables.next_seq += 1;
        tables.polls.push((
            seq,
            PollRow {
                id,
                title: poll.title,
                description: poll.description,
                author_id: poll.author_id,
                is_public: poll.is_public,
                allow_multiple_votes: poll.allow_multiple_votes,
                expires_at: poll.expires_at,
                created_at: Utc::now(),
            },
        ));
        Ok(id)
    }

    async fn update_poll(
        &self,
        token: Option<&str>,
        id: Uuid,
        changes: &PollChanges,
    ) -> Result<(), BackendError> {
        let mut tables = self.write()?;
        let caller = tables.caller(token);

        // Rows hidden by the update policy are simply not matched.
        if let Some((_, poll)) = tables
            .polls
            .iter_mut()
            .find(|(_, p)| p.id == id && Some(p.author_id) == caller)
        {
            if let Some(title) = &changes.title {
                poll.title = title.clone();
            }
            if let Some(description) = &changes.description {
                poll.description = description.clone();
            }
            if let Some(is_public) = changes.is_public {
                poll.is_public = is_public;
            }
            if let Some(allow_multiple_votes) = changes.allow_multiple_votes {
                poll.allow_multiple_votes = allow_multiple_votes;
            }
            if let Some(expires_at) = changes.expires_at {
                poll.expires_at = expires_at;
            }
        }
        Ok(())
    }

    async fn delete_poll(&self, token: Option<&str>, id: Uuid) -> Result<(), BackendError> {
        let mut tables = self.write()?;
        let caller = tables.caller(token);
        if !tables.is_author(id, caller) {
            return Ok(());
        }

        // ON DELETE CASCADE
        tables.polls.retain(|(_, p)| p.id != id);
        tables.options.retain(|o| o.poll_id != id);
        tables.votes.retain(|v| v.poll_id != id);
        Ok(())
    }

    async fn delete_options(&self, token: Option<&str>, poll_id: Uuid) -> Result<(), BackendError> {
        let mut tables = self.write()?;
        let caller = tables.caller(token);
        if !tables.is_author(poll_id, caller) {
            return Ok(());
        }

        let removed: HashSet<Uuid> = tables
            .options
            .iter()
            .filter(|o| o.poll_id == poll_id)
            .map(|o| o.id)
            .collect();
        tables.options.retain(|o| o.poll_id != poll_id);
        tables.votes.retain(|v| !removed.contains(&v.row.option_id));
        Ok(())
    }

    async fn insert_options(
        &self,
        token: Option<&str>,
        options: Vec<NewOption>,
    ) -> Result<(), BackendError> {
        let mut tables = self.write()?;
        let caller = tables.caller(token);

        let mut per_poll: HashMap<Uuid, usize> = HashMap::new();
        for option in &options {
            if tables.poll(option.poll_id).is_none() {
                return Err(foreign_key_violation(
                    "poll_options",
                    "poll_options_poll_id_fkey",
                ));
            }
            if !tables.is_author(option.poll_id, caller) {
                return Err(rls_violation("poll_options"));
            }
            *per_poll.entry(option.poll_id).or_insert(0) += 1;
        }

        // A poll without options must receive at least two at once.
        for (poll_id, count) in per_poll {
            let existing = tables.options.iter().filter(|o| o.poll_id == poll_id).count();
            if existing == 0 && count < MIN_POLL_OPTIONS {
                return Err(BackendError::api(
                    STATUS_BAD_REQUEST,
                    "A poll must have at least 2 options",
                ));
            }
        }

        tables
            .options
            .extend(options.into_iter().map(|o| OptionRecord {
                id: Uuid::new_v4(),
                poll_id: o.poll_id,
                option_text: o.option_text,
                position: o.position,
            }));
        Ok(())
    }

    async fn insert_votes(
        &self,
        token: Option<&str>,
        votes: Vec<NewVote>,
    ) -> Result<(), BackendError> {
        let mut tables = self.write()?;
        let caller = tables.caller(token);
        tables.check_votes(caller, &votes)?;

        let now = Utc::now();
        tables.votes.extend(votes.into_iter().map(|v| VoteRecord {
            row: VoteRow {
                id: Uuid::new_v4(),
                option_id: v.option_id,
                created_at: now,
            },
            poll_id: v.poll_id,
            voter_id: v.voter_id,
        }));
        Ok(())
    }

    async fn delete_votes(
        &self,
        token: Option<&str>,
        poll_id: Uuid,
        voter_id: Uuid,
    ) -> Result<(), BackendError> {
        let mut tables = self.write()?;
        if tables.caller(token) != Some(voter_id) {
            return Ok(());
        }
        tables
            .votes
            .retain(|v| !(v.poll_id == poll_id && v.voter_id == voter_id));
        Ok(())
    }

    async fn list_votes(
        &self,
        token: Option<&str>,
        poll_id: Uuid,
        voter_id: Uuid,
    ) -> Result<Vec<VoteRow>, BackendError> {
        let tables = self.read()?;
        if tables.caller(token) != Some(voter_id) {
            return Ok(Vec::new());
        }
        Ok(tables
            .votes
            .iter()
            .filter(|v| v.poll_id == poll_id && v.voter_id == voter_id)
            .map(|v| v.row.clone())
            .collect())
    }

    async fn get_profile(
        &self,
        _token: Option<&str>,
        id: Uuid,
    ) -> Result<Option<ProfileRow>, BackendError> {
        Ok(self.read()?.profiles.get(&id).cloned())
    }

    async fn upsert_profile(
        &self,
        token: Option<&str>,
        profile: ProfileUpsert,
    ) -> Result<(), BackendError> {
        let mut tables = self.write()?;
        if tables.caller(token) != Some(profile.id) {
            return Err(rls_violation("profiles"));
        }

        let created_at = tables
            .profiles
            .get(&profile.id)
            .and_then(|p| p.created_at)
            .unwrap_or_else(Utc::now);
        tables.profiles.insert(
            profile.id,
            ProfileRow {
                id: profile.id,
                name: profile.name,
                avatar_url: profile.avatar_url,
                created_at: Some(created_at),
            },
        );
        Ok(())
    }

    async fn upload_object(
        &self,
        token: Option<&str>,
        bucket: &str,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BackendError> {
        let mut tables = self.write()?;
        if tables.caller(token).is_none() {
            return Err(rls_violation("objects"));
        }

        let key = format!("{}/{}", bucket, path);
        if tables.objects.contains_key(&key) {
            return Err(BackendError::api(
                STATUS_CONFLICT,
                "The resource already exists",
            ));
        }
        log::debug!("MemoryBackend: upload_object: {}", key);
        tables.objects.insert(
            key,
            StoredObject {
                content_type: content_type.to_string(),
                data,
            },
        );
        Ok(path.to_string())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        let mut url = match Url::parse(&self.public_url) {
            Ok(url) if !url.cannot_be_a_base() => url,
            _ => {
                return format!(
                    "{}/storage/v1/object/public/{}/{}",
                    self.public_url, bucket, path
                )
            }
        };
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["storage", "v1", "object", "public", bucket])
                .extend(path.split('/').filter(|s| !s.is_empty()));
        }
        url.to_string()
    }
}
