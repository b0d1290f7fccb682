//! Poll wire types and the mapping between them and backend rows.
//!
//! Clients speak camelCase JSON; the backend's schema is snake_case. Every
//! conversion between the two lives here so the route handlers stay thin.

use crate::backend::{NewOption, NewPoll, OptionStatsRow, PollChanges, PollRow, PollStatsRow};
use crate::constants::MAX_OPTION_LENGTH;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Reads `null` as an empty list.
fn nullable_vec<'de, T, D>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn default_true() -> bool {
    true
}

/// An option as shown to clients.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OptionView {
    pub id: Uuid,
    pub text: String,
    pub votes: i64,
}

impl From<&OptionStatsRow> for OptionView {
    fn from(row: &OptionStatsRow) -> Self {
        Self {
            id: row.option_id,
            text: row.option_text.clone(),
            votes: row.vote_count.unwrap_or(0),
        }
    }
}

/// A poll as listed, with a preview of its options.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSummary {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub author_id: Uuid,
    pub is_public: bool,
    pub allow_multiple_votes: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub total_votes: i64,
    pub options: Vec<OptionView>,
}

/// A single poll with all of its options.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollDetail {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub author_id: Uuid,
    pub is_public: bool,
    pub allow_multiple_votes: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub total_votes: i64,
    pub is_expired: bool,
    pub options: Vec<OptionView>,
}

pub fn is_expired(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expires_at.map_or(false, |at| at <= now)
}

/// Option views in position order.
fn ordered_options<'a>(rows: impl IntoIterator<Item = &'a OptionStatsRow>) -> Vec<OptionView> {
    let mut rows: Vec<&OptionStatsRow> = rows.into_iter().collect();
    rows.sort_by_key(|row| row.position);
    rows.into_iter().map(OptionView::from).collect()
}

/// Joins listed polls with their option stats, keeping at most `preview` options per poll.
pub fn summaries_from_rows(
    polls: Vec<PollStatsRow>,
    options: &[OptionStatsRow],
    preview: usize,
) -> Vec<PollSummary> {
    let mut by_poll: HashMap<Uuid, Vec<&OptionStatsRow>> = HashMap::new();
    for row in options {
        by_poll.entry(row.poll_id).or_default().push(row);
    }

    polls
        .into_iter()
        .map(|p| {
            let mut options = ordered_options(by_poll.remove(&p.poll_id).unwrap_or_default());
            options.truncate(preview);
            PollSummary {
                id: p.poll_id,
                title: p.title,
                description: p.description,
                author_id: p.author_id,
                is_public: p.is_public,
                allow_multiple_votes: p.allow_multiple_votes,
                expires_at: p.expires_at,
                created_at: p.created_at,
                total_votes: p.total_votes.unwrap_or(0),
                options,
            }
        })
        .collect()
}

pub fn detail_from_rows(poll: PollRow, options: &[OptionStatsRow], now: DateTime<Utc>) -> PollDetail {
    let options = ordered_options(options);
    PollDetail {
        id: poll.id,
        total_votes: options.iter().map(|o| o.votes).sum(),
        is_expired: is_expired(poll.expires_at, now),
        title: poll.title,
        description: poll.description,
        author_id: poll.author_id,
        is_public: poll.is_public,
        allow_multiple_votes: poll.allow_multiple_votes,
        expires_at: poll.expires_at,
        created_at: poll.created_at,
        options,
    }
}

/// Parse a client supplied expiration.
///
/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM[:SS]` and `YYYY-MM-DD`; the latter two
/// are taken as UTC. Blank input means "no expiration".
pub fn parse_expiry(input: &str) -> Result<Option<DateTime<Utc>>, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    if let Ok(at) = DateTime::parse_from_rfc3339(input) {
        return Ok(Some(at.with_timezone(&Utc)));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(at) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(Some(at.and_utc()));
        }
    }
    if let Some(at) = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(Some(at.and_utc()));
    }
    Err(format!("Invalid expiration date '{}'", input))
}

const TITLE_LENGTH_MESSAGE: &str = "Title must be between 1 and 200 characters";

/// Field rules shared by poll creation and editing. Absent fields are not checked.
#[derive(Debug, Default, Validate)]
pub struct PollFieldRules {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,
    #[validate(length(min = 2, max = 10, message = "A poll needs between 2 and 10 options"))]
    pub options: Option<Vec<String>>,
}

impl PollFieldRules {
    /// Runs every rule and returns the first failure as a client message.
    pub fn check(&self) -> Result<(), String> {
        self.validate().map_err(|e| first_message(&e))?;

        for option in self.options.iter().flatten() {
            let length = option.chars().count() as u64;
            if length == 0 {
                return Err("Option cannot be empty".to_string());
            }
            if length > MAX_OPTION_LENGTH {
                return Err(format!(
                    "Option must be at most {} characters",
                    MAX_OPTION_LENGTH
                ));
            }
        }
        Ok(())
    }
}

fn first_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by_key(|(name, _)| *name);
    fields
        .into_iter()
        .flat_map(|(_, errs)| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Invalid payload".to_string())
}

fn trim_options(options: Vec<String>) -> Vec<String> {
    options.into_iter().map(|o| o.trim().to_string()).collect()
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

/// Option rows for a freshly created or replaced option set, numbered from 0.
pub fn option_rows(poll_id: Uuid, texts: Vec<String>) -> Vec<NewOption> {
    texts
        .into_iter()
        .enumerate()
        .map(|(position, option_text)| NewOption {
            poll_id,
            option_text,
            position: position as i32,
        })
        .collect()
}

/// Body of `POST /api/polls`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default = "default_true")]
    pub is_public: bool,
    #[serde(default)]
    pub allow_multiple_votes: bool,
    #[serde(default)]
    pub expires_at: Option<String>,
}

impl CreatePollRequest {
    /// Validate and split into the poll row and its option texts.
    pub fn into_new_poll(self, author_id: Uuid) -> Result<(NewPoll, Vec<String>), String> {
        let title = self.title.trim().to_string();
        let description = normalize_description(self.description);
        let options = trim_options(self.options);

        PollFieldRules {
            title: Some(title.clone()),
            description: description.clone(),
            options: Some(options.clone()),
        }
        .check()?;

        let expires_at = match self.expires_at {
            Some(raw) => parse_expiry(&raw)?,
            None => None,
        };

        Ok((
            NewPoll {
                author_id,
                title,
                description,
                is_public: self.is_public,
                allow_multiple_votes: self.allow_multiple_votes,
                expires_at,
            },
            options,
        ))
    }
}

/// Body of `PATCH /api/polls/{id}`. Only present fields are changed.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePollRequest {
    #[serde(default, deserialize_with = "double_option")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub is_public: Option<bool>,
    #[serde(default)]
    pub allow_multiple_votes: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub expires_at: Option<Option<String>>,
    #[serde(default)]
    pub options: Option<Vec<String>>,
}

impl UpdatePollRequest {
    /// Validate and split into column changes and an optional replacement option set.
    pub fn into_changes(self) -> Result<(PollChanges, Option<Vec<String>>), String> {
        let title = match self.title {
            Some(Some(title)) => Some(title.trim().to_string()),
            // The title column is NOT NULL.
            Some(None) => return Err(TITLE_LENGTH_MESSAGE.to_string()),
            None => None,
        };
        let description = self.description.map(normalize_description);
        let options = self.options.map(trim_options);

        PollFieldRules {
            title: title.clone(),
            description: description.clone().flatten(),
            options: options.clone(),
        }
        .check()?;

        let expires_at = match self.expires_at {
            Some(Some(raw)) => Some(parse_expiry(&raw)?),
            Some(None) => Some(None),
            None => None,
        };

        Ok((
            PollChanges {
                title,
                description,
                is_public: self.is_public,
                allow_multiple_votes: self.allow_multiple_votes,
                expires_at,
            },
            options,
        ))
    }
}

/// Body of a vote request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    #[serde(default, deserialize_with = "nullable_vec")]
    pub option_ids: Vec<Uuid>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListFilter {
    #[default]
    All,
    Public,
    Private,
    Active,
    Expired,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListSort {
    #[default]
    Newest,
    Oldest,
    MostVoted,
    LeastVoted,
}

/// Query string of `GET /api/polls`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub filter: ListFilter,
    #[serde(default)]
    pub sort: ListSort,
}

impl ListQuery {
    fn matches(&self, poll: &PollSummary, now: DateTime<Utc>) -> bool {
        if let Some(q) = self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let q = q.to_lowercase();
            let in_title = poll.title.to_lowercase().contains(&q);
            let in_description = poll
                .description
                .as_deref()
                .map_or(false, |d| d.to_lowercase().contains(&q));
            if !in_title && !in_description {
                return false;
            }
        }

        match self.filter {
            ListFilter::All => true,
            ListFilter::Public => poll.is_public,
            ListFilter::Private => !poll.is_public,
            ListFilter::Active => !is_expired(poll.expires_at, now),
            ListFilter::Expired => is_expired(poll.expires_at, now),
        }
    }

    /// Filter and order a page of polls. Ties keep their incoming order.
    pub fn apply(&self, polls: Vec<PollSummary>, now: DateTime<Utc>) -> Vec<PollSummary> {
        let mut polls: Vec<PollSummary> =
            polls.into_iter().filter(|p| self.matches(p, now)).collect();

        match self.sort {
            ListSort::Newest => polls.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            ListSort::Oldest => polls.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            ListSort::MostVoted => polls.sort_by(|a, b| b.total_votes.cmp(&a.total_votes)),
            ListSort::LeastVoted => polls.sort_by(|a, b| a.total_votes.cmp(&b.total_votes)),
        }
        polls
    }
}

/// Figures for a user's own polls.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_polls: usize,
    pub total_votes: i64,
    pub active_polls: usize,
    pub recent_polls: Vec<PollSummary>,
}

impl DashboardStats {
    pub fn from_summaries(polls: Vec<PollSummary>, now: DateTime<Utc>, recent: usize) -> Self {
        Self {
            total_polls: polls.len(),
            total_votes: polls.iter().map(|p| p.total_votes).sum(),
            active_polls: polls
                .iter()
                .filter(|p| !is_expired(p.expires_at, now))
                .count(),
            recent_polls: polls.into_iter().take(recent).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn summary(title: &str, votes: i64, minutes_ago: i64, expires_in: Option<i64>) -> PollSummary {
        let now = Utc::now();
        PollSummary {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: None,
            author_id: Uuid::nil(),
            is_public: votes % 2 == 0,
            allow_multiple_votes: false,
            expires_at: expires_in.map(|m| now + Duration::minutes(m)),
            created_at: now - Duration::minutes(minutes_ago),
            total_votes: votes,
            options: Vec::new(),
        }
    }

    fn create(title: &str, options: &[&str]) -> CreatePollRequest {
        CreatePollRequest {
            title: title.to_string(),
            description: None,
            options: options.iter().map(|s| s.to_string()).collect(),
            is_public: true,
            allow_multiple_votes: false,
            expires_at: None,
        }
    }

    #[test]
    fn test_create_request_defaults() {
        let req: CreatePollRequest =
            serde_json::from_str(r#"{"title":"Best editor?","options":["vim","emacs"]}"#).unwrap();
        assert!(req.is_public);
        assert!(!req.allow_multiple_votes);
        assert!(req.expires_at.is_none());
    }

    #[test]
    fn test_create_requires_two_options() {
        let err = create("Lonely", &["only"])
            .into_new_poll(Uuid::nil())
            .unwrap_err();
        assert_eq!(err, "A poll needs between 2 and 10 options");
    }

    #[test]
    fn test_create_rejects_blank_title_and_options() {
        assert!(create("   ", &["a", "b"]).into_new_poll(Uuid::nil()).is_err());
        let err = create("Title", &["a", "  "])
            .into_new_poll(Uuid::nil())
            .unwrap_err();
        assert_eq!(err, "Option cannot be empty");
    }

    #[test]
    fn test_create_enforces_length_limits() {
        let long_title = "x".repeat(201);
        assert!(create(&long_title, &["a", "b"])
            .into_new_poll(Uuid::nil())
            .is_err());

        let long_option = "y".repeat(MAX_OPTION_LENGTH as usize + 1);
        assert!(create("Title", &["a", long_option.as_str()])
            .into_new_poll(Uuid::nil())
            .is_err());

        let eleven: Vec<String> = (0..11).map(|i| i.to_string()).collect();
        let eleven: Vec<&str> = eleven.iter().map(String::as_str).collect();
        assert!(create("Title", &eleven).into_new_poll(Uuid::nil()).is_err());

        let mut req = create("Title", &["a", "b"]);
        req.description = Some("d".repeat(1001));
        assert!(req.into_new_poll(Uuid::nil()).is_err());

        let ten: Vec<String> = (0..10).map(|i| i.to_string()).collect();
        let ten: Vec<&str> = ten.iter().map(String::as_str).collect();
        let title = "t".repeat(200);
        assert!(create(&title, &ten).into_new_poll(Uuid::nil()).is_ok());
    }

    #[test]
    fn test_create_maps_fields() {
        let author = Uuid::new_v4();
        let mut req = create("  Lunch  ", &[" Pizza ", "Sushi"]);
        req.description = Some("   ".to_string());
        req.expires_at = Some("2030-01-02T03:04:05Z".to_string());
        let (poll, options) = req.into_new_poll(author).unwrap();

        assert_eq!(poll.title, "Lunch");
        assert_eq!(poll.author_id, author);
        assert_eq!(poll.description, None);
        assert_eq!(
            poll.expires_at,
            Some(Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap())
        );
        assert_eq!(options, vec!["Pizza".to_string(), "Sushi".to_string()]);
    }

    #[test]
    fn test_parse_expiry_formats() {
        let expected = Utc.with_ymd_and_hms(2030, 6, 1, 12, 30, 0).unwrap();
        assert_eq!(parse_expiry("2030-06-01T12:30:00Z").unwrap(), Some(expected));
        assert_eq!(
            parse_expiry("2030-06-01T14:30:00+02:00").unwrap(),
            Some(expected)
        );
        assert_eq!(parse_expiry("2030-06-01T12:30").unwrap(), Some(expected));
        assert_eq!(
            parse_expiry("2030-06-01").unwrap(),
            Some(Utc.with_ymd_and_hms(2030, 6, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_expiry("  ").unwrap(), None);
        assert!(parse_expiry("next tuesday").is_err());
    }

    #[test]
    fn test_update_distinguishes_null_from_absent() {
        let req: UpdatePollRequest =
            serde_json::from_str(r#"{"description":null,"expiresAt":null}"#).unwrap();
        let (changes, options) = req.into_changes().unwrap();
        assert_eq!(changes.description, Some(None));
        assert_eq!(changes.expires_at, Some(None));
        assert_eq!(changes.title, None);
        assert!(options.is_none());

        let req: UpdatePollRequest = serde_json::from_str(r#"{}"#).unwrap();
        let (changes, options) = req.into_changes().unwrap();
        assert!(changes.is_empty());
        assert!(options.is_none());
    }

    #[test]
    fn test_update_validates_present_fields() {
        let req: UpdatePollRequest = serde_json::from_str(r#"{"options":["one"]}"#).unwrap();
        assert!(req.into_changes().is_err());

        let req: UpdatePollRequest = serde_json::from_str(r#"{"title":""}"#).unwrap();
        assert!(req.into_changes().is_err());

        let req: UpdatePollRequest = serde_json::from_str(r#"{"title":null}"#).unwrap();
        assert_eq!(
            req.into_changes().unwrap_err(),
            "Title must be between 1 and 200 characters"
        );

        let req: UpdatePollRequest = serde_json::from_str(r#"{"title":" Renamed "}"#).unwrap();
        let (changes, _) = req.into_changes().unwrap();
        assert_eq!(changes.title.as_deref(), Some("Renamed"));

        let req: UpdatePollRequest =
            serde_json::from_str(r#"{"isPublic":false,"options":["a","b","c"]}"#).unwrap();
        let (changes, options) = req.into_changes().unwrap();
        assert_eq!(changes.is_public, Some(false));
        assert_eq!(options.unwrap().len(), 3);
    }

    #[test]
    fn test_option_rows_are_numbered_from_zero() {
        let poll_id = Uuid::new_v4();
        let rows = option_rows(poll_id, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(rows[0].position, 0);
        assert_eq!(rows[1].position, 1);
        assert!(rows.iter().all(|r| r.poll_id == poll_id));
    }

    #[test]
    fn test_summaries_truncate_option_preview() {
        let poll_id = Uuid::new_v4();
        let stats = PollStatsRow {
            poll_id,
            title: "Many".to_string(),
            description: None,
            author_id: Uuid::nil(),
            is_public: true,
            allow_multiple_votes: false,
            expires_at: None,
            created_at: Utc::now(),
            total_votes: None,
        };
        let options: Vec<OptionStatsRow> = (0..7)
            .map(|i| OptionStatsRow {
                option_id: Uuid::new_v4(),
                poll_id,
                option_text: format!("Option {}", i),
                position: i as i32,
                vote_count: Some(i),
            })
            .rev()
            .collect();

        let summaries = summaries_from_rows(vec![stats], &options, 5);
        assert_eq!(summaries[0].options.len(), 5);
        assert_eq!(summaries[0].total_votes, 0);
        assert_eq!(summaries[0].options[0].text, "Option 0");
        assert_eq!(summaries[0].options[4].votes, 4);
    }

    #[test]
    fn test_detail_orders_options_by_position() {
        let poll = PollRow {
            id: Uuid::new_v4(),
            title: "Order".to_string(),
            description: None,
            author_id: Uuid::nil(),
            is_public: true,
            allow_multiple_votes: false,
            expires_at: None,
            created_at: Utc::now(),
        };
        let option = |text: &str, position: i32, votes: i64| OptionStatsRow {
            option_id: Uuid::new_v4(),
            poll_id: poll.id,
            option_text: text.to_string(),
            position,
            vote_count: Some(votes),
        };
        let rows = vec![option("third", 2, 1), option("first", 0, 3), option("second", 1, 0)];

        let detail = detail_from_rows(poll.clone(), &rows, Utc::now());
        let texts: Vec<&str> = detail.options.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
        assert_eq!(detail.total_votes, 4);
    }

    #[test]
    fn test_vote_request_null_or_missing_selects_nothing() {
        let req: VoteRequest = serde_json::from_str(r#"{"optionIds":null}"#).unwrap();
        assert!(req.option_ids.is_empty());
        let req: VoteRequest = serde_json::from_str(r#"{}"#).unwrap();
        assert!(req.option_ids.is_empty());
        let id = Uuid::new_v4();
        let req: VoteRequest =
            serde_json::from_str(&format!(r#"{{"optionIds":["{}"]}}"#, id)).unwrap();
        assert_eq!(req.option_ids, vec![id]);
    }

    #[test]
    fn test_list_query_filters_and_sorts() {
        let now = Utc::now();
        let polls = vec![
            summary("Rust or Go", 4, 10, None),
            summary("Tabs or spaces", 9, 5, Some(-1)),
            summary("Favourite rust crate", 2, 1, Some(60)),
        ];

        let query = ListQuery {
            q: Some("RUST".to_string()),
            ..Default::default()
        };
        let found = query.apply(polls.clone(), now);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].title, "Favourite rust crate");

        let query = ListQuery {
            filter: ListFilter::Expired,
            ..Default::default()
        };
        let expired = query.apply(polls.clone(), now);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].title, "Tabs or spaces");

        let query = ListQuery {
            filter: ListFilter::Active,
            sort: ListSort::MostVoted,
            ..Default::default()
        };
        let active: Vec<i64> = query
            .apply(polls.clone(), now)
            .iter()
            .map(|p| p.total_votes)
            .collect();
        assert_eq!(active, vec![4, 2]);

        let query = ListQuery {
            sort: ListSort::Oldest,
            ..Default::default()
        };
        assert_eq!(query.apply(polls, now)[0].title, "Rust or Go");
    }

    #[test]
    fn test_list_filter_parses_kebab_case() {
        let sort: ListSort = serde_json::from_str(r#""most-voted""#).unwrap();
        assert_eq!(sort, ListSort::MostVoted);
        assert!(serde_json::from_str::<ListFilter>(r#""archived""#).is_err());
    }

    #[test]
    fn test_dashboard_stats() {
        let now = Utc::now();
        let polls = vec![
            summary("a", 3, 1, None),
            summary("b", 5, 2, Some(-5)),
            summary("c", 0, 3, Some(5)),
        ];
        let stats = DashboardStats::from_summaries(polls, now, 2);
        assert_eq!(stats.total_polls, 3);
        assert_eq!(stats.total_votes, 8);
        assert_eq!(stats.active_polls, 2);
        assert_eq!(stats.recent_polls.len(), 2);
    }
}
