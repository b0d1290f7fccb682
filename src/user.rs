use crate::backend::{AuthUser, ProfileRow, ProfileUpsert};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's profile as shown to themselves: identity fields plus profile row fields.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub id: Uuid,
    pub email: Option<String>,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

impl ProfileView {
    /// Combine the identity with its profile row, which may not exist yet.
    pub fn new(user: &AuthUser, profile: Option<ProfileRow>) -> Self {
        let (name, avatar_url) = profile
            .map(|p| (p.name, p.avatar_url))
            .unwrap_or((None, None));
        Self {
            id: user.id,
            email: user.email.clone(),
            name,
            avatar_url,
        }
    }
}

/// Body of `PUT /api/profile`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl UpdateProfileRequest {
    /// The profile row to upsert. Absent fields are written as NULL.
    pub fn to_upsert(&self, user_id: Uuid) -> ProfileUpsert {
        ProfileUpsert {
            id: user_id,
            name: self.name.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }

    /// Name to mirror into the identity's metadata, if one was given.
    pub fn metadata_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }
}

/// Reduce a client supplied file name to its last path component.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or("")
        .trim();
    if base.is_empty() || base == "." || base == ".." {
        "upload".to_string()
    } else {
        base.to_string()
    }
}

/// Storage path for an uploaded avatar: `{user_id}/{unix_millis}-{file_name}`.
pub fn avatar_path(user_id: Uuid, unix_millis: i64, file_name: &str) -> String {
    format!("{}/{}-{}", user_id, unix_millis, sanitize_file_name(file_name))
}
