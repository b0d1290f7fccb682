//! Application-wide constants
//!
//! Poll field limits are declared on `poll::PollFieldRules`; the option
//! text limit is checked by hand and lives here.

/// Maximum length for a single option's text in characters
pub const MAX_OPTION_LENGTH: u64 = 100;

/// Storage bucket used for avatars when none is configured
pub const DEFAULT_AVATAR_BUCKET: &str = "avatars";

/// Cookie the identity provider's browser client stores the access token in
pub const DEFAULT_ACCESS_TOKEN_COOKIE: &str = "sb-access-token";

/// Content type used for uploads that don't declare one
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";
