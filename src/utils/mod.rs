use once_cell::sync::Lazy;
use regex::Regex;

/// Default name of the version-tracking table maintained by migrate
pub const DEFAULT_TABLE_NAME: &str = "schema_migrations";

/// Default binary name, resolved on PATH
pub const DEFAULT_COMMAND: &str = "migrate";

/// Matches the `user:password@` portion of a connection URL
static URL_PASSWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<scheme>[^:/]+://[^:/@]+):[^@]*@").expect("valid regex"));

/// Hide the password of a connection string before it reaches the logs
pub fn redact_database_url(url: &str) -> String {
    URL_PASSWORD.replace(url, "$scheme:***@").into_owned()
}

/// Case-insensitive substring check
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
