//! Client configuration from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use meritpath_citation::EligibilityRule;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_REALTIME_CHANNEL: &str = "realtime:public:jobs";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    /// Bearer token for the backend; `None` means no session.
    pub access_token: Option<String>,
    /// Directory holding `citation-storage.json`.
    pub state_dir: PathBuf,
    pub eligibility_rule: EligibilityRule,
    pub http_timeout: Duration,
    /// Realtime change feed; disabled when unset.
    pub redis_url: Option<String>,
    pub realtime_channel: String,
}

impl ClientConfig {
    /// Read `MERITPATH_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable lookup.
    ///
    /// Unparseable values are logged and replaced by their default.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_url = non_empty("MERITPATH_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let state_dir = non_empty("MERITPATH_STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_state_dir);

        let eligibility_rule = match non_empty("MERITPATH_ELIGIBILITY_RULE") {
            Some(raw) => raw.parse().unwrap_or_else(|err| {
                warn!(value = %raw, error = %err, "invalid MERITPATH_ELIGIBILITY_RULE; using default");
                EligibilityRule::default()
            }),
            None => EligibilityRule::default(),
        };

        let http_timeout_secs = match non_empty("MERITPATH_HTTP_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    warn!(value = %raw, "invalid MERITPATH_HTTP_TIMEOUT_SECS; using default");
                    DEFAULT_HTTP_TIMEOUT_SECS
                }
            },
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        Self {
            api_url,
            access_token: non_empty("MERITPATH_ACCESS_TOKEN"),
            state_dir,
            eligibility_rule,
            http_timeout: Duration::from_secs(http_timeout_secs),
            redis_url: non_empty("MERITPATH_REDIS_URL"),
            realtime_channel: non_empty("MERITPATH_REALTIME_CHANNEL")
                .unwrap_or_else(|| DEFAULT_REALTIME_CHANNEL.to_string()),
        }
    }
}

/// `{data_dir}/meritpath`, falling back to `~/.local/share/meritpath`.
fn default_state_dir() -> PathBuf {
    let base = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".local");
                h.push("share");
                h
            })
        })
        .unwrap_or_else(|| {
            warn!("no data directory available; keeping state in the working directory");
            PathBuf::from(".")
        });

    base.join("meritpath")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> ClientConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let c = config(&[]);
        assert_eq!(c.api_url, DEFAULT_API_URL);
        assert_eq!(c.access_token, None);
        assert_eq!(c.eligibility_rule, EligibilityRule::PaperCount);
        assert_eq!(c.http_timeout, Duration::from_secs(30));
        assert_eq!(c.redis_url, None);
        assert_eq!(c.realtime_channel, DEFAULT_REALTIME_CHANNEL);
        assert!(c.state_dir.ends_with("meritpath"));
    }

    #[test]
    fn reads_every_variable() {
        let c = config(&[
            ("MERITPATH_API_URL", "https://api.meritpath.test"),
            ("MERITPATH_ACCESS_TOKEN", "tok"),
            ("MERITPATH_STATE_DIR", "/tmp/mp"),
            ("MERITPATH_ELIGIBILITY_RULE", "paper_count_and_influential"),
            ("MERITPATH_HTTP_TIMEOUT_SECS", "5"),
            ("MERITPATH_REDIS_URL", "redis://localhost:6379"),
            ("MERITPATH_REALTIME_CHANNEL", "jobs"),
        ]);
        assert_eq!(c.api_url, "https://api.meritpath.test");
        assert_eq!(c.access_token.as_deref(), Some("tok"));
        assert_eq!(c.state_dir, PathBuf::from("/tmp/mp"));
        assert_eq!(c.eligibility_rule, EligibilityRule::PaperCountAndInfluentialCitations);
        assert_eq!(c.http_timeout, Duration::from_secs(5));
        assert_eq!(c.redis_url.as_deref(), Some("redis://localhost:6379"));
        assert_eq!(c.realtime_channel, "jobs");
    }

    #[test]
    fn bad_values_fall_back() {
        let c = config(&[
            ("MERITPATH_ELIGIBILITY_RULE", "everyone"),
            ("MERITPATH_HTTP_TIMEOUT_SECS", "0"),
            ("MERITPATH_ACCESS_TOKEN", "   "),
        ]);
        assert_eq!(c.eligibility_rule, EligibilityRule::PaperCount);
        assert_eq!(c.http_timeout, Duration::from_secs(30));
        assert_eq!(c.access_token, None);
    }
}
