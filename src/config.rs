use crate::components::calendar::Feed;
use crate::error::{config_error, env_error, NotifierResult};
use crate::utils::time::parse_timezone;
use chrono_tz::Tz;
use dotenvy::dotenv;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Default timezone for formatting event times
pub const DEFAULT_TIMEZONE: &str = "Europe/Paris";
/// Default seconds between two checks
pub const DEFAULT_CHECK_INTERVAL: u64 = 60;
/// Default location of the notified events record
pub const DEFAULT_STATE_FILE: &str = "notified_events.txt";
/// Default optional TOML file mapping role tags to role ids
pub const DEFAULT_ROLES_FILE: &str = "config/roles.toml";
/// Default message language
pub const DEFAULT_LOCALE: &str = "fr";
/// Default per-request timeout in seconds
pub const DEFAULT_HTTP_TIMEOUT: u64 = 30;

/// Prefix of the environment variables holding role ids
const ROLE_ID_PREFIX: &str = "ROLE_ID_";

/// Main configuration structure
#[derive(Debug, Clone)]
pub struct Config {
    /// Calendar feeds to watch
    pub feeds: Vec<Feed>,
    /// Discord webhook receiving the announcements
    pub webhook_url: Url,
    /// Timezone for displaying times and reading floating times
    pub timezone: Tz,
    /// Role ids keyed by uppercase role tag
    pub roles: HashMap<String, u64>,
    /// Seconds between two checks
    pub check_interval: u64,
    /// Record of already announced events
    pub state_file: PathBuf,
    /// Keyword an event title must contain
    pub summary_filter: Option<String>,
    /// Announce events that already started
    pub notify_past_events: bool,
    /// Message language
    pub locale: String,
    /// Per-request timeout in seconds
    pub http_timeout: u64,
}

impl Config {
    /// Load configuration from `.env`, the environment and the roles file
    pub fn load() -> NotifierResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let vars: HashMap<String, String> = env::vars().collect();
        let mut config = Self::from_vars(&vars)?;

        let roles_file = vars
            .get("ROLES_FILE")
            .map(String::as_str)
            .unwrap_or(DEFAULT_ROLES_FILE);
        config.merge_roles_file(Path::new(roles_file))?;

        Ok(config)
    }

    /// Build the configuration from a set of variables
    pub fn from_vars(vars: &HashMap<String, String>) -> NotifierResult<Self> {
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };

        // Required variables
        let feeds = parse_feeds(get("ICAL_URL").ok_or_else(|| env_error("ICAL_URL"))?)?;

        let webhook_url =
            get("DISCORD_WEBHOOK_URL").ok_or_else(|| env_error("DISCORD_WEBHOOK_URL"))?;
        let webhook_url = Url::parse(webhook_url)
            .map_err(|e| config_error(&format!("Invalid DISCORD_WEBHOOK_URL: {}", e)))?;

        let timezone = parse_timezone(get("TIMEZONE").unwrap_or(DEFAULT_TIMEZONE))?;

        let mut roles = HashMap::new();
        for (key, value) in vars {
            if let Some(tag) = key.strip_prefix(ROLE_ID_PREFIX) {
                if tag.is_empty() || value.trim().is_empty() {
                    continue;
                }
                let role_id = value
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| config_error(&format!("Invalid {} format", key)))?;
                roles.insert(tag.to_uppercase(), role_id);
            }
        }

        let check_interval = parse_number(
            get("CHECK_INTERVAL_SECS"),
            "CHECK_INTERVAL_SECS",
            DEFAULT_CHECK_INTERVAL,
        )?;
        if check_interval == 0 {
            return Err(config_error("CHECK_INTERVAL_SECS must be greater than zero"));
        }
        let http_timeout = parse_number(
            get("HTTP_TIMEOUT_SECS"),
            "HTTP_TIMEOUT_SECS",
            DEFAULT_HTTP_TIMEOUT,
        )?;
        if http_timeout == 0 {
            return Err(config_error("HTTP_TIMEOUT_SECS must be greater than zero"));
        }

        let state_file = PathBuf::from(get("NOTIFIED_EVENTS_FILE").unwrap_or(DEFAULT_STATE_FILE));
        let summary_filter = get("SUMMARY_FILTER").map(str::to_string);
        let notify_past_events = parse_flag(get("NOTIFY_PAST_EVENTS"), "NOTIFY_PAST_EVENTS")?;

        let locale = get("BOT_LOCALE").unwrap_or(DEFAULT_LOCALE).to_string();
        if !rust_i18n::available_locales!().iter().any(|l| *l == locale) {
            return Err(config_error(&format!("Unsupported BOT_LOCALE '{}'", locale)));
        }

        Ok(Config {
            feeds,
            webhook_url,
            timezone,
            roles,
            check_interval,
            state_file,
            summary_filter,
            notify_past_events,
            locale,
            http_timeout,
        })
    }

    /// Add role ids from a TOML table such as `DAS = 1234`.
    ///
    /// A missing file is fine. Ids already set from the environment win.
    pub fn merge_roles_file(&mut self, path: &Path) -> NotifierResult<()> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let file_roles = toml::from_str::<HashMap<String, u64>>(&content)?;
        for (tag, role_id) in file_roles {
            self.roles.entry(tag.to_uppercase()).or_insert(role_id);
        }

        Ok(())
    }
}

fn parse_feeds(raw: &str) -> NotifierResult<Vec<Feed>> {
    let feeds = raw
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(Feed::parse)
        .collect::<NotifierResult<Vec<_>>>()?;

    if feeds.is_empty() {
        return Err(config_error("ICAL_URL does not contain any feed URL"));
    }
    Ok(feeds)
}

fn parse_number(value: Option<&str>, name: &str, default: u64) -> NotifierResult<u64> {
    match value {
        Some(v) => v
            .parse::<u64>()
            .map_err(|_| config_error(&format!("Invalid {} format", name))),
        None => Ok(default),
    }
}

fn parse_flag(value: Option<&str>, name: &str) -> NotifierResult<bool> {
    match value.map(str::to_lowercase).as_deref() {
        None => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(_) => Err(config_error(&format!("Invalid {} format", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn minimal() -> HashMap<String, String> {
        vars(&[
            ("ICAL_URL", "https://example.com/a.ics"),
            ("DISCORD_WEBHOOK_URL", "https://discord.com/api/webhooks/1/token"),
        ])
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(&minimal()).unwrap();
        assert_eq!(config.feeds.len(), 1);
        assert_eq!(config.timezone, chrono_tz::Europe::Paris);
        assert_eq!(config.check_interval, DEFAULT_CHECK_INTERVAL);
        assert_eq!(config.state_file, PathBuf::from(DEFAULT_STATE_FILE));
        assert_eq!(config.locale, "fr");
        assert_eq!(config.summary_filter, None);
        assert!(!config.notify_past_events);
        assert!(config.roles.is_empty());
    }

    #[test]
    fn test_missing_webhook_is_fatal() {
        let mut vars = minimal();
        vars.remove("DISCORD_WEBHOOK_URL");
        let err = Config::from_vars(&vars).unwrap_err();
        assert!(err.to_string().contains("DISCORD_WEBHOOK_URL"));

        let mut vars = minimal();
        vars.insert("DISCORD_WEBHOOK_URL".to_string(), "   ".to_string());
        assert!(Config::from_vars(&vars).is_err());
    }

    #[test]
    fn test_missing_or_empty_feeds_are_fatal() {
        let mut vars = minimal();
        vars.remove("ICAL_URL");
        assert!(Config::from_vars(&vars).is_err());

        vars.insert("ICAL_URL".to_string(), " , ,".to_string());
        assert!(Config::from_vars(&vars).is_err());
    }

    #[test]
    fn test_multiple_feeds_and_roles() {
        let mut vars = minimal();
        vars.insert(
            "ICAL_URL".to_string(),
            "DAS=https://example.com/das.ics, ASR=webcal://example.com/asr.ics,".to_string(),
        );
        vars.insert("ROLE_ID_DAS".to_string(), "1234".to_string());
        vars.insert("ROLE_ID_asr".to_string(), " 5678 ".to_string());
        vars.insert("TIMEZONE".to_string(), "UTC".to_string());

        let config = Config::from_vars(&vars).unwrap();
        let tags: Vec<_> = config.feeds.iter().map(|f| f.tag.as_deref()).collect();
        assert_eq!(tags, vec![Some("DAS"), Some("ASR")]);
        assert_eq!(config.roles.get("DAS"), Some(&1234));
        assert_eq!(config.roles.get("ASR"), Some(&5678));
        assert_eq!(config.timezone, chrono_tz::UTC);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        for (key, value) in [
            ("ROLE_ID_DAS", "not-a-number"),
            ("TIMEZONE", "Nowhere/Town"),
            ("CHECK_INTERVAL_SECS", "0"),
            ("CHECK_INTERVAL_SECS", "soon"),
            ("HTTP_TIMEOUT_SECS", "0"),
            ("NOTIFY_PAST_EVENTS", "maybe"),
            ("BOT_LOCALE", "tlh"),
        ] {
            let mut vars = minimal();
            vars.insert(key.to_string(), value.to_string());
            assert!(Config::from_vars(&vars).is_err(), "{}={} should be rejected", key, value);
        }
    }

    #[test]
    fn test_optional_settings() {
        let mut vars = minimal();
        vars.insert("SUMMARY_FILTER".to_string(), "autonomie".to_string());
        vars.insert("NOTIFY_PAST_EVENTS".to_string(), "TRUE".to_string());
        vars.insert("CHECK_INTERVAL_SECS".to_string(), "300".to_string());
        vars.insert("NOTIFIED_EVENTS_FILE".to_string(), "/data/sent.txt".to_string());
        vars.insert("BOT_LOCALE".to_string(), "en".to_string());

        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(config.summary_filter.as_deref(), Some("autonomie"));
        assert!(config.notify_past_events);
        assert_eq!(config.check_interval, 300);
        assert_eq!(config.state_file, PathBuf::from("/data/sent.txt"));
        assert_eq!(config.locale, "en");
    }

    #[test]
    fn test_roles_file_does_not_override_environment() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("roles.toml");
        fs::write(&path, "das = 1\nPRJ = 2\n").unwrap();

        let mut vars = minimal();
        vars.insert("ROLE_ID_DAS".to_string(), "99".to_string());
        let mut config = Config::from_vars(&vars).unwrap();
        config.merge_roles_file(&path).unwrap();

        assert_eq!(config.roles.get("DAS"), Some(&99));
        assert_eq!(config.roles.get("PRJ"), Some(&2));

        // Missing file is not an error
        config.merge_roles_file(&dir.path().join("absent.toml")).unwrap();
    }
}
