use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, Result};

pub const DEFAULT_LOOKUP_URL: &str = "https://api.apilayer.com/number_verification/validate";
pub const DEFAULT_ATTRIBUTION: &str = "🔧 Bot by @HACKERNEERR";

/// Immutable process configuration, built once at startup.
///
/// Everything is environment-driven; the process takes no arguments.
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub bot_token: String,
    pub admin_id: i64,
    pub telegram_api_url: Option<String>,

    // Rate limiting
    pub rate_limit_requests: u32,
    pub rate_limit_window: Duration,

    // Outbound lookups
    pub lookup_url: String,
    pub lookup_api_key: String,
    pub vehicle_lookup_url: Option<String>,
    pub request_timeout: Duration,
    pub max_retries: u32,

    // Feature flags
    pub enable_ocr: bool,
    pub enable_image_processing: bool,

    // Presentation
    pub attribution: String,

    // Logging
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Load from the process environment (plus `.env` in the working directory).
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Deterministic for a given lookup.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // Required
        let bot_token = get("BOT_TOKEN").unwrap_or_default();
        if bot_token.trim().is_empty() {
            return Err(Error::Config("missing credential".to_string()));
        }
        let admin_id = parse_admin_id(get("ADMIN_ID").as_deref())
            .ok_or_else(|| Error::Config("invalid admin id".to_string()))?;

        let telegram_api_url = get("TELEGRAM_API_URL").and_then(non_empty);
        if let Some(url) = &telegram_api_url {
            reqwest::Url::parse(url)
                .map_err(|_| Error::Config("invalid TELEGRAM_API_URL".to_string()))?;
        }

        // Rate limiting
        let rate_limit_requests = positive(&get, "RATE_LIMIT_REQUESTS", 5)? as u32;
        let rate_limit_window = Duration::from_secs(positive(&get, "RATE_LIMIT_WINDOW", 60)?);

        // Lookups
        let lookup_url = get("LOOKUP_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_LOOKUP_URL.to_string());
        let lookup_api_key = get("LOOKUP_API_KEY").unwrap_or_default();
        let vehicle_lookup_url = get("VEHICLE_LOOKUP_URL").and_then(non_empty);
        let request_timeout = Duration::from_secs(positive(&get, "REQUEST_TIMEOUT", 10)?);
        let max_retries = match get("MAX_RETRIES") {
            None => 3,
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .map_err(|_| Error::Config("invalid MAX_RETRIES".to_string()))?,
        };

        // Feature flags
        let enable_ocr = get("ENABLE_OCR").map(|s| parse_bool(&s)).unwrap_or(false);
        let enable_image_processing = get("ENABLE_IMAGE_PROCESSING")
            .map(|s| parse_bool(&s))
            .unwrap_or(true);

        let attribution = get("BOT_ATTRIBUTION")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_ATTRIBUTION.to_string());

        // Logging
        let log_level = get("LOG_LEVEL")
            .and_then(non_empty)
            .map(|s| s.trim().to_lowercase())
            .unwrap_or_else(|| "info".to_string());
        let log_file = match get("LOG_FILE") {
            None => Some(PathBuf::from("bot.log")),
            Some(raw) => non_empty(raw).map(PathBuf::from),
        };

        Ok(Self {
            bot_token,
            admin_id,
            telegram_api_url,
            rate_limit_requests,
            rate_limit_window,
            lookup_url,
            lookup_api_key,
            vehicle_lookup_url,
            request_timeout,
            max_retries,
            enable_ocr,
            enable_image_processing,
            attribution,
            log_level,
            log_file,
        })
    }
}

/// Digits only, fits in i64, and at least 1.
fn parse_admin_id(raw: Option<&str>) -> Option<i64> {
    let raw = raw?;
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<i64>().ok().filter(|id| *id >= 1)
}

fn positive(get: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<u64> {
    let Some(raw) = get(key) else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(v) if v > 0 && v <= u32::MAX as u64 => Ok(v),
        _ => Err(Error::Config(format!("invalid {key}"))),
    }
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

/// `KEY=value` pairs from a dotenv file. Blank lines, `#` comments and an
/// optional `export ` prefix are accepted; one level of matching quotes is stripped.
fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), unquote(value.trim()).to_string()))
        })
        .collect()
}

fn unquote(value: &str) -> &str {
    for q in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(q).and_then(|v| v.strip_suffix(q)) {
            return inner;
        }
    }
    value
}

/// Real environment variables win over the file.
fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };
    for (key, value) in parse_dotenv(&contents) {
        if env::var_os(&key).is_none() {
            env::set_var(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    fn config_message(res: Result<Config>) -> String {
        match res {
            Err(Error::Config(msg)) => msg,
            Err(other) => panic!("expected config error, got {other}"),
            Ok(_) => panic!("expected config error, got Ok"),
        }
    }

    #[test]
    fn defaults_apply() {
        let cfg = load(&[("BOT_TOKEN", "t"), ("ADMIN_ID", "42")]).unwrap();
        assert_eq!(cfg.admin_id, 42);
        assert_eq!(cfg.rate_limit_requests, 5);
        assert_eq!(cfg.rate_limit_window, Duration::from_secs(60));
        assert_eq!(cfg.request_timeout, Duration::from_secs(10));
        assert_eq!(cfg.max_retries, 3);
        assert!(!cfg.enable_ocr);
        assert!(cfg.enable_image_processing);
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.log_file, Some(PathBuf::from("bot.log")));
        assert_eq!(cfg.lookup_url, DEFAULT_LOOKUP_URL);
        assert!(cfg.vehicle_lookup_url.is_none());
    }

    #[test]
    fn missing_or_blank_token_is_rejected() {
        assert_eq!(config_message(load(&[("ADMIN_ID", "1")])), "missing credential");
        assert_eq!(
            config_message(load(&[("BOT_TOKEN", "   "), ("ADMIN_ID", "1")])),
            "missing credential"
        );
    }

    #[test]
    fn token_is_checked_before_admin_id() {
        assert_eq!(config_message(load(&[("ADMIN_ID", "abc")])), "missing credential");
    }

    #[test]
    fn admin_id_must_be_digits() {
        for bad in ["", "abc", "12a", "-5", "+5", " 12", "1.0", "0", "99999999999999999999"] {
            assert_eq!(
                config_message(load(&[("BOT_TOKEN", "t"), ("ADMIN_ID", bad)])),
                "invalid admin id",
                "admin id {bad:?}"
            );
        }
        assert_eq!(config_message(load(&[("BOT_TOKEN", "t")])), "invalid admin id");

        for good in ["1", "007", "123456789"] {
            let cfg = load(&[("BOT_TOKEN", "t"), ("ADMIN_ID", good)]).unwrap();
            assert_eq!(cfg.admin_id, good.parse::<i64>().unwrap());
        }
    }

    #[test]
    fn numeric_limits_must_be_positive() {
        let base = [("BOT_TOKEN", "t"), ("ADMIN_ID", "1")];
        for key in ["RATE_LIMIT_REQUESTS", "RATE_LIMIT_WINDOW", "REQUEST_TIMEOUT"] {
            for bad in ["0", "-1", "x"] {
                let mut pairs = base.to_vec();
                pairs.push((key, bad));
                assert_eq!(config_message(load(&pairs)), format!("invalid {key}"));
            }
        }

        let mut pairs = base.to_vec();
        pairs.push(("MAX_RETRIES", "0"));
        assert_eq!(load(&pairs).unwrap().max_retries, 0);
    }

    #[test]
    fn flags_and_overrides() {
        let cfg = load(&[
            ("BOT_TOKEN", "t"),
            ("ADMIN_ID", "9"),
            ("ENABLE_OCR", "TRUE"),
            ("ENABLE_IMAGE_PROCESSING", "off"),
            ("LOG_LEVEL", "DEBUG"),
            ("LOG_FILE", ""),
            ("RATE_LIMIT_REQUESTS", "10"),
            ("VEHICLE_LOOKUP_URL", "http://vehicles.local/rc"),
        ])
        .unwrap();
        assert!(cfg.enable_ocr);
        assert!(!cfg.enable_image_processing);
        assert_eq!(cfg.log_level, "debug");
        assert!(cfg.log_file.is_none());
        assert_eq!(cfg.rate_limit_requests, 10);
        assert_eq!(cfg.vehicle_lookup_url.as_deref(), Some("http://vehicles.local/rc"));
    }

    #[test]
    fn telegram_api_url_is_validated() {
        let res = load(&[
            ("BOT_TOKEN", "t"),
            ("ADMIN_ID", "1"),
            ("TELEGRAM_API_URL", "not a url"),
        ]);
        assert_eq!(config_message(res), "invalid TELEGRAM_API_URL");
    }

    #[test]
    fn dotenv_lines() {
        let parsed = parse_dotenv(
            "# bot\n\nBOT_TOKEN = \"abc:def\"\nexport ADMIN_ID=42\nLOG_LEVEL='debug'\nbroken line\n=orphan\nEMPTY=\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("BOT_TOKEN".to_string(), "abc:def".to_string()),
                ("ADMIN_ID".to_string(), "42".to_string()),
                ("LOG_LEVEL".to_string(), "debug".to_string()),
                ("EMPTY".to_string(), String::new()),
            ]
        );
    }
}
