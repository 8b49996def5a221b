use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, Result};

pub const DEFAULT_FACEIT_API_BASE: &str = "https://open.faceit.com/data/v4";
pub const DEFAULT_GAME: &str = "cs2";

/// Where the roster lives, parsed from `ROSTER_STORE_URL`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreLocation {
    Json(PathBuf),
    Sqlite(PathBuf),
    Memory,
}

impl StoreLocation {
    /// Accepts `sqlite:<path>`, `sqlite://<path>`, `json:<path>`, `memory:` or a
    /// bare path (JSON document).
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(Error::Config("ROSTER_STORE_URL is empty".to_string()));
        }

        if raw == "memory:" || raw == "memory" {
            return Ok(Self::Memory);
        }

        let (scheme, rest) = match raw.split_once(':') {
            Some((s, r)) if s == "sqlite" || s == "json" => (s, r),
            _ => return Ok(Self::Json(PathBuf::from(raw))),
        };

        let path = rest.strip_prefix("//").unwrap_or(rest);
        if path.trim().is_empty() {
            return Err(Error::Config(format!(
                "ROSTER_STORE_URL has no path: {raw}"
            )));
        }

        let path = PathBuf::from(path);
        Ok(match scheme {
            "sqlite" => Self::Sqlite(path),
            _ => Self::Json(path),
        })
    }
}

/// Typed configuration, loaded once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    // Secrets
    pub telegram_bot_token: String,
    pub faceit_api_key: String,
    pub store: StoreLocation,

    // Provider
    pub faceit_api_base: String,
    pub game: String,
    pub fetch_timeout: Duration,

    // Reconciliation
    pub poll_interval: Duration,

    // Telegram limits
    pub telegram_safe_limit: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = required("TELEGRAM_BOT_TOKEN")?;
        let faceit_api_key = required("FACEIT_API_KEY")?;
        let store = StoreLocation::parse(&required("ROSTER_STORE_URL")?)?;

        let faceit_api_base = env_str("FACEIT_API_BASE")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_FACEIT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();
        let game = env_str("FACEIT_GAME")
            .and_then(non_empty)
            .map(|s| s.trim().to_lowercase())
            .unwrap_or_else(|| DEFAULT_GAME.to_string());
        let fetch_timeout =
            Duration::from_millis(env_u64("FETCH_TIMEOUT_MS").unwrap_or(10_000).max(100));

        let poll_interval = Duration::from_secs(env_u64("POLL_INTERVAL_SECS").unwrap_or(60).max(1));

        let telegram_safe_limit = env_usize("TELEGRAM_SAFE_LIMIT").unwrap_or(4000).min(4096);

        Ok(Self {
            telegram_bot_token,
            faceit_api_key,
            store,
            faceit_api_base,
            game,
            fetch_timeout,
            poll_interval,
            telegram_safe_limit,
        })
    }
}

fn required(key: &str) -> Result<String> {
    env_str(key)
        .and_then(non_empty)
        .ok_or_else(|| Error::Config(format!("{key} environment variable is required")))
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim().trim_start_matches("export ").trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
