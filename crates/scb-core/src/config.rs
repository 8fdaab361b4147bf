use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    answer::AnswerPolicy,
    catalog::{QuestionCatalog, DEFAULT_INSOMNIA_THRESHOLD},
    errors::Error,
    Result,
};

/// Typed configuration for the bot.
#[derive(Clone, Debug)]
pub struct Config {
    // Telegram
    pub telegram_bot_token: String,
    /// Empty means the bot answers everyone.
    pub telegram_allowed_users: Vec<i64>,

    // Quiz
    pub catalog: QuestionCatalog,
    pub insomnia_threshold: usize,
    pub answer_policy: AnswerPolicy,

    // Audit
    pub audit_log_path: PathBuf,
    pub audit_log_json: bool,

    // Rate limiting
    pub rate_limit_enabled: bool,
    pub rate_limit_requests: u32,
    pub rate_limit_window: Duration,
}

type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

impl Config {
    /// Load from the process environment, reading `.env` first if present.
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(&|key: &str| env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup.
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let telegram_bot_token = lookup("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }
        let telegram_allowed_users = parse_csv_i64(lookup("TELEGRAM_ALLOWED_USERS"));

        // Quiz definition
        let catalog = match lookup("QUESTIONS_FILE").and_then(non_empty) {
            Some(path) => QuestionCatalog::from_json_file(Path::new(&path)).map_err(|e| {
                Error::Config(format!("failed to load QUESTIONS_FILE {path}: {e}"))
            })?,
            None => QuestionCatalog::insomnia(),
        };
        let insomnia_threshold = match lookup("INSOMNIA_THRESHOLD") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
                Error::Config(format!(
                    "INSOMNIA_THRESHOLD must be a non-negative integer, got {raw:?}"
                ))
            })?,
            None => DEFAULT_INSOMNIA_THRESHOLD,
        };
        catalog.validate_threshold(insomnia_threshold)?;

        let answer_policy = if parse_bool(lookup("STRICT_ANSWERS")).unwrap_or(false) {
            AnswerPolicy::Strict
        } else {
            AnswerPolicy::Lenient
        };

        // Audit logging
        let audit_log_path = PathBuf::from(
            lookup("AUDIT_LOG_PATH").unwrap_or("/tmp/insomnia-bot-audit.log".to_string()),
        );
        let audit_log_json = parse_bool(lookup("AUDIT_LOG_JSON")).unwrap_or(false);

        // Rate limiting
        let rate_limit_enabled = parse_bool(lookup("RATE_LIMIT_ENABLED")).unwrap_or(true);
        let rate_limit_requests = parse_num(lookup("RATE_LIMIT_REQUESTS")).unwrap_or(30);
        let rate_limit_window =
            Duration::from_secs(parse_num(lookup("RATE_LIMIT_WINDOW")).unwrap_or(60));

        Ok(Self {
            telegram_bot_token,
            telegram_allowed_users,
            catalog,
            insomnia_threshold,
            answer_policy,
            audit_log_path,
            audit_log_json,
            rate_limit_enabled,
            rate_limit_requests,
            rate_limit_window,
        })
    }
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

        let key = k.trim();
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

fn parse_bool(v: Option<String>) -> Option<bool> {
    v.map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn parse_num<T: std::str::FromStr>(v: Option<String>) -> Option<T> {
    v.and_then(|s| s.trim().parse::<T>().ok())
}

fn parse_csv_i64(v: Option<String>) -> Vec<i64> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
