use std::{env, fs, path::Path, path::PathBuf, time::Duration};

use serde_json::Value;

use crate::{
    domain::{ChannelId, Route, Target, DEFAULT_WEBHOOK_PREFIX},
    errors::Error,
    messaging::types::MAX_FETCH_LIMIT,
    relay::PersistMode,
    Result,
};

const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";
const DEFAULT_STATE_FILE: &str = "lastMessageIds.json";

/// Typed configuration for one relay invocation.
#[derive(Clone, Debug)]
pub struct Config {
    // Credentials
    pub discord_token: String,

    // Routes (targets already classified)
    pub routes: Vec<Route>,

    // State
    pub state_file: PathBuf,
    pub persist_mode: PersistMode,

    // Delivery
    pub pacing_interval: Duration,
    pub fetch_limit: u8,
    pub dry_run: bool,

    // Transport
    pub api_base: String,
    pub webhook_prefix: String,
    pub http_timeout: Duration,
}

impl Config {
    /// Load from the process environment (plus `.env`, which never overrides).
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let discord_token = lookup("DISCORD_TOKEN").unwrap_or_default();
        if discord_token.trim().is_empty() {
            return Err(Error::Config(
                "DISCORD_TOKEN environment variable is required".to_string(),
            ));
        }

        let webhook_prefix = lookup("RELAY_WEBHOOK_PREFIX")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_WEBHOOK_PREFIX.to_string());

        // RELAY_ROUTS is the historical spelling; keep accepting it.
        let raw_routes = lookup("RELAY_ROUTES")
            .and_then(non_empty)
            .or_else(|| lookup("RELAY_ROUTS").and_then(non_empty))
            .unwrap_or_else(|| "[]".to_string());
        let routes = parse_routes(&raw_routes, &webhook_prefix)?;

        let state_file = PathBuf::from(
            lookup("RELAY_STATE_FILE")
                .and_then(non_empty)
                .unwrap_or_else(|| DEFAULT_STATE_FILE.to_string()),
        );
        let persist_mode = if parse_bool(lookup("RELAY_PERSIST_EACH_ROUTE")).unwrap_or(false) {
            PersistMode::PerRoute
        } else {
            PersistMode::EndOfPass
        };

        let pacing_interval =
            Duration::from_millis(parse_u64(lookup("RELAY_PACING_MS")).unwrap_or(200));
        let fetch_limit = parse_u64(lookup("RELAY_FETCH_LIMIT"))
            .unwrap_or(MAX_FETCH_LIMIT as u64)
            .clamp(1, MAX_FETCH_LIMIT as u64) as u8;
        let dry_run = parse_bool(lookup("RELAY_DRY_RUN")).unwrap_or(false);

        let api_base = lookup("DISCORD_API_BASE")
            .and_then(non_empty)
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let http_timeout =
            Duration::from_secs(parse_u64(lookup("RELAY_HTTP_TIMEOUT_SECS")).unwrap_or(15));

        Ok(Self {
            discord_token,
            routes,
            state_file,
            persist_mode,
            pacing_interval,
            fetch_limit,
            dry_run,
            api_base,
            webhook_prefix,
            http_timeout,
        })
    }
}

/// Parse `[{ "source": "...", "target": "..." }, ...]`.
///
/// Entries without both fields are skipped. Malformed JSON, a non-array, or
/// no usable entry at all is a config error.
pub fn parse_routes(raw: &str, webhook_prefix: &str) -> Result<Vec<Route>> {
    let v: Value = serde_json::from_str(raw)
        .map_err(|e| Error::Config(format!("failed to parse RELAY_ROUTES JSON: {e}")))?;

    let Value::Array(entries) = v else {
        return Err(Error::Config("RELAY_ROUTES must be a JSON array".to_string()));
    };

    let mut routes = Vec::with_capacity(entries.len());
    for (idx, entry) in entries.iter().enumerate() {
        let source = entry.get("source").and_then(id_string);
        let target = entry.get("target").and_then(id_string);
        let (Some(source), Some(target)) = (source, target) else {
            tracing::debug!(index = idx, "skipping route entry without source/target");
            continue;
        };

        routes.push(Route {
            source: ChannelId(source),
            target: Target::classify(&target, webhook_prefix),
        });
    }

    if routes.is_empty() {
        return Err(Error::Config("no valid routes in RELAY_ROUTES".to_string()));
    }
    Ok(routes)
}

/// Strings as-is, integers in decimal form; blanks count as missing.
fn id_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => non_empty(s.trim().to_string()),
        Value::Number(n) => n.as_u64().map(|n| n.to_string()),
        _ => None,
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
        let line = line.strip_prefix("export ").unwrap_or(line);

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

fn parse_u64(v: Option<String>) -> Option<u64> {
    v.and_then(|s| s.trim().parse::<u64>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
