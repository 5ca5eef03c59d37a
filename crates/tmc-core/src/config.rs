use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use indexmap::IndexMap;

use crate::{
    discovery::DEFAULT_PARTICIPANT_THRESHOLD, domain::EntityTerms, errors::Error,
    export::ExportPaths, Result,
};

pub const DEFAULT_LIMIT: usize = 10_000;
pub const DEFAULT_SESSION_NAME: &str = "universities_mentions_crawler";
pub const DEFAULT_BRIDGE_URL: &str = "http://127.0.0.1:8081";

/// Which transport adapter the binary wires in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportConfig {
    /// MTProto HTTP bridge.
    Bridge {
        base_url: String,
        api_id: i32,
        api_hash: String,
        session_name: String,
        request_timeout: Duration,
    },
    /// Offline JSON snapshot of channels and their history.
    Snapshot { path: PathBuf },
}

/// Device profile presented when the bridge logs the session in. Keeping it stable avoids
/// Telegram terminating the account's other sessions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientProfile {
    pub device_model: String,
    pub system_version: String,
    pub app_version: String,
    pub lang_code: String,
    pub system_lang_code: String,
}

impl Default for ClientProfile {
    fn default() -> Self {
        Self {
            device_model: "Desktop".to_string(),
            system_version: "Windows 10".to_string(),
            app_version: "2.0".to_string(),
            lang_code: "en".to_string(),
            system_lang_code: "en-US".to_string(),
        }
    }
}

/// Typed configuration resolved from the environment (and an optional `.env`).
#[derive(Clone, Debug)]
pub struct Config {
    pub transport: TransportConfig,
    pub client_profile: ClientProfile,
    pub terms: Vec<EntityTerms>,
    pub limit: usize,
    pub participant_threshold: u64,
    pub exports: ExportPaths,
    pub log_level: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let transport = match env_str("TMC_TRANSPORT")
            .map(|s| s.trim().to_lowercase())
            .as_deref()
        {
            None | Some("bridge") => load_bridge()?,
            Some("snapshot") => {
                let path = env_path("TMC_SNAPSHOT_PATH").ok_or_else(|| {
                    Error::Config(
                        "TMC_SNAPSHOT_PATH is required when TMC_TRANSPORT=snapshot".to_string(),
                    )
                })?;
                TransportConfig::Snapshot { path }
            }
            Some(other) => {
                return Err(Error::Config(format!(
                    "unknown TMC_TRANSPORT {other:?} (expected bridge or snapshot)"
                )))
            }
        };

        let terms = match env_path("TMC_TERMS_FILE") {
            Some(path) => load_terms_file(&path)?,
            None => default_terms(),
        };

        let limit = env_usize("TMC_LIMIT").unwrap_or(DEFAULT_LIMIT);
        if limit == 0 {
            return Err(Error::Config("TMC_LIMIT must be positive".to_string()));
        }
        let participant_threshold =
            env_u64("TMC_PARTICIPANT_THRESHOLD").unwrap_or(DEFAULT_PARTICIPANT_THRESHOLD);

        let output_dir = env_path("TMC_OUTPUT_DIR").unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&output_dir)?;

        let log_level = env_str("TMC_LOG_LEVEL")
            .and_then(non_empty)
            .unwrap_or_else(|| "info".to_string());

        Ok(Self {
            transport,
            client_profile: ClientProfile::default(),
            terms,
            limit,
            participant_threshold,
            exports: ExportPaths::in_dir(&output_dir),
            log_level,
        })
    }
}

fn load_bridge() -> Result<TransportConfig> {
    let api_id = env_str("TELEGRAM_API_ID")
        .and_then(|s| s.trim().parse::<i32>().ok())
        .ok_or_else(|| {
            Error::Config("TELEGRAM_API_ID environment variable is required".to_string())
        })?;
    let api_hash = env_str("TELEGRAM_API_HASH")
        .and_then(non_empty)
        .ok_or_else(|| {
            Error::Config("TELEGRAM_API_HASH environment variable is required".to_string())
        })?;

    Ok(TransportConfig::Bridge {
        base_url: env_str("TMC_BRIDGE_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_BRIDGE_URL.to_string()),
        api_id,
        api_hash,
        session_name: env_str("TMC_SESSION_NAME")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_SESSION_NAME.to_string()),
        request_timeout: Duration::from_secs(env_u64("TMC_REQUEST_TIMEOUT_SECS").unwrap_or(30)),
    })
}

/// Built-in search terms: two universities and their common spellings.
pub fn default_terms() -> Vec<EntityTerms> {
    vec![
        EntityTerms::new(
            "спбгу",
            [
                "spbgu",
                "спбгу",
                "спб гу",
                "spbu",
                "Санкт-Петербургский государственный университет",
            ],
        ),
        EntityTerms::new(
            "мгу",
            ["msu", "мгу", "Московский государственный университет"],
        ),
    ]
}

/// Parse a JSON object of `entity -> [alias, ...]`, keeping the file's key order.
pub fn parse_terms(json: &str) -> Result<Vec<EntityTerms>> {
    let raw: IndexMap<String, Vec<String>> = serde_json::from_str(json)?;
    if raw.is_empty() {
        return Err(Error::Config("terms file defines no entities".to_string()));
    }

    raw.into_iter()
        .map(|(key, aliases)| {
            let aliases: Vec<String> = aliases
                .iter()
                .map(|a| a.trim())
                .filter(|a| !a.is_empty())
                .map(str::to_string)
                .collect();
            if aliases.is_empty() {
                return Err(Error::Config(format!("entity {key:?} has no aliases")));
            }
            Ok(EntityTerms::new(key, aliases))
        })
        .collect()
}

pub fn load_terms_file(path: &Path) -> Result<Vec<EntityTerms>> {
    let txt = fs::read_to_string(path)?;
    parse_terms(&txt)
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

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
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
