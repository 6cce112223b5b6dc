use std::{
    env, fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use tracing::warn;

use crate::{domain::UserId, errors::Error, Result};

/// How inbound updates reach the bot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportMode {
    /// Long-poll `getUpdates`.
    Polling,
    /// Telegram pushes updates to `url`; the local server binds `listen`.
    Webhook { url: String, listen: SocketAddr },
}

/// Where an encrypt/decrypt result is rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultDelivery {
    /// Document for file sources or oversized results, inline otherwise.
    Auto,
    Inline,
    Document,
}

impl ResultDelivery {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "inline" => Some(Self::Inline),
            "document" | "file" => Some(Self::Document),
            _ => None,
        }
    }
}

/// Typed configuration, built once at startup and shared as `Arc<Config>`.
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,
    pub secret_key: String,
    pub admin_id: Option<UserId>,
    pub banner_url: Option<String>,
    pub transport: TransportMode,

    // Storage
    pub registry_file: PathBuf,
    pub temp_dir: PathBuf,

    // Broadcast
    pub broadcast_delay: Duration,
    pub broadcast_progress_every: usize,

    // Reply handling
    pub progress_animation: bool,
    pub progress_step_delay: Duration,
    pub max_file_size: u64,
    pub inline_result_limit: usize,
    pub result_delivery: ResultDelivery,
    pub encrypt_keywords: Vec<String>,
    pub decrypt_keywords: Vec<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        // Required env vars
        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN")
            .or_else(|| env_str("BOT_TOKEN"))
            .and_then(non_empty)
            .ok_or_else(|| {
                Error::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
            })?;
        let secret_key = env_str("SECRET_KEY").and_then(non_empty).ok_or_else(|| {
            Error::Config("SECRET_KEY environment variable is required".to_string())
        })?;

        let admin_id = match env_str("ADMIN_ID").and_then(non_empty) {
            Some(raw) => Some(UserId(raw.trim().parse::<i64>().map_err(|_| {
                Error::Config(format!("ADMIN_ID must be a numeric user id, got {raw:?}"))
            })?)),
            None => {
                warn!("ADMIN_ID is not set; /broadcast will be rejected for everyone");
                None
            }
        };

        let banner_url = env_str("BANNER_URL").and_then(non_empty);
        let transport = transport_from_env()?;

        let registry_file =
            PathBuf::from(env_str("CHAT_REGISTRY_FILE").unwrap_or("chats.json".to_string()));
        let temp_dir = PathBuf::from(env_str("TEMP_DIR").unwrap_or("/tmp/encbot".to_string()));
        fs::create_dir_all(&temp_dir)?;

        let broadcast_delay = Duration::from_millis(env_u64("BROADCAST_DELAY_MS").unwrap_or(300));
        let broadcast_progress_every = env_usize("BROADCAST_PROGRESS_EVERY")
            .unwrap_or(10)
            .max(1);

        let progress_animation = env_bool("PROGRESS_ANIMATION").unwrap_or(true);
        let progress_step_delay =
            Duration::from_millis(env_u64("PROGRESS_STEP_MS").unwrap_or(200));
        let max_file_size = env_u64("MAX_FILE_SIZE").unwrap_or(5 * 1024 * 1024);
        let inline_result_limit = env_usize("INLINE_RESULT_LIMIT").unwrap_or(3500);
        let result_delivery = match env_str("RESULT_DELIVERY").and_then(non_empty) {
            Some(raw) => ResultDelivery::parse(&raw).ok_or_else(|| {
                Error::Config(format!(
                    "RESULT_DELIVERY must be auto, inline or document, got {raw:?}"
                ))
            })?,
            None => ResultDelivery::Auto,
        };

        let encrypt_keywords = parse_csv_lower(
            env_str("ENCRYPT_KEYWORDS").or_else(|| Some("enc,🔒 encrypt".to_string())),
        );
        let decrypt_keywords = parse_csv_lower(
            env_str("DECRYPT_KEYWORDS").or_else(|| Some("dec,🔓 decrypt".to_string())),
        );
        if encrypt_keywords.iter().any(|k| decrypt_keywords.contains(k)) {
            return Err(Error::Config(
                "ENCRYPT_KEYWORDS and DECRYPT_KEYWORDS must not overlap".to_string(),
            ));
        }

        Ok(Self {
            telegram_bot_token,
            secret_key,
            admin_id,
            banner_url,
            transport,
            registry_file,
            temp_dir,
            broadcast_delay,
            broadcast_progress_every,
            progress_animation,
            progress_step_delay,
            max_file_size,
            inline_result_limit,
            result_delivery,
            encrypt_keywords,
            decrypt_keywords,
        })
    }
}

fn transport_from_env() -> Result<TransportMode> {
    let Some(url) = env_str("WEBHOOK_URL").and_then(non_empty) else {
        return Ok(TransportMode::Polling);
    };

    let listen = match env_str("WEBHOOK_LISTEN").and_then(non_empty) {
        Some(raw) => raw
            .trim()
            .parse::<SocketAddr>()
            .map_err(|e| Error::Config(format!("WEBHOOK_LISTEN {raw:?}: {e}")))?,
        None => {
            let port = env_str("PORT")
                .and_then(|s| s.trim().parse::<u16>().ok())
                .unwrap_or(8080);
            SocketAddr::from(([0, 0, 0, 0], port))
        }
    };

    Ok(TransportMode::Webhook {
        url: url.trim().to_string(),
        listen,
    })
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
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| parse_bool(&s))
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn parse_csv_lower(v: Option<String>) -> Vec<String> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
