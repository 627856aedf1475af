//! Configuration loader
//!
//! `load` reads the `LEDGERBRIDGE_*` environment first and falls back to a
//! config file (TOML or JSON, picked by extension) when the environment
//! configures no service.
//!
//! ## Environment
//! | variable | meaning |
//! |---|---|
//! | `LEDGERBRIDGE_BLINKSALE_ID` | account subdomain (`acme` for `acme.blinksale.com`) |
//! | `LEDGERBRIDGE_BLINKSALE_USERID` | basic auth user |
//! | `LEDGERBRIDGE_BLINKSALE_PASSWORD` | basic auth password |
//! | `LEDGERBRIDGE_FRESHBOOKS_CLIENT_ID` | OAuth2 application id |
//! | `LEDGERBRIDGE_FRESHBOOKS_CLIENT_SECRET` | OAuth2 application secret |
//! | `LEDGERBRIDGE_FRESHBOOKS_REDIRECT_URI` | registered redirect URI |
//! | `LEDGERBRIDGE_FRESHBOOKS_AUTH_CODE` | authorization code, optional |
//! | `LEDGERBRIDGE_TIMEOUT_SECONDS` | request timeout, optional |
//! | `LEDGERBRIDGE_ACCEPT_INVALID_CERTS` | `true`/`false`, optional |
//!
//! Setting `*_ID` / `*_CLIENT_ID` turns a service section on; its other
//! required variables must then be present.
//!
//! ## Files
//! `ledgerbridge.{toml,json}` then `config.{toml,json}`, looked up in the
//! working directory, its two parents, and the executable's directory.

use std::path::{Path, PathBuf};

use ledgerbridge_domain::constants::DEFAULT_TIMEOUT_SECS;
use ledgerbridge_domain::{
    BlinksaleConfig, Config, FreshBooksConfig, OAuth2Credentials, RestError, Result,
    TransportConfig,
};
use tracing::{debug, info};

use crate::errors::InfraError;

const FILE_NAMES: [&str; 4] = ["ledgerbridge.toml", "ledgerbridge.json", "config.toml", "config.json"];

/// Variables that switch a service section on.
const SECTION_VARS: [&str; 2] = ["LEDGERBRIDGE_BLINKSALE_ID", "LEDGERBRIDGE_FRESHBOOKS_CLIENT_ID"];

/// Environment first, then the first config file found.
///
/// The environment wins as soon as it switches a service on; an incomplete
/// section is then reported instead of silently reading a file.
///
/// # Errors
/// `RestError::Config` when neither source yields a usable configuration.
pub fn load() -> Result<Config> {
    if !any_service_env() {
        debug!("no service configured in the environment, probing config files");
        return load_from_file(None);
    }

    let config = load_from_env()?;
    info!(
        blinksale = config.blinksale.is_some(),
        freshbooks = config.freshbooks.is_some(),
        "configuration loaded from environment"
    );
    Ok(config)
}

fn any_service_env() -> bool {
    SECTION_VARS.iter().any(|key| std::env::var_os(key).is_some())
}

/// # Errors
/// `RestError::Config` when no service is configured, a service section is
/// incomplete, or a value does not parse.
pub fn load_from_env() -> Result<Config> {
    let blinksale = match std::env::var("LEDGERBRIDGE_BLINKSALE_ID") {
        Ok(id) => Some(BlinksaleConfig {
            id,
            userid: env_var("LEDGERBRIDGE_BLINKSALE_USERID")?,
            password: env_var("LEDGERBRIDGE_BLINKSALE_PASSWORD")?,
        }),
        Err(_) => None,
    };

    let freshbooks = match std::env::var("LEDGERBRIDGE_FRESHBOOKS_CLIENT_ID") {
        Ok(client_id) => Some(FreshBooksConfig {
            credentials: OAuth2Credentials {
                client_id,
                client_secret: env_var("LEDGERBRIDGE_FRESHBOOKS_CLIENT_SECRET")?,
                redirect_uri: env_var("LEDGERBRIDGE_FRESHBOOKS_REDIRECT_URI")?,
            },
            auth_code: std::env::var("LEDGERBRIDGE_FRESHBOOKS_AUTH_CODE").ok(),
            token: None,
        }),
        Err(_) => None,
    };

    if blinksale.is_none() && freshbooks.is_none() {
        return Err(RestError::Config("No service configured in the environment".to_string()));
    }

    let timeout_seconds = match std::env::var("LEDGERBRIDGE_TIMEOUT_SECONDS") {
        Ok(value) => value
            .parse::<u64>()
            .map_err(|e| RestError::Config(format!("Invalid timeout '{value}': {e}")))?,
        Err(_) => DEFAULT_TIMEOUT_SECS,
    };
    let accept_invalid_certs = env_bool("LEDGERBRIDGE_ACCEPT_INVALID_CERTS", false);

    Ok(Config {
        blinksale,
        freshbooks,
        transport: TransportConfig { timeout_seconds, accept_invalid_certs },
    })
}

/// Read `path`, or the first probed file when `path` is `None`.
///
/// # Errors
/// `RestError::Config` when the file is missing, unreadable, or malformed.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(path) if path.exists() => path,
        Some(path) => {
            return Err(RestError::Config(format!("Config file not found: {}", path.display())));
        }
        None => probe_config_paths()
            .ok_or_else(|| RestError::Config("No config file found".to_string()))?,
    };

    info!(path = %config_path.display(), "loading configuration file");

    let contents = std::fs::read_to_string(&config_path).map_err(|e| {
        RestError::Config(format!("Failed to read {}: {e}", config_path.display()))
    })?;

    parse_config(&contents, &config_path)
}

/// TOML for `.toml`, JSON for `.json` or no extension.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    match path.extension().and_then(|e| e.to_str()).unwrap_or("json") {
        "toml" => toml::from_str(contents).map_err(|e| InfraError::from(e).into()),
        "json" => serde_json::from_str(contents)
            .map_err(|e| RestError::Config(format!("Invalid JSON format: {e}"))),
        other => Err(RestError::Config(format!("Unsupported config format: {other}"))),
    }
}

/// First existing config file, if any.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        dirs.extend(cwd.ancestors().take(3).map(Path::to_path_buf));
    }
    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf)) {
        dirs.push(exe_dir);
    }

    first_config_file(&dirs)
}

/// Directory order first, then `FILE_NAMES` order within a directory.
fn first_config_file(dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter().flat_map(|dir| candidate_paths(dir)).find(|path| path.is_file())
}

fn candidate_paths(dir: &Path) -> impl Iterator<Item = PathBuf> + '_ {
    FILE_NAMES.iter().map(move |name| dir.join(name))
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| RestError::Config(format!("Missing environment variable {key}")))
}

/// `1`, `true`, `yes` and `on` (any case) are true; anything else set is
/// false.
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|value| matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
