use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "RESDESK_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/resdesk.toml";
const ENV_PREFIX: &str = "RESDESK";
const ENV_SEPARATOR: &str = "__";
const API_KEY_ENV_VAR: &str = "IMGBB_API_KEY";

/// Load configuration with priority (lowest to highest):
/// struct defaults, TOML file, `.env`, process environment.
pub fn load() -> Result<Config, ConfigError> {
    let _ = dotenvy::dotenv();

    let config_path = env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut config = load_from_sources(config_path)?;
    load_secrets(&mut config);

    Ok(config)
}

/// The image host key never comes from a file.
fn load_secrets(config: &mut Config) {
    config.image_host.api_key = env::var(API_KEY_ENV_VAR)
        .ok()
        .filter(|key| !key.trim().is_empty());
}

/// Load configuration from a specific path and the environment
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::warn!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // RESDESK__STORE__PAGE_SIZE -> store.page_size
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}
