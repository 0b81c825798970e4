use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration build error: {0}")]
    Build(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

#[derive(Clone, Deserialize)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

/// Pacing knobs for the notification batch dispatcher.
#[derive(Clone, Debug, Deserialize)]
pub struct DispatchConfig {
    /// Recipients per send batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Pause between consecutive batches, in milliseconds.
    #[serde(default = "default_inter_batch_delay_ms")]
    pub inter_batch_delay_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            inter_batch_delay_ms: default_inter_batch_delay_ms(),
        }
    }
}

fn default_batch_size() -> usize {
    10
}

fn default_inter_batch_delay_ms() -> u64 {
    1000
}

/// Which mail backend the binary wires up.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MailerBackend {
    #[default]
    Smtp,
    /// Logs outgoing mail instead of delivering it. For local development only.
    Noop,
}

#[derive(Deserialize)]
pub struct AppConfig {
    pub smtp: SmtpConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    pub frontend_url: String,
    #[serde(default)]
    pub mailer_backend: MailerBackend,
    /// Optional JSON file with group rosters for the static recipient source.
    #[serde(default)]
    pub roster_path: Option<String>,
}

/// Load application configuration from `config.yaml` + environment overrides.
///
/// Environment variable override convention (current): any var matching the key path
/// separated by double underscores (e.g. `SMTP__PORT`) *without* a prefix will override
/// the file value. A future iteration may introduce a prefix (e.g. `APP__`).
///
/// Returns a `ConfigError` instead of panicking so the caller can decide how to fail.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    use config::{Config, Environment, File};
    let cfg = Config::builder()
        .add_source(File::with_name("config.yaml"))
        .add_source(Environment::default().separator("__"))
        .build()?;

    let app: AppConfig = cfg.try_deserialize()?;
    validate_config(&app)?;

    Ok(app)
}

/// Checks the invariants the deserializer cannot express.
pub fn validate_config(app: &AppConfig) -> Result<(), ConfigError> {
    if app.smtp.port == 0 {
        return Err(ConfigError::Validation("smtp.port must be > 0".into()));
    }
    if app.smtp.from.parse::<lettre::message::Mailbox>().is_err() {
        return Err(ConfigError::Validation(
            "smtp.from must be a valid mailbox address".into(),
        ));
    }
    if app.dispatch.batch_size == 0 {
        return Err(ConfigError::Validation(
            "dispatch.batch_size must be >= 1".into(),
        ));
    }
    Ok(())
}

/// Convenience helper for binaries wanting the old panic-on-error behaviour.
pub fn load_config_or_panic() -> AppConfig {
    match load_config() {
        Ok(c) => c,
        Err(e) => panic!("Failed to load configuration: {e}"),
    }
}
