use lettre::message::Mailbox;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration build error: {0}")]
    Build(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

#[derive(Clone, Debug, Deserialize)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

/// Where each notification channel delivers. Webhook channels without a URL
/// are left unregistered.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChannelsConfig {
    #[serde(default)]
    pub email_recipients: Vec<String>,
    #[serde(default)]
    pub messaging_webhook_url: Option<String>,
    #[serde(default)]
    pub messaging_oncall_webhook_url: Option<String>,
    #[serde(default)]
    pub paging_webhook_url: Option<String>,
    #[serde(default)]
    pub phone_webhook_url: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_store_timeout_secs")]
    pub store_timeout_secs: u64,
    #[serde(default = "default_channel_timeout_secs")]
    pub channel_timeout_secs: u64,
    #[serde(default = "default_delivery_timeout_secs")]
    pub delivery_timeout_secs: u64,
    /// Recorded as the actor of every audit row.
    #[serde(default = "default_actor")]
    pub actor: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            store_timeout_secs: default_store_timeout_secs(),
            channel_timeout_secs: default_channel_timeout_secs(),
            delivery_timeout_secs: default_delivery_timeout_secs(),
            actor: default_actor(),
        }
    }
}

impl PipelineConfig {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }
    pub fn channel_timeout(&self) -> Duration {
        Duration::from_secs(self.channel_timeout_secs)
    }
    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_secs)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct EscalationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: default_poll_interval_secs(),
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct RetentionConfig {
    /// Throttle records idle for longer than this are pruned; 0 disables pruning.
    #[serde(default = "default_throttle_record_days")]
    pub throttle_record_days: u32,
    #[serde(default = "default_prune_interval_secs")]
    pub prune_interval_secs: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            throttle_record_days: default_throttle_record_days(),
            prune_interval_secs: default_prune_interval_secs(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    pub smtp: SmtpConfig,
    #[serde(default)]
    pub channels: ChannelsConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub escalation: EscalationConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}
fn default_store_timeout_secs() -> u64 {
    2
}
fn default_channel_timeout_secs() -> u64 {
    10
}
fn default_delivery_timeout_secs() -> u64 {
    30
}
fn default_actor() -> String {
    "alert-engine".to_string()
}
fn default_true() -> bool {
    true
}
fn default_poll_interval_secs() -> u64 {
    30
}
fn default_batch_size() -> u64 {
    100
}
fn default_throttle_record_days() -> u32 {
    30
}
fn default_prune_interval_secs() -> u64 {
    3600
}

impl AppConfig {
    /// Checks the values serde cannot: non-zero ports and timeouts, parseable
    /// addresses and webhook URLs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.smtp.port == 0 {
            return Err(ConfigError::Validation("smtp.port must be > 0".into()));
        }
        if self.smtp.from.parse::<Mailbox>().is_err() {
            return Err(ConfigError::Validation(format!(
                "smtp.from '{}' is not a valid mailbox",
                self.smtp.from
            )));
        }
        for (name, value) in [
            ("pipeline.store_timeout_secs", self.pipeline.store_timeout_secs),
            ("pipeline.channel_timeout_secs", self.pipeline.channel_timeout_secs),
            ("pipeline.delivery_timeout_secs", self.pipeline.delivery_timeout_secs),
            ("escalation.poll_interval_secs", self.escalation.poll_interval_secs),
            ("escalation.batch_size", self.escalation.batch_size),
            ("retention.prune_interval_secs", self.retention.prune_interval_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::Validation(format!("{name} must be > 0")));
            }
        }
        if self.pipeline.actor.trim().is_empty() {
            return Err(ConfigError::Validation("pipeline.actor must not be empty".into()));
        }
        for recipient in &self.channels.email_recipients {
            if recipient.parse::<Mailbox>().is_err() {
                return Err(ConfigError::Validation(format!(
                    "channels.email_recipients: '{recipient}' is not a valid mailbox"
                )));
            }
        }
        for (name, url) in [
            ("channels.messaging_webhook_url", &self.channels.messaging_webhook_url),
            (
                "channels.messaging_oncall_webhook_url",
                &self.channels.messaging_oncall_webhook_url,
            ),
            ("channels.paging_webhook_url", &self.channels.paging_webhook_url),
            ("channels.phone_webhook_url", &self.channels.phone_webhook_url),
        ] {
            if let Some(url) = url {
                let uri: hyper::Uri = url
                    .parse()
                    .map_err(|e| ConfigError::Validation(format!("{name}: {e}")))?;
                if !matches!(uri.scheme_str(), Some("http" | "https")) {
                    return Err(ConfigError::Validation(format!(
                        "{name} must be an http(s) URL"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Builds and validates an [`AppConfig`] from an already assembled source.
pub fn from_config(cfg: config::Config) -> Result<AppConfig, ConfigError> {
    let app: AppConfig = cfg.try_deserialize()?;
    app.validate()?;
    Ok(app)
}

/// Load application configuration from `config.yaml` + environment overrides.
///
/// Any variable matching the key path separated by double underscores
/// (e.g. `SMTP__PORT`, `PIPELINE__ACTOR`) overrides the file value.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    use config::{Config, Environment, File};
    let cfg = Config::builder()
        .add_source(File::with_name("config.yaml"))
        .add_source(Environment::default().separator("__"))
        .build()?;
    from_config(cfg)
}

/// Convenience helper for binaries wanting panic-on-error behaviour.
pub fn load_config_or_panic() -> AppConfig {
    match load_config() {
        Ok(c) => c,
        Err(e) => panic!("Failed to load configuration: {e}"),
    }
}
