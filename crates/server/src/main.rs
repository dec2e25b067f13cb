use alert_engine::alerts::{escalation_loop, retention_loop};
use alert_engine::api::{AlertAppState, start_webserver};
use alert_engine::config::load_config_or_panic;
use alert_engine::{AppResources, Services};
use lettre::{AsyncSmtpTransport, Tokio1Executor, transport::smtp::authentication::Credentials};
use migration::{Migrator, MigratorTrait};
use rustls::crypto;
use rustls::crypto::CryptoProvider;
use sea_orm::Database;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn initialize_standard_tracing() {
    let default_directives = "alert_engine=info,hyper=warn,sea_orm=info";
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    let registry = tracing_subscriber::registry().with(env_filter);
    let layer = fmt::layer().with_target(true).with_level(true);

    registry.with(layer).init();
}

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    initialize_standard_tracing();

    let config = Arc::new(load_config_or_panic());

    let ring_provider = crypto::ring::default_provider();
    CryptoProvider::install_default(ring_provider)
        .map_err(|_| color_eyre::eyre::eyre!("Failed to install crypto provider"))?;

    let db = Arc::new(Database::connect(&config.database_url).await?);
    Migrator::up(db.as_ref(), None).await?;

    let creds = Credentials::new(config.smtp.username.clone(), config.smtp.password.clone());
    let mailer = Arc::new(
        AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp.server)?
            .port(config.smtp.port)
            .credentials(creds)
            .build(),
    );

    let resources = AppResources { db, mailer, config };
    let Services {
        processor,
        escalations,
        throttle_store,
    } = resources.services()?;

    if resources.config.escalation.enabled {
        let runner = escalations.clone();
        let every = Duration::from_secs(resources.config.escalation.poll_interval_secs);
        tokio::spawn(async move { escalation_loop(runner, every).await });
    }

    {
        let days = resources.config.retention.throttle_record_days;
        let every = Duration::from_secs(resources.config.retention.prune_interval_secs);
        tokio::spawn(async move { retention_loop(throttle_store, days, every).await });
    }

    let alert_state = AlertAppState {
        processor,
        escalations,
    };
    start_webserver(alert_state, &resources.config.listen_addr).await?;
    Ok(())
}
