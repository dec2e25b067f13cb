use config::Config;
use sea_orm_migration::prelude::*;
use std::env;

/// Runs the sea-orm migration CLI against `DATABASE_URL`, falling back to the
/// `database_url` of the alert engine's `config.yaml`.
#[tokio::main]
async fn main() {
    if env::var("DATABASE_URL").is_err() {
        let url = Config::builder()
            .add_source(config::File::with_name("config.yaml").required(false))
            .add_source(config::Environment::default().separator("__"))
            .build()
            .ok()
            .and_then(|settings| settings.get_string("database_url").ok());
        if let Some(url) = url {
            env::set_var("DATABASE_URL", url);
        }
    }
    cli::run_cli(migration::Migrator).await;
}
