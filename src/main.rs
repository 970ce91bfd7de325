use crate::config::AppConfig;
use crate::db::connection::{init_db, Database};
use crate::router::{handle, AppContext};
use astra::Server;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod auth;
mod config;
mod db;
mod domain;
mod errors;
mod responses;
mod router;
mod spreadsheets;
mod templates;

#[cfg(test)]
mod tests;

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "change_tracker=info".into()))
        .with(fmt::layer())
        .init();

    let config = match AppConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            std::process::exit(2);
        }
    };

    let db = Database::new(config.db_path.clone());
    if let Err(e) = init_db(&db) {
        tracing::error!(error = %e, "database initialization failed");
        std::process::exit(1);
    }

    let addr = config.bind_addr;
    tracing::info!(
        %addr,
        workers = config.max_workers,
        manager_scope = ?config.manager_scope,
        "starting server"
    );

    let server = Server::bind(&addr).max_workers(config.max_workers);
    let ctx = AppContext::new(db, config);

    let result = server.serve(move |req, _info| handle(req, &ctx));

    if let Err(e) = result {
        tracing::error!(error = %e, "server ended with error");
        std::process::exit(1);
    }

    tracing::info!("server shut down cleanly");
}
