//! Portal entry-point: loads configuration, prepares the stores and serves
//! the REST API.

mod server;

use std::sync::Arc;

use actix_web::web;
use mockable::DefaultEnv;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use portal::PortalSettings;
use portal::domain::ports::Notifier;
use portal::inbound::http::health::HealthState;
use portal::inbound::http::session_config::{BuildMode, session_settings_from_env};
use portal::outbound::mail::{HttpMailRelay, TracingNotifier};
use portal::outbound::persistence::{DbPool, PoolConfig, run_pending_migrations};
use server::{ServerConfig, create_server};

fn other(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::other(format!("{context}: {err}"))
}

async fn connect_database(settings: &PortalSettings) -> std::io::Result<Option<DbPool>> {
    let Some(url) = settings.database_url.as_deref() else {
        return Ok(None);
    };
    if settings.run_migrations {
        run_pending_migrations(url)
            .await
            .map_err(|err| other("migrations failed", err))?;
    }
    let pool = DbPool::new(PoolConfig::new(url).with_max_size(settings.pool_size()))
        .await
        .map_err(|err| other("database unavailable", err))?;
    Ok(Some(pool))
}

fn build_notifier(settings: &PortalSettings) -> std::io::Result<Arc<dyn Notifier>> {
    match settings
        .mail_relay()
        .map_err(|err| other("invalid mail settings", err))?
    {
        Some(relay) => {
            info!(endpoint = %relay.endpoint, "delivering email through relay");
            let notifier = HttpMailRelay::new(relay.endpoint, relay.sender, relay.timeout)
                .map_err(|err| other("mail relay client", err))?;
            Ok(Arc::new(notifier))
        }
        None => {
            warn!("no mail relay configured; emails are logged only");
            Ok(Arc::new(TracingNotifier))
        }
    }
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = PortalSettings::load().map_err(|err| other("configuration", err))?;
    let session = session_settings_from_env(&DefaultEnv::new(), BuildMode::from_debug_assertions())
        .map_err(|err| other("session configuration", err))?;
    let bind_addr = settings
        .bind_addr()
        .map_err(|err| other("configuration", err))?;
    let admin_email = settings
        .admin_email()
        .map_err(|err| other("configuration", err))?;
    if admin_email.is_none() {
        warn!("no admin email configured; registration alerts are disabled");
    }

    let mut config = ServerConfig::new(session, bind_addr)
        .with_redis_url(settings.redis_url.clone())
        .with_notifier(build_notifier(&settings)?, admin_email);
    if let Some(pool) = connect_database(&settings).await? {
        config = config.with_db_pool(pool);
    }

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state.clone(), config).await?;
    let result = server.await;
    health_state.mark_unhealthy();
    result
}
