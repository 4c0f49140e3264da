//! Server construction and middleware wiring.

mod config;
mod state_builders;

pub use config::ServerConfig;

use actix_session::config::{CookieContentSecurity, PersistentSession};
use actix_session::storage::{CookieSessionStore, RedisSessionStore, SessionStore};
use actix_session::SessionMiddleware;
use actix_web::cookie::{Key, SameSite};
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use tracing::info;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

use portal::Trace;
#[cfg(debug_assertions)]
use portal::doc::ApiDoc;
use portal::inbound::http::configure_api;
use portal::inbound::http::error::{json_config, path_config, query_config};
use portal::inbound::http::health::{HealthState, live, ready};
use portal::inbound::http::state::HttpState;

use state_builders::build_http_state;

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    key: Key,
    cookie_secure: bool,
    same_site: SameSite,
    ttl: actix_web::cookie::time::Duration,
}

fn build_app<St>(
    deps: AppDependencies,
    store: St,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
>
where
    St: SessionStore + 'static,
{
    let AppDependencies {
        health_state,
        http_state,
        key,
        cookie_secure,
        same_site,
        ttl,
    } = deps;

    let session = SessionMiddleware::builder(store, key)
        .cookie_name("session".into())
        .cookie_path("/".into())
        .cookie_secure(cookie_secure)
        .cookie_http_only(true)
        .cookie_content_security(CookieContentSecurity::Private)
        .cookie_same_site(same_site)
        .session_lifecycle(PersistentSession::default().session_ttl(ttl))
        .build();

    let api = web::scope("/api/v1")
        .wrap(session)
        .configure(configure_api);

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .app_data(json_config())
        .app_data(query_config())
        .app_data(path_config())
        .wrap(Trace)
        .service(api)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

fn serve<St, F>(
    deps: AppDependencies,
    make_store: F,
    config: &ServerConfig,
) -> std::io::Result<Server>
where
    St: SessionStore + 'static,
    F: Fn() -> St + Clone + Send + 'static,
{
    let server = HttpServer::new(move || build_app(deps.clone(), make_store()))
        .bind(config.bind_addr)?
        .run();
    Ok(server)
}

/// Construct the HTTP server and mark it ready once the socket is bound.
///
/// # Errors
///
/// Returns [`std::io::Error`] when the Redis session store cannot be reached
/// or the socket cannot be bound.
pub async fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let http_state = web::Data::new(build_http_state(&config));
    let ttl = actix_web::cookie::time::Duration::try_from(config.session.ttl)
        .unwrap_or_else(|_| actix_web::cookie::time::Duration::hours(2));
    let deps = AppDependencies {
        health_state: health_state.clone(),
        http_state,
        key: config.session.key.clone(),
        cookie_secure: config.session.cookie_secure,
        same_site: config.session.same_site,
        ttl,
    };

    let server = match config.redis_url.as_deref() {
        Some(url) => {
            let store = RedisSessionStore::new(url)
                .await
                .map_err(|err| std::io::Error::other(format!("redis session store: {err}")))?;
            info!("sessions stored in Redis");
            serve(deps, move || store.clone(), &config)?
        }
        None => {
            info!("sessions stored in private cookies");
            serve(deps, CookieSessionStore::default, &config)?
        }
    };

    info!(bind_addr = %config.bind_addr, "server listening");
    health_state.mark_ready();
    Ok(server)
}
