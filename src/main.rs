use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpResponse, HttpServer, Responder, get};
use serde_json::json;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod ledger;
mod model;
mod models;
mod notify;
mod routes;
mod store;
#[cfg(test)]
mod test_support;

use config::Config;
use db::{init_db, run_migrations};
use ledger::{AttendanceLedger, SystemClock};
use notify::{AdminNotifier, LogNotifier, WebhookNotifier};
use store::{AttendanceStore, InMemoryAttendanceStore, MySqlAttendanceStore};

use crate::docs::ApiDoc;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .pretty()
        .init();

    info!("Server starting...");

    let store: Arc<dyn AttendanceStore> = match &config.database_url {
        Some(url) => {
            let pool = init_db(url).await?;
            run_migrations(&pool).await?;
            Arc::new(MySqlAttendanceStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, records are kept in memory only");
            Arc::new(InMemoryAttendanceStore::new())
        }
    };

    let notifier: Arc<dyn AdminNotifier> = match &config.admin_webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url.as_str())?),
        None => Arc::new(LogNotifier),
    };

    let ledger = Data::new(AttendanceLedger::new(
        store,
        notifier,
        Arc::new(SystemClock),
        config.attendance_offset,
    ));

    let server_addr = config.server_addr.clone();
    info!(addr = %server_addr, prefix = %config.api_prefix, "Listening");

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard matches JS/CSS assets
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(ledger.clone())
            .app_data(Data::new(config.clone()))
            .service(health)
            .configure(|cfg| routes::configure(cfg, config.clone()))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
