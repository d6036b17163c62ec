//! # Billboard Binary
//!
//! The entry point that assembles the application based on compile-time
//! features. Besides the HTTP server it exposes one maintenance command:
//! `billboard migrate-images` converts legacy inline image blobs into
//! store files.

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use bb_api::handlers::AppState;
use bb_core::models::Notification;
use bb_core::traits::{AuditLog, Notifier};
use bb_services::{
    CategoryService, EntryService, ImageService, MigrationReport, ModerationService, RulesStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "db-sqlite")]
use bb_db_sqlite::SqliteBillboardRepo;

#[cfg(feature = "storage-local")]
use bb_storage_local::LocalFileStore;

#[cfg(feature = "auth-simple")]
use bb_auth_simple::StaticPrivilegeProvider;

/// Runtime configuration, resolved from the environment with defaults
/// suitable for a local run.
struct Config {
    db_url: String,
    image_dir: PathBuf,
    rules_file: PathBuf,
    privileges_file: PathBuf,
    comments_enabled: bool,
    bind: String,
}

impl Config {
    fn from_env() -> Self {
        let var = |name: &str, default: &str| {
            std::env::var(name).unwrap_or_else(|_| default.to_string())
        };

        Self {
            db_url: var("BILLBOARD_DB_URL", "sqlite:billboard.db"),
            image_dir: var("BILLBOARD_IMAGE_DIR", "./data/images").into(),
            rules_file: var("BILLBOARD_RULES_FILE", "./data/rules.cfg").into(),
            privileges_file: var("BILLBOARD_PRIVILEGES_FILE", "./data/privileges.json").into(),
            comments_enabled: var("BILLBOARD_ENABLE_COMMENTS", "true") == "true",
            bind: var("BILLBOARD_BIND", "127.0.0.1:8080"),
        }
    }
}

/// Forwards notifications to the log. A mail or messenger adapter would
/// replace this in a full deployment.
struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        tracing::info!(
            recipient = %notification.recipient,
            icon = %notification.icon,
            link = %notification.link,
            "{}",
            notification.message
        );
    }
}

/// Writes audit lines to the log under the module tag.
struct TracingAuditLog;

impl AuditLog for TracingAuditLog {
    fn log(&self, line: &str) {
        tracing::info!(target: "billboard::audit", "{line}");
    }
}

/// Rows left unconverted must surface in the exit status, not just the log,
/// so cron wrappers notice.
fn migration_outcome(report: &MigrationReport) -> anyhow::Result<()> {
    if report.failed > 0 {
        anyhow::bail!("{} image rows failed to migrate", report.failed);
    }
    Ok(())
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();

    // 1. Database implementation
    #[cfg(feature = "db-sqlite")]
    let repo = Arc::new(
        SqliteBillboardRepo::connect(&config.db_url)
            .await
            .context("failed to open the database")?,
    );

    // 2. Storage implementation
    #[cfg(feature = "storage-local")]
    let store = Arc::new(LocalFileStore::new(config.image_dir.clone()));

    // 3. Identity implementation
    #[cfg(feature = "auth-simple")]
    let auth = Arc::new(
        StaticPrivilegeProvider::from_file(&config.privileges_file)
            .context("failed to load the privilege map")?,
    );

    let notifier = Arc::new(TracingNotifier);
    let audit = Arc::new(TracingAuditLog);

    let images = Arc::new(ImageService::new(repo.clone(), store, audit.clone()));

    // Maintenance mode: convert legacy blobs, report, exit.
    if std::env::args().nth(1).as_deref() == Some("migrate-images") {
        let report = images
            .migrate_legacy()
            .await
            .context("image migration failed")?;
        tracing::info!(
            converted = report.converted,
            failed = report.failed,
            "image migration finished"
        );
        return migration_outcome(&report);
    }

    let state = web::Data::new(AppState {
        entries: Arc::new(EntryService::new(
            repo.clone(),
            images.clone(),
            audit.clone(),
        )),
        categories: Arc::new(CategoryService::new(repo.clone(), audit.clone())),
        moderation: Arc::new(ModerationService::new(
            repo,
            notifier,
            audit,
            config.comments_enabled,
        )),
        images,
        rules: Arc::new(RulesStore::new(config.rules_file.clone())),
        auth,
    });

    tracing::info!(bind = %config.bind, "billboard starting");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(bb_api::middleware::request_logger())
            .wrap(bb_api::middleware::cors_policy())
            .configure(bb_api::configure_routes)
    })
    .bind(config.bind)?
    .run()
    .await?;

    Ok(())
}
