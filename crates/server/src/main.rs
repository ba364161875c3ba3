use db::{DBService, DbErr};
use server::{AppState, http};
use services::notify;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, prelude::*};

const NOTIFICATION_DISPATCH_INTERVAL: std::time::Duration = std::time::Duration::from_secs(5);
const NOTIFICATION_BATCH_SIZE: u64 = 20;
const DEFAULT_DATABASE_URL: &str = "sqlite://tracker.sqlite?mode=rwc";

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Database(#[from] DbErr),
}

#[tokio::main]
async fn main() -> Result<(), TrackerError> {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter_string = format!(
        "warn,server={level},services={level},db={level}",
        level = log_level
    );
    let env_filter = EnvFilter::try_new(filter_string).expect("Failed to create tracing filter");
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .init();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
    let db = DBService::new(&database_url).await?;
    let state = AppState::new(db);

    // Outbox dispatcher: committed notifications leave through here,
    // decoupled from the requests that queued them.
    let dispatch_pool = state.db().pool.clone();
    let mailer = state.mailer().clone();
    tokio::spawn(async move {
        loop {
            match notify::dispatch_pending(&dispatch_pool, mailer.as_ref(), NOTIFICATION_BATCH_SIZE)
                .await
            {
                Ok(sent) if sent > 0 => {
                    tracing::debug!(sent, "Dispatched queued notifications");
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(error = %err, "Notification dispatch pass failed");
                }
            }
            tokio::time::sleep(NOTIFICATION_DISPATCH_INTERVAL).await;
        }
    });

    let app_router = http::router(state);

    let port = std::env::var("BACKEND_PORT")
        .or_else(|_| std::env::var("PORT"))
        .ok()
        .and_then(|raw| raw.trim().parse::<u16>().ok())
        .unwrap_or(0);
    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

    let listener = tokio::net::TcpListener::bind(format!("{host}:{port}")).await?;
    let actual_port = listener.local_addr()?.port();
    tracing::info!("Server running on http://{host}:{actual_port}");

    axum::serve(listener, app_router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {err}");
        return;
    }
    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
