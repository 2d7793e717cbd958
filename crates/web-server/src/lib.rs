use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use configuration::ServerConfig;
use database::DonationStore;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

pub mod error;
pub mod handlers;

/// The shared application state that all handlers can access.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DonationStore>,
}

/// Builds the API router around `store`, without a static-file fallback.
pub fn create_router(store: Arc<dyn DonationStore>) -> Router {
    let app_state = Arc::new(AppState { store });
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(Any)
        .allow_headers(AllowHeaders::any());

    Router::new()
        .route("/check-db-connection", get(handlers::check_db_connection))
        // --- Charities ---
        .route("/demotable", get(handlers::list_charities))
        .route("/count-demotable", get(handlers::count_charities))
        .route("/insert-demotable", post(handlers::insert_charity))
        .route("/update-charity", post(handlers::update_charity))
        .route("/delete-charity", post(handlers::delete_charity))
        .route("/search-charities", post(handlers::search_charities))
        .route("/projection", post(handlers::project_charities))
        .route("/initiate-demotable", post(handlers::reinitialize))
        // --- Recipients ---
        .route("/insert-recipient", post(handlers::insert_recipient))
        .route("/recipients", get(handlers::list_recipients))
        .route("/recipients/:sin_num", get(handlers::get_recipient))
        .route("/update-recipients", post(handlers::update_recipient))
        // --- Events and donors ---
        .route("/donation-events", get(handlers::list_donation_events))
        .route("/fooddonor", get(handlers::list_food_donors))
        .route("/delete-donor", post(handlers::delete_donor))
        // --- Analytical queries ---
        .route("/recipients-for-food/:food_id", get(handlers::recipients_for_food))
        .route(
            "/event-recipient-aggregation",
            get(handlers::event_recipient_aggregation),
        )
        .route("/recipient-age-count", get(handlers::recipient_age_count))
        .route("/lowest-age-event-query", get(handlers::lowest_age_event))
        .route("/division-query", get(handlers::division_query))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(1024 * 1024))
}

/// Serves the API until SIGINT or SIGTERM, then closes the store.
pub async fn run_server(config: &ServerConfig, store: Arc<dyn DonationStore>) -> anyhow::Result<()> {
    let addr = config.socket_addr()?;

    let mut app = create_router(store.clone());
    if let Some(dir) = &config.static_dir {
        tracing::info!(directory = %dir.display(), "Serving static files.");
        app = app.fallback_service(ServeDir::new(dir));
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Web server started and listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutting down, closing the store.");
    store.close().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler.");
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler.");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
