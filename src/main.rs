use std::sync::Arc;

use dotenvy::dotenv;
use storefront_service::application::reconciliation::FulfillmentReconciler;
use storefront_service::config::AppConfig;
use storefront_service::infrastructure::chapa::ChapaGateway;
use storefront_service::infrastructure::notification_hub::NotificationHub;
use storefront_service::{build_server, build_state, create_pool, run_migrations};
use tokio_util::sync::CancellationToken;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(startup_error)?;

    let pool = create_pool(&config.database_url).map_err(startup_error)?;
    run_migrations(&pool).map_err(startup_error)?;

    let hub = Arc::new(NotificationHub::new());
    hub.start();

    let gateway = Arc::new(ChapaGateway::new(&config.gateway));
    let state = build_state(pool, gateway, hub.clone(), &config);

    let shutdown = CancellationToken::new();
    let reconciler = FulfillmentReconciler::new(state.payments.clone(), config.reconcile.clone())
        .spawn(shutdown.clone());

    log::info!("Starting server at http://{}:{}", config.host, config.port);
    let result = build_server(state, &config.host, config.port)?.await;

    shutdown.cancel();
    hub.stop();
    if let Err(e) = reconciler.await {
        log::warn!("Reconciler task ended abnormally: {}", e);
    }
    result
}

fn startup_error(e: impl std::fmt::Display) -> std::io::Error {
    log::error!("Startup failed: {}", e);
    std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
}
