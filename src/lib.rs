pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::notification_service::NotificationService;
use application::order_service::OrderService;
use application::payment_service::PaymentService;
use application::product_service::ProductService;
use config::AppConfig;
use domain::errors::DomainError;
use domain::ports::PaymentGateway;
use infrastructure::notification_hub::NotificationHub;
use infrastructure::notification_repo::DieselNotificationRepository;
use infrastructure::order_repo::DieselOrderRepository;
use infrastructure::product_repo::DieselProductRepository;

pub use db::{create_pool, DbPool};
pub use state::AppState;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), DomainError> {
    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| DomainError::Internal(format!("failed to run migrations: {e}")))?;
    Ok(())
}

/// Wires the Diesel repositories, the given gateway and `hub` into the
/// application services.
pub fn build_state(
    pool: DbPool,
    gateway: Arc<dyn PaymentGateway>,
    hub: Arc<NotificationHub>,
    config: &AppConfig,
) -> AppState {
    let orders = Arc::new(DieselOrderRepository::new(pool.clone()));
    let products = Arc::new(DieselProductRepository::new(pool.clone()));
    let notifications = Arc::new(NotificationService::new(
        Arc::new(DieselNotificationRepository::new(pool)),
        hub.clone(),
    ));

    AppState {
        orders: Arc::new(OrderService::new(
            orders.clone(),
            products.clone(),
            gateway.clone(),
            notifications.clone(),
            config.checkout.clone(),
        )),
        products: Arc::new(ProductService::new(products, notifications.clone())),
        payments: Arc::new(PaymentService::new(
            orders,
            gateway,
            notifications.clone(),
            config.checkout.clone(),
        )),
        notifications,
        hub,
        webhook_secret: config.gateway.webhook_secret.clone(),
    }
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    state: AppState,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let openapi = handlers::ApiDoc::openapi();
    Ok(HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(Logger::default())
            .configure(handlers::configure)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
