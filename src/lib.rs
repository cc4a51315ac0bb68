pub mod application;
pub mod backend;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod matching;
pub mod relay;
pub mod schema;
pub mod worker;

use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::order_builder::OrderBuilder;
use domain::ports::{CatalogStore, IntentParser, JobQueue, UserStore};

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) {
    let mut conn = pool.get().expect("Failed to get DB connection for migrations");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run database migrations");
}

/// Injected collaborators of the ingestion path. Constructed once at
/// startup and shared by every request.
pub struct AppServices {
    pub parser: Arc<dyn IntentParser>,
    pub queue: Arc<dyn JobQueue>,
    pub users: Arc<dyn UserStore>,
    pub builder: OrderBuilder<Arc<dyn CatalogStore>>,
}

#[derive(OpenApi)]
#[openapi(
    paths(handlers::orders::submit_text_order, handlers::orders::health),
    components(schemas(
        handlers::orders::TextOrderRequest,
        handlers::orders::TextOrderResponse,
        domain::intent::ParsedIntent,
        domain::intent::ProductIntent,
        domain::intent::DiscountType,
    )),
    tags((name = "orders"), (name = "health"))
)]
struct ApiDoc;

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    services: AppServices,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let services = web::Data::new(services);
    Ok(HttpServer::new(move || {
        App::new()
            .app_data(services.clone())
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
            .route("/", web::get().to(handlers::orders::health))
            .route("/order", web::post().to(handlers::orders::submit_text_order))
    })
    .bind((host.to_string(), port))?
    .run())
}
