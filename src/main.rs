use std::env;
use std::sync::Arc;

use dotenvy::dotenv;
use tokio::sync::watch;

use text_order_service::application::order_builder::OrderBuilder;
use text_order_service::backend::HttpOrderBackend;
use text_order_service::domain::ports::CatalogStore;
use text_order_service::infrastructure::catalog_store::{DieselCatalogStore, DieselUserStore};
use text_order_service::infrastructure::intent_parser::OpenAiIntentParser;
use text_order_service::infrastructure::job_store::{DieselJobQueue, JobQueueConfig};
use text_order_service::relay::Relay;
use text_order_service::worker::{OrderWorker, WorkerSettings};
use text_order_service::{build_server, create_pool, run_migrations, AppServices};

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let backend_url = env::var("BACKEND_API_URL").expect("BACKEND_API_URL must be set");
    let openai_key = env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY must be set");
    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .unwrap_or_else(|_| "3001".to_string())
        .parse()
        .expect("PORT must be a valid number");

    let pool = create_pool(&database_url);
    run_migrations(&pool);

    let relay = Relay::new(256);
    let queue = Arc::new(DieselJobQueue::new(pool.clone(), JobQueueConfig::default()));
    let backend =
        Arc::new(HttpOrderBackend::new(&backend_url).expect("Failed to build backend HTTP client"));
    let parser =
        Arc::new(OpenAiIntentParser::new(openai_key).expect("Failed to build OpenAI client"));
    let catalog = Arc::new(DieselCatalogStore::new(pool.clone()));

    let settings = WorkerSettings {
        concurrency: env_or("WORKER_CONCURRENCY", 5),
        rate_limit: env_or("WORKER_RATE_LIMIT", 10),
        ..WorkerSettings::default()
    };
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = OrderWorker::new(queue.clone(), backend, Arc::clone(&relay), settings);
    let worker_handle = tokio::spawn(worker.run(shutdown_rx));

    let services = AppServices {
        parser,
        queue,
        users: Arc::new(DieselUserStore::new(pool.clone())),
        builder: OrderBuilder::new(catalog as Arc<dyn CatalogStore>),
    };

    log::info!("Starting server at http://{}:{}", host, port);
    build_server(services, &host, port)?.await?;

    // Server is down; drain in-flight jobs before exiting.
    let _ = shutdown_tx.send(true);
    let _ = worker_handle.await;
    Ok(())
}
