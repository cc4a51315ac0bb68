//! Pool over the Postgres instance shared with the main application. This
//! service migrates and writes only the `order_jobs` queue table; the
//! `users`/`products`/`rooms` tables are read through the same pool.

use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

pub fn create_pool(database_url: &str) -> DbPool {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder()
        .build(manager)
        .expect("database connection pool")
}
