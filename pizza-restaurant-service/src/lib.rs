pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod schema;
pub mod seed;
pub mod serializer;
pub mod validation;

pub use db::{
    establish_pool, resolve_database_url, run_migrations, DbConnection, DbPool,
    DEFAULT_DATABASE_URL,
};
pub use handlers::{app, AppState};

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:5555";
