use std::time::Duration;

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PoolError, PooledConnection};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::{debug, info};

use crate::models::{
    NewPizza, NewRestaurant, NewRestaurantPizza, Pizza, Restaurant, RestaurantPizza,
    RestaurantPizzaDraft,
};
use crate::schema::{pizzas, restaurant_pizzas, restaurants};
use crate::validation::{validate_price, PriceViolation};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

pub const DEFAULT_DATABASE_URL: &str = "app.db";
/// Older deployments name the store location with this variable.
pub const LEGACY_DATABASE_URL_ENV: &str = "DB_URI";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to build connection pool: {0}")]
    Pool(#[from] PoolError),
    #[error("failed to run migrations: {0}")]
    Migration(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CreateRestaurantPizzaError {
    #[error("pizza {0:?} does not exist")]
    UnknownPizza(Option<i32>),
    #[error("restaurant {0:?} does not exist")]
    UnknownRestaurant(Option<i32>),
    #[error("invalid price: {0:?}")]
    InvalidPrice(Vec<PriceViolation>),
    #[error("constraint violated: {0}")]
    Constraint(String),
    #[error(transparent)]
    Database(#[from] DieselError),
}

/// Per-connection SQLite settings, applied when the pool opens a connection.
#[derive(Debug, Clone, Copy)]
struct ConnectionOptions {
    enable_wal: bool,
    busy_timeout: Duration,
}

impl ConnectionOptions {
    fn apply(&self, conn: &mut SqliteConnection) -> QueryResult<()> {
        conn.batch_execute(&format!(
            "PRAGMA busy_timeout = {};",
            self.busy_timeout.as_millis()
        ))?;
        if self.enable_wal {
            conn.batch_execute("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
        }
        conn.batch_execute("PRAGMA foreign_keys = ON;")
    }
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        self.apply(conn).map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Accepts `sqlite://` URLs as well as the plain paths diesel expects.
pub fn normalize_database_url(database_url: &str) -> &str {
    database_url
        .strip_prefix("sqlite://")
        .unwrap_or(database_url)
}

/// Picks the store location: an explicit `DATABASE_URL`, then `DB_URI`, then
/// [`DEFAULT_DATABASE_URL`].
pub fn resolve_database_url(database_url: Option<String>, legacy: Option<String>) -> String {
    database_url
        .or(legacy)
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
}

fn is_in_memory(database_url: &str) -> bool {
    database_url == ":memory:" || database_url.contains("mode=memory")
}

pub fn establish_pool(database_url: &str, pool_size: u32) -> Result<DbPool, StoreError> {
    let database_url = normalize_database_url(database_url);
    let in_memory = is_in_memory(database_url);

    let builder = DbPool::builder().connection_customizer(Box::new(ConnectionOptions {
        enable_wal: !in_memory,
        busy_timeout: BUSY_TIMEOUT,
    }));
    // every in-memory connection is its own database, so keep exactly one alive
    let builder = if in_memory {
        builder.max_size(1).idle_timeout(None).max_lifetime(None)
    } else {
        builder.max_size(pool_size.max(1))
    };

    let pool = builder.build(ConnectionManager::<SqliteConnection>::new(database_url))?;
    debug!(database_url, in_memory, "connection pool ready");
    Ok(pool)
}

pub fn run_migrations(conn: &mut SqliteConnection) -> Result<(), StoreError> {
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| StoreError::Migration(e.to_string()))?;
    for version in applied {
        info!(%version, "applied migration");
    }
    Ok(())
}

pub fn list_restaurants(conn: &mut SqliteConnection) -> QueryResult<Vec<Restaurant>> {
    restaurants::table
        .select(Restaurant::as_select())
        .order(restaurants::id.asc())
        .load(conn)
}

pub fn find_restaurant(conn: &mut SqliteConnection, id: i32) -> QueryResult<Option<Restaurant>> {
    restaurants::table
        .find(id)
        .select(Restaurant::as_select())
        .first(conn)
        .optional()
}

pub fn list_pizzas(conn: &mut SqliteConnection) -> QueryResult<Vec<Pizza>> {
    pizzas::table
        .select(Pizza::as_select())
        .order(pizzas::id.asc())
        .load(conn)
}

pub fn find_pizza(conn: &mut SqliteConnection, id: i32) -> QueryResult<Option<Pizza>> {
    pizzas::table
        .find(id)
        .select(Pizza::as_select())
        .first(conn)
        .optional()
}

/// Associations of `restaurant`, each with the pizza it refers to.
pub fn restaurant_pizzas_with_pizza(
    conn: &mut SqliteConnection,
    restaurant: &Restaurant,
) -> QueryResult<Vec<(RestaurantPizza, Pizza)>> {
    RestaurantPizza::belonging_to(restaurant)
        .inner_join(pizzas::table)
        .select((RestaurantPizza::as_select(), Pizza::as_select()))
        .order(restaurant_pizzas::id.asc())
        .load(conn)
}

pub fn insert_restaurant(
    conn: &mut SqliteConnection,
    restaurant: &NewRestaurant,
) -> QueryResult<Restaurant> {
    diesel::insert_into(restaurants::table)
        .values(restaurant)
        .returning(Restaurant::as_returning())
        .get_result(conn)
}

pub fn insert_pizza(conn: &mut SqliteConnection, pizza: &NewPizza) -> QueryResult<Pizza> {
    diesel::insert_into(pizzas::table)
        .values(pizza)
        .returning(Pizza::as_returning())
        .get_result(conn)
}

/// Deletes a restaurant together with its associations.
///
/// Returns `false` when no restaurant has this id.
pub fn delete_restaurant(conn: &mut SqliteConnection, id: i32) -> QueryResult<bool> {
    conn.transaction(|conn| {
        let associations = diesel::delete(
            restaurant_pizzas::table.filter(restaurant_pizzas::restaurant_id.eq(id)),
        )
        .execute(conn)?;
        let deleted = diesel::delete(restaurants::table.find(id)).execute(conn)?;
        if deleted > 0 {
            debug!(id, associations, "deleted restaurant");
        }
        Ok(deleted > 0)
    })
}

/// Deletes a pizza together with its associations.
///
/// Returns `false` when no pizza has this id.
pub fn delete_pizza(conn: &mut SqliteConnection, id: i32) -> QueryResult<bool> {
    conn.transaction(|conn| {
        let associations =
            diesel::delete(restaurant_pizzas::table.filter(restaurant_pizzas::pizza_id.eq(id)))
                .execute(conn)?;
        let deleted = diesel::delete(pizzas::table.find(id)).execute(conn)?;
        if deleted > 0 {
            debug!(id, associations, "deleted pizza");
        }
        Ok(deleted > 0)
    })
}

/// Resolves both parents, validates the price and inserts the association in
/// one transaction. Nothing is written unless every step succeeds.
///
/// The write lock is taken up front (`BEGIN IMMEDIATE`) so that concurrent
/// creates wait on the busy timeout instead of failing to upgrade a read lock.
pub fn create_restaurant_pizza(
    conn: &mut SqliteConnection,
    draft: &RestaurantPizzaDraft,
) -> Result<(RestaurantPizza, Pizza, Restaurant), CreateRestaurantPizzaError> {
    conn.immediate_transaction::<_, CreateRestaurantPizzaError, _>(|conn| {
        let pizza = match draft.pizza_id {
            Some(id) => find_pizza(conn, id)?,
            None => None,
        };
        let restaurant = match draft.restaurant_id {
            Some(id) => find_restaurant(conn, id)?,
            None => None,
        };
        let pizza = pizza.ok_or(CreateRestaurantPizzaError::UnknownPizza(draft.pizza_id))?;
        let restaurant = restaurant.ok_or(CreateRestaurantPizzaError::UnknownRestaurant(
            draft.restaurant_id,
        ))?;

        let price = validate_price(draft.price.as_ref())
            .map_err(CreateRestaurantPizzaError::InvalidPrice)?;

        let created = diesel::insert_into(restaurant_pizzas::table)
            .values(&NewRestaurantPizza {
                price,
                pizza_id: pizza.id,
                restaurant_id: restaurant.id,
            })
            .returning(RestaurantPizza::as_returning())
            .get_result(conn)
            .map_err(reject_constraint_violation)?;

        Ok((created, pizza, restaurant))
    })
}

fn reject_constraint_violation(error: DieselError) -> CreateRestaurantPizzaError {
    match error {
        DieselError::DatabaseError(
            DatabaseErrorKind::CheckViolation
            | DatabaseErrorKind::ForeignKeyViolation
            | DatabaseErrorKind::NotNullViolation,
            info,
        ) => CreateRestaurantPizzaError::Constraint(info.message().to_string()),
        error => CreateRestaurantPizzaError::Database(error),
    }
}

#[cfg(test)]
pub(crate) fn test_pool() -> DbPool {
    let pool = establish_pool(":memory:", 1).unwrap();
    run_migrations(&mut pool.get().unwrap()).unwrap();
    pool
}
