//! Listings is a microservice responsible for the catalog of a
//! community product marketplace: submissions under the free-tier
//! entitlement, moderation, votes, reports, ratings, coupons and the
//! paid-verification checkout.
//! The layered structure of the app is
//!
//! `Application -> Service -> Repo`
//!
//! Each layer can throw Error with context or cover occurred error with
//! Error in the context. When error is not covered with Error it will
//! be translated to "Internal server error" at the application boundary.
extern crate chrono;
extern crate config as config_crate;
#[macro_use]
extern crate failure;
extern crate futures;
extern crate futures_cpupool;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;
extern crate r2d2;
extern crate r2d2_sqlite;
extern crate regex;
#[macro_use]
extern crate rusqlite;
extern crate serde;
#[macro_use]
extern crate serde_derive;
extern crate serde_json;
extern crate uuid;
extern crate validator;
#[macro_use]
extern crate validator_derive;

#[macro_use]
pub mod macros;
pub mod config;
pub mod errors;
pub mod models;
pub mod repos;
pub mod schema;
pub mod services;

use std::sync::Arc;

use futures_cpupool::CpuPool;
use r2d2_sqlite::SqliteConnectionManager;

use config::Config;
use repos::repo_factory::ReposFactoryImpl;
use services::StaticContext;

/// Builds the shared static context from provided `Config`: connection
/// pool, schema bootstrap and cpu pool. Called once at process start; the
/// result is cloned into every request.
pub fn create_static_context(config: Config) -> StaticContext<ReposFactoryImpl> {
    let database = config.server.database.clone();
    let manager = if database == ":memory:" {
        SqliteConnectionManager::memory()
    } else {
        SqliteConnectionManager::file(&database)
    };
    let db_pool = r2d2::Pool::builder().build(manager).expect("Failed to create DB connection pool");

    {
        let conn = db_pool.get().expect("Failed to get DB connection for schema init");
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )
        .expect("Failed to configure sqlite");
        schema::init(&conn).expect("Failed to initialize database schema");
    }

    let cpu_pool = CpuPool::new(config.server.thread_count);

    info!("Static context ready, database: {}", database);

    StaticContext::new(db_pool, cpu_pool, Arc::new(config), ReposFactoryImpl::default())
}
