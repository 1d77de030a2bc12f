//! Shared setup for the integration suites: a fresh in-memory store per
//! test and services bound to seeded identities.
use std::sync::Arc;

use futures_cpupool::CpuPool;
use r2d2;
use r2d2_sqlite::SqliteConnectionManager;

use listings_lib::config::{Config, Server};
use listings_lib::errors::Error;
use listings_lib::models::{NewUser, UserId, UserRole};

/// Returns the `Error` carried by a failure-chain node, whether it is stored
/// directly or wrapped in a `failure::Context` (as the services do via
/// `.context(Error::...)`).
pub fn error_ref(cause: &dyn failure::Fail) -> Option<&Error> {
    cause
        .downcast_ref::<Error>()
        .or_else(|| cause.downcast_ref::<failure::Context<Error>>().map(|c| c.get_context()))
}
use listings_lib::repos::repo_factory::{ReposFactory, ReposFactoryImpl};
use listings_lib::schema;
use listings_lib::services::{DynamicContext, Service, StaticContext};

/// One in-memory database shared by every service built from this context.
/// The pool is capped at a single connection so all callers see one store.
pub fn create_store() -> StaticContext<ReposFactoryImpl> {
    let manager = SqliteConnectionManager::memory();
    let db_pool = r2d2::Pool::builder()
        .max_size(1)
        .build(manager)
        .expect("Failed to create connection pool");

    {
        let conn = db_pool.get().expect("Failed to get connection for schema init");
        schema::init(&conn).expect("Failed to initialize schema");
    }

    let cpu_pool = CpuPool::new(1);
    let config = Config {
        server: Server {
            host: "localhost".to_string(),
            port: "8000".to_string(),
            database: ":memory:".to_string(),
            thread_count: 1,
        },
    };

    StaticContext::new(db_pool, cpu_pool, Arc::new(config), ReposFactoryImpl::default())
}

/// Service bound to the given identity claim.
pub fn service_as(
    ctx: &StaticContext<ReposFactoryImpl>,
    user_id: Option<UserId>,
    email: Option<&str>,
) -> Service<ReposFactoryImpl> {
    Service::new(ctx.clone(), DynamicContext::new(user_id, email.map(|e| e.to_string())))
}

/// Seeds a user directly through the system-ACL repo, the same path the
/// identity bootstrap uses.
pub fn seed_user(ctx: &StaticContext<ReposFactoryImpl>, email: &str, role: UserRole, verified: bool) -> UserId {
    let conn = ctx.db_pool.get().expect("Failed to get connection for seeding");
    let factory = ReposFactoryImpl::default();
    let users_repo = factory.create_users_repo_with_sys_acl(&conn);

    let user = users_repo
        .create(NewUser {
            email: email.to_string(),
            name: "Seeded User".to_string(),
            photo: None,
        })
        .expect("Failed to seed user");

    if role != UserRole::User {
        users_repo.update_role(email.to_string(), role).expect("Failed to seed role");
    }
    if verified {
        users_repo.set_verified(email.to_string()).expect("Failed to seed verification");
    }

    user.id
}
