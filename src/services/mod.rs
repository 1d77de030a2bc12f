//! Services is a core layer for the app business logic like
//! validation, authorization, etc.

pub mod checkout;
pub mod comments;
pub mod coupons;
pub mod engagement;
pub mod products;
pub mod ratings;
pub mod types;
pub mod users;

pub use self::checkout::*;
pub use self::comments::*;
pub use self::coupons::*;
pub use self::engagement::*;
pub use self::products::*;
pub use self::ratings::*;
pub use self::types::*;
pub use self::users::*;

use std::sync::Arc;

use failure::Error as FailureError;
use failure::Fail;
use futures_cpupool::CpuPool;

use config::Config;
use errors::Error;
use models::UserId;
use repos::repo_factory::ReposFactory;
use repos::types::{DbConnection, DbPool};

use self::types::ServiceFuture;

/// Static context for services: everything that is initialized once at
/// process start and shared by every request.
pub struct StaticContext<F: ReposFactory> {
    pub db_pool: DbPool,
    pub cpu_pool: CpuPool,
    pub config: Arc<Config>,
    pub repo_factory: F,
}

impl<F: ReposFactory> Clone for StaticContext<F> {
    fn clone(&self) -> Self {
        Self {
            db_pool: self.db_pool.clone(),
            cpu_pool: self.cpu_pool.clone(),
            config: self.config.clone(),
            repo_factory: self.repo_factory.clone(),
        }
    }
}

impl<F: ReposFactory> StaticContext<F> {
    pub fn new(db_pool: DbPool, cpu_pool: CpuPool, config: Arc<Config>, repo_factory: F) -> Self {
        Self {
            db_pool,
            cpu_pool,
            config,
            repo_factory,
        }
    }
}

/// Dynamic context for services: the identity claim attached to one request.
#[derive(Clone, Debug, Default)]
pub struct DynamicContext {
    pub user_id: Option<UserId>,
    pub user_email: Option<String>,
}

impl DynamicContext {
    pub fn new(user_id: Option<UserId>, user_email: Option<String>) -> Self {
        Self { user_id, user_email }
    }
}

/// Service container: every service trait in this module is implemented on
/// it, so one instance serves a whole request.
pub struct Service<F: ReposFactory> {
    pub static_context: StaticContext<F>,
    pub dynamic_context: DynamicContext,
}

impl<F: ReposFactory> Service<F> {
    /// Create service
    pub fn new(static_context: StaticContext<F>, dynamic_context: DynamicContext) -> Self {
        Self {
            static_context,
            dynamic_context,
        }
    }

    /// Identity email attached to the request; anonymous requests are
    /// refused.
    pub fn identity_email(&self) -> Result<String, FailureError> {
        match self.dynamic_context.user_email.clone() {
            Some(email) => Ok(email),
            None => Err(format_err!("Denied request for unauthorized user")
                .context(Error::Forbidden)
                .into()),
        }
    }

    /// Borrows a pooled connection and runs the blocking closure on the cpu
    /// pool.
    pub fn spawn_on_pool<T, Func>(&self, f: Func) -> ServiceFuture<T>
    where
        T: Send + 'static,
        Func: FnOnce(DbConnection) -> Result<T, FailureError> + Send + 'static,
    {
        let db_pool = self.static_context.db_pool.clone();
        let cpu_pool = self.static_context.cpu_pool.clone();
        Box::new(cpu_pool.spawn_fn(move || {
            db_pool
                .get()
                .map_err(|e| e.context(Error::Connection).into())
                .and_then(f)
        }))
    }
}
